//! Environment-driven configuration.
//!
//! Each process loads its configuration once at startup and passes the
//! resulting struct to the components that need it. Loaders are written over
//! a key lookup function so they can be exercised without touching the real
//! process environment.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::secret::Secret;

/// Minimum accepted length of the token signing secret, in bytes.
pub const MIN_SECRET_LEN: usize = 16;

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A configuration value is invalid
    #[error("invalid configuration for {key}: '{value}' ({reason})")]
    InvalidValue {
        /// Environment key
        key: String,
        /// Offending value, or a placeholder for secrets
        value: String,
        /// Why the value was refused
        reason: String,
    },
    /// A required configuration value is missing
    #[error("missing required configuration: {key} ({hint})")]
    MissingRequired {
        /// Environment key
        key: String,
        /// What the operator should set
        hint: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(key: &str, value: &str, reason: &str) -> Self {
        ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }

    fn missing(key: &str, hint: &str) -> Self {
        ConfigError::MissingRequired {
            key: key.to_string(),
            hint: hint.to_string(),
        }
    }
}

/// Reads typed values out of a key lookup.
struct Source<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> Source<F> {
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|v| !v.trim().is_empty())
    }

    fn string_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    fn required(&self, key: &str, hint: &str) -> Result<String, ConfigError> {
        self.get(key).ok_or_else(|| ConfigError::missing(key, hint))
    }

    fn millis_or(&self, key: &str, default: u64) -> Result<Duration, ConfigError> {
        match self.get(key) {
            None => Ok(Duration::from_millis(default)),
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => Ok(Duration::from_millis(ms)),
                _ => Err(ConfigError::invalid(key, &raw, "expected a positive number of milliseconds")),
            },
        }
    }

    fn positive(&self, raw: &str, key: &str) -> Result<u32, ConfigError> {
        match raw.trim().parse::<u32>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(ConfigError::invalid(key, raw, "expected a positive integer")),
        }
    }
}

// ============================================================================
// Gateway
// ============================================================================

/// Gateway process configuration.
pub struct GatewayConfig {
    /// HTTP bind address
    pub bind_addr: String,
    /// Token signing secret
    pub token_secret: Secret<Vec<u8>>,
    /// Base URL of the credential service
    pub auth_service_url: String,
    /// Address of the reservation worker
    pub reservation_rpc_addr: String,
    /// Address of the logging worker
    pub logger_rpc_addr: String,
    /// Deadline for each outbound call
    pub rpc_timeout: Duration,
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("bind_addr", &self.bind_addr)
            .field("token_secret", &self.token_secret)
            .field("auth_service_url", &self.auth_service_url)
            .field("reservation_rpc_addr", &self.reservation_rpc_addr)
            .field("logger_rpc_addr", &self.logger_rpc_addr)
            .field("rpc_timeout", &self.rpc_timeout)
            .finish()
    }
}

impl GatewayConfig {
    /// Loads gateway configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Loads gateway configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let src = Source { lookup };

        let secret = src.required("TOKEN_SECRET", "set this to the symmetric token signing secret")?;
        if secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::invalid(
                "TOKEN_SECRET",
                "<redacted>",
                "must be at least 16 bytes",
            ));
        }

        Ok(Self {
            bind_addr: src.string_or("GATEWAY_ADDR", "0.0.0.0:8888"),
            token_secret: Secret::new(secret.into_bytes()),
            auth_service_url: src
                .string_or("AUTH_SERVICE_URL", "http://auth-svc:8181")
                .trim_end_matches('/')
                .to_string(),
            reservation_rpc_addr: src.string_or("RESERVATION_RPC_ADDR", "reservation-svc:5002"),
            logger_rpc_addr: src.string_or("LOGGER_RPC_ADDR", "logger-svc:5001"),
            rpc_timeout: src.millis_or("RPC_TIMEOUT_MS", 5_000)?,
        })
    }
}

// ============================================================================
// Workers
// ============================================================================

/// Which worker process is being configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerKind {
    /// The reservation worker
    Reservation,
    /// The logging worker
    Logging,
}

impl WorkerKind {
    fn default_addr(self) -> &'static str {
        match self {
            WorkerKind::Reservation => "0.0.0.0:5002",
            WorkerKind::Logging => "0.0.0.0:5001",
        }
    }

    fn database_key(self) -> &'static str {
        match self {
            WorkerKind::Reservation => "DSN",
            WorkerKind::Logging => "LOG_DATABASE_URL",
        }
    }
}

/// Listener tuning shared by every worker.
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// Consecutive accept failures tolerated before stopping
    pub max_accept_errors: u32,
    /// Maximum concurrently served sessions
    pub max_sessions: usize,
    /// Sleep after a failed accept
    pub accept_backoff: Duration,
}

impl ListenerConfig {
    /// A listener that stops after `max_accept_errors` failures, with the
    /// default session limit and backoff.
    pub fn with_budget(max_accept_errors: u32) -> Self {
        Self {
            max_accept_errors,
            max_sessions: 256,
            accept_backoff: Duration::from_millis(200),
        }
    }
}

/// Worker process configuration.
pub struct WorkerConfig {
    /// Which worker this is
    pub kind: WorkerKind,
    /// RPC bind address
    pub bind_addr: String,
    /// Persistence connection string
    pub database_url: Secret<String>,
    /// Listener tuning
    pub listener: ListenerConfig,
    /// Bounded persistence scope
    pub db_timeout: Duration,
    /// Address of the logging worker, for audit calls
    pub logger_rpc_addr: String,
    /// Deadline for outbound audit calls
    pub rpc_timeout: Duration,
}

impl fmt::Debug for WorkerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerConfig")
            .field("kind", &self.kind)
            .field("bind_addr", &self.bind_addr)
            .field("database_url", &self.database_url)
            .field("listener", &self.listener)
            .field("db_timeout", &self.db_timeout)
            .field("logger_rpc_addr", &self.logger_rpc_addr)
            .field("rpc_timeout", &self.rpc_timeout)
            .finish()
    }
}

impl WorkerConfig {
    /// Loads worker configuration from the process environment.
    pub fn from_env(kind: WorkerKind) -> Result<Self, ConfigError> {
        Self::from_lookup(kind, |k| std::env::var(k).ok())
    }

    /// Loads worker configuration from an arbitrary key lookup.
    pub fn from_lookup(
        kind: WorkerKind,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let src = Source { lookup };

        let raw_budget = src.required(
            "MAX_ACCEPT_ERROR",
            "set the number of consecutive accept failures tolerated",
        )?;
        let max_accept_errors = src.positive(&raw_budget, "MAX_ACCEPT_ERROR")?;

        let max_sessions = match src.get("MAX_SESSIONS") {
            None => 256,
            Some(raw) => src.positive(&raw, "MAX_SESSIONS")? as usize,
        };

        let db_key = kind.database_key();
        let database_url = src.required(db_key, "set the persistence connection string")?;

        Ok(Self {
            kind,
            bind_addr: src.string_or("RPC_ADDR", kind.default_addr()),
            database_url: Secret::new(database_url),
            listener: ListenerConfig {
                max_accept_errors,
                max_sessions,
                accept_backoff: src.millis_or("ACCEPT_BACKOFF_MS", 200)?,
            },
            db_timeout: src.millis_or("DB_TIMEOUT_MS", 3_000)?,
            logger_rpc_addr: src.string_or("LOGGER_RPC_ADDR", "logger-svc:5001"),
            rpc_timeout: src.millis_or("RPC_TIMEOUT_MS", 5_000)?,
        })
    }
}
