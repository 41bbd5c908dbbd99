//! Best-effort audit records sent to the Logging worker.
//!
//! Audit calls never change the outcome of the operation that triggered
//! them: a failed call is logged and dropped.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::rpc::RpcClient;

/// Remote method that stores one audit record.
pub const LOG_METHOD: &str = "Logging.write";

/// Kind of audited event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditEventKind {
    /// A caller logged in
    AuthLogin,
    /// A new account was created
    AuthSignup,
    /// A reservation was written
    ReservationCreated,
}

impl AuditEventKind {
    /// Tag stored in the record's `name` field.
    pub fn as_str(self) -> &'static str {
        match self {
            AuditEventKind::AuthLogin => "Auth_Login",
            AuditEventKind::AuthSignup => "Auth_Signup",
            AuditEventKind::ReservationCreated => "Reservation_Created",
        }
    }
}

impl fmt::Display for AuditEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters of [`LOG_METHOD`].
///
/// `data` must be safe to store: identifiers and fixed text only, never
/// credentials or raw request bodies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogPayload {
    /// Event tag
    pub name: String,
    /// Human-readable detail
    pub data: String,
}

impl LogPayload {
    /// Builds the payload for `kind`.
    pub fn new(kind: AuditEventKind, data: impl Into<String>) -> Self {
        Self {
            name: kind.as_str().to_string(),
            data: data.into(),
        }
    }
}

/// Sends audit records to the Logging worker.
#[derive(Debug, Clone)]
pub struct AuditClient {
    rpc: RpcClient,
}

impl AuditClient {
    /// Audits through `rpc`, which should point at the Logging worker.
    pub fn new(rpc: RpcClient) -> Self {
        Self { rpc }
    }

    /// Records one event.
    ///
    /// Returns whether the worker acknowledged it. Callers are free to ignore
    /// the result; failures have already been logged.
    pub async fn record(&self, kind: AuditEventKind, data: impl Into<String>) -> bool {
        let payload = LogPayload::new(kind, data);
        match self.rpc.call(LOG_METHOD, &payload).await {
            Ok(status) => {
                tracing::debug!(event = %kind, %status, "audit recorded");
                true
            }
            Err(e) => {
                tracing::warn!(
                    event = %kind,
                    logger = self.rpc.addr(),
                    error = %e,
                    "audit call failed; continuing"
                );
                false
            }
        }
    }
}
