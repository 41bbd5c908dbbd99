//! Error taxonomy for the gateway and its workers.
//!
//! Every failure in the mesh is one of five kinds: validation, authentication,
//! transport, persistence, or listener resource exhaustion. The variants carry
//! enough detail for logs; [`Error::public_message`] is what a caller sees.

use std::io;
use std::time::Duration;

use axum::http::StatusCode;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur anywhere in the mesh.
#[derive(Debug, Error)]
pub enum Error {
    /// The request envelope was malformed or named an unknown action.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The caller could not be authenticated.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// A remote call to a worker or the credential service failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A store write failed or timed out.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    /// The listener exceeded its accept-failure budget.
    #[error("listener stopped after {failures} consecutive accept failures")]
    ResourceExhausted {
        /// Length of the failure run that stopped the listener
        failures: u32,
    },

    /// Startup configuration was missing or invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl Error {
    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    /// HTTP status used when this error reaches the gateway boundary.
    pub fn status(&self) -> StatusCode {
        match self {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::Auth(_) => StatusCode::UNAUTHORIZED,
            Error::Transport(_) | Error::Persistence(_) => StatusCode::BAD_GATEWAY,
            Error::ResourceExhausted { .. } | Error::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Generic message safe to return to an end user.
    ///
    /// Internal detail (which claim was missing, the upstream error text) is
    /// deliberately absent; log the `Display` form instead.
    pub fn public_message(&self) -> &'static str {
        match self {
            Error::Validation(_) => "invalid request",
            Error::Auth(e) => e.public_message(),
            Error::Transport(_) | Error::Persistence(_) => "upstream service failure",
            Error::ResourceExhausted { .. } | Error::Config(_) => "internal error",
        }
    }
}

/// Authentication failures.
///
/// All variants surface as 401; the distinction exists for logging.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No `Authorization` header was sent.
    #[error("authorization header missing")]
    MissingHeader,
    /// The `Authorization` header was not `Bearer <token>`.
    #[error("authorization header format is invalid")]
    MalformedHeader,
    /// The token could not be decoded.
    #[error("token is malformed: {0}")]
    Malformed(&'static str),
    /// The token was signed with another key or algorithm.
    #[error("token signature is invalid")]
    BadSignature,
    /// The token is past its expiry.
    #[error("token has expired")]
    Expired,
    /// The token carries no subject claim.
    #[error("token has no subject claim")]
    MissingSubject,
    /// The credential service rejected the email/password pair.
    #[error("invalid credentials")]
    InvalidCredentials,
}

impl AuthError {
    /// Generic caller-facing message.
    pub fn public_message(&self) -> &'static str {
        match self {
            AuthError::MissingHeader | AuthError::MalformedHeader => "authorization required",
            AuthError::InvalidCredentials => "invalid credentials",
            AuthError::Malformed(_)
            | AuthError::BadSignature
            | AuthError::Expired
            | AuthError::MissingSubject => "unauthorized",
        }
    }
}

/// Failures talking to another process.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The connection could not be opened.
    #[error("dial {addr} failed: {source}")]
    Dial {
        /// Target address
        addr: String,
        /// Underlying socket error
        #[source]
        source: io::Error,
    },

    /// Reading or writing an established connection failed.
    #[error("transport i/o failed: {0}")]
    Io(#[from] io::Error),

    /// A frame could not be encoded or decoded.
    #[error("codec failed: {0}")]
    Codec(#[from] serde_json::Error),

    /// A frame exceeded the protocol limit.
    #[error("frame of {len} bytes exceeds limit of {max}")]
    FrameTooLarge {
        /// Announced frame length
        len: usize,
        /// Configured limit
        max: usize,
    },

    /// The peer closed the connection before replying.
    #[error("connection closed before reply")]
    Closed,

    /// The call did not complete within its deadline.
    #[error("call timed out after {0:?}")]
    Timeout(Duration),

    /// The remote handler returned its error outcome.
    #[error("remote error: {0}")]
    Remote(String),

    /// An HTTP exchange with the credential service failed.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The credential service answered with an unexpected status.
    #[error("upstream answered with status {0}")]
    UpstreamStatus(u16),
}

/// Failures from a persistence collaborator.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The bounded persistence scope elapsed.
    #[error("persistence operation timed out after {0:?}")]
    Timeout(Duration),

    /// The database driver reported an error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A non-database store rejected the write.
    #[error("store rejected write: {0}")]
    Rejected(String),
}
