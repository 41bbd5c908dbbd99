use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Body of every gateway response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonResponse {
    /// Whether the request failed
    pub error: bool,
    /// Caller-facing message
    pub message: String,
    /// Result payload, e.g. the token on login
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl JsonResponse {
    /// A successful response.
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            error: false,
            message: message.into(),
            data: None,
        }
    }

    /// A failed response.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            error: true,
            message: message.into(),
            data: None,
        }
    }

    /// Attaches a payload.
    pub fn with_data(mut self, data: impl Into<serde_json::Value>) -> Self {
        self.data = Some(data.into());
        self
    }
}

/// A status code and body, ready to send.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    /// HTTP status
    pub status: StatusCode,
    /// JSON body
    pub body: JsonResponse,
}

impl Reply {
    /// Pairs `status` with `body`.
    pub fn new(status: StatusCode, body: JsonResponse) -> Self {
        Self { status, body }
    }

    /// The caller-facing form of `err`.
    ///
    /// Transport and persistence failures become `upstream_message`, which
    /// names the operation that failed without any backend detail.
    pub fn from_error(err: &Error, upstream_message: &'static str) -> Self {
        let message = match err {
            Error::Transport(_) | Error::Persistence(_) => upstream_message,
            other => other.public_message(),
        };
        Self::new(err.status(), JsonResponse::failure(message))
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
