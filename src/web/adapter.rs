//! Request adapter for mapping axum requests to gateway types.

use std::convert::Infallible;
use std::fmt;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use uuid::Uuid;

use crate::Tainted;

/// Header carrying a caller-supplied request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

const MAX_REQUEST_ID_LEN: usize = 128;

/// The parts of an HTTP request the gateway needs before it reads the body.
///
/// The `Authorization` header stays [`Tainted`] until
/// [`extract_authed`](super::extract_authed) has verified the token inside it.
///
/// # Examples
///
/// ```
/// use mesh_gateway::web::RequestAdapter;
///
/// let mut adapter = RequestAdapter::new("req-12345".to_string());
/// adapter.set_authorization(Some("Bearer abc".to_string()));
/// assert_eq!(adapter.request_id(), "req-12345");
/// assert!(adapter.has_authorization());
/// ```
#[derive(Clone)]
pub struct RequestAdapter {
    request_id: String,
    authorization: Option<Tainted<String>>,
}

// The header holds a bearer token; only its presence is printed.
impl fmt::Debug for RequestAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestAdapter")
            .field("request_id", &self.request_id)
            .field(
                "authorization",
                &self.authorization.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl RequestAdapter {
    /// Creates an adapter with the given request id and no credentials.
    pub fn new(request_id: String) -> Self {
        Self {
            request_id,
            authorization: None,
        }
    }

    /// Builds an adapter from request headers.
    ///
    /// The request id is taken from `X-Request-Id` when it is present, short,
    /// and printable; otherwise a fresh v4 UUID is used.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let request_id = headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|id| {
                !id.is_empty()
                    && id.len() <= MAX_REQUEST_ID_LEN
                    && id.chars().all(|c| c.is_ascii_graphic())
            })
            .map_or_else(|| Uuid::new_v4().to_string(), str::to_string);

        let authorization = headers
            .get(AUTHORIZATION)
            .map(|v| Tainted::new(String::from_utf8_lossy(v.as_bytes()).into_owned()));

        Self {
            request_id,
            authorization,
        }
    }

    /// Sets or clears the raw `Authorization` header value.
    pub fn set_authorization(&mut self, value: Option<String>) {
        self.authorization = value.map(Tainted::new);
    }

    /// Returns the request id.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Whether an `Authorization` header was sent.
    pub fn has_authorization(&self) -> bool {
        self.authorization.is_some()
    }

    pub(crate) fn authorization(&self) -> Option<&Tainted<String>> {
        self.authorization.as_ref()
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for RequestAdapter {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}
