//! HTTP client for the credential service.
//!
//! Password checks and account creation live behind `POST {base}/auth`. The
//! gateway forwards the caller's `auth` payload unchanged and interprets the
//! answer.

use std::fmt;
use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{AuthError, Error, TransportError};
use crate::Secret;

/// Sub-action of an `auth` envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthAction {
    /// Check an existing account's password
    Login,
    /// Create an account
    Signup,
}

impl fmt::Display for AuthAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthAction::Login => f.write_str("login"),
            AuthAction::Signup => f.write_str("signup"),
        }
    }
}

/// Account fields sent with an `auth` request.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthData {
    /// Account email
    pub email: String,
    /// Display name, for signup
    #[serde(rename = "fullName", default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    /// Plain password; never logged
    pub password: Secret<String>,
}

/// Body of `POST /auth`.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthRequest {
    /// Login or signup
    pub action: AuthAction,
    /// Account fields
    #[serde(rename = "authData")]
    pub auth_data: AuthData,
}

/// Account details returned by the credential service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserData {
    /// Stable account identifier; becomes the token subject
    #[serde(default, deserialize_with = "id_as_string")]
    pub id: Option<String>,
    /// Account email
    #[serde(default)]
    pub email: String,
    /// Display name
    #[serde(rename = "fullName", default)]
    pub full_name: String,
}

/// The credential service's JSON answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialResponse {
    /// Set when the service declined the request in-band
    #[serde(default)]
    pub error: bool,
    /// Service message
    #[serde(default)]
    pub message: String,
    /// Account details, when the service returns them
    #[serde(default)]
    pub data: Option<UserData>,
}

impl CredentialResponse {
    /// The account identifier, if the service returned one.
    pub fn user_id(&self) -> Option<&str> {
        self.data.as_ref().and_then(|d| d.id.as_deref())
    }
}

/// How the credential service answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialOutcome {
    /// The request succeeded
    Accepted(CredentialResponse),
    /// The service answered 2xx with `error: true`, e.g. "User already exists"
    Rejected(String),
}

// Identifiers arrive as numbers from SQL-backed stores and as strings elsewhere.
fn id_as_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match Option::<RawId>::deserialize(d)? {
        Some(RawId::Text(s)) if !s.trim().is_empty() => Some(s),
        Some(RawId::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Client for the credential service.
#[derive(Debug, Clone)]
pub struct CredentialClient {
    client: reqwest::Client,
    base_url: String,
}

impl CredentialClient {
    /// Creates a client for `base_url` whose requests time out after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Http`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// The service base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Forwards `request` and interprets the answer.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidCredentials`] when the service answers 401
    /// - [`TransportError::UpstreamStatus`] for any other non-2xx status
    /// - [`TransportError::Http`] if the call or body decoding fails
    pub async fn authenticate(&self, request: &AuthRequest) -> Result<CredentialOutcome, Error> {
        let url = format!("{}/auth", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(TransportError::from)?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(AuthError::InvalidCredentials.into());
        }
        if !status.is_success() {
            return Err(TransportError::UpstreamStatus(status.as_u16()).into());
        }

        let body: CredentialResponse = response.json().await.map_err(TransportError::from)?;
        if body.error {
            return Ok(CredentialOutcome::Rejected(body.message));
        }
        Ok(CredentialOutcome::Accepted(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_and_string_ids_normalise() {
        let n: CredentialResponse =
            serde_json::from_str(r#"{"error":false,"message":"ok","data":{"id":17}}"#).unwrap();
        assert_eq!(n.user_id(), Some("17"));

        let s: CredentialResponse =
            serde_json::from_str(r#"{"message":"ok","data":{"id":"u-17"}}"#).unwrap();
        assert_eq!(s.user_id(), Some("u-17"));
    }

    #[test]
    fn missing_or_empty_id_is_none() {
        for body in [
            r#"{"message":"Signup success"}"#,
            r#"{"message":"x","data":{"email":"a@b.c"}}"#,
            r#"{"message":"x","data":{"id":""}}"#,
            r#"{"message":"x","data":{"id":null}}"#,
        ] {
            let r: CredentialResponse = serde_json::from_str(body).unwrap();
            assert_eq!(r.user_id(), None, "{body}");
        }
    }

    #[test]
    fn request_forwards_envelope_shape() {
        let req: AuthRequest = serde_json::from_str(
            r#"{"action":"login","authData":{"email":"a@b.c","password":"pw"}}"#,
        )
        .unwrap();
        assert_eq!(req.action, AuthAction::Login);

        let out = serde_json::to_value(&req).unwrap();
        assert_eq!(
            out,
            serde_json::json!({"action":"login","authData":{"email":"a@b.c","password":"pw"}})
        );
    }

    #[test]
    fn password_is_redacted_in_debug() {
        let req: AuthRequest = serde_json::from_str(
            r#"{"action":"signup","authData":{"email":"a@b.c","fullName":"A","password":"hunter2"}}"#,
        )
        .unwrap();
        let debug = format!("{req:?}");
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn base_url_drops_trailing_slash() {
        let client = CredentialClient::new("http://auth-svc:8181/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.base_url(), "http://auth-svc:8181");
    }

    #[test]
    fn unknown_sub_action_does_not_parse() {
        let r = serde_json::from_str::<AuthRequest>(
            r#"{"action":"reset","authData":{"email":"a@b.c","password":"pw"}}"#,
        );
        assert!(r.is_err());
    }
}
