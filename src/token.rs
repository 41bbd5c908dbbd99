//! Token minting and verification.
//!
//! Tokens are compact JWS strings (`header.claims.signature`, base64url
//! without padding) signed with HMAC-SHA-256. The claims carry the subject
//! identifier assigned by the credential store plus issued-at and expiry
//! timestamps in seconds since the Unix epoch.

use std::fmt;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::config::ConfigError;
use crate::error::AuthError;
use crate::request::Principal;
use crate::secret::Secret;

type HmacSha256 = Hmac<Sha256>;

/// The only signing algorithm the service issues or accepts.
pub const ALGORITHM: &str = "HS256";

/// Lifetime of a freshly minted token, in seconds.
pub const TOKEN_TTL_SECS: i64 = 60 * 60;

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    typ: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sub: Option<String>,
    iat: i64,
    exp: i64,
}

/// Mints and verifies signed, time-bounded identity tokens.
///
/// The service is constructed once at startup from the signing secret and
/// shared read-only across request tasks.
///
/// # Examples
///
/// ```
/// use mesh_gateway::{Secret, TokenService};
///
/// let tokens = TokenService::new(Secret::new(b"0123456789abcdef".to_vec())).unwrap();
/// let token = tokens.mint("42");
/// let principal = tokens.verify(&token).unwrap();
/// assert_eq!(principal.subject(), "42");
/// ```
#[derive(Clone)]
pub struct TokenService {
    mac: HmacSha256,
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("algorithm", &ALGORITHM)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

impl TokenService {
    /// Creates a token service keyed with `secret`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if the key is empty.
    pub fn new(secret: Secret<Vec<u8>>) -> Result<Self, ConfigError> {
        let key = secret.expose_secret();
        if key.is_empty() {
            return Err(ConfigError::invalid("TOKEN_SECRET", "<redacted>", "must not be empty"));
        }
        let mac = HmacSha256::new_from_slice(key)
            .map_err(|_| ConfigError::invalid("TOKEN_SECRET", "<redacted>", "unusable key"))?;
        Ok(Self { mac })
    }

    /// Mints a token for `subject` valid for [`TOKEN_TTL_SECS`] from now.
    pub fn mint(&self, subject: &str) -> String {
        self.mint_at(subject, Utc::now().timestamp())
    }

    /// Mints a token as if the current time were `now` (seconds since epoch).
    pub fn mint_at(&self, subject: &str, now: i64) -> String {
        let header = Header {
            alg: ALGORITHM.to_string(),
            typ: Some("JWT".to_string()),
        };
        let claims = Claims {
            sub: Some(subject.to_string()),
            iat: now,
            exp: now.saturating_add(TOKEN_TTL_SECS),
        };
        self.sign_parts(&header, &claims)
    }

    /// Verifies `token` against the current time.
    ///
    /// # Errors
    ///
    /// - [`AuthError::Malformed`] if the token cannot be decoded
    /// - [`AuthError::Expired`] if the expiry has passed
    /// - [`AuthError::BadSignature`] if the algorithm is not HS256 or the MAC does not match
    /// - [`AuthError::MissingSubject`] if the claims carry no subject
    pub fn verify(&self, token: &str) -> Result<Principal, AuthError> {
        self.verify_at(token, Utc::now().timestamp())
    }

    /// Verifies `token` as if the current time were `now`.
    ///
    /// Expiry is checked before the signature, so an expired token is always
    /// reported as [`AuthError::Expired`].
    pub fn verify_at(&self, token: &str, now: i64) -> Result<Principal, AuthError> {
        let mut parts = token.split('.');
        let (header_b64, claims_b64, signature_b64) =
            match (parts.next(), parts.next(), parts.next(), parts.next()) {
                (Some(h), Some(c), Some(s), None) => (h, c, s),
                _ => return Err(AuthError::Malformed("expected three segments")),
            };

        let header: Header = decode_json(header_b64, "header")?;
        let claims: Claims = decode_json(claims_b64, "claims")?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| AuthError::Malformed("signature"))?;

        if now >= claims.exp {
            return Err(AuthError::Expired);
        }

        if header.alg != ALGORITHM {
            return Err(AuthError::BadSignature);
        }

        let mut mac = self.mac.clone();
        mac.update(header_b64.as_bytes());
        mac.update(b".");
        mac.update(claims_b64.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| AuthError::BadSignature)?;

        match claims.sub {
            Some(sub) if !sub.is_empty() => Ok(Principal::new(sub)),
            _ => Err(AuthError::MissingSubject),
        }
    }

    fn sign_parts(&self, header: &Header, claims: &Claims) -> String {
        // Serializing these two plain structs cannot fail.
        let header_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(header).unwrap_or_default());
        let claims_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims).unwrap_or_default());

        let mut mac = self.mac.clone();
        mac.update(header_b64.as_bytes());
        mac.update(b".");
        mac.update(claims_b64.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        format!("{header_b64}.{claims_b64}.{signature}")
    }
}

fn decode_json<T: for<'de> Deserialize<'de>>(
    segment: &str,
    what: &'static str,
) -> Result<T, AuthError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| AuthError::Malformed(what))?;
    serde_json::from_slice(&bytes).map_err(|_| AuthError::Malformed(what))
}
