//! Builders for the request context.
//!
//! These functions do not call any backend. `extract_authed` verifies the
//! bearer token locally and, on success, promotes the context to
//! `Ctx<Authed>` carrying the token's subject.

use crate::context::Ctx;
use crate::error::AuthError;
use crate::state::{Authed, Unauthed};
use crate::token::TokenService;

use super::{ExtractBearer, RequestAdapter};

/// Builds an unauthenticated context for the request.
///
/// # Examples
///
/// ```
/// use mesh_gateway::web::{RequestAdapter, extract_unauthed};
///
/// let adapter = RequestAdapter::new("req-public".to_string());
/// let ctx = extract_unauthed(&adapter);
/// assert_eq!(ctx.request_id(), "req-public");
/// ```
pub fn extract_unauthed(adapter: &RequestAdapter) -> Ctx<Unauthed> {
    Ctx::new_unauthed(adapter.request_id().to_string())
}

/// Builds an authenticated context from the request's bearer token.
///
/// # Errors
///
/// - [`AuthError::MissingHeader`] / [`AuthError::MalformedHeader`] if there is
///   no usable `Authorization: Bearer` header
/// - any token verification error from [`TokenService::verify`]
///
/// # Examples
///
/// ```
/// use mesh_gateway::web::{RequestAdapter, extract_authed};
/// use mesh_gateway::{Secret, TokenService};
///
/// let tokens = TokenService::new(Secret::new(b"0123456789abcdef".to_vec())).unwrap();
/// let mut adapter = RequestAdapter::new("req-002".to_string());
/// adapter.set_authorization(Some(format!("Bearer {}", tokens.mint("42"))));
///
/// let ctx = extract_authed(&adapter, &tokens).unwrap();
/// assert_eq!(ctx.principal().subject(), "42");
/// ```
pub fn extract_authed(
    adapter: &RequestAdapter,
    tokens: &TokenService,
) -> Result<Ctx<Authed>, AuthError> {
    let token = adapter.extract_bearer()?;
    let principal = tokens.verify(&token)?;
    Ok(extract_unauthed(adapter).authenticate(principal))
}
