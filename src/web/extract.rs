//! Bearer credential extraction.

use crate::error::AuthError;

use super::RequestAdapter;

/// Splits `Bearer <token>` into its token.
///
/// The header must be exactly two space-separated parts, the first being
/// `Bearer`.
///
/// # Errors
///
/// [`AuthError::MalformedHeader`] for any other shape, including an empty
/// token.
///
/// # Examples
///
/// ```
/// use mesh_gateway::web::parse_bearer;
///
/// assert_eq!(parse_bearer("Bearer abc.def.ghi").unwrap(), "abc.def.ghi");
/// assert!(parse_bearer("Basic dXNlcg==").is_err());
/// ```
pub fn parse_bearer(header: &str) -> Result<&str, AuthError> {
    let mut parts = header.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) if !token.is_empty() => Ok(token),
        _ => Err(AuthError::MalformedHeader),
    }
}

/// Pulls the bearer token out of a request.
///
/// Missing and malformed headers are distinct errors so logs can tell "no
/// credentials" from "garbled credentials"; both reach the caller as
/// `authorization required`.
pub trait ExtractBearer {
    /// Returns the raw, still unverified token.
    ///
    /// # Errors
    ///
    /// [`AuthError::MissingHeader`] or [`AuthError::MalformedHeader`].
    fn extract_bearer(&self) -> Result<String, AuthError>;
}

impl ExtractBearer for RequestAdapter {
    fn extract_bearer(&self) -> Result<String, AuthError> {
        let header = self
            .authorization()
            .ok_or(AuthError::MissingHeader)?
            .clone()
            .into_inner();
        parse_bearer(&header).map(str::to_string)
    }
}
