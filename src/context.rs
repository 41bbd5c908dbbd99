use crate::logging::RequestLog;
use crate::request::Principal;
use crate::state::{Authed, Unauthed};

/// Per-request context carrying the request id and, once authenticated, the
/// verified principal.
///
/// `Ctx<S>` is generic over its authentication state:
/// - `Ctx<Unauthed>`: request id only; enough for the `auth` flow
/// - `Ctx<Authed>`: request id and principal; required for the `reserve` flow
///
/// ```text
/// Ctx<Unauthed> --authenticate(Principal)--> Ctx<Authed>
/// ```
///
/// Since a [`Principal`] can only come from token verification, holding a
/// `Ctx<Authed>` is proof the caller presented a valid token.
#[derive(Debug, Clone)]
pub struct Ctx<S = Authed> {
    request_id: String,
    state: S,
}

// ============================================================================
// Shared methods (available on all states)
// ============================================================================

impl<S> Ctx<S> {
    /// Returns the request ID for this context.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Returns a logger that stamps every record with this request's ID.
    pub fn log(&self) -> RequestLog<'_> {
        RequestLog::new(&self.request_id)
    }
}

// ============================================================================
// Ctx<Unauthed> - Initial state
// ============================================================================

impl Ctx<Unauthed> {
    /// Creates a new unauthenticated context.
    pub(crate) fn new_unauthed(request_id: String) -> Self {
        Self {
            request_id,
            state: Unauthed::new(),
        }
    }

    /// Promotes the context with a verified principal.
    pub fn authenticate(self, principal: Principal) -> Ctx<Authed> {
        Ctx {
            request_id: self.request_id,
            state: Authed { principal },
        }
    }
}

// ============================================================================
// Ctx<Authed> - Verified caller
// ============================================================================

impl Ctx<Authed> {
    /// Returns the verified principal.
    pub fn principal(&self) -> &Principal {
        &self.state.principal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthed_context_has_request_id() {
        let ctx = Ctx::new_unauthed("req-1".to_string());
        assert_eq!(ctx.request_id(), "req-1");
    }

    #[test]
    fn authenticate_carries_principal_and_request_id() {
        let ctx = Ctx::new_unauthed("req-2".to_string())
            .authenticate(Principal::new("42".to_string()));

        assert_eq!(ctx.request_id(), "req-2");
        assert_eq!(ctx.principal().subject(), "42");
    }

    #[test]
    fn log_is_bound_to_request_id() {
        let ctx = Ctx::new_unauthed("req-3".to_string());
        assert_eq!(ctx.log().request_id(), "req-3");
    }
}
