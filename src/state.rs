//! Type-state markers for request context progression.
//!
//! A request starts as `Ctx<Unauthed>` and becomes `Ctx<Authed>` only by
//! presenting a token the gateway's token service accepts.

use crate::request::Principal;

/// Marker type for an unauthenticated context.
///
/// `Ctx<Unauthed>` has no principal and cannot reach a worker.
#[derive(Debug, Clone, Copy)]
pub struct Unauthed {
    _private: (),
}

impl Unauthed {
    pub(crate) fn new() -> Self {
        Self { _private: () }
    }
}

/// State of an authenticated context.
///
/// Holds the principal whose subject came out of a verified token.
/// Reservation dispatch requires this state.
#[derive(Debug, Clone)]
pub struct Authed {
    pub(crate) principal: Principal,
}
