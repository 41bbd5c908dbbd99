//! HTTP boundary between axum and the gateway's context types.
//!
//! The flow for every request:
//!
//! ```text
//! axum request parts
//!   -> RequestAdapter        (request id, tainted Authorization header)
//!   -> extract_unauthed()    Ctx<Unauthed>         auth flow
//!   -> extract_authed()      Ctx<Authed> or 401    reserve flow
//! ```
//!
//! Nothing here talks to a backend. Authentication is token verification
//! only; the verified subject travels inside the context.

mod adapter;
mod extract;
mod middleware;

pub use adapter::{RequestAdapter, REQUEST_ID_HEADER};
pub use extract::{parse_bearer, ExtractBearer};
pub use middleware::{extract_authed, extract_unauthed};
