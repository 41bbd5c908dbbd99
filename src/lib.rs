//! An HTTP gateway and two RPC workers for a restaurant reservation mesh.
//!
//! The gateway authenticates callers and fans requests out; the workers each
//! perform one persistence write per call and emit audit records. The crate
//! holds three binaries' worth of code:
//!
//! - **gateway**: [`gateway::router`] over [`TokenService`],
//!   [`credential::CredentialClient`] and [`rpc::RpcClient`]
//! - **reservation worker**: [`workers::ReservationService`] behind an
//!   [`rpc::RpcListener`]
//! - **logging worker**: [`workers::LoggingService`] behind an
//!   [`rpc::RpcListener`]
//!
//! # Core Types
//!
//! - [`Secret<T>`]: Wrapper that redacts sensitive values in logs/output
//! - [`Tainted<T>`]: Wrapper for client-supplied data that has not been bound
//!   to a verified identity
//! - [`Ctx`]: Per-request context, `Ctx<Unauthed>` or `Ctx<Authed>`
//! - [`Principal`]: A verified token subject; only [`TokenService`] makes one
//!
//! # Examples
//!
//! ```
//! use mesh_gateway::{Secret, TokenService};
//!
//! // Secrets are automatically redacted
//! let key = Secret::new(b"a-long-enough-signing-key".to_vec());
//! assert_eq!(format!("{:?}", key), "[REDACTED]");
//!
//! // Tokens carry the credential store's account id as their subject
//! let tokens = TokenService::new(key).expect("key is non-empty");
//! let token = tokens.mint("42");
//! assert_eq!(tokens.verify(&token).unwrap().subject(), "42");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod audit;
pub mod config;
mod context;
pub mod credential;
pub mod error;
pub mod gateway;
pub mod logging;
mod request;
pub mod rpc;
mod secret;
mod state;
pub mod store;
mod tainted;
pub mod token;
pub mod web;
pub mod workers;

pub use context::Ctx;
pub use error::{AuthError, Error, PersistenceError, TransportError};
pub use request::Principal;
pub use secret::Secret;
pub use state::{Authed, Unauthed};
pub use tainted::Tainted;
pub use token::TokenService;
