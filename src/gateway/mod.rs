//! The HTTP front door.
//!
//! `POST /handle` accepts one action envelope. `auth` envelopes go to the
//! credential service over HTTP; `reserve` envelopes need a bearer token and
//! go to the Reservation worker over RPC with the token's subject as the
//! booking owner.

mod dispatch;
mod envelope;
mod response;
mod router;

pub use dispatch::{handle_auth, handle_reserve};
pub use envelope::{
    parse_envelope, Action, RawCount, ReservationAction, ReservationData, ReservationRequest,
    MAX_REMARKS_CHARS,
};
pub use response::{JsonResponse, Reply};
pub use router::router;

use crate::audit::AuditClient;
use crate::config::GatewayConfig;
use crate::credential::CredentialClient;
use crate::error::Error;
use crate::rpc::RpcClient;
use crate::token::TokenService;

/// Everything a gateway request handler needs, shared read-only.
#[derive(Debug, Clone)]
pub struct GatewayState {
    /// Signs and verifies bearer tokens
    pub tokens: TokenService,
    /// Credential service client
    pub credential: CredentialClient,
    /// Reservation worker client
    pub reservation: RpcClient,
    /// Logging worker client for audit records
    pub audit: AuditClient,
}

impl GatewayState {
    /// Builds the state from configuration.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] for an unusable signing secret, [`Error::Transport`]
    /// if the HTTP client cannot be built.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, Error> {
        let secret = crate::Secret::new(config.token_secret.expose_secret().clone());
        Ok(Self {
            tokens: TokenService::new(secret)?,
            credential: CredentialClient::new(&config.auth_service_url, config.rpc_timeout)?,
            reservation: RpcClient::new(config.reservation_rpc_addr.clone(), config.rpc_timeout),
            audit: AuditClient::new(RpcClient::new(
                config.logger_rpc_addr.clone(),
                config.rpc_timeout,
            )),
        })
    }
}
