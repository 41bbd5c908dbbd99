use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use super::wire::{MethodTarget, RpcReply, RpcRequest};
use crate::error::Error;

/// A named set of remote methods served by a worker.
///
/// Each method takes one typed payload (decoded from `params` with
/// [`decode_params`]) and returns one status string.
#[async_trait]
pub trait RpcService: Send + Sync + 'static {
    /// Service half of the call target, e.g. `"Reservation"`.
    fn name(&self) -> &'static str;

    /// Handles `method` with its raw parameters.
    ///
    /// An `Err` becomes the call's error outcome, as text.
    async fn call(&self, method: &str, params: serde_json::Value) -> Result<String, Error>;
}

/// Decodes a method's input struct, reporting bad input as a validation error.
pub fn decode_params<T: DeserializeOwned>(params: serde_json::Value) -> Result<T, Error> {
    serde_json::from_value(params).map_err(|e| Error::validation(format!("invalid params: {e}")))
}

/// Resolves `"<Service>.<Method>"` targets to registered services.
#[derive(Default, Clone)]
pub struct ServiceRegistry {
    services: HashMap<&'static str, Arc<dyn RpcService>>,
}

impl ServiceRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `service` under its own name, replacing any previous one.
    pub fn register(mut self, service: impl RpcService) -> Self {
        self.services.insert(service.name(), Arc::new(service));
        self
    }

    /// Names of the registered services.
    pub fn service_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.services.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Runs one request to completion and produces its reply.
    ///
    /// When the request carries a deadline the handler is cancelled once it
    /// elapses.
    pub async fn dispatch(&self, request: RpcRequest) -> RpcReply {
        let Some(target) = MethodTarget::parse(&request.method) else {
            return RpcReply::Err(format!("malformed call target '{}'", request.method));
        };
        let Some(service) = self.services.get(target.service) else {
            return RpcReply::Err(format!("unknown service '{}'", target.service));
        };

        let call = service.call(target.method, request.params);
        let outcome = match request.timeout_ms {
            Some(ms) => match tokio::time::timeout(Duration::from_millis(ms), call).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    tracing::warn!(method = %request.method, timeout_ms = ms, "handler exceeded caller deadline");
                    return RpcReply::Err(format!("deadline of {ms}ms exceeded"));
                }
            },
            None => call.await,
        };

        match outcome {
            Ok(status) => RpcReply::Ok(status),
            Err(e) => {
                tracing::warn!(method = %request.method, error = %e, "handler failed");
                RpcReply::Err(e.to_string())
            }
        }
    }
}
