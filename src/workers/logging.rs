use std::time::Duration;

use async_trait::async_trait;

use crate::audit::LogPayload;
use crate::error::Error;
use crate::rpc::{decode_params, RpcService};
use crate::store::{with_deadline, LogStore, NewLogEntry};

/// Full call target for writing an audit record.
pub const WRITE_METHOD: &str = crate::audit::LOG_METHOD;

/// The `Logging` service.
pub struct LoggingService<S> {
    store: S,
    db_timeout: Duration,
}

impl<S: LogStore> LoggingService<S> {
    /// Creates the service over `store`.
    pub fn new(store: S, db_timeout: Duration) -> Self {
        Self { store, db_timeout }
    }

    /// Stores one audit record.
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] for an empty `name`, [`Error::Persistence`] if the
    /// write fails or exceeds the persistence deadline.
    pub async fn write(&self, payload: LogPayload) -> Result<String, Error> {
        if payload.name.trim().is_empty() {
            return Err(Error::validation("log name is required"));
        }

        let entry = NewLogEntry {
            name: payload.name,
            data: payload.data,
        };
        let stored = with_deadline(self.db_timeout, self.store.insert(entry)).await?;
        tracing::debug!(id = %stored.id, name = %stored.name, "log entry stored");

        Ok(format!(
            "Successfully logged via RPC: {} - {}",
            stored.name, stored.data
        ))
    }
}

#[async_trait]
impl<S: LogStore> RpcService for LoggingService<S> {
    fn name(&self) -> &'static str {
        "Logging"
    }

    async fn call(&self, method: &str, params: serde_json::Value) -> Result<String, Error> {
        match method {
            "write" => self.write(decode_params(params)?).await,
            other => Err(Error::validation(format!("unknown method 'Logging.{other}'"))),
        }
    }
}
