use std::time::Duration;

use serde::Serialize;
use tokio::net::TcpStream;

use super::wire::{read_frame, write_frame, RpcReply, RpcRequest};
use crate::error::TransportError;

/// Client for one worker address.
///
/// Every call opens its own connection, sends one request, reads one reply,
/// and closes. There is no pooling and no retry. The whole exchange runs
/// under a deadline which is also sent to the server, so a hung peer costs
/// the caller at most that long.
///
/// # Examples
///
/// ```no_run
/// # async fn example() -> Result<(), mesh_gateway::error::TransportError> {
/// use std::time::Duration;
/// use mesh_gateway::rpc::RpcClient;
///
/// let logger = RpcClient::new("logger-svc:5001", Duration::from_secs(5));
/// let status = logger
///     .call("Logging.write", &serde_json::json!({"name": "Auth_Login", "data": "..."}))
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RpcClient {
    addr: String,
    timeout: Duration,
}

impl RpcClient {
    /// Creates a client for `addr` with a default per-call deadline.
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            timeout,
        }
    }

    /// The worker address this client dials.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Calls `method` with the client's default deadline.
    pub async fn call<P>(&self, method: &str, params: &P) -> Result<String, TransportError>
    where
        P: Serialize + ?Sized,
    {
        self.call_with_deadline(method, params, self.timeout).await
    }

    /// Calls `method` under a caller-supplied deadline.
    ///
    /// # Errors
    ///
    /// - [`TransportError::Dial`] if the worker cannot be reached
    /// - [`TransportError::Timeout`] if the deadline elapses first
    /// - [`TransportError::Remote`] if the handler returned its error outcome
    /// - other variants for framing or I/O failures mid-call
    pub async fn call_with_deadline<P>(
        &self,
        method: &str,
        params: &P,
        deadline: Duration,
    ) -> Result<String, TransportError>
    where
        P: Serialize + ?Sized,
    {
        let request = RpcRequest {
            method: method.to_string(),
            timeout_ms: Some(u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX)),
            params: serde_json::to_value(params)?,
        };

        match tokio::time::timeout(deadline, self.exchange(&request)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout(deadline)),
        }
    }

    async fn exchange(&self, request: &RpcRequest) -> Result<String, TransportError> {
        let mut stream = TcpStream::connect(&self.addr)
            .await
            .map_err(|source| TransportError::Dial {
                addr: self.addr.clone(),
                source,
            })?;
        stream.set_nodelay(true)?;

        write_frame(&mut stream, request).await?;

        match read_frame::<_, RpcReply>(&mut stream).await? {
            Some(RpcReply::Ok(status)) => Ok(status),
            Some(RpcReply::Err(message)) => Err(TransportError::Remote(message)),
            None => Err(TransportError::Closed),
        }
    }
}
