//! Worker accept loop.
//!
//! The loop is driven by [`ListenerState`], a three-state machine with a pure
//! transition function. Transient accept failures move it through
//! `Degraded(n)`; a run of failures reaching the configured budget stops it
//! for good, and the worker exits so its supervisor can restart it.

use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Semaphore;

use super::service::ServiceRegistry;
use super::wire::{read_frame, write_frame, RpcReply, RpcRequest};
use crate::config::ListenerConfig;
use crate::error::{Error, TransportError};

/// A session with no request for this long is closed.
const SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// State machine
// ============================================================================

/// Result of one accept attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptOutcome {
    /// A connection was accepted
    Accepted,
    /// The accept call failed
    Failed,
}

/// Health of the accept loop.
///
/// ```
/// use mesh_gateway::rpc::{AcceptOutcome, ListenerState};
///
/// let s = ListenerState::Running.on_accept(AcceptOutcome::Failed, 2);
/// assert_eq!(s, ListenerState::Degraded(1));
/// let s = s.on_accept(AcceptOutcome::Failed, 2);
/// assert!(s.is_stopped());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    /// No outstanding failures
    Running,
    /// `n` consecutive failures, still under budget
    Degraded(u32),
    /// Budget reached; terminal
    Stopped,
}

impl ListenerState {
    /// Applies one accept outcome under a budget of `max` consecutive failures.
    ///
    /// A success from `Running` or `Degraded` resets to `Running`. `Stopped`
    /// absorbs every outcome. A budget of zero is treated as one.
    #[must_use]
    pub fn on_accept(self, outcome: AcceptOutcome, max: u32) -> Self {
        let max = max.max(1);
        match (self, outcome) {
            (ListenerState::Stopped, _) => ListenerState::Stopped,
            (_, AcceptOutcome::Accepted) => ListenerState::Running,
            (state, AcceptOutcome::Failed) => {
                let failures = state.consecutive_failures().saturating_add(1);
                if failures >= max {
                    ListenerState::Stopped
                } else {
                    ListenerState::Degraded(failures)
                }
            }
        }
    }

    /// Consecutive failures recorded so far. `Stopped` reports zero; the
    /// loop tracks the final count itself.
    pub fn consecutive_failures(self) -> u32 {
        match self {
            ListenerState::Degraded(n) => n,
            ListenerState::Running | ListenerState::Stopped => 0,
        }
    }

    /// Whether the loop must stop accepting.
    pub fn is_stopped(self) -> bool {
        matches!(self, ListenerState::Stopped)
    }
}

// ============================================================================
// Acceptor seam
// ============================================================================

/// Source of inbound connections.
///
/// Implemented for [`tokio::net::TcpListener`]; tests substitute scripted
/// acceptors to drive failure sequences without a real network.
#[async_trait]
pub trait Acceptor: Send {
    /// Connection type handed to sessions.
    type Conn: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Waits for the next connection and its peer description.
    async fn accept(&mut self) -> io::Result<(Self::Conn, String)>;
}

#[async_trait]
impl Acceptor for tokio::net::TcpListener {
    type Conn = tokio::net::TcpStream;

    async fn accept(&mut self) -> io::Result<(Self::Conn, String)> {
        let (stream, peer) = tokio::net::TcpListener::accept(self).await?;
        stream.set_nodelay(true)?;
        Ok((stream, peer.to_string()))
    }
}

// ============================================================================
// Listener
// ============================================================================

/// Serves a [`ServiceRegistry`] over any [`Acceptor`].
#[derive(Clone)]
pub struct RpcListener {
    registry: Arc<ServiceRegistry>,
    config: ListenerConfig,
}

impl RpcListener {
    /// Creates a listener for `registry` tuned by `config`.
    pub fn new(registry: ServiceRegistry, config: ListenerConfig) -> Self {
        Self {
            registry: Arc::new(registry),
            config,
        }
    }

    /// Runs the accept loop until the failure budget is exhausted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ResourceExhausted`] once consecutive accept failures
    /// reach the budget. This is the only way the loop ends.
    pub async fn serve<A: Acceptor>(&self, acceptor: A) -> Result<(), Error> {
        self.serve_with_shutdown(acceptor, std::future::pending::<()>())
            .await
    }

    /// Runs the accept loop until `shutdown` resolves or the budget is exhausted.
    ///
    /// Sessions already in flight keep running on their own tasks after a
    /// shutdown; only accepting stops.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ResourceExhausted`] if the budget is exhausted first.
    pub async fn serve_with_shutdown<A, F>(&self, acceptor: A, shutdown: F) -> Result<(), Error>
    where
        A: Acceptor,
        F: Future<Output = ()> + Send,
    {
        tokio::pin!(shutdown);
        tokio::select! {
            result = self.accept_loop(acceptor) => result,
            () = &mut shutdown => {
                tracing::info!("listener shutting down");
                Ok(())
            }
        }
    }

    async fn accept_loop<A: Acceptor>(&self, mut acceptor: A) -> Result<(), Error> {
        let permits = Arc::new(Semaphore::new(self.config.max_sessions.max(1)));
        let max = self.config.max_accept_errors;
        let mut state = ListenerState::Running;

        tracing::info!(
            services = ?self.registry.service_names(),
            max_accept_errors = max,
            max_sessions = self.config.max_sessions,
            "listener running"
        );

        loop {
            // The semaphore is never closed.
            let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
                return Ok(());
            };

            match acceptor.accept().await {
                Ok((conn, peer)) => {
                    if let ListenerState::Degraded(n) = state {
                        tracing::info!(recovered_after = n, "accept recovered");
                    }
                    state = state.on_accept(AcceptOutcome::Accepted, max);

                    let registry = Arc::clone(&self.registry);
                    tokio::spawn(async move {
                        tracing::debug!(%peer, "session opened");
                        if let Err(e) = serve_session(conn, &registry).await {
                            tracing::warn!(%peer, error = %e, "session ended with error");
                        }
                        drop(permit);
                    });
                }
                Err(e) => {
                    drop(permit);
                    let failures = state.consecutive_failures().saturating_add(1);
                    state = state.on_accept(AcceptOutcome::Failed, max);

                    if state.is_stopped() {
                        tracing::error!(failures, error = %e, "accept failure budget exhausted");
                        return Err(Error::ResourceExhausted { failures });
                    }

                    tracing::warn!(failures, max, error = %e, "accept failed");
                    tokio::time::sleep(self.config.accept_backoff).await;
                }
            }
        }
    }
}

/// Serves requests on one connection until the peer closes it.
async fn serve_session<C>(mut conn: C, registry: &ServiceRegistry) -> Result<(), TransportError>
where
    C: AsyncRead + AsyncWrite + Unpin,
{
    loop {
        let request: RpcRequest =
            match tokio::time::timeout(SESSION_IDLE_TIMEOUT, read_frame(&mut conn)).await {
                Err(_) => return Err(TransportError::Timeout(SESSION_IDLE_TIMEOUT)),
                Ok(Ok(None)) => return Ok(()),
                Ok(Ok(Some(request))) => request,
                Ok(Err(TransportError::Codec(e))) => {
                    // Bad JSON in a well-framed message: report it and keep the session.
                    write_frame(&mut conn, &RpcReply::Err(format!("malformed request: {e}"))).await?;
                    continue;
                }
                Ok(Err(e)) => return Err(e),
            };

        tracing::debug!(method = %request.method, "rpc call");
        let reply = registry.dispatch(request).await;
        write_frame(&mut conn, &reply).await?;
    }
}
