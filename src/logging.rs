use std::fmt;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs the process-wide `tracing` subscriber.
///
/// The filter comes from `RUST_LOG`, defaulting to `info`. Calling this twice
/// is harmless; the second call leaves the first subscriber in place.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// A request-scoped logging interface.
///
/// `RequestLog` is obtained from [`Ctx::log`](crate::Ctx::log) and is
/// lifetime-bound to the context. Every record carries the request ID, so the
/// gateway's internal detail (which token check failed, what the upstream
/// said) can be correlated without ever appearing in a response.
///
/// Secret values are redacted when logged thanks to their `Debug` and
/// `Display` implementations.
#[derive(Debug)]
pub struct RequestLog<'a> {
    request_id: &'a str,
}

impl<'a> RequestLog<'a> {
    pub(crate) fn new(request_id: &'a str) -> Self {
        Self { request_id }
    }

    /// Returns the request ID associated with this logger.
    pub fn request_id(&self) -> &str {
        self.request_id
    }

    /// Logs an info-level message with request ID.
    ///
    /// ```no_run
    /// # use mesh_gateway::logging::RequestLog;
    /// # fn example(log: &RequestLog) {
    /// log.info(format_args!("dispatching {}", "Reservation.create"));
    /// # }
    /// ```
    pub fn info(&self, args: fmt::Arguments<'_>) {
        tracing::info!(request_id = %self.request_id, "{}", args);
    }

    /// Logs a warning-level message with request ID.
    pub fn warn(&self, args: fmt::Arguments<'_>) {
        tracing::warn!(request_id = %self.request_id, "{}", args);
    }

    /// Logs an error-level message with request ID.
    pub fn error(&self, args: fmt::Arguments<'_>) {
        tracing::error!(request_id = %self.request_id, "{}", args);
    }

    /// Logs a debug-level message with request ID.
    pub fn debug(&self, args: fmt::Arguments<'_>) {
        tracing::debug!(request_id = %self.request_id, "{}", args);
    }
}
