//! # Notify Module
//!
//! The outbound notification sink and the detached dispatcher.
//!
//! The tracker produces at most one `NotificationIntent` per entry. The
//! `Dispatcher` hands it to a `NotificationSink` on a spawned task bounded
//! by a timeout:
//! - never retried
//! - failures and timeouts are logged, never propagated to the reporter
//! - a slow sink cannot delay subsequent location reports

mod twilio;

pub use twilio::TwilioSink;

use crate::config::Config;
use async_trait::async_trait;
use geowatch_core::NotificationIntent;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;

// =============================================================================
// ERROR TYPE
// =============================================================================

/// Errors from a notification sink.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with an error status.
    #[error("provider rejected message (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    /// The send did not complete in time.
    #[error("notification timed out after {0:?}")]
    Timeout(Duration),
}

// =============================================================================
// SINK
// =============================================================================

/// Identifier returned by the provider for an accepted message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryId(pub String);

impl fmt::Display for DeliveryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An outbound messaging capability.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Send `body` to `recipient`.
    async fn send(&self, body: &str, recipient: &str) -> Result<DeliveryId, NotifyError>;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// Sink used when no messaging credentials are configured.
///
/// Logs the alert and returns a synthetic delivery id.
#[derive(Debug, Default)]
pub struct LogSink {
    sent: AtomicU64,
}

impl LogSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NotificationSink for LogSink {
    async fn send(&self, body: &str, recipient: &str) -> Result<DeliveryId, NotifyError> {
        let n = self.sent.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::info!(recipient, body, "alert (log sink)");
        Ok(DeliveryId(format!("log-{}", n)))
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

// =============================================================================
// DISPATCHER
// =============================================================================

/// Fire-and-forget delivery of notification intents.
#[derive(Clone)]
pub struct Dispatcher {
    sink: Arc<dyn NotificationSink>,
    recipient: String,
    timeout: Duration,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("sink", &self.sink.name())
            .field("recipient", &self.recipient)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Dispatcher {
    #[must_use]
    pub fn new(
        sink: Arc<dyn NotificationSink>,
        recipient: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            sink,
            recipient: recipient.into(),
            timeout,
        }
    }

    /// Twilio when credentials are configured, otherwise the log sink.
    pub fn from_config(config: &Config) -> Result<Self, NotifyError> {
        match &config.twilio {
            Some(twilio) => Ok(Self::new(
                Arc::new(TwilioSink::new(twilio)?),
                twilio.to.clone(),
                config.notify_timeout,
            )),
            None => {
                tracing::warn!("messaging credentials not configured; alerts will only be logged");
                Ok(Self::new(Arc::new(LogSink::new()), "log", config.notify_timeout))
            }
        }
    }

    /// Spawn one delivery attempt for `intent`.
    ///
    /// Must be called from within a tokio runtime. Callers normally drop the
    /// handle; it is returned so tests can observe the result.
    pub fn dispatch(
        &self,
        intent: NotificationIntent,
    ) -> JoinHandle<Result<DeliveryId, NotifyError>> {
        let sink = Arc::clone(&self.sink);
        let recipient = self.recipient.clone();
        let timeout = self.timeout;

        tokio::spawn(async move {
            let body = intent.message();
            let result = match tokio::time::timeout(timeout, sink.send(&body, &recipient)).await {
                Ok(result) => result,
                Err(_) => Err(NotifyError::Timeout(timeout)),
            };

            match &result {
                Ok(id) => tracing::info!(
                    tag = %intent.tag,
                    authorized = intent.authorized,
                    sink = sink.name(),
                    delivery_id = %id,
                    "alert sent"
                ),
                Err(e) => tracing::error!(
                    tag = %intent.tag,
                    authorized = intent.authorized,
                    sink = sink.name(),
                    error = %e,
                    "notification dispatch failed"
                ),
            }

            result
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
