//! The notification handler capability.

use async_trait::async_trait;
use linkwatch_core::chart::ChartError;
use linkwatch_core::{evaluate, Evaluation, MonitorConfig, WindowError, WindowSnapshot};

use crate::delivery::email::EmailError;
use crate::delivery::webhook::WebhookError;

// ---------------------------------------------------------------------------
// Notification
// ---------------------------------------------------------------------------

/// Everything a handler gets to see about a degradation event.
///
/// Borrowed for the duration of a single dispatch and never retained.
#[derive(Debug, Clone, Copy)]
pub struct Notification<'a> {
    pub snapshot: &'a WindowSnapshot,
    pub config: &'a MonitorConfig,
}

impl<'a> Notification<'a> {
    pub fn new(snapshot: &'a WindowSnapshot, config: &'a MonitorConfig) -> Self {
        Self { snapshot, config }
    }

    /// Re-evaluate the snapshot; handy for handlers that report averages.
    pub fn evaluation(&self) -> Result<Evaluation, WindowError> {
        evaluate(self.snapshot, self.config)
    }
}

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for a failed notification delivery.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error(transparent)]
    Email(#[from] EmailError),

    #[error(transparent)]
    Webhook(#[from] WebhookError),

    #[error("Chart rendering failed: {0}")]
    Chart(#[from] ChartError),

    #[error("Summary rendering failed: {0}")]
    Summary(#[from] WindowError),

    /// Failure reported by a handler outside this crate.
    #[error("{0}")]
    Other(String),
}

// ---------------------------------------------------------------------------
// ActionHandler
// ---------------------------------------------------------------------------

/// A notification backend invoked when the monitored link is degraded.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    /// Short name used in logs and errors, e.g. `"mail"`.
    fn name(&self) -> &str;

    /// Deliver a notification for the given window and configuration.
    async fn perform_action(&self, notification: &Notification<'_>) -> Result<(), DeliveryError>;
}
