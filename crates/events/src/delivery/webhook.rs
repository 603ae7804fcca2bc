//! Webhook delivery with exponential-backoff retry.
//!
//! [`WebhookHandler`] POSTs a JSON summary of the degraded window to an
//! external URL. Failed attempts are retried up to three times with
//! exponential backoff (1 s, 2 s, 4 s).

use std::time::Duration;

use async_trait::async_trait;
use linkwatch_core::{Evaluation, MonitorConfig, WindowSnapshot};

use crate::handler::{ActionHandler, DeliveryError, Notification};

/// Retry delays in seconds (exponential backoff: 1s, 2s, 4s).
const RETRY_DELAYS_SECS: [u64; 3] = [1, 2, 4];

/// HTTP request timeout for a single delivery attempt.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Event name carried in every payload.
pub const EVENT_TYPE: &str = "bandwidth.degraded";

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for webhook delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The remote server returned a non-2xx status code.
    #[error("Webhook returned HTTP {0}")]
    HttpStatus(u16),
}

// ---------------------------------------------------------------------------
// WebhookConfig
// ---------------------------------------------------------------------------

/// Configuration for the webhook handler.
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub url: String,
}

impl WebhookConfig {
    /// Load from `WEBHOOK_URL`; `None` when unset or empty.
    pub fn from_env() -> Option<Self> {
        let url = std::env::var("WEBHOOK_URL").ok()?;
        if url.trim().is_empty() {
            return None;
        }
        Some(Self { url })
    }
}

// ---------------------------------------------------------------------------
// WebhookHandler
// ---------------------------------------------------------------------------

/// Delivers degradation events to an external webhook endpoint.
pub struct WebhookHandler {
    client: reqwest::Client,
    url: String,
    retry_delays: Vec<Duration>,
}

impl WebhookHandler {
    /// Create a handler with a pre-configured HTTP client.
    pub fn new(config: WebhookConfig) -> Result<Self, WebhookError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            url: config.url,
            retry_delays: RETRY_DELAYS_SECS.iter().copied().map(Duration::from_secs).collect(),
        })
    }

    /// Replace the backoff schedule; one retry per entry.
    pub fn with_retry_delays(mut self, delays: Vec<Duration>) -> Self {
        self.retry_delays = delays;
        self
    }

    /// Deliver a payload with retry.
    ///
    /// Retries once per backoff delay (3 times by default) before giving up.
    /// Returns `Ok(())` on the first successful attempt, otherwise the error
    /// of the final attempt.
    async fn deliver(&self, payload: &serde_json::Value) -> Result<(), WebhookError> {
        for (attempt, delay) in self.retry_delays.iter().enumerate() {
            match self.try_send(payload).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        url = %self.url,
                        error = %e,
                        "Webhook delivery attempt failed, retrying"
                    );
                    tokio::time::sleep(*delay).await;
                }
            }
        }

        // Final attempt after the last backoff.
        match self.try_send(payload).await {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::error!(
                    url = %self.url,
                    error = %e,
                    "Webhook delivery failed after all retries"
                );
                Err(e)
            }
        }
    }

    /// Execute a single POST request and check the response status.
    async fn try_send(&self, payload: &serde_json::Value) -> Result<(), WebhookError> {
        let response = self.client.post(&self.url).json(payload).send().await?;
        if !response.status().is_success() {
            return Err(WebhookError::HttpStatus(response.status().as_u16()));
        }
        Ok(())
    }
}

/// JSON body describing a degraded window.
pub fn build_payload(
    snapshot: &WindowSnapshot,
    config: &MonitorConfig,
    evaluation: &Evaluation,
) -> serde_json::Value {
    serde_json::json!({
        "event_type": EVENT_TYPE,
        "timestamp": chrono::Utc::now(),
        "evaluation": evaluation,
        "advertised": {
            "upload_mbps": config.advertised_upload(),
            "download_mbps": config.advertised_download(),
        },
        "tolerance": config.tolerance().fraction(),
        "min_runs": config.min_runs(),
        "window": snapshot,
    })
}

#[async_trait]
impl ActionHandler for WebhookHandler {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn perform_action(&self, notification: &Notification<'_>) -> Result<(), DeliveryError> {
        let evaluation = notification.evaluation()?;
        let payload = build_payload(notification.snapshot, notification.config, &evaluation);
        self.deliver(&payload).await?;

        tracing::info!(url = %self.url, "Degradation event posted to webhook");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
