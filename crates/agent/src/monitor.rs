//! The measurement loop.
//!
//! [`Monitor`] owns the sliding window and drives one measurement per
//! [`tick`](Monitor::tick). Once the window holds at least `min_runs`
//! samples every tick evaluates it; a degraded window is handed to the
//! dispatcher and then its oldest sample is evicted. [`run`](Monitor::run)
//! repeats ticks every `interval` until the cancellation token fires.

use std::future::Future;
use std::time::Duration;

use linkwatch_core::{evaluate, Evaluation, MonitorConfig, SlidingWindow, WindowError};
use linkwatch_events::{DispatchError, Notification, NotificationDispatcher};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::probe::{ProbeError, SpeedProbe};

// ---------------------------------------------------------------------------
// Options and outcomes
// ---------------------------------------------------------------------------

/// What [`Monitor::run`] does with a failed tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop the loop and return the error.
    #[default]
    Propagate,
    /// Log the error and carry on with the next tick.
    SkipTick,
}

/// Runtime knobs that are not part of the evaluation settings.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonitorOptions {
    pub probe_timeout: Option<Duration>,
    pub dispatch_timeout: Option<Duration>,
    pub failure_policy: FailurePolicy,
}

/// Whether the window is large enough to be evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    WarmingUp,
    Monitoring,
}

/// Result of a single tick.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Not enough samples yet; nothing was evaluated.
    WarmingUp { samples: usize },
    Healthy(Evaluation),
    /// Handlers were notified and the oldest sample was evicted.
    Degraded {
        evaluation: Evaluation,
        delivered: usize,
    },
}

/// The step a timeout fired in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Probe,
    Dispatch,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Probe => f.write_str("probe"),
            Self::Dispatch => f.write_str("dispatch"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("Measurement failed: {0}")]
    Probe(#[from] ProbeError),

    #[error("Window error: {0}")]
    Window(#[from] WindowError),

    #[error("Notification failed: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("{stage} timed out after {limit:?}")]
    Timeout { stage: Stage, limit: Duration },
}

// ---------------------------------------------------------------------------
// Monitor
// ---------------------------------------------------------------------------

pub struct Monitor<P> {
    probe: P,
    window: SlidingWindow,
    dispatcher: NotificationDispatcher,
    config: MonitorConfig,
    options: MonitorOptions,
    span: tracing::Span,
    ticks: u64,
}

impl<P: SpeedProbe> Monitor<P> {
    pub fn new(probe: P, dispatcher: NotificationDispatcher, config: MonitorConfig) -> Self {
        let window = match config.max_window() {
            Some(cap) => SlidingWindow::with_capacity(cap),
            None => SlidingWindow::new(),
        };
        let span = tracing::info_span!(
            "monitor",
            up = config.advertised_upload(),
            down = config.advertised_download(),
            min_runs = config.min_runs(),
        );
        Self {
            probe,
            window,
            dispatcher,
            config,
            options: MonitorOptions::default(),
            span,
            ticks: 0,
        }
    }

    pub fn with_options(mut self, options: MonitorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn window(&self) -> &SlidingWindow {
        &self.window
    }

    /// Number of ticks attempted so far, including failed ones.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn state(&self) -> MonitorState {
        if self.window.len() >= self.config.min_runs() {
            MonitorState::Monitoring
        } else {
            MonitorState::WarmingUp
        }
    }

    /// Measure once, record, and evaluate if the window is warm.
    ///
    /// A failure leaves the window as it was after the last successful step:
    /// a failed probe records nothing, and a failed dispatch skips eviction.
    pub async fn tick(&mut self) -> Result<TickOutcome, MonitorError> {
        let span = tracing::debug_span!(parent: &self.span, "tick", n = self.ticks);
        self.ticks += 1;
        self.tick_inner().instrument(span).await
    }

    async fn tick_inner(&mut self) -> Result<TickOutcome, MonitorError> {
        let sample = with_limit(Stage::Probe, self.options.probe_timeout, self.probe.measure())
            .await??;
        tracing::debug!(
            upload = sample.upload_mbps,
            download = sample.download_mbps,
            "Recorded measurement"
        );

        if let Some(dropped) = self.window.record(sample) {
            tracing::debug!(timestamp = %dropped.timestamp, "Window full, dropped oldest sample");
        }

        if self.state() == MonitorState::WarmingUp {
            tracing::debug!(
                samples = self.window.len(),
                min_runs = self.config.min_runs(),
                "Warming up"
            );
            return Ok(TickOutcome::WarmingUp {
                samples: self.window.len(),
            });
        }

        let evaluation = evaluate(&self.window, &self.config)?;
        if !evaluation.is_degraded() {
            tracing::debug!(
                avg_upload = evaluation.avg_upload,
                avg_download = evaluation.avg_download,
                "Link within tolerance"
            );
            return Ok(TickOutcome::Healthy(evaluation));
        }

        tracing::info!(
            avg_upload = evaluation.avg_upload,
            avg_download = evaluation.avg_download,
            upload_degraded = evaluation.upload_degraded,
            download_degraded = evaluation.download_degraded,
            "Link degraded, notifying"
        );

        let snapshot = self.window.snapshot();
        let notification = Notification::new(&snapshot, &self.config);
        let delivered = with_limit(
            Stage::Dispatch,
            self.options.dispatch_timeout,
            self.dispatcher.dispatch(&notification),
        )
        .await??;

        self.window.evict_oldest()?;
        tracing::info!(delivered, samples = self.window.len(), "Notifications sent");

        Ok(TickOutcome::Degraded {
            evaluation,
            delivered,
        })
    }

    /// Tick every `interval` until `cancel` fires.
    ///
    /// Cancellation is honoured before each tick and during the sleep, not
    /// in the middle of a measurement or delivery.
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<(), MonitorError> {
        let interval = self.config.interval();
        tracing::info!(parent: &self.span, interval_secs = interval.as_secs(), "Monitor started");

        loop {
            if cancel.is_cancelled() {
                break;
            }

            if let Err(e) = self.tick().await {
                match self.options.failure_policy {
                    FailurePolicy::Propagate => {
                        tracing::error!(parent: &self.span, error = %e, "Tick failed, stopping");
                        return Err(e);
                    }
                    FailurePolicy::SkipTick => {
                        tracing::error!(parent: &self.span, error = %e, "Tick failed, continuing");
                    }
                }
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }

        tracing::info!(parent: &self.span, ticks = self.ticks, "Monitor stopped");
        Ok(())
    }
}

/// Await `fut`, bounded by `limit` when one is set.
async fn with_limit<T>(
    stage: Stage,
    limit: Option<Duration>,
    fut: impl Future<Output = T>,
) -> Result<T, MonitorError> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| MonitorError::Timeout { stage, limit }),
        None => Ok(fut.await),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_display() {
        assert_eq!(Stage::Probe.to_string(), "probe");
        assert_eq!(Stage::Dispatch.to_string(), "dispatch");
    }

    #[test]
    fn timeout_error_names_stage() {
        let err = MonitorError::Timeout {
            stage: Stage::Dispatch,
            limit: Duration::from_secs(30),
        };
        assert_eq!(err.to_string(), "dispatch timed out after 30s");
    }

    #[test]
    fn default_options_have_no_limits() {
        let options = MonitorOptions::default();
        assert!(options.probe_timeout.is_none());
        assert!(options.dispatch_timeout.is_none());
        assert_eq!(options.failure_policy, FailurePolicy::Propagate);
    }

    #[tokio::test]
    async fn with_limit_passes_through_without_limit() {
        let value = with_limit(Stage::Probe, None, async { 7 }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn with_limit_times_out() {
        let result = with_limit(
            Stage::Probe,
            Some(Duration::from_millis(10)),
            tokio::time::sleep(Duration::from_secs(5)),
        )
        .await;
        assert!(matches!(
            result,
            Err(MonitorError::Timeout { stage: Stage::Probe, .. })
        ));
    }
}
