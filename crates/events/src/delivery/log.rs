//! Log-only handler used for dry runs.

use async_trait::async_trait;

use crate::handler::{ActionHandler, DeliveryError, Notification};

/// Writes the notification to the log instead of delivering it anywhere.
#[derive(Debug, Default)]
pub struct LogHandler;

#[async_trait]
impl ActionHandler for LogHandler {
    fn name(&self) -> &str {
        "log"
    }

    async fn perform_action(&self, notification: &Notification<'_>) -> Result<(), DeliveryError> {
        let evaluation = notification.evaluation()?;
        tracing::warn!(
            samples = notification.snapshot.len(),
            avg_upload = evaluation.avg_upload,
            avg_download = evaluation.avg_download,
            upload_threshold = notification.config.upload_threshold(),
            download_threshold = notification.config.download_threshold(),
            "Degradation detected (dry run, nothing delivered)"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use linkwatch_core::{MonitorConfig, Sample, WindowSnapshot};

    use super::*;

    #[tokio::test]
    async fn logs_without_failing() {
        let snapshot = WindowSnapshot::from_samples(&[Sample::now(1.0, 1.0)]);
        let config = MonitorConfig::default();
        assert!(LogHandler
            .perform_action(&Notification::new(&snapshot, &config))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn empty_snapshot_is_rejected() {
        let snapshot = WindowSnapshot::from_samples(&[]);
        let config = MonitorConfig::default();
        let result = LogHandler
            .perform_action(&Notification::new(&snapshot, &config))
            .await;
        assert_matches!(result, Err(DeliveryError::Summary(_)));
    }
}
