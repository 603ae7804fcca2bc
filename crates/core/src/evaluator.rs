//! Rolling-average degradation check.
//!
//! [`evaluate`] is a pure function of a window and a configuration: it
//! averages each dimension and compares the averages with the tolerance-scaled
//! advertised speeds. Either dimension falling short marks the window as
//! degraded; there is no hysteresis.

use serde::Serialize;

use crate::config::MonitorConfig;
use crate::error::WindowError;
use crate::types::Mbps;
use crate::window::WindowView;

/// Outcome of evaluating one window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Evaluation {
    pub avg_upload: Mbps,
    pub avg_download: Mbps,
    pub upload_degraded: bool,
    pub download_degraded: bool,
}

impl Evaluation {
    /// True when either dimension is below its threshold.
    pub fn is_degraded(&self) -> bool {
        self.upload_degraded || self.download_degraded
    }
}

/// Evaluate the rolling averages of `window` against `config`.
///
/// Comparison is strict: an average exactly at the threshold is acceptable.
pub fn evaluate(
    window: &impl WindowView,
    config: &MonitorConfig,
) -> Result<Evaluation, WindowError> {
    let avg_upload = window.mean_upload().ok_or(WindowError::InsufficientData)?;
    let avg_download = window.mean_download().ok_or(WindowError::InsufficientData)?;

    Ok(Evaluation {
        avg_upload,
        avg_download,
        upload_degraded: avg_upload < config.upload_threshold(),
        download_degraded: avg_download < config.download_threshold(),
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use assert_matches::assert_matches;

    use super::*;
    use crate::config::Tolerance;
    use crate::sample::Sample;
    use crate::window::SlidingWindow;

    fn config() -> MonitorConfig {
        MonitorConfig::new(
            20.0,
            100.0,
            3,
            Duration::from_secs(60),
            Tolerance::from_fraction(0.5).unwrap(),
        )
        .unwrap()
    }

    fn window_of(uploads: &[f64], downloads: &[f64]) -> SlidingWindow {
        let mut window = SlidingWindow::new();
        for (up, down) in uploads.iter().zip(downloads) {
            window.record(Sample::now(*up, *down));
        }
        window
    }

    #[test]
    fn empty_window_is_insufficient_data() {
        let result = evaluate(&SlidingWindow::new(), &config());
        assert_matches!(result, Err(WindowError::InsufficientData));
    }

    #[test]
    fn healthy_window_is_not_degraded() {
        let window = window_of(&[25.0, 24.0, 23.0], &[120.0, 118.0, 40.0]);
        let eval = evaluate(&window, &config()).unwrap();

        assert_eq!(eval.avg_upload, 24.0);
        assert!((eval.avg_download - 92.666_666).abs() < 1e-3);
        assert!(!eval.is_degraded());
    }

    #[test]
    fn slow_upload_alone_is_degraded() {
        let window = window_of(&[8.0, 9.0, 7.0], &[110.0, 90.0, 95.0]);
        let eval = evaluate(&window, &config()).unwrap();

        assert_eq!(eval.avg_upload, 8.0);
        assert!(eval.upload_degraded);
        assert!(!eval.download_degraded);
        assert!(eval.is_degraded());
    }

    #[test]
    fn slow_download_alone_is_degraded() {
        let window = window_of(&[30.0, 30.0], &[20.0, 30.0]);
        let eval = evaluate(&window, &config()).unwrap();

        assert!(!eval.upload_degraded);
        assert!(eval.download_degraded);
        assert!(eval.is_degraded());
    }

    #[test]
    fn average_exactly_at_threshold_is_not_degraded() {
        let window = window_of(&[10.0, 10.0], &[50.0, 50.0]);
        let eval = evaluate(&window, &config()).unwrap();
        assert!(!eval.is_degraded());
    }

    #[test]
    fn just_below_threshold_is_degraded() {
        let window = window_of(&[9.99], &[50.0]);
        assert!(evaluate(&window, &config()).unwrap().is_degraded());
    }

    #[test]
    fn evaluation_is_pure() {
        let window = window_of(&[8.0, 12.0], &[60.0, 40.0]);
        let first = evaluate(&window, &config()).unwrap();
        let second = evaluate(&window, &config()).unwrap();
        assert_eq!(first, second);
        assert_eq!(window.len(), 2);
    }

    #[test]
    fn snapshot_and_live_window_agree() {
        let window = window_of(&[5.0, 15.0, 25.0], &[100.0, 80.0, 60.0]);
        assert_eq!(
            evaluate(&window, &config()).unwrap(),
            evaluate(&window.snapshot(), &config()).unwrap()
        );
    }

    #[test]
    fn zero_tolerance_never_degrades() {
        let config = MonitorConfig::new(
            20.0,
            100.0,
            1,
            Duration::from_secs(60),
            Tolerance::from_fraction(0.0).unwrap(),
        )
        .unwrap();
        let window = window_of(&[0.0], &[0.0]);
        assert!(!evaluate(&window, &config).unwrap().is_degraded());
    }
}
