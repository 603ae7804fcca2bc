//! Immutable monitor configuration.
//!
//! A [`MonitorConfig`] is validated once at construction and never changes
//! afterwards; the loop, the evaluator and every notification handler read
//! the same instance.

use std::time::Duration;

use crate::error::CoreError;
use crate::threshold_validation::{validate_positive, validate_unit_range};
use crate::types::Mbps;

/// Default advertised upload speed in Mbps.
pub const DEFAULT_ADVERTISED_UPLOAD: Mbps = 20.0;

/// Default advertised download speed in Mbps.
pub const DEFAULT_ADVERTISED_DOWNLOAD: Mbps = 100.0;

/// Default number of samples required before evaluation starts.
pub const DEFAULT_MIN_RUNS: usize = 5;

/// Default pause between speed tests.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Default tolerance in whole percent.
pub const DEFAULT_TOLERANCE_PERCENT: u8 = 50;

// ---------------------------------------------------------------------------
// Tolerance
// ---------------------------------------------------------------------------

/// Minimum acceptable fraction of the advertised speed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance(f64);

impl Tolerance {
    /// Build from a fraction in `[0.0, 1.0]`.
    pub fn from_fraction(fraction: f64) -> Result<Self, CoreError> {
        validate_unit_range(fraction, "tolerance")?;
        Ok(Self(fraction))
    }

    /// Build from a whole percentage, `0..=100`.
    pub fn from_percent(percent: u8) -> Result<Self, CoreError> {
        if percent > 100 {
            return Err(CoreError::Validation(format!(
                "tolerance must be between 0 and 100 percent, got {percent}"
            )));
        }
        Ok(Self(f64::from(percent) / 100.0))
    }

    pub fn fraction(self) -> f64 {
        self.0
    }

    pub fn percent(self) -> f64 {
        self.0 * 100.0
    }

    /// The lowest acceptable throughput for an advertised speed.
    pub fn threshold(self, advertised: Mbps) -> Mbps {
        self.0 * advertised
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self(f64::from(DEFAULT_TOLERANCE_PERCENT) / 100.0)
    }
}

// ---------------------------------------------------------------------------
// MonitorConfig
// ---------------------------------------------------------------------------

/// Monitor settings fixed for the lifetime of the process.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    advertised_upload: Mbps,
    advertised_download: Mbps,
    min_runs: usize,
    interval: Duration,
    tolerance: Tolerance,
    max_window: Option<usize>,
}

impl MonitorConfig {
    /// Validate and build a configuration without a window cap.
    pub fn new(
        advertised_upload: Mbps,
        advertised_download: Mbps,
        min_runs: usize,
        interval: Duration,
        tolerance: Tolerance,
    ) -> Result<Self, CoreError> {
        validate_positive(advertised_upload, "advertised_upload")?;
        validate_positive(advertised_download, "advertised_download")?;
        if min_runs == 0 {
            return Err(CoreError::Validation(
                "min_runs must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            advertised_upload,
            advertised_download,
            min_runs,
            interval,
            tolerance,
            max_window: None,
        })
    }

    /// Cap the window at `max_window` samples.
    ///
    /// The cap must leave room for `min_runs` samples, otherwise the
    /// monitor could never leave warm-up.
    pub fn with_max_window(mut self, max_window: usize) -> Result<Self, CoreError> {
        if max_window < self.min_runs {
            return Err(CoreError::Validation(format!(
                "max_window ({max_window}) must be at least min_runs ({})",
                self.min_runs
            )));
        }
        self.max_window = Some(max_window);
        Ok(self)
    }

    pub fn advertised_upload(&self) -> Mbps {
        self.advertised_upload
    }

    pub fn advertised_download(&self) -> Mbps {
        self.advertised_download
    }

    pub fn min_runs(&self) -> usize {
        self.min_runs
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn tolerance(&self) -> Tolerance {
        self.tolerance
    }

    pub fn max_window(&self) -> Option<usize> {
        self.max_window
    }

    /// Upload throughput below which the window counts as degraded.
    pub fn upload_threshold(&self) -> Mbps {
        self.tolerance.threshold(self.advertised_upload)
    }

    /// Download throughput below which the window counts as degraded.
    pub fn download_threshold(&self) -> Mbps {
        self.tolerance.threshold(self.advertised_download)
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            advertised_upload: DEFAULT_ADVERTISED_UPLOAD,
            advertised_download: DEFAULT_ADVERTISED_DOWNLOAD,
            min_runs: DEFAULT_MIN_RUNS,
            interval: DEFAULT_INTERVAL,
            tolerance: Tolerance::default(),
            max_window: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
