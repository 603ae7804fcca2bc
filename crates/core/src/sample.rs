//! A single throughput measurement.

use serde::Serialize;

use crate::types::{Mbps, Timestamp};

/// One speed-test result: upload and download throughput at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    pub upload_mbps: Mbps,
    pub download_mbps: Mbps,
    pub timestamp: Timestamp,
}

impl Sample {
    pub fn new(upload_mbps: Mbps, download_mbps: Mbps, timestamp: Timestamp) -> Self {
        Self {
            upload_mbps,
            download_mbps,
            timestamp,
        }
    }

    /// Build a sample stamped with the current time.
    pub fn now(upload_mbps: Mbps, download_mbps: Mbps) -> Self {
        Self::new(upload_mbps, download_mbps, chrono::Utc::now())
    }
}
