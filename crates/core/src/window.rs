//! Sliding window of recent speed samples.
//!
//! [`SlidingWindow`] keeps uploads, downloads and timestamps in three
//! parallel FIFO queues that always have the same length. It is the only
//! type allowed to mutate them, so that invariant lives in one place.
//! Consumers that must not observe later mutation get a [`WindowSnapshot`].

use std::collections::VecDeque;

use serde::Serialize;

use crate::error::WindowError;
use crate::sample::Sample;
use crate::types::{Mbps, Timestamp};

// ---------------------------------------------------------------------------
// WindowView
// ---------------------------------------------------------------------------

/// Read-only access to the values of a window, live or snapshotted.
pub trait WindowView {
    /// Number of samples currently held.
    fn sample_count(&self) -> usize;

    /// Upload values, oldest first.
    fn upload_values(&self) -> impl Iterator<Item = Mbps> + '_;

    /// Download values, oldest first.
    fn download_values(&self) -> impl Iterator<Item = Mbps> + '_;

    /// Mean upload throughput, or `None` for an empty window.
    fn mean_upload(&self) -> Option<Mbps> {
        mean(self.upload_values(), self.sample_count())
    }

    /// Mean download throughput, or `None` for an empty window.
    fn mean_download(&self) -> Option<Mbps> {
        mean(self.download_values(), self.sample_count())
    }
}

fn mean(values: impl Iterator<Item = Mbps>, count: usize) -> Option<Mbps> {
    if count == 0 {
        return None;
    }
    Some(values.sum::<Mbps>() / count as f64)
}

// ---------------------------------------------------------------------------
// SlidingWindow
// ---------------------------------------------------------------------------

/// FIFO window of samples stored as three index-aligned queues.
#[derive(Debug, Clone, Default)]
pub struct SlidingWindow {
    uploads: VecDeque<Mbps>,
    downloads: VecDeque<Mbps>,
    timestamps: VecDeque<Timestamp>,
    /// When set, `record` drops the oldest sample before exceeding this size.
    capacity: Option<usize>,
}

impl SlidingWindow {
    /// Create an unbounded window.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a window that never holds more than `capacity` samples.
    ///
    /// A capacity of zero is treated as one; a window must be able to hold
    /// the sample it was just given.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            uploads: VecDeque::with_capacity(capacity),
            downloads: VecDeque::with_capacity(capacity),
            timestamps: VecDeque::with_capacity(capacity),
            capacity: Some(capacity),
        }
    }

    /// The growth cap, if any.
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Append a sample at the tail.
    ///
    /// Returns the sample that was dropped to respect the capacity, if any.
    pub fn record(&mut self, sample: Sample) -> Option<Sample> {
        let dropped = match self.capacity {
            Some(cap) if self.len() >= cap => self.pop_front(),
            _ => None,
        };
        self.uploads.push_back(sample.upload_mbps);
        self.downloads.push_back(sample.download_mbps);
        self.timestamps.push_back(sample.timestamp);
        dropped
    }

    /// Remove and return the oldest sample.
    pub fn evict_oldest(&mut self) -> Result<Sample, WindowError> {
        self.pop_front().ok_or(WindowError::Empty)
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Copy the current contents into an owned, immutable snapshot.
    pub fn snapshot(&self) -> WindowSnapshot {
        WindowSnapshot {
            uploads: self.uploads.iter().copied().collect(),
            downloads: self.downloads.iter().copied().collect(),
            timestamps: self.timestamps.iter().copied().collect(),
        }
    }

    /// Pop index 0 from all three queues, or from none of them.
    ///
    /// Only `record` and this method touch the queues, so either all three
    /// are empty or none is.
    fn pop_front(&mut self) -> Option<Sample> {
        if self.is_empty() {
            return None;
        }
        let up = self.uploads.pop_front()?;
        let down = self.downloads.pop_front()?;
        let ts = self.timestamps.pop_front()?;
        Some(Sample::new(up, down, ts))
    }
}

impl WindowView for SlidingWindow {
    fn sample_count(&self) -> usize {
        self.len()
    }

    fn upload_values(&self) -> impl Iterator<Item = Mbps> + '_ {
        self.uploads.iter().copied()
    }

    fn download_values(&self) -> impl Iterator<Item = Mbps> + '_ {
        self.downloads.iter().copied()
    }
}

// ---------------------------------------------------------------------------
// WindowSnapshot
// ---------------------------------------------------------------------------

/// Owned copy of a window handed to evaluators and notification handlers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowSnapshot {
    uploads: Vec<Mbps>,
    downloads: Vec<Mbps>,
    timestamps: Vec<Timestamp>,
}

impl WindowSnapshot {
    /// Build a snapshot directly from samples, oldest first.
    pub fn from_samples(samples: &[Sample]) -> Self {
        Self {
            uploads: samples.iter().map(|s| s.upload_mbps).collect(),
            downloads: samples.iter().map(|s| s.download_mbps).collect(),
            timestamps: samples.iter().map(|s| s.timestamp).collect(),
        }
    }

    pub fn uploads(&self) -> &[Mbps] {
        &self.uploads
    }

    pub fn downloads(&self) -> &[Mbps] {
        &self.downloads
    }

    pub fn timestamps(&self) -> &[Timestamp] {
        &self.timestamps
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Timestamps of the oldest and newest sample.
    pub fn time_range(&self) -> Option<(Timestamp, Timestamp)> {
        Some((*self.timestamps.first()?, *self.timestamps.last()?))
    }

    /// Iterate the snapshot as samples, oldest first.
    pub fn samples(&self) -> impl Iterator<Item = Sample> + '_ {
        self.uploads
            .iter()
            .zip(&self.downloads)
            .zip(&self.timestamps)
            .map(|((up, down), ts)| Sample::new(*up, *down, *ts))
    }
}

impl WindowView for WindowSnapshot {
    fn sample_count(&self) -> usize {
        self.len()
    }

    fn upload_values(&self) -> impl Iterator<Item = Mbps> + '_ {
        self.uploads.iter().copied()
    }

    fn download_values(&self) -> impl Iterator<Item = Mbps> + '_ {
        self.downloads.iter().copied()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
