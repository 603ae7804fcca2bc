//! Domain core for the linkwatch bandwidth monitor.
//!
//! Everything in this crate is synchronous and free of I/O apart from
//! reading a summary template from disk:
//!
//! - [`window`] -- the sliding window of recent speed samples.
//! - [`evaluator`] -- rolling-average degradation check.
//! - [`config`] -- validated, immutable monitor configuration.
//! - [`chart`] -- PNG line chart of a window snapshot.
//! - [`report`] -- plain-text summary rendered from a template.

pub mod chart;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod report;
pub mod sample;
pub mod threshold_validation;
pub mod types;
pub mod window;

pub use config::{MonitorConfig, Tolerance};
pub use error::{CoreError, WindowError};
pub use evaluator::{evaluate, Evaluation};
pub use sample::Sample;
pub use window::{SlidingWindow, WindowSnapshot, WindowView};
