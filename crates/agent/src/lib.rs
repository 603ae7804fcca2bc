//! `linkwatch-agent` library crate.
//!
//! Re-exports internal modules for integration testing. The binary
//! entrypoint lives in `main.rs`.

pub mod cli;
pub mod monitor;
pub mod probe;
pub mod telemetry;
