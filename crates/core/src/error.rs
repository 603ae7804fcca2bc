#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Contract violations on the sliding window.
///
/// The monitor loop sequences its calls so that neither variant should occur
/// in practice; they exist so misuse surfaces as an error instead of a panic.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WindowError {
    /// `evict_oldest` was called on a window with no samples.
    #[error("cannot evict from an empty window")]
    Empty,

    /// `evaluate` was called on a window with no samples.
    #[error("cannot evaluate an empty window")]
    InsufficientData,
}
