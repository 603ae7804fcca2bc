/// All sample timestamps are UTC; conversion to local time happens only
/// when rendering labels for humans.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Throughput in megabits per second.
pub type Mbps = f64;
