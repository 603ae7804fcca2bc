//! Speed measurement.
//!
//! [`SpeedProbe`] is the seam between the monitor loop and whatever actually
//! measures the link. [`CommandProbe`] shells out to a speed-test CLI that
//! prints a JSON report and understands two report shapes:
//!
//! - `speedtest-cli --json`: top-level `upload`/`download` in bits per second.
//! - Ookla `speedtest --format=json`: `upload.bandwidth`/`download.bandwidth`
//!   in bytes per second.
//!
//! Throughput is truncated to whole Mbps.

use std::future::Future;

use linkwatch_core::types::Mbps;
use linkwatch_core::Sample;
use serde::Deserialize;
use tokio::process::Command;

/// Default speed-test command line.
pub const DEFAULT_PROBE_COMMAND: &str = "speedtest-cli --json";

const BITS_PER_MEGABIT: f64 = 1e6;

/// Error type for speed measurement failures.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("speed test binary not found: {0}")]
    NotFound(std::io::Error),

    #[error("speed test failed (exit code {exit_code:?}): {stderr}")]
    ExecutionFailed {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("failed to parse speed test output: {0}")]
    Parse(String),
}

/// Produces one throughput sample per call.
pub trait SpeedProbe: Send + Sync {
    fn measure(&self) -> impl Future<Output = Result<Sample, ProbeError>> + Send;
}

// ---------------------------------------------------------------------------
// Report parsing
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Bandwidth {
    /// Bytes per second.
    bandwidth: f64,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SpeedReport {
    /// Bits per second.
    Flat { upload: f64, download: f64 },
    Ookla { upload: Bandwidth, download: Bandwidth },
}

impl SpeedReport {
    /// `(upload, download)` in whole Mbps.
    fn to_mbps(&self) -> (Mbps, Mbps) {
        let (up_bits, down_bits) = match self {
            Self::Flat { upload, download } => (*upload, *download),
            Self::Ookla { upload, download } => {
                (upload.bandwidth * 8.0, download.bandwidth * 8.0)
            }
        };
        (
            (up_bits / BITS_PER_MEGABIT).floor(),
            (down_bits / BITS_PER_MEGABIT).floor(),
        )
    }
}

/// Parse a JSON speed-test report into `(upload, download)` Mbps.
pub fn parse_report(stdout: &str) -> Result<(Mbps, Mbps), ProbeError> {
    let report: SpeedReport = serde_json::from_str(stdout.trim())
        .map_err(|e| ProbeError::Parse(format!("{e}: {}", stdout.trim())))?;
    Ok(report.to_mbps())
}

// ---------------------------------------------------------------------------
// CommandProbe
// ---------------------------------------------------------------------------

/// Runs an external speed-test program and parses its JSON output.
#[derive(Debug, Clone)]
pub struct CommandProbe {
    program: String,
    args: Vec<String>,
}

impl CommandProbe {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Split a whitespace-separated command line into program and arguments.
    pub fn from_command_line(command: &str) -> Result<Self, ProbeError> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next().ok_or_else(|| {
            ProbeError::NotFound(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "empty probe command",
            ))
        })?;
        Ok(Self::new(program, parts.collect()))
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl Default for CommandProbe {
    fn default() -> Self {
        Self::new("speedtest-cli", vec!["--json".to_string()])
    }
}

impl SpeedProbe for CommandProbe {
    async fn measure(&self) -> Result<Sample, ProbeError> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(ProbeError::NotFound)?;

        if !output.status.success() {
            return Err(ProbeError::ExecutionFailed {
                exit_code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let (upload, download) = parse_report(&String::from_utf8_lossy(&output.stdout))?;
        Ok(Sample::now(upload, download))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parses_speedtest_cli_report() {
        let json = r#"{"download": 93847234.2, "upload": 19283746.1, "ping": 12.3,
                       "server": {"name": "Somewhere"}}"#;
        assert_eq!(parse_report(json).unwrap(), (19.0, 93.0));
    }

    #[test]
    fn parses_ookla_report() {
        let json = r#"{"type": "result",
                       "download": {"bandwidth": 12500000, "bytes": 1},
                       "upload": {"bandwidth": 2500000, "bytes": 1}}"#;
        assert_eq!(parse_report(json).unwrap(), (20.0, 100.0));
    }

    #[test]
    fn truncates_to_whole_megabits() {
        let json = r#"{"download": 999999.0, "upload": 1999999.0}"#;
        assert_eq!(parse_report(json).unwrap(), (1.0, 0.0));
    }

    #[test]
    fn rejects_garbage() {
        assert_matches!(
            parse_report("Retrieving speedtest.net configuration..."),
            Err(ProbeError::Parse(_))
        );
        assert_matches!(parse_report(r#"{"download": 1.0}"#), Err(ProbeError::Parse(_)));
    }

    #[test]
    fn command_line_is_split_on_whitespace() {
        let probe =
            CommandProbe::from_command_line("speedtest --format=json  --accept-license").unwrap();
        assert_eq!(probe.program(), "speedtest");
        assert_eq!(probe.args(), &["--format=json", "--accept-license"]);
    }

    #[test]
    fn empty_command_line_is_rejected() {
        assert_matches!(CommandProbe::from_command_line("   "), Err(ProbeError::NotFound(_)));
    }

    #[test]
    fn default_matches_default_command_line() {
        let parsed = CommandProbe::from_command_line(DEFAULT_PROBE_COMMAND).unwrap();
        let default = CommandProbe::default();
        assert_eq!(parsed.program(), default.program());
        assert_eq!(parsed.args(), default.args());
    }

    #[tokio::test]
    async fn missing_binary_is_not_found() {
        let probe = CommandProbe::new("linkwatch-no-such-speedtest-binary", Vec::new());
        assert_matches!(probe.measure().await, Err(ProbeError::NotFound(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn measures_from_command_output() {
        let probe = CommandProbe::new(
            "sh",
            vec![
                "-c".to_string(),
                r#"echo '{"download": 50000000, "upload": 10000000}'"#.to_string(),
            ],
        );
        let sample = probe.measure().await.unwrap();
        assert_eq!(sample.upload_mbps, 10.0);
        assert_eq!(sample.download_mbps, 50.0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_is_execution_failure() {
        let probe = CommandProbe::new(
            "sh",
            vec!["-c".to_string(), "echo boom >&2; exit 3".to_string()],
        );
        assert_matches!(
            probe.measure().await,
            Err(ProbeError::ExecutionFailed { exit_code: Some(3), stderr }) if stderr == "boom"
        );
    }
}
