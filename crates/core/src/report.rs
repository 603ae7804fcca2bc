//! Plain-text degradation summary.
//!
//! The summary is rendered from a template with `{name}` placeholders so
//! operators can word the message to their provider however they like. The
//! built-in [`DEFAULT_BODY_TEMPLATE`] is used when none is configured.
//!
//! | Placeholder     | Value                                         |
//! |-----------------|-----------------------------------------------|
//! | `{contract_no}` | Customer/contract number, may be empty        |
//! | `{up}`          | Advertised upload speed (Mbps)                |
//! | `{down}`        | Advertised download speed (Mbps)              |
//! | `{runs}`        | Configured number of runs averaged            |
//! | `{start}`       | Local time of the oldest sample               |
//! | `{end}`         | Local time of the newest sample               |
//! | `{avg_up}`      | Rolling average upload (Mbps, 2 decimals)     |
//! | `{avg_down}`    | Rolling average download (Mbps, 2 decimals)   |
//! | `{dates}`       | Calendar dates covered, e.g. `16 Oct 2026`    |

use std::collections::BTreeSet;
use std::path::Path;

use chrono::Local;

use crate::config::MonitorConfig;
use crate::error::{CoreError, WindowError};
use crate::types::Mbps;
use crate::window::{WindowSnapshot, WindowView};

/// Default subject line for notification messages.
pub const DEFAULT_SUBJECT: &str = "Internet connection below advertised speed";

/// Default message body.
pub const DEFAULT_BODY_TEMPLATE: &str = "\
Dear Sir or Madam,

my internet connection (contract no. {contract_no}) is advertised with \
{down} Mbps download and {up} Mbps upload.

Between {start} and {end} I ran an automated speed test every few minutes. \
Averaged over the last {runs} tests the connection only reached \
{avg_down} Mbps download and {avg_up} Mbps upload.

The attached chart shows the individual measurements against the \
advertised speeds. Please look into this.

Kind regards
";

const TIMESTAMP_FORMAT: &str = "%e %b %Y, %H:%M:%S";
const DATE_FORMAT: &str = "%e %b %Y";

/// Read a body template from disk.
pub fn load_template(path: impl AsRef<Path>) -> Result<String, CoreError> {
    Ok(std::fs::read_to_string(path)?)
}

/// Render the summary for `snapshot` into `template`.
///
/// Unknown placeholders are left untouched.
pub fn render_summary(
    template: &str,
    snapshot: &WindowSnapshot,
    config: &MonitorConfig,
    contract_no: &str,
) -> Result<String, WindowError> {
    let (start, end) = snapshot.time_range().ok_or(WindowError::InsufficientData)?;
    let avg_up = snapshot.mean_upload().ok_or(WindowError::InsufficientData)?;
    let avg_down = snapshot.mean_download().ok_or(WindowError::InsufficientData)?;

    let values = [
        ("contract_no", contract_no.to_string()),
        ("up", format_speed(config.advertised_upload())),
        ("down", format_speed(config.advertised_download())),
        ("runs", config.min_runs().to_string()),
        ("start", start.with_timezone(&Local).format(TIMESTAMP_FORMAT).to_string()),
        ("end", end.with_timezone(&Local).format(TIMESTAMP_FORMAT).to_string()),
        ("avg_up", format!("{avg_up:.2}")),
        ("avg_down", format!("{avg_down:.2}")),
        ("dates", date_span(snapshot)),
    ];

    Ok(substitute(template, &values))
}

/// Replace `{key}` placeholders in one pass over `template`.
///
/// Substituted values are never scanned again, so a value that itself looks
/// like a placeholder is emitted verbatim.
fn substitute(template: &str, values: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let known = after.find('}').and_then(|close| {
            let key = &after[..close];
            values
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, value)| (close, value))
        });
        match known {
            Some((close, value)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Distinct local calendar dates in the snapshot, oldest first, joined by `-`.
pub fn date_span(snapshot: &WindowSnapshot) -> String {
    let dates: BTreeSet<_> = snapshot
        .timestamps()
        .iter()
        .map(|ts| ts.with_timezone(&Local).date_naive())
        .collect();

    dates
        .iter()
        .map(|d| d.format(DATE_FORMAT).to_string().trim().to_string())
        .collect::<Vec<_>>()
        .join("-")
}

/// Whole numbers print without decimals, anything else with two.
fn format_speed(value: Mbps) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}
