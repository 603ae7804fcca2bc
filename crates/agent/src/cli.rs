//! Command-line arguments.
//!
//! Every flag can also be supplied through a `LINKWATCH_*` environment
//! variable (or a `.env` file). Delivery backends are configured purely
//! through the environment; see [`MailConfig::from_env`] and
//! [`WebhookConfig::from_env`].

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use linkwatch_core::config::{
    DEFAULT_ADVERTISED_DOWNLOAD, DEFAULT_ADVERTISED_UPLOAD, DEFAULT_MIN_RUNS,
    DEFAULT_TOLERANCE_PERCENT,
};
use linkwatch_core::{CoreError, MonitorConfig, Tolerance};
use linkwatch_events::{
    DispatchPolicy, LogHandler, MailConfig, MailHandler, NotificationDispatcher, WebhookConfig,
    WebhookHandler,
};

use crate::monitor::{FailurePolicy, MonitorOptions};
use crate::probe::{CommandProbe, DEFAULT_PROBE_COMMAND};

/// Default minutes between measurements.
const DEFAULT_INTERVAL_MINUTES: u64 = 10;

/// Watch an internet link and complain to the ISP when it underperforms.
#[derive(Debug, Parser)]
#[command(name = "linkwatch", version, about)]
pub struct Args {
    /// Minutes between speed tests.
    #[arg(short = 'i', long = "interval", env = "LINKWATCH_INTERVAL_MINUTES",
          default_value_t = DEFAULT_INTERVAL_MINUTES,
          value_parser = clap::value_parser!(u64).range(1..))]
    pub interval_minutes: u64,

    /// Advertised upload speed in Mbps.
    #[arg(short = 'u', long = "up", env = "LINKWATCH_ADVERTISED_UP",
          default_value_t = DEFAULT_ADVERTISED_UPLOAD)]
    pub up: f64,

    /// Advertised download speed in Mbps.
    #[arg(short = 'd', long = "down", env = "LINKWATCH_ADVERTISED_DOWN",
          default_value_t = DEFAULT_ADVERTISED_DOWNLOAD)]
    pub down: f64,

    /// Samples required before the window is evaluated.
    #[arg(short = 'r', long = "runs", env = "LINKWATCH_MIN_RUNS",
          default_value_t = DEFAULT_MIN_RUNS)]
    pub runs: usize,

    /// Percentage of the advertised speed that still counts as acceptable.
    #[arg(short = 't', long = "tolerance", env = "LINKWATCH_TOLERANCE",
          default_value_t = DEFAULT_TOLERANCE_PERCENT,
          value_parser = clap::value_parser!(u8).range(0..=99))]
    pub tolerance: u8,

    /// Keep at most this many samples (unbounded when unset).
    #[arg(long, env = "LINKWATCH_MAX_WINDOW")]
    pub max_window: Option<usize>,

    /// Speed-test command; must print a JSON report on stdout.
    #[arg(long, env = "LINKWATCH_PROBE_COMMAND", default_value = DEFAULT_PROBE_COMMAND)]
    pub probe_command: String,

    /// Abort a speed test that runs longer than this.
    #[arg(long, env = "LINKWATCH_PROBE_TIMEOUT_SECS")]
    pub probe_timeout_secs: Option<u64>,

    /// Abort notification delivery that runs longer than this.
    #[arg(long, env = "LINKWATCH_DISPATCH_TIMEOUT_SECS")]
    pub dispatch_timeout_secs: Option<u64>,

    /// Log failed ticks and keep going instead of exiting.
    #[arg(long, env = "LINKWATCH_KEEP_GOING")]
    pub keep_going: bool,

    /// Log degradation instead of sending mail or webhooks.
    #[arg(long, env = "LINKWATCH_DRY_RUN")]
    pub dry_run: bool,

    /// Run a single measurement and exit.
    #[arg(long)]
    pub once: bool,

    /// Append logs to this file.
    #[arg(long, env = "LINKWATCH_LOG_FILE", default_value = "linkwatch.log")]
    pub log_file: PathBuf,
}

impl Args {
    pub fn monitor_config(&self) -> anyhow::Result<MonitorConfig> {
        let tolerance = Tolerance::from_percent(self.tolerance)?;
        let interval_secs = self.interval_minutes.checked_mul(60).ok_or_else(|| {
            CoreError::Validation(format!(
                "interval of {} minutes is too large",
                self.interval_minutes
            ))
        })?;
        let config = MonitorConfig::new(
            self.up,
            self.down,
            self.runs,
            Duration::from_secs(interval_secs),
            tolerance,
        )?;
        match self.max_window {
            Some(cap) => Ok(config.with_max_window(cap)?),
            None => Ok(config),
        }
    }

    pub fn monitor_options(&self) -> MonitorOptions {
        MonitorOptions {
            probe_timeout: self.probe_timeout_secs.map(Duration::from_secs),
            dispatch_timeout: self.dispatch_timeout_secs.map(Duration::from_secs),
            failure_policy: if self.keep_going {
                FailurePolicy::SkipTick
            } else {
                FailurePolicy::Propagate
            },
        }
    }

    pub fn probe(&self) -> anyhow::Result<CommandProbe> {
        CommandProbe::from_command_line(&self.probe_command)
            .with_context(|| format!("invalid probe command {:?}", self.probe_command))
    }

    /// Build the handler registry: mail first, then webhook.
    ///
    /// `--dry-run` replaces both with a [`LogHandler`].
    pub fn dispatcher(&self) -> anyhow::Result<NotificationDispatcher> {
        let policy = if self.keep_going {
            DispatchPolicy::ContinueOnError
        } else {
            DispatchPolicy::FailFast
        };
        let mut dispatcher = NotificationDispatcher::with_policy(policy);

        if self.dry_run {
            dispatcher.register(LogHandler);
            return Ok(dispatcher);
        }

        match MailConfig::from_env().context("invalid mail configuration")? {
            Some(config) => dispatcher.register(MailHandler::new(config)),
            None => tracing::warn!("SMTP_HOST not set, mail notifications disabled"),
        }

        if let Some(config) = WebhookConfig::from_env() {
            let handler =
                WebhookHandler::new(config).context("failed to build webhook client")?;
            dispatcher.register(handler);
        }

        if dispatcher.is_empty() {
            tracing::warn!("No notification backend configured, degradation will only be logged");
            dispatcher.register(LogHandler);
        }

        Ok(dispatcher)
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("linkwatch").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn command_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn defaults_match_core_defaults() {
        let args = parse(&[]);
        let config = args.monitor_config().unwrap();
        assert_eq!(config, MonitorConfig::default());
        assert_eq!(args.log_file, PathBuf::from("linkwatch.log"));
        assert!(!args.once);
    }

    #[test]
    fn short_flags() {
        let args = parse(&["-i", "5", "-u", "10", "-d", "50", "-r", "3", "-t", "80"]);
        let config = args.monitor_config().unwrap();
        assert_eq!(config.interval(), Duration::from_secs(300));
        assert_eq!(config.advertised_upload(), 10.0);
        assert_eq!(config.advertised_download(), 50.0);
        assert_eq!(config.min_runs(), 3);
        assert_eq!(config.upload_threshold(), 8.0);
        assert_eq!(config.download_threshold(), 40.0);
    }

    #[test]
    fn tolerance_above_99_is_rejected() {
        let args = Args::try_parse_from(["linkwatch", "-t", "100"]);
        assert!(args.is_err());
    }

    #[test]
    fn zero_interval_is_rejected() {
        assert!(Args::try_parse_from(["linkwatch", "-i", "0"]).is_err());
    }

    #[test]
    fn oversized_interval_is_an_error_not_an_overflow() {
        let args = parse(&["-i", "307445734561825861"]);
        let err = args.monitor_config().unwrap_err();
        assert!(err.to_string().contains("too large"));

        let largest = (u64::MAX / 60).to_string();
        let config = parse(&["-i", &largest]).monitor_config().unwrap();
        assert_eq!(config.interval(), Duration::from_secs(u64::MAX / 60 * 60));
    }

    #[test]
    fn max_window_below_min_runs_is_rejected() {
        let args = parse(&["-r", "5", "--max-window", "4"]);
        assert!(args.monitor_config().is_err());

        let args = parse(&["-r", "5", "--max-window", "10"]);
        assert_eq!(args.monitor_config().unwrap().max_window(), Some(10));
    }

    #[test]
    fn keep_going_relaxes_both_policies() {
        let args = parse(&["--keep-going", "--dry-run"]);
        assert_eq!(args.monitor_options().failure_policy, FailurePolicy::SkipTick);
        assert_eq!(
            args.dispatcher().unwrap().policy(),
            DispatchPolicy::ContinueOnError
        );

        let args = parse(&["--dry-run"]);
        assert_eq!(args.monitor_options().failure_policy, FailurePolicy::Propagate);
        assert_eq!(args.dispatcher().unwrap().policy(), DispatchPolicy::FailFast);
    }

    #[test]
    fn timeouts_are_optional() {
        let options = parse(&[]).monitor_options();
        assert!(options.probe_timeout.is_none());

        let options = parse(&["--probe-timeout-secs", "120", "--dispatch-timeout-secs", "30"])
            .monitor_options();
        assert_eq!(options.probe_timeout, Some(Duration::from_secs(120)));
        assert_eq!(options.dispatch_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn dry_run_only_logs() {
        let dispatcher = parse(&["--dry-run"]).dispatcher().unwrap();
        assert_eq!(dispatcher.handler_names(), vec!["log"]);
    }

    #[test]
    fn custom_probe_command() {
        let probe = parse(&["--probe-command", "speedtest --format=json"])
            .probe()
            .unwrap();
        assert_eq!(probe.program(), "speedtest");
        assert_eq!(probe.args(), &["--format=json"]);
    }
}
