//! `linkwatch` -- internet link speed monitor.
//!
//! Runs a speed test every few minutes, keeps a rolling window of the
//! results, and notifies the ISP (mail) and any configured webhook when the
//! rolling averages fall below the tolerated share of the advertised speeds.
//!
//! # Environment variables
//!
//! | Variable        | Required | Default | Description                          |
//! |-----------------|----------|---------|--------------------------------------|
//! | `SMTP_HOST`     | no       | --      | Relay host; mail is disabled if unset |
//! | `SMTP_PORT`     | no       | `587`   | Relay port                           |
//! | `SMTP_FROM`     | with host| --      | Sender address                       |
//! | `SMTP_USER`     | no       | `SMTP_FROM` | Login name                       |
//! | `SMTP_PASSWORD` | no       | --      | Authenticate only when set           |
//! | `ISP_EMAIL`     | with host| --      | Recipient address                    |
//! | `MAIL_SUBJECT`  | no       | built-in | Subject line                        |
//! | `MAIL_BODY_FILE`| no       | built-in | Path to a body template             |
//! | `CONTRACT_NO`   | no       | empty   | Contract number quoted in the body   |
//! | `WEBHOOK_URL`   | no       | --      | POST a JSON event here as well       |
//!
//! Monitor settings are command-line flags; see `linkwatch --help`.

use std::process::ExitCode;

use clap::Parser;
use linkwatch_agent::cli::Args;
use linkwatch_agent::monitor::{Monitor, TickOutcome};
use linkwatch_agent::telemetry;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    if let Err(e) = telemetry::init(&args.log_file) {
        eprintln!("linkwatch: {e:#}");
        return ExitCode::FAILURE;
    }

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "linkwatch exiting");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = args.monitor_config()?;
    let probe = args.probe()?;
    let dispatcher = args.dispatcher()?;

    tracing::info!(
        up = config.advertised_upload(),
        down = config.advertised_download(),
        min_runs = config.min_runs(),
        tolerance_percent = config.tolerance().percent(),
        interval_secs = config.interval().as_secs(),
        max_window = ?config.max_window(),
        probe = probe.program(),
        handlers = ?dispatcher.handler_names(),
        "Starting linkwatch",
    );

    let mut monitor = Monitor::new(probe, dispatcher, config).with_options(args.monitor_options());

    if args.once {
        let outcome = monitor.tick().await?;
        match outcome {
            TickOutcome::WarmingUp { samples } => {
                tracing::info!(samples, "Single measurement recorded, window not yet evaluated")
            }
            TickOutcome::Healthy(evaluation) => {
                tracing::info!(?evaluation, "Link within tolerance")
            }
            TickOutcome::Degraded { evaluation, delivered } => {
                tracing::info!(?evaluation, delivered, "Link degraded")
            }
        }
        return Ok(());
    }

    let cancel = CancellationToken::new();
    tokio::spawn(shutdown_signal(cancel.clone()));

    monitor.run(cancel).await?;
    Ok(())
}

/// Cancel `token` on Ctrl+C or SIGTERM.
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        () = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }

    token.cancel();
}
