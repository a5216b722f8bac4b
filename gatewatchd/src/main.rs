mod capture;
mod cli;
mod clock;
mod config;
mod engine;
mod record;
mod report;
mod window;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use anyhow::{Context, Result};
use crate::capture::Capture;
use crate::cli::Cli;
use crate::clock::SystemClock;
use crate::config::{Config, SourceKind};
use crate::engine::{Engine, StopReason};
use crate::report::{ReportHandle, Reporter};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries only reports
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("gatewatchd=info"))
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting gatewatchd");

    let cli = Cli::parse();
    let mut config = Config::load_or_default(cli.config.as_deref())
        .context("Failed to load config")?;
    config.apply_overrides(&cli);
    config.validate().context("Invalid configuration")?;

    tracing::info!(
        mode = %config.mode,
        interval_secs = config.window.interval_secs,
        top_n = config.window.top_n,
        "Loaded config"
    );

    let host = hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string());

    // Start report writer thread
    let output = ReportHandle::spawn(std::io::stdout());
    let reporter = Reporter::new(host, config.window.top_n);
    let mut engine = Engine::new(
        config.mode,
        config.window.interval(),
        reporter,
        output.clone(),
        SystemClock,
    );

    // Cancellation token for operator-requested stop
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        match shutdown_signal().await {
            Ok(()) => {
                tracing::info!("Shutdown signal received");
                signal_cancel.cancel();
            }
            Err(e) => tracing::error!("Failed to listen for shutdown signal: {:#}", e),
        }
    });

    match config.capture.source {
        SourceKind::Stdin => {
            engine.run(capture::stdin_lines(), &cancel).await?;
            output.shutdown().await?;
        }
        SourceKind::Tcpdump => {
            let (capture, lines) = Capture::spawn(&config)?;
            let reason = engine.run(lines, &cancel).await?;
            output.shutdown().await?;

            // The capture may see the terminal's SIGINT and close its output
            // before the token fires; that is still an interruption.
            let interrupted = reason == StopReason::Interrupted || cancel.is_cancelled();
            capture.finish(interrupted).await?;
        }
    }

    tracing::info!(state = ?engine.state(), "Shutdown complete");
    Ok(())
}

#[cfg(unix)]
async fn shutdown_signal() -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())
        .context("Failed to listen for SIGTERM")?;

    tokio::select! {
        result = tokio::signal::ctrl_c() => result.context("Failed to listen for ctrl-c")?,
        _ = terminate.recv() => {}
    }
    Ok(())
}

#[cfg(not(unix))]
async fn shutdown_signal() -> Result<()> {
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")
}
