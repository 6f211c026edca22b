//! Donation Overlay binary.
//!
//! Connects to the local donation event source and shows goal progress in the
//! terminal, or logs updates to stderr with `--headless`.
//!
//! # Environment Variables
//!
//! See the [`config`](donation_overlay::config) module for available options.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use donation_overlay::client::{ClientOptions, OverlayClient};
use donation_overlay::config::Config;
use donation_overlay::error::OverlayError;
use donation_overlay::settings::OverlaySettings;
use donation_overlay::surface::{LogSurface, WatchSurface, MISSING_API_KEY_MESSAGE};
use donation_overlay::transport::WsTransport;
use donation_overlay::tui::{install_panic_hook, App};

/// Donation Overlay - goal progress for a local donation event source.
#[derive(Parser, Debug)]
#[command(name = "donation-overlay")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "\
ENVIRONMENT VARIABLES:
    DONATION_API_KEY             Credential sent in the auth payload
    DONATION_API_KEY_FILE        Path to an API_Key.js file
    DONATION_SERVER_URL          Event source (default: ws://127.0.0.1:3337/streamlabs)
    DONATION_SETTINGS_PATH       settings.json / settings.js with display settings
    DONATION_RECONNECT_DELAY_MS  Delay between attempts (default: 5000)
    RUST_LOG                     Log filter for --headless (default: info)

EXAMPLES:
    # Terminal overlay
    DONATION_API_KEY=secret donation-overlay

    # Log updates instead of drawing
    DONATION_API_KEY=secret donation-overlay --headless
")]
struct Cli {
    /// Log updates to stderr instead of drawing a terminal overlay.
    #[arg(long)]
    headless: bool,

    /// Event source URL, overriding DONATION_SERVER_URL.
    #[arg(long, value_name = "URL")]
    url: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = Config::from_env().context("Failed to load configuration")?;
    if let Some(url) = cli.url {
        config.server_url = url;
    }

    let settings = match &config.settings_path {
        Some(path) => OverlaySettings::load(path).context("Failed to load display settings")?,
        None => OverlaySettings::default(),
    };

    if cli.headless {
        run_headless(config, settings).await
    } else {
        run_tui(config, settings).await
    }
}

async fn run_headless(config: Config, settings: OverlaySettings) -> Result<ExitCode> {
    init_logging();

    info!(
        server_url = %config.server_url,
        reconnect_delay_ms = config.reconnect_delay.as_millis() as u64,
        "Starting donation overlay"
    );

    let mut client = OverlayClient::new(
        WsTransport::new(),
        LogSurface::new(),
        settings,
        ClientOptions::from(&config),
    );

    tokio::select! {
        result = client.run(config.api_key.clone()) => match result {
            Err(OverlayError::MissingApiKey) => {
                eprintln!("{MISSING_API_KEY_MESSAGE}");
                Ok(ExitCode::FAILURE)
            }
            Err(e) => Err(e.into()),
            Ok(()) => Ok(ExitCode::SUCCESS),
        },
        _ = wait_for_shutdown() => {
            info!("Shutdown signal received");
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run_tui(config: Config, settings: OverlaySettings) -> Result<ExitCode> {
    install_panic_hook();

    let (surface, state_rx) = WatchSurface::new();
    let mut client = OverlayClient::new(
        WsTransport::new(),
        surface,
        settings,
        ClientOptions::from(&config),
    );

    let api_key = config.api_key.clone();
    let client_task = tokio::spawn(async move { client.run(api_key).await });

    // The missing-key screen stays up until the user quits.
    let result = App::new(state_rx)
        .run(wait_for_shutdown())
        .await
        .context("Terminal renderer failed");

    let exit_code = client_exit_code(client_task).await;
    result?;
    exit_code
}

/// Exit code once the renderer is done. A client still running was stopped
/// by the user; a finished one only ever stops for a missing key or a panic.
async fn client_exit_code(
    client_task: JoinHandle<std::result::Result<(), OverlayError>>,
) -> Result<ExitCode> {
    if !client_task.is_finished() {
        client_task.abort();
        return Ok(ExitCode::SUCCESS);
    }

    match client_task.await.context("Overlay client panicked")? {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(OverlayError::MissingApiKey) => Ok(ExitCode::FAILURE),
        Err(e) => Err(e.into()),
    }
}

/// Logs go to stderr so stdout stays clean.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .init();
}

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn finished<F>(task: F) -> JoinHandle<std::result::Result<(), OverlayError>>
    where
        F: std::future::Future<Output = std::result::Result<(), OverlayError>> + Send + 'static,
    {
        let handle = tokio::spawn(task);
        while !handle.is_finished() {
            tokio::task::yield_now().await;
        }
        handle
    }

    #[tokio::test]
    async fn missing_key_exits_with_failure() {
        let task = finished(async { Err(OverlayError::MissingApiKey) }).await;
        assert_eq!(client_exit_code(task).await.unwrap(), ExitCode::FAILURE);
    }

    #[tokio::test]
    async fn panicked_client_is_an_error_not_a_missing_key() {
        let task = finished(async {
            if true {
                panic!("client blew up");
            }
            Ok(())
        })
        .await;
        let err = client_exit_code(task).await.unwrap_err();
        assert!(err.to_string().contains("panicked"), "{err:#}");
    }

    #[tokio::test]
    async fn running_client_is_stopped_with_success() {
        let task = tokio::spawn(std::future::pending());
        assert_eq!(client_exit_code(task).await.unwrap(), ExitCode::SUCCESS);
    }
}
