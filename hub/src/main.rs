//! Donation Hub - main entry point.
//!
//! Starts the hub on `127.0.0.1` with JSON logging and graceful shutdown on
//! SIGTERM/SIGINT.
//!
//! ```bash
//! # Development mode (any api key accepted)
//! DONATION_HUB_UNSAFE_NO_AUTH=true cargo run --bin donation-hub
//!
//! # With a key
//! DONATION_HUB_API_KEY=secret DONATION_HUB_GOAL=500 cargo run --bin donation-hub
//! ```

use std::process::ExitCode;

use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use donation_hub::config::Config;
use donation_hub::routes::{create_router, AppState};

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "Failed to load configuration");
            eprintln!("Error: {err}");
            eprintln!();
            eprintln!("Required environment variables (when auth enabled):");
            eprintln!("  DONATION_HUB_API_KEY         - Key overlays must present");
            eprintln!();
            eprintln!("Optional environment variables:");
            eprintln!("  DONATION_HUB_PORT            - Port on 127.0.0.1 (default: 3337)");
            eprintln!("  DONATION_HUB_GOAL            - Donation goal (default: 100)");
            eprintln!("  DONATION_HUB_INITIAL_VALUE   - Starting value (default: 0)");
            eprintln!("  DONATION_HUB_UNSAFE_NO_AUTH  - Accept any key (dev only, 'true')");
            eprintln!("  RUST_LOG                     - Log level filter (default: info)");
            return ExitCode::from(1);
        }
    };

    let auth_mode = if config.unsafe_no_auth {
        "disabled (UNSAFE)"
    } else {
        "enabled"
    };
    info!(
        port = config.port,
        auth_mode = auth_mode,
        goal = config.goal,
        initial_value = config.initial_value,
        "Donation hub starting"
    );

    let state = match AppState::new(config.clone()) {
        Ok(state) => state,
        Err(err) => {
            error!(error = %err, "Failed to initialize ledger");
            return ExitCode::from(1);
        }
    };
    let app = create_router(state);

    let bind_addr = format!("127.0.0.1:{}", config.port);
    let listener = match TcpListener::bind(&bind_addr).await {
        Ok(listener) => {
            info!(address = %bind_addr, "Hub listening");
            listener
        }
        Err(err) => {
            error!(error = %err, address = %bind_addr, "Failed to bind to address");
            return ExitCode::from(1);
        }
    };

    if let Err(err) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(error = %err, "Server error");
        return ExitCode::from(1);
    }

    info!("Hub shutdown complete");
    ExitCode::SUCCESS
}

/// JSON logs filtered by `RUST_LOG` (default `info`).
fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug,axum::rejection=trace"));

    let json_layer = fmt::layer()
        .json()
        .with_target(true)
        .with_level(true)
        .with_file(false)
        .with_line_number(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .init();
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT (Ctrl+C), shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
