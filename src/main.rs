//! Café site server.
//!
//! ```text
//!   request ──▶ request id ─▶ trace ─▶ timeout ─▶ body limit ─▶ access gate
//!                                                                   │
//!                          ┌────────────────────────────────────────┘
//!                          ▼
//!                   rate limit class ─▶ handler ─▶ store / mailer / blobs
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use cafe_server::config::loader::load_config;
use cafe_server::lifecycle::signals::spawn_signal_handler;
use cafe_server::observability::{logging, metrics};
use cafe_server::{AppState, HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "cafe-server")]
#[command(about = "Backend for the café site", long_about = None)]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long, env = "CAFE_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Invalid configuration is fatal.
    let config = load_config(args.config.as_deref())?;

    logging::init_logging(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "cafe-server starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        rate_limiting = config.rate_limit.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let state = AppState::from_config(config).await?;

    let shutdown = Shutdown::new();
    spawn_signal_handler(&shutdown);

    HttpServer::new(state).run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
