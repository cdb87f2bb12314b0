//! api-guard service binary.
//!
//! # Startup
//!
//! ```text
//! CLI args ──▶ load_config (file + env + CLI) ──▶ init_logging ──▶ bind ──▶ serve
//!                                                                            │
//!                                         SIGINT / SIGTERM ──▶ graceful stop ◀┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;

use api_guard::config::{load_config, ConfigOverrides};
use api_guard::lifecycle::shutdown_signal;
use api_guard::observability::init_logging;
use api_guard::HttpServer;

#[derive(Parser)]
#[command(name = "api-guard")]
#[command(about = "HTTP service with API key authentication and JSON logs", long_about = None)]
struct Cli {
    /// TOML configuration file. Environment variables override it.
    #[arg(short, long, env = "API_GUARD_CONFIG")]
    config: Option<PathBuf>,

    /// Override listener.bind_address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let overrides = ConfigOverrides {
        bind_address: cli.bind,
    };
    let config = load_config(cli.config.as_deref(), &overrides)?;

    let sinks = init_logging(&config.logging)?;

    tracing::info!(
        "api-guard v{} starting (level {}, {} sink(s))",
        env!("CARGO_PKG_VERSION"),
        sinks.level,
        sinks.sinks.len()
    );

    let listener = TcpListener::bind(&config.listener.bind_address).await?;

    let server = HttpServer::new(config);
    server.run(listener, shutdown_signal()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
