//! Allowlisted forwarding proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server (request id, trace, CORS floor)
//!                          │
//!                          ▼
//!                     http::classifier ── OPTIONS ──▶ 204 preflight
//!                          │
//!                          ├── / or /health ──▶ security::auth ──▶ health report
//!                          │
//!                          ▼
//!                     security::auth ──▶ routing (allowlist + target)
//!                          │
//!                          ▼
//!                     security::headers (exclusions, copy policy, impersonation)
//!                          │
//!                          ▼
//!                     proxy::forwarder ──────────────▶ https://{host}/{path}
//!                          │
//!     Client Response      ▼
//!     ◀────────────── proxy::relay (status, headers, body, CORS, marker)
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use allowlist_proxy::config::{load_config, load_from_env, ProxyConfig};
use allowlist_proxy::observability::{logging, metrics};
use allowlist_proxy::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "allowlist-proxy")]
#[command(about = "Forwarding proxy restricted to an allowlist of upstream hosts", long_about = None)]
struct Args {
    /// TOML config file. Without it, defaults plus PROXY_* environment variables are used.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config: ProxyConfig = match &args.config {
        Some(path) => load_config(path)?,
        None => load_from_env()?,
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    logging::init(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        service = %config.service_name,
        bind_address = %config.listener.bind_address,
        allowed_hosts = config.upstream.allowed_hosts.len(),
        "allowlist-proxy starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics endpoint");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = HttpServer::new(config)?;

    let shutdown = Shutdown::new();
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
