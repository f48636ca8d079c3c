//! rewrite-proxy
//!
//! A rewriting forwarding proxy built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                   ┌──────────────────────────────────────────────────────┐
//!                   │                    REWRITE PROXY                     │
//!                   │                                                      │
//!  GET /http://a/b  │  ┌────────┐   ┌──────────┐   ┌───────────┐           │
//!  ─────────────────┼─▶│  http  │──▶│ routing  │──▶│   http    │───────────┼──▶ Target
//!                   │  │ server │   │ target + │   │  client   │  redirects│    Server
//!                   │  └────────┘   │whitelist │   │(forwarder)│◀──────────┼───
//!                   │               └──────────┘   └─────┬─────┘           │
//!                   │                                    ▼                 │
//!  Rewritten page   │  ┌────────┐   ┌──────────┐   ┌───────────┐           │
//!  ◀────────────────┼──│response│◀──│ rewrite  │◀──│  headers  │           │
//!                   │  │dispatch│   │html/css/ │   │  (relay)  │           │
//!                   │  └────────┘   │ resolve  │   └───────────┘           │
//!                   │               └──────────┘                           │
//!                   │  config · observability · lifecycle                  │
//!                   └──────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use rewrite_proxy::config::{read_config, validate_config, ConfigError, ProxyConfig};
use rewrite_proxy::http::HttpServer;
use rewrite_proxy::lifecycle::{shutdown_signal, Shutdown};
use rewrite_proxy::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "rewrite-proxy")]
#[command(about = "Rewriting forwarding HTTP proxy", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, overriding `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,

    /// Force permissive CORS headers on every response.
    #[arg(long)]
    cors: bool,

    /// Allow a hostname and its subdomains. Repeatable.
    #[arg(long = "allow-host", value_name = "HOST")]
    allow_hosts: Vec<String>,

    /// Path the proxy is mounted under, e.g. "/proxy".
    #[arg(long)]
    base_path: Option<String>,
}

impl Cli {
    fn apply(&self, config: &mut ProxyConfig) {
        if let Some(bind) = &self.bind {
            config.listener.bind_address = bind.clone();
        }
        if let Some(base_path) = &self.base_path {
            config.listener.base_path = base_path.clone();
        }
        if self.cors {
            config.cors.enabled = true;
        }
        config
            .whitelist
            .hostnames
            .extend(self.allow_hosts.iter().cloned());
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => read_config(path)?,
        None => ProxyConfig::default(),
    };
    cli.apply(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;

    logging::init(&config.observability);

    tracing::info!("rewrite-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        base_path = %config.listener.base_path,
        cors = config.cors.enabled,
        whitelisted_hosts = config.whitelist.hostnames.len(),
        whitelist_patterns = config.whitelist.patterns.len(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr);
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(config)?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown.trigger();
    });

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
