use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tenantgate::config::{GateConfig, LoggingConfig};
use tenantgate::http::{GateState, HttpServer};
use tenantgate::ratelimit::{Clock, RateLimiter, SystemClock};
use tenantgate::simulate;

/// Per-tenant sliding window rate limiter.
#[derive(Debug, Parser)]
#[command(name = "tenantgate", version, about)]
struct Cli {
    /// Path to a YAML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the window length in milliseconds
    #[arg(long, global = true)]
    window_ms: Option<u64>,

    /// Override the admitted requests per window
    #[arg(long, global = true)]
    max_requests: Option<u64>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve {
        /// Override the listen address
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
    /// Run the in-process traffic scenarios and print a summary
    Simulate,
    /// Print the effective configuration as YAML
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = GateConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(window_ms) = cli.window_ms {
        config.rate_limiting.window_duration_ms = window_ms;
    }
    if let Some(max_requests) = cli.max_requests {
        config.rate_limiting.max_requests = max_requests;
    }
    if let Some(Command::Serve { bind: Some(bind) }) = &cli.command {
        config.server.http_addr = *bind;
    }
    config.validate().context("invalid configuration")?;

    init_tracing(&config.logging);

    match cli.command.unwrap_or(Command::Serve { bind: None }) {
        Command::Serve { .. } => serve(config, cli.config.as_deref()).await,
        Command::Simulate => {
            let policy = config.policy()?;
            let results = simulate::run_suite(policy, SystemClock::new().now_millis()).await;
            println!("{:<20} {:>9} {:>7} {:>7}", "scenario", "admitted", "denied", "errors");
            for (name, report) in results {
                println!(
                    "{:<20} {:>9} {:>7} {:>7}",
                    name, report.admitted, report.denied, report.errors
                );
            }
            Ok(())
        }
        Command::Config => {
            print!("{}", config.to_yaml()?);
            Ok(())
        }
    }
}

async fn serve(config: GateConfig, config_path: Option<&Path>) -> anyhow::Result<()> {
    info!("Starting Tenantgate Rate Limiting Service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    match config_path {
        Some(path) => info!(path = %path.display(), "Configuration loaded from file"),
        None => info!("Configuration loaded from defaults and environment"),
    }

    let policy = config.policy()?;
    let limiter = Arc::new(RateLimiter::new(policy));
    info!(
        window_ms = policy.window_duration_ms(),
        max_requests = policy.max_requests(),
        "Rate limiter initialized"
    );

    let state = GateState::new(limiter, config.tenant_header()?);
    let mut server = HttpServer::new(config.server.http_addr, state);
    if let Some(secs) = config.rate_limiting.eviction_interval_secs {
        info!(interval_secs = secs, "Idle tenant eviction enabled");
        server = server.with_eviction_interval(Duration::from_secs(secs));
    }

    server.serve_with_shutdown(shutdown_signal()).await?;

    info!("Tenantgate Rate Limiting Service stopped");
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true);

    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
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
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
