//! listing-watch binary entrypoint.
//! Loads config, wires the watcher, then runs one pass or schedules passes forever.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use listing_watch::config::watch::WatchConfig;
use listing_watch::ingest::scheduler::{spawn_scheduler, SchedulerCfg};
use listing_watch::metrics::{install_exporter, metrics_addr_from_env};

#[derive(Parser, Debug)]
#[command(name = "listing-watch")]
#[command(about = "Watch shop listing pages for new items from tracked brands")]
#[command(version)]
struct Cli {
    /// Config file (TOML or JSON); overrides WATCH_CONFIG_PATH and config/watch.*
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    mode: Option<Mode>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Mode {
    /// Run one pass and exit (default).
    Once,
    /// Run a pass now, then every `interval_minutes`, until Ctrl-C.
    Schedule,
}

/// LOG_FORMAT=json switches to JSON lines; RUST_LOG filters as usual.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("listing_watch=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let cfg = match &cli.config {
        Some(p) => {
            let mut cfg = WatchConfig::load_from_file(p)?;
            cfg.apply_env_overrides();
            cfg
        }
        None => WatchConfig::load_default()?,
    };

    if let Some(addr) = metrics_addr_from_env()? {
        install_exporter(addr)?;
    }

    let interval = cfg.interval();
    let watcher = listing_watch::build_watcher(cfg)?;

    match cli.mode.unwrap_or(Mode::Once) {
        Mode::Once => {
            watcher.run().await?;
        }
        Mode::Schedule => {
            tracing::info!(target: "watch", every_secs = interval.as_secs(), "scheduler started");
            let handle = spawn_scheduler(Arc::new(watcher), SchedulerCfg { interval });
            tokio::signal::ctrl_c().await?;
            tracing::info!(target: "watch", "interrupted, stopping scheduler");
            handle.abort();
        }
    }
    Ok(())
}
