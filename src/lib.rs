// src/lib.rs
// Public library surface for the binary, the demo and integration tests.

pub mod config;
pub mod engine;
pub mod ingest;
pub mod metrics;
pub mod notify;
pub mod snapshot;

use std::sync::Arc;

use anyhow::Result;

use crate::config::watch::WatchConfig;
use crate::ingest::fetch::HttpFetcher;
use crate::ingest::render::select_renderer;
use crate::snapshot::JsonFileStore;

// ---- Re-exports for stable public API ----
pub use crate::engine::{RunOutcome, Watcher};
pub use crate::ingest::types::{Listing, SourceSpec, PRICE_NOT_LISTED};
pub use crate::notify::{Notifier, NotifierMux};
pub use crate::snapshot::{diff, Snapshot, SnapshotStore};

/// Wire the production collaborators for `cfg`: HTTP fetcher with the best available
/// renderer, JSON snapshot file, and notifier channels from the environment.
pub fn build_watcher(cfg: WatchConfig) -> Result<Watcher> {
    cfg.validate()?;
    let renderer = select_renderer(&cfg);
    let fetcher = HttpFetcher::new(&cfg, renderer)?;
    let store = JsonFileStore::new(cfg.snapshot_path.clone());
    let mux = NotifierMux::from_env();
    tracing::info!(target: "watch", channels = ?mux.channel_names(), snapshot = %store.path().display(), "watcher ready");

    Ok(Watcher::new(
        Arc::new(cfg),
        Arc::new(fetcher),
        Arc::new(store),
        Arc::new(mux),
    ))
}
