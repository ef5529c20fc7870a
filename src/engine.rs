//! # Watch Engine
//! One pipeline pass: fan out over sources, filter by brand, diff against the stored
//! snapshot, and on news persist then notify.
//!
//! Policy: the snapshot is replaced only when the run found something new. A run with
//! no news leaves stored state and notifiers untouched.

use std::sync::Arc;

use anyhow::Result;
use metrics::{counter, gauge};
use tracing::{error, info};

use crate::config::watch::WatchConfig;
use crate::ingest::filter::filter_by_brand;
use crate::ingest::types::{Listing, PageFetcher};
use crate::ingest::{collect_listings, ensure_metrics_described};
use crate::notify::NotifierMux;
use crate::snapshot::{diff, Snapshot, SnapshotStore};

/// What one pass saw and did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOutcome {
    pub sources: usize,
    pub failed_sources: Vec<String>,
    pub extracted: usize,
    pub kept: usize,
    pub new_items: Vec<Listing>,
    pub persisted: bool,
    /// `None` when there was nothing to announce.
    pub notified: Option<bool>,
}

pub struct Watcher {
    config: Arc<WatchConfig>,
    fetcher: Arc<dyn PageFetcher>,
    store: Arc<dyn SnapshotStore>,
    notifier: Arc<NotifierMux>,
}

impl Watcher {
    pub fn new(
        config: Arc<WatchConfig>,
        fetcher: Arc<dyn PageFetcher>,
        store: Arc<dyn SnapshotStore>,
        notifier: Arc<NotifierMux>,
    ) -> Self {
        Self {
            config,
            fetcher,
            store,
            notifier,
        }
    }

    /// Run one pass. Errors only on misconfiguration; every per-source failure degrades
    /// to that source contributing nothing.
    pub async fn run(&self) -> Result<RunOutcome> {
        self.config.validate()?;
        ensure_metrics_described();
        info!(target: "watch", sources = self.config.sources.len(), "run started");

        let collected = collect_listings(
            &self.config.sources,
            Arc::clone(&self.fetcher),
            self.config.workers,
        )
        .await;
        let failed_sources = collected.failed_sources();
        let extracted = collected.listings.len();

        let filtered = filter_by_brand(collected.listings, &self.config.brands);
        counter!("watch_listings_kept_total").increment(filtered.len() as u64);
        let current = Snapshot::new(filtered);

        let previous = self.store.load_previous().await;
        let new_items = diff(&current, &previous);

        let mut outcome = RunOutcome {
            sources: self.config.sources.len(),
            failed_sources,
            extracted,
            kept: current.len(),
            new_items,
            persisted: false,
            notified: None,
        };

        if outcome.new_items.is_empty() {
            info!(target: "watch", kept = outcome.kept, "no new listings");
        } else {
            counter!("watch_new_listings_total").increment(outcome.new_items.len() as u64);

            // Persist comes first and stands regardless of how notification goes.
            match self.store.persist(&current).await {
                Ok(()) => outcome.persisted = true,
                Err(e) => error!(target: "watch", error = ?e, "failed to save current snapshot"),
            }
            outcome.notified = Some(self.notifier.notify(&outcome.new_items).await);
        }

        counter!("watch_runs_total").increment(1);
        gauge!("watch_last_run_ts").set(chrono::Utc::now().timestamp() as f64);
        info!(
            target: "watch",
            extracted = outcome.extracted,
            kept = outcome.kept,
            new = outcome.new_items.len(),
            failed = outcome.failed_sources.len(),
            "run finished"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::fetch::FetchError;
    use crate::ingest::types::SourceSpec;
    use crate::snapshot::MemoryStore;
    use async_trait::async_trait;

    struct Fixed(&'static str);

    #[async_trait]
    impl PageFetcher for Fixed {
        async fn fetch(&self, _spec: &SourceSpec) -> Result<String, FetchError> {
            Ok(self.0.to_string())
        }
        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    fn cfg() -> WatchConfig {
        WatchConfig {
            sources: vec![SourceSpec::new("https://s/", ".c", ".n", ".p", "a")],
            brands: vec!["Selmer".into()],
            ..WatchConfig::default()
        }
    }

    #[tokio::test]
    async fn misconfiguration_aborts_before_fetching() {
        let mut c = cfg();
        c.brands.clear();
        let w = Watcher::new(
            Arc::new(c),
            Arc::new(Fixed("")),
            Arc::new(MemoryStore::new(Snapshot::default())),
            Arc::new(NotifierMux::new(vec![])),
        );
        let err = w.run().await.unwrap_err();
        assert!(err.to_string().contains("no brands"));
    }

    #[tokio::test]
    async fn second_identical_run_is_a_no_op() {
        let html = r#"<div class="c"><b class="n">Selmer Mk6</b><a href="/b">x</a></div>
                      <div class="c"><b class="n">Yamaha Neck</b><a href="/y">x</a></div>"#;
        let store = Arc::new(MemoryStore::new(Snapshot::default()));
        let w = Watcher::new(
            Arc::new(cfg()),
            Arc::new(Fixed(html)),
            store.clone(),
            Arc::new(NotifierMux::new(vec![])),
        );

        let first = w.run().await.unwrap();
        assert_eq!(first.extracted, 2);
        assert_eq!(first.kept, 1);
        assert_eq!(first.new_items.len(), 1);
        assert!(first.persisted);
        assert_eq!(first.notified, Some(true));

        let before = store.current();
        let second = w.run().await.unwrap();
        assert!(second.new_items.is_empty());
        assert!(!second.persisted);
        assert_eq!(second.notified, None);
        assert_eq!(store.persist_count(), 1);
        assert_eq!(store.current(), before);
    }
}
