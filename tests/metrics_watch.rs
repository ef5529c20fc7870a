// tests/metrics_watch.rs
mod common;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{listing_page, RecordingNotifier};
use listing_watch::config::watch::WatchConfig;
use listing_watch::ingest::fetch::FetchError;
use listing_watch::ingest::types::PageFetcher;
use listing_watch::snapshot::MemoryStore;
use listing_watch::{NotifierMux, Snapshot, SourceSpec, Watcher};
use metrics_exporter_prometheus::PrometheusBuilder;

struct MapFetcher(HashMap<String, String>);

#[async_trait]
impl PageFetcher for MapFetcher {
    async fn fetch(&self, spec: &SourceSpec) -> Result<String, FetchError> {
        self.0.get(&spec.url).cloned().ok_or(FetchError::Status(500))
    }
    fn name(&self) -> &'static str {
        "map"
    }
}

#[tokio::test]
async fn metrics_exposed_after_run() {
    // Install a local recorder for the test
    let handle = PrometheusBuilder::new().install_recorder().expect("recorder");

    let page = listing_page(&[("Selmer Mk6", Some("$9000"), "/b")]);
    let cfg = WatchConfig {
        sources: vec![
            SourceSpec::new("https://s/", ".card", ".title", ".price", "a"),
            SourceSpec::new("https://dead/", ".card", ".title", ".price", "a"),
        ],
        brands: vec!["Selmer".into()],
        ..WatchConfig::default()
    };
    let w = Watcher::new(
        Arc::new(cfg),
        Arc::new(MapFetcher(HashMap::from([("https://s/".to_string(), page)]))),
        Arc::new(MemoryStore::new(Snapshot::default())),
        Arc::new(NotifierMux::new(vec![Box::new(RecordingNotifier::default())])),
    );
    w.run().await.unwrap();

    let out = handle.render();
    for series in [
        "watch_runs_total",
        "watch_sources_total",
        "watch_source_failures_total",
        "watch_listings_extracted_total",
        "watch_new_listings_total",
        "watch_last_run_ts",
    ] {
        assert!(out.contains(series), "missing {series} in:\n{out}");
    }
}
