// src/ingest/mod.rs
pub mod extract;
pub mod fetch;
pub mod filter;
pub mod render;
pub mod scheduler;
pub mod types;

use std::sync::Arc;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;
use tokio::sync::Semaphore;

use crate::ingest::fetch::FetchError;
use crate::ingest::types::{Listing, PageFetcher, SourceReport, SourceSpec};

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("watch_sources_total", "Sources attempted.");
        describe_counter!(
            "watch_source_failures_total",
            "Sources that contributed nothing because fetch or extraction failed."
        );
        describe_counter!(
            "watch_escalations_total",
            "Static fetches escalated to a rendered fetch."
        );
        describe_counter!(
            "watch_listings_extracted_total",
            "Listings extracted across all sources."
        );
        describe_counter!("watch_listings_kept_total", "Listings kept by the brand filter.");
        describe_counter!(
            "watch_new_listings_total",
            "Listings not seen in the previous snapshot."
        );
        describe_counter!("watch_runs_total", "Completed pipeline runs.");
        describe_counter!("watch_notify_failures_total", "Runs where a notifier channel failed.");
        describe_histogram!("watch_fetch_ms", "Static fetch time in milliseconds.");
        describe_gauge!("watch_last_run_ts", "Unix ts when the pipeline last ran.");
    });
}

/// Collapse whitespace runs to one space and trim.
pub fn normalize_text(s: &str) -> String {
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").expect("whitespace regex"));
    re_ws.replace_all(s, " ").trim().to_string()
}

/// Fetch + extract for a single source. Failures come back in the report.
pub async fn scrape_source(fetcher: &dyn PageFetcher, spec: &SourceSpec) -> SourceReport {
    tracing::info!(target: "ingest", source = %spec.url, "fetching");
    let result = match fetcher.fetch(spec).await {
        Ok(html) => extract::extract(&html, spec),
        Err(e) => Err(e),
    };
    SourceReport {
        source: spec.url.clone(),
        result,
    }
}

/// Merged listings from all sources plus the per-source reports.
#[derive(Debug, Default)]
pub struct Collected {
    pub listings: Vec<Listing>,
    pub reports: Vec<SourceReport>,
}

impl Collected {
    pub fn failed_sources(&self) -> Vec<String> {
        self.reports
            .iter()
            .filter(|r| r.result.is_err())
            .map(|r| r.source.clone())
            .collect()
    }
}

/// Run one fetch+extract unit per source on at most `workers` concurrent tasks.
/// A failing or panicking source contributes nothing; the others are unaffected.
pub async fn collect_listings(
    sources: &[SourceSpec],
    fetcher: Arc<dyn PageFetcher>,
    workers: usize,
) -> Collected {
    ensure_metrics_described();

    let slots = Arc::new(Semaphore::new(workers.max(1)));
    let mut handles = Vec::with_capacity(sources.len());
    for spec in sources.iter().cloned() {
        let fetcher = Arc::clone(&fetcher);
        let slots = Arc::clone(&slots);
        let url = spec.url.clone();
        let handle = tokio::spawn(async move {
            let _permit = slots.acquire_owned().await.ok();
            scrape_source(fetcher.as_ref(), &spec).await
        });
        handles.push((url, handle));
    }

    let mut out = Collected::default();
    for (url, handle) in handles {
        counter!("watch_sources_total").increment(1);
        let report = match handle.await {
            Ok(r) => r,
            Err(join_err) => SourceReport {
                source: url,
                result: Err(FetchError::Worker(join_err.to_string())),
            },
        };

        match &report.result {
            Ok(items) => {
                tracing::info!(target: "ingest", source = %report.source, count = items.len(), "source done");
                counter!("watch_listings_extracted_total").increment(items.len() as u64);
                out.listings.extend(items.iter().cloned());
            }
            Err(e) => {
                tracing::warn!(target: "ingest", source = %report.source, error = %e, "source contributed nothing");
                counter!("watch_source_failures_total").increment(1);
            }
        }
        out.reports.push(report);
    }
    out
}
