// src/ingest/fetch.rs
//! Two-tier page retrieval: one plain GET with browser-like headers, escalating to a
//! headless render when the GET fails or returns a suspiciously small body.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::StatusCode;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::config::watch::WatchConfig;
use crate::ingest::render::PageRenderer;
use crate::ingest::types::{PageFetcher, SourceSpec};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("unexpected HTTP status {0}")]
    Status(u16),
    #[error("body too short ({len} < {min} bytes)")]
    TooShort { len: usize, min: usize },
    #[error("no rendering engine available")]
    RenderUnavailable,
    #[error("render failed: {0}")]
    Render(String),
    #[error("render timed out after {0:?}")]
    RenderTimeout(Duration),
    #[error("static: {static_tier}; dynamic: {dynamic_tier}")]
    BothTiers {
        static_tier: Box<FetchError>,
        dynamic_tier: Box<FetchError>,
    },
    #[error("extraction failed: {0}")]
    Extract(String),
    #[error("worker task failed: {0}")]
    Worker(String),
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-US,en;q=0.9"),
    );
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    headers
}

/// Static fetch first, rendered fetch as the escalation path.
pub struct HttpFetcher {
    client: reqwest::Client,
    min_body_len: usize,
    renderer: Arc<dyn PageRenderer>,
    // Renders are far heavier than GETs; they get their own smaller pool.
    render_slots: Semaphore,
}

impl HttpFetcher {
    pub fn new(cfg: &WatchConfig, renderer: Arc<dyn PageRenderer>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(cfg.static_timeout())
            .user_agent(USER_AGENT)
            .default_headers(browser_headers())
            .build()
            .context("building HTTP client")?;

        Ok(Self {
            client,
            min_body_len: cfg.min_body_len,
            renderer,
            render_slots: Semaphore::new(cfg.render_workers.max(1)),
        })
    }

    /// Escalation threshold for `spec`, honouring its override.
    pub fn threshold_for(&self, spec: &SourceSpec) -> usize {
        spec.min_body_len.unwrap_or(self.min_body_len)
    }

    /// Single GET. Anything but 200 with a body of at least `min_len` bytes is an error.
    pub async fn fetch_static(&self, url: &str, min_len: usize) -> Result<String, FetchError> {
        let t0 = Instant::now();
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if status != StatusCode::OK {
            return Err(FetchError::Status(status.as_u16()));
        }
        let body = resp.text().await?;
        histogram!("watch_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

        if body.len() < min_len {
            return Err(FetchError::TooShort {
                len: body.len(),
                min: min_len,
            });
        }
        Ok(body)
    }

    async fn fetch_dynamic(&self, url: &str) -> Result<String, FetchError> {
        let _permit = self
            .render_slots
            .acquire()
            .await
            .map_err(|e| FetchError::Render(e.to_string()))?;
        self.renderer.render(url).await
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, spec: &SourceSpec) -> Result<String, FetchError> {
        let url = spec.url.as_str();
        let min_len = self.threshold_for(spec);

        let static_err = match self.fetch_static(url, min_len).await {
            Ok(html) => {
                debug!(target: "ingest", source = %url, bytes = html.len(), "static fetch ok");
                return Ok(html);
            }
            Err(e) => e,
        };

        warn!(target: "ingest", source = %url, error = %static_err, "static fetch insufficient, escalating");
        counter!("watch_escalations_total").increment(1);

        match self.fetch_dynamic(url).await {
            Ok(html) => {
                info!(target: "ingest", source = %url, bytes = html.len(), renderer = self.renderer.name(), "dynamic fetch ok");
                Ok(html)
            }
            Err(dynamic_err) => Err(FetchError::BothTiers {
                static_tier: Box::new(static_err),
                dynamic_tier: Box::new(dynamic_err),
            }),
        }
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
