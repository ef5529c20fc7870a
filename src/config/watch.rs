// src/config/watch.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};
use url::Url;

use crate::ingest::extract::SourceSelectors;
use crate::ingest::types::SourceSpec;

pub const ENV_CONFIG_PATH: &str = "WATCH_CONFIG_PATH";
pub const ENV_INTERVAL_MINUTES: &str = "INTERVAL_MINUTES";
pub const ENV_SNAPSHOT_PATH: &str = "SNAPSHOT_PATH";

pub const DEFAULT_TOML_PATH: &str = "config/watch.toml";
pub const DEFAULT_JSON_PATH: &str = "config/watch.json";

/// Upper bound for `interval_minutes` (one week).
pub const MAX_INTERVAL_MINUTES: u64 = 7 * 24 * 60;

/// Conditions that stop a run before any page is fetched.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no sources configured")]
    NoSources,
    #[error("no brands configured")]
    NoBrands,
    #[error("worker pool size must be at least 1")]
    NoWorkers,
    #[error("interval_minutes must be between 1 and {max}, got {0}", max = MAX_INTERVAL_MINUTES)]
    BadInterval(u64),
    #[error("settle delay range is inverted ({0} ms > {1} ms)")]
    InvertedSettleRange(u64, u64),
    #[error("source {url:?}: {reason}")]
    BadSource { url: String, reason: String },
}

fn default_brands() -> Vec<String> {
    [
        "Selmer",
        "Otto Link",
        "Dave Guardala",
        "Yanagisawa",
        "Beechler",
        "Yani",
        "Otto",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_sources() -> Vec<SourceSpec> {
    vec![
        SourceSpec::new(
            "https://www.getasax.com/collections/mouthpieces",
            ".product-grid-item",
            ".product-title",
            ".price",
            "a",
        ),
        SourceSpec::new(
            "https://www.saxquest.com/",
            ".product-listing",
            ".product-title",
            ".product-price",
            "a",
        ),
        SourceSpec::new(
            "https://www.dcsax.com/",
            ".product-item",
            ".product-title",
            ".price",
            "a",
        ),
        SourceSpec::new(
            "https://www.soundfuga.jp/",
            ".product-item",
            ".product-title",
            ".price",
            "a",
        ),
        SourceSpec::new(
            "https://www.reverb.com/marketplace?query=saxophone",
            ".product-card",
            ".product-card-title",
            ".product-card-price",
            "a",
        ),
    ]
}

fn default_static_timeout_secs() -> u64 {
    15
}
fn default_settle_delay_ms() -> [u64; 2] {
    [2_000, 5_000]
}
fn default_min_body_len() -> usize {
    2_000
}
fn default_workers() -> usize {
    4
}
fn default_render_workers() -> usize {
    1
}
fn default_navigation_timeout_secs() -> u64 {
    30
}
fn default_snapshot_path() -> PathBuf {
    PathBuf::from("data/last_items.json")
}
fn default_interval_minutes() -> u64 {
    60
}

/// Everything the pipeline reads, built once at startup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WatchConfig {
    #[serde(default = "default_sources")]
    pub sources: Vec<SourceSpec>,
    /// Case-insensitive substrings matched against listing names.
    #[serde(default = "default_brands")]
    pub brands: Vec<String>,
    #[serde(default = "default_static_timeout_secs")]
    pub static_timeout_secs: u64,
    /// `[min, max]` settle wait after navigation, in ms.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: [u64; 2],
    /// Static bodies shorter than this escalate to a rendered fetch.
    #[serde(default = "default_min_body_len")]
    pub min_body_len: usize,
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_render_workers")]
    pub render_workers: usize,
    #[serde(default = "default_navigation_timeout_secs")]
    pub navigation_timeout_secs: u64,
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            sources: default_sources(),
            brands: default_brands(),
            static_timeout_secs: default_static_timeout_secs(),
            settle_delay_ms: default_settle_delay_ms(),
            min_body_len: default_min_body_len(),
            workers: default_workers(),
            render_workers: default_render_workers(),
            navigation_timeout_secs: default_navigation_timeout_secs(),
            snapshot_path: default_snapshot_path(),
            interval_minutes: default_interval_minutes(),
        }
    }
}

impl WatchConfig {
    /// Load from an explicit path. Supports TOML or JSON.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading watch config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let mut cfg = parse_config(&content, ext.as_str())
            .with_context(|| format!("parsing watch config {}", path.display()))?;
        cfg.brands = clean_brands(cfg.brands);
        Ok(cfg)
    }

    /// Resolve config using env var + fallbacks, then apply env overrides:
    /// 1) $WATCH_CONFIG_PATH
    /// 2) config/watch.toml
    /// 3) config/watch.json
    /// 4) built-in defaults
    pub fn load_default() -> Result<Self> {
        let mut cfg = if let Ok(p) = env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from_file(&pb)?
        } else if Path::new(DEFAULT_TOML_PATH).exists() {
            Self::load_from_file(DEFAULT_TOML_PATH)?
        } else if Path::new(DEFAULT_JSON_PATH).exists() {
            Self::load_from_file(DEFAULT_JSON_PATH)?
        } else {
            Self::default()
        };
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    /// `INTERVAL_MINUTES` and `SNAPSHOT_PATH` win over whatever the file said.
    pub fn apply_env_overrides(&mut self) {
        if let Some(mins) = env::var(ENV_INTERVAL_MINUTES)
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
        {
            self.interval_minutes = mins;
        }
        if let Ok(p) = env::var(ENV_SNAPSHOT_PATH) {
            if !p.trim().is_empty() {
                self.snapshot_path = PathBuf::from(p.trim());
            }
        }
    }

    /// Misconfiguration check; the only failure allowed to stop a run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sources.is_empty() {
            return Err(ConfigError::NoSources);
        }
        if self.brands.iter().all(|b| b.trim().is_empty()) {
            return Err(ConfigError::NoBrands);
        }
        if self.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.interval_minutes == 0 || self.interval_minutes > MAX_INTERVAL_MINUTES {
            return Err(ConfigError::BadInterval(self.interval_minutes));
        }
        let [lo, hi] = self.settle_delay_ms;
        if lo > hi {
            return Err(ConfigError::InvertedSettleRange(lo, hi));
        }
        for s in &self.sources {
            let bad = |reason: String| ConfigError::BadSource {
                url: s.url.clone(),
                reason,
            };
            let url = Url::parse(&s.url).map_err(|e| bad(e.to_string()))?;
            if url.cannot_be_a_base() {
                return Err(bad("not a base URL".into()));
            }
            SourceSelectors::compile(s).map_err(bad)?;
        }
        Ok(())
    }

    pub fn static_timeout(&self) -> Duration {
        Duration::from_secs(self.static_timeout_secs)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes.max(1).saturating_mul(60))
    }
}

fn parse_config(s: &str, hint_ext: &str) -> Result<WatchConfig> {
    // TOML when hinted; JSON when it looks like an object; otherwise try both.
    if hint_ext == "toml" {
        return toml::from_str(s).context("invalid TOML");
    }
    if hint_ext == "json" || s.trim_start().starts_with('{') {
        return serde_json::from_str(s).context("invalid JSON");
    }
    if let Ok(v) = toml::from_str(s) {
        return Ok(v);
    }
    serde_json::from_str(s).map_err(|_| anyhow!("unsupported watch config format"))
}

/// Trim, drop blanks, drop case-insensitive duplicates; first spelling wins.
fn clean_brands(items: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    items
        .into_iter()
        .map(|b| b.trim().to_string())
        .filter(|b| !b.is_empty() && seen.insert(b.to_lowercase()))
        .collect()
}
