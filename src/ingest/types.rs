// src/ingest/types.rs
use serde::{Deserialize, Serialize};

use crate::ingest::fetch::FetchError;

/// Price text stored when a listing shows no price.
pub const PRICE_NOT_LISTED: &str = "Price not listed";

/// Structural description of one monitored listing page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceSpec {
    /// Page to fetch; also the base for resolving relative links.
    pub url: String,
    /// Selector matching one product card.
    pub item: String,
    pub name: String,
    pub price: String,
    pub link: String,
    /// Per-source override of the escalation threshold (bytes).
    #[serde(default)]
    pub min_body_len: Option<usize>,
}

impl SourceSpec {
    pub fn new(url: &str, item: &str, name: &str, price: &str, link: &str) -> Self {
        Self {
            url: url.to_string(),
            item: item.to_string(),
            name: name.to_string(),
            price: price.to_string(),
            link: link.to_string(),
            min_body_len: None,
        }
    }
}

/// One extracted product. Identity is `link`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Listing {
    pub name: String,
    pub price: String,
    pub link: String,  // absolute
    pub source: String, // SourceSpec.url
}

/// Outcome of the fetch + extract unit for one source.
#[derive(Debug)]
pub struct SourceReport {
    pub source: String,
    pub result: Result<Vec<Listing>, FetchError>,
}

/// Anything that can turn a source URL into page HTML.
#[async_trait::async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, spec: &SourceSpec) -> Result<String, FetchError>;
    fn name(&self) -> &'static str;
}
