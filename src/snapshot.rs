// src/snapshot.rs
//! Last-known filtered listing set: load, diff, replace.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::fs;

use crate::ingest::types::Listing;

/// Listings keyed by `link`; the first occurrence of a link wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    listings: Vec<Listing>,
}

impl Snapshot {
    pub fn new(listings: Vec<Listing>) -> Self {
        let mut seen = HashSet::new();
        let listings = listings
            .into_iter()
            .filter(|l| seen.insert(l.link.clone()))
            .collect();
        Self { listings }
    }

    pub fn listings(&self) -> &[Listing] {
        &self.listings
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }

    pub fn links(&self) -> HashSet<&str> {
        self.listings.iter().map(|l| l.link.as_str()).collect()
    }
}

/// Listings in `current` whose link is absent from `previous`, in `current` order.
pub fn diff(current: &Snapshot, previous: &Snapshot) -> Vec<Listing> {
    let seen = previous.links();
    current
        .listings
        .iter()
        .filter(|l| !seen.contains(l.link.as_str()))
        .cloned()
        .collect()
}

#[async_trait::async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Never fails: missing or corrupt state reads as empty.
    async fn load_previous(&self) -> Snapshot;
    /// Replace the stored snapshot wholesale.
    async fn persist(&self, current: &Snapshot) -> Result<()>;
}

/// JSON array of listings on disk.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl SnapshotStore for JsonFileStore {
    async fn load_previous(&self) -> Snapshot {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(s) => s,
            Err(e) => {
                tracing::debug!(target: "watch", path = %self.path.display(), error = %e, "no previous snapshot");
                return Snapshot::default();
            }
        };
        match serde_json::from_str::<Snapshot>(&raw) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(target: "watch", path = %self.path.display(), error = %e, "snapshot unreadable, starting empty");
                Snapshot::default()
            }
        }
    }

    async fn persist(&self, current: &Snapshot) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .await
                .with_context(|| format!("creating {}", dir.display()))?;
        }
        let body = serde_json::to_vec_pretty(current).context("encoding snapshot")?;

        // Write-then-rename so a crash never leaves half a file behind.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, body)
            .await
            .with_context(|| format!("writing {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("replacing {}", self.path.display()))?;
        Ok(())
    }
}

/// In-memory store for tests; counts persists.
#[doc(hidden)]
pub struct MemoryStore {
    pub stored: Mutex<Snapshot>,
    pub persist_calls: Mutex<usize>,
}

impl MemoryStore {
    pub fn new(initial: Snapshot) -> Self {
        Self {
            stored: Mutex::new(initial),
            persist_calls: Mutex::new(0),
        }
    }

    pub fn current(&self) -> Snapshot {
        self.stored.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn persist_count(&self) -> usize {
        self.persist_calls.lock().map(|n| *n).unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl SnapshotStore for MemoryStore {
    async fn load_previous(&self) -> Snapshot {
        self.current()
    }

    async fn persist(&self, current: &Snapshot) -> Result<()> {
        let mut stored = self
            .stored
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store poisoned"))?;
        *stored = current.clone();
        if let Ok(mut n) = self.persist_calls.lock() {
            *n += 1;
        }
        Ok(())
    }
}
