//! Time-to-live cache for the instrument listing.
//!
//! The listing is the only state kept across interactions. It is a single
//! entry: there is nothing to evict besides expiry. A persistent cache
//! mirrors the entry to a JSON file so the TTL holds across processes.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::{Instrument, ProviderId};

/// How a listing lookup treats the cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CacheMode {
    /// Serve a fresh cached listing; otherwise fetch and store. (Default)
    #[default]
    Use,
    /// Always fetch and overwrite the cached listing.
    Refresh,
    /// Always fetch; never read or write the cache.
    Bypass,
}

impl CacheMode {
    pub const fn reads(self) -> bool {
        matches!(self, Self::Use)
    }

    pub const fn writes(self) -> bool {
        !matches!(self, Self::Bypass)
    }
}

/// Cached listing snapshot, as held in memory and written to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedListing {
    pub instruments: Vec<Instrument>,
    pub source: ProviderId,
    pub fetched_at: SystemTime,
    pub ttl: Duration,
}

impl CachedListing {
    /// Time since the fetch; a timestamp in the future counts as expired.
    pub fn age(&self) -> Duration {
        SystemTime::now()
            .duration_since(self.fetched_at)
            .unwrap_or(Duration::MAX)
    }

    /// Fresh under both the stored TTL and `ttl`.
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.age() < self.ttl.min(ttl)
    }
}

/// Shared listing cache; clones share one entry.
#[derive(Debug, Clone)]
pub struct ListingCache {
    entry: Arc<RwLock<Option<CachedListing>>>,
    ttl: Duration,
    store: Option<PathBuf>,
}

impl ListingCache {
    /// In-memory cache for the lifetime of the process.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entry: Arc::new(RwLock::new(None)),
            ttl,
            store: None,
        }
    }

    /// Cache backed by the JSON file at `path`.
    pub fn persistent(ttl: Duration, path: impl Into<PathBuf>) -> Self {
        Self {
            store: Some(path.into()),
            ..Self::new(ttl)
        }
    }

    /// A cache that never stores anything.
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn path(&self) -> Option<&Path> {
        self.store.as_deref()
    }

    pub fn is_disabled(&self) -> bool {
        self.ttl == Duration::ZERO
    }

    /// The cached listing if it is younger than the TTL.
    ///
    /// Memory is checked first, then the backing file.
    pub async fn get(&self) -> Option<CachedListing> {
        {
            let entry = self.entry.read().await;
            if let Some(cached) = entry.as_ref().filter(|cached| cached.is_fresh(self.ttl)) {
                return Some(cached.clone());
            }
        }

        let path = self.store.as_deref()?;
        let loaded = load(path).await?;
        if !loaded.is_fresh(self.ttl) {
            debug!(path = %path.display(), age_secs = loaded.age().as_secs(), "stored listing expired");
            return None;
        }

        let mut entry = self.entry.write().await;
        *entry = Some(loaded.clone());
        Some(loaded)
    }

    pub async fn put(&self, instruments: Vec<Instrument>, source: ProviderId) {
        if self.is_disabled() {
            return;
        }

        let cached = CachedListing {
            instruments,
            source,
            fetched_at: SystemTime::now(),
            ttl: self.ttl,
        };
        if let Some(path) = &self.store {
            if let Err(error) = store(path, &cached).await {
                warn!(path = %path.display(), %error, "failed to persist listing cache");
            }
        }

        let mut entry = self.entry.write().await;
        *entry = Some(cached);
    }

    pub async fn clear(&self) {
        let mut entry = self.entry.write().await;
        *entry = None;

        if let Some(path) = &self.store {
            match tokio::fs::remove_file(path).await {
                Ok(()) => {}
                Err(error) if error.kind() == ErrorKind::NotFound => {}
                Err(error) => warn!(path = %path.display(), %error, "failed to remove listing cache"),
            }
        }
    }
}

/// Unreadable or malformed files are treated as a miss.
async fn load(path: &Path) -> Option<CachedListing> {
    let content = match tokio::fs::read(path).await {
        Ok(content) => content,
        Err(error) if error.kind() == ErrorKind::NotFound => return None,
        Err(error) => {
            warn!(path = %path.display(), %error, "failed to read listing cache");
            return None;
        }
    };

    match serde_json::from_slice(&content) {
        Ok(cached) => Some(cached),
        Err(error) => {
            warn!(path = %path.display(), %error, "ignoring malformed listing cache");
            None
        }
    }
}

async fn store(path: &Path, cached: &CachedListing) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let content = serde_json::to_vec(cached).map_err(std::io::Error::other)?;
    tokio::fs::write(path, content).await
}
