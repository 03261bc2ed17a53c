use crate::metadata::ResolvedMetadata;
use crate::storage::StorageManager;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Longest base64 stem kept as a file name before switching to a digest.
const MAX_KEY_LEN: usize = 200;
const KEY_EXT: &str = ".json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub url: String,
    #[serde(flatten)]
    pub metadata: ResolvedMetadata,
    /// Epoch milliseconds of the write.
    pub timestamp: i64,
}

impl CacheEntry {
    pub fn new(url: &str, metadata: &ResolvedMetadata) -> Self {
        Self {
            url: url.to_string(),
            metadata: metadata.clone(),
            timestamp: now_millis(),
        }
    }

    /// Entries stamped in the future are never fresh.
    pub fn is_fresh(&self, now_ms: i64, ttl: Duration) -> bool {
        self.timestamp <= now_ms && now_ms - self.timestamp < ttl.as_millis() as i64
    }
}

pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Key/value store of resolved metadata keyed by the submitted URL.
/// Freshness is decided by the caller.
pub trait CacheStore: Send + Sync {
    fn get(&self, url: &str) -> anyhow::Result<Option<CacheEntry>>;
    fn put(&self, url: &str, metadata: &ResolvedMetadata) -> anyhow::Result<()>;
}

/// [`CacheStore`] over a blob store, one JSON file per URL.
#[derive(Clone)]
pub struct StorageCache {
    storage: Arc<dyn StorageManager>,
}

impl StorageCache {
    pub fn new(storage: Arc<dyn StorageManager>) -> Self {
        Self { storage }
    }

    /// Reversible base64url of the URL, or a sha256 digest when the encoded
    /// form would not fit in a file name.
    pub fn key(url: &str) -> String {
        let encoded = URL_SAFE_NO_PAD.encode(url.as_bytes());
        if encoded.len() <= MAX_KEY_LEN {
            return format!("{encoded}{KEY_EXT}");
        }

        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        let digest: [u8; 32] = hasher.finalize().into();
        let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
        format!("sha256-{hex}{KEY_EXT}")
    }

    pub fn put_entry(&self, entry: &CacheEntry) -> anyhow::Result<()> {
        let data = serde_json::to_vec(entry)?;
        self.storage.write(&Self::key(&entry.url), &data)?;
        Ok(())
    }

    fn decode(ident: &str, data: &[u8]) -> Option<CacheEntry> {
        match serde_json::from_slice::<CacheEntry>(data) {
            Ok(entry) => Some(entry),
            Err(e) => {
                log::warn!("cache entry {ident} is malformed, ignoring: {e}");
                None
            }
        }
    }

    /// Every decodable entry, with its storage key.
    pub fn entries(&self) -> anyhow::Result<Vec<(String, CacheEntry)>> {
        let mut entries = Vec::new();
        for ident in self.storage.list() {
            if !ident.ends_with(KEY_EXT) {
                continue;
            }
            let data = self.storage.read(&ident)?;
            if let Some(entry) = Self::decode(&ident, &data) {
                entries.push((ident, entry));
            }
        }
        Ok(entries)
    }

    /// Delete stale entries, or every entry when `all` is set.
    /// Undecodable blobs count as stale. Returns how many were removed.
    pub fn purge(&self, now_ms: i64, ttl: Duration, all: bool) -> anyhow::Result<usize> {
        let mut removed = 0;
        for ident in self.storage.list() {
            if !ident.ends_with(KEY_EXT) {
                continue;
            }
            let keep = !all
                && Self::decode(&ident, &self.storage.read(&ident)?)
                    .map(|entry| entry.is_fresh(now_ms, ttl))
                    .unwrap_or(false);
            if !keep {
                self.storage.delete(&ident)?;
                removed += 1;
            }
        }
        log::info!("purged {removed} cache entries");
        Ok(removed)
    }
}

impl CacheStore for StorageCache {
    fn get(&self, url: &str) -> anyhow::Result<Option<CacheEntry>> {
        let ident = Self::key(url);
        if !self.storage.exists(&ident) {
            return Ok(None);
        }
        let data = self.storage.read(&ident)?;
        Ok(Self::decode(&ident, &data))
    }

    fn put(&self, url: &str, metadata: &ResolvedMetadata) -> anyhow::Result<()> {
        self.put_entry(&CacheEntry::new(url, metadata))
    }
}
