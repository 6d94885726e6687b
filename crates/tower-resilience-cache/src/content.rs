//! Content-addressed memoization of [`SearchResponse`] values.
//!
//! Unlike [`crate::Cache`] (an in-process LRU/LFU/FIFO keyed by whatever the
//! caller's [`crate::KeyExtractor`] produces), [`ResponseCache`] derives its
//! key from request identity alone and stores through a [`KvStore`] so the
//! entry survives process restarts and is shared across coordinator
//! replicas. The two caches solve different problems and both stay in the
//! workspace.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use search_kv::{KvError, KvStore};
use search_types::SearchResponse;

const KEY_PREFIX: &str = "search:";

/// The fields that participate in cache identity. Built from a
/// [`search_types::SearchRequest`] by the coordinator before calling
/// [`ResponseCache::get`]/[`set`](ResponseCache::set); kept separate from
/// `SearchRequest` itself so request id and timeout — both irrelevant to
/// identity — can never leak into the digest by accident.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKeyParts {
    pub query: String,
    pub index: String,
    pub limit: u32,
    pub offset: u32,
    pub engines: Vec<String>,
    pub filters: BTreeMap<String, String>,
}

impl CacheKeyParts {
    /// Canonicalizes `engines` (sorted) and folds an unordered filter map
    /// into a `BTreeMap` so two requests differing only in map/vec
    /// iteration order hash identically.
    pub fn new(
        query: impl Into<String>,
        index: impl Into<String>,
        limit: u32,
        offset: u32,
        mut engines: Vec<String>,
        filters: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        engines.sort();
        Self {
            query: query.into(),
            index: index.into(),
            limit,
            offset,
            engines,
            filters: filters.into_iter().collect(),
        }
    }

    /// `"search:" + blake3(canonical JSON)`, hex-encoded.
    fn cache_key(&self) -> String {
        // serde_json over a BTreeMap-backed struct gives deterministic key
        // ordering; the JSON text itself is only ever hashed, never stored.
        let canonical = serde_json::json!({
            "query": self.query,
            "index": self.index,
            "limit": self.limit,
            "offset": self.offset,
            "engines": self.engines,
            "filters": self.filters,
        });
        let bytes = serde_json::to_vec(&canonical).unwrap_or_default();
        let digest = blake3::hash(&bytes);
        format!("{KEY_PREFIX}{}", digest.to_hex())
    }
}

/// Monotonic hit/miss counters with a derived hit rate.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CacheStats {
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// `0.0` when nothing has been recorded yet, rather than `NaN`.
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits() as f64;
        let total = hits + self.misses() as f64;
        if total == 0.0 {
            0.0
        } else {
            hits / total
        }
    }

    fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }
}

/// Errors a caller might want to distinguish; cache misses are not errors.
#[derive(Debug, thiserror::Error)]
pub enum CacheAccessError {
    #[error("cache backend error: {0}")]
    Backend(#[from] KvError),
    #[error("stored cache entry was not valid: {0}")]
    Corrupt(String),
}

/// Content-addressed [`SearchResponse`] memoization over a [`KvStore`].
///
/// Reads are synchronous with the caller (a miss must be known before the
/// coordinator decides to fan out); writes are detached — see
/// [`ResponseCache::set`].
#[derive(Clone)]
pub struct ResponseCache<K> {
    kv: K,
    default_ttl: Duration,
    stats: std::sync::Arc<CacheStats>,
}

impl<K> ResponseCache<K>
where
    K: KvStore + Clone + Send + Sync + 'static,
{
    pub fn new(kv: K, default_ttl: Duration) -> Self {
        Self {
            kv,
            default_ttl,
            stats: std::sync::Arc::new(CacheStats::default()),
        }
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Returns `(response, true)` on a hit with `cache_hit` forced to
    /// `true`, or `(_, false)` on a miss. Does not distinguish "absent" from
    /// "present but undecodable" to the caller — a corrupt entry is treated
    /// as a miss so a bad write can never wedge the cache — but still
    /// records it via [`CacheAccessError::Corrupt`] for the caller to log.
    pub async fn get(
        &self,
        key: &CacheKeyParts,
    ) -> Result<Option<SearchResponse>, CacheAccessError> {
        let storage_key = key.cache_key();
        match self.kv.get(&storage_key).await? {
            Some(bytes) => match bincode::deserialize::<SearchResponse>(&bytes) {
                Ok(mut response) => {
                    response.cache_hit = true;
                    self.stats.record_hit();
                    Ok(Some(response))
                }
                Err(e) => {
                    self.stats.record_miss();
                    Err(CacheAccessError::Corrupt(e.to_string()))
                }
            },
            None => {
                self.stats.record_miss();
                Ok(None)
            }
        }
    }

    /// Spawns a detached task that encodes and writes `response`; returns
    /// immediately regardless of how long the KV write takes. `ttl` of
    /// `None` uses the cache's configured default.
    pub fn set(&self, key: CacheKeyParts, response: SearchResponse, ttl: Option<Duration>) {
        let kv = self.kv.clone();
        let ttl = ttl.unwrap_or(self.default_ttl);
        tokio::spawn(async move {
            let storage_key = key.cache_key();
            let Ok(bytes) = bincode::serialize(&response) else {
                return;
            };
            let _ = kv.set(&storage_key, bytes, Some(ttl)).await;
        });
    }

    /// Administrative invalidation of every entry whose key starts with
    /// `prefix` (callers pass `"search:"` for everything, or a
    /// `"search:<digest-prefix>"` for a narrower sweep). Returns the number
    /// of keys removed.
    pub async fn delete_by_prefix(&self, prefix: &str) -> Result<u64, CacheAccessError> {
        Ok(self.kv.delete_by_prefix(prefix).await?)
    }
}
