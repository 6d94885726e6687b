//! The external key-value store, modeled as a trait.
//!
//! The rate limiter and response cache both treat their persistence layer
//! as "an external collaborator" — this crate is the narrow seam between
//! them and whatever actually backs it (Redis in production, an in-process
//! map in tests and the bundled binaries).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

mod memory;
pub use memory::InMemoryKvStore;

/// Error surfaced by a [`KvStore`] implementation. Denial of a rate-limit or
/// cache lookup is never represented as an error — only genuine backend
/// faults are.
#[derive(Debug, thiserror::Error)]
pub enum KvError {
    #[error("kv backend unavailable: {0}")]
    Unavailable(String),
}

/// An async key-value store with per-key TTL and prefix deletion.
///
/// Implementations must be `Send + Sync` so a single handle can be shared
/// across every request-scoped task.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KvError>;

    /// Sets `key` to `value`, refreshing its TTL. A `None` TTL means the key
    /// never expires on its own.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<(), KvError>;

    async fn delete(&self, key: &str) -> Result<(), KvError>;

    /// Deletes every key starting with `prefix`. Returns the number of keys
    /// removed, for admin/observability endpoints.
    async fn delete_by_prefix(&self, prefix: &str) -> Result<u64, KvError>;
}

/// Lets callers share a single store behind `Arc<dyn KvStore>` without a
/// wrapper newtype.
#[async_trait]
impl<T: KvStore + ?Sized> KvStore for Arc<T> {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KvError> {
        self.as_ref().get(key).await
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<(), KvError> {
        self.as_ref().set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<(), KvError> {
        self.as_ref().delete(key).await
    }

    async fn delete_by_prefix(&self, prefix: &str) -> Result<u64, KvError> {
        self.as_ref().delete_by_prefix(prefix).await
    }
}
