//! Data model shared by the coordinator and the gateway.
//!
//! Nothing in this crate talks to a transport or a store; it is pure data
//! plus the few invariant-checking constructors that keep the rest of the
//! workspace from re-deriving the same validation in three places.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

mod query_info;
pub use query_info::{QueryCategory, QueryInfo};

/// A search request as it arrives at the coordinator.
///
/// Invariants: `limit` is in `[1, 1000]`, `offset >= 0`, `query` is
/// non-empty after trimming. [`SearchRequest::validate`] enforces all three.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub index: String,
    pub limit: u32,
    pub offset: u32,
    /// Explicit engine override; when present, the router uses it as-is.
    pub engines: Option<Vec<String>>,
    pub engine_overrides: HashMap<String, String>,
    pub filters: HashMap<String, String>,
    pub sort_field: Option<String>,
    pub sort_order: Option<SortOrder>,
    pub highlight: bool,
    pub timeout_ms: Option<u64>,
    pub request_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Error returned by [`SearchRequest::validate`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RequestValidationError {
    #[error("query must not be empty")]
    EmptyQuery,
    #[error("limit {0} out of range [1, 1000]")]
    LimitOutOfRange(u32),
}

impl SearchRequest {
    pub fn validate(&self) -> Result<(), RequestValidationError> {
        if self.query.trim().is_empty() {
            return Err(RequestValidationError::EmptyQuery);
        }
        if self.limit == 0 || self.limit > 1000 {
            return Err(RequestValidationError::LimitOutOfRange(self.limit));
        }
        Ok(())
    }
}

/// One engine's contribution to a fan-out.
///
/// Invariant: when `error` is `Some`, `total` still equals `hits.len()`
/// (usually zero); `timed_out` implies a partial or empty result, never a
/// whole-request failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineResult {
    pub engine: String,
    pub hits: Vec<Hit>,
    pub total: u64,
    pub elapsed_ms: u64,
    pub error: Option<String>,
    pub timed_out: bool,
}

impl EngineResult {
    pub fn ok(engine: impl Into<String>, hits: Vec<Hit>, elapsed_ms: u64) -> Self {
        let total = hits.len() as u64;
        Self {
            engine: engine.into(),
            hits,
            total,
            elapsed_ms,
            error: None,
            timed_out: false,
        }
    }

    pub fn failed(engine: impl Into<String>, error: impl Into<String>, timed_out: bool) -> Self {
        Self {
            engine: engine.into(),
            hits: Vec::new(),
            total: 0,
            elapsed_ms: 0,
            error: Some(error.into()),
            timed_out,
        }
    }

    pub fn is_usable(&self) -> bool {
        self.error.is_none()
    }
}

/// A single result row, engine-local until the fuser assigns `rank`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    pub doc_id: String,
    pub index: String,
    /// Engine-local relevance score. Never negative.
    pub score: f64,
    pub title: Option<String>,
    pub content: Option<String>,
    pub highlights: HashMap<String, String>,
    pub fields: HashMap<String, String>,
    pub engine: String,
    /// 1-based rank. Always `0` until the fuser assigns it.
    pub rank: u32,
}

/// The merged response returned to the gateway (and, after JSON encoding, to
/// the client).
///
/// Invariant: `hits` is sorted by score descending, ranks are a contiguous
/// `1..=hits.len()`, and `doc_id`s are unique within the response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub request_id: String,
    pub hits: Vec<Hit>,
    pub total: u64,
    pub elapsed_ms: u64,
    pub engines_used: Vec<String>,
    pub cache_hit: bool,
    pub query_info: QueryInfo,
}

/// The router's choice of engines and weights for one request.
///
/// Invariant: `engines` is non-empty and `weights` sums to a positive value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub strategy: String,
    pub engines: Vec<String>,
    pub weights: HashMap<String, f64>,
    pub query_info: QueryInfo,
    pub decided_at_unix_ms: u64,
}

pub fn unix_millis_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
