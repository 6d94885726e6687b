//! `search::SearchService` implementation: the coordinator's request
//! pipeline — cache lookup, query optimization, classification, routing,
//! fan-out, fusion, pagination, cache store.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use search_engine_peer::SearchPeer;
use search_errors::ERROR_KIND_METADATA_KEY;
use search_fuser::DEFAULT_TOP_K;
use search_kv::KvStore;
use search_types::{EngineResult, SearchRequest, SearchResponse};
use tonic::{Request, Response, Status};
use tower_resilience_cache::{CacheKeyParts, ResponseCache};
use tower_resilience_router::{QueryOptimizer, Router};

use crate::proto::search_service_server::SearchService;
use crate::proto::{
    BatchDocumentsReply, BatchDocumentsRequest, DocumentReply, DocumentRequest, IndexReply,
    IndexRequest, ListIndexesReply, ListIndexesRequest,
};

/// Wires the component pipeline together behind the generated gRPC trait.
///
/// Generic over the KV backend so tests can swap in `InMemoryKvStore` while
/// the binary wires a production store behind the same seam.
pub struct SearchEngine<K> {
    cache: ResponseCache<K>,
    optimizer: QueryOptimizer,
    router: Router,
    peers: HashMap<String, Arc<dyn SearchPeer>>,
}

impl<K> SearchEngine<K>
where
    K: KvStore + Clone + Send + Sync + 'static,
{
    pub fn new(
        cache: ResponseCache<K>,
        peers: HashMap<String, Arc<dyn SearchPeer>>,
    ) -> Self {
        Self {
            cache,
            optimizer: QueryOptimizer::new(),
            router: Router::new(),
            peers,
        }
    }

    fn cache_key(req: &SearchRequest) -> CacheKeyParts {
        CacheKeyParts::new(
            req.query.clone(),
            req.index.clone(),
            req.limit,
            req.offset,
            req.engines.clone().unwrap_or_default(),
            req.filters.clone(),
        )
    }

    async fn run_search(&self, req: SearchRequest) -> Result<SearchResponse, Status> {
        req.validate()
            .map_err(|e| Status::invalid_argument(e.to_string()))?;

        let key = Self::cache_key(&req);
        match self.cache.get(&key).await {
            Ok(Some(cached)) => return Ok(cached),
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "response cache read failed, falling through to fan-out"),
        }

        let started = Instant::now();

        // Classification looks at the query the client actually typed; the
        // optimizer's rewrite is used only to pick the search term sent to
        // engines, never to reclassify or re-key the cache.
        let info = tower_resilience_router::classifier::classify(&req.query);
        let optimized = self.optimizer.optimize(&req.query);
        let decision = self.router.route(&req, &info);

        let mut fanout_req = req.clone();
        if let Some(rewritten) = &optimized.rewritten_query {
            fanout_req.query = rewritten.clone();
        }

        let results_by_engine = search_fanout::execute(&fanout_req, &decision, &self.peers, None)
            .await
            .map_err(|_| no_engines_status(&decision))?;

        let results: Vec<EngineResult> = results_by_engine.into_values().collect();

        let fusion_name = req
            .engine_overrides
            .get("fusion")
            .map(String::as_str)
            .unwrap_or("rrf");
        let strategy = search_fuser::strategy_for(fusion_name);
        let fused = search_fuser::fuse(strategy.as_ref(), &results, &decision.weights, DEFAULT_TOP_K);
        let engines_used = search_fuser::engines_used(&results);
        let total: u64 = results.iter().map(|r| r.total).sum();

        let offset = req.offset as usize;
        let limit = req.limit as usize;
        let page: Vec<_> = fused
            .into_iter()
            .skip(offset)
            .take(limit)
            .enumerate()
            .map(|(i, mut hit)| {
                hit.rank = (i + 1) as u32;
                hit
            })
            .collect();

        let response = SearchResponse {
            request_id: req.request_id.clone(),
            hits: page,
            total,
            elapsed_ms: started.elapsed().as_millis() as u64,
            engines_used,
            cache_hit: false,
            query_info: info,
        };

        self.cache.set(key, response.clone(), None);

        Ok(response)
    }
}

/// Picks the `x-search-error-kind` metadata tag and `tonic::Code` for a
/// fan-out that produced no usable engine at all.
fn no_engines_status(decision: &search_types::RoutingDecision) -> Status {
    let hint = decision.strategy.as_str();
    let mut status = Status::unavailable(format!(
        "no engine in routing decision '{hint}' returned a usable result"
    ));
    status
        .metadata_mut()
        .insert(ERROR_KIND_METADATA_KEY, "upstream_unavailable".parse().unwrap());
    status
}

#[tonic::async_trait]
impl<K> SearchService for SearchEngine<K>
where
    K: KvStore + Clone + Send + Sync + 'static,
{
    async fn search(
        &self,
        request: Request<crate::proto::SearchRequest>,
    ) -> Result<Response<crate::proto::SearchResponse>, Status> {
        let domain_req: SearchRequest = request.into_inner().into();
        let response = self.run_search(domain_req).await?;
        Ok(Response::new(response.into()))
    }

    async fn add_document(
        &self,
        _request: Request<DocumentRequest>,
    ) -> Result<Response<DocumentReply>, Status> {
        Err(Status::unimplemented(
            "coordinator is stateless and does not own a document store",
        ))
    }

    async fn get_document(
        &self,
        _request: Request<DocumentRequest>,
    ) -> Result<Response<DocumentReply>, Status> {
        Err(Status::unimplemented(
            "coordinator is stateless and does not own a document store",
        ))
    }

    async fn update_document(
        &self,
        _request: Request<DocumentRequest>,
    ) -> Result<Response<DocumentReply>, Status> {
        Err(Status::unimplemented(
            "coordinator is stateless and does not own a document store",
        ))
    }

    async fn delete_document(
        &self,
        _request: Request<DocumentRequest>,
    ) -> Result<Response<DocumentReply>, Status> {
        Err(Status::unimplemented(
            "coordinator is stateless and does not own a document store",
        ))
    }

    async fn batch_documents(
        &self,
        _request: Request<BatchDocumentsRequest>,
    ) -> Result<Response<BatchDocumentsReply>, Status> {
        Err(Status::unimplemented(
            "coordinator is stateless and does not own a document store",
        ))
    }

    async fn create_index(
        &self,
        _request: Request<IndexRequest>,
    ) -> Result<Response<IndexReply>, Status> {
        Err(Status::unimplemented("index lifecycle is not owned by the coordinator"))
    }

    async fn list_indexes(
        &self,
        _request: Request<ListIndexesRequest>,
    ) -> Result<Response<ListIndexesReply>, Status> {
        Err(Status::unimplemented("index lifecycle is not owned by the coordinator"))
    }

    async fn get_index(
        &self,
        _request: Request<IndexRequest>,
    ) -> Result<Response<IndexReply>, Status> {
        Err(Status::unimplemented("index lifecycle is not owned by the coordinator"))
    }

    async fn delete_index(
        &self,
        _request: Request<IndexRequest>,
    ) -> Result<Response<IndexReply>, Status> {
        Err(Status::unimplemented("index lifecycle is not owned by the coordinator"))
    }

    async fn rebuild_index(
        &self,
        _request: Request<IndexRequest>,
    ) -> Result<Response<IndexReply>, Status> {
        Err(Status::unimplemented("index lifecycle is not owned by the coordinator"))
    }
}
