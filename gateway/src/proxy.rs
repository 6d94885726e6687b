//! Wraps the coordinator's gRPC client so that each upstream-call family
//! (search, document, index, health) is gated by its own [`SearchBreaker`]
//! with family-tailored thresholds, rather than one breaker shared across
//! every RPC the gateway makes.

use std::time::Duration;

use coordinator::proto::search_service_client::SearchServiceClient;
use coordinator::proto::{
    BatchDocumentsReply, BatchDocumentsRequest, DocumentReply, DocumentRequest, IndexReply,
    IndexRequest, ListIndexesReply, ListIndexesRequest, SearchRequest, SearchResponse,
};
use search_errors::ERROR_KIND_METADATA_KEY;
use tonic::transport::Channel;
use tonic::Status;
use tonic_health::pb::health_client::HealthClient;
use tonic_health::pb::{HealthCheckRequest, HealthCheckResponse};
use tower_resilience_circuitbreaker::{BreakerConfig, BreakerError, BreakerState, SearchBreaker};

/// Which breaker gates a given upstream call. Kept as a small enum key
/// rather than a dynamic per-route map — the coordinator exposes exactly
/// four RPC families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpstreamFamily {
    Search,
    Document,
    Index,
    Health,
}

impl UpstreamFamily {
    fn name(self) -> &'static str {
        match self {
            UpstreamFamily::Search => "search",
            UpstreamFamily::Document => "document",
            UpstreamFamily::Index => "index",
            UpstreamFamily::Health => "health",
        }
    }

    /// Thresholds from §4.10: search 3/10s, document 5/15s, index 3/20s,
    /// health 2/5s. `min_request_threshold` is set equal to
    /// `failure_threshold` — the spec names only a failure count and a
    /// cooldown per family, so the minimum-sample gate is the tightest one
    /// consistent with that count.
    fn config(self) -> BreakerConfig {
        match self {
            UpstreamFamily::Search => BreakerConfig {
                failure_threshold: 3,
                success_threshold: 2,
                timeout: Duration::from_secs(10),
                min_request_threshold: 3,
            },
            UpstreamFamily::Document => BreakerConfig {
                failure_threshold: 5,
                success_threshold: 2,
                timeout: Duration::from_secs(15),
                min_request_threshold: 5,
            },
            UpstreamFamily::Index => BreakerConfig {
                failure_threshold: 3,
                success_threshold: 2,
                timeout: Duration::from_secs(20),
                min_request_threshold: 3,
            },
            UpstreamFamily::Health => BreakerConfig {
                failure_threshold: 2,
                success_threshold: 1,
                timeout: Duration::from_secs(5),
                min_request_threshold: 2,
            },
        }
    }
}

/// Owns the coordinator client and the four named breakers that gate calls
/// made through it. Cheap to clone — `SearchServiceClient<Channel>` clones
/// an `Arc`-backed connection handle and every breaker clones an `Arc` too.
#[derive(Clone)]
pub struct GatewayProxy {
    client: SearchServiceClient<Channel>,
    health_client: HealthClient<Channel>,
    search: SearchBreaker,
    document: SearchBreaker,
    index: SearchBreaker,
    health: SearchBreaker,
}

impl GatewayProxy {
    pub fn new(channel: Channel) -> Self {
        Self {
            client: SearchServiceClient::new(channel.clone()),
            health_client: HealthClient::new(channel),
            search: SearchBreaker::new(UpstreamFamily::Search.name(), UpstreamFamily::Search.config()),
            document: SearchBreaker::new(UpstreamFamily::Document.name(), UpstreamFamily::Document.config()),
            index: SearchBreaker::new(UpstreamFamily::Index.name(), UpstreamFamily::Index.config()),
            health: SearchBreaker::new(UpstreamFamily::Health.name(), UpstreamFamily::Health.config()),
        }
    }

    fn breaker(&self, family: UpstreamFamily) -> &SearchBreaker {
        match family {
            UpstreamFamily::Search => &self.search,
            UpstreamFamily::Document => &self.document,
            UpstreamFamily::Index => &self.index,
            UpstreamFamily::Health => &self.health,
        }
    }

    /// Current breaker state for every family, for `/health/circuit-breakers`.
    pub fn breaker_states(&self) -> Vec<(&'static str, BreakerState)> {
        [UpstreamFamily::Search, UpstreamFamily::Document, UpstreamFamily::Index, UpstreamFamily::Health]
            .into_iter()
            .map(|family| (family.name(), self.breaker(family).state()))
            .collect()
    }

    /// Routes an arbitrary call through the named family's breaker,
    /// translating `BreakerError::Open` into a `Status::unavailable` tagged
    /// with `x-search-error-kind: upstream_breaker_open` so `ErrorMapper`
    /// maps it to 503 with the distinct error code rather than a generic
    /// upstream failure.
    async fn call<F, Fut, T>(&self, family: UpstreamFamily, f: F) -> Result<T, Status>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, Status>>,
    {
        match self.breaker(family).execute(f).await {
            Ok(v) => Ok(v),
            Err(BreakerError::Open) => Err(breaker_open_status(family)),
            Err(BreakerError::Inner(status)) => Err(status),
        }
    }

    /// Checks the well-known `grpc.health.v1.Health` service the coordinator
    /// exposes alongside `SearchService` (see `coordinator::main`'s
    /// `tonic_health::server::health_reporter` wiring), gated by the
    /// `health` breaker rather than `search`'s stricter one.
    pub async fn health_check(&self, service: String) -> Result<HealthCheckResponse, Status> {
        let mut client = self.health_client.clone();
        self.call(UpstreamFamily::Health, move || async move {
            client.check(HealthCheckRequest { service }).await.map(|r| r.into_inner())
        })
        .await
    }

    pub async fn search(&self, request: SearchRequest) -> Result<SearchResponse, Status> {
        let mut client = self.client.clone();
        self.call(UpstreamFamily::Search, move || async move {
            client.search(request).await.map(|r| r.into_inner())
        })
        .await
    }

    pub async fn add_document(&self, request: DocumentRequest) -> Result<DocumentReply, Status> {
        let mut client = self.client.clone();
        self.call(UpstreamFamily::Document, move || async move {
            client.add_document(request).await.map(|r| r.into_inner())
        })
        .await
    }

    pub async fn get_document(&self, request: DocumentRequest) -> Result<DocumentReply, Status> {
        let mut client = self.client.clone();
        self.call(UpstreamFamily::Document, move || async move {
            client.get_document(request).await.map(|r| r.into_inner())
        })
        .await
    }

    pub async fn update_document(&self, request: DocumentRequest) -> Result<DocumentReply, Status> {
        let mut client = self.client.clone();
        self.call(UpstreamFamily::Document, move || async move {
            client.update_document(request).await.map(|r| r.into_inner())
        })
        .await
    }

    pub async fn delete_document(&self, request: DocumentRequest) -> Result<DocumentReply, Status> {
        let mut client = self.client.clone();
        self.call(UpstreamFamily::Document, move || async move {
            client.delete_document(request).await.map(|r| r.into_inner())
        })
        .await
    }

    pub async fn batch_documents(
        &self,
        request: BatchDocumentsRequest,
    ) -> Result<BatchDocumentsReply, Status> {
        let mut client = self.client.clone();
        self.call(UpstreamFamily::Document, move || async move {
            client.batch_documents(request).await.map(|r| r.into_inner())
        })
        .await
    }

    pub async fn create_index(&self, request: IndexRequest) -> Result<IndexReply, Status> {
        let mut client = self.client.clone();
        self.call(UpstreamFamily::Index, move || async move {
            client.create_index(request).await.map(|r| r.into_inner())
        })
        .await
    }

    pub async fn list_indexes(&self, request: ListIndexesRequest) -> Result<ListIndexesReply, Status> {
        let mut client = self.client.clone();
        self.call(UpstreamFamily::Index, move || async move {
            client.list_indexes(request).await.map(|r| r.into_inner())
        })
        .await
    }

    pub async fn get_index(&self, request: IndexRequest) -> Result<IndexReply, Status> {
        let mut client = self.client.clone();
        self.call(UpstreamFamily::Index, move || async move {
            client.get_index(request).await.map(|r| r.into_inner())
        })
        .await
    }

    pub async fn delete_index(&self, request: IndexRequest) -> Result<IndexReply, Status> {
        let mut client = self.client.clone();
        self.call(UpstreamFamily::Index, move || async move {
            client.delete_index(request).await.map(|r| r.into_inner())
        })
        .await
    }

    pub async fn rebuild_index(&self, request: IndexRequest) -> Result<IndexReply, Status> {
        let mut client = self.client.clone();
        self.call(UpstreamFamily::Index, move || async move {
            client.rebuild_index(request).await.map(|r| r.into_inner())
        })
        .await
    }
}

fn breaker_open_status(family: UpstreamFamily) -> Status {
    let mut status = Status::unavailable(format!("{} circuit breaker open", family.name()));
    status
        .metadata_mut()
        .insert(ERROR_KIND_METADATA_KEY, "upstream_breaker_open".parse().unwrap());
    status
}
