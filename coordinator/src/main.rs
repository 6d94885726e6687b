//! Coordinator binary: loads configuration, assembles the engine peers and
//! response cache, and serves `SearchService` over gRPC with health and
//! reflection sub-services alongside it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use search_engine_peer::{EnginePeer, MockTransport, SearchPeer};
use search_kv::InMemoryKvStore;
use search_types::{EngineResult, Hit};
use tonic::transport::Server;
use tower_resilience_cache::ResponseCache;
use tracing::info;

use coordinator::config::Config;
use coordinator::proto::search_service_server::SearchServiceServer;
use coordinator::proto::FILE_DESCRIPTOR_SET;
use coordinator::service::SearchEngine;

/// Canned per-engine hits so the running binary is demonstrably functional
/// without a live upstream search engine behind it — the coordinator's
/// `EnginePeer`s are backed by `MockTransport` (see `config::EngineEntryConfig`).
fn fixture_hits(engine: &str) -> Vec<Hit> {
    (1..=3)
        .map(|i| Hit {
            doc_id: format!("{engine}-doc-{i}"),
            index: "docs".to_string(),
            score: 10.0 - i as f64,
            title: Some(format!("{engine} result {i}")),
            content: Some(format!("fixture content served by the {engine} engine")),
            highlights: HashMap::new(),
            fields: HashMap::new(),
            engine: engine.to_string(),
            rank: 0,
        })
        .collect()
}

fn build_peers(config: &Config) -> HashMap<String, Arc<dyn SearchPeer>> {
    config
        .engines
        .keys()
        .map(|name| {
            let transport = MockTransport::new(EngineResult::ok(name.clone(), fixture_hits(name), 5));
            let peer: Arc<dyn SearchPeer> = Arc::new(EnginePeer::new(name.clone(), transport));
            (name.clone(), peer)
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_target(false).with_level(true).init();

    let config = Config::load();
    let addr = format!("{}:{}", config.rpc.host, config.rpc.port).parse()?;

    let peers = build_peers(&config);
    let cache = ResponseCache::new(InMemoryKvStore::new(), config.cache.default_ttl);
    let engine = SearchEngine::new(cache, peers);

    let search_service = SearchServiceServer::new(engine)
        .max_decoding_message_size(config.rpc.max_message_bytes)
        .max_encoding_message_size(config.rpc.max_message_bytes);

    let (mut health_reporter, health_service) = tonic_health::server::health_reporter();
    health_reporter
        .set_serving::<SearchServiceServer<SearchEngine<InMemoryKvStore>>>()
        .await;

    let reflection_service = tonic_reflection::server::Builder::configure()
        .register_encoded_file_descriptor_set(FILE_DESCRIPTOR_SET)
        .build_v1()?;

    info!(%addr, engines = ?config.engines.keys().collect::<Vec<_>>(), "starting coordinator");

    Server::builder()
        .add_service(search_service)
        .add_service(health_service)
        .add_service(reflection_service)
        .serve_with_shutdown(addr, shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received, draining in-flight requests");
    tokio::time::sleep(Duration::from_millis(50)).await;
}
