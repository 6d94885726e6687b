use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;
use search_kv::InMemoryKvStore;
use tower_resilience_ratelimiter::TieredRateLimiter;

use crate::config::Config;
use crate::proxy::GatewayProxy;

/// Shared, process-wide state handed to every handler: the breaker-wrapped
/// coordinator client, the rate limiter's KV-backed bucket store, the
/// configured auth token set, and the Prometheus recorder handle.
#[derive(Clone)]
pub struct AppState {
    pub proxy: GatewayProxy,
    pub rate_limiter: Arc<TieredRateLimiter<InMemoryKvStore>>,
    pub auth_tokens: Arc<Vec<String>>,
    pub config: Arc<Config>,
    pub metrics_handle: PrometheusHandle,
}
