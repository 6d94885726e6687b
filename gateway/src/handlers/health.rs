//! `/health`, `/health/services`, `/health/circuit-breakers` — unauthenticated.

use axum::extract::State;
use axum::response::Json;
use serde::Serialize;
use tonic_health::pb::health_check_response::ServingStatus;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct LivenessBody {
    pub status: &'static str,
}

/// Liveness: the process accepted the connection and can respond. Never
/// consults the coordinator.
pub async fn liveness() -> Json<LivenessBody> {
    Json(LivenessBody { status: "alive" })
}

#[derive(Debug, Serialize)]
pub struct ServiceHealthBody {
    pub service: String,
    pub status: String,
}

/// Readiness: asks the coordinator's `grpc.health.v1.Health` service about
/// `SearchService`'s own reported status.
pub async fn services(State(state): State<AppState>) -> Json<ServiceHealthBody> {
    let service = "search.SearchService".to_string();
    let status = match state.proxy.health_check(service.clone()).await {
        Ok(reply) => serving_status_str(reply.status),
        Err(_) => "unreachable",
    };
    Json(ServiceHealthBody { service, status: status.to_string() })
}

fn serving_status_str(status: i32) -> &'static str {
    match ServingStatus::try_from(status).unwrap_or(ServingStatus::Unknown) {
        ServingStatus::Serving => "serving",
        ServingStatus::NotServing => "not_serving",
        ServingStatus::ServiceUnknown => "service_unknown",
        ServingStatus::Unknown => "unknown",
    }
}

#[derive(Debug, Serialize)]
pub struct BreakerStateBody {
    pub family: &'static str,
    pub state: &'static str,
}

#[derive(Debug, Serialize)]
pub struct CircuitBreakersBody {
    pub breakers: Vec<BreakerStateBody>,
}

pub async fn circuit_breakers(State(state): State<AppState>) -> Json<CircuitBreakersBody> {
    let breakers = state
        .proxy
        .breaker_states()
        .into_iter()
        .map(|(family, breaker_state)| BreakerStateBody {
            family,
            state: match breaker_state {
                tower_resilience_circuitbreaker::BreakerState::Closed => "closed",
                tower_resilience_circuitbreaker::BreakerState::Open => "open",
                tower_resilience_circuitbreaker::BreakerState::HalfOpen => "half_open",
            },
        })
        .collect();
    Json(CircuitBreakersBody { breakers })
}
