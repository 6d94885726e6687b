//! Tiered token-bucket admission middleware.
//!
//! Wraps `TieredRateLimiter::allow` as an axum middleware: resolves a
//! rate-limit key (by user subject when authenticated, else by client IP —
//! §6's "by-user/by-ip" configuration knobs) and a tier (from the
//! configured tier header, default tier on anything unrecognized), admits
//! or rejects, and attaches the `RateLimit-*` response headers either way.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use search_errors::GatewayError;
use search_kv::InMemoryKvStore;
use tower_resilience_ratelimiter::{Tier, TieredRateLimiter};

use crate::auth::AuthContext;
use crate::config::RateLimitConfig;
use crate::request_id::request_id_of;

#[derive(Clone)]
pub struct RateLimitState {
    pub limiter: Arc<TieredRateLimiter<InMemoryKvStore>>,
    pub config: RateLimitConfig,
}

fn rate_limit_key(req: &Request) -> String {
    if let Some(ctx) = req.extensions().get::<AuthContext>() {
        return format!("user:{}", ctx.subject);
    }
    if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return format!("ip:{}", addr.ip());
    }
    "anonymous".to_string()
}

fn resolve_tier(req: &Request, header_name: &str) -> Tier {
    req.headers()
        .get(header_name)
        .and_then(|v| v.to_str().ok())
        .map(Tier::parse)
        .unwrap_or(Tier::Free)
}

pub async fn enforce_tiered_rate_limit(
    State(state): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Result<Response, GatewayError> {
    if !state.config.enabled {
        return Ok(next.run(req).await);
    }

    let request_id = request_id_of(&req);
    let key = rate_limit_key(&req);
    let tier = resolve_tier(&req, &state.config.tier_header);

    let decision = match state.limiter.allow(&key, tier).await {
        Ok(d) => d,
        Err(e) => {
            tracing::warn!(error = %e, "rate limiter KV read failed, admitting request");
            let mut response = next.run(req).await;
            response.headers_mut().insert(
                "ratelimit-tier",
                HeaderValue::from_static("free"),
            );
            return Ok(response);
        }
    };

    if !decision.allowed {
        let retry_after = tier.config().window.as_secs();
        let mut response = GatewayError::rate_limited(request_id, retry_after).into_response();
        apply_rate_limit_headers(response.headers_mut(), &decision);
        return Ok(response);
    }

    let mut response = next.run(req).await;
    apply_rate_limit_headers(response.headers_mut(), &decision);
    Ok(response)
}

fn apply_rate_limit_headers(
    headers: &mut axum::http::HeaderMap,
    decision: &tower_resilience_ratelimiter::AdmissionDecision,
) {
    headers.insert("ratelimit-limit", HeaderValue::from_str(&decision.limit.to_string()).unwrap());
    headers.insert(
        "ratelimit-remaining",
        HeaderValue::from_str(&decision.remaining_estimate.to_string()).unwrap(),
    );
    headers.insert(
        "ratelimit-reset",
        HeaderValue::from_str(&decision.reset_unix_secs.to_string()).unwrap(),
    );
    headers.insert(
        "ratelimit-tier",
        HeaderValue::from_str(decision.tier.as_str()).unwrap(),
    );
}
