//! Parallel dispatch of a [`RoutingDecision`] across engine peers, under a
//! shared deadline, with partial-failure tolerance.
//!
//! Owns no state itself — it is a pure coordinator over peer references,
//! matching the data model's ownership note that FanOut "owns no state".

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use search_engine_peer::SearchPeer;
use search_types::{EngineResult, RoutingDecision, SearchRequest};
use tokio::time::Instant;

/// Upper bound on the effective fan-out deadline when neither the request
/// nor the caller specify a tighter one.
pub const DEFAULT_FANOUT_TIMEOUT: Duration = Duration::from_millis(800);

/// Returned when every engine in the decision failed or the deadline
/// elapsed before any of them returned.
#[derive(Debug, Clone, thiserror::Error)]
#[error("no engines available")]
pub struct NoEnginesAvailable;

/// Executes `decision` against `peers`, returning one [`EngineResult`] per
/// engine named in the decision.
///
/// `caller_deadline` is the caller's own remaining budget (e.g. what's left
/// of an inbound gRPC context deadline); the effective deadline is the
/// minimum of that, [`DEFAULT_FANOUT_TIMEOUT`], and the request's own
/// `timeout_ms` if set.
pub async fn execute(
    req: &SearchRequest,
    decision: &RoutingDecision,
    peers: &HashMap<String, Arc<dyn SearchPeer>>,
    caller_deadline: Option<Duration>,
) -> Result<HashMap<String, EngineResult>, NoEnginesAvailable> {
    let deadline = effective_deadline(req, caller_deadline);
    let start = Instant::now();

    let mut handles = Vec::with_capacity(decision.engines.len());
    for engine in &decision.engines {
        let Some(peer) = peers.get(engine).cloned() else {
            continue;
        };
        let query = req.query.clone();
        let index = req.index.clone();
        let limit = req.limit;
        let engine_name = engine.clone();
        handles.push((
            engine_name,
            tokio::spawn(async move { peer.search(&query, &index, limit).await }),
        ));
    }

    let mut results = HashMap::with_capacity(handles.len());
    for (engine, handle) in handles {
        let remaining = deadline.saturating_sub(start.elapsed());
        let outcome = tokio::time::timeout(remaining, handle).await;
        let engine_result = match outcome {
            Ok(Ok(engine_result)) => engine_result,
            // The task panicked; translate rather than propagate the panic.
            Ok(Err(join_error)) => EngineResult::failed(engine.clone(), join_error.to_string(), false),
            // The deadline elapsed before this task reported.
            Err(_elapsed) => EngineResult::failed(engine.clone(), "deadline exceeded", true),
        };
        results.insert(engine, engine_result);
    }

    if results.values().any(|r| r.is_usable()) {
        Ok(results)
    } else {
        Err(NoEnginesAvailable)
    }
}

fn effective_deadline(req: &SearchRequest, caller_deadline: Option<Duration>) -> Duration {
    let mut deadline = DEFAULT_FANOUT_TIMEOUT;
    if let Some(caller) = caller_deadline {
        deadline = deadline.min(caller);
    }
    if let Some(timeout_ms) = req.timeout_ms {
        deadline = deadline.min(Duration::from_millis(timeout_ms));
    }
    deadline
}
