//! One upstream search engine, reached over a [`Transport`], guarded by a
//! breaker and a bounded retry loop.
//!
//! The breaker wraps the *entire* retry loop (constructed via
//! [`SearchBreaker::execute`]), matching the contract that a retry-exhausted
//! failure counts once against breaker accounting, and that breaker-open is
//! a distinct peer error rather than something retried against. Inside that
//! loop, retries and the per-call deadline are genuine Tower middleware —
//! [`tower_resilience_retry::RetryLayer`] stacked over
//! [`tower_resilience_timelimiter::TimeLimiterLayer`] — rather than a
//! hand-rolled sleep loop, so the same backoff/timeout machinery other
//! callers in this workspace depend on governs upstream engine calls too.

mod transport;

pub use transport::{MockTransport, TransportError};

use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::future::BoxFuture;
use search_types::EngineResult;
use tower::{Layer, Service, ServiceExt};
use tower_resilience_circuitbreaker::{BreakerConfig, BreakerError, SearchBreaker};
use tower_resilience_retry::RetryLayer;
use tower_resilience_timelimiter::{TimeLimiterError, TimeLimiterLayer};

/// One upstream search engine: a fixed address, resolved at construction,
/// reached through `transport`.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn search(&self, query: &str, index: &str, limit: u32) -> Result<EngineResult, TransportError>;

    /// `true` iff the underlying connection is in a ready/idle state. No
    /// probe RPC is issued.
    async fn is_healthy(&self) -> bool;
}

/// Retry and per-call deadline tuning, defaults matching the upstream
/// contract.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_factor: f64,
    /// Deadline enforced around each individual transport call (one retry
    /// attempt), independent of the overall fan-out deadline.
    pub call_timeout: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            backoff_factor: 2.0,
            call_timeout: Duration::from_millis(500),
        }
    }
}

/// An error the peer surfaced to its caller: either an upstream/transport
/// failure after retries were exhausted, or the breaker denying the call
/// outright.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PeerError {
    #[error("circuit breaker open for engine {0}")]
    BreakerOpen(String),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl TransportError {
    /// Errors tagged this way are retried; everything else is terminal.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TransportError::DeadlineExceeded
                | TransportError::Unavailable
                | TransportError::Aborted
                | TransportError::ResourceExhausted
        )
    }
}

/// Object-safe view of an [`EnginePeer`], so [`search_fanout`] (which is
/// generic over neither the engine count nor the transport type) can hold a
/// homogeneous `Vec<Arc<dyn SearchPeer>>` regardless of how many distinct
/// [`Transport`] implementations back the peers in it.
#[async_trait::async_trait]
pub trait SearchPeer: Send + Sync {
    fn engine(&self) -> &str;
    async fn search(&self, query: &str, index: &str, limit: u32) -> EngineResult;
}

#[async_trait::async_trait]
impl<T: Transport + Send + Sync + 'static> SearchPeer for EnginePeer<T> {
    fn engine(&self) -> &str {
        EnginePeer::engine(self)
    }

    async fn search(&self, query: &str, index: &str, limit: u32) -> EngineResult {
        EnginePeer::search(self, query, index, limit).await
    }
}

/// One retryable, time-limited call to a [`Transport`].
#[derive(Clone)]
struct SearchCall {
    query: String,
    index: String,
    limit: u32,
}

/// Adapts `Arc<T: Transport>` into a `tower::Service`, so it can sit under
/// [`RetryLayer`] and [`TimeLimiterLayer`] like any other Tower service.
struct TransportService<T> {
    transport: Arc<T>,
}

impl<T> Clone for TransportService<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
        }
    }
}

impl<T: Transport + Send + Sync + 'static> Service<SearchCall> for TransportService<T> {
    type Response = EngineResult;
    type Error = TransportError;
    type Future = BoxFuture<'static, Result<EngineResult, TransportError>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: SearchCall) -> Self::Future {
        let transport = Arc::clone(&self.transport);
        Box::pin(async move { transport.search(&req.query, &req.index, req.limit).await })
    }
}

/// A single engine peer: transport plus the breaker and retry policy that
/// guard every call to it.
pub struct EnginePeer<T> {
    engine: String,
    transport: Arc<T>,
    breaker: SearchBreaker,
    retry: RetryConfig,
}

impl<T: Transport + Send + Sync + 'static> EnginePeer<T> {
    pub fn new(engine: impl Into<String>, transport: T) -> Self {
        Self::with_config(engine, transport, BreakerConfig::default(), RetryConfig::default())
    }

    pub fn with_config(
        engine: impl Into<String>,
        transport: T,
        breaker_config: BreakerConfig,
        retry: RetryConfig,
    ) -> Self {
        let engine = engine.into();
        let breaker = SearchBreaker::new(engine.clone(), breaker_config);
        Self {
            engine,
            transport: Arc::new(transport),
            breaker,
            retry,
        }
    }

    pub fn engine(&self) -> &str {
        &self.engine
    }

    pub fn breaker(&self) -> &SearchBreaker {
        &self.breaker
    }

    /// Issues `search`, retrying retryable transport errors with clamped
    /// exponential backoff, the whole loop gated by the breaker as one
    /// logical call. On a non-retryable error or exhausted retries, returns
    /// an [`EngineResult::failed`] rather than propagating — fan-out treats
    /// a single dead engine as a partial result, never a whole-request
    /// failure.
    pub async fn search(&self, query: &str, index: &str, limit: u32) -> EngineResult {
        let started = std::time::Instant::now();
        let result = self
            .breaker
            .execute(|| self.search_with_retry(query, index, limit))
            .await;

        match result {
            Ok(engine_result) => engine_result,
            Err(BreakerError::Open) => {
                let timed_out = false;
                EngineResult::failed(
                    self.engine.clone(),
                    PeerError::BreakerOpen(self.engine.clone()).to_string(),
                    timed_out,
                )
            }
            Err(BreakerError::Inner(transport_err)) => {
                let timed_out = matches!(transport_err, TransportError::DeadlineExceeded);
                EngineResult::failed(
                    self.engine.clone(),
                    PeerError::Transport(transport_err).to_string(),
                    timed_out,
                )
            }
        }
        .with_elapsed(started.elapsed())
    }

    /// Composes [`TimeLimiterLayer`] (innermost, bounding a single attempt)
    /// under [`RetryLayer`] (bounding the whole attempt sequence) around the
    /// transport. A timeout is treated the same as a retryable transport
    /// error; retry exhaustion and non-retryable errors both unwrap back
    /// down to a plain [`TransportError`] for the breaker to account.
    async fn search_with_retry(
        &self,
        query: &str,
        index: &str,
        limit: u32,
    ) -> Result<EngineResult, TransportError> {
        let transport_svc = TransportService {
            transport: Arc::clone(&self.transport),
        };

        let timed = TimeLimiterLayer::<SearchCall>::builder()
            .timeout_duration(self.retry.call_timeout)
            .name(format!("{}-call-timeout", self.engine))
            .build()
            .layer(transport_svc);

        let mut retrying = RetryLayer::<SearchCall, TimeLimiterError<TransportError>>::builder()
            .max_attempts(self.retry.max_retries as usize + 1)
            .backoff(
                tower_resilience_retry::ExponentialBackoff::new(self.retry.initial_delay)
                    .multiplier(self.retry.backoff_factor)
                    .max_interval(self.retry.max_delay),
            )
            .retry_on(|err: &TimeLimiterError<TransportError>| match err {
                TimeLimiterError::Timeout => true,
                TimeLimiterError::Inner(e) => e.is_retryable(),
            })
            .name(format!("{}-retry", self.engine))
            .build()
            .layer(timed);

        let call = SearchCall {
            query: query.to_string(),
            index: index.to_string(),
            limit,
        };

        retrying
            .ready()
            .await
            .expect("Retry/TimeLimiter poll_ready is infallible")
            .call(call)
            .await
            .map_err(|err| match err {
                TimeLimiterError::Timeout => TransportError::DeadlineExceeded,
                TimeLimiterError::Inner(transport_err) => transport_err,
            })
    }

    pub async fn is_healthy(&self) -> bool {
        self.transport.is_healthy().await
    }
}

/// Convenience used by [`EnginePeer::search`] to stamp the peer-measured
/// elapsed time onto an [`EngineResult`] built from a [`PeerError`].
trait WithElapsed {
    fn with_elapsed(self, elapsed: Duration) -> Self;
}

impl WithElapsed for EngineResult {
    fn with_elapsed(mut self, elapsed: Duration) -> Self {
        if self.elapsed_ms == 0 {
            self.elapsed_ms = elapsed.as_millis() as u64;
        }
        self
    }
}
