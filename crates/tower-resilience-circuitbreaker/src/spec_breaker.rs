//! The fixed count-threshold circuit breaker state machine from the
//! coordinator and gateway resilience model: `Execute(ctx, f) -> err`,
//! gating a fallible call so a peer in sustained failure is isolated for a
//! cooldown window, then probed.
//!
//! This sits alongside [`crate::CircuitBreakerLayer`] rather than replacing
//! it: the layer's rolling failure-*rate* sliding window serves general
//! Tower middleware use, while [`SearchBreaker`] implements the exact
//! failure-*count* + minimum-request-count transition model that engine
//! peers and the gateway proxy are specified against. Both share this
//! crate's `Arc<AtomicU8>` state-word idiom.

use std::future::Future;
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

/// `Closed`, `Open`, `HalfOpen` — see module docs for the transition rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BreakerState {
    Closed = 0,
    Open = 1,
    HalfOpen = 2,
}

impl BreakerState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Open,
            2 => Self::HalfOpen,
            _ => Self::Closed,
        }
    }
}

/// Error returned by [`SearchBreaker::execute`]: either the breaker gated
/// the call (`Open`), distinct from any error the wrapped operation itself
/// produced (`Inner`).
#[derive(Debug, Clone, thiserror::Error)]
pub enum BreakerError<E> {
    #[error("circuit breaker open")]
    Open,
    #[error(transparent)]
    Inner(E),
}

impl<E> BreakerError<E> {
    pub fn is_open(&self) -> bool {
        matches!(self, BreakerError::Open)
    }
}

/// Point-in-time view of the breaker's counters, for admin/health endpoints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreakerSnapshot {
    pub state: BreakerState,
    pub failure_count: u32,
    pub success_count: u32,
    pub request_count: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct BreakerConfig {
    pub failure_threshold: u32,
    pub success_threshold: u32,
    pub timeout: Duration,
    pub min_request_threshold: u32,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            timeout: Duration::from_secs(30),
            min_request_threshold: 10,
        }
    }
}

struct Counters {
    failure_count: AtomicU32,
    success_count: AtomicU32,
    request_count: AtomicU32,
}

impl Counters {
    fn reset(&self) {
        self.failure_count.store(0, Ordering::SeqCst);
        self.success_count.store(0, Ordering::SeqCst);
        self.request_count.store(0, Ordering::SeqCst);
    }
}

/// A single named breaker instance. Cheap to clone (an `Arc` inside);
/// created once per peer/upstream family and shared by reference for the
/// process lifetime — it is never torn down between requests.
#[derive(Clone)]
pub struct SearchBreaker {
    name: Arc<str>,
    config: BreakerConfig,
    state: Arc<AtomicU8>,
    counters: Arc<Counters>,
    last_fail_time_millis: Arc<AtomicU64>,
    // Serializes state *transitions* only; counter increments and the fast
    // Closed/Open read path never take this lock.
    transition_lock: Arc<Mutex<()>>,
    epoch: Instant,
}

impl SearchBreaker {
    pub fn new(name: impl Into<Arc<str>>, config: BreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            state: Arc::new(AtomicU8::new(BreakerState::Closed as u8)),
            counters: Arc::new(Counters {
                failure_count: AtomicU32::new(0),
                success_count: AtomicU32::new(0),
                request_count: AtomicU32::new(0),
            }),
            last_fail_time_millis: Arc::new(AtomicU64::new(0)),
            transition_lock: Arc::new(Mutex::new(())),
            epoch: Instant::now(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> BreakerState {
        BreakerState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        BreakerSnapshot {
            state: self.state(),
            failure_count: self.counters.failure_count.load(Ordering::SeqCst),
            success_count: self.counters.success_count.load(Ordering::SeqCst),
            request_count: self.counters.request_count.load(Ordering::SeqCst),
        }
    }

    fn now_millis(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    /// Gates `f` through the breaker. `f` is the entire fallible operation —
    /// if the caller retries internally, that retry loop counts as a single
    /// call for breaker accounting, matching the engine peer's contract.
    pub async fn execute<F, Fut, T, E>(&self, f: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !self.admit().await {
            return Err(BreakerError::Open);
        }

        match f().await {
            Ok(v) => {
                self.on_success().await;
                Ok(v)
            }
            Err(e) => {
                self.on_failure().await;
                Err(BreakerError::Inner(e))
            }
        }
    }

    /// Returns `true` if the call may proceed, performing the Open-to-HalfOpen
    /// probe transition when the cooldown has elapsed.
    async fn admit(&self) -> bool {
        match self.state() {
            BreakerState::Closed => true,
            BreakerState::HalfOpen => true,
            BreakerState::Open => {
                let elapsed =
                    self.now_millis().saturating_sub(self.last_fail_time_millis.load(Ordering::SeqCst));
                if elapsed < self.config.timeout.as_millis() as u64 {
                    return false;
                }
                let _guard = self.transition_lock.lock().await;
                // Re-check under the lock: another caller may have already
                // performed the probe transition.
                if self.state() != BreakerState::Open {
                    return self.state() != BreakerState::Open;
                }
                self.state.store(BreakerState::HalfOpen as u8, Ordering::SeqCst);
                true
            }
        }
    }

    async fn on_success(&self) {
        match self.state() {
            BreakerState::Closed => {
                self.counters.request_count.fetch_add(1, Ordering::SeqCst);
                self.counters.failure_count.store(0, Ordering::SeqCst);
            }
            BreakerState::HalfOpen => {
                let successes = self.counters.success_count.fetch_add(1, Ordering::SeqCst) + 1;
                if successes >= self.config.success_threshold {
                    let _guard = self.transition_lock.lock().await;
                    self.state.store(BreakerState::Closed as u8, Ordering::SeqCst);
                    self.counters.reset();
                }
            }
            BreakerState::Open => {}
        }
    }

    async fn on_failure(&self) {
        match self.state() {
            BreakerState::Closed => {
                let failures = self.counters.failure_count.fetch_add(1, Ordering::SeqCst) + 1;
                let requests = self.counters.request_count.fetch_add(1, Ordering::SeqCst) + 1;
                if failures >= self.config.failure_threshold
                    && requests >= self.config.min_request_threshold
                {
                    let _guard = self.transition_lock.lock().await;
                    self.state.store(BreakerState::Open as u8, Ordering::SeqCst);
                    self.last_fail_time_millis
                        .store(self.now_millis(), Ordering::SeqCst);
                }
            }
            BreakerState::HalfOpen => {
                let _guard = self.transition_lock.lock().await;
                self.state.store(BreakerState::Open as u8, Ordering::SeqCst);
                self.last_fail_time_millis
                    .store(self.now_millis(), Ordering::SeqCst);
                self.counters.success_count.store(0, Ordering::SeqCst);
            }
            BreakerState::Open => {}
        }
    }
}
