//! Property tests for [`SearchBreaker`], the count-threshold breaker behind
//! engine peers and the gateway proxy.
//!
//! Invariants tested:
//! - Never opens before both the failure count and the minimum request count
//!   thresholds are met
//! - Once open, every call is rejected with `BreakerError::Open` until the
//!   cooldown elapses
//! - A success in `Closed` resets the failure counter (so isolated failures
//!   below threshold never accumulate across unrelated successes)

use proptest::prelude::*;
use tokio::runtime::Runtime;
use tower_resilience_circuitbreaker::{BreakerConfig, BreakerError, BreakerState, SearchBreaker};

async fn fail(b: &SearchBreaker) -> Result<(), BreakerError<&'static str>> {
    b.execute(|| async { Err::<(), _>("boom") }).await
}

async fn ok(b: &SearchBreaker) -> Result<(), BreakerError<&'static str>> {
    b.execute(|| async { Ok::<_, &'static str>(()) }).await
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(40))]

    /// Property: the breaker stays Closed for any prefix of failures shorter
    /// than `failure_threshold`, regardless of `min_request_threshold`.
    #[test]
    fn stays_closed_below_failure_threshold(
        failure_threshold in 2u32..=20,
        min_request_threshold in 1u32..=5,
        prefix_len in 0u32..=19,
    ) {
        let prefix_len = prefix_len.min(failure_threshold - 1);
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let cfg = BreakerConfig {
                failure_threshold,
                min_request_threshold,
                ..Default::default()
            };
            let b = SearchBreaker::new("test", cfg);
            for _ in 0..prefix_len {
                let _ = fail(&b).await;
            }
            prop_assert_eq!(b.state(), BreakerState::Closed);
            Ok(())
        })?;
    }

    /// Property: once `failure_threshold` failures and `min_request_threshold`
    /// requests have both been observed in `Closed`, the breaker opens.
    #[test]
    fn opens_once_both_thresholds_met(
        failure_threshold in 1u32..=10,
        min_request_threshold in 1u32..=10,
    ) {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let threshold_calls = failure_threshold.max(min_request_threshold);
            let cfg = BreakerConfig {
                failure_threshold,
                min_request_threshold,
                ..Default::default()
            };
            let b = SearchBreaker::new("test", cfg);
            for _ in 0..threshold_calls {
                let _ = fail(&b).await;
            }
            prop_assert_eq!(b.state(), BreakerState::Open);
            Ok(())
        })?;
    }

    /// Property: while Open, every call is rejected with `BreakerError::Open`
    /// and never reaches the wrapped operation.
    #[test]
    fn open_breaker_rejects_every_call(
        num_calls in 1usize..=20,
    ) {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let cfg = BreakerConfig {
                failure_threshold: 1,
                min_request_threshold: 1,
                timeout: std::time::Duration::from_secs(60),
                ..Default::default()
            };
            let b = SearchBreaker::new("test", cfg);
            let _ = fail(&b).await;
            prop_assert_eq!(b.state(), BreakerState::Open);

            for _ in 0..num_calls {
                let result = ok(&b).await;
                prop_assert!(matches!(result, Err(BreakerError::Open)));
            }
            Ok(())
        })?;
    }

    /// Property: a success in Closed resets the failure counter, so any
    /// number of isolated (non-consecutive) failures below threshold never
    /// opens the breaker.
    #[test]
    fn success_resets_failure_counter(
        isolated_failures in 1u32..=15,
    ) {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let cfg = BreakerConfig {
                failure_threshold: 2,
                min_request_threshold: 1,
                ..Default::default()
            };
            let b = SearchBreaker::new("test", cfg);
            for _ in 0..isolated_failures {
                let _ = fail(&b).await;
                let _ = ok(&b).await;
            }
            prop_assert_eq!(b.state(), BreakerState::Closed);
            Ok(())
        })?;
    }
}
