//! Property-based tests for tower-resilience patterns.
//!
//! Run with: cargo test --test property_tests
//!
//! These tests use proptest to generate random inputs and verify that
//! invariants hold across all patterns.

pub mod cache_key;
pub mod circuit_breaker;
pub mod rate_limiter;
pub mod search_breaker;
pub mod tiered_rate_limiter;
