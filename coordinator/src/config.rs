//! Coordinator configuration, loaded from `SMX_*` environment variables.
//!
//! One small struct per documented configuration group, each with a
//! `Default` matching the documented default — the same "plain struct plus
//! defaults" shape `tower_resilience_circuitbreaker::BreakerConfig` and its
//! siblings use, rather than pulling in a config-file crate for what is, at
//! this scope, a flat set of env overrides.

use std::collections::HashMap;
use std::time::Duration;

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_string_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[derive(Debug, Clone)]
pub struct RpcConfig {
    pub host: String,
    pub port: u16,
    pub max_message_bytes: usize,
    pub timeout: Duration,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            host: env_string_or("SMX_RPC_HOST", "0.0.0.0"),
            port: env_or("SMX_RPC_PORT", 50060),
            max_message_bytes: env_or("SMX_RPC_MAX_MESSAGE_BYTES", 100 * 1024 * 1024),
            timeout: Duration::from_millis(env_or("SMX_RPC_TIMEOUT_MS", 5_000)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct KvConfig {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
    pub db: u32,
    pub pool_size: u32,
}

impl Default for KvConfig {
    fn default() -> Self {
        Self {
            host: env_string_or("SMX_KV_HOST", "127.0.0.1"),
            port: env_or("SMX_KV_PORT", 6379),
            password: std::env::var("SMX_KV_PASSWORD").ok(),
            db: env_or("SMX_KV_DB", 0),
            pool_size: env_or("SMX_KV_POOL_SIZE", 16),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub enabled: bool,
    pub default_ttl: Duration,
    pub max_size: u64,
    pub eviction_policy: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: env_or("SMX_CACHE_ENABLED", true),
            default_ttl: Duration::from_secs(env_or("SMX_CACHE_DEFAULT_TTL_SECS", 300)),
            max_size: env_or("SMX_CACHE_MAX_SIZE", 100_000),
            eviction_policy: env_string_or("SMX_CACHE_EVICTION_POLICY", "lru"),
        }
    }
}

/// BM25/vector parameters are carried for configuration-surface completeness
/// (see the spec's configuration table) but this coordinator's bundled
/// `EnginePeer`s are backed by `search_engine_peer::MockTransport` — real
/// engines are an external collaborator behind the `Transport` seam.
#[derive(Debug, Clone)]
pub struct EngineEntryConfig {
    pub host: String,
    pub port: u16,
    pub timeout: Duration,
    pub max_retries: u32,
    pub pool_size: u32,
    pub bm25_k1: f64,
    pub bm25_b: f64,
    pub vector_dimension: u32,
    pub vector_threshold: f64,
    pub vector_top_k: u32,
    pub vector_alpha: f64,
}

impl Default for EngineEntryConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 7000,
            timeout: Duration::from_millis(500),
            max_retries: 3,
            pool_size: 8,
            bm25_k1: 1.2,
            bm25_b: 0.75,
            vector_dimension: 768,
            vector_threshold: 0.0,
            vector_top_k: 100,
            vector_alpha: 0.5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: String,
    pub format: String,
    pub output: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: env_string_or("SMX_LOG_LEVEL", "info"),
            format: env_string_or("SMX_LOG_FORMAT", "text"),
            output: env_string_or("SMX_LOG_OUTPUT", "stdout"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub rpc: RpcConfig,
    pub kv: KvConfig,
    pub cache: CacheConfig,
    pub engines: HashMap<String, EngineEntryConfig>,
    pub log: LogConfig,
}

impl Config {
    /// Loads every group from its `SMX_*` variables, defaulting to a
    /// two-engine (`bm25`, `vector`) local setup when `SMX_ENGINES` is
    /// unset — enough to exercise the fan-out without any external
    /// configuration.
    pub fn load() -> Self {
        let engines = std::env::var("SMX_ENGINES")
            .ok()
            .map(|v| {
                v.split(',')
                    .map(|name| (name.trim().to_string(), EngineEntryConfig::default()))
                    .collect()
            })
            .unwrap_or_else(|| {
                HashMap::from([
                    ("bm25".to_string(), EngineEntryConfig::default()),
                    ("vector".to_string(), EngineEntryConfig::default()),
                ])
            });

        Self {
            rpc: RpcConfig::default(),
            kv: KvConfig::default(),
            cache: CacheConfig::default(),
            engines,
            log: LogConfig::default(),
        }
    }
}
