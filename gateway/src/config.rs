//! Gateway configuration, loaded from `SMX_*` environment variables.
//!
//! Same "plain struct plus `Default`" shape as `coordinator::config` — one
//! group per documented configuration row, no config-file crate.

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

fn env_list_or(key: &str, default: &[&str]) -> Vec<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
        .unwrap_or_else(|| default.iter().map(|s| s.to_string()).collect())
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub mode: String,
    pub request_timeout: Duration,
    pub shutdown_grace: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: env_string_or("SMX_SERVER_HOST", "0.0.0.0"),
            port: env_or("SMX_SERVER_PORT", 8080),
            mode: env_string_or("SMX_SERVER_MODE", "release"),
            request_timeout: Duration::from_millis(env_or("SMX_SERVER_REQUEST_TIMEOUT_MS", 5_000)),
            shutdown_grace: Duration::from_secs(env_or("SMX_SERVER_SHUTDOWN_GRACE_SECS", 10)),
        }
    }
}

/// Dials the coordinator; message-size cap mirrors `coordinator::config::RpcConfig`
/// so a client built against this config never rejects a frame the server sent.
#[derive(Debug, Clone)]
pub struct RpcConfig {
    pub coordinator_addr: String,
    pub max_message_bytes: usize,
    pub timeout: Duration,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            coordinator_addr: env_string_or("SMX_RPC_COORDINATOR_ADDR", "http://127.0.0.1:50060"),
            max_message_bytes: env_or("SMX_RPC_MAX_MESSAGE_BYTES", 100 * 1024 * 1024),
            timeout: Duration::from_millis(env_or("SMX_RPC_TIMEOUT_MS", 5_000)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub default_limit: u64,
    pub default_burst: u64,
    pub default_window: Duration,
    pub by_user: bool,
    pub by_ip: bool,
    pub tier_header: String,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: env_or("SMX_RATE_LIMIT_ENABLED", true),
            default_limit: env_or("SMX_RATE_LIMIT_DEFAULT_LIMIT", 60),
            default_burst: env_or("SMX_RATE_LIMIT_DEFAULT_BURST", 10),
            default_window: Duration::from_secs(env_or("SMX_RATE_LIMIT_DEFAULT_WINDOW_SECS", 60)),
            by_user: env_or("SMX_RATE_LIMIT_BY_USER", true),
            by_ip: env_or("SMX_RATE_LIMIT_BY_IP", true),
            tier_header: env_string_or("SMX_RATE_LIMIT_TIER_HEADER", "x-tier"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub allow_credentials: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origins: env_list_or("SMX_CORS_ALLOW_ORIGINS", &["*"]),
            allow_credentials: env_or("SMX_CORS_ALLOW_CREDENTIALS", false),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub path: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: env_or("SMX_METRICS_ENABLED", true),
            path: env_string_or("SMX_METRICS_PATH", "/metrics"),
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

/// Static bearer-token set. A real identity-provider integration is out of
/// scope (see `AuthLayer` docs); this is the "minimal" auth the HTTP surface
/// table's `Auth: required` rows need to actually reject unauthenticated
/// traffic.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub tokens: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            tokens: env_list_or("SMX_AUTH_TOKENS", &["dev-token"]),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub server: ServerConfig,
    pub rpc: RpcConfig,
    pub rate_limit: RateLimitConfig,
    pub cors: CorsConfig,
    pub metrics: MetricsConfig,
    pub log: LogConfig,
    pub auth: AuthConfig,
}

impl Config {
    pub fn load() -> Self {
        Self::default()
    }
}
