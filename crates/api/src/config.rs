//! Application configuration loaded from environment variables.

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `LOCK_TTL_SECS` — seat lock lifetime (default: `600`)
/// - `SWEEP_INTERVAL_SECS` — reclamation cadence (default: `60`)
/// - `EXPIRY_THRESHOLD_SECS` — pending reservation deadline (default: `120`)
/// - `RELAY_POLL_MS` — outbox poll interval (default: `500`)
/// - `RELAY_BATCH_SIZE` — events relayed per poll (default: `100`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub lock_ttl_secs: u64,
    pub sweep_interval_secs: u64,
    pub expiry_threshold_secs: i64,
    pub relay_poll_ms: u64,
    pub relay_batch_size: usize,
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env_parsed("PORT", 3000),
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            lock_ttl_secs: env_parsed("LOCK_TTL_SECS", 600),
            sweep_interval_secs: env_parsed("SWEEP_INTERVAL_SECS", 60),
            expiry_threshold_secs: env_parsed("EXPIRY_THRESHOLD_SECS", 120),
            relay_poll_ms: env_parsed("RELAY_POLL_MS", 500),
            relay_batch_size: env_parsed("RELAY_BATCH_SIZE", 100),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            lock_ttl_secs: 600,
            sweep_interval_secs: 60,
            expiry_threshold_secs: 120,
            relay_poll_ms: 500,
            relay_batch_size: 100,
        }
    }
}
