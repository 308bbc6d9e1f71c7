//! Server configuration module
//!
//! Loads HTTP and storage settings from environment variables with sensible
//! defaults. Relying party settings (`WEBAUTHN_RP_*`) and
//! ceremony policy are loaded by `passkey_core`.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port (default: 3000)
    pub port: u16,
    /// Server host (default: 127.0.0.1)
    pub host: IpAddr,
    /// Request body limit in KB (default: 64)
    pub body_limit_kb: usize,
    /// Request timeout in seconds (default: 30)
    pub timeout_secs: u64,
    /// Enable rate limiting (default: false for tests, true when loaded from env)
    pub rate_limit_enabled: bool,
    /// Rate limit: requests per second (default: 10)
    pub rate_limit_per_sec: u64,
    /// Rate limit: burst size (default: 20)
    pub rate_limit_burst: u32,
    /// PostgreSQL URL for credential storage; in-memory storage when unset
    pub database_url: Option<String>,
    /// Database connection pool maximum connections (default: 10)
    pub database_max_connections: u32,
    /// Interval between expired ceremony state sweeps (default: 60)
    pub state_purge_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            body_limit_kb: 64,
            timeout_secs: 30,
            rate_limit_enabled: false, // Disabled by default (for tests)
            rate_limit_per_sec: 10,
            rate_limit_burst: 20,
            database_url: None,
            database_max_connections: 10,
            state_purge_interval_secs: 60,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port = env_parse("PORT").unwrap_or(defaults.port);

        let host = match std::env::var("HOST") {
            Ok(h) => h.parse().unwrap_or_else(|_| {
                tracing::warn!(host = %h, "Invalid HOST, falling back to 127.0.0.1");
                defaults.host
            }),
            Err(_) => defaults.host,
        };

        // Rate limiting enabled by default in production, can be disabled with RATE_LIMIT_ENABLED=false
        let rate_limit_enabled = std::env::var("RATE_LIMIT_ENABLED")
            .map(|v| v.to_lowercase() != "false")
            .unwrap_or(true);

        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());

        Self {
            port,
            host,
            body_limit_kb: env_parse("BODY_LIMIT_KB").unwrap_or(defaults.body_limit_kb),
            timeout_secs: env_parse("REQUEST_TIMEOUT_SECS").unwrap_or(defaults.timeout_secs),
            rate_limit_enabled,
            rate_limit_per_sec: env_parse("RATE_LIMIT_PER_SEC")
                .unwrap_or(defaults.rate_limit_per_sec),
            rate_limit_burst: env_parse("RATE_LIMIT_BURST").unwrap_or(defaults.rate_limit_burst),
            database_url,
            database_max_connections: env_parse("DATABASE_MAX_CONNECTIONS")
                .unwrap_or(defaults.database_max_connections),
            state_purge_interval_secs: env_parse("STATE_PURGE_INTERVAL_SECS")
                .filter(|secs| *secs > 0)
                .unwrap_or(defaults.state_purge_interval_secs),
        }
    }

    /// Get socket address from config
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.body_limit_kb, 64);
        assert!(!config.rate_limit_enabled);
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_socket_addr() {
        let config = Config {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8080,
            ..Config::default()
        };
        assert_eq!(config.socket_addr().to_string(), "0.0.0.0:8080");
    }
}
