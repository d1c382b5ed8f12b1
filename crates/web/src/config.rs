use std::time::Duration;

use embed_http::connection::KeepAliveConfig;
use embed_http::protocol::ParserLimits;
use serde::Deserialize;

/// Settings of one server instance.
///
/// Every field has a default, so a JSON document only needs the fields it changes:
///
/// ```
/// use embed_web::ServerConfig;
///
/// let config = ServerConfig::from_json(r#"{ "address": "0.0.0.0:8080", "workers": 2 }"#).unwrap();
/// assert_eq!(config.workers, 2);
/// assert_eq!(config.queue_capacity, 8);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub address: String,
    /// Number of worker threads serving connections
    pub workers: usize,
    /// Accepted connections waiting for their first bytes
    pub max_pending_connections: usize,
    /// Capacity of the hand-off queue between listener and workers
    pub queue_capacity: usize,
    pub read_buffer_size: usize,
    pub accept_poll_interval_ms: u64,
    pub limits: ParserLimits,
    pub keep_alive: KeepAliveConfig,
}

impl ServerConfig {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn accept_poll_interval(&self) -> Duration {
        Duration::from_millis(self.accept_poll_interval_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:80".to_owned(),
            workers: 4,
            max_pending_connections: 8,
            queue_capacity: 8,
            read_buffer_size: 1024,
            accept_poll_interval_ms: 10,
            limits: ParserLimits::default(),
            keep_alive: KeepAliveConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_tables() {
        let config = ServerConfig::from_json(
            r#"{
                "limits": { "max_message_size": 4096 },
                "keep_alive": { "default_timeout_secs": 2, "max_requests": 10 }
            }"#,
        )
        .unwrap();

        assert_eq!(config.limits.max_message_size, 4096);
        assert_eq!(config.limits.max_headers, 64);
        assert_eq!(config.keep_alive.default_timeout(), Duration::from_secs(2));
        assert_eq!(config.keep_alive.max_requests, 10);
        assert_eq!(config.workers, 4);
    }

    #[test]
    fn rejects_wrong_types() {
        assert!(ServerConfig::from_json(r#"{ "workers": "four" }"#).is_err());
    }
}
