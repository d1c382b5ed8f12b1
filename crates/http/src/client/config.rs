use std::time::Duration;

use serde::Deserialize;

/// Client side limits and timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub connect_timeout_ms: u64,
    pub read_timeout_ms: u64,
    pub write_timeout_ms: u64,
    /// Upper bound for a whole response, status line to last body byte
    pub max_response_size: usize,
    /// Upper bound for a request entity
    pub max_entity_size: usize,
    /// Fragment size of chunked request bodies
    pub chunk_size: usize,
    pub read_buffer_size: usize,
}

impl ClientConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 5000,
            read_timeout_ms: 5000,
            write_timeout_ms: 5000,
            max_response_size: 16 * 1024,
            max_entity_size: 16 * 1024,
            chunk_size: 1024,
            read_buffer_size: 1024,
        }
    }
}
