//! Keep-alive negotiation for one transport connection.
//!
//! After each parsed request the [`ConnectionState`] decides whether the connection
//! stays open. `Connection: keep-alive` (any case) keeps it open, anything else closes
//! it after the response. The first request may carry `Keep-Alive: timeout=T, max=N`;
//! both values are clamped into the configured bounds and the timeout is handed back
//! to the caller to apply on the transport. Later `Keep-Alive` headers are ignored.

use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::protocol::MessageFields;

/// Bounds and defaults for keep-alive negotiation. Timeouts are in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct KeepAliveConfig {
    pub default_timeout_secs: u64,
    pub min_timeout_secs: u64,
    pub max_timeout_secs: u64,
    pub default_max_requests: u32,
    pub min_requests: u32,
    pub max_requests: u32,
}

impl KeepAliveConfig {
    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.default_timeout_secs)
    }

    fn clamp_timeout(&self, secs: u64) -> Duration {
        Duration::from_secs(secs.clamp(self.min_timeout_secs, self.max_timeout_secs.max(self.min_timeout_secs)))
    }

    fn clamp_requests(&self, max: u32) -> u32 {
        max.clamp(self.min_requests, self.max_requests.max(self.min_requests))
    }
}

impl Default for KeepAliveConfig {
    fn default() -> Self {
        Self {
            default_timeout_secs: 5,
            min_timeout_secs: 1,
            max_timeout_secs: 60,
            default_max_requests: 20,
            min_requests: 1,
            max_requests: 1000,
        }
    }
}

/// Parameters of a `Keep-Alive: timeout=T, max=N` header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeepAliveParams {
    pub timeout: Option<u64>,
    pub max: Option<u32>,
}

impl KeepAliveParams {
    /// Parses the header value. Unknown or unparsable parameters are skipped;
    /// `None` is returned when neither `timeout` nor `max` is usable.
    pub fn parse(value: &str) -> Option<Self> {
        let mut params = Self::default();

        for param in value.split(',') {
            let Some((key, value)) = param.split_once('=') else {
                continue;
            };

            let key = key.trim();
            let value = value.trim();
            if key.eq_ignore_ascii_case("timeout") {
                params.timeout = value.parse().ok();
            } else if key.eq_ignore_ascii_case("max") {
                params.max = value.parse().ok();
            }
        }

        (params.timeout.is_some() || params.max.is_some()).then_some(params)
    }
}

/// Per-connection keep-alive state.
#[derive(Debug, Clone)]
pub struct ConnectionState {
    config: KeepAliveConfig,
    keep_alive: bool,
    timeout: Duration,
    max_requests: u32,
    remaining_requests: u32,
    header_already_applied: bool,
}

impl ConnectionState {
    pub fn new(config: KeepAliveConfig) -> Self {
        Self {
            config,
            keep_alive: false,
            timeout: config.default_timeout(),
            max_requests: config.default_max_requests,
            remaining_requests: config.default_max_requests,
            header_already_applied: false,
        }
    }

    /// Accounts for one parsed request.
    ///
    /// Returns the receive timeout the transport must switch to, which only happens
    /// for a `Keep-Alive` header on the first request of the connection.
    pub fn on_request(&mut self, fields: &MessageFields) -> Option<Duration> {
        self.keep_alive = fields.is_keep_alive();

        let mut apply = None;
        if !self.header_already_applied {
            self.header_already_applied = true;

            if let Some(params) = fields.keep_alive() {
                self.timeout = params.timeout.map_or(self.timeout, |secs| self.config.clamp_timeout(secs));
                self.max_requests = params.max.map_or(self.max_requests, |max| self.config.clamp_requests(max));
                self.remaining_requests = self.max_requests;

                debug!(timeout = ?self.timeout, max = self.max_requests, "applied keep-alive header");
                apply = Some(self.timeout);
            }
        }

        self.remaining_requests = self.remaining_requests.saturating_sub(1);
        apply
    }

    /// Whether the connection must be closed once the current response is sent
    pub fn should_close(&self) -> bool {
        !self.keep_alive || self.remaining_requests == 0
    }

    pub fn keep_alive(&self) -> bool {
        self.keep_alive
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn remaining_requests(&self) -> u32 {
        self.remaining_requests
    }

    /// The `Connection` header value and, for kept connections, the `Keep-Alive` value
    /// announced to the peer with the current response.
    pub fn response_headers(&self) -> (&'static str, Option<String>) {
        if self.should_close() {
            ("close", None)
        } else {
            ("keep-alive", Some(format!("timeout={}, max={}", self.timeout.as_secs(), self.remaining_requests)))
        }
    }
}
