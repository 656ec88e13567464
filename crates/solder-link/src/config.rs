//! Connection configuration.
//!
//! Both configs deserialize from the usual config-file formats with
//! sensible defaults; durations are stored as integer milliseconds to
//! stay serde-friendly, with `Duration` accessors for internal use.

use std::time::Duration;

use serde::{Deserialize, Serialize};

fn default_call_timeout_ms() -> u64 {
    30_000
}

/// Configuration of a forward (dialing) connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForwardConfig {
    /// Host of the bot implementation.
    pub host: String,

    /// Port of the bot implementation.
    pub port: u16,

    /// WebSocket endpoint path.
    pub path: String,

    /// Bearer token sent as `Authorization` on the upgrade request.
    pub access_token: Option<String>,

    /// Expected heartbeat interval in milliseconds; `None` disables the
    /// watchdog.
    pub heartbeat_interval_ms: Option<u64>,

    /// Maximum number of connect attempts; `None` retries forever.
    pub max_connect_attempts: Option<u32>,

    /// Delay between connect attempts in milliseconds.
    pub reconnect_interval_ms: u64,

    /// How long a call waits for its response in milliseconds.
    pub call_timeout_ms: u64,
}

impl Default for ForwardConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6700,
            path: "/".to_string(),
            access_token: None,
            heartbeat_interval_ms: None,
            max_connect_attempts: None,
            reconnect_interval_ms: 5000,
            call_timeout_ms: default_call_timeout_ms(),
        }
    }
}

impl ForwardConfig {
    /// Creates a config for the given host and port.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Sets the endpoint path.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Sets the access token.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Enables the heartbeat watchdog.
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval_ms = Some(interval.as_millis() as u64);
        self
    }

    /// Caps the number of connect attempts.
    pub fn with_max_connect_attempts(mut self, attempts: u32) -> Self {
        self.max_connect_attempts = Some(attempts);
        self
    }

    /// Sets the delay between connect attempts.
    pub fn with_reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Sets the per-call response timeout.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// The `ws://` URL this config dials.
    pub fn url(&self) -> String {
        let path = if self.path.starts_with('/') {
            self.path.clone()
        } else {
            format!("/{}", self.path)
        };
        format!("ws://{}:{}{}", self.host, self.port, path)
    }

    pub(crate) fn heartbeat_interval(&self) -> Option<Duration> {
        self.heartbeat_interval_ms.map(Duration::from_millis)
    }

    pub(crate) fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.reconnect_interval_ms)
    }

    pub(crate) fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

/// Configuration of a reverse (listening) connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReverseConfig {
    /// Bind address.
    pub host: String,

    /// Listen port; 0 picks a free port.
    pub port: u16,

    /// WebSocket endpoint path.
    pub path: String,

    /// Bearer token the connecting peer must present.
    pub access_token: Option<String>,

    /// Expected heartbeat interval in milliseconds; `None` disables the
    /// watchdog.
    pub heartbeat_interval_ms: Option<u64>,

    /// How long a call waits for its response in milliseconds.
    pub call_timeout_ms: u64,
}

impl Default for ReverseConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            path: "/onebot/v11/ws".to_string(),
            access_token: None,
            heartbeat_interval_ms: None,
            call_timeout_ms: default_call_timeout_ms(),
        }
    }
}

impl ReverseConfig {
    /// Creates a config listening on the given port.
    pub fn new(port: u16) -> Self {
        Self {
            port,
            ..Default::default()
        }
    }

    /// Sets the bind address.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Sets the endpoint path.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Sets the required access token.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Enables the heartbeat watchdog.
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval_ms = Some(interval.as_millis() as u64);
        self
    }

    /// Sets the per-call response timeout.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub(crate) fn normalized_path(&self) -> String {
        if self.path.starts_with('/') {
            self.path.clone()
        } else {
            format!("/{}", self.path)
        }
    }

    pub(crate) fn heartbeat_interval(&self) -> Option<Duration> {
        self.heartbeat_interval_ms.map(Duration::from_millis)
    }

    pub(crate) fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_defaults_and_url() {
        let config = ForwardConfig::default();
        assert_eq!(config.url(), "ws://127.0.0.1:6700/");
        assert_eq!(config.call_timeout(), Duration::from_secs(30));
        assert!(config.heartbeat_interval().is_none());
        assert!(config.max_connect_attempts.is_none());

        let config = ForwardConfig::new("example.com", 6700).with_path("ws");
        assert_eq!(config.url(), "ws://example.com:6700/ws");
    }

    #[test]
    fn reverse_defaults() {
        let config = ReverseConfig::new(0);
        assert_eq!(config.normalized_path(), "/onebot/v11/ws");
        assert_eq!(config.host, "0.0.0.0");
    }

    #[test]
    fn deserialize_with_defaults() {
        let config: ForwardConfig = serde_json::from_str(
            r#"{"host": "10.0.0.1", "port": 6701, "access_token": "secret"}"#,
        )
        .unwrap();
        assert_eq!(config.host, "10.0.0.1");
        assert_eq!(config.port, 6701);
        assert_eq!(config.access_token.as_deref(), Some("secret"));
        assert_eq!(config.reconnect_interval_ms, 5000);
    }
}
