//! Server configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use sluice_settings::ServerSettings;

use crate::sse::HandleOptions;

/// Configuration for the sluice server.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind (default `"127.0.0.1"`).
    pub host: String,
    /// Port to bind (default `0` for auto-assign).
    pub port: u16,
    /// Path clients `GET` to open a stream.
    pub stream_path: String,
    /// Path clients `POST` messages to.
    pub message_path: String,
    /// Keep-alive comment interval in seconds.
    pub keep_alive_secs: u64,
    /// Outbound events buffered per stream.
    pub channel_capacity: usize,
    /// Largest accepted `POST` body in bytes.
    pub max_body_bytes: usize,
    /// Upper bound on one delivery in seconds.
    pub deliver_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            stream_path: "/sse".into(),
            message_path: "/mcp-messages".into(),
            keep_alive_secs: 15,
            channel_capacity: 256,
            max_body_bytes: 4 * 1024 * 1024, // 4 MB
            deliver_timeout_secs: 60,
        }
    }
}

impl ServerConfig {
    /// Keep-alive interval.
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }

    /// Options applied to every new stream handle.
    pub fn handle_options(&self) -> HandleOptions {
        HandleOptions {
            channel_capacity: self.channel_capacity,
            deliver_timeout: Duration::from_secs(self.deliver_timeout_secs),
        }
    }
}

impl From<&ServerSettings> for ServerConfig {
    fn from(s: &ServerSettings) -> Self {
        Self {
            host: s.host.clone(),
            port: s.port,
            stream_path: s.stream_path.clone(),
            message_path: s.message_path.clone(),
            keep_alive_secs: s.keep_alive_secs,
            channel_capacity: s.channel_capacity,
            max_body_bytes: s.max_body_bytes,
            deliver_timeout_secs: s.deliver_timeout_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.host, "127.0.0.1");
        assert_eq!(cfg.port, 0);
        assert_eq!(cfg.stream_path, "/sse");
        assert_eq!(cfg.message_path, "/mcp-messages");
        assert_eq!(cfg.keep_alive(), Duration::from_secs(15));
    }

    #[test]
    fn from_settings() {
        let settings = ServerSettings {
            port: 8051,
            message_path: "/messages/".into(),
            deliver_timeout_secs: 5,
            ..ServerSettings::default()
        };
        let cfg = ServerConfig::from(&settings);
        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.port, 8051);
        assert_eq!(cfg.message_path, "/messages/");
        assert_eq!(cfg.handle_options().deliver_timeout, Duration::from_secs(5));
        assert_eq!(cfg.handle_options().channel_capacity, 256);
    }

    #[test]
    fn serde_roundtrip() {
        let cfg = ServerConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: ServerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.stream_path, cfg.stream_path);
        assert_eq!(back.max_body_bytes, cfg.max_body_bytes);
    }
}
