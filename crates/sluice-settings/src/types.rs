//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]`, so a partial
//! JSON file is valid: missing fields keep their compiled default.

use std::fmt::Display;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Routes the server always mounts.
pub const RESERVED_PATHS: [&str; 2] = ["/health", "/metrics"];

/// Accepted keep-alive intervals, in seconds.
pub const KEEP_ALIVE_SECS_RANGE: RangeInclusive<u64> = 1..=3_600;
/// Accepted per-stream channel capacities.
pub const CHANNEL_CAPACITY_RANGE: RangeInclusive<usize> = 1..=1_000_000;
/// Accepted POST body limits, in bytes.
pub const MAX_BODY_BYTES_RANGE: RangeInclusive<usize> = 1_024..=1_073_741_824;
/// Accepted delivery timeouts, in seconds.
pub const DELIVER_TIMEOUT_SECS_RANGE: RangeInclusive<u64> = 1..=86_400;

/// Root settings type.
///
/// ```json
/// {
///   "server": { "port": 8051, "streamPath": "/sse" },
///   "logging": { "level": "debug" }
/// }
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SluiceSettings {
    /// HTTP listener and transport settings.
    pub server: ServerSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
    /// Protocol engine identity.
    pub mcp: McpSettings,
}

impl SluiceSettings {
    /// Reject values that would produce a broken router.
    pub fn validate(&self) -> Result<()> {
        for (field, path) in [
            ("streamPath", &self.server.stream_path),
            ("messagePath", &self.server.message_path),
        ] {
            if !path.starts_with('/') {
                return Err(SettingsError::invalid(
                    field,
                    format!("must start with '/' (got {path:?})"),
                ));
            }
            if RESERVED_PATHS.contains(&path.as_str()) {
                return Err(SettingsError::invalid(
                    field,
                    format!("collides with the built-in {path} route"),
                ));
            }
        }
        if self.server.stream_path == self.server.message_path {
            return Err(SettingsError::invalid(
                "messagePath",
                "must differ from streamPath",
            ));
        }
        let server = &self.server;
        check_range("keepAliveSecs", server.keep_alive_secs, &KEEP_ALIVE_SECS_RANGE)?;
        check_range("channelCapacity", server.channel_capacity, &CHANNEL_CAPACITY_RANGE)?;
        check_range("maxBodyBytes", server.max_body_bytes, &MAX_BODY_BYTES_RANGE)?;
        check_range(
            "deliverTimeoutSecs",
            server.deliver_timeout_secs,
            &DELIVER_TIMEOUT_SECS_RANGE,
        )
    }
}

fn check_range<T>(field: &'static str, value: T, range: &RangeInclusive<T>) -> Result<()>
where
    T: PartialOrd + Display,
{
    if range.contains(&value) {
        return Ok(());
    }
    Err(SettingsError::invalid(
        field,
        format!(
            "must be between {} and {} (got {value})",
            range.start(),
            range.end()
        ),
    ))
}

/// HTTP listener and SSE transport settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Bind port (`0` picks a free port).
    pub port: u16,
    /// Path clients `GET` to open an event stream.
    pub stream_path: String,
    /// Path clients `POST` messages to (`?sessionId=` appended).
    pub message_path: String,
    /// Interval between SSE keep-alive comments, in seconds.
    pub keep_alive_secs: u64,
    /// Outbound events buffered per stream before senders wait.
    pub channel_capacity: usize,
    /// Largest accepted POST body, in bytes.
    pub max_body_bytes: usize,
    /// Upper bound on a single message delivery, in seconds.
    pub deliver_timeout_secs: u64,
    /// How long shutdown waits for in-flight tasks, in seconds.
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            stream_path: "/sse".to_string(),
            message_path: "/mcp-messages".to_string(),
            keep_alive_secs: 15,
            channel_capacity: 256,
            max_body_bytes: 4 * 1024 * 1024,
            deliver_timeout_secs: 60,
            shutdown_timeout_secs: 10,
        }
    }
}

/// Logging settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default `EnvFilter` directive when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Identity the protocol engine reports during `initialize`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct McpSettings {
    /// Reported server name.
    pub server_name: String,
    /// Reported server version.
    pub server_version: String,
}

impl Default for McpSettings {
    fn default() -> Self {
        Self {
            server_name: "sluice".to_string(),
            server_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_defaults() {
        let s = ServerSettings::default();
        assert_eq!(s.host, "0.0.0.0");
        assert_eq!(s.port, 3001);
        assert_eq!(s.stream_path, "/sse");
        assert_eq!(s.message_path, "/mcp-messages");
        assert_eq!(s.keep_alive_secs, 15);
        assert_eq!(s.channel_capacity, 256);
        assert_eq!(s.deliver_timeout_secs, 60);
    }

    #[test]
    fn logging_default_level() {
        assert_eq!(LoggingSettings::default().level, "info");
    }

    #[test]
    fn mcp_defaults() {
        let m = McpSettings::default();
        assert_eq!(m.server_name, "sluice");
        assert!(!m.server_version.is_empty());
    }

    #[test]
    fn camel_case_wire_format() {
        let json = serde_json::to_value(SluiceSettings::default()).unwrap();
        assert!(json["server"]["streamPath"].is_string());
        assert!(json["server"]["messagePath"].is_string());
        assert!(json["server"]["keepAliveSecs"].is_number());
        assert!(json["mcp"]["serverName"].is_string());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let s: SluiceSettings =
            serde_json::from_str(r#"{"server":{"port":8051}}"#).unwrap();
        assert_eq!(s.server.port, 8051);
        assert_eq!(s.server.stream_path, "/sse");
        assert_eq!(s.logging.level, "info");
    }

    #[test]
    fn defaults_validate() {
        assert!(SluiceSettings::default().validate().is_ok());
    }

    #[test]
    fn reserved_paths_rejected() {
        let mut s = SluiceSettings::default();
        s.server.message_path = "/health".into();
        let err = s.validate().unwrap_err();
        assert!(err.to_string().contains("/health"));
    }

    #[test]
    fn relative_path_rejected() {
        let mut s = SluiceSettings::default();
        s.server.stream_path = "sse".into();
        let err = s.validate().unwrap_err();
        assert!(err.to_string().contains("streamPath"));
    }

    #[test]
    fn identical_paths_rejected() {
        let mut s = SluiceSettings::default();
        s.server.message_path = "/sse".into();
        assert!(s.validate().is_err());
    }

    #[test]
    fn zero_capacity_rejected() {
        let mut s = SluiceSettings::default();
        s.server.channel_capacity = 0;
        assert!(matches!(
            s.validate(),
            Err(SettingsError::InvalidValue {
                field: "channelCapacity",
                ..
            })
        ));
    }

    #[test]
    fn out_of_range_timings_rejected() {
        let cases: [(&str, fn(&mut ServerSettings)); 4] = [
            ("keepAliveSecs", |s| s.keep_alive_secs = 0),
            ("deliverTimeoutSecs", |s| s.deliver_timeout_secs = 0),
            ("maxBodyBytes", |s| s.max_body_bytes = 0),
            ("channelCapacity", |s| s.channel_capacity = 2_000_000),
        ];
        for (expected, corrupt) in cases {
            let mut s = SluiceSettings::default();
            corrupt(&mut s.server);
            match s.validate() {
                Err(SettingsError::InvalidValue { field, reason }) => {
                    assert_eq!(field, expected);
                    assert!(reason.contains("must be between"), "{reason}");
                }
                other => panic!("{expected}: expected InvalidValue, got {other:?}"),
            }
        }
    }

    #[test]
    fn range_bounds_are_inclusive() {
        let mut s = SluiceSettings::default();
        s.server.keep_alive_secs = 1;
        s.server.max_body_bytes = 1_024;
        s.server.deliver_timeout_secs = 86_400;
        s.server.channel_capacity = 1;
        assert!(s.validate().is_ok());

        s.server.max_body_bytes = 1_023;
        assert!(s.validate().unwrap_err().to_string().contains("maxBodyBytes"));
    }
}
