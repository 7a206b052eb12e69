//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`SluiceSettings::default()`]
//! 2. If the settings file exists, deep-merge its values over the defaults
//! 3. Apply `SLUICE_*` environment overrides (highest priority)
//! 4. Validate the result
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde_json::Value;
use tracing::debug;

use crate::errors::{Result, SettingsError};
use crate::types::{
    CHANNEL_CAPACITY_RANGE, DELIVER_TIMEOUT_SECS_RANGE, KEEP_ALIVE_SECS_RANGE,
    MAX_BODY_BYTES_RANGE, SluiceSettings,
};

/// Resolve the default settings file path (`~/.sluice/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".sluice").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<SluiceSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults; a file with invalid JSON is an error.
pub fn load_settings_from_path(path: &Path) -> Result<SluiceSettings> {
    let mut settings = load_file_layer(path)?;
    apply_env_overrides(&mut settings);
    settings.validate()?;
    Ok(settings)
}

/// Defaults merged with the settings file, without env overrides.
fn load_file_layer(path: &Path) -> Result<SluiceSettings> {
    if !path.exists() {
        debug!(?path, "settings file not found, using defaults");
        return Ok(SluiceSettings::default());
    }

    debug!(?path, "loading settings from file");
    let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
        path: path.to_owned(),
        source,
    })?;
    let user: Value = serde_json::from_str(&content).map_err(|source| SettingsError::Parse {
        path: path.to_owned(),
        source,
    })?;

    let shape = |source| SettingsError::Shape {
        path: path.to_owned(),
        source,
    };
    let defaults = serde_json::to_value(SluiceSettings::default()).map_err(shape)?;
    serde_json::from_value(deep_merge(defaults, user)).map_err(shape)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `SLUICE_*` overrides from the process environment.
pub fn apply_env_overrides(settings: &mut SluiceSettings) {
    apply_overrides_with(settings, |name| std::env::var(name).ok());
}

/// Apply overrides read through `lookup`.
///
/// Invalid values are ignored with a warning (the file/default value stays).
pub fn apply_overrides_with<F>(settings: &mut SluiceSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let env = EnvReader { lookup };

    if let Some(v) = env.string("SLUICE_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = env.parsed("SLUICE_PORT", |s| in_range(s, &(0..=u16::MAX))) {
        settings.server.port = v;
    }
    if let Some(v) = env.string("SLUICE_STREAM_PATH") {
        settings.server.stream_path = v;
    }
    if let Some(v) = env.string("SLUICE_MESSAGE_PATH") {
        settings.server.message_path = v;
    }
    if let Some(v) = env.parsed("SLUICE_KEEP_ALIVE_SECS", |s| {
        in_range(s, &KEEP_ALIVE_SECS_RANGE)
    }) {
        settings.server.keep_alive_secs = v;
    }
    if let Some(v) = env.parsed("SLUICE_CHANNEL_CAPACITY", |s| in_range(s, &CHANNEL_CAPACITY_RANGE)) {
        settings.server.channel_capacity = v;
    }
    if let Some(v) = env.parsed("SLUICE_MAX_BODY_BYTES", |s| in_range(s, &MAX_BODY_BYTES_RANGE)) {
        settings.server.max_body_bytes = v;
    }
    if let Some(v) = env.parsed("SLUICE_DELIVER_TIMEOUT_SECS", |s| {
        in_range(s, &DELIVER_TIMEOUT_SECS_RANGE)
    }) {
        settings.server.deliver_timeout_secs = v;
    }
    if let Some(v) = env.string("SLUICE_LOG_LEVEL") {
        settings.logging.level = v;
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse `val` and keep it only if it falls inside `range`.
pub fn in_range<T>(val: &str, range: &RangeInclusive<T>) -> Option<T>
where
    T: FromStr + PartialOrd,
{
    let n: T = val.parse().ok()?;
    range.contains(&n).then_some(n)
}

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.is_empty())
    }

    fn parsed<T>(&self, name: &str, parse: impl Fn(&str) -> Option<T>) -> Option<T> {
        let val = (self.lookup)(name)?;
        let result = parse(&val);
        if result.is_none() {
            tracing::warn!(key = name, value = %val, "invalid env var, ignoring");
        }
        result
    }
}
