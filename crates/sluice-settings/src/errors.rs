//! Settings errors. Each variant names the file or field at fault so the
//! binary can report it without extra context.

use std::path::PathBuf;

use thiserror::Error;

/// Why settings could not be produced.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings file exists but could not be read.
    #[error("cannot read settings file {}: {source}", path.display())]
    Read {
        /// File that was opened.
        path: PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },

    /// The settings file is not JSON.
    #[error("settings file {} is not valid JSON: {source}", path.display())]
    Parse {
        /// File that was parsed.
        path: PathBuf,
        /// Parser error with line and column.
        source: serde_json::Error,
    },

    /// The merged document has a value of the wrong type (e.g. a string port).
    #[error("settings file {} has the wrong shape: {source}", path.display())]
    Shape {
        /// File whose values were merged.
        path: PathBuf,
        /// Deserialization error naming the field.
        source: serde_json::Error,
    },

    /// A value parsed but would produce a broken server.
    #[error("invalid {field}: {reason}")]
    InvalidValue {
        /// camelCase settings key.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

impl SettingsError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;
