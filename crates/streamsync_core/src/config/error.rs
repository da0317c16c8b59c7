//! Config error type.

use thiserror::Error;

/// Errors that can occur while loading, saving, or validating settings.
///
/// Unlike per-stream signal problems, these indicate programmer or
/// environment error and are fatal at the call that supplied them.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read or write the config file.
    #[error("failed to access config file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse TOML.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Failed to serialize to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A tunable is out of range.
    #[error("invalid setting {field}: {message}")]
    Invalid { field: &'static str, message: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            message: message.into(),
        }
    }
}

/// Result alias for config operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
