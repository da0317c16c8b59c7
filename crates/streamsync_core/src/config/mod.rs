//! Configuration for the synchronization pipeline.
//!
//! This module provides:
//! - TOML-based settings with logical sections and per-field defaults
//! - Validation on load and on use (the orchestrator validates again before
//!   running)
//! - Atomic file writes (write to temp, then rename)
//!
//! # Example
//!
//! ```no_run
//! use streamsync_core::config::{load_or_default, Settings};
//!
//! // Load settings, falling back to defaults when no file exists
//! let mut settings = load_or_default("streamsync.toml").unwrap();
//!
//! // Tighten the match tolerance for a high-rate rig
//! settings.alignment.match_tolerance_ms = 2.0;
//! settings.validate().unwrap();
//! ```

mod error;
mod settings;

pub use error::{ConfigError, ConfigResult};
pub use settings::{AlignmentSettings, EdgeSettings, QualitySettings, Settings};

use std::fs;
use std::io::Write;
use std::path::Path;

/// Load settings from a TOML file and validate them.
pub fn load_settings(path: impl AsRef<Path>) -> ConfigResult<Settings> {
    let text = fs::read_to_string(path)?;
    Settings::from_toml_str(&text)
}

/// Load settings from a TOML file, or fall back to defaults when the file
/// does not exist.
pub fn load_or_default(path: impl AsRef<Path>) -> ConfigResult<Settings> {
    let path = path.as_ref();
    if !path.exists() {
        tracing::debug!("no config at {}, using defaults", path.display());
        return Ok(Settings::default());
    }
    load_settings(path)
}

/// Save settings to a TOML file.
///
/// Writes to a temp file in the same directory first, then renames, so a
/// crash mid-write never leaves a truncated config behind.
pub fn save_settings(path: impl AsRef<Path>, settings: &Settings) -> ConfigResult<()> {
    let path = path.as_ref();
    let toml_str = settings.to_toml_string()?;

    let tmp_path = path.with_extension("toml.tmp");
    {
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(toml_str.as_bytes())?;
        file.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;
    Ok(())
}
