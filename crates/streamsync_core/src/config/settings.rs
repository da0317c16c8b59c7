//! Settings struct with TOML-based sections.
//!
//! Tunables are organized into logical sections that map to TOML tables.
//! Human-edited fields use milliseconds; the engine reads seconds through the
//! conversion helpers, so units never mix inside the algorithms.

use serde::{Deserialize, Serialize};

use super::error::ConfigError;

/// Root settings structure containing all tunable sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Pulse edge extraction.
    #[serde(default)]
    pub edges: EdgeSettings,

    /// Cross-stream alignment.
    #[serde(default)]
    pub alignment: AlignmentSettings,

    /// Confidence scoring and acceptance.
    #[serde(default)]
    pub quality: QualitySettings,
}

impl Settings {
    /// Parse settings from a TOML string and validate them.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(toml_str)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Serialize settings to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate every section.
    ///
    /// Invalid tunables indicate programmer error rather than data error, so
    /// this is fatal at the call that supplied them.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.edges.validate()?;
        self.alignment.validate()?;
        self.quality.validate()?;
        Ok(())
    }
}

/// Pulse edge extraction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeSettings {
    /// Refractory period in milliseconds: edges closer together than this are
    /// treated as bounce and the later one is discarded.
    #[serde(default = "default_refractory_ms")]
    pub refractory_ms: f64,

    /// Lower percentile for automatic threshold estimation.
    #[serde(default = "default_lower_percentile")]
    pub lower_percentile: f64,

    /// Upper percentile for automatic threshold estimation.
    #[serde(default = "default_upper_percentile")]
    pub upper_percentile: f64,
}

fn default_refractory_ms() -> f64 {
    1.0
}

fn default_lower_percentile() -> f64 {
    5.0
}

fn default_upper_percentile() -> f64 {
    95.0
}

impl Default for EdgeSettings {
    fn default() -> Self {
        Self {
            refractory_ms: default_refractory_ms(),
            lower_percentile: default_lower_percentile(),
            upper_percentile: default_upper_percentile(),
        }
    }
}

impl EdgeSettings {
    /// Refractory period in seconds.
    pub fn refractory_sec(&self) -> f64 {
        self.refractory_ms / 1e3
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.refractory_ms.is_finite() && self.refractory_ms >= 0.0) {
            return Err(ConfigError::invalid(
                "edges.refractory_ms",
                format!("{} must be non-negative and finite", self.refractory_ms),
            ));
        }
        for (name, pct) in [
            ("edges.lower_percentile", self.lower_percentile),
            ("edges.upper_percentile", self.upper_percentile),
        ] {
            if !(pct.is_finite() && (0.0..=100.0).contains(&pct)) {
                return Err(ConfigError::invalid(
                    name,
                    format!("{pct} must be within [0, 100]"),
                ));
            }
        }
        if self.lower_percentile >= self.upper_percentile {
            return Err(ConfigError::invalid(
                "edges.lower_percentile",
                format!(
                    "{} must be below upper_percentile {}",
                    self.lower_percentile, self.upper_percentile
                ),
            ));
        }
        Ok(())
    }
}

/// Cross-stream alignment settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignmentSettings {
    /// Bin width in milliseconds for the coarse correlation grid.
    #[serde(default = "default_bin_width_ms")]
    pub bin_width_ms: f64,

    /// Match tolerance in milliseconds: an edge pair further apart than this
    /// under the current mapping is not counted.
    #[serde(default = "default_match_tolerance_ms")]
    pub match_tolerance_ms: f64,

    /// Maximum refinement iterations.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Minimum matched edge pairs for a usable alignment.
    #[serde(default = "default_min_matched_edges")]
    pub min_matched_edges: usize,

    /// Lower bound of the plausible clock-scale window.
    #[serde(default = "default_min_scale")]
    pub min_scale: f64,

    /// Upper bound of the plausible clock-scale window.
    #[serde(default = "default_max_scale")]
    pub max_scale: f64,
}

fn default_bin_width_ms() -> f64 {
    1.0
}

fn default_match_tolerance_ms() -> f64 {
    5.0
}

fn default_max_iterations() -> u32 {
    20
}

fn default_min_matched_edges() -> usize {
    3
}

fn default_min_scale() -> f64 {
    0.99
}

fn default_max_scale() -> f64 {
    1.01
}

impl Default for AlignmentSettings {
    fn default() -> Self {
        Self {
            bin_width_ms: default_bin_width_ms(),
            match_tolerance_ms: default_match_tolerance_ms(),
            max_iterations: default_max_iterations(),
            min_matched_edges: default_min_matched_edges(),
            min_scale: default_min_scale(),
            max_scale: default_max_scale(),
        }
    }
}

impl AlignmentSettings {
    /// Correlation bin width in seconds.
    pub fn bin_width_sec(&self) -> f64 {
        self.bin_width_ms / 1e3
    }

    /// Match tolerance in seconds.
    pub fn match_tolerance_sec(&self) -> f64 {
        self.match_tolerance_ms / 1e3
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.bin_width_ms.is_finite() && self.bin_width_ms > 0.0) {
            return Err(ConfigError::invalid(
                "alignment.bin_width_ms",
                format!("{} must be positive and finite", self.bin_width_ms),
            ));
        }
        if !(self.match_tolerance_ms.is_finite() && self.match_tolerance_ms > 0.0) {
            return Err(ConfigError::invalid(
                "alignment.match_tolerance_ms",
                format!("{} must be positive and finite", self.match_tolerance_ms),
            ));
        }
        if self.max_iterations == 0 {
            return Err(ConfigError::invalid(
                "alignment.max_iterations",
                "must be at least 1".to_string(),
            ));
        }
        if self.min_matched_edges < 2 {
            return Err(ConfigError::invalid(
                "alignment.min_matched_edges",
                format!("{} must be at least 2", self.min_matched_edges),
            ));
        }
        if !(self.min_scale.is_finite() && self.min_scale > 0.0) {
            return Err(ConfigError::invalid(
                "alignment.min_scale",
                format!("{} must be positive and finite", self.min_scale),
            ));
        }
        if !(self.max_scale.is_finite() && self.max_scale >= self.min_scale) {
            return Err(ConfigError::invalid(
                "alignment.max_scale",
                format!(
                    "{} must be finite and at least min_scale {}",
                    self.max_scale, self.min_scale
                ),
            ));
        }
        Ok(())
    }
}

/// Confidence scoring settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualitySettings {
    /// Minimum confidence for a stream to count as synchronized.
    #[serde(default = "default_acceptance_threshold")]
    pub acceptance_threshold: f64,

    /// Scale deviation from 1.0 at which plausibility reaches zero.
    #[serde(default = "default_scale_tolerance")]
    pub scale_tolerance: f64,
}

fn default_acceptance_threshold() -> f64 {
    0.7
}

fn default_scale_tolerance() -> f64 {
    0.01
}

impl Default for QualitySettings {
    fn default() -> Self {
        Self {
            acceptance_threshold: default_acceptance_threshold(),
            scale_tolerance: default_scale_tolerance(),
        }
    }
}

impl QualitySettings {
    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.acceptance_threshold.is_finite()
            && (0.0..=1.0).contains(&self.acceptance_threshold))
        {
            return Err(ConfigError::invalid(
                "quality.acceptance_threshold",
                format!("{} must be within [0, 1]", self.acceptance_threshold),
            ));
        }
        if !(self.scale_tolerance.is_finite() && self.scale_tolerance > 0.0) {
            return Err(ConfigError::invalid(
                "quality.scale_tolerance",
                format!("{} must be positive and finite", self.scale_tolerance),
            ));
        }
        Ok(())
    }
}
