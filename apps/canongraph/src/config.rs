//! # Configuration
//!
//! Optional TOML configuration for the CLI.
//!
//! ```toml
//! [pipeline]
//! rules = ["dedupe-edges", "hypothesize-from-conjunction", "resolve-disjunction", "recompute-counts"]
//! max_iterations = 8
//!
//! [limits]
//! max_file_size = 104857600
//! ```
//!
//! Missing sections and keys fall back to defaults.

use canongraph_core::canon::{CanonPipeline, DEFAULT_RULE_NAMES};
use canongraph_core::primitives::DEFAULT_MAX_ITERATIONS;
use canongraph_core::CanonError;
use serde::Deserialize;
use std::path::Path;

/// Default maximum size of any input file (100 MB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Pipeline settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Canon rule names, applied in order.
    pub rules: Vec<String>,
    /// Round cap for query-time rule evaluation.
    pub max_iterations: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            rules: DEFAULT_RULE_NAMES.iter().map(|s| s.to_string()).collect(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

/// Input limits.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsConfig {
    /// Maximum size in bytes of any file the CLI reads.
    pub max_file_size: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

/// The whole configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// `[pipeline]`
    pub pipeline: PipelineConfig,
    /// `[limits]`
    pub limits: LimitsConfig,
}

impl Config {
    /// Parse a TOML document.
    pub fn from_toml(content: &str) -> Result<Self, CanonError> {
        toml::from_str(content)
            .map_err(|e| CanonError::DeserializationError(format!("invalid config: {}", e)))
    }

    /// Load from a file, or defaults when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self, CanonError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = std::fs::read_to_string(path).map_err(|e| {
            CanonError::IoError(format!("cannot read config '{}': {}", path.display(), e))
        })?;
        let config = Self::from_toml(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every configured rule name is registered.
    pub fn validate(&self) -> Result<(), CanonError> {
        self.pipeline().map(|_| ())
    }

    /// Build the configured canon pipeline.
    pub fn pipeline(&self) -> Result<CanonPipeline, CanonError> {
        CanonPipeline::from_names(&self.pipeline.rules)
    }
}

// =============================================================================
// TESTS
// =============================================================================
