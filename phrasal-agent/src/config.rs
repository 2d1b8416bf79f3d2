//! Engine configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use phrasal_core::{BundleLayout, SlotPools, DEFAULT_SIMILARITY_THRESHOLD, MAX_INPUT_CHARS};

/// Hard ceiling on generation attempts per resolution.
pub const MAX_ATTEMPTS_CEILING: u32 = 3;

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Configuration for a [`crate::ResolutionEngine`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Generation attempts before giving up (1..=3)
    pub max_attempts: u32,
    /// Longest accepted input, in characters after trimming
    pub max_input_chars: usize,
    /// Pairwise story similarity above this fails validation
    pub similarity_threshold: f64,
    /// Pages every bundle must have
    pub layout: BundleLayout,
    /// Topic, mood and setting pools for diversity slots
    pub slot_pools: SlotPools,
    /// Fixed RNG seed; entropy when unset
    pub rng_seed: Option<u64>,
    /// Persist generated bundles
    pub persist_generated: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS_CEILING,
            max_input_chars: MAX_INPUT_CHARS,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            layout: BundleLayout::default(),
            slot_pools: SlotPools::default(),
            rng_seed: None,
            persist_generated: true,
        }
    }
}

impl EngineConfig {
    /// Load config from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Read and validate a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let yaml = std::fs::read_to_string(path)?;
        let config = Self::from_yaml(&yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_layout(mut self, layout: BundleLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 || self.max_attempts > MAX_ATTEMPTS_CEILING {
            return Err(ConfigError::Invalid(format!(
                "max_attempts must be between 1 and {}, got {}",
                MAX_ATTEMPTS_CEILING, self.max_attempts
            )));
        }
        if self.max_input_chars == 0 {
            return Err(ConfigError::Invalid("max_input_chars must be positive".to_string()));
        }
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(ConfigError::Invalid(format!(
                "similarity_threshold must be within [0, 1], got {}",
                self.similarity_threshold
            )));
        }
        self.layout.check().map_err(ConfigError::Invalid)
    }
}
