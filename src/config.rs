use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::{LouvainError, Result};

/// Sweep cap applied to a level when nothing else is configured.
pub const DEFAULT_MAX_SWEEPS: usize = 100;

/// Minimum gain a move must exceed; filters floating-point noise that would
/// otherwise let two vertices swap communities forever.
pub const DEFAULT_EPSILON: f64 = 1e-12;

pub const DEFAULT_RESOLUTION: f64 = 1.0;

/// Read buffer used by the edge-list loader.
pub(crate) const READ_BUFFER_SIZE: usize = 8 * 1024 * 1024;

/// Tunables of a Louvain run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LouvainConfig {
    /// Maximum number of contraction levels. Must be at least 1.
    pub max_levels: usize,
    /// Maximum number of local-move sweeps per level. Must be at least 1.
    pub max_sweeps_per_level: usize,
    /// Weight of the null-model term, `1.0` is classic modularity.
    pub resolution: f64,
    /// A move is applied only when its gain is strictly above this value.
    pub epsilon: f64,
    /// Stop after a level that improves modularity by no more than this.
    pub min_modularity_gain: Option<f64>,
    /// Shuffle the sweep order with a seeded RNG instead of ascending ids.
    pub shuffle_seed: Option<u64>,
    /// Size of the worker pool; `None` uses the global rayon pool.
    pub threads: Option<usize>,
}

impl Default for LouvainConfig {
    fn default() -> Self {
        LouvainConfig {
            max_levels: usize::MAX,
            max_sweeps_per_level: DEFAULT_MAX_SWEEPS,
            resolution: DEFAULT_RESOLUTION,
            epsilon: DEFAULT_EPSILON,
            min_modularity_gain: None,
            shuffle_seed: None,
            threads: None,
        }
    }
}

impl LouvainConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_levels(mut self, max_levels: usize) -> Self {
        self.max_levels = max_levels;
        self
    }

    pub fn with_max_sweeps(mut self, max_sweeps: usize) -> Self {
        self.max_sweeps_per_level = max_sweeps;
        self
    }

    /// Higher values produce smaller communities.
    pub fn with_resolution(mut self, resolution: f64) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_min_modularity_gain(mut self, threshold: f64) -> Self {
        self.min_modularity_gain = Some(threshold);
        self
    }

    pub fn with_shuffle_seed(mut self, seed: u64) -> Self {
        self.shuffle_seed = Some(seed);
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    /// Load a config from a YAML file. Missing keys keep their defaults.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("failed to open config file {}", path.display()))?;
        let config: LouvainConfig = serde_yaml::from_reader(BufReader::new(file))
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(text: &str) -> anyhow::Result<Self> {
        let config: LouvainConfig = serde_yaml::from_str(text).context("failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    /// Check every value is in its accepted range.
    pub fn validate(&self) -> Result<()> {
        if self.max_levels == 0 {
            return Err(LouvainError::invalid_config("max_levels", "must be at least 1"));
        }
        if self.max_sweeps_per_level == 0 {
            return Err(LouvainError::invalid_config(
                "max_sweeps_per_level",
                "must be at least 1",
            ));
        }
        if !self.resolution.is_finite() || self.resolution <= 0.0 {
            return Err(LouvainError::invalid_config(
                "resolution",
                format!("must be finite and positive, got {}", self.resolution),
            ));
        }
        if !self.epsilon.is_finite() || self.epsilon < 0.0 {
            return Err(LouvainError::invalid_config(
                "epsilon",
                format!("must be finite and non-negative, got {}", self.epsilon),
            ));
        }
        if let Some(threshold) = self.min_modularity_gain {
            if !threshold.is_finite() {
                return Err(LouvainError::invalid_config(
                    "min_modularity_gain",
                    "must be finite",
                ));
            }
        }
        if self.threads == Some(0) {
            return Err(LouvainError::invalid_config("threads", "must be at least 1"));
        }
        Ok(())
    }
}
