//! Configuration for loading batches and running beam search.
//!
//! Every struct deserializes from JSON with defaults for missing fields, so a
//! config file only needs to name what it changes.

use std::fs;
use std::path::Path;
use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};

/// How a [`BatchLoader`](crate::loader::BatchLoader) walks a dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    pub batch_size: usize,
    pub shuffle: bool,
    /// Seed for the shuffle; `None` draws one from the OS
    pub seed: Option<u64>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            batch_size: 32,
            shuffle: false,
            seed: None,
        }
    }
}

/// Per-example beam parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeamConfig {
    pub beam_size: usize,
    /// `__end__` is blocked until this many tokens have been produced
    pub min_length: usize,
    /// A beam is done once this many hypotheses have finished and the best one ended
    pub min_n_best: usize,
}

impl Default for BeamConfig {
    fn default() -> Self {
        Self {
            beam_size: 5,
            min_length: 3,
            min_n_best: 3,
        }
    }
}

/// Decoding parameters for [`beam_search`](crate::generate::beam_search)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    #[serde(flatten)]
    pub beam: BeamConfig,
    /// Maximum number of decoding steps
    pub max_len: usize,
    pub n_best: Option<usize>,
    pub add_length_penalty: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            beam: BeamConfig::default(),
            max_len: 40,
            n_best: None,
            add_length_penalty: false,
        }
    }
}

impl BeamConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(self.beam_size > 0, "beam_size must be at least 1");
        Ok(())
    }
}

impl GenerationConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("cannot read config '{}'", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("invalid config '{}'", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.beam.validate()?;
        ensure!(self.max_len > 0, "max_len must be at least 1");
        Ok(())
    }
}
