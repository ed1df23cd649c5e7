// src/config.rs

//! Configuration for catalog construction and decomposition policy.
//!
//! Deserialized from JSON. Every field has a default, so an empty object
//! (or no file at all) yields the build target's catalog with the standard
//! padding policy.
//!
//! ```json
//! {
//!   "target": { "preset": "x86-64-v3" },
//!   "policy": { "padding_ratio": 2, "max_lanes": 256 }
//! }
//! ```

use std::path::Path;

use anyhow::Context;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::catalog::{NativeChunkCatalog, RegisterClass, TargetFeatures};
use crate::error::AbiError;
use crate::mask::MAX_LANES;

/// Environment variable naming a config file for the binary.
pub const CONFIG_ENV_VAR: &str = "SIMD_ABI_CONFIG";

// --- Top-Level Configuration Structure ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Which register catalog to plan against.
    pub target: TargetConfig,
    /// Tunables of the decomposition search.
    pub policy: DecomposePolicy,
}

// --- Decomposition Policy ---

/// Tunables of the decomposition search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecomposePolicy {
    /// A partially used register is rejected when its full lane count is at
    /// least `padding_ratio` times the lanes actually used. 2 means "never
    /// waste half a register"; 1 disables partial registers entirely.
    pub padding_ratio: usize,
    /// Largest lane count a request may name.
    pub max_lanes: usize,
    /// Fewest identical chunks that form a homogeneous array.
    pub min_array_chunks: usize,
}

impl Default for DecomposePolicy {
    fn default() -> Self {
        DecomposePolicy {
            padding_ratio: 2,
            max_lanes: MAX_LANES,
            min_array_chunks: 2,
        }
    }
}

impl DecomposePolicy {
    pub fn validate(&self) -> Result<(), AbiError> {
        if self.padding_ratio == 0 {
            return Err(AbiError::InvalidPolicy("padding_ratio must be at least 1".into()));
        }
        if self.max_lanes == 0 || self.max_lanes > MAX_LANES {
            return Err(AbiError::InvalidPolicy(format!(
                "max_lanes must be in 1..={}",
                MAX_LANES
            )));
        }
        if self.min_array_chunks < 2 {
            return Err(AbiError::InvalidPolicy("min_array_chunks must be at least 2".into()));
        }
        Ok(())
    }
}

// --- Target Selection ---

/// Where the register catalog comes from. The first field that is set
/// wins: explicit registers, explicit features, a preset name, and
/// finally the build target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TargetConfig {
    pub registers: Option<Vec<RegisterClass>>,
    pub features: Option<TargetFeatures>,
    pub preset: Option<String>,
}

impl TargetConfig {
    pub fn build_catalog(&self) -> Result<NativeChunkCatalog, AbiError> {
        if let Some(registers) = &self.registers {
            return NativeChunkCatalog::from_registers(registers.clone());
        }
        if let Some(features) = &self.features {
            return Ok(NativeChunkCatalog::for_target(features));
        }
        if let Some(preset) = &self.preset {
            return Ok(NativeChunkCatalog::for_target(&TargetFeatures::preset(preset)?));
        }
        Ok(NativeChunkCatalog::for_target(&TargetFeatures::detect()))
    }
}

// --- Loading ---

impl Config {
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        let config: Config =
            serde_json::from_str(json).context("Failed to parse configuration JSON")?;
        config.policy.validate().context("Invalid decomposition policy")?;
        Ok(config)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_json_str(&text)
            .with_context(|| format!("Failed to load config file {}", path.display()))?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Loads the file named by `SIMD_ABI_CONFIG`, or the defaults when the
    /// variable is unset.
    pub fn from_env() -> anyhow::Result<Self> {
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) => Self::load(Path::new(&path)),
            None => {
                info!("{} not set, using default configuration", CONFIG_ENV_VAR);
                Ok(Self::default())
            }
        }
    }

    /// Builds the catalog this configuration names.
    pub fn catalog(&self) -> anyhow::Result<NativeChunkCatalog> {
        let catalog = self
            .target
            .build_catalog()
            .context("Failed to build register catalog")?;
        if catalog.registers().len() == 1 {
            warn!("catalog has no vector registers; every recipe will be scalar");
        }
        Ok(catalog)
    }
}
