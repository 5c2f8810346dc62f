//! Parameter definitions with units and documented semantics.
//!
//! All magic numbers are extracted here with:
//! - Units (world units, seconds, dB, bins)
//! - Documented ranges and meanings
//! - Defaults that reproduce the stock look, overridable from TOML

mod audio;
mod render;
mod scene;

use serde::Deserialize;
use std::path::Path;

use crate::error::{Result, VisualizerError};

// Re-export all types
pub use audio::{AnalyzerConfig, SyntheticConfig};
pub use render::RenderConfig;
pub use scene::{
    AuroraParams, GalaxyParams, MorphLayerParams, RibbonParams, SceneParams, TunnelParams,
};

/// Playback defaults
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlaybackParams {
    /// Volume applied to every new session (0.0 - 1.0)
    pub initial_volume: f32,

    /// Connect timeout for manifest and remote track fetches (seconds)
    pub connect_timeout_secs: u64,

    /// Overall request timeout (seconds)
    pub request_timeout_secs: u64,
}

impl Default for PlaybackParams {
    fn default() -> Self {
        Self {
            initial_volume: 0.7,
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
        }
    }
}

/// Complete visualizer configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VisualizerConfig {
    pub analyzer: AnalyzerConfig,
    pub synthetic: SyntheticConfig,
    pub scenes: SceneParams,
    pub render: RenderConfig,
    pub playback: PlaybackParams,
}

impl VisualizerConfig {
    /// Parse a TOML document; missing tables and keys keep their defaults
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.analyzer.validate().map_err(VisualizerError::Config)?;
        config.synthetic.validate().map_err(VisualizerError::Config)?;
        config.scenes.validate().map_err(VisualizerError::Config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}
