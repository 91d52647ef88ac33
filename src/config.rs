//! Playback configuration loaded from YAML.
//!
//! ```yaml
//! resolution: 480
//! tempo: 96
//! realtime: false
//! channels: 16
//! ```
//!
//! Every key is optional; missing keys take their defaults.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PartituraError, Result};

pub const DEFAULT_RESOLUTION: u32 = 960;
pub const DEFAULT_TEMPO: u32 = 120;
pub const MIN_TEMPO: u32 = 1;
pub const MAX_TEMPO: u32 = 960;
pub const MAX_CHANNELS: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct PlaybackConfig {
    /// Ticks per quarter note
    pub resolution: u32,
    /// Beats per minute
    pub tempo: u32,
    /// Pace the software sequencer against the wall clock
    pub realtime: bool,
    /// Size of the channel table
    pub channels: usize,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        PlaybackConfig {
            resolution: DEFAULT_RESOLUTION,
            tempo: DEFAULT_TEMPO,
            realtime: true,
            channels: MAX_CHANNELS,
        }
    }
}

impl PlaybackConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: PlaybackConfig = if content.trim().is_empty() {
            PlaybackConfig::default()
        } else {
            serde_yaml::from_str(content).map_err(|e| PartituraError::Config(e.to_string()))?
        };
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn validate(&self) -> Result<()> {
        if self.resolution == 0 {
            return Err(PartituraError::Config("resolution must be positive".to_string()));
        }
        if !(MIN_TEMPO..=MAX_TEMPO).contains(&self.tempo) {
            return Err(PartituraError::Config(format!(
                "tempo {} is outside {}..={}",
                self.tempo, MIN_TEMPO, MAX_TEMPO
            )));
        }
        if self.channels == 0 || self.channels > MAX_CHANNELS {
            return Err(PartituraError::Config(format!(
                "channels must be between 1 and {}, got {}",
                MAX_CHANNELS, self.channels
            )));
        }
        Ok(())
    }
}
