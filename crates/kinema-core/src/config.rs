use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::time::Duration;

fn default_fps() -> f64 {
    60.0
}

fn default_speed() -> f64 {
    1.0
}

fn default_max_ticks() -> u64 {
    1_000_000
}

/// Playback settings for the deterministic clock.
///
/// Loaded from TOML so scene projects can pin their frame rate next to
/// their scene sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Frames per second of simulated time.
    #[serde(default = "default_fps")]
    pub fps: f64,
    /// Time-scale multiplier; 2.0 plays the timeline at double speed.
    #[serde(default = "default_speed")]
    pub speed: f64,
    /// Upper bound on ticks for synchronous drains, so a timeline that
    /// never completes fails instead of spinning forever.
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            speed: default_speed(),
            max_ticks: default_max_ticks(),
        }
    }
}

impl PlaybackConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(contents: &str) -> EngineResult<Self> {
        let config: PlaybackConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate from a TOML file.
    pub fn load_from_file(path: &std::path::Path) -> EngineResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Check the settings for internal consistency.
    pub fn validate(&self) -> EngineResult<()> {
        if !(self.fps > 0.0) || !self.fps.is_finite() {
            return Err(EngineError::config("fps must be positive and finite"));
        }
        if !(self.speed > 0.0) || !self.speed.is_finite() {
            return Err(EngineError::config("speed must be positive and finite"));
        }
        if self.max_ticks == 0 {
            return Err(EngineError::config("max_ticks must be non-zero"));
        }
        Ok(())
    }

    /// The fixed simulated-time step one tick advances.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_seconds(self.speed / self.fps)
    }
}
