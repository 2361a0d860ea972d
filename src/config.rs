//! Configuration for the hand gesture agent.

use crate::core::labels::LabelMap;
use crate::tracking::types::Handedness;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration. Fixed at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Hysteresis settings for gesture commitment
    pub smoothing: SmoothingConfig,

    /// Grab, throw, rotation and two-hand scale settings
    pub interaction: InteractionConfig,

    /// Radial menu settings
    pub menu: MenuConfig,

    /// Class order of the gesture model
    pub labels: LabelMap,

    /// Simulation/playback rate in ticks per second
    pub tick_rate_hz: f32,

    /// Template model file. The built-in reference templates are used when unset.
    pub model_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            smoothing: SmoothingConfig::default(),
            interaction: InteractionConfig::default(),
            menu: MenuConfig::default(),
            labels: LabelMap::default(),
            tick_rate_hz: 60.0,
            model_path: None,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load and validate configuration from `path`.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        let config: Config =
            serde_json::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("hand-gesture-agent")
            .join("config.json")
    }

    /// Check every scalar against its allowed range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.smoothing;
        if s.window_size < 1 {
            return Err(invalid("smoothing.window_size must be at least 1"));
        }
        if !(0.0..=1.0).contains(&s.confidence_threshold) {
            return Err(invalid("smoothing.confidence_threshold must be in [0, 1]"));
        }
        if !(s.dwell_time_secs >= 0.0) {
            return Err(invalid("smoothing.dwell_time_secs must be non-negative"));
        }

        let i = &self.interaction;
        if !(i.grab_range > 0.0) {
            return Err(invalid("interaction.grab_range must be positive"));
        }
        if !(i.min_scale > 0.0) || !(i.min_scale < i.max_scale) {
            return Err(invalid(
                "interaction.min_scale must be positive and below interaction.max_scale",
            ));
        }

        let m = &self.menu;
        if m.item_count < 1 {
            return Err(invalid("menu.item_count must be at least 1"));
        }
        if !(m.radius > 0.0) {
            return Err(invalid("menu.radius must be positive"));
        }
        if !(m.auto_hide_secs >= 0.0) {
            return Err(invalid("menu.auto_hide_secs must be non-negative"));
        }
        if m.plane_normal.length_squared() < 1e-12 {
            return Err(invalid("menu.plane_normal must be non-zero"));
        }

        if self.labels.is_empty() {
            return Err(invalid("labels must not be empty"));
        }
        if !(self.tick_rate_hz > 0.0) {
            return Err(invalid("tick_rate_hz must be positive"));
        }
        Ok(())
    }

    /// Seconds per tick.
    pub fn tick_interval(&self) -> f32 {
        1.0 / self.tick_rate_hz
    }
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::Invalid(message.to_string())
}

/// Temporal smoothing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    /// Raw classifications kept for the majority vote
    pub window_size: usize,
    pub majority_vote: bool,
    /// Results below this confidence force "no gesture"
    pub confidence_threshold: f32,
    /// Seconds a candidate must stay pending before it is committed
    pub dwell_time_secs: f64,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            window_size: 5,
            majority_vote: true,
            confidence_threshold: 0.7,
            dwell_time_secs: 0.2,
        }
    }
}

/// Object manipulation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    /// Meters from the palm centre within which a pinch grabs
    pub grab_range: f32,
    pub throw_multiplier: f32,
    /// Object roll per radian of wrist roll
    pub rotation_sensitivity: f32,
    pub min_scale: f32,
    pub max_scale: f32,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            grab_range: 0.15,
            throw_multiplier: 1.0,
            rotation_sensitivity: 1.0,
            min_scale: 0.5,
            max_scale: 3.0,
        }
    }
}

/// Radial menu settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MenuConfig {
    /// Meters from the menu centre to each item
    pub radius: f32,
    pub item_count: usize,
    /// Hand whose gestures drive the menu
    pub hand: Handedness,
    /// Delay between a selection and the automatic hide
    pub auto_hide_secs: f64,
    /// Normal of the menu plane
    pub plane_normal: Vec3,
}

impl Default for MenuConfig {
    fn default() -> Self {
        Self {
            radius: 0.15,
            item_count: 5,
            hand: Handedness::Left,
            auto_hide_secs: 0.5,
            plane_normal: Vec3::Z,
        }
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
            ConfigError::Invalid(e) => write!(f, "Invalid configuration: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.smoothing.window_size, 5);
        assert!(config.smoothing.majority_vote);
        assert!((config.smoothing.confidence_threshold - 0.7).abs() < 1e-6);
        assert!((config.interaction.max_scale - 3.0).abs() < 1e-6);
        assert_eq!(config.menu.item_count, 5);
        assert_eq!(config.menu.hand, Handedness::Left);
        assert_eq!(config.labels.len(), 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"smoothing": {"window_size": 9}, "tick_rate_hz": 90}"#)
                .unwrap();
        assert_eq!(config.smoothing.window_size, 9);
        assert!((config.smoothing.dwell_time_secs - 0.2).abs() < 1e-9);
        assert!((config.tick_rate_hz - 90.0).abs() < 1e-6);
        assert_eq!(config.menu.item_count, 5);
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let mut config = Config::default();
        config.smoothing.window_size = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = Config::default();
        config.smoothing.confidence_threshold = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.interaction.min_scale = 3.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.interaction.grab_range = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.menu.item_count = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.smoothing.dwell_time_secs = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load_from_file() {
        let dir = std::env::temp_dir().join(format!("hand-gesture-config-{}", std::process::id()));
        let path = dir.join("config.json");

        let mut config = Config::default();
        config.interaction.throw_multiplier = 2.5;
        config.menu.hand = Handedness::Right;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert!((loaded.interaction.throw_multiplier - 2.5).abs() < 1e-6);
        assert_eq!(loaded.menu.hand, Handedness::Right);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_from_rejects_invalid_file() {
        let dir = std::env::temp_dir().join(format!("hand-gesture-bad-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");
        std::fs::write(&path, r#"{"menu": {"item_count": 0}}"#).unwrap();
        assert!(matches!(Config::load_from(&path), Err(ConfigError::Invalid(_))));

        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(Config::load_from(&path), Err(ConfigError::ParseError(_))));

        std::fs::remove_dir_all(&dir).ok();
    }
}
