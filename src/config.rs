//! Configuration for the EmoCollab agent.

use crate::capture::CaptureConstraints;
use crate::core::presence::PresencePolicy;
use crate::core::recommendations::RecommendationTable;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration for the agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Presence detection policy and cadence
    pub detector: DetectorConfig,

    /// Mock engine bounds
    pub engine: EngineConfig,

    /// Recommendation lists per stress tier
    pub recommendations: RecommendationTable,

    /// Requested camera settings
    pub capture: CaptureConstraints,

    /// HTTP server settings
    pub server: ServerSettings,

    /// Period of the cosmetic analysis progress ticker
    #[serde(with = "millis_serde")]
    pub progress_tick: Duration,

    /// Path for storing activity stats
    pub data_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("emocollab");

        Self {
            detector: DetectorConfig::default(),
            engine: EngineConfig::default(),
            recommendations: RecommendationTable::default(),
            capture: CaptureConstraints::default(),
            server: ServerSettings::default(),
            progress_tick: Duration::from_millis(200),
            data_path: data_dir,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .map_err(|e| ConfigError::IoError(e.to_string()))?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(&config_path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("emocollab")
            .join("config.json")
    }

    /// Ensure all required directories exist.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.data_path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Ok(())
    }

    /// Path of the persisted activity counters.
    pub fn activity_path(&self) -> PathBuf {
        self.data_path.join("activity.json")
    }
}

/// Presence detector configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Which heuristic decides presence
    pub policy: PresencePolicy,

    /// Sample every Nth pixel
    pub sample_stride: usize,

    /// Replace the frame heuristic with a random draw per tick
    pub use_random_presence: bool,

    /// Probability of "detected" per tick when random presence is on
    pub random_presence_probability: f64,

    /// Time between presence samples
    #[serde(with = "millis_serde")]
    pub poll_interval: Duration,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            policy: PresencePolicy::default(),
            sample_stride: 16,
            use_random_presence: false,
            random_presence_probability: 0.7,
            poll_interval: Duration::from_millis(1000),
        }
    }
}

/// Mock engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Lower bound of the confidence draw
    pub confidence_min: f64,
    /// Upper bound of the confidence draw
    pub confidence_max: f64,
    /// Half-width of the uniform noise added to the stress ratio
    pub stress_noise: f64,
    /// Stress level clamp, lower end
    pub stress_floor: f64,
    /// Stress level clamp, upper end
    pub stress_ceiling: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            confidence_min: 0.85,
            confidence_max: 1.0,
            stress_noise: 10.0,
            stress_floor: 20.0,
            stress_ceiling: 90.0,
        }
    }
}

impl EngineConfig {
    /// Bounds used when a remote analysis fails and a local mock stands in.
    pub fn fallback() -> Self {
        Self {
            confidence_min: 0.75,
            confidence_max: 0.95,
            ..Self::default()
        }
    }

    /// Confidence bounds ordered and clamped into [0, 1].
    pub fn confidence_bounds(&self) -> (f64, f64) {
        let lo = self.confidence_min.clamp(0.0, 1.0);
        let hi = self.confidence_max.clamp(0.0, 1.0);
        if lo <= hi {
            (lo, hi)
        } else {
            (hi, lo)
        }
    }

    /// Stress clamp ordered and clamped into [0, 100].
    pub fn stress_bounds(&self) -> (f64, f64) {
        let lo = self.stress_floor.clamp(0.0, 100.0);
        let hi = self.stress_ceiling.clamp(0.0, 100.0);
        if lo <= hi {
            (lo, hi)
        } else {
            (hi, lo)
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub port: u16,

    /// Artificial delay before the analysis endpoints answer
    #[serde(with = "millis_serde")]
    pub analysis_delay: Duration,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: 8080,
            analysis_delay: Duration::from_millis(1000),
        }
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Serde support for Duration as whole milliseconds.
mod millis_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.progress_tick, Duration::from_millis(200));
        assert_eq!(config.server.port, 8080);
        assert!(!config.detector.use_random_presence);
        assert_eq!(config.detector.random_presence_probability, 0.7);
        assert_eq!(config.engine.confidence_bounds(), (0.85, 1.0));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config =
            serde_json::from_str(r#"{ "server": { "port": 9000 }, "progress_tick": 50 }"#)
                .unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.analysis_delay, Duration::from_millis(1000));
        assert_eq!(config.progress_tick, Duration::from_millis(50));
        assert_eq!(config.detector.sample_stride, 16);
    }

    #[test]
    fn test_durations_serialize_as_millis() {
        let json = serde_json::to_value(ServerSettings::default()).unwrap();
        assert_eq!(json["analysis_delay"], 1000);
    }

    #[test]
    fn test_bounds_are_ordered_and_clamped() {
        let engine = EngineConfig {
            confidence_min: 1.4,
            confidence_max: 0.6,
            stress_floor: 120.0,
            stress_ceiling: -5.0,
            ..EngineConfig::default()
        };
        assert_eq!(engine.confidence_bounds(), (0.6, 1.0));
        assert_eq!(engine.stress_bounds(), (0.0, 100.0));
    }

    #[test]
    fn test_fallback_bounds() {
        assert_eq!(EngineConfig::fallback().confidence_bounds(), (0.75, 0.95));
    }
}
