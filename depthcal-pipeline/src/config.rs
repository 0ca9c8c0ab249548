//! Pipeline configuration.
//!
//! Every field has a default, so a configuration file only needs to name what
//! it changes:
//!
//! ```json
//! {
//!   "corrector": { "normal_neighborhood": 9, "max_depth_mm": 4000 },
//!   "worker": { "idle_interval_us": 500 },
//!   "mirror_device_data": true
//! }
//! ```

use std::path::Path;
use std::time::Duration;

use depthcal_data::RigidTransform;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub corrector: CorrectorConfig,
    pub worker: WorkerConfig,
    /// Treat every frame from a device source as mirrored.
    pub mirror_device_data: bool,
    pub logging: LoggingConfig,
}

impl PipelineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a JSON configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Which correction steps run, and how.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrectorConfig {
    /// Undo horizontal mirroring on frames flagged as mirrored.
    pub mirror: bool,
    /// Estimate per-point normals.
    pub compute_normals: bool,
    /// Edge of the square normal-estimation window, in pixels.
    pub normal_neighborhood: usize,
    /// Fraction of each half window that must hold valid points.
    pub min_valid_fraction: f32,
    /// Depths beyond this many millimetres are treated as invalid.
    pub max_depth_mm: Option<f32>,
    /// Applied to every valid point after back-projection.
    pub transform: Option<RigidTransform>,
}

impl Default for CorrectorConfig {
    fn default() -> Self {
        Self {
            mirror: true,
            compute_normals: true,
            normal_neighborhood: 7,
            min_valid_fraction: 0.5,
            max_depth_mm: None,
            transform: None,
        }
    }
}

/// Calibration worker timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Sleep between polls of an empty input mailbox. Also bounds shutdown
    /// latency.
    pub idle_interval_us: u64,
    /// Whether the worker starts with calibration enabled.
    pub calibration_enabled: bool,
}

impl WorkerConfig {
    pub fn idle_interval(&self) -> Duration {
        Duration::from_micros(self.idle_interval_us)
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            idle_interval_us: 1_000,
            calibration_enabled: true,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            with_target: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use std::io::Write;

    #[test]
    fn test_empty_document_is_default() {
        let config = PipelineConfig::from_json_str("{}").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.worker.idle_interval(), Duration::from_millis(1));
    }

    #[test]
    fn test_partial_document() {
        let json = r#"{
            "corrector": {
                "normal_neighborhood": 9,
                "transform": {
                    "rotation": [[1,0,0],[0,1,0],[0,0,1]],
                    "translation": [0, 0, -500]
                }
            },
            "mirror_device_data": true
        }"#;
        let config = PipelineConfig::from_json_str(json).unwrap();
        assert_eq!(config.corrector.normal_neighborhood, 9);
        assert!(config.corrector.compute_normals);
        assert!(config.mirror_device_data);
        let transform = config.corrector.transform.unwrap();
        assert_eq!(transform.translation, Vec3::new(0.0, 0.0, -500.0));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"worker": {{"idle_interval_us": 250}}, "logging": {{"level": "debug"}}}}"#)
            .unwrap();

        let config = PipelineConfig::load(file.path()).unwrap();
        assert_eq!(config.worker.idle_interval_us, 250);
        assert!(config.worker.calibration_enabled);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_round_trip_through_json() {
        let mut config = PipelineConfig::default();
        config.corrector.max_depth_mm = Some(3500.0);
        let text = config.to_json_string().unwrap();
        assert_eq!(PipelineConfig::from_json_str(&text).unwrap(), config);
    }

    #[test]
    fn test_malformed_document() {
        assert!(matches!(
            PipelineConfig::from_json_str("{ not json"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            PipelineConfig::load("/nonexistent/depthcal.json"),
            Err(ConfigError::Io(_))
        ));
    }
}
