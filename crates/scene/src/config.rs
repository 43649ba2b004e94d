use std::path::Path;

use glam::Vec3;
use rally_common::Spherical;
use rally_kernel::CoinConfig;
use serde::{Deserialize, Serialize};

/// Half a 60 Hz frame: ticks this close to the frame interval still render.
const FRAME_TOLERANCE: f64 = 0.5 / 60.0;

/// Scene configuration. Every field has a default; a JSON file may override
/// any subset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Render cadence the scheduler aims for.
    pub target_fps: f64,
    pub coins: CoinConfig,
    /// Seed for coin placement. `None` draws one from the OS.
    pub seed: Option<u64>,
    pub clear_color: [f32; 4],
    /// Direction towards the light, not necessarily normalized.
    pub light_direction: Vec3,
    pub ambient: f32,
    /// Initial third-person eye: distance and angles in degrees.
    pub camera_distance: f32,
    pub camera_theta_deg: f32,
    pub camera_phi_deg: f32,
    /// Vertical field of view in degrees.
    pub fov_deg: f32,
    /// Half-extent of the drawn ground plane.
    pub ground_half_extent: f32,
    /// Frames kept for the FPS readout.
    pub frame_history: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            target_fps: 60.0,
            coins: CoinConfig::default(),
            seed: None,
            clear_color: [0.28, 0.28, 0.28, 1.0],
            light_direction: Vec3::new(-1.0, 3.0, 5.0),
            ambient: 0.25,
            camera_distance: 12.0,
            camera_theta_deg: 90.0,
            camera_phi_deg: 70.0,
            fov_deg: 45.0,
            ground_half_extent: 100.0,
            frame_history: 120,
        }
    }
}

/// Errors from reading a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl SimConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file = std::fs::File::open(path)?;
        let config: Self = serde_json::from_reader(file)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.target_fps.is_finite() || self.target_fps <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "target_fps must be positive, got {}",
                self.target_fps
            )));
        }
        if self.coins.target == 0 {
            return Err(ConfigError::Invalid("coin target must be at least 1".into()));
        }
        if !self.camera_distance.is_finite() || self.camera_distance <= 0.0 {
            return Err(ConfigError::Invalid("camera_distance must be positive".into()));
        }
        if !(self.camera_phi_deg > 0.0 && self.camera_phi_deg < 90.0) {
            return Err(ConfigError::Invalid("camera_phi_deg must be in (0, 90)".into()));
        }
        if !(self.fov_deg > 0.0 && self.fov_deg < 180.0) {
            return Err(ConfigError::Invalid("fov_deg must be in (0, 180)".into()));
        }
        if self.frame_history == 0 {
            return Err(ConfigError::Invalid("frame_history must be at least 1".into()));
        }
        Ok(())
    }

    /// Shortest interval between two rendered frames, in seconds.
    pub fn min_frame_time(&self) -> f64 {
        (1.0 / self.target_fps - FRAME_TOLERANCE).max(0.0)
    }

    pub fn camera_eye(&self) -> Spherical {
        Spherical::from_degrees(self.camera_distance, self.camera_theta_deg, self.camera_phi_deg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let c = SimConfig::default();
        assert!(c.validate().is_ok());
        assert!((c.min_frame_time() - 1.0 / 120.0).abs() < 1e-12);
        assert_eq!(c.coins.target, 5);
    }

    #[test]
    fn partial_json_overrides() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(
            tmp.path(),
            r#"{ "target_fps": 30, "coins": { "target": 3 }, "seed": 9 }"#,
        )
        .unwrap();
        let c = SimConfig::load(tmp.path()).unwrap();
        assert_eq!(c.target_fps, 30.0);
        assert_eq!(c.coins.target, 3);
        assert_eq!(c.coins.bound, 95.0);
        assert_eq!(c.seed, Some(9));
        assert_eq!(c.fov_deg, 45.0);
    }

    #[test]
    fn invalid_values_rejected() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), r#"{ "camera_phi_deg": 95 }"#).unwrap();
        assert!(matches!(
            SimConfig::load(tmp.path()),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn very_high_fps_never_negative() {
        let c = SimConfig {
            target_fps: 1000.0,
            ..SimConfig::default()
        };
        assert_eq!(c.min_frame_time(), 0.0);
    }
}
