//! Stage runtime: configuration and public API
//!
//! The [`Stage`] store owns every actor, the tick scheduler and the bubble
//! timers. Everything is driven by virtual time; the [`driver`] module maps
//! wall-clock time onto it for interactive use.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

// Submodules
pub mod actor;
pub mod collision;
pub mod command;
pub mod cursor;
pub mod driver;
pub mod error;
pub mod executor;
pub mod geometry;
pub mod scheduler;
pub mod snapshot;
pub mod store;
pub mod timer;

use error::{ConfigError, ConfigResult};
use geometry::StageBounds;

/// How `Move` turns a distance into a displacement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum MotionModel {
    /// Move along x only; y is raised to `floor_y` when set
    Horizontal {
        /// Lowest y a moving sprite may keep
        floor_y: Option<f64>,
    },
    /// Move along the heading (0 up, 90 right)
    Heading,
}

impl Default for MotionModel {
    fn default() -> Self {
        MotionModel::Horizontal { floor_y: Some(0.0) }
    }
}

/// Configuration for a stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    /// Stage width in stage units
    pub stage_width: f64,

    /// Stage height in stage units
    pub stage_height: f64,

    /// Sprite bounding box width
    pub sprite_width: f64,

    /// Sprite bounding box height
    pub sprite_height: f64,

    /// Centres closer than this collide
    pub collision_distance: f64,

    /// Milliseconds between scheduler ticks
    pub tick_period_ms: u64,

    /// Interpretation of `Move`
    pub motion: MotionModel,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            stage_width: 480.0,
            stage_height: 360.0,
            sprite_width: 80.0,
            sprite_height: 80.0,
            collision_distance: 40.0,
            tick_period_ms: 500,
            motion: MotionModel::default(),
        }
    }
}

impl StageConfig {
    /// Load and validate a JSON config file
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: StageConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject dimensions the clamping and scheduling code cannot work with
    pub fn validate(&self) -> ConfigResult<()> {
        let dims = [
            ("stage_width", self.stage_width),
            ("stage_height", self.stage_height),
            ("sprite_width", self.sprite_width),
            ("sprite_height", self.sprite_height),
        ];
        for (name, value) in dims {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::Invalid(format!("{name} must be positive, got {value}")));
            }
        }
        if self.sprite_width > self.stage_width || self.sprite_height > self.stage_height {
            return Err(ConfigError::Invalid("sprite is larger than the stage".into()));
        }
        if !self.collision_distance.is_finite() || self.collision_distance < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "collision_distance must be non-negative, got {}",
                self.collision_distance
            )));
        }
        if self.tick_period_ms == 0 {
            return Err(ConfigError::Invalid("tick_period_ms must be at least 1".into()));
        }
        Ok(())
    }

    /// Scheduler tick period
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_period_ms)
    }

    /// Reachable area for sprite centres
    pub fn bounds(&self) -> StageBounds {
        StageBounds::from_config(self)
    }
}

// Re-export commonly used types
pub use actor::{Actor, ActorId, BubbleKind};
pub use collision::CollisionPair;
pub use command::{Command, CommandPatch};
pub use error::{StageError, StageResult};
pub use scheduler::PlayState;
pub use snapshot::{ActorSnapshot, StageSnapshot};
pub use store::{
    IMMEDIATE_REPEAT_LIMIT, ObserverId, Stage, StageEvent, StageObserver, StopReason, TickReport,
};

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "tick_period_ms": 100, "motion": {{ "mode": "heading" }} }}"#).unwrap();

        let config = StageConfig::load(file.path()).unwrap();
        assert_eq!(config.tick_period(), Duration::from_millis(100));
        assert_eq!(config.motion, MotionModel::Heading);
        assert_eq!(config.stage_width, 480.0);
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "sprite_width": 900 }}"#).unwrap();
        assert!(matches!(
            StageConfig::load(file.path()),
            Err(ConfigError::Invalid(_))
        ));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(StageConfig::load(file.path()), Err(ConfigError::Json(_))));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = StageConfig::load(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_zero_tick_period_is_invalid() {
        let config = StageConfig {
            tick_period_ms: 0,
            ..StageConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
