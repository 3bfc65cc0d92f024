//! Stage bounds and clamping
//!
//! The stage is centred on the origin. A sprite's position is the centre of
//! its bounding box, so the reachable area is the stage shrunk by half the
//! sprite size on every side.

use serde::Serialize;

use super::StageConfig;

/// Rectangle a sprite centre must stay inside
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StageBounds {
    /// Smallest reachable x
    pub min_x: f64,
    /// Largest reachable x
    pub max_x: f64,
    /// Smallest reachable y
    pub min_y: f64,
    /// Largest reachable y
    pub max_y: f64,
}

impl StageBounds {
    /// Derive bounds from stage and sprite dimensions
    pub fn from_config(config: &StageConfig) -> Self {
        let half_x = (config.stage_width - config.sprite_width) / 2.0;
        let half_y = (config.stage_height - config.sprite_height) / 2.0;
        Self {
            min_x: -half_x,
            max_x: half_x,
            min_y: -half_y,
            max_y: half_y,
        }
    }

    /// Clamp an x coordinate into the stage
    pub fn clamp_x(&self, x: f64) -> f64 {
        clamp_axis(x, self.min_x, self.max_x)
    }

    /// Clamp a y coordinate into the stage
    pub fn clamp_y(&self, y: f64) -> f64 {
        clamp_axis(y, self.min_y, self.max_y)
    }

    /// Clamp a point into the stage, each axis independently
    pub fn clamp(&self, x: f64, y: f64) -> (f64, f64) {
        (self.clamp_x(x), self.clamp_y(y))
    }

    /// Whether a point lies inside the bounds (edges included)
    pub fn contains(&self, x: f64, y: f64) -> bool {
        (self.min_x..=self.max_x).contains(&x) && (self.min_y..=self.max_y).contains(&y)
    }
}

// NaN has no sensible place on the stage; it snaps to the centre.
fn clamp_axis(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        return 0.0_f64.clamp(min, max);
    }
    value.clamp(min, max)
}

/// Normalize a heading into `0..360`
pub fn normalize_heading(degrees: i64) -> i64 {
    degrees.rem_euclid(360)
}
