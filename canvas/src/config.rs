//! Engine tuning knobs.
//!
//! Screen-space values (`*_px`) are converted to world units through the
//! current zoom at the point of use, so hit slop feels the same at every zoom
//! level.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use serde::{Deserialize, Serialize};

use crate::consts::*;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// Fraction of the viewport a jumped-to entity should fill.
    pub jump_fill: f64,
    pub jump_max_zoom: f64,
    pub wheel_sensitivity: f64,
    pub handle_radius_px: f64,
    pub line_hit_px: f64,
    pub close_threshold_px: f64,
    pub snap_threshold_px: f64,
    /// Gap between adjacent-edge snapped PV arrays, in metres.
    pub pv_gap_m: f64,
    pub debounce_ms: f64,
    pub label_min_width: f64,
    pub label_min_height: f64,
    pub equipment_size_m: f64,
    pub equipment_fallback_px: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_zoom: MIN_ZOOM,
            max_zoom: MAX_ZOOM,
            jump_fill: JUMP_FILL,
            jump_max_zoom: JUMP_MAX_ZOOM,
            wheel_sensitivity: WHEEL_SENSITIVITY,
            handle_radius_px: HANDLE_RADIUS_PX,
            line_hit_px: LINE_HIT_PX,
            close_threshold_px: CLOSE_THRESHOLD_PX,
            snap_threshold_px: SNAP_THRESHOLD_PX,
            pv_gap_m: PV_GAP_M,
            debounce_ms: DEBOUNCE_MS,
            label_min_width: LABEL_MIN_WIDTH,
            label_min_height: LABEL_MIN_HEIGHT,
            equipment_size_m: EQUIPMENT_SIZE_M,
            equipment_fallback_px: EQUIPMENT_FALLBACK_PX,
        }
    }
}

/// A config value that cannot drive the engine.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("zoom range is empty: min {min} >= max {max}")]
    ZoomRange { min: f64, max: f64 },
    #[error("{field} must be positive, got {value}")]
    NotPositive { field: &'static str, value: f64 },
}

impl EngineConfig {
    /// Reject values that would make the transform or thresholds degenerate.
    ///
    /// # Errors
    ///
    /// Returns the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("min_zoom", self.min_zoom),
            ("max_zoom", self.max_zoom),
            ("jump_fill", self.jump_fill),
            ("jump_max_zoom", self.jump_max_zoom),
            ("handle_radius_px", self.handle_radius_px),
            ("line_hit_px", self.line_hit_px),
            ("close_threshold_px", self.close_threshold_px),
            ("snap_threshold_px", self.snap_threshold_px),
            ("debounce_ms", self.debounce_ms),
            ("label_min_width", self.label_min_width),
            ("label_min_height", self.label_min_height),
            ("equipment_size_m", self.equipment_size_m),
            ("equipment_fallback_px", self.equipment_fallback_px),
        ];
        for (field, value) in positive {
            if !(value > 0.0 && value.is_finite()) {
                return Err(ConfigError::NotPositive { field, value });
            }
        }
        if self.min_zoom >= self.max_zoom {
            return Err(ConfigError::ZoomRange { min: self.min_zoom, max: self.max_zoom });
        }
        Ok(())
    }

    /// Clamp a zoom factor into the configured range.
    #[must_use]
    pub fn clamp_zoom(&self, zoom: f64) -> f64 {
        zoom.clamp(self.min_zoom, self.max_zoom)
    }
}
