#[cfg(test)]
#[path = "camera_test.rs"]
mod camera_test;

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::consts::JUMP_MIN_EXTENT;
use crate::geometry::{Bounds, Point};

/// Pan/zoom state mapping world (PDF pixel) space onto the viewport.
///
/// `screen = world * zoom + offset`. `offset` is in CSS pixels and `zoom` is
/// a scale factor (1.0 = one PDF pixel per CSS pixel).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    pub zoom: f64,
    pub offset: Point,
}

impl Default for ViewState {
    fn default() -> Self {
        Self { zoom: 1.0, offset: Point::default() }
    }
}

impl ViewState {
    /// Convert a screen-space point (CSS pixels) to world coordinates.
    #[must_use]
    pub fn screen_to_world(&self, screen: Point) -> Point {
        Point {
            x: (screen.x - self.offset.x) / self.zoom,
            y: (screen.y - self.offset.y) / self.zoom,
        }
    }

    /// Convert a world-space point to screen coordinates (CSS pixels).
    #[must_use]
    pub fn world_to_screen(&self, world: Point) -> Point {
        Point {
            x: world.x * self.zoom + self.offset.x,
            y: world.y * self.zoom + self.offset.y,
        }
    }

    /// Convert a screen-space distance (pixels) to world-space distance.
    #[must_use]
    pub fn screen_dist_to_world(&self, screen_dist: f64) -> f64 {
        screen_dist / self.zoom
    }

    /// Shift the view by a raw screen-space delta.
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.offset.x += dx;
        self.offset.y += dy;
    }

    /// Change zoom while keeping the world point under `cursor` fixed on screen.
    ///
    /// The new zoom is clamped to the configured range.
    pub fn zoom_at(&mut self, cursor: Point, new_zoom: f64, config: &EngineConfig) {
        let anchor = self.screen_to_world(cursor);
        let zoom = config.clamp_zoom(new_zoom);
        self.zoom = zoom;
        self.offset = Point::new(cursor.x - anchor.x * zoom, cursor.y - anchor.y * zoom);
    }

    /// Frame `bounds` in a `viewport_w` × `viewport_h` viewport.
    ///
    /// The box fills `config.jump_fill` of the viewport, capped at
    /// `config.jump_max_zoom`, and is centred. Point-like boxes are padded
    /// out to a minimum extent first.
    #[must_use]
    pub fn fit_bounds(bounds: Bounds, viewport_w: f64, viewport_h: f64, config: &EngineConfig) -> Self {
        let center = bounds.center();
        let w = bounds.width().max(JUMP_MIN_EXTENT);
        let h = bounds.height().max(JUMP_MIN_EXTENT);
        let fit = ((viewport_w * config.jump_fill) / w).min((viewport_h * config.jump_fill) / h);
        let zoom = if fit.is_finite() && fit > 0.0 {
            config.clamp_zoom(fit.min(config.jump_max_zoom))
        } else {
            1.0
        };
        Self {
            zoom,
            offset: Point::new(viewport_w * 0.5 - center.x * zoom, viewport_h * 0.5 - center.y * zoom),
        }
    }

    /// Fit a whole `width` × `height` page into the viewport without the jump cap.
    #[must_use]
    pub fn fit_page(width: f64, height: f64, viewport_w: f64, viewport_h: f64, config: &EngineConfig) -> Self {
        if width <= 0.0 || height <= 0.0 || viewport_w <= 0.0 || viewport_h <= 0.0 {
            return Self::default();
        }
        let zoom = config.clamp_zoom((viewport_w / width).min(viewport_h / height));
        Self {
            zoom,
            offset: Point::new((viewport_w - width * zoom) * 0.5, (viewport_h - height * zoom) * 0.5),
        }
    }
}
