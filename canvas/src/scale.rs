//! Scale calibration: the reference line and its movable, resizable label.
//!
//! The label box is auto-sized from the measured width of its two text lines
//! until the user resizes it; after that the stored [`LabelSize`] wins for
//! good. Label geometry is in world units so it pans and zooms with the plan.

#[cfg(test)]
#[path = "scale_test.rs"]
mod scale_test;

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::consts::{LABEL_FONT_PX, LABEL_PADDING};
use crate::doc::{LabelSize, ScaleInfo};
use crate::geometry::Point;
use crate::hit::Corner;

/// Distance from the reference line midpoint to a default-placed label.
const LABEL_DEFAULT_OFFSET: f64 = 12.0;

/// Line height as a multiple of the font size.
const LINE_HEIGHT: f64 = 1.4;

/// Placeholder shown while a value cannot be computed.
pub const NO_VALUE: &str = "—";

/// The user-drawn calibration line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferenceLine {
    pub start: Point,
    pub end: Point,
}

impl ReferenceLine {
    /// Length in world units.
    #[must_use]
    pub fn pixel_length(&self) -> f64 {
        self.start.distance(self.end)
    }
}

/// Metres per world unit from a measured line and its known real length.
///
/// `None` when either length is not strictly positive.
#[must_use]
pub fn ratio_from_reference(pixel_length: f64, real_length_m: f64) -> Option<f64> {
    if pixel_length > 0.0 && real_length_m > 0.0 && pixel_length.is_finite() && real_length_m.is_finite() {
        Some(real_length_m / pixel_length)
    } else {
        None
    }
}

/// Text width measurement, supplied by the canvas context in the browser.
pub trait TextMeasure {
    /// Rendered width of `text` at `font_px`.
    fn text_width(&self, text: &str, font_px: f64) -> f64;
}

/// Headless measure: every character advances a fixed fraction of the font size.
#[derive(Debug, Clone, Copy)]
pub struct FixedAdvance(pub f64);

impl Default for FixedAdvance {
    fn default() -> Self {
        Self(0.6)
    }
}

impl TextMeasure for FixedAdvance {
    #[allow(clippy::cast_precision_loss)]
    fn text_width(&self, text: &str, font_px: f64) -> f64 {
        text.chars().count() as f64 * font_px * self.0
    }
}

/// Label box: top-left corner plus size, in world units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabelRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl LabelRect {
    #[must_use]
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    #[must_use]
    pub fn size(&self) -> LabelSize {
        LabelSize { width: self.width, height: self.height }
    }

    #[must_use]
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.x + self.width && p.y >= self.y && p.y <= self.y + self.height
    }

    #[must_use]
    pub fn corner(&self, corner: Corner) -> Point {
        match corner {
            Corner::Nw => Point::new(self.x, self.y),
            Corner::Ne => Point::new(self.x + self.width, self.y),
            Corner::Se => Point::new(self.x + self.width, self.y + self.height),
            Corner::Sw => Point::new(self.x, self.y + self.height),
        }
    }

    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width * 0.5, self.y + self.height * 0.5)
    }
}

/// The two label lines: real length and ratio.
#[must_use]
pub fn label_lines(scale: &ScaleInfo, line: &ReferenceLine) -> [String; 2] {
    match scale.ratio() {
        Some(r) => [format_meters(line.pixel_length() * r), format!("1 px = {r:.4} m")],
        None => [NO_VALUE.to_owned(), NO_VALUE.to_owned()],
    }
}

/// Format a length in metres for display; zero/invalid shows the placeholder.
#[must_use]
pub fn format_meters(m: f64) -> String {
    if m.is_finite() && m > 0.0 {
        format!("{m:.2} m")
    } else {
        NO_VALUE.to_owned()
    }
}

/// Format an area in square metres for display.
#[must_use]
pub fn format_square_meters(m2: f64) -> String {
    if m2.is_finite() && m2 > 0.0 {
        format!("{m2:.2} m²")
    } else {
        NO_VALUE.to_owned()
    }
}

/// Size that fits both label lines, floored at the configured minimum.
#[must_use]
pub fn auto_size(lines: &[String; 2], measure: &dyn TextMeasure, config: &EngineConfig) -> LabelSize {
    let text_w = lines
        .iter()
        .map(|l| measure.text_width(l, LABEL_FONT_PX))
        .fold(0.0_f64, f64::max);
    LabelSize {
        width: (text_w + LABEL_PADDING * 2.0).max(config.label_min_width),
        height: (LABEL_FONT_PX * LINE_HEIGHT * 2.0 + LABEL_PADDING * 2.0).max(config.label_min_height),
    }
}

/// Resolve the label box: stored position (or beside the line midpoint) and
/// stored size (or `auto`).
#[must_use]
pub fn label_rect(scale: &ScaleInfo, line: &ReferenceLine, auto: LabelSize) -> LabelRect {
    let pos = scale
        .label_position
        .unwrap_or_else(|| line.start.midpoint(line.end).offset(LABEL_DEFAULT_OFFSET, LABEL_DEFAULT_OFFSET));
    let size = scale.label_size.unwrap_or(auto);
    LabelRect { x: pos.x, y: pos.y, width: size.width, height: size.height }
}

/// Resize `orig` by dragging `corner` by (`dx`, `dy`).
///
/// The opposite corner stays fixed. Width and height never drop below the
/// floor; the dragged edges stop where the floor is reached.
#[must_use]
pub fn resize(orig: LabelRect, corner: Corner, dx: f64, dy: f64, min_w: f64, min_h: f64) -> LabelRect {
    let (sx, sy) = match corner {
        Corner::Se => (1.0, 1.0),
        Corner::Sw => (-1.0, 1.0),
        Corner::Ne => (1.0, -1.0),
        Corner::Nw => (-1.0, -1.0),
    };
    let width = (orig.width + sx * dx).max(min_w);
    let height = (orig.height + sy * dy).max(min_h);
    let x = if sx < 0.0 { orig.x + orig.width - width } else { orig.x };
    let y = if sy < 0.0 { orig.y + orig.height - height } else { orig.y };
    LabelRect { x, y, width, height }
}
