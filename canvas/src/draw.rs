//! Drawing state machine: vertex accumulation for the path tools and the
//! two-click roof-direction gesture.
//!
//! ```text
//! Idle ──click──▶ Accumulating([p0]) ──click──▶ Accumulating([p0, p1, ...])
//!                      │   ▲                          │
//!                      │   └──── pointer move ────────┤ (preview point)
//!                      ▼                              ▼
//!                  Escape / tool switch          close-click / Enter / 2nd scale click
//!                      │                              │
//!                      ▼                              ▼
//!                    Idle                    Idle + finished points
//! ```
//!
//! Nothing here knows about entities or actions; [`crate::engine`] turns the
//! finished point lists into completion callbacks.

#[cfg(test)]
#[path = "draw_test.rs"]
mod draw_test;

use crate::doc::{ObjectId, ScaleInfo};
use crate::error::GestureError;
use crate::geometry::{self, Point};
use crate::input::Tool;

/// A finished shape handed back to the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Finished {
    pub tool: Tool,
    pub points: Vec<Point>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum DrawState {
    #[default]
    Idle,
    Accumulating {
        tool: Tool,
        points: Vec<Point>,
        /// Live pointer position, drawn as a dashed trailing segment.
        preview: Option<Point>,
    },
}

/// Reject tools that need a calibrated drawing.
///
/// # Errors
///
/// [`GestureError::ScaleNotCalibrated`] when `tool` produces a real-world
/// size and `scale` has no usable ratio.
pub fn guard(tool: Tool, scale: &ScaleInfo) -> Result<(), GestureError> {
    if tool.requires_scale() && !scale.is_calibrated() {
        return Err(GestureError::ScaleNotCalibrated { tool });
    }
    Ok(())
}

impl DrawState {
    /// Whether a shape is in progress.
    #[must_use]
    pub fn is_accumulating(&self) -> bool {
        matches!(self, Self::Accumulating { .. })
    }

    /// Vertices accumulated so far.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        match self {
            Self::Idle => &[],
            Self::Accumulating { points, .. } => points,
        }
    }

    #[must_use]
    pub fn preview(&self) -> Option<Point> {
        match self {
            Self::Idle => None,
            Self::Accumulating { preview, .. } => *preview,
        }
    }

    #[must_use]
    pub fn tool(&self) -> Option<Tool> {
        match self {
            Self::Idle => None,
            Self::Accumulating { tool, .. } => Some(*tool),
        }
    }

    /// Handle a click with a drawing tool.
    ///
    /// `close_radius` is the world-space distance from the first vertex that
    /// closes a polygon. Returns the finished shape when the click completes
    /// one: a polygon closed on its first vertex, or the second point of a
    /// scale line. Clicking with a different tool than the one in progress
    /// restarts the shape.
    pub fn click(&mut self, tool: Tool, p: Point, close_radius: f64) -> Option<Finished> {
        match self {
            Self::Accumulating { tool: active, points, preview } if *active == tool => {
                let closes = tool.is_polygon()
                    && points.len() >= tool.min_points()
                    && points.first().is_some_and(|first| first.distance(p) <= close_radius);
                if closes {
                    return self.take();
                }
                points.push(p);
                *preview = Some(p);
                if tool == Tool::Scale && points.len() == 2 {
                    return self.take();
                }
                None
            }
            _ => {
                *self = Self::Accumulating { tool, points: vec![p], preview: Some(p) };
                None
            }
        }
    }

    /// Track the pointer for the dashed preview segment.
    pub fn set_preview(&mut self, p: Point) {
        if let Self::Accumulating { preview, .. } = self {
            *preview = Some(p);
        }
    }

    /// Enter: finish the shape if it has enough vertices; otherwise no-op.
    pub fn finish(&mut self) -> Option<Finished> {
        let ready = matches!(
            self,
            Self::Accumulating { tool, points, .. } if points.len() >= tool.min_points() && *tool != Tool::Scale
        );
        if ready { self.take() } else { None }
    }

    /// Escape / tool switch: drop the shape. Returns whether anything was discarded.
    pub fn cancel(&mut self) -> bool {
        let was = self.is_accumulating();
        *self = Self::Idle;
        was
    }

    fn take(&mut self) -> Option<Finished> {
        match std::mem::take(self) {
            Self::Accumulating { tool, points, .. } => Some(Finished { tool, points }),
            Self::Idle => None,
        }
    }

    /// World length of the committed segments plus the preview segment.
    #[must_use]
    pub fn live_length(&self) -> f64 {
        let pts = self.points();
        let tail = match (pts.last(), self.preview()) {
            (Some(last), Some(p)) => last.distance(p),
            _ => 0.0,
        };
        geometry::polyline_length(pts) + tail
    }
}

// =============================================================
// Roof direction
// =============================================================

/// Roof mask awaiting a direction. `id` is `None` for a mask that was just
/// drawn and has not been persisted by the host yet.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingMask {
    pub id: Option<ObjectId>,
    pub points: Vec<Point>,
}

/// Result of a completed direction gesture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionSet {
    pub mask: Option<ObjectId>,
    pub high: Point,
    pub low: Point,
    /// Downslope azimuth in degrees, 0 = north.
    pub direction: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum DirectionState {
    #[default]
    Inactive,
    AwaitingHigh { mask: PendingMask },
    AwaitingLow { mask: PendingMask, high: Point },
}

impl DirectionState {
    #[must_use]
    pub fn begin(mask: PendingMask) -> Self {
        Self::AwaitingHigh { mask }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Inactive)
    }

    /// The mask being oriented.
    #[must_use]
    pub fn mask(&self) -> Option<&PendingMask> {
        match self {
            Self::Inactive => None,
            Self::AwaitingHigh { mask } | Self::AwaitingLow { mask, .. } => Some(mask),
        }
    }

    /// The recorded high point, between the two clicks.
    #[must_use]
    pub fn high(&self) -> Option<Point> {
        match self {
            Self::AwaitingLow { high, .. } => Some(*high),
            _ => None,
        }
    }

    /// Record a click. Clicks outside the mask leave the state unchanged.
    ///
    /// # Errors
    ///
    /// [`GestureError::NoPendingRoofMask`] when inactive,
    /// [`GestureError::OutsideRoofMask`] when `p` is not inside the mask.
    pub fn click(&mut self, p: Point) -> Result<Option<DirectionSet>, GestureError> {
        let Some(mask) = self.mask() else {
            return Err(GestureError::NoPendingRoofMask);
        };
        if !geometry::point_in_polygon(p, &mask.points) {
            return Err(GestureError::OutsideRoofMask);
        }
        match std::mem::take(self) {
            Self::AwaitingHigh { mask } => {
                *self = Self::AwaitingLow { mask, high: p };
                Ok(None)
            }
            Self::AwaitingLow { mask, high } => Ok(Some(DirectionSet {
                mask: mask.id,
                high,
                low: p,
                direction: geometry::bearing_deg(high, p),
            })),
            Self::Inactive => Err(GestureError::NoPendingRoofMask),
        }
    }

    /// Drop the gesture. Returns whether one was active.
    pub fn cancel(&mut self) -> bool {
        let was = self.is_active();
        *self = Self::Inactive;
        was
    }
}
