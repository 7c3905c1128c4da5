//! Input model: tools, modifier keys, mouse buttons, and the manipulation
//! state machine.
//!
//! `Tool` and `Modifiers` capture the user's intent at the time of a pointer
//! event. `InputState` is the manipulation gesture tracked between
//! pointer-down and pointer-up on the select tool (or a pan on any tool).
//! Vertex accumulation for the drawing tools lives in [`crate::draw`].

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use serde::{Deserialize, Serialize};

use crate::doc::{CableKind, ContainmentKind, EquipmentKind, ObjectId, PanelOrientation};
use crate::geometry::Point;
use crate::hit::{Corner, HitTarget};
use crate::scale::LabelRect;

/// Which tool is currently active.
///
/// Tools that create typed entities carry the type they create, so the
/// tool → equipment/containment/cable type mapping travels with the tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "tool", content = "kind", rename_all = "snake_case")]
pub enum Tool {
    /// Pointer / selection tool (default).
    #[default]
    Select,
    /// Drag to pan the view.
    Pan,
    /// Two-click reference line for scale calibration.
    Scale,
    /// Draw a cable run.
    Cable(CableKind),
    /// Draw a containment route.
    Containment(ContainmentKind),
    /// Draw a maintenance walkway between PV arrays.
    Walkway,
    /// Draw a supply zone polygon.
    Zone,
    /// Draw a roof mask polygon.
    RoofMask,
    /// Two-click high/low gesture orienting a roof mask.
    RoofDirection,
    /// Place an equipment symbol.
    Equipment(EquipmentKind),
    /// Place a PV array.
    PvArray,
}

impl Tool {
    /// Open-path drawing tools, finished with Enter.
    #[must_use]
    pub fn is_polyline(self) -> bool {
        matches!(self, Self::Cable(_) | Self::Containment(_) | Self::Walkway)
    }

    /// Closed-shape drawing tools, finished by clicking the first vertex or Enter.
    #[must_use]
    pub fn is_polygon(self) -> bool {
        matches!(self, Self::Zone | Self::RoofMask)
    }

    /// Tools that accumulate clicked vertices.
    #[must_use]
    pub fn is_drawing(self) -> bool {
        self == Self::Scale || self.is_polyline() || self.is_polygon()
    }

    /// Tools whose only useful output is a real-world size.
    #[must_use]
    pub fn requires_scale(self) -> bool {
        self.is_polyline() || self == Self::PvArray
    }

    /// Tools that show a ghost under the cursor.
    #[must_use]
    pub fn is_placement(self) -> bool {
        matches!(self, Self::Equipment(_) | Self::PvArray)
    }

    /// Fewest vertices that can be finalized.
    #[must_use]
    pub fn min_points(self) -> usize {
        if self.is_polygon() { 3 } else { 2 }
    }
}

/// Keyboard/mouse modifier keys held during an event.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    /// Shift key is held.
    pub shift: bool,
    /// Ctrl key is held.
    pub ctrl: bool,
    /// Alt / Option key is held.
    pub alt: bool,
    /// Meta / Command key is held.
    pub meta: bool,
}

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Button {
    /// Left mouse button (or single-finger tap).
    Primary,
    /// Middle mouse button (scroll wheel click).
    Middle,
    /// Right mouse button (or two-finger tap).
    Secondary,
}

/// A keyboard key as reported by the browser (e.g. `"Enter"`, `"Escape"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Key(pub String);

/// Wheel / trackpad scroll delta.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WheelDelta {
    /// Horizontal scroll amount in pixels.
    pub dx: f64,
    /// Vertical scroll amount in pixels (positive = down).
    pub dy: f64,
}

/// Shape of the next PV array to place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PvTemplate {
    pub rows: u32,
    pub columns: u32,
    pub orientation: PanelOrientation,
}

impl Default for PvTemplate {
    fn default() -> Self {
        Self { rows: 2, columns: 6, orientation: PanelOrientation::Portrait }
    }
}

/// Persistent UI state visible to the renderer.
#[derive(Debug, Clone, Default)]
pub struct UiState {
    /// Currently active tool.
    pub tool: Tool,
    /// The id of the currently selected entity, if any.
    pub selected_id: Option<ObjectId>,
    /// Handle or body under the pointer while idle on the select tool.
    pub hover: Option<HitTarget>,
    /// Last known pointer position in world space.
    pub cursor_world: Option<Point>,
    /// Rotation dialled in for off-roof equipment and PV placement.
    pub placement_rotation: f64,
    /// Rows/columns/orientation of the next PV array.
    pub pv_template: PvTemplate,
}

/// Internal state for the manipulation state machine.
///
/// Each active variant carries the gesture context needed to compute deltas
/// and emit the final commit on pointer-up. `moved` stays `false` for a plain
/// click so selection without movement never writes history.
#[derive(Debug, Clone, Default)]
pub enum InputState {
    /// No gesture in progress; waiting for the next pointer-down.
    #[default]
    Idle,
    /// Middle-button or pan-tool drag.
    Panning {
        /// Screen-space position of the previous pointer event.
        last_screen: Point,
    },
    /// Moving a whole entity.
    DraggingWhole {
        id: ObjectId,
        /// World-space position of the pointer at the previous event.
        last_world: Point,
        moved: bool,
    },
    /// Moving one vertex of a path entity.
    DraggingVertex { id: ObjectId, index: usize, moved: bool },
    /// Moving the scale label box.
    DraggingScaleLabel { last_world: Point, moved: bool },
    /// Resizing the scale label box from one corner.
    ResizingScaleLabel {
        corner: Corner,
        /// World-space pointer position at the start of the resize.
        start_world: Point,
        /// Label box at the start of the resize.
        orig: LabelRect,
        moved: bool,
    },
}

impl InputState {
    /// Whether a pointer gesture is in progress.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Idle)
    }
}
