//! Visual style tables.
//!
//! Each entity type maps to its style through a plain `match`, so a new
//! type is one more arm. The only mutable piece is [`ColorCache`], which
//! belongs to one engine instance.

#[cfg(test)]
#[path = "style_test.rs"]
mod style_test;

use std::collections::HashMap;

use crate::doc::{CableKind, ContainmentKind, EquipmentKind, TaskStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EquipmentStyle {
    pub fill: &'static str,
    /// Short symbol text drawn inside the circle.
    pub glyph: &'static str,
}

#[must_use]
pub fn equipment_style(kind: EquipmentKind) -> EquipmentStyle {
    let (fill, glyph) = match kind {
        EquipmentKind::MainBoard => ("#b91c1c", "MB"),
        EquipmentKind::SubBoard => ("#dc2626", "DB"),
        EquipmentKind::Inverter => ("#7c3aed", "INV"),
        EquipmentKind::Battery => ("#059669", "BAT"),
        EquipmentKind::Meter => ("#0369a1", "M"),
        EquipmentKind::Isolator => ("#ea580c", "ISO"),
        EquipmentKind::CombinerBox => ("#a16207", "CB"),
        EquipmentKind::Socket => ("#2563eb", "S"),
        EquipmentKind::Light => ("#ca8a04", "L"),
        EquipmentKind::Switch => ("#4b5563", "SW"),
        EquipmentKind::DataPoint => ("#0891b2", "D"),
        EquipmentKind::Generator => ("#15803d", "GEN"),
        EquipmentKind::Transformer => ("#9f1239", "TX"),
    };
    EquipmentStyle { fill, glyph }
}

/// Default stroke colour per supply class.
#[must_use]
pub fn cable_color(kind: CableKind) -> &'static str {
    match kind {
        CableKind::Mv => "#dc2626",
        CableKind::Lv => "#2563eb",
        CableKind::Dc => "#f59e0b",
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContainmentStyle {
    pub stroke: &'static str,
    pub width: f64,
    /// Dash pattern in screen pixels; empty for solid.
    pub dash: &'static [f64],
}

#[must_use]
pub fn containment_style(kind: ContainmentKind) -> ContainmentStyle {
    let (stroke, width, dash): (&'static str, f64, &'static [f64]) = match kind {
        ContainmentKind::Conduit => ("#374151", 2.0, &[]),
        ContainmentKind::CableTray => ("#6b7280", 4.0, &[10.0, 4.0]),
        ContainmentKind::Trunking => ("#1f2937", 3.0, &[2.0, 3.0]),
        ContainmentKind::WireBasket => ("#9ca3af", 3.0, &[6.0, 3.0, 2.0, 3.0]),
        ContainmentKind::LadderRack => ("#4b5563", 5.0, &[14.0, 6.0]),
        ContainmentKind::Sleeve => ("#111827", 2.0, &[1.0, 4.0]),
    };
    ContainmentStyle { stroke, width, dash }
}

/// Walkway stroke.
pub const WALKWAY_STROKE: &str = "#16a34a";
pub const ROOF_MASK_FILL: &str = "rgba(234, 88, 12, 0.12)";
pub const ROOF_MASK_STROKE: &str = "#ea580c";
pub const PV_FILL: &str = "rgba(30, 64, 175, 0.55)";
pub const PV_STROKE: &str = "#1e3a8a";
pub const SELECTION_STROKE: &str = "#0ea5e9";
pub const GUIDE_STROKE: &str = "#ec4899";
pub const SCALE_STROKE: &str = "#e11d48";
pub const PREVIEW_STROKE: &str = "#0ea5e9";

/// Badge colour for an entity's most urgent open task.
#[must_use]
pub fn task_badge_color(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Todo => "#ef4444",
        TaskStatus::InProgress => "#f59e0b",
        TaskStatus::Done => "#22c55e",
    }
}

/// Memoised hash colours for free-text cable types.
///
/// Owned by one engine; two engines never share entries.
#[derive(Debug, Default)]
pub struct ColorCache {
    colors: HashMap<String, String>,
}

impl ColorCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stable colour for `key`, computed once per cache.
    pub fn color_for(&mut self, key: &str) -> &str {
        self.colors.entry(key.to_owned()).or_insert_with(|| hash_color(key))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

fn hash_color(key: &str) -> String {
    let hash = key.bytes().fold(0_u32, |h, b| h.wrapping_mul(31).wrapping_add(u32::from(b)));
    format!("hsl({}, 70%, 45%)", hash % 360)
}
