//! Hit-testing for the select tool.
//!
//! Targets are tried in a fixed priority order and the first hit wins:
//!
//! 1. scale-label corner handles
//! 2. scale-label body
//! 3. vertex handles of the selected path entity
//! 4. equipment symbols, then PV arrays (topmost first)
//! 5. zone polygons
//! 6. cable and containment polylines
//! 7. roof mask polygons
//!
//! Screen-space slop from [`EngineConfig`] is divided by the zoom, so handles
//! keep the same on-screen size at every zoom level.

#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use serde::{Deserialize, Serialize};

use crate::camera::ViewState;
use crate::config::EngineConfig;
use crate::doc::{DocStore, Entity, ObjectId, PvPanelConfig, ScaleInfo};
use crate::geometry::{self, Point};
use crate::pv::PlacedArray;
use crate::scale::LabelRect;

/// Corner of the scale label box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Corner {
    Nw,
    Ne,
    Se,
    Sw,
}

impl Corner {
    pub const ALL: [Self; 4] = [Self::Nw, Self::Ne, Self::Se, Self::Sw];

    /// CSS resize cursor for this corner.
    #[must_use]
    pub fn cursor(self) -> &'static str {
        match self {
            Self::Nw | Self::Se => "nwse-resize",
            Self::Ne | Self::Sw => "nesw-resize",
        }
    }
}

/// What the pointer is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "target", rename_all = "snake_case")]
pub enum HitTarget {
    LabelCorner { corner: Corner },
    LabelBody,
    Vertex { id: ObjectId, index: usize },
    Body { id: ObjectId },
}

/// Everything a hit test reads.
pub struct HitScene<'a> {
    pub doc: &'a DocStore,
    pub view: &'a ViewState,
    pub scale: &'a ScaleInfo,
    pub panel: Option<&'a PvPanelConfig>,
    pub selected: Option<ObjectId>,
    /// The scale label box, when a reference line exists.
    pub label: Option<LabelRect>,
    pub config: &'a EngineConfig,
}

/// Radius of an equipment symbol in world units.
///
/// Sized from its real-world footprint once calibrated; a fixed size before.
#[must_use]
pub fn equipment_radius(scale: &ScaleInfo, config: &EngineConfig) -> f64 {
    scale
        .to_world(config.equipment_size_m)
        .unwrap_or(config.equipment_fallback_px)
        * 0.5
}

/// Find the target under `p` (world space).
#[must_use]
pub fn hit_test(p: Point, scene: &HitScene<'_>) -> Option<HitTarget> {
    let handle_r = scene.view.screen_dist_to_world(scene.config.handle_radius_px);

    if let Some(label) = scene.label {
        if let Some(corner) = Corner::ALL.into_iter().find(|c| label.corner(*c).distance(p) <= handle_r) {
            return Some(HitTarget::LabelCorner { corner });
        }
        if label.contains(p) {
            return Some(HitTarget::LabelBody);
        }
    }

    if let Some(hit) = scene.selected.and_then(|id| hit_vertex(p, id, handle_r, scene.doc)) {
        return Some(hit);
    }

    let doc = scene.doc;
    let body = |id| Some(HitTarget::Body { id });

    let radius = equipment_radius(scene.scale, scene.config);
    if let Some(e) = doc.equipment().iter().rev().find(|e| e.position.distance(p) <= radius) {
        return body(e.id);
    }

    if let Some(panel) = scene.panel {
        let hit = doc.pv_arrays().iter().rev().find(|a| {
            PlacedArray::resolve(a, panel, scene.scale, doc).is_some_and(|placed| placed.contains(p))
        });
        if let Some(a) = hit {
            return body(a.id);
        }
    }

    if let Some(z) = doc.zones().iter().rev().find(|z| geometry::point_in_polygon(p, &z.points)) {
        return body(z.id);
    }

    let slop = scene.view.screen_dist_to_world(scene.config.line_hit_px);
    if let Some(l) = doc.lines().iter().rev().find(|l| geometry::point_to_polyline_distance(p, &l.points) <= slop) {
        return body(l.id);
    }
    if let Some(c) = doc
        .containment()
        .iter()
        .rev()
        .find(|c| geometry::point_to_polyline_distance(p, &c.points) <= slop)
    {
        return body(c.id);
    }

    doc.roof_mask_at(p).and_then(|m| body(m.id))
}

/// Nearest vertex handle of entity `id` within `radius`.
fn hit_vertex(p: Point, id: ObjectId, radius: f64, doc: &DocStore) -> Option<HitTarget> {
    let entity: Entity = doc.get(&id)?;
    let vertices = entity.vertices()?;
    vertices
        .iter()
        .enumerate()
        .map(|(index, v)| (index, v.distance(p)))
        .filter(|(_, d)| *d <= radius)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(index, _)| HitTarget::Vertex { id, index })
}
