//! PV array geometry and placement snapping.
//!
//! An array's footprint is never stored. It is derived from the panel
//! configuration, the drawing ratio, and the pitch of the roof mask under the
//! array centre: panels on a pitched roof are foreshortened along their
//! up-slope axis by `cos(pitch)`.

#[cfg(test)]
#[path = "pv_test.rs"]
mod pv_test;

use serde::{Deserialize, Serialize};

use crate::doc::{DocStore, PanelOrientation, PvArrayItem, PvPanelConfig, RoofMask, ScaleInfo};
use crate::geometry::{self, Point};

/// Rotations closer than this (degrees) count as equal.
const ANGLE_EPSILON: f64 = 1e-6;

/// One panel in world units: (across, up-slope) after orientation and pitch.
#[must_use]
pub fn panel_size(panel: &PvPanelConfig, ratio: f64, orientation: PanelOrientation, pitch_deg: f64) -> (f64, f64) {
    let foreshorten = pitch_deg.to_radians().cos();
    match orientation {
        PanelOrientation::Portrait => (panel.width / ratio, panel.length / ratio * foreshorten),
        PanelOrientation::Landscape => (panel.length / ratio, panel.width / ratio * foreshorten),
    }
}

/// Whole array in world units: panel size times columns × rows.
#[must_use]
pub fn array_size(
    panel: &PvPanelConfig,
    ratio: f64,
    rows: u32,
    columns: u32,
    orientation: PanelOrientation,
    pitch_deg: f64,
) -> (f64, f64) {
    let (w, h) = panel_size(panel, ratio, orientation, pitch_deg);
    (w * f64::from(columns), h * f64::from(rows))
}

/// Rotation for an array placed at a point: perpendicular to the roof's
/// azimuth when it has one, the manual rotation otherwise.
#[must_use]
pub fn auto_rotation(mask: Option<&RoofMask>, manual: f64) -> f64 {
    match mask.and_then(|m| m.direction) {
        Some(direction) => geometry::normalize_deg(direction + 90.0),
        None => manual,
    }
}

/// An array with its footprint resolved, ready for drawing, hit-testing and
/// snapping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlacedArray {
    pub position: Point,
    pub width: f64,
    pub height: f64,
    /// Clockwise degrees.
    pub rotation: f64,
}

impl PlacedArray {
    /// Footprint of `item` under the current scale and roof masks.
    ///
    /// `None` while the drawing is uncalibrated.
    #[must_use]
    pub fn resolve(item: &PvArrayItem, panel: &PvPanelConfig, scale: &ScaleInfo, doc: &DocStore) -> Option<Self> {
        let ratio = scale.ratio()?;
        let pitch = doc.roof_mask_at(item.position).map_or(0.0, |m| m.pitch);
        let (width, height) = array_size(panel, ratio, item.rows, item.columns, item.orientation, pitch);
        Some(Self { position: item.position, width, height, rotation: item.rotation })
    }

    /// Unit vectors of the array's own x and y axes.
    fn axes(&self) -> (Point, Point) {
        let (sin, cos) = self.rotation.to_radians().sin_cos();
        (Point::new(cos, sin), Point::new(-sin, cos))
    }

    /// Corners clockwise from top-left in the array's own frame.
    #[must_use]
    pub fn corners(&self) -> [Point; 4] {
        let hw = self.width * 0.5;
        let hh = self.height * 0.5;
        let c = self.position;
        [(-hw, -hh), (hw, -hh), (hw, hh), (-hw, hh)]
            .map(|(dx, dy)| geometry::rotate_about(Point::new(c.x + dx, c.y + dy), c, self.rotation))
    }

    /// Rotated-rectangle containment.
    #[must_use]
    pub fn contains(&self, p: Point) -> bool {
        let local = geometry::rotate_about(p, self.position, -self.rotation);
        (local.x - self.position.x).abs() <= self.width * 0.5 && (local.y - self.position.y).abs() <= self.height * 0.5
    }

    #[must_use]
    pub fn with_position(self, position: Point) -> Self {
        Self { position, ..self }
    }
}

/// A guide segment drawn while a snap is active.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnapGuide {
    pub from: Point,
    pub to: Point,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapResult {
    /// Snapped array centre.
    pub position: Point,
    pub guides: Vec<SnapGuide>,
}

/// Snap a candidate array against the arrays already placed.
///
/// Two searches run against every existing array. Corner-to-corner keeps the
/// closest candidate/existing corner pair within `threshold` and shifts the
/// candidate by their delta. Adjacent-edge, only for arrays whose rotations
/// agree modulo 90°, proposes the four positions butting the candidate
/// against each side of the existing array with `gap` between them; one
/// wins only if it is strictly closer than the best snap so far, so corner
/// snaps win exact ties. Only corner snaps produce guides.
///
/// Returns `None` when nothing is within `threshold`.
#[must_use]
pub fn snap_array(candidate: &PlacedArray, existing: &[PlacedArray], threshold: f64, gap: f64) -> Option<SnapResult> {
    let mut best: Option<(f64, SnapResult)> = None;
    let cand_corners = candidate.corners();

    for other in existing {
        for oc in other.corners() {
            for cc in cand_corners {
                let d = cc.distance(oc);
                if d < threshold && best.as_ref().is_none_or(|(bd, _)| d < *bd) {
                    let position = candidate.position.offset(oc.x - cc.x, oc.y - cc.y);
                    best = Some((d, SnapResult { position, guides: corner_guides(oc, other, candidate) }));
                }
            }
        }
    }

    for other in existing {
        let Some(swapped) = quarter_turns(candidate.rotation - other.rotation) else {
            continue;
        };
        let (cw, ch) = if swapped { (candidate.height, candidate.width) } else { (candidate.width, candidate.height) };
        let (u, v) = other.axes();
        let along_x = other.width * 0.5 + cw * 0.5 + gap;
        let along_y = other.height * 0.5 + ch * 0.5 + gap;
        let slots = [
            (u, along_x),
            (Point::new(-u.x, -u.y), along_x),
            (v, along_y),
            (Point::new(-v.x, -v.y), along_y),
        ];
        for (axis, dist) in slots {
            let slot = other.position.offset(axis.x * dist, axis.y * dist);
            let d = candidate.position.distance(slot);
            if d < threshold && best.as_ref().is_none_or(|(bd, _)| d < *bd) {
                best = Some((d, SnapResult { position: slot, guides: Vec::new() }));
            }
        }
    }

    best.map(|(_, r)| r)
}

/// Whether two rotations agree modulo 90°. `Some(true)` when they differ by
/// an odd number of quarter turns (width and height trade places).
fn quarter_turns(delta_deg: f64) -> Option<bool> {
    let d = geometry::normalize_deg(delta_deg);
    let turns = (d / 90.0).round();
    if (d - turns * 90.0).abs() > ANGLE_EPSILON {
        return None;
    }
    #[allow(clippy::cast_possible_truncation)]
    let odd = (turns as i64).rem_euclid(2) == 1;
    Some(odd)
}

/// Lines along the existing array's axes through the matched corner.
fn corner_guides(corner: Point, other: &PlacedArray, candidate: &PlacedArray) -> Vec<SnapGuide> {
    let (u, v) = other.axes();
    let lx = other.width.max(candidate.width);
    let ly = other.height.max(candidate.height);
    vec![
        SnapGuide { from: corner.offset(-u.x * lx, -u.y * lx), to: corner.offset(u.x * lx, u.y * lx) },
        SnapGuide { from: corner.offset(-v.x * ly, -v.y * ly), to: corner.offset(v.x * ly, v.y * ly) },
    ]
}

/// Snap a walkway vertex to the nearest point on any array outline within
/// `threshold`.
#[must_use]
pub fn snap_to_outlines(p: Point, arrays: &[PlacedArray], threshold: f64) -> Option<Point> {
    arrays
        .iter()
        .filter_map(|a| geometry::nearest_point_on_outline(p, &a.corners()))
        .map(|q| (q, p.distance(q)))
        .filter(|(_, d)| *d < threshold)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(q, _)| q)
}
