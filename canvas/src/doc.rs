//! Document model: plan entities, their derived measurements, and the
//! in-memory mirror of the host-owned entity arrays.
//!
//! The host application owns persistence. It hands the engine a
//! [`Snapshot`] of every entity array, and the engine proposes changes back
//! through [`crate::engine::Action`]s. [`DocStore`] is the engine's mirror of
//! that authoritative state; optimistic drag copies never live here (see
//! [`crate::commit`]).
//!
//! Length and area fields are stored in metres / square metres and are only
//! meaningful once the drawing has a calibrated [`ScaleInfo::ratio`]. Until
//! then every derived value is zero.

#[cfg(test)]
#[path = "doc_test.rs"]
mod doc_test;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::{self, Bounds, Point};

/// Unique identifier for a plan entity.
pub type ObjectId = Uuid;

// =============================================================
// Enumerations
// =============================================================

/// Electrical or PV equipment that can be placed as a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentKind {
    MainBoard,
    SubBoard,
    Inverter,
    Battery,
    Meter,
    Isolator,
    CombinerBox,
    Socket,
    Light,
    Switch,
    DataPoint,
    Generator,
    Transformer,
}

/// Supply voltage class of a cable run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CableKind {
    Mv,
    Lv,
    Dc,
}

/// Cable support system drawn as a polyline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainmentKind {
    Conduit,
    CableTray,
    Trunking,
    WireBasket,
    LadderRack,
    Sleeve,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PanelOrientation {
    #[default]
    Portrait,
    Landscape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Done,
}

// =============================================================
// Scale and panel configuration
// =============================================================

/// Custom size of the scale label box, set once the user resizes it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabelSize {
    pub width: f64,
    pub height: f64,
}

/// Drawing calibration.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScaleInfo {
    /// Metres per world unit. `None` until calibrated.
    pub ratio: Option<f64>,
    /// Top-left corner of the scale label box in world space.
    pub label_position: Option<Point>,
    /// Manual label size; overrides auto-sizing once present.
    #[serde(default)]
    pub label_size: Option<LabelSize>,
}

impl ScaleInfo {
    /// The ratio, if it is usable (finite and strictly positive).
    #[must_use]
    pub fn ratio(&self) -> Option<f64> {
        self.ratio.filter(|r| r.is_finite() && *r > 0.0)
    }

    #[must_use]
    pub fn is_calibrated(&self) -> bool {
        self.ratio().is_some()
    }

    /// World length → metres; zero while uncalibrated.
    #[must_use]
    pub fn to_meters(&self, world_len: f64) -> f64 {
        self.ratio().map_or(0.0, |r| world_len * r)
    }

    /// Squared world units → square metres; zero while uncalibrated.
    #[must_use]
    pub fn to_square_meters(&self, world_area: f64) -> f64 {
        self.ratio().map_or(0.0, |r| world_area * r * r)
    }

    /// Metres → world length; `None` while uncalibrated.
    #[must_use]
    pub fn to_world(&self, meters: f64) -> Option<f64> {
        self.ratio().map(|r| meters / r)
    }
}

/// Physical PV module dimensions in metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PvPanelConfig {
    pub length: f64,
    pub width: f64,
    pub wattage: f64,
}

// =============================================================
// Entities
// =============================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentItem {
    pub id: ObjectId,
    #[serde(rename = "type")]
    pub kind: EquipmentKind,
    pub position: Point,
    /// Clockwise rotation in degrees.
    #[serde(default)]
    pub rotation: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assembly_modifications: Vec<String>,
}

/// A cable run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplyLine {
    pub id: ObjectId,
    #[serde(rename = "type")]
    pub kind: CableKind,
    pub points: Vec<Point>,
    /// Billable cable length in metres.
    #[serde(default)]
    pub length: f64,
    /// Drawn route length in metres.
    #[serde(default)]
    pub path_length: Option<f64>,
    #[serde(default)]
    pub start_height: Option<f64>,
    #[serde(default)]
    pub end_height: Option<f64>,
    #[serde(default)]
    pub cable_type: Option<String>,
    #[serde(default)]
    pub termination_count: Option<u32>,
}

impl SupplyLine {
    /// General-purpose circuit cable, run as live + neutral + earth.
    #[must_use]
    pub fn is_gp(&self) -> bool {
        self.cable_type
            .as_deref()
            .is_some_and(|t| t.trim_start().to_ascii_uppercase().starts_with("GP"))
    }

    /// Recompute `path_length` and `length` from the vertices.
    pub fn recompute(&mut self, scale: &ScaleInfo) {
        let path = scale.to_meters(geometry::polyline_length(&self.points));
        self.path_length = Some(path);
        self.length = cable_length(path, self.start_height, self.end_height, self.is_gp());
    }
}

/// Billable cable length for a route.
///
/// GP cables are triplicated for the three conductors and include the rise at
/// each end; every other cable is billed at its route length.
#[must_use]
pub fn cable_length(path_length: f64, start_height: Option<f64>, end_height: Option<f64>, gp: bool) -> f64 {
    if gp {
        path_length * 3.0 + start_height.unwrap_or(0.0) + end_height.unwrap_or(0.0)
    } else {
        path_length
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplyZone {
    pub id: ObjectId,
    pub name: String,
    pub points: Vec<Point>,
    pub color: String,
    /// Square metres.
    #[serde(default)]
    pub area: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Containment {
    pub id: ObjectId,
    #[serde(rename = "type")]
    pub kind: ContainmentKind,
    pub size: String,
    pub points: Vec<Point>,
    /// Metres.
    #[serde(default)]
    pub length: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoofMask {
    pub id: ObjectId,
    pub points: Vec<Point>,
    /// Slope in degrees, 0 (flat) to 90.
    pub pitch: f64,
    /// Downslope azimuth in degrees (0 = north), once set.
    #[serde(default)]
    pub direction: Option<f64>,
    /// Plan area in square metres.
    #[serde(default)]
    pub area: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PvArrayItem {
    pub id: ObjectId,
    /// Centre of the array in world space.
    pub position: Point,
    pub rows: u32,
    pub columns: u32,
    pub orientation: PanelOrientation,
    /// Clockwise rotation in degrees.
    pub rotation: f64,
}

/// A to-do attached to another entity by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: ObjectId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    pub linked_item_id: ObjectId,
}

/// Any geometric entity the engine can select and edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entity", rename_all = "snake_case")]
pub enum Entity {
    Equipment(EquipmentItem),
    Line(SupplyLine),
    Zone(SupplyZone),
    Containment(Containment),
    RoofMask(RoofMask),
    PvArray(PvArrayItem),
}

impl Entity {
    #[must_use]
    pub fn id(&self) -> ObjectId {
        match self {
            Self::Equipment(e) => e.id,
            Self::Line(l) => l.id,
            Self::Zone(z) => z.id,
            Self::Containment(c) => c.id,
            Self::RoofMask(m) => m.id,
            Self::PvArray(a) => a.id,
        }
    }

    /// Editable vertices, for entities drawn as paths.
    #[must_use]
    pub fn vertices(&self) -> Option<&[Point]> {
        match self {
            Self::Line(l) => Some(&l.points),
            Self::Zone(z) => Some(&z.points),
            Self::Containment(c) => Some(&c.points),
            Self::RoofMask(m) => Some(&m.points),
            Self::Equipment(_) | Self::PvArray(_) => None,
        }
    }

    fn vertices_mut(&mut self) -> Option<&mut Vec<Point>> {
        match self {
            Self::Line(l) => Some(&mut l.points),
            Self::Zone(z) => Some(&mut z.points),
            Self::Containment(c) => Some(&mut c.points),
            Self::RoofMask(m) => Some(&mut m.points),
            Self::Equipment(_) | Self::PvArray(_) => None,
        }
    }

    /// Whether the path is a closed polygon.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Zone(_) | Self::RoofMask(_))
    }

    /// Move the whole entity by a world-space delta.
    pub fn translate(&mut self, dx: f64, dy: f64) {
        match self {
            Self::Equipment(e) => e.position = e.position.offset(dx, dy),
            Self::PvArray(a) => a.position = a.position.offset(dx, dy),
            _ => {
                if let Some(points) = self.vertices_mut() {
                    for p in points.iter_mut() {
                        *p = p.offset(dx, dy);
                    }
                }
            }
        }
    }

    /// Move a single vertex. Returns `false` if the entity has no such vertex.
    pub fn set_vertex(&mut self, index: usize, to: Point) -> bool {
        match self.vertices_mut().and_then(|v| v.get_mut(index)) {
            Some(p) => {
                *p = to;
                true
            }
            None => false,
        }
    }

    /// Refresh every derived length/area field from the geometry.
    pub fn recompute(&mut self, scale: &ScaleInfo) {
        match self {
            Self::Line(l) => l.recompute(scale),
            Self::Zone(z) => z.area = scale.to_square_meters(geometry::polygon_area(&z.points)),
            Self::Containment(c) => c.length = scale.to_meters(geometry::polyline_length(&c.points)),
            Self::RoofMask(m) => m.area = scale.to_square_meters(geometry::polygon_area(&m.points)),
            Self::Equipment(_) | Self::PvArray(_) => {}
        }
    }

    /// Anchor point for point-like entities.
    #[must_use]
    pub fn position(&self) -> Option<Point> {
        match self {
            Self::Equipment(e) => Some(e.position),
            Self::PvArray(a) => Some(a.position),
            _ => None,
        }
    }

    /// World-space bounding box of the entity's defining points.
    ///
    /// Point-like entities yield a zero-size box at their position.
    #[must_use]
    pub fn bounds(&self) -> Option<Bounds> {
        match self.position() {
            Some(p) => Some(Bounds::around(p, 0.0)),
            None => self.vertices().and_then(Bounds::from_points),
        }
    }
}

// =============================================================
// Store
// =============================================================

/// Every entity array the host owns, as handed to the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub equipment: Vec<EquipmentItem>,
    pub lines: Vec<SupplyLine>,
    pub zones: Vec<SupplyZone>,
    pub containment: Vec<Containment>,
    pub roof_masks: Vec<RoofMask>,
    pub pv_arrays: Vec<PvArrayItem>,
    pub tasks: Vec<Task>,
}

/// Engine-side mirror of the authoritative entity arrays.
///
/// Array order is draw order within each kind.
#[derive(Debug, Default)]
pub struct DocStore {
    data: Snapshot,
}

macro_rules! upsert {
    ($vec:expr, $item:expr) => {{
        let item = $item;
        match $vec.iter_mut().find(|x| x.id == item.id) {
            Some(slot) => *slot = item,
            None => $vec.push(item),
        }
    }};
}

macro_rules! take_by_id {
    ($vec:expr, $id:expr) => {
        $vec.iter().position(|x| x.id == *$id).map(|i| $vec.remove(i))
    };
}

impl DocStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all arrays with a full snapshot.
    pub fn load_snapshot(&mut self, snapshot: Snapshot) {
        self.data = snapshot;
    }

    /// Read-only view of every array.
    #[must_use]
    pub fn snapshot(&self) -> &Snapshot {
        &self.data
    }

    #[must_use]
    pub fn equipment(&self) -> &[EquipmentItem] {
        &self.data.equipment
    }

    #[must_use]
    pub fn lines(&self) -> &[SupplyLine] {
        &self.data.lines
    }

    #[must_use]
    pub fn zones(&self) -> &[SupplyZone] {
        &self.data.zones
    }

    #[must_use]
    pub fn containment(&self) -> &[Containment] {
        &self.data.containment
    }

    #[must_use]
    pub fn roof_masks(&self) -> &[RoofMask] {
        &self.data.roof_masks
    }

    #[must_use]
    pub fn pv_arrays(&self) -> &[PvArrayItem] {
        &self.data.pv_arrays
    }

    #[must_use]
    pub fn tasks(&self) -> &[Task] {
        &self.data.tasks
    }

    /// Look up any geometric entity by id.
    #[must_use]
    pub fn get(&self, id: &ObjectId) -> Option<Entity> {
        let d = &self.data;
        d.equipment
            .iter()
            .find(|x| x.id == *id)
            .map(|x| Entity::Equipment(x.clone()))
            .or_else(|| d.lines.iter().find(|x| x.id == *id).map(|x| Entity::Line(x.clone())))
            .or_else(|| d.zones.iter().find(|x| x.id == *id).map(|x| Entity::Zone(x.clone())))
            .or_else(|| d.containment.iter().find(|x| x.id == *id).map(|x| Entity::Containment(x.clone())))
            .or_else(|| d.roof_masks.iter().find(|x| x.id == *id).map(|x| Entity::RoofMask(x.clone())))
            .or_else(|| d.pv_arrays.iter().find(|x| x.id == *id).map(|x| Entity::PvArray(x.clone())))
    }

    /// Every geometric entity in paint order: roof masks, zones, containment,
    /// cables, PV arrays, equipment.
    #[must_use]
    pub fn entities(&self) -> Vec<Entity> {
        let d = &self.data;
        d.roof_masks
            .iter()
            .cloned()
            .map(Entity::RoofMask)
            .chain(d.zones.iter().cloned().map(Entity::Zone))
            .chain(d.containment.iter().cloned().map(Entity::Containment))
            .chain(d.lines.iter().cloned().map(Entity::Line))
            .chain(d.pv_arrays.iter().cloned().map(Entity::PvArray))
            .chain(d.equipment.iter().cloned().map(Entity::Equipment))
            .collect()
    }

    /// Insert or replace an entity in its array.
    pub fn upsert(&mut self, entity: Entity) {
        let d = &mut self.data;
        match entity {
            Entity::Equipment(x) => upsert!(d.equipment, x),
            Entity::Line(x) => upsert!(d.lines, x),
            Entity::Zone(x) => upsert!(d.zones, x),
            Entity::Containment(x) => upsert!(d.containment, x),
            Entity::RoofMask(x) => upsert!(d.roof_masks, x),
            Entity::PvArray(x) => upsert!(d.pv_arrays, x),
        }
    }

    /// Remove an entity and every task linked to it.
    pub fn remove(&mut self, id: &ObjectId) -> Option<Entity> {
        let d = &mut self.data;
        let removed = take_by_id!(d.equipment, id)
            .map(Entity::Equipment)
            .or_else(|| take_by_id!(d.lines, id).map(Entity::Line))
            .or_else(|| take_by_id!(d.zones, id).map(Entity::Zone))
            .or_else(|| take_by_id!(d.containment, id).map(Entity::Containment))
            .or_else(|| take_by_id!(d.roof_masks, id).map(Entity::RoofMask))
            .or_else(|| take_by_id!(d.pv_arrays, id).map(Entity::PvArray));
        if removed.is_some() {
            d.tasks.retain(|t| t.linked_item_id != *id);
        }
        removed
    }

    /// Insert or replace a task.
    pub fn upsert_task(&mut self, task: Task) {
        upsert!(self.data.tasks, task);
    }

    /// Tasks linked to `id`.
    pub fn tasks_for<'a>(&'a self, id: &'a ObjectId) -> impl Iterator<Item = &'a Task> + 'a {
        self.data.tasks.iter().filter(move |t| t.linked_item_id == *id)
    }

    /// Number of tasks linked to `id` that are not done.
    #[must_use]
    pub fn open_task_count(&self, id: &ObjectId) -> usize {
        self.tasks_for(id).filter(|t| t.status != TaskStatus::Done).count()
    }

    /// The topmost roof mask whose polygon contains `p`.
    #[must_use]
    pub fn roof_mask_at(&self, p: Point) -> Option<&RoofMask> {
        self.data.roof_masks.iter().rev().find(|m| geometry::point_in_polygon(p, &m.points))
    }

    /// Recompute every derived field, e.g. after the scale changes.
    pub fn recompute_all(&mut self, scale: &ScaleInfo) {
        let d = &mut self.data;
        for l in &mut d.lines {
            l.recompute(scale);
        }
        for z in &mut d.zones {
            z.area = scale.to_square_meters(geometry::polygon_area(&z.points));
        }
        for c in &mut d.containment {
            c.length = scale.to_meters(geometry::polyline_length(&c.points));
        }
        for m in &mut d.roof_masks {
            m.area = scale.to_square_meters(geometry::polygon_area(&m.points));
        }
    }

    /// Number of geometric entities (tasks excluded).
    #[must_use]
    pub fn len(&self) -> usize {
        let d = &self.data;
        d.equipment.len() + d.lines.len() + d.zones.len() + d.containment.len() + d.roof_masks.len() + d.pv_arrays.len()
    }

    /// Returns `true` if the store holds no geometric entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
