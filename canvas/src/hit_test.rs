use uuid::Uuid;

use super::*;
use crate::doc::{
    CableKind, Containment, ContainmentKind, EquipmentItem, EquipmentKind, PanelOrientation, PvArrayItem, RoofMask,
    SupplyLine, SupplyZone,
};

// =============================================================
// Helpers
// =============================================================

fn pt(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

fn square(x: f64, y: f64, size: f64) -> Vec<Point> {
    vec![pt(x, y), pt(x + size, y), pt(x + size, y + size), pt(x, y + size)]
}

fn equipment_at(x: f64, y: f64) -> EquipmentItem {
    EquipmentItem {
        id: Uuid::new_v4(),
        kind: EquipmentKind::MainBoard,
        position: pt(x, y),
        rotation: 0.0,
        name: None,
        assembly_modifications: Vec::new(),
    }
}

fn line(points: Vec<Point>) -> SupplyLine {
    SupplyLine {
        id: Uuid::new_v4(),
        kind: CableKind::Lv,
        points,
        length: 0.0,
        path_length: None,
        start_height: None,
        end_height: None,
        cable_type: None,
        termination_count: None,
    }
}

fn zone(points: Vec<Point>) -> SupplyZone {
    SupplyZone { id: Uuid::new_v4(), name: "Z".into(), points, color: "#f00".into(), area: 0.0 }
}

fn roof(points: Vec<Point>) -> RoofMask {
    RoofMask { id: Uuid::new_v4(), points, pitch: 0.0, direction: None, area: 0.0 }
}

struct Fixture {
    doc: DocStore,
    view: ViewState,
    scale: ScaleInfo,
    panel: Option<PvPanelConfig>,
    selected: Option<ObjectId>,
    label: Option<LabelRect>,
    config: EngineConfig,
}

impl Fixture {
    fn new() -> Self {
        Self {
            doc: DocStore::new(),
            view: ViewState::default(),
            scale: ScaleInfo::default(),
            panel: None,
            selected: None,
            label: None,
            config: EngineConfig::default(),
        }
    }

    fn hit(&self, p: Point) -> Option<HitTarget> {
        let scene = HitScene {
            doc: &self.doc,
            view: &self.view,
            scale: &self.scale,
            panel: self.panel.as_ref(),
            selected: self.selected,
            label: self.label,
            config: &self.config,
        };
        hit_test(p, &scene)
    }
}

// =============================================================
// Empty / misses
// =============================================================

#[test]
fn empty_doc_hits_nothing() {
    assert_eq!(Fixture::new().hit(pt(0.0, 0.0)), None);
}

// =============================================================
// Scale label
// =============================================================

#[test]
fn label_corner_beats_body() {
    let mut f = Fixture::new();
    f.label = Some(LabelRect { x: 0.0, y: 0.0, width: 80.0, height: 40.0 });
    assert_eq!(f.hit(pt(79.0, 39.0)), Some(HitTarget::LabelCorner { corner: Corner::Se }));
    assert_eq!(f.hit(pt(1.0, 1.0)), Some(HitTarget::LabelCorner { corner: Corner::Nw }));
    assert_eq!(f.hit(pt(40.0, 20.0)), Some(HitTarget::LabelBody));
}

#[test]
fn label_beats_entities_underneath() {
    let mut f = Fixture::new();
    f.doc.upsert(Entity::Zone(zone(square(0.0, 0.0, 200.0))));
    f.label = Some(LabelRect { x: 50.0, y: 50.0, width: 80.0, height: 40.0 });
    assert_eq!(f.hit(pt(90.0, 70.0)), Some(HitTarget::LabelBody));
}

#[test]
fn label_corner_radius_scales_with_zoom() {
    let mut f = Fixture::new();
    f.label = Some(LabelRect { x: 0.0, y: 0.0, width: 80.0, height: 40.0 });
    // 10 world units outside the corner: beyond 7 px at zoom 1, within at zoom 0.5.
    assert_eq!(f.hit(pt(90.0, 40.0)), None);
    f.view.zoom = 0.5;
    assert_eq!(f.hit(pt(90.0, 40.0)), Some(HitTarget::LabelCorner { corner: Corner::Se }));
}

// =============================================================
// Vertex handles
// =============================================================

#[test]
fn vertex_of_selected_beats_body() {
    let mut f = Fixture::new();
    let z = zone(square(0.0, 0.0, 100.0));
    let id = z.id;
    f.doc.upsert(Entity::Zone(z));
    f.selected = Some(id);
    assert_eq!(f.hit(pt(98.0, 99.0)), Some(HitTarget::Vertex { id, index: 2 }));
    assert_eq!(f.hit(pt(50.0, 50.0)), Some(HitTarget::Body { id }));
}

#[test]
fn vertices_ignored_when_not_selected() {
    let mut f = Fixture::new();
    let z = zone(square(0.0, 0.0, 100.0));
    let id = z.id;
    f.doc.upsert(Entity::Zone(z));
    assert_eq!(f.hit(pt(99.0, 99.0)), Some(HitTarget::Body { id }));
    // Just outside the corner is a miss without the handle.
    assert_eq!(f.hit(pt(103.0, 103.0)), None);
}

#[test]
fn nearest_vertex_wins() {
    let mut f = Fixture::new();
    let l = line(vec![pt(0.0, 0.0), pt(6.0, 0.0), pt(100.0, 0.0)]);
    let id = l.id;
    f.doc.upsert(Entity::Line(l));
    f.selected = Some(id);
    assert_eq!(f.hit(pt(4.0, 0.0)), Some(HitTarget::Vertex { id, index: 1 }));
}

// =============================================================
// Bodies
// =============================================================

#[test]
fn equipment_uses_fallback_radius_uncalibrated() {
    let mut f = Fixture::new();
    let e = equipment_at(50.0, 50.0);
    let id = e.id;
    f.doc.upsert(Entity::Equipment(e));
    assert_eq!(f.hit(pt(55.0, 50.0)), Some(HitTarget::Body { id }));
    assert_eq!(f.hit(pt(57.0, 50.0)), None);
}

#[test]
fn equipment_radius_from_real_size() {
    let mut f = Fixture::new();
    f.scale.ratio = Some(0.01);
    let e = equipment_at(0.0, 0.0);
    let id = e.id;
    f.doc.upsert(Entity::Equipment(e));
    // 0.6 m at 0.01 m/unit is 60 units across.
    assert_eq!(f.hit(pt(29.0, 0.0)), Some(HitTarget::Body { id }));
    assert_eq!(f.hit(pt(31.0, 0.0)), None);
}

#[test]
fn equipment_beats_zone() {
    let mut f = Fixture::new();
    f.doc.upsert(Entity::Zone(zone(square(0.0, 0.0, 100.0))));
    let e = equipment_at(50.0, 50.0);
    let id = e.id;
    f.doc.upsert(Entity::Equipment(e));
    assert_eq!(f.hit(pt(50.0, 50.0)), Some(HitTarget::Body { id }));
}

#[test]
fn pv_array_hit_needs_panel_and_scale() {
    let mut f = Fixture::new();
    let a = PvArrayItem {
        id: Uuid::new_v4(),
        position: pt(0.0, 0.0),
        rows: 1,
        columns: 2,
        orientation: PanelOrientation::Portrait,
        rotation: 0.0,
    };
    let id = a.id;
    f.doc.upsert(Entity::PvArray(a));
    assert_eq!(f.hit(pt(90.0, 0.0)), None);

    f.scale.ratio = Some(0.01);
    f.panel = Some(PvPanelConfig { length: 2.0, width: 1.0, wattage: 400.0 });
    // Two portrait panels: 200 wide, 200 tall.
    assert_eq!(f.hit(pt(90.0, 90.0)), Some(HitTarget::Body { id }));
    assert_eq!(f.hit(pt(110.0, 0.0)), None);
}

#[test]
fn zone_beats_line_and_roof() {
    let mut f = Fixture::new();
    f.doc.upsert(Entity::RoofMask(roof(square(0.0, 0.0, 100.0))));
    f.doc.upsert(Entity::Line(line(vec![pt(0.0, 50.0), pt(100.0, 50.0)])));
    let z = zone(square(0.0, 0.0, 100.0));
    let id = z.id;
    f.doc.upsert(Entity::Zone(z));
    assert_eq!(f.hit(pt(50.0, 50.0)), Some(HitTarget::Body { id }));
}

#[test]
fn line_slop_is_screen_space() {
    let mut f = Fixture::new();
    let l = line(vec![pt(0.0, 0.0), pt(100.0, 0.0)]);
    let id = l.id;
    f.doc.upsert(Entity::Line(l));
    assert_eq!(f.hit(pt(50.0, 7.0)), Some(HitTarget::Body { id }));
    f.view.zoom = 2.0;
    assert_eq!(f.hit(pt(50.0, 7.0)), None);
}

#[test]
fn containment_is_hit_by_proximity() {
    let mut f = Fixture::new();
    let c = Containment {
        id: Uuid::new_v4(),
        kind: ContainmentKind::CableTray,
        size: "100mm".into(),
        points: vec![pt(0.0, 0.0), pt(0.0, 100.0)],
        length: 0.0,
    };
    let id = c.id;
    f.doc.upsert(Entity::Containment(c));
    assert_eq!(f.hit(pt(3.0, 50.0)), Some(HitTarget::Body { id }));
}

#[test]
fn roof_mask_is_last_resort() {
    let mut f = Fixture::new();
    let r = roof(square(0.0, 0.0, 100.0));
    let id = r.id;
    f.doc.upsert(Entity::RoofMask(r));
    assert_eq!(f.hit(pt(50.0, 50.0)), Some(HitTarget::Body { id }));
}

#[test]
fn topmost_equipment_wins() {
    let mut f = Fixture::new();
    f.doc.upsert(Entity::Equipment(equipment_at(0.0, 0.0)));
    let top = equipment_at(2.0, 0.0);
    let id = top.id;
    f.doc.upsert(Entity::Equipment(top));
    assert_eq!(f.hit(pt(1.0, 0.0)), Some(HitTarget::Body { id }));
}

// =============================================================
// Corner
// =============================================================

#[test]
fn corner_cursors() {
    assert_eq!(Corner::Nw.cursor(), "nwse-resize");
    assert_eq!(Corner::Se.cursor(), "nwse-resize");
    assert_eq!(Corner::Ne.cursor(), "nesw-resize");
    assert_eq!(Corner::Sw.cursor(), "nesw-resize");
}
