#![allow(clippy::float_cmp)]

use uuid::Uuid;

use super::*;
use crate::doc::{EquipmentKind, PanelOrientation, RoofMask, SupplyZone};
use crate::hit::Corner;

// =============================================================
// Helpers
// =============================================================

const EPSILON: f64 = 1e-9;

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

fn pt(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

fn no_modifiers() -> Modifiers {
    Modifiers::default()
}

fn shift() -> Modifiers {
    Modifiers { shift: true, ..Modifiers::default() }
}

fn key(k: &str) -> Key {
    Key(k.to_owned())
}

fn square(x: f64, y: f64, size: f64) -> Vec<Point> {
    vec![pt(x, y), pt(x + size, y), pt(x + size, y + size), pt(x, y + size)]
}

fn make_zone(points: Vec<Point>) -> SupplyZone {
    SupplyZone { id: Uuid::new_v4(), name: "Zone A".into(), points, color: "#3b82f6".into(), area: 0.0 }
}

fn make_mask(points: Vec<Point>, direction: Option<f64>) -> RoofMask {
    RoofMask { id: Uuid::new_v4(), points, pitch: 0.0, direction, area: 0.0 }
}

fn make_array(x: f64, y: f64) -> PvArrayItem {
    PvArrayItem {
        id: Uuid::new_v4(),
        position: pt(x, y),
        rows: 1,
        columns: 1,
        orientation: PanelOrientation::Portrait,
        rotation: 0.0,
    }
}

fn panel() -> PvPanelConfig {
    PvPanelConfig { length: 1.7, width: 1.0, wattage: 400.0 }
}

/// 1 px = 1 cm, so a 1x1 portrait panel is 100 x 170 px.
fn calibrated() -> ScaleInfo {
    ScaleInfo { ratio: Some(0.01), ..ScaleInfo::default() }
}

fn core_with_zone() -> (EngineCore, ObjectId) {
    let mut core = EngineCore::new();
    core.set_scale_info(calibrated());
    let zone = make_zone(square(0.0, 0.0, 100.0));
    let id = zone.id;
    core.load_snapshot(Snapshot { zones: vec![zone], ..Snapshot::default() });
    (core, id)
}

fn core_with_pv() -> EngineCore {
    let mut core = EngineCore::new();
    core.set_scale_info(calibrated());
    core.set_panel_config(Some(panel()));
    core.set_pv_template(PvTemplate { rows: 1, columns: 1, orientation: PanelOrientation::Portrait });
    core.load_snapshot(Snapshot { pv_arrays: vec![make_array(0.0, 0.0)], ..Snapshot::default() });
    core
}

fn click(core: &mut EngineCore, p: Point, now: f64) -> Vec<Action> {
    let mut actions = core.on_pointer_down(p, Button::Primary, no_modifiers(), now);
    actions.extend(core.on_pointer_up(p, Button::Primary, no_modifiers(), now));
    actions
}

fn entity_changes(actions: &[Action]) -> Vec<(Entity, bool)> {
    actions
        .iter()
        .filter_map(|a| match a {
            Action::EntityChanged { entity, commit } => Some((entity.clone(), *commit)),
            _ => None,
        })
        .collect()
}

fn warnings(actions: &[Action]) -> Vec<GestureError> {
    actions
        .iter()
        .filter_map(|a| match a {
            Action::Warning(e) => Some(e.clone()),
            _ => None,
        })
        .collect()
}

fn zone_points(entity: &Entity) -> Vec<Point> {
    match entity {
        Entity::Zone(z) => z.points.clone(),
        other => panic!("expected zone, got {other:?}"),
    }
}

// =============================================================
// Defaults
// =============================================================

#[test]
fn core_defaults() {
    let core = EngineCore::new();
    assert_eq!(core.ui.tool, Tool::Select);
    assert!(core.selection().is_none());
    assert_eq!(core.view(), ViewState::default());
    assert!(core.doc.is_empty());
    assert!(core.overlay().is_none());
    assert!(core.label_rect().is_none());
}

// =============================================================
// Data inputs
// =============================================================

#[test]
fn load_snapshot_drops_stale_selection() {
    let (mut core, id) = core_with_zone();
    click(&mut core, pt(50.0, 50.0), 0.0);
    assert_eq!(core.selection(), Some(id));
    core.load_snapshot(Snapshot::default());
    assert!(core.selection().is_none());
}

#[test]
fn apply_delete_clears_selection() {
    let (mut core, id) = core_with_zone();
    click(&mut core, pt(50.0, 50.0), 0.0);
    core.apply_delete(&id);
    assert!(core.selection().is_none());
    assert!(core.object(&id).is_none());
}

#[test]
fn scale_change_recomputes_areas() {
    let (mut core, id) = core_with_zone();
    let Some(Entity::Zone(z)) = core.object(&id) else { panic!("zone missing") };
    assert!(approx(z.area, 1.0));
    core.set_scale_info(ScaleInfo { ratio: Some(0.02), ..ScaleInfo::default() });
    let Some(Entity::Zone(z)) = core.object(&id) else { panic!("zone missing") };
    assert!(approx(z.area, 4.0));
}

// =============================================================
// Viewport
// =============================================================

#[test]
fn load_document_fits_page() {
    let mut core = EngineCore::new();
    core.set_viewport(800.0, 600.0, 2.0);
    let actions = core.load_document(1600.0, 1200.0);
    assert!(approx(core.view.zoom, 0.5));
    assert_eq!(core.page, Some((1600.0, 1200.0)));
    assert!(actions.contains(&Action::ViewChanged { view: core.view }));
}

#[test]
fn wheel_zoom_keeps_cursor_anchored() {
    let mut core = EngineCore::new();
    let cursor = pt(200.0, 100.0);
    let before = core.view.screen_to_world(cursor);
    let actions = core.on_wheel(cursor, WheelDelta { dx: 0.0, dy: -100.0 }, no_modifiers());
    assert!(core.view.zoom > 1.0);
    let after = core.view.screen_to_world(cursor);
    assert!(approx(before.x, after.x) && approx(before.y, after.y));
    assert!(actions.contains(&Action::RenderNeeded));
}

#[test]
fn wheel_at_zoom_limit_is_silent() {
    let mut core = EngineCore::new();
    core.view.zoom = core.config.max_zoom;
    let actions = core.on_wheel(pt(0.0, 0.0), WheelDelta { dx: 0.0, dy: -100.0 }, no_modifiers());
    assert!(actions.is_empty());
}

#[test]
fn middle_drag_pans() {
    let mut core = EngineCore::new();
    core.on_pointer_down(pt(10.0, 10.0), Button::Middle, no_modifiers(), 0.0);
    let actions = core.on_pointer_move(pt(30.0, 25.0), no_modifiers(), 1.0);
    assert_eq!(core.view.offset, pt(20.0, 15.0));
    assert!(matches!(actions[0], Action::ViewChanged { .. }));
    core.on_pointer_up(pt(30.0, 25.0), Button::Middle, no_modifiers(), 2.0);
    assert!(matches!(core.input, InputState::Idle));
}

#[test]
fn jump_to_frames_entity() {
    let (mut core, id) = core_with_zone();
    core.set_viewport(800.0, 600.0, 1.0);
    let actions = core.jump_to(&id);
    assert!(matches!(actions[0], Action::ViewChanged { .. }));
    let centre = core.view.world_to_screen(pt(50.0, 50.0));
    assert!(approx(centre.x, 400.0) && approx(centre.y, 300.0));
}

#[test]
fn jump_to_unknown_is_noop() {
    let mut core = EngineCore::new();
    assert!(core.jump_to(&Uuid::new_v4()).is_empty());
}

// =============================================================
// Drag commits
// =============================================================

#[test]
fn drag_within_window_commits_once_on_release() {
    let (mut core, id) = core_with_zone();
    let down = core.on_pointer_down(pt(50.0, 50.0), Button::Primary, no_modifiers(), 0.0);
    assert!(down.contains(&Action::SelectionChanged { id: Some(id) }));

    let mut moves = Vec::new();
    for i in 1..=5 {
        let x = 50.0 + f64::from(i);
        moves.extend(core.on_pointer_move(pt(x, 50.0), no_modifiers(), f64::from(i)));
    }
    assert!(entity_changes(&moves).is_empty());
    let local = core.overlay().cloned();
    assert_eq!(zone_points(local.as_ref().unwrap())[0], pt(5.0, 0.0));
    assert_eq!(zone_points(&core.doc.get(&id).unwrap())[0], pt(0.0, 0.0));

    let up = core.on_pointer_up(pt(55.0, 50.0), Button::Primary, no_modifiers(), 6.0);
    let changes = entity_changes(&up);
    assert_eq!(changes.len(), 1);
    let (committed, commit) = &changes[0];
    assert!(*commit);
    assert_eq!(Some(committed), local.as_ref());
    assert_eq!(core.doc.get(&id).as_ref(), Some(committed));
    assert_eq!(core.object(&id).as_ref(), Some(committed));
    assert!(core.overlay().is_none());
}

#[test]
fn drag_past_window_emits_intermediate() {
    let (mut core, _) = core_with_zone();
    core.on_pointer_down(pt(50.0, 50.0), Button::Primary, no_modifiers(), 0.0);
    assert!(entity_changes(&core.on_pointer_move(pt(51.0, 50.0), no_modifiers(), 0.0)).is_empty());
    let later = core.on_pointer_move(pt(52.0, 50.0), no_modifiers(), 20.0);
    let changes = entity_changes(&later);
    assert_eq!(changes.len(), 1);
    assert!(!changes[0].1);
    assert_eq!(zone_points(&changes[0].0)[0], pt(2.0, 0.0));
}

#[test]
fn tick_emits_closed_window() {
    let (mut core, _) = core_with_zone();
    core.on_pointer_down(pt(50.0, 50.0), Button::Primary, no_modifiers(), 0.0);
    core.on_pointer_move(pt(60.0, 50.0), no_modifiers(), 0.0);
    assert!(core.tick(5.0).is_empty());
    let changes = entity_changes(&core.tick(16.0));
    assert_eq!(changes.len(), 1);
    assert!(!changes[0].1);
}

#[test]
fn click_without_move_writes_nothing() {
    let (mut core, _) = core_with_zone();
    let actions = click(&mut core, pt(50.0, 50.0), 0.0);
    assert!(entity_changes(&actions).is_empty());
}

#[test]
fn vertex_drag_recomputes_area() {
    let (mut core, id) = core_with_zone();
    click(&mut core, pt(50.0, 50.0), 0.0);
    core.on_pointer_down(pt(100.0, 100.0), Button::Primary, no_modifiers(), 10.0);
    assert!(matches!(core.input, InputState::DraggingVertex { index: 2, .. }));
    core.on_pointer_move(pt(200.0, 100.0), no_modifiers(), 11.0);
    let up = core.on_pointer_up(pt(200.0, 100.0), Button::Primary, no_modifiers(), 12.0);
    let changes = entity_changes(&up);
    let Entity::Zone(z) = &changes[0].0 else { panic!("expected zone") };
    assert_eq!(z.id, id);
    assert_eq!(z.points[2], pt(200.0, 100.0));
    assert!(approx(z.area, 1.5));
}

#[test]
fn tool_switch_flushes_drag() {
    let (mut core, _) = core_with_zone();
    core.on_pointer_down(pt(50.0, 50.0), Button::Primary, no_modifiers(), 0.0);
    core.on_pointer_move(pt(60.0, 50.0), no_modifiers(), 1.0);
    let actions = core.set_tool(Tool::Pan);
    let changes = entity_changes(&actions);
    assert_eq!(changes.len(), 1);
    assert!(changes[0].1);
    assert!(matches!(core.input, InputState::Idle));
    assert!(core.overlay().is_none());
}

#[test]
fn leave_ends_drag() {
    let (mut core, _) = core_with_zone();
    core.on_pointer_down(pt(50.0, 50.0), Button::Primary, no_modifiers(), 0.0);
    core.on_pointer_move(pt(60.0, 50.0), no_modifiers(), 1.0);
    let changes = entity_changes(&core.on_pointer_leave(2.0));
    assert_eq!(changes.len(), 1);
    assert!(changes[0].1);
}

#[test]
fn pan_during_drag_commits_drag() {
    let (mut core, id) = core_with_zone();
    let mut actions = core.on_pointer_down(pt(50.0, 50.0), Button::Primary, no_modifiers(), 0.0);
    actions.extend(core.on_pointer_move(pt(60.0, 50.0), no_modifiers(), 1.0));
    actions.extend(core.on_pointer_down(pt(60.0, 50.0), Button::Middle, no_modifiers(), 2.0));
    assert!(matches!(core.input, InputState::Panning { .. }));
    actions.extend(core.on_pointer_up(pt(60.0, 50.0), Button::Middle, no_modifiers(), 3.0));
    actions.extend(core.on_pointer_up(pt(60.0, 50.0), Button::Primary, no_modifiers(), 4.0));

    let commits: Vec<_> = entity_changes(&actions).into_iter().filter(|(_, commit)| *commit).collect();
    assert_eq!(commits.len(), 1);
    assert_eq!(zone_points(&core.doc.get(&id).unwrap())[0], pt(10.0, 0.0));
    assert!(core.overlay().is_none());
    assert!(matches!(core.input, InputState::Idle));
}

#[test]
fn second_press_after_lost_release_commits_first_drag() {
    let (mut core, first) = core_with_zone();
    let zone = make_zone(square(200.0, 200.0, 100.0));
    let second = zone.id;
    core.apply_upsert(Entity::Zone(zone));

    core.on_pointer_down(pt(50.0, 50.0), Button::Primary, no_modifiers(), 0.0);
    core.on_pointer_move(pt(60.0, 50.0), no_modifiers(), 1.0);
    let actions = core.on_pointer_down(pt(250.0, 250.0), Button::Primary, no_modifiers(), 2.0);

    let changes = entity_changes(&actions);
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].0.id(), first);
    assert!(changes[0].1);
    assert_eq!(zone_points(&core.doc.get(&first).unwrap())[0], pt(10.0, 0.0));
    assert!(core.overlay().is_none());
    assert_eq!(core.selection(), Some(second));
    assert!(matches!(core.input, InputState::DraggingWhole { id, .. } if id == second));
}

// =============================================================
// Selection and keys
// =============================================================

#[test]
fn click_empty_clears_selection() {
    let (mut core, _) = core_with_zone();
    click(&mut core, pt(50.0, 50.0), 0.0);
    let actions = click(&mut core, pt(500.0, 500.0), 1.0);
    assert!(actions.contains(&Action::SelectionChanged { id: None }));
}

#[test]
fn delete_key_removes_selection() {
    let (mut core, id) = core_with_zone();
    click(&mut core, pt(50.0, 50.0), 0.0);
    let actions = core.on_key_down(key("Delete"), no_modifiers());
    assert_eq!(actions[0], Action::EntityDeleted { id });
    assert!(core.doc.get(&id).is_none());
    assert!(core.selection().is_none());
}

#[test]
fn delete_without_selection_is_noop() {
    let (mut core, _) = core_with_zone();
    assert!(core.on_key_down(key("Backspace"), no_modifiers()).is_empty());
    assert_eq!(core.doc.len(), 1);
}

#[test]
fn escape_cancels_shape_before_selection() {
    let (mut core, id) = core_with_zone();
    click(&mut core, pt(50.0, 50.0), 0.0);
    core.set_tool(Tool::Zone);
    core.ui.selected_id = Some(id);
    click(&mut core, pt(300.0, 300.0), 1.0);
    assert!(core.draw.is_accumulating());

    core.on_key_down(key("Escape"), no_modifiers());
    assert!(!core.draw.is_accumulating());
    assert_eq!(core.selection(), Some(id));

    let actions = core.on_key_down(key("Escape"), no_modifiers());
    assert!(actions.contains(&Action::SelectionChanged { id: None }));
}

#[test]
fn hover_sets_cursor() {
    let (mut core, _) = core_with_zone();
    let actions = core.on_pointer_move(pt(50.0, 50.0), no_modifiers(), 0.0);
    assert!(actions.contains(&Action::SetCursor { cursor: "move".into() }));
    let again = core.on_pointer_move(pt(51.0, 50.0), no_modifiers(), 1.0);
    assert!(!again.iter().any(|a| matches!(a, Action::SetCursor { .. })));
}

// =============================================================
// Drawing
// =============================================================

#[test]
fn length_tools_require_scale() {
    let mut core = EngineCore::new();
    core.set_tool(Tool::Cable(CableKind::Lv));
    let actions = click(&mut core, pt(0.0, 0.0), 0.0);
    assert_eq!(warnings(&actions), vec![GestureError::ScaleNotCalibrated { tool: Tool::Cable(CableKind::Lv) }]);
    assert!(!core.draw.is_accumulating());
}

#[test]
fn cable_finishes_on_enter_with_length() {
    let mut core = EngineCore::new();
    core.set_scale_info(calibrated());
    core.set_tool(Tool::Cable(CableKind::Dc));
    click(&mut core, pt(0.0, 0.0), 0.0);
    assert!(core.on_key_down(key("Enter"), no_modifiers()).is_empty());
    click(&mut core, pt(300.0, 400.0), 1.0);
    let actions = core.on_key_down(key("Enter"), no_modifiers());
    let Action::LineDrawComplete { kind, points, length } = &actions[0] else { panic!("expected line") };
    assert_eq!(*kind, CableKind::Dc);
    assert_eq!(points.len(), 2);
    assert!(approx(*length, 5.0));
}

#[test]
fn zone_needs_three_points() {
    let mut core = EngineCore::new();
    core.set_tool(Tool::Zone);
    click(&mut core, pt(0.0, 0.0), 0.0);
    click(&mut core, pt(100.0, 0.0), 1.0);
    assert!(core.on_key_down(key("Enter"), no_modifiers()).is_empty());
    click(&mut core, pt(100.0, 100.0), 2.0);
    let actions = core.on_key_down(key("Enter"), no_modifiers());
    assert!(matches!(&actions[0], Action::ZoneDrawComplete { points, .. } if points.len() == 3));
}

#[test]
fn polygon_closes_on_first_vertex() {
    let mut core = EngineCore::new();
    core.set_scale_info(calibrated());
    core.set_tool(Tool::Zone);
    for p in square(0.0, 0.0, 100.0) {
        click(&mut core, p, 0.0);
    }
    let actions = click(&mut core, pt(3.0, 2.0), 10.0);
    let Action::ZoneDrawComplete { points, area } = &actions[0] else { panic!("expected zone") };
    assert_eq!(points.len(), 4);
    assert!(approx(*area, 1.0));
}

#[test]
fn scale_line_completes_on_second_click() {
    let mut core = EngineCore::new();
    core.set_tool(Tool::Scale);
    click(&mut core, pt(0.0, 0.0), 0.0);
    let actions = click(&mut core, pt(300.0, 400.0), 1.0);
    assert!(matches!(actions[0], Action::ScalingComplete { pixel_length, .. } if approx(pixel_length, 500.0)));
    assert!(core.scale_line.is_some());
    assert!(core.label_rect().is_some());
}

#[test]
fn tool_switch_discards_shape() {
    let mut core = EngineCore::new();
    core.set_tool(Tool::Zone);
    click(&mut core, pt(0.0, 0.0), 0.0);
    core.set_tool(Tool::Select);
    assert!(!core.draw.is_accumulating());
}

#[test]
fn walkway_vertices_snap_to_arrays() {
    let mut core = core_with_pv();
    core.set_tool(Tool::Walkway);
    click(&mut core, pt(55.0, 0.0), 0.0);
    assert_eq!(core.draw.points(), &[pt(50.0, 0.0)]);
    core.on_pointer_down(pt(55.0, 20.0), Button::Primary, shift(), 1.0);
    assert_eq!(core.draw.points()[1], pt(55.0, 20.0));
}

// =============================================================
// Roof direction
// =============================================================

#[test]
fn roof_mask_then_direction() {
    let mut core = EngineCore::new();
    core.set_tool(Tool::RoofMask);
    for p in square(0.0, 0.0, 100.0) {
        click(&mut core, p, 0.0);
    }
    let actions = click(&mut core, pt(0.0, 0.0), 1.0);
    let Action::RoofMaskDrawComplete { points, .. } = &actions[0] else { panic!("expected roof mask") };
    assert!(core.direction.is_active());

    let persisted = make_mask(points.clone(), None);
    let id = persisted.id;
    core.apply_upsert(Entity::RoofMask(persisted));

    let outside = click(&mut core, pt(500.0, 500.0), 2.0);
    assert_eq!(warnings(&outside), vec![GestureError::OutsideRoofMask]);
    assert!(core.direction.is_active());

    click(&mut core, pt(50.0, 10.0), 3.0);
    let done = click(&mut core, pt(50.0, 90.0), 4.0);
    let Action::RoofDirectionSet { mask, direction } = done[0] else { panic!("expected direction") };
    assert_eq!(mask, Some(id));
    assert!(approx(direction, 180.0));
    assert!(!core.direction.is_active());
    let Some(Entity::RoofMask(m)) = core.doc.get(&id) else { panic!("mask missing") };
    assert!(m.direction.is_some_and(|d| approx(d, 180.0)));
}

#[test]
fn direction_tool_picks_mask_under_click() {
    let mut core = EngineCore::new();
    let mask = make_mask(square(0.0, 0.0, 100.0), None);
    let id = mask.id;
    core.load_snapshot(Snapshot { roof_masks: vec![mask], ..Snapshot::default() });
    core.set_tool(Tool::RoofDirection);

    let miss = click(&mut core, pt(500.0, 500.0), 0.0);
    assert_eq!(warnings(&miss), vec![GestureError::NoPendingRoofMask]);

    click(&mut core, pt(10.0, 50.0), 1.0);
    let done = click(&mut core, pt(90.0, 50.0), 2.0);
    let Action::RoofDirectionSet { mask, direction } = done[0] else { panic!("expected direction") };
    assert_eq!(mask, Some(id));
    assert!(approx(direction, 90.0));
}

#[test]
fn escape_cancels_direction() {
    let mut core = EngineCore::new();
    let mask = make_mask(square(0.0, 0.0, 100.0), None);
    let id = mask.id;
    core.load_snapshot(Snapshot { roof_masks: vec![mask], ..Snapshot::default() });
    core.begin_roof_direction(&id);
    assert!(core.direction.is_active());
    core.on_key_down(key("Escape"), no_modifiers());
    assert!(!core.direction.is_active());
}

// =============================================================
// Placement
// =============================================================

#[test]
fn equipment_uses_placement_rotation() {
    let mut core = EngineCore::new();
    core.set_tool(Tool::Equipment(EquipmentKind::Socket));
    core.on_key_down(key("r"), no_modifiers());
    let actions = click(&mut core, pt(10.0, 20.0), 0.0);
    let Action::PlaceEquipment(item) = &actions[0] else { panic!("expected placement") };
    assert_eq!(item.kind, EquipmentKind::Socket);
    assert_eq!(item.position, pt(10.0, 20.0));
    assert_eq!(item.rotation, 90.0);
}

#[test]
fn pv_requires_scale_then_panel() {
    let mut core = EngineCore::new();
    core.set_tool(Tool::PvArray);
    let actions = click(&mut core, pt(0.0, 0.0), 0.0);
    assert_eq!(warnings(&actions), vec![GestureError::ScaleNotCalibrated { tool: Tool::PvArray }]);
    core.set_scale_info(calibrated());
    let actions = click(&mut core, pt(0.0, 0.0), 1.0);
    assert_eq!(warnings(&actions), vec![GestureError::NoPanelConfig]);
}

#[test]
fn pv_adjacent_snap_leaves_gap() {
    let mut core = core_with_pv();
    core.set_tool(Tool::PvArray);
    let actions = click(&mut core, pt(103.0, 5.0), 0.0);
    let Action::PlacePvArray(item) = &actions[0] else { panic!("expected placement") };
    assert!(approx(item.position.x, 102.0) && approx(item.position.y, 0.0));
    assert_eq!((item.rows, item.columns), (1, 1));
}

#[test]
fn pv_corner_snap_shows_guides() {
    let mut core = core_with_pv();
    core.set_tool(Tool::PvArray);
    core.on_pointer_move(pt(100.0, 10.0), no_modifiers(), 0.0);
    assert_eq!(core.guides().len(), 2);
    let Some(Ghost::PvArray(ghost)) = core.ghost() else { panic!("expected ghost") };
    assert!(approx(ghost.position.x, 100.0) && approx(ghost.position.y, 0.0));
}

#[test]
fn shift_disables_pv_snap() {
    let mut core = core_with_pv();
    core.set_tool(Tool::PvArray);
    let actions = core.on_pointer_down(pt(103.0, 5.0), Button::Primary, shift(), 0.0);
    let Action::PlacePvArray(item) = &actions[0] else { panic!("expected placement") };
    assert_eq!(item.position, pt(103.0, 5.0));
}

#[test]
fn pv_on_oriented_roof_auto_rotates() {
    let mut core = EngineCore::new();
    core.set_scale_info(calibrated());
    core.set_panel_config(Some(panel()));
    core.load_snapshot(Snapshot {
        roof_masks: vec![make_mask(square(0.0, 0.0, 1000.0), Some(180.0))],
        ..Snapshot::default()
    });
    core.set_tool(Tool::PvArray);
    let actions = click(&mut core, pt(500.0, 500.0), 0.0);
    let Action::PlacePvArray(item) = &actions[0] else { panic!("expected placement") };
    assert_eq!(item.rotation, 270.0);
}

#[test]
fn leaving_clears_ghost() {
    let mut core = EngineCore::new();
    core.set_tool(Tool::Equipment(EquipmentKind::Socket));
    core.on_pointer_move(pt(10.0, 10.0), no_modifiers(), 0.0);
    assert!(core.ghost().is_some());
    core.on_pointer_leave(1.0);
    assert!(core.ghost().is_none());
}

// =============================================================
// Scale label
// =============================================================

fn core_with_label() -> (EngineCore, LabelRect) {
    let mut core = EngineCore::new();
    core.set_scale_info(calibrated());
    core.set_scale_line(Some(ReferenceLine { start: pt(0.0, 0.0), end: pt(200.0, 0.0) }));
    let rect = core.label_rect().unwrap();
    (core, rect)
}

#[test]
fn label_defaults_beside_midpoint() {
    let (_, rect) = core_with_label();
    assert_eq!(rect.position(), pt(112.0, 12.0));
}

#[test]
fn label_drag_commits_position() {
    let (mut core, rect) = core_with_label();
    let start = rect.center();
    core.on_pointer_down(start, Button::Primary, no_modifiers(), 0.0);
    assert!(matches!(core.input, InputState::DraggingScaleLabel { .. }));
    core.on_pointer_move(start.offset(10.0, 10.0), no_modifiers(), 1.0);
    let actions = core.on_pointer_up(start.offset(10.0, 10.0), Button::Primary, no_modifiers(), 2.0);
    assert!(actions.contains(&Action::ScaleLabelChanged { position: pt(122.0, 22.0), size: None, commit: true }));
    assert_eq!(core.scale.label_position, Some(pt(122.0, 22.0)));
}

#[test]
fn label_resize_keeps_opposite_corner() {
    let (mut core, rect) = core_with_label();
    let se = rect.corner(Corner::Se);
    core.on_pointer_down(se, Button::Primary, no_modifiers(), 0.0);
    assert!(matches!(core.input, InputState::ResizingScaleLabel { corner: Corner::Se, .. }));
    core.on_pointer_move(se.offset(20.0, 10.0), no_modifiers(), 1.0);
    core.on_pointer_up(se.offset(20.0, 10.0), Button::Primary, no_modifiers(), 2.0);
    let size = core.scale.label_size.unwrap();
    assert!(approx(size.width, rect.width + 20.0));
    assert!(approx(size.height, rect.height + 10.0));
    assert_eq!(core.scale.label_position, Some(rect.position()));
}

// =============================================================
// Actions
// =============================================================

#[test]
fn actions_serialize_with_tag() {
    let action = Action::EntityDeleted { id: Uuid::nil() };
    let json = serde_json::to_value(&action).unwrap();
    assert_eq!(json["action"], "entity_deleted");
    let warning = serde_json::to_value(Action::Warning(GestureError::NoPanelConfig)).unwrap();
    assert_eq!(warning["code"], "no_panel_config");
}

#[test]
fn scene_reflects_overlay() {
    let (mut core, _) = core_with_zone();
    core.on_pointer_down(pt(50.0, 50.0), Button::Primary, no_modifiers(), 0.0);
    core.on_pointer_move(pt(60.0, 50.0), no_modifiers(), 1.0);
    let frame = core.scene();
    let moved = frame.layer(scene::Layer::Entities).any(|p| match p {
        scene::Paint::Path { points, .. } => points.first() == Some(&pt(10.0, 0.0)),
        _ => false,
    });
    assert!(moved);
}
