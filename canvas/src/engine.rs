use serde::{Deserialize, Serialize};
use uuid::Uuid;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use crate::camera::ViewState;
use crate::commit::CommitBuffer;
use crate::config::EngineConfig;
use crate::doc::{
    CableKind, ContainmentKind, DocStore, Entity, EquipmentItem, LabelSize, ObjectId, PvArrayItem, PvPanelConfig,
    ScaleInfo, Snapshot, Task,
};
use crate::draw::{self, DirectionSet, DirectionState, DrawState, Finished, PendingMask};
use crate::error::GestureError;
use crate::geometry::{self, Bounds, Point};
use crate::hit::{self, HitScene, HitTarget};
use crate::input::{Button, InputState, Key, Modifiers, PvTemplate, Tool, UiState, WheelDelta};
use crate::pv::{self, PlacedArray, SnapGuide};
use crate::render;
use crate::scale::{self, FixedAdvance, LabelRect, ReferenceLine, TextMeasure};
use crate::scene::{self, Ghost, Scene, SceneInput};
use crate::style::ColorCache;

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

/// Actions returned from input handlers for the host to process.
///
/// Creation actions are proposals: the host persists the new entity and
/// hands it back through [`EngineCore::apply_upsert`]. `EntityChanged` and
/// `ScaleLabelChanged` carry `commit: false` for intermediate drag frames and
/// `commit: true` exactly once when the gesture ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    ScalingComplete { start: Point, end: Point, pixel_length: f64 },
    LineDrawComplete { kind: CableKind, points: Vec<Point>, length: f64 },
    ZoneDrawComplete { points: Vec<Point>, area: f64 },
    ContainmentDrawComplete { kind: ContainmentKind, points: Vec<Point>, length: f64 },
    WalkwayDrawComplete { points: Vec<Point>, length: f64 },
    RoofMaskDrawComplete { points: Vec<Point>, area: f64 },
    RoofDirectionSet { mask: Option<ObjectId>, direction: f64 },
    PlaceEquipment(EquipmentItem),
    PlacePvArray(PvArrayItem),
    EntityChanged { entity: Entity, commit: bool },
    EntityDeleted { id: ObjectId },
    ScaleLabelChanged { position: Point, size: Option<LabelSize>, commit: bool },
    SelectionChanged { id: Option<ObjectId> },
    ViewChanged { view: ViewState },
    Warning(GestureError),
    SetCursor { cursor: String },
    RenderNeeded,
}

fn warning(err: GestureError) -> Action {
    log::warn!("gesture rejected: {err}");
    Action::Warning(err)
}

/// Core engine state: all logic that does not depend on the canvas element.
///
/// Separated from `Engine` so it can be tested without WASM/browser dependencies.
pub struct EngineCore {
    pub doc: DocStore,
    pub view: ViewState,
    pub ui: UiState,
    pub input: InputState,
    pub draw: DrawState,
    pub direction: DirectionState,
    pub scale: ScaleInfo,
    pub scale_line: Option<ReferenceLine>,
    pub panel: Option<PvPanelConfig>,
    pub config: EngineConfig,
    /// Size of the loaded document page in world units.
    pub page: Option<(f64, f64)>,
    pub viewport_width: f64,
    pub viewport_height: f64,
    pub dpr: f64,
    drag: CommitBuffer<Entity>,
    label_drag: CommitBuffer<LabelRect>,
    /// Whether the label gesture in progress is a resize.
    label_resizing: bool,
    auto_label: LabelSize,
    ghost: Option<Ghost>,
    guides: Vec<SnapGuide>,
    cursor: &'static str,
    colors: ColorCache,
}

impl Default for EngineCore {
    fn default() -> Self {
        Self::with_config(EngineConfig::default())
    }
}

impl EngineCore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(config: EngineConfig) -> Self {
        let mut core = Self {
            doc: DocStore::new(),
            view: ViewState::default(),
            ui: UiState::default(),
            input: InputState::default(),
            draw: DrawState::default(),
            direction: DirectionState::default(),
            scale: ScaleInfo::default(),
            scale_line: None,
            panel: None,
            drag: CommitBuffer::new(config.debounce_ms),
            label_drag: CommitBuffer::new(config.debounce_ms),
            label_resizing: false,
            auto_label: LabelSize { width: config.label_min_width, height: config.label_min_height },
            config,
            page: None,
            viewport_width: 0.0,
            viewport_height: 0.0,
            dpr: 1.0,
            ghost: None,
            guides: Vec::new(),
            cursor: "default",
            colors: ColorCache::new(),
        };
        core.measure_label(&FixedAdvance::default());
        core
    }

    // --- Data inputs ---

    /// Hydrate every entity array from the host.
    pub fn load_snapshot(&mut self, snapshot: Snapshot) {
        self.doc.load_snapshot(snapshot);
        if self.scale.is_calibrated() {
            self.doc.recompute_all(&self.scale);
        }
        if self.ui.selected_id.is_some_and(|id| self.doc.get(&id).is_none()) {
            self.ui.selected_id = None;
        }
    }

    /// The host persisted or changed an entity.
    pub fn apply_upsert(&mut self, entity: Entity) {
        if let (Entity::RoofMask(m), DirectionState::AwaitingHigh { mask } | DirectionState::AwaitingLow { mask, .. }) =
            (&entity, &mut self.direction)
        {
            if mask.id.is_none() && mask.points == m.points {
                mask.id = Some(m.id);
            }
        }
        self.doc.upsert(entity);
    }

    /// The host deleted an entity.
    pub fn apply_delete(&mut self, id: &ObjectId) {
        self.doc.remove(id);
        if self.ui.selected_id.as_ref() == Some(id) {
            self.ui.selected_id = None;
        }
        if self.drag.local().is_some_and(|e| e.id() == *id) {
            self.drag.discard();
            self.input = InputState::Idle;
        }
    }

    pub fn apply_task(&mut self, task: Task) {
        self.doc.upsert_task(task);
    }

    /// New calibration from the host. Derived lengths and areas follow.
    pub fn set_scale_info(&mut self, scale: ScaleInfo) {
        self.scale = scale;
        self.doc.recompute_all(&self.scale);
        self.measure_label(&FixedAdvance::default());
    }

    /// Restore (or clear) a persisted reference line.
    pub fn set_scale_line(&mut self, line: Option<ReferenceLine>) {
        self.scale_line = line;
        self.measure_label(&FixedAdvance::default());
    }

    pub fn set_panel_config(&mut self, panel: Option<PvPanelConfig>) {
        self.panel = panel;
        self.refresh_placement(Modifiers::default());
    }

    pub fn set_pv_template(&mut self, template: PvTemplate) {
        self.ui.pv_template = template;
        self.refresh_placement(Modifiers::default());
    }

    /// Rotation for off-roof placements, in clockwise degrees.
    pub fn set_placement_rotation(&mut self, degrees: f64) {
        self.ui.placement_rotation = geometry::normalize_deg(degrees);
        self.refresh_placement(Modifiers::default());
    }

    /// Re-fit the label box to its text with `measure`.
    pub fn measure_label(&mut self, measure: &dyn TextMeasure) {
        if let Some(line) = self.scale_line {
            let lines = scale::label_lines(&self.scale, &line);
            self.auto_label = scale::auto_size(&lines, measure, &self.config);
        }
    }

    // --- Viewport / document ---

    /// Update viewport dimensions and device pixel ratio.
    pub fn set_viewport(&mut self, width_css: f64, height_css: f64, dpr: f64) {
        self.viewport_width = width_css;
        self.viewport_height = height_css;
        self.dpr = dpr;
    }

    /// A new document page was rendered. Resets the view to fit it and drops
    /// every gesture in progress.
    pub fn load_document(&mut self, width: f64, height: f64) -> Vec<Action> {
        self.page = Some((width, height));
        self.view = ViewState::fit_page(width, height, self.viewport_width, self.viewport_height, &self.config);
        self.draw.cancel();
        self.direction.cancel();
        self.drag.discard();
        self.label_drag.discard();
        self.input = InputState::Idle;
        self.ui.hover = None;
        self.ui.selected_id = None;
        self.ghost = None;
        self.guides.clear();
        log::debug!("document loaded: {width}x{height}, zoom {:.3}", self.view.zoom);
        vec![Action::ViewChanged { view: self.view }, Action::SelectionChanged { id: None }, Action::RenderNeeded]
    }

    /// Frame an entity in the viewport.
    pub fn jump_to(&mut self, id: &ObjectId) -> Vec<Action> {
        let Some(bounds) = self.entity_bounds(id) else {
            return Vec::new();
        };
        self.view = ViewState::fit_bounds(bounds, self.viewport_width, self.viewport_height, &self.config);
        vec![Action::ViewChanged { view: self.view }, Action::RenderNeeded]
    }

    // --- Tool ---

    /// Switch tools. Flushes any drag in progress and discards an unfinished
    /// shape.
    pub fn set_tool(&mut self, tool: Tool) -> Vec<Action> {
        let mut actions = Vec::new();
        self.flush_commits(&mut actions);
        self.input = InputState::Idle;
        if self.draw.cancel() {
            log::debug!("in-progress shape discarded by tool switch");
        }
        if tool != Tool::RoofDirection && tool != Tool::RoofMask {
            self.direction.cancel();
        }
        self.ui.tool = tool;
        self.ui.hover = None;
        self.ghost = None;
        self.guides.clear();
        self.set_cursor(tool_cursor(tool), &mut actions);
        actions.push(Action::RenderNeeded);
        actions
    }

    /// Start orienting an existing roof mask.
    pub fn begin_roof_direction(&mut self, id: &ObjectId) -> Vec<Action> {
        match self.doc.get(id) {
            Some(Entity::RoofMask(m)) => {
                self.direction = DirectionState::begin(PendingMask { id: Some(m.id), points: m.points });
                vec![Action::RenderNeeded]
            }
            _ => vec![warning(GestureError::NoPendingRoofMask)],
        }
    }

    // --- Input events ---

    /// A press during a gesture whose release was lost (or a middle-button
    /// pan started mid-drag) ends that gesture first, so its final value is
    /// still committed.
    pub fn on_pointer_down(&mut self, screen_pt: Point, button: Button, modifiers: Modifiers, now_ms: f64) -> Vec<Action> {
        let mut actions = Vec::new();
        if self.input.is_active() {
            log::debug!("pointer down during an unfinished gesture");
            actions = self.end_gesture(now_ms);
        }
        actions.extend(self.begin_gesture(screen_pt, button, modifiers, now_ms));
        actions
    }

    fn begin_gesture(&mut self, screen_pt: Point, button: Button, modifiers: Modifiers, now_ms: f64) -> Vec<Action> {
        let world = self.view.screen_to_world(screen_pt);
        self.ui.cursor_world = Some(world);

        if button == Button::Middle || (button == Button::Primary && self.ui.tool == Tool::Pan) {
            self.input = InputState::Panning { last_screen: screen_pt };
            let mut actions = Vec::new();
            self.set_cursor("grabbing", &mut actions);
            return actions;
        }
        if button != Button::Primary {
            return Vec::new();
        }

        if self.direction.is_active() || self.ui.tool == Tool::RoofDirection {
            return self.direction_click(world);
        }

        let tool = self.ui.tool;
        match tool {
            Tool::Select => self.select_down(world, now_ms),
            Tool::Equipment(kind) => {
                let item = EquipmentItem {
                    id: Uuid::new_v4(),
                    kind,
                    position: world,
                    rotation: self.ui.placement_rotation,
                    name: None,
                    assembly_modifications: Vec::new(),
                };
                log::debug!("place equipment {kind:?} at ({:.1}, {:.1})", world.x, world.y);
                vec![Action::PlaceEquipment(item), Action::RenderNeeded]
            }
            Tool::PvArray => self.place_pv(world, modifiers),
            _ if tool.is_drawing() => self.drawing_click(tool, world, modifiers),
            _ => Vec::new(),
        }
    }

    pub fn on_pointer_move(&mut self, screen_pt: Point, modifiers: Modifiers, now_ms: f64) -> Vec<Action> {
        let world = self.view.screen_to_world(screen_pt);
        self.ui.cursor_world = Some(world);
        let mut actions = Vec::new();

        match self.input.clone() {
            InputState::Panning { last_screen } => {
                self.view.pan_by(screen_pt.x - last_screen.x, screen_pt.y - last_screen.y);
                self.input = InputState::Panning { last_screen: screen_pt };
                actions.push(Action::ViewChanged { view: self.view });
                actions.push(Action::RenderNeeded);
            }
            InputState::DraggingWhole { id, last_world, .. } => {
                if let Some(mut entity) = self.current_entity(&id) {
                    entity.translate(world.x - last_world.x, world.y - last_world.y);
                    entity.recompute(&self.scale);
                    self.stage_entity(entity, now_ms, &mut actions);
                }
                self.input = InputState::DraggingWhole { id, last_world: world, moved: true };
            }
            InputState::DraggingVertex { id, index, .. } => {
                if let Some(mut entity) = self.current_entity(&id) {
                    if entity.set_vertex(index, world) {
                        entity.recompute(&self.scale);
                        self.stage_entity(entity, now_ms, &mut actions);
                    }
                }
                self.input = InputState::DraggingVertex { id, index, moved: true };
            }
            InputState::DraggingScaleLabel { last_world, .. } => {
                if let Some(rect) = self.label_rect() {
                    let moved = LabelRect { x: rect.x + world.x - last_world.x, y: rect.y + world.y - last_world.y, ..rect };
                    self.label_drag.stage(moved, now_ms);
                    self.poll_commits(now_ms, &mut actions);
                    actions.push(Action::RenderNeeded);
                }
                self.input = InputState::DraggingScaleLabel { last_world: world, moved: true };
            }
            InputState::ResizingScaleLabel { corner, start_world, orig, .. } => {
                let rect = scale::resize(
                    orig,
                    corner,
                    world.x - start_world.x,
                    world.y - start_world.y,
                    self.config.label_min_width,
                    self.config.label_min_height,
                );
                self.label_drag.stage(rect, now_ms);
                self.poll_commits(now_ms, &mut actions);
                actions.push(Action::RenderNeeded);
                self.input = InputState::ResizingScaleLabel { corner, start_world, orig, moved: true };
            }
            InputState::Idle => self.idle_move(world, modifiers, &mut actions),
        }
        actions
    }

    pub fn on_pointer_up(&mut self, screen_pt: Point, _button: Button, _modifiers: Modifiers, now_ms: f64) -> Vec<Action> {
        self.ui.cursor_world = Some(self.view.screen_to_world(screen_pt));
        self.end_gesture(now_ms)
    }

    /// The pointer left the canvas: end any gesture as if released.
    pub fn on_pointer_leave(&mut self, now_ms: f64) -> Vec<Action> {
        let mut actions = self.end_gesture(now_ms);
        self.ui.cursor_world = None;
        self.ui.hover = None;
        if self.ghost.take().is_some() {
            self.guides.clear();
            actions.push(Action::RenderNeeded);
        }
        actions
    }

    pub fn on_wheel(&mut self, screen_pt: Point, delta: WheelDelta, _modifiers: Modifiers) -> Vec<Action> {
        let factor = (-delta.dy * self.config.wheel_sensitivity).exp();
        let before = self.view;
        self.view.zoom_at(screen_pt, self.view.zoom * factor, &self.config);
        if self.view == before {
            return Vec::new();
        }
        vec![Action::ViewChanged { view: self.view }, Action::RenderNeeded]
    }

    pub fn on_key_down(&mut self, key: Key, modifiers: Modifiers) -> Vec<Action> {
        match key.0.as_str() {
            "Enter" => match self.draw.finish() {
                Some(finished) => self.complete(finished),
                None => Vec::new(),
            },
            "Escape" => {
                let cancelled_shape = self.draw.cancel();
                let cancelled_direction = self.direction.cancel();
                if cancelled_shape || cancelled_direction {
                    return vec![Action::RenderNeeded];
                }
                if self.ui.selected_id.take().is_some() {
                    return vec![Action::SelectionChanged { id: None }, Action::RenderNeeded];
                }
                Vec::new()
            }
            "Delete" | "Backspace" => self.delete_selection(),
            "r" | "R" if self.ui.tool.is_placement() => {
                self.ui.placement_rotation = geometry::normalize_deg(self.ui.placement_rotation + 90.0);
                self.refresh_placement(modifiers);
                vec![Action::RenderNeeded]
            }
            _ => Vec::new(),
        }
    }

    /// Emit any debounced commit whose window has closed. Called from the
    /// host's frame callback.
    pub fn tick(&mut self, now_ms: f64) -> Vec<Action> {
        let mut actions = Vec::new();
        self.poll_commits(now_ms, &mut actions);
        actions
    }

    // --- Queries ---

    /// The currently selected entity, if any.
    #[must_use]
    pub fn selection(&self) -> Option<ObjectId> {
        self.ui.selected_id
    }

    #[must_use]
    pub fn view(&self) -> ViewState {
        self.view
    }

    /// Look up an entity, preferring the optimistic drag copy.
    #[must_use]
    pub fn object(&self, id: &ObjectId) -> Option<Entity> {
        self.current_entity(id)
    }

    /// The optimistic copy of the entity being dragged.
    #[must_use]
    pub fn overlay(&self) -> Option<&Entity> {
        self.drag.local()
    }

    /// The scale label box, including any drag in progress.
    #[must_use]
    pub fn label_rect(&self) -> Option<LabelRect> {
        if let Some(rect) = self.label_drag.local() {
            return Some(*rect);
        }
        self.scale_line.map(|line| scale::label_rect(&self.scale, &line, self.auto_label))
    }

    #[must_use]
    pub fn ghost(&self) -> Option<Ghost> {
        self.ghost
    }

    #[must_use]
    pub fn guides(&self) -> &[SnapGuide] {
        &self.guides
    }

    /// Display list for the current state.
    pub fn scene(&mut self) -> Scene {
        let input = SceneInput {
            doc: &self.doc,
            overlay: self.drag.local(),
            view: &self.view,
            scale: &self.scale,
            scale_line: self.scale_line,
            label: self.label_rect(),
            panel: self.panel.as_ref(),
            page: self.page,
            ui: &self.ui,
            draw: &self.draw,
            direction: &self.direction,
            ghost: self.ghost,
            guides: &self.guides,
            config: &self.config,
        };
        scene::build(&input, &mut self.colors)
    }

    // --- Gestures ---

    fn select_down(&mut self, world: Point, now_ms: f64) -> Vec<Action> {
        let mut actions = Vec::new();
        let target = hit::hit_test(world, &self.hit_scene());
        match target {
            Some(HitTarget::LabelCorner { corner }) => {
                if let Some(orig) = self.label_rect() {
                    self.label_resizing = true;
                    self.input = InputState::ResizingScaleLabel { corner, start_world: world, orig, moved: false };
                }
            }
            Some(HitTarget::LabelBody) => {
                self.label_resizing = false;
                self.input = InputState::DraggingScaleLabel { last_world: world, moved: false };
            }
            Some(HitTarget::Vertex { id, index }) => {
                self.input = InputState::DraggingVertex { id, index, moved: false };
            }
            Some(HitTarget::Body { id }) => {
                self.select(Some(id), &mut actions);
                self.input = InputState::DraggingWhole { id, last_world: world, moved: false };
            }
            None => self.select(None, &mut actions),
        }
        self.poll_commits(now_ms, &mut actions);
        if target.is_some() {
            actions.push(Action::RenderNeeded);
        }
        actions
    }

    fn select(&mut self, id: Option<ObjectId>, actions: &mut Vec<Action>) {
        if self.ui.selected_id != id {
            self.ui.selected_id = id;
            actions.push(Action::SelectionChanged { id });
            actions.push(Action::RenderNeeded);
        }
    }

    fn end_gesture(&mut self, now_ms: f64) -> Vec<Action> {
        let mut actions = Vec::new();
        let state = std::mem::take(&mut self.input);
        let moved = match state {
            InputState::Idle => return actions,
            InputState::Panning { .. } => {
                let cursor = tool_cursor(self.ui.tool);
                self.set_cursor(cursor, &mut actions);
                return actions;
            }
            InputState::DraggingWhole { moved, .. }
            | InputState::DraggingVertex { moved, .. }
            | InputState::DraggingScaleLabel { moved, .. }
            | InputState::ResizingScaleLabel { moved, .. } => moved,
        };
        if moved {
            self.flush_commits(&mut actions);
            actions.push(Action::RenderNeeded);
        } else {
            self.drag.discard();
            self.label_drag.discard();
        }
        log::debug!("gesture ended at {now_ms:.0} ms, moved: {moved}");
        actions
    }

    fn idle_move(&mut self, world: Point, modifiers: Modifiers, actions: &mut Vec<Action>) {
        if self.draw.is_accumulating() {
            let tool = self.ui.tool;
            let p = self.snap_vertex(tool, world, modifiers);
            self.draw.set_preview(p);
            actions.push(Action::RenderNeeded);
        } else if self.ui.tool.is_placement() {
            self.refresh_placement(modifiers);
            actions.push(Action::RenderNeeded);
        } else if self.ui.tool == Tool::Select {
            let hover = hit::hit_test(world, &self.hit_scene());
            if hover != self.ui.hover {
                self.ui.hover = hover;
                let cursor = match hover {
                    Some(HitTarget::LabelCorner { corner }) => corner.cursor(),
                    Some(HitTarget::LabelBody | HitTarget::Body { .. }) => "move",
                    Some(HitTarget::Vertex { .. }) => "pointer",
                    None => "default",
                };
                self.set_cursor(cursor, actions);
            }
        }
        if self.direction.high().is_some() {
            actions.push(Action::RenderNeeded);
        }
    }

    fn drawing_click(&mut self, tool: Tool, world: Point, modifiers: Modifiers) -> Vec<Action> {
        if let Err(err) = draw::guard(tool, &self.scale) {
            return vec![warning(err)];
        }
        let p = self.snap_vertex(tool, world, modifiers);
        let close = self.view.screen_dist_to_world(self.config.close_threshold_px);
        match self.draw.click(tool, p, close) {
            Some(finished) => self.complete(finished),
            None => vec![Action::RenderNeeded],
        }
    }

    /// Turn a finished shape into its completion action.
    fn complete(&mut self, finished: Finished) -> Vec<Action> {
        let Finished { tool, points } = finished;
        let length = self.scale.to_meters(geometry::polyline_length(&points));
        let area = self.scale.to_square_meters(geometry::polygon_area(&points));
        let action = match tool {
            Tool::Scale => {
                let (Some(start), Some(end)) = (points.first().copied(), points.last().copied()) else {
                    return Vec::new();
                };
                let line = ReferenceLine { start, end };
                self.scale_line = Some(line);
                self.measure_label(&FixedAdvance::default());
                Action::ScalingComplete { start, end, pixel_length: line.pixel_length() }
            }
            Tool::Cable(kind) => Action::LineDrawComplete { kind, points, length },
            Tool::Containment(kind) => Action::ContainmentDrawComplete { kind, points, length },
            Tool::Walkway => Action::WalkwayDrawComplete { points, length },
            Tool::Zone => Action::ZoneDrawComplete { points, area },
            Tool::RoofMask => {
                self.direction = DirectionState::begin(PendingMask { id: None, points: points.clone() });
                Action::RoofMaskDrawComplete { points, area }
            }
            Tool::Select | Tool::Pan | Tool::RoofDirection | Tool::Equipment(_) | Tool::PvArray => return Vec::new(),
        };
        log::debug!("{tool:?} shape complete");
        vec![action, Action::RenderNeeded]
    }

    fn direction_click(&mut self, world: Point) -> Vec<Action> {
        if !self.direction.is_active() {
            let Some(mask) = self.doc.roof_mask_at(world) else {
                return vec![warning(GestureError::NoPendingRoofMask)];
            };
            self.direction = DirectionState::begin(PendingMask { id: Some(mask.id), points: mask.points.clone() });
        }
        match self.direction.click(world) {
            Ok(Some(DirectionSet { mask, direction, .. })) => {
                let mut actions = vec![Action::RoofDirectionSet { mask, direction }];
                if let Some(Entity::RoofMask(mut m)) = mask.and_then(|id| self.doc.get(&id)) {
                    m.direction = Some(direction);
                    self.doc.upsert(Entity::RoofMask(m));
                }
                log::debug!("roof direction set: {direction:.1}°");
                actions.push(Action::RenderNeeded);
                actions
            }
            Ok(None) => vec![Action::RenderNeeded],
            Err(err) => vec![warning(err)],
        }
    }

    fn place_pv(&mut self, world: Point, modifiers: Modifiers) -> Vec<Action> {
        if let Err(err) = draw::guard(Tool::PvArray, &self.scale) {
            return vec![warning(err)];
        }
        if self.panel.is_none() {
            return vec![warning(GestureError::NoPanelConfig)];
        }
        self.ui.cursor_world = Some(world);
        self.refresh_placement(modifiers);
        let Some(Ghost::PvArray(placed)) = self.ghost else {
            return Vec::new();
        };
        let t = self.ui.pv_template;
        let item = PvArrayItem {
            id: Uuid::new_v4(),
            position: placed.position,
            rows: t.rows,
            columns: t.columns,
            orientation: t.orientation,
            rotation: placed.rotation,
        };
        log::debug!("place PV array {}x{} at ({:.1}, {:.1})", t.rows, t.columns, placed.position.x, placed.position.y);
        vec![Action::PlacePvArray(item), Action::RenderNeeded]
    }

    fn delete_selection(&mut self) -> Vec<Action> {
        let Some(id) = self.ui.selected_id.take() else {
            return Vec::new();
        };
        if self.drag.local().is_some_and(|e| e.id() == id) {
            self.drag.discard();
            self.input = InputState::Idle;
        }
        if self.doc.remove(&id).is_none() {
            return vec![Action::SelectionChanged { id: None }];
        }
        log::debug!("deleted {id}");
        vec![Action::EntityDeleted { id }, Action::SelectionChanged { id: None }, Action::RenderNeeded]
    }

    // --- Placement ---

    /// Recompute the placement ghost and snap guides under the cursor.
    fn refresh_placement(&mut self, modifiers: Modifiers) {
        self.ghost = None;
        self.guides.clear();
        let Some(p) = self.ui.cursor_world else {
            return;
        };
        match self.ui.tool {
            Tool::Equipment(kind) => {
                self.ghost = Some(Ghost::Equipment { kind, position: p, rotation: self.ui.placement_rotation });
            }
            Tool::PvArray => {
                let (Some(ratio), Some(panel)) = (self.scale.ratio(), self.panel) else {
                    return;
                };
                let mask = self.doc.roof_mask_at(p);
                let rotation = pv::auto_rotation(mask, self.ui.placement_rotation);
                let pitch = mask.map_or(0.0, |m| m.pitch);
                let t = self.ui.pv_template;
                let (width, height) = pv::array_size(&panel, ratio, t.rows, t.columns, t.orientation, pitch);
                let mut candidate = PlacedArray { position: p, width, height, rotation };
                if !modifiers.shift {
                    let threshold = self.view.screen_dist_to_world(self.config.snap_threshold_px);
                    let gap = self.config.pv_gap_m / ratio;
                    if let Some(snap) = pv::snap_array(&candidate, &self.placed_arrays(), threshold, gap) {
                        candidate = candidate.with_position(snap.position);
                        self.guides = snap.guides;
                    }
                }
                self.ghost = Some(Ghost::PvArray(candidate));
            }
            _ => {}
        }
    }

    /// Walkway vertices snap to PV array outlines.
    fn snap_vertex(&self, tool: Tool, p: Point, modifiers: Modifiers) -> Point {
        if tool != Tool::Walkway || modifiers.shift {
            return p;
        }
        let threshold = self.view.screen_dist_to_world(self.config.snap_threshold_px);
        pv::snap_to_outlines(p, &self.placed_arrays(), threshold).unwrap_or(p)
    }

    fn placed_arrays(&self) -> Vec<PlacedArray> {
        let Some(panel) = self.panel else {
            return Vec::new();
        };
        self.doc
            .pv_arrays()
            .iter()
            .filter_map(|a| PlacedArray::resolve(a, &panel, &self.scale, &self.doc))
            .collect()
    }

    // --- Commits ---

    fn current_entity(&self, id: &ObjectId) -> Option<Entity> {
        match self.drag.local() {
            Some(local) if local.id() == *id => Some(local.clone()),
            _ => self.doc.get(id),
        }
    }

    fn stage_entity(&mut self, entity: Entity, now_ms: f64, actions: &mut Vec<Action>) {
        self.drag.stage(entity, now_ms);
        self.poll_commits(now_ms, actions);
        actions.push(Action::RenderNeeded);
    }

    fn poll_commits(&mut self, now_ms: f64, actions: &mut Vec<Action>) {
        if let Some(entity) = self.drag.poll(now_ms) {
            self.doc.upsert(entity.clone());
            actions.push(Action::EntityChanged { entity, commit: false });
        }
        if let Some(rect) = self.label_drag.poll(now_ms) {
            actions.push(self.apply_label(rect, false));
        }
    }

    fn flush_commits(&mut self, actions: &mut Vec<Action>) {
        if let Some(entity) = self.drag.flush() {
            log::debug!("commit {}", entity.id());
            self.doc.upsert(entity.clone());
            actions.push(Action::EntityChanged { entity, commit: true });
        }
        if let Some(rect) = self.label_drag.flush() {
            actions.push(self.apply_label(rect, true));
        }
    }

    fn apply_label(&mut self, rect: LabelRect, commit: bool) -> Action {
        self.scale.label_position = Some(rect.position());
        if self.label_resizing {
            self.scale.label_size = Some(rect.size());
        }
        Action::ScaleLabelChanged { position: rect.position(), size: self.scale.label_size, commit }
    }

    // --- Helpers ---

    fn hit_scene(&self) -> HitScene<'_> {
        HitScene {
            doc: &self.doc,
            view: &self.view,
            scale: &self.scale,
            panel: self.panel.as_ref(),
            selected: self.ui.selected_id,
            label: if self.ui.tool == Tool::Select { self.label_rect() } else { None },
            config: &self.config,
        }
    }

    fn entity_bounds(&self, id: &ObjectId) -> Option<Bounds> {
        match self.doc.get(id)? {
            Entity::Equipment(e) => Some(Bounds::around(e.position, hit::equipment_radius(&self.scale, &self.config) * 2.0)),
            Entity::PvArray(a) => match self.panel.and_then(|panel| PlacedArray::resolve(&a, &panel, &self.scale, &self.doc)) {
                Some(placed) => Bounds::from_points(&placed.corners()),
                None => Some(Bounds::around(a.position, 0.0)),
            },
            other => other.bounds(),
        }
    }

    fn set_cursor(&mut self, cursor: &'static str, actions: &mut Vec<Action>) {
        if self.cursor != cursor {
            self.cursor = cursor;
            actions.push(Action::SetCursor { cursor: cursor.to_owned() });
        }
    }
}

fn tool_cursor(tool: Tool) -> &'static str {
    match tool {
        Tool::Select => "default",
        Tool::Pan => "grab",
        _ => "crosshair",
    }
}

// =============================================================
// Browser engine
// =============================================================

/// The full canvas engine. Wraps `EngineCore` and owns the browser canvases.
pub struct Engine {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    /// The rendered document page.
    background: Option<HtmlCanvasElement>,
    pub core: EngineCore,
}

/// The drawing surfaces, for export.
pub struct Surfaces<'a> {
    pub drawing: &'a HtmlCanvasElement,
    pub background: Option<&'a HtmlCanvasElement>,
}

/// The narrow interface the host may call imperatively.
pub struct CanvasHandle<'a> {
    engine: &'a mut Engine,
}

impl CanvasHandle<'_> {
    #[must_use]
    pub fn surfaces(&self) -> Surfaces<'_> {
        Surfaces { drawing: &self.engine.canvas, background: self.engine.background.as_ref() }
    }

    pub fn jump_to(&mut self, id: &ObjectId) -> Vec<Action> {
        self.engine.core.jump_to(id)
    }
}

impl Engine {
    /// Create a new engine bound to the given canvas element.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the canvas has no 2D context.
    pub fn new(canvas: HtmlCanvasElement, config: EngineConfig) -> Result<Self, JsValue> {
        let ctx = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("canvas has no 2d context"))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(JsValue::from)?;
        Ok(Self { canvas, ctx, background: None, core: EngineCore::with_config(config) })
    }

    #[must_use]
    pub fn handle(&mut self) -> CanvasHandle<'_> {
        CanvasHandle { engine: self }
    }

    /// Adopt a freshly rendered document page.
    pub fn load_document(&mut self, background: HtmlCanvasElement) -> Vec<Action> {
        let (w, h) = (f64::from(background.width()), f64::from(background.height()));
        self.background = Some(background);
        self.core.load_document(w, h)
    }

    // --- Delegated data inputs ---

    pub fn load_snapshot(&mut self, snapshot: Snapshot) {
        self.core.load_snapshot(snapshot);
    }

    pub fn apply_upsert(&mut self, entity: Entity) {
        self.core.apply_upsert(entity);
    }

    pub fn apply_delete(&mut self, id: &ObjectId) {
        self.core.apply_delete(id);
    }

    pub fn set_tool(&mut self, tool: Tool) -> Vec<Action> {
        self.core.set_tool(tool)
    }

    // --- Viewport ---

    /// Update viewport dimensions and device pixel ratio, resizing the backing store.
    pub fn set_viewport(&mut self, width_css: f64, height_css: f64, dpr: f64) {
        self.core.set_viewport(width_css, height_css, dpr);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let (w, h) = ((width_css * dpr).round().max(0.0) as u32, (height_css * dpr).round().max(0.0) as u32);
        self.canvas.set_width(w);
        self.canvas.set_height(h);
    }

    // --- Input events ---

    pub fn on_pointer_down(&mut self, screen_pt: Point, button: Button, modifiers: Modifiers, now_ms: f64) -> Vec<Action> {
        self.core.on_pointer_down(screen_pt, button, modifiers, now_ms)
    }

    pub fn on_pointer_move(&mut self, screen_pt: Point, modifiers: Modifiers, now_ms: f64) -> Vec<Action> {
        self.core.on_pointer_move(screen_pt, modifiers, now_ms)
    }

    pub fn on_pointer_up(&mut self, screen_pt: Point, button: Button, modifiers: Modifiers, now_ms: f64) -> Vec<Action> {
        self.core.on_pointer_up(screen_pt, button, modifiers, now_ms)
    }

    pub fn on_pointer_leave(&mut self, now_ms: f64) -> Vec<Action> {
        self.core.on_pointer_leave(now_ms)
    }

    pub fn on_wheel(&mut self, screen_pt: Point, delta: WheelDelta, modifiers: Modifiers) -> Vec<Action> {
        self.core.on_wheel(screen_pt, delta, modifiers)
    }

    pub fn on_key_down(&mut self, key: Key, modifiers: Modifiers) -> Vec<Action> {
        self.core.on_key_down(key, modifiers)
    }

    pub fn tick(&mut self, now_ms: f64) -> Vec<Action> {
        self.core.tick(now_ms)
    }

    // --- Render ---

    /// Draw the current state to the canvas.
    ///
    /// # Errors
    ///
    /// Returns `Err` if any `Canvas2D` call fails.
    pub fn render(&mut self) -> Result<(), JsValue> {
        self.core.measure_label(&self.ctx);
        let scene = self.core.scene();
        let core = &self.core;
        render::draw(
            &self.ctx,
            &scene,
            &core.view,
            self.background.as_ref(),
            core.viewport_width,
            core.viewport_height,
            core.dpr,
        )
    }

    // --- Delegated queries ---

    #[must_use]
    pub fn selection(&self) -> Option<ObjectId> {
        self.core.selection()
    }

    #[must_use]
    pub fn view(&self) -> ViewState {
        self.core.view()
    }

    #[must_use]
    pub fn object(&self, id: &ObjectId) -> Option<Entity> {
        self.core.object(id)
    }
}
