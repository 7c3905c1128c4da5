//! Display list for one frame.
//!
//! [`build`] turns the engine state into a flat list of [`Paint`] items in
//! world coordinates, tagged with their [`Layer`]. Layers are emitted in a
//! fixed order so live feedback is never covered by static content:
//!
//! ```text
//! Background → Entities → Selection → Drawing → Scale → Guides → Preview
//! ```
//!
//! The list is rebuilt from scratch on every state change; [`crate::render`]
//! just walks it. Keeping the builder free of browser types is what lets the
//! rendering pass be tested natively.

#[cfg(test)]
#[path = "scene_test.rs"]
mod scene_test;

use crate::camera::ViewState;
use crate::commit;
use crate::config::EngineConfig;
use crate::consts::{LABEL_FONT_PX, LABEL_PADDING};
use crate::doc::{DocStore, Entity, EquipmentKind, PvArrayItem, PvPanelConfig, ScaleInfo, TaskStatus};
use crate::draw::{DirectionState, DrawState};
use crate::geometry::{self, Bounds, Point};
use crate::hit::{self, Corner};
use crate::input::{Tool, UiState};
use crate::pv::{PlacedArray, SnapGuide};
use crate::scale::{self, LabelRect, ReferenceLine};
use crate::style::{self, ColorCache};

/// Screen-pixel radius of a drawn vertex handle.
const HANDLE_DRAW_PX: f64 = 5.0;
/// Length of the scale line end ticks, screen pixels.
const TICK_PX: f64 = 8.0;
/// Screen-pixel offset of the live length label from the cursor.
const LIVE_LABEL_OFFSET_PX: f64 = 14.0;
const LIVE_LABEL_FONT_PX: f64 = 12.0;
const BADGE_RADIUS_PX: f64 = 8.0;
const DIRECTION_ARROW_PX: f64 = 36.0;
const PREVIEW_DASH: [f64; 2] = [6.0, 4.0];
const GUIDE_DASH: [f64; 2] = [4.0, 4.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Layer {
    Background,
    Entities,
    Selection,
    Drawing,
    Scale,
    Guides,
    Preview,
}

/// A length either fixed in world units or fixed on screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Size {
    World(f64),
    Screen(f64),
}

impl Size {
    /// The size in world units at `zoom`.
    #[must_use]
    pub fn world(self, zoom: f64) -> f64 {
        match self {
            Self::World(w) => w,
            Self::Screen(px) => px / zoom,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stroke {
    pub color: String,
    pub width: Size,
    /// Dash pattern in screen pixels; empty for solid.
    pub dash: Vec<f64>,
}

impl Stroke {
    fn solid(color: &str, width_px: f64) -> Self {
        Self { color: color.to_owned(), width: Size::Screen(width_px), dash: Vec::new() }
    }

    fn dashed(color: &str, width_px: f64, dash: &[f64]) -> Self {
        Self { color: color.to_owned(), width: Size::Screen(width_px), dash: dash.to_vec() }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    pub color: String,
    pub alpha: f64,
}

impl Fill {
    fn new(color: &str, alpha: f64) -> Self {
        Self { color: color.to_owned(), alpha }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Paint {
    /// The rendered document page, drawn at the world origin.
    Background { width: f64, height: f64 },
    Path { points: Vec<Point>, closed: bool, stroke: Option<Stroke>, fill: Option<Fill> },
    Circle { center: Point, radius: Size, stroke: Option<Stroke>, fill: Option<Fill> },
    Text { at: Point, text: String, size: Size, color: String, align: Align },
}

#[derive(Debug, Clone, Default)]
pub struct Scene {
    items: Vec<(Layer, Paint)>,
}

impl Scene {
    #[must_use]
    pub fn items(&self) -> &[(Layer, Paint)] {
        &self.items
    }

    /// Items on one layer.
    pub fn layer(&self, layer: Layer) -> impl Iterator<Item = &Paint> {
        self.items.iter().filter(move |(l, _)| *l == layer).map(|(_, p)| p)
    }

    /// Every text string on a layer, in paint order.
    #[must_use]
    pub fn texts(&self, layer: Layer) -> Vec<&str> {
        self.layer(layer)
            .filter_map(|p| match p {
                Paint::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    fn push(&mut self, layer: Layer, paint: Paint) {
        self.items.push((layer, paint));
    }
}

/// Placement ghost under the cursor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Ghost {
    Equipment { kind: EquipmentKind, position: Point, rotation: f64 },
    PvArray(PlacedArray),
}

/// Everything one frame depends on.
pub struct SceneInput<'a> {
    pub doc: &'a DocStore,
    /// Optimistic copy of the entity being dragged.
    pub overlay: Option<&'a Entity>,
    pub view: &'a ViewState,
    pub scale: &'a ScaleInfo,
    pub scale_line: Option<ReferenceLine>,
    /// Scale label box, already resolved (including any drag in progress).
    pub label: Option<LabelRect>,
    pub panel: Option<&'a PvPanelConfig>,
    /// Page size of the loaded document.
    pub page: Option<(f64, f64)>,
    pub ui: &'a UiState,
    pub draw: &'a DrawState,
    pub direction: &'a DirectionState,
    pub ghost: Option<Ghost>,
    pub guides: &'a [SnapGuide],
    pub config: &'a EngineConfig,
}

/// Build the display list for one frame.
#[must_use]
pub fn build(input: &SceneInput<'_>, colors: &mut ColorCache) -> Scene {
    let mut scene = Scene::default();

    if let Some((width, height)) = input.page {
        scene.push(Layer::Background, Paint::Background { width, height });
    }

    let entities = commit::merge(&input.doc.entities(), input.overlay);
    for entity in &entities {
        paint_entity(&mut scene, entity, input, colors);
    }
    for entity in &entities {
        paint_task_badge(&mut scene, entity, input);
    }

    if let Some(selected) = input.ui.selected_id.and_then(|id| entities.iter().find(|e| e.id() == id)) {
        paint_selection(&mut scene, selected, input);
    }

    paint_drawing(&mut scene, input);
    paint_direction(&mut scene, input);
    paint_scale(&mut scene, input);

    for g in input.guides {
        scene.push(
            Layer::Guides,
            Paint::Path {
                points: vec![g.from, g.to],
                closed: false,
                stroke: Some(Stroke::dashed(style::GUIDE_STROKE, 1.0, &GUIDE_DASH)),
                fill: None,
            },
        );
    }

    if let Some(ghost) = input.ghost {
        paint_ghost(&mut scene, ghost, input);
    }

    scene
}

// =============================================================
// Entities
// =============================================================

fn paint_entity(scene: &mut Scene, entity: &Entity, input: &SceneInput<'_>, colors: &mut ColorCache) {
    match entity {
        Entity::RoofMask(m) => {
            scene.push(
                Layer::Entities,
                Paint::Path {
                    points: m.points.clone(),
                    closed: true,
                    stroke: Some(Stroke::dashed(style::ROOF_MASK_STROKE, 1.5, &[8.0, 4.0])),
                    fill: Some(Fill::new(style::ROOF_MASK_FILL, 1.0)),
                },
            );
            if let Some(b) = Bounds::from_points(&m.points) {
                let c = b.center();
                text(scene, Layer::Entities, c, format!("{:.0}°", m.pitch), Size::Screen(11.0), style::ROOF_MASK_STROKE);
                if let Some(direction) = m.direction {
                    paint_arrow(scene, Layer::Entities, c, direction, input.view.zoom, style::ROOF_MASK_STROKE);
                }
            }
        }
        Entity::Zone(z) => {
            scene.push(
                Layer::Entities,
                Paint::Path {
                    points: z.points.clone(),
                    closed: true,
                    stroke: Some(Stroke::solid(&z.color, 1.5)),
                    fill: Some(Fill::new(&z.color, 0.2)),
                },
            );
            if let Some(b) = Bounds::from_points(&z.points) {
                let c = b.center();
                text(scene, Layer::Entities, c, z.name.clone(), Size::Screen(12.0), &z.color);
                let area = scale::format_square_meters(z.area);
                text(scene, Layer::Entities, c.offset(0.0, 14.0 / input.view.zoom), area, Size::Screen(11.0), &z.color);
            }
        }
        Entity::Containment(c) => {
            let s = style::containment_style(c.kind);
            scene.push(
                Layer::Entities,
                Paint::Path {
                    points: c.points.clone(),
                    closed: false,
                    stroke: Some(Stroke::dashed(s.stroke, s.width, s.dash)),
                    fill: None,
                },
            );
        }
        Entity::Line(l) => {
            let color = match l.cable_type.as_deref() {
                Some(ct) if !ct.trim().is_empty() => colors.color_for(ct).to_owned(),
                _ => style::cable_color(l.kind).to_owned(),
            };
            scene.push(
                Layer::Entities,
                Paint::Path { points: l.points.clone(), closed: false, stroke: Some(Stroke::solid(&color, 2.0)), fill: None },
            );
        }
        Entity::PvArray(a) => {
            if let Some(placed) = resolve_array(a, input) {
                paint_pv(scene, Layer::Entities, &placed, a.rows, a.columns, 1.0);
            }
        }
        Entity::Equipment(e) => paint_equipment(scene, Layer::Entities, e.kind, e.position, e.rotation, input, 1.0),
    }
}

fn resolve_array(a: &PvArrayItem, input: &SceneInput<'_>) -> Option<PlacedArray> {
    PlacedArray::resolve(a, input.panel?, input.scale, input.doc)
}

fn paint_pv(scene: &mut Scene, layer: Layer, placed: &PlacedArray, rows: u32, columns: u32, alpha: f64) {
    let [c0, c1, c2, c3] = placed.corners();
    scene.push(
        layer,
        Paint::Path {
            points: vec![c0, c1, c2, c3],
            closed: true,
            stroke: Some(Stroke::solid(style::PV_STROKE, 1.5)),
            fill: Some(Fill::new(style::PV_FILL, alpha)),
        },
    );
    let grid = Stroke::solid(style::PV_STROKE, 0.5);
    for col in 1..columns {
        let t = f64::from(col) / f64::from(columns);
        scene.push(
            layer,
            Paint::Path { points: vec![lerp(c0, c1, t), lerp(c3, c2, t)], closed: false, stroke: Some(grid.clone()), fill: None },
        );
    }
    for row in 1..rows {
        let t = f64::from(row) / f64::from(rows);
        scene.push(
            layer,
            Paint::Path { points: vec![lerp(c0, c3, t), lerp(c1, c2, t)], closed: false, stroke: Some(grid.clone()), fill: None },
        );
    }
}

fn paint_equipment(
    scene: &mut Scene,
    layer: Layer,
    kind: EquipmentKind,
    position: Point,
    rotation: f64,
    input: &SceneInput<'_>,
    alpha: f64,
) {
    let s = style::equipment_style(kind);
    let r = hit::equipment_radius(input.scale, input.config);
    scene.push(
        layer,
        Paint::Circle {
            center: position,
            radius: Size::World(r),
            stroke: Some(Stroke::solid("#ffffff", 1.5)),
            fill: Some(Fill::new(s.fill, alpha)),
        },
    );
    let tip = geometry::rotate_about(position.offset(0.0, -r), position, rotation);
    scene.push(
        layer,
        Paint::Path { points: vec![position, tip], closed: false, stroke: Some(Stroke::solid("#ffffff", 1.0)), fill: None },
    );
    text(scene, layer, position, s.glyph.to_owned(), Size::World(r * 0.8), "#ffffff");
}

fn paint_task_badge(scene: &mut Scene, entity: &Entity, input: &SceneInput<'_>) {
    let id = entity.id();
    let open = input.doc.open_task_count(&id);
    if open == 0 {
        return;
    }
    let status = if input.doc.tasks_for(&id).any(|t| t.status == TaskStatus::Todo) {
        TaskStatus::Todo
    } else {
        TaskStatus::InProgress
    };
    let Some(b) = entity.bounds() else {
        return;
    };
    let at = Point::new(b.max_x, b.min_y);
    scene.push(
        Layer::Entities,
        Paint::Circle {
            center: at,
            radius: Size::Screen(BADGE_RADIUS_PX),
            stroke: None,
            fill: Some(Fill::new(style::task_badge_color(status), 1.0)),
        },
    );
    text(scene, Layer::Entities, at, open.to_string(), Size::Screen(10.0), "#ffffff");
}

// =============================================================
// Selection
// =============================================================

fn paint_selection(scene: &mut Scene, entity: &Entity, input: &SceneInput<'_>) {
    let stroke = Stroke::dashed(style::SELECTION_STROKE, 2.0, &[4.0, 3.0]);
    match entity {
        Entity::Equipment(e) => {
            let r = hit::equipment_radius(input.scale, input.config) + 3.0 / input.view.zoom;
            scene.push(
                Layer::Selection,
                Paint::Circle { center: e.position, radius: Size::World(r), stroke: Some(stroke), fill: None },
            );
        }
        Entity::PvArray(a) => {
            if let Some(placed) = resolve_array(a, input) {
                scene.push(
                    Layer::Selection,
                    Paint::Path { points: placed.corners().to_vec(), closed: true, stroke: Some(stroke), fill: None },
                );
            }
        }
        _ => {
            let Some(vertices) = entity.vertices() else {
                return;
            };
            scene.push(
                Layer::Selection,
                Paint::Path { points: vertices.to_vec(), closed: entity.is_closed(), stroke: Some(stroke), fill: None },
            );
            for v in vertices {
                scene.push(
                    Layer::Selection,
                    Paint::Circle {
                        center: *v,
                        radius: Size::Screen(HANDLE_DRAW_PX),
                        stroke: Some(Stroke::solid(style::SELECTION_STROKE, 1.5)),
                        fill: Some(Fill::new("#ffffff", 1.0)),
                    },
                );
            }
        }
    }
}

// =============================================================
// In-progress drawing
// =============================================================

fn tool_stroke_color(tool: Tool) -> &'static str {
    match tool {
        Tool::Cable(kind) => style::cable_color(kind),
        Tool::Containment(kind) => style::containment_style(kind).stroke,
        Tool::Walkway => style::WALKWAY_STROKE,
        Tool::RoofMask => style::ROOF_MASK_STROKE,
        Tool::Scale => style::SCALE_STROKE,
        _ => style::PREVIEW_STROKE,
    }
}

fn paint_drawing(scene: &mut Scene, input: &SceneInput<'_>) {
    let Some(tool) = input.draw.tool() else {
        return;
    };
    let points = input.draw.points();
    let color = tool_stroke_color(tool);

    scene.push(
        Layer::Drawing,
        Paint::Path { points: points.to_vec(), closed: false, stroke: Some(Stroke::solid(color, 2.0)), fill: None },
    );
    for p in points {
        scene.push(
            Layer::Drawing,
            Paint::Circle { center: *p, radius: Size::Screen(3.0), stroke: None, fill: Some(Fill::new(color, 1.0)) },
        );
    }

    let (Some(last), Some(preview)) = (points.last(), input.draw.preview()) else {
        return;
    };
    scene.push(
        Layer::Drawing,
        Paint::Path {
            points: vec![*last, preview],
            closed: false,
            stroke: Some(Stroke::dashed(color, 1.5, &PREVIEW_DASH)),
            fill: None,
        },
    );

    if tool.is_polyline() || tool == Tool::Scale {
        let world_len = input.draw.live_length();
        let label = if tool == Tool::Scale {
            format!("{world_len:.0} px")
        } else {
            scale::format_meters(input.scale.to_meters(world_len))
        };
        let off = LIVE_LABEL_OFFSET_PX / input.view.zoom;
        scene.push(
            Layer::Drawing,
            Paint::Text {
                at: preview.offset(off, -off),
                text: label,
                size: Size::Screen(LIVE_LABEL_FONT_PX),
                color: color.to_owned(),
                align: Align::Left,
            },
        );
    }
}

fn paint_direction(scene: &mut Scene, input: &SceneInput<'_>) {
    let Some(mask) = input.direction.mask() else {
        return;
    };
    scene.push(
        Layer::Drawing,
        Paint::Path {
            points: mask.points.clone(),
            closed: true,
            stroke: Some(Stroke::solid(style::ROOF_MASK_STROKE, 2.5)),
            fill: None,
        },
    );
    let Some(high) = input.direction.high() else {
        return;
    };
    scene.push(
        Layer::Drawing,
        Paint::Circle {
            center: high,
            radius: Size::Screen(5.0),
            stroke: None,
            fill: Some(Fill::new(style::ROOF_MASK_STROKE, 1.0)),
        },
    );
    if let Some(cursor) = input.ui.cursor_world {
        scene.push(
            Layer::Drawing,
            Paint::Path {
                points: vec![high, cursor],
                closed: false,
                stroke: Some(Stroke::dashed(style::ROOF_MASK_STROKE, 1.5, &PREVIEW_DASH)),
                fill: None,
            },
        );
    }
}

// =============================================================
// Scale line and label
// =============================================================

fn paint_scale(scene: &mut Scene, input: &SceneInput<'_>) {
    let Some(line) = input.scale_line else {
        return;
    };
    let zoom = input.view.zoom;
    scene.push(
        Layer::Scale,
        Paint::Path {
            points: vec![line.start, line.end],
            closed: false,
            stroke: Some(Stroke::solid(style::SCALE_STROKE, 2.0)),
            fill: None,
        },
    );
    let len = line.pixel_length();
    if len > 0.0 {
        let half = TICK_PX * 0.5 / zoom;
        let nx = -(line.end.y - line.start.y) / len * half;
        let ny = (line.end.x - line.start.x) / len * half;
        for p in [line.start, line.end] {
            scene.push(
                Layer::Scale,
                Paint::Path {
                    points: vec![p.offset(-nx, -ny), p.offset(nx, ny)],
                    closed: false,
                    stroke: Some(Stroke::solid(style::SCALE_STROKE, 2.0)),
                    fill: None,
                },
            );
        }
    }

    let Some(rect) = input.label else {
        return;
    };
    scene.push(
        Layer::Scale,
        Paint::Path {
            points: Corner::ALL.iter().map(|c| rect.corner(*c)).collect(),
            closed: true,
            stroke: Some(Stroke::solid(style::SCALE_STROKE, 1.0)),
            fill: Some(Fill::new("#ffffff", 0.92)),
        },
    );
    let line_h = (rect.height - LABEL_PADDING * 2.0) * 0.5;
    for (i, s) in scale::label_lines(input.scale, &line).into_iter().enumerate() {
        #[allow(clippy::cast_precision_loss)]
        let y = rect.y + LABEL_PADDING + line_h * (i as f64 + 0.5);
        scene.push(
            Layer::Scale,
            Paint::Text {
                at: Point::new(rect.x + LABEL_PADDING, y),
                text: s,
                size: Size::World(LABEL_FONT_PX),
                color: "#111827".to_owned(),
                align: Align::Left,
            },
        );
    }
    if input.ui.tool == Tool::Select {
        for c in Corner::ALL {
            scene.push(
                Layer::Scale,
                Paint::Circle {
                    center: rect.corner(c),
                    radius: Size::Screen(HANDLE_DRAW_PX),
                    stroke: Some(Stroke::solid(style::SCALE_STROKE, 1.5)),
                    fill: Some(Fill::new("#ffffff", 1.0)),
                },
            );
        }
    }
}

// =============================================================
// Placement ghost
// =============================================================

fn paint_ghost(scene: &mut Scene, ghost: Ghost, input: &SceneInput<'_>) {
    match ghost {
        Ghost::Equipment { kind, position, rotation } => {
            paint_equipment(scene, Layer::Preview, kind, position, rotation, input, 0.5);
        }
        Ghost::PvArray(placed) => {
            let t = input.ui.pv_template;
            paint_pv(scene, Layer::Preview, &placed, t.rows, t.columns, 0.35);
        }
    }
}

// =============================================================
// Helpers
// =============================================================

fn text(scene: &mut Scene, layer: Layer, at: Point, text: String, size: Size, color: &str) {
    scene.push(layer, Paint::Text { at, text, size, color: color.to_owned(), align: Align::Center });
}

/// Downslope arrow from `from` along compass `bearing`.
fn paint_arrow(scene: &mut Scene, layer: Layer, from: Point, bearing: f64, zoom: f64, color: &str) {
    let len = DIRECTION_ARROW_PX / zoom;
    let (sin, cos) = bearing.to_radians().sin_cos();
    let tip = from.offset(sin * len, -cos * len);
    let head = len * 0.3;
    let left = geometry::rotate_about(tip.offset(-sin * head, cos * head), tip, -30.0);
    let right = geometry::rotate_about(tip.offset(-sin * head, cos * head), tip, 30.0);
    let stroke = Stroke::solid(color, 2.0);
    scene.push(layer, Paint::Path { points: vec![from, tip], closed: false, stroke: Some(stroke.clone()), fill: None });
    scene.push(layer, Paint::Path { points: vec![left, tip, right], closed: false, stroke: Some(stroke), fill: None });
}

fn lerp(a: Point, b: Point, t: f64) -> Point {
    Point::new(a.x + (b.x - a.x) * t, a.y + (b.y - a.y) * t)
}
