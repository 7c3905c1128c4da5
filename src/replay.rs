//! Headless replay of recorded canvas sessions.
//!
//! A session is a JSON file holding the viewport, the document page size,
//! calibration, the host's entity arrays, and a timestamped list of input
//! events. [`replay`] drives an [`EngineCore`] through the events and plays
//! the host's part: proposals the engine emits (new shapes, placements) are
//! persisted back into the mirror the way the browser host would.

#[cfg(test)]
#[path = "replay_test.rs"]
mod replay_test;

use canvas::config::EngineConfig;
use canvas::doc::{
    Containment, Entity, ObjectId, PvPanelConfig, RoofMask, ScaleInfo, Snapshot, SupplyLine, SupplyZone,
};
use canvas::engine::{Action, EngineCore};
use canvas::geometry::Point;
use canvas::input::{Button, Key, Modifiers, PvTemplate, Tool, WheelDelta};
use canvas::scale::{self, ReferenceLine};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const DEFAULT_ZONE_COLOR: &str = "#3b82f6";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    #[serde(default = "default_dpr")]
    pub dpr: f64,
}

fn default_dpr() -> f64 {
    1.0
}

impl Default for Viewport {
    fn default() -> Self {
        Self { width: 1280.0, height: 800.0, dpr: 1.0 }
    }
}

/// Rendered page size in world units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Session {
    pub viewport: Viewport,
    pub document: Option<PageSize>,
    pub scale: ScaleInfo,
    pub scale_line: Option<ReferenceLine>,
    pub panel: Option<PvPanelConfig>,
    pub pv_template: Option<PvTemplate>,
    /// Pitch given to roof masks the session draws.
    pub roof_pitch: f64,
    pub snapshot: Snapshot,
    pub events: Vec<TimedEvent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimedEvent {
    /// Milliseconds since the session started.
    #[serde(default)]
    pub at: f64,
    #[serde(flatten)]
    pub event: Event,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    Down {
        x: f64,
        y: f64,
        #[serde(default = "primary")]
        button: Button,
        #[serde(default)]
        modifiers: Modifiers,
    },
    Move {
        x: f64,
        y: f64,
        #[serde(default)]
        modifiers: Modifiers,
    },
    Up {
        x: f64,
        y: f64,
        #[serde(default = "primary")]
        button: Button,
        #[serde(default)]
        modifiers: Modifiers,
    },
    Leave,
    Wheel {
        x: f64,
        y: f64,
        #[serde(default)]
        dx: f64,
        dy: f64,
    },
    Key {
        key: String,
        #[serde(default)]
        modifiers: Modifiers,
    },
    Tool {
        tool: Tool,
    },
    Tick,
    /// Calibrate from the last reference line, as the host does once the
    /// user types the real length.
    Calibrate {
        real_length_m: f64,
    },
    Rotation {
        degrees: f64,
    },
    JumpTo {
        id: ObjectId,
    },
    Direction {
        id: ObjectId,
    },
}

fn primary() -> Button {
    Button::Primary
}

/// Everything a replay produced.
#[derive(Debug, Default)]
pub struct ReplayReport {
    pub actions: Vec<Action>,
    /// Authoritative writes (`commit: true`) emitted.
    pub commits: usize,
    pub warnings: usize,
    /// The mirror after the last event.
    pub snapshot: Snapshot,
}

/// Drive an engine through `session`.
#[must_use]
pub fn replay(session: Session, config: EngineConfig) -> ReplayReport {
    let mut host = Host::new(&session, config);
    let mut report = ReplayReport::default();

    for TimedEvent { at, event } in session.events {
        let actions = host.dispatch(event, at);
        for action in actions {
            host.persist(&action);
            match &action {
                Action::EntityChanged { commit: true, .. } | Action::ScaleLabelChanged { commit: true, .. } => {
                    report.commits += 1;
                }
                Action::Warning(err) => {
                    tracing::warn!(%err, at, "gesture rejected");
                    report.warnings += 1;
                }
                _ => {}
            }
            report.actions.push(action);
        }
    }

    report.snapshot = host.core.doc.snapshot().clone();
    report
}

/// The engine plus the state a browser host keeps beside it.
struct Host {
    core: EngineCore,
    roof_pitch: f64,
    zones_created: usize,
}

impl Host {
    fn new(session: &Session, config: EngineConfig) -> Self {
        let mut core = EngineCore::with_config(config);
        let Viewport { width, height, dpr } = session.viewport;
        core.set_viewport(width, height, dpr);
        if let Some(page) = session.document {
            core.load_document(page.width, page.height);
        }
        core.set_scale_info(session.scale);
        core.set_scale_line(session.scale_line);
        core.set_panel_config(session.panel);
        if let Some(template) = session.pv_template {
            core.set_pv_template(template);
        }
        core.load_snapshot(session.snapshot.clone());
        Self { core, roof_pitch: session.roof_pitch, zones_created: session.snapshot.zones.len() }
    }

    fn dispatch(&mut self, event: Event, at: f64) -> Vec<Action> {
        let core = &mut self.core;
        match event {
            Event::Down { x, y, button, modifiers } => core.on_pointer_down(Point::new(x, y), button, modifiers, at),
            Event::Move { x, y, modifiers } => core.on_pointer_move(Point::new(x, y), modifiers, at),
            Event::Up { x, y, button, modifiers } => core.on_pointer_up(Point::new(x, y), button, modifiers, at),
            Event::Leave => core.on_pointer_leave(at),
            Event::Wheel { x, y, dx, dy } => core.on_wheel(Point::new(x, y), WheelDelta { dx, dy }, Modifiers::default()),
            Event::Key { key, modifiers } => core.on_key_down(Key(key), modifiers),
            Event::Tool { tool } => core.set_tool(tool),
            Event::Tick => core.tick(at),
            Event::Calibrate { real_length_m } => {
                let ratio = core.scale_line.and_then(|line| scale::ratio_from_reference(line.pixel_length(), real_length_m));
                match ratio {
                    Some(ratio) => {
                        core.set_scale_info(ScaleInfo { ratio: Some(ratio), ..core.scale });
                        tracing::info!(ratio, "calibrated");
                        vec![Action::RenderNeeded]
                    }
                    None => {
                        tracing::warn!(real_length_m, "calibration ignored: no usable reference line");
                        Vec::new()
                    }
                }
            }
            Event::Rotation { degrees } => {
                core.set_placement_rotation(degrees);
                vec![Action::RenderNeeded]
            }
            Event::JumpTo { id } => core.jump_to(&id),
            Event::Direction { id } => core.begin_roof_direction(&id),
        }
    }

    /// Persist engine proposals and push them back, as the browser host does.
    fn persist(&mut self, action: &Action) {
        let entity = match action.clone() {
            Action::PlaceEquipment(item) => Entity::Equipment(item),
            Action::PlacePvArray(item) => Entity::PvArray(item),
            Action::LineDrawComplete { kind, points, length } => Entity::Line(SupplyLine {
                id: Uuid::new_v4(),
                kind,
                points,
                length,
                path_length: None,
                start_height: None,
                end_height: None,
                cable_type: None,
                termination_count: None,
            }),
            Action::ZoneDrawComplete { points, area } => {
                self.zones_created += 1;
                Entity::Zone(SupplyZone {
                    id: Uuid::new_v4(),
                    name: format!("Zone {}", self.zones_created),
                    points,
                    color: DEFAULT_ZONE_COLOR.to_owned(),
                    area,
                })
            }
            Action::ContainmentDrawComplete { kind, points, length } => {
                Entity::Containment(Containment { id: Uuid::new_v4(), kind, size: String::new(), points, length })
            }
            Action::RoofMaskDrawComplete { points, area } => Entity::RoofMask(RoofMask {
                id: Uuid::new_v4(),
                points,
                pitch: self.roof_pitch,
                direction: None,
                area,
            }),
            _ => return,
        };
        tracing::debug!(id = %entity.id(), "persisted");
        self.core.apply_upsert(entity);
    }
}
