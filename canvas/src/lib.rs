//! Canvas engine for the electrical/PV plan markup editor.
//!
//! This crate is compiled to WebAssembly and runs in the browser. It owns the
//! interactive layer drawn over a rendered document page: translating raw DOM
//! input events into plan edits, maintaining view state for pan/zoom,
//! hit-testing entities, snapping PV arrays, and painting the scene. The host
//! application owns persistence and hands every entity array to the engine;
//! the engine proposes changes back as [`engine::Action`]s.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Top-level engine and testable [`engine::EngineCore`] |
//! | [`doc`] | Plan entity types and the in-memory mirror of host arrays |
//! | [`commit`] | Optimistic drag overlay and debounced commits |
//! | [`camera`] | Pan/zoom view state and coordinate conversions |
//! | [`input`] | Tools, input event types, and the manipulation state machine |
//! | [`draw`] | Vertex accumulation and the roof-direction gesture |
//! | [`hit`] | Hit-testing against entities and the scale label |
//! | [`pv`] | PV array footprints, auto-rotation, and snapping |
//! | [`scale`] | Scale calibration and the scale label box |
//! | [`scene`] | Display list built from engine state |
//! | [`render`] | Paints a scene onto a 2D canvas context |
//! | [`style`] | Colours, glyphs, and dash patterns per entity type |
//! | [`geometry`] | Points, bounds, and plane geometry |
//! | [`config`] | Tunable thresholds and limits |
//! | [`error`] | Recoverable gesture faults |
//! | [`consts`] | Default values for [`config::EngineConfig`] |

pub mod camera;
pub mod commit;
pub mod config;
pub mod consts;
pub mod doc;
pub mod draw;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod hit;
pub mod input;
pub mod pv;
pub mod render;
pub mod scale;
pub mod scene;
pub mod style;
