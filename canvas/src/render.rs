//! Rendering: paints a [`Scene`] onto a 2D context.
//!
//! This module is the only place that touches [`web_sys::CanvasRenderingContext2d`].
//! It walks the display list built by [`crate::scene::build`] in order and
//! produces pixels; it does not mutate any application state.
//!
//! All fallible `Canvas2D` calls propagate errors via `Result<(), JsValue>`.
//! The top-level caller ([`crate::engine::Engine::render`]) handles the result.

use std::f64::consts::PI;

use wasm_bindgen::JsValue;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use crate::camera::ViewState;
use crate::geometry::Point;
use crate::scale::TextMeasure;
use crate::scene::{Align, Fill, Paint, Scene, Size, Stroke};

const FONT_FAMILY: &str = "system-ui, sans-serif";

/// Paint `scene` for the current view.
///
/// `viewport_w` and `viewport_h` are in CSS pixels. `dpr` is the device pixel
/// ratio. `background` is the rendered document page, drawn wherever the
/// scene asks for it.
///
/// # Errors
///
/// Returns `Err` if any `Canvas2D` call fails (e.g. invalid context state).
pub fn draw(
    ctx: &CanvasRenderingContext2d,
    scene: &Scene,
    view: &ViewState,
    background: Option<&HtmlCanvasElement>,
    viewport_w: f64,
    viewport_h: f64,
    dpr: f64,
) -> Result<(), JsValue> {
    ctx.set_transform(dpr, 0.0, 0.0, dpr, 0.0, 0.0)?;
    ctx.clear_rect(0.0, 0.0, viewport_w, viewport_h);
    ctx.translate(view.offset.x, view.offset.y)?;
    ctx.scale(view.zoom, view.zoom)?;

    for (_, paint) in scene.items() {
        match paint {
            Paint::Background { width, height } => {
                if let Some(bg) = background {
                    ctx.draw_image_with_html_canvas_element_and_dw_and_dh(bg, 0.0, 0.0, *width, *height)?;
                }
            }
            Paint::Path { points, closed, stroke, fill } => {
                draw_path(ctx, points, *closed, stroke.as_ref(), fill.as_ref(), view.zoom)?;
            }
            Paint::Circle { center, radius, stroke, fill } => {
                draw_circle(ctx, *center, radius.world(view.zoom), stroke.as_ref(), fill.as_ref(), view.zoom)?;
            }
            Paint::Text { at, text, size, color, align } => {
                draw_text(ctx, *at, text, size.world(view.zoom), color, *align)?;
            }
        }
    }
    Ok(())
}

// =============================================================
// Primitives
// =============================================================

fn draw_path(
    ctx: &CanvasRenderingContext2d,
    points: &[Point],
    closed: bool,
    stroke: Option<&Stroke>,
    fill: Option<&Fill>,
    zoom: f64,
) -> Result<(), JsValue> {
    let Some((first, rest)) = points.split_first() else {
        return Ok(());
    };
    ctx.begin_path();
    ctx.move_to(first.x, first.y);
    for p in rest {
        ctx.line_to(p.x, p.y);
    }
    if closed {
        ctx.close_path();
    }
    if let Some(f) = fill {
        apply_fill(ctx, f);
        ctx.fill();
        ctx.set_global_alpha(1.0);
    }
    if let Some(s) = stroke {
        apply_stroke(ctx, s, zoom)?;
        ctx.stroke();
        ctx.set_line_dash(&js_sys::Array::new())?;
    }
    Ok(())
}

fn draw_circle(
    ctx: &CanvasRenderingContext2d,
    center: Point,
    radius: f64,
    stroke: Option<&Stroke>,
    fill: Option<&Fill>,
    zoom: f64,
) -> Result<(), JsValue> {
    ctx.begin_path();
    ctx.arc(center.x, center.y, radius, 0.0, 2.0 * PI)?;
    if let Some(f) = fill {
        apply_fill(ctx, f);
        ctx.fill();
        ctx.set_global_alpha(1.0);
    }
    if let Some(s) = stroke {
        apply_stroke(ctx, s, zoom)?;
        ctx.stroke();
        ctx.set_line_dash(&js_sys::Array::new())?;
    }
    Ok(())
}

fn draw_text(
    ctx: &CanvasRenderingContext2d,
    at: Point,
    text: &str,
    font_size: f64,
    color: &str,
    align: Align,
) -> Result<(), JsValue> {
    ctx.set_font(&font(font_size));
    ctx.set_fill_style_str(color);
    ctx.set_text_baseline("middle");
    ctx.set_text_align(match align {
        Align::Left => "left",
        Align::Center => "center",
    });
    ctx.fill_text(text, at.x, at.y)
}

// =============================================================
// Helpers
// =============================================================

fn font(size: f64) -> String {
    format!("{size}px {FONT_FAMILY}")
}

fn apply_fill(ctx: &CanvasRenderingContext2d, fill: &Fill) {
    ctx.set_global_alpha(fill.alpha);
    ctx.set_fill_style_str(&fill.color);
}

/// Stroke colour, width and dash; screen sizes are divided by the zoom
/// because the context is already scaled.
fn apply_stroke(ctx: &CanvasRenderingContext2d, stroke: &Stroke, zoom: f64) -> Result<(), JsValue> {
    ctx.set_stroke_style_str(&stroke.color);
    ctx.set_line_width(stroke.width.world(zoom));
    let dash = js_sys::Array::new();
    for d in &stroke.dash {
        dash.push(&Size::Screen(*d).world(zoom).into());
    }
    ctx.set_line_dash(&dash)
}

impl TextMeasure for CanvasRenderingContext2d {
    fn text_width(&self, text: &str, font_px: f64) -> f64 {
        self.set_font(&font(font_px));
        self.measure_text(text).map_or(0.0, |m| m.width())
    }
}
