//! Shared numeric constants for the canvas crate.

// ── View ────────────────────────────────────────────────────────

/// Lower zoom clamp.
pub const MIN_ZOOM: f64 = 0.1;

/// Upper zoom clamp.
pub const MAX_ZOOM: f64 = 20.0;

/// Fraction of the viewport a jumped-to entity should fill.
pub const JUMP_FILL: f64 = 0.8;

/// Zoom cap when jumping to small entities.
pub const JUMP_MAX_ZOOM: f64 = 4.0;

/// Side length in world units used when jumping to a point-like entity.
pub const JUMP_MIN_EXTENT: f64 = 40.0;

/// Wheel delta to zoom exponent factor.
pub const WHEEL_SENSITIVITY: f64 = 0.0015;

// ── Hit-testing ─────────────────────────────────────────────────

/// Screen-space radius of vertex and label handles.
pub const HANDLE_RADIUS_PX: f64 = 7.0;

/// Screen-space proximity for selecting thin polylines.
pub const LINE_HIT_PX: f64 = 8.0;

/// Screen-space radius around the first vertex that closes a polygon.
pub const CLOSE_THRESHOLD_PX: f64 = 10.0;

// ── Snapping ────────────────────────────────────────────────────

/// Screen-space search radius for PV array and walkway snapping.
pub const SNAP_THRESHOLD_PX: f64 = 15.0;

/// Gap in metres between adjacent-edge snapped PV arrays.
pub const PV_GAP_M: f64 = 0.02;

// ── Commit ──────────────────────────────────────────────────────

/// Debounce window for authoritative writes during a drag (one frame).
pub const DEBOUNCE_MS: f64 = 16.0;

// ── Scale label ─────────────────────────────────────────────────

/// Minimum label box width in world units.
pub const LABEL_MIN_WIDTH: f64 = 50.0;

/// Minimum label box height in world units.
pub const LABEL_MIN_HEIGHT: f64 = 30.0;

/// Label font size in world units.
pub const LABEL_FONT_PX: f64 = 12.0;

/// Inner padding of the label box in world units.
pub const LABEL_PADDING: f64 = 6.0;

// ── Equipment ───────────────────────────────────────────────────

/// Real-world footprint of an equipment symbol in metres.
pub const EQUIPMENT_SIZE_M: f64 = 0.6;

/// Equipment symbol radius in world units while the scale is uncalibrated.
pub const EQUIPMENT_FALLBACK_PX: f64 = 12.0;
