//! Pan/zoom viewport.
//!
//! [`Viewport`] owns the single authoritative [`Transform`]. Every mutation
//! goes through [`Viewport::constrain`], so zoom always stays within
//! `[min_zoom, max_zoom]` and the visible area never leaves the translate
//! extent. Smooth transitions are driven by [`Viewport::tick`]; any new
//! command cancels an in-flight transition.

use crate::error::{FlowIssue, IssueKind};
use crate::geometry::{clamp, CoordinateExtent, Dimensions, Point, Rect, Transform};
use crate::grid::{snap_position, SnapGrid};
use serde::{Deserialize, Serialize};

/// Default auto-pan speed in screen pixels per frame.
pub const DEFAULT_AUTO_PAN_SPEED: f32 = 15.0;
/// Distance from the container edge at which auto-pan kicks in.
pub const DEFAULT_AUTO_PAN_DISTANCE: f32 = 40.0;

/// Partial viewport update; unset fields keep their current value.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ViewportPatch {
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub zoom: Option<f32>,
}

impl From<Transform> for ViewportPatch {
    fn from(t: Transform) -> Self {
        Self {
            x: Some(t.x),
            y: Some(t.y),
            zoom: Some(t.zoom),
        }
    }
}

/// Unit of wheel deltas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeltaMode {
    #[default]
    Pixel,
    Line,
    Page,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WheelEvent {
    /// Pointer position relative to the container.
    pub position: Point,
    pub delta: Point,
    pub delta_mode: DeltaMode,
    /// Ctrl or meta held; also set by trackpad pinch gestures.
    pub ctrl_key: bool,
    pub shift_key: bool,
}

/// How wheel input is interpreted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelOptions {
    pub zoom_on_scroll: bool,
    pub zoom_on_pinch: bool,
    pub pan_on_scroll: bool,
    pub pan_on_scroll_speed: f32,
}

impl Default for WheelOptions {
    fn default() -> Self {
        Self {
            zoom_on_scroll: true,
            zoom_on_pinch: true,
            pan_on_scroll: false,
            pan_on_scroll_speed: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Animation {
    from: Transform,
    to: Transform,
    duration_ms: f64,
    started_at: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    transform: Transform,
    min_zoom: f32,
    max_zoom: f32,
    translate_extent: CoordinateExtent,
    container: Dimensions,
    animation: Option<Animation>,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(Transform::IDENTITY, 0.5, 2.0, CoordinateExtent::INFINITE)
    }
}

impl Viewport {
    pub fn new(transform: Transform, min_zoom: f32, max_zoom: f32, translate_extent: CoordinateExtent) -> Self {
        let mut viewport = Self {
            transform,
            min_zoom,
            max_zoom,
            translate_extent,
            container: Dimensions::new(500.0, 500.0),
            animation: None,
        };
        viewport.transform = viewport.constrain(transform);
        viewport
    }

    pub fn transform(&self) -> Transform {
        self.transform
    }

    pub fn zoom(&self) -> f32 {
        self.transform.zoom
    }

    pub fn container(&self) -> Dimensions {
        self.container
    }

    pub fn zoom_bounds(&self) -> (f32, f32) {
        (self.min_zoom, self.max_zoom)
    }

    pub fn set_zoom_bounds(&mut self, min_zoom: f32, max_zoom: f32) {
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        self.transform = self.constrain(self.transform);
    }

    pub fn set_translate_extent(&mut self, extent: CoordinateExtent) {
        self.translate_extent = extent;
        self.transform = self.constrain(self.transform);
    }

    /// Records the container size.
    ///
    /// A zero-sized container is replaced by `fallback` and reported as
    /// `DegenerateInput`.
    pub fn set_container_size(&mut self, size: Dimensions, fallback: Dimensions) -> Option<FlowIssue> {
        if size.is_degenerate() {
            self.container = fallback;
            self.transform = self.constrain(self.transform);
            return Some(FlowIssue::new(
                IssueKind::DegenerateInput,
                format!(
                    "viewport container has size {}x{}, using {}x{}",
                    size.width, size.height, fallback.width, fallback.height
                ),
            ));
        }
        self.container = size;
        self.transform = self.constrain(self.transform);
        None
    }

    // ========================================================================
    // Coordinate conversion
    // ========================================================================

    /// Screen (container-relative) point to flow space, optionally snapped.
    pub fn screen_to_flow(&self, point: Point, snap: Option<SnapGrid>) -> Point {
        let flow = self.transform.invert(point);
        match snap {
            Some(grid) => snap_position(flow, grid),
            None => flow,
        }
    }

    pub fn flow_to_screen(&self, point: Point) -> Point {
        self.transform.apply(point)
    }

    /// Flow-space rectangle currently visible in the container.
    pub fn visible_flow_rect(&self) -> Rect {
        self.transform.invert_rect(&Rect::new(0.0, 0.0, self.container.width, self.container.height))
    }

    // ========================================================================
    // Constraints
    // ========================================================================

    /// Clamps zoom and keeps the container inside the translate extent.
    pub fn constrain(&self, transform: Transform) -> Transform {
        let zoom = clamp(transform.zoom, self.min_zoom, self.max_zoom);
        let t = Transform::new(transform.x, transform.y, zoom);

        let extent = &self.translate_extent;
        let dx0 = t.invert(Point::ZERO).x - extent.min.x;
        let dx1 = t.invert(Point::new(self.container.width, 0.0)).x - extent.max.x;
        let dy0 = t.invert(Point::ZERO).y - extent.min.y;
        let dy1 = t.invert(Point::new(0.0, self.container.height)).y - extent.max.y;

        let shift = |d0: f32, d1: f32| {
            if d1 > d0 {
                (d0 + d1) / 2.0
            } else {
                let low = d0.min(0.0);
                if low != 0.0 {
                    low
                } else {
                    d1.max(0.0)
                }
            }
        };
        let (sx, sy) = (shift(dx0, dx1), shift(dy0, dy1));
        Transform::new(t.x + zoom * sx, t.y + zoom * sy, zoom)
    }

    fn commit(&mut self, transform: Transform) -> bool {
        self.animation = None;
        let constrained = self.constrain(transform);
        let changed = constrained != self.transform;
        self.transform = constrained;
        changed
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Pans by a screen-space delta. Returns `true` if the transform changed.
    pub fn pan_by(&mut self, delta: Point) -> bool {
        let t = self.transform;
        self.commit(Transform::new(t.x + delta.x, t.y + delta.y, t.zoom))
    }

    /// Multiplies zoom by `factor`, keeping the flow point under `anchor`
    /// (screen space, default: container center) fixed.
    pub fn scale_by(&mut self, factor: f32, anchor: Option<Point>) -> bool {
        self.scale_to(self.transform.zoom * factor, anchor)
    }

    pub fn scale_to(&mut self, zoom: f32, anchor: Option<Point>) -> bool {
        let anchor = anchor.unwrap_or(Point::new(self.container.width / 2.0, self.container.height / 2.0));
        let zoom = clamp(zoom, self.min_zoom, self.max_zoom);
        let flow = self.transform.invert(anchor);
        self.commit(Transform::new(anchor.x - flow.x * zoom, anchor.y - flow.y * zoom, zoom))
    }

    /// Moves to `patch`, immediately or over `duration_ms`.
    ///
    /// Animated moves start on the next [`tick`](Self::tick). Returns `true`
    /// if the transform changed immediately.
    pub fn set_viewport(&mut self, patch: ViewportPatch, duration_ms: f64) -> bool {
        let current = self.transform;
        let target = Transform::new(
            patch.x.unwrap_or(current.x),
            patch.y.unwrap_or(current.y),
            patch.zoom.unwrap_or(current.zoom),
        );
        if duration_ms <= 0.0 {
            return self.commit(target);
        }
        self.animation = Some(Animation {
            from: current,
            to: self.constrain(target),
            duration_ms,
            started_at: None,
        });
        tracing::debug!(duration_ms, "viewport transition started");
        false
    }

    /// Advances an in-flight transition. Returns `true` if the transform changed.
    pub fn tick(&mut self, now_ms: f64) -> bool {
        let Some(animation) = self.animation.as_mut() else {
            return false;
        };
        let started_at = *animation.started_at.get_or_insert(now_ms);
        let t = ((now_ms - started_at) / animation.duration_ms).clamp(0.0, 1.0);
        let next = animation.from.lerp(&animation.to, t as f32);
        if t >= 1.0 {
            self.animation = None;
        }
        let changed = next != self.transform;
        self.transform = next;
        changed
    }

    pub fn is_animating(&self) -> bool {
        self.animation.is_some()
    }

    /// Stops an in-flight transition where it is.
    pub fn cancel_animation(&mut self) {
        if self.animation.take().is_some() {
            tracing::debug!("viewport transition cancelled");
        }
    }

    /// Applies a wheel event. Returns `true` if the transform changed.
    pub fn handle_wheel(&mut self, event: &WheelEvent, options: &WheelOptions) -> bool {
        if event.ctrl_key {
            if !options.zoom_on_pinch {
                return false;
            }
            return self.scale_by(wheel_zoom_factor(event), Some(event.position));
        }

        if options.pan_on_scroll {
            let normalize = if event.delta_mode == DeltaMode::Line { 20.0 } else { 1.0 };
            let (mut dx, mut dy) = (event.delta.x * normalize, event.delta.y * normalize);
            if event.shift_key {
                dx = dy;
                dy = 0.0;
            }
            let speed = options.pan_on_scroll_speed;
            return self.pan_by(Point::new(-dx * speed, -dy * speed));
        }

        if options.zoom_on_scroll {
            return self.scale_by(wheel_zoom_factor(event), Some(event.position));
        }
        false
    }

    /// Fits `bounds` (flow space) into the container.
    ///
    /// Returns whether the transform changed, plus a `DegenerateInput` issue
    /// when `bounds` has no area.
    pub fn fit_bounds(&mut self, bounds: &Rect, padding: f32, duration_ms: f64) -> (bool, Option<FlowIssue>) {
        let issue = Dimensions::new(bounds.width, bounds.height).is_degenerate().then(|| {
            FlowIssue::new(
                IssueKind::DegenerateInput,
                format!("fit bounds have size {}x{}", bounds.width, bounds.height),
            )
        });
        let target = viewport_for_bounds(bounds, self.container, self.min_zoom, self.max_zoom, padding);
        (self.set_viewport(target.into(), duration_ms), issue)
    }
}

/// Zoom multiplier for one wheel event: `2^(-deltaY * unit * (ctrl ? 10 : 1))`.
pub fn wheel_zoom_factor(event: &WheelEvent) -> f32 {
    let unit = match event.delta_mode {
        DeltaMode::Pixel => 0.002,
        DeltaMode::Line => 0.05,
        DeltaMode::Page => 1.0,
    };
    let pinch = if event.ctrl_key { 10.0 } else { 1.0 };
    2f32.powf(-event.delta.y * unit * pinch)
}

/// Transform showing `bounds` centered in `container` with relative `padding`.
///
/// An axis without extent does not limit the zoom. Bounds without any extent
/// are centered at zoom 1 (clamped to the zoom bounds).
pub fn viewport_for_bounds(
    bounds: &Rect,
    container: Dimensions,
    min_zoom: f32,
    max_zoom: f32,
    padding: f32,
) -> Transform {
    let axis_zoom = |space: f32, extent: f32| {
        if extent > 0.0 {
            space / (extent * (1.0 + padding))
        } else {
            f32::INFINITY
        }
    };
    let fitted = axis_zoom(container.width, bounds.width).min(axis_zoom(container.height, bounds.height));
    let zoom = clamp(if fitted.is_finite() { fitted } else { 1.0 }, min_zoom, max_zoom);
    let center = bounds.center();
    Transform::new(
        container.width / 2.0 - center.x * zoom,
        container.height / 2.0 - center.y * zoom,
        zoom,
    )
}

fn auto_pan_velocity(value: f32, min: f32, max: f32) -> f32 {
    if value < min {
        clamp((value - min).abs(), 1.0, min) / min
    } else if value > max {
        -clamp((value - max).abs(), 1.0, min) / min
    } else {
        0.0
    }
}

/// Screen-space pan step while the pointer is within `distance` of an edge.
///
/// Positive values pan the content right/down (pointer near the left/top edge).
pub fn calc_auto_pan(pointer: Point, container: Dimensions, speed: f32, distance: f32) -> Point {
    Point::new(
        auto_pan_velocity(pointer.x, distance, container.width - distance) * speed,
        auto_pan_velocity(pointer.y, distance, container.height - distance) * speed,
    )
}
