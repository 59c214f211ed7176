//! Edge path geometry.
//!
//! Every variant is a pure function of the two handle endpoints, their facing
//! sides and a few options. The result is an SVG path command string plus the
//! label anchor and a polyline approximation used for hit testing.

use crate::geometry::Point;
use crate::node::Position;
use serde::{Deserialize, Serialize};

/// Default bezier curvature.
pub const DEFAULT_CURVATURE: f32 = 0.25;
/// Default corner radius of smooth step edges.
pub const DEFAULT_BORDER_RADIUS: f32 = 5.0;
/// Default distance step edges keep from their handles before the first turn.
pub const DEFAULT_STEP_OFFSET: f32 = 20.0;

const POLYLINE_SAMPLES: usize = 20;

/// Curve family of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathVariant {
    Straight,
    Bezier,
    SimpleBezier,
    Step,
    SmoothStep,
}

/// Variant-specific knobs. Fields a variant does not use are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PathOptions {
    pub curvature: f32,
    pub border_radius: f32,
    pub offset: f32,
    /// Overrides the split point of step edges between opposite handles.
    pub center: Option<Point>,
}

impl Default for PathOptions {
    fn default() -> Self {
        Self {
            curvature: DEFAULT_CURVATURE,
            border_radius: DEFAULT_BORDER_RADIUS,
            offset: DEFAULT_STEP_OFFSET,
            center: None,
        }
    }
}

/// Two resolved handle endpoints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Endpoints {
    pub source: Point,
    pub source_position: Position,
    pub target: Point,
    pub target_position: Position,
}

impl Endpoints {
    pub fn new(source: Point, source_position: Position, target: Point, target_position: Position) -> Self {
        Self {
            source,
            source_position,
            target,
            target_position,
        }
    }
}

/// Output of [`compute_path`].
#[derive(Debug, Clone, PartialEq)]
pub struct EdgePath {
    /// SVG path command, e.g. `"M 0 0 C 50 0 50 100 100 100"`.
    pub path: String,
    pub label: Point,
    /// Approximation of the rendered curve, first point is the source.
    pub polyline: Vec<Point>,
}

/// Computes the path of one edge.
///
/// # Arguments
/// * `variant` - Curve family
/// * `endpoints` - Source and target points with their facing sides
/// * `options` - Curvature, corner radius and step offset
///
/// # Returns
/// The path string, starting exactly at the source and ending exactly at the
/// target, plus its label anchor.
pub fn compute_path(variant: PathVariant, endpoints: &Endpoints, options: &PathOptions) -> EdgePath {
    match variant {
        PathVariant::Straight => straight_path(endpoints),
        PathVariant::Bezier => {
            let bezier = CubicBezier::with_curvature(endpoints, options.curvature);
            bezier_edge(&bezier)
        }
        PathVariant::SimpleBezier => bezier_edge(&CubicBezier::simple(endpoints)),
        PathVariant::Step => step_path(endpoints, 0.0, options.offset, options.center),
        PathVariant::SmoothStep => {
            step_path(endpoints, options.border_radius, options.offset, options.center)
        }
    }
}

fn straight_path(endpoints: &Endpoints) -> EdgePath {
    let Endpoints { source: s, target: t, .. } = *endpoints;
    EdgePath {
        path: format!("M {} {} L {} {}", s.x, s.y, t.x, t.y),
        label: Point::new((s.x + t.x) / 2.0, (s.y + t.y) / 2.0),
        polyline: vec![s, t],
    }
}

fn bezier_edge(bezier: &CubicBezier) -> EdgePath {
    EdgePath {
        path: bezier.to_path(),
        label: bezier.label_point(),
        polyline: bezier.sample(POLYLINE_SAMPLES),
    }
}

/// Distance of a bezier control point from its endpoint.
///
/// `distance` is measured along the handle's facing direction; a positive value
/// means the other endpoint lies ahead of the handle.
fn control_offset(distance: f32, curvature: f32) -> f32 {
    if distance >= 0.0 {
        0.5 * distance
    } else {
        curvature * 25.0 * (-distance).sqrt()
    }
}

fn control_with_curvature(position: Position, from: Point, to: Point, curvature: f32) -> Point {
    match position {
        Position::Left => Point::new(from.x - control_offset(from.x - to.x, curvature), from.y),
        Position::Right => Point::new(from.x + control_offset(to.x - from.x, curvature), from.y),
        Position::Top => Point::new(from.x, from.y - control_offset(from.y - to.y, curvature)),
        Position::Bottom => Point::new(from.x, from.y + control_offset(to.y - from.y, curvature)),
    }
}

/// Cubic bezier curve, used for path output and distance calculations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicBezier {
    pub p0: Point, // Start point
    pub p1: Point, // Control point 1
    pub p2: Point, // Control point 2
    pub p3: Point, // End point
}

impl CubicBezier {
    /// Bezier whose control points extend along each handle's facing axis.
    pub fn with_curvature(endpoints: &Endpoints, curvature: f32) -> Self {
        Self {
            p0: endpoints.source,
            p1: control_with_curvature(endpoints.source_position, endpoints.source, endpoints.target, curvature),
            p2: control_with_curvature(endpoints.target_position, endpoints.target, endpoints.source, curvature),
            p3: endpoints.target,
        }
    }

    /// Flatter bezier whose control points sit halfway along the facing axis.
    pub fn simple(endpoints: &Endpoints) -> Self {
        let control = |position: Position, from: Point, to: Point| {
            if position.is_horizontal() {
                Point::new(0.5 * (from.x + to.x), from.y)
            } else {
                Point::new(from.x, 0.5 * (from.y + to.y))
            }
        };
        Self {
            p0: endpoints.source,
            p1: control(endpoints.source_position, endpoints.source, endpoints.target),
            p2: control(endpoints.target_position, endpoints.target, endpoints.source),
            p3: endpoints.target,
        }
    }

    /// Evaluate the bezier curve at parameter t (0.0 to 1.0)
    pub fn eval(&self, t: f32) -> Point {
        let t2 = t * t;
        let t3 = t2 * t;
        let mt = 1.0 - t;
        let mt2 = mt * mt;
        let mt3 = mt2 * mt;

        let x = mt3 * self.p0.x + 3.0 * mt2 * t * self.p1.x + 3.0 * mt * t2 * self.p2.x + t3 * self.p3.x;
        let y = mt3 * self.p0.y + 3.0 * mt2 * t * self.p1.y + 3.0 * mt * t2 * self.p2.y + t3 * self.p3.y;

        Point::new(x, y)
    }

    /// Point at t = 0.5 from the Bernstein weights.
    pub fn label_point(&self) -> Point {
        Point::new(
            self.p0.x * 0.125 + self.p1.x * 0.375 + self.p2.x * 0.375 + self.p3.x * 0.125,
            self.p0.y * 0.125 + self.p1.y * 0.375 + self.p2.y * 0.375 + self.p3.y * 0.125,
        )
    }

    pub fn to_path(&self) -> String {
        format!(
            "M {} {} C {} {} {} {} {} {}",
            self.p0.x, self.p0.y, self.p1.x, self.p1.y, self.p2.x, self.p2.y, self.p3.x, self.p3.y
        )
    }

    /// `samples + 1` points along the curve, endpoints included.
    pub fn sample(&self, samples: usize) -> Vec<Point> {
        let samples = samples.max(1);
        (0..=samples)
            .map(|i| self.eval(i as f32 / samples as f32))
            .collect()
    }
}

/// Calculate squared distance from a point to a line segment
fn distance_to_line_segment_sq(point: Point, a: Point, b: Point) -> f32 {
    let ab = b - a;
    let ap = point - a;

    let ab_len_sq = ab.x * ab.x + ab.y * ab.y;

    if ab_len_sq < f32::EPSILON {
        // Degenerate segment (a == b)
        return ap.x * ap.x + ap.y * ap.y;
    }

    // Project point onto line, clamped to segment
    let t = ((ap.x * ab.x + ap.y * ab.y) / ab_len_sq).clamp(0.0, 1.0);
    let closest = a + ab * t;

    let d = point - closest;
    d.x * d.x + d.y * d.y
}

/// Minimum distance from a point to an open polyline.
///
/// Returns `f32::MAX` for an empty polyline.
pub fn distance_to_polyline(point: Point, polyline: &[Point]) -> f32 {
    match polyline {
        [] => f32::MAX,
        [only] => point.distance(*only),
        _ => polyline
            .windows(2)
            .map(|w| distance_to_line_segment_sq(point, w[0], w[1]))
            .fold(f32::MAX, f32::min)
            .sqrt(),
    }
}

/// Calculate the minimum distance from a point to a cubic bezier curve
///
/// Uses subdivision approach: sample curve at regular intervals and find closest point.
///
/// # Arguments
/// * `point` - The point to measure distance from
/// * `bezier` - The bezier curve
/// * `num_samples` - Number of samples for distance calculation (default: 20)
pub fn distance_to_bezier(point: Point, bezier: &CubicBezier, num_samples: usize) -> f32 {
    let num_samples = if num_samples == 0 { POLYLINE_SAMPLES } else { num_samples };
    distance_to_polyline(point, &bezier.sample(num_samples))
}

// ============================================================================
// Step / smooth step
// ============================================================================

/// Axis-aligned direction the route leaves the source in.
fn step_direction(source: Point, source_position: Position, target: Point) -> Point {
    if source_position.is_horizontal() {
        if source.x < target.x {
            Point::new(1.0, 0.0)
        } else {
            Point::new(-1.0, 0.0)
        }
    } else if source.y < target.y {
        Point::new(0.0, 1.0)
    } else {
        Point::new(0.0, -1.0)
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Axis {
    X,
    Y,
}

impl Axis {
    fn of(self, p: Point) -> f32 {
        match self {
            Axis::X => p.x,
            Axis::Y => p.y,
        }
    }

    fn other(self) -> Axis {
        match self {
            Axis::X => Axis::Y,
            Axis::Y => Axis::X,
        }
    }

    fn set(self, p: &mut Point, value: f32) {
        match self {
            Axis::X => p.x = value,
            Axis::Y => p.y = value,
        }
    }
}

/// Corner points of an orthogonal route, excluding the endpoints.
///
/// Returns the full point list `[source, source gap, bends.., target gap, target]`
/// and the index range of the bends.
fn step_points(endpoints: &Endpoints, offset: f32, center: Option<Point>) -> (Vec<Point>, usize) {
    let Endpoints {
        source,
        source_position,
        target,
        target_position,
    } = *endpoints;

    let source_dir = source_position.direction();
    let target_dir = target_position.direction();
    let source_gapped = source + source_dir * offset;
    let target_gapped = target + target_dir * offset;

    let dir = step_direction(source_gapped, source_position, target_gapped);
    let axis = if dir.x != 0.0 { Axis::X } else { Axis::Y };
    let current = axis.of(dir);

    let mut source_gap_offset = Point::ZERO;
    let mut target_gap_offset = Point::ZERO;

    let bends: Vec<Point> = if axis.of(source_dir) * axis.of(target_dir) == -1.0 {
        // Handles face each other along the route axis: split through the center.
        let default_center = Point::new((source.x + target.x) / 2.0, (source.y + target.y) / 2.0);
        let center = center.unwrap_or(default_center);
        let vertical_split = vec![
            Point::new(center.x, source_gapped.y),
            Point::new(center.x, target_gapped.y),
        ];
        let horizontal_split = vec![
            Point::new(source_gapped.x, center.y),
            Point::new(target_gapped.x, center.y),
        ];
        let along_route = axis.of(source_dir) == current;
        match (along_route, axis) {
            (true, Axis::X) | (false, Axis::Y) => vertical_split,
            (true, Axis::Y) | (false, Axis::X) => horizontal_split,
        }
    } else {
        // One corner: x from source and y from target, or the reverse.
        let source_target = vec![Point::new(source_gapped.x, target_gapped.y)];
        let target_source = vec![Point::new(target_gapped.x, source_gapped.y)];
        let mut bends = match axis {
            Axis::X if source_dir.x == current => target_source.clone(),
            Axis::X => source_target.clone(),
            Axis::Y if source_dir.y == current => source_target.clone(),
            Axis::Y => target_source.clone(),
        };

        if source_position == target_position {
            // Same-facing handles closer than the offset would fold back on themselves.
            let diff = (axis.of(source) - axis.of(target)).abs();
            if diff <= offset {
                let gap = (offset - 1.0).min(offset - diff);
                if axis.of(source_dir) == current {
                    let sign = if axis.of(source_gapped) > axis.of(source) { -1.0 } else { 1.0 };
                    axis.set(&mut source_gap_offset, sign * gap);
                } else {
                    let sign = if axis.of(target_gapped) > axis.of(target) { -1.0 } else { 1.0 };
                    axis.set(&mut target_gap_offset, sign * gap);
                }
            }
        } else {
            let other = axis.other();
            let same_dir = axis.of(source_dir) == other.of(target_dir);
            let source_gt = other.of(source_gapped) > other.of(target_gapped);
            let source_lt = other.of(source_gapped) < other.of(target_gapped);
            let flip = if axis.of(source_dir) == 1.0 {
                (!same_dir && source_gt) || (same_dir && source_lt)
            } else {
                (!same_dir && source_lt) || (same_dir && source_gt)
            };
            if flip {
                bends = match axis {
                    Axis::X => source_target,
                    Axis::Y => target_source,
                };
            }
        }
        bends
    };

    let bend_count = bends.len();
    let mut points = Vec::with_capacity(bend_count + 4);
    points.push(source);
    points.push(source_gapped + source_gap_offset);
    points.extend(bends);
    points.push(target_gapped + target_gap_offset);
    points.push(target);
    (points, bend_count)
}

/// Path command for the corner at `b` between segments `a-b` and `b-c`.
fn bend(a: Point, b: Point, c: Point, radius: f32) -> String {
    let size = (a.distance(b) / 2.0).min(b.distance(c) / 2.0).min(radius);
    let Point { x, y } = b;

    if (a.x == x && x == c.x) || (a.y == y && y == c.y) || size <= 0.0 {
        return format!(" L {} {}", x, y);
    }

    if a.y == y {
        // First segment is horizontal.
        let x_dir = if a.x < c.x { -1.0 } else { 1.0 };
        let y_dir = if a.y < c.y { 1.0 } else { -1.0 };
        return format!(
            " L {} {} Q {} {} {} {}",
            x + size * x_dir,
            y,
            x,
            y,
            x,
            y + size * y_dir
        );
    }

    let x_dir = if a.x < c.x { 1.0 } else { -1.0 };
    let y_dir = if a.y < c.y { -1.0 } else { 1.0 };
    format!(
        " L {} {} Q {} {} {} {}",
        x,
        y + size * y_dir,
        x,
        y,
        x + size * x_dir,
        y
    )
}

fn step_path(endpoints: &Endpoints, border_radius: f32, offset: f32, center: Option<Point>) -> EdgePath {
    let (points, bend_count) = step_points(endpoints, offset, center);

    let mut path = format!("M {} {}", points[0].x, points[0].y);
    for i in 1..points.len() {
        if i < points.len() - 1 {
            path.push_str(&bend(points[i - 1], points[i], points[i + 1], border_radius));
        } else {
            path.push_str(&format!(" L {} {}", points[i].x, points[i].y));
        }
    }

    // First bend point; straight gap segments have none.
    let label = if bend_count > 0 {
        points[2]
    } else {
        Point::new(
            (endpoints.source.x + endpoints.target.x) / 2.0,
            (endpoints.source.y + endpoints.target.y) / 2.0,
        )
    };

    EdgePath {
        path,
        label,
        polyline: points,
    }
}
