//! Geometry primitives shared by every other module.
//!
//! All coordinates are `f32`. Unless stated otherwise, points and rectangles
//! live in *flow space* (the unzoomed diagram plane); [`Transform`] maps flow
//! space to *screen space* with `screen = flow * zoom + translate`.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Sub};

/// A 2D point or vector.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f32 {
        ((other.x - self.x).powi(2) + (other.y - self.y).powi(2)).sqrt()
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Point {
    type Output = Point;
    fn mul(self, rhs: f32) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

impl From<(f32, f32)> for Point {
    fn from((x, y): (f32, f32)) -> Self {
        Point::new(x, y)
    }
}

/// Width and height of a box.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: f32,
    pub height: f32,
}

impl Dimensions {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// True if either side is zero, negative or not a number.
    pub fn is_degenerate(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    pub fn area(&self) -> f32 {
        self.width * self.height
    }
}

/// Axis-aligned rectangle given by its top-left corner and size.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn from_position(position: Point, dimensions: Dimensions) -> Self {
        Self::new(position.x, position.y, dimensions.width, dimensions.height)
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn to_box(&self) -> BoundingBox {
        BoundingBox {
            x: self.x,
            y: self.y,
            x2: self.x + self.width,
            y2: self.y + self.height,
        }
    }

    /// Smallest rectangle containing both `self` and `other`.
    pub fn union(&self, other: &Rect) -> Rect {
        self.to_box().union(&other.to_box()).to_rect()
    }

    /// Inclusive point containment.
    pub fn contains_point(&self, point: Point) -> bool {
        point.x >= self.x
            && point.x <= self.x + self.width
            && point.y >= self.y
            && point.y <= self.y + self.height
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        get_overlapping_area(self, other) > 0.0
    }
}

/// Rectangle given by two corners; convenient for unions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    /// The empty box; the identity for [`BoundingBox::union`].
    pub const EMPTY: BoundingBox = BoundingBox {
        x: f32::INFINITY,
        y: f32::INFINITY,
        x2: f32::NEG_INFINITY,
        y2: f32::NEG_INFINITY,
    };

    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            x: self.x.min(other.x),
            y: self.y.min(other.y),
            x2: self.x2.max(other.x2),
            y2: self.y2.max(other.y2),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.x > self.x2 || self.y > self.y2
    }

    pub fn to_rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.x2 - self.x, self.y2 - self.y)
    }
}

/// Union of all rectangles, or `None` for an empty input.
pub fn get_bounds_of_rects<'a, I>(rects: I) -> Option<Rect>
where
    I: IntoIterator<Item = &'a Rect>,
{
    let bounds = rects
        .into_iter()
        .fold(BoundingBox::EMPTY, |acc, rect| acc.union(&rect.to_box()));
    (!bounds.is_empty()).then(|| bounds.to_rect())
}

/// Area of the intersection of two rectangles (0 when disjoint).
pub fn get_overlapping_area(a: &Rect, b: &Rect) -> f32 {
    let x_overlap = ((a.x + a.width).min(b.x + b.width) - a.x.max(b.x)).max(0.0);
    let y_overlap = ((a.y + a.height).min(b.y + b.height) - a.y.max(b.y)).max(0.0);
    x_overlap * y_overlap
}

/// A clamp region `[min, max]`. Either bound may be infinite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoordinateExtent {
    pub min: Point,
    pub max: Point,
}

impl CoordinateExtent {
    pub const INFINITE: CoordinateExtent = CoordinateExtent {
        min: Point::new(f32::NEG_INFINITY, f32::NEG_INFINITY),
        max: Point::new(f32::INFINITY, f32::INFINITY),
    };

    pub const fn new(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    pub fn from_rect(rect: &Rect) -> Self {
        Self::new(
            rect.position(),
            Point::new(rect.x + rect.width, rect.y + rect.height),
        )
    }

    pub fn translate(&self, offset: Point) -> Self {
        Self::new(self.min + offset, self.max + offset)
    }
}

impl Default for CoordinateExtent {
    fn default() -> Self {
        Self::INFINITE
    }
}

/// Clamps `value` to `[min, max]`; tolerates an inverted range by preferring `min`.
pub fn clamp(value: f32, min: f32, max: f32) -> f32 {
    value.min(max).max(min)
}

/// Clamps a box's top-left `position` so the box of size `dimensions` stays in `extent`.
pub fn clamp_position(position: Point, extent: &CoordinateExtent, dimensions: Dimensions) -> Point {
    Point::new(
        clamp(position.x, extent.min.x, extent.max.x - dimensions.width),
        clamp(position.y, extent.min.y, extent.max.y - dimensions.height),
    )
}

/// The pan/zoom transform `[translateX, translateY, zoom]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub x: f32,
    pub y: f32,
    pub zoom: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Transform = Transform { x: 0.0, y: 0.0, zoom: 1.0 };

    pub const fn new(x: f32, y: f32, zoom: f32) -> Self {
        Self { x, y, zoom }
    }

    /// Flow space to screen space.
    pub fn apply(&self, point: Point) -> Point {
        Point::new(point.x * self.zoom + self.x, point.y * self.zoom + self.y)
    }

    /// Screen space to flow space.
    pub fn invert(&self, point: Point) -> Point {
        let zoom = self.safe_zoom();
        Point::new((point.x - self.x) / zoom, (point.y - self.y) / zoom)
    }

    pub fn apply_rect(&self, rect: &Rect) -> Rect {
        let position = self.apply(rect.position());
        Rect::new(position.x, position.y, rect.width * self.zoom, rect.height * self.zoom)
    }

    pub fn invert_rect(&self, rect: &Rect) -> Rect {
        let zoom = self.safe_zoom();
        let position = self.invert(rect.position());
        Rect::new(position.x, position.y, rect.width / zoom, rect.height / zoom)
    }

    /// CSS `transform` value for the viewport element.
    pub fn to_css(&self) -> String {
        format!("translate({}px,{}px) scale({})", self.x, self.y, self.zoom)
    }

    /// Linear interpolation between two transforms, `t` in `[0, 1]`.
    pub fn lerp(&self, to: &Transform, t: f32) -> Transform {
        let t = t.clamp(0.0, 1.0);
        Transform::new(
            self.x + (to.x - self.x) * t,
            self.y + (to.y - self.y) * t,
            self.zoom + (to.zoom - self.zoom) * t,
        )
    }

    fn safe_zoom(&self) -> f32 {
        if self.zoom > 0.0 {
            self.zoom
        } else {
            1.0
        }
    }
}

/// Screen rectangle (e.g. a marquee) converted to a flow-space rectangle.
pub fn rect_to_flow_rect(rect: &Rect, transform: &Transform) -> Rect {
    transform.invert_rect(rect)
}

/// Approximate float comparison used by callers that compare derived geometry.
pub fn approx_eq(a: f32, b: f32, tolerance: f32) -> bool {
    (a - b).abs() <= tolerance
}
