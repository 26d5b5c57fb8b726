use std::fmt;
use std::ops::{Add, Mul, Sub};

use rstar::PointDistance;
use serde::{Deserialize, Serialize};

/// Tolerance used when deciding whether a point sits on a rectangle edge.
pub const EDGE_EPSILON: f64 = 1e-6;

/// Tolerance used by the inclusive segment intersection test.
pub const SEGMENT_EPSILON: f64 = 1e-4;

pub trait PointLike {
    fn x(&self) -> f64;
    fn y(&self) -> f64;

    fn as_point(&self) -> Point {
        Point {
            x: self.x(),
            y: self.y(),
        }
    }
}

pub trait BoundingBox {
    fn bounds(&self) -> Bounds;

    fn center(&self) -> Point {
        self.bounds().center()
    }
}

#[derive(Clone, Debug, PartialEq, Copy, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, other: Point) -> Point {
        Point {
            x: self.x - other.x,
            y: self.y - other.y,
        }
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, other: Point) -> Point {
        Point {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }
}

impl Mul<f64> for Point {
    type Output = Point;

    fn mul(self, factor: f64) -> Point {
        Point {
            x: self.x * factor,
            y: self.y * factor,
        }
    }
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }

    pub fn distance_sq(&self, other: &Point) -> f64 {
        let x_diff = self.x - other.x;
        let y_diff = self.y - other.y;
        x_diff * x_diff + y_diff * y_diff
    }

    pub fn distance(&self, other: &Point) -> f64 {
        self.distance_sq(other).sqrt()
    }

    pub fn length_as_vector(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Unit vector in the same direction, or `None` for a (near) zero vector.
    pub fn normalized(&self) -> Option<Point> {
        let len = self.length_as_vector();
        if len <= f64::EPSILON {
            return None;
        }
        Some(Point {
            x: self.x / len,
            y: self.y / len,
        })
    }

    pub fn midpoint(&self, other: &Point) -> Point {
        Point {
            x: (self.x + other.x) / 2.0,
            y: (self.y + other.y) / 2.0,
        }
    }

    /// Counter-clockwise perpendicular.
    pub fn perpendicular(&self) -> Point {
        Point {
            x: -self.y,
            y: self.x,
        }
    }

    pub fn approx_eq(&self, other: &Point, tolerance: f64) -> bool {
        (self.x - other.x).abs() < tolerance && (self.y - other.y).abs() < tolerance
    }
}

impl PointLike for Point {
    fn x(&self) -> f64 {
        self.x
    }

    fn y(&self) -> f64 {
        self.y
    }
}

impl rstar::Point for Point {
    type Scalar = f64;
    const DIMENSIONS: usize = 2;

    fn generate(mut generator: impl FnMut(usize) -> Self::Scalar) -> Self {
        Point {
            x: generator(0),
            y: generator(1),
        }
    }

    fn nth(&self, index: usize) -> Self::Scalar {
        match index {
            0 => self.x,
            1 => self.y,
            _ => unreachable!("points are two dimensional"),
        }
    }

    fn nth_mut(&mut self, index: usize) -> &mut Self::Scalar {
        match index {
            0 => &mut self.x,
            1 => &mut self.y,
            _ => unreachable!("points are two dimensional"),
        }
    }
}

/// Axis aligned rectangle. `max_y` is the top edge.
#[derive(Clone, Debug, PartialEq, Copy, Serialize, Deserialize)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub const fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Bounds {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    pub fn from_center(center: Point, width: f64, height: f64) -> Self {
        Bounds {
            min_x: center.x - width / 2.0,
            min_y: center.y - height / 2.0,
            max_x: center.x + width / 2.0,
            max_y: center.y + height / 2.0,
        }
    }

    /// Smallest bounds containing every point, `None` for an empty iterator.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bounds = Bounds::new(first.x, first.y, first.x, first.y);
        for point in iter {
            bounds.min_x = bounds.min_x.min(point.x);
            bounds.min_y = bounds.min_y.min(point.y);
            bounds.max_x = bounds.max_x.max(point.x);
            bounds.max_y = bounds.max_y.max(point.y);
        }
        Some(bounds)
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn center(&self) -> Point {
        Point {
            x: (self.min_x + self.max_x) / 2.0,
            y: (self.min_y + self.max_y) / 2.0,
        }
    }

    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    pub fn contains(&self, point: &Point, tolerance: f64) -> bool {
        point.x >= self.min_x - tolerance
            && point.x <= self.max_x + tolerance
            && point.y >= self.min_y - tolerance
            && point.y <= self.max_y + tolerance
    }

    /// True when `self` fits inside `outer` grown by `tolerance` on every side.
    pub fn is_within(&self, outer: &Bounds, tolerance: f64) -> bool {
        self.min_x >= outer.min_x - tolerance
            && self.min_y >= outer.min_y - tolerance
            && self.max_x <= outer.max_x + tolerance
            && self.max_y <= outer.max_y + tolerance
    }

    /// Squared distance from a point to the rectangle, zero inside.
    pub fn distance_sq_to(&self, point: &Point) -> f64 {
        let dx = (self.min_x - point.x).max(0.0).max(point.x - self.max_x);
        let dy = (self.min_y - point.y).max(0.0).max(point.y - self.max_y);
        dx * dx + dy * dy
    }
}

impl BoundingBox for Bounds {
    fn bounds(&self) -> Bounds {
        *self
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({:.2}, {:.2}, {:.2}, {:.2})",
            self.min_x, self.min_y, self.max_x, self.max_y
        )
    }
}

#[derive(Clone, Debug, PartialEq, Copy, Serialize, Deserialize)]
pub struct Segment {
    pub start: Point,
    pub end: Point,
}

impl Segment {
    pub const fn new(start: Point, end: Point) -> Self {
        Segment { start, end }
    }

    pub fn length(&self) -> f64 {
        self.start.distance(&self.end)
    }

    pub fn closest_point(&self, point: &Point) -> Point {
        closest_point_on_segment(point, &self.start, &self.end)
    }

    pub fn distance_to(&self, point: &Point) -> f64 {
        point.distance(&self.closest_point(point))
    }

    pub fn intersects(&self, other: &Segment) -> bool {
        segments_intersect(&self.start, &self.end, &other.start, &other.end)
    }
}

impl PointDistance for Segment {
    fn distance_2(&self, point: &Point) -> f64 {
        point.distance_sq(&self.closest_point(point))
    }
}

impl rstar::RTreeObject for Segment {
    type Envelope = rstar::AABB<Point>;

    fn envelope(&self) -> Self::Envelope {
        rstar::AABB::from_corners(self.start, self.end)
    }
}

pub fn closest_point_on_segment(point: &Point, a: &Point, b: &Point) -> Point {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return *a;
    }
    let t = (((point.x - a.x) * dx + (point.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    Point {
        x: a.x + t * dx,
        y: a.y + t * dy,
    }
}

/// Signed area of the triangle `a`, `b`, `c` (orientation of `c` relative to `a -> b`).
pub fn direction(a: &Point, b: &Point, c: &Point) -> f64 {
    (c.x - a.x) * (b.y - a.y) - (b.x - a.x) * (c.y - a.y)
}

fn on_segment(a: &Point, b: &Point, c: &Point) -> bool {
    c.x >= a.x.min(b.x) - SEGMENT_EPSILON
        && c.x <= a.x.max(b.x) + SEGMENT_EPSILON
        && c.y >= a.y.min(b.y) - SEGMENT_EPSILON
        && c.y <= a.y.max(b.y) + SEGMENT_EPSILON
}

/// Segment intersection with boundary inclusion: touching and collinear overlap count.
pub fn segments_intersect(a1: &Point, a2: &Point, b1: &Point, b2: &Point) -> bool {
    let d1 = direction(b1, b2, a1);
    let d2 = direction(b1, b2, a2);
    let d3 = direction(a1, a2, b1);
    let d4 = direction(a1, a2, b2);

    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }

    (d1.abs() < SEGMENT_EPSILON && on_segment(b1, b2, a1))
        || (d2.abs() < SEGMENT_EPSILON && on_segment(b1, b2, a2))
        || (d3.abs() < SEGMENT_EPSILON && on_segment(a1, a2, b1))
        || (d4.abs() < SEGMENT_EPSILON && on_segment(a1, a2, b2))
}

/// Proper crossing point of two segments, excluding points within `1e-6` of either
/// segment's ends. Parallel segments never produce a point.
pub fn segment_crossing_point(p1: &Point, p2: &Point, p3: &Point, p4: &Point) -> Option<Point> {
    let d1 = *p2 - *p1;
    let d2 = *p4 - *p3;
    let cross = d1.x * d2.y - d1.y * d2.x;
    if cross.abs() < 1e-10 {
        return None;
    }

    let offset = *p3 - *p1;
    let t = (offset.x * d2.y - offset.y * d2.x) / cross;
    let u = (offset.x * d1.y - offset.y * d1.x) / cross;

    let epsilon = 1e-6;
    if t > epsilon && t < 1.0 - epsilon && u > epsilon && u < 1.0 - epsilon {
        Some(*p1 + d1 * t)
    } else {
        None
    }
}
