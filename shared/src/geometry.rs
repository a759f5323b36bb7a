use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// A 2D position. Used both for intrinsic canvas pixels and for normalized
/// coordinates; `CanvasSize` converts between the two.
#[derive(Serialize, Deserialize, Encode, Decode, Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// The fixed pixel resolution the drawing surface is rasterized at.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct CanvasSize {
    pub width: f64,
    pub height: f64,
}

impl Default for CanvasSize {
    fn default() -> Self {
        Self {
            width: 1920.0,
            height: 1080.0,
        }
    }
}

impl CanvasSize {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_valid(self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    pub fn normalize(self, point: Point) -> Point {
        Point {
            x: point.x / self.width,
            y: point.y / self.height,
        }
    }

    pub fn denormalize(self, point: Point) -> Point {
        Point {
            x: point.x * self.width,
            y: point.y * self.height,
        }
    }

    /// Converts a pixel delta into a normalized delta.
    pub fn normalize_delta(self, dx: f64, dy: f64) -> (f64, f64) {
        (dx / self.width, dy / self.height)
    }
}

/// Axis-aligned box, inclusive on every edge.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            min_x: a.x.min(b.x),
            min_y: a.y.min(b.y),
            max_x: a.x.max(b.x),
            max_y: a.y.max(b.y),
        }
    }

    pub fn from_points(points: &[Point]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut bounds = Self::from_corners(*first, *first);
        for point in rest {
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

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.min_x && point.x <= self.max_x && point.y >= self.min_y && point.y <= self.max_y
    }

    pub fn inflate(self, amount: f64) -> Self {
        Self {
            min_x: self.min_x - amount,
            min_y: self.min_y - amount,
            max_x: self.max_x + amount,
            max_y: self.max_y + amount,
        }
    }
}

pub fn distance(a: Point, b: Point) -> f64 {
    ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
}

pub fn distance_to_segment(point: Point, start: Point, end: Point) -> f64 {
    let dx = end.x - start.x;
    let dy = end.y - start.y;
    if dx.abs() < f64::EPSILON && dy.abs() < f64::EPSILON {
        return distance(point, start);
    }
    let t = ((point.x - start.x) * dx + (point.y - start.y) * dy) / (dx * dx + dy * dy);
    let t = t.clamp(0.0, 1.0);
    distance(point, Point::new(start.x + t * dx, start.y + t * dy))
}

/// Endpoints of the two arrowhead strokes drawn back from `tip`.
pub fn arrowhead(tail: Point, tip: Point, length: f64, spread: f64) -> [Point; 2] {
    let angle = (tip.y - tail.y).atan2(tip.x - tail.x);
    let wing = |offset: f64| {
        Point::new(
            tip.x - length * (angle + offset).cos(),
            tip.y - length * (angle + offset).sin(),
        )
    };
    [wing(-spread), wing(spread)]
}
