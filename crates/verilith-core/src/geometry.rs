use serde::{Deserialize, Serialize};

use crate::error::GeometryError;

/// A layout coordinate in database units.
///
/// One database unit is 1 nm (0.001 µm), the manufacturing grid used
/// throughout: all boolean and metric operations produce results on this
/// grid.
pub type Coord = i64;

/// Database units per micrometer.
pub const DBU_PER_UM: Coord = 1000;

/// Largest coordinate magnitude the kernel accepts. Derived quantities
/// (areas, cross products) of in-range coordinates fit in `i128`.
pub const MAX_COORD: Coord = 1 << 42;

/// Convert micrometers to database units, rounding to the grid.
pub fn um(value: f64) -> Coord {
    (value * DBU_PER_UM as f64).round() as Coord
}

/// Convert database units to micrometers.
pub fn to_um(value: Coord) -> f64 {
    value as f64 / DBU_PER_UM as f64
}

/// Convert a dbu² quantity to µm².
pub fn to_um2(value: i128) -> f64 {
    value as f64 / (DBU_PER_UM as f64 * DBU_PER_UM as f64)
}

/// Validate that a coordinate is on the representable grid range.
pub fn check_coord(value: Coord) -> Result<Coord, GeometryError> {
    if value.abs() > MAX_COORD {
        Err(GeometryError::CoordinateRange(value))
    } else {
        Ok(value)
    }
}

/// A 2D point in layout coordinates (database units).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct Point {
    pub x: Coord,
    pub y: Coord,
}

impl Point {
    pub const fn new(x: Coord, y: Coord) -> Self {
        Self { x, y }
    }

    pub const fn zero() -> Self {
        Self { x: 0, y: 0 }
    }

    pub fn translate(&self, dx: Coord, dy: Coord) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Euclidean distance in database units.
    pub fn distance_to(&self, other: &Point) -> f64 {
        let dx = (self.x - other.x) as f64;
        let dy = (self.y - other.y) as f64;
        (dx * dx + dy * dy).sqrt()
    }
}

impl std::ops::Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Cross product of (a - o) × (b - o), exact in i128.
///
/// Positive when `o → a → b` turns counterclockwise.
pub fn cross(o: Point, a: Point, b: Point) -> i128 {
    let ax = (a.x - o.x) as i128;
    let ay = (a.y - o.y) as i128;
    let bx = (b.x - o.x) as i128;
    let by = (b.y - o.y) as i128;
    ax * by - ay * bx
}

/// Dot product of (a - o) · (b - o), exact in i128.
pub fn dot(o: Point, a: Point, b: Point) -> i128 {
    let ax = (a.x - o.x) as i128;
    let ay = (a.y - o.y) as i128;
    let bx = (b.x - o.x) as i128;
    let by = (b.y - o.y) as i128;
    ax * bx + ay * by
}

/// An axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BBox {
    pub min: Point,
    pub max: Point,
}

impl BBox {
    pub fn new(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    pub fn from_points(points: &[Point]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let mut min_x = Coord::MAX;
        let mut min_y = Coord::MAX;
        let mut max_x = Coord::MIN;
        let mut max_y = Coord::MIN;
        for p in points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(Self {
            min: Point::new(min_x, min_y),
            max: Point::new(max_x, max_y),
        })
    }

    pub fn width(&self) -> Coord {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> Coord {
        self.max.y - self.min.y
    }

    pub fn area(&self) -> i128 {
        self.width() as i128 * self.height() as i128
    }

    pub fn center(&self) -> Point {
        Point::new((self.min.x + self.max.x) / 2, (self.min.y + self.max.y) / 2)
    }

    pub fn contains_point(&self, p: &Point) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn intersects(&self, other: &BBox) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    pub fn union(&self, other: &BBox) -> Self {
        Self {
            min: Point::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            max: Point::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        }
    }

    /// Inflate the box by `margin` on all sides.
    pub fn expanded(&self, margin: Coord) -> Self {
        Self {
            min: Point::new(self.min.x - margin, self.min.y - margin),
            max: Point::new(self.max.x + margin, self.max.y + margin),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_um_roundtrip() {
        assert_eq!(um(0.23), 230);
        assert_eq!(um(1.0), 1000);
        assert!((to_um(1700) - 1.7).abs() < 1e-12);
    }

    #[test]
    fn test_point_distance() {
        let a = Point::new(0, 0);
        let b = Point::new(3000, 4000);
        assert!((a.distance_to(&b) - 5000.0).abs() < 1e-9);
    }

    #[test]
    fn test_cross_orientation() {
        let o = Point::new(0, 0);
        let a = Point::new(10, 0);
        let b = Point::new(0, 10);
        assert!(cross(o, a, b) > 0);
        assert!(cross(o, b, a) < 0);
    }

    #[test]
    fn test_bbox_intersection() {
        let a = BBox::new(Point::new(0, 0), Point::new(10, 10));
        let b = BBox::new(Point::new(5, 5), Point::new(15, 15));
        let c = BBox::new(Point::new(20, 20), Point::new(30, 30));
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn test_coord_range_check() {
        assert!(check_coord(MAX_COORD).is_ok());
        assert!(check_coord(MAX_COORD + 1).is_err());
        assert!(check_coord(-(MAX_COORD + 1)).is_err());
    }
}
