use serde::{Deserialize, Serialize};

use crate::geometry::{cross, BBox, Coord, Point};

/// An oriented segment on a polygon boundary.
///
/// Edges are emitted with the polygon interior on their left-hand side
/// (outer rings counterclockwise, hole rings clockwise), so side tests
/// against an edge distinguish material from empty space. `polygon` is the
/// index of the owning polygon within its region, for adjacency queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub p1: Point,
    pub p2: Point,
    pub polygon: usize,
}

impl Edge {
    pub fn new(p1: Point, p2: Point, polygon: usize) -> Self {
        Self { p1, p2, polygon }
    }

    pub fn dx(&self) -> Coord {
        self.p2.x - self.p1.x
    }

    pub fn dy(&self) -> Coord {
        self.p2.y - self.p1.y
    }

    pub fn length(&self) -> f64 {
        self.p1.distance_to(&self.p2)
    }

    pub fn midpoint(&self) -> Point {
        Point::new((self.p1.x + self.p2.x) / 2, (self.p1.y + self.p2.y) / 2)
    }

    pub fn bbox(&self) -> BBox {
        BBox::from_points(&[self.p1, self.p2]).expect("edge endpoints")
    }

    /// Orientation of the edge axis in degrees, normalized to [0°, 180°).
    ///
    /// Direction along the edge is ignored: a left-to-right and a
    /// right-to-left horizontal edge both report 0°.
    pub fn orientation_deg(&self) -> f64 {
        let mut a = (self.dy() as f64).atan2(self.dx() as f64).to_degrees();
        if a < 0.0 {
            a += 180.0;
        }
        if a >= 180.0 {
            a -= 180.0;
        }
        a
    }

    /// Sign of `point` relative to the edge direction: positive on the
    /// left (interior) side, negative on the right, zero when collinear.
    pub fn side_of(&self, point: Point) -> i128 {
        cross(self.p1, self.p2, point)
    }

    /// Dot product of the two edge direction vectors.
    pub fn direction_dot(&self, other: &Edge) -> i128 {
        self.dx() as i128 * other.dx() as i128 + self.dy() as i128 * other.dy() as i128
    }

    pub fn shares_endpoint(&self, other: &Edge) -> bool {
        self.p1 == other.p1 || self.p1 == other.p2 || self.p2 == other.p1 || self.p2 == other.p2
    }

    /// The edge reversed, interior flipping to the other side.
    pub fn reversed(&self) -> Edge {
        Edge::new(self.p2, self.p1, self.polygon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orientation() {
        let h = Edge::new(Point::new(0, 0), Point::new(10, 0), 0);
        let h_rev = Edge::new(Point::new(10, 0), Point::new(0, 0), 0);
        let v = Edge::new(Point::new(0, 0), Point::new(0, 10), 0);
        let diag = Edge::new(Point::new(0, 0), Point::new(10, 10), 0);
        assert!((h.orientation_deg() - 0.0).abs() < 1e-9);
        assert!((h_rev.orientation_deg() - 0.0).abs() < 1e-9);
        assert!((v.orientation_deg() - 90.0).abs() < 1e-9);
        assert!((diag.orientation_deg() - 45.0).abs() < 1e-9);
    }

    #[test]
    fn test_side_of() {
        let e = Edge::new(Point::new(0, 0), Point::new(10, 0), 0);
        assert!(e.side_of(Point::new(5, 3)) > 0);
        assert!(e.side_of(Point::new(5, -3)) < 0);
        assert_eq!(e.side_of(Point::new(5, 0)), 0);
    }

    #[test]
    fn test_shares_endpoint() {
        let a = Edge::new(Point::new(0, 0), Point::new(10, 0), 0);
        let b = Edge::new(Point::new(10, 0), Point::new(10, 10), 0);
        let c = Edge::new(Point::new(20, 0), Point::new(30, 0), 0);
        assert!(a.shares_endpoint(&b));
        assert!(!a.shares_endpoint(&c));
    }
}
