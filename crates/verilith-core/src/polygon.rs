use serde::{Deserialize, Serialize};

use crate::edge::Edge;
use crate::geometry::{cross, dot, to_um2, BBox, Coord, Point};

/// A polygon with an outer boundary and zero or more holes.
///
/// Canonical winding: outer counterclockwise, holes clockwise, so that the
/// interior lies to the left of every directed boundary edge. Constructors
/// normalize winding; merged regions guarantee closed, non-self-intersecting
/// rings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Polygon {
    outer: Vec<Point>,
    holes: Vec<Vec<Point>>,
}

impl Polygon {
    /// Create a polygon from an outer ring; winding is normalized to CCW
    /// and consecutive duplicate vertices are dropped.
    pub fn new(outer: Vec<Point>) -> Self {
        Self::with_holes(outer, Vec::new())
    }

    pub fn with_holes(outer: Vec<Point>, holes: Vec<Vec<Point>>) -> Self {
        let mut outer = dedup_ring(outer);
        if ring_area_x2(&outer) < 0 {
            outer.reverse();
        }
        let holes = holes
            .into_iter()
            .map(|h| {
                let mut h = dedup_ring(h);
                if ring_area_x2(&h) > 0 {
                    h.reverse();
                }
                h
            })
            .filter(|h| h.len() >= 3)
            .collect();
        Self { outer, holes }
    }

    /// Axis-aligned rectangle helper.
    pub fn rect(x1: Coord, y1: Coord, x2: Coord, y2: Coord) -> Self {
        let (x1, x2) = (x1.min(x2), x1.max(x2));
        let (y1, y2) = (y1.min(y2), y1.max(y2));
        Self::new(vec![
            Point::new(x1, y1),
            Point::new(x2, y1),
            Point::new(x2, y2),
            Point::new(x1, y2),
        ])
    }

    pub fn outer(&self) -> &[Point] {
        &self.outer
    }

    pub fn holes(&self) -> &[Vec<Point>] {
        &self.holes
    }

    pub fn hole_count(&self) -> usize {
        self.holes.len()
    }

    pub fn vertex_count(&self) -> usize {
        self.outer.len() + self.holes.iter().map(|h| h.len()).sum::<usize>()
    }

    /// All rings: outer first, then holes.
    pub fn rings(&self) -> impl Iterator<Item = &[Point]> {
        std::iter::once(self.outer.as_slice()).chain(self.holes.iter().map(|h| h.as_slice()))
    }

    /// Net doubled area (outer minus holes) in dbu², exact.
    pub fn area_x2(&self) -> i128 {
        let outer = ring_area_x2(&self.outer).abs();
        let holes: i128 = self.holes.iter().map(|h| ring_area_x2(h).abs()).sum();
        outer - holes
    }

    /// Net area in µm².
    pub fn area_um2(&self) -> f64 {
        to_um2(self.area_x2()) / 2.0
    }

    pub fn bbox(&self) -> Option<BBox> {
        BBox::from_points(&self.outer)
    }

    /// Point containment; points on the boundary (outer or hole rings)
    /// count as inside.
    pub fn contains_point(&self, p: &Point) -> bool {
        if !point_in_ring(p, &self.outer) {
            return false;
        }
        for hole in &self.holes {
            if point_in_ring_strict(p, hole) {
                return false;
            }
        }
        true
    }

    /// Boundary edges with the interior on the left; `polygon` is stamped
    /// with the given region-local index.
    pub fn edges(&self, polygon: usize) -> Vec<Edge> {
        let mut out = Vec::with_capacity(self.vertex_count());
        for ring in self.rings() {
            let n = ring.len();
            for i in 0..n {
                out.push(Edge::new(ring[i], ring[(i + 1) % n], polygon));
            }
        }
        out
    }

    pub fn translated(&self, dx: Coord, dy: Coord) -> Self {
        Self {
            outer: self.outer.iter().map(|p| p.translate(dx, dy)).collect(),
            holes: self
                .holes
                .iter()
                .map(|h| h.iter().map(|p| p.translate(dx, dy)).collect())
                .collect(),
        }
    }

    /// The outer boundary with holes discarded.
    pub fn hull(&self) -> Polygon {
        Polygon {
            outer: self.outer.clone(),
            holes: Vec::new(),
        }
    }

    /// True when the two polygons share at least one point (overlap,
    /// touching edges or touching vertices all count).
    pub fn interacts(&self, other: &Polygon) -> bool {
        match (self.bbox(), other.bbox()) {
            (Some(a), Some(b)) if a.intersects(&b) => {}
            _ => return false,
        }
        // Containment without boundary contact.
        if let Some(p) = self.outer.first() {
            if other.contains_point(p) {
                return true;
            }
        }
        if let Some(p) = other.outer.first() {
            if self.contains_point(p) {
                return true;
            }
        }
        for ra in self.rings() {
            for rb in other.rings() {
                let na = ra.len();
                let nb = rb.len();
                for i in 0..na {
                    let (a1, a2) = (ra[i], ra[(i + 1) % na]);
                    for j in 0..nb {
                        let (b1, b2) = (rb[j], rb[(j + 1) % nb]);
                        if segments_intersect(a1, a2, b1, b2) {
                            return true;
                        }
                    }
                }
            }
        }
        false
    }
}

/// Doubled signed area of a ring (shoelace), positive for CCW.
pub fn ring_area_x2(ring: &[Point]) -> i128 {
    let n = ring.len();
    if n < 3 {
        return 0;
    }
    let mut acc: i128 = 0;
    for i in 0..n {
        let a = ring[i];
        let b = ring[(i + 1) % n];
        acc += a.x as i128 * b.y as i128 - b.x as i128 * a.y as i128;
    }
    acc
}

fn dedup_ring(ring: Vec<Point>) -> Vec<Point> {
    let mut out: Vec<Point> = Vec::with_capacity(ring.len());
    for p in ring {
        if out.last() != Some(&p) {
            out.push(p);
        }
    }
    if out.len() > 1 && out.first() == out.last() {
        out.pop();
    }
    out
}

/// True when `p` lies on the closed segment a–b.
pub fn point_on_segment(p: &Point, a: Point, b: Point) -> bool {
    if cross(a, b, *p) != 0 {
        return false;
    }
    dot(*p, a, b) <= 0
}

/// Ray-cast containment; boundary points count as inside.
pub fn point_in_ring(p: &Point, ring: &[Point]) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }
    for i in 0..n {
        if point_on_segment(p, ring[i], ring[(i + 1) % n]) {
            return true;
        }
    }
    point_in_ring_interior(p, ring)
}

/// Containment excluding the boundary.
pub fn point_in_ring_strict(p: &Point, ring: &[Point]) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }
    for i in 0..n {
        if point_on_segment(p, ring[i], ring[(i + 1) % n]) {
            return false;
        }
    }
    point_in_ring_interior(p, ring)
}

// Crossing-number test for a point known not to lie on the boundary.
fn point_in_ring_interior(p: &Point, ring: &[Point]) -> bool {
    let n = ring.len();
    let mut inside = false;
    for i in 0..n {
        let a = ring[i];
        let b = ring[(i + 1) % n];
        if (a.y > p.y) != (b.y > p.y) {
            // x-coordinate where the edge crosses the horizontal through p,
            // compared exactly via cross-multiplication.
            let num = (b.x - a.x) as i128 * (p.y - a.y) as i128;
            let den = (b.y - a.y) as i128;
            let lhs = (p.x - a.x) as i128 * den;
            let crosses = if den > 0 { lhs < num } else { lhs > num };
            if crosses {
                inside = !inside;
            }
        }
    }
    inside
}

/// Segment intersection, including touching endpoints and collinear
/// overlap.
pub fn segments_intersect(a1: Point, a2: Point, b1: Point, b2: Point) -> bool {
    let d1 = cross(b1, b2, a1);
    let d2 = cross(b1, b2, a2);
    let d3 = cross(a1, a2, b1);
    let d4 = cross(a1, a2, b2);

    if ((d1 > 0 && d2 < 0) || (d1 < 0 && d2 > 0)) && ((d3 > 0 && d4 < 0) || (d3 < 0 && d4 > 0)) {
        return true;
    }
    (d1 == 0 && point_on_segment(&a1, b1, b2))
        || (d2 == 0 && point_on_segment(&a2, b1, b2))
        || (d3 == 0 && point_on_segment(&b1, a1, a2))
        || (d4 == 0 && point_on_segment(&b2, a1, a2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_winding_normalized() {
        // Clockwise input gets reversed to CCW.
        let p = Polygon::new(vec![
            Point::new(0, 0),
            Point::new(0, 10),
            Point::new(10, 10),
            Point::new(10, 0),
        ]);
        assert!(ring_area_x2(p.outer()) > 0);
    }

    #[test]
    fn test_rect_area() {
        let p = Polygon::rect(0, 0, 10_000, 5_000);
        assert_eq!(p.area_x2(), 2 * 10_000i128 * 5_000i128);
        assert!((p.area_um2() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_donut_area_and_containment() {
        let outer = Polygon::rect(0, 0, 10_000, 10_000);
        let hole = Polygon::rect(4_000, 4_000, 6_000, 6_000);
        let donut = Polygon::with_holes(outer.outer().to_vec(), vec![hole.outer().to_vec()]);
        assert_eq!(donut.area_x2(), 2 * (100_000_000i128 - 4_000_000i128));
        assert!(donut.contains_point(&Point::new(1_000, 1_000)));
        assert!(!donut.contains_point(&Point::new(5_000, 5_000)));
        // Hole boundary is material boundary.
        assert!(donut.contains_point(&Point::new(4_000, 5_000)));
    }

    #[test]
    fn test_contains_boundary() {
        let p = Polygon::rect(0, 0, 10, 10);
        assert!(p.contains_point(&Point::new(0, 5)));
        assert!(p.contains_point(&Point::new(10, 10)));
        assert!(!p.contains_point(&Point::new(11, 5)));
    }

    #[test]
    fn test_interacts() {
        let a = Polygon::rect(0, 0, 10, 10);
        let b = Polygon::rect(5, 5, 15, 15);
        let c = Polygon::rect(10, 0, 20, 10); // abutting a
        let d = Polygon::rect(30, 30, 40, 40);
        assert!(a.interacts(&b));
        assert!(a.interacts(&c));
        assert!(!a.interacts(&d));
    }

    #[test]
    fn test_edges_interior_left() {
        let p = Polygon::rect(0, 0, 10, 10);
        for e in p.edges(0) {
            assert!(e.side_of(Point::new(5, 5)) > 0, "interior must be left of {e:?}");
        }
    }
}
