//! Edge and corner analysis: angle and length filters, corner detection,
//! edge extension probes, and off-grid vertex checks.

use verilith_core::geometry::{Coord, Point};
use verilith_core::{Edge, Polygon, Region};

use crate::error::DrcError;

/// A set of boundary edges selected from a region.
#[derive(Debug, Clone, Default)]
pub struct EdgeSet {
    edges: Vec<Edge>,
}

impl EdgeSet {
    pub fn from_region(region: &Region) -> Result<Self, DrcError> {
        Ok(Self {
            edges: region.edges()?,
        })
    }

    pub fn new(edges: Vec<Edge>) -> Self {
        Self { edges }
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter()
    }

    pub fn into_edges(self) -> Vec<Edge> {
        self.edges
    }

    /// Edges whose orientation lies in [`min_deg`, `max_deg`) within the
    /// [0°, 180°) axis range. `with_angle(0.0, 45.0)` keeps everything
    /// shallower than the 45° diagonal, the deck's acute-angle screen.
    pub fn with_angle(&self, min_deg: f64, max_deg: f64) -> Result<EdgeSet, DrcError> {
        if min_deg > max_deg {
            return Err(DrcError::config(format!(
                "angle filter {min_deg}..{max_deg} is inverted"
            )));
        }
        Ok(EdgeSet::new(
            self.edges
                .iter()
                .filter(|e| {
                    let a = e.orientation_deg();
                    a >= min_deg && a < max_deg
                })
                .copied()
                .collect(),
        ))
    }

    /// Edges whose length lies in the given dbu interval; `None` leaves
    /// that side unbounded. Minimum inclusive, maximum exclusive.
    pub fn with_length(
        &self,
        min: Option<Coord>,
        max: Option<Coord>,
    ) -> Result<EdgeSet, DrcError> {
        if let (Some(lo), Some(hi)) = (min, max) {
            if lo > hi {
                return Err(DrcError::config(format!(
                    "length filter {lo}..{hi} is inverted"
                )));
            }
        }
        Ok(EdgeSet::new(
            self.edges
                .iter()
                .filter(|e| {
                    let l = e.length();
                    min.map_or(true, |m| l >= m as f64) && max.map_or(true, |m| l < m as f64)
                })
                .copied()
                .collect(),
        ))
    }

    /// Edges entirely inside the region (endpoints and midpoint).
    pub fn inside(&self, region: &Region) -> EdgeSet {
        EdgeSet::new(
            self.edges
                .iter()
                .filter(|e| {
                    region.contains_point(&e.p1)
                        && region.contains_point(&e.p2)
                        && region.contains_point(&e.midpoint())
                })
                .copied()
                .collect(),
        )
    }

    pub fn not_inside(&self, region: &Region) -> EdgeSet {
        EdgeSet::new(
            self.edges
                .iter()
                .filter(|e| {
                    !(region.contains_point(&e.p1)
                        && region.contains_point(&e.p2)
                        && region.contains_point(&e.midpoint()))
                })
                .copied()
                .collect(),
        )
    }

    /// Thicken edges into probe polygons: `begin`/`end` extend along the
    /// edge direction before the start and past the end; `outside`/
    /// `inside` extend perpendicular (interior of the source region is on
    /// the edge's left, which is the `inside` direction).
    pub fn extended(
        &self,
        begin: Coord,
        end: Coord,
        outside: Coord,
        inside: Coord,
    ) -> Result<Region, DrcError> {
        let mut pieces = Vec::with_capacity(self.edges.len());
        for e in &self.edges {
            let len = e.length();
            if len == 0.0 {
                continue;
            }
            let dx = e.dx() as f64 / len;
            let dy = e.dy() as f64 / len;
            // Left normal of (dx, dy).
            let (nx, ny) = (-dy, dx);
            let a = (
                e.p1.x as f64 - dx * begin as f64,
                e.p1.y as f64 - dy * begin as f64,
            );
            let b = (
                e.p2.x as f64 + dx * end as f64,
                e.p2.y as f64 + dy * end as f64,
            );
            let corner = |base: (f64, f64), n_scale: f64| {
                Point::new(
                    (base.0 + nx * n_scale).round() as Coord,
                    (base.1 + ny * n_scale).round() as Coord,
                )
            };
            let quad = Polygon::new(vec![
                corner(a, inside as f64),
                corner(b, inside as f64),
                corner(b, -(outside as f64)),
                corner(a, -(outside as f64)),
            ]);
            if quad.area_x2() > 0 {
                pieces.push(quad);
            }
        }
        Ok(Region::from_polygons(pieces)?)
    }
}

/// A set of marker points (corner locations, off-grid vertices).
#[derive(Debug, Clone, Default)]
pub struct PointSet {
    points: Vec<Point>,
}

impl PointSet {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Point> {
        self.points.iter()
    }

    /// Square markers of half-size `half` around each point, as a region
    /// usable in boolean and output operations.
    pub fn markers(&self, half: Coord) -> Result<Region, DrcError> {
        let half = half.max(1);
        Ok(Region::from_polygons(
            self.points
                .iter()
                .map(|p| Polygon::rect(p.x - half, p.y - half, p.x + half, p.y + half))
                .collect(),
        )?)
    }
}

/// Vertices where the boundary turns by an angle in [`min_deg`,
/// `max_deg`] (inclusive). Turn angles are signed: positive turns left
/// (convex on outer rings), negative turns right. `corners(region, 90.0,
/// 90.0)` finds exact right-angle convex corners.
pub fn corners(region: &Region, min_deg: f64, max_deg: f64) -> Result<PointSet, DrcError> {
    if min_deg > max_deg {
        return Err(DrcError::config(format!(
            "corner filter {min_deg}..{max_deg} is inverted"
        )));
    }
    let mut points = Vec::new();
    for poly in region.merged()?.polygons() {
        for ring in poly.rings() {
            let n = ring.len();
            for i in 0..n {
                let prev = ring[(i + n - 1) % n];
                let cur = ring[i];
                let next = ring[(i + 1) % n];
                let turn = turn_angle_deg(prev, cur, next);
                if turn >= min_deg && turn <= max_deg {
                    points.push(cur);
                }
            }
        }
    }
    Ok(PointSet::new(points))
}

fn turn_angle_deg(prev: Point, cur: Point, next: Point) -> f64 {
    let ax = (cur.x - prev.x) as f64;
    let ay = (cur.y - prev.y) as f64;
    let bx = (next.x - cur.x) as f64;
    let by = (next.y - cur.y) as f64;
    let cross_v = ax * by - ay * bx;
    let dot_v = ax * bx + ay * by;
    cross_v.atan2(dot_v).to_degrees()
}

/// Vertices not on the given manufacturing grid.
pub fn off_grid(region: &Region, grid: Coord) -> Result<PointSet, DrcError> {
    if grid <= 0 {
        return Err(DrcError::config(format!("invalid grid {grid} dbu")));
    }
    let mut points = Vec::new();
    for poly in region.polygons() {
        for ring in poly.rings() {
            for p in ring {
                if p.x % grid != 0 || p.y % grid != 0 {
                    points.push(*p);
                }
            }
        }
    }
    points.sort();
    points.dedup();
    Ok(PointSet::new(points))
}

#[cfg(test)]
mod tests {
    use super::*;
    use verilith_core::geometry::um;

    fn l_shape() -> Region {
        Region::from_polygons(vec![Polygon::new(vec![
            Point::new(0, 0),
            Point::new(2000, 0),
            Point::new(2000, 500),
            Point::new(500, 500),
            Point::new(500, 2000),
            Point::new(0, 2000),
        ])])
        .unwrap()
    }

    #[test]
    fn test_with_angle_selects_diagonals() {
        let tri = Region::from_polygons(vec![Polygon::new(vec![
            Point::new(0, 0),
            Point::new(1000, 0),
            Point::new(0, 1000),
        ])])
        .unwrap();
        let edges = EdgeSet::from_region(&tri).unwrap();
        assert_eq!(edges.len(), 3);
        let diag = edges.with_angle(100.0, 170.0).unwrap();
        assert_eq!(diag.len(), 1, "only the 135° hypotenuse");
        let ortho = edges.with_angle(0.0, 1.0).unwrap();
        assert_eq!(ortho.len(), 1, "only the horizontal edge");
    }

    #[test]
    fn test_with_length_bounds() {
        let edges = EdgeSet::from_region(&l_shape()).unwrap();
        let short = edges.with_length(None, Some(600)).unwrap();
        assert_eq!(short.len(), 2, "two 500 dbu stubs");
        let unbounded = edges.with_length(Some(0), None).unwrap();
        assert_eq!(unbounded.len(), edges.len());
        assert!(edges.with_length(Some(10), Some(5)).is_err());
    }

    #[test]
    fn test_corners_signed_angles() {
        let l = l_shape();
        let convex = corners(&l, 90.0, 90.0).unwrap();
        assert_eq!(convex.len(), 5);
        let reflex = corners(&l, -90.0, -90.0).unwrap();
        assert_eq!(reflex.len(), 1);
        assert_eq!(reflex.iter().next(), Some(&Point::new(500, 500)));
    }

    #[test]
    fn test_corner_markers_land_inside_layer() {
        let l = l_shape();
        let reflex = corners(&l, -90.0, -90.0).unwrap();
        let markers = reflex.markers(um(0.005)).unwrap();
        assert_eq!(markers.count(), 1);
        assert!(!markers.and(&l).unwrap().is_empty());
    }

    #[test]
    fn test_extended_probe_reaches_neighbor() {
        // Extend the right-side edge of a bar outward far enough to cross
        // a neighbor and use it as an interaction probe.
        let bar = Region::rect(0, 0, 1000, 1000);
        let neighbor = Region::rect(1200, 0, 2000, 1000);
        let edges = EdgeSet::from_region(&bar).unwrap().with_angle(90.0, 91.0).unwrap();
        assert_eq!(edges.len(), 2);
        let probes = edges.extended(0, 0, 300, 1).unwrap();
        assert!(!probes.and(&neighbor).unwrap().is_empty());
        let thin = edges.extended(0, 0, 1, 1).unwrap();
        assert!(thin.and(&neighbor).unwrap().is_empty());
    }

    #[test]
    fn test_edges_inside_region() {
        let window = Region::rect(-100, -100, 1100, 500);
        let edges = EdgeSet::from_region(&Region::rect(0, 0, 1000, 1000)).unwrap();
        let inside = edges.inside(&window);
        assert_eq!(inside.len(), 1, "only the bottom edge fits the window");
        assert_eq!(edges.not_inside(&window).len(), 3);
    }

    #[test]
    fn test_off_grid_vertices() {
        let grid = um(0.005);
        let clean = Region::rect(0, 0, um(1.0), um(1.0));
        assert!(off_grid(&clean, grid).unwrap().is_empty());
        let dirty = Region::from_raw(vec![Polygon::rect(0, 0, um(1.0) + 3, um(1.0))]);
        let bad = off_grid(&dirty, grid).unwrap();
        assert_eq!(bad.len(), 2, "both right-side vertices sit off grid");
        assert!(off_grid(&clean, 0).is_err());
    }
}
