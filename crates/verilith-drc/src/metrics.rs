//! Metric operators: width, spacing, separation, enclosure and overlap
//! checks measured between boundary edge pairs.
//!
//! Candidate pairs come from an R-tree over edge bounding boxes inflated
//! by the threshold; orientation filters then keep only pairs that face
//! each other the way the check demands, and the violating sub-segments
//! are extracted per distance metric. Point-to-segment distance along an
//! edge is convex for every supported metric, so sub-segment boundaries
//! are found by bisection and snapped to the grid.

use verilith_core::geometry::{Coord, Point};
use verilith_core::polygon::segments_intersect;
use verilith_core::spatial::{SpatialEntry, SpatialIndex};
use verilith_core::{Edge, Polygon, Region};

use crate::error::DrcError;

/// Distance metric for edge-pair measurements.
///
/// Which metric applies is part of each rule's declared configuration;
/// nothing infers a metric from context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceMetric {
    /// True 2-norm distance.
    Euclidean,
    /// Chebyshev distance: diagonal offsets count by their larger
    /// coordinate difference.
    Square,
    /// Perpendicular distance over the mutually projected extent only;
    /// portions that do not project onto the other edge are ignored.
    Projection,
}

/// A pair of edge portions violating a metric check: the atomic evidence
/// unit before conversion back to polygons.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgePair {
    pub first: Edge,
    pub second: Edge,
    /// Minimum measured distance over the violating portions, in dbu.
    pub distance: f64,
}

/// Ordered list of violating edge pairs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdgePairSet {
    pairs: Vec<EdgePair>,
}

impl EdgePairSet {
    pub fn new(pairs: Vec<EdgePair>) -> Self {
        Self { pairs }
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EdgePair> {
        self.pairs.iter()
    }

    pub fn into_pairs(self) -> Vec<EdgePair> {
        self.pairs
    }

    /// Convert the evidence to a violation region. Degenerate (zero-area)
    /// pairs are inflated by `tol` so touching violations stay visible;
    /// `tol` is typically one database unit per 0.001 µm of tolerance.
    pub fn polygons(&self, tol: Coord) -> Result<Region, DrcError> {
        let half = (tol / 2).max(1);
        let mut pieces = Vec::with_capacity(self.pairs.len());
        for pair in &self.pairs {
            let pts = [pair.first.p1, pair.first.p2, pair.second.p1, pair.second.p2];
            let quad = quad_around(&pts);
            if quad.area_x2() > 0 {
                pieces.push(quad);
            } else if let Some(bb) = verilith_core::BBox::from_points(&pts) {
                let bb = bb.expanded(half);
                pieces.push(Polygon::rect(bb.min.x, bb.min.y, bb.max.x, bb.max.y));
            }
        }
        Ok(Region::from_polygons(pieces)?)
    }
}

/// Order four points angularly around their centroid into a simple quad.
fn quad_around(pts: &[Point; 4]) -> Polygon {
    let cx = pts.iter().map(|p| p.x as f64).sum::<f64>() / 4.0;
    let cy = pts.iter().map(|p| p.y as f64).sum::<f64>() / 4.0;
    let mut ordered = pts.to_vec();
    ordered.sort_by(|a, b| {
        let aa = (a.y as f64 - cy).atan2(a.x as f64 - cx);
        let ab = (b.y as f64 - cy).atan2(b.x as f64 - cx);
        aa.partial_cmp(&ab).unwrap_or(std::cmp::Ordering::Equal)
    });
    Polygon::new(ordered)
}

// ── Checks ───────────────────────────────────────────────────────────

/// Locations where the local width of `region` is below `d`.
pub fn width(region: &Region, d: Coord, metric: DistanceMetric) -> Result<EdgePairSet, DrcError> {
    check_threshold(d)?;
    let edges = region.edges()?;
    scan(&edges, &edges, d, metric, Facing::Inward, Scope::SamePolygon)
}

/// Same-layer gaps below `d`, between and within polygons.
pub fn space(region: &Region, d: Coord, metric: DistanceMetric) -> Result<EdgePairSet, DrcError> {
    check_threshold(d)?;
    let edges = region.edges()?;
    scan(&edges, &edges, d, metric, Facing::Outward, Scope::SameLayer)
}

/// Gaps between distinct polygons only.
pub fn isolated(
    region: &Region,
    d: Coord,
    metric: DistanceMetric,
) -> Result<EdgePairSet, DrcError> {
    check_threshold(d)?;
    let edges = region.edges()?;
    scan(
        &edges,
        &edges,
        d,
        metric,
        Facing::Outward,
        Scope::DifferentPolygon,
    )
}

/// Gaps within a single polygon (notches) only.
pub fn notched(region: &Region, d: Coord, metric: DistanceMetric) -> Result<EdgePairSet, DrcError> {
    check_threshold(d)?;
    let edges = region.edges()?;
    scan(&edges, &edges, d, metric, Facing::Outward, Scope::SamePolygon)
}

/// Cross-layer gaps below `d`. Overlapping portions of `a` and `b` are a
/// different predicate and are not reported here.
pub fn separation(
    a: &Region,
    b: &Region,
    d: Coord,
    metric: DistanceMetric,
) -> Result<EdgePairSet, DrcError> {
    check_threshold(d)?;
    let ea = a.edges()?;
    let eb = b.edges()?;
    scan(&ea, &eb, d, metric, Facing::Outward, Scope::CrossLayer)
}

/// Locations where `a`'s one-sided coverage of `b` is below `d`, for
/// portions of `b` inside `a`. Portions of `b` entirely outside `a` are a
/// containment question; [`enclosure_check`] composes both parts.
pub fn enclosing(
    a: &Region,
    b: &Region,
    d: Coord,
    metric: DistanceMetric,
) -> Result<EdgePairSet, DrcError> {
    check_threshold(d)?;
    let ea = a.edges()?;
    let eb = b.edges()?;
    scan(&ea, &eb, d, metric, Facing::Enclosing, Scope::CrossLayer)
}

/// Locations where the overlap band of `a` and `b` is narrower than `d`.
pub fn overlap(
    a: &Region,
    b: &Region,
    d: Coord,
    metric: DistanceMetric,
) -> Result<EdgePairSet, DrcError> {
    check_threshold(d)?;
    let ea = a.edges()?;
    let eb = b.edges()?;
    scan(&ea, &eb, d, metric, Facing::Inward, Scope::CrossLayer)
}

/// The recurring two-part enclosure idiom as one call: insufficient
/// surround (edge pairs, flattened at `tol`) plus any polygons of `b` not
/// fully inside `a` at all.
pub fn enclosure_check(
    a: &Region,
    b: &Region,
    d: Coord,
    metric: DistanceMetric,
    tol: Coord,
) -> Result<Region, DrcError> {
    let insufficient = enclosing(a, b, d, metric)?.polygons(tol)?;
    let escaped = b.not_inside(a)?;
    Ok(insufficient.or(&escaped)?)
}

fn check_threshold(d: Coord) -> Result<(), DrcError> {
    if d < 0 {
        return Err(DrcError::config(format!(
            "negative metric threshold {d} dbu"
        )));
    }
    Ok(())
}

// ── Pair scanning ────────────────────────────────────────────────────

#[derive(Clone, Copy, PartialEq, Eq)]
enum Facing {
    /// Anti-parallel edges with the measured band interior to both sides
    /// (width, overlap).
    Inward,
    /// Anti-parallel edges with the band exterior to both (space,
    /// separation).
    Outward,
    /// Parallel edges: exterior of the second, interior of the first
    /// (enclosure).
    Enclosing,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Scope {
    SamePolygon,
    DifferentPolygon,
    SameLayer,
    CrossLayer,
}

fn scan(
    first: &[Edge],
    second: &[Edge],
    d: Coord,
    metric: DistanceMetric,
    facing: Facing,
    scope: Scope,
) -> Result<EdgePairSet, DrcError> {
    let index = SpatialIndex::build(
        second
            .iter()
            .enumerate()
            .map(|(i, e)| SpatialEntry {
                item_index: i,
                bbox: e.bbox(),
            })
            .collect(),
    );

    let same_set = !matches!(scope, Scope::CrossLayer);
    let margin = d.max(1);
    let mut pairs = Vec::new();

    for (i, e1) in first.iter().enumerate() {
        let window = e1.bbox().expanded(margin);
        let mut candidates: Vec<usize> = index
            .query_window(&window)
            .into_iter()
            .map(|e| e.item_index)
            .collect();
        candidates.sort_unstable();

        for j in candidates {
            if same_set && j <= i {
                continue;
            }
            let e2 = &second[j];
            match scope {
                Scope::SamePolygon if e1.polygon != e2.polygon => continue,
                Scope::DifferentPolygon if e1.polygon == e2.polygon => continue,
                _ => {}
            }
            if same_set && e1.shares_endpoint(e2) {
                continue; // plain corners are not violations
            }
            if !facing_ok(e1, e2, facing) {
                continue;
            }
            if let Some(pair) = measure(e1, e2, d, metric)? {
                pairs.push(pair);
            }
        }
    }
    Ok(EdgePairSet::new(pairs))
}

fn facing_ok(e1: &Edge, e2: &Edge, facing: Facing) -> bool {
    let dot = e1.direction_dot(e2);
    match facing {
        Facing::Enclosing => {
            if dot <= 0 {
                return false;
            }
        }
        Facing::Inward | Facing::Outward => {
            if dot >= 0 {
                return false;
            }
        }
    }

    let (c1, c2) = closest_points(e1, e2);
    if c1 == c2 {
        // Touching edges: orient by midpoints instead.
        return match facing {
            Facing::Inward => {
                e1.side_of(e2.midpoint()) >= 0 && e2.side_of(e1.midpoint()) >= 0
            }
            Facing::Outward => {
                e1.side_of(e2.midpoint()) <= 0 && e2.side_of(e1.midpoint()) <= 0
            }
            Facing::Enclosing => e1.side_of(e2.midpoint()) >= 0,
        };
    }
    // v runs from e1's closest point toward e2's.
    let v = c2 - c1;
    let side1 = cross2(e1.dx(), e1.dy(), v.x, v.y);
    let side2 = cross2(e2.dx(), e2.dy(), -v.x, -v.y);
    match facing {
        Facing::Inward => side1 > 0 && side2 > 0,
        Facing::Outward => side1 < 0 && side2 < 0,
        // v points from the enclosed edge (e2) to the enclosing boundary
        // (e1): exterior side of e2, interior side of e1.
        Facing::Enclosing => {
            let out_of_b = cross2(e2.dx(), e2.dy(), c1.x - c2.x, c1.y - c2.y) < 0;
            let into_a = cross2(e1.dx(), e1.dy(), -(c1.x - c2.x), -(c1.y - c2.y)) > 0;
            out_of_b && into_a
        }
    }
}

fn cross2(ax: Coord, ay: Coord, bx: Coord, by: Coord) -> i128 {
    ax as i128 * by as i128 - ay as i128 * bx as i128
}

/// Closest point pair between two segments (Euclidean), grid-rounded.
fn closest_points(e1: &Edge, e2: &Edge) -> (Point, Point) {
    let mut best = f64::MAX;
    let mut result = (e1.p1, e2.p1);
    // Minimum distance between non-crossing segments involves an
    // endpoint; crossing pairs never reach the facing filters.
    for (p, seg, flip) in [
        (e1.p1, e2, false),
        (e1.p2, e2, false),
        (e2.p1, e1, true),
        (e2.p2, e1, true),
    ] {
        let (q, dist) = project_clamped(p, seg.p1, seg.p2);
        if dist < best {
            best = dist;
            result = if flip { (q, p) } else { (p, q) };
        }
    }
    result
}

/// Foot of the perpendicular from `p` onto segment a–b, clamped, with the
/// Euclidean distance.
fn project_clamped(p: Point, a: Point, b: Point) -> (Point, f64) {
    let abx = (b.x - a.x) as f64;
    let aby = (b.y - a.y) as f64;
    let apx = (p.x - a.x) as f64;
    let apy = (p.y - a.y) as f64;
    let len2 = abx * abx + aby * aby;
    let t = if len2 == 0.0 {
        0.0
    } else {
        ((apx * abx + apy * aby) / len2).clamp(0.0, 1.0)
    };
    let q = Point::new(
        a.x + (t * abx).round() as Coord,
        a.y + (t * aby).round() as Coord,
    );
    (q, p.distance_to(&q))
}

// ── Distance measurement ─────────────────────────────────────────────

fn measure(
    e1: &Edge,
    e2: &Edge,
    d: Coord,
    metric: DistanceMetric,
) -> Result<Option<EdgePair>, DrcError> {
    if d == 0 {
        // Threshold zero: touching is the violation.
        return Ok(
            if segments_intersect(e1.p1, e1.p2, e2.p1, e2.p2) {
                Some(EdgePair {
                    first: *e1,
                    second: *e2,
                    distance: 0.0,
                })
            } else {
                None
            },
        );
    }

    match metric {
        DistanceMetric::Projection => Ok(measure_projection(e1, e2, d)),
        _ => Ok(measure_convex(e1, e2, d, metric)),
    }
}

fn point_dist(p: Point, a: Point, b: Point, metric: DistanceMetric) -> f64 {
    match metric {
        DistanceMetric::Euclidean => project_clamped(p, a, b).1,
        DistanceMetric::Square => {
            // Chebyshev point-to-segment: convex in the segment parameter,
            // ternary search to well below grid resolution.
            let mut lo = 0.0f64;
            let mut hi = 1.0f64;
            let eval = |t: f64| {
                let qx = a.x as f64 + t * (b.x - a.x) as f64;
                let qy = a.y as f64 + t * (b.y - a.y) as f64;
                (p.x as f64 - qx).abs().max((p.y as f64 - qy).abs())
            };
            for _ in 0..100 {
                let m1 = lo + (hi - lo) / 3.0;
                let m2 = hi - (hi - lo) / 3.0;
                if eval(m1) <= eval(m2) {
                    hi = m2;
                } else {
                    lo = m1;
                }
            }
            eval((lo + hi) / 2.0)
        }
        DistanceMetric::Projection => unreachable!("projection handled separately"),
    }
}

/// Violating sub-segments for convex metrics (Euclidean, Square): the
/// distance from a point sliding along one edge to the other edge is
/// convex, so `dist < d` holds on a single interval found by ternary
/// search plus bisection.
fn measure_convex(e1: &Edge, e2: &Edge, d: Coord, metric: DistanceMetric) -> Option<EdgePair> {
    let (lo1, hi1, best) = sublevel_interval(e1, e2, d, metric)?;
    let (lo2, hi2, _) = sublevel_interval(e2, e1, d, metric)?;
    Some(EdgePair {
        first: sub_edge(e1, lo1, hi1),
        second: sub_edge(e2, lo2, hi2),
        distance: best,
    })
}

fn sublevel_interval(
    e: &Edge,
    other: &Edge,
    d: Coord,
    metric: DistanceMetric,
) -> Option<(f64, f64, f64)> {
    let f = |t: f64| {
        let p = Point::new(
            e.p1.x + (t * e.dx() as f64).round() as Coord,
            e.p1.y + (t * e.dy() as f64).round() as Coord,
        );
        point_dist(p, other.p1, other.p2, metric)
    };
    let (mut lo, mut hi) = (0.0f64, 1.0f64);
    for _ in 0..100 {
        let m1 = lo + (hi - lo) / 3.0;
        let m2 = hi - (hi - lo) / 3.0;
        if f(m1) <= f(m2) {
            hi = m2;
        } else {
            lo = m1;
        }
    }
    let tmin = (lo + hi) / 2.0;
    let fmin = f(tmin);
    let dd = d as f64;
    if fmin >= dd {
        return None;
    }

    let lo_bound = if f(0.0) < dd {
        0.0
    } else {
        bisect_crossing(&f, 0.0, tmin, dd)
    };
    let hi_bound = if f(1.0) < dd {
        1.0
    } else {
        bisect_crossing(&f, 1.0, tmin, dd)
    };
    Some((lo_bound, hi_bound, fmin))
}

/// Bisect for f == d between an outside point and an inside point; f is
/// monotone on the half-interval by convexity.
fn bisect_crossing(f: &dyn Fn(f64) -> f64, outside: f64, inside: f64, d: f64) -> f64 {
    let mut a = outside;
    let mut b = inside;
    for _ in 0..60 {
        let m = (a + b) / 2.0;
        if f(m) < d {
            b = m;
        } else {
            a = m;
        }
    }
    (a + b) / 2.0
}

fn measure_projection(e1: &Edge, e2: &Edge, d: Coord) -> Option<EdgePair> {
    let wx = e2.dx() as f64;
    let wy = e2.dy() as f64;
    let len2 = wx * wx + wy * wy;
    if len2 == 0.0 {
        return None;
    }
    // For p = e1(t): foot parameter s(t) and signed perpendicular height
    // h(t) are both affine in t.
    let base_x = (e1.p1.x - e2.p1.x) as f64;
    let base_y = (e1.p1.y - e2.p1.y) as f64;
    let ux = e1.dx() as f64;
    let uy = e1.dy() as f64;

    let s0 = (base_x * wx + base_y * wy) / len2;
    let sl = (ux * wx + uy * wy) / len2;
    let len = len2.sqrt();
    let h0 = (wx * base_y - wy * base_x) / len;
    let hl = (wx * uy - wy * ux) / len;

    let mut lo = 0.0f64;
    let mut hi = 1.0f64;
    intersect_affine_band(&mut lo, &mut hi, s0, sl, 0.0, 1.0)?;
    intersect_affine_band(&mut lo, &mut hi, h0, hl, -(d as f64), d as f64)?;
    if lo >= hi {
        return None;
    }

    let h_at = |t: f64| (h0 + t * hl).abs();
    let dist = h_at(lo).min(h_at(hi));
    if dist >= d as f64 {
        // The interval only touches the threshold; equal distance is not
        // a violation.
        return None;
    }
    let s_lo = (s0 + lo * sl).clamp(0.0, 1.0);
    let s_hi = (s0 + hi * sl).clamp(0.0, 1.0);
    Some(EdgePair {
        first: sub_edge(e1, lo, hi),
        second: sub_edge(e2, s_lo.min(s_hi), s_lo.max(s_hi)),
        distance: dist,
    })
}

/// Constrain [lo, hi] to { t : a ≤ v0 + t·vl ≤ b }; None when empty.
fn intersect_affine_band(
    lo: &mut f64,
    hi: &mut f64,
    v0: f64,
    vl: f64,
    a: f64,
    b: f64,
) -> Option<()> {
    if vl.abs() < 1e-12 {
        if v0 < a || v0 > b {
            return None;
        }
        return Some(());
    }
    let t1 = (a - v0) / vl;
    let t2 = (b - v0) / vl;
    *lo = lo.max(t1.min(t2));
    *hi = hi.min(t1.max(t2));
    if lo >= hi {
        None
    } else {
        Some(())
    }
}

fn sub_edge(e: &Edge, lo: f64, hi: f64) -> Edge {
    let at = |t: f64| {
        Point::new(
            e.p1.x + (t * e.dx() as f64).round() as Coord,
            e.p1.y + (t * e.dy() as f64).round() as Coord,
        )
    };
    Edge::new(at(lo), at(hi), e.polygon)
}

#[cfg(test)]
mod tests {
    use super::*;
    use verilith_core::geometry::um;

    fn bars_03_gap_02() -> Region {
        // Two 0.3 µm wide, 1 µm tall bars with a 0.2 µm gap.
        Region::from_polygons(vec![
            Polygon::rect(0, 0, um(0.3), um(1.0)),
            Polygon::rect(um(0.5), 0, um(0.8), um(1.0)),
        ])
        .unwrap()
    }

    #[test]
    fn test_width_passes_space_fails_at_023() {
        let layer = bars_03_gap_02();
        let d = um(0.23);

        let w = width(&layer, d, DistanceMetric::Euclidean).unwrap();
        assert!(w.is_empty(), "0.3 µm bars satisfy 0.23 µm width");

        let s = space(&layer, d, DistanceMetric::Euclidean).unwrap();
        assert_eq!(s.len(), 1, "0.2 µm gap violates 0.23 µm spacing");
        let viol = s.polygons(um(0.001)).unwrap();
        assert_eq!(viol.count(), 1);
        let bb = viol.bbox().unwrap();
        assert_eq!(bb.min.x, um(0.3));
        assert_eq!(bb.max.x, um(0.5));
    }

    #[test]
    fn test_width_flags_narrow_bar() {
        let layer = Region::rect(0, 0, um(0.2), um(1.0));
        let w = width(&layer, um(0.23), DistanceMetric::Euclidean).unwrap();
        assert_eq!(w.len(), 1);
        assert!((w.iter().next().unwrap().distance - um(0.2) as f64).abs() < 1.5);
    }

    #[test]
    fn test_width_monotonic_in_threshold() {
        let layer = Region::from_polygons(vec![
            Polygon::rect(0, 0, um(0.2), um(1.0)),
            Polygon::rect(um(1.0), 0, um(1.3), um(1.0)),
            Polygon::rect(um(2.0), 0, um(2.5), um(1.0)),
        ])
        .unwrap();
        let tol = um(0.001);
        let v1 = width(&layer, um(0.25), DistanceMetric::Euclidean)
            .unwrap()
            .polygons(tol)
            .unwrap();
        let v2 = width(&layer, um(0.4), DistanceMetric::Euclidean)
            .unwrap()
            .polygons(tol)
            .unwrap();
        assert!(v1.not(&v2).unwrap().is_empty(), "violations(d1) ⊆ violations(d2)");
        assert!(v1.count() < v2.count());
    }

    #[test]
    fn test_space_monotonic_in_threshold() {
        let layer = bars_03_gap_02();
        let tol = um(0.001);
        let v1 = space(&layer, um(0.21), DistanceMetric::Euclidean)
            .unwrap()
            .polygons(tol)
            .unwrap();
        let v2 = space(&layer, um(0.5), DistanceMetric::Euclidean)
            .unwrap()
            .polygons(tol)
            .unwrap();
        assert!(v1.not(&v2).unwrap().is_empty());
    }

    #[test]
    fn test_isolated_vs_notched() {
        // A U-shape has an intra-polygon notch; a nearby bar makes an
        // inter-polygon gap.
        let u = Polygon::new(vec![
            Point::new(0, 0),
            Point::new(um(1.0), 0),
            Point::new(um(1.0), um(1.0)),
            Point::new(um(0.7), um(1.0)),
            Point::new(um(0.7), um(0.3)),
            Point::new(um(0.3), um(0.3)),
            Point::new(um(0.3), um(1.0)),
            Point::new(0, um(1.0)),
        ]);
        let bar = Polygon::rect(um(1.2), 0, um(1.5), um(1.0));
        let layer = Region::from_polygons(vec![u, bar]).unwrap();

        let iso = isolated(&layer, um(0.3), DistanceMetric::Euclidean).unwrap();
        assert_eq!(iso.len(), 1, "only the 0.2 µm inter-polygon gap");

        let notch = notched(&layer, um(0.5), DistanceMetric::Euclidean).unwrap();
        assert_eq!(notch.len(), 1, "only the 0.4 µm notch");

        let both = space(&layer, um(0.5), DistanceMetric::Euclidean).unwrap();
        assert_eq!(both.len(), 2);
    }

    #[test]
    fn test_separation_cross_layer() {
        let a = Region::rect(0, 0, um(1.0), um(1.0));
        let b = Region::rect(um(1.3), 0, um(2.0), um(1.0));
        let sep = separation(&a, &b, um(0.5), DistanceMetric::Euclidean).unwrap();
        assert_eq!(sep.len(), 1);
        let clear = separation(&a, &b, um(0.2), DistanceMetric::Euclidean).unwrap();
        assert!(clear.is_empty());
    }

    #[test]
    fn test_separation_threshold_zero_means_touching() {
        let a = Region::rect(0, 0, um(1.0), um(1.0));
        let touching = Region::rect(um(1.0), 0, um(2.0), um(1.0));
        let apart = Region::rect(um(1.1), 0, um(2.0), um(1.0));
        assert!(!separation(&a, &touching, 0, DistanceMetric::Euclidean)
            .unwrap()
            .is_empty());
        assert!(separation(&a, &apart, 0, DistanceMetric::Euclidean)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_enclosing_insufficient_margin() {
        // 0.1 µm margin all around; requiring 0.15 µm flags it.
        let outer = Region::rect(0, 0, um(2.0), um(2.0));
        let inner = Region::rect(um(0.1), um(0.1), um(1.9), um(1.9));
        let enc = enclosing(&outer, &inner, um(0.15), DistanceMetric::Euclidean).unwrap();
        assert!(!enc.is_empty());
        let ok = enclosing(&outer, &inner, um(0.05), DistanceMetric::Euclidean).unwrap();
        assert!(ok.is_empty());
    }

    #[test]
    fn test_enclosure_check_catches_escape() {
        let outer = Region::rect(0, 0, um(2.0), um(2.0));
        let escaped = Region::rect(um(3.0), um(3.0), um(3.5), um(3.5));
        let v = enclosure_check(&outer, &escaped, um(0.1), DistanceMetric::Euclidean, um(0.001))
            .unwrap();
        assert_eq!(v.count(), 1, "not-surrounded-at-all must surface");
    }

    #[test]
    fn test_overlap_band_width() {
        let a = Region::rect(0, 0, um(1.0), um(0.5));
        let b = Region::rect(0, um(0.3), um(1.0), um(0.8));
        // Overlap band is 0.2 µm tall.
        let narrow = overlap(&a, &b, um(0.25), DistanceMetric::Euclidean).unwrap();
        assert!(!narrow.is_empty());
        let fine = overlap(&a, &b, um(0.15), DistanceMetric::Euclidean).unwrap();
        assert!(fine.is_empty());
    }

    #[test]
    fn test_square_metric_catches_diagonal() {
        // Corner-to-corner offset of (0.15, 0.15) µm: Euclidean distance
        // ≈ 0.212 µm, Chebyshev 0.15 µm.
        let layer = Region::from_polygons(vec![
            Polygon::rect(0, 0, um(1.0), um(1.0)),
            Polygon::rect(um(1.15), um(1.15), um(2.0), um(2.0)),
        ])
        .unwrap();
        let d = um(0.2);
        let sq = space(&layer, d, DistanceMetric::Square).unwrap();
        assert!(!sq.is_empty(), "Chebyshev 0.15 < 0.2");
        let eu = space(&layer, d, DistanceMetric::Euclidean).unwrap();
        assert!(eu.is_empty(), "Euclidean 0.212 ≥ 0.2");
    }

    #[test]
    fn test_projection_ignores_unprojected() {
        // Offset bars with no mutual projection: no violation under the
        // projection metric, a violation under Euclidean.
        let layer = Region::from_polygons(vec![
            Polygon::rect(0, 0, um(1.0), um(0.2)),
            Polygon::rect(um(1.1), um(0.4), um(2.0), um(0.6)),
        ])
        .unwrap();
        let d = um(0.5);
        let proj = space(&layer, d, DistanceMetric::Projection).unwrap();
        assert!(proj.is_empty());
        let eu = space(&layer, d, DistanceMetric::Euclidean).unwrap();
        assert!(!eu.is_empty());
    }

    #[test]
    fn test_projection_parallel_overlap() {
        let layer = bars_03_gap_02();
        let proj = space(&layer, um(0.23), DistanceMetric::Projection).unwrap();
        assert_eq!(proj.len(), 1);
        assert!((proj.iter().next().unwrap().distance - um(0.2) as f64).abs() < 1.5);
    }

    #[test]
    fn test_negative_threshold_is_configuration_error() {
        let layer = Region::rect(0, 0, 10, 10);
        assert!(matches!(
            width(&layer, -5, DistanceMetric::Euclidean),
            Err(DrcError::Configuration(_))
        ));
    }

    #[test]
    fn test_corner_not_a_width_violation() {
        // A plain L: perpendicular edges meeting at corners must not
        // self-report.
        let l_shape = Polygon::new(vec![
            Point::new(0, 0),
            Point::new(um(2.0), 0),
            Point::new(um(2.0), um(0.5)),
            Point::new(um(0.5), um(0.5)),
            Point::new(um(0.5), um(2.0)),
            Point::new(0, um(2.0)),
        ]);
        let layer = Region::from_polygons(vec![l_shape]).unwrap();
        let w = width(&layer, um(0.4), DistanceMetric::Euclidean).unwrap();
        assert!(w.is_empty());
    }
}
