//! The layer value type: an immutable set of polygons in canonical merged
//! form, with the boolean, sizing, selection and derivation operators rule
//! decks are written against.
//!
//! Every operator returns a new `Region`; nothing mutates in place. A
//! region freshly built from raw shapes may carry unmerged geometry until
//! the first operation canonicalizes it (`Region::from_raw` defers the
//! merge deliberately, for bulk loading).

use serde::{Deserialize, Serialize};

use crate::boolean::{boolean, merge, BoolOp};
use crate::edge::Edge;
use crate::error::GeometryError;
use crate::geometry::{BBox, Coord, Point};
use crate::polygon::Polygon;
use crate::sizing::{sized, SizeKernel};
use crate::spatial::{SpatialEntry, SpatialIndex};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Region {
    polygons: Vec<Polygon>,
    #[serde(default)]
    merged: bool,
}

impl Region {
    /// The empty region.
    pub fn new() -> Self {
        Self {
            polygons: Vec::new(),
            merged: true,
        }
    }

    /// Build a canonical region from shapes, merging immediately.
    pub fn from_polygons(polygons: Vec<Polygon>) -> Result<Self, GeometryError> {
        Ok(Self {
            polygons: merge(&polygons)?,
            merged: true,
        })
    }

    /// Build a region without merging; canonicalization happens on the
    /// first operation that needs it.
    pub fn from_raw(polygons: Vec<Polygon>) -> Self {
        Self {
            polygons,
            merged: false,
        }
    }

    /// Single axis-aligned rectangle.
    pub fn rect(x1: Coord, y1: Coord, x2: Coord, y2: Coord) -> Self {
        Self {
            polygons: vec![Polygon::rect(x1, y1, x2, y2)],
            merged: true,
        }
    }

    /// Explicit release hint for large intermediates. Dropping does the
    /// same thing; this form lets rule code mark the release point.
    pub fn forget(self) {}

    // ── Canonical form ───────────────────────────────────────────────

    /// Canonical merged copy (a fixed point: merging twice changes
    /// nothing).
    pub fn merged(&self) -> Result<Region, GeometryError> {
        if self.merged {
            return Ok(self.clone());
        }
        Region::from_polygons(self.polygons.clone())
    }

    fn canonical_polygons(&self) -> Result<Vec<Polygon>, GeometryError> {
        if self.merged {
            Ok(self.polygons.clone())
        } else {
            merge(&self.polygons)
        }
    }

    /// The polygons as stored. Canonical only after a merge or any derived
    /// operation; raw-built regions expose their raw shapes here.
    pub fn polygons(&self) -> &[Polygon] {
        &self.polygons
    }

    // ── Boolean algebra ──────────────────────────────────────────────

    pub fn and(&self, other: &Region) -> Result<Region, GeometryError> {
        self.bool_op(other, BoolOp::And)
    }

    pub fn or(&self, other: &Region) -> Result<Region, GeometryError> {
        self.bool_op(other, BoolOp::Or)
    }

    pub fn not(&self, other: &Region) -> Result<Region, GeometryError> {
        self.bool_op(other, BoolOp::Not)
    }

    pub fn xor(&self, other: &Region) -> Result<Region, GeometryError> {
        self.bool_op(other, BoolOp::Xor)
    }

    fn bool_op(&self, other: &Region, op: BoolOp) -> Result<Region, GeometryError> {
        Ok(Region {
            polygons: boolean(&self.polygons, &other.polygons, op)?,
            merged: true,
        })
    }

    // ── Sizing ───────────────────────────────────────────────────────

    /// Grow (positive) or shrink (negative) with the square kernel.
    pub fn sized(&self, delta: Coord) -> Result<Region, GeometryError> {
        self.sized_with(delta, SizeKernel::Square)
    }

    pub fn sized_with(&self, delta: Coord, kernel: SizeKernel) -> Result<Region, GeometryError> {
        Ok(Region {
            polygons: sized(&self.polygons, delta, kernel)?,
            merged: true,
        })
    }

    // ── Measurement ──────────────────────────────────────────────────

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    /// Number of polygons (meaningful on canonical regions).
    pub fn count(&self) -> usize {
        self.polygons.len()
    }

    /// Total net area in µm².
    pub fn area_um2(&self) -> f64 {
        self.polygons.iter().map(|p| p.area_um2()).sum()
    }

    pub fn bbox(&self) -> Option<BBox> {
        self.polygons
            .iter()
            .filter_map(|p| p.bbox())
            .reduce(|a, b| a.union(&b))
    }

    pub fn contains_point(&self, p: &Point) -> bool {
        self.polygons.iter().any(|poly| poly.contains_point(p))
    }

    /// Index of the polygon containing `p`, if any.
    pub fn polygon_at(&self, p: &Point) -> Option<usize> {
        self.polygons.iter().position(|poly| poly.contains_point(p))
    }

    // ── Selection operators ──────────────────────────────────────────
    //
    // All of these select whole polygons of `self` by their relation to
    // `other`, on canonical forms of both.

    /// Polygons of `self` completely inside `other` (boundary contact
    /// allowed).
    pub fn inside(&self, other: &Region) -> Result<Region, GeometryError> {
        self.partition(other, SelectMode::Inside).map(|(sel, _)| sel)
    }

    pub fn not_inside(&self, other: &Region) -> Result<Region, GeometryError> {
        self.partition(other, SelectMode::Inside).map(|(_, rest)| rest)
    }

    /// Polygons of `self` sharing no area with `other` (touching still
    /// counts as outside).
    pub fn outside(&self, other: &Region) -> Result<Region, GeometryError> {
        self.partition(other, SelectMode::Outside).map(|(sel, _)| sel)
    }

    pub fn not_outside(&self, other: &Region) -> Result<Region, GeometryError> {
        self.partition(other, SelectMode::Outside).map(|(_, rest)| rest)
    }

    /// Polygons of `self` sharing at least a point with `other`
    /// (overlap, touching edges or touching corners all count).
    pub fn interacting(&self, other: &Region) -> Result<Region, GeometryError> {
        self.partition(other, SelectMode::Interacting { min: 1, max: usize::MAX })
            .map(|(sel, _)| sel)
    }

    pub fn not_interacting(&self, other: &Region) -> Result<Region, GeometryError> {
        self.partition(other, SelectMode::Interacting { min: 1, max: usize::MAX })
            .map(|(_, rest)| rest)
    }

    /// Polygons of `self` interacting with between `min` and `max`
    /// polygons of `other` (inclusive).
    pub fn interacting_count(
        &self,
        other: &Region,
        min: usize,
        max: usize,
    ) -> Result<Region, GeometryError> {
        self.partition(other, SelectMode::Interacting { min, max })
            .map(|(sel, _)| sel)
    }

    /// Polygons of `self` sharing positive area with `other`.
    pub fn overlapping(&self, other: &Region) -> Result<Region, GeometryError> {
        self.partition(other, SelectMode::Overlapping).map(|(sel, _)| sel)
    }

    pub fn not_overlapping(&self, other: &Region) -> Result<Region, GeometryError> {
        self.partition(other, SelectMode::Overlapping).map(|(_, rest)| rest)
    }

    /// Polygons of `self` completely covering at least one polygon of
    /// `other`.
    pub fn covering(&self, other: &Region) -> Result<Region, GeometryError> {
        self.partition(other, SelectMode::Covering).map(|(sel, _)| sel)
    }

    pub fn not_covering(&self, other: &Region) -> Result<Region, GeometryError> {
        self.partition(other, SelectMode::Covering).map(|(_, rest)| rest)
    }

    fn partition(
        &self,
        other: &Region,
        mode: SelectMode,
    ) -> Result<(Region, Region), GeometryError> {
        let mine = self.canonical_polygons()?;
        let theirs = other.canonical_polygons()?;
        let index = SpatialIndex::build(
            theirs
                .iter()
                .enumerate()
                .filter_map(|(i, p)| {
                    p.bbox().map(|bbox| SpatialEntry {
                        item_index: i,
                        bbox,
                    })
                })
                .collect(),
        );

        let mut selected = Vec::new();
        let mut rest = Vec::new();
        for poly in mine {
            let hit = match poly.bbox() {
                Some(bbox) => {
                    let candidates: Vec<&Polygon> = index
                        .query_window(&bbox)
                        .into_iter()
                        .map(|e| &theirs[e.item_index])
                        .collect();
                    mode.matches(&poly, &candidates)?
                }
                None => false,
            };
            if hit {
                selected.push(poly);
            } else {
                rest.push(poly);
            }
        }
        Ok((
            Region {
                polygons: selected,
                merged: true,
            },
            Region {
                polygons: rest,
                merged: true,
            },
        ))
    }

    // ── Derived geometry ─────────────────────────────────────────────

    /// Hole boundaries as filled polygons.
    pub fn holes(&self) -> Result<Region, GeometryError> {
        let polys = self.canonical_polygons()?;
        let holes: Vec<Polygon> = polys
            .iter()
            .flat_map(|p| p.holes().iter().map(|h| Polygon::new(h.clone())))
            .collect();
        Ok(Region {
            polygons: holes,
            merged: true,
        })
    }

    /// Outer boundaries with holes filled in. Hulls of distinct polygons
    /// may overlap (an island inside another polygon's hole), so the
    /// result is raw.
    pub fn hulls(&self) -> Result<Region, GeometryError> {
        let polys = self.canonical_polygons()?;
        Ok(Region::from_raw(polys.iter().map(|p| p.hull()).collect()))
    }

    /// Per-polygon bounding boxes as rectangles (raw: extents may
    /// overlap).
    pub fn extents(&self) -> Result<Region, GeometryError> {
        let polys = self.canonical_polygons()?;
        Ok(Region::from_raw(
            polys
                .iter()
                .filter_map(|p| p.bbox())
                .map(|b| Polygon::rect(b.min.x, b.min.y, b.max.x, b.max.y))
                .collect(),
        ))
    }

    /// Polygons whose net area in µm² lies in the given interval
    /// (`min` inclusive, `max` exclusive; `None` leaves that side open).
    pub fn with_area(&self, min: Option<f64>, max: Option<f64>) -> Result<Region, GeometryError> {
        let polys = self.canonical_polygons()?;
        let kept = polys
            .into_iter()
            .filter(|p| {
                let a = p.area_um2();
                min.map_or(true, |m| a >= m) && max.map_or(true, |m| a < m)
            })
            .collect();
        Ok(Region {
            polygons: kept,
            merged: true,
        })
    }

    /// Boundary edges of the canonical form, interior on the left, each
    /// stamped with its polygon index.
    pub fn edges(&self) -> Result<Vec<Edge>, GeometryError> {
        let polys = self.canonical_polygons()?;
        let mut out = Vec::new();
        for (i, p) in polys.iter().enumerate() {
            out.extend(p.edges(i));
        }
        Ok(out)
    }

    pub fn translated(&self, dx: Coord, dy: Coord) -> Region {
        Region {
            polygons: self.polygons.iter().map(|p| p.translated(dx, dy)).collect(),
            merged: self.merged,
        }
    }

    /// Clip to an axis-aligned window.
    pub fn clipped(&self, window: &BBox) -> Result<Region, GeometryError> {
        self.and(&Region::rect(
            window.min.x,
            window.min.y,
            window.max.x,
            window.max.y,
        ))
    }
}

#[derive(Clone, Copy)]
enum SelectMode {
    Inside,
    Outside,
    Interacting { min: usize, max: usize },
    Overlapping,
    Covering,
}

impl SelectMode {
    fn matches(&self, poly: &Polygon, candidates: &[&Polygon]) -> Result<bool, GeometryError> {
        match self {
            SelectMode::Inside => {
                let others: Vec<Polygon> = candidates.iter().map(|p| (*p).clone()).collect();
                Ok(boolean(std::slice::from_ref(poly), &others, BoolOp::Not)?.is_empty())
            }
            SelectMode::Outside => {
                let others: Vec<Polygon> = candidates.iter().map(|p| (*p).clone()).collect();
                Ok(boolean(std::slice::from_ref(poly), &others, BoolOp::And)?.is_empty())
            }
            SelectMode::Interacting { min, max } => {
                let mut n = 0usize;
                for c in candidates {
                    if poly.interacts(c) {
                        n += 1;
                        if n > *max {
                            return Ok(false);
                        }
                    }
                }
                Ok(n >= *min && n <= *max)
            }
            SelectMode::Overlapping => {
                let others: Vec<Polygon> = candidates.iter().map(|p| (*p).clone()).collect();
                Ok(!boolean(std::slice::from_ref(poly), &others, BoolOp::And)?.is_empty())
            }
            SelectMode::Covering => {
                for c in candidates {
                    if boolean(std::slice::from_ref(*c), std::slice::from_ref(poly), BoolOp::Not)?
                        .is_empty()
                    {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::um;

    fn region(polys: Vec<Polygon>) -> Region {
        Region::from_polygons(polys).unwrap()
    }

    #[test]
    fn test_from_raw_defers_merge() {
        let raw = Region::from_raw(vec![
            Polygon::rect(0, 0, 10, 10),
            Polygon::rect(5, 0, 15, 10),
        ]);
        assert_eq!(raw.count(), 2);
        let canonical = raw.merged().unwrap();
        assert_eq!(canonical.count(), 1);
    }

    #[test]
    fn test_merge_fixed_point() {
        let r = region(vec![
            Polygon::rect(0, 0, 10, 10),
            Polygon::rect(5, 5, 20, 20),
        ]);
        assert_eq!(r.merged().unwrap(), r);
    }

    #[test]
    fn test_inside_outside() {
        let big = Region::rect(0, 0, 100, 100);
        let probes = region(vec![
            Polygon::rect(10, 10, 20, 20), // inside
            Polygon::rect(90, 10, 110, 20), // straddles
            Polygon::rect(200, 200, 210, 210), // outside
        ]);
        assert_eq!(probes.inside(&big).unwrap().count(), 1);
        assert_eq!(probes.not_inside(&big).unwrap().count(), 2);
        assert_eq!(probes.outside(&big).unwrap().count(), 1);
        assert_eq!(probes.not_outside(&big).unwrap().count(), 2);
    }

    #[test]
    fn test_interacting_includes_touching() {
        let target = Region::rect(0, 0, 10, 10);
        let probes = region(vec![
            Polygon::rect(10, 0, 20, 10),  // abuts
            Polygon::rect(30, 0, 40, 10),  // clear
            Polygon::rect(5, 5, 15, 15),   // overlaps
        ]);
        assert_eq!(probes.interacting(&target).unwrap().count(), 2);
        assert_eq!(probes.not_interacting(&target).unwrap().count(), 1);
        // Overlap is stricter than interact.
        assert_eq!(probes.overlapping(&target).unwrap().count(), 1);
        assert_eq!(probes.not_overlapping(&target).unwrap().count(), 2);
    }

    #[test]
    fn test_interacting_count_bounds() {
        let pins = region(vec![
            Polygon::rect(0, 0, 10, 10),
            Polygon::rect(20, 0, 30, 10),
        ]);
        let bars = region(vec![
            Polygon::rect(-5, 4, 35, 6),  // touches both pins
            Polygon::rect(-5, 20, 35, 22), // touches none
        ]);
        assert_eq!(bars.interacting_count(&pins, 2, 2).unwrap().count(), 1);
        assert_eq!(bars.interacting_count(&pins, 1, 1).unwrap().count(), 0);
    }

    #[test]
    fn test_covering() {
        let blankets = region(vec![
            Polygon::rect(0, 0, 50, 50),
            Polygon::rect(100, 0, 120, 20),
        ]);
        let small = Region::rect(10, 10, 20, 20);
        assert_eq!(blankets.covering(&small).unwrap().count(), 1);
        assert_eq!(blankets.not_covering(&small).unwrap().count(), 1);
    }

    #[test]
    fn test_holes_and_hulls() {
        let donut = Region::rect(0, 0, um(10.0), um(10.0))
            .not(&Region::rect(um(4.0), um(4.0), um(6.0), um(6.0)))
            .unwrap();
        let holes = donut.holes().unwrap();
        assert_eq!(holes.count(), 1);
        assert!((holes.area_um2() - 4.0).abs() < 1e-9);
        let hulls = donut.hulls().unwrap();
        assert!((hulls.merged().unwrap().area_um2() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_with_area_open_intervals() {
        let r = region(vec![
            Polygon::rect(0, 0, um(1.0), um(1.0)),   // 1 µm²
            Polygon::rect(um(5.0), 0, um(8.0), um(3.0)), // 9 µm²
        ]);
        assert_eq!(r.with_area(None, Some(5.0)).unwrap().count(), 1);
        assert_eq!(r.with_area(Some(5.0), None).unwrap().count(), 1);
        assert_eq!(r.with_area(None, None).unwrap().count(), 2);
        // min inclusive, max exclusive
        assert_eq!(r.with_area(Some(1.0), Some(9.0)).unwrap().count(), 1);
    }

    #[test]
    fn test_hole_area_filter_on_donut() {
        // A 2×2 µm hole in a 10×10 outer: the 4 µm² hole is only reported
        // by an area filter that actually looks at holes, and only when
        // the bound catches it.
        let donut = Region::rect(0, 0, um(10.0), um(10.0))
            .not(&Region::rect(um(4.0), um(4.0), um(6.0), um(6.0)))
            .unwrap();
        let small_holes = donut.holes().unwrap().with_area(None, Some(0.26)).unwrap();
        assert!(small_holes.is_empty());
        let all_holes = donut.holes().unwrap().with_area(None, Some(5.0)).unwrap();
        assert_eq!(all_holes.count(), 1);
    }

    #[test]
    fn test_clipped() {
        let r = Region::rect(0, 0, 100, 100);
        let clipped = r
            .clipped(&BBox::new(Point::new(50, 50), Point::new(200, 200)))
            .unwrap();
        assert_eq!(clipped.count(), 1);
        assert_eq!(clipped.bbox().unwrap().max, Point::new(100, 100));
    }

    #[test]
    fn test_forget_consumes() {
        let r = Region::rect(0, 0, 10, 10);
        r.forget();
    }
}
