//! Polygon-set boolean algebra.
//!
//! Scanband implementation: event y-coordinates are collected from vertices
//! and pairwise edge crossings, each horizontal band is decomposed into
//! trapezoids by accumulating per-operand winding counts left to right, and
//! the result boundary is reconstructed by canceling opposed coverage
//! intervals and chaining the surviving segments into rings.
//!
//! Fill rule: **nonzero winding**, applied uniformly to every operand. Raw
//! (unmerged, possibly self-intersecting) input is legal; output is always
//! canonical: disjoint polygons, outer rings CCW, holes CW, no collinear or
//! duplicate vertices.
//!
//! Coordinates interpolated at band boundaries are rounded to the database
//! grid with a rounding that is a pure function of (edge, y), so shared
//! corners land on identical points. The maximum displacement is half a
//! database unit.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::error::GeometryError;
use crate::geometry::{check_coord, cross, Coord, Point};
use crate::polygon::{point_in_ring, ring_area_x2, Polygon};

/// Boolean set operation over two polygon sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
    Not,
    Xor,
}

impl BoolOp {
    fn inside(&self, a: bool, b: bool) -> bool {
        match self {
            BoolOp::And => a && b,
            BoolOp::Or => a || b,
            BoolOp::Not => a && !b,
            BoolOp::Xor => a != b,
        }
    }
}

/// Evaluate `a <op> b` and return the canonical merged result.
pub fn boolean(a: &[Polygon], b: &[Polygon], op: BoolOp) -> Result<Vec<Polygon>, GeometryError> {
    let mut edges = Vec::new();
    collect_edges(a, 0, &mut edges)?;
    collect_edges(b, 1, &mut edges)?;
    if edges.is_empty() {
        return Ok(Vec::new());
    }

    let events = event_ys(&edges);
    let traps = decompose(&edges, &events, op);
    Ok(reassemble(&traps))
}

/// Canonicalize a polygon set: merge overlaps, drop slivers, normalize
/// winding. Merging twice is a fixed point.
pub fn merge(polys: &[Polygon]) -> Result<Vec<Polygon>, GeometryError> {
    boolean(polys, &[], BoolOp::Or)
}

// ── Sweep edges ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct SweepEdge {
    x1: Coord,
    y1: Coord,
    x2: Coord,
    y2: Coord, // y1 < y2 always
    weight: i64,
    operand: usize,
}

impl SweepEdge {
    /// Exact x at `y`, rounded half-up to the grid.
    fn x_at(&self, y: Coord) -> Coord {
        if y <= self.y1 {
            return self.x1;
        }
        if y >= self.y2 {
            return self.x2;
        }
        let den = (self.y2 - self.y1) as i128;
        let num = self.x1 as i128 * den + (self.x2 - self.x1) as i128 * (y - self.y1) as i128;
        div_round_half_up(num, den) as Coord
    }
}

fn div_round_half_up(num: i128, den: i128) -> i128 {
    debug_assert!(den > 0);
    div_floor(2 * num + den, 2 * den)
}

fn div_floor(num: i128, den: i128) -> i128 {
    debug_assert!(den > 0);
    let q = num / den;
    if num % den < 0 {
        q - 1
    } else {
        q
    }
}

fn collect_edges(
    polys: &[Polygon],
    operand: usize,
    out: &mut Vec<SweepEdge>,
) -> Result<(), GeometryError> {
    for poly in polys {
        for ring in poly.rings() {
            let n = ring.len();
            for i in 0..n {
                let p = ring[i];
                let q = ring[(i + 1) % n];
                check_coord(p.x)?;
                check_coord(p.y)?;
                if q.y == p.y {
                    continue; // horizontal edges carry no winding in a y-sweep
                }
                let (bottom, top, weight) = if q.y > p.y { (p, q, 1) } else { (q, p, -1) };
                out.push(SweepEdge {
                    x1: bottom.x,
                    y1: bottom.y,
                    x2: top.x,
                    y2: top.y,
                    weight,
                    operand,
                });
            }
        }
    }
    Ok(())
}

// ── Event collection ─────────────────────────────────────────────────

/// Unique band boundaries: every endpoint y, plus a pair of ys bracketing
/// every interior edge crossing so that edges never cross inside a band.
fn event_ys(edges: &[SweepEdge]) -> Vec<Coord> {
    let mut ys: BTreeSet<Coord> = BTreeSet::new();
    for e in edges {
        ys.insert(e.y1);
        ys.insert(e.y2);
    }

    let mut order: Vec<usize> = (0..edges.len()).collect();
    order.sort_by_key(|&i| edges[i].y1);
    let mut active: Vec<usize> = Vec::new();
    for &i in &order {
        let ei = &edges[i];
        active.retain(|&j| edges[j].y2 > ei.y1);
        for &j in &active {
            if let Some(y) = crossing_y(ei, &edges[j]) {
                ys.insert(y);
                ys.insert(y + 1);
            }
        }
        active.push(i);
    }
    ys.into_iter().collect()
}

/// Floor of the y-coordinate of a proper interior crossing, if any.
fn crossing_y(a: &SweepEdge, b: &SweepEdge) -> Option<Coord> {
    let p1 = Point::new(a.x1, a.y1);
    let p2 = Point::new(a.x2, a.y2);
    let q1 = Point::new(b.x1, b.y1);
    let q2 = Point::new(b.x2, b.y2);
    let denom = cross(Point::zero(), p2 - p1, q2 - q1);
    if denom == 0 {
        return None; // parallel or collinear; endpoints are events already
    }
    let t_num = cross(Point::zero(), q1 - p1, q2 - q1);
    let u_num = cross(Point::zero(), q1 - p1, p2 - p1);
    let (t_num, u_num, denom) = if denom < 0 {
        (-t_num, -u_num, -denom)
    } else {
        (t_num, u_num, denom)
    };
    if t_num <= 0 || t_num >= denom || u_num <= 0 || u_num >= denom {
        return None;
    }
    let y_num = a.y1 as i128 * denom + t_num * (a.y2 - a.y1) as i128;
    Some(div_floor(y_num, denom) as Coord)
}

// ── Band decomposition ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct Trapezoid {
    ya: Coord,
    yb: Coord,
    // left boundary x at ya/yb, right boundary x at ya/yb
    xla: Coord,
    xlb: Coord,
    xra: Coord,
    xrb: Coord,
}

fn decompose(edges: &[SweepEdge], events: &[Coord], op: BoolOp) -> Vec<Trapezoid> {
    let mut order: Vec<usize> = (0..edges.len()).collect();
    order.sort_by_key(|&i| edges[i].y1);

    let mut traps = Vec::new();
    let mut pending = 0usize;
    let mut candidates: Vec<usize> = Vec::new();

    for w in events.windows(2) {
        let (ya, yb) = (w[0], w[1]);
        while pending < order.len() && edges[order[pending]].y1 <= ya {
            candidates.push(order[pending]);
            pending += 1;
        }
        candidates.retain(|&i| edges[i].y2 > ya);

        // Events split every crossing, so active edges are disjoint within
        // the band and a midline ordering is total.
        let mut active: Vec<(i128, Coord, Coord, usize)> = candidates
            .iter()
            .map(|&i| {
                let xa = edges[i].x_at(ya);
                let xb = edges[i].x_at(yb);
                (xa as i128 + xb as i128, xa, xb, i)
            })
            .collect();
        active.sort();

        let mut winding = [0i64; 2];
        let mut open: Option<(Coord, Coord)> = None;
        for &(_, xa, xb, i) in &active {
            let e = &edges[i];
            let before = op.inside(winding[0] != 0, winding[1] != 0);
            winding[e.operand] += e.weight;
            let after = op.inside(winding[0] != 0, winding[1] != 0);
            if !before && after {
                open = Some((xa, xb));
            } else if before && !after {
                if let Some((xla, xlb)) = open.take() {
                    let xra = xa.max(xla);
                    let xrb = xb.max(xlb);
                    if xra > xla || xrb > xlb {
                        traps.push(Trapezoid {
                            ya,
                            yb,
                            xla,
                            xlb,
                            xra,
                            xrb,
                        });
                    }
                }
            }
        }
    }
    traps
}

// ── Boundary reconstruction ──────────────────────────────────────────

fn reassemble(traps: &[Trapezoid]) -> Vec<Polygon> {
    if traps.is_empty() {
        return Vec::new();
    }

    // Horizontal coverage per scanline: +1 interior-above (trapezoid
    // bottoms), -1 interior-below (tops). Opposed intervals cancel where
    // bands abut, leaving true boundary segments only.
    let mut coverage: BTreeMap<Coord, Vec<(Coord, Coord, i64)>> = BTreeMap::new();
    // Non-horizontal sides cancel only as exact pairs: side segments of
    // one band share endpoints or nothing.
    let mut sides: HashMap<(Point, Point), i64> = HashMap::new();

    let mut add_side = |from: Point, to: Point| {
        if from == to {
            return;
        }
        let (key, dir) = if from < to {
            ((from, to), 1)
        } else {
            ((to, from), -1)
        };
        *sides.entry(key).or_insert(0) += dir;
    };

    for t in traps {
        if t.xra > t.xla {
            coverage.entry(t.ya).or_default().push((t.xla, t.xra, 1));
        }
        if t.xrb > t.xlb {
            coverage.entry(t.yb).or_default().push((t.xlb, t.xrb, -1));
        }
        // Left side runs downward, right side upward: interior stays left.
        add_side(Point::new(t.xlb, t.yb), Point::new(t.xla, t.ya));
        add_side(Point::new(t.xra, t.ya), Point::new(t.xrb, t.yb));
    }

    let mut segments: Vec<(Point, Point)> = Vec::new();

    for ((from, to), net) in sides {
        match net.cmp(&0) {
            std::cmp::Ordering::Greater => segments.push((from, to)),
            std::cmp::Ordering::Less => segments.push((to, from)),
            std::cmp::Ordering::Equal => {}
        }
    }

    for (y, intervals) in coverage {
        let mut breaks: BTreeSet<Coord> = BTreeSet::new();
        for &(x1, x2, _) in &intervals {
            breaks.insert(x1);
            breaks.insert(x2);
        }
        let xs: Vec<Coord> = breaks.into_iter().collect();
        let mut run: Option<(Coord, Coord, i64)> = None;
        for w in xs.windows(2) {
            let (x1, x2) = (w[0], w[1]);
            let net: i64 = intervals
                .iter()
                .filter(|&&(a, b, _)| a <= x1 && b >= x2)
                .map(|&(_, _, s)| s)
                .sum();
            match run {
                Some((rx1, rx2, rs)) if rs == net && rx2 == x1 => run = Some((rx1, x2, rs)),
                Some((rx1, rx2, rs)) => {
                    emit_horizontal(&mut segments, rx1, rx2, rs, y);
                    run = Some((x1, x2, net));
                }
                None => run = Some((x1, x2, net)),
            }
        }
        if let Some((rx1, rx2, rs)) = run {
            emit_horizontal(&mut segments, rx1, rx2, rs, y);
        }
    }

    chain_loops(segments)
}

fn emit_horizontal(segments: &mut Vec<(Point, Point)>, x1: Coord, x2: Coord, net: i64, y: Coord) {
    if net > 0 {
        // Interior above: run east so the interior is on the left.
        segments.push((Point::new(x1, y), Point::new(x2, y)));
    } else if net < 0 {
        segments.push((Point::new(x2, y), Point::new(x1, y)));
    }
}

/// Chain directed boundary segments (interior on the left) into rings.
/// At junction vertices the continuation with the sharpest left turn is
/// taken, which keeps touching rings separate.
fn chain_loops(mut segments: Vec<(Point, Point)>) -> Vec<Polygon> {
    segments.sort();
    let mut outgoing: HashMap<Point, Vec<usize>> = HashMap::new();
    for (i, seg) in segments.iter().enumerate() {
        outgoing.entry(seg.0).or_default().push(i);
    }
    let mut used = vec![false; segments.len()];

    let mut outers: Vec<Vec<Point>> = Vec::new();
    let mut holes: Vec<Vec<Point>> = Vec::new();

    for start in 0..segments.len() {
        if used[start] {
            continue;
        }
        let mut ring: Vec<Point> = Vec::new();
        let mut cur = start;
        loop {
            used[cur] = true;
            ring.push(segments[cur].0);
            let here = segments[cur].1;
            if here == segments[start].0 {
                break;
            }
            let dir_in = here - segments[cur].0;
            let next = outgoing
                .get(&here)
                .and_then(|cands| {
                    cands
                        .iter()
                        .filter(|&&j| !used[j])
                        .min_by(|&&x, &&y| {
                            let rx = turn_key(dir_in, segments[x].1 - segments[x].0);
                            let ry = turn_key(dir_in, segments[y].1 - segments[y].0);
                            rx.partial_cmp(&ry).unwrap_or(std::cmp::Ordering::Equal)
                        })
                        .copied()
                });
            match next {
                Some(j) => cur = j,
                None => {
                    // Dangling chain; numerically degenerate, drop it.
                    log::debug!("dropping open boundary chain of {} vertices", ring.len());
                    ring.clear();
                    break;
                }
            }
        }

        let ring = simplify_ring(ring);
        if ring.len() < 3 {
            continue;
        }
        let area = ring_area_x2(&ring);
        if area > 0 {
            outers.push(ring);
        } else if area < 0 {
            holes.push(ring);
        }
    }

    assign_holes(outers, holes)
}

/// Counterclockwise turn angle from `d_in` to `d_out` in [0, 2π), with
/// exact reversals pushed to the end so spikes are taken last.
fn turn_key(d_in: Point, d_out: Point) -> f64 {
    let cross_v = d_in.x as i128 * d_out.y as i128 - d_in.y as i128 * d_out.x as i128;
    let dot_v = d_in.x as i128 * d_out.x as i128 + d_in.y as i128 * d_out.y as i128;
    if cross_v == 0 && dot_v < 0 {
        return std::f64::consts::TAU; // reversal
    }
    let a_in = (d_in.y as f64).atan2(d_in.x as f64);
    let a_out = (d_out.y as f64).atan2(d_out.x as f64);
    (a_out - a_in).rem_euclid(std::f64::consts::TAU)
}

fn simplify_ring(ring: Vec<Point>) -> Vec<Point> {
    let mut pts = ring;
    loop {
        let n = pts.len();
        if n < 3 {
            return pts;
        }
        let mut out: Vec<Point> = Vec::with_capacity(n);
        for i in 0..n {
            let prev = pts[(i + n - 1) % n];
            let cur = pts[i];
            let next = pts[(i + 1) % n];
            if cur == next || cross(prev, cur, next) == 0 {
                continue;
            }
            out.push(cur);
        }
        if out.len() == pts.len() {
            return out;
        }
        pts = out;
    }
}

fn assign_holes(outers: Vec<Vec<Point>>, holes: Vec<Vec<Point>>) -> Vec<Polygon> {
    let mut order: Vec<usize> = (0..outers.len()).collect();
    order.sort_by_key(|&i| ring_area_x2(&outers[i]).abs());

    let mut assigned: Vec<Vec<Vec<Point>>> = vec![Vec::new(); outers.len()];
    for hole in holes {
        let rep = hole[0];
        let owner = order
            .iter()
            .find(|&&i| point_in_ring(&rep, &outers[i]))
            .copied();
        match owner {
            Some(i) => assigned[i].push(hole),
            None => log::debug!("hole ring without an enclosing outer; dropped"),
        }
    }

    outers
        .into_iter()
        .zip(assigned)
        .map(|(outer, holes)| Polygon::with_holes(outer, holes))
        .collect()
}
