//! Connectivity extraction: shorting declared layer pairs through their
//! overlapping shapes into clusters of electrically connected geometry,
//! plus the net-filtered two-threshold spacing primitives built on top.
//!
//! Lifecycle is a one-way state machine: declarations are accepted while
//! unbuilt, `build` runs union-find over the layer geometry once, and the
//! built graph is immutable afterwards, safe to share read-only across
//! worker threads.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use verilith_core::geometry::{Coord, Point};
use verilith_core::spatial::{SpatialEntry, SpatialIndex};
use verilith_core::Region;

use crate::error::DrcError;
use crate::metrics::{self, DistanceMetric, EdgePair, EdgePairSet};

/// Map of layer name to geometry a run operates on.
pub type LayerMap = BTreeMap<String, Region>;

/// Identity of an electrically connected cluster. Two shapes are at the
/// same potential iff their `NetId`s are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NetId {
    pub circuit: u32,
    pub cluster: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnState {
    Unbuilt,
    Building,
    Built,
}

struct LayerNodes {
    region: Region,
    index: SpatialIndex,
    first_node: usize,
}

/// The connectivity extractor.
pub struct Connectivity {
    state: ConnState,
    declared: Vec<(String, String)>,
    layers: BTreeMap<String, LayerNodes>,
    labels: Vec<u32>,
    circuit: u32,
}

impl Connectivity {
    pub fn new() -> Self {
        Self {
            state: ConnState::Unbuilt,
            declared: Vec::new(),
            layers: BTreeMap::new(),
            labels: Vec::new(),
            circuit: 0,
        }
    }

    /// Declare that shapes of `a` and `b` short where they overlap or
    /// touch (a contact layer bridging diffusion and metal1, a via
    /// bridging two metals).
    pub fn connect(&mut self, a: &str, b: &str) -> Result<(), DrcError> {
        if self.state != ConnState::Unbuilt {
            return Err(DrcError::config(
                "connect() after connectivity was built",
            ));
        }
        self.declared.push((a.to_string(), b.to_string()));
        Ok(())
    }

    pub fn is_built(&self) -> bool {
        self.state == ConnState::Built
    }

    pub fn declared_pairs(&self) -> &[(String, String)] {
        &self.declared
    }

    /// Extract clusters from the given layers. Terminal: building twice
    /// is a configuration error, and geometry changes after this point
    /// are not observed. Build after all layer derivations used in
    /// connectivity checks.
    pub fn build(&mut self, layers: &LayerMap, circuit: u32) -> Result<(), DrcError> {
        if self.state != ConnState::Unbuilt {
            return Err(DrcError::config("connectivity already built"));
        }
        self.state = ConnState::Building;
        self.circuit = circuit;
        log::info!(
            "constructing connectivity over {} declared layer pairs",
            self.declared.len()
        );

        // Canonicalize and index every layer named in a declaration.
        let mut names: Vec<&str> = self
            .declared
            .iter()
            .flat_map(|(a, b)| [a.as_str(), b.as_str()])
            .collect();
        names.sort_unstable();
        names.dedup();

        let mut next_node = 0usize;
        for name in names {
            let region = layers
                .get(name)
                .ok_or_else(|| {
                    DrcError::config(format!("connect() references unknown layer '{name}'"))
                })?
                .merged()?;
            let entries = region
                .polygons()
                .iter()
                .enumerate()
                .filter_map(|(i, p)| {
                    p.bbox().map(|bbox| SpatialEntry {
                        item_index: i,
                        bbox,
                    })
                })
                .collect();
            let count = region.count();
            self.layers.insert(
                name.to_string(),
                LayerNodes {
                    region,
                    index: SpatialIndex::build(entries),
                    first_node: next_node,
                },
            );
            next_node += count;
        }

        let mut uf = UnionFind::new(next_node);

        // Same-layer contact: merged polygons are disjoint but may still
        // touch at corners; touching shapes are one net.
        for nodes in self.layers.values() {
            let polys = nodes.region.polygons();
            for (i, p) in polys.iter().enumerate() {
                let Some(bbox) = p.bbox() else { continue };
                for e in nodes.index.query_window(&bbox) {
                    let j = e.item_index;
                    if j > i && p.interacts(&polys[j]) {
                        uf.union(nodes.first_node + i, nodes.first_node + j);
                    }
                }
            }
        }

        // Declared cross-layer bridges.
        for (a, b) in &self.declared {
            let la = &self.layers[a.as_str()];
            let lb = &self.layers[b.as_str()];
            let pa = la.region.polygons();
            let pb = lb.region.polygons();
            for (i, p) in pa.iter().enumerate() {
                let Some(bbox) = p.bbox() else { continue };
                for e in lb.index.query_window(&bbox) {
                    let j = e.item_index;
                    if p.interacts(&pb[j]) {
                        uf.union(la.first_node + i, lb.first_node + j);
                    }
                }
            }
        }

        // Stable labels: clusters numbered by first appearance in node
        // order.
        let mut label_of_root: BTreeMap<usize, u32> = BTreeMap::new();
        let mut labels = Vec::with_capacity(next_node);
        for node in 0..next_node {
            let root = uf.find(node);
            let next = label_of_root.len() as u32;
            let label = *label_of_root.entry(root).or_insert(next);
            labels.push(label);
        }
        self.labels = labels;
        self.state = ConnState::Built;
        log::info!(
            "connectivity built: {} shapes in {} clusters",
            next_node,
            label_of_root.len()
        );
        Ok(())
    }

    fn layer_nodes(&self, layer: &str) -> Result<&LayerNodes, DrcError> {
        if self.state != ConnState::Built {
            return Err(DrcError::config("connectivity queried before build"));
        }
        self.layers
            .get(layer)
            .ok_or_else(|| DrcError::config(format!("layer '{layer}' has no connectivity")))
    }

    /// Net of the polygon with the given index on a connected layer.
    pub fn net_of(&self, layer: &str, polygon_index: usize) -> Result<Option<NetId>, DrcError> {
        let nodes = self.layer_nodes(layer)?;
        if polygon_index >= nodes.region.count() {
            return Ok(None);
        }
        Ok(Some(NetId {
            circuit: self.circuit,
            cluster: self.labels[nodes.first_node + polygon_index],
        }))
    }

    /// Which net does this point belong to on the given layer? `None`
    /// when the point hits no shape there.
    pub fn probe_net(&self, layer: &str, point: Point) -> Result<Option<NetId>, DrcError> {
        let nodes = self.layer_nodes(layer)?;
        let polys = nodes.region.polygons();
        for e in nodes.index.query_point(&point) {
            if polys[e.item_index].contains_point(&point) {
                return self.net_of(layer, e.item_index);
            }
        }
        Ok(None)
    }

    /// The canonical geometry connectivity was built against.
    pub fn layer_region(&self, layer: &str) -> Result<&Region, DrcError> {
        Ok(&self.layer_nodes(layer)?.region)
    }

    /// Split edge pairs into (same-net, different-net) buckets by the net
    /// identity of the two polygons involved. Every input pair lands in
    /// exactly one bucket; pairs whose net cannot be resolved are logged
    /// and dropped.
    pub fn partition_by_net(
        &self,
        layer_a: &str,
        layer_b: &str,
        pairs: &EdgePairSet,
    ) -> Result<(EdgePairSet, EdgePairSet), DrcError> {
        let mut same: Vec<EdgePair> = Vec::new();
        let mut different: Vec<EdgePair> = Vec::new();
        for pair in pairs.iter() {
            let n1 = self.net_of(layer_a, pair.first.polygon)?;
            let n2 = self.net_of(layer_b, pair.second.polygon)?;
            match (n1, n2) {
                (Some(a), Some(b)) if a == b => same.push(pair.clone()),
                (Some(_), Some(_)) => different.push(pair.clone()),
                _ => log::warn!(
                    "edge pair on {layer_a}/{layer_b} did not resolve to a net; dropped"
                ),
            }
        }
        Ok((EdgePairSet::new(same), EdgePairSet::new(different)))
    }

    /// Two-threshold, net-filtered self-spacing: the connected bucket is
    /// the tight scan as-is; the unconnected bucket keeps only
    /// different-potential pairs of the loose scan, plus a one-grid
    /// singularity scan that catches near-zero gaps regardless of net.
    pub fn conn_space(
        &self,
        layer: &str,
        conn_d: Coord,
        unconn_d: Coord,
        metric: DistanceMetric,
        tol: Coord,
    ) -> Result<(Region, Region), DrcError> {
        if conn_d > unconn_d {
            return Err(DrcError::config(
                "connected threshold exceeds unconnected threshold",
            ));
        }
        let region = self.layer_region(layer)?.clone();
        let connected = metrics::space(&region, conn_d, metric)?.polygons(tol)?;
        let loose = metrics::space(&region, unconn_d, metric)?;
        let singularity = metrics::space(&region, 1, DistanceMetric::Euclidean)?;
        let (_, different) = self.partition_by_net(layer, layer, &loose)?;
        let unconnected = different
            .polygons(tol)?
            .or(&singularity.polygons(tol)?)?;
        Ok((connected, unconnected))
    }

    /// Two-threshold, net-filtered cross-layer separation.
    pub fn conn_separation(
        &self,
        layer_a: &str,
        layer_b: &str,
        conn_d: Coord,
        unconn_d: Coord,
        metric: DistanceMetric,
        tol: Coord,
    ) -> Result<(Region, Region), DrcError> {
        if conn_d > unconn_d {
            return Err(DrcError::config(
                "connected threshold exceeds unconnected threshold",
            ));
        }
        let a = self.layer_region(layer_a)?.clone();
        let b = self.layer_region(layer_b)?.clone();
        let connected = metrics::separation(&a, &b, conn_d, metric)?.polygons(tol)?;
        let loose = metrics::separation(&a, &b, unconn_d, metric)?;
        let (_, different) = self.partition_by_net(layer_a, layer_b, &loose)?;
        Ok((connected, different.polygons(tol)?))
    }
}

impl Default for Connectivity {
    fn default() -> Self {
        Self::new()
    }
}

// ── Union-find ───────────────────────────────────────────────────────

struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            self.parent[ra.max(rb)] = ra.min(rb);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verilith_core::geometry::um;
    use verilith_core::Polygon;

    fn layer_map(entries: Vec<(&str, Region)>) -> LayerMap {
        entries
            .into_iter()
            .map(|(n, r)| (n.to_string(), r))
            .collect()
    }

    /// Two metal1 shapes bridged by a contact overlapping both.
    fn bridged_design() -> LayerMap {
        let metal1 = Region::from_polygons(vec![
            Polygon::rect(0, 0, um(1.0), um(1.0)),
            Polygon::rect(um(1.8), 0, um(2.8), um(1.0)),
        ])
        .unwrap();
        // The contact spans the gap and overlaps both metal shapes.
        let contact = Region::rect(um(0.8), um(0.4), um(2.0), um(0.6));
        layer_map(vec![("metal1", metal1), ("contact", contact)])
    }

    #[test]
    fn test_declarations_rejected_after_build() {
        let mut conn = Connectivity::new();
        conn.connect("contact", "metal1").unwrap();
        conn.build(&bridged_design(), 0).unwrap();
        assert!(conn.connect("metal1", "via1").is_err());
        let mut conn2 = Connectivity::new();
        conn2.connect("contact", "metal1").unwrap();
        assert!(conn2.build(&bridged_design(), 0).is_ok());
        assert!(conn2.build(&bridged_design(), 0).is_err(), "build is terminal");
    }

    #[test]
    fn test_probe_before_build_is_configuration_error() {
        let conn = Connectivity::new();
        assert!(conn.probe_net("metal1", Point::zero()).is_err());
    }

    #[test]
    fn test_bridge_joins_nets() {
        let mut conn = Connectivity::new();
        conn.connect("contact", "metal1").unwrap();
        conn.build(&bridged_design(), 0).unwrap();

        let left = conn
            .probe_net("metal1", Point::new(um(0.5), um(0.5)))
            .unwrap()
            .unwrap();
        let right = conn
            .probe_net("metal1", Point::new(um(2.2), um(0.5)))
            .unwrap()
            .unwrap();
        assert_eq!(left, right, "contact shorts the two metal shapes");

        let miss = conn
            .probe_net("metal1", Point::new(um(1.4), um(0.5)))
            .unwrap();
        assert!(miss.is_none(), "gap point hits no shape");
    }

    #[test]
    fn test_unbridged_nets_differ() {
        let metal1 = Region::from_polygons(vec![
            Polygon::rect(0, 0, um(1.0), um(1.0)),
            Polygon::rect(um(1.8), 0, um(2.8), um(1.0)),
        ])
        .unwrap();
        let contact = Region::rect(um(5.0), um(5.0), um(5.2), um(5.2));
        let mut conn = Connectivity::new();
        conn.connect("contact", "metal1").unwrap();
        conn.build(&layer_map(vec![("metal1", metal1), ("contact", contact)]), 0)
            .unwrap();
        let left = conn
            .probe_net("metal1", Point::new(um(0.5), um(0.5)))
            .unwrap()
            .unwrap();
        let right = conn
            .probe_net("metal1", Point::new(um(2.2), um(0.5)))
            .unwrap()
            .unwrap();
        assert_ne!(left, right);
    }

    #[test]
    fn test_transitive_connection_through_stack() {
        // comp –contact– metal1 –via1– metal2: probe on comp and metal2
        // agree without any direct declaration between them.
        let comp = Region::rect(0, 0, um(1.0), um(1.0));
        let contact = Region::rect(um(0.4), um(0.4), um(0.6), um(0.6));
        let metal1 = Region::rect(um(0.2), um(0.2), um(0.8), um(0.8));
        let via1 = Region::rect(um(0.45), um(0.45), um(0.55), um(0.55));
        let metal2 = Region::rect(um(0.3), um(0.3), um(0.7), um(0.7));
        let layers = layer_map(vec![
            ("comp", comp),
            ("contact", contact),
            ("metal1", metal1),
            ("via1", via1),
            ("metal2", metal2),
        ]);
        let mut conn = Connectivity::new();
        conn.connect("comp", "contact").unwrap();
        conn.connect("contact", "metal1").unwrap();
        conn.connect("metal1", "via1").unwrap();
        conn.connect("via1", "metal2").unwrap();
        conn.build(&layers, 0).unwrap();

        let on_comp = conn
            .probe_net("comp", Point::new(um(0.1), um(0.1)))
            .unwrap()
            .unwrap();
        let on_metal2 = conn
            .probe_net("metal2", Point::new(um(0.35), um(0.35)))
            .unwrap()
            .unwrap();
        assert_eq!(on_comp, on_metal2, "equivalence is transitive");
    }

    #[test]
    fn test_conn_space_thresholds_must_be_ordered() {
        let mut conn = Connectivity::new();
        conn.connect("contact", "metal1").unwrap();
        conn.build(&bridged_design(), 0).unwrap();
        assert!(matches!(
            conn.conn_space("metal1", um(1.4), um(0.6), DistanceMetric::Euclidean, 1),
            Err(DrcError::Configuration(_))
        ));
    }

    #[test]
    fn test_connected_pair_passes_loose_threshold() {
        // Same-potential shapes 0.8 µm apart, thresholds 0.6 (connected)
        // and 1.4 (unconnected): no violation in either bucket.
        let mut conn = Connectivity::new();
        conn.connect("contact", "metal1").unwrap();
        conn.build(&bridged_design(), 0).unwrap();
        let (connected, unconnected) = conn
            .conn_space("metal1", um(0.6), um(1.4), DistanceMetric::Euclidean, 1)
            .unwrap();
        assert!(
            connected.is_empty(),
            "0.8 µm gap satisfies the 0.6 µm same-potential bound"
        );
        assert!(
            unconnected.is_empty(),
            "same-potential pair must not hit the different-potential rule"
        );
    }

    #[test]
    fn test_unconnected_pair_fails_loose_threshold() {
        let metal1 = Region::from_polygons(vec![
            Polygon::rect(0, 0, um(1.0), um(1.0)),
            Polygon::rect(um(1.8), 0, um(2.8), um(1.0)),
        ])
        .unwrap();
        let contact = Region::rect(um(10.0), um(10.0), um(10.2), um(10.2));
        let mut conn = Connectivity::new();
        conn.connect("contact", "metal1").unwrap();
        conn.build(&layer_map(vec![("metal1", metal1), ("contact", contact)]), 0)
            .unwrap();
        let (connected, unconnected) = conn
            .conn_space("metal1", um(0.6), um(1.4), DistanceMetric::Euclidean, 1)
            .unwrap();
        assert!(connected.is_empty());
        assert!(
            !unconnected.is_empty(),
            "0.8 µm gap violates the 1.4 µm different-potential bound"
        );
    }

    #[test]
    fn test_partition_is_exhaustive_and_exclusive() {
        let mut conn = Connectivity::new();
        conn.connect("contact", "metal1").unwrap();
        conn.build(&bridged_design(), 0).unwrap();
        let region = conn.layer_region("metal1").unwrap().clone();
        let loose = metrics::space(&region, um(1.4), DistanceMetric::Euclidean).unwrap();
        assert!(!loose.is_empty());
        let (same, different) = conn.partition_by_net("metal1", "metal1", &loose).unwrap();
        assert_eq!(same.len() + different.len(), loose.len());
        assert_eq!(same.len(), loose.len(), "bridged shapes share a net");
        assert!(different.is_empty());
    }

    #[test]
    fn test_conn_separation_between_layers() {
        // poly2 0.8 µm from an unrelated metal1 shape: different nets,
        // loose 1.4 µm bound applies.
        let metal1 = Region::rect(0, 0, um(1.0), um(1.0));
        let poly2 = Region::rect(um(1.8), 0, um(2.8), um(1.0));
        let contact = Region::rect(um(10.0), 0, um(10.2), um(0.2));
        let layers = layer_map(vec![
            ("metal1", metal1),
            ("poly2", poly2),
            ("contact", contact),
        ]);
        let mut conn = Connectivity::new();
        conn.connect("contact", "metal1").unwrap();
        conn.connect("contact", "poly2").unwrap();
        conn.build(&layers, 0).unwrap();
        let (connected, unconnected) = conn
            .conn_separation(
                "metal1",
                "poly2",
                um(0.6),
                um(1.4),
                DistanceMetric::Euclidean,
                1,
            )
            .unwrap();
        assert!(connected.is_empty(), "0.8 µm ≥ 0.6 µm tight bound");
        assert!(!unconnected.is_empty(), "0.8 µm < 1.4 µm loose bound");
    }
}
