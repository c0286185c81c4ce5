use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cell::{Cell, CellId};
use crate::error::GeometryError;
use crate::geometry::BBox;
use crate::layer::{LayerKey, LayerTable};
use crate::polygon::Polygon;
use crate::region::Region;

/// Maximum instance nesting the flattener follows before assuming a
/// recursive hierarchy.
const MAX_HIERARCHY_DEPTH: usize = 64;

/// How layer geometry is assembled from the cell hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlattenMode {
    /// Walk every instance and collect transformed shapes directly.
    Flat,
    /// Merge each distinct cell's layer geometry once and reuse the
    /// result across repeated instances.
    Deep,
}

/// The central layout database: cells, the technology layer table, and the
/// selected top cell.
#[derive(Debug, Serialize, Deserialize)]
pub struct LayoutDatabase {
    /// Database identifier.
    pub id: Uuid,
    /// Design name.
    pub name: String,
    /// Technology layers.
    pub layer_table: LayerTable,
    /// All cells indexed by ID.
    cells: HashMap<CellId, Cell>,
    /// Top-level cell (entry point for hierarchy).
    pub top_cell: Option<CellId>,
}

impl LayoutDatabase {
    pub fn new(name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            layer_table: LayerTable::new(),
            cells: HashMap::new(),
            top_cell: None,
        }
    }

    // ── Cell management ──────────────────────────────────────────────

    pub fn add_cell(&mut self, cell: Cell) -> CellId {
        let id = cell.id;
        self.cells.insert(id, cell);
        if self.top_cell.is_none() {
            self.top_cell = Some(id);
        }
        id
    }

    pub fn get_cell(&self, id: &CellId) -> Option<&Cell> {
        self.cells.get(id)
    }

    pub fn get_cell_mut(&mut self, id: &CellId) -> Option<&mut Cell> {
        self.cells.get_mut(id)
    }

    pub fn find_cell_by_name(&self, name: &str) -> Option<&Cell> {
        self.cells.values().find(|c| c.name == name)
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn all_cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.values()
    }

    /// Name of the top cell, if one is selected and present.
    pub fn top_cell_name(&self) -> Option<&str> {
        self.top_cell
            .and_then(|id| self.cells.get(&id))
            .map(|c| c.name.as_str())
    }

    // ── Flattening ───────────────────────────────────────────────────

    /// The merged geometry of one (layer, datatype) under the top cell.
    pub fn layer_region(
        &self,
        key: LayerKey,
        mode: FlattenMode,
    ) -> Result<Region, GeometryError> {
        let top = self.require_top()?;
        match mode {
            FlattenMode::Flat => {
                let mut polys = Vec::new();
                self.collect_flat(top, key, &mut polys, 0)?;
                Region::from_polygons(polys)
            }
            FlattenMode::Deep => {
                let mut memo: HashMap<CellId, Region> = HashMap::new();
                self.deep_region(top, key, &mut memo, 0)
            }
        }
    }

    fn require_top(&self) -> Result<CellId, GeometryError> {
        self.top_cell
            .filter(|id| self.cells.contains_key(id))
            .ok_or_else(|| GeometryError::Hierarchy("no top cell selected".into()))
    }

    fn cell_or_err(&self, id: CellId) -> Result<&Cell, GeometryError> {
        self.cells
            .get(&id)
            .ok_or_else(|| GeometryError::Hierarchy(format!("dangling cell reference {id}")))
    }

    fn check_depth(depth: usize) -> Result<(), GeometryError> {
        if depth > MAX_HIERARCHY_DEPTH {
            return Err(GeometryError::Hierarchy(
                "instance nesting exceeds limit; recursive hierarchy?".into(),
            ));
        }
        Ok(())
    }

    fn collect_flat(
        &self,
        id: CellId,
        key: LayerKey,
        out: &mut Vec<Polygon>,
        depth: usize,
    ) -> Result<(), GeometryError> {
        Self::check_depth(depth)?;
        let cell = self.cell_or_err(id)?;
        for shape in &cell.shapes {
            out.extend(shape.polygons_on(key));
        }
        for inst in &cell.instances {
            let mut child = Vec::new();
            self.collect_flat(inst.cell_id, key, &mut child, depth + 1)?;
            out.extend(
                child
                    .iter()
                    .map(|p| crate::cell::transform_polygon(p, &inst.transform)),
            );
        }
        Ok(())
    }

    fn deep_region(
        &self,
        id: CellId,
        key: LayerKey,
        memo: &mut HashMap<CellId, Region>,
        depth: usize,
    ) -> Result<Region, GeometryError> {
        Self::check_depth(depth)?;
        if let Some(r) = memo.get(&id) {
            return Ok(r.clone());
        }
        let cell = self.cell_or_err(id)?;
        let mut polys: Vec<Polygon> = cell
            .shapes
            .iter()
            .flat_map(|s| s.polygons_on(key))
            .collect();
        for inst in &cell.instances {
            let child = self.deep_region(inst.cell_id, key, memo, depth + 1)?;
            polys.extend(
                child
                    .transformed(&inst.transform)
                    .polygons()
                    .iter()
                    .cloned(),
            );
        }
        let region = Region::from_polygons(polys)?;
        memo.insert(id, region.clone());
        Ok(region)
    }

    // ── Design extent ────────────────────────────────────────────────

    /// Bounding box of the top cell with all hierarchy expanded.
    pub fn extent(&self) -> Result<Option<BBox>, GeometryError> {
        let top = self.require_top()?;
        self.cell_bbox(top, 0)
    }

    fn cell_bbox(&self, id: CellId, depth: usize) -> Result<Option<BBox>, GeometryError> {
        Self::check_depth(depth)?;
        let cell = self.cell_or_err(id)?;
        let mut bbox = cell.local_bbox();
        for inst in &cell.instances {
            if let Some(child) = self.cell_bbox(inst.cell_id, depth + 1)? {
                let placed = inst.transform.apply_bbox(&child);
                bbox = Some(match bbox {
                    Some(b) => b.union(&placed),
                    None => placed,
                });
            }
        }
        Ok(bbox)
    }

    /// Total shape count under the top cell, with instance multiplicity.
    pub fn flattened_shape_count(&self) -> Result<usize, GeometryError> {
        let top = self.require_top()?;
        self.count_shapes(top, 0)
    }

    fn count_shapes(&self, id: CellId, depth: usize) -> Result<usize, GeometryError> {
        Self::check_depth(depth)?;
        let cell = self.cell_or_err(id)?;
        let mut n = cell.shapes.len();
        for inst in &cell.instances {
            n += self.count_shapes(inst.cell_id, depth + 1)?;
        }
        Ok(n)
    }

    // ── Serialization ────────────────────────────────────────────────

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
