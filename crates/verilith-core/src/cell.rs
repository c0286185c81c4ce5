use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::{BBox, Coord, Point};
use crate::layer::LayerKey;
use crate::polygon::Polygon;
use crate::region::Region;

/// Unique cell identifier.
pub type CellId = Uuid;

/// Rotation in 90° steps, the only rotations an integer grid represents
/// exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Rotation {
    #[default]
    R0,
    R90,
    R180,
    R270,
}

impl Rotation {
    pub fn apply(&self, p: Point) -> Point {
        match self {
            Rotation::R0 => p,
            Rotation::R90 => Point::new(-p.y, p.x),
            Rotation::R180 => Point::new(-p.x, -p.y),
            Rotation::R270 => Point::new(p.y, -p.x),
        }
    }
}

/// Placement transform for subcell instances: mirror, then rotate, then
/// translate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Transform {
    pub offset: Point,
    pub rotation: Rotation,
    pub mirror_x: bool,
}

impl Transform {
    pub fn translate(x: Coord, y: Coord) -> Self {
        Self {
            offset: Point::new(x, y),
            ..Default::default()
        }
    }

    pub fn apply(&self, p: Point) -> Point {
        let p = if self.mirror_x { Point::new(p.x, -p.y) } else { p };
        let p = self.rotation.apply(p);
        p + self.offset
    }

    pub fn apply_bbox(&self, bbox: &BBox) -> BBox {
        let corners = [
            self.apply(bbox.min),
            self.apply(Point::new(bbox.max.x, bbox.min.y)),
            self.apply(bbox.max),
            self.apply(Point::new(bbox.min.x, bbox.max.y)),
        ];
        BBox::from_points(&corners).expect("four corners")
    }
}

impl Region {
    /// The region under an instance placement. Mirroring flips ring
    /// winding; reconstruction through [`Polygon::with_holes`] restores
    /// the canonical orientation.
    pub fn transformed(&self, t: &Transform) -> Region {
        let polys = self
            .polygons()
            .iter()
            .map(|p| transform_polygon(p, t))
            .collect();
        Region::from_raw(polys)
    }
}

pub fn transform_polygon(poly: &Polygon, t: &Transform) -> Polygon {
    let outer = poly.outer().iter().map(|p| t.apply(*p)).collect();
    let holes = poly
        .holes()
        .iter()
        .map(|h| h.iter().map(|p| t.apply(*p)).collect())
        .collect();
    Polygon::with_holes(outer, holes)
}

/// A geometric primitive placed in a cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Rect {
        layer: LayerKey,
        ll: Point,
        ur: Point,
    },
    Polygon {
        layer: LayerKey,
        polygon: Polygon,
    },
    Path {
        layer: LayerKey,
        points: Vec<Point>,
        width: Coord,
    },
    Via {
        bottom: LayerKey,
        cut: LayerKey,
        top: LayerKey,
        center: Point,
        width: Coord,
        height: Coord,
    },
}

impl Shape {
    pub fn rect(layer: LayerKey, x1: Coord, y1: Coord, x2: Coord, y2: Coord) -> Self {
        Shape::Rect {
            layer,
            ll: Point::new(x1.min(x2), y1.min(y2)),
            ur: Point::new(x1.max(x2), y1.max(y2)),
        }
    }

    /// Layers this shape draws on.
    pub fn layers(&self) -> Vec<LayerKey> {
        match self {
            Shape::Rect { layer, .. }
            | Shape::Polygon { layer, .. }
            | Shape::Path { layer, .. } => vec![*layer],
            Shape::Via { cut, .. } => vec![*cut],
        }
    }

    /// The shape's footprint on a given layer, as raw polygons.
    pub fn polygons_on(&self, key: LayerKey) -> Vec<Polygon> {
        match self {
            Shape::Rect { layer, ll, ur } if *layer == key => {
                vec![Polygon::rect(ll.x, ll.y, ur.x, ur.y)]
            }
            Shape::Polygon { layer, polygon } if *layer == key => vec![polygon.clone()],
            Shape::Path {
                layer,
                points,
                width,
            } if *layer == key => path_polygons(points, *width),
            Shape::Via {
                cut,
                center,
                width,
                height,
                ..
            } if *cut == key => {
                vec![Polygon::rect(
                    center.x - width / 2,
                    center.y - height / 2,
                    center.x + width / 2,
                    center.y + height / 2,
                )]
            }
            _ => Vec::new(),
        }
    }

    pub fn bbox(&self) -> Option<BBox> {
        match self {
            Shape::Rect { ll, ur, .. } => Some(BBox::new(*ll, *ur)),
            Shape::Polygon { polygon, .. } => polygon.bbox(),
            Shape::Path { points, width, .. } => {
                BBox::from_points(points).map(|b| b.expanded(width / 2))
            }
            Shape::Via {
                center,
                width,
                height,
                ..
            } => Some(BBox::new(
                Point::new(center.x - width / 2, center.y - height / 2),
                Point::new(center.x + width / 2, center.y + height / 2),
            )),
        }
    }
}

/// Expand a path centerline into per-segment quads plus joint squares;
/// pieces overlap and are merged by the region that collects them.
fn path_polygons(points: &[Point], width: Coord) -> Vec<Polygon> {
    let half = width / 2;
    let mut out = Vec::new();
    for w in points.windows(2) {
        let (p, q) = (w[0], w[1]);
        if p == q {
            continue;
        }
        let dx = (q.x - p.x) as f64;
        let dy = (q.y - p.y) as f64;
        let len = (dx * dx + dy * dy).sqrt();
        let nx = (-dy / len * half as f64).round() as Coord;
        let ny = (dx / len * half as f64).round() as Coord;
        out.push(Polygon::new(vec![
            Point::new(p.x + nx, p.y + ny),
            Point::new(p.x - nx, p.y - ny),
            Point::new(q.x - nx, q.y - ny),
            Point::new(q.x + nx, q.y + ny),
        ]));
    }
    // Square joints keep bends solid regardless of angle.
    if points.len() > 2 {
        for p in &points[1..points.len() - 1] {
            out.push(Polygon::rect(p.x - half, p.y - half, p.x + half, p.y + half));
        }
    }
    out
}

/// A reference to a subcell placed within a parent cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellInstance {
    pub id: Uuid,
    pub cell_id: CellId,
    pub instance_name: String,
    pub transform: Transform,
}

impl CellInstance {
    pub fn new(cell_id: CellId, instance_name: &str, transform: Transform) -> Self {
        Self {
            id: Uuid::new_v4(),
            cell_id,
            instance_name: instance_name.to_string(),
            transform,
        }
    }
}

/// A layout cell containing shapes and subcell references.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cell {
    pub id: CellId,
    pub name: String,
    pub shapes: Vec<Shape>,
    pub instances: Vec<CellInstance>,
}

impl Cell {
    pub fn new(name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            shapes: Vec::new(),
            instances: Vec::new(),
        }
    }

    pub fn add_shape(&mut self, shape: Shape) {
        self.shapes.push(shape);
    }

    pub fn add_instance(&mut self, instance: CellInstance) {
        self.instances.push(instance);
    }

    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /// Bounding box of the cell's own shapes (subcells not included).
    pub fn local_bbox(&self) -> Option<BBox> {
        self.shapes
            .iter()
            .filter_map(|s| s.bbox())
            .reduce(|a, b| a.union(&b))
    }
}
