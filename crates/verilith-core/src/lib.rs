//! # Verilith Core
//!
//! Geometry kernel and layout database for the Verilith DRC engine:
//! fixed-point coordinates on a 1 nm grid, polygons with holes, nonzero-
//! winding boolean set algebra, Minkowski sizing, region selection
//! operators, R-tree spatial indexing, and a hierarchical cell database
//! with flat and per-cell-memoized flattening.

pub mod boolean;
pub mod cell;
pub mod database;
pub mod edge;
pub mod error;
pub mod geometry;
pub mod layer;
pub mod polygon;
pub mod region;
pub mod sizing;
pub mod spatial;

pub use cell::{Cell, CellId, CellInstance, Rotation, Shape, Transform};
pub use database::{FlattenMode, LayoutDatabase};
pub use edge::Edge;
pub use error::GeometryError;
pub use geometry::{to_um, to_um2, um, BBox, Coord, Point, DBU_PER_UM, MAX_COORD};
pub use layer::{LayerDef, LayerKey, LayerTable};
pub use polygon::Polygon;
pub use region::Region;
pub use sizing::SizeKernel;
