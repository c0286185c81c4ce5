use rstar::{PointDistance, RTree, RTreeObject, AABB};

use crate::geometry::{BBox, Point};

/// An entry in the R-tree spatial index, referencing an item by its index.
#[derive(Debug, Clone)]
pub struct SpatialEntry {
    /// Index into the owning collection (polygons, edges, shapes).
    pub item_index: usize,
    /// Bounding box of the item.
    pub bbox: BBox,
}

impl RTreeObject for SpatialEntry {
    type Envelope = AABB<[i64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(
            [self.bbox.min.x, self.bbox.min.y],
            [self.bbox.max.x, self.bbox.max.y],
        )
    }
}

impl PointDistance for SpatialEntry {
    fn distance_2(&self, point: &[i64; 2]) -> i64 {
        let dx = if point[0] < self.bbox.min.x {
            self.bbox.min.x - point[0]
        } else if point[0] > self.bbox.max.x {
            point[0] - self.bbox.max.x
        } else {
            0
        };
        let dy = if point[1] < self.bbox.min.y {
            self.bbox.min.y - point[1]
        } else if point[1] > self.bbox.max.y {
            point[1] - self.bbox.max.y
        } else {
            0
        };
        dx * dx + dy * dy
    }
}

/// Spatial index for point queries and window culling over bounding boxes.
pub struct SpatialIndex {
    tree: RTree<SpatialEntry>,
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self { tree: RTree::new() }
    }

    /// Bulk-load the index from item bounding boxes.
    pub fn build(entries: Vec<SpatialEntry>) -> Self {
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    pub fn insert(&mut self, entry: SpatialEntry) {
        self.tree.insert(entry);
    }

    /// All entries whose bounding box contains the given point.
    pub fn query_point(&self, point: &Point) -> Vec<&SpatialEntry> {
        self.tree.locate_all_at_point(&[point.x, point.y]).collect()
    }

    /// All entries whose bounding box intersects the given window.
    pub fn query_window(&self, window: &BBox) -> Vec<&SpatialEntry> {
        let envelope = AABB::from_corners(
            [window.min.x, window.min.y],
            [window.max.x, window.max.y],
        );
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spatial_query() {
        let entries = vec![
            SpatialEntry {
                item_index: 0,
                bbox: BBox::new(Point::new(0, 0), Point::new(10, 10)),
            },
            SpatialEntry {
                item_index: 1,
                bbox: BBox::new(Point::new(20, 20), Point::new(30, 30)),
            },
        ];
        let index = SpatialIndex::build(entries);

        let results = index.query_point(&Point::new(5, 5));
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].item_index, 0);

        let results = index.query_point(&Point::new(25, 25));
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].item_index, 1);

        let window = BBox::new(Point::new(-5, -5), Point::new(15, 15));
        let results = index.query_window(&window);
        assert_eq!(results.len(), 1);
    }
}
