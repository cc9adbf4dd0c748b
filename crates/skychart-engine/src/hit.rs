//! Point-in-region hit-testing.
//!
//! Each boundary segment is treated as an implicitly closed polygon.
//! Candidates are found through an R\*-tree of segment bounding boxes and
//! confirmed with a ray-casting parity test.
//!
//! Regions do not overlap in IAU boundary data. If malformed input makes
//! two stored polygons overlap, [`RegionIndex::find_region_at_point`]
//! returns the region whose id sorts first; [`RegionIndex::find_regions_at_point`]
//! returns every match so the ambiguity can be surfaced.

use std::collections::BTreeMap;

use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{AABB, RTree};

use crate::region::RegionId;
use crate::types::{BoundarySegment, Point};

/// Substitute denominator for horizontal edges.
const HORIZONTAL_EDGE_EPSILON: f64 = 1e-12;

/// Ray-casting parity test.
///
/// Casts a ray toward +x and counts edge crossings, closing the polygon from
/// the last point back to the first. Polygons with fewer than three points
/// contain nothing. Points exactly on an edge get a consistent answer for
/// identical inputs but may fall either side.
#[must_use]
pub fn point_in_polygon(point: Point, polygon: &[Point]) -> bool {
    if polygon.len() < BoundarySegment::MIN_POINTS {
        return false;
    }

    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let pi = polygon[i];
        let pj = polygon[j];
        if (pi.y > point.y) != (pj.y > point.y) {
            let mut dy = pj.y - pi.y;
            if dy == 0.0 {
                dy = HORIZONTAL_EDGE_EPSILON;
            }
            let x_cross = (pj.x - pi.x) * (point.y - pi.y) / dy + pi.x;
            if point.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Position of a polygon in the index: region slot and segment order.
type PolygonKey = (usize, usize);

type IndexedBox = GeomWithData<Rectangle<[f64; 2]>, usize>;

/// Region id → boundary polygons, with a spatial index for lookups.
///
/// Rebuilt from scratch on every recompute; never updated in place.
#[derive(Debug, Clone)]
pub struct RegionIndex {
    regions: Vec<RegionId>,
    polygons: Vec<(PolygonKey, Vec<Point>)>,
    tree: RTree<IndexedBox>,
}

impl Default for RegionIndex {
    fn default() -> Self {
        Self {
            regions: Vec::new(),
            polygons: Vec::new(),
            tree: RTree::new(),
        }
    }
}

impl RegionIndex {
    /// Build an index from per-region segments.
    #[must_use]
    pub fn build(segments: &BTreeMap<RegionId, Vec<BoundarySegment>>) -> Self {
        let mut regions = Vec::with_capacity(segments.len());
        let mut polygons = Vec::new();
        let mut boxes = Vec::new();

        for (slot, (region, region_segments)) in segments.iter().enumerate() {
            regions.push(*region);
            for (order, segment) in region_segments.iter().enumerate() {
                let Some(bounds) = bounding_box(segment.points()) else {
                    continue;
                };
                boxes.push(GeomWithData::new(bounds, polygons.len()));
                polygons.push(((slot, order), segment.points().to_vec()));
            }
        }

        Self {
            regions,
            polygons,
            tree: RTree::bulk_load(boxes),
        }
    }

    /// Number of indexed polygons.
    #[must_use]
    pub fn polygon_count(&self) -> usize {
        self.polygons.len()
    }

    /// Number of regions with at least one segment.
    #[must_use]
    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    /// Returns `true` when nothing is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    /// First region (in id order) whose polygon contains `point`.
    #[must_use]
    pub fn find_region_at_point(&self, point: Point) -> Option<RegionId> {
        self.candidates(point)
            .into_iter()
            .find(|&idx| point_in_polygon(point, &self.polygons[idx].1))
            .map(|idx| self.regions[self.polygons[idx].0.0])
    }

    /// Every region whose polygons contain `point`, in id order.
    ///
    /// More than one entry means overlapping boundaries.
    #[must_use]
    pub fn find_regions_at_point(&self, point: Point) -> Vec<RegionId> {
        let mut found: Vec<RegionId> = self
            .candidates(point)
            .into_iter()
            .filter(|&idx| point_in_polygon(point, &self.polygons[idx].1))
            .map(|idx| self.regions[self.polygons[idx].0.0])
            .collect();
        found.dedup();
        found
    }

    /// Polygon indices whose bounding box covers `point`, in key order.
    fn candidates(&self, point: Point) -> Vec<usize> {
        if !point.is_finite() {
            return Vec::new();
        }
        let mut hits: Vec<usize> = self
            .tree
            .locate_all_at_point(&[point.x, point.y])
            .map(|entry| entry.data)
            .collect();
        hits.sort_unstable_by_key(|&idx| self.polygons[idx].0);
        hits
    }
}

fn bounding_box(points: &[Point]) -> Option<Rectangle<[f64; 2]>> {
    let first = points.iter().find(|p| p.is_finite())?;
    let (mut min, mut max) = ([first.x, first.y], [first.x, first.y]);
    for p in points.iter().filter(|p| p.is_finite()) {
        min = [min[0].min(p.x), min[1].min(p.y)];
        max = [max[0].max(p.x), max[1].max(p.y)];
    }
    Some(Rectangle::from_aabb(AABB::from_corners(min, max)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::region::normalize_region_id;

    fn square() -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ]
    }

    fn region(name: &str) -> RegionId {
        normalize_region_id(name).unwrap()
    }

    fn segment(name: &str, points: Vec<Point>) -> BoundarySegment {
        BoundarySegment::new(region(name), points).unwrap()
    }

    fn offset_square(dx: f64, dy: f64) -> Vec<Point> {
        square()
            .into_iter()
            .map(|p| Point::new(p.x + dx, p.y + dy))
            .collect()
    }

    #[test]
    fn square_inside_and_outside() {
        assert!(point_in_polygon(Point::new(5.0, 5.0), &square()));
        assert!(!point_in_polygon(Point::new(15.0, 5.0), &square()));
        assert!(!point_in_polygon(Point::new(-1.0, 5.0), &square()));
        assert!(!point_in_polygon(Point::new(5.0, 11.0), &square()));
    }

    #[test]
    fn on_edge_is_consistent() {
        let first = point_in_polygon(Point::new(10.0, 5.0), &square());
        for _ in 0..10 {
            assert_eq!(point_in_polygon(Point::new(10.0, 5.0), &square()), first);
        }
    }

    #[test]
    fn degenerate_polygons_contain_nothing() {
        assert!(!point_in_polygon(Point::new(0.0, 0.0), &[]));
        let line = [Point::new(0.0, 0.0), Point::new(10.0, 10.0)];
        assert!(!point_in_polygon(Point::new(5.0, 5.0), &line));
    }

    #[test]
    fn horizontal_edges_do_not_divide_by_zero() {
        // Ray at the height of a horizontal edge.
        let result = point_in_polygon(Point::new(5.0, 0.0), &square());
        assert_eq!(result, point_in_polygon(Point::new(5.0, 0.0), &square()));
        let flat = [
            Point::new(0.0, 5.0),
            Point::new(10.0, 5.0),
            Point::new(20.0, 5.0),
        ];
        assert!(!point_in_polygon(Point::new(5.0, 5.0), &flat));
    }

    #[test]
    fn concave_polygon() {
        // A "U" shape: the notch between the arms is outside.
        let u = [
            Point::new(0.0, 0.0),
            Point::new(30.0, 0.0),
            Point::new(30.0, 30.0),
            Point::new(20.0, 30.0),
            Point::new(20.0, 10.0),
            Point::new(10.0, 10.0),
            Point::new(10.0, 30.0),
            Point::new(0.0, 30.0),
        ];
        assert!(point_in_polygon(Point::new(5.0, 20.0), &u));
        assert!(point_in_polygon(Point::new(25.0, 20.0), &u));
        assert!(!point_in_polygon(Point::new(15.0, 20.0), &u));
        assert!(point_in_polygon(Point::new(15.0, 5.0), &u));
    }

    #[test]
    fn index_finds_region() {
        let mut segments = BTreeMap::new();
        segments.insert(region("Ori"), vec![segment("Ori", square())]);
        segments.insert(region("Tau"), vec![segment("Tau", offset_square(20.0, 0.0))]);
        let index = RegionIndex::build(&segments);

        assert_eq!(index.region_count(), 2);
        assert_eq!(index.polygon_count(), 2);
        assert_eq!(index.find_region_at_point(Point::new(5.0, 5.0)), Some(region("Ori")));
        assert_eq!(index.find_region_at_point(Point::new(25.0, 5.0)), Some(region("Tau")));
        assert_eq!(index.find_region_at_point(Point::new(15.0, 5.0)), None);
        assert_eq!(index.find_region_at_point(Point::new(f64::NAN, 5.0)), None);
    }

    #[test]
    fn region_with_disjoint_segments() {
        let mut segments = BTreeMap::new();
        segments.insert(
            region("Ser"),
            vec![
                segment("Ser", square()),
                segment("Ser", offset_square(100.0, 100.0)),
            ],
        );
        let index = RegionIndex::build(&segments);
        assert_eq!(index.find_region_at_point(Point::new(105.0, 105.0)), Some(region("Ser")));
        assert_eq!(index.find_region_at_point(Point::new(5.0, 5.0)), Some(region("Ser")));
        assert_eq!(index.find_region_at_point(Point::new(50.0, 50.0)), None);
    }

    #[test]
    fn overlap_resolves_by_region_order_and_is_reported() {
        let mut segments = BTreeMap::new();
        segments.insert(region("Tau"), vec![segment("Tau", offset_square(5.0, 0.0))]);
        segments.insert(region("Ori"), vec![segment("Ori", square())]);
        let index = RegionIndex::build(&segments);

        let p = Point::new(7.0, 5.0);
        for _ in 0..5 {
            assert_eq!(index.find_region_at_point(p), Some(region("Ori")));
        }
        assert_eq!(
            index.find_regions_at_point(p),
            vec![region("Ori"), region("Tau")]
        );
    }

    #[test]
    fn empty_index() {
        let index = RegionIndex::default();
        assert!(index.is_empty());
        assert_eq!(index.find_region_at_point(Point::new(0.0, 0.0)), None);
        assert!(index.find_regions_at_point(Point::new(0.0, 0.0)).is_empty());
    }
}
