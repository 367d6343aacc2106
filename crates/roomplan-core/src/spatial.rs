use rstar::{Envelope, PointDistance, RTree, RTreeObject, AABB};

use crate::geometry::{is_point_in_polygon, pod_boundaries, BBox, Point};
use crate::layer::Layer;
use crate::settings::EditorSettings;

/// What a pointer can land on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HitTarget {
    /// Index into the layer's racks.
    Rack(usize),
    Pod(String),
}

/// An entry in the R-tree hit index.
#[derive(Debug, Clone)]
pub struct SpatialEntry {
    pub target: HitTarget,
    /// Axis-aligned box of the target.
    pub bbox: BBox,
    /// Exact outline for rotated racks; `None` means the box is exact.
    pub outline: Option<[Point; 4]>,
}

impl SpatialEntry {
    fn contains(&self, point: &Point) -> bool {
        match &self.outline {
            Some(corners) => is_point_in_polygon(point.x, point.y, corners),
            None => self.bbox.contains_point(point),
        }
    }
}

impl RTreeObject for SpatialEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(
            [self.bbox.min.x, self.bbox.min.y],
            [self.bbox.max.x, self.bbox.max.y],
        )
    }
}

impl PointDistance for SpatialEntry {
    /// Squared distance to the bounding box.
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        <AABB<[f64; 2]> as Envelope>::distance_2(&self.envelope(), point)
    }

    fn contains_point(&self, point: &[f64; 2]) -> bool {
        self.contains(&Point::new(point[0], point[1]))
    }
}

/// Pointer hit-testing over one layer's racks and pod outlines.
///
/// Built on demand from a layer; rebuild after the layer changes.
pub struct SpatialIndex {
    tree: RTree<SpatialEntry>,
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self { tree: RTree::new() }
    }

    pub fn build(entries: Vec<SpatialEntry>) -> Self {
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Index every positioned rack and every pod boundary of `layer`.
    pub fn for_layer(layer: &Layer, settings: &EditorSettings) -> Self {
        let mut entries: Vec<SpatialEntry> = layer
            .racks
            .iter()
            .enumerate()
            .filter(|(_, r)| r.has_position())
            .filter_map(|(i, r)| {
                let corners = r.corners(settings);
                BBox::from_points(&corners).map(|bbox| SpatialEntry {
                    target: HitTarget::Rack(i),
                    bbox,
                    outline: (r.rotation != 0.0).then_some(corners),
                })
            })
            .collect();
        entries.extend(
            pod_boundaries(&layer.racks, &layer.pods, settings)
                .into_iter()
                .map(|b| SpatialEntry {
                    target: HitTarget::Pod(b.pod_id),
                    bbox: b.bbox,
                    outline: None,
                }),
        );
        Self::build(entries)
    }

    /// Entries whose outline contains `point`.
    pub fn query_point(&self, point: &Point) -> Vec<&SpatialEntry> {
        self.tree.locate_all_at_point(&[point.x, point.y]).collect()
    }

    /// Entries intersecting the given box.
    pub fn query_viewport(&self, viewport: &BBox) -> Vec<&SpatialEntry> {
        let envelope = AABB::from_corners(
            [viewport.min.x, viewport.min.y],
            [viewport.max.x, viewport.max.y],
        );
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .collect()
    }

    /// Topmost rack under the pointer. Later racks draw above earlier ones.
    pub fn rack_at(&self, point: &Point) -> Option<usize> {
        self.query_point(point)
            .into_iter()
            .filter_map(|e| match e.target {
                HitTarget::Rack(i) => Some(i),
                HitTarget::Pod(_) => None,
            })
            .max()
    }

    pub fn pod_at(&self, point: &Point) -> Option<String> {
        self.query_point(point).into_iter().find_map(|e| match &e.target {
            HitTarget::Pod(id) => Some(id.clone()),
            HitTarget::Rack(_) => None,
        })
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
