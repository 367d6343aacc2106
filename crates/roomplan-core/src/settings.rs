use serde::{Deserialize, Serialize};

use crate::geometry::Point;

/// Grid spacing used when no settings are supplied.
pub const SNAP_SIZE: f64 = 20.0;

/// Editor tuning shared by every component operating on a scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    /// Grid unit every coordinate is rounded to.
    pub snap_size: f64,
    /// Footprint of a rack without explicit dimensions.
    pub rack_width: f64,
    pub rack_height: f64,
    /// Maximum number of undo snapshots kept.
    pub history_depth: usize,
    /// Padding around the union of a pod's racks.
    pub pod_padding: f64,
    /// Distance a projected point is pulled toward the room centroid.
    pub inside_nudge: f64,
    /// Rack origin used when the room has no bounding box.
    pub default_rack_anchor: Point,
    /// Names of the layers created by `Scene::initialize`.
    pub layer_names: Vec<String>,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            snap_size: SNAP_SIZE,
            rack_width: 40.0,
            rack_height: 40.0,
            history_depth: 50,
            pod_padding: 10.0,
            inside_nudge: 5.0,
            default_rack_anchor: Point::new(40.0, 40.0),
            layer_names: vec![
                "Electrical circuits".to_string(),
                "Floor surfaces".to_string(),
                "Racks".to_string(),
            ],
        }
    }
}

impl EditorSettings {
    pub fn with_snap_size(mut self, snap_size: f64) -> Self {
        self.snap_size = snap_size;
        self
    }

    pub fn with_history_depth(mut self, depth: usize) -> Self {
        self.history_depth = depth;
        self
    }

    pub fn with_rack_size(mut self, width: f64, height: f64) -> Self {
        self.rack_width = width;
        self.rack_height = height;
        self
    }
}
