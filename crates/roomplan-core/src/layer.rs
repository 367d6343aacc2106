use serde::{Deserialize, Deserializer, Serialize};

use crate::geometry::{rotated_corners, BBox, Point};
use crate::settings::EditorSettings;

/// A layer identifier, 1-based in creation order.
pub type LayerId = u32;

/// Anchor point of an electrical circuit drawn on the circuits layer.
pub type Circuit = Point;

/// An equipment rack placed on a layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rack {
    pub id: u32,
    pub room_id: u32,
    pub name: String,
    pub x: f64,
    pub y: f64,
    /// Degrees, always a multiple of 45.
    #[serde(default, deserialize_with = "null_as_zero")]
    pub rotation: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
}

fn null_as_zero<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0))
}

impl Rack {
    pub fn new(id: u32, room_id: u32, name: &str, x: f64, y: f64) -> Self {
        Self {
            id,
            room_id,
            name: name.to_string(),
            x,
            y,
            rotation: 0.0,
            pod_id: None,
            width: None,
            height: None,
        }
    }

    /// Stored dimensions, falling back to the configured default rack size.
    pub fn size(&self, settings: &EditorSettings) -> (f64, f64) {
        (
            self.width.unwrap_or(settings.rack_width),
            self.height.unwrap_or(settings.rack_height),
        )
    }

    pub fn center(&self, settings: &EditorSettings) -> Point {
        let (w, h) = self.size(settings);
        Point::new(self.x + w / 2.0, self.y + h / 2.0)
    }

    pub fn corners(&self, settings: &EditorSettings) -> [Point; 4] {
        let (w, h) = self.size(settings);
        rotated_corners(self.x, self.y, w, h, self.rotation)
    }

    /// Axis-aligned box around the rotated rack.
    pub fn bbox(&self, settings: &EditorSettings) -> Option<BBox> {
        BBox::from_points(&self.corners(settings))
    }

    pub fn has_position(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// A named group of racks. Membership lives on `Rack::pod_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pod {
    pub id: String,
    pub name: String,
}

/// A reserved area made of grid cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Footprint {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Top-left corners of the occupied grid cells.
    #[serde(default)]
    pub units: Vec<Point>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
}

impl Footprint {
    pub fn new(id: &str, name: &str, units: Vec<Point>, color: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            units,
            color: Some(color.to_string()),
            width: None,
            height: None,
            rotation: None,
        }
    }

    pub fn contains_unit(&self, x: f64, y: f64) -> bool {
        self.units.iter().any(|u| u.x == x && u.y == y)
    }

    pub fn is_placed(&self) -> bool {
        !self.units.is_empty()
    }

    /// Bounds of the unit origins (not including the far cell edges).
    pub fn unit_bounds(&self) -> Option<BBox> {
        BBox::from_points(&self.units)
    }
}

/// One named view over the room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub id: LayerId,
    pub name: String,
    #[serde(default)]
    pub racks: Vec<Rack>,
    #[serde(default)]
    pub pods: Vec<Pod>,
    #[serde(default)]
    pub walls: Vec<Point>,
    #[serde(default)]
    pub footprints: Vec<Footprint>,
    #[serde(default)]
    pub circuits: Vec<Circuit>,
    #[serde(default)]
    pub pillars: Vec<Point>,
}

impl Layer {
    pub fn new(id: LayerId, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            racks: Vec::new(),
            pods: Vec::new(),
            walls: Vec::new(),
            footprints: Vec::new(),
            circuits: Vec::new(),
            pillars: Vec::new(),
        }
    }

    pub fn with_walls(mut self, walls: Vec<Point>) -> Self {
        self.walls = walls;
        self
    }

    pub fn with_pillars(mut self, pillars: Vec<Point>) -> Self {
        self.pillars = pillars;
        self
    }

    /// True if any footprint on this layer owns the grid cell at (x, y).
    pub fn is_unit_occupied(&self, x: f64, y: f64) -> bool {
        self.footprints.iter().any(|f| f.contains_unit(x, y))
    }

    pub fn footprint(&self, id: &str) -> Option<&Footprint> {
        self.footprints.iter().find(|f| f.id == id)
    }

    pub fn footprint_mut(&mut self, id: &str) -> Option<&mut Footprint> {
        self.footprints.iter_mut().find(|f| f.id == id)
    }

    pub fn pod_members(&self, pod_id: &str) -> Vec<usize> {
        self.racks
            .iter()
            .enumerate()
            .filter(|(_, r)| r.pod_id.as_deref() == Some(pod_id))
            .map(|(i, _)| i)
            .collect()
    }

    /// Drop pods that no rack references anymore. Returns how many were removed.
    pub fn prune_empty_pods(&mut self) -> usize {
        let before = self.pods.len();
        let racks = &self.racks;
        self.pods
            .retain(|p| racks.iter().any(|r| r.pod_id.as_deref() == Some(p.id.as_str())));
        before - self.pods.len()
    }
}
