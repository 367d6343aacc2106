use serde::{Deserialize, Serialize};

use roomplan_core::spatial::{HitTarget, SpatialIndex};
use roomplan_core::{Point, RackManager, RoomEditor};

use crate::viewport::Viewport;

/// Label color for text drawn over a `#rgb` or `#rrggbb` fill: black on light
/// fills, white on dark ones. Unreadable input gets white.
pub fn contrast_color(hex: &str) -> &'static str {
    let digits = hex.trim_start_matches('#');
    let expanded: String = match digits.len() {
        3 => digits.chars().flat_map(|c| [c, c]).collect(),
        6 => digits.to_string(),
        _ => return "#FFFFFF",
    };
    let channel = |i: usize| {
        expanded
            .get(i..i + 2)
            .and_then(|s| u8::from_str_radix(s, 16).ok())
    };
    let (Some(r), Some(g), Some(b)) = (channel(0), channel(2), channel(4)) else {
        return "#FFFFFF";
    };
    let luma = (0.299 * f64::from(r) + 0.587 * f64::from(g) + 0.114 * f64::from(b)) / 255.0;
    if luma > 0.5 {
        "#000000"
    } else {
        "#FFFFFF"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderRack {
    pub index: usize,
    pub name: String,
    /// Rotated outline, top-left corner first.
    pub corners: [Point; 4],
    pub rotation: f64,
    pub selected: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderFootprint {
    pub id: String,
    pub name: String,
    pub units: Vec<Point>,
    pub color: String,
    pub label_color: String,
    pub selected: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderPod {
    pub id: String,
    pub name: String,
    /// [min_x, min_y, max_x, max_y]
    pub bbox: [f64; 4],
}

/// Everything the canvas draws for one frame of the active layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderFrame {
    pub viewport: Viewport,
    pub layer_index: usize,
    pub grid_spacing: f64,
    pub walls: Vec<Point>,
    pub wall_selected: bool,
    pub wall_preview: Option<Point>,
    pub pillars: Vec<Point>,
    pub pillar_preview: Option<Point>,
    pub selected_pillars: Vec<usize>,
    /// Racks intersecting the visible area.
    pub racks: Vec<RenderRack>,
    pub pods: Vec<RenderPod>,
    pub footprints: Vec<RenderFootprint>,
    pub selected_units: Vec<Point>,
    pub hovered_unit: Option<Point>,
}

impl RenderFrame {
    pub fn empty(viewport: Viewport) -> Self {
        Self {
            viewport,
            layer_index: 0,
            grid_spacing: roomplan_core::settings::SNAP_SIZE,
            walls: Vec::new(),
            wall_selected: false,
            wall_preview: None,
            pillars: Vec::new(),
            pillar_preview: None,
            selected_pillars: Vec::new(),
            racks: Vec::new(),
            pods: Vec::new(),
            footprints: Vec::new(),
            selected_units: Vec::new(),
            hovered_unit: None,
        }
    }

    pub fn build(editor: &RoomEditor, viewport: Viewport) -> Self {
        let scene = &editor.scene;
        let mut frame = Self::empty(viewport);
        frame.layer_index = scene.current_layer_index();
        frame.grid_spacing = scene.settings.snap_size;
        frame.walls = scene.walls().to_vec();
        frame.wall_selected = editor.walls.is_selected();
        frame.wall_preview = editor.walls.preview_point();
        frame.pillars = scene.pillars().to_vec();
        frame.pillar_preview = editor.pillars.preview_point();
        frame.selected_pillars = editor.pillars.selected().to_vec();
        frame.selected_units = editor.footprints.selected_units().to_vec();
        frame.hovered_unit = editor.footprints.hovered_unit();

        let Some(layer) = scene.current_layer() else {
            return frame;
        };

        let index = SpatialIndex::for_layer(layer, &scene.settings);
        let mut visible: Vec<usize> = index
            .query_viewport(&viewport.visible_bounds())
            .into_iter()
            .filter_map(|e| match e.target {
                HitTarget::Rack(i) => Some(i),
                HitTarget::Pod(_) => None,
            })
            .collect();
        visible.sort_unstable();
        frame.racks = visible
            .into_iter()
            .filter_map(|i| {
                layer.racks.get(i).map(|rack| RenderRack {
                    index: i,
                    name: rack.name.clone(),
                    corners: rack.corners(&scene.settings),
                    rotation: rack.rotation,
                    selected: editor.racks.is_selected(i),
                })
            })
            .collect();

        frame.pods = RackManager::pod_boundaries(scene)
            .into_iter()
            .filter_map(|b| {
                let pod = layer.pods.iter().find(|p| p.id == b.pod_id)?;
                Some(RenderPod {
                    id: pod.id.clone(),
                    name: pod.name.clone(),
                    bbox: [b.bbox.min.x, b.bbox.min.y, b.bbox.max.x, b.bbox.max.y],
                })
            })
            .collect();

        let selected_footprint = editor.footprints.selected_footprint_id();
        frame.footprints = layer
            .footprints
            .iter()
            .filter(|f| f.is_placed())
            .map(|f| {
                let color = f.color.clone().unwrap_or_else(|| "#CCCCCC".to_string());
                RenderFootprint {
                    id: f.id.clone(),
                    name: f.name.clone(),
                    units: f.units.clone(),
                    label_color: contrast_color(&color).to_string(),
                    color,
                    selected: selected_footprint == Some(f.id.as_str()),
                }
            })
            .collect();

        log::trace!(
            "Built frame: {} racks, {} pods, {} footprints",
            frame.racks.len(),
            frame.pods.len(),
            frame.footprints.len()
        );
        frame
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
