use serde::{Deserialize, Serialize};

use crate::error::SceneError;
use crate::geometry::{
    is_element_in_walls, is_point_in_polygon, normalize_rotation, snap, wall_bounding_box, Point,
    ViewTransform,
};
use crate::layer::Rack;
use crate::scene::Scene;
use crate::spatial::SpatialIndex;

/// Layer on which racks are shown but cannot be moved.
pub const FLOOR_LAYER_INDEX: usize = 1;

/// Mouse button that starts rack gestures.
pub const PRIMARY_BUTTON: u16 = 0;

/// Rack rotations snap to this many degrees.
pub const RACK_ROTATION_STEP: f64 = 45.0;

const CLIPBOARD_RACK_TYPE: &str = "rack";

/// Modifier keys held during a click.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub ctrl: bool,
    pub meta: bool,
}

impl Modifiers {
    pub fn ctrl() -> Self {
        Self {
            ctrl: true,
            meta: false,
        }
    }

    /// Ctrl or meta toggles membership instead of replacing the selection.
    pub fn toggles(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// Clipboard payload: the rack tagged with its kind.
#[derive(Debug, Serialize, Deserialize)]
struct ClipboardRack {
    #[serde(rename = "_type")]
    kind: String,
    #[serde(flatten)]
    rack: Rack,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct RackRotation {
    pub(crate) index: usize,
    pub(crate) start_angle: f64,
    pub(crate) initial_rotation: f64,
}

/// Rack selection plus the drag and rotate gestures on the active layer.
#[derive(Debug, Default)]
pub struct RackManager {
    pub(crate) selected: Vec<usize>,
    pub(crate) dragging: bool,
    /// Position of every rack on the layer when the drag started.
    pub(crate) positions_before_drag: Vec<Point>,
    /// Screen-space pointer at drag start.
    pub(crate) drag_origin: Option<Point>,
    pub(crate) rotation: Option<RackRotation>,
}

impl RackManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> &[usize] {
        &self.selected
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.selected.contains(&index)
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn is_rotating(&self) -> bool {
        self.rotation.is_some()
    }

    fn gestures_locked(scene: &Scene) -> bool {
        scene.current_layer_index() == FLOOR_LAYER_INDEX
    }

    fn next_rack_id(scene: &Scene) -> u32 {
        scene
            .current_layer()
            .and_then(|l| l.racks.iter().map(|r| r.id).max())
            .map_or(1, |id| id + 1)
    }

    // ── Creation ─────────────────────────────────────────────────────

    /// Where a new rack goes: `requested` if it fits inside the room, else the
    /// snapped center of the room's bounding box, else the first grid point
    /// (row by row) where the rack fits. Rooms without an outline use the
    /// configured anchor.
    pub fn placement(scene: &Scene, requested: Option<Point>) -> Point {
        let settings = &scene.settings;
        let unit = settings.snap_size;
        let (w, h) = (settings.rack_width, settings.rack_height);
        let walls = scene.walls();

        if !scene.has_room() {
            return requested.map_or(settings.default_rack_anchor, |p| p.snapped(unit));
        }
        let fits = |p: &Point| {
            is_point_in_polygon(p.x + w / 2.0, p.y + h / 2.0, walls)
                && is_element_in_walls(p.x, p.y, 0.0, walls, w, h)
        };

        if let Some(p) = requested.map(|p| p.snapped(unit)) {
            if fits(&p) {
                return p;
            }
            log::debug!("Requested rack position ({}, {}) is outside the room", p.x, p.y);
        }

        let Some(bbox) = wall_bounding_box(walls) else {
            return settings.default_rack_anchor;
        };
        let center = bbox.center();
        let centered = Point::new(snap(center.x - w / 2.0, unit), snap(center.y - h / 2.0, unit));
        if requested.is_none() && fits(&centered) {
            return centered;
        }

        let mut y = bbox.min.y + unit;
        while y < bbox.max.y {
            let mut x = bbox.min.x + unit;
            while x < bbox.max.x {
                let candidate = Point::new(snap(x - w / 2.0, unit), snap(y - h / 2.0, unit));
                if is_point_in_polygon(x, y, walls) && fits(&candidate) {
                    return candidate;
                }
                x += unit;
            }
            y += unit;
        }
        log::debug!("No interior grid point fits a rack; using the default anchor");
        settings.default_rack_anchor
    }

    /// Add a rack to the active layer and select it. Returns its index.
    pub fn create_rack(&mut self, scene: &mut Scene, room_id: u32, at: Option<Point>) -> Option<usize> {
        let count = scene.current_layer()?.racks.len();
        let position = Self::placement(scene, at);
        let rack = Rack::new(
            Self::next_rack_id(scene),
            room_id,
            &format!("Rack {}", count + 1),
            position.x,
            position.y,
        );
        scene.take_snapshot();
        let layer = scene.current_layer_mut()?;
        layer.racks.push(rack);
        let index = layer.racks.len() - 1;
        self.selected = vec![index];
        log::debug!("Created rack at ({}, {})", position.x, position.y);
        Some(index)
    }

    /// Copy a rack one grid unit down and right. The copy joins no pod.
    pub fn duplicate_rack(&mut self, scene: &mut Scene, index: usize) -> Option<usize> {
        let unit = scene.settings.snap_size;
        let source = scene.current_layer()?.racks.get(index)?;
        let mut copy = source.clone();
        copy.id = Self::next_rack_id(scene);
        copy.name = format!("{} (copy)", source.name);
        copy.x += unit;
        copy.y += unit;
        copy.pod_id = None;

        scene.take_snapshot();
        let layer = scene.current_layer_mut()?;
        layer.racks.push(copy);
        self.selected = vec![layer.racks.len() - 1];
        self.selected.first().copied()
    }

    /// Clipboard text for a rack.
    pub fn copy_rack(&self, scene: &Scene, index: usize) -> Option<String> {
        let rack = scene.current_layer()?.racks.get(index)?.clone();
        let payload = ClipboardRack {
            kind: CLIPBOARD_RACK_TYPE.to_string(),
            rack,
        };
        serde_json::to_string(&payload)
            .map_err(|e| log::error!("Failed to encode rack for the clipboard: {}", e))
            .ok()
    }

    /// Insert a rack from clipboard text, one grid unit off the original.
    /// Payloads of another kind are ignored.
    pub fn paste_rack(&mut self, scene: &mut Scene, clipboard: &str) -> Result<Option<usize>, SceneError> {
        let payload: ClipboardRack = serde_json::from_str(clipboard)?;
        if payload.kind != CLIPBOARD_RACK_TYPE {
            log::debug!("Ignoring clipboard payload of type {}", payload.kind);
            return Ok(None);
        }
        if scene.current_layer().is_none() {
            return Ok(None);
        }
        let unit = scene.settings.snap_size;
        let mut rack = payload.rack;
        rack.id = Self::next_rack_id(scene);
        rack.x += unit;
        rack.y += unit;
        if let Some(pod_id) = &rack.pod_id {
            let pod_exists = scene
                .current_layer()
                .is_some_and(|l| l.pods.iter().any(|p| &p.id == pod_id));
            if !pod_exists {
                rack.pod_id = None;
            }
        }

        scene.take_snapshot();
        let Some(layer) = scene.current_layer_mut() else {
            return Ok(None);
        };
        layer.racks.push(rack);
        self.selected = vec![layer.racks.len() - 1];
        Ok(self.selected.first().copied())
    }

    pub fn remove_rack(&mut self, scene: &mut Scene, index: usize) -> bool {
        if scene.current_layer().and_then(|l| l.racks.get(index)).is_none() {
            return false;
        }
        scene.take_snapshot();
        if let Some(layer) = scene.current_layer_mut() {
            layer.racks.remove(index);
            let pruned = layer.prune_empty_pods();
            if pruned > 0 {
                log::debug!("Removed {} empty pod(s)", pruned);
            }
        }
        self.selected.clear();
        true
    }

    pub fn update_rack_name(&self, scene: &mut Scene, index: usize, name: &str) -> bool {
        if scene.current_layer().and_then(|l| l.racks.get(index)).is_none() {
            return false;
        }
        scene.take_snapshot();
        if let Some(rack) = scene.current_layer_mut().and_then(|l| l.racks.get_mut(index)) {
            rack.name = name.to_string();
        }
        true
    }

    /// Set the rotation of the single selected rack, snapped to 45°.
    pub fn update_rack_rotation(&self, scene: &mut Scene, degrees: f64) -> bool {
        let [index] = self.selected[..] else {
            return false;
        };
        if scene.current_layer().and_then(|l| l.racks.get(index)).is_none() {
            return false;
        }
        scene.take_snapshot();
        if let Some(rack) = scene.current_layer_mut().and_then(|l| l.racks.get_mut(index)) {
            rack.rotation = normalize_rotation(degrees, RACK_ROTATION_STEP);
        }
        true
    }

    // ── Selection & gestures ─────────────────────────────────────────

    pub fn click_rack(&mut self, index: usize, modifiers: Modifiers) {
        if modifiers.toggles() {
            self.toggle(index);
        } else {
            self.selected = vec![index];
        }
    }

    fn toggle(&mut self, index: usize) {
        match self.selected.iter().position(|&i| i == index) {
            Some(pos) => {
                self.selected.remove(pos);
            }
            None => self.selected.push(index),
        }
    }

    /// Begin moving the selection. A plain press on an unselected rack selects
    /// only that rack; a press on a selected rack keeps the group.
    pub fn start_drag_rack(
        &mut self,
        scene: &mut Scene,
        index: usize,
        pointer: Point,
        modifiers: Modifiers,
        button: u16,
    ) -> bool {
        if button != PRIMARY_BUTTON || Self::gestures_locked(scene) {
            return false;
        }
        let Some(layer) = scene.current_layer() else {
            return false;
        };
        if index >= layer.racks.len() {
            return false;
        }
        if modifiers.toggles() {
            self.toggle(index);
        } else if !self.is_selected(index) {
            self.selected = vec![index];
        }
        self.positions_before_drag = layer.racks.iter().map(|r| Point::new(r.x, r.y)).collect();
        scene.take_snapshot();
        self.drag_origin = Some(pointer);
        self.dragging = true;
        true
    }

    /// Move every selected rack by the zoom-compensated pointer delta since
    /// the drag started. Racks whose center would leave the room stay put.
    pub fn drag_rack(&self, scene: &mut Scene, pointer: Point, view: &ViewTransform) -> bool {
        let Some(origin) = self.drag_origin.filter(|_| self.dragging) else {
            return false;
        };
        let (dx, dy) = view.scale_delta(&origin, &pointer);
        let unit = scene.settings.snap_size;
        let settings = scene.settings.clone();
        let walls = scene.walls().to_vec();
        let bounded = scene.has_room();
        let Some(layer) = scene.current_layer_mut() else {
            return false;
        };

        let mut moved = false;
        for &i in &self.selected {
            let (Some(before), Some(rack)) = (self.positions_before_drag.get(i), layer.racks.get_mut(i)) else {
                continue;
            };
            let (w, h) = rack.size(&settings);
            let nx = snap(before.x + dx, unit);
            let ny = snap(before.y + dy, unit);
            if bounded && !is_point_in_polygon(nx + w / 2.0, ny + h / 2.0, &walls) {
                log::debug!("Rack {} would leave the room at ({}, {})", rack.id, nx, ny);
                continue;
            }
            rack.x = nx;
            rack.y = ny;
            moved = true;
        }
        moved
    }

    /// Begin rotating one rack. Rotation always works on a single selection.
    pub fn start_rotate_rack(&mut self, scene: &mut Scene, index: usize, pointer: Point, view: &ViewTransform) -> bool {
        if Self::gestures_locked(scene) {
            return false;
        }
        let Some(rack) = scene.current_layer().and_then(|l| l.racks.get(index)) else {
            return false;
        };
        let center = rack.center(&scene.settings);
        let p = view.to_scene(&pointer);
        let gesture = RackRotation {
            index,
            start_angle: (p.y - center.y).atan2(p.x - center.x),
            initial_rotation: rack.rotation,
        };
        scene.take_snapshot();
        self.selected = vec![index];
        self.rotation = Some(gesture);
        true
    }

    pub fn rotate_rack(&self, scene: &mut Scene, pointer: Point, view: &ViewTransform) -> bool {
        let Some(gesture) = self.rotation else {
            return false;
        };
        let settings = scene.settings.clone();
        let Some(rack) = scene
            .current_layer_mut()
            .and_then(|l| l.racks.get_mut(gesture.index))
        else {
            return false;
        };
        let center = rack.center(&settings);
        let p = view.to_scene(&pointer);
        let angle = (p.y - center.y).atan2(p.x - center.x);
        let delta = (angle - gesture.start_angle).to_degrees();
        rack.rotation = normalize_rotation(gesture.initial_rotation + delta, RACK_ROTATION_STEP);
        true
    }

    /// Release drag/rotate state. Call on every gesture exit.
    pub fn reset_rack_state(&mut self) {
        self.dragging = false;
        self.positions_before_drag.clear();
        self.drag_origin = None;
        self.rotation = None;
    }

    /// Topmost rack under a scene-space point on the active layer.
    pub fn rack_at(scene: &Scene, point: &Point) -> Option<usize> {
        let layer = scene.current_layer()?;
        SpatialIndex::for_layer(layer, &scene.settings).rack_at(point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room() -> Scene {
        let mut scene = Scene::new();
        scene.set_walls(vec![
            Point::new(0.0, 0.0),
            Point::new(200.0, 0.0),
            Point::new(200.0, 200.0),
            Point::new(0.0, 200.0),
        ]);
        scene.initialize();
        scene.set_current_layer(2);
        scene
    }

    fn rack(scene: &Scene, index: usize) -> &Rack {
        &scene.current_layer().unwrap().racks[index]
    }

    #[test]
    fn test_create_rack_at_room_center() {
        let mut scene = room();
        let mut racks = RackManager::new();
        let index = racks.create_rack(&mut scene, 7, None).unwrap();
        let created = rack(&scene, index);
        assert_eq!((created.x, created.y), (80.0, 80.0));
        assert_eq!(created.room_id, 7);
        assert_eq!(created.name, "Rack 1");
        assert_eq!(racks.selected(), &[index]);
        assert!(scene.can_undo());

        racks.click_rack(index, Modifiers::ctrl());
        let second = racks.create_rack(&mut scene, 7, None).unwrap();
        assert_eq!(racks.selected(), &[second]);
    }

    #[test]
    fn test_outside_request_falls_back_to_scan() {
        let mut scene = room();
        let mut racks = RackManager::new();
        let index = racks
            .create_rack(&mut scene, 1, Some(Point::new(300.0, 300.0)))
            .unwrap();
        let placed = rack(&scene, index);
        assert_eq!((placed.x, placed.y), (0.0, 0.0));
        assert!(is_element_in_walls(placed.x, placed.y, 0.0, scene.walls(), 40.0, 40.0));

        let inside = racks
            .create_rack(&mut scene, 1, Some(Point::new(118.0, 61.0)))
            .unwrap();
        assert_eq!((rack(&scene, inside).x, rack(&scene, inside).y), (120.0, 60.0));
        assert_eq!(rack(&scene, inside).id, 2);
    }

    #[test]
    fn test_create_rack_without_room_uses_anchor() {
        let mut scene = Scene::new();
        scene.initialize();
        let mut racks = RackManager::new();
        let index = racks.create_rack(&mut scene, 1, None).unwrap();
        assert_eq!((rack(&scene, index).x, rack(&scene, index).y), (40.0, 40.0));
        assert!(RackManager::new().create_rack(&mut Scene::new(), 1, None).is_none());
    }

    #[test]
    fn test_click_selection() {
        let mut racks = RackManager::new();
        racks.click_rack(1, Modifiers::default());
        racks.click_rack(3, Modifiers::ctrl());
        assert_eq!(racks.selected(), &[1, 3]);
        racks.click_rack(1, Modifiers { ctrl: false, meta: true });
        assert_eq!(racks.selected(), &[3]);
        racks.click_rack(2, Modifiers::default());
        assert_eq!(racks.selected(), &[2]);
    }

    #[test]
    fn test_drag_checks_each_rack_independently() {
        let mut scene = room();
        let mut racks = RackManager::new();
        racks.create_rack(&mut scene, 1, Some(Point::new(20.0, 20.0)));
        racks.create_rack(&mut scene, 1, Some(Point::new(140.0, 20.0)));
        racks.click_rack(0, Modifiers::default());
        racks.click_rack(1, Modifiers::ctrl());

        let view = ViewTransform::new(2.0, Point::new(0.0, 0.0));
        assert!(racks.start_drag_rack(&mut scene, 1, Point::new(0.0, 0.0), Modifiers::default(), PRIMARY_BUTTON));
        assert_eq!(racks.selected(), &[0, 1]);
        // 80 screen pixels at zoom 2 is 40 scene units.
        assert!(racks.drag_rack(&mut scene, Point::new(82.0, 0.0), &view));
        assert_eq!((rack(&scene, 0).x, rack(&scene, 0).y), (60.0, 20.0));
        // The second rack's center would sit at x = 200, on the wall.
        assert_eq!((rack(&scene, 1).x, rack(&scene, 1).y), (140.0, 20.0));

        racks.reset_rack_state();
        assert!(!racks.drag_rack(&mut scene, Point::new(200.0, 0.0), &view));
        assert!(scene.undo());
        assert_eq!(rack(&scene, 0).x, 20.0);
    }

    #[test]
    fn test_gestures_locked_on_floor_layer_and_secondary_button() {
        let mut scene = room();
        let mut racks = RackManager::new();
        racks.create_rack(&mut scene, 1, None);
        assert!(!racks.start_drag_rack(&mut scene, 0, Point::new(0.0, 0.0), Modifiers::default(), 2));

        scene.set_current_layer(FLOOR_LAYER_INDEX);
        let view = ViewTransform::default();
        assert!(!racks.start_drag_rack(&mut scene, 0, Point::new(0.0, 0.0), Modifiers::default(), PRIMARY_BUTTON));
        assert!(!racks.start_rotate_rack(&mut scene, 0, Point::new(0.0, 0.0), &view));
        assert!(!racks.is_dragging());
    }

    #[test]
    fn test_rotate_snaps_to_45() {
        let mut scene = room();
        let mut racks = RackManager::new();
        let index = racks.create_rack(&mut scene, 1, None).unwrap();
        let view = ViewTransform::default();
        // Rack center is (100, 100).
        assert!(racks.start_rotate_rack(&mut scene, index, Point::new(150.0, 100.0), &view));
        assert!(racks.rotate_rack(&mut scene, Point::new(100.0, 150.0), &view));
        assert_eq!(rack(&scene, index).rotation, 90.0);
        assert!(racks.rotate_rack(&mut scene, Point::new(140.0, 60.0), &view));
        assert_eq!(rack(&scene, index).rotation, 315.0);
        assert!(racks.rotate_rack(&mut scene, Point::new(152.0, 98.0), &view));
        assert_eq!(rack(&scene, index).rotation, 0.0);
    }

    #[test]
    fn test_update_rack_rotation_needs_single_selection() {
        let mut scene = room();
        let mut racks = RackManager::new();
        racks.create_rack(&mut scene, 1, None);
        racks.create_rack(&mut scene, 1, Some(Point::new(0.0, 0.0)));
        racks.clear_selection();
        assert!(!racks.update_rack_rotation(&mut scene, 90.0));

        racks.click_rack(0, Modifiers::default());
        for (raw, expected) in [(-45.0, 315.0), (800.0, 90.0), (-200.0, 180.0), (22.4, 0.0)] {
            assert!(racks.update_rack_rotation(&mut scene, raw));
            assert_eq!(rack(&scene, 0).rotation, expected);
        }
        racks.click_rack(1, Modifiers::ctrl());
        assert!(!racks.update_rack_rotation(&mut scene, 90.0));
    }

    #[test]
    fn test_duplicate_copy_paste() {
        let mut scene = room();
        let mut racks = RackManager::new();
        racks.create_rack(&mut scene, 1, Some(Point::new(40.0, 40.0)));

        let dup = racks.duplicate_rack(&mut scene, 0).unwrap();
        assert_eq!(rack(&scene, dup).name, "Rack 1 (copy)");
        assert_eq!((rack(&scene, dup).x, rack(&scene, dup).y), (60.0, 60.0));
        assert_eq!(racks.selected(), &[dup]);

        let clip = racks.copy_rack(&scene, 0).unwrap();
        assert!(clip.contains(r#""_type":"rack""#));
        let pasted = racks.paste_rack(&mut scene, &clip).unwrap().unwrap();
        assert_eq!(rack(&scene, pasted).id, 3);
        assert_eq!((rack(&scene, pasted).x, rack(&scene, pasted).y), (60.0, 60.0));

        let other = r#"{"_type":"footprint","id":1,"roomId":1,"name":"x","x":0,"y":0}"#;
        assert!(racks.paste_rack(&mut scene, other).unwrap().is_none());
        assert!(racks.paste_rack(&mut scene, "{").is_err());
        assert_eq!(scene.current_layer().unwrap().racks.len(), 3);
    }

    #[test]
    fn test_remove_and_rename() {
        let mut scene = room();
        let mut racks = RackManager::new();
        racks.create_rack(&mut scene, 1, None);
        assert!(racks.update_rack_name(&mut scene, 0, "Core switch"));
        assert_eq!(rack(&scene, 0).name, "Core switch");
        racks.click_rack(0, Modifiers::default());
        assert!(racks.remove_rack(&mut scene, 0));
        assert!(racks.selected().is_empty());
        assert!(!racks.remove_rack(&mut scene, 0));
    }

    #[test]
    fn test_rack_at() {
        let mut scene = room();
        let mut racks = RackManager::new();
        racks.create_rack(&mut scene, 1, Some(Point::new(20.0, 20.0)));
        assert_eq!(RackManager::rack_at(&scene, &Point::new(30.0, 30.0)), Some(0));
        assert_eq!(RackManager::rack_at(&scene, &Point::new(100.0, 100.0)), None);
    }
}
