use crate::geometry::{closest_point_inside, Point};
use crate::scene::Scene;

/// Pillar placement, selection and dragging. Pillars are shared structure:
/// every change goes through `Scene::set_pillars` and lands on all layers.
#[derive(Debug, Default)]
pub struct PillarManager {
    drawing: bool,
    preview_point: Option<Point>,
    selected: Vec<usize>,
    dragging: Option<usize>,
}

impl PillarManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_drawing(&self) -> bool {
        self.drawing
    }

    pub fn preview_point(&self) -> Option<Point> {
        self.preview_point
    }

    pub fn selected(&self) -> &[usize] {
        &self.selected
    }

    pub fn dragging_index(&self) -> Option<usize> {
        self.dragging
    }

    /// Entering draw mode drops the selection; leaving it drops the preview.
    pub fn toggle_drawing(&mut self) {
        self.drawing = !self.drawing;
        if self.drawing {
            self.selected.clear();
        } else {
            self.preview_point = None;
        }
    }

    pub fn select(&mut self, index: usize) {
        self.selected = vec![index];
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    /// Snap a cursor position and pull it back inside the room.
    fn resolve(scene: &Scene, x: f64, y: f64) -> Point {
        let settings = &scene.settings;
        let p = Point::new(x, y).snapped(settings.snap_size);
        closest_point_inside(p.x, p.y, scene.walls(), settings.inside_nudge, settings.snap_size)
    }

    pub fn update_preview(&mut self, scene: &Scene, x: f64, y: f64) -> Option<Point> {
        if !self.drawing {
            return None;
        }
        self.preview_point = Some(Self::resolve(scene, x, y));
        self.preview_point
    }

    /// Add a pillar unless one already stands at exactly that point.
    pub fn add_pillar(&self, scene: &mut Scene, point: Point) -> bool {
        if scene.current_layer().is_none() || scene.pillars().contains(&point) {
            return false;
        }
        scene.take_snapshot();
        let mut pillars = scene.pillars().to_vec();
        pillars.push(point);
        scene.set_pillars(pillars);
        true
    }

    /// Place a pillar at a raw cursor position while drawing.
    pub fn place_pillar(&mut self, scene: &mut Scene, x: f64, y: f64) -> Option<Point> {
        let point = Self::resolve(scene, x, y);
        self.add_pillar(scene, point).then_some(point)
    }

    /// Remove a pillar and shift the selection so the remaining indices still
    /// point at the same pillars.
    pub fn remove_pillar(&mut self, scene: &mut Scene, index: usize) -> bool {
        if index >= scene.pillars().len() {
            return false;
        }
        scene.take_snapshot();
        let mut pillars = scene.pillars().to_vec();
        pillars.remove(index);
        scene.set_pillars(pillars);

        self.selected.retain(|&i| i != index);
        for i in self.selected.iter_mut() {
            if *i > index {
                *i -= 1;
            }
        }
        self.dragging = match self.dragging {
            Some(i) if i == index => None,
            Some(i) if i > index => Some(i - 1),
            other => other,
        };
        true
    }

    fn set_pillar(scene: &mut Scene, index: usize, point: Point) -> bool {
        let mut pillars = scene.pillars().to_vec();
        match pillars.get_mut(index) {
            Some(p) => *p = point,
            None => return false,
        }
        scene.set_pillars(pillars);
        true
    }

    pub fn move_pillar(&self, scene: &mut Scene, index: usize, point: Point) -> bool {
        if index >= scene.pillars().len() {
            return false;
        }
        scene.take_snapshot();
        Self::set_pillar(scene, index, point)
    }

    pub fn start_drag_pillar(&mut self, scene: &mut Scene, index: usize) -> bool {
        if index >= scene.pillars().len() {
            return false;
        }
        scene.take_snapshot();
        self.select(index);
        self.dragging = Some(index);
        true
    }

    pub fn drag_pillar(&self, scene: &mut Scene, x: f64, y: f64) -> bool {
        let Some(index) = self.dragging else {
            return false;
        };
        let point = Self::resolve(scene, x, y);
        Self::set_pillar(scene, index, point)
    }

    pub fn stop_drag_pillar(&mut self) {
        self.dragging = None;
    }
}
