use crate::geometry::{constrained_point, snap, Point};
use crate::scene::Scene;

/// A wall edge grabbed for resizing: edge `index` runs from vertex `index`
/// to vertex `index + 1` (wrapping).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WallSegment {
    pub index: usize,
    pub horizontal: bool,
}

/// Drawing and resizing state for the room outline.
#[derive(Debug, Default)]
pub struct WallEditor {
    drawing: bool,
    preview_point: Option<Point>,
    selected: bool,
    dragging: Option<WallSegment>,
}

impl WallEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_drawing(&self) -> bool {
        self.drawing
    }

    pub fn preview_point(&self) -> Option<Point> {
        self.preview_point
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }

    pub fn dragging_segment(&self) -> Option<WallSegment> {
        self.dragging
    }

    // ── Drawing ──────────────────────────────────────────────────────

    pub fn toggle_drawing(&mut self) {
        self.drawing = !self.drawing;
        if !self.drawing {
            self.preview_point = None;
        }
    }

    pub fn cancel_drawing(&mut self) {
        self.drawing = false;
        self.preview_point = None;
    }

    /// Move the preview cursor, constrained against the last wall point.
    pub fn update_preview(&mut self, scene: &Scene, x: f64, y: f64) -> Option<Point> {
        if !self.drawing {
            return None;
        }
        let point = constrained_point(x, y, scene.walls().last(), scene.settings.snap_size);
        self.preview_point = Some(point);
        self.preview_point
    }

    /// Append a wall point as-is. Validation is left to the caller.
    pub fn create_wall(&self, scene: &mut Scene, point: Point) {
        scene.take_snapshot();
        let mut walls = scene.walls().to_vec();
        walls.push(point);
        scene.set_walls(walls);
    }

    /// Constrain a raw cursor position and append it. Returns the placed point.
    pub fn place_point(&mut self, scene: &mut Scene, x: f64, y: f64) -> Point {
        let point = constrained_point(x, y, scene.walls().last(), scene.settings.snap_size);
        self.create_wall(scene, point);
        self.preview_point = None;
        point
    }

    pub fn clear_walls(&mut self, scene: &mut Scene) {
        if scene.walls().is_empty() {
            return;
        }
        scene.take_snapshot();
        scene.set_walls(Vec::new());
        self.selected = false;
    }

    // ── Edge resizing ────────────────────────────────────────────────

    pub fn start_dragging_wall(&mut self, scene: &mut Scene, index: usize, horizontal: bool) -> bool {
        if index >= scene.walls().len() {
            log::debug!("Ignoring drag on missing wall edge {}", index);
            return false;
        }
        scene.take_snapshot();
        self.dragging = Some(WallSegment { index, horizontal });
        true
    }

    /// Move the grabbed edge to the snapped cursor along its free axis and
    /// carry the neighbouring vertices so every edge stays axis-aligned.
    pub fn drag_wall(&self, scene: &mut Scene, x: f64, y: f64) -> bool {
        let Some(WallSegment { index, horizontal }) = self.dragging else {
            return false;
        };
        let mut walls = scene.walls().to_vec();
        let n = walls.len();
        if index >= n {
            return false;
        }

        let unit = scene.settings.snap_size;
        let i1 = index;
        let i2 = (index + 1) % n;
        let prev = (i1 + n - 1) % n;
        let next = (i2 + 1) % n;

        if horizontal {
            let snap_y = snap(y, unit);
            walls[i1].y = snap_y;
            walls[i2].y = snap_y;
            walls[prev].x = walls[i1].x;
            walls[next].x = walls[i2].x;
        } else {
            let snap_x = snap(x, unit);
            walls[i1].x = snap_x;
            walls[i2].x = snap_x;
            walls[prev].y = walls[i1].y;
            walls[next].y = walls[i2].y;
        }

        scene.set_walls(walls);
        true
    }

    pub fn stop_dragging_wall(&mut self) {
        self.dragging = None;
    }
}

/// True when every edge of the closed outline is horizontal or vertical.
pub fn is_rectilinear(walls: &[Point]) -> bool {
    let n = walls.len();
    (0..n).all(|i| {
        let a = walls[i];
        let b = walls[(i + 1) % n];
        a.x == b.x || a.y == b.y
    })
}
