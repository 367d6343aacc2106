use serde::{Deserialize, Serialize};

use roomplan_core::{BBox, Point, ViewTransform};

pub const MIN_ZOOM: f64 = 0.2;
pub const MAX_ZOOM: f64 = 3.0;
pub const ZOOM_STEP: f64 = 0.1;

/// Pan/zoom state of the room canvas.
///
/// Screen position = (scene position + pan) * zoom.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub zoom: f64,
    /// Offset in scene units.
    pub pan: Point,
    /// Canvas width in pixels.
    pub canvas_width: f64,
    /// Canvas height in pixels.
    pub canvas_height: f64,
}

impl Viewport {
    pub fn new(canvas_width: f64, canvas_height: f64) -> Self {
        Self {
            zoom: 1.0,
            pan: Point::new(0.0, 0.0),
            canvas_width,
            canvas_height,
        }
    }

    fn set_zoom(&mut self, zoom: f64) {
        // Round away float drift from repeated 0.1 steps.
        self.zoom = ((zoom * 10.0).round() / 10.0).clamp(MIN_ZOOM, MAX_ZOOM);
    }

    pub fn zoom_in(&mut self) {
        self.set_zoom(self.zoom + ZOOM_STEP);
    }

    pub fn zoom_out(&mut self) {
        self.set_zoom(self.zoom - ZOOM_STEP);
    }

    /// Ctrl+wheel zooms: scrolling up zooms in. Returns whether the wheel
    /// event was consumed.
    pub fn on_wheel(&mut self, delta_y: f64, ctrl: bool) -> bool {
        if !ctrl {
            return false;
        }
        if delta_y < 0.0 {
            self.zoom_in();
        } else {
            self.zoom_out();
        }
        true
    }

    /// Pan by a pointer movement in screen pixels.
    pub fn pan_by(&mut self, movement_x: f64, movement_y: f64) {
        self.pan = self.pan.translate(movement_x / self.zoom, movement_y / self.zoom);
    }

    pub fn view_transform(&self) -> ViewTransform {
        ViewTransform::new(self.zoom, self.pan)
    }

    pub fn screen_to_scene(&self, screen: &Point) -> Point {
        self.view_transform().to_scene(screen)
    }

    pub fn scene_to_screen(&self, scene: &Point) -> Point {
        Point::new((scene.x + self.pan.x) * self.zoom, (scene.y + self.pan.y) * self.zoom)
    }

    /// Scene-space box covered by the canvas.
    pub fn visible_bounds(&self) -> BBox {
        BBox::new(
            self.screen_to_scene(&Point::new(0.0, 0.0)),
            self.screen_to_scene(&Point::new(self.canvas_width, self.canvas_height)),
        )
    }
}
