use crate::footprints::FootprintSelector;
use crate::geometry::{Point, ViewTransform};
use crate::pillars::PillarManager;
use crate::racks::{Modifiers, RackManager};
use crate::scene::Scene;
use crate::settings::EditorSettings;
use crate::walls::WallEditor;

/// One editing session: a scene and the component state operating on it.
///
/// Components are plain values; their operations take the scene explicitly,
/// so nothing is shared between editors.
#[derive(Debug, Default)]
pub struct RoomEditor {
    pub scene: Scene,
    pub walls: WallEditor,
    pub footprints: FootprintSelector,
    pub racks: RackManager,
    pub pillars: PillarManager,
}

impl RoomEditor {
    pub fn new(settings: EditorSettings) -> Self {
        Self::with_scene(Scene::with_settings(settings))
    }

    pub fn with_scene(scene: Scene) -> Self {
        Self {
            scene,
            walls: WallEditor::new(),
            footprints: FootprintSelector::new(),
            racks: RackManager::new(),
            pillars: PillarManager::new(),
        }
    }

    /// Selecting the outline deselects racks and pillars.
    pub fn select_wall(&mut self) {
        self.walls.set_selected(true);
        self.racks.clear_selection();
        self.pillars.clear_selection();
    }

    pub fn set_current_layer(&mut self, index: usize) {
        self.release_gestures();
        self.racks.clear_selection();
        self.footprints.clear_selection();
        self.footprints.select_footprint(None);
        self.scene.set_current_layer(index);
    }

    // ── Rack gestures ────────────────────────────────────────────────

    pub fn start_drag_rack(&mut self, index: usize, pointer: Point, modifiers: Modifiers, button: u16) -> bool {
        if self.walls.is_drawing() {
            return false;
        }
        self.racks
            .start_drag_rack(&mut self.scene, index, pointer, modifiers, button)
    }

    pub fn start_rotate_rack(&mut self, index: usize, pointer: Point, view: &ViewTransform) -> bool {
        if self.walls.is_drawing() {
            return false;
        }
        self.racks
            .start_rotate_rack(&mut self.scene, index, pointer, view)
    }

    // ── Gesture exits ────────────────────────────────────────────────

    fn release_gestures(&mut self) {
        if self.footprints.is_selecting() {
            self.footprints.stop_selection();
        }
        self.footprints.reset_footprint_state();
        self.racks.reset_rack_state();
        self.walls.stop_dragging_wall();
        self.pillars.stop_drag_pillar();
    }

    /// End whatever gesture is in progress.
    pub fn pointer_up(&mut self) {
        self.release_gestures();
    }

    /// The pointer left the canvas mid-gesture: same as releasing it.
    pub fn pointer_leave(&mut self) {
        log::debug!("Pointer left the canvas; releasing gestures");
        self.release_gestures();
    }

    // ── History ──────────────────────────────────────────────────────

    /// Undo, dropping selections whose indices may no longer be valid.
    pub fn undo(&mut self) -> bool {
        self.release_gestures();
        let undone = self.scene.undo();
        if undone {
            self.racks.clear_selection();
            self.pillars.clear_selection();
        }
        undone
    }

    pub fn redo(&mut self) -> bool {
        self.release_gestures();
        let redone = self.scene.redo();
        if redone {
            self.racks.clear_selection();
            self.pillars.clear_selection();
        }
        redone
    }
}
