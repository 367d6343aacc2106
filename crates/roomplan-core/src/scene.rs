use serde::{Deserialize, Serialize};

use crate::error::SceneError;
use crate::geometry::Point;
use crate::history::{History, SceneSnapshot};
use crate::layer::{Layer, LayerId};
use crate::settings::EditorSettings;

/// The room document: an ordered stack of layers plus the active layer.
///
/// Walls and pillars are shared structure: the setters write through to the
/// active layer and mirror the same list onto every other layer, so all layers
/// hold deep-equal `walls` and `pillars` after each call.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    layers: Vec<Layer>,
    #[serde(default)]
    current_layer_index: usize,
    /// Walls drawn before any layer exists.
    #[serde(default)]
    detached_walls: Vec<Point>,
    #[serde(default)]
    pub settings: EditorSettings,
    #[serde(skip)]
    history: History,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        Self::with_settings(EditorSettings::default())
    }

    pub fn with_settings(settings: EditorSettings) -> Self {
        Self {
            layers: Vec::new(),
            current_layer_index: 0,
            detached_walls: Vec::new(),
            history: History::with_depth(settings.history_depth),
            settings,
        }
    }

    /// Start from an existing layer stack, first layer active.
    pub fn with_layers(mut self, layers: Vec<Layer>) -> Self {
        self.layers = layers;
        self.current_layer_index = 0;
        self
    }

    // ── Layer management ─────────────────────────────────────────────

    /// Replace the layers with one empty layer per configured name, each
    /// carrying a copy of the current walls.
    pub fn initialize(&mut self) {
        let walls = self.walls().to_vec();
        let pillars = self.pillars().to_vec();
        self.layers = self
            .settings
            .layer_names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                Layer::new(i as LayerId + 1, name)
                    .with_walls(walls.clone())
                    .with_pillars(pillars.clone())
            })
            .collect();
        self.current_layer_index = 0;
        log::info!("Initialized {} layers", self.layers.len());
    }

    /// Load a layer stack from its JSON array form. Empty input keeps the
    /// current layers.
    pub fn load_layers_json(&mut self, json: &str) -> Result<(), SceneError> {
        let layers: Vec<Layer> = serde_json::from_str(json)?;
        if !layers.is_empty() {
            log::info!("Loaded {} layers", layers.len());
            self.layers = layers;
            self.current_layer_index = 0;
        }
        Ok(())
    }

    pub fn clear_layers(&mut self) {
        self.layers.clear();
        self.current_layer_index = 0;
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn current_layer_index(&self) -> usize {
        self.current_layer_index
    }

    /// Switch the active layer.
    ///
    /// # Panics
    /// If `index` is not a valid layer index.
    pub fn set_current_layer(&mut self, index: usize) {
        assert!(
            index < self.layers.len(),
            "layer index {index} out of range ({} layers)",
            self.layers.len()
        );
        self.current_layer_index = index;
    }

    pub fn current_layer(&self) -> Option<&Layer> {
        self.layers.get(self.current_layer_index)
    }

    pub fn current_layer_mut(&mut self) -> Option<&mut Layer> {
        self.layers.get_mut(self.current_layer_index)
    }

    // ── Shared structure ─────────────────────────────────────────────

    pub fn walls(&self) -> &[Point] {
        match self.current_layer() {
            Some(layer) => &layer.walls,
            None => &self.detached_walls,
        }
    }

    pub fn set_walls(&mut self, walls: Vec<Point>) {
        if self.layers.is_empty() {
            self.detached_walls = walls;
            return;
        }
        for layer in &mut self.layers {
            layer.walls = walls.clone();
        }
    }

    /// True once the room outline can bound anything (three points or more).
    pub fn has_room(&self) -> bool {
        self.walls().len() > 2
    }

    pub fn pillars(&self) -> &[Point] {
        match self.current_layer() {
            Some(layer) => &layer.pillars,
            None => &[],
        }
    }

    /// Mirror `pillars` onto every layer. Ignored while no layer exists.
    pub fn set_pillars(&mut self, pillars: Vec<Point>) {
        if self.layers.is_empty() {
            log::debug!("No layer to hold pillars");
            return;
        }
        for layer in &mut self.layers {
            layer.pillars = pillars.clone();
        }
    }

    /// Whether every layer carries identical walls and pillars.
    pub fn is_mirrored(&self) -> bool {
        match self.layers.split_first() {
            Some((first, rest)) => rest
                .iter()
                .all(|l| l.walls == first.walls && l.pillars == first.pillars),
            None => true,
        }
    }

    // ── Undo / Redo ──────────────────────────────────────────────────

    pub fn snapshot(&self) -> SceneSnapshot {
        SceneSnapshot {
            layers: Some(self.layers.clone()),
            walls: Some(self.walls().to_vec()),
            current_layer_index: Some(self.current_layer_index),
        }
    }

    /// Restore a snapshot. A snapshot without layers only restores walls.
    pub fn apply_snapshot(&mut self, snapshot: SceneSnapshot) {
        match (snapshot.layers, snapshot.walls) {
            (Some(layers), walls) => {
                self.layers = layers;
                // Walls drawn before the layers exist live outside them.
                if self.layers.is_empty() {
                    self.detached_walls = walls.unwrap_or_default();
                }
            }
            (None, Some(walls)) => self.set_walls(walls),
            (None, None) => {}
        }
        if let Some(index) = snapshot.current_layer_index {
            self.current_layer_index = index.min(self.layers.len().saturating_sub(1));
        }
    }

    /// Record the current state. Call before every mutation.
    pub fn take_snapshot(&mut self) {
        match self.snapshot().encode() {
            Ok(state) => self.history.record(state),
            Err(e) => log::error!("Failed to encode history snapshot: {}", e),
        }
    }

    pub fn undo(&mut self) -> bool {
        if !self.history.can_undo() {
            return false;
        }
        let Some(current) = self.encoded_state() else {
            return false;
        };
        match self.history.undo(current) {
            Some(previous) => self.apply_encoded(&previous),
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        if !self.history.can_redo() {
            return false;
        }
        let Some(current) = self.encoded_state() else {
            return false;
        };
        match self.history.redo(current) {
            Some(next) => self.apply_encoded(&next),
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    fn encoded_state(&self) -> Option<String> {
        self.snapshot()
            .encode()
            .map_err(|e| log::error!("Failed to encode history snapshot: {}", e))
            .ok()
    }

    fn apply_encoded(&mut self, encoded: &str) -> bool {
        match SceneSnapshot::decode(encoded) {
            Ok(snapshot) => {
                self.apply_snapshot(snapshot);
                true
            }
            Err(e) => {
                log::warn!("Discarding unreadable history snapshot: {}", e);
                false
            }
        }
    }

    // ── Serialization ────────────────────────────────────────────────

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, SceneError> {
        let mut scene: Scene = serde_json::from_str(json)?;
        if !scene.layers.is_empty() && scene.current_layer_index >= scene.layers.len() {
            return Err(SceneError::LayerOutOfRange {
                index: scene.current_layer_index,
                count: scene.layers.len(),
            });
        }
        scene.history = History::with_depth(scene.settings.history_depth);
        Ok(scene)
    }
}
