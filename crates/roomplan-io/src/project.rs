use serde::{Deserialize, Serialize};
use uuid::Uuid;

use roomplan_core::layer::Layer;
use roomplan_core::{EditorSettings, Scene, SceneError};

/// Version written into new project files.
pub const FORMAT_VERSION: &str = "1";

/// Metadata block at the top of a room project file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMeta {
    pub id: Uuid,
    pub room_id: u32,
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub modified: String,
    #[serde(default)]
    pub settings: EditorSettings,
}

impl ProjectMeta {
    pub fn new(name: &str, room_id: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            room_id,
            name: name.to_string(),
            version: FORMAT_VERSION.to_string(),
            description: String::new(),
            created: String::new(),
            modified: String::new(),
            settings: EditorSettings::default(),
        }
    }
}

/// A saved room: metadata plus the layered scene document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomProject {
    pub meta: ProjectMeta,
    #[serde(default)]
    pub layers: Vec<Layer>,
    #[serde(default)]
    pub current_layer_index: usize,
}

impl RoomProject {
    pub fn new(meta: ProjectMeta) -> Self {
        Self {
            meta,
            layers: Vec::new(),
            current_layer_index: 0,
        }
    }

    /// Capture a scene. Its settings replace those in `meta`.
    pub fn from_scene(mut meta: ProjectMeta, scene: &Scene) -> Self {
        meta.settings = scene.settings.clone();
        Self {
            meta,
            layers: scene.layers().to_vec(),
            current_layer_index: scene.current_layer_index(),
        }
    }

    /// Open the project as an editable scene with a fresh history.
    pub fn to_scene(&self) -> Result<Scene, SceneError> {
        let count = self.layers.len();
        if count > 0 && self.current_layer_index >= count {
            return Err(SceneError::LayerOutOfRange {
                index: self.current_layer_index,
                count,
            });
        }
        let mut scene = Scene::with_settings(self.meta.settings.clone()).with_layers(self.layers.clone());
        if count > 0 {
            scene.set_current_layer(self.current_layer_index);
        }
        Ok(scene)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roomplan_core::Point;

    #[test]
    fn test_scene_round_trip() {
        let mut scene = Scene::with_settings(EditorSettings::default().with_snap_size(10.0));
        scene.set_walls(vec![
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            Point::new(100.0, 100.0),
        ]);
        scene.initialize();
        scene.set_current_layer(2);

        let project = RoomProject::from_scene(ProjectMeta::new("Server room", 4), &scene);
        assert_eq!(project.meta.settings.snap_size, 10.0);
        let reopened = project.to_scene().unwrap();
        assert_eq!(reopened.snapshot(), scene.snapshot());
        assert_eq!(reopened.settings.snap_size, 10.0);
        assert!(!reopened.can_undo());
    }

    #[test]
    fn test_out_of_range_layer_is_rejected() {
        let mut project = RoomProject::new(ProjectMeta::new("Empty", 1));
        assert!(project.to_scene().is_ok());
        project.layers.push(Layer::new(1, "Racks"));
        project.current_layer_index = 3;
        assert!(matches!(
            project.to_scene(),
            Err(SceneError::LayerOutOfRange { index: 3, count: 1 })
        ));
    }
}
