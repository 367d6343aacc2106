//! Reading and writing room project files.
//!
//! A project file is pretty-printed JSON holding a [`RoomProject`]. Older
//! exports that contain only the layer array are accepted too and get fresh
//! metadata.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use serde_json::Value;
use thiserror::Error;

use roomplan_core::layer::Layer;
use roomplan_core::SceneError;

use crate::project::{ProjectMeta, RoomProject, FORMAT_VERSION};

#[derive(Error, Debug)]
pub enum ProjectError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    #[error("Unsupported project version: {0}")]
    UnsupportedVersion(String),

    #[error("Expected a project object or a layer array")]
    UnknownDocument,
}

// ── Reader ───────────────────────────────────────────────────────────

pub struct ProjectReader<R: Read> {
    reader: R,
    /// Name given to projects read from a bare layer array.
    fallback_name: String,
}

impl<R: Read> ProjectReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            fallback_name: "imported".to_string(),
        }
    }

    pub fn with_fallback_name(mut self, name: &str) -> Self {
        self.fallback_name = name.to_string();
        self
    }

    pub fn read(&mut self) -> Result<RoomProject, ProjectError> {
        let value: Value = serde_json::from_reader(&mut self.reader)?;
        match value {
            Value::Array(_) => {
                let layers: Vec<Layer> = serde_json::from_value(value)?;
                log::info!("Read layer document with {} layers", layers.len());
                let mut project = RoomProject::new(ProjectMeta::new(&self.fallback_name, 0));
                project.layers = layers;
                Ok(project)
            }
            Value::Object(_) => {
                let project: RoomProject = serde_json::from_value(value)?;
                if project.meta.version != FORMAT_VERSION {
                    return Err(ProjectError::UnsupportedVersion(project.meta.version));
                }
                // Validates the active layer index.
                project.to_scene()?;
                log::info!(
                    "Read project '{}' with {} layers",
                    project.meta.name,
                    project.layers.len()
                );
                Ok(project)
            }
            _ => Err(ProjectError::UnknownDocument),
        }
    }
}

// ── Writer ───────────────────────────────────────────────────────────

pub struct ProjectWriter<W: Write> {
    writer: W,
}

impl<W: Write> ProjectWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn write(&mut self, project: &RoomProject) -> Result<(), ProjectError> {
        serde_json::to_writer_pretty(&mut self.writer, project)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        log::info!(
            "Wrote project '{}' with {} layers",
            project.meta.name,
            project.layers.len()
        );
        Ok(())
    }
}

// ── Files ────────────────────────────────────────────────────────────

pub fn load_project(path: &Path) -> Result<RoomProject, ProjectError> {
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("imported");
    let file = File::open(path)?;
    ProjectReader::new(BufReader::new(file))
        .with_fallback_name(name)
        .read()
}

pub fn save_project(path: &Path, project: &RoomProject) -> Result<(), ProjectError> {
    let file = File::create(path)?;
    ProjectWriter::new(BufWriter::new(file)).write(project)
}

#[cfg(test)]
mod tests {
    use super::*;
    use roomplan_core::{FootprintSelector, Point, Scene};
    use std::io::Cursor;

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn furnished_scene() -> Scene {
        let mut scene = Scene::new();
        scene.set_walls(vec![
            Point::new(0.0, 0.0),
            Point::new(200.0, 0.0),
            Point::new(200.0, 200.0),
            Point::new(0.0, 200.0),
        ]);
        scene.initialize();
        scene.set_current_layer(1);
        let mut selector = FootprintSelector::new();
        selector.start_selection(&scene, 0.0, 0.0);
        selector.update_selection(&scene, 40.0, 20.0);
        selector.stop_selection();
        selector.create_footprint(&mut scene);
        scene
    }

    #[test]
    fn test_write_and_read_roundtrip() {
        init_logging();
        let scene = furnished_scene();
        let project = RoomProject::from_scene(ProjectMeta::new("Lab", 3), &scene);

        let mut buffer: Vec<u8> = Vec::new();
        ProjectWriter::new(&mut buffer).write(&project).unwrap();
        let text = String::from_utf8(buffer.clone()).unwrap();
        assert!(text.contains("\"roomId\": 3"));
        assert!(text.contains("\"currentLayerIndex\": 1"));

        let read = ProjectReader::new(Cursor::new(buffer)).read().unwrap();
        assert_eq!(read, project);
        assert_eq!(read.layers[1].footprints[0].units.len(), 6);
    }

    #[test]
    fn test_read_bare_layer_array() {
        init_logging();
        let json = r#"[
            {"id": 1, "name": "Electrical circuits", "walls": [{"x": 0, "y": 0}]},
            {"id": 2, "name": "Racks", "racks": [
                {"id": 1, "roomId": 9, "name": "Rack 1", "x": 40, "y": 40, "rotation": null}
            ]}
        ]"#;
        let project = ProjectReader::new(json.as_bytes())
            .with_fallback_name("legacy")
            .read()
            .unwrap();
        assert_eq!(project.meta.name, "legacy");
        assert_eq!(project.layers.len(), 2);
        assert_eq!(project.layers[1].racks[0].rotation, 0.0);
        assert_eq!(project.current_layer_index, 0);
    }

    #[test]
    fn test_rejects_bad_documents() {
        assert!(matches!(
            ProjectReader::new("42".as_bytes()).read(),
            Err(ProjectError::UnknownDocument)
        ));
        assert!(matches!(
            ProjectReader::new("{".as_bytes()).read(),
            Err(ProjectError::Json(_))
        ));

        let mut project = RoomProject::new(ProjectMeta::new("Future", 1));
        project.meta.version = "99".into();
        let json = serde_json::to_string(&project).unwrap();
        assert!(matches!(
            ProjectReader::new(json.as_bytes()).read(),
            Err(ProjectError::UnsupportedVersion(v)) if v == "99"
        ));

        let mut project = RoomProject::new(ProjectMeta::new("Broken", 1));
        project.layers.push(Layer::new(1, "Only"));
        project.current_layer_index = 2;
        let json = serde_json::to_string(&project).unwrap();
        assert!(matches!(
            ProjectReader::new(json.as_bytes()).read(),
            Err(ProjectError::Scene(SceneError::LayerOutOfRange { .. }))
        ));
    }

    #[test]
    fn test_save_and_load_file() {
        init_logging();
        let scene = furnished_scene();
        let project = RoomProject::from_scene(ProjectMeta::new("Lab", 3), &scene);
        let path = std::env::temp_dir().join(format!("roomplan-{}.json", project.meta.id));

        save_project(&path, &project).unwrap();
        let loaded = load_project(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(loaded, project);
        let reopened = loaded.to_scene().unwrap();
        assert_eq!(reopened.snapshot(), scene.snapshot());
        assert!(matches!(load_project(&path), Err(ProjectError::Io(_))));
    }
}
