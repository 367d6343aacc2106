//! # Roomplan Core
//!
//! Geometry and selection engine for a 2D floor-plan editor: a layered room
//! scene with mirrored walls and pillars, wall drawing and resizing, grid
//! footprint selection with hole filling, racks and pods, and snapshot-based
//! undo/redo.
//!
//! Components hold only gesture and selection state. Every operation takes the
//! [`Scene`] it works on, and [`RoomEditor`] bundles one scene with its
//! components.

pub mod editor;
pub mod error;
pub mod footprints;
pub mod geometry;
pub mod history;
pub mod layer;
pub mod pillars;
pub mod pods;
pub mod racks;
pub mod scene;
pub mod settings;
pub mod spatial;
pub mod walls;

pub use editor::RoomEditor;
pub use error::SceneError;
pub use footprints::{FootprintSelector, SelectionMode};
pub use geometry::{BBox, Point, PodBoundary, ViewTransform};
pub use history::{History, SceneSnapshot};
pub use layer::{Footprint, Layer, LayerId, Pod, Rack};
pub use pillars::PillarManager;
pub use racks::{Modifiers, RackManager};
pub use scene::Scene;
pub use settings::EditorSettings;
pub use walls::WallEditor;
