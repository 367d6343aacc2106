//! # Roomplan I/O
//!
//! Room project files: a metadata block with the editor settings, followed by
//! the layered scene document. Bare layer arrays exported by older editors are
//! read as well.

pub mod document;
pub mod project;

pub use document::{load_project, save_project, ProjectError, ProjectReader, ProjectWriter};
pub use project::{ProjectMeta, RoomProject};
