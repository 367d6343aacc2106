//! # Roomplan Renderer
//!
//! Canvas-side state for the room editor: the pan/zoom viewport and
//! serializable render frames describing what to draw for the active layer.
//! Drawing itself is left to the frontend.

pub mod render_data;
pub mod viewport;

pub use render_data::{contrast_color, RenderFrame};
pub use viewport::Viewport;
