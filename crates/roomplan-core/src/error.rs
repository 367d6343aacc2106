use thiserror::Error;

/// Errors raised while decoding scene documents or history snapshots.
#[derive(Error, Debug)]
pub enum SceneError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Layer index {index} out of range ({count} layers)")]
    LayerOutOfRange { index: usize, count: usize },
}
