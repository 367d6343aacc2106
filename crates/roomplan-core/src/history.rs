use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::error::SceneError;
use crate::geometry::Point;
use crate::layer::Layer;

pub const DEFAULT_HISTORY_DEPTH: usize = 50;

/// Full scene state as stored on the undo/redo stacks.
///
/// Every field is optional so that older walls-only snapshots still apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layers: Option<Vec<Layer>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub walls: Option<Vec<Point>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_layer_index: Option<usize>,
}

impl SceneSnapshot {
    pub fn encode(&self) -> Result<String, SceneError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(encoded: &str) -> Result<Self, SceneError> {
        Ok(serde_json::from_str(encoded)?)
    }
}

/// Linear undo/redo history over encoded scene snapshots.
///
/// Recording a new snapshot discards the redo branch; the undo stack is
/// bounded and drops its oldest entry first.
#[derive(Debug, Clone)]
pub struct History {
    undo_stack: VecDeque<String>,
    redo_stack: Vec<String>,
    max_depth: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    pub fn new() -> Self {
        Self::with_depth(DEFAULT_HISTORY_DEPTH)
    }

    pub fn with_depth(max_depth: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            max_depth,
        }
    }

    /// Push the state preceding a mutation.
    pub fn record(&mut self, state: String) {
        self.undo_stack.push_back(state);
        self.redo_stack.clear();
        while self.undo_stack.len() > self.max_depth {
            self.undo_stack.pop_front();
        }
    }

    /// Swap `current` onto the redo stack and hand back the state to restore.
    pub fn undo(&mut self, current: String) -> Option<String> {
        let previous = self.undo_stack.pop_back()?;
        self.redo_stack.push(current);
        Some(previous)
    }

    pub fn redo(&mut self, current: String) -> Option<String> {
        let next = self.redo_stack.pop()?;
        self.undo_stack.push_back(current);
        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }
}
