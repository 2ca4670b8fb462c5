use std::path::PathBuf;

use crate::canvas::{CanvasState, Layer};

// ============================================================================
// HISTORY ENTRY TRAIT
// ============================================================================

/// Anything the history can hold.  The size feeds the memory cap.
pub trait HistoryEntry {
    fn memory_size(&self) -> usize;
}

// ============================================================================
// HISTORY MANAGER - linear snapshot history with count and memory limits
// ============================================================================

/// Linear undo/redo history with memory limits.
///
/// `states[cursor]` is the state currently shown.  Pushing discards every
/// state after the cursor (the redo branch) before appending.
#[derive(Debug)]
pub struct HistoryManager<S: HistoryEntry> {
    states: Vec<S>,
    cursor: Option<usize>,
    max_history_size: usize,
    /// Optional memory cap in bytes.
    max_memory_bytes: Option<usize>,
    /// Running memory total across all held states.
    total_memory: usize,
}

impl<S: HistoryEntry> Default for HistoryManager<S> {
    fn default() -> Self {
        Self::new(50)
    }
}

impl<S: HistoryEntry> HistoryManager<S> {
    pub fn new(max_history_size: usize) -> Self {
        Self {
            states: Vec::new(),
            cursor: None,
            max_history_size: max_history_size.max(1),
            max_memory_bytes: Some(256 * 1024 * 1024),
            total_memory: 0,
        }
    }

    /// Replace the memory cap.  `None` disables it.
    pub fn with_memory_limit(mut self, max_memory_bytes: Option<usize>) -> Self {
        self.max_memory_bytes = max_memory_bytes;
        self.prune();
        self
    }

    pub fn push(&mut self, state: S) {
        // Drop the redo branch
        let keep = self.cursor.map_or(0, |c| c + 1);
        for dropped in self.states.drain(keep..) {
            self.total_memory = self.total_memory.saturating_sub(dropped.memory_size());
        }

        self.total_memory += state.memory_size();
        self.states.push(state);
        self.cursor = Some(self.states.len() - 1);

        self.prune();
    }

    /// Step back one state.  `None` when already at the oldest state.
    pub fn undo(&mut self) -> Option<&S> {
        match self.cursor {
            Some(c) if c > 0 => {
                self.cursor = Some(c - 1);
                self.states.get(c - 1)
            }
            _ => None,
        }
    }

    /// Step forward one state.  `None` when already at the newest state.
    pub fn redo(&mut self) -> Option<&S> {
        let next = self.cursor?.checked_add(1)?;
        if next < self.states.len() {
            self.cursor = Some(next);
            self.states.get(next)
        } else {
            None
        }
    }

    pub fn current(&self) -> Option<&S> {
        self.states.get(self.cursor?)
    }

    /// Every held state, oldest first.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut S> {
        self.states.iter_mut()
    }

    pub fn can_undo(&self) -> bool {
        self.cursor.is_some_and(|c| c > 0)
    }

    pub fn can_redo(&self) -> bool {
        self.cursor.is_some_and(|c| c + 1 < self.states.len())
    }

    pub fn undo_count(&self) -> usize {
        self.cursor.unwrap_or(0)
    }

    pub fn redo_count(&self) -> usize {
        self.cursor.map_or(0, |c| self.states.len() - c - 1)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Get the current memory usage of the history (O(1) via cached total)
    pub fn memory_usage(&self) -> usize {
        self.total_memory
    }

    pub fn max_history_size(&self) -> usize {
        self.max_history_size
    }

    /// Prune the oldest states to stay within limits.  The newest state is
    /// always kept.
    fn prune(&mut self) {
        let mut excess = self.states.len().saturating_sub(self.max_history_size);

        if let Some(max_bytes) = self.max_memory_bytes {
            let mut remaining = self.total_memory;
            for state in &self.states[..excess] {
                remaining = remaining.saturating_sub(state.memory_size());
            }
            while remaining > max_bytes && excess + 1 < self.states.len() {
                remaining = remaining.saturating_sub(self.states[excess].memory_size());
                excess += 1;
            }
        }

        if excess == 0 {
            return;
        }
        for removed in self.states.drain(..excess) {
            self.total_memory = self.total_memory.saturating_sub(removed.memory_size());
        }
        self.cursor = self.cursor.map(|c| c.saturating_sub(excess));
        tracing::debug!("history pruned {} oldest state(s)", excess);
    }

    pub fn clear(&mut self) {
        self.states.clear();
        self.cursor = None;
        self.total_memory = 0;
    }
}

// ============================================================================
// CANVAS SNAPSHOT - full document state for one history step
// ============================================================================

/// Deep copy of everything undo/redo restores.
#[derive(Clone, Debug)]
pub struct CanvasSnapshot {
    pub width: u32,
    pub height: u32,
    pub path: Option<PathBuf>,
    pub layers: Vec<Layer>,
    pub active_layer_index: usize,
}

impl CanvasSnapshot {
    pub fn capture(state: &CanvasState, path: Option<PathBuf>) -> Self {
        Self {
            width: state.width,
            height: state.height,
            path,
            layers: state.layers.layers().to_vec(),
            active_layer_index: state.layers.current_index(),
        }
    }

    pub fn restore_into(&self, state: &mut CanvasState) {
        state.width = self.width;
        state.height = self.height;
        state
            .layers
            .replace_all(self.layers.clone(), self.active_layer_index);
        state.highlighted = None;
        state.clear_preview_state();
    }
}

impl HistoryEntry for CanvasSnapshot {
    fn memory_size(&self) -> usize {
        self.layers.iter().map(Layer::memory_bytes).sum()
    }
}
