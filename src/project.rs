use std::path::{Path, PathBuf};

use image::{Rgba, RgbaImage};
use uuid::Uuid;

use crate::canvas::{BlendMode, CanvasError, CanvasState, Layer, PixelGrid, TRANSPARENT};
use crate::components::history::{CanvasSnapshot, HistoryManager};
use crate::components::tools::{MouseState, Tool, ToolContext, ToolOutcome};
use crate::compositor;
use crate::io::{self, ImageIoError, SaveFormat};
use crate::ops::transform::ResizeRequest;
use crate::settings::EngineSettings;
use crate::viewport::Viewport;

pub const DEFAULT_MAX_UNDO: usize = 50;

/// Single open document: layers, preview buffer, history, view and pointer
/// state.  Every edit goes through here.
#[derive(Debug)]
pub struct Project {
    pub id: Uuid,
    pub canvas_state: CanvasState,
    pub history: HistoryManager<CanvasSnapshot>,
    /// `None` for unsaved/untitled files.
    pub path: Option<PathBuf>,
    pub is_dirty: bool,

    /// Display name (derived from path or "Untitled-X")
    pub name: String,

    pub viewport: Viewport,
    pub tool: Tool,
    pub color: Rgba<u8>,
    pub mouse: MouseState,

    /// Set once the current gesture has changed pixels.
    gesture_modified: bool,
}

impl Project {
    pub fn new_untitled(untitled_counter: usize, width: u32, height: u32, max_undo: usize) -> Self {
        let name = format!("Untitled-{}", untitled_counter);
        Self::with_state(name, None, CanvasState::new(width, height), max_undo)
    }

    /// New document sized and configured from the settings file.
    pub fn from_settings(untitled_counter: usize, settings: &EngineSettings) -> Self {
        let mut project = Self::new_untitled(
            untitled_counter,
            settings.default_width,
            settings.default_height,
            settings.max_undo_steps,
        )
        .with_memory_limit(settings.history_memory_limit());
        project.color = settings.default_color;
        project
    }

    /// Document wrapping an already-decoded image.
    pub fn from_grid(path: PathBuf, grid: PixelGrid, max_undo: usize) -> Self {
        let name = file_name_of(&path);
        Self::with_state(name, Some(path), CanvasState::from_grid("Background".to_string(), grid), max_undo)
    }

    /// Decode `path` and open it as a single-layer document.
    pub fn open(path: &Path, max_undo: usize) -> Result<Self, ImageIoError> {
        let grid = io::load_image(path)?;
        tracing::info!("Opened {} ({}×{})", path.display(), grid.width(), grid.height());
        Ok(Self::from_grid(path.to_path_buf(), grid, max_undo))
    }

    fn with_state(name: String, path: Option<PathBuf>, canvas_state: CanvasState, max_undo: usize) -> Self {
        let mut project = Self {
            id: Uuid::new_v4(),
            canvas_state,
            history: HistoryManager::new(max_undo),
            path,
            is_dirty: false,
            name,
            viewport: Viewport::default(),
            tool: Tool::default(),
            color: Rgba([255, 255, 255, 255]),
            mouse: MouseState::default(),
            gesture_modified: false,
        };
        // Baseline so the first edit can be undone
        project.push_snapshot();
        project
    }

    pub fn with_memory_limit(mut self, max_memory_bytes: Option<usize>) -> Self {
        self.history = std::mem::take(&mut self.history).with_memory_limit(max_memory_bytes);
        self
    }

    pub fn width(&self) -> u32 {
        self.canvas_state.width
    }

    pub fn height(&self) -> u32 {
        self.canvas_state.height
    }

    pub fn layers(&self) -> &[Layer] {
        self.canvas_state.layers.layers()
    }

    pub fn active_layer_index(&self) -> usize {
        self.canvas_state.layers.current_index()
    }

    pub fn set_tool(&mut self, tool: Tool) {
        self.tool = tool;
    }

    pub fn set_color(&mut self, color: Rgba<u8>) {
        self.color = color;
    }

    // ========================================================================
    // POINTER GESTURES
    // ========================================================================

    /// Begin a gesture at window position `pos`.
    pub fn pointer_down(&mut self, pos: (f32, f32)) -> ToolOutcome {
        self.mouse.prev_pos = pos;
        self.mouse.current_pos = pos;
        self.mouse.pressed = true;
        // Stored in grid space so view changes mid-gesture keep the anchor
        self.mouse.canvas_start_pos = self.viewport.to_canvas_point(pos);
        self.canvas_state.highlighted = None;
        self.gesture_modified = false;
        self.use_tool()
    }

    /// Pointer moved.  Drives the tool while pressed, otherwise moves the
    /// cursor highlight.
    pub fn pointer_move(&mut self, pos: (f32, f32)) -> ToolOutcome {
        self.mouse.advance(pos);
        if self.mouse.pressed {
            self.canvas_state.highlighted = None;
            self.use_tool()
        } else {
            self.highlight_under_cursor();
            ToolOutcome::Unchanged
        }
    }

    /// End the gesture: commit preview output and record a history step if
    /// anything changed.
    pub fn pointer_up(&mut self) {
        if !self.mouse.pressed {
            return;
        }
        self.mouse.pressed = false;

        if self.canvas_state.preview_active {
            if let Err(e) = self.canvas_state.commit_preview() {
                tracing::error!("Failed to commit preview: {}", e);
            }
            self.canvas_state.preview_active = false;
        }

        if self.gesture_modified {
            self.push_snapshot();
            self.mark_dirty();
        }
        self.gesture_modified = false;
        self.highlight_under_cursor();
    }

    fn use_tool(&mut self) -> ToolOutcome {
        let tool = self.tool;
        let state = &mut self.canvas_state;
        let target = if tool.is_direct_draw() {
            &mut state.layers.current_mut().pixels
        } else {
            state.reset_preview();
            state.preview_active = true;
            &mut state.preview
        };

        let mut ctx = ToolContext {
            target,
            viewport: &self.viewport,
        };
        let outcome = tool.apply(&mut ctx, &self.mouse, self.color);
        match outcome {
            ToolOutcome::Modified => self.gesture_modified = true,
            ToolOutcome::ColorPicked(picked) => {
                tracing::debug!("Picked colour {:?}", picked.0);
                self.color = picked;
            }
            ToolOutcome::Unchanged => {}
        }
        outcome
    }

    fn highlight_under_cursor(&mut self) {
        let point = self.viewport.to_canvas_point(self.mouse.current_pos);
        self.canvas_state.set_highlight(Some(point));
    }

    // ========================================================================
    // HISTORY
    // ========================================================================

    fn push_snapshot(&mut self) {
        let snapshot = CanvasSnapshot::capture(&self.canvas_state, self.path.clone());
        self.history.push(snapshot);
    }

    pub fn undo(&mut self) -> bool {
        let Some(snapshot) = self.history.undo() else {
            return false;
        };
        snapshot.restore_into(&mut self.canvas_state);
        let path = snapshot.path.clone();
        self.after_restore(path);
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(snapshot) = self.history.redo() else {
            return false;
        };
        snapshot.restore_into(&mut self.canvas_state);
        let path = snapshot.path.clone();
        self.after_restore(path);
        true
    }

    fn after_restore(&mut self, path: Option<PathBuf>) {
        self.path = path;
        self.update_name_from_path();
        self.mouse.pressed = false;
        self.gesture_modified = false;
        self.mark_dirty();
    }

    // ========================================================================
    // DOCUMENT OPERATIONS
    // ========================================================================

    /// Resize every layer; see [`PixelGrid::resize`].
    pub fn resize(
        &mut self,
        width: u32,
        height: u32,
        scale_contents: bool,
        smooth: bool,
    ) -> Result<(), CanvasError> {
        let (old_w, old_h) = (self.width(), self.height());
        self.canvas_state.resize(width, height, scale_contents, smooth)?;
        tracing::info!(
            "Resized {}×{} -> {}×{} (scale_contents={}, smooth={})",
            old_w,
            old_h,
            width,
            height,
            scale_contents,
            smooth
        );
        self.push_snapshot();
        self.mark_dirty();
        Ok(())
    }

    pub fn apply_resize(&mut self, request: &ResizeRequest) -> Result<(), CanvasError> {
        self.resize(request.width, request.height, request.scale_contents, request.smooth)
    }

    /// Resize request pre-filled with the current size.
    pub fn resize_request(&self) -> ResizeRequest {
        ResizeRequest::new(self.width(), self.height())
    }

    /// Display buffer: preview substituted while a gesture is live, cursor
    /// highlight applied.
    pub fn render(&self) -> Vec<u8> {
        self.canvas_state.composite()
    }

    /// Committed content only.  This is what gets saved.
    pub fn flatten(&self) -> Vec<u8> {
        self.canvas_state.flatten()
    }

    pub fn flatten_image(&self) -> RgbaImage {
        let stack = self.canvas_state.layers.composite_layers(None);
        compositor::composite_image(self.width(), self.height(), &stack, None)
    }

    /// Save to the current path.
    pub fn save(&mut self) -> Result<(), ImageIoError> {
        let path = self.path.clone().ok_or(ImageIoError::NoPath)?;
        self.save_as(&path)
    }

    /// Save the flattened image to `path`, format from its extension.
    pub fn save_as(&mut self, path: &Path) -> Result<(), ImageIoError> {
        let format = SaveFormat::from_path(path)?;
        io::save_buffer(path, self.width(), self.height(), &self.flatten(), format)?;
        self.path = Some(path.to_path_buf());
        // Undo after a save keeps the new location
        for snapshot in self.history.iter_mut() {
            snapshot.path = self.path.clone();
        }
        self.update_name_from_path();
        self.mark_clean();
        tracing::info!("Saved {} as {}", path.display(), format.name());
        Ok(())
    }

    // ========================================================================
    // LAYER OPERATIONS
    // ========================================================================

    /// Add a transparent layer on top and select it.
    pub fn add_layer(&mut self, name: &str) {
        let grid = PixelGrid::new_filled(self.width(), self.height(), TRANSPARENT);
        let layers = &mut self.canvas_state.layers;
        layers.add(grid, name.to_string(), BlendMode::Normal);
        layers.set_current(layers.len() - 1);
        self.after_layer_change();
    }

    /// Remove a layer.  Refuses to remove the only layer.
    pub fn remove_layer(&mut self, index: usize) -> bool {
        if self.canvas_state.layers.len() <= 1 {
            tracing::warn!("Refusing to remove the last layer");
            return false;
        }
        if self.canvas_state.layers.remove(index).is_none() {
            return false;
        }
        self.after_layer_change();
        true
    }

    pub fn move_layer(&mut self, index: usize, destination: usize) {
        let len = self.canvas_state.layers.len();
        if index >= len || destination >= len || index == destination {
            return;
        }
        self.canvas_state.layers.move_layer(index, destination);
        self.after_layer_change();
    }

    pub fn rename_layer(&mut self, index: usize, name: &str) {
        if index >= self.canvas_state.layers.len() {
            return;
        }
        self.canvas_state.layers.rename(index, name.to_string());
        self.after_layer_change();
    }

    pub fn set_layer_blend_mode(&mut self, index: usize, blend_mode: BlendMode) {
        if index >= self.canvas_state.layers.len() {
            return;
        }
        tracing::debug!("Layer {} blend mode -> {}", index, blend_mode.name());
        self.canvas_state.layers.set_blend_mode(index, blend_mode);
        self.after_layer_change();
    }

    pub fn duplicate_layer(&mut self, index: usize) {
        if self.canvas_state.layers.duplicate(index) {
            self.after_layer_change();
        }
    }

    /// Change the selected layer.  Not recorded in history.
    pub fn select_layer(&mut self, index: usize) {
        self.canvas_state.layers.set_current(index);
        self.canvas_state.reset_preview();
    }

    fn after_layer_change(&mut self) {
        self.canvas_state.clear_preview_state();
        self.push_snapshot();
        self.mark_dirty();
    }

    // ========================================================================
    // TITLE / DIRTY STATE
    // ========================================================================

    pub fn mark_dirty(&mut self) {
        self.is_dirty = true;
    }

    pub fn mark_clean(&mut self) {
        self.is_dirty = false;
    }

    pub fn update_name_from_path(&mut self) {
        if let Some(ref path) = self.path {
            self.name = file_name_of(path);
        }
    }

    /// Get the display title (name with dirty indicator)
    pub fn display_title(&self) -> String {
        if self.is_dirty {
            format!("{}*", self.name)
        } else {
            self.name.clone()
        }
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}
