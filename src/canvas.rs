use image::{Rgba, RgbaImage};
use thiserror::Error;

use crate::components::layers::LayerManager;
use crate::compositor::{self, CompositeLayer};
use crate::ops::{fill, shapes, transform};

/// Fill used by freshly created and non-scaled resized grids.
pub const DEFAULT_FILL: Rgba<u8> = Rgba([0, 0, 0, 255]);

pub const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Upper bound on grid area (~256 megapixels).
pub const MAX_PIXELS: u64 = 256_000_000;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CanvasError {
    #[error("invalid canvas dimensions {width}×{height}")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("canvas size mismatch: expected {expected_w}×{expected_h}, got {actual_w}×{actual_h}")]
    DimensionMismatch {
        expected_w: u32,
        expected_h: u32,
        actual_w: u32,
        actual_h: u32,
    },
    #[error("pixel buffer holds {actual} bytes, expected {expected}")]
    BufferSize { expected: usize, actual: usize },
}

fn check_dimensions(width: u32, height: u32) -> Result<(), CanvasError> {
    let total = (width as u64) * (height as u64);
    if width == 0 || height == 0 || total > MAX_PIXELS {
        return Err(CanvasError::InvalidDimensions { width, height });
    }
    Ok(())
}

// ============================================================================
// PIXEL GRID – contiguous row-major RGBA8 storage
// ============================================================================

/// Fixed-size 2D buffer of RGBA pixels, pixel (x, y) at index `x + y * width`.
///
/// `get_pixel` / `set_pixel` assume valid coordinates and panic otherwise;
/// every operation that accepts user-space coordinates (`draw_line`, `fill`,
/// the `*_checked` accessors) clips instead.  `Clone` is a deep copy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelGrid {
    pixels: RgbaImage,
}

impl PixelGrid {
    // ---- construction -------------------------------------------------------

    /// Create an opaque-black grid.  Degenerate or oversized dimensions are
    /// clamped to 1×1 (see [`PixelGrid::try_new`] for the checked variant).
    pub fn new(width: u32, height: u32) -> Self {
        Self::new_filled(width, height, DEFAULT_FILL)
    }

    pub fn new_filled(width: u32, height: u32, color: Rgba<u8>) -> Self {
        let (width, height) = match check_dimensions(width, height) {
            Ok(()) => (width, height),
            Err(e) => {
                tracing::warn!("PixelGrid::new: {}, clamped to 1×1", e);
                (1, 1)
            }
        };
        Self {
            pixels: RgbaImage::from_pixel(width, height, color),
        }
    }

    pub fn try_new(width: u32, height: u32) -> Result<Self, CanvasError> {
        check_dimensions(width, height)?;
        Ok(Self {
            pixels: RgbaImage::from_pixel(width, height, DEFAULT_FILL),
        })
    }

    /// Wrap an already-decoded image.
    pub fn from_rgba_image(img: RgbaImage) -> Result<Self, CanvasError> {
        check_dimensions(img.width(), img.height())?;
        Ok(Self { pixels: img })
    }

    /// Import from a flat RGBA byte buffer (`width * height * 4` bytes, row-major).
    pub fn from_raw_rgba(width: u32, height: u32, data: Vec<u8>) -> Result<Self, CanvasError> {
        check_dimensions(width, height)?;
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(CanvasError::BufferSize {
                expected,
                actual: data.len(),
            });
        }
        RgbaImage::from_raw(width, height, data)
            .map(|pixels| Self { pixels })
            .ok_or(CanvasError::BufferSize { expected, actual: 0 })
    }

    pub fn to_rgba_image(&self) -> RgbaImage {
        self.pixels.clone()
    }

    pub fn as_image(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn as_raw(&self) -> &[u8] {
        self.pixels.as_raw()
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.pixels.into_raw()
    }

    // ---- dimensions ---------------------------------------------------------

    #[inline]
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    #[inline]
    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width() && (y as u32) < self.height()
    }

    pub fn memory_bytes(&self) -> usize {
        self.pixels.as_raw().len()
    }

    // ---- pixel access -------------------------------------------------------

    /// Read a pixel.  Coordinates must be in bounds.
    #[inline]
    pub fn get_pixel(&self, x: u32, y: u32) -> Rgba<u8> {
        *self.pixels.get_pixel(x, y)
    }

    /// Write a pixel.  Coordinates must be in bounds.
    #[inline]
    pub fn set_pixel(&mut self, x: u32, y: u32, color: Rgba<u8>) {
        self.pixels.put_pixel(x, y, color);
    }

    /// Read a pixel, `None` outside the grid.
    #[inline]
    pub fn get_pixel_checked(&self, x: i32, y: i32) -> Option<Rgba<u8>> {
        if self.in_bounds(x, y) {
            Some(self.get_pixel(x as u32, y as u32))
        } else {
            None
        }
    }

    /// Write a pixel if it lies inside the grid.  Returns whether it was written.
    #[inline]
    pub fn set_pixel_checked(&mut self, x: i32, y: i32, color: Rgba<u8>) -> bool {
        if self.in_bounds(x, y) {
            self.set_pixel(x as u32, y as u32, color);
            true
        } else {
            false
        }
    }

    // ---- whole-grid operations ----------------------------------------------

    pub fn clear(&mut self, color: Rgba<u8>) {
        for px in self.pixels.pixels_mut() {
            *px = color;
        }
    }

    pub fn clear_default(&mut self) {
        self.clear(DEFAULT_FILL);
    }

    /// Overwrite this grid with `other`, pixel for pixel.  Both grids must have
    /// identical dimensions; on mismatch nothing is written.
    pub fn copy_content(&mut self, other: &PixelGrid) -> Result<(), CanvasError> {
        if self.dimensions() != other.dimensions() {
            return Err(CanvasError::DimensionMismatch {
                expected_w: self.width(),
                expected_h: self.height(),
                actual_w: other.width(),
                actual_h: other.height(),
            });
        }
        let dst: &mut [u8] = &mut self.pixels;
        dst.copy_from_slice(other.as_raw());
        Ok(())
    }

    /// Reallocate to `new_width × new_height`.
    ///
    /// Without `scale_contents` the old content is dropped and the grid is
    /// reset to [`DEFAULT_FILL`].  With it, the content is resampled
    /// (nearest-neighbour, or bilinear when `smooth` is set).
    pub fn resize(
        &mut self,
        new_width: u32,
        new_height: u32,
        scale_contents: bool,
        smooth: bool,
    ) -> Result<(), CanvasError> {
        check_dimensions(new_width, new_height)?;
        if !scale_contents {
            self.pixels = RgbaImage::from_pixel(new_width, new_height, DEFAULT_FILL);
            return Ok(());
        }
        let interp = if smooth {
            transform::Interpolation::Bilinear
        } else {
            transform::Interpolation::Nearest
        };
        self.pixels = transform::resample(&self.pixels, new_width, new_height, interp);
        Ok(())
    }

    // ---- drawing ------------------------------------------------------------

    /// Rasterize a line segment; see [`shapes::draw_line`].
    pub fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: Rgba<u8>) -> usize {
        shapes::draw_line(self, x0, y0, x1, y1, color)
    }

    /// 4-connected flood fill; see [`fill::flood_fill`].
    pub fn fill(&mut self, x: i32, y: i32, color: Rgba<u8>) -> usize {
        fill::flood_fill(self, x, y, color)
    }
}

// ============================================================================
// BLEND MODES
// ============================================================================

/// Per-layer combination rule.  Only alpha-over exists today.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Hash)]
pub enum BlendMode {
    #[default]
    Normal,
}

impl BlendMode {
    pub fn name(&self) -> &'static str {
        match self {
            BlendMode::Normal => "Normal",
        }
    }
}

// ============================================================================
// LAYER
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
pub struct Layer {
    pub name: String,
    pub blend_mode: BlendMode,
    pub pixels: PixelGrid,
}

impl Layer {
    pub fn new(name: String, width: u32, height: u32, fill_color: Rgba<u8>) -> Self {
        Self {
            name,
            blend_mode: BlendMode::Normal,
            pixels: PixelGrid::new_filled(width, height, fill_color),
        }
    }

    pub fn from_grid(name: String, pixels: PixelGrid, blend_mode: BlendMode) -> Self {
        Self {
            name,
            blend_mode,
            pixels,
        }
    }

    pub fn memory_bytes(&self) -> usize {
        self.pixels.memory_bytes() + self.name.len()
    }
}

// ============================================================================
// CANVAS STATE – layers + preview buffer for one document
// ============================================================================

#[derive(Debug)]
pub struct CanvasState {
    pub width: u32,
    pub height: u32,
    pub layers: LayerManager,
    /// Scratch grid for preview-first tools.  Always the same size as the
    /// layers; holds a copy of the active layer plus the in-progress edit.
    pub preview: PixelGrid,
    /// While set, `composite` shows `preview` in place of the active layer.
    pub preview_active: bool,
    /// Grid coordinate drawn with the cursor marker.
    pub highlighted: Option<(u32, u32)>,
}

impl CanvasState {
    pub fn new(width: u32, height: u32) -> Self {
        let background = Layer::new("Background".to_string(), width, height, DEFAULT_FILL);
        Self::from_layer(background)
    }

    /// Single-layer state around an existing grid (e.g. a decoded file).
    pub fn from_grid(name: String, pixels: PixelGrid) -> Self {
        Self::from_layer(Layer::from_grid(name, pixels, BlendMode::Normal))
    }

    fn from_layer(layer: Layer) -> Self {
        let (width, height) = layer.pixels.dimensions();
        let preview = layer.pixels.clone();
        Self {
            width,
            height,
            layers: LayerManager::new(layer),
            preview,
            preview_active: false,
            highlighted: None,
        }
    }

    pub fn active_grid(&self) -> &PixelGrid {
        &self.layers.current().pixels
    }

    pub fn active_grid_mut(&mut self) -> &mut PixelGrid {
        &mut self.layers.current_mut().pixels
    }

    /// Copy the active layer into the preview buffer.
    pub fn reset_preview(&mut self) {
        let active = &self.layers.current().pixels;
        if let Err(e) = self.preview.copy_content(active) {
            tracing::debug!("reset_preview: {}, reallocating preview", e);
            self.preview = active.clone();
        }
    }

    /// Write the preview buffer back into the active layer.
    pub fn commit_preview(&mut self) -> Result<(), CanvasError> {
        let preview = &self.preview;
        self.layers.current_mut().pixels.copy_content(preview)
    }

    pub fn clear_preview_state(&mut self) {
        self.preview_active = false;
        self.reset_preview();
    }

    /// Mark `(x, y)` with the cursor highlight; out-of-range points clear it.
    pub fn set_highlight(&mut self, point: Option<(i32, i32)>) {
        self.highlighted = point
            .filter(|&(x, y)| x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height)
            .map(|(x, y)| (x as u32, y as u32));
    }

    /// Flattened display buffer: preview substituted while active, cursor
    /// marker applied.
    pub fn composite(&self) -> Vec<u8> {
        let preview = self.preview_active.then_some(&self.preview);
        let stack = self.layers.composite_layers(preview);
        compositor::composite(self.width, self.height, &stack, self.highlighted)
    }

    /// Flattened committed content only, without preview or highlight.
    pub fn flatten(&self) -> Vec<u8> {
        let stack: Vec<CompositeLayer<'_>> = self.layers.composite_layers(None);
        compositor::composite(self.width, self.height, &stack, None)
    }

    /// Resize every layer and the preview buffer.
    pub fn resize(
        &mut self,
        new_width: u32,
        new_height: u32,
        scale_contents: bool,
        smooth: bool,
    ) -> Result<(), CanvasError> {
        check_dimensions(new_width, new_height)?;
        for layer in self.layers.iter_mut() {
            layer.pixels.resize(new_width, new_height, scale_contents, smooth)?;
        }
        self.width = new_width;
        self.height = new_height;
        self.highlighted = None;
        self.preview = self.layers.current().pixels.clone();
        self.preview_active = false;
        Ok(())
    }

    pub fn memory_bytes(&self) -> usize {
        self.layers.iter().map(Layer::memory_bytes).sum::<usize>() + self.preview.memory_bytes()
    }
}
