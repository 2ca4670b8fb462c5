use image::RgbaImage;
use rayon::prelude::*;

/// Interpolation method for content-scaling resizes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Interpolation {
    #[default]
    Nearest,
    Bilinear,
}

// ============================================================================
// RESAMPLE – align-corners mapping, one rayon task per destination row
// ============================================================================

/// Source coordinate step for a destination axis of `dst_len` samples.
/// Corner pixels map onto corner pixels.
#[inline]
fn axis_step(src_len: u32, dst_len: u32) -> f32 {
    if dst_len > 1 {
        (src_len - 1) as f32 / (dst_len - 1) as f32
    } else {
        0.0
    }
}

/// Resample `src` to `new_w × new_h`.  Same-size requests return an exact
/// copy regardless of interpolation.
pub fn resample(src: &RgbaImage, new_w: u32, new_h: u32, interp: Interpolation) -> RgbaImage {
    if src.dimensions() == (new_w, new_h) {
        return src.clone();
    }

    let mut dst = RgbaImage::new(new_w, new_h);
    let row_bytes = new_w as usize * 4;
    if row_bytes == 0 || src.width() == 0 || src.height() == 0 {
        return dst;
    }

    let src_w = src.width();
    let src_h = src.height();
    let src_raw = src.as_raw();
    let src_stride = src_w as usize * 4;
    let step_x = axis_step(src_w, new_w);
    let step_y = axis_step(src_h, new_h);

    let sample = |sx: u32, sy: u32| -> [f32; 4] {
        let idx = sy as usize * src_stride + sx as usize * 4;
        [
            src_raw[idx] as f32,
            src_raw[idx + 1] as f32,
            src_raw[idx + 2] as f32,
            src_raw[idx + 3] as f32,
        ]
    };

    dst.as_mut().par_chunks_mut(row_bytes).enumerate().for_each(|(y, row)| {
        let sy = y as f32 * step_y;
        for x in 0..new_w {
            let sx = x as f32 * step_x;
            let px = x as usize * 4;
            match interp {
                Interpolation::Nearest => {
                    let nx = (sx.round() as u32).min(src_w - 1);
                    let ny = (sy.round() as u32).min(src_h - 1);
                    let idx = ny as usize * src_stride + nx as usize * 4;
                    row[px..px + 4].copy_from_slice(&src_raw[idx..idx + 4]);
                }
                Interpolation::Bilinear => {
                    let x0 = (sx.floor() as u32).min(src_w - 1);
                    let y0 = (sy.floor() as u32).min(src_h - 1);
                    let x1 = (x0 + 1).min(src_w - 1);
                    let y1 = (y0 + 1).min(src_h - 1);
                    let fx = sx - x0 as f32;
                    let fy = sy - y0 as f32;

                    let tl = sample(x0, y0);
                    let tr = sample(x1, y0);
                    let bl = sample(x0, y1);
                    let br = sample(x1, y1);

                    for c in 0..4 {
                        let top = tl[c] + (tr[c] - tl[c]) * fx;
                        let bot = bl[c] + (br[c] - bl[c]) * fx;
                        row[px + c] = (top + (bot - top) * fy).round().clamp(0.0, 255.0) as u8;
                    }
                }
            }
        }
    });
    dst
}

// ============================================================================
// RESIZE REQUEST – width/height pair with optional aspect lock
// ============================================================================

/// Parameters for a canvas resize, as collected by a resize prompt.
///
/// When the aspect ratio is locked, editing one dimension recomputes the
/// other from the ratio captured at lock time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResizeRequest {
    pub width: u32,
    pub height: u32,
    pub scale_contents: bool,
    pub smooth: bool,
    aspect_ratio: Option<f32>,
}

impl ResizeRequest {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            scale_contents: false,
            smooth: false,
            aspect_ratio: None,
        }
    }

    pub fn scale_contents(mut self, smooth: bool) -> Self {
        self.scale_contents = true;
        self.smooth = smooth;
        self
    }

    /// Lock (or unlock) the current width/height ratio.
    pub fn set_aspect_locked(&mut self, locked: bool) {
        self.aspect_ratio = if locked && self.height > 0 {
            Some(self.width as f32 / self.height as f32)
        } else {
            None
        };
    }

    pub fn set_width(&mut self, width: u32) {
        self.width = width;
        if let Some(ratio) = self.aspect_ratio {
            self.height = ((width as f32 / ratio).round() as u32).max(1);
        }
    }

    pub fn set_height(&mut self, height: u32) {
        self.height = height;
        if let Some(ratio) = self.aspect_ratio {
            self.width = ((height as f32 * ratio).round() as u32).max(1);
        }
    }
}
