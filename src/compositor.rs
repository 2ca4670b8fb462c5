use image::{Rgba, RgbaImage};
use rayon::prelude::*;

use crate::canvas::{BlendMode, PixelGrid};

/// Channel sum below which the cursor marker lightens instead of darkens.
pub const HIGHLIGHT_THRESHOLD: u32 = 330;
pub const HIGHLIGHT_DELTA: u8 = 60;
/// Alpha added to the marked pixel so the marker shows over transparency.
pub const HIGHLIGHT_ALPHA_BOOST: u8 = 200;

/// One entry of the compositor input, bottom to top.
#[derive(Clone, Copy, Debug)]
pub struct CompositeLayer<'a> {
    pub pixels: &'a PixelGrid,
    pub blend_mode: BlendMode,
}

// ============================================================================
// COMPOSITE – alpha-over accumulation, parallel over rows
// ============================================================================

/// Flatten `layers` into a `width × height` RGBA8 buffer.
///
/// The accumulator starts fully transparent and each layer is folded in with
/// the over operator.  Layers smaller than the output contribute nothing
/// outside their bounds.  `highlight` marks one output pixel with the cursor
/// contrast shift.
pub fn composite(
    width: u32,
    height: u32,
    layers: &[CompositeLayer<'_>],
    highlight: Option<(u32, u32)>,
) -> Vec<u8> {
    let row_bytes = width as usize * 4;
    let mut out = vec![0u8; row_bytes * height as usize];
    if row_bytes == 0 || layers.is_empty() {
        return out;
    }

    out.par_chunks_mut(row_bytes).enumerate().for_each(|(y, row)| {
        let y = y as u32;
        for x in 0..width {
            let mut px = composite_pixel(layers, x, y);
            if highlight == Some((x, y)) {
                px = highlight_pixel(px);
            }
            let o = x as usize * 4;
            row[o..o + 4].copy_from_slice(&px.0);
        }
    });
    out
}

/// Same as [`composite`], wrapped as an image for the encoders.
pub fn composite_image(
    width: u32,
    height: u32,
    layers: &[CompositeLayer<'_>],
    highlight: Option<(u32, u32)>,
) -> RgbaImage {
    let buf = composite(width, height, layers, highlight);
    // `composite` always returns exactly width*height*4 bytes
    RgbaImage::from_raw(width, height, buf).unwrap_or_else(|| RgbaImage::new(width, height))
}

/// Fold every layer's pixel at `(x, y)` into one RGBA value.
pub fn composite_pixel(layers: &[CompositeLayer<'_>], x: u32, y: u32) -> Rgba<u8> {
    let mut acc = [0.0f32; 4];

    for layer in layers {
        let grid = layer.pixels;
        if x >= grid.width() || y >= grid.height() {
            continue;
        }
        let src = grid.get_pixel(x, y).0.map(|c| c as f32 / 255.0);
        match layer.blend_mode {
            BlendMode::Normal => blend_over(&mut acc, src),
        }
    }

    Rgba(acc.map(|v| (v * 255.0) as u8))
}

#[inline]
fn blend_over(dst: &mut [f32; 4], src: [f32; 4]) {
    let dst_a = dst[3];
    let a_coef = src[3] * (1.0 - dst_a);
    for c in 0..3 {
        dst[c] = dst[c] * dst_a + src[c] * a_coef;
    }
    dst[3] = dst_a + a_coef;
}

/// Lighten dark pixels and darken light ones so the cursor stays visible.
/// Alpha is raised too, saturating at 255.
pub fn highlight_pixel(px: Rgba<u8>) -> Rgba<u8> {
    let [r, g, b, a] = px.0;
    let sum = r as u32 + g as u32 + b as u32;
    let shift = |c: u8| {
        if sum < HIGHLIGHT_THRESHOLD {
            c.saturating_add(HIGHLIGHT_DELTA)
        } else {
            c.saturating_sub(HIGHLIGHT_DELTA)
        }
    };
    Rgba([shift(r), shift(g), shift(b), a.saturating_add(HIGHLIGHT_ALPHA_BOOST)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::TRANSPARENT;

    fn layer(grid: &PixelGrid) -> CompositeLayer<'_> {
        CompositeLayer {
            pixels: grid,
            blend_mode: BlendMode::Normal,
        }
    }

    fn patterned(w: u32, h: u32) -> PixelGrid {
        let mut grid = PixelGrid::new(w, h);
        for y in 0..h {
            for x in 0..w {
                grid.set_pixel(x, y, Rgba([(x * 37 % 256) as u8, (y * 91 % 256) as u8, ((x + y) * 13 % 256) as u8, 255]));
            }
        }
        grid
    }

    #[test]
    fn test_single_opaque_layer_identity() {
        let grid = patterned(7, 5);
        let out = composite(7, 5, &[layer(&grid)], None);
        assert_eq!(out.len(), 7 * 5 * 4);
        for (got, want) in out.iter().zip(grid.as_raw()) {
            assert!((*got as i32 - *want as i32).abs() <= 1, "{got} vs {want}");
        }
    }

    #[test]
    fn test_transparent_top_layer_over_opaque_base_changes_nothing() {
        let base = patterned(6, 4);
        let clear = PixelGrid::new_filled(6, 4, TRANSPARENT);
        let alone = composite(6, 4, &[layer(&base)], None);
        let stacked = composite(6, 4, &[layer(&base), layer(&clear)], None);
        assert_eq!(alone, stacked);
    }

    #[test]
    fn test_first_opaque_layer_wins() {
        let base = patterned(3, 3);
        let top = PixelGrid::new_filled(3, 3, Rgba([10, 20, 30, 255]));
        let out = composite(3, 3, &[layer(&base), layer(&top)], None);
        // Once the accumulator is opaque the upper layer contributes nothing.
        let alone = composite(3, 3, &[layer(&base)], None);
        assert_eq!(out, alone);

        let out = composite(3, 3, &[layer(&top), layer(&base)], None);
        for px in out.chunks_exact(4) {
            assert!((px[0] as i32 - 10).abs() <= 1);
            assert!((px[1] as i32 - 20).abs() <= 1);
            assert!((px[2] as i32 - 30).abs() <= 1);
            assert_eq!(px[3], 255);
        }
    }

    #[test]
    fn test_zero_layers_is_transparent() {
        let out = composite(4, 2, &[], Some((1, 1)));
        assert_eq!(out, vec![0u8; 4 * 2 * 4]);
    }

    #[test]
    fn test_smaller_layer_is_transparent_outside() {
        let small = PixelGrid::new_filled(1, 1, Rgba([255, 255, 255, 255]));
        let out = composite(2, 1, &[layer(&small)], None);
        assert_eq!(out[3], 255);
        assert_eq!(&out[4..8], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_highlight_lightens_dark_pixel() {
        let grid = PixelGrid::new(2, 2);
        let out = composite(2, 2, &[layer(&grid)], Some((1, 0)));
        assert_eq!(&out[4..8], &[60, 60, 60, 255]);
        assert_eq!(&out[0..4], &[0, 0, 0, 255]);
    }

    #[test]
    fn test_highlight_darkens_light_pixel() {
        assert_eq!(highlight_pixel(Rgba([255, 255, 255, 255])), Rgba([195, 195, 195, 255]));
        // 110 * 3 = 330 is not below the threshold
        assert_eq!(highlight_pixel(Rgba([110, 110, 110, 9])), Rgba([50, 50, 50, 209]));
        assert_eq!(highlight_pixel(Rgba([250, 40, 30, 255])), Rgba([255, 100, 90, 255]));
    }

    #[test]
    fn test_highlight_shows_over_transparency() {
        let clear = PixelGrid::new_filled(2, 1, TRANSPARENT);
        let out = composite(2, 1, &[layer(&clear)], Some((0, 0)));
        assert_eq!(&out[0..4], &[60, 60, 60, 200]);
        assert_eq!(&out[4..8], &[0, 0, 0, 0]);
        assert_eq!(highlight_pixel(Rgba([0, 0, 0, 100])), Rgba([60, 60, 60, 255]));
    }

    #[test]
    fn test_transparent_layer_over_translucent_base() {
        // The fold scales the accumulated colour by its own alpha on every
        // layer, so a clear layer still darkens a translucent base.
        let base = PixelGrid::new_filled(1, 1, Rgba([255, 0, 0, 128]));
        let clear = PixelGrid::new_filled(1, 1, TRANSPARENT);
        let alone = composite(1, 1, &[layer(&base)], None);
        let stacked = composite(1, 1, &[layer(&base), layer(&clear)], None);

        assert!((alone[0] as i32 - 128).abs() <= 1);
        assert!((stacked[0] as i32 - 64).abs() <= 1);
        assert_eq!(alone[3], stacked[3]);
        assert!((alone[3] as i32 - 128).abs() <= 1);
        assert_eq!(&stacked[1..3], &[0, 0]);
    }

    #[test]
    fn test_composite_image_dimensions() {
        let grid = patterned(5, 3);
        let img = composite_image(5, 3, &[layer(&grid)], None);
        assert_eq!(img.dimensions(), (5, 3));
    }
}
