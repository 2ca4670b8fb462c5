use image::Rgba;

use crate::canvas::PixelGrid;

// ============================================================================
// LINE RASTERIZATION – two-pass slope walk
// ============================================================================

/// Draw the segment `(x0, y0) → (x1, y1)` into `grid`.
///
/// Both endpoints are plotted, then the segment is walked once along x and
/// once along y, rounding the dependent coordinate (half away from zero) at
/// each step.  Walking both axes keeps steep and shallow lines gap-free.  A
/// pass whose range is empty (vertical line for the x pass, horizontal for the
/// y pass) is skipped.  Points outside the grid are silently dropped, so
/// endpoints may lie anywhere.
///
/// Returns how many plots landed inside the grid.
pub fn draw_line(grid: &mut PixelGrid, x0: i32, y0: i32, x1: i32, y1: i32, color: Rgba<u8>) -> usize {
    let mut plotted = 0usize;
    plotted += grid.set_pixel_checked(x0, y0, color) as usize;
    plotted += grid.set_pixel_checked(x1, y1, color) as usize;

    let (w, h) = (grid.width() as i64, grid.height() as i64);
    let (x0, y0, x1, y1) = (x0 as i64, y0 as i64, x1 as i64, y1 as i64);

    // x pass: one plot per column
    if x0 != x1 {
        let dx = (x1 - x0) as f64;
        let dy = (y1 - y0) as f64;
        // Columns outside the grid could never be plotted; skip them up front.
        let from = x0.min(x1).max(0);
        let to = x0.max(x1).min(w);
        for x in from..to {
            let y = (dy * (x - x0) as f64 / dx + y0 as f64).round() as i64;
            plotted += plot(grid, x, y, w, h, color);
        }
    }

    // y pass: one plot per row
    if y0 != y1 {
        let dx = (x1 - x0) as f64;
        let dy = (y1 - y0) as f64;
        let from = y0.min(y1).max(0);
        let to = y0.max(y1).min(h);
        for y in from..to {
            let x = (dx * (y - y0) as f64 / dy + x0 as f64).round() as i64;
            plotted += plot(grid, x, y, w, h, color);
        }
    }

    plotted
}

#[inline]
fn plot(grid: &mut PixelGrid, x: i64, y: i64, w: i64, h: i64, color: Rgba<u8>) -> usize {
    if x < 0 || y < 0 || x >= w || y >= h {
        return 0;
    }
    grid.set_pixel(x as u32, y as u32, color);
    1
}
