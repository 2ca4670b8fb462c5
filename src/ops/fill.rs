use std::collections::VecDeque;

use image::Rgba;

use crate::canvas::PixelGrid;

/// 4-connected flood fill starting at `(x, y)`.
///
/// Every pixel reachable from the seed through horizontal/vertical neighbours
/// that exactly match the seed's original RGBA value is recoloured to
/// `color`.  An out-of-bounds seed, or a seed that already has the target
/// colour, leaves the grid untouched.
///
/// Breadth-first with an explicit queue and a pending mask; the recursion
/// depth is independent of region size.  Returns the number of pixels
/// written.
pub fn flood_fill(grid: &mut PixelGrid, x: i32, y: i32, color: Rgba<u8>) -> usize {
    let Some(target) = grid.get_pixel_checked(x, y) else {
        return 0;
    };
    if target == color {
        return 0;
    }

    let (w, h) = grid.dimensions();
    let stride = w as usize;
    let mut pending = vec![false; stride * h as usize];
    let mut queue = VecDeque::new();

    let seed = (x as u32, y as u32);
    pending[seed.1 as usize * stride + seed.0 as usize] = true;
    queue.push_back(seed);

    let mut filled = 0usize;
    while let Some((px, py)) = queue.pop_front() {
        grid.set_pixel(px, py, color);
        filled += 1;

        let neighbours = [
            (px > 0).then(|| (px - 1, py)),
            (px + 1 < w).then(|| (px + 1, py)),
            (py > 0).then(|| (px, py - 1)),
            (py + 1 < h).then(|| (px, py + 1)),
        ];
        for (nx, ny) in neighbours.into_iter().flatten() {
            let idx = ny as usize * stride + nx as usize;
            if !pending[idx] && grid.get_pixel(nx, ny) == target {
                pending[idx] = true;
                queue.push_back((nx, ny));
            }
        }
    }

    tracing::trace!("flood_fill at ({}, {}) wrote {} px", x, y, filled);
    filled
}
