use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::Rgba;
use pixelforge::canvas::{BlendMode, PixelGrid, TRANSPARENT};
use pixelforge::compositor::{composite, CompositeLayer};

const SIZE: u32 = 512;

fn striped_layer(phase: u32) -> PixelGrid {
    let mut grid = PixelGrid::new_filled(SIZE, SIZE, TRANSPARENT);
    for y in (phase..SIZE).step_by(4) {
        grid.draw_line(0, y as i32, SIZE as i32 - 1, y as i32, Rgba([200, 40, 90, 160]));
    }
    grid
}

fn bench_composite(c: &mut Criterion) {
    let base = PixelGrid::new(SIZE, SIZE);
    let mid = striped_layer(0);
    let top = striped_layer(2);
    let layers: Vec<CompositeLayer<'_>> = [&base, &mid, &top]
        .into_iter()
        .map(|pixels| CompositeLayer {
            pixels,
            blend_mode: BlendMode::Normal,
        })
        .collect();

    c.bench_function("composite_3_layers_512", |b| {
        b.iter(|| black_box(composite(SIZE, SIZE, &layers, Some((10, 10)))))
    });
}

fn bench_flood_fill(c: &mut Criterion) {
    c.bench_function("flood_fill_open_512", |b| {
        b.iter(|| {
            let mut grid = PixelGrid::new(SIZE, SIZE);
            black_box(grid.fill(256, 256, Rgba([255, 255, 255, 255])))
        })
    });

    // Maze-like walls make the frontier long and thin
    let mut walled = PixelGrid::new(SIZE, SIZE);
    for x in (8..SIZE).step_by(16) {
        walled.draw_line(x as i32, 0, x as i32, SIZE as i32 - 9, Rgba([255, 0, 0, 255]));
        walled.draw_line(x as i32 + 8, 8, x as i32 + 8, SIZE as i32 - 1, Rgba([255, 0, 0, 255]));
    }
    c.bench_function("flood_fill_walled_512", |b| {
        b.iter(|| {
            let mut grid = walled.clone();
            black_box(grid.fill(0, 0, Rgba([255, 255, 255, 255])))
        })
    });
}

fn bench_draw_line(c: &mut Criterion) {
    let mut grid = PixelGrid::new(SIZE, SIZE);
    c.bench_function("draw_line_diagonal_512", |b| {
        b.iter(|| black_box(grid.draw_line(0, 0, SIZE as i32 - 1, SIZE as i32 - 1, Rgba([1, 2, 3, 255]))))
    });
}

criterion_group!(benches, bench_composite, bench_flood_fill, bench_draw_line);
criterion_main!(benches);
