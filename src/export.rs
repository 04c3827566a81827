use image::{ImageBuffer, Rgb, RgbImage};

use crate::terrain::{TerrainMap, TileType, HEIGHT, WIDTH};

/// Samples per tile edge in the altitude preview.
const OVERSAMPLE: usize = 4;

/// Export the continuous height field as a shaded PNG.
/// Samples the field at sub-tile resolution so slopes and carved canals
/// show up as gradients instead of terraces. Water tiles are shaded blue
/// by water level, land runs green to brown to white by height.
pub fn export_altitude_map(terrain: &TerrainMap, path: &str) -> Result<(), image::ImageError> {
    let px_w = (WIDTH * OVERSAMPLE) as u32;
    let px_h = (HEIGHT * OVERSAMPLE) as u32;
    let mut img: RgbImage = ImageBuffer::new(px_w, px_h);

    for py in 0..px_h {
        for px in 0..px_w {
            let sx = (px as f32 + 0.5) / OVERSAMPLE as f32;
            let sy = (py as f32 + 0.5) / OVERSAMPLE as f32;
            let tx = (px as usize) / OVERSAMPLE;
            let ty = (py as usize) / OVERSAMPLE;

            let altitude = terrain.get_smooth_altitude(sx, sy);
            let water = terrain.get_water_altitude(tx, ty);

            let color = if water as f32 > altitude {
                water_color(water)
            } else {
                land_color(altitude)
            };

            img.put_pixel(px, py, Rgb(color));
        }
    }

    img.save(path)
}

/// Export a one-pixel-per-tile map of the decoded tile classes.
/// A direct visual check of the type classification: canals and
/// waterfalls pop out against the flat/slope palette.
pub fn export_tile_classes(terrain: &TerrainMap, path: &str) -> Result<(), image::ImageError> {
    let mut img: RgbImage = ImageBuffer::new(WIDTH as u32, HEIGHT as u32);

    for y in 0..HEIGHT {
        for x in 0..WIDTH {
            let base = match terrain.tile_type(x, y) {
                TileType::Low => [90u8, 150, 70],
                TileType::High => [150, 170, 110],
                TileType::Slope => [140, 120, 80],
                TileType::CornerLow => [120, 110, 75],
                TileType::CornerHigh => [160, 140, 95],
                TileType::Waterfall => [130, 200, 255],
                TileType::Canal => [40, 80, 180],
            };

            // darken submerged tiles so shorelines read clearly
            let color = if terrain.is_underwater(x, y) {
                [base[0] / 2, base[1] / 2, base[2]]
            } else {
                base
            };

            img.put_pixel(x as u32, y as u32, Rgb(color));
        }
    }

    img.save(path)
}

/// Depth-shaded blue, deeper water darker.
fn water_color(water_altitude: i32) -> [u8; 3] {
    let t = water_altitude as f32 / 15.0;
    [
        (20.0 + 40.0 * t) as u8,
        (50.0 + 70.0 * t) as u8,
        (120.0 + 100.0 * t) as u8,
    ]
}

/// Green lowlands through brown hills to white peaks.
fn land_color(altitude: f32) -> [u8; 3] {
    let t = (altitude / 15.0).clamp(0.0, 1.0);
    let stops: [[f32; 3]; 4] = [
        [0.35, 0.60, 0.28],
        [0.55, 0.48, 0.30],
        [0.50, 0.40, 0.35],
        [0.95, 0.95, 0.97],
    ];

    let scaled = t * 3.0;
    let idx = (scaled as usize).min(2);
    let frac = scaled - idx as f32;

    let a = stops[idx];
    let b = stops[idx + 1];
    [
        ((a[0] + (b[0] - a[0]) * frac) * 255.0) as u8,
        ((a[1] + (b[1] - a[1]) * frac) * 255.0) as u8,
        ((a[2] + (b[2] - a[2]) * frac) * 255.0) as u8,
    ]
}
