//! Height field export: grayscale PNG, colour preview and raw float dumps.
//!
//! Image pixel `(x, y)` is field cell `(x, y)`: x is the column, y the row.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use image::{ImageBuffer, Luma, Rgb, RgbImage};

use crate::heightfield::HeightField;

pub type Gray16Image = ImageBuffer<Luma<u16>, Vec<u16>>;
pub type Gray8Image = ImageBuffer<Luma<u8>, Vec<u8>>;

/// 16-bit grayscale image. Heights are clamped to [0, 1] first.
pub fn to_gray16(field: &HeightField) -> Gray16Image {
    let res = field.resolution() as u32;
    ImageBuffer::from_fn(res, res, |x, y| {
        let h = field.get(x as usize, y as usize).clamp(0.0, 1.0);
        Luma([(h * u16::MAX as f32).round() as u16])
    })
}

/// 8-bit grayscale image. Heights are clamped to [0, 1] first.
pub fn to_gray8(field: &HeightField) -> Gray8Image {
    let res = field.resolution() as u32;
    ImageBuffer::from_fn(res, res, |x, y| {
        let h = field.get(x as usize, y as usize).clamp(0.0, 1.0);
        Luma([(h * u8::MAX as f32).round() as u8])
    })
}

/// Write a 16-bit grayscale PNG.
pub fn save_png<P: AsRef<Path>>(field: &HeightField, path: P) -> Result<(), image::ImageError> {
    to_gray16(field).save(path)
}

/// Write every sample as a little-endian `f32`, in field index order.
pub fn save_raw<P: AsRef<Path>>(field: &HeightField, path: P) -> std::io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for &h in field.as_slice() {
        writer.write_all(&h.to_le_bytes())?;
    }
    writer.flush()
}

/// Render with a spectral colormap, stretched to the field's own min/max.
pub fn render_heightmap(field: &HeightField) -> RgbImage {
    let res = field.resolution() as u32;
    let (min_val, max_val) = field.min_max();
    let range = max_val - min_val;
    if range < 0.001 {
        // Flat field, return gray
        return ImageBuffer::from_pixel(res, res, Rgb([128, 128, 128]));
    }

    ImageBuffer::from_fn(res, res, |x, y| {
        let normalized = (field.get(x as usize, y as usize) - min_val) / range;
        Rgb(spectral_colormap(normalized))
    })
}

/// Spectral colormap (matplotlib style): dark blue -> cyan -> green -> yellow -> orange -> red
fn spectral_colormap(t: f32) -> [u8; 3] {
    let colors: [[f32; 3]; 11] = [
        [0.37, 0.31, 0.64],
        [0.20, 0.53, 0.74],
        [0.40, 0.76, 0.65],
        [0.67, 0.87, 0.64],
        [0.90, 0.96, 0.60],
        [1.00, 1.00, 0.75],
        [1.00, 0.88, 0.55],
        [0.99, 0.68, 0.38],
        [0.96, 0.43, 0.26],
        [0.84, 0.24, 0.31],
        [0.62, 0.00, 0.26],
    ];

    let t_scaled = t.clamp(0.0, 1.0) * 10.0;
    let idx = (t_scaled as usize).min(9);
    let frac = t_scaled - idx as f32;

    let c1 = colors[idx];
    let c2 = colors[idx + 1];

    [
        ((c1[0] + (c2[0] - c1[0]) * frac) * 255.0) as u8,
        ((c1[1] + (c2[1] - c1[1]) * frac) * 255.0) as u8,
        ((c1[2] + (c2[2] - c1[2]) * frac) * 255.0) as u8,
    ]
}

/// Lay tiles out left to right, top to bottom, `cols` per row, with a
/// dark gutter between them. Tiles may differ in size; cells take the
/// largest tile's size.
pub fn compose_grid(tiles: &[RgbImage], cols: u32) -> RgbImage {
    let cols = cols.max(1);
    let gutter = 4u32;
    let tile_w = tiles.iter().map(|t| t.width()).max().unwrap_or(0);
    let tile_h = tiles.iter().map(|t| t.height()).max().unwrap_or(0);
    let rows = (tiles.len() as u32).div_ceil(cols);

    let grid_w = cols * tile_w + (cols + 1) * gutter;
    let grid_h = rows * tile_h + (rows + 1) * gutter;
    let mut grid: RgbImage = ImageBuffer::from_pixel(grid_w, grid_h, Rgb([30, 30, 30]));

    for (idx, tile) in tiles.iter().enumerate() {
        let col = idx as u32 % cols;
        let row = idx as u32 / cols;
        let offset_x = gutter + col * (tile_w + gutter);
        let offset_y = gutter + row * (tile_h + gutter);
        for (tx, ty, pixel) in tile.enumerate_pixels() {
            grid.put_pixel(offset_x + tx, offset_y + ty, *pixel);
        }
    }

    grid
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> HeightField {
        // Height grows along x (image columns)
        HeightField::from_fn(5, |x, _| x as f32 / 4.0)
    }

    #[test]
    fn test_gray16_maps_extremes() {
        let img = to_gray16(&ramp());
        assert_eq!(img.dimensions(), (5, 5));
        assert_eq!(img.get_pixel(0, 3)[0], 0);
        assert_eq!(img.get_pixel(4, 3)[0], u16::MAX);
        assert!(img.get_pixel(2, 0)[0] > img.get_pixel(1, 0)[0]);
    }

    #[test]
    fn test_gray8_clamps_out_of_range() {
        let field = HeightField::from_fn(2, |x, y| if x == y { -0.5 } else { 1.5 });
        let img = to_gray8(&field);
        assert_eq!(img.get_pixel(0, 0)[0], 0);
        assert_eq!(img.get_pixel(1, 0)[0], 255);
    }

    #[test]
    fn test_save_raw_writes_little_endian_floats() {
        let field = ramp();
        let path = std::env::temp_dir().join(format!("terrain_raw_{}.r32", std::process::id()));
        save_raw(&field, &path).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(bytes.len(), 25 * 4);
        let values: Vec<f32> = bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        assert_eq!(values.as_slice(), field.as_slice());
    }

    #[test]
    fn test_flat_field_renders_gray() {
        let img = render_heightmap(&HeightField::new_with(3, 0.4));
        assert!(img.pixels().all(|p| *p == Rgb([128, 128, 128])));
    }

    #[test]
    fn test_compose_grid_size() {
        let tile: RgbImage = ImageBuffer::from_pixel(10, 10, Rgb([255, 0, 0]));
        let grid = compose_grid(&[tile.clone(), tile.clone(), tile], 2);
        assert_eq!(grid.dimensions(), (2 * 10 + 3 * 4, 2 * 10 + 3 * 4));
        assert_eq!(*grid.get_pixel(4, 4), Rgb([255, 0, 0]));
        assert_eq!(*grid.get_pixel(0, 0), Rgb([30, 30, 30]));
    }
}
