//! Debug tool for comparing erosion presets visually
//! Generates one grid image: shaded relief per preset, then the height
//! change each preset caused.

use image::{ImageBuffer, Rgb, RgbImage};
use terrain_generator::erosion::{simulate, CpuKernel, ErosionParams, ErosionPreset};
use terrain_generator::export::{compose_grid, render_heightmap};
use terrain_generator::noise_field::{generate_noise_field, PerlinSampler};
use terrain_generator::{HeightField, TerrainConfig, TerrainError};

const RESOLUTION: u32 = 257;
const SEED: u64 = 42;

fn main() -> Result<(), TerrainError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut config = TerrainConfig::with_resolution(RESOLUTION);
    config.offsets.seed = SEED;
    config.erosion.enabled = false;
    let base = generate_noise_field(&config, &PerlinSampler::default(), None)?.field;

    let mut relief = Vec::new();
    let mut change = Vec::new();
    for &preset in ErosionPreset::all() {
        log::info!("Processing: {} ({})", preset, preset.description());
        let params = ErosionParams::from_preset(preset);
        let eroded = if params.enabled {
            simulate(&base, &params, &CpuKernel)?.0
        } else {
            base.clone()
        };
        relief.push(render_shaded(&eroded));
        change.push(render_change(&base, &eroded));
    }

    let cols = relief.len() as u32;
    relief.extend(change);
    let grid = compose_grid(&relief, cols);
    grid.save("erosion_comparison.png")?;

    log::info!("Saved erosion_comparison.png");
    Ok(())
}

/// Spectral colours lit from the upper left.
fn render_shaded(field: &HeightField) -> RgbImage {
    let res = field.resolution();
    let colors = render_heightmap(field);

    let light_len = (0.7f32 * 0.7 * 2.0 + 0.25).sqrt();
    let (lx, ly, lz) = (-0.7 / light_len, -0.7 / light_len, 0.5 / light_len);

    ImageBuffer::from_fn(res as u32, res as u32, |px, py| {
        let (x, y) = (px as usize, py as usize);
        let h = field.get(x, y);
        let h_left = if x > 0 { field.get(x - 1, y) } else { h };
        let h_right = if x + 1 < res { field.get(x + 1, y) } else { h };
        let h_up = if y > 0 { field.get(x, y - 1) } else { h };
        let h_down = if y + 1 < res { field.get(x, y + 1) } else { h };

        // Heights are in [0, 1]; exaggerate slopes by the grid size
        let scale = res as f32 * 0.5;
        let nx = (h_left - h_right) * scale;
        let ny = (h_up - h_down) * scale;
        let nlen = (nx * nx + ny * ny + 1.0).sqrt();

        let diffuse = ((nx * lx + ny * ly + lz) / nlen).max(0.0);
        let ambient = 0.3;
        let lighting = (ambient + (1.0 - ambient) * diffuse).min(1.0);

        let base = colors.get_pixel(px, py);
        Rgb([
            (base[0] as f32 * lighting) as u8,
            (base[1] as f32 * lighting) as u8,
            (base[2] as f32 * lighting) as u8,
        ])
    })
}

/// Red where ground was removed, blue where it was deposited.
fn render_change(before: &HeightField, after: &HeightField) -> RgbImage {
    let res = before.resolution() as u32;
    let max_delta = before
        .as_slice()
        .iter()
        .zip(after.as_slice())
        .map(|(a, b)| (b - a).abs())
        .fold(0.0f32, f32::max)
        .max(1e-6);

    ImageBuffer::from_fn(res, res, |x, y| {
        let delta = after.get(x as usize, y as usize) - before.get(x as usize, y as usize);
        let t = (delta.abs() / max_delta).sqrt();
        let fade = (255.0 * (1.0 - t)) as u8;
        if delta < 0.0 {
            Rgb([255, fade, fade])
        } else {
            Rgb([fade, fade, 255])
        }
    })
}
