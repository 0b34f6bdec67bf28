//! Fractal noise height field synthesis
//!
//! Octaves of 2D noise are summed per cell, the whole grid is normalized to
//! [0, 1], redistributed through a power curve and optionally blended with a
//! reference image.

use noise::NoiseFn;
use rayon::prelude::*;

use crate::config::TerrainConfig;
use crate::error::ConfigError;
use crate::heightfield::{normalize_with, HeightField};
use crate::offsets::{octave_offsets, OctaveOffset};
use crate::perlin::LatticePerlin;
use crate::reference::ReferenceImage;

/// Gradient seed of the default Perlin sampler. Fixed so that the octave
/// offsets are the only seeded input.
pub const PERLIN_SEED: u64 = 0;

/// Smooth, deterministic 2D noise with values in [0, 1].
pub trait NoiseSampler: Send + Sync {
    fn sample(&self, x: f64, y: f64) -> f64;
}

/// Non-repeating gradient noise, remapped from [-1, 1] to [0, 1].
#[derive(Clone, Debug)]
pub struct PerlinSampler {
    perlin: LatticePerlin,
}

impl PerlinSampler {
    pub fn new(seed: u64) -> Self {
        Self {
            perlin: LatticePerlin::new(seed),
        }
    }
}

impl Default for PerlinSampler {
    fn default() -> Self {
        Self::new(PERLIN_SEED)
    }
}

impl NoiseSampler for PerlinSampler {
    fn sample(&self, x: f64, y: f64) -> f64 {
        ((self.perlin.get([x, y]) + 1.0) * 0.5).clamp(0.0, 1.0)
    }
}

/// Result of noise synthesis
#[derive(Clone, Debug)]
pub struct NoiseField {
    pub field: HeightField,
    /// False when the accumulated grid was constant and normalization was skipped
    pub normalized: bool,
    /// Accumulated (pre-normalization) extremes
    pub raw_min: f32,
    pub raw_max: f32,
}

/// Sum all octaves at one cell.
///
/// `offsets` holds one entry per octave.
pub fn accumulate_octaves(
    sampler: &dyn NoiseSampler,
    config: &TerrainConfig,
    offsets: &[OctaveOffset],
    x: usize,
    y: usize,
) -> f32 {
    let noise = &config.noise;
    let resolution = config.resolution as f64;
    let nx = x as f64 / resolution;
    let ny = y as f64 / resolution;
    let [gx, gy] = noise.global_offset;

    let mut total = 0.0f64;
    let mut amplitude = noise.starting_amplitude as f64;
    let mut frequency = noise.starting_frequency as f64;

    for offset in offsets {
        let [ox, oy] = offset.as_f64();
        let span = noise.scale as f64 * frequency;
        let sx = gx as f64 + ox + nx * span;
        let sy = gy as f64 + oy + ny * span;
        total += sampler.sample(sx, sy) * amplitude;

        amplitude *= noise.persistence as f64;
        frequency *= noise.lacunarity as f64;
    }

    total as f32
}

/// Synthesize a normalized, redistributed (and optionally blended) height field.
///
/// Pass 1 accumulates every cell and tracks the global extremes. Pass 2
/// normalizes, applies `v^flatness` and blends `0.5 * v + 0.5 * reference`.
pub fn generate_noise_field(
    config: &TerrainConfig,
    sampler: &dyn NoiseSampler,
    reference: Option<&dyn ReferenceImage>,
) -> Result<NoiseField, ConfigError> {
    config.validate()?;
    let reference = resolve_reference(config, reference)?;

    let resolution = config.resolution as usize;
    let offsets = octave_offsets(&config.offsets, config.noise.octaves())?;
    log::debug!("Octave offsets: {:?}", offsets);

    let mut heights = vec![0.0f32; resolution * resolution];
    heights
        .par_chunks_mut(resolution)
        .enumerate()
        .for_each(|(x, column)| {
            for (y, h) in column.iter_mut().enumerate() {
                *h = accumulate_octaves(sampler, config, &offsets, x, y);
            }
        });

    let (raw_min, raw_max) = heights
        .par_iter()
        .fold(
            || (f32::MAX, f32::MIN),
            |(lo, hi), &h| (lo.min(h), hi.max(h)),
        )
        .reduce(
            || (f32::MAX, f32::MIN),
            |(a_lo, a_hi), (b_lo, b_hi)| (a_lo.min(b_lo), a_hi.max(b_hi)),
        );

    let normalized = normalize_with(&mut heights, raw_min, raw_max);
    if !normalized {
        log::debug!("Noise field is constant ({}), skipping normalization", raw_min);
    }

    let flatness = config.noise.flatness;
    if flatness != 1.0 {
        heights.par_iter_mut().for_each(|h| *h = redistribute(*h, flatness));
    }

    if let Some(reference) = reference {
        heights
            .par_chunks_mut(resolution)
            .enumerate()
            .for_each(|(x, column)| {
                for (y, h) in column.iter_mut().enumerate() {
                    *h = blend(*h, reference.grayscale(x, y));
                }
            });
    }

    let field = HeightField::from_vec(resolution, heights)?;
    Ok(NoiseField {
        field,
        normalized,
        raw_min,
        raw_max,
    })
}

/// Power-curve redistribution. With `flatness >= 1` values in [0, 1] never grow.
pub fn redistribute(value: f32, flatness: f32) -> f32 {
    value.powf(flatness)
}

/// Linear 50/50 blend with the reference value.
pub fn blend(value: f32, reference: f32) -> f32 {
    0.5 * value + 0.5 * reference
}

/// The reference to blend with, if blending is enabled. Checks presence and size.
pub(crate) fn resolve_reference<'a>(
    config: &TerrainConfig,
    reference: Option<&'a dyn ReferenceImage>,
) -> Result<Option<&'a dyn ReferenceImage>, ConfigError> {
    if !config.use_reference_image {
        return Ok(None);
    }
    let reference = reference.ok_or(ConfigError::MissingReferenceImage)?;
    let (width, height) = reference.resolution();
    if width != config.resolution || height != config.resolution {
        return Err(ConfigError::ReferenceSizeMismatch {
            width,
            height,
            resolution: config.resolution,
        });
    }
    Ok(Some(reference))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::GrayscaleImage;

    fn small_config(octaves: i32) -> TerrainConfig {
        let mut config = TerrainConfig::with_resolution(33);
        config.noise.octave_count = octaves;
        config.erosion.enabled = false;
        config
    }

    /// Noise that is a plain ramp in x, handy for exact expectations.
    struct RampSampler;

    impl NoiseSampler for RampSampler {
        fn sample(&self, x: f64, _y: f64) -> f64 {
            (x / 100.0).clamp(0.0, 1.0)
        }
    }

    #[test]
    fn test_perlin_sampler_range() {
        let sampler = PerlinSampler::default();
        for i in 0..500 {
            let v = sampler.sample(i as f64 * 0.37 - 40.0, i as f64 * 0.11 + 3.3);
            assert!((0.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn test_perlin_sampler_does_not_repeat() {
        let sampler = PerlinSampler::default();
        let repeated = (0..200)
            .map(|i| (i as f64 * 0.37 + 0.05, i as f64 * 0.11 + 3.3))
            .filter(|&(x, y)| sampler.sample(x, y) == sampler.sample(x + 256.0, y))
            .count();
        assert_eq!(repeated, 0);
    }

    #[test]
    fn test_zero_octaves_is_all_zero() {
        let out = generate_noise_field(&small_config(0), &PerlinSampler::default(), None).unwrap();
        assert!(!out.normalized);
        assert_eq!(out.raw_min, 0.0);
        assert_eq!(out.raw_max, 0.0);
        assert!(out.field.as_slice().iter().all(|&h| h == 0.0));
    }

    #[test]
    fn test_normalization_hits_both_ends() {
        let out = generate_noise_field(&small_config(4), &PerlinSampler::default(), None).unwrap();
        assert!(out.normalized);
        let (min_h, max_h) = out.field.min_max();
        assert_eq!(min_h, 0.0);
        assert!((max_h - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_flatness_never_raises_values() {
        let mut config = small_config(3);
        let plain = generate_noise_field(&config, &PerlinSampler::default(), None).unwrap();
        config.noise.flatness = 2.5;
        let flat = generate_noise_field(&config, &PerlinSampler::default(), None).unwrap();
        for (a, b) in plain.field.as_slice().iter().zip(flat.field.as_slice()) {
            assert!(b <= a);
            assert!((b - a.powf(2.5)).abs() < 1e-6);
        }
    }

    #[test]
    fn test_octave_parameters_follow_persistence_and_lacunarity() {
        let mut config = small_config(3);
        config.offsets.enabled = false;
        config.noise.scale = 10.0;
        config.noise.starting_amplitude = 1.0;
        config.noise.starting_frequency = 2.0;
        config.noise.persistence = 0.5;
        config.noise.lacunarity = 3.0;
        let offsets = vec![OctaveOffset::ZERO; 3];

        // Cell x = 33 / 2 is not on the grid, use x = 11 -> nx = 1/3.
        let value = accumulate_octaves(&RampSampler, &config, &offsets, 11, 0) as f64;
        let nx = 11.0 / 33.0;
        let expected = (nx * 20.0 / 100.0) * 1.0 + (nx * 60.0 / 100.0) * 0.5 + (nx * 180.0 / 100.0) * 0.25;
        assert!((value - expected).abs() < 1e-5, "{} vs {}", value, expected);
    }

    #[test]
    fn test_global_offset_shifts_samples() {
        let mut config = small_config(1);
        config.offsets.enabled = false;
        config.noise.global_offset = [50.0, 0.0];
        let offsets = vec![OctaveOffset::ZERO];
        let value = accumulate_octaves(&RampSampler, &config, &offsets, 0, 0);
        assert!((value - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_blend_with_self_is_identity() {
        let config = small_config(4);
        let first = generate_noise_field(&config, &PerlinSampler::default(), None).unwrap();

        let mut blended_config = config.clone();
        blended_config.use_reference_image = true;
        let second = generate_noise_field(
            &blended_config,
            &PerlinSampler::default(),
            Some(&first.field as &dyn ReferenceImage),
        )
        .unwrap();

        assert_eq!(first.field, second.field);
    }

    #[test]
    fn test_blend_is_half_and_half() {
        let mut config = small_config(2);
        config.use_reference_image = true;
        let reference = GrayscaleImage::from_fn(33, 33, |_, _| 1.0);
        let plain = generate_noise_field(&small_config(2), &PerlinSampler::default(), None).unwrap();
        let out = generate_noise_field(&config, &PerlinSampler::default(), Some(&reference)).unwrap();
        for (a, b) in plain.field.as_slice().iter().zip(out.field.as_slice()) {
            assert!((b - (0.5 * a + 0.5)).abs() < 1e-6);
        }
    }

    #[test]
    fn test_reference_errors() {
        let mut config = small_config(2);
        config.use_reference_image = true;
        let err = generate_noise_field(&config, &PerlinSampler::default(), None).unwrap_err();
        assert_eq!(err, ConfigError::MissingReferenceImage);

        let wrong = GrayscaleImage::from_fn(65, 33, |_, _| 0.5);
        let err = generate_noise_field(&config, &PerlinSampler::default(), Some(&wrong)).unwrap_err();
        assert_eq!(
            err,
            ConfigError::ReferenceSizeMismatch { width: 65, height: 33, resolution: 33 }
        );
    }

    #[test]
    fn test_reference_ignored_when_disabled() {
        let config = small_config(2);
        let wrong = GrayscaleImage::from_fn(8, 8, |_, _| 0.5);
        assert!(generate_noise_field(&config, &PerlinSampler::default(), Some(&wrong)).is_ok());
    }

    #[test]
    fn test_deterministic() {
        let config = small_config(5);
        let a = generate_noise_field(&config, &PerlinSampler::default(), None).unwrap();
        let b = generate_noise_field(&config, &PerlinSampler::default(), None).unwrap();
        assert_eq!(a.field, b.field);
    }
}
