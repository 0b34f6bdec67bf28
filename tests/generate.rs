use terrain_generator::erosion::{CpuKernel, ErosionBackend, ErosionPreset};
use terrain_generator::noise_field::{generate_noise_field, NoiseSampler, PerlinSampler};
use terrain_generator::{
    generate, ConfigError, ErosionParams, HeightField, ReferenceImage, TerrainConfig, TerrainError,
    TerrainGenerator,
};

fn small() -> TerrainConfig {
    let mut config = TerrainConfig::with_resolution(33);
    config.erosion.iterations = 10;
    config
}

#[test]
fn zero_octaves_without_erosion_is_flat_zero() {
    let mut config = small();
    config.noise.octave_count = 0;
    config.erosion.enabled = false;

    let (field, report) = TerrainGenerator::new(config).generate_report().unwrap();
    assert!(!report.normalized);
    assert_eq!(field.resolution(), 33);
    assert!(field.as_slice().iter().all(|&h| h == 0.0));
}

#[test]
fn single_octave_matches_normalized_noise() {
    let mut config = small();
    config.noise.octave_count = 1;
    config.noise.scale = 1.0;
    config.noise.starting_amplitude = 1.0;
    config.noise.flatness = 1.0;
    config.offsets.enabled = false;
    config.erosion.enabled = false;

    let field = generate(&config).unwrap();

    let sampler = PerlinSampler::default();
    let res = 33usize;
    let raw = HeightField::from_fn(res, |x, y| {
        let f = config.noise.starting_frequency as f64;
        sampler.sample(x as f64 / res as f64 * f, y as f64 / res as f64 * f) as f32
    });
    let (min_h, max_h) = raw.min_max();
    for (x, y, &h) in field.iter() {
        let expected = (raw.get(x, y) - min_h) / (max_h - min_h);
        assert!((h - expected).abs() < 1e-5, "({}, {}): {} vs {}", x, y, h, expected);
    }
}

#[test]
fn zero_iterations_leaves_noise_untouched() {
    let mut config = small();
    config.erosion.iterations = 0;
    let eroded = generate(&config).unwrap();

    config.erosion.enabled = false;
    let plain = generate(&config).unwrap();
    assert_eq!(eroded, plain);
}

#[test]
fn reference_equal_to_output_round_trips() {
    let mut config = small();
    config.erosion.enabled = false;
    let first = generate(&config).unwrap();

    config.use_reference_image = true;
    let second = TerrainGenerator::new(config)
        .with_reference(&first as &dyn ReferenceImage)
        .generate()
        .unwrap();
    assert_eq!(first, second);
}

#[test]
fn same_config_same_terrain() {
    let config = small();
    assert_eq!(generate(&config).unwrap(), generate(&config).unwrap());
}

#[test]
fn seed_changes_terrain() {
    let mut config = small();
    config.erosion.enabled = false;
    let a = generate(&config).unwrap();
    config.offsets.seed += 1;
    let b = generate(&config).unwrap();
    assert_ne!(a, b);
}

#[test]
fn eroded_terrain_is_finite_and_changed() {
    let mut config = small();
    config.erosion = ErosionParams::from_preset(ErosionPreset::Heavy);
    config.erosion.backend = ErosionBackend::Cpu;

    let (field, report) = TerrainGenerator::new(config.clone())
        .with_kernel(Box::new(CpuKernel::new()))
        .generate_report()
        .unwrap();
    assert!(field.as_slice().iter().all(|h| h.is_finite()));

    let noise = generate_noise_field(&config, &PerlinSampler::default(), None).unwrap();
    assert_ne!(field, noise.field);
    let stats = report.erosion.unwrap();
    assert_eq!(stats.iterations, 200);
    assert!(stats.max_erosion > 0.0);
}

#[test]
fn invalid_configs_are_rejected() {
    let mut config = small();
    config.resolution = 100;
    assert!(matches!(
        generate(&config),
        Err(TerrainError::Config(ConfigError::InvalidResolution(100)))
    ));

    let mut config = small();
    config.noise.octave_count = -2;
    assert!(matches!(
        generate(&config),
        Err(TerrainError::Config(ConfigError::NegativeOctaveCount(-2)))
    ));

    let mut config = small();
    config.offsets.min = 10;
    config.offsets.max = 10;
    assert!(matches!(
        generate(&config),
        Err(TerrainError::Config(ConfigError::DegenerateOffsetRange { min: 10, max: 10 }))
    ));

    let mut config = small();
    config.use_reference_image = true;
    assert!(matches!(
        generate(&config),
        Err(TerrainError::Config(ConfigError::MissingReferenceImage))
    ));
}

#[test]
fn config_file_round_trip() {
    let mut config = small();
    config.noise.flatness = 1.5;
    config.erosion.backend = ErosionBackend::Auto;
    let json = config.to_json_pretty().unwrap();
    assert_eq!(TerrainConfig::from_json_str(&json).unwrap(), config);
}
