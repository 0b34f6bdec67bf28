use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use terrain_generator::erosion::{ErosionBackend, ErosionParams, ErosionPreset};
use terrain_generator::export;
use terrain_generator::reference::GrayscaleImage;
use terrain_generator::{TerrainConfig, TerrainError, TerrainGenerator};

#[derive(Parser, Debug)]
#[command(name = "terrain_generator")]
#[command(about = "Generate fractal-noise height fields refined by rain erosion")]
struct Args {
    /// Load parameters from a JSON file; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    dump_config: bool,

    /// Grid size (33, 65, 129, 257, 513, 1025, 2049 or 4097)
    #[arg(short, long)]
    resolution: Option<u32>,

    /// Number of noise octaves
    #[arg(short, long)]
    octaves: Option<i32>,

    /// Amplitude of the first octave
    #[arg(long)]
    amplitude: Option<f32>,

    /// Frequency of the first octave
    #[arg(long)]
    frequency: Option<f32>,

    /// Amplitude multiplier per octave
    #[arg(long)]
    persistence: Option<f32>,

    /// Frequency multiplier per octave
    #[arg(long)]
    lacunarity: Option<f32>,

    /// Redistribution exponent (>= 1 flattens lowlands)
    #[arg(long)]
    flatness: Option<f32>,

    /// Noise coordinate scale
    #[arg(long)]
    scale: Option<f32>,

    /// Global noise offset along x
    #[arg(long, allow_hyphen_values = true)]
    offset_x: Option<f32>,

    /// Global noise offset along y
    #[arg(long, allow_hyphen_values = true)]
    offset_y: Option<f32>,

    /// Seed of the per-octave offsets
    #[arg(short, long)]
    seed: Option<u64>,

    /// Use zero per-octave offsets
    #[arg(long)]
    no_random_offsets: bool,

    /// Lower bound of the per-octave offsets
    #[arg(long, allow_hyphen_values = true)]
    offset_min: Option<i32>,

    /// Upper bound (exclusive) of the per-octave offsets
    #[arg(long, allow_hyphen_values = true)]
    offset_max: Option<i32>,

    /// Blend with this image 50/50 (must be resolution x resolution)
    #[arg(long)]
    reference: Option<PathBuf>,

    /// Erosion preset applied before the individual erosion flags
    #[arg(long, value_enum)]
    preset: Option<ErosionPreset>,

    /// Skip the erosion pipeline
    #[arg(long)]
    no_erosion: bool,

    /// Erosion iterations
    #[arg(short, long, allow_hyphen_values = true)]
    iterations: Option<i32>,

    /// Water added per cell per iteration
    #[arg(long)]
    rain: Option<f32>,

    /// Ground dissolved per unit of water
    #[arg(long)]
    solubility: Option<f32>,

    /// Fraction of water evaporated per iteration
    #[arg(long)]
    evaporation: Option<f32>,

    /// Erosion kernel
    #[arg(long, value_enum)]
    backend: Option<ErosionBackend>,

    /// Write a 16-bit grayscale PNG
    #[arg(long, default_value = "heightmap.png")]
    output: PathBuf,

    /// Also write raw little-endian f32 samples
    #[arg(long)]
    raw: Option<PathBuf>,

    /// Also write a colour preview PNG
    #[arg(long)]
    preview: Option<PathBuf>,

    /// Log a height histogram of the result
    #[arg(long)]
    histogram: bool,
}

impl Args {
    fn build_config(&self) -> Result<TerrainConfig, TerrainError> {
        let mut config = match &self.config {
            Some(path) => TerrainConfig::from_json_file(path)?,
            None => TerrainConfig::default(),
        };

        if let Some(resolution) = self.resolution {
            config.resolution = resolution;
        }

        let noise = &mut config.noise;
        if let Some(v) = self.octaves {
            noise.octave_count = v;
        }
        if let Some(v) = self.amplitude {
            noise.starting_amplitude = v;
        }
        if let Some(v) = self.frequency {
            noise.starting_frequency = v;
        }
        if let Some(v) = self.persistence {
            noise.persistence = v;
        }
        if let Some(v) = self.lacunarity {
            noise.lacunarity = v;
        }
        if let Some(v) = self.flatness {
            noise.flatness = v;
        }
        if let Some(v) = self.scale {
            noise.scale = v;
        }
        if let Some(v) = self.offset_x {
            noise.global_offset[0] = v;
        }
        if let Some(v) = self.offset_y {
            noise.global_offset[1] = v;
        }

        let offsets = &mut config.offsets;
        if let Some(seed) = self.seed {
            offsets.seed = seed;
        }
        if self.no_random_offsets {
            offsets.enabled = false;
        }
        if let Some(v) = self.offset_min {
            offsets.min = v;
        }
        if let Some(v) = self.offset_max {
            offsets.max = v;
        }

        if self.reference.is_some() {
            config.use_reference_image = true;
        }

        if let Some(preset) = self.preset {
            let backend = config.erosion.backend;
            config.erosion = ErosionParams {
                backend,
                ..ErosionParams::from_preset(preset)
            };
        }
        let erosion = &mut config.erosion;
        if self.no_erosion {
            erosion.enabled = false;
        }
        if let Some(v) = self.iterations {
            erosion.iterations = v;
        }
        if let Some(v) = self.rain {
            erosion.rain = v;
        }
        if let Some(v) = self.solubility {
            erosion.solubility = v;
        }
        if let Some(v) = self.evaporation {
            erosion.evaporation = v;
        }
        if let Some(v) = self.backend {
            erosion.backend = v;
        }

        Ok(config)
    }
}

fn run(args: &Args) -> Result<(), TerrainError> {
    let config = args.build_config()?;

    if args.dump_config {
        println!("{}", config.to_json_pretty()?);
        return Ok(());
    }

    let reference = match &args.reference {
        Some(path) => {
            log::info!("Loading reference image {}", path.display());
            Some(GrayscaleImage::open(path)?)
        }
        None => None,
    };

    let mut generator = TerrainGenerator::new(config);
    if let Some(reference) = &reference {
        generator = generator.with_reference(reference);
    }
    let (field, report) = generator.generate_report()?;

    if !report.normalized {
        log::warn!("Noise field was constant; heights were not normalized");
    }
    if let Some(stats) = &report.erosion {
        log::info!(
            "Erosion ({}): {} iterations, max erosion {:.4}, max deposition {:.4}, residual water {:.4}",
            stats.kernel,
            stats.iterations,
            stats.max_erosion,
            stats.max_deposition,
            stats.residual_water
        );
    }
    log::info!(
        "Done in {:.2?} (noise {:.2?}, erosion {:.2?})",
        report.timings.total(),
        report.timings.noise,
        report.timings.erosion
    );

    if args.histogram {
        field.print_histogram(20);
    }

    export::save_png(&field, &args.output)?;
    log::info!("Saved {}", args.output.display());

    if let Some(path) = &args.raw {
        export::save_raw(&field, path)?;
        log::info!("Saved {}", path.display());
    }
    if let Some(path) = &args.preview {
        export::render_heightmap(&field).save(path)?;
        log::info!("Saved {}", path.display());
    }

    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{}", err);
            ExitCode::FAILURE
        }
    }
}
