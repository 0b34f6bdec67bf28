//! Terrain generation entry point
//!
//! Runs noise synthesis followed by the optional erosion pipeline. All
//! configuration errors and a missing erosion kernel are reported before
//! any grid work starts.

use std::time::{Duration, Instant};

use crate::config::TerrainConfig;
use crate::erosion::{resolve_kernel, simulate, ErosionBackend, ErosionKernel, ErosionStats};
use crate::error::{ErosionError, TerrainError};
use crate::heightfield::HeightField;
use crate::noise_field::{generate_noise_field, resolve_reference, NoiseSampler, PerlinSampler};
use crate::reference::ReferenceImage;

/// Picks the erosion kernel for a backend when none was supplied.
pub type KernelResolver = fn(ErosionBackend) -> Result<Box<dyn ErosionKernel>, ErosionError>;

/// Wall-clock time spent per phase
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GenerationTimings {
    pub noise: Duration,
    pub erosion: Duration,
}

impl GenerationTimings {
    pub fn total(&self) -> Duration {
        self.noise + self.erosion
    }
}

/// What happened during a generation run
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GenerationReport {
    /// False when the noise grid was constant and normalization was skipped
    pub normalized: bool,
    /// Present when erosion ran
    pub erosion: Option<ErosionStats>,
    pub timings: GenerationTimings,
}

/// Builder for one configured generation run.
///
/// ```no_run
/// use terrain_generator::{TerrainConfig, TerrainGenerator};
///
/// let field = TerrainGenerator::new(TerrainConfig::default()).generate()?;
/// # Ok::<(), terrain_generator::TerrainError>(())
/// ```
pub struct TerrainGenerator<'a> {
    config: TerrainConfig,
    reference: Option<&'a dyn ReferenceImage>,
    kernel: Option<Box<dyn ErosionKernel>>,
    resolver: KernelResolver,
    sampler: Box<dyn NoiseSampler>,
}

impl<'a> TerrainGenerator<'a> {
    pub fn new(config: TerrainConfig) -> Self {
        Self {
            config,
            reference: None,
            kernel: None,
            resolver: resolve_kernel,
            sampler: Box::new(PerlinSampler::default()),
        }
    }

    /// Image blended in when `use_reference_image` is set.
    pub fn with_reference(mut self, reference: &'a dyn ReferenceImage) -> Self {
        self.reference = Some(reference);
        self
    }

    /// Use this kernel instead of the one selected by `erosion.backend`.
    pub fn with_kernel(mut self, kernel: Box<dyn ErosionKernel>) -> Self {
        self.kernel = Some(kernel);
        self
    }

    /// Replace [`resolve_kernel`] as the backend lookup.
    pub fn with_kernel_resolver(mut self, resolver: KernelResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_sampler(mut self, sampler: Box<dyn NoiseSampler>) -> Self {
        self.sampler = sampler;
        self
    }

    pub fn config(&self) -> &TerrainConfig {
        &self.config
    }

    pub fn generate(&self) -> Result<HeightField, TerrainError> {
        self.generate_report().map(|(field, _)| field)
    }

    pub fn generate_report(&self) -> Result<(HeightField, GenerationReport), TerrainError> {
        let config = &self.config;
        config.validate()?;
        resolve_reference(config, self.reference)?;

        let resolved;
        let kernel: Option<&dyn ErosionKernel> = if config.erosion.enabled {
            match &self.kernel {
                Some(kernel) => Some(kernel.as_ref()),
                None => {
                    resolved = (self.resolver)(config.erosion.backend)?;
                    Some(resolved.as_ref())
                }
            }
        } else {
            None
        };

        log::info!(
            "Generating {}x{} terrain ({} octaves)",
            config.resolution,
            config.resolution,
            config.noise.octaves()
        );
        let mut report = GenerationReport::default();

        let start = Instant::now();
        let noise = generate_noise_field(config, self.sampler.as_ref(), self.reference)?;
        report.timings.noise = start.elapsed();
        report.normalized = noise.normalized;
        log::info!("Noise field done in {:.2?}", report.timings.noise);

        let field = match kernel {
            Some(kernel) => {
                let start = Instant::now();
                let (field, stats) = simulate(&noise.field, &config.erosion, kernel)?;
                report.timings.erosion = start.elapsed();
                report.erosion = Some(stats);
                field
            }
            None => noise.field,
        };

        Ok((field, report))
    }
}

/// Generate a height field from `config` with the default Perlin sampler,
/// no reference image and the kernel selected by `erosion.backend`.
pub fn generate(config: &TerrainConfig) -> Result<HeightField, TerrainError> {
    TerrainGenerator::new(config.clone()).generate()
}
