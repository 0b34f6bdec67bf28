//! Erosion pipeline
//!
//! Refines a height field through repeated Rain -> Erosion -> Evaporation
//! rounds. The stage math lives in an [`ErosionKernel`]; this module owns the
//! cell state, the three stage buffers and the iteration loop.

pub mod cpu;
pub mod gpu;
pub mod kernel;
pub mod params;
pub mod utils;

pub use cpu::CpuKernel;
pub use gpu::GpuKernel;
pub use kernel::{CellState, ErosionKernel, KernelParams, Stage};
pub use params::{ErosionBackend, ErosionParams, ErosionPreset};

use std::time::Instant;

use crate::error::ErosionError;
use crate::heightfield::HeightField;

/// Statistics from an erosion run
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ErosionStats {
    /// Number of Rain -> Erosion -> Evaporation rounds executed
    pub iterations: usize,
    /// Total material removed (sum of height losses vs. the input field)
    pub total_eroded: f64,
    /// Total material added (sum of height gains vs. the input field)
    pub total_deposited: f64,
    /// Largest height loss at a single cell
    pub max_erosion: f32,
    /// Largest height gain at a single cell
    pub max_deposition: f32,
    /// Water left standing after the last evaporation stage
    pub residual_water: f64,
    /// Name of the kernel that executed the stages
    pub kernel: String,
}

impl ErosionStats {
    fn measure(before: &HeightField, after: &HeightField, residual_water: f64, iterations: usize, kernel: &str) -> Self {
        let mut stats = Self {
            iterations,
            residual_water,
            kernel: kernel.to_string(),
            ..Default::default()
        };
        for (&old, &new) in before.as_slice().iter().zip(after.as_slice()) {
            let delta = new - old;
            if delta < 0.0 {
                stats.total_eroded += -delta as f64;
                stats.max_erosion = stats.max_erosion.max(-delta);
            } else {
                stats.total_deposited += delta as f64;
                stats.max_deposition = stats.max_deposition.max(delta);
            }
        }
        stats
    }
}

/// Drives a kernel through the three stages with one buffer per stage.
pub struct ErosionPipeline<K: ErosionKernel = Box<dyn ErosionKernel>> {
    kernel: K,
}

impl<K: ErosionKernel> ErosionPipeline<K> {
    pub fn new(kernel: K) -> Self {
        Self { kernel }
    }

    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    /// Erode `field`, returning the refined copy and run statistics.
    ///
    /// The input field is never modified. With zero iterations the output
    /// equals the input.
    pub fn run(&self, field: &HeightField, params: &ErosionParams) -> Result<(HeightField, ErosionStats), ErosionError> {
        simulate(field, params, &self.kernel)
    }
}

/// Run `params.iterations` rounds of the erosion stages on `field` with `kernel`.
///
/// Buffer roles per iteration:
/// - Rain reads the Evaporation buffer, writes the Rain buffer
/// - Erosion reads the Rain buffer, writes the Erosion buffer
/// - Evaporation reads the Erosion buffer, writes the Evaporation buffer
///
/// The Evaporation buffer starts as the field with no water. Afterwards the
/// material still dissolved in standing water (`water * solubility`) is
/// deposited onto each cell.
pub fn simulate(
    field: &HeightField,
    params: &ErosionParams,
    kernel: &dyn ErosionKernel,
) -> Result<(HeightField, ErosionStats), ErosionError> {
    params.validate()?;

    let resolution = field.resolution();
    let kernel_params = params.kernel_params(resolution as u32);
    let cell_count = kernel_params.cell_count();
    let iterations = params.iteration_count();

    let mut evaporation_buffer: Vec<CellState> = field
        .as_slice()
        .iter()
        .map(|&height| CellState { height, water: 0.0 })
        .collect();
    let mut rain_buffer = vec![CellState::default(); cell_count];
    let mut erosion_buffer = vec![CellState::default(); cell_count];

    log::info!(
        "Eroding {}x{} field: {} iterations on the {} kernel",
        resolution,
        resolution,
        iterations,
        kernel.name()
    );
    let start = Instant::now();

    for iteration in 0..iterations {
        kernel.rain(&evaporation_buffer, &mut rain_buffer, &kernel_params)?;
        kernel.erode(&rain_buffer, &mut erosion_buffer, &kernel_params)?;
        kernel.evaporate(&erosion_buffer, &mut evaporation_buffer, &kernel_params)?;

        if (iteration + 1) % 10 == 0 || iteration + 1 == iterations {
            log::debug!("Erosion iteration {}/{}", iteration + 1, iterations);
        }
    }

    let solubility = params.solubility;
    let residual_water: f64 = evaporation_buffer.iter().map(|c| c.water as f64).sum();
    let heights: Vec<f32> = evaporation_buffer
        .iter()
        .map(|c| c.height + c.water * solubility)
        .collect();
    let eroded = HeightField::from_vec(resolution, heights)?;

    let stats = ErosionStats::measure(field, &eroded, residual_water, iterations, kernel.name());
    log::info!(
        "Erosion finished in {:.2?}: eroded {:.4}, deposited {:.4}",
        start.elapsed(),
        stats.total_eroded,
        stats.total_deposited
    );

    Ok((eroded, stats))
}

/// Pick the kernel for `backend`.
///
/// `Gpu` without a usable adapter is an error; `Auto` falls back to the CPU.
pub fn resolve_kernel(backend: ErosionBackend) -> Result<Box<dyn ErosionKernel>, ErosionError> {
    match backend {
        ErosionBackend::Cpu => Ok(Box::new(CpuKernel::new())),
        ErosionBackend::Gpu => match GpuKernel::new() {
            Some(kernel) => Ok(Box::new(kernel)),
            None => Err(ErosionError::KernelUnavailable(
                "no compatible GPU adapter found".to_string(),
            )),
        },
        ErosionBackend::Auto => match GpuKernel::new() {
            Some(kernel) => Ok(Box::new(kernel)),
            None => {
                log::warn!("No GPU adapter found, running erosion on the CPU");
                Ok(Box::new(CpuKernel::new()))
            }
        },
    }
}
