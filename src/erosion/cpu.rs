//! CPU erosion kernel
//!
//! Every stage writes its output buffer in parallel with rayon. Cells only
//! read the stage's input buffer, so the work splits freely across threads
//! without locks or atomics.

use rayon::prelude::*;

use crate::erosion::kernel::{CellState, ErosionKernel, KernelParams};
use crate::erosion::utils::{erode_cell, evaporate_cell, rain_cell};
use crate::error::ErosionError;

/// Multi-threaded kernel running the formulas in [`crate::erosion::utils`].
#[derive(Clone, Copy, Debug, Default)]
pub struct CpuKernel;

impl CpuKernel {
    pub fn new() -> Self {
        Self
    }
}

fn check_lengths(
    stage: &'static str,
    input: &[CellState],
    output: &[CellState],
    params: &KernelParams,
) -> Result<(), ErosionError> {
    let expected = params.cell_count();
    for actual in [input.len(), output.len()] {
        if actual != expected {
            return Err(ErosionError::BufferMismatch { stage, expected, actual });
        }
    }
    Ok(())
}

impl ErosionKernel for CpuKernel {
    fn name(&self) -> &str {
        "cpu"
    }

    fn rain(&self, input: &[CellState], output: &mut [CellState], params: &KernelParams) -> Result<(), ErosionError> {
        check_lengths("rain", input, output, params)?;
        output
            .par_iter_mut()
            .zip(input.par_iter())
            .for_each(|(out, &cell)| *out = rain_cell(cell, params));
        Ok(())
    }

    fn erode(&self, input: &[CellState], output: &mut [CellState], params: &KernelParams) -> Result<(), ErosionError> {
        check_lengths("erosion", input, output, params)?;
        let resolution = params.resolution as usize;
        if resolution == 0 {
            return Ok(());
        }
        output
            .par_chunks_mut(resolution)
            .enumerate()
            .for_each(|(x, column)| {
                for (y, out) in column.iter_mut().enumerate() {
                    *out = erode_cell(input, resolution, x, y, params);
                }
            });
        Ok(())
    }

    fn evaporate(&self, input: &[CellState], output: &mut [CellState], params: &KernelParams) -> Result<(), ErosionError> {
        check_lengths("evaporation", input, output, params)?;
        output
            .par_iter_mut()
            .zip(input.par_iter())
            .for_each(|(out, &cell)| *out = evaporate_cell(cell, params));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(resolution: u32) -> KernelParams {
        KernelParams {
            resolution,
            rain: 0.01,
            solubility: 0.1,
            evaporation: 0.5,
        }
    }

    fn bumpy(resolution: usize) -> Vec<CellState> {
        (0..resolution * resolution)
            .map(|i| CellState {
                height: ((i * 37) % 17) as f32 / 17.0,
                water: ((i * 13) % 7) as f32 / 70.0,
            })
            .collect()
    }

    #[test]
    fn test_rain_never_removes_water() {
        let input = bumpy(9);
        let mut output = vec![CellState::default(); input.len()];
        CpuKernel.rain(&input, &mut output, &params(9)).unwrap();
        for (before, after) in input.iter().zip(&output) {
            assert!(after.water >= before.water);
            assert_eq!(after.height, before.height);
        }
    }

    #[test]
    fn test_evaporation_never_adds_water() {
        let input = bumpy(9);
        let mut output = vec![CellState::default(); input.len()];
        CpuKernel.evaporate(&input, &mut output, &params(9)).unwrap();
        for (before, after) in input.iter().zip(&output) {
            assert!(after.water <= before.water);
        }
    }

    #[test]
    fn test_erosion_is_finite_and_bounded() {
        let p = params(9);
        let input = bumpy(9);
        let mut output = vec![CellState::default(); input.len()];
        CpuKernel.erode(&input, &mut output, &p).unwrap();
        for (before, after) in input.iter().zip(&output) {
            assert!(after.height.is_finite() && after.water.is_finite());
            assert!((after.height - before.height).abs() <= p.solubility * p.rain + 1e-6);
            assert!(after.water >= 0.0);
        }
    }

    #[test]
    fn test_wrong_buffer_length_is_error() {
        let input = bumpy(9);
        let mut output = vec![CellState::default(); 10];
        let err = CpuKernel.erode(&input, &mut output, &params(9)).unwrap_err();
        assert_eq!(
            err,
            ErosionError::BufferMismatch { stage: "erosion", expected: 81, actual: 10 }
        );
    }
}
