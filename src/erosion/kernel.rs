//! The erosion kernel contract
//!
//! A kernel supplies the three full-grid stage transforms. Each stage reads
//! one buffer and writes a different one; a cell's new value may depend on
//! its neighbours' values in the input buffer but never on another cell's
//! output from the same stage.

use bytemuck::{Pod, Zeroable};

use crate::error::ErosionError;

/// Per-cell erosion state. Layout matches the GPU storage buffers.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct CellState {
    pub height: f32,
    pub water: f32,
}

/// Uniform parameters shared by all three stages
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct KernelParams {
    pub resolution: u32,
    pub rain: f32,
    pub solubility: f32,
    pub evaporation: f32,
}

impl KernelParams {
    pub fn cell_count(&self) -> usize {
        self.resolution as usize * self.resolution as usize
    }
}

/// One of the three per-iteration transforms, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    Rain,
    Erosion,
    Evaporation,
}

impl Stage {
    pub const ORDER: [Stage; 3] = [Stage::Rain, Stage::Erosion, Stage::Evaporation];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Rain => "rain",
            Stage::Erosion => "erosion",
            Stage::Evaporation => "evaporation",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Full-grid stage transforms driven by [`crate::erosion::ErosionPipeline`].
///
/// `input` and `output` always hold `params.cell_count()` cells and are
/// distinct buffers. Contracts:
/// - `rain`: output water >= input water, height unchanged.
/// - `erode`: finite output for finite input; material removed from the
///   ground is carried by the water.
/// - `evaporate`: output water <= input water.
pub trait ErosionKernel: Send + Sync {
    fn name(&self) -> &str;

    fn rain(&self, input: &[CellState], output: &mut [CellState], params: &KernelParams) -> Result<(), ErosionError>;

    fn erode(&self, input: &[CellState], output: &mut [CellState], params: &KernelParams) -> Result<(), ErosionError>;

    fn evaporate(&self, input: &[CellState], output: &mut [CellState], params: &KernelParams) -> Result<(), ErosionError>;

    /// Dispatch by stage.
    fn run_stage(
        &self,
        stage: Stage,
        input: &[CellState],
        output: &mut [CellState],
        params: &KernelParams,
    ) -> Result<(), ErosionError> {
        match stage {
            Stage::Rain => self.rain(input, output, params),
            Stage::Erosion => self.erode(input, output, params),
            Stage::Evaporation => self.evaporate(input, output, params),
        }
    }
}

impl<K: ErosionKernel + ?Sized> ErosionKernel for Box<K> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn rain(&self, input: &[CellState], output: &mut [CellState], params: &KernelParams) -> Result<(), ErosionError> {
        (**self).rain(input, output, params)
    }

    fn erode(&self, input: &[CellState], output: &mut [CellState], params: &KernelParams) -> Result<(), ErosionError> {
        (**self).erode(input, output, params)
    }

    fn evaporate(&self, input: &[CellState], output: &mut [CellState], params: &KernelParams) -> Result<(), ErosionError> {
        (**self).evaporate(input, output, params)
    }
}
