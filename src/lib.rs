//! Terrain generation library
//!
//! Fractal-noise height fields, optional reference-image blending and a
//! Rain -> Erosion -> Evaporation refinement pipeline with CPU and GPU kernels.

pub mod config;
pub mod erosion;
pub mod error;
pub mod export;
pub mod generator;
pub mod heightfield;
pub mod noise_field;
pub mod offsets;
pub mod perlin;
pub mod reference;

pub use config::{NoiseParams, OctaveOffsetParams, TerrainConfig};
pub use erosion::{ErosionBackend, ErosionKernel, ErosionParams, ErosionPipeline, ErosionPreset, ErosionStats};
pub use error::{ConfigError, ErosionError, TerrainError};
pub use generator::{generate, GenerationReport, GenerationTimings, TerrainGenerator};
pub use heightfield::HeightField;
pub use noise_field::{NoiseSampler, PerlinSampler};
pub use reference::{GrayscaleImage, ReferenceImage};
