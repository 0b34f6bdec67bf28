//! Generation configuration
//!
//! A [`TerrainConfig`] is an immutable value handed to the generator. It can be
//! built in code, loaded from JSON, or assembled from command line flags.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::erosion::ErosionParams;
use crate::error::ConfigError;

/// Grid sizes accepted for the height field (2^n + 1 samples per side).
pub const VALID_RESOLUTIONS: [u32; 8] = [33, 65, 129, 257, 513, 1025, 2049, 4097];

/// Fractal noise parameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseParams {
    /// Number of noise layers to accumulate
    pub octave_count: i32,
    /// Amplitude of the first octave
    pub starting_amplitude: f32,
    /// Frequency of the first octave
    pub starting_frequency: f32,
    /// Amplitude decay per octave
    pub persistence: f32,
    /// Frequency growth per octave
    pub lacunarity: f32,
    /// Redistribution exponent applied after normalization (>= 1 flattens lowlands)
    pub flatness: f32,
    /// Size of the sampled noise domain across the whole grid
    pub scale: f32,
    /// Offset added to every sample coordinate
    pub global_offset: [f32; 2],
}

impl Default for NoiseParams {
    fn default() -> Self {
        Self {
            octave_count: 5,
            starting_amplitude: 1.0,
            starting_frequency: 1.0,
            persistence: 0.5,
            lacunarity: 2.0,
            flatness: 1.0,
            scale: 20.0,
            global_offset: [0.0, 0.0],
        }
    }
}

impl NoiseParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.octave_count < 0 {
            return Err(ConfigError::NegativeOctaveCount(self.octave_count));
        }
        finite("noise.starting_amplitude", self.starting_amplitude)?;
        finite("noise.starting_frequency", self.starting_frequency)?;
        finite("noise.persistence", self.persistence)?;
        finite("noise.lacunarity", self.lacunarity)?;
        finite("noise.global_offset[0]", self.global_offset[0])?;
        finite("noise.global_offset[1]", self.global_offset[1])?;
        finite("noise.flatness", self.flatness)?;
        if self.flatness < 1.0 {
            return Err(ConfigError::InvalidParameter {
                name: "noise.flatness",
                reason: format!("{} is below 1.0", self.flatness),
            });
        }
        finite("noise.scale", self.scale)?;
        if self.scale <= 0.0 {
            return Err(ConfigError::InvalidParameter {
                name: "noise.scale",
                reason: format!("{} must be positive", self.scale),
            });
        }
        Ok(())
    }

    /// Octave count as a loop bound. Only meaningful after [`Self::validate`].
    pub fn octaves(&self) -> usize {
        self.octave_count.max(0) as usize
    }
}

/// Per-octave random coordinate offsets
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OctaveOffsetParams {
    /// Draw a random offset per octave; all offsets are zero otherwise
    pub enabled: bool,
    /// Seed of the offset generator
    pub seed: u64,
    /// Inclusive lower bound of each offset component
    pub min: i32,
    /// Exclusive upper bound of each offset component
    pub max: i32,
}

impl Default for OctaveOffsetParams {
    fn default() -> Self {
        Self {
            enabled: true,
            seed: 1234,
            min: -1000,
            max: 1000,
        }
    }
}

impl OctaveOffsetParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min >= self.max {
            return Err(ConfigError::DegenerateOffsetRange {
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

/// Complete parameter set for one generation run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// Samples per side of the square height field
    pub resolution: u32,
    pub noise: NoiseParams,
    pub offsets: OctaveOffsetParams,
    /// Blend the normalized noise 50/50 with a reference height image
    pub use_reference_image: bool,
    pub erosion: ErosionParams,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            resolution: 513,
            noise: NoiseParams::default(),
            offsets: OctaveOffsetParams::default(),
            use_reference_image: false,
            erosion: ErosionParams::default(),
        }
    }
}

impl TerrainConfig {
    /// Default configuration at a given resolution
    pub fn with_resolution(resolution: u32) -> Self {
        Self {
            resolution,
            ..Default::default()
        }
    }

    /// Report the first invalid parameter, if any.
    ///
    /// Offset bounds are only checked when random offsets are enabled and
    /// erosion numbers only when erosion is enabled.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_resolution(self.resolution)?;
        self.noise.validate()?;
        if self.offsets.enabled {
            self.offsets.validate()?;
        }
        if self.erosion.enabled {
            self.erosion.validate()?;
        }
        Ok(())
    }

    /// Number of cells in the height field
    pub fn cell_count(&self) -> usize {
        self.resolution as usize * self.resolution as usize
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

pub fn validate_resolution(resolution: u32) -> Result<(), ConfigError> {
    if VALID_RESOLUTIONS.contains(&resolution) {
        Ok(())
    } else {
        Err(ConfigError::InvalidResolution(resolution))
    }
}

fn finite(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::InvalidParameter {
            name,
            reason: format!("{} is not a finite number", value),
        })
    }
}
