//! Erosion simulation parameters and configuration

use serde::{Deserialize, Serialize};

use crate::erosion::kernel::KernelParams;
use crate::error::ConfigError;

/// Erosion intensity preset
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ErosionPreset {
    /// No erosion - raw noise terrain
    None,
    /// Few iterations, light rain
    Light,
    /// Balanced erosion (the generator defaults)
    #[default]
    Normal,
    /// Many iterations with soluble ground
    Heavy,
}

impl ErosionPreset {
    pub fn all() -> &'static [Self] {
        &[Self::None, Self::Light, Self::Normal, Self::Heavy]
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::None => "No erosion (raw terrain)",
            Self::Light => "Subtle smoothing",
            Self::Normal => "Balanced erosion",
            Self::Heavy => "Deep valleys, filled basins",
        }
    }
}

impl std::fmt::Display for ErosionPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Light => write!(f, "light"),
            Self::Normal => write!(f, "normal"),
            Self::Heavy => write!(f, "heavy"),
        }
    }
}

/// Which erosion kernel executes the Rain/Erosion/Evaporation stages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ErosionBackend {
    /// rayon thread pool
    #[default]
    Cpu,
    /// wgpu compute shader; fails if no adapter is present
    Gpu,
    /// GPU when an adapter is present, CPU otherwise
    Auto,
}

impl std::fmt::Display for ErosionBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cpu => write!(f, "cpu"),
            Self::Gpu => write!(f, "gpu"),
            Self::Auto => write!(f, "auto"),
        }
    }
}

/// Erosion pipeline parameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErosionParams {
    /// Run the erosion pipeline after noise generation
    pub enabled: bool,

    /// Number of Rain -> Erosion -> Evaporation rounds
    pub iterations: i32,

    /// Water added to every cell per iteration
    pub rain: f32,

    /// Fraction of a unit of water's worth of ground dissolved into it
    pub solubility: f32,

    /// Fraction of standing water removed per iteration (0.0-1.0)
    pub evaporation: f32,

    /// Kernel used to execute the stages
    pub backend: ErosionBackend,
}

impl Default for ErosionParams {
    fn default() -> Self {
        Self {
            enabled: true,
            iterations: 50,
            rain: 0.01,
            solubility: 0.10,
            evaporation: 0.5,
            backend: ErosionBackend::Cpu,
        }
    }
}

impl ErosionParams {
    /// Create parameters from a preset
    pub fn from_preset(preset: ErosionPreset) -> Self {
        match preset {
            ErosionPreset::None => Self {
                enabled: false,
                ..Default::default()
            },
            ErosionPreset::Light => Self {
                iterations: 20,
                rain: 0.005,
                solubility: 0.05,
                ..Default::default()
            },
            ErosionPreset::Normal => Self::default(),
            ErosionPreset::Heavy => Self {
                iterations: 200,
                rain: 0.02,
                solubility: 0.2,
                evaporation: 0.3,
                ..Default::default()
            },
        }
    }

    /// Check the numeric ranges. `enabled` is ignored here; callers decide
    /// whether disabled erosion still needs valid numbers.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.iterations < 0 {
            return Err(ConfigError::NegativeIterations(self.iterations));
        }
        non_negative("erosion.rain", self.rain)?;
        non_negative("erosion.solubility", self.solubility)?;
        if !(0.0..=1.0).contains(&self.evaporation) {
            return Err(ConfigError::InvalidParameter {
                name: "erosion.evaporation",
                reason: format!("{} is outside 0.0-1.0", self.evaporation),
            });
        }
        Ok(())
    }

    /// Iteration count as a loop bound. Only meaningful after [`Self::validate`].
    pub fn iteration_count(&self) -> usize {
        self.iterations.max(0) as usize
    }

    /// Parameters handed to every kernel stage
    pub fn kernel_params(&self, resolution: u32) -> KernelParams {
        KernelParams {
            resolution,
            rain: self.rain,
            solubility: self.solubility,
            evaporation: self.evaporation,
        }
    }
}

fn non_negative(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ConfigError::InvalidParameter {
            name,
            reason: format!("{} must be a finite, non-negative number", value),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_generator_defaults() {
        let params = ErosionParams::default();
        assert!(params.enabled);
        assert_eq!(params.iterations, 50);
        assert_eq!(params.rain, 0.01);
        assert_eq!(params.solubility, 0.10);
        assert_eq!(params.evaporation, 0.5);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_presets_are_valid() {
        for &preset in ErosionPreset::all() {
            let params = ErosionParams::from_preset(preset);
            assert!(params.validate().is_ok(), "preset {} invalid", preset);
        }
        assert!(!ErosionParams::from_preset(ErosionPreset::None).enabled);
    }

    #[test]
    fn test_negative_iterations_rejected() {
        let params = ErosionParams {
            iterations: -1,
            ..Default::default()
        };
        assert_eq!(params.validate(), Err(ConfigError::NegativeIterations(-1)));
    }

    #[test]
    fn test_evaporation_range() {
        let params = ErosionParams {
            evaporation: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            params.validate(),
            Err(ConfigError::InvalidParameter { name: "erosion.evaporation", .. })
        ));

        let params = ErosionParams {
            rain: f32::NAN,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }
}
