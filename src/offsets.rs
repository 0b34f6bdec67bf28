//! Per-octave coordinate offsets
//!
//! Every octave samples the noise at its own random offset so that layers do
//! not line up. The sequence must be reproducible from the seed alone, on any
//! platform and in any reimplementation, so the algorithm is fixed here:
//!
//! 1. Seed a ChaCha8 stream with `ChaCha8Rng::seed_from_u64(seed)`.
//! 2. For each octave draw the x component, then the y component.
//! 3. A component draws one `u32` word `w` and maps it onto `[min, max)` as
//!    `min + ((w as u64 * (max - min)) >> 32)`.
//!
//! The multiply-shift mapping has no rejection loop, so every component
//! consumes exactly one word.

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::config::OctaveOffsetParams;
use crate::error::ConfigError;

/// Integer-valued 2D offset added to one octave's sample coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct OctaveOffset {
    pub x: i32,
    pub y: i32,
}

impl OctaveOffset {
    pub const ZERO: Self = Self { x: 0, y: 0 };

    pub fn as_f64(&self) -> [f64; 2] {
        [self.x as f64, self.y as f64]
    }
}

/// Seeded generator of octave offsets in `[min, max)`.
pub struct OctaveOffsetSampler {
    rng: ChaCha8Rng,
    min: i32,
    span: u64,
}

impl OctaveOffsetSampler {
    pub fn new(seed: u64, min: i32, max: i32) -> Result<Self, ConfigError> {
        if min >= max {
            return Err(ConfigError::DegenerateOffsetRange { min, max });
        }
        Ok(Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            min,
            span: (max as i64 - min as i64) as u64,
        })
    }

    /// Next value in `[min, max)`.
    pub fn next_component(&mut self) -> i32 {
        let word = self.rng.next_u32() as u64;
        let step = (word * self.span) >> 32;
        (self.min as i64 + step as i64) as i32
    }

    pub fn next_offset(&mut self) -> OctaveOffset {
        let x = self.next_component();
        let y = self.next_component();
        OctaveOffset { x, y }
    }

    /// The next `count` offsets, in octave order.
    pub fn sample(&mut self, count: usize) -> Vec<OctaveOffset> {
        (0..count).map(|_| self.next_offset()).collect()
    }
}

/// Offsets for `count` octaves: zeros when random offsets are disabled,
/// otherwise the seeded sequence.
pub fn octave_offsets(params: &OctaveOffsetParams, count: usize) -> Result<Vec<OctaveOffset>, ConfigError> {
    if !params.enabled {
        return Ok(vec![OctaveOffset::ZERO; count]);
    }
    let mut sampler = OctaveOffsetSampler::new(params.seed, params.min, params.max)?;
    Ok(sampler.sample(count))
}
