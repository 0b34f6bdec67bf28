//! Gradient noise on an unbounded lattice
//!
//! `noise::Perlin` looks gradients up in a 256-entry permutation table, so
//! its output repeats every 256 units. Here each lattice corner's gradient
//! comes from a 64-bit hash of `(seed, ix, iy)` instead, and the field does
//! not repeat over any domain an `i64` lattice can address.

use std::f64::consts::{SQRT_2, TAU};
use std::ops::BitXor;

use noise::NoiseFn;

/// 2D Perlin noise with hashed lattice gradients. Output in [-1, 1], zero
/// on every lattice point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LatticePerlin {
    seed: u64,
}

impl LatticePerlin {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Unit gradient at lattice corner `(ix, iy)`.
    fn gradient(&self, ix: i64, iy: i64) -> [f64; 2] {
        let h = finalize(hash(hash(self.seed, ix as u64), iy as u64));
        // Top 53 bits give a uniform angle in [0, TAU)
        let angle = (h >> 11) as f64 / (1u64 << 53) as f64 * TAU;
        [angle.cos(), angle.sin()]
    }
}

impl NoiseFn<f64, 2> for LatticePerlin {
    fn get(&self, point: [f64; 2]) -> f64 {
        let [x, y] = point;
        let x0 = x.floor();
        let y0 = y.floor();
        let (fx, fy) = (x - x0, y - y0);
        let (ix, iy) = (x0 as i64, y0 as i64);

        let corner = |cx: i64, cy: i64, dx: f64, dy: f64| {
            let [gx, gy] = self.gradient(ix.wrapping_add(cx), iy.wrapping_add(cy));
            gx * dx + gy * dy
        };
        let n00 = corner(0, 0, fx, fy);
        let n10 = corner(1, 0, fx - 1.0, fy);
        let n01 = corner(0, 1, fx, fy - 1.0);
        let n11 = corner(1, 1, fx - 1.0, fy - 1.0);

        let u = fade(fx);
        let v = fade(fy);
        let value = lerp(lerp(n00, n10, u), lerp(n01, n11, u), v);

        // Unit gradients peak at sqrt(1/2)
        (value * SQRT_2).clamp(-1.0, 1.0)
    }
}

fn hash(a: u64, b: u64) -> u64 {
    a.rotate_left(5).bitxor(b).wrapping_mul(0x517c_c1b7_2722_0a95)
}

/// Avalanche the bits of a multiplicative hash.
fn finalize(mut h: u64) -> u64 {
    h ^= h >> 33;
    h = h.wrapping_mul(0xff51_afd7_ed55_8ccd);
    h ^= h >> 33;
    h = h.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    h ^ (h >> 33)
}

/// Quintic smoothstep
fn fade(t: f64) -> f64 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points() -> impl Iterator<Item = [f64; 2]> {
        (0..200).map(|i| [i as f64 * 1.37 + 0.21, i as f64 * 0.73 - 50.43])
    }

    #[test]
    fn test_range() {
        let perlin = LatticePerlin::new(0);
        for p in points() {
            let v = perlin.get(p);
            assert!((-1.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn test_zero_on_lattice() {
        let perlin = LatticePerlin::new(3);
        for (x, y) in [(0.0, 0.0), (5.0, -7.0), (-300.0, 256.0)] {
            assert_eq!(perlin.get([x, y]), 0.0);
        }
    }

    #[test]
    fn test_no_256_period() {
        let perlin = LatticePerlin::new(0);
        for shift in [256.0, 512.0, 1024.0] {
            let repeated = points()
                .filter(|&[x, y]| perlin.get([x, y]) == perlin.get([x + shift, y]))
                .count();
            assert_eq!(repeated, 0, "{} samples repeat at +{}", repeated, shift);
            let repeated = points()
                .filter(|&[x, y]| perlin.get([x, y]) == perlin.get([x, y + shift]))
                .count();
            assert_eq!(repeated, 0, "{} samples repeat at +{} in y", repeated, shift);
        }
    }

    #[test]
    fn test_continuous() {
        let perlin = LatticePerlin::new(9);
        for [x, y] in points() {
            let d = perlin.get([x, y]) - perlin.get([x + 1e-4, y + 1e-4]);
            assert!(d.abs() < 1e-2);
        }
    }

    #[test]
    fn test_seed_changes_field() {
        let a = LatticePerlin::new(1);
        let b = LatticePerlin::new(2);
        assert!(points().any(|p| a.get(p) != b.get(p)));
        assert!(points().all(|p| a.get(p) == LatticePerlin::new(1).get(p)));
    }
}
