//! Deterministic pixel noise.
//!
//! Avoids RNG crates so synthetic datasets stay identical across platforms.

use crate::{Pt2, Real, Vec2};

/// Uniform per-axis noise in `[-max_abs_px, +max_abs_px]`, keyed by `(image, point)`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PixelNoise {
    pub seed: u64,
    pub max_abs_px: Real,
}

impl PixelNoise {
    pub fn new(seed: u64, max_abs_px: Real) -> Self {
        Self { seed, max_abs_px }
    }

    pub fn sample(&self, image_idx: usize, point_idx: usize) -> Vec2 {
        let max_abs = self.max_abs_px.abs();
        if max_abs == 0.0 {
            return Vec2::zeros();
        }

        let key = mix_key(self.seed, image_idx, point_idx);
        let u = unit_f64(splitmix64(key));
        let v = unit_f64(splitmix64(key ^ 0x94D0_49BB_1331_11EB));
        Vec2::new((u - 0.5) * 2.0 * max_abs, (v - 0.5) * 2.0 * max_abs)
    }

    /// Perturb every point of one image. Undefined points stay undefined.
    pub fn apply(&self, image_idx: usize, points: &[Pt2]) -> Vec<Pt2> {
        points
            .iter()
            .enumerate()
            .map(|(i, p)| p + self.sample(image_idx, i))
            .collect()
    }
}

fn mix_key(seed: u64, image_idx: usize, point_idx: usize) -> u64 {
    seed ^ (image_idx as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (point_idx as u64).wrapping_mul(0xBF58_476D_1CE4_E5B9)
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

// Top 53 bits as a double in [0, 1).
fn unit_f64(x: u64) -> Real {
    (x >> 11) as Real * (1.0 / ((1u64 << 53) as Real))
}
