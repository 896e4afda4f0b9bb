use crate::Real;
use anyhow::{ensure, Result};
use nalgebra::{RealField, Vector2};
use serde::{Deserialize, Serialize};

/// Lens distortion model selected at construction time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistortionKind {
    /// Identity, no parameters.
    None,
    /// Two radial and two tangential terms: `[k1, k2, p1, p2]`.
    #[default]
    RadTan4,
    /// Three radial and two tangential terms: `[k1, k2, k3, p1, p2]`.
    BrownConrady5,
}

impl DistortionKind {
    pub const fn dim(self) -> usize {
        match self {
            DistortionKind::None => 0,
            DistortionKind::RadTan4 => 4,
            DistortionKind::BrownConrady5 => 5,
        }
    }

    /// Distort normalized image coordinates.
    pub fn apply<T: RealField>(self, params: &[T], p: &Vector2<T>) -> Vector2<T> {
        debug_assert!(params.len() == self.dim(), "distortion length mismatch");
        match self {
            DistortionKind::None => p.clone(),
            DistortionKind::RadTan4 => radial_tangential(
                p,
                params[0].clone(),
                params[1].clone(),
                T::zero(),
                params[2].clone(),
                params[3].clone(),
            ),
            DistortionKind::BrownConrady5 => radial_tangential(
                p,
                params[0].clone(),
                params[1].clone(),
                params[2].clone(),
                params[3].clone(),
                params[4].clone(),
            ),
        }
    }
}

fn radial_tangential<T: RealField>(
    p: &Vector2<T>,
    k1: T,
    k2: T,
    k3: T,
    p1: T,
    p2: T,
) -> Vector2<T> {
    let x = p.x.clone();
    let y = p.y.clone();
    let r2 = x.clone() * x.clone() + y.clone() * y.clone();
    let r4 = r2.clone() * r2.clone();
    let r6 = r4.clone() * r2.clone();

    let radial = T::one() + k1 * r2.clone() + k2 * r4 + k3 * r6;

    let two = T::one() + T::one();
    let x2 = x.clone() * x.clone();
    let y2 = y.clone() * y.clone();
    let xy = x.clone() * y.clone();

    let x_tan =
        two.clone() * p1.clone() * xy.clone() + p2.clone() * (r2.clone() + two.clone() * x2);
    let y_tan = p1 * (r2 + two.clone() * y2) + two * p2 * xy;

    Vector2::new(x * radial.clone() + x_tan, y * radial + y_tan)
}

/// Distortion values for one camera.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Distortion {
    None,
    RadTan4 {
        k1: Real,
        k2: Real,
        p1: Real,
        p2: Real,
    },
    BrownConrady5 {
        k1: Real,
        k2: Real,
        k3: Real,
        p1: Real,
        p2: Real,
    },
}

impl Default for Distortion {
    fn default() -> Self {
        Distortion::zeros(DistortionKind::default())
    }
}

impl Distortion {
    /// Identity-valued distortion of the given kind.
    pub fn zeros(kind: DistortionKind) -> Self {
        match kind {
            DistortionKind::None => Distortion::None,
            DistortionKind::RadTan4 => Distortion::RadTan4 {
                k1: 0.0,
                k2: 0.0,
                p1: 0.0,
                p2: 0.0,
            },
            DistortionKind::BrownConrady5 => Distortion::BrownConrady5 {
                k1: 0.0,
                k2: 0.0,
                k3: 0.0,
                p1: 0.0,
                p2: 0.0,
            },
        }
    }

    pub fn kind(&self) -> DistortionKind {
        match self {
            Distortion::None => DistortionKind::None,
            Distortion::RadTan4 { .. } => DistortionKind::RadTan4,
            Distortion::BrownConrady5 { .. } => DistortionKind::BrownConrady5,
        }
    }

    pub fn params(&self) -> Vec<Real> {
        match *self {
            Distortion::None => Vec::new(),
            Distortion::RadTan4 { k1, k2, p1, p2 } => vec![k1, k2, p1, p2],
            Distortion::BrownConrady5 { k1, k2, k3, p1, p2 } => vec![k1, k2, k3, p1, p2],
        }
    }

    pub fn from_params(kind: DistortionKind, v: &[Real]) -> Result<Self> {
        ensure!(
            v.len() == kind.dim(),
            "expected distortion vector of length {}, got {}",
            kind.dim(),
            v.len()
        );
        Ok(match kind {
            DistortionKind::None => Distortion::None,
            DistortionKind::RadTan4 => Distortion::RadTan4 {
                k1: v[0],
                k2: v[1],
                p1: v[2],
                p2: v[3],
            },
            DistortionKind::BrownConrady5 => Distortion::BrownConrady5 {
                k1: v[0],
                k2: v[1],
                k3: v[2],
                p1: v[3],
                p2: v[4],
            },
        })
    }

    pub fn distort(&self, n_undist: &Vector2<Real>) -> Vector2<Real> {
        self.kind().apply(&self.params(), n_undist)
    }

    /// Invert [`Distortion::distort`] by fixed-point iteration.
    pub fn undistort(&self, n_dist: &Vector2<Real>, iters: u32) -> Vector2<Real> {
        let kind = self.kind();
        let params = self.params();
        let mut n = *n_dist;
        for _ in 0..iters.max(1) {
            let err = kind.apply(&params, &n) - n_dist;
            n -= err;
        }
        n
    }
}
