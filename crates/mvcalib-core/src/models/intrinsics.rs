use crate::{Mat3, Real};
use anyhow::{ensure, Result};
use nalgebra::{RealField, Vector2};
use serde::{Deserialize, Serialize};

/// Intrinsic parametrization selected at construction time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntrinsicsKind {
    /// Square pixels: `[f, cx, cy]`.
    #[default]
    SingleFocal,
    /// Independent focal lengths: `[fx, fy, cx, cy]`.
    FxFy,
}

impl IntrinsicsKind {
    /// Number of parameters.
    pub const fn dim(self) -> usize {
        match self {
            IntrinsicsKind::SingleFocal => 3,
            IntrinsicsKind::FxFy => 4,
        }
    }

    /// Map normalized sensor coordinates to pixels.
    ///
    /// Generic over the scalar so the same code is differentiated by the optimizer.
    pub fn apply<T: RealField>(self, params: &[T], p: &Vector2<T>) -> Vector2<T> {
        debug_assert!(params.len() == self.dim(), "intrinsics length mismatch");
        match self {
            IntrinsicsKind::SingleFocal => {
                let f = params[0].clone();
                Vector2::new(
                    f.clone() * p.x.clone() + params[1].clone(),
                    f * p.y.clone() + params[2].clone(),
                )
            }
            IntrinsicsKind::FxFy => Vector2::new(
                params[0].clone() * p.x.clone() + params[2].clone(),
                params[1].clone() * p.y.clone() + params[3].clone(),
            ),
        }
    }
}

/// Pinhole intrinsics values.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Intrinsics {
    SingleFocal { f: Real, cx: Real, cy: Real },
    FxFy { fx: Real, fy: Real, cx: Real, cy: Real },
}

impl Intrinsics {
    pub fn kind(&self) -> IntrinsicsKind {
        match self {
            Intrinsics::SingleFocal { .. } => IntrinsicsKind::SingleFocal,
            Intrinsics::FxFy { .. } => IntrinsicsKind::FxFy,
        }
    }

    /// Build the requested parametrization from an intrinsic matrix.
    ///
    /// `SingleFocal` averages the two diagonal focal entries.
    pub fn from_k_matrix(kind: IntrinsicsKind, k: &Mat3) -> Self {
        match kind {
            IntrinsicsKind::SingleFocal => Intrinsics::SingleFocal {
                f: 0.5 * (k[(0, 0)] + k[(1, 1)]),
                cx: k[(0, 2)],
                cy: k[(1, 2)],
            },
            IntrinsicsKind::FxFy => Intrinsics::FxFy {
                fx: k[(0, 0)],
                fy: k[(1, 1)],
                cx: k[(0, 2)],
                cy: k[(1, 2)],
            },
        }
    }

    /// Return the 3x3 intrinsic matrix K.
    pub fn k_matrix(&self) -> Mat3 {
        let (fx, fy, cx, cy) = self.focal_and_center();
        Mat3::new(fx, 0.0, cx, 0.0, fy, cy, 0.0, 0.0, 1.0)
    }

    /// `(fx, fy, cx, cy)` regardless of parametrization.
    pub fn focal_and_center(&self) -> (Real, Real, Real, Real) {
        match *self {
            Intrinsics::SingleFocal { f, cx, cy } => (f, f, cx, cy),
            Intrinsics::FxFy { fx, fy, cx, cy } => (fx, fy, cx, cy),
        }
    }

    pub fn params(&self) -> Vec<Real> {
        match *self {
            Intrinsics::SingleFocal { f, cx, cy } => vec![f, cx, cy],
            Intrinsics::FxFy { fx, fy, cx, cy } => vec![fx, fy, cx, cy],
        }
    }

    pub fn from_params(kind: IntrinsicsKind, v: &[Real]) -> Result<Self> {
        ensure!(
            v.len() == kind.dim(),
            "expected intrinsics vector of length {}, got {}",
            kind.dim(),
            v.len()
        );
        Ok(match kind {
            IntrinsicsKind::SingleFocal => Intrinsics::SingleFocal {
                f: v[0],
                cx: v[1],
                cy: v[2],
            },
            IntrinsicsKind::FxFy => Intrinsics::FxFy {
                fx: v[0],
                fy: v[1],
                cx: v[2],
                cy: v[3],
            },
        })
    }

    pub fn is_defined(&self) -> bool {
        self.params().iter().all(|v| v.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn k_matrix_roundtrip() {
        let k = Mat3::new(810.0, 0.0, 320.0, 0.0, 790.0, 240.0, 0.0, 0.0, 1.0);
        let fxfy = Intrinsics::from_k_matrix(IntrinsicsKind::FxFy, &k);
        assert_eq!(fxfy.k_matrix(), k);

        let sf = Intrinsics::from_k_matrix(IntrinsicsKind::SingleFocal, &k);
        assert_eq!(sf.focal_and_center(), (800.0, 800.0, 320.0, 240.0));
    }

    #[test]
    fn apply_matches_k_matrix() {
        let intr = Intrinsics::FxFy {
            fx: 700.0,
            fy: 710.0,
            cx: 300.0,
            cy: 200.0,
        };
        let n = Vector2::new(0.1, -0.05);
        let uv = intr.kind().apply(&intr.params(), &n);
        let h = intr.k_matrix() * nalgebra::Vector3::new(n.x, n.y, 1.0);
        assert!((uv.x - h.x).abs() < 1e-12);
        assert!((uv.y - h.y).abs() < 1e-12);
    }

    #[test]
    fn from_params_rejects_wrong_length() {
        assert!(Intrinsics::from_params(IntrinsicsKind::SingleFocal, &[1.0, 2.0]).is_err());
        let intr = Intrinsics::from_params(IntrinsicsKind::SingleFocal, &[5.0, 1.0, 2.0]).unwrap();
        assert_eq!(intr.params(), vec![5.0, 1.0, 2.0]);
    }
}
