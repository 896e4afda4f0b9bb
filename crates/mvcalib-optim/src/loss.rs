//! Per-point reprojection losses.
//!
//! A loss maps a predicted pixel (possibly a dual number) and an observed
//! pixel to a scalar. The joint objective is the plain sum of these values
//! over every defined observation.

use mvcalib_core::Real;
use nalgebra::{RealField, Vector2};
use serde::{Deserialize, Serialize};

/// Scalar penalty between a predicted and an observed pixel.
///
/// Implementations must be differentiable in `predicted` almost everywhere,
/// since they are evaluated on forward-mode dual numbers.
pub trait PointLoss {
    fn eval<T: RealField>(&self, predicted: &Vector2<T>, observed: &Vector2<Real>) -> T;
}

/// Built-in losses, evaluated on the squared pixel residual `r²`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum ReprojectionLoss {
    /// Sum of squared differences: `ρ = r²`.
    #[default]
    SumSquared,
    /// Quadratic up to `delta` pixels, linear beyond: `ρ = 2δr - δ²`.
    Huber { delta: Real },
    /// `ρ = c² ln(1 + r²/c²)`.
    Cauchy { c: Real },
}

impl ReprojectionLoss {
    /// `ρ(r²)` for any scalar type.
    pub fn rho<T: RealField>(&self, r2: T) -> T {
        match *self {
            ReprojectionLoss::SumSquared => r2,
            ReprojectionLoss::Huber { delta } => {
                let delta: T = nalgebra::convert(delta);
                // Compare squared values: sqrt has no derivative at r = 0.
                if r2 <= delta.clone() * delta.clone() {
                    r2
                } else {
                    let two: T = nalgebra::convert(2.0);
                    two * delta.clone() * r2.sqrt() - delta.clone() * delta
                }
            }
            ReprojectionLoss::Cauchy { c } => {
                let c2: T = nalgebra::convert(c * c);
                c2.clone() * (T::one() + r2 / c2).ln()
            }
        }
    }
}

impl PointLoss for ReprojectionLoss {
    fn eval<T: RealField>(&self, predicted: &Vector2<T>, observed: &Vector2<Real>) -> T {
        let dx = predicted.x.clone() - nalgebra::convert::<Real, T>(observed.x);
        let dy = predicted.y.clone() - nalgebra::convert::<Real, T>(observed.y);
        self.rho(dx.clone() * dx + dy.clone() * dy)
    }
}
