//! Grayscale image abstraction consumed by the calibration pipeline.

use crate::Real;
use anyhow::{ensure, Result};
use log::warn;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Read-only view of one calibration image.
///
/// Pixel arrays are indexed `(row, col)` with values in `[0, 1]`.
pub trait CalibImage {
    /// Stable identifying name.
    fn name(&self) -> &str;

    /// `(height, width)` in pixels.
    fn size(&self) -> (usize, usize);

    /// Grayscale pixel array.
    fn gray(&self) -> DMatrix<Real>;
}

/// In-memory grayscale image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArrayImage {
    name: String,
    data: DMatrix<Real>,
}

impl ArrayImage {
    /// Wrap a grayscale array. Values outside `[0, 1]` are accepted with a warning.
    pub fn new(name: impl Into<String>, data: DMatrix<Real>) -> Result<Self> {
        let name = name.into();
        ensure!(
            data.nrows() > 0 && data.ncols() > 0,
            "image {name} has an empty pixel array"
        );
        if data.min() < 0.0 {
            warn!("image {name}: value less than 0 found");
        }
        if data.max() > 1.0 {
            warn!("image {name}: value greater than 1 found");
        }
        Ok(Self { name, data })
    }

    /// Build from interleaved RGB rows (`height * width * 3` values in `[0, 1]`).
    pub fn from_rgb(name: impl Into<String>, height: usize, width: usize, rgb: &[Real]) -> Result<Self> {
        ensure!(
            rgb.len() == height * width * 3,
            "expected {} rgb values, got {}",
            height * width * 3,
            rgb.len()
        );
        let data = DMatrix::from_fn(height, width, |r, c| {
            let i = 3 * (r * width + c);
            rgb_to_gray(rgb[i], rgb[i + 1], rgb[i + 2])
        });
        Self::new(name, data)
    }

    pub fn data(&self) -> &DMatrix<Real> {
        &self.data
    }
}

impl CalibImage for ArrayImage {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> (usize, usize) {
        (self.data.nrows(), self.data.ncols())
    }

    fn gray(&self) -> DMatrix<Real> {
        self.data.clone()
    }
}

impl<I: CalibImage + ?Sized> CalibImage for &I {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn size(&self) -> (usize, usize) {
        (**self).size()
    }

    fn gray(&self) -> DMatrix<Real> {
        (**self).gray()
    }
}

/// ITU-R 601 luma weights.
pub fn rgb_to_gray(r: Real, g: Real, b: Real) -> Real {
    r * 0.299 + g * 0.587 + b * 0.114
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_image_reports_size_and_name() {
        let img = ArrayImage::new("cam0_0001", DMatrix::from_element(4, 6, 0.5)).unwrap();
        assert_eq!(img.name(), "cam0_0001");
        assert_eq!(img.size(), (4, 6));
        assert_eq!(img.gray()[(3, 5)], 0.5);
    }

    #[test]
    fn empty_arrays_are_rejected() {
        assert!(ArrayImage::new("empty", DMatrix::zeros(0, 3)).is_err());
    }

    #[test]
    fn rgb_conversion_uses_luma_weights() {
        let rgb = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let img = ArrayImage::from_rgb("rgb", 1, 2, &rgb).unwrap();
        assert!((img.data()[(0, 0)] - 0.299).abs() < 1e-12);
        assert!((img.data()[(0, 1)] - 0.587).abs() < 1e-12);
        assert!(ArrayImage::from_rgb("bad", 2, 2, &rgb).is_err());
    }
}
