use anyhow::{Context, Result};
use mvcalib_core::{DistortionKind, IntrinsicsKind};
use mvcalib_optim::{OptimizerConfig, ReprojectionLoss};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Model, loss and optimizer selection for a calibration run.
///
/// Every field falls back to its default when absent from JSON.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibConfig {
    pub intrinsics: IntrinsicsKind,
    pub distortion: DistortionKind,
    pub loss: ReprojectionLoss,
    pub optimizer: OptimizerConfig,
    /// Camera whose frame becomes the global reference.
    pub reference_camera: usize,
}

impl CalibConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("failed to parse calibration config")
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_json(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_yields_defaults() {
        let config = CalibConfig::from_json("{}").unwrap();
        assert_eq!(config, CalibConfig::default());
        assert_eq!(config.intrinsics, IntrinsicsKind::SingleFocal);
        assert_eq!(config.distortion, DistortionKind::RadTan4);
        assert_eq!(config.optimizer.max_iterations, 500);
        assert_eq!(config.reference_camera, 0);
    }

    #[test]
    fn partial_json_overrides_fields() {
        let config = CalibConfig::from_json(
            r#"{
                "distortion": "BrownConrady5",
                "loss": {"Cauchy": {"c": 2.0}},
                "optimizer": {"convergence_tolerance": 1e-8},
                "reference_camera": 1
            }"#,
        )
        .unwrap();
        assert_eq!(config.distortion, DistortionKind::BrownConrady5);
        assert_eq!(config.loss, ReprojectionLoss::Cauchy { c: 2.0 });
        assert_eq!(config.optimizer.convergence_tolerance, 1e-8);
        assert_eq!(config.optimizer.memory, 7);
        assert_eq!(config.reference_camera, 1);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(CalibConfig::from_json(r#"{"distortion": "Fisheye"}"#).is_err());
    }
}
