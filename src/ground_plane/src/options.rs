//! Project configuration options.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::GroundPlaneError;
use crate::transform::CoordTransform;

/// Mapping options shared by ingestion and the map operations.
///
/// Only `voxel_size` affects ground plane extraction, and only indirectly:
/// it becomes the scale of the transform attached to a volume at ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Voxel size in meters.
    pub voxel_size: f32,
    /// Confidence assigned to points that do not carry one.
    pub default_confidence: f32,
    /// Label assigned to points that do not carry one.
    pub default_label: usize,
    /// Label for free space (e.g. cleared by ray tracing).
    pub free_label: usize,
    /// Labels considered ground by label-aware operations.
    pub ground_labels: Vec<usize>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            voxel_size: 0.5,
            default_confidence: 1.0,
            default_label: 0,
            free_label: 0,
            ground_labels: Vec::new(),
        }
    }
}

impl Options {
    /// Parse options from YAML; missing fields take their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let options: Options = serde_yaml::from_str(yaml).context("Failed to parse options")?;
        options.validate()?;
        Ok(options)
    }

    /// Check that the options describe a usable configuration.
    pub fn validate(&self) -> Result<(), GroundPlaneError> {
        if !self.voxel_size.is_finite() || self.voxel_size <= 0.0 {
            return Err(GroundPlaneError::InvalidOptions(format!(
                "voxel_size must be positive and finite, got {}",
                self.voxel_size
            )));
        }
        if !self.default_confidence.is_finite() {
            return Err(GroundPlaneError::InvalidOptions(format!(
                "default_confidence must be finite, got {}",
                self.default_confidence
            )));
        }
        Ok(())
    }

    /// Index-to-world transform implied by `voxel_size`, with the origin at zero.
    pub fn transform(&self) -> Result<CoordTransform, GroundPlaneError> {
        self.validate()?;
        CoordTransform::linear(self.voxel_size as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_default() {
        let options = Options::default();
        assert_eq!(options.voxel_size, 0.5);
        assert_eq!(options.default_confidence, 1.0);
        assert!(options.ground_labels.is_empty());
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_options_from_yaml() {
        let yaml = r#"
voxel_size: 0.25
ground_labels: [1, 40, 48]
"#;
        let options = Options::from_yaml_str(yaml).unwrap();
        assert_eq!(options.voxel_size, 0.25);
        assert_eq!(options.ground_labels, vec![1, 40, 48]);
        // Unspecified fields keep their defaults
        assert_eq!(options.default_confidence, 1.0);
        assert_eq!(options.free_label, 0);
    }

    #[test]
    fn test_options_rejects_bad_voxel_size() {
        for voxel_size in [0.0, -1.0, f32::NAN, f32::INFINITY] {
            let options = Options {
                voxel_size,
                ..Default::default()
            };
            assert!(matches!(
                options.validate(),
                Err(GroundPlaneError::InvalidOptions(_))
            ));
            assert!(options.transform().is_err());
        }

        assert!(Options::from_yaml_str("voxel_size: -0.5").is_err());
        assert!(Options::from_yaml_str("voxel_size: [1, 2]").is_err());
    }

    #[test]
    fn test_options_transform() {
        let options = Options {
            voxel_size: 0.5,
            ..Default::default()
        };
        let transform = options.transform().unwrap();
        assert_eq!(transform.voxel_size(), 0.5);
        assert_eq!(transform.origin().norm(), 0.0);
    }
}
