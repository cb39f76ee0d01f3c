//! Error types for ground plane extraction.

use thiserror::Error;

/// Errors from staging, device execution and input validation.
///
/// An empty or missing volume is not an error: extractors report it as
/// `None`.
#[derive(Error, Debug)]
pub enum GroundPlaneError {
    #[error("attribute `{attribute}` cannot be staged for the device: expected {expected}, found {found}")]
    RepresentationMismatch {
        attribute: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    #[error("staged grid has no {0} view")]
    GridUnavailable(&'static str),

    #[error("compute device unavailable: {0}")]
    Device(String),

    #[error("volume exceeds capacity: {0}")]
    CapacityExceeded(String),

    #[error("invalid options: {0}")]
    InvalidOptions(String),

    #[error("point {index} is non-finite or outside the voxel coordinate range")]
    InvalidPoint { index: usize },
}
