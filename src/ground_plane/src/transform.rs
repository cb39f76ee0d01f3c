//! Index-space to world-space transforms.
//!
//! Voxel `(i, j, k)` is centered at `origin + voxel_size * (i, j, k)`. A point
//! is stored as its voxel coordinate plus an offset from the voxel center in
//! index units, each component in `[-0.5, 0.5)`.

use nalgebra::Vector3;

use crate::error::GroundPlaneError;
use crate::volume::VoxelCoord;

/// Uniform-scale linear transform attached to a volume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordTransform {
    voxel_size: f64,
    origin: Vector3<f64>,
}

impl CoordTransform {
    /// Create a transform with the given voxel size and world-space origin.
    pub fn new(voxel_size: f64, origin: Vector3<f64>) -> Result<Self, GroundPlaneError> {
        if !voxel_size.is_finite() || voxel_size <= 0.0 {
            return Err(GroundPlaneError::InvalidOptions(format!(
                "voxel size must be positive and finite, got {voxel_size}"
            )));
        }
        if !origin.iter().all(|v| v.is_finite()) {
            return Err(GroundPlaneError::InvalidOptions(
                "transform origin must be finite".to_string(),
            ));
        }
        Ok(Self { voxel_size, origin })
    }

    /// Transform with the origin at zero.
    pub fn linear(voxel_size: f64) -> Result<Self, GroundPlaneError> {
        Self::new(voxel_size, Vector3::zeros())
    }

    pub fn voxel_size(&self) -> f64 {
        self.voxel_size
    }

    pub fn origin(&self) -> &Vector3<f64> {
        &self.origin
    }

    /// Map a continuous index-space position to world space.
    #[inline]
    pub fn index_to_world(&self, index: &Vector3<f64>) -> Vector3<f64> {
        self.origin + index * self.voxel_size
    }

    /// World-space center of a voxel.
    #[inline]
    pub fn coord_to_world(&self, coord: VoxelCoord) -> Vector3<f64> {
        self.index_to_world(&coord.to_index())
    }

    /// Map a world-space position to continuous index space.
    #[inline]
    pub fn world_to_index(&self, world: &Vector3<f64>) -> Vector3<f64> {
        (world - self.origin) / self.voxel_size
    }

    /// Voxel containing `world` and the point's offset from that voxel's center.
    ///
    /// Rounds half-way positions up, so offsets lie in `[-0.5, 0.5)`. Returns
    /// `None` when the voxel coordinate does not fit in `i32`.
    pub fn world_to_voxel(&self, world: &Vector3<f64>) -> Option<(VoxelCoord, Vector3<f32>)> {
        let index = self.world_to_index(world);
        let coord = VoxelCoord::new(
            round_to_coord(index.x)?,
            round_to_coord(index.y)?,
            round_to_coord(index.z)?,
        );
        let offset = (index - coord.to_index()).cast::<f32>();
        Some((coord, offset))
    }

    /// Height parameters in the precision the kernels use.
    #[inline]
    pub(crate) fn height_params(&self) -> (f32, f32) {
        (self.voxel_size as f32, self.origin.z as f32)
    }
}

fn round_to_coord(index: f64) -> Option<i32> {
    let rounded = (index + 0.5).floor();
    (rounded >= i32::MIN as f64 && rounded <= i32::MAX as f64).then_some(rounded as i32)
}

/// World-space height of a stored point.
///
/// Evaluated in f32 as `origin_z + (k + offset_z) * voxel_size`, the same
/// expression the column-minimum kernel evaluates on the device.
#[inline]
pub fn point_world_z(transform: &CoordTransform, coord: VoxelCoord, offset: &Vector3<f32>) -> f32 {
    let (voxel_size, origin_z) = transform.height_params();
    origin_z + (coord.z as f32 + offset.z) * voxel_size
}
