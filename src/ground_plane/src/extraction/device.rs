//! Device ground plane extraction.
//!
//! The volume is staged and uploaded through a CubeCL compute client, one
//! kernel unit reduces each active voxel into its map cell with an atomic
//! minimum, and reading the map back is the single synchronization point.

use cubecl::prelude::*;
use tracing::debug;

use super::kernels::{column_min_kernel, key_to_height, UNOBSERVED};
use super::staging::GridHandle;
use crate::error::GroundPlaneError;
use crate::map::ElevationMap;
use crate::runtime::{create_client, Client, DefaultRuntime};
use crate::volume::SparsePointVolume;

/// Units per cube used for the column-minimum kernel.
pub const DEFAULT_CUBE_DIM: u32 = 256;

/// Largest accepted number of units per cube.
pub const MAX_CUBE_DIM: u32 = 1024;

/// Lowest point height of every voxel column of `grid`, computed on the
/// default device of [`DefaultRuntime`].
///
/// Returns `Ok(None)` when `grid` is missing or has no active voxels, and
/// otherwise the same map as [`super::ground_plane_extraction_geometric`].
pub fn ground_plane_extraction_geometric_device<V: SparsePointVolume>(
    grid: Option<&V>,
) -> Result<Option<ElevationMap>, GroundPlaneError> {
    let Some(grid) = grid else {
        return Ok(None);
    };
    if grid.is_empty() {
        return Ok(None);
    }
    DeviceGroundPlaneExtractor::<DefaultRuntime>::new()?.extract(Some(grid))
}

/// Ground plane extractor bound to a compute client.
pub struct DeviceGroundPlaneExtractor<R: Runtime = DefaultRuntime> {
    client: Client<R>,
    cube_dim: u32,
}

impl<R: Runtime> DeviceGroundPlaneExtractor<R> {
    /// Create an extractor on the runtime's default device.
    pub fn new() -> Result<Self, GroundPlaneError>
    where
        R::Device: Default,
    {
        Self::with_device(&R::Device::default())
    }

    /// Create an extractor on a specific device.
    pub fn with_device(device: &R::Device) -> Result<Self, GroundPlaneError> {
        Ok(Self {
            client: create_client::<R>(device)?,
            cube_dim: DEFAULT_CUBE_DIM,
        })
    }

    /// Override the number of units per cube.
    pub fn with_cube_dim(mut self, cube_dim: u32) -> Result<Self, GroundPlaneError> {
        if cube_dim == 0 || cube_dim > MAX_CUBE_DIM {
            return Err(GroundPlaneError::InvalidOptions(format!(
                "cube dim must be in 1..={MAX_CUBE_DIM}, got {cube_dim}"
            )));
        }
        self.cube_dim = cube_dim;
        Ok(self)
    }

    pub fn cube_dim(&self) -> u32 {
        self.cube_dim
    }

    /// Get the underlying compute client.
    pub fn client(&self) -> &Client<R> {
        &self.client
    }

    /// Extract the ground plane of `grid` on this extractor's device.
    pub fn extract<V: SparsePointVolume>(
        &self,
        grid: Option<&V>,
    ) -> Result<Option<ElevationMap>, GroundPlaneError> {
        let Some(grid) = grid else {
            return Ok(None);
        };
        let Some(bbox) = grid.eval_active_voxel_bbox() else {
            return Ok(None);
        };

        // Shape and pose come from the host, exactly as on the host path
        let mut result = ElevationMap::new(&bbox, grid.transform())?;
        let (rows, cols) = (result.rows(), result.cols());
        let num_cells = rows * cols;

        let mut handle = GridHandle::from_volume(grid)?;
        handle.device_upload::<R>(&self.client)?;

        let host_grid = handle
            .grid()
            .ok_or(GroundPlaneError::GridUnavailable("host"))?;
        let device_grid = handle
            .device_grid()
            .ok_or(GroundPlaneError::GridUnavailable("device"))?;

        let output = self.client.create(u32::as_bytes(&vec![UNOBSERVED; num_cells]));

        let (voxel_size, origin_z) = host_grid.transform.height_params();
        let min = bbox.min();
        let num_voxels = device_grid.num_voxels;
        let cube_count = num_voxels.div_ceil(self.cube_dim);

        debug!(
            rows,
            cols,
            num_voxels,
            cube_count,
            cube_dim = self.cube_dim,
            "Launching ground plane kernel"
        );

        unsafe {
            column_min_kernel::launch_unchecked::<R>(
                &self.client,
                CubeCount::Static(cube_count, 1, 1),
                CubeDim::new(self.cube_dim, 1, 1),
                ArrayArg::from_raw_parts::<i32>(
                    &device_grid.voxel_coords,
                    host_grid.voxel_coords.len(),
                    1,
                ),
                ArrayArg::from_raw_parts::<u32>(
                    &device_grid.voxel_point_offsets,
                    host_grid.voxel_point_offsets.len(),
                    1,
                ),
                ArrayArg::from_raw_parts::<f32>(
                    &device_grid.positions,
                    host_grid.positions.len(),
                    1,
                ),
                ScalarArg::new(voxel_size),
                ScalarArg::new(origin_z),
                ScalarArg::new(min.x),
                ScalarArg::new(min.y),
                ScalarArg::new(cols as u32),
                ScalarArg::new(num_voxels),
                ArrayArg::from_raw_parts::<u32>(&output, num_cells, 1),
            );
        }

        let bytes = self.client.read_one(output);
        for (i, &key) in u32::from_bytes(&bytes).iter().enumerate() {
            if let Some(z) = key_to_height(key) {
                result.map[(i / cols, i % cols)] = z;
            }
        }

        debug!(
            observed = result.observed_count(),
            "Extracted ground plane on device"
        );

        Ok(Some(result))
    }
}
