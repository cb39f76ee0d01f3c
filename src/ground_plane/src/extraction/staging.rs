//! Staging of a point volume for the device.
//!
//! [`GridHandle`] flattens the leaf tree into plain arrays (the host view)
//! and, once uploaded, holds the matching device handles (the device view).
//! Uploads are queued on the compute client and ordered before any kernel
//! launched on the same client afterwards.

use cubecl::prelude::*;
use cubecl::server::Handle;
use tracing::trace;

use crate::error::GroundPlaneError;
use crate::runtime::Client;
use crate::transform::CoordTransform;
use crate::volume::{PositionCodec, SparsePointVolume};

/// Name of the position attribute.
pub const POSITION_ATTRIBUTE: &str = "P";

// ============================================================================
// Host view
// ============================================================================

/// Flattened, device-compatible copy of a point volume.
#[derive(Debug, Clone)]
pub struct HostGrid {
    pub transform: CoordTransform,
    /// Active voxel coordinates `[x0, y0, z0, x1, ...]`.
    pub voxel_coords: Vec<i32>,
    /// Start of each voxel's points, followed by the total point count.
    pub voxel_point_offsets: Vec<u32>,
    /// Point offsets from their voxel center `[x0, y0, z0, x1, ...]`.
    pub positions: Vec<f32>,
}

impl HostGrid {
    /// Flatten `grid`. Positions must be stored as raw `vec3s`.
    pub fn from_volume<V: SparsePointVolume>(grid: &V) -> Result<Self, GroundPlaneError> {
        let num_voxels = grid.active_voxel_count();
        let num_points = grid.point_count();
        if num_points > u32::MAX as usize || num_voxels > u32::MAX as usize {
            return Err(GroundPlaneError::CapacityExceeded(format!(
                "{num_voxels} voxels and {num_points} points exceed 32-bit indexing"
            )));
        }

        let mut voxel_coords = Vec::with_capacity(num_voxels * 3);
        let mut voxel_point_offsets = Vec::with_capacity(num_voxels + 1);
        let mut positions = Vec::with_capacity(num_points * 3);

        for leaf in grid.leaves() {
            let raw = leaf.positions().as_float32().ok_or_else(|| {
                GroundPlaneError::RepresentationMismatch {
                    attribute: POSITION_ATTRIBUTE,
                    expected: PositionCodec::Float32.type_name(),
                    found: leaf.positions().codec().type_name(),
                }
            })?;

            for (coord, points) in leaf.iter_active() {
                voxel_coords.extend_from_slice(&[coord.x, coord.y, coord.z]);
                voxel_point_offsets.push((positions.len() / 3) as u32);
                for offset in &raw[points] {
                    positions.extend_from_slice(offset.as_slice());
                }
            }
        }
        voxel_point_offsets.push((positions.len() / 3) as u32);

        Ok(Self {
            transform: *grid.transform(),
            voxel_coords,
            voxel_point_offsets,
            positions,
        })
    }

    pub fn num_voxels(&self) -> usize {
        self.voxel_coords.len() / 3
    }

    pub fn num_points(&self) -> usize {
        self.positions.len() / 3
    }
}

// ============================================================================
// Device view
// ============================================================================

/// Device-resident buffers mirroring a [`HostGrid`].
#[derive(Clone)]
pub struct DeviceGrid {
    pub voxel_coords: Handle,
    pub voxel_point_offsets: Handle,
    pub positions: Handle,
    pub num_voxels: u32,
    pub num_points: u32,
}

/// A staged volume with linked host and device views.
pub struct GridHandle {
    host: Option<HostGrid>,
    device: Option<DeviceGrid>,
}

impl std::fmt::Debug for GridHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GridHandle")
            .field("host", &self.host)
            .field("uploaded", &self.device.is_some())
            .finish()
    }
}

impl GridHandle {
    /// Stage `grid` on the host. No device memory is touched yet.
    pub fn from_volume<V: SparsePointVolume>(grid: &V) -> Result<Self, GroundPlaneError> {
        let host = HostGrid::from_volume(grid)?;
        trace!(
            num_voxels = host.num_voxels(),
            num_points = host.num_points(),
            "Staged grid on host"
        );
        Ok(Self {
            host: Some(host),
            device: None,
        })
    }

    /// Host view, if staged.
    pub fn grid(&self) -> Option<&HostGrid> {
        self.host.as_ref()
    }

    /// Device view, present only after an upload.
    pub fn device_grid(&self) -> Option<&DeviceGrid> {
        self.device.as_ref()
    }

    /// Copy the host view into device memory owned by `client`.
    ///
    /// Returns without waiting for the copies.
    pub fn device_upload<R: Runtime>(&mut self, client: &Client<R>) -> Result<(), GroundPlaneError> {
        let host = self
            .host
            .as_ref()
            .ok_or(GroundPlaneError::GridUnavailable("host"))?;

        let voxel_coords = client.create(i32::as_bytes(&host.voxel_coords));
        let voxel_point_offsets = client.create(u32::as_bytes(&host.voxel_point_offsets));
        let positions = client.create(f32::as_bytes(&host.positions));

        let bytes = std::mem::size_of_val(host.voxel_coords.as_slice())
            + std::mem::size_of_val(host.voxel_point_offsets.as_slice())
            + std::mem::size_of_val(host.positions.as_slice());
        trace!(bytes, "Queued grid upload");

        self.device = Some(DeviceGrid {
            voxel_coords,
            voxel_point_offsets,
            positions,
            num_voxels: host.num_voxels() as u32,
            num_points: host.num_points() as u32,
        });
        Ok(())
    }
}
