//! Point data grid: a sparse map of leaves with a transform.

use std::collections::HashMap;

use anyhow::{Context, Result};
use nalgebra::Vector3;
use rayon::prelude::*;
use tracing::debug;

use super::leaf::{PointLeaf, PositionCodec};
use super::types::VoxelCoord;
use super::SparsePointVolume;
use crate::error::GroundPlaneError;
use crate::options::Options;
use crate::transform::CoordTransform;

/// Sparse point volume keyed by leaf origin.
#[derive(Debug, Clone)]
pub struct PointDataGrid {
    transform: CoordTransform,
    leaves: HashMap<VoxelCoord, PointLeaf>,
}

impl PointDataGrid {
    /// Bucket a world-space point cloud into a grid with `options.voxel_size`.
    pub fn from_points(points: &[[f32; 3]], options: &Options) -> Result<Self> {
        let transform = options.transform().context("Invalid grid options")?;
        Self::from_points_with_codec(points, transform, PositionCodec::Float32)
    }

    /// Bucket a world-space point cloud, storing positions with `codec`.
    ///
    /// Fails with [`GroundPlaneError::InvalidPoint`] for the first point that
    /// is not finite or whose voxel coordinate does not fit in `i32`.
    pub fn from_points_with_codec(
        points: &[[f32; 3]],
        transform: CoordTransform,
        codec: PositionCodec,
    ) -> Result<Self> {
        let mut buckets: HashMap<VoxelCoord, Vec<(usize, Vector3<f32>)>> = HashMap::new();

        for (index, p) in points.iter().enumerate() {
            if !p.iter().all(|v| v.is_finite()) {
                return Err(GroundPlaneError::InvalidPoint { index }.into());
            }
            let world = Vector3::new(p[0] as f64, p[1] as f64, p[2] as f64);
            let (coord, offset) = transform
                .world_to_voxel(&world)
                .ok_or(GroundPlaneError::InvalidPoint { index })?;
            buckets
                .entry(PointLeaf::origin_of(coord))
                .or_default()
                .push((PointLeaf::coord_to_offset(coord), offset));
        }

        let leaves: HashMap<_, _> = buckets
            .into_par_iter()
            .map(|(origin, points)| (origin, PointLeaf::from_points(origin, codec, points)))
            .collect();

        debug!(
            num_points = points.len(),
            num_leaves = leaves.len(),
            codec = codec.type_name(),
            "Built point data grid"
        );

        Ok(Self { transform, leaves })
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    /// Leaf with the given origin.
    pub fn leaf(&self, origin: VoxelCoord) -> Option<&PointLeaf> {
        self.leaves.get(&origin)
    }

    /// Number of points stored in the voxel at `coord`.
    pub fn points_in_voxel(&self, coord: VoxelCoord) -> usize {
        self.leaf(PointLeaf::origin_of(coord))
            .map_or(0, |leaf| leaf.points_in_voxel(coord))
    }
}

impl SparsePointVolume for PointDataGrid {
    fn transform(&self) -> &CoordTransform {
        &self.transform
    }

    fn leaves<'a>(&'a self) -> impl Iterator<Item = &'a PointLeaf> + 'a {
        self.leaves.values()
    }
}
