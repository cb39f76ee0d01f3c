//! Sparse point volumes.
//!
//! Points are bucketed into voxels, voxels into 8x8x8 leaves, and leaves are
//! looked up sparsely by origin. Extraction only needs read access through
//! [`SparsePointVolume`], so any leaf-based container can be plugged in.

mod grid;
mod leaf;
mod types;

pub use grid::PointDataGrid;
pub use leaf::{PointLeaf, PositionArray, PositionCodec, LEAF_DIM, LEAF_LOG2DIM, LEAF_SIZE};
pub use types::{CoordBBox, VoxelCoord};

use crate::transform::CoordTransform;

/// Read access to a sparse, leaf-organized point volume.
pub trait SparsePointVolume {
    /// Index-to-world transform of the volume.
    fn transform(&self) -> &CoordTransform;

    /// All leaves, in no particular order.
    fn leaves<'a>(&'a self) -> impl Iterator<Item = &'a PointLeaf> + 'a;

    fn active_voxel_count(&self) -> usize {
        self.leaves().map(PointLeaf::active_voxel_count).sum()
    }

    fn point_count(&self) -> usize {
        self.leaves().map(PointLeaf::point_count).sum()
    }

    /// True when no voxel is active.
    fn is_empty(&self) -> bool {
        self.leaves().all(|leaf| leaf.active_voxel_count() == 0)
    }

    /// Bounding box of all active voxels, or `None` for an empty volume.
    fn eval_active_voxel_bbox(&self) -> Option<CoordBBox> {
        self.leaves()
            .filter_map(PointLeaf::active_bbox)
            .reduce(|a, b| a.union(&b))
    }
}
