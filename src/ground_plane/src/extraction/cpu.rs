//! Host ground plane extraction.

use tracing::debug;

use crate::error::GroundPlaneError;
use crate::map::{ColumnMinimum, ElevationMap};
use crate::transform::point_world_z;
use crate::volume::SparsePointVolume;

/// Lowest point height of every voxel column of `grid`.
///
/// Returns `Ok(None)` when `grid` is missing or has no active voxels, and
/// [`GroundPlaneError::CapacityExceeded`] when the XY extent is too large to
/// allocate as a map.
pub fn ground_plane_extraction_geometric<V: SparsePointVolume>(
    grid: Option<&V>,
) -> Result<Option<ElevationMap>, GroundPlaneError> {
    let Some(grid) = grid else {
        return Ok(None);
    };
    let Some(bbox) = grid.eval_active_voxel_bbox() else {
        return Ok(None);
    };
    let transform = grid.transform();

    let mut result = ElevationMap::new(&bbox, transform)?;
    let mut columns = ColumnMinimum::new(result.rows(), result.cols());
    let min = bbox.min();

    for leaf in grid.leaves() {
        let positions = leaf.positions();
        for (coord, points) in leaf.iter_active() {
            let row = (coord.y - min.y) as usize;
            let col = (coord.x - min.x) as usize;
            for p in points {
                let z = point_world_z(transform, coord, &positions.get(p));
                columns.update(row, col, z);
            }
        }
    }

    columns.write_into(&mut result);

    debug!(
        rows = result.rows(),
        cols = result.cols(),
        observed = result.observed_count(),
        "Extracted ground plane on host"
    );

    Ok(Some(result))
}
