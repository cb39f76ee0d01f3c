//! Dense elevation maps.

use nalgebra::{DMatrix, Vector2};

use crate::error::GroundPlaneError;
use crate::transform::CoordTransform;
use crate::volume::CoordBBox;

/// Largest number of cells a map may hold.
pub const MAX_MAP_CELLS: u64 = 1 << 28;

/// Dense 2D grid of per-column minimum heights.
///
/// Row `r` and column `c` correspond to voxel `(min.x + c, min.y + r)` of the
/// bounding box the map was built from. `pose` is the world-space XY of that
/// box's minimum corner voxel. Unobserved columns hold NaN.
#[derive(Debug, Clone)]
pub struct ElevationMap {
    pub map: DMatrix<f32>,
    pub pose: Vector2<f32>,
}

impl ElevationMap {
    /// NaN-filled map covering the XY extent of `bbox`.
    ///
    /// Fails with [`GroundPlaneError::CapacityExceeded`] when the extent has
    /// more than [`MAX_MAP_CELLS`] cells.
    pub fn new(bbox: &CoordBBox, transform: &CoordTransform) -> Result<Self, GroundPlaneError> {
        let dim = bbox.dim();
        match dim.x.checked_mul(dim.y) {
            Some(cells) if cells <= MAX_MAP_CELLS => {}
            _ => {
                return Err(GroundPlaneError::CapacityExceeded(format!(
                    "{}x{} map cells exceed the limit of {MAX_MAP_CELLS}",
                    dim.y, dim.x
                )))
            }
        }
        let origin = transform.coord_to_world(bbox.min());

        Ok(Self {
            map: DMatrix::from_element(dim.y as usize, dim.x as usize, f32::NAN),
            pose: Vector2::new(origin.x as f32, origin.y as f32),
        })
    }

    pub fn rows(&self) -> usize {
        self.map.nrows()
    }

    pub fn cols(&self) -> usize {
        self.map.ncols()
    }

    /// Height of a cell, or `None` if it is out of range or unobserved.
    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        self.map.get((row, col)).copied().filter(|z| !z.is_nan())
    }

    /// Number of observed cells.
    pub fn observed_count(&self) -> usize {
        self.map.iter().filter(|z| !z.is_nan()).count()
    }

    /// Lowest and highest observed heights.
    pub fn height_range(&self) -> Option<(f32, f32)> {
        self.map
            .iter()
            .filter(|z| !z.is_nan())
            .fold(None, |range, &z| match range {
                None => Some((z, z)),
                Some((lo, hi)) => Some((lo.min(z), hi.max(z))),
            })
    }

    /// Compare two maps cell by cell.
    ///
    /// Shapes and poses must match exactly. Cells must either both be NaN or
    /// differ by at most `epsilon`.
    pub fn equals(&self, other: &Self, epsilon: f32) -> bool {
        self.map.shape() == other.map.shape()
            && self.pose == other.pose
            && self.map.iter().zip(other.map.iter()).all(|(a, b)| {
                (a.is_nan() && b.is_nan()) || (!a.is_nan() && !b.is_nan() && (a - b).abs() <= epsilon)
            })
    }
}

/// Running per-column minimum with explicit presence.
///
/// Ties and signed zeros resolve by IEEE total order, so the result does not
/// depend on the order updates arrive in.
#[derive(Debug, Clone)]
pub(crate) struct ColumnMinimum {
    cols: usize,
    cells: Vec<Option<f32>>,
}

impl ColumnMinimum {
    pub(crate) fn new(rows: usize, cols: usize) -> Self {
        Self {
            cols,
            cells: vec![None; rows * cols],
        }
    }

    #[inline]
    pub(crate) fn update(&mut self, row: usize, col: usize, z: f32) {
        let cell = &mut self.cells[row * self.cols + col];
        match *cell {
            Some(lowest) if lowest.total_cmp(&z).is_le() => {}
            _ => *cell = Some(z),
        }
    }

    /// Write every observed cell into `map`; unobserved cells are untouched.
    pub(crate) fn write_into(&self, map: &mut ElevationMap) {
        for (i, cell) in self.cells.iter().enumerate() {
            if let Some(z) = cell {
                map.map[(i / self.cols, i % self.cols)] = *z;
            }
        }
    }
}
