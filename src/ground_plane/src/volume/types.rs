//! Integer voxel coordinates and bounding boxes.

use nalgebra::Vector3;

/// Integer voxel coordinate in index space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoxelCoord {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl VoxelCoord {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The coordinate as a continuous index-space position.
    #[inline]
    pub fn to_index(self) -> Vector3<f64> {
        Vector3::new(self.x as f64, self.y as f64, self.z as f64)
    }

    /// Component-wise minimum.
    #[inline]
    pub fn min_components(self, other: Self) -> Self {
        Self::new(
            self.x.min(other.x),
            self.y.min(other.y),
            self.z.min(other.z),
        )
    }

    /// Component-wise maximum.
    #[inline]
    pub fn max_components(self, other: Self) -> Self {
        Self::new(
            self.x.max(other.x),
            self.y.max(other.y),
            self.z.max(other.z),
        )
    }
}

/// Inclusive axis-aligned box of voxel coordinates.
///
/// Never empty: both corners are themselves members of the box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordBBox {
    min: VoxelCoord,
    max: VoxelCoord,
}

impl CoordBBox {
    /// Box spanned by two corners, in any order.
    pub fn new(a: VoxelCoord, b: VoxelCoord) -> Self {
        Self {
            min: a.min_components(b),
            max: a.max_components(b),
        }
    }

    /// Box containing a single voxel.
    pub fn from_coord(coord: VoxelCoord) -> Self {
        Self {
            min: coord,
            max: coord,
        }
    }

    /// Tightest box around `coords`, or `None` if there are none.
    pub fn from_coords<I>(coords: I) -> Option<Self>
    where
        I: IntoIterator<Item = VoxelCoord>,
    {
        let mut coords = coords.into_iter();
        let mut bbox = Self::from_coord(coords.next()?);
        for coord in coords {
            bbox.expand(coord);
        }
        Some(bbox)
    }

    pub fn min(&self) -> VoxelCoord {
        self.min
    }

    pub fn max(&self) -> VoxelCoord {
        self.max
    }

    /// Number of voxels along each axis (`max - min + 1`).
    ///
    /// A full `i32` span has 2^32 voxels, so the extent is reported as `u64`.
    pub fn dim(&self) -> Vector3<u64> {
        let extent = |lo: i32, hi: i32| (hi as i64 - lo as i64 + 1) as u64;
        Vector3::new(
            extent(self.min.x, self.max.x),
            extent(self.min.y, self.max.y),
            extent(self.min.z, self.max.z),
        )
    }

    /// Grow the box to include `coord`.
    pub fn expand(&mut self, coord: VoxelCoord) {
        self.min = self.min.min_components(coord);
        self.max = self.max.max_components(coord);
    }

    /// Smallest box containing both boxes.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: self.min.min_components(other.min),
            max: self.max.max_components(other.max),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox_from_coords() {
        assert!(CoordBBox::from_coords(std::iter::empty()).is_none());

        let bbox = CoordBBox::from_coords([
            VoxelCoord::new(3, -2, 7),
            VoxelCoord::new(-1, 5, 7),
            VoxelCoord::new(0, 0, 9),
        ])
        .unwrap();

        assert_eq!(bbox.min(), VoxelCoord::new(-1, -2, 7));
        assert_eq!(bbox.max(), VoxelCoord::new(3, 5, 9));
        assert_eq!(bbox.dim(), Vector3::new(5, 8, 3));
    }

    #[test]
    fn test_bbox_single_voxel() {
        let bbox = CoordBBox::from_coord(VoxelCoord::new(4, 4, 4));
        assert_eq!(bbox.dim(), Vector3::new(1, 1, 1));
    }

    #[test]
    fn test_bbox_dim_full_range() {
        let bbox = CoordBBox::new(
            VoxelCoord::new(i32::MIN, 0, -1),
            VoxelCoord::new(i32::MAX, 0, 1),
        );
        assert_eq!(bbox.dim(), Vector3::new(1u64 << 32, 1, 3));
    }

    #[test]
    fn test_bbox_union_and_corners() {
        let a = CoordBBox::new(VoxelCoord::new(2, 2, 2), VoxelCoord::new(0, 0, 0));
        assert_eq!(a.min(), VoxelCoord::new(0, 0, 0));

        let b = CoordBBox::from_coord(VoxelCoord::new(-3, 1, 10));
        let u = a.union(&b);
        assert_eq!(u.min(), VoxelCoord::new(-3, 0, 0));
        assert_eq!(u.max(), VoxelCoord::new(2, 2, 10));
    }
}
