//! Leaf nodes of the point volume.
//!
//! A leaf covers an 8x8x8 block of voxels. Points of the block are stored
//! contiguously, ordered by voxel, and each voxel records the end offset of
//! its run of points. A voxel is active exactly when its run is non-empty.

use std::ops::Range;

use nalgebra::Vector3;

use super::types::{CoordBBox, VoxelCoord};

/// Log2 of the leaf edge length.
pub const LEAF_LOG2DIM: u32 = 3;
/// Leaf edge length in voxels.
pub const LEAF_DIM: i32 = 1 << LEAF_LOG2DIM;
/// Voxels per leaf.
pub const LEAF_SIZE: usize = 1 << (3 * LEAF_LOG2DIM);

const MASK_WORDS: usize = LEAF_SIZE / 64;
const FIXED_POINT_SCALE: f32 = u16::MAX as f32;

/// Storage encoding of the position attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PositionCodec {
    /// Uncompressed 32-bit float offsets.
    #[default]
    Float32,
    /// 16-bit fixed point offsets in `[-0.5, 0.5]`.
    FixedPoint16,
}

impl PositionCodec {
    /// Name of the stored value type.
    pub fn type_name(self) -> &'static str {
        match self {
            Self::Float32 => "vec3s",
            Self::FixedPoint16 => "fxpt16 vec3s",
        }
    }
}

/// Per-point offsets from the voxel center, in index units.
#[derive(Debug, Clone, PartialEq)]
pub enum PositionArray {
    Float32(Vec<Vector3<f32>>),
    FixedPoint16(Vec<[u16; 3]>),
}

impl PositionArray {
    pub fn with_codec(codec: PositionCodec) -> Self {
        match codec {
            PositionCodec::Float32 => Self::Float32(Vec::new()),
            PositionCodec::FixedPoint16 => Self::FixedPoint16(Vec::new()),
        }
    }

    pub fn codec(&self) -> PositionCodec {
        match self {
            Self::Float32(_) => PositionCodec::Float32,
            Self::FixedPoint16(_) => PositionCodec::FixedPoint16,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Float32(v) => v.len(),
            Self::FixedPoint16(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decoded offset of point `index`.
    #[inline]
    pub fn get(&self, index: usize) -> Vector3<f32> {
        match self {
            Self::Float32(v) => v[index],
            Self::FixedPoint16(v) => {
                let q = v[index];
                Vector3::new(decode_fixed(q[0]), decode_fixed(q[1]), decode_fixed(q[2]))
            }
        }
    }

    /// Raw offsets, available only for the uncompressed codec.
    pub fn as_float32(&self) -> Option<&[Vector3<f32>]> {
        match self {
            Self::Float32(v) => Some(v),
            Self::FixedPoint16(_) => None,
        }
    }

    fn push(&mut self, offset: Vector3<f32>) {
        match self {
            Self::Float32(v) => v.push(offset),
            Self::FixedPoint16(v) => v.push([
                encode_fixed(offset.x),
                encode_fixed(offset.y),
                encode_fixed(offset.z),
            ]),
        }
    }
}

#[inline]
fn encode_fixed(v: f32) -> u16 {
    ((v + 0.5).clamp(0.0, 1.0) * FIXED_POINT_SCALE).round() as u16
}

#[inline]
fn decode_fixed(q: u16) -> f32 {
    q as f32 / FIXED_POINT_SCALE - 0.5
}

/// An 8x8x8 block of voxels and the points they hold.
#[derive(Debug, Clone)]
pub struct PointLeaf {
    origin: VoxelCoord,
    end_offsets: Box<[u32]>,
    value_mask: [u64; MASK_WORDS],
    positions: PositionArray,
}

impl PointLeaf {
    /// Origin of the leaf containing `coord` (each component rounded down to
    /// a multiple of [`LEAF_DIM`]).
    #[inline]
    pub fn origin_of(coord: VoxelCoord) -> VoxelCoord {
        VoxelCoord::new(
            coord.x & !(LEAF_DIM - 1),
            coord.y & !(LEAF_DIM - 1),
            coord.z & !(LEAF_DIM - 1),
        )
    }

    /// Linear offset of `coord` within its leaf.
    #[inline]
    pub fn coord_to_offset(coord: VoxelCoord) -> usize {
        let m = LEAF_DIM - 1;
        (((coord.x & m) as usize) << (2 * LEAF_LOG2DIM))
            | (((coord.y & m) as usize) << LEAF_LOG2DIM)
            | ((coord.z & m) as usize)
    }

    /// Build a leaf from `(voxel offset, position)` pairs.
    ///
    /// Points keep their relative order within each voxel.
    pub(crate) fn from_points(
        origin: VoxelCoord,
        codec: PositionCodec,
        mut points: Vec<(usize, Vector3<f32>)>,
    ) -> Self {
        points.sort_by_key(|&(offset, _)| offset);

        let mut counts = vec![0u32; LEAF_SIZE];
        let mut positions = PositionArray::with_codec(codec);
        for &(offset, position) in &points {
            counts[offset] += 1;
            positions.push(position);
        }

        let mut value_mask = [0u64; MASK_WORDS];
        let mut end = 0u32;
        let end_offsets = counts
            .iter()
            .enumerate()
            .map(|(n, &count)| {
                if count > 0 {
                    value_mask[n >> 6] |= 1 << (n & 63);
                }
                end += count;
                end
            })
            .collect();

        Self {
            origin,
            end_offsets,
            value_mask,
            positions,
        }
    }

    pub fn origin(&self) -> VoxelCoord {
        self.origin
    }

    /// Coordinate of the voxel at linear offset `n`.
    #[inline]
    pub fn offset_to_coord(&self, n: usize) -> VoxelCoord {
        let m = LEAF_SIZE - 1;
        let n = n & m;
        VoxelCoord::new(
            self.origin.x + (n >> (2 * LEAF_LOG2DIM)) as i32,
            self.origin.y + ((n >> LEAF_LOG2DIM) & (LEAF_DIM as usize - 1)) as i32,
            self.origin.z + (n & (LEAF_DIM as usize - 1)) as i32,
        )
    }

    #[inline]
    pub fn is_value_on(&self, n: usize) -> bool {
        self.value_mask[n >> 6] & (1 << (n & 63)) != 0
    }

    pub fn active_voxel_count(&self) -> usize {
        self.value_mask.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn point_count(&self) -> usize {
        self.positions.len()
    }

    /// Indices into the position array of the points in voxel `n`.
    #[inline]
    pub fn point_range(&self, n: usize) -> Range<usize> {
        let start = if n == 0 {
            0
        } else {
            self.end_offsets[n - 1] as usize
        };
        start..self.end_offsets[n] as usize
    }

    /// Number of points stored in `coord`, which must lie in this leaf.
    pub fn points_in_voxel(&self, coord: VoxelCoord) -> usize {
        self.point_range(Self::coord_to_offset(coord)).len()
    }

    /// Active voxels with their point index ranges.
    pub fn iter_active(&self) -> impl Iterator<Item = (VoxelCoord, Range<usize>)> + '_ {
        (0..LEAF_SIZE)
            .filter(move |&n| self.is_value_on(n))
            .map(move |n| (self.offset_to_coord(n), self.point_range(n)))
    }

    pub fn positions(&self) -> &PositionArray {
        &self.positions
    }

    /// Decoded offset of point `index` from its voxel center.
    #[inline]
    pub fn position(&self, index: usize) -> Vector3<f32> {
        self.positions.get(index)
    }

    /// Bounding box of the active voxels, or `None` if there are none.
    pub fn active_bbox(&self) -> Option<CoordBBox> {
        CoordBBox::from_coords(self.iter_active().map(|(coord, _)| coord))
    }
}
