//! Device kernels for ground plane extraction.
//!
//! Heights are reduced as order-preserving u32 keys so that an integer
//! atomic minimum yields the float minimum. [`UNOBSERVED`] sits above every
//! key a finite height can produce and marks cells nobody wrote to.

use cubecl::prelude::*;

/// Initial value of every output cell.
pub const UNOBSERVED: u32 = u32::MAX;

const SIGN_BIT: u32 = 0x8000_0000;

/// Map a height to a key whose unsigned order matches IEEE total order.
#[inline]
pub fn height_to_key(z: f32) -> u32 {
    let bits = z.to_bits();
    if bits & SIGN_BIT != 0 {
        !bits
    } else {
        bits | SIGN_BIT
    }
}

/// Inverse of [`height_to_key`]; `None` for [`UNOBSERVED`].
#[inline]
pub fn key_to_height(key: u32) -> Option<f32> {
    if key == UNOBSERVED {
        return None;
    }
    let bits = if key & SIGN_BIT != 0 {
        key & !SIGN_BIT
    } else {
        !key
    };
    Some(f32::from_bits(bits))
}

/// Key of `height` inside a kernel; mirrors [`height_to_key`].
#[cube]
fn height_key(height: f32) -> u32 {
    let bits = u32::reinterpret(height);
    let mut key = 0u32;
    if bits >= 2147483648u32 {
        key = 4294967295u32 - bits;
    } else {
        key = bits + 2147483648u32;
    }
    key
}

/// Reduce one active voxel into its map cell.
///
/// One unit per voxel: the unit folds its points into a local minimum key and
/// publishes it with a single atomic minimum. Heights follow
/// [`crate::transform::point_world_z`].
///
/// # Arguments
/// * `voxel_coords` - Active voxel coordinates [V * 3]
/// * `voxel_point_offsets` - Point range start of each voxel plus the end [V + 1]
/// * `positions` - Point offsets from their voxel center [P * 3]
/// * `output` - Row-major map of height keys, filled with `UNOBSERVED` [rows * cols]
#[cube(launch_unchecked)]
#[allow(clippy::too_many_arguments)]
pub fn column_min_kernel(
    voxel_coords: &Array<i32>,
    voxel_point_offsets: &Array<u32>,
    positions: &Array<f32>,
    voxel_size: f32,
    origin_z: f32,
    bbox_min_x: i32,
    bbox_min_y: i32,
    map_cols: u32,
    num_voxels: u32,
    output: &mut Array<Atomic<u32>>,
) {
    let idx = ABSOLUTE_POS;
    if idx >= num_voxels {
        terminate!();
    }

    let base = idx * 3;
    let x = voxel_coords[base];
    let y = voxel_coords[base + 1];
    let index_z = f32::cast_from(voxel_coords[base + 2]);
    let start = voxel_point_offsets[idx];
    let end = voxel_point_offsets[idx + 1];

    let mut lowest = 4294967295u32;
    for p in start..end {
        let height = origin_z + (index_z + positions[p * 3 + 2]) * voxel_size;
        let key = height_key(height);
        if key < lowest {
            lowest = key;
        }
    }

    let row = u32::cast_from(y - bbox_min_y);
    let col = u32::cast_from(x - bbox_min_x);
    Atomic::min(&output[row * map_cols + col], lowest);
}
