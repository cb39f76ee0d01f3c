//! Test utilities for generating synthetic point clouds.

use nalgebra::{DMatrix, Vector2};

use crate::map::ElevationMap;

/// Lattice cloud over integer `x` in `[-5, 5]`, `y` in `[-3, 3]`, `z` in
/// `[1, 9]`, where each point sits at height `(x + y) * z`.
pub fn make_lattice_cloud() -> Vec<[f32; 3]> {
    let mut points = Vec::with_capacity(11 * 7 * 9);
    for x in -5..=5 {
        for y in -3..=3 {
            for z in 1..=9 {
                points.push([x as f32, y as f32, ((x + y) * z) as f32]);
            }
        }
    }
    points
}

/// Expected ground plane of [`make_lattice_cloud`] at a voxel size of 0.5.
///
/// Lattice points land on every other voxel, so only even rows and columns
/// are observed. The lowest height of column `(x, y)` is `x + y` when that is
/// non-negative and `9 * (x + y)` otherwise.
pub fn lattice_ground_truth() -> ElevationMap {
    let mut map = DMatrix::from_element(13, 21, f32::NAN);
    for x in -5i32..=5 {
        for y in -3i32..=3 {
            let s = x + y;
            let lowest = if s >= 0 { s } else { 9 * s };
            // Row 0 is the minimum Y, so the pose is the (-5, -3) corner
            let row = ((y + 3) * 2) as usize;
            let col = ((x + 5) * 2) as usize;
            map[(row, col)] = lowest as f32;
        }
    }
    ElevationMap {
        map,
        pose: Vector2::new(-5.0, -3.0),
    }
}

/// Flat plane of points at height `z` on a square grid around the origin.
pub fn make_plane(half_extent: f32, spacing: f32, z: f32) -> Vec<[f32; 3]> {
    let steps = (2.0 * half_extent / spacing).round() as i32;
    let mut points = Vec::new();
    for i in 0..=steps {
        for j in 0..=steps {
            let x = -half_extent + i as f32 * spacing;
            let y = -half_extent + j as f32 * spacing;
            points.push([x, y, z]);
        }
    }
    points
}

/// Plane plus a column of obstacle points stacked above each plane point.
pub fn make_plane_with_clutter(
    half_extent: f32,
    spacing: f32,
    z: f32,
    clutter_height: f32,
) -> Vec<[f32; 3]> {
    let mut points = make_plane(half_extent, spacing, z);
    let clutter: Vec<_> = points
        .iter()
        .map(|p| [p[0], p[1], p[2] + clutter_height])
        .collect();
    points.extend(clutter);
    points
}
