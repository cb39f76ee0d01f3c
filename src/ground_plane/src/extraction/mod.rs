//! Ground plane extraction backends.
//!
//! - `cpu`: sequential traversal of the volume on the host
//! - `device`: staged upload and a parallel atomic-minimum CubeCL kernel
//!
//! Both backends produce the same map for the same volume: identical shape,
//! pose and observed cells, with heights evaluated by the same f32
//! expression. Device compilers may fuse that expression, so heights agree
//! to within a few ulps rather than bit for bit.

pub mod cpu;
pub mod device;
pub mod kernels;
pub mod staging;

pub use cpu::ground_plane_extraction_geometric;
pub use device::{
    ground_plane_extraction_geometric_device, DeviceGroundPlaneExtractor, DEFAULT_CUBE_DIM,
    MAX_CUBE_DIM,
};
pub use staging::{DeviceGrid, GridHandle, HostGrid};

use cubecl::prelude::Runtime;

use crate::error::GroundPlaneError;
use crate::map::ElevationMap;
use crate::volume::SparsePointVolume;

/// A backend that turns a point volume into an elevation map.
pub trait GroundPlaneExtractor {
    /// Returns `Ok(None)` when `grid` is missing or has no active voxels.
    fn extract_ground_plane<V: SparsePointVolume>(
        &self,
        grid: Option<&V>,
    ) -> Result<Option<ElevationMap>, GroundPlaneError>;
}

/// Host backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct CpuGroundPlaneExtractor;

impl GroundPlaneExtractor for CpuGroundPlaneExtractor {
    fn extract_ground_plane<V: SparsePointVolume>(
        &self,
        grid: Option<&V>,
    ) -> Result<Option<ElevationMap>, GroundPlaneError> {
        ground_plane_extraction_geometric(grid)
    }
}

impl<R: Runtime> GroundPlaneExtractor for DeviceGroundPlaneExtractor<R> {
    fn extract_ground_plane<V: SparsePointVolume>(
        &self,
        grid: Option<&V>,
    ) -> Result<Option<ElevationMap>, GroundPlaneError> {
        self.extract(grid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Options;
    use crate::runtime::is_device_available;
    use crate::test_utils::{
        lattice_ground_truth, make_lattice_cloud, make_plane, make_plane_with_clutter,
    };
    use crate::transform::CoordTransform;
    use crate::volume::{PointDataGrid, PositionCodec};
    use nalgebra::Vector3;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::{Rng, SeedableRng};
    use rand_distr::Normal;

    /// Cell tolerance between backends.
    const CROSS_BACKEND_EPSILON: f32 = 1e-4;

    macro_rules! require_device {
        () => {
            if !is_device_available() {
                eprintln!("Skipping test: no compute device available");
                return;
            }
        };
    }

    fn test_extractor() -> DeviceGroundPlaneExtractor {
        DeviceGroundPlaneExtractor::new().expect("Failed to create device extractor")
    }

    fn host_map(grid: &PointDataGrid) -> ElevationMap {
        ground_plane_extraction_geometric(Some(grid))
            .unwrap()
            .unwrap()
    }

    /// Shape, pose and every cell must match bit for bit.
    fn assert_maps_identical(a: &ElevationMap, b: &ElevationMap) {
        assert_eq!(a.map.shape(), b.map.shape(), "map shapes differ");
        assert_eq!(a.pose, b.pose, "map poses differ");
        for (i, (x, y)) in a.map.iter().zip(b.map.iter()).enumerate() {
            assert_eq!(x.to_bits(), y.to_bits(), "cell {i}: {x} vs {y}");
        }
    }

    /// Noisy sloped terrain with some scattered points above it.
    fn make_random_terrain(rng: &mut StdRng, num_points: usize) -> Vec<[f32; 3]> {
        let noise = Normal::new(0.0f32, 0.15).unwrap();
        (0..num_points)
            .map(|_| {
                let x: f32 = rng.gen_range(-12.0..12.0);
                let y: f32 = rng.gen_range(-8.0..8.0);
                let ground = 0.1 * x - 0.05 * y + rng.sample(noise);
                let z = if rng.gen_bool(0.2) {
                    ground + rng.gen_range(0.5..3.0)
                } else {
                    ground
                };
                [x, y, z]
            })
            .collect()
    }

    #[test]
    fn test_lattice_cross_backend() {
        require_device!();

        let grid = PointDataGrid::from_points(&make_lattice_cloud(), &Options::default()).unwrap();

        let cpu_map = host_map(&grid);
        let device_map = ground_plane_extraction_geometric_device(Some(&grid))
            .unwrap()
            .unwrap();

        // Lattice heights are exact in f32, so no tolerance is needed
        assert_maps_identical(&cpu_map, &device_map);
        assert!(device_map.equals(&lattice_ground_truth(), 0.0));
    }

    #[test]
    fn test_random_terrain_cross_backend() {
        require_device!();

        let extractor = test_extractor();
        let transforms = [
            CoordTransform::linear(0.5).unwrap(),
            CoordTransform::linear(0.2).unwrap(),
            CoordTransform::new(0.3, Vector3::new(1.7, -2.2, 0.4)).unwrap(),
        ];

        for (seed, transform) in transforms.into_iter().enumerate() {
            let mut rng = StdRng::seed_from_u64(seed as u64);
            let points = make_random_terrain(&mut rng, 5000);
            let grid =
                PointDataGrid::from_points_with_codec(&points, transform, PositionCodec::Float32)
                    .unwrap();

            let cpu_map = host_map(&grid);
            let device_map = extractor.extract(Some(&grid)).unwrap().unwrap();

            assert!(cpu_map.equals(&device_map, CROSS_BACKEND_EPSILON));
            assert_eq!(cpu_map.observed_count(), device_map.observed_count());
            assert!(cpu_map.observed_count() > 0);
        }
    }

    #[test]
    fn test_shuffled_ingestion_is_deterministic() {
        require_device!();

        let extractor = test_extractor();
        let mut rng = StdRng::seed_from_u64(7);
        let mut points = make_random_terrain(&mut rng, 3000);
        let options = Options {
            voxel_size: 0.25,
            ..Default::default()
        };

        let grid = PointDataGrid::from_points(&points, &options).unwrap();
        let cpu_ref = host_map(&grid);
        let device_ref = extractor.extract(Some(&grid)).unwrap().unwrap();

        for _ in 0..3 {
            points.shuffle(&mut rng);
            let grid = PointDataGrid::from_points(&points, &options).unwrap();

            let cpu_map = host_map(&grid);
            let device_map = extractor.extract(Some(&grid)).unwrap().unwrap();

            // Each backend is order-independent on its own
            assert_maps_identical(&cpu_ref, &cpu_map);
            assert_maps_identical(&device_ref, &device_map);
        }
    }

    #[test]
    fn test_plane_with_clutter() {
        require_device!();

        let options = Options {
            voxel_size: 0.5,
            ..Default::default()
        };
        let grid = PointDataGrid::from_points(
            &make_plane_with_clutter(3.0, 0.5, -1.25, 2.0),
            &options,
        )
        .unwrap();
        let ground = test_extractor().extract(Some(&grid)).unwrap().unwrap();

        assert_eq!(ground.rows(), 13);
        assert_eq!(ground.cols(), 13);
        assert_eq!(ground.observed_count(), 169);
        assert_eq!(ground.height_range(), Some((-1.25, -1.25)));
    }

    #[test]
    fn test_missing_and_empty_volume_device() {
        // Neither case touches the device
        assert!(
            ground_plane_extraction_geometric_device::<PointDataGrid>(None)
                .unwrap()
                .is_none()
        );

        let empty = PointDataGrid::from_points(&[], &Options::default()).unwrap();
        assert!(ground_plane_extraction_geometric_device(Some(&empty))
            .unwrap()
            .is_none());

        require_device!();
        assert!(test_extractor()
            .extract(Some(&empty))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_cube_dim_does_not_change_result() {
        require_device!();

        let grid = PointDataGrid::from_points(&make_lattice_cloud(), &Options::default()).unwrap();
        let reference = host_map(&grid);

        for cube_dim in [1, 7, 32, MAX_CUBE_DIM] {
            let extractor = test_extractor().with_cube_dim(cube_dim).unwrap();
            assert_eq!(extractor.cube_dim(), cube_dim);
            let ground = extractor.extract(Some(&grid)).unwrap().unwrap();
            assert_maps_identical(&reference, &ground);
        }
    }

    #[test]
    fn test_invalid_cube_dim() {
        require_device!();

        for cube_dim in [0, MAX_CUBE_DIM + 1] {
            let err = test_extractor().with_cube_dim(cube_dim).err().unwrap();
            assert!(matches!(err, GroundPlaneError::InvalidOptions(_)));
        }
    }

    #[test]
    fn test_extent_too_large_on_device() {
        require_device!();

        let points = [[-1.0e8, 0.0, 1.0], [1.0e8, 0.0, 2.0]];
        let grid = PointDataGrid::from_points(&points, &Options::default()).unwrap();

        let err = test_extractor().extract(Some(&grid)).unwrap_err();
        assert!(matches!(err, GroundPlaneError::CapacityExceeded(_)));
    }

    #[test]
    fn test_fixed_point_positions_fail_on_device() {
        require_device!();

        let transform = CoordTransform::linear(0.5).unwrap();
        let grid = PointDataGrid::from_points_with_codec(
            &make_lattice_cloud(),
            transform,
            PositionCodec::FixedPoint16,
        )
        .unwrap();

        let err = ground_plane_extraction_geometric_device(Some(&grid)).unwrap_err();
        assert!(matches!(
            err,
            GroundPlaneError::RepresentationMismatch {
                attribute: "P",
                expected: "vec3s",
                ..
            }
        ));

        // The host path decodes any codec
        let ground = host_map(&grid);
        assert_eq!(ground.rows(), 13);
        assert_eq!(ground.cols(), 21);
    }

    #[test]
    fn test_repeated_extraction_on_one_client() {
        require_device!();

        let extractor = test_extractor();
        let grid = PointDataGrid::from_points(&make_plane(1.0, 0.5, 0.75), &Options::default())
            .unwrap();

        let first = extractor.extract(Some(&grid)).unwrap().unwrap();
        for _ in 0..3 {
            let again = extractor.extract(Some(&grid)).unwrap().unwrap();
            assert_maps_identical(&first, &again);
        }
    }

    #[test]
    fn test_extractor_trait() {
        fn run<E: GroundPlaneExtractor>(extractor: &E, grid: &PointDataGrid) -> ElevationMap {
            extractor
                .extract_ground_plane(Some(grid))
                .unwrap()
                .unwrap()
        }

        let grid = PointDataGrid::from_points(&make_lattice_cloud(), &Options::default()).unwrap();
        let cpu_map = run(&CpuGroundPlaneExtractor, &grid);
        assert!(cpu_map.equals(&lattice_ground_truth(), 0.0));

        require_device!();
        let device_map = run(&test_extractor(), &grid);
        assert_maps_identical(&cpu_map, &device_map);
    }
}
