//! Ground plane extraction from sparse point volumes.
//!
//! This library turns a sparse, tree-indexed point volume into a dense 2D
//! elevation map holding, for every horizontal column of voxels, the lowest
//! observed point height (or NaN when the column was never observed).
//!
//! # Architecture
//!
//! The extraction runs in three phases:
//! - Phase 1: Active-voxel bounding box and map allocation (host)
//! - Phase 2: Per-column minimum reduction (host or device)
//! - Phase 3: Materialization of the map with its world-space pose
//!
//! Two backends implement phase 2 with identical results:
//! - [`ground_plane_extraction_geometric`]: sequential host traversal
//! - [`ground_plane_extraction_geometric_device`]: staged upload and a
//!   parallel atomic-minimum CubeCL kernel on the runtime selected by the
//!   `wgpu` (default) or `cuda` feature
//!
//! # Usage
//!
//! ```ignore
//! use ground_plane::{ground_plane_extraction_geometric, Options, PointDataGrid};
//!
//! let options = Options { voxel_size: 0.5, ..Default::default() };
//! let grid = PointDataGrid::from_points(&points, &options)?;
//!
//! if let Some(ground) = ground_plane_extraction_geometric(Some(&grid))? {
//!     println!("{}x{} map at {:?}", ground.rows(), ground.cols(), ground.pose);
//! }
//! ```

pub mod error;
pub mod extraction;
pub mod map;
pub mod options;
pub mod runtime;
pub mod test_utils;
pub mod transform;
pub mod volume;

pub use error::GroundPlaneError;
pub use extraction::{
    ground_plane_extraction_geometric, ground_plane_extraction_geometric_device,
    CpuGroundPlaneExtractor, DeviceGroundPlaneExtractor, GroundPlaneExtractor,
};
pub use map::ElevationMap;
pub use options::Options;
pub use runtime::{is_device_available, DefaultRuntime};
pub use transform::{point_world_z, CoordTransform};
pub use volume::{
    CoordBBox, PointDataGrid, PointLeaf, PositionArray, PositionCodec, SparsePointVolume,
    VoxelCoord,
};
