//! GPU runtime selection for the device extractor.
//!
//! The backend is picked at build time: the `cuda` feature selects
//! [`cubecl::cuda::CudaRuntime`], otherwise the default `wgpu` feature selects
//! [`cubecl::wgpu::WgpuRuntime`].

use std::panic::AssertUnwindSafe;

use cubecl::client::ComputeClient;
use cubecl::prelude::*;

use crate::error::GroundPlaneError;

#[cfg(feature = "cuda")]
pub type DefaultRuntime = cubecl::cuda::CudaRuntime;

#[cfg(all(feature = "wgpu", not(feature = "cuda")))]
pub type DefaultRuntime = cubecl::wgpu::WgpuRuntime;

#[cfg(not(any(feature = "cuda", feature = "wgpu")))]
compile_error!("ground_plane needs a GPU backend: enable the `wgpu` or `cuda` feature");

/// Compute client of runtime `R`.
pub type Client<R> = ComputeClient<<R as Runtime>::Server>;

/// Create a compute client on `device`.
///
/// Runtimes panic when no adapter or driver is present; that panic is turned
/// into [`GroundPlaneError::Device`].
pub fn create_client<R: Runtime>(device: &R::Device) -> Result<Client<R>, GroundPlaneError> {
    std::panic::catch_unwind(AssertUnwindSafe(|| R::client(device))).map_err(|panic| {
        let reason = panic
            .downcast_ref::<String>()
            .map(String::as_str)
            .or_else(|| panic.downcast_ref::<&str>().copied())
            .unwrap_or("runtime panicked during initialization");
        GroundPlaneError::Device(reason.to_string())
    })
}

/// Check whether the default runtime can open its default device.
pub fn is_device_available() -> bool {
    create_client::<DefaultRuntime>(&Default::default()).is_ok()
}
