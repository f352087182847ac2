//! Compile-time backend selection for the binaries. Tests pick `NdArray` directly.

use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;

#[cfg(feature = "ndarray")]
pub type MainBackend = burn::backend::NdArray<f32, i32>;
#[cfg(feature = "ndarray")]
pub const BACKEND_NAME: &str = "ndarray";

#[cfg(any(feature = "tch-cpu", feature = "tch-gpu"))]
pub type MainBackend = burn::backend::libtorch::LibTorch<f32, i32>;
#[cfg(feature = "tch-cpu")]
pub const BACKEND_NAME: &str = "libtorch (cpu)";
#[cfg(feature = "tch-gpu")]
pub const BACKEND_NAME: &str = "libtorch (gpu)";

#[cfg(feature = "wgpu")]
pub type MainBackend = burn::backend::wgpu::Wgpu<f32, i32>;
#[cfg(feature = "wgpu")]
pub const BACKEND_NAME: &str = "wgpu";

#[cfg(feature = "cuda")]
pub type MainBackend = burn::backend::Cuda<f32, i32>;
#[cfg(feature = "cuda")]
pub const BACKEND_NAME: &str = "cuda";

pub trait MainDevice: Backend {
    fn main_device() -> <Self as Backend>::Device {
        Default::default()
    }
}

#[cfg(any(
    feature = "ndarray",
    feature = "tch-cpu",
    feature = "wgpu",
    feature = "cuda"
))]
impl MainDevice for MainBackend {}
#[cfg(all(feature = "tch-gpu", not(target_os = "macos")))]
impl MainDevice for MainBackend {
    fn main_device() -> <Self as Backend>::Device {
        burn::backend::libtorch::LibTorchDevice::Cuda(0)
    }
}
#[cfg(all(feature = "tch-gpu", target_os = "macos"))]
impl MainDevice for MainBackend {
    fn main_device() -> <Self as Backend>::Device {
        burn::backend::libtorch::LibTorchDevice::Mps
    }
}

pub type MainAutoBackend = burn::backend::Autodiff<MainBackend>;
impl MainDevice for MainAutoBackend {
    fn main_device() -> <Self as Backend>::Device {
        <<Self as AutodiffBackend>::InnerBackend as MainDevice>::main_device()
    }
}

#[cfg(not(feature = "_has-backend"))]
mod err {
    use super::*;
    std::compile_error!(
        "No backend selected. Enable one of the `ndarray`, `tch-cpu`, `tch-gpu`, `wgpu` or `cuda` features."
    );

    // pretend to fallback to ndarray (to avoid too many other unrelated errors)
    pub type MainBackend = burn::backend::NdArray<f32, i32>;
    pub const BACKEND_NAME: &str = "none";
    impl MainDevice for MainBackend {}
}
#[cfg(not(feature = "_has-backend"))]
pub use err::*;
