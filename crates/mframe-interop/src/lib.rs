//! GPU surface interop: zero-copy import of native decoder output as
//! [`mframe_core::VideoFrame`]s and export back to native descriptors.
//!
//! Backends (D3D9, D3D11, VAAPI, CUDA) are selected per call by the
//! descriptor's own discriminant and gated at build time by the crate
//! features of the same names. Native handles are opaque values; this crate
//! never dereferences them, it only books them against a per-producer
//! [`BufferPool`] and threads them through frame origins.

pub mod descriptor;
pub mod import;
pub mod pool;

pub use descriptor::{
    CudaResource, D3d11Resource, D3d9Resource, NativeHandle, NativeResource, ResourceKind,
    VaapiResource,
};
pub use import::{from_native, native_handle};
pub use pool::{free_pool, BufferPool};
