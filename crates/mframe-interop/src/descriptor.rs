//! Native GPU resource descriptors.
//!
//! Each descriptor begins with an explicit `size` field, the byte size of the
//! struct version the producer was built against. Fields added in later
//! versions are consulted only when `size` covers them, so older producers
//! keep working unchanged. The backend discriminant travels in the data
//! itself ([`ResourceKind`]), not in the Rust type, mirroring the packed
//! type+version convention of the foreign ABI.
//!
//! Descriptors carry no ownership of the underlying pixels. The optional
//! `release` token is invoked exactly once, when the frame built from the
//! descriptor (and every clone of it) has been dropped.

use mframe_core::{PixelFormat, ReleaseToken};
use smallvec::SmallVec;

/// Opaque native handle value (COM pointer, surface id, device pointer).
/// Never dereferenced by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NativeHandle(pub usize);

impl NativeHandle {
    /// The null handle.
    pub const NULL: NativeHandle = NativeHandle(0);

    /// Whether the handle is null.
    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

/// Backend discriminant embedded in descriptor data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ResourceKind {
    D3d9 = 1,
    D3d11 = 2,
    Vaapi = 3,
    Cuda = 4,
}

impl ResourceKind {
    /// Human-readable backend name.
    pub fn name(self) -> &'static str {
        match self {
            Self::D3d9 => "d3d9",
            Self::D3d11 => "d3d11",
            Self::Vaapi => "vaapi",
            Self::Cuda => "cuda",
        }
    }
}

/// A D3D9 surface. Always a single plane (the ARGB StretchRect path).
#[derive(Debug, Default)]
pub struct D3d9Resource {
    /// Descriptor struct version gate, in bytes.
    pub size: u32,
    /// IDirect3DSurface9*
    pub surface: NativeHandle,
    /// Surface width as reported by the producer.
    pub width: u32,
    /// Surface height as reported by the producer.
    pub height: u32,
    /// Fires once when the last frame reference is dropped.
    pub release: Option<ReleaseToken>,
}

impl D3d9Resource {
    /// Byte size of the first published struct version.
    pub const BASE_SIZE: u32 = 32;

    /// Descriptor for `surface` at the current struct version.
    pub fn new(surface: NativeHandle, width: u32, height: u32) -> Self {
        Self {
            size: Self::BASE_SIZE,
            surface,
            width,
            height,
            release: None,
        }
    }
}

/// A D3D11 resource, either as resource + subresource index or as an
/// explicit per-plane texture-view array (a later struct version).
#[derive(Debug, Default)]
pub struct D3d11Resource {
    /// Descriptor struct version gate, in bytes.
    pub size: u32,
    /// ID3D11Resource* (usually ID3D11Texture2D*)
    pub resource: NativeHandle,
    /// Subresource index into `resource` (texture array slice).
    pub sub_resource: u32,
    /// Pixel format of the resource.
    pub format: PixelFormat,
    /// Resource width as reported by the producer.
    pub width: u32,
    /// Resource height as reported by the producer.
    pub height: u32,
    /// Explicit per-plane ID3D11ShaderResourceView*/texture list. Consulted
    /// only when `size` covers [`D3d11Resource::PLANE_VIEWS_SIZE`]; takes
    /// precedence over the subresource convention when non-empty.
    pub plane_views: SmallVec<[NativeHandle; 4]>,
    /// Fires once when the last frame reference is dropped.
    pub release: Option<ReleaseToken>,
}

impl D3d11Resource {
    /// Byte size of the first published struct version.
    pub const BASE_SIZE: u32 = 40;
    /// Byte size of the version that added `plane_views`.
    pub const PLANE_VIEWS_SIZE: u32 = 80;

    /// Subresource-convention descriptor at the base struct version.
    pub fn new(resource: NativeHandle, sub_resource: u32, format: PixelFormat) -> Self {
        Self {
            size: Self::BASE_SIZE,
            resource,
            sub_resource,
            format,
            ..Default::default()
        }
    }

    /// Explicit per-plane descriptor at the extended struct version.
    pub fn with_plane_views(
        views: impl IntoIterator<Item = NativeHandle>,
        format: PixelFormat,
    ) -> Self {
        Self {
            size: Self::PLANE_VIEWS_SIZE,
            format,
            plane_views: views.into_iter().collect(),
            ..Default::default()
        }
    }
}

/// A VAAPI surface. The native API does not reference-count surfaces, so a
/// release token is mandatory for correct lifetime.
#[derive(Debug, Default)]
pub struct VaapiResource {
    /// Descriptor struct version gate, in bytes.
    pub size: u32,
    /// VASurfaceID
    pub surface_id: u32,
    /// VADisplay
    pub display: NativeHandle,
    /// Pixel format of the surface.
    pub format: PixelFormat,
    /// Surface width as reported by the producer.
    pub width: u32,
    /// Surface height as reported by the producer.
    pub height: u32,
    /// Optional X11 Display* for GLX interop. Consulted only when `size`
    /// covers [`VaapiResource::X11_SIZE`].
    pub x11_display: NativeHandle,
    /// Fires once when the last frame reference is dropped. Mandatory.
    pub release: Option<ReleaseToken>,
}

impl VaapiResource {
    /// Byte size of the first published struct version.
    pub const BASE_SIZE: u32 = 40;
    /// Byte size of the version that added `x11_display`.
    pub const X11_SIZE: u32 = 48;

    /// Descriptor for `surface_id` at the base struct version.
    pub fn new(surface_id: u32, display: NativeHandle, format: PixelFormat) -> Self {
        Self {
            size: Self::BASE_SIZE,
            surface_id,
            display,
            format,
            ..Default::default()
        }
    }
}

/// CUDA device memory: up to 4 device pointers with per-pointer strides.
/// Multi-plane resources are addressed directly, no subresource indexing.
#[derive(Debug, Default)]
pub struct CudaResource {
    /// Descriptor struct version gate, in bytes.
    pub size: u32,
    /// CUdeviceptr per plane; unused entries are null.
    pub ptr: [NativeHandle; 4],
    /// Bytes per row per plane; 0 selects the format's minimal stride.
    pub stride: [usize; 4],
    /// Pixel format of the planes.
    pub format: PixelFormat,
    /// Width in pixels as reported by the producer.
    pub width: u32,
    /// Height in pixels as reported by the producer.
    pub height: u32,
    /// CUcontext
    pub context: NativeHandle,
    /// CUstream the pointers are synchronized against.
    pub stream: NativeHandle,
    /// Fires once when the last frame reference is dropped.
    pub release: Option<ReleaseToken>,
}

impl CudaResource {
    /// Byte size of the first published struct version.
    pub const BASE_SIZE: u32 = 104;

    /// Descriptor at the current struct version.
    pub fn new(format: PixelFormat, width: u32, height: u32) -> Self {
        Self {
            size: Self::BASE_SIZE,
            format,
            width,
            height,
            ..Default::default()
        }
    }
}

/// Tagged union over the backend descriptors.
#[derive(Debug)]
pub enum NativeResource {
    D3d9(D3d9Resource),
    D3d11(D3d11Resource),
    Vaapi(VaapiResource),
    Cuda(CudaResource),
}

impl NativeResource {
    /// The backend discriminant.
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::D3d9(_) => ResourceKind::D3d9,
            Self::D3d11(_) => ResourceKind::D3d11,
            Self::Vaapi(_) => ResourceKind::Vaapi,
            Self::Cuda(_) => ResourceKind::Cuda,
        }
    }

    /// The declared struct size of the inner descriptor.
    pub fn declared_size(&self) -> u32 {
        match self {
            Self::D3d9(d) => d.size,
            Self::D3d11(d) => d.size,
            Self::Vaapi(d) => d.size,
            Self::Cuda(d) => d.size,
        }
    }
}
