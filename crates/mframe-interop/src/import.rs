//! Zero-copy import/export of native GPU resources as video frames.
//!
//! Imports never copy pixels: the produced frame's planes reference the
//! native resource, and the frame remembers its origin so it can be exported
//! again. Pools are created lazily through `&mut Option<BufferPool>`; pass
//! the same slot for every frame from one producer.

use crate::descriptor::{
    CudaResource, D3d11Resource, D3d9Resource, NativeHandle, NativeResource, ResourceKind,
    VaapiResource,
};
use crate::pool::{BackendExtra, BufferPool, PlaneReg, PoolKey, Registration};
use mframe_core::{FrameError, NativeOrigin, PixelFormat, ReleaseToken, Result, VideoFrame};
use smallvec::SmallVec;
use std::any::Any;
use std::sync::Arc;

/// Origin marker attached to imported frames. Holds the descriptor's release
/// token, so the token fires when the last frame clone is dropped.
pub(crate) struct ImportedResource {
    pub(crate) reg: Registration,
    _release: Option<ReleaseToken>,
}

impl NativeOrigin for ImportedResource {
    fn kind(&self) -> u32 {
        self.reg.kind as u32
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Import a native resource as a video frame, registering it in `pool`.
///
/// If `*pool` is `None` a new pool is allocated and left in the slot. A
/// `width`/`height` of 0 defaults to the size the descriptor reports. On any
/// error no partial frame is produced and the pool is left as it was.
pub fn from_native(
    pool: &mut Option<BufferPool>,
    desc: NativeResource,
    width: u32,
    height: u32,
) -> Result<VideoFrame> {
    match desc {
        #[cfg(feature = "d3d9")]
        NativeResource::D3d9(d) => from_d3d9(pool, d, width, height),
        #[cfg(feature = "d3d11")]
        NativeResource::D3d11(d) => from_d3d11(pool, d, width, height),
        #[cfg(feature = "vaapi")]
        NativeResource::Vaapi(d) => from_vaapi(pool, d, width, height),
        #[cfg(feature = "cuda")]
        NativeResource::Cuda(d) => from_cuda(pool, d, width, height),
        #[allow(unreachable_patterns)]
        other => Err(FrameError::BackendUnavailable(
            backend_disabled(other.kind()),
        )),
    }
}

#[allow(dead_code)]
fn backend_disabled(kind: ResourceKind) -> &'static str {
    // Message carries the backend; the build simply lacks the feature.
    kind.name()
}

fn check_size(got: u32, need: u32) -> Result<()> {
    if got < need {
        return Err(FrameError::DescriptorVersion { got, need });
    }
    Ok(())
}

fn resolve_size(arg_w: u32, arg_h: u32, desc_w: u32, desc_h: u32) -> Result<(u32, u32)> {
    let width = if arg_w == 0 { desc_w } else { arg_w };
    let height = if arg_h == 0 { desc_h } else { arg_h };
    if width == 0 || height == 0 {
        return Err(FrameError::InvalidFormat(
            "resource reports no usable size".into(),
        ));
    }
    Ok((width, height))
}

fn finish_frame(reg: Registration, release: Option<ReleaseToken>) -> Result<VideoFrame> {
    let mut frame = VideoFrame::new(reg.width, reg.height, reg.format);
    for (plane, entry) in reg.planes.iter().enumerate() {
        // Device memory: no host pointer, the handle lives in the origin.
        frame.add_external_buffer(plane, std::ptr::null(), entry.stride, ReleaseToken::noop())?;
    }
    frame.set_native_origin(Arc::new(ImportedResource {
        reg,
        _release: release,
    }));
    Ok(frame)
}

/// Import a D3D9 surface. Single plane, the ARGB StretchRect path.
#[cfg(feature = "d3d9")]
pub fn from_d3d9(
    pool: &mut Option<BufferPool>,
    mut desc: D3d9Resource,
    width: u32,
    height: u32,
) -> Result<VideoFrame> {
    check_size(desc.size, D3d9Resource::BASE_SIZE)?;
    if desc.surface.is_null() {
        return Err(FrameError::InvalidFormat("null d3d9 surface".into()));
    }
    let (width, height) = resolve_size(width, height, desc.width, desc.height)?;
    let format = PixelFormat::Bgra;
    let key = PoolKey {
        handle: desc.surface.0,
        format,
        width,
        height,
    };
    let pool = pool.get_or_insert_with(BufferPool::new);
    let reg = pool.register_with(key, || Registration {
        kind: ResourceKind::D3d9,
        format,
        width,
        height,
        planes: SmallVec::from_iter([PlaneReg {
            handle: desc.surface,
            stride: format.min_stride(width, 0),
        }]),
        extra: BackendExtra::None,
    });
    finish_frame(reg, desc.release.take())
}

/// Import a D3D11 resource.
///
/// Accepts both the resource + subresource-index convention and, at the
/// extended descriptor version, an explicit per-plane texture-view array.
/// Both are normalized to a per-plane list; the explicit array wins when the
/// descriptor size covers it and it is non-empty.
#[cfg(feature = "d3d11")]
pub fn from_d3d11(
    pool: &mut Option<BufferPool>,
    mut desc: D3d11Resource,
    width: u32,
    height: u32,
) -> Result<VideoFrame> {
    check_size(desc.size, D3d11Resource::BASE_SIZE)?;
    if desc.format == PixelFormat::Unknown {
        return Err(FrameError::InvalidFormat("d3d11 descriptor has no format".into()));
    }
    let use_views = desc.size >= D3d11Resource::PLANE_VIEWS_SIZE && !desc.plane_views.is_empty();
    if !use_views && desc.resource.is_null() {
        return Err(FrameError::InvalidFormat("null d3d11 resource".into()));
    }
    let (width, height) = resolve_size(width, height, desc.width, desc.height)?;
    let format = desc.format;
    let plane_count = format.plane_count();
    if use_views && desc.plane_views.len() < plane_count {
        return Err(FrameError::LayoutMismatch(format!(
            "{} plane view(s) for {plane_count}-plane {format:?}",
            desc.plane_views.len()
        )));
    }

    let key = PoolKey {
        handle: if use_views {
            desc.plane_views[0].0
        } else {
            desc.resource.0
        },
        format,
        width,
        height,
    };
    let pool = pool.get_or_insert_with(BufferPool::new);
    let views = desc.plane_views.clone();
    let resource = desc.resource;
    let sub_resource = desc.sub_resource;
    let reg = pool.register_with(key, || Registration {
        kind: ResourceKind::D3d11,
        format,
        width,
        height,
        planes: (0..plane_count)
            .map(|p| PlaneReg {
                handle: if use_views { views[p] } else { resource },
                stride: format.min_stride(width, p),
            })
            .collect(),
        extra: BackendExtra::D3d11 { sub_resource },
    });
    finish_frame(reg, desc.release.take())
}

/// Import a VAAPI surface. The release token is mandatory: VAAPI surfaces
/// are not reference-counted by the native API, so the producer must hear
/// back when the frame is done with it.
#[cfg(feature = "vaapi")]
pub fn from_vaapi(
    pool: &mut Option<BufferPool>,
    mut desc: VaapiResource,
    width: u32,
    height: u32,
) -> Result<VideoFrame> {
    check_size(desc.size, VaapiResource::BASE_SIZE)?;
    if desc.display.is_null() {
        return Err(FrameError::InvalidFormat("null vaapi display".into()));
    }
    if desc.format == PixelFormat::Unknown {
        return Err(FrameError::InvalidFormat("vaapi descriptor has no format".into()));
    }
    let release = desc.release.take().ok_or_else(|| {
        FrameError::InvalidFormat("vaapi import requires a release callback".into())
    })?;
    let (width, height) = resolve_size(width, height, desc.width, desc.height)?;
    let format = desc.format;
    let x11_display = if desc.size >= VaapiResource::X11_SIZE {
        desc.x11_display
    } else {
        NativeHandle::NULL
    };
    let surface = NativeHandle(desc.surface_id as usize);
    let display = desc.display;
    let key = PoolKey {
        handle: surface.0,
        format,
        width,
        height,
    };
    let pool = pool.get_or_insert_with(BufferPool::new);
    let reg = pool.register_with(key, || Registration {
        kind: ResourceKind::Vaapi,
        format,
        width,
        height,
        planes: (0..format.plane_count())
            .map(|p| PlaneReg {
                handle: surface,
                stride: format.min_stride(width, p),
            })
            .collect(),
        extra: BackendExtra::Vaapi {
            display,
            x11_display,
        },
    });
    finish_frame(reg, Some(release))
}

/// Import CUDA device memory: up to 4 device pointers addressed directly.
#[cfg(feature = "cuda")]
pub fn from_cuda(
    pool: &mut Option<BufferPool>,
    mut desc: CudaResource,
    width: u32,
    height: u32,
) -> Result<VideoFrame> {
    check_size(desc.size, CudaResource::BASE_SIZE)?;
    if desc.format == PixelFormat::Unknown {
        return Err(FrameError::InvalidFormat("cuda descriptor has no format".into()));
    }
    let (width, height) = resolve_size(width, height, desc.width, desc.height)?;
    let format = desc.format;
    let plane_count = format.plane_count();
    for p in 0..plane_count {
        if desc.ptr[p].is_null() {
            return Err(FrameError::LayoutMismatch(format!(
                "null device pointer for plane {p} of {format:?}"
            )));
        }
    }

    let ptr = desc.ptr;
    let stride = desc.stride;
    let (context, stream) = (desc.context, desc.stream);
    let key = PoolKey {
        handle: ptr[0].0,
        format,
        width,
        height,
    };
    let pool = pool.get_or_insert_with(BufferPool::new);
    let reg = pool.register_with(key, || Registration {
        kind: ResourceKind::Cuda,
        format,
        width,
        height,
        planes: (0..plane_count)
            .map(|p| PlaneReg {
                handle: ptr[p],
                stride: if stride[p] == 0 {
                    format.min_stride(width, p)
                } else {
                    stride[p]
                },
            })
            .collect(),
        extra: BackendExtra::Cuda { context, stream },
    });
    finish_frame(reg, desc.release.take())
}

/// Export a frame's planes as a native resource descriptor of `kind`.
///
/// Succeeds only for frames whose native origin already matches `kind`;
/// re-uploading host or cross-backend frames needs the renderer's device
/// objects, which this layer does not own. The returned descriptor carries
/// no release token: lifetime stays with the original import.
pub fn native_handle(frame: &VideoFrame, kind: ResourceKind) -> Result<NativeResource> {
    let origin = frame
        .native_origin()
        .ok_or(FrameError::BackendUnavailable("frame has no native origin"))?;
    let imported = origin
        .as_any()
        .downcast_ref::<ImportedResource>()
        .ok_or(FrameError::BackendUnavailable("foreign native origin"))?;
    let reg = &imported.reg;
    if reg.kind != kind {
        return Err(FrameError::BackendUnavailable(kind.name()));
    }

    Ok(match kind {
        ResourceKind::D3d9 => NativeResource::D3d9(D3d9Resource {
            size: D3d9Resource::BASE_SIZE,
            surface: reg.planes[0].handle,
            width: reg.width,
            height: reg.height,
            release: None,
        }),
        ResourceKind::D3d11 => {
            let sub_resource = match reg.extra {
                BackendExtra::D3d11 { sub_resource } => sub_resource,
                _ => 0,
            };
            NativeResource::D3d11(D3d11Resource {
                size: D3d11Resource::PLANE_VIEWS_SIZE,
                resource: reg.planes[0].handle,
                sub_resource,
                format: reg.format,
                width: reg.width,
                height: reg.height,
                plane_views: reg.planes.iter().map(|p| p.handle).collect(),
                release: None,
            })
        }
        ResourceKind::Vaapi => {
            let (display, x11_display) = match reg.extra {
                BackendExtra::Vaapi {
                    display,
                    x11_display,
                } => (display, x11_display),
                _ => (NativeHandle::NULL, NativeHandle::NULL),
            };
            NativeResource::Vaapi(VaapiResource {
                size: VaapiResource::X11_SIZE,
                surface_id: reg.planes[0].handle.0 as u32,
                display,
                format: reg.format,
                width: reg.width,
                height: reg.height,
                x11_display,
                release: None,
            })
        }
        ResourceKind::Cuda => {
            let (context, stream) = match reg.extra {
                BackendExtra::Cuda { context, stream } => (context, stream),
                _ => (NativeHandle::NULL, NativeHandle::NULL),
            };
            let mut ptr = [NativeHandle::NULL; 4];
            let mut stride = [0usize; 4];
            for (i, plane) in reg.planes.iter().enumerate().take(4) {
                ptr[i] = plane.handle;
                stride[i] = plane.stride;
            }
            NativeResource::Cuda(CudaResource {
                size: CudaResource::BASE_SIZE,
                ptr,
                stride,
                format: reg.format,
                width: reg.width,
                height: reg.height,
                context,
                stream,
                release: None,
            })
        }
    })
}
