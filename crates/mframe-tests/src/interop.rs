//! Integration tests for the GPU interop path.
//!
//! Exercises pooling and lifetime logic only — handles are synthetic, no
//! actual GPU required.

use mframe_core::{MediaFrame, PixelFormat, ReleaseToken};
use mframe_interop::{
    free_pool, from_native, native_handle, BufferPool, CudaResource, D3d11Resource, NativeHandle,
    NativeResource, ResourceKind, VaapiResource,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn vaapi_surface(id: u32, released: &Arc<AtomicUsize>) -> NativeResource {
    let counter = released.clone();
    let mut desc = VaapiResource::new(id, NativeHandle(0xd15), PixelFormat::Nv12);
    desc.width = 1920;
    desc.height = 1080;
    desc.release = Some(ReleaseToken::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    }));
    NativeResource::Vaapi(desc)
}

#[test]
fn decoder_surface_cycle_reuses_pool_registrations() {
    let released = Arc::new(AtomicUsize::new(0));
    let mut pool: Option<BufferPool> = None;

    // A decoder cycling through a fixed set of 4 surfaces over 20 frames.
    let mut frames = Vec::new();
    for n in 0..20u32 {
        let frame = from_native(&mut pool, vaapi_surface(100 + n % 4, &released), 0, 0).unwrap();
        frames.push(frame);
    }
    let pool_ref = pool.as_ref().expect("pool created on first import");
    assert_eq!(pool_ref.registrations(), 4, "one registration per surface");
    assert_eq!(pool_ref.len(), 4);

    // Each import owned its own release token.
    drop(frames);
    assert_eq!(released.load(Ordering::SeqCst), 20);

    free_pool(&mut pool);
    assert!(pool.is_none());
}

#[test]
fn render_thread_may_drop_the_last_reference() {
    let released = Arc::new(AtomicUsize::new(0));
    let mut pool = None;
    let frame = from_native(&mut pool, vaapi_surface(7, &released), 0, 0).unwrap();

    let render_copy = frame.clone();
    let handle = std::thread::spawn(move || {
        // Renderer holds the frame past the producer's drop.
        assert_eq!(render_copy.width(), 1920);
        drop(render_copy);
    });
    drop(frame);
    handle.join().unwrap();
    assert_eq!(released.load(Ordering::SeqCst), 1);
}

#[test]
fn imported_frame_round_trips_to_the_renderer() {
    let mut pool = None;
    let mut desc = D3d11Resource::new(NativeHandle(0xbeef), 2, PixelFormat::P010le);
    desc.width = 3840;
    desc.height = 2160;
    let frame = from_native(&mut pool, NativeResource::D3d11(desc), 0, 0).unwrap();
    assert!(!frame.is_host_resident());
    assert_eq!(frame.plane_count(), 2);

    // The renderer asks for the native view back.
    match native_handle(&frame, ResourceKind::D3d11).unwrap() {
        NativeResource::D3d11(out) => {
            assert_eq!(out.resource, NativeHandle(0xbeef));
            assert_eq!(out.sub_resource, 2);
            assert_eq!(out.format, PixelFormat::P010le);
            assert_eq!((out.width, out.height), (3840, 2160));
            assert!(out.release.is_none(), "export does not transfer lifetime");
        }
        other => panic!("wrong backend: {other:?}"),
    }
}

#[test]
fn gpu_frame_refuses_host_conversion() {
    let mut pool = None;
    let mut desc = CudaResource::new(PixelFormat::Nv12, 640, 360);
    desc.ptr[0] = NativeHandle(0x1000);
    desc.ptr[1] = NativeHandle(0x2000);
    let frame = from_native(&mut pool, NativeResource::Cuda(desc), 0, 0).unwrap();

    // No host mapping: `to` must fail rather than read device memory.
    let err = frame.to(Some(PixelFormat::Rgba), None).unwrap_err();
    assert!(matches!(
        err,
        mframe_core::FrameError::UnsupportedConversion(_)
    ));
}

#[test]
fn failed_import_leaves_no_partial_state() {
    let mut pool = None;
    let mut desc = CudaResource::new(PixelFormat::Nv12, 640, 360);
    desc.size = 16; // older caller than any published version
    desc.ptr[0] = NativeHandle(0x1000);
    desc.ptr[1] = NativeHandle(0x2000);
    let err = from_native(&mut pool, NativeResource::Cuda(desc), 0, 0).unwrap_err();
    assert!(matches!(err, mframe_core::FrameError::DescriptorVersion { .. }));
    assert!(pool.is_none(), "no pool side effects on failure");
}
