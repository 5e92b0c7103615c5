//! Integration tests for frame construction and conversion.
//!
//! Models what a decoder output path does: build frames from raw plane
//! bytes, convert them for a renderer, and pass EOS through the same
//! channel as pixel-bearing frames.

use mframe_core::{
    FrameError, MediaFrame, PixelFormat, SampleFormat, VideoFrame, AudioFrame, TIMESTAMP_EOS,
};

fn decoded_nv12(width: u32, height: u32, pts: f64) -> VideoFrame {
    let mut frame = VideoFrame::new(width, height, PixelFormat::Nv12);
    let y = vec![120u8; (width * height) as usize];
    let uv = vec![128u8; (width * height / 2) as usize];
    frame
        .set_buffers(Some(&[&y, &uv]), &[])
        .expect("nv12 layout");
    frame.set_timestamp(pts);
    frame
}

#[test]
fn decoded_frame_survives_format_change_for_render() {
    let decoded = decoded_nv12(64, 48, 0.04);

    let planar = decoded
        .to(Some(PixelFormat::Yuv420p), None)
        .expect("nv12 to yuv420p");
    assert_eq!(planar.plane_count(), 3);
    assert_eq!(planar.timestamp(), Some(0.04));
    // Chroma was all-neutral, so both deinterleaved planes are too.
    assert!(planar.plane_data(1).unwrap().iter().all(|&c| c == 128));
    assert!(planar.plane_data(2).unwrap().iter().all(|&c| c == 128));
}

#[test]
fn same_format_request_is_zero_copy() {
    let decoded = decoded_nv12(64, 48, 0.0);
    let same = decoded.to(None, None).expect("identity conversion");
    assert_eq!(
        decoded.plane_data(0).unwrap().as_ptr(),
        same.plane_data(0).unwrap().as_ptr(),
        "identity conversion must share storage"
    );

    // Any real change allocates new storage.
    let scaled = decoded.to(None, Some((32, 24))).expect("rescale");
    assert_ne!(
        decoded.plane_data(0).unwrap().as_ptr(),
        scaled.plane_data(0).unwrap().as_ptr()
    );
    assert_eq!((scaled.width(), scaled.height()), (32, 24));
}

#[test]
fn eos_flows_through_the_frame_channel_unharmed() {
    let mut eos = VideoFrame::eos();
    assert!(eos.is_eos());
    assert!(eos.is_valid());
    assert_eq!(eos.plane_count(), 0);
    assert_eq!(eos.timestamp(), Some(TIMESTAMP_EOS));

    // Mutation attempts fail cleanly and change nothing.
    assert!(matches!(eos.add_buffer(0, &[0u8; 16], 0), Err(FrameError::Eos)));
    assert!(matches!(eos.to(Some(PixelFormat::Rgba), None), Err(FrameError::Eos)));
    assert_eq!(eos.plane_count(), 0);
    assert!(eos.is_eos());
}

#[test]
fn out_of_range_plane_leaves_frame_untouched() {
    let mut frame = VideoFrame::new(64, 64, PixelFormat::Yuv420p);
    let y = vec![10u8; 64 * 64];
    let u = vec![20u8; 32 * 32];
    let v = vec![30u8; 32 * 32];
    frame.add_buffer(0, &y, 0).unwrap();
    frame.add_buffer(1, &u, 0).unwrap();
    frame.add_buffer(2, &v, 0).unwrap();

    let err = frame.add_buffer(5, &[0u8; 16], 0).unwrap_err();
    assert_eq!(err, FrameError::PlaneIndex { index: 5, planes: 3 });
    assert_eq!(frame.plane_data(0).unwrap()[0], 10);
    assert_eq!(frame.plane_data(1).unwrap()[0], 20);
    assert_eq!(frame.plane_data(2).unwrap()[0], 30);
}

#[test]
fn audio_path_matches_device_format() {
    // A 48 kHz stereo S16 decode rendered on a mono F32 device.
    let mut decoded = AudioFrame::new(SampleFormat::S16, 2, 48_000);
    let mut bytes = Vec::new();
    for _ in 0..480 {
        bytes.extend_from_slice(&8192i16.to_le_bytes()); // left
        bytes.extend_from_slice(&(-8192i16).to_le_bytes()); // right
    }
    decoded.set_buffers(Some(&[&bytes]), 0).expect("s16 layout");
    assert_eq!(decoded.samples_per_channel(), 480);
    assert!((decoded.duration() - 0.01).abs() < 1e-9);

    let device = decoded
        .to(Some(SampleFormat::F32), Some(1), Some(24_000))
        .expect("device conversion");
    assert_eq!(device.channels(), 1);
    assert_eq!(device.sample_rate(), 24_000);
    assert_eq!(device.samples_per_channel(), 240);
    // Opposite-phase channels fold to silence.
    let folded = device.plane_data(0).unwrap();
    let first = f32::from_le_bytes(folded[0..4].try_into().unwrap());
    assert!(first.abs() < 1e-3, "fold of +x and -x should cancel, got {first}");
}
