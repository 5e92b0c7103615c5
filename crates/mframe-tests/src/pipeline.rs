//! Integration tests for a decode → filter → render flow.
//!
//! Frames move between stages as ref-counted handles; a filter sits in the
//! middle and may queue output; track metadata travels alongside via the
//! cursor protocol.

use mframe_abi::{
    log, run_filter, set_log_handler, set_log_level, FrameFilter, FrameHandle, LogLevel, Metadata,
};
use mframe_core::{AudioFrame, Frame, MediaFrame, PixelFormat, SampleFormat, VideoFrame};

fn decoded(pts: f64) -> VideoFrame {
    let mut frame = VideoFrame::new(32, 32, PixelFormat::Yuv420p);
    let y = vec![64u8; 32 * 32];
    let c = vec![128u8; 16 * 16];
    frame.set_buffers(Some(&[&y, &c, &c]), &[]).unwrap();
    frame.set_timestamp(pts);
    frame
}

/// Holds every frame one call back, like a temporal-denoise filter.
struct DelayOne {
    held: Option<VideoFrame>,
}

impl FrameFilter<VideoFrame> for DelayOne {
    fn filter(&mut self, frame: &mut FrameHandle<VideoFrame>, _track: usize) -> usize {
        match frame.get().cloned() {
            Some(input) if !input.is_eos() => {
                *frame = match self.held.replace(input) {
                    Some(prev) => FrameHandle::new(prev),
                    None => FrameHandle::unbound(),
                };
                0
            }
            Some(_eos) => {
                // Swallow EOS and report queued output to trigger a drain.
                frame.unref();
                usize::from(self.held.is_some())
            }
            None => {
                // Drain call: hand over the held frame.
                *frame = match self.held.take() {
                    Some(prev) => FrameHandle::new(prev),
                    None => FrameHandle::unbound(),
                };
                usize::from(self.held.is_some())
            }
        }
    }
}

#[test]
fn delay_filter_reorders_but_loses_nothing() {
    let mut filter = DelayOne { held: None };

    // First frame is absorbed.
    let out = run_filter(&mut filter, FrameHandle::new(decoded(0.00)), 0);
    assert!(out.is_empty());

    // Second frame releases the first.
    let out = run_filter(&mut filter, FrameHandle::new(decoded(0.04)), 0);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].get().unwrap().timestamp(), Some(0.00));

    // EOS flushes the held frame via a drain call.
    let out = run_filter(&mut filter, FrameHandle::new(VideoFrame::eos()), 0);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].get().unwrap().timestamp(), Some(0.04));
}

#[test]
fn render_queue_shares_frames_with_the_decoder_queue() {
    // Decode order and render order hold the same frame concurrently.
    let decode_slot = FrameHandle::new(decoded(0.12));
    let render_slot = decode_slot.make_ref();
    assert_eq!(decode_slot.ref_count(), 2);

    // Decoder advances; renderer still reads the pixels.
    let mut decode_slot = decode_slot;
    decode_slot.unref();
    let frame = render_slot.get().expect("render side still owns the frame");
    assert_eq!(frame.plane_data(0).unwrap()[0], 64);
    assert_eq!(render_slot.ref_count(), 1);
}

#[test]
fn filter_can_replace_the_frame_across_the_boundary() {
    // A boundary crossing: detach from one wrapper, attach to another,
    // replacing what it held, with no double free on either side.
    let mut upstream = FrameHandle::new(decoded(0.0));
    let raw = upstream.detach().unwrap();

    let mut downstream = FrameHandle::new(decoded(1.0));
    downstream.attach(raw);
    assert_eq!(downstream.get().unwrap().timestamp(), Some(0.0));
    assert_eq!(downstream.ref_count(), 1);
}

#[test]
fn mixed_media_flows_through_one_frame_channel() {
    /// Counts what passes by; consumes EOS like a pipeline tail would.
    struct TrackTap {
        video: usize,
        audio: usize,
        saw_eos: bool,
    }

    impl FrameFilter<Frame> for TrackTap {
        fn filter(&mut self, frame: &mut FrameHandle<Frame>, _track: usize) -> usize {
            if let Some(media) = frame.get() {
                if media.is_eos() {
                    self.saw_eos = true;
                    frame.unref();
                    return 0;
                }
                match media {
                    Frame::Video(_) => self.video += 1,
                    Frame::Audio(_) => self.audio += 1,
                }
            }
            0
        }
    }

    let mut audio = AudioFrame::new(SampleFormat::S16, 2, 48_000);
    audio.set_buffers(None, 1920).unwrap();
    audio.set_timestamp(0.02);

    let mut tap = TrackTap {
        video: 0,
        audio: 0,
        saw_eos: false,
    };
    let inputs = vec![
        Frame::Video(decoded(0.00)),
        Frame::Audio(audio),
        Frame::Video(decoded(0.04)),
        Frame::Audio(AudioFrame::eos()),
    ];
    let mut passed = Vec::new();
    for frame in inputs {
        passed.extend(run_filter(&mut tap, FrameHandle::new(frame), 0));
    }
    assert_eq!((tap.video, tap.audio), (2, 1));
    assert!(tap.saw_eos);
    // EOS was consumed by the tap; everything else passed through bound.
    assert_eq!(passed.len(), 3);
    assert!(passed
        .iter()
        .all(|h| h.get().is_some_and(MediaFrame::is_valid)));
}

#[test]
fn track_metadata_travels_with_the_stream() {
    let mut tags = Metadata::new();
    tags.push("codec", "hevc");
    tags.push("comment", "day 1");
    tags.push("comment", "day 2");
    tags.push("language", "eng");

    // A subtitle picker scans only one key.
    let mut comments = Vec::new();
    let mut cursor = tags.find("comment");
    while let Some(entry) = cursor {
        comments.push(entry.value().to_owned());
        cursor = tags.next(entry);
    }
    assert_eq!(comments, ["day 1", "day 2"]);

    // A stream-info dump walks everything once, in order.
    let keys: Vec<_> = tags.iter().map(|(k, _)| k).collect();
    assert_eq!(keys, ["codec", "comment", "comment", "language"]);
}

#[test]
fn host_log_handler_sees_pipeline_messages() {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let lines = Arc::new(AtomicUsize::new(0));
    let sink = lines.clone();
    set_log_level(LogLevel::Debug);
    set_log_handler(Some(Box::new(move |level, _| {
        if level <= LogLevel::Debug {
            sink.fetch_add(1, Ordering::SeqCst);
        }
    })));

    log(LogLevel::Info, "pipeline started");
    log(LogLevel::Debug, "frame queued");
    log(LogLevel::All, "suppressed at Debug threshold");
    assert_eq!(lines.load(Ordering::SeqCst), 2);

    set_log_handler(None);
    set_log_level(LogLevel::default());
}
