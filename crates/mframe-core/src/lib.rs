//! mframe core - plane-based media frame buffers
//!
//! This crate provides the frame layer of the mframe playback engine:
//! - Pixel/sample format catalog with pure classification
//! - Video and audio frames built from ownership-tracked planes
//! - Exactly-once release tokens for externally-owned memory
//! - Host-side format/size conversion with a non-copying fast path

pub mod convert;
pub mod error;
pub mod format;
pub mod frame;
pub mod plane;

pub use error::{FrameError, Result};
pub use format::{ChannelLayout, FormatInfo, PixelFormat, SampleFormat};
pub use frame::{
    AudioFrame, Frame, MediaFrame, NativeOrigin, PlaneLayout, VideoFrame, TIMESTAMP_EOS,
};
pub use plane::{ExternalBuffer, Plane, ReleaseToken};
