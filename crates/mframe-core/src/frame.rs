//! Video and audio frame value types.
//!
//! A frame owns an ordered list of [`Plane`]s whose count and geometry are
//! fully determined by the format descriptor and dimensions. Validity is
//! distinct from carrying pixel data: an end-of-stream frame is valid, has
//! zero planes and carries the [`TIMESTAMP_EOS`] sentinel.

use crate::error::{FrameError, Result};
use crate::format::{ChannelLayout, PixelFormat, SampleFormat};
use crate::plane::{ExternalBuffer, Plane, ReleaseToken};
use smallvec::SmallVec;
use std::any::Any;
use std::sync::Arc;

/// Sentinel timestamp signaling end of stream through the frame channel.
pub const TIMESTAMP_EOS: f64 = f64::MAX;

/// Marker left on frames whose planes wrap a native GPU resource, so the
/// interop layer can recognize and re-export them. Core knows only the trait.
pub trait NativeOrigin: Send + Sync {
    /// Backend discriminant (matches the resource descriptor's kind).
    fn kind(&self) -> u32;
    /// Downcast support for the owning backend.
    fn as_any(&self) -> &dyn Any;
}

/// Common surface shared by video and audio frames.
pub trait MediaFrame: Send + Sync + 'static {
    /// Presentation timestamp in seconds, if set.
    fn timestamp(&self) -> Option<f64>;
    /// Whether the frame carries the end-of-stream sentinel.
    fn is_eos(&self) -> bool {
        self.timestamp() == Some(TIMESTAMP_EOS)
    }
    /// Whether the frame has any underlying storage, the EOS case included.
    fn is_valid(&self) -> bool;
    /// Number of planes currently attached to the frame.
    fn plane_count(&self) -> usize;
}

/// Actual byte layout chosen for a frame's planes.
///
/// Returned by `set_buffers` so callers that passed zero/unset strides learn
/// the real layout (the in/out array of the foreign convention, expressed as
/// a return value).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlaneLayout {
    /// Chosen stride (video) or byte size (audio) per plane.
    pub strides: SmallVec<[usize; 4]>,
    /// Byte offset of each plane within the single backing allocation.
    pub offsets: SmallVec<[usize; 4]>,
    /// Total byte size of the backing allocation.
    pub total: usize,
}

/// A decoded video frame.
///
/// Planes are indexed `0..format.plane_count()`. Cloning shares plane
/// storage; the last clone to drop releases it (and fires any registered
/// release tokens).
#[derive(Clone)]
pub struct VideoFrame {
    format: PixelFormat,
    width: u32,
    height: u32,
    planes: SmallVec<[Plane; 4]>,
    timestamp: Option<f64>,
    native: Option<Arc<dyn NativeOrigin>>,
}

impl VideoFrame {
    /// An empty frame: planes allocated but unset, timestamp unset.
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        let planes = (0..format.plane_count()).map(|_| Plane::unset()).collect();
        Self {
            format,
            width,
            height,
            planes,
            timestamp: None,
            native: None,
        }
    }

    /// The end-of-stream sentinel frame: valid, zero planes.
    pub fn eos() -> Self {
        Self {
            format: PixelFormat::Unknown,
            width: 0,
            height: 0,
            planes: SmallVec::new(),
            timestamp: Some(TIMESTAMP_EOS),
            native: None,
        }
    }

    /// Pixel format descriptor.
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Frame width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Frame height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Width of one plane (chroma planes may be subsampled).
    pub fn plane_width(&self, plane: usize) -> u32 {
        self.format.plane_width(self.width, plane)
    }

    /// Height of one plane.
    pub fn plane_height(&self, plane: usize) -> u32 {
        self.format.plane_height(self.height, plane)
    }

    /// Set the presentation timestamp in seconds.
    pub fn set_timestamp(&mut self, t: f64) {
        self.timestamp = Some(t);
    }

    fn check_plane(&self, plane: usize) -> Result<()> {
        if self.is_eos() {
            return Err(FrameError::Eos);
        }
        if plane >= self.planes.len() {
            return Err(FrameError::PlaneIndex {
                index: plane,
                planes: self.planes.len(),
            });
        }
        Ok(())
    }

    /// Attach or replace the buffer at `plane` by copying `data`.
    ///
    /// `stride` of 0 selects the format's minimal stride. The source does not
    /// need to outlive the call; `stride * plane_height` bytes are copied into
    /// a freshly allocated, frame-owned block. Replacing a plane that carried
    /// a release token fires that token.
    pub fn add_buffer(&mut self, plane: usize, data: &[u8], stride: usize) -> Result<()> {
        self.check_plane(plane)?;
        let stride = if stride == 0 {
            self.format.min_stride(self.width, plane)
        } else {
            stride
        };
        let len = stride * self.plane_height(plane) as usize;
        if data.len() < len {
            return Err(FrameError::LayoutMismatch(format!(
                "plane {plane} needs {len} bytes, source has {}",
                data.len()
            )));
        }
        let block = Arc::new(data[..len].to_vec());
        self.planes[plane] = Plane::host(block, 0, len, stride);
        Ok(())
    }

    /// Attach or replace the buffer at `plane` with externally-owned memory.
    ///
    /// No bytes are copied. `data` may be null for device-only planes. The
    /// token fires exactly once when the last reference to this frame (all
    /// clones included) is dropped.
    pub fn add_external_buffer(
        &mut self,
        plane: usize,
        data: *const u8,
        stride: usize,
        token: ReleaseToken,
    ) -> Result<()> {
        self.check_plane(plane)?;
        let len = stride * self.plane_height(plane) as usize;
        let buffer = Arc::new(ExternalBuffer::new(data, len, token));
        self.planes[plane] = Plane::external(buffer, stride);
        Ok(())
    }

    /// Allocate one contiguous block for every plane and optionally fill it.
    ///
    /// `strides` entries of 0 (or a short/empty slice) select minimal strides.
    /// With `sources`, plane bytes are copied from the given slices; a single
    /// source for a multi-plane format is treated as already contiguous at
    /// the chosen strides. Returns the layout actually chosen.
    pub fn set_buffers(
        &mut self,
        sources: Option<&[&[u8]]>,
        strides: &[usize],
    ) -> Result<PlaneLayout> {
        if self.is_eos() {
            return Err(FrameError::Eos);
        }
        if self.format == PixelFormat::Unknown || self.planes.is_empty() {
            return Err(FrameError::InvalidFormat("cannot layout Unknown format".into()));
        }
        let mut layout = PlaneLayout::default();
        for plane in 0..self.planes.len() {
            let min = self.format.min_stride(self.width, plane);
            let stride = match strides.get(plane) {
                Some(&s) if s >= min => s,
                _ => min,
            };
            layout.offsets.push(layout.total);
            layout.strides.push(stride);
            layout.total += stride * self.plane_height(plane) as usize;
        }

        let mut block = vec![0u8; layout.total];
        if let Some(sources) = sources {
            if sources.len() == 1 && self.planes.len() > 1 {
                // Single source: already contiguous, plane offsets derived
                // from the chosen strides.
                let n = sources[0].len().min(block.len());
                block[..n].copy_from_slice(&sources[0][..n]);
            } else {
                if sources.len() < self.planes.len() {
                    return Err(FrameError::LayoutMismatch(format!(
                        "{} source(s) for {} plane(s)",
                        sources.len(),
                        self.planes.len()
                    )));
                }
                for (plane, src) in sources.iter().enumerate().take(self.planes.len()) {
                    let size = layout.strides[plane] * self.plane_height(plane) as usize;
                    let dst = &mut block[layout.offsets[plane]..layout.offsets[plane] + size];
                    let n = src.len().min(size);
                    dst[..n].copy_from_slice(&src[..n]);
                }
            }
        }

        let block = Arc::new(block);
        for plane in 0..self.planes.len() {
            let size = layout.strides[plane] * self.plane_height(plane) as usize;
            self.planes[plane] =
                Plane::host(block.clone(), layout.offsets[plane], size, layout.strides[plane]);
        }
        Ok(layout)
    }

    /// Read view of a plane's bytes. `None` if never attached or device-only.
    pub fn plane_data(&self, plane: usize) -> Option<&[u8]> {
        self.planes.get(plane).and_then(Plane::data)
    }

    /// Bytes per row of a plane. 0 if never attached.
    pub fn bytes_per_line(&self, plane: usize) -> usize {
        self.planes.get(plane).map_or(0, Plane::stride)
    }

    /// Direct access to a plane.
    pub fn plane(&self, plane: usize) -> Option<&Plane> {
        self.planes.get(plane)
    }

    /// Mark this frame as wrapping a native GPU resource.
    pub fn set_native_origin(&mut self, origin: Arc<dyn NativeOrigin>) {
        self.native = Some(origin);
    }

    /// The native resource this frame wraps, if any.
    pub fn native_origin(&self) -> Option<&Arc<dyn NativeOrigin>> {
        self.native.as_ref()
    }

    /// Whether every attached plane lives in frame-owned host memory.
    pub fn is_host_resident(&self) -> bool {
        self.native.is_none()
            && !self.planes.is_empty()
            && self.planes.iter().all(Plane::is_host)
    }
}

impl MediaFrame for VideoFrame {
    fn timestamp(&self) -> Option<f64> {
        self.timestamp
    }

    fn is_valid(&self) -> bool {
        self.is_eos() || self.planes.iter().any(Plane::is_set)
    }

    fn plane_count(&self) -> usize {
        self.planes.len()
    }
}

impl std::fmt::Debug for VideoFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoFrame")
            .field("format", &self.format)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("planes", &self.planes.len())
            .field("timestamp", &self.timestamp)
            .field("native", &self.native.as_ref().map(|n| n.kind()))
            .finish()
    }
}

/// A decoded audio frame.
///
/// Planar sample formats hold one plane per channel; packed formats hold a
/// single interleaved plane. A plane's stride is its byte size.
#[derive(Clone)]
pub struct AudioFrame {
    format: SampleFormat,
    channels: u16,
    layout: ChannelLayout,
    sample_rate: u32,
    samples: usize,
    planes: SmallVec<[Plane; 4]>,
    timestamp: Option<f64>,
}

impl AudioFrame {
    /// An empty frame: planes allocated but unset, timestamp unset.
    pub fn new(format: SampleFormat, channels: u16, sample_rate: u32) -> Self {
        let planes = (0..format.plane_count(channels))
            .map(|_| Plane::unset())
            .collect();
        Self {
            format,
            channels,
            layout: ChannelLayout::from_count(channels),
            sample_rate,
            samples: 0,
            planes,
            timestamp: None,
        }
    }

    /// The end-of-stream sentinel frame: valid, zero planes.
    pub fn eos() -> Self {
        Self {
            format: SampleFormat::Unknown,
            channels: 0,
            layout: ChannelLayout::Mono,
            sample_rate: 0,
            samples: 0,
            planes: SmallVec::new(),
            timestamp: Some(TIMESTAMP_EOS),
        }
    }

    /// Sample format descriptor.
    pub fn format(&self) -> SampleFormat {
        self.format
    }

    /// Channel count.
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Channel layout.
    pub fn channel_layout(&self) -> ChannelLayout {
        self.layout
    }

    /// Samples per second.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Samples per channel.
    pub fn samples_per_channel(&self) -> usize {
        self.samples
    }

    /// Set the sample count per channel (drives plane sizes and duration).
    pub fn set_samples_per_channel(&mut self, samples: usize) {
        self.samples = samples;
    }

    /// Frame duration in seconds, derived from sample count and rate.
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples as f64 / self.sample_rate as f64
    }

    /// Set the presentation timestamp in seconds.
    pub fn set_timestamp(&mut self, t: f64) {
        self.timestamp = Some(t);
    }

    /// Byte size of one plane at the current sample count.
    pub fn plane_bytes(&self) -> usize {
        let per_sample = self.format.bytes_per_sample();
        let channels = if self.format.is_planar() {
            1
        } else {
            self.channels as usize
        };
        self.samples * per_sample * channels
    }

    fn check_plane(&self, plane: usize) -> Result<()> {
        if self.is_eos() {
            return Err(FrameError::Eos);
        }
        if plane >= self.planes.len() {
            return Err(FrameError::PlaneIndex {
                index: plane,
                planes: self.planes.len(),
            });
        }
        Ok(())
    }

    /// Attach or replace the buffer at `plane` by copying `data`.
    ///
    /// Derives the sample count from the byte size when it is still unset.
    pub fn add_buffer(&mut self, plane: usize, data: &[u8]) -> Result<()> {
        self.check_plane(plane)?;
        if self.samples == 0 {
            self.derive_samples(data.len());
        }
        let block = Arc::new(data.to_vec());
        let len = data.len();
        self.planes[plane] = Plane::host(block, 0, len, len);
        Ok(())
    }

    /// Attach or replace the buffer at `plane` with externally-owned memory.
    pub fn add_external_buffer(
        &mut self,
        plane: usize,
        data: *const u8,
        size: usize,
        token: ReleaseToken,
    ) -> Result<()> {
        self.check_plane(plane)?;
        if self.samples == 0 {
            self.derive_samples(size);
        }
        let buffer = Arc::new(ExternalBuffer::new(data, size, token));
        self.planes[plane] = Plane::external(buffer, size);
        Ok(())
    }

    /// Allocate one contiguous block for every plane and optionally fill it.
    ///
    /// `bytes_per_plane` of 0 derives the size from the current sample count;
    /// a non-zero value updates the sample count instead. A single source for
    /// a planar multi-channel frame is treated as already contiguous.
    pub fn set_buffers(
        &mut self,
        sources: Option<&[&[u8]]>,
        bytes_per_plane: usize,
    ) -> Result<PlaneLayout> {
        if self.is_eos() {
            return Err(FrameError::Eos);
        }
        if self.format == SampleFormat::Unknown || self.planes.is_empty() {
            return Err(FrameError::InvalidFormat("cannot layout Unknown format".into()));
        }
        let mut per_plane = if bytes_per_plane == 0 {
            self.plane_bytes()
        } else {
            self.derive_samples(bytes_per_plane);
            bytes_per_plane
        };
        if per_plane == 0 {
            // No sample count yet: take the size from per-plane sources.
            if let Some(sources) = sources {
                if sources.len() == self.planes.len() {
                    per_plane = sources[0].len();
                    self.derive_samples(per_plane);
                }
            }
        }
        if per_plane == 0 {
            return Err(FrameError::LayoutMismatch(
                "no sample count or byte size given".into(),
            ));
        }

        let count = self.planes.len();
        let mut layout = PlaneLayout::default();
        for plane in 0..count {
            layout.strides.push(per_plane);
            layout.offsets.push(plane * per_plane);
        }
        layout.total = count * per_plane;

        let mut block = vec![0u8; layout.total];
        if let Some(sources) = sources {
            if sources.len() == 1 && count > 1 {
                let n = sources[0].len().min(block.len());
                block[..n].copy_from_slice(&sources[0][..n]);
            } else {
                if sources.len() < count {
                    return Err(FrameError::LayoutMismatch(format!(
                        "{} source(s) for {} plane(s)",
                        sources.len(),
                        count
                    )));
                }
                for (plane, src) in sources.iter().enumerate().take(count) {
                    let dst = &mut block[plane * per_plane..(plane + 1) * per_plane];
                    let n = src.len().min(per_plane);
                    dst[..n].copy_from_slice(&src[..n]);
                }
            }
        }

        let block = Arc::new(block);
        for plane in 0..count {
            self.planes[plane] =
                Plane::host(block.clone(), plane * per_plane, per_plane, per_plane);
        }
        Ok(layout)
    }

    fn derive_samples(&mut self, plane_bytes: usize) {
        let per_sample = self.format.bytes_per_sample();
        let channels = if self.format.is_planar() {
            1
        } else {
            self.channels.max(1) as usize
        };
        if per_sample > 0 {
            self.samples = plane_bytes / (per_sample * channels);
        }
    }

    /// Read view of a plane's bytes. `None` if never attached.
    pub fn plane_data(&self, plane: usize) -> Option<&[u8]> {
        self.planes.get(plane).and_then(Plane::data)
    }

    /// Byte size of plane 0. 0 if never attached.
    pub fn bytes_per_plane(&self) -> usize {
        self.planes.first().map_or(0, Plane::stride)
    }

    /// Whether every attached plane lives in frame-owned host memory.
    pub fn is_host_resident(&self) -> bool {
        !self.planes.is_empty() && self.planes.iter().all(Plane::is_host)
    }
}

impl MediaFrame for AudioFrame {
    fn timestamp(&self) -> Option<f64> {
        self.timestamp
    }

    fn is_valid(&self) -> bool {
        self.is_eos() || self.planes.iter().any(Plane::is_set)
    }

    fn plane_count(&self) -> usize {
        self.planes.len()
    }
}

impl std::fmt::Debug for AudioFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioFrame")
            .field("format", &self.format)
            .field("channels", &self.channels)
            .field("sample_rate", &self.sample_rate)
            .field("samples", &self.samples)
            .field("planes", &self.planes.len())
            .field("timestamp", &self.timestamp)
            .finish()
    }
}

/// Either kind of frame, for surfaces that carry both through one channel.
#[derive(Debug, Clone)]
pub enum Frame {
    Video(VideoFrame),
    Audio(AudioFrame),
}

impl MediaFrame for Frame {
    fn timestamp(&self) -> Option<f64> {
        match self {
            Frame::Video(f) => f.timestamp(),
            Frame::Audio(f) => f.timestamp(),
        }
    }

    fn is_valid(&self) -> bool {
        match self {
            Frame::Video(f) => f.is_valid(),
            Frame::Audio(f) => f.is_valid(),
        }
    }

    fn plane_count(&self) -> usize {
        match self {
            Frame::Video(f) => f.plane_count(),
            Frame::Audio(f) => f.plane_count(),
        }
    }
}


#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    fn arb_format() -> impl Strategy<Value = PixelFormat> {
        proptest::sample::select(PixelFormat::ALL.to_vec())
    }

    proptest! {
        /// classify().plane_count equals the number of indices add_buffer accepts.
        #[test]
        fn classify_matches_accepted_plane_indices(format in arb_format()) {
            let mut frame = VideoFrame::new(64, 64, format);
            let info = format.classify();
            let big = vec![0u8; format.frame_size(64, 64).max(1)];
            for plane in 0..info.plane_count {
                prop_assert!(frame.add_buffer(plane, &big, 0).is_ok(), "plane {} rejected", plane);
            }
            prop_assert!(frame.add_buffer(info.plane_count, &big, 0).is_err());
        }

        /// set_buffers then plane_data reproduces the source bytes exactly.
        #[test]
        fn set_buffers_round_trip(
            format in arb_format(),
            width in (1u32..40).prop_map(|w| w * 4),
            height in (1u32..40).prop_map(|h| h * 4),
            seed in any::<u8>(),
        ) {
            let mut frame = VideoFrame::new(width, height, format);
            let sources: Vec<Vec<u8>> = (0..format.plane_count())
                .map(|p| {
                    (0..format.plane_size(width, height, p))
                        .map(|i| (i as u8).wrapping_add(seed).wrapping_mul(31))
                        .collect()
                })
                .collect();
            let refs: Vec<&[u8]> = sources.iter().map(Vec::as_slice).collect();
            let layout = frame.set_buffers(Some(&refs), &[]).unwrap();
            for (p, src) in sources.iter().enumerate() {
                prop_assert_eq!(frame.plane_data(p).unwrap(), src.as_slice());
                prop_assert_eq!(frame.bytes_per_line(p), layout.strides[p]);
            }
        }
    }
}
