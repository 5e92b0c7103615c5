//! Pixel and sample format catalog.
//!
//! Pure lookup tables: every format identifier classifies to plane count,
//! bit depth, packing and signedness without touching frame state. `Unknown`
//! is a first-class value that classifies to the neutral zero result.

use serde::{Deserialize, Serialize};

/// Video pixel formats.
///
/// The identifiers follow the common FFmpeg-style naming: `LE` suffixes are
/// little-endian 16-bit containers, `P` suffixes are planar layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[non_exhaustive]
pub enum PixelFormat {
    /// Unknown/invalid format. Classifies to the neutral zero result.
    #[default]
    Unknown,
    /// Planar YUV 4:2:0, 12bpp
    Yuv420p,
    /// Planar YUV 4:2:0 with full-resolution alpha plane
    Yuva420p,
    /// Semi-planar YUV 4:2:0 (interleaved UV), common hardware decoder output
    Nv12,
    /// Planar YUV 4:2:2
    Yuv422p,
    /// Planar YUV 4:4:4
    Yuv444p,
    /// Semi-planar 4:2:0, 10 bits in 16-bit little-endian containers
    P010le,
    /// Semi-planar 4:2:0, 16-bit little-endian
    P016le,
    /// Planar YUV 4:2:0, 10 bits in 16-bit little-endian containers
    Yuv420p10le,
    /// Packed 4:2:2, U-Y-V-Y byte order
    Uyvy422,
    /// Packed RGB, 24bpp
    Rgb24,
    /// Packed RGBA, 32bpp
    Rgba,
    /// Packed RGB with padding byte
    Rgbx,
    /// Packed BGRA, 32bpp
    Bgra,
    /// Packed BGR with padding byte
    Bgrx,
    /// Packed RGB 5:6:5, little-endian
    Rgb565le,
    /// Packed RGB, 16 bits per component, little-endian
    Rgb48le,
    /// Planar GBR, 8 bits per component
    Gbrp,
    /// Planar GBR, 10 bits in 16-bit little-endian containers
    Gbrp10le,
    /// Packed XYZ, 12 bits in 16-bit little-endian containers
    Xyz12le,
    /// Block-compressed BC1 (DXT1), 8 bytes per 4x4 block
    Bc1,
    /// Block-compressed BC3 (DXT5), 16 bytes per 4x4 block
    Bc3,
    /// Packed RGBA, 16 bits per component
    Rgba64,
    /// Packed BGRA, 16 bits per component
    Bgra64,
    /// Planar RGB, 16 bits per component
    Rgbp16,
    /// Planar RGB, 32-bit float per component
    Rgbpf32,
    /// Packed BGRA, 32-bit float per component
    Bgraf32,
}

/// Derived attributes of a pixel or sample format.
///
/// Returned by [`PixelFormat::classify`] and [`SampleFormat::classify`].
/// For planar audio formats `plane_count` is 0, meaning "one plane per
/// channel"; resolve it with [`SampleFormat::plane_count`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FormatInfo {
    /// Number of planes (0 for Unknown, and for per-channel planar audio).
    pub plane_count: usize,
    /// Significant bits per component unit.
    pub bits_per_unit: u32,
    /// Components stored in separate (or semi-planar) planes.
    pub is_planar: bool,
    /// Floating-point components.
    pub is_float: bool,
    /// Unsigned integer components.
    pub is_unsigned: bool,
    /// Byte size of one addressable component unit.
    pub raw_unit_size: usize,
}

/// Per-plane byte layout: (bytes per pixel, width shift, height shift).
type PlaneDesc = (usize, u32, u32);

impl PixelFormat {
    /// All formats the catalog knows, Unknown excluded.
    pub const ALL: [PixelFormat; 26] = [
        Self::Yuv420p,
        Self::Yuva420p,
        Self::Nv12,
        Self::Yuv422p,
        Self::Yuv444p,
        Self::P010le,
        Self::P016le,
        Self::Yuv420p10le,
        Self::Uyvy422,
        Self::Rgb24,
        Self::Rgba,
        Self::Rgbx,
        Self::Bgra,
        Self::Bgrx,
        Self::Rgb565le,
        Self::Rgb48le,
        Self::Gbrp,
        Self::Gbrp10le,
        Self::Xyz12le,
        Self::Bc1,
        Self::Bc3,
        Self::Rgba64,
        Self::Bgra64,
        Self::Rgbp16,
        Self::Rgbpf32,
        Self::Bgraf32,
    ];

    fn planes(self) -> &'static [PlaneDesc] {
        match self {
            Self::Unknown => &[],
            Self::Yuv420p => &[(1, 0, 0), (1, 1, 1), (1, 1, 1)],
            Self::Yuva420p => &[(1, 0, 0), (1, 1, 1), (1, 1, 1), (1, 0, 0)],
            Self::Nv12 => &[(1, 0, 0), (2, 1, 1)],
            Self::Yuv422p => &[(1, 0, 0), (1, 1, 0), (1, 1, 0)],
            Self::Yuv444p | Self::Gbrp => &[(1, 0, 0), (1, 0, 0), (1, 0, 0)],
            Self::P010le | Self::P016le => &[(2, 0, 0), (4, 1, 1)],
            Self::Yuv420p10le => &[(2, 0, 0), (2, 1, 1), (2, 1, 1)],
            Self::Uyvy422 | Self::Rgb565le => &[(2, 0, 0)],
            Self::Rgb24 => &[(3, 0, 0)],
            Self::Rgba | Self::Rgbx | Self::Bgra | Self::Bgrx => &[(4, 0, 0)],
            Self::Rgb48le | Self::Xyz12le => &[(6, 0, 0)],
            Self::Gbrp10le | Self::Rgbp16 => &[(2, 0, 0), (2, 0, 0), (2, 0, 0)],
            Self::Rgba64 | Self::Bgra64 => &[(8, 0, 0)],
            Self::Rgbpf32 => &[(4, 0, 0), (4, 0, 0), (4, 0, 0)],
            Self::Bgraf32 => &[(16, 0, 0)],
            // Block formats: one opaque plane, block math in stride/height.
            Self::Bc1 | Self::Bc3 => &[(0, 0, 0)],
        }
    }

    /// Number of planes for this format. 0 for Unknown.
    pub fn plane_count(self) -> usize {
        self.planes().len()
    }

    /// Significant bits per component.
    pub fn bits_per_unit(self) -> u32 {
        match self {
            Self::Unknown => 0,
            Self::P010le | Self::Yuv420p10le | Self::Gbrp10le => 10,
            Self::Xyz12le => 12,
            Self::P016le | Self::Rgb48le | Self::Rgba64 | Self::Bgra64 | Self::Rgbp16 => 16,
            Self::Rgb565le => 16,
            Self::Rgbpf32 | Self::Bgraf32 => 32,
            _ => 8,
        }
    }

    /// Byte size of one addressable component unit.
    pub fn raw_unit_size(self) -> usize {
        match self {
            Self::Unknown => 0,
            Self::Rgbpf32 | Self::Bgraf32 => 4,
            _ => self.bits_per_unit().div_ceil(8) as usize,
        }
    }

    /// Components stored in separate planes (semi-planar counts as planar).
    pub fn is_planar(self) -> bool {
        self.plane_count() > 1
    }

    /// Floating-point components.
    pub fn is_float(self) -> bool {
        matches!(self, Self::Rgbpf32 | Self::Bgraf32)
    }

    /// Block-compressed format with opaque plane contents.
    pub fn is_compressed(self) -> bool {
        matches!(self, Self::Bc1 | Self::Bc3)
    }

    /// RGB-family format (packed or planar), as opposed to YUV.
    pub fn is_rgb(self) -> bool {
        matches!(
            self,
            Self::Rgb24
                | Self::Rgba
                | Self::Rgbx
                | Self::Bgra
                | Self::Bgrx
                | Self::Rgb565le
                | Self::Rgb48le
                | Self::Gbrp
                | Self::Gbrp10le
                | Self::Rgba64
                | Self::Bgra64
                | Self::Rgbp16
                | Self::Rgbpf32
                | Self::Bgraf32
        )
    }

    /// Full derived attribute set.
    pub fn classify(self) -> FormatInfo {
        if self == Self::Unknown {
            return FormatInfo::default();
        }
        FormatInfo {
            plane_count: self.plane_count(),
            bits_per_unit: self.bits_per_unit(),
            is_planar: self.is_planar(),
            is_float: self.is_float(),
            is_unsigned: !self.is_float(),
            raw_unit_size: self.raw_unit_size(),
        }
    }

    /// Width of `plane` for a frame `width` pixels wide.
    pub fn plane_width(self, width: u32, plane: usize) -> u32 {
        match self.planes().get(plane) {
            Some(&(_, ws, _)) => width >> ws,
            None => 0,
        }
    }

    /// Height of `plane` for a frame `height` pixels tall.
    pub fn plane_height(self, height: u32, plane: usize) -> u32 {
        if self.is_compressed() {
            // One row of 4x4 blocks per 4 pixel rows.
            return if plane == 0 { height.div_ceil(4) } else { 0 };
        }
        match self.planes().get(plane) {
            Some(&(_, _, hs)) => height >> hs,
            None => 0,
        }
    }

    /// Minimal (unpadded) stride in bytes for `plane`.
    pub fn min_stride(self, width: u32, plane: usize) -> usize {
        if self.is_compressed() {
            if plane != 0 {
                return 0;
            }
            let block = match self {
                Self::Bc1 => 8,
                _ => 16,
            };
            return width.div_ceil(4) as usize * block;
        }
        match self.planes().get(plane) {
            Some(&(bpp, _, _)) => self.plane_width(width, plane) as usize * bpp,
            None => 0,
        }
    }

    /// Byte size of `plane` at the minimal stride.
    pub fn plane_size(self, width: u32, height: u32, plane: usize) -> usize {
        self.min_stride(width, plane) * self.plane_height(height, plane) as usize
    }

    /// Total bytes needed for a whole frame at minimal strides.
    pub fn frame_size(self, width: u32, height: u32) -> usize {
        (0..self.plane_count())
            .map(|p| self.plane_size(width, height, p))
            .sum()
    }
}

/// Audio sample formats. `P` suffixes are planar (one plane per channel).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[non_exhaustive]
pub enum SampleFormat {
    /// Unknown/invalid format.
    #[default]
    Unknown,
    /// Unsigned 8-bit, packed
    U8,
    /// Signed 16-bit, packed
    S16,
    /// Signed 32-bit, packed
    S32,
    /// 32-bit float, packed
    F32,
    /// 64-bit float, packed
    F64,
    /// Unsigned 8-bit, planar
    U8p,
    /// Signed 16-bit, planar
    S16p,
    /// Signed 32-bit, planar
    S32p,
    /// 32-bit float, planar
    F32p,
    /// 64-bit float, planar
    F64p,
}

impl SampleFormat {
    /// All formats the catalog knows, Unknown excluded.
    pub const ALL: [SampleFormat; 10] = [
        Self::U8,
        Self::S16,
        Self::S32,
        Self::F32,
        Self::F64,
        Self::U8p,
        Self::S16p,
        Self::S32p,
        Self::F32p,
        Self::F64p,
    ];

    /// Byte size of one sample.
    pub fn bytes_per_sample(self) -> usize {
        match self {
            Self::Unknown => 0,
            Self::U8 | Self::U8p => 1,
            Self::S16 | Self::S16p => 2,
            Self::S32 | Self::S32p | Self::F32 | Self::F32p => 4,
            Self::F64 | Self::F64p => 8,
        }
    }

    /// One plane per channel.
    pub fn is_planar(self) -> bool {
        matches!(self, Self::U8p | Self::S16p | Self::S32p | Self::F32p | Self::F64p)
    }

    /// Floating-point samples.
    pub fn is_float(self) -> bool {
        matches!(self, Self::F32 | Self::F64 | Self::F32p | Self::F64p)
    }

    /// Unsigned integer samples.
    pub fn is_unsigned(self) -> bool {
        matches!(self, Self::U8 | Self::U8p)
    }

    /// Plane count for a frame with `channels` channels.
    pub fn plane_count(self, channels: u16) -> usize {
        match self {
            Self::Unknown => 0,
            f if f.is_planar() => channels as usize,
            _ => 1,
        }
    }

    /// The packed counterpart of a planar format (identity for packed ones).
    pub fn packed(self) -> SampleFormat {
        match self {
            Self::U8p => Self::U8,
            Self::S16p => Self::S16,
            Self::S32p => Self::S32,
            Self::F32p => Self::F32,
            Self::F64p => Self::F64,
            other => other,
        }
    }

    /// Full derived attribute set.
    ///
    /// `plane_count` is 1 for packed formats and 0 for planar ones ("one per
    /// channel"); use [`SampleFormat::plane_count`] with the channel count.
    pub fn classify(self) -> FormatInfo {
        if self == Self::Unknown {
            return FormatInfo::default();
        }
        FormatInfo {
            plane_count: if self.is_planar() { 0 } else { 1 },
            bits_per_unit: self.bytes_per_sample() as u32 * 8,
            is_planar: self.is_planar(),
            is_float: self.is_float(),
            is_unsigned: self.is_unsigned(),
            raw_unit_size: self.bytes_per_sample(),
        }
    }
}

/// Audio channel layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ChannelLayout {
    /// Single channel
    Mono,
    /// Left and right channels
    #[default]
    Stereo,
    /// 5.1 surround (FL, FR, FC, LFE, BL, BR)
    Surround5_1,
    /// 7.1 surround (FL, FR, FC, LFE, BL, BR, SL, SR)
    Surround7_1,
}

impl ChannelLayout {
    /// Number of channels.
    pub const fn channels(self) -> u16 {
        match self {
            Self::Mono => 1,
            Self::Stereo => 2,
            Self::Surround5_1 => 6,
            Self::Surround7_1 => 8,
        }
    }

    /// Closest layout for a channel count.
    pub const fn from_count(count: u16) -> Self {
        match count {
            1 => Self::Mono,
            2 => Self::Stereo,
            3..=6 => Self::Surround5_1,
            _ => Self::Surround7_1,
        }
    }
}
