//! Host-side frame conversion.
//!
//! `to()` produces a new, independent, host-resident frame in the requested
//! format/geometry. When nothing changes and the source is already host
//! resident it returns a frame sharing the same storage — a documented
//! non-copying contract, not merely an optimization.

use crate::error::{FrameError, Result};
use crate::format::{PixelFormat, SampleFormat};
use crate::frame::{AudioFrame, MediaFrame, VideoFrame};

impl VideoFrame {
    /// Convert to `format` at `size`, `None` meaning "same as current".
    ///
    /// Returns a frame sharing this frame's storage when format and size are
    /// unchanged and the source is host-resident (callers may rely on plane
    /// pointer identity). Compressed and unknown formats, and frames without
    /// a host mapping, are rejected.
    pub fn to(&self, format: Option<PixelFormat>, size: Option<(u32, u32)>) -> Result<VideoFrame> {
        if self.is_eos() {
            return Err(FrameError::Eos);
        }
        let target_format = format.unwrap_or_else(|| self.format());
        let (width, height) = size.unwrap_or((self.width(), self.height()));

        if target_format == self.format()
            && width == self.width()
            && height == self.height()
            && self.is_host_resident()
        {
            return Ok(self.clone());
        }

        if !self.is_host_resident() {
            return Err(FrameError::UnsupportedConversion(
                "source frame has no host mapping".into(),
            ));
        }
        for fmt in [self.format(), target_format] {
            if fmt == PixelFormat::Unknown || fmt.is_compressed() {
                return Err(FrameError::UnsupportedConversion(format!(
                    "opaque format {fmt:?}"
                )));
            }
        }

        // Rescale in the source format first, then reinterpret the format at
        // the target geometry.
        let scaled = if width != self.width() || height != self.height() {
            rescale_nearest(self, width, height)?
        } else {
            self.clone()
        };
        if target_format == scaled.format() {
            return Ok(scaled);
        }
        convert_format(&scaled, target_format)
    }
}

fn rescale_nearest(src: &VideoFrame, width: u32, height: u32) -> Result<VideoFrame> {
    let format = src.format();
    let mut out = VideoFrame::new(width, height, format);
    let layout = out.set_buffers(None, &[])?;
    let mut planes: Vec<Vec<u8>> = Vec::with_capacity(src.plane_count());
    for plane in 0..src.plane_count() {
        let data = src
            .plane_data(plane)
            .ok_or_else(|| FrameError::LayoutMismatch(format!("plane {plane} unset")))?;
        let src_stride = src.bytes_per_line(plane);
        let (sw, sh) = (src.plane_width(plane), src.plane_height(plane));
        let (dw, dh) = (
            format.plane_width(width, plane),
            format.plane_height(height, plane),
        );
        // Pixel size comes from the format; the source stride may carry
        // alignment padding and is only a row offset here.
        let bpp = (format.min_stride(src.width(), plane) / sw.max(1) as usize).max(1);
        let dst_stride = layout.strides[plane];
        let mut dst = vec![0u8; dst_stride * dh as usize];
        for dy in 0..dh {
            let sy = (dy as u64 * sh as u64 / dh.max(1) as u64) as usize;
            let src_row = &data[sy * src_stride..];
            let dst_row = &mut dst[dy as usize * dst_stride..];
            for dx in 0..dw as usize {
                let sx = (dx as u64 * sw as u64 / dw.max(1) as u64) as usize;
                dst_row[dx * bpp..(dx + 1) * bpp]
                    .copy_from_slice(&src_row[sx * bpp..(sx + 1) * bpp]);
            }
        }
        planes.push(dst);
    }
    let sources: Vec<&[u8]> = planes.iter().map(Vec::as_slice).collect();
    out.set_buffers(Some(&sources), &layout.strides)?;
    copy_timestamp(src, &mut out);
    Ok(out)
}

/// Byte index of R, G, B and (optionally) A within one packed pixel.
fn rgb_offsets(format: PixelFormat) -> Option<([usize; 3], Option<usize>)> {
    match format {
        PixelFormat::Rgb24 => Some(([0, 1, 2], None)),
        PixelFormat::Rgba => Some(([0, 1, 2], Some(3))),
        PixelFormat::Rgbx => Some(([0, 1, 2], None)),
        PixelFormat::Bgra => Some(([2, 1, 0], Some(3))),
        PixelFormat::Bgrx => Some(([2, 1, 0], None)),
        _ => None,
    }
}

fn convert_format(src: &VideoFrame, target: PixelFormat) -> Result<VideoFrame> {
    let source = src.format();
    let (width, height) = (src.width(), src.height());
    let mut out = VideoFrame::new(width, height, target);
    let layout = out.set_buffers(None, &[])?;

    match (source, target) {
        // Packed RGB permutations: per-pixel channel shuffle.
        (s, t) if rgb_offsets(s).is_some() && rgb_offsets(t).is_some() => {
            let (s_off, s_alpha) = rgb_offsets(s).unwrap();
            let (t_off, t_alpha) = rgb_offsets(t).unwrap();
            let s_bpp = s.min_stride(1, 0);
            let t_bpp = t.min_stride(1, 0);
            let data = src
                .plane_data(0)
                .ok_or_else(|| FrameError::LayoutMismatch("plane 0 unset".into()))?;
            let s_stride = src.bytes_per_line(0);
            let mut dst = vec![0u8; layout.total];
            for y in 0..height as usize {
                let src_row = &data[y * s_stride..];
                let dst_row = &mut dst[y * layout.strides[0]..];
                for x in 0..width as usize {
                    let sp = &src_row[x * s_bpp..x * s_bpp + s_bpp];
                    let dp = &mut dst_row[x * t_bpp..x * t_bpp + t_bpp];
                    for c in 0..3 {
                        dp[t_off[c]] = sp[s_off[c]];
                    }
                    if let Some(ta) = t_alpha {
                        dp[ta] = s_alpha.map_or(0xff, |sa| sp[sa]);
                    }
                }
            }
            out.set_buffers(Some(&[&dst]), &layout.strides)?;
        }
        // Planar 4:2:0 to semi-planar: interleave U and V.
        (PixelFormat::Yuv420p, PixelFormat::Nv12) => {
            let y = plane_bytes(src, 0)?;
            let u = plane_bytes(src, 1)?;
            let v = plane_bytes(src, 2)?;
            let (cw, ch) = (width as usize / 2, height as usize / 2);
            let u_stride = src.bytes_per_line(1);
            let v_stride = src.bytes_per_line(2);
            let mut uv = vec![0u8; layout.strides[1] * ch];
            for row in 0..ch {
                for col in 0..cw {
                    uv[row * layout.strides[1] + col * 2] = u[row * u_stride + col];
                    uv[row * layout.strides[1] + col * 2 + 1] = v[row * v_stride + col];
                }
            }
            out.set_buffers(Some(&[y, &uv]), &layout.strides)?;
        }
        // Semi-planar back to planar: deinterleave.
        (PixelFormat::Nv12, PixelFormat::Yuv420p) => {
            let y = plane_bytes(src, 0)?;
            let uv = plane_bytes(src, 1)?;
            let (cw, ch) = (width as usize / 2, height as usize / 2);
            let uv_stride = src.bytes_per_line(1);
            let mut u = vec![0u8; layout.strides[1] * ch];
            let mut v = vec![0u8; layout.strides[2] * ch];
            for row in 0..ch {
                for col in 0..cw {
                    u[row * layout.strides[1] + col] = uv[row * uv_stride + col * 2];
                    v[row * layout.strides[2] + col] = uv[row * uv_stride + col * 2 + 1];
                }
            }
            out.set_buffers(Some(&[y, &u, &v]), &layout.strides)?;
        }
        // 8-bit RGBA to 16-bit and back.
        (PixelFormat::Rgba, PixelFormat::Rgba64) => {
            let data = plane_bytes(src, 0)?;
            let s_stride = src.bytes_per_line(0);
            let mut wide: Vec<u16> = vec![0; layout.strides[0] / 2 * height as usize];
            let d_units = layout.strides[0] / 2;
            for y in 0..height as usize {
                for x in 0..width as usize * 4 {
                    let v = data[y * s_stride + x] as u16;
                    wide[y * d_units + x] = v << 8 | v;
                }
            }
            let bytes: &[u8] = bytemuck::cast_slice(&wide);
            out.set_buffers(Some(&[bytes]), &layout.strides)?;
        }
        (PixelFormat::Rgba64, PixelFormat::Rgba) => {
            let data = plane_bytes(src, 0)?;
            let s_stride = src.bytes_per_line(0);
            let mut narrow = vec![0u8; layout.strides[0] * height as usize];
            for y in 0..height as usize {
                for x in 0..width as usize * 4 {
                    let lo = data[y * s_stride + x * 2] as u16;
                    let hi = data[y * s_stride + x * 2 + 1] as u16;
                    narrow[y * layout.strides[0] + x] = ((hi << 8 | lo) >> 8) as u8;
                }
            }
            out.set_buffers(Some(&[&narrow]), &layout.strides)?;
        }
        (s, t) => {
            return Err(FrameError::UnsupportedConversion(format!(
                "{s:?} -> {t:?}"
            )));
        }
    }
    copy_timestamp(src, &mut out);
    Ok(out)
}

fn plane_bytes(frame: &VideoFrame, plane: usize) -> Result<&[u8]> {
    frame
        .plane_data(plane)
        .ok_or_else(|| FrameError::LayoutMismatch(format!("plane {plane} unset")))
}

fn copy_timestamp(src: &VideoFrame, dst: &mut VideoFrame) {
    if let Some(t) = src.timestamp() {
        dst.set_timestamp(t);
    }
}

impl AudioFrame {
    /// Convert to `format`/`channels`/`sample_rate`, `None` meaning "same".
    ///
    /// Same non-copying short-circuit rule as the video variant. Conversion
    /// goes through f64 samples: format change, simple channel fold/spread,
    /// nearest-index resample.
    pub fn to(
        &self,
        format: Option<SampleFormat>,
        channels: Option<u16>,
        sample_rate: Option<u32>,
    ) -> Result<AudioFrame> {
        if self.is_eos() {
            return Err(FrameError::Eos);
        }
        let target_format = format.unwrap_or_else(|| self.format());
        let target_channels = channels.unwrap_or_else(|| self.channels());
        let target_rate = sample_rate.unwrap_or_else(|| self.sample_rate());

        if target_format == self.format()
            && target_channels == self.channels()
            && target_rate == self.sample_rate()
            && self.is_host_resident()
        {
            return Ok(self.clone());
        }
        if !self.is_host_resident() {
            return Err(FrameError::UnsupportedConversion(
                "source frame has no host mapping".into(),
            ));
        }
        if self.format() == SampleFormat::Unknown || target_format == SampleFormat::Unknown {
            return Err(FrameError::UnsupportedConversion("unknown sample format".into()));
        }
        if target_channels == 0 || target_rate == 0 {
            return Err(FrameError::UnsupportedConversion(
                "zero channels or sample rate".into(),
            ));
        }

        // Decode to interleaved f64.
        let src_samples = self.samples_per_channel();
        let src_channels = self.channels() as usize;
        let mut interleaved = vec![0f64; src_samples * src_channels];
        for ch in 0..src_channels {
            for s in 0..src_samples {
                interleaved[s * src_channels + ch] = self.read_sample(ch, s)?;
            }
        }

        // Channel fold/spread.
        let tc = target_channels as usize;
        let mixed: Vec<f64> = if tc == src_channels {
            interleaved
        } else {
            let mut mixed = vec![0f64; src_samples * tc];
            for s in 0..src_samples {
                let frame = &interleaved[s * src_channels..(s + 1) * src_channels];
                for (ch, slot) in mixed[s * tc..(s + 1) * tc].iter_mut().enumerate() {
                    *slot = if tc < src_channels && tc == 1 {
                        frame.iter().sum::<f64>() / src_channels as f64
                    } else {
                        frame[ch.min(src_channels - 1)]
                    };
                }
            }
            mixed
        };

        // Nearest-index resample.
        let dst_samples = if target_rate == self.sample_rate() {
            src_samples
        } else {
            (src_samples as u64 * target_rate as u64 / self.sample_rate().max(1) as u64) as usize
        };
        let mut out = AudioFrame::new(target_format, target_channels, target_rate);
        out.set_samples_per_channel(dst_samples);
        let bps = target_format.bytes_per_sample();
        let mut planes: Vec<Vec<u8>> = if target_format.is_planar() {
            vec![vec![0u8; dst_samples * bps]; tc]
        } else {
            vec![vec![0u8; dst_samples * bps * tc]]
        };
        for ds in 0..dst_samples {
            let ss = (ds as u64 * src_samples as u64 / dst_samples.max(1) as u64) as usize;
            for ch in 0..tc {
                let value = mixed[ss * tc + ch];
                let (plane, index) = if target_format.is_planar() {
                    (ch, ds)
                } else {
                    (0, ds * tc + ch)
                };
                write_sample(&mut planes[plane], index, target_format, value);
            }
        }
        let sources: Vec<&[u8]> = planes.iter().map(Vec::as_slice).collect();
        out.set_buffers(Some(&sources), planes[0].len())?;
        if let Some(t) = self.timestamp() {
            out.set_timestamp(t);
        }
        Ok(out)
    }

    /// One sample as f64 in [-1, 1], by channel and sample index.
    fn read_sample(&self, channel: usize, sample: usize) -> Result<f64> {
        let format = self.format();
        let bps = format.bytes_per_sample();
        let (plane, index) = if format.is_planar() {
            (channel, sample)
        } else {
            (0, sample * self.channels() as usize + channel)
        };
        let data = self
            .plane_data(plane)
            .ok_or_else(|| FrameError::LayoutMismatch(format!("plane {plane} unset")))?;
        let at = index * bps;
        if at + bps > data.len() {
            return Err(FrameError::LayoutMismatch("sample index out of range".into()));
        }
        let bytes = &data[at..at + bps];
        Ok(match format.packed() {
            SampleFormat::U8 => (bytes[0] as f64 - 128.0) / 128.0,
            SampleFormat::S16 => i16::from_le_bytes([bytes[0], bytes[1]]) as f64 / 32768.0,
            SampleFormat::S32 => {
                i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64
                    / 2147483648.0
            }
            SampleFormat::F32 => {
                f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64
            }
            SampleFormat::F64 => f64::from_le_bytes(bytes.try_into().unwrap_or_default()),
            _ => 0.0,
        })
    }
}

fn write_sample(plane: &mut [u8], index: usize, format: SampleFormat, value: f64) {
    let bps = format.bytes_per_sample();
    let at = index * bps;
    let v = value.clamp(-1.0, 1.0);
    match format.packed() {
        SampleFormat::U8 => plane[at] = (v * 128.0 + 128.0).clamp(0.0, 255.0) as u8,
        SampleFormat::S16 => {
            let s = (v * 32768.0).clamp(-32768.0, 32767.0) as i16;
            plane[at..at + 2].copy_from_slice(&s.to_le_bytes());
        }
        SampleFormat::S32 => {
            let s = (v * 2147483648.0).clamp(-2147483648.0, 2147483647.0) as i32;
            plane[at..at + 4].copy_from_slice(&s.to_le_bytes());
        }
        SampleFormat::F32 => plane[at..at + 4].copy_from_slice(&(v as f32).to_le_bytes()),
        SampleFormat::F64 => plane[at..at + 8].copy_from_slice(&v.to_le_bytes()),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgba_frame(width: u32, height: u32) -> VideoFrame {
        let mut frame = VideoFrame::new(width, height, PixelFormat::Rgba);
        let data: Vec<u8> = (0..(width * height * 4) as usize)
            .map(|i| (i % 253) as u8)
            .collect();
        frame.set_buffers(Some(&[&data]), &[]).unwrap();
        frame.set_timestamp(0.25);
        frame
    }

    #[test]
    fn unchanged_conversion_shares_storage() {
        let frame = rgba_frame(16, 16);
        let same = frame.to(None, None).unwrap();
        assert_eq!(
            frame.plane_data(0).unwrap().as_ptr(),
            same.plane_data(0).unwrap().as_ptr(),
            "short-circuit must not copy"
        );
        // Explicit same-as-current arguments short-circuit too.
        let same = frame.to(Some(PixelFormat::Rgba), Some((16, 16))).unwrap();
        assert_eq!(
            frame.plane_data(0).unwrap().as_ptr(),
            same.plane_data(0).unwrap().as_ptr()
        );
    }

    #[test]
    fn rgba_to_bgra_swaps_channels() {
        let mut frame = VideoFrame::new(2, 1, PixelFormat::Rgba);
        frame
            .set_buffers(Some(&[&[1u8, 2, 3, 4, 5, 6, 7, 8][..]]), &[])
            .unwrap();
        let bgra = frame.to(Some(PixelFormat::Bgra), None).unwrap();
        assert_eq!(bgra.plane_data(0).unwrap(), &[3, 2, 1, 4, 7, 6, 5, 8]);
        // Pointer differs: a real copy happened.
        assert_ne!(
            frame.plane_data(0).unwrap().as_ptr(),
            bgra.plane_data(0).unwrap().as_ptr()
        );
    }

    #[test]
    fn rgb24_to_rgba_fills_opaque_alpha() {
        let mut frame = VideoFrame::new(1, 1, PixelFormat::Rgb24);
        frame.set_buffers(Some(&[&[10u8, 20, 30][..]]), &[]).unwrap();
        let rgba = frame.to(Some(PixelFormat::Rgba), None).unwrap();
        assert_eq!(rgba.plane_data(0).unwrap(), &[10, 20, 30, 255]);
    }

    #[test]
    fn yuv420p_nv12_round_trip() {
        let mut frame = VideoFrame::new(4, 4, PixelFormat::Yuv420p);
        let y: Vec<u8> = (0..16).collect();
        let u = vec![100u8, 101, 102, 103];
        let v = vec![200u8, 201, 202, 203];
        frame.set_buffers(Some(&[&y, &u, &v]), &[]).unwrap();

        let nv12 = frame.to(Some(PixelFormat::Nv12), None).unwrap();
        assert_eq!(
            nv12.plane_data(1).unwrap(),
            &[100, 200, 101, 201, 102, 202, 103, 203]
        );

        let back = nv12.to(Some(PixelFormat::Yuv420p), None).unwrap();
        assert_eq!(back.plane_data(0).unwrap(), y.as_slice());
        assert_eq!(back.plane_data(1).unwrap(), u.as_slice());
        assert_eq!(back.plane_data(2).unwrap(), v.as_slice());
    }

    #[test]
    fn nearest_rescale_halves_dimensions() {
        let frame = rgba_frame(8, 8);
        let small = frame.to(None, Some((4, 4))).unwrap();
        assert_eq!(small.width(), 4);
        assert_eq!(small.plane_data(0).unwrap().len(), 4 * 4 * 4);
        // Timestamp carried through the conversion.
        assert_eq!(small.timestamp(), Some(0.25));
    }

    #[test]
    fn rescale_reads_padded_strides_correctly() {
        // 60*3 = 180 minimal; rows padded to 240 bytes.
        let mut frame = VideoFrame::new(60, 4, PixelFormat::Rgb24);
        let src: Vec<u8> = (0..240 * 4).map(|i| (i % 251) as u8).collect();
        frame.set_buffers(Some(&[&src]), &[240]).unwrap();
        assert_eq!(frame.bytes_per_line(0), 240);

        let small = frame.to(None, Some((30, 2))).unwrap();
        let out = small.plane_data(0).unwrap();
        assert_eq!(out.len(), 30 * 3 * 2);
        // Nearest sampling picks source pixel (2x, 2y); padding bytes past
        // column 60 must never leak into the output.
        assert_eq!(&out[0..3], &src[0..3]);
        assert_eq!(&out[3..6], &src[6..9]);
        assert_eq!(&out[90..93], &src[480..483]);
    }

    #[test]
    fn rgba64_widen_and_narrow() {
        let mut frame = VideoFrame::new(1, 1, PixelFormat::Rgba);
        frame
            .set_buffers(Some(&[&[0x00u8, 0x80, 0xff, 0x40][..]]), &[])
            .unwrap();
        let wide = frame.to(Some(PixelFormat::Rgba64), None).unwrap();
        let bytes = wide.plane_data(0).unwrap();
        assert_eq!(&bytes[2..4], &[0x80, 0x80]); // 0x80 -> 0x8080 LE
        let back = wide.to(Some(PixelFormat::Rgba), None).unwrap();
        assert_eq!(back.plane_data(0).unwrap(), &[0x00, 0x80, 0xff, 0x40]);
    }

    #[test]
    fn compressed_formats_are_rejected() {
        let frame = rgba_frame(8, 8);
        let err = frame.to(Some(PixelFormat::Bc1), None).unwrap_err();
        assert!(matches!(err, FrameError::UnsupportedConversion(_)));
        let err = frame.to(Some(PixelFormat::Unknown), None).unwrap_err();
        assert!(matches!(err, FrameError::UnsupportedConversion(_)));
    }

    #[test]
    fn eos_conversion_fails_cleanly() {
        let frame = VideoFrame::eos();
        assert!(matches!(frame.to(None, None), Err(FrameError::Eos)));
        let audio = AudioFrame::eos();
        assert!(matches!(audio.to(None, None, None), Err(FrameError::Eos)));
    }

    #[test]
    fn audio_same_parameters_share_storage() {
        let mut frame = AudioFrame::new(SampleFormat::S16, 2, 48_000);
        frame.set_buffers(None, 1024).unwrap();
        let same = frame.to(None, None, None).unwrap();
        assert_eq!(
            frame.plane_data(0).unwrap().as_ptr(),
            same.plane_data(0).unwrap().as_ptr()
        );
    }

    #[test]
    fn s16_to_f32_scales_samples() {
        let mut frame = AudioFrame::new(SampleFormat::S16, 1, 8000);
        let samples: [i16; 4] = [0, 16384, -16384, 32767];
        let mut bytes = Vec::new();
        for s in samples {
            bytes.extend_from_slice(&s.to_le_bytes());
        }
        frame.set_buffers(Some(&[&bytes]), 0).unwrap();
        assert_eq!(frame.samples_per_channel(), 4);

        let f32_frame = frame.to(Some(SampleFormat::F32), None, None).unwrap();
        let data = f32_frame.plane_data(0).unwrap();
        let v1 = f32::from_le_bytes([data[4], data[5], data[6], data[7]]);
        assert!((v1 - 0.5).abs() < 1e-3);
    }

    #[test]
    fn packed_to_planar_audio() {
        let mut frame = AudioFrame::new(SampleFormat::S16, 2, 8000);
        // L = 1000, R = -1000, two sample frames.
        let mut bytes = Vec::new();
        for s in [1000i16, -1000, 1000, -1000] {
            bytes.extend_from_slice(&s.to_le_bytes());
        }
        frame.set_buffers(Some(&[&bytes]), 0).unwrap();

        let planar = frame.to(Some(SampleFormat::S16p), None, None).unwrap();
        assert_eq!(planar.plane_count(), 2);
        let left = planar.plane_data(0).unwrap();
        let right = planar.plane_data(1).unwrap();
        assert_eq!(i16::from_le_bytes([left[0], left[1]]), 1000);
        assert_eq!(i16::from_le_bytes([right[0], right[1]]), -1000);
    }

    #[test]
    fn stereo_to_mono_folds_channels() {
        let mut frame = AudioFrame::new(SampleFormat::F32, 2, 8000);
        let mut bytes = Vec::new();
        for s in [0.5f32, -0.5, 1.0, 0.0] {
            bytes.extend_from_slice(&s.to_le_bytes());
        }
        frame.set_buffers(Some(&[&bytes]), 0).unwrap();

        let mono = frame.to(None, Some(1), None).unwrap();
        let data = mono.plane_data(0).unwrap();
        let first = f32::from_le_bytes([data[0], data[1], data[2], data[3]]);
        let second = f32::from_le_bytes([data[4], data[5], data[6], data[7]]);
        assert!((first - 0.0).abs() < 1e-6);
        assert!((second - 0.5).abs() < 1e-6);
    }
}
