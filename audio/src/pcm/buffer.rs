//! Audio sample buffers.

use std::time::Duration;

use super::{ChannelLayout, SampleFormat};
use crate::error::{ResamplerError, Result};

/// A block of audio samples with a fixed layout, rate and format.
///
/// The buffer has a capacity (`max_samples` frames) and a count of valid
/// frames (`num_samples`). Packed formats store all channels interleaved in
/// a single plane; planar formats store one plane per channel.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    layout: ChannelLayout,
    sample_rate: u32,
    format: SampleFormat,
    max_samples: usize,
    num_samples: usize,
    planes: Vec<Vec<u8>>,
    pts: Option<i64>,
    complete: bool,
}

impl AudioBuffer {
    /// Creates a zeroed buffer able to hold `max_samples` frames.
    pub fn new(
        max_samples: usize,
        sample_rate: u32,
        layout: ChannelLayout,
        format: SampleFormat,
    ) -> Result<Self> {
        check_rate(sample_rate)?;
        let channels = layout.channel_count();
        let bps = format.bytes_per_sample();
        let planes = if format.is_planar() {
            vec![vec![0u8; max_samples * bps]; channels]
        } else {
            vec![vec![0u8; max_samples * bps * channels]]
        };
        Ok(Self {
            layout,
            sample_rate,
            format,
            max_samples,
            num_samples: 0,
            planes,
            pts: None,
            complete: false,
        })
    }

    /// Wraps interleaved bytes of a packed format. All frames are valid.
    pub fn from_packed(
        data: Vec<u8>,
        sample_rate: u32,
        layout: ChannelLayout,
        format: SampleFormat,
    ) -> Result<Self> {
        check_rate(sample_rate)?;
        if format.is_planar() {
            return Err(ResamplerError::invalid(format!(
                "{} is planar, expected a packed format",
                format
            )));
        }
        let frame_bytes = format.bytes_per_sample() * layout.channel_count();
        if data.len() % frame_bytes != 0 {
            return Err(ResamplerError::invalid(format!(
                "{} bytes is not a whole number of {}-byte frames",
                data.len(),
                frame_bytes
            )));
        }
        let frames = data.len() / frame_bytes;
        Ok(Self {
            layout,
            sample_rate,
            format,
            max_samples: frames,
            num_samples: frames,
            planes: vec![data],
            pts: None,
            complete: true,
        })
    }

    /// Wraps one byte plane per channel of a planar format. All frames are valid.
    pub fn from_planes(
        planes: Vec<Vec<u8>>,
        sample_rate: u32,
        layout: ChannelLayout,
        format: SampleFormat,
    ) -> Result<Self> {
        check_rate(sample_rate)?;
        if !format.is_planar() {
            return Err(ResamplerError::invalid(format!(
                "{} is packed, expected a planar format",
                format
            )));
        }
        if planes.len() != layout.channel_count() {
            return Err(ResamplerError::invalid(format!(
                "{} planes given for {} layout",
                planes.len(),
                layout
            )));
        }
        let bps = format.bytes_per_sample();
        let len = planes[0].len();
        if len % bps != 0 || planes.iter().any(|p| p.len() != len) {
            return Err(ResamplerError::invalid("planes differ in length or are misaligned"));
        }
        let frames = len / bps;
        Ok(Self {
            layout,
            sample_rate,
            format,
            max_samples: frames,
            num_samples: frames,
            planes,
            pts: None,
            complete: true,
        })
    }

    /// Creates a packed s16 buffer from interleaved samples.
    pub fn from_i16(samples: &[i16], sample_rate: u32, layout: ChannelLayout) -> Result<Self> {
        let mut data = Vec::with_capacity(samples.len() * 2);
        for sample in samples {
            data.extend_from_slice(&sample.to_le_bytes());
        }
        Self::from_packed(data, sample_rate, layout, SampleFormat::S16)
    }

    pub fn layout(&self) -> ChannelLayout {
        self.layout
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn format(&self) -> SampleFormat {
        self.format
    }

    pub fn channels(&self) -> usize {
        self.layout.channel_count()
    }

    /// Number of valid frames.
    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    /// Capacity in frames.
    pub fn max_samples(&self) -> usize {
        self.max_samples
    }

    pub fn set_num_samples(&mut self, n: usize) -> Result<()> {
        if n > self.max_samples {
            return Err(ResamplerError::invalid(format!(
                "{} samples exceeds buffer capacity {}",
                n, self.max_samples
            )));
        }
        self.num_samples = n;
        Ok(())
    }

    /// Presentation timestamp in `1/sample_rate` units.
    pub fn pts(&self) -> Option<i64> {
        self.pts
    }

    pub fn set_pts(&mut self, pts: Option<i64>) {
        self.pts = pts;
    }

    /// True once the buffer holds data ready for consumption.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn set_complete(&mut self, complete: bool) {
        self.complete = complete;
    }

    pub fn plane_count(&self) -> usize {
        self.planes.len()
    }

    pub fn plane(&self, index: usize) -> Option<&[u8]> {
        self.planes.get(index).map(|p| p.as_slice())
    }

    pub fn plane_mut(&mut self, index: usize) -> Option<&mut [u8]> {
        self.planes.get_mut(index).map(|p| p.as_mut_slice())
    }

    /// Valid bytes of a packed buffer, or of the first plane of a planar one.
    pub fn data(&self) -> &[u8] {
        let len = if self.format.is_planar() {
            self.num_samples * self.format.bytes_per_sample()
        } else {
            self.num_samples * self.format.bytes_per_sample() * self.channels()
        };
        &self.planes[0][..len]
    }

    /// Valid samples of a packed s16 buffer, interleaved.
    pub fn to_i16(&self) -> Option<Vec<i16>> {
        if self.format != SampleFormat::S16 {
            return None;
        }
        Some(
            self.data()
                .chunks_exact(2)
                .map(|b| i16::from_le_bytes([b[0], b[1]]))
                .collect(),
        )
    }

    /// Playback duration of the valid frames.
    pub fn duration(&self) -> Duration {
        Duration::from_nanos(self.num_samples as u64 * 1_000_000_000 / self.sample_rate as u64)
    }

    /// Decodes the valid frames into one `f64` vector per channel.
    pub(crate) fn read_planar(&self) -> Vec<Vec<f64>> {
        let channels = self.channels();
        let bps = self.format.bytes_per_sample();
        let n = self.num_samples;
        let mut out = vec![Vec::with_capacity(n); channels];
        if self.format.is_planar() {
            for (ch, plane) in self.planes.iter().enumerate() {
                out[ch].extend(plane[..n * bps].chunks_exact(bps).map(|b| self.format.decode(b)));
            }
        } else {
            let frames = self.planes[0][..n * bps * channels].chunks_exact(bps * channels);
            for frame in frames {
                for (ch, b) in frame.chunks_exact(bps).enumerate() {
                    out[ch].push(self.format.decode(b));
                }
            }
        }
        out
    }

    /// Encodes `count` frames from `src` (one iterator per channel) starting
    /// at frame 0, and marks them valid.
    pub(crate) fn write_planar<I>(&mut self, src: Vec<I>, count: usize)
    where
        I: Iterator<Item = f64>,
    {
        let channels = self.channels();
        let bps = self.format.bytes_per_sample();
        let count = count.min(self.max_samples);
        for (ch, samples) in src.into_iter().enumerate().take(channels) {
            for (i, v) in samples.take(count).enumerate() {
                let (plane, offset) = if self.format.is_planar() {
                    (ch, i * bps)
                } else {
                    (0, (i * channels + ch) * bps)
                };
                self.format.encode(v, &mut self.planes[plane][offset..offset + bps]);
            }
        }
        self.num_samples = count;
    }
}

fn check_rate(sample_rate: u32) -> Result<()> {
    if sample_rate == 0 {
        return Err(ResamplerError::invalid("sample rate must be positive"));
    }
    Ok(())
}
