//! Sample-rate conversion backed by rubato.

use rubato::{
    FastFixedIn, PolynomialDegree, Resampler as RubatoResampler, SincFixedIn,
    SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use tracing::{debug, trace};

use super::fifo::SampleFifo;
use super::options::{Quality, ResamplerOptions};
use crate::error::{ResamplerError, Result};

/// Enum wrapper for rubato resamplers (the rubato trait is not object-safe).
enum Interpolator {
    Poly(FastFixedIn<f64>),
    Sinc(SincFixedIn<f64>),
}

impl Interpolator {
    fn new(ratio: f64, opts: &ResamplerOptions, channels: usize) -> Result<Self> {
        let max_rel = opts.max_compensation_ratio;
        let chunk = opts.chunk_size;
        let interpolator = match opts.quality {
            Quality::Fast => Interpolator::Poly(FastFixedIn::new(
                ratio,
                max_rel,
                PolynomialDegree::Cubic,
                chunk,
                channels,
            )?),
            Quality::Normal => Interpolator::Sinc(SincFixedIn::new(
                ratio,
                max_rel,
                SincInterpolationParameters {
                    sinc_len: 64,
                    f_cutoff: 0.95,
                    interpolation: SincInterpolationType::Linear,
                    oversampling_factor: 128,
                    window: WindowFunction::BlackmanHarris2,
                },
                chunk,
                channels,
            )?),
            Quality::High => Interpolator::Sinc(SincFixedIn::new(
                ratio,
                max_rel,
                SincInterpolationParameters {
                    sinc_len: 256,
                    f_cutoff: 0.95,
                    interpolation: SincInterpolationType::Cubic,
                    oversampling_factor: 256,
                    window: WindowFunction::BlackmanHarris2,
                },
                chunk,
                channels,
            )?),
        };
        Ok(interpolator)
    }

    fn process_into_buffer(
        &mut self,
        input: &[&[f64]],
        output: &mut [&mut [f64]],
    ) -> std::result::Result<(usize, usize), rubato::ResampleError> {
        match self {
            Self::Poly(r) => r.process_into_buffer(input, output, None),
            Self::Sinc(r) => r.process_into_buffer(input, output, None),
        }
    }

    fn input_frames_next(&self) -> usize {
        match self {
            Self::Poly(r) => r.input_frames_next(),
            Self::Sinc(r) => r.input_frames_next(),
        }
    }

    fn output_frames_max(&self) -> usize {
        match self {
            Self::Poly(r) => r.output_frames_max(),
            Self::Sinc(r) => r.output_frames_max(),
        }
    }

    fn output_delay(&self) -> usize {
        match self {
            Self::Poly(r) => r.output_delay(),
            Self::Sinc(r) => r.output_delay(),
        }
    }

    fn set_resample_ratio_relative(
        &mut self,
        rel: f64,
    ) -> std::result::Result<(), rubato::ResampleError> {
        match self {
            Self::Poly(r) => r.set_resample_ratio_relative(rel, false),
            Self::Sinc(r) => r.set_resample_ratio_relative(rel, false),
        }
    }

    fn reset(&mut self) {
        match self {
            Self::Poly(r) => r.reset(),
            Self::Sinc(r) => r.reset(),
        }
    }
}

/// Chunked rate converter with input retention and delay accounting.
///
/// Input is accumulated until a full chunk is available. The filter's
/// leading delay is trimmed from the output, and output is released only up
/// to the number of frames the consumed input accounts for, so a flushed
/// stream of `n` input frames yields `round(n * ratio)` output frames.
pub(crate) struct RateConverter {
    interpolator: Interpolator,
    /// Nominal output / input rate.
    ratio: f64,
    /// Active drift compensation multiplier.
    relative: f64,
    max_relative: f64,
    /// Output frames left before `relative` reverts to 1.
    compensation_left: usize,
    input: SampleFifo,
    /// Converted frames not yet accounted for by consumed input.
    held: SampleFifo,
    /// Leading filter-delay frames still to discard.
    skip: usize,
    /// Output frames owed for all consumed input.
    expected: f64,
    emitted: u64,
    out_buf: Vec<Vec<f64>>,
}

impl RateConverter {
    pub fn new(
        in_rate: u32,
        out_rate: u32,
        channels: usize,
        opts: &ResamplerOptions,
    ) -> Result<Self> {
        let ratio = out_rate as f64 / in_rate as f64;
        let interpolator = Interpolator::new(ratio, opts, channels)?;
        let skip = interpolator.output_delay();
        let out_buf = vec![vec![0.0; interpolator.output_frames_max()]; channels];

        debug!(
            in_rate,
            out_rate,
            channels,
            quality = ?opts.quality,
            chunk_size = opts.chunk_size,
            filter_delay = skip,
            "rate converter created"
        );

        Ok(Self {
            interpolator,
            ratio,
            relative: 1.0,
            max_relative: opts.max_compensation_ratio,
            compensation_left: 0,
            input: SampleFifo::new(channels),
            held: SampleFifo::new(channels),
            skip,
            expected: 0.0,
            emitted: 0,
            out_buf,
        })
    }

    pub fn push(&mut self, planes: &[Vec<f64>], frames: usize) {
        self.input.push(planes, frames);
    }

    /// Input frames waiting for a full chunk.
    pub fn buffered_input(&self) -> usize {
        self.input.len()
    }

    /// Output frames owed for consumed input but not yet released.
    pub fn owed_output(&self) -> usize {
        (self.expected.round() as u64).saturating_sub(self.emitted) as usize
    }

    /// Converts every full chunk of buffered input into `out`.
    pub fn process(&mut self, out: &mut SampleFifo) -> Result<usize> {
        let chunk = self.interpolator.input_frames_next();
        let mut produced = 0;
        while self.input.len() >= chunk {
            produced += self.run_chunk(chunk, out)?;
        }
        Ok(produced)
    }

    /// Converts all remaining input, drains the filter tail into `out`, then
    /// resets for a new stream.
    pub fn flush(&mut self, out: &mut SampleFifo) -> Result<usize> {
        let mut produced = self.process(out)?;

        let pending = self.input.len();
        if pending > 0 {
            produced += self.run_chunk(pending, out)?;
        }

        let chunk_out = ((self.interpolator.input_frames_next() as f64 * self.ratio) as usize).max(1);
        let max_rounds = self.interpolator.output_delay() / chunk_out + 4;
        let target = self.expected.round() as u64;
        let mut rounds = 0;
        while self.emitted < target && rounds < max_rounds {
            produced += self.run_chunk(0, out)?;
            rounds += 1;
        }

        debug!(pending, produced, rounds, "rate converter flushed");
        self.reset();
        Ok(produced)
    }

    /// Stretches the next `distance + delta` output frames by
    /// `(distance + delta) / distance`. A zero delta cancels compensation.
    pub fn set_compensation(&mut self, delta: i32, distance: i32) -> Result<()> {
        if delta == 0 {
            self.apply_relative(1.0)?;
            self.compensation_left = 0;
            return Ok(());
        }

        let rel = (distance as f64 + delta as f64) / distance as f64;
        if rel > self.max_relative || rel < 1.0 / self.max_relative {
            return Err(ResamplerError::invalid(format!(
                "compensation ratio {:.4} outside 1/{1}..{1}",
                rel, self.max_relative
            )));
        }
        self.interpolator
            .set_resample_ratio_relative(rel)
            .map_err(|e| ResamplerError::invalid(format!("compensation rejected: {}", e)))?;
        self.relative = rel;
        self.compensation_left = (distance as i64 + delta as i64) as usize;
        debug!(delta, distance, rel, "drift compensation active");
        Ok(())
    }

    pub fn reset(&mut self) {
        self.interpolator.reset();
        self.input.clear();
        self.held.clear();
        self.skip = self.interpolator.output_delay();
        self.expected = 0.0;
        self.emitted = 0;
        self.relative = 1.0;
        self.compensation_left = 0;
    }

    fn apply_relative(&mut self, rel: f64) -> Result<()> {
        if self.relative != rel {
            self.interpolator.set_resample_ratio_relative(rel)?;
            self.relative = rel;
        }
        Ok(())
    }

    /// Runs one chunk holding `real` input frames, zero-padded to the chunk size.
    fn run_chunk(&mut self, real: usize, out: &mut SampleFifo) -> Result<usize> {
        let chunk = self.interpolator.input_frames_next();
        let mut frames = self.input.pop(real);
        for ch in frames.iter_mut() {
            ch.resize(chunk, 0.0);
        }

        let max_out = self.interpolator.output_frames_max();
        for buf in self.out_buf.iter_mut() {
            if buf.len() < max_out {
                buf.resize(max_out, 0.0);
            }
        }

        let (_, out_len) = {
            let input_refs: Vec<&[f64]> = frames.iter().map(|v| v.as_slice()).collect();
            let mut output_refs: Vec<&mut [f64]> =
                self.out_buf.iter_mut().map(|v| v.as_mut_slice()).collect();
            self.interpolator
                .process_into_buffer(&input_refs, &mut output_refs)?
        };

        self.expected += real as f64 * self.ratio * self.relative;

        let skip = self.skip.min(out_len);
        self.skip -= skip;
        let kept: Vec<&[f64]> = self.out_buf.iter().map(|b| &b[skip..out_len]).collect();
        self.held.push(&kept, out_len - skip);

        let allowed = self.owed_output();
        let released = self.held.move_to(out, allowed);
        self.emitted += released as u64;

        if self.compensation_left > 0 {
            self.compensation_left = self.compensation_left.saturating_sub(released);
            if self.compensation_left == 0 {
                self.apply_relative(1.0)?;
                debug!("drift compensation finished");
            }
        }

        trace!(real, out_len, skip, released, held = self.held.len(), "chunk converted");
        Ok(released)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(frames: usize, rate: f64, freq: f64) -> Vec<f64> {
        (0..frames)
            .map(|i| (2.0 * std::f64::consts::PI * freq * i as f64 / rate).sin() * 0.5)
            .collect()
    }

    fn convert_all(in_rate: u32, out_rate: u32, frames: usize, opts: &ResamplerOptions) -> usize {
        let mut conv = RateConverter::new(in_rate, out_rate, 1, opts).unwrap();
        let mut out = SampleFifo::new(1);
        let input = vec![sine(frames, in_rate as f64, 440.0)];
        for start in (0..frames).step_by(300) {
            let end = (start + 300).min(frames);
            conv.push(&[input[0][start..end].to_vec()], end - start);
            conv.process(&mut out).unwrap();
        }
        conv.flush(&mut out).unwrap();
        out.len()
    }

    #[test]
    fn test_retains_partial_chunk() {
        let opts = ResamplerOptions::default().with_chunk_size(256);
        let mut conv = RateConverter::new(16000, 48000, 1, &opts).unwrap();
        let mut out = SampleFifo::new(1);
        conv.push(&[vec![0.0; 100]], 100);
        assert_eq!(conv.process(&mut out).unwrap(), 0);
        assert_eq!(conv.buffered_input(), 100);
    }

    #[test]
    fn test_flush_total_upsample() {
        let opts = ResamplerOptions::default().with_chunk_size(256);
        assert_eq!(convert_all(16000, 48000, 1600, &opts), 4800);
    }

    #[test]
    fn test_flush_total_downsample_fast() {
        let opts = ResamplerOptions::default()
            .with_quality(Quality::Fast)
            .with_chunk_size(512);
        assert_eq!(convert_all(48000, 16000, 4800, &opts), 1600);
    }

    #[test]
    fn test_flush_total_fractional_ratio() {
        let opts = ResamplerOptions::default().with_chunk_size(1024);
        // 44100 -> 48000: 1000 * 160 / 147 = 1088.4
        assert_eq!(convert_all(44100, 48000, 1000, &opts), 1088);
    }

    #[test]
    fn test_flush_resets_for_next_stream() {
        let opts = ResamplerOptions::default().with_chunk_size(128);
        let mut conv = RateConverter::new(8000, 16000, 1, &opts).unwrap();
        let mut out = SampleFifo::new(1);
        conv.push(&[vec![0.1; 400]], 400);
        conv.flush(&mut out).unwrap();
        assert_eq!(out.len(), 800);
        assert_eq!(conv.buffered_input(), 0);
        assert_eq!(conv.owed_output(), 0);

        out.clear();
        conv.push(&[vec![0.1; 200]], 200);
        conv.flush(&mut out).unwrap();
        assert_eq!(out.len(), 400);
    }

    #[test]
    fn test_compensation_validation() {
        let opts = ResamplerOptions::default();
        let mut conv = RateConverter::new(44100, 48000, 2, &opts).unwrap();
        assert!(conv.set_compensation(10, 1000).is_ok());
        assert!(conv.set_compensation(0, 0).is_ok());
        let err = conv.set_compensation(500, 1000).unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_compensation_adds_samples() {
        let opts = ResamplerOptions::default()
            .with_quality(Quality::Fast)
            .with_chunk_size(480);
        let mut conv = RateConverter::new(48000, 48000, 1, &opts).unwrap();
        conv.set_compensation(480, 9600).unwrap();
        let mut out = SampleFifo::new(1);
        conv.push(&[vec![0.0; 4800]], 4800);
        conv.flush(&mut out).unwrap();
        assert!(out.len() > 4800);
    }

    #[test]
    fn test_compensation_counts_released_frames() {
        let opts = ResamplerOptions::default()
            .with_quality(Quality::Fast)
            .with_chunk_size(480);
        let mut conv = RateConverter::new(48000, 48000, 1, &opts).unwrap();
        conv.set_compensation(24, 480).unwrap();
        assert_eq!(conv.compensation_left, 504);

        let mut out = SampleFifo::new(1);
        conv.push(&[vec![0.0; 480]], 480);
        let released = conv.process(&mut out).unwrap();
        assert_eq!(released, out.len());
        assert_eq!(conv.compensation_left, 504usize.saturating_sub(released));
        if conv.compensation_left > 0 {
            assert_eq!(conv.relative, 1.05);
        }
    }
}
