//! Streaming audio resampler.

use tracing::{debug, warn};

use super::engine::RateConverter;
use super::fifo::SampleFifo;
use super::options::ResamplerOptions;
use super::remix::{check_channel_map, check_matrix, Remixer};
use crate::error::{ResamplerError, Result};
use crate::pcm::{AudioBuffer, ChannelLayout, SampleFormat};

/// Timestamp value meaning "unknown".
pub const NOPTS: i64 = i64::MIN;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Created,
    Ready,
    Flushed,
}

/// Resamples [`AudioBuffer`]s from one layout / sample rate / sample format
/// to another.
///
/// The lifecycle is `new` → (optional channel mapping) → [`open`](Self::open)
/// → repeated [`resample`](Self::resample) → `resample(out, None)` to flush.
/// Conversion, timestamp and compensation calls fail with a runtime error
/// before `open`.
///
/// Mutating calls take `&mut self`; share a resampler across threads by
/// wrapping it in a `Mutex`.
///
/// ```
/// use avkit_audio::pcm::{AudioBuffer, ChannelLayout, SampleFormat};
/// use avkit_audio::resampler::AudioResampler;
///
/// let mut rs = AudioResampler::new(
///     ChannelLayout::Mono, 48000, SampleFormat::S16,
///     ChannelLayout::Mono, 16000, SampleFormat::S16,
/// ).unwrap();
/// rs.open().unwrap();
///
/// let input = AudioBuffer::from_i16(&vec![0i16; 1600], 16000, ChannelLayout::Mono).unwrap();
/// let mut out = AudioBuffer::new(4800, 48000, ChannelLayout::Mono, SampleFormat::S16).unwrap();
/// let mut total = rs.resample(&mut out, Some(&input)).unwrap();
/// total += rs.resample(&mut out, None).unwrap();
/// assert_eq!(total, 4800);
/// ```
pub struct AudioResampler {
    out_layout: ChannelLayout,
    out_rate: u32,
    out_format: SampleFormat,
    in_layout: ChannelLayout,
    in_rate: u32,
    in_format: SampleFormat,
    options: ResamplerOptions,
    state: State,
    channel_map: Option<Vec<i32>>,
    matrix: Option<(Vec<f64>, usize)>,
    remixer: Option<Remixer>,
    converter: Option<RateConverter>,
    output: SampleFifo,
    /// Output frames still to be dropped by timestamp compensation.
    pending_drop: usize,
    /// Whether `set_compensation` has been called.
    compensating: bool,
    first_pts: Option<i64>,
    /// Timestamp of the next output sample, in `1/(in_rate*out_rate)` units.
    out_pts: i64,
}

impl AudioResampler {
    /// Creates a resampler. No conversion state is allocated until
    /// [`open`](Self::open).
    pub fn new(
        out_layout: ChannelLayout,
        out_sample_rate: u32,
        out_format: SampleFormat,
        in_layout: ChannelLayout,
        in_sample_rate: u32,
        in_format: SampleFormat,
    ) -> Result<Self> {
        if out_sample_rate == 0 || in_sample_rate == 0 {
            return Err(ResamplerError::invalid(format!(
                "sample rates must be positive (in {}, out {})",
                in_sample_rate, out_sample_rate
            )));
        }
        Ok(Self {
            out_layout,
            out_rate: out_sample_rate,
            out_format,
            in_layout,
            in_rate: in_sample_rate,
            in_format,
            options: ResamplerOptions::default(),
            state: State::Created,
            channel_map: None,
            matrix: None,
            remixer: None,
            converter: None,
            output: SampleFifo::new(out_layout.channel_count()),
            pending_drop: 0,
            compensating: false,
            first_pts: None,
            out_pts: 0,
        })
    }

    /// Replaces the options. Takes effect at the next [`open`](Self::open).
    pub fn with_options(mut self, options: ResamplerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &ResamplerOptions {
        &self.options
    }

    pub fn output_layout(&self) -> ChannelLayout {
        self.out_layout
    }

    pub fn input_layout(&self) -> ChannelLayout {
        self.in_layout
    }

    pub fn output_sample_rate(&self) -> u32 {
        self.out_rate
    }

    pub fn input_sample_rate(&self) -> u32 {
        self.in_rate
    }

    pub fn output_format(&self) -> SampleFormat {
        self.out_format
    }

    pub fn input_format(&self) -> SampleFormat {
        self.in_format
    }

    pub fn input_channels(&self) -> usize {
        self.in_layout.channel_count()
    }

    pub fn output_channels(&self) -> usize {
        self.out_layout.channel_count()
    }

    pub fn is_open(&self) -> bool {
        self.state != State::Created
    }

    /// Sets a custom input channel mapping: input channel `i` is read from
    /// source channel `map[i]`, and `-1` mutes it. Must precede `open`.
    pub fn set_channel_mapping(&mut self, map: &[i32]) -> Result<()> {
        self.ensure_not_open("channel mapping")?;
        check_channel_map(map, self.input_channels())?;
        self.channel_map = Some(map.to_vec());
        Ok(())
    }

    /// Sets a custom remix matrix; `matrix[i + stride * o]` is the weight of
    /// input channel `i` in output channel `o`. Must precede `open`.
    pub fn set_matrix(&mut self, matrix: &[f64], stride: usize) -> Result<()> {
        self.ensure_not_open("remix matrix")?;
        check_matrix(matrix, stride, self.input_channels(), self.output_channels())?;
        self.matrix = Some((matrix.to_vec(), stride));
        Ok(())
    }

    /// Initializes the conversion engine. Opening an open resampler starts
    /// over and discards any buffered audio.
    pub fn open(&mut self) -> Result<()> {
        self.options.validate()?;

        let remixer = match &self.matrix {
            Some((matrix, stride)) => Remixer::from_matrix(
                matrix,
                *stride,
                self.input_channels(),
                self.output_channels(),
            )?,
            None => Remixer::new(self.in_layout, self.out_layout),
        };
        let remixer = remixer.with_channel_map(self.channel_map.clone());

        let converter = if self.in_rate != self.out_rate {
            Some(self.new_converter()?)
        } else {
            None
        };

        debug!(
            in_rate = self.in_rate,
            out_rate = self.out_rate,
            in_layout = %self.in_layout,
            out_layout = %self.out_layout,
            in_format = %self.in_format,
            out_format = %self.out_format,
            remix = !remixer.is_identity(),
            passthrough = converter.is_none(),
            "resampler opened"
        );

        self.remixer = Some(remixer);
        self.converter = converter;
        self.output.clear();
        self.pending_drop = 0;
        self.compensating = false;
        self.first_pts = None;
        self.out_pts = 0;
        self.state = State::Ready;
        Ok(())
    }

    /// Converts `input` into `out` and returns the number of frames written
    /// per channel.
    ///
    /// Pass `None` as input to flush the audio still buffered at end of
    /// stream. Input that does not fit in `out` is kept for the next call;
    /// size `out` generously to avoid the extra buffering. `out` receives
    /// `num_samples`, `complete` and, when the input carries one, a `pts` in
    /// `1/out_rate` units.
    ///
    /// Fails with an invalid-argument error if `out` or `input` do not match
    /// the configured output or input attributes.
    pub fn resample(&mut self, out: &mut AudioBuffer, input: Option<&AudioBuffer>) -> Result<usize> {
        self.ensure_open()?;
        self.check_output(out)?;
        if let Some(input) = input {
            self.check_input(input)?;
        }

        let mut in_pts = None;
        match input {
            Some(input) => {
                if let Some(pts) = input.pts() {
                    let scaled = pts.saturating_mul(self.out_rate as i64);
                    in_pts = Some(self.next_pts(scaled)?);
                }
                self.feed(input)?;
                self.state = State::Ready;
            }
            None => {
                if let Some(conv) = self.converter.as_mut() {
                    conv.flush(&mut self.output)?;
                }
                self.apply_pending_drop();
                self.state = State::Flushed;
            }
        }

        let n = out.max_samples().min(self.output.len());
        let frames = self.output.pop(n);
        out.write_planar(frames.into_iter().map(|ch| ch.into_iter()).collect(), n);
        out.set_complete(n > 0);
        if in_pts.is_some() || self.first_pts.is_some() {
            out.set_pts(Some(self.out_pts / self.in_rate as i64));
        } else {
            out.set_pts(None);
        }
        self.out_pts = self
            .out_pts
            .saturating_add(n as i64 * self.in_rate as i64);
        Ok(n)
    }

    /// Maps the timestamp of the next input sample to the timestamp of the
    /// next output sample. Both are in `1/(in_rate * out_rate)` units; pass
    /// [`NOPTS`] when the input timestamp is unknown.
    ///
    /// Without compensation, timestamps pass through corrected for the
    /// buffering delay. With compensation (automatic via
    /// `ResamplerOptions::min_compensation`, or after
    /// [`set_compensation`](Self::set_compensation)), the result follows the
    /// count of output samples, and with automatic compensation the drift
    /// between the two is corrected by dropping, injecting or stretching.
    pub fn next_pts(&mut self, pts: i64) -> Result<i64> {
        self.ensure_open()?;
        if pts == NOPTS {
            return Ok(self.out_pts);
        }
        if self.first_pts.is_none() {
            self.first_pts = Some(pts);
            self.out_pts = pts;
        }

        let scale = self.in_rate as i64 * self.out_rate as i64;
        if !self.compensation_active() {
            self.out_pts = pts.saturating_sub(self.delay_in(scale));
            return Ok(self.out_pts);
        }

        let Some(min_compensation) = self.options.min_compensation else {
            return Ok(self.out_pts);
        };

        let delta = pts
            .saturating_sub(self.delay_in(scale))
            .saturating_sub(self.out_pts)
            .saturating_add(self.pending_drop as i64 * self.in_rate as i64);
        let fdelta = delta as f64 / scale as f64;
        if fdelta.abs() <= min_compensation {
            return Ok(self.out_pts);
        }

        if Some(self.out_pts) == self.first_pts || fdelta.abs() > self.options.min_hard_compensation {
            let frames = (delta.unsigned_abs() / self.in_rate as u64) as usize;
            if delta > 0 {
                warn!(drift = fdelta, frames, "timestamp drift, injecting silence");
                self.inject_silence(frames)?;
            } else {
                warn!(drift = fdelta, frames, "timestamp drift, dropping output");
                self.schedule_drop(frames);
            }
        } else if self.options.soft_compensation_duration > 0.0 && self.options.max_soft_compensation > 0.0 {
            let duration = (self.out_rate as f64 * self.options.soft_compensation_duration) as i32;
            if duration > 0 {
                let max = self.options.max_soft_compensation;
                let comp = (fdelta.clamp(-max, max) * duration as f64) as i32;
                let comp = self.clamp_compensation(comp, duration);
                debug!(drift = fdelta, comp, duration, "soft timestamp compensation");
                // Input that matches the configuration must not fail here.
                if let Err(e) = self.set_compensation(comp, duration) {
                    warn!(error = %e, comp, duration, "soft timestamp compensation rejected");
                }
            }
        }
        Ok(self.out_pts)
    }

    /// Activates drift compensation: `sample_delta` extra (or, if negative,
    /// fewer) output samples are spread over the next
    /// `compensation_distance` output samples.
    pub fn set_compensation(&mut self, sample_delta: i32, compensation_distance: i32) -> Result<()> {
        self.ensure_open()?;
        if compensation_distance < 0 {
            return Err(ResamplerError::invalid("compensation distance must not be negative"));
        }
        if compensation_distance == 0 && sample_delta != 0 {
            return Err(ResamplerError::invalid(
                "compensation distance must be positive for a non-zero delta",
            ));
        }
        if sample_delta != 0 && compensation_distance as i64 + sample_delta as i64 <= 0 {
            return Err(ResamplerError::invalid(format!(
                "cannot remove {} samples over {}",
                -sample_delta, compensation_distance
            )));
        }

        self.compensating = true;
        if sample_delta == 0 {
            if let Some(conv) = self.converter.as_mut() {
                conv.set_compensation(0, 0)?;
            }
            return Ok(());
        }

        if self.converter.is_none() {
            self.converter = Some(self.new_converter()?);
        }
        if let Some(conv) = self.converter.as_mut() {
            conv.set_compensation(sample_delta, compensation_distance)?;
        }
        Ok(())
    }

    /// Drops up to `count` buffered output samples. Returns the number dropped.
    pub fn drop_output(&mut self, count: usize) -> Result<usize> {
        self.ensure_open()?;
        Ok(self.output.discard(count))
    }

    /// Appends `count` samples of silence to the buffered output. Returns the
    /// number injected.
    pub fn inject_silence(&mut self, count: usize) -> Result<usize> {
        self.ensure_open()?;
        self.output.push_silence(count);
        Ok(count)
    }

    /// Returns the delay the next input sample will experience relative to
    /// the next output sample, in `1/base` units.
    ///
    /// `base = 1` gives seconds, `base = 1000` milliseconds, and the input or
    /// output sample rate gives samples at that rate. The true delay is
    /// rarely an integer at either rate; `lcm(in_rate, out_rate)` is exact.
    /// Fails with a runtime error before `open`.
    pub fn delay(&self, base: i64) -> Result<i64> {
        self.ensure_open()?;
        if base <= 0 {
            return Err(ResamplerError::invalid(format!("delay base {} must be positive", base)));
        }
        Ok(self.delay_in(base))
    }

    fn delay_in(&self, base: i64) -> i64 {
        let (in_frames, owed) = match &self.converter {
            Some(conv) => (conv.buffered_input(), conv.owed_output()),
            None => (0, 0),
        };
        let out_frames = (owed + self.output.len()).saturating_sub(self.pending_drop);

        let in_rate = self.in_rate as i128;
        let out_rate = self.out_rate as i128;
        let num = (in_frames as i128 * out_rate + out_frames as i128 * in_rate) * base as i128;
        let den = in_rate * out_rate;
        ((num + den / 2) / den).min(i64::MAX as i128) as i64
    }

    /// Limits `comp` so that `(duration + comp) / duration` stays strictly
    /// inside the configured compensation ratio.
    fn clamp_compensation(&self, comp: i32, duration: i32) -> i32 {
        let max_ratio = self.options.max_compensation_ratio;
        let span = duration as f64;
        let up = ((max_ratio - 1.0) * span).floor() as i32 - 1;
        let down = ((1.0 - 1.0 / max_ratio) * span).floor() as i32 - 1;
        comp.clamp(-down.max(0), up.max(0))
    }

    fn compensation_active(&self) -> bool {
        self.compensating || self.options.auto_compensation()
    }

    fn new_converter(&self) -> Result<RateConverter> {
        RateConverter::new(self.in_rate, self.out_rate, self.output_channels(), &self.options)
    }

    fn feed(&mut self, input: &AudioBuffer) -> Result<()> {
        let frames = input.num_samples();
        if frames == 0 {
            return Ok(());
        }
        let planes = input.read_planar();
        let planes = match &self.remixer {
            Some(remixer) => remixer.apply(planes, frames),
            None => planes,
        };
        match self.converter.as_mut() {
            Some(conv) => {
                conv.push(&planes, frames);
                conv.process(&mut self.output)?;
            }
            None => self.output.push(&planes, frames),
        }
        self.apply_pending_drop();
        Ok(())
    }

    fn schedule_drop(&mut self, frames: usize) {
        self.pending_drop += frames;
        self.apply_pending_drop();
    }

    fn apply_pending_drop(&mut self) {
        if self.pending_drop > 0 {
            let dropped = self.output.discard(self.pending_drop);
            self.pending_drop -= dropped;
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.state == State::Created {
            return Err(ResamplerError::runtime("resampler is not open"));
        }
        Ok(())
    }

    fn ensure_not_open(&self, what: &str) -> Result<()> {
        if self.state != State::Created {
            return Err(ResamplerError::runtime(format!(
                "{} must be set before the resampler is opened",
                what
            )));
        }
        Ok(())
    }

    fn check_output(&self, out: &AudioBuffer) -> Result<()> {
        check_attrs("output", out, self.out_layout, self.out_rate, self.out_format)
    }

    fn check_input(&self, input: &AudioBuffer) -> Result<()> {
        check_attrs("input", input, self.in_layout, self.in_rate, self.in_format)
    }
}

fn check_attrs(
    which: &str,
    buf: &AudioBuffer,
    layout: ChannelLayout,
    rate: u32,
    format: SampleFormat,
) -> Result<()> {
    if buf.layout() != layout {
        return Err(ResamplerError::invalid(format!(
            "{} layout {} does not match expected {}",
            which,
            buf.layout(),
            layout
        )));
    }
    if buf.sample_rate() != rate {
        return Err(ResamplerError::invalid(format!(
            "{} sample rate {} does not match expected {}",
            which,
            buf.sample_rate(),
            rate
        )));
    }
    if buf.format() != format {
        return Err(ResamplerError::invalid(format!(
            "{} format {} does not match expected {}",
            which,
            buf.format(),
            format
        )));
    }
    Ok(())
}
