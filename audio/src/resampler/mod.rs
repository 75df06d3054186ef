//! Audio resampling.
//!
//! [`AudioResampler`] converts between sample rates, channel layouts and
//! sample formats in one pass. Rate conversion uses rubato; channel remixing
//! and format conversion are done internally on `f64` samples.
//!
//! # Example
//!
//! ```rust
//! use avkit_audio::pcm::{AudioBuffer, ChannelLayout, SampleFormat};
//! use avkit_audio::resampler::{AudioResampler, Quality, ResamplerOptions};
//!
//! let mut rs = AudioResampler::new(
//!     ChannelLayout::Mono, 16000, SampleFormat::S16,
//!     ChannelLayout::Stereo, 48000, SampleFormat::F32,
//! )
//! .unwrap()
//! .with_options(ResamplerOptions::default().with_quality(Quality::High));
//! rs.open().unwrap();
//!
//! let input = AudioBuffer::new(480, 48000, ChannelLayout::Stereo, SampleFormat::F32).unwrap();
//! let mut out = AudioBuffer::new(1024, 16000, ChannelLayout::Mono, SampleFormat::S16).unwrap();
//! rs.resample(&mut out, Some(&input)).unwrap();
//! ```

mod audio_resampler;
mod engine;
mod fifo;
mod options;
mod remix;

pub use audio_resampler::{AudioResampler, NOPTS};
pub use options::{Quality, ResamplerOptions};
