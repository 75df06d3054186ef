//! Audio sample conversion.
//!
//! This crate provides:
//!
//! - `pcm`: sample formats, channel layouts and audio buffers
//! - `resampler`: sample rate, channel layout and sample format conversion
//!
//! # Example
//!
//! ```rust
//! use avkit_audio::{AudioBuffer, AudioResampler, ChannelLayout, SampleFormat};
//!
//! // 44.1kHz stereo s16 to 16kHz mono s16
//! let mut rs = AudioResampler::new(
//!     ChannelLayout::Mono, 16000, SampleFormat::S16,
//!     ChannelLayout::Stereo, 44100, SampleFormat::S16,
//! )
//! .unwrap();
//! rs.open().unwrap();
//!
//! let input = AudioBuffer::from_i16(&vec![0i16; 882], 44100, ChannelLayout::Stereo).unwrap();
//! let mut out = AudioBuffer::new(512, 16000, ChannelLayout::Mono, SampleFormat::S16).unwrap();
//! let mut total = rs.resample(&mut out, Some(&input)).unwrap();
//! total += rs.resample(&mut out, None).unwrap();
//! assert_eq!(total, 160);
//! ```

pub mod error;
pub mod pcm;
pub mod resampler;

pub use error::{ResamplerError, Result};
pub use pcm::{AudioBuffer, ChannelLayout, SampleFormat};
pub use resampler::{AudioResampler, Quality, ResamplerOptions};
