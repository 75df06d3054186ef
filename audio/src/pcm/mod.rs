//! PCM audio data types.
//!
//! # Key Types
//!
//! - [`SampleFormat`]: encoding of a single sample, packed or planar
//! - [`ChannelLayout`]: speaker arrangement of a stream
//! - [`AudioBuffer`]: a block of samples with layout, rate and format
//!
//! # Example
//!
//! ```rust
//! use avkit_audio::pcm::{AudioBuffer, ChannelLayout, SampleFormat};
//!
//! // 10ms of 48kHz stereo s16, zeroed
//! let buf = AudioBuffer::new(480, 48000, ChannelLayout::Stereo, SampleFormat::S16).unwrap();
//! assert_eq!(buf.channels(), 2);
//! ```

mod buffer;
mod format;
mod layout;

pub use buffer::AudioBuffer;
pub use format::SampleFormat;
pub use layout::{Channel, ChannelLayout};
