//! Channel layouts.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ResamplerError;

/// A speaker position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    FrontLeft,
    FrontRight,
    FrontCenter,
    LowFrequency,
    BackLeft,
    BackRight,
    BackCenter,
    SideLeft,
    SideRight,
}

use Channel::*;

/// Arrangement of channels in an audio stream.
///
/// Channel order follows the usual WAVE / FFmpeg ordering for each preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelLayout {
    #[serde(rename = "mono")]
    Mono,
    #[serde(rename = "stereo")]
    Stereo,
    #[serde(rename = "2.1")]
    TwoPointOne,
    #[serde(rename = "3.0")]
    Surround,
    #[serde(rename = "quad")]
    Quad,
    #[serde(rename = "5.0")]
    FivePointZero,
    #[serde(rename = "5.1")]
    FivePointOne,
    #[serde(rename = "7.1")]
    SevenPointOne,
}

impl ChannelLayout {
    /// Channels of this layout in storage order.
    pub const fn channels(self) -> &'static [Channel] {
        match self {
            ChannelLayout::Mono => &[FrontCenter],
            ChannelLayout::Stereo => &[FrontLeft, FrontRight],
            ChannelLayout::TwoPointOne => &[FrontLeft, FrontRight, LowFrequency],
            ChannelLayout::Surround => &[FrontLeft, FrontRight, FrontCenter],
            ChannelLayout::Quad => &[FrontLeft, FrontRight, BackLeft, BackRight],
            ChannelLayout::FivePointZero => &[FrontLeft, FrontRight, FrontCenter, BackLeft, BackRight],
            ChannelLayout::FivePointOne => {
                &[FrontLeft, FrontRight, FrontCenter, LowFrequency, BackLeft, BackRight]
            }
            ChannelLayout::SevenPointOne => &[
                FrontLeft,
                FrontRight,
                FrontCenter,
                LowFrequency,
                BackLeft,
                BackRight,
                SideLeft,
                SideRight,
            ],
        }
    }

    pub const fn channel_count(self) -> usize {
        self.channels().len()
    }

    /// Index of `channel` within this layout, if present.
    pub fn position(self, channel: Channel) -> Option<usize> {
        self.channels().iter().position(|&c| c == channel)
    }

    pub fn contains(self, channel: Channel) -> bool {
        self.position(channel).is_some()
    }

    /// The conventional layout for a channel count.
    pub fn default_for_count(count: usize) -> Option<Self> {
        match count {
            1 => Some(ChannelLayout::Mono),
            2 => Some(ChannelLayout::Stereo),
            3 => Some(ChannelLayout::Surround),
            4 => Some(ChannelLayout::Quad),
            5 => Some(ChannelLayout::FivePointZero),
            6 => Some(ChannelLayout::FivePointOne),
            8 => Some(ChannelLayout::SevenPointOne),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            ChannelLayout::Mono => "mono",
            ChannelLayout::Stereo => "stereo",
            ChannelLayout::TwoPointOne => "2.1",
            ChannelLayout::Surround => "3.0",
            ChannelLayout::Quad => "quad",
            ChannelLayout::FivePointZero => "5.0",
            ChannelLayout::FivePointOne => "5.1",
            ChannelLayout::SevenPointOne => "7.1",
        }
    }
}

impl fmt::Display for ChannelLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ChannelLayout {
    type Err = ResamplerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let layout = match s.to_ascii_lowercase().as_str() {
            "mono" | "1.0" => ChannelLayout::Mono,
            "stereo" | "2.0" => ChannelLayout::Stereo,
            "2.1" => ChannelLayout::TwoPointOne,
            "3.0" | "surround" => ChannelLayout::Surround,
            "quad" | "4.0" => ChannelLayout::Quad,
            "5.0" => ChannelLayout::FivePointZero,
            "5.1" => ChannelLayout::FivePointOne,
            "7.1" => ChannelLayout::SevenPointOne,
            other => {
                return Err(ResamplerError::invalid(format!(
                    "unknown channel layout {:?}",
                    other
                )));
            }
        };
        Ok(layout)
    }
}
