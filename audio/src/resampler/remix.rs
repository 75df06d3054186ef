//! Channel mapping and remix matrices.

use std::f64::consts::FRAC_1_SQRT_2;

use crate::error::{ResamplerError, Result};
use crate::pcm::{Channel, ChannelLayout};

/// Converts planar frames from the input channel set to the output one.
///
/// An optional input channel map is applied first, then the mix matrix.
#[derive(Debug, Clone)]
pub(crate) struct Remixer {
    /// `matrix[o][i]` is the gain of input channel `i` in output channel `o`.
    matrix: Vec<Vec<f64>>,
    channel_map: Option<Vec<i32>>,
    identity: bool,
}

impl Remixer {
    /// Builds the default mix between two layouts.
    pub fn new(input: ChannelLayout, output: ChannelLayout) -> Self {
        let matrix = default_matrix(input, output);
        Self {
            identity: input == output,
            matrix,
            channel_map: None,
        }
    }

    /// Builds a mix from a caller supplied matrix, where
    /// `matrix[i + stride * o]` weights input `i` into output `o`.
    pub fn from_matrix(
        matrix: &[f64],
        stride: usize,
        in_channels: usize,
        out_channels: usize,
    ) -> Result<Self> {
        check_matrix(matrix, stride, in_channels, out_channels)?;
        let rows = (0..out_channels)
            .map(|o| matrix[o * stride..o * stride + in_channels].to_vec())
            .collect();
        Ok(Self {
            matrix: rows,
            channel_map: None,
            identity: false,
        })
    }

    pub fn with_channel_map(mut self, map: Option<Vec<i32>>) -> Self {
        if map.is_some() {
            self.identity = false;
        }
        self.channel_map = map;
        self
    }

    pub fn is_identity(&self) -> bool {
        self.identity
    }

    /// Applies the channel map and matrix to `frames` of planar input.
    pub fn apply(&self, input: Vec<Vec<f64>>, frames: usize) -> Vec<Vec<f64>> {
        if self.identity {
            return input;
        }

        let input = match &self.channel_map {
            Some(map) => map
                .iter()
                .map(|&src| {
                    if src < 0 {
                        vec![0.0; frames]
                    } else {
                        input[src as usize].clone()
                    }
                })
                .collect(),
            None => input,
        };

        self.matrix
            .iter()
            .map(|row| {
                let mut out = vec![0.0; frames];
                for (gain, samples) in row.iter().zip(&input) {
                    if *gain == 0.0 {
                        continue;
                    }
                    for (o, s) in out.iter_mut().zip(samples) {
                        *o += gain * s;
                    }
                }
                out
            })
            .collect()
    }
}

pub(crate) fn check_channel_map(map: &[i32], in_channels: usize) -> Result<()> {
    if map.len() != in_channels {
        return Err(ResamplerError::invalid(format!(
            "channel map has {} entries, input has {} channels",
            map.len(),
            in_channels
        )));
    }
    if let Some(bad) = map.iter().find(|&&c| c < -1 || c >= in_channels as i32) {
        return Err(ResamplerError::invalid(format!(
            "channel map index {} out of range",
            bad
        )));
    }
    Ok(())
}

pub(crate) fn check_matrix(
    matrix: &[f64],
    stride: usize,
    in_channels: usize,
    out_channels: usize,
) -> Result<()> {
    if stride < in_channels {
        return Err(ResamplerError::invalid(format!(
            "matrix stride {} is less than {} input channels",
            stride, in_channels
        )));
    }
    let needed = stride * (out_channels - 1) + in_channels;
    if matrix.len() < needed {
        return Err(ResamplerError::invalid(format!(
            "matrix has {} coefficients, need {}",
            matrix.len(),
            needed
        )));
    }
    if matrix[..needed].iter().any(|g| !g.is_finite()) {
        return Err(ResamplerError::invalid("matrix coefficients must be finite"));
    }
    Ok(())
}

/// Where an input channel goes when the output layout lacks it.
fn fold_targets(ch: Channel, input: ChannelLayout, output: ChannelLayout) -> Vec<(Channel, f64)> {
    use Channel::*;

    let has = |c| output.contains(c);
    let pair = |l, r, gain| vec![(l, gain), (r, gain)];

    match ch {
        FrontCenter if input == ChannelLayout::Mono && has(FrontLeft) && has(FrontRight) => {
            pair(FrontLeft, FrontRight, 1.0)
        }
        FrontCenter if has(FrontLeft) && has(FrontRight) => {
            pair(FrontLeft, FrontRight, FRAC_1_SQRT_2)
        }
        FrontLeft | FrontRight if has(FrontCenter) => vec![(FrontCenter, FRAC_1_SQRT_2)],
        BackLeft | BackRight | SideLeft | SideRight => {
            let left = matches!(ch, BackLeft | SideLeft);
            let counterpart = match ch {
                BackLeft => SideLeft,
                BackRight => SideRight,
                SideLeft => BackLeft,
                _ => BackRight,
            };
            if has(counterpart) {
                vec![(counterpart, 1.0)]
            } else if has(FrontLeft) && has(FrontRight) {
                vec![(if left { FrontLeft } else { FrontRight }, FRAC_1_SQRT_2)]
            } else if has(FrontCenter) {
                vec![(FrontCenter, 0.5)]
            } else {
                Vec::new()
            }
        }
        BackCenter => {
            if has(BackLeft) && has(BackRight) {
                pair(BackLeft, BackRight, FRAC_1_SQRT_2)
            } else if has(SideLeft) && has(SideRight) {
                pair(SideLeft, SideRight, FRAC_1_SQRT_2)
            } else if has(FrontLeft) && has(FrontRight) {
                pair(FrontLeft, FrontRight, 0.5)
            } else if has(FrontCenter) {
                vec![(FrontCenter, FRAC_1_SQRT_2)]
            } else {
                Vec::new()
            }
        }
        // LFE is dropped when the output has no LFE channel.
        _ => Vec::new(),
    }
}

fn default_matrix(input: ChannelLayout, output: ChannelLayout) -> Vec<Vec<f64>> {
    let mut matrix = vec![vec![0.0; input.channel_count()]; output.channel_count()];

    for (i, &ch) in input.channels().iter().enumerate() {
        if let Some(o) = output.position(ch) {
            matrix[o][i] = 1.0;
            continue;
        }
        for (target, gain) in fold_targets(ch, input, output) {
            if let Some(o) = output.position(target) {
                matrix[o][i] += gain;
            }
        }
    }

    for row in &mut matrix {
        let sum: f64 = row.iter().sum();
        if sum > 1.0 {
            for g in row.iter_mut() {
                *g /= sum;
            }
        }
    }
    matrix
}
