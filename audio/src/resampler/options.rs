//! Resampler configuration.

use serde::{Deserialize, Serialize};

use crate::error::{ResamplerError, Result};

/// Interpolation quality preset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    /// Cubic polynomial interpolation. Lowest latency and CPU cost.
    Fast,
    /// 64-tap sinc with linear interpolation.
    #[default]
    Normal,
    /// 256-tap sinc with cubic interpolation.
    High,
}

/// Tunable parameters of an [`AudioResampler`](super::AudioResampler).
///
/// Options are read when the resampler is opened. They can be loaded from
/// YAML or JSON; missing fields take their defaults.
///
/// ```
/// use avkit_audio::resampler::{Quality, ResamplerOptions};
///
/// let opts: ResamplerOptions = serde_json::from_str(r#"{"quality": "high"}"#).unwrap();
/// assert_eq!(opts.quality, Quality::High);
/// assert_eq!(opts.chunk_size, 1024);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResamplerOptions {
    /// Interpolation quality (default: normal).
    pub quality: Quality,

    /// Input frames per conversion block (default: 1024).
    pub chunk_size: usize,

    /// Largest relative ratio change drift compensation may apply (default: 1.1).
    pub max_compensation_ratio: f64,

    /// Minimum drift, in seconds, before timestamps are corrected
    /// automatically. `None` disables automatic compensation.
    pub min_compensation: Option<f64>,

    /// Drift, in seconds, above which output is dropped or silence injected
    /// instead of stretching (default: 0.1).
    pub min_hard_compensation: f64,

    /// Window, in seconds, over which soft compensation spreads a correction
    /// (default: 1.0).
    pub soft_compensation_duration: f64,

    /// Largest soft correction, in seconds per window (default: 0, disabled).
    pub max_soft_compensation: f64,
}

impl Default for ResamplerOptions {
    fn default() -> Self {
        Self {
            quality: Quality::Normal,
            chunk_size: 1024,
            max_compensation_ratio: 1.1,
            min_compensation: None,
            min_hard_compensation: 0.1,
            soft_compensation_duration: 1.0,
            max_soft_compensation: 0.0,
        }
    }
}

impl ResamplerOptions {
    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Enables automatic timestamp compensation above `seconds` of drift.
    pub fn with_min_compensation(mut self, seconds: f64) -> Self {
        self.min_compensation = Some(seconds);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(ResamplerError::invalid("chunk_size must be positive"));
        }
        if !(self.max_compensation_ratio >= 1.0) {
            return Err(ResamplerError::invalid(
                "max_compensation_ratio must be at least 1.0",
            ));
        }
        if let Some(min) = self.min_compensation {
            if !(min >= 0.0) {
                return Err(ResamplerError::invalid("min_compensation must be non-negative"));
            }
        }
        if !(self.min_hard_compensation >= 0.0) {
            return Err(ResamplerError::invalid(
                "min_hard_compensation must be non-negative",
            ));
        }
        if !(self.soft_compensation_duration >= 0.0) || !(self.max_soft_compensation >= 0.0) {
            return Err(ResamplerError::invalid(
                "soft compensation parameters must be non-negative",
            ));
        }
        Ok(())
    }

    /// True when timestamps are corrected automatically.
    pub(crate) fn auto_compensation(&self) -> bool {
        self.min_compensation.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = ResamplerOptions::default();
        assert_eq!(opts.quality, Quality::Normal);
        assert_eq!(opts.chunk_size, 1024);
        assert!(opts.min_compensation.is_none());
        assert!(!opts.auto_compensation());
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let opts = ResamplerOptions::default()
            .with_quality(Quality::Fast)
            .with_chunk_size(256)
            .with_min_compensation(0.02);
        assert_eq!(opts.quality, Quality::Fast);
        assert_eq!(opts.chunk_size, 256);
        assert!(opts.auto_compensation());
    }

    #[test]
    fn test_validate_rejects() {
        let opts = ResamplerOptions::default().with_chunk_size(0);
        assert!(opts.validate().unwrap_err().is_invalid_argument());

        let opts = ResamplerOptions {
            max_compensation_ratio: 0.5,
            ..Default::default()
        };
        assert!(opts.validate().is_err());

        let opts = ResamplerOptions {
            min_hard_compensation: f64::NAN,
            ..Default::default()
        };
        assert!(opts.validate().is_err());

        let opts = ResamplerOptions::default().with_min_compensation(-1.0);
        assert!(opts.validate().is_err());
    }

    #[test]
    fn test_from_yaml() {
        let yaml = "quality: fast\nchunk_size: 512\nmin_compensation: 0.05\n";
        let opts: ResamplerOptions = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(opts.quality, Quality::Fast);
        assert_eq!(opts.chunk_size, 512);
        assert_eq!(opts.min_compensation, Some(0.05));
        assert_eq!(opts.min_hard_compensation, 0.1);
    }

    #[test]
    fn test_json_roundtrip() {
        let opts = ResamplerOptions::default().with_quality(Quality::High);
        let json = serde_json::to_string(&opts).unwrap();
        let back: ResamplerOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(opts, back);
    }
}
