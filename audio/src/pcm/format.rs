//! Sample format definitions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ResamplerError;

/// Encoding of a single audio sample.
///
/// Packed formats interleave channels in one plane; planar formats keep
/// one plane per channel. All multi-byte formats are little-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleFormat {
    /// Unsigned 8-bit
    U8,
    /// Signed 16-bit
    S16,
    /// Signed 32-bit
    S32,
    /// 32-bit float
    F32,
    /// 64-bit float
    F64,
    /// Unsigned 8-bit planar
    U8P,
    /// Signed 16-bit planar
    S16P,
    /// Signed 32-bit planar
    S32P,
    /// 32-bit float planar
    F32P,
    /// 64-bit float planar
    F64P,
}

impl SampleFormat {
    /// Size in bytes of one sample of one channel.
    pub const fn bytes_per_sample(self) -> usize {
        match self {
            SampleFormat::U8 | SampleFormat::U8P => 1,
            SampleFormat::S16 | SampleFormat::S16P => 2,
            SampleFormat::S32 | SampleFormat::S32P => 4,
            SampleFormat::F32 | SampleFormat::F32P => 4,
            SampleFormat::F64 | SampleFormat::F64P => 8,
        }
    }

    pub const fn is_planar(self) -> bool {
        matches!(
            self,
            SampleFormat::U8P
                | SampleFormat::S16P
                | SampleFormat::S32P
                | SampleFormat::F32P
                | SampleFormat::F64P
        )
    }

    pub const fn is_float(self) -> bool {
        matches!(
            self,
            SampleFormat::F32 | SampleFormat::F64 | SampleFormat::F32P | SampleFormat::F64P
        )
    }

    /// Returns the interleaved equivalent of this format.
    pub const fn packed(self) -> Self {
        match self {
            SampleFormat::U8P => SampleFormat::U8,
            SampleFormat::S16P => SampleFormat::S16,
            SampleFormat::S32P => SampleFormat::S32,
            SampleFormat::F32P => SampleFormat::F32,
            SampleFormat::F64P => SampleFormat::F64,
            other => other,
        }
    }

    /// Returns the planar equivalent of this format.
    pub const fn planar(self) -> Self {
        match self {
            SampleFormat::U8 => SampleFormat::U8P,
            SampleFormat::S16 => SampleFormat::S16P,
            SampleFormat::S32 => SampleFormat::S32P,
            SampleFormat::F32 => SampleFormat::F32P,
            SampleFormat::F64 => SampleFormat::F64P,
            other => other,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            SampleFormat::U8 => "u8",
            SampleFormat::S16 => "s16",
            SampleFormat::S32 => "s32",
            SampleFormat::F32 => "f32",
            SampleFormat::F64 => "f64",
            SampleFormat::U8P => "u8p",
            SampleFormat::S16P => "s16p",
            SampleFormat::S32P => "s32p",
            SampleFormat::F32P => "f32p",
            SampleFormat::F64P => "f64p",
        }
    }

    /// Decodes one sample into the nominal `[-1.0, 1.0)` range.
    ///
    /// `bytes` must hold exactly [`bytes_per_sample`](Self::bytes_per_sample) bytes.
    pub(crate) fn decode(self, bytes: &[u8]) -> f64 {
        match self.packed() {
            SampleFormat::U8 => (bytes[0] as f64 - 128.0) / 128.0,
            SampleFormat::S16 => i16::from_le_bytes([bytes[0], bytes[1]]) as f64 / 32768.0,
            SampleFormat::S32 => {
                i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64 / 2147483648.0
            }
            SampleFormat::F32 => f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64,
            _ => {
                let mut b = [0u8; 8];
                b.copy_from_slice(&bytes[..8]);
                f64::from_le_bytes(b)
            }
        }
    }

    /// Encodes one sample, clamping integer formats to their range.
    pub(crate) fn encode(self, v: f64, out: &mut [u8]) {
        match self.packed() {
            SampleFormat::U8 => {
                out[0] = (v * 128.0 + 128.0).round().clamp(0.0, 255.0) as u8;
            }
            SampleFormat::S16 => {
                let s = (v * 32768.0).round().clamp(-32768.0, 32767.0) as i16;
                out[..2].copy_from_slice(&s.to_le_bytes());
            }
            SampleFormat::S32 => {
                let s = (v * 2147483648.0)
                    .round()
                    .clamp(-2147483648.0, 2147483647.0) as i32;
                out[..4].copy_from_slice(&s.to_le_bytes());
            }
            SampleFormat::F32 => out[..4].copy_from_slice(&(v as f32).to_le_bytes()),
            _ => out[..8].copy_from_slice(&v.to_le_bytes()),
        }
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SampleFormat {
    type Err = ResamplerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fmt = match s.to_ascii_lowercase().as_str() {
            "u8" => SampleFormat::U8,
            "s16" => SampleFormat::S16,
            "s32" => SampleFormat::S32,
            "f32" | "flt" => SampleFormat::F32,
            "f64" | "dbl" => SampleFormat::F64,
            "u8p" => SampleFormat::U8P,
            "s16p" => SampleFormat::S16P,
            "s32p" => SampleFormat::S32P,
            "f32p" | "fltp" => SampleFormat::F32P,
            "f64p" | "dblp" => SampleFormat::F64P,
            other => {
                return Err(ResamplerError::invalid(format!(
                    "unknown sample format {:?}",
                    other
                )));
            }
        };
        Ok(fmt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_per_sample() {
        assert_eq!(SampleFormat::U8.bytes_per_sample(), 1);
        assert_eq!(SampleFormat::S16P.bytes_per_sample(), 2);
        assert_eq!(SampleFormat::S32.bytes_per_sample(), 4);
        assert_eq!(SampleFormat::F32P.bytes_per_sample(), 4);
        assert_eq!(SampleFormat::F64.bytes_per_sample(), 8);
    }

    #[test]
    fn test_packed_planar() {
        assert!(SampleFormat::S16P.is_planar());
        assert!(!SampleFormat::S16.is_planar());
        assert_eq!(SampleFormat::S16P.packed(), SampleFormat::S16);
        assert_eq!(SampleFormat::F32.planar(), SampleFormat::F32P);
        assert_eq!(SampleFormat::F32P.planar(), SampleFormat::F32P);
        assert!(SampleFormat::F64P.is_float());
        assert!(!SampleFormat::S32.is_float());
    }

    #[test]
    fn test_s16_is_exact() {
        let mut buf = [0u8; 2];
        for s in [i16::MIN, -12345, -1, 0, 1, 1000, i16::MAX] {
            let v = SampleFormat::S16.decode(&s.to_le_bytes());
            SampleFormat::S16.encode(v, &mut buf);
            assert_eq!(i16::from_le_bytes(buf), s);
        }
    }

    #[test]
    fn test_s32_is_exact() {
        let mut buf = [0u8; 4];
        for s in [i32::MIN, -70000, 0, 123456789, i32::MAX] {
            let v = SampleFormat::S32.decode(&s.to_le_bytes());
            SampleFormat::S32.encode(v, &mut buf);
            assert_eq!(i32::from_le_bytes(buf), s);
        }
    }

    #[test]
    fn test_u8_midpoint_is_silence() {
        assert_eq!(SampleFormat::U8.decode(&[128]), 0.0);
        let mut buf = [0u8; 1];
        SampleFormat::U8.encode(0.0, &mut buf);
        assert_eq!(buf[0], 128);
    }

    #[test]
    fn test_encode_clamps() {
        let mut buf = [0u8; 2];
        SampleFormat::S16.encode(4.0, &mut buf);
        assert_eq!(i16::from_le_bytes(buf), i16::MAX);
        SampleFormat::S16.encode(-4.0, &mut buf);
        assert_eq!(i16::from_le_bytes(buf), i16::MIN);
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!("s16".parse::<SampleFormat>().unwrap(), SampleFormat::S16);
        assert_eq!("FLTP".parse::<SampleFormat>().unwrap(), SampleFormat::F32P);
        assert!("s24".parse::<SampleFormat>().is_err());
        assert_eq!(SampleFormat::S32P.to_string(), "s32p");
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&SampleFormat::F32P).unwrap();
        assert_eq!(json, "\"f32p\"");
        let fmt: SampleFormat = serde_json::from_str("\"s16\"").unwrap();
        assert_eq!(fmt, SampleFormat::S16);
    }
}
