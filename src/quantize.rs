//! Quantizer: combined complex samples + gain → packed output bytes.
//!
//! Three encodings are supported, all saturating (clamp to the boundary and
//! count the component once, never wrap):
//!
//! ```text
//! Iq4   1 byte / sample   [s|m m m|s|m m m]  I in the high nibble, Q low
//!                          sign-magnitude, |x·g·3| truncated, max 7
//! Iq8   2 bytes / sample  I, Q as i8, x·g·25 truncated toward zero
//! Iq16  4 bytes / sample  I, Q as little-endian i16, x·g·3277 truncated
//! ```

use crate::types::IqSample;

/// Output sample encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quantization {
    /// 4-bit sign-magnitude, I/Q nibble packed.
    Iq4,
    /// 8-bit two's complement, interleaved.
    Iq8,
    /// 16-bit little-endian two's complement, interleaved.
    Iq16,
}

const IQ4_SCALE: f64 = 3.0;
const IQ4_MAX: i32 = 7;
const IQ4_SIGN: u8 = 1 << 3;
const IQ8_SCALE: f64 = 25.0;
const IQ16_SCALE: f64 = 3277.0;

impl Quantization {
    /// Map an output bit depth to an encoding.
    pub fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            4 => Some(Self::Iq4),
            8 => Some(Self::Iq8),
            16 => Some(Self::Iq16),
            _ => None,
        }
    }

    pub fn bits(&self) -> u32 {
        match self {
            Self::Iq4 => 4,
            Self::Iq8 => 8,
            Self::Iq16 => 16,
        }
    }

    /// Encoded bytes per complex sample.
    pub fn bytes_per_sample(&self) -> usize {
        match self {
            Self::Iq4 => 1,
            Self::Iq8 => 2,
            Self::Iq16 => 4,
        }
    }

    /// Full-scale factor applied to each component before truncation.
    pub fn scale(&self) -> f64 {
        match self {
            Self::Iq4 => IQ4_SCALE,
            Self::Iq8 => IQ8_SCALE,
            Self::Iq16 => IQ16_SCALE,
        }
    }

    /// Quantize `samples` into `out` (cleared first) and return the number
    /// of clipped components.
    ///
    /// `out` keeps its capacity across calls, so a buffer sized with
    /// [`Quantization::bytes_per_sample`] never reallocates.
    pub fn quantize(&self, samples: &[IqSample], gain: f64, out: &mut Vec<u8>) -> usize {
        out.clear();
        match self {
            Self::Iq4 => quantize_iq4(samples, gain, out),
            Self::Iq8 => quantize_iq8(samples, gain, out),
            Self::Iq16 => quantize_iq16(samples, gain, out),
        }
    }

    /// Reconstruct the component value a code represents at the given gain.
    pub fn dequantize_component(&self, code: i32, gain: f64) -> f64 {
        code as f64 / (self.scale() * gain)
    }
}

/// Truncate toward zero and saturate to `[lo, hi]`; the flag reports clipping.
#[inline]
fn saturate(value: f64, lo: i32, hi: i32) -> (i32, bool) {
    let t = value.trunc();
    if t > hi as f64 {
        (hi, true)
    } else if t < lo as f64 {
        (lo, true)
    } else {
        (t as i32, false)
    }
}

#[inline]
fn iq4_nibble(component: f64, gain: f64, clipped: &mut usize) -> u8 {
    let (magnitude, clip) = saturate((component * gain * IQ4_SCALE).abs(), 0, IQ4_MAX);
    *clipped += clip as usize;
    let sign = if component < 0.0 { IQ4_SIGN } else { 0 };
    magnitude as u8 | sign
}

fn quantize_iq4(samples: &[IqSample], gain: f64, out: &mut Vec<u8>) -> usize {
    let mut clipped = 0;
    for s in samples {
        let hi = iq4_nibble(s.re, gain, &mut clipped);
        let lo = iq4_nibble(s.im, gain, &mut clipped);
        out.push((hi << 4) | lo);
    }
    clipped
}

fn quantize_iq8(samples: &[IqSample], gain: f64, out: &mut Vec<u8>) -> usize {
    let mut clipped = 0;
    let scale = gain * IQ8_SCALE;
    for s in samples {
        for component in [s.re, s.im] {
            let (v, clip) = saturate(component * scale, i8::MIN as i32, i8::MAX as i32);
            clipped += clip as usize;
            out.push(v as i8 as u8);
        }
    }
    clipped
}

fn quantize_iq16(samples: &[IqSample], gain: f64, out: &mut Vec<u8>) -> usize {
    let mut clipped = 0;
    let scale = gain * IQ16_SCALE;
    for s in samples {
        for component in [s.re, s.im] {
            let (v, clip) = saturate(component * scale, i16::MIN as i32, i16::MAX as i32);
            clipped += clip as usize;
            out.extend_from_slice(&(v as i16).to_le_bytes());
        }
    }
    clipped
}

/// Decode one 4-bit nibble into its signed code.
pub fn decode_iq4_nibble(nibble: u8) -> i32 {
    let magnitude = (nibble & 0x7) as i32;
    if nibble & IQ4_SIGN != 0 {
        -magnitude
    } else {
        magnitude
    }
}
