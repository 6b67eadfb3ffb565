//! Spreading code generators.
//!
//! ```text
//! GPS C/A   G1: x^10 + x^3 + 1
//!           G2: x^10 + x^9 + x^8 + x^6 + x^3 + x^2 + 1
//!           chip = G1[10] ^ G2[tap_a] ^ G2[tap_b]          (1023 chips)
//!
//! GLONASS   x^9 + x^5 + 1, output from stage 7             (511 chips)
//! ```
//!
//! Registers start all ones. Logical 0 maps to +1, logical 1 to -1.

use crate::signal::SignalKind;

/// G2 phase-selector taps for GPS PRN 1-32 (1-based stage numbers).
const GPS_CA_TAPS: [(usize, usize); 32] = [
    (2, 6),
    (3, 7),
    (4, 8),
    (5, 9),
    (1, 9),
    (2, 10),
    (1, 8),
    (2, 9),
    (3, 10),
    (2, 3),
    (3, 4),
    (5, 6),
    (6, 7),
    (7, 8),
    (8, 9),
    (9, 10),
    (1, 4),
    (2, 5),
    (3, 6),
    (4, 7),
    (5, 8),
    (6, 9),
    (1, 3),
    (4, 6),
    (5, 7),
    (6, 8),
    (7, 9),
    (8, 10),
    (1, 6),
    (2, 7),
    (3, 8),
    (4, 9),
];

/// Fibonacci shift register; stage 1 is index 0.
#[derive(Debug, Clone)]
struct ShiftRegister<const N: usize> {
    stages: [u8; N],
}

impl<const N: usize> ShiftRegister<N> {
    fn all_ones() -> Self {
        Self { stages: [1; N] }
    }

    /// Stage value, 1-based.
    #[inline]
    fn stage(&self, n: usize) -> u8 {
        self.stages[n - 1]
    }

    /// Shift by one with feedback from the given 1-based stages.
    #[inline]
    fn clock(&mut self, taps: &[usize]) {
        let feedback = taps.iter().fold(0, |acc, &t| acc ^ self.stage(t));
        self.stages.copy_within(0..N - 1, 1);
        self.stages[0] = feedback;
    }
}

#[inline]
fn to_chip(bit: u8) -> i8 {
    if bit == 0 {
        1
    } else {
        -1
    }
}

/// The 1023-chip C/A code for GPS PRN 1-32, or `None` for other PRNs.
pub fn gps_ca_code(prn: u8) -> Option<Vec<i8>> {
    let (tap_a, tap_b) = *GPS_CA_TAPS.get((prn as usize).checked_sub(1)?)?;
    let mut g1 = ShiftRegister::<10>::all_ones();
    let mut g2 = ShiftRegister::<10>::all_ones();
    let code = (0..1023)
        .map(|_| {
            let bit = g1.stage(10) ^ g2.stage(tap_a) ^ g2.stage(tap_b);
            g1.clock(&[3, 10]);
            g2.clock(&[2, 3, 6, 8, 9, 10]);
            to_chip(bit)
        })
        .collect();
    Some(code)
}

/// The 511-chip GLONASS ranging code shared by every satellite.
pub fn glonass_code() -> Vec<i8> {
    let mut reg = ShiftRegister::<9>::all_ones();
    (0..511)
        .map(|_| {
            let bit = reg.stage(7);
            reg.clock(&[5, 9]);
            to_chip(bit)
        })
        .collect()
}

/// Primary code for a signal and SV number, if a generator exists for it.
pub fn primary_code(signal: SignalKind, number: u8) -> Option<Vec<i8>> {
    match signal {
        SignalKind::GpsL1Ca => gps_ca_code(number),
        SignalKind::GlonassG1 => Some(glonass_code()),
        SignalKind::GpsL5 | SignalKind::GalileoE1 | SignalKind::BeiDouB1I => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn correlate(a: &[i8], b: &[i8], lag: usize) -> i32 {
        let n = a.len();
        (0..n).map(|i| a[i] as i32 * b[(i + lag) % n] as i32).sum()
    }

    fn first_bits_octal(code: &[i8], n: usize) -> u32 {
        code[..n].iter().fold(0, |acc, &c| (acc << 1) | (c < 0) as u32)
    }

    #[test]
    fn gps_first_chips_match_published_octal() {
        // IS-GPS-200 Table 3-Ia, first 10 chips in octal.
        assert_eq!(first_bits_octal(&gps_ca_code(1).unwrap(), 10), 0o1440);
        assert_eq!(first_bits_octal(&gps_ca_code(2).unwrap(), 10), 0o1620);
        assert_eq!(first_bits_octal(&gps_ca_code(32).unwrap(), 10), 0o1712);
    }

    #[test]
    fn gps_autocorrelation_peak() {
        let code = gps_ca_code(5).unwrap();
        assert_eq!(code.len(), 1023);
        assert_eq!(correlate(&code, &code, 0), 1023);
        for lag in [1, 17, 500] {
            assert!(correlate(&code, &code, lag).abs() <= 65);
        }
    }

    #[test]
    fn gps_cross_correlation_bounded() {
        let a = gps_ca_code(1).unwrap();
        let b = gps_ca_code(7).unwrap();
        let worst = (0..1023).map(|lag| correlate(&a, &b, lag).abs()).max().unwrap_or(0);
        assert!(worst <= 65, "cross-correlation {worst}");
    }

    #[test]
    fn gps_rejects_out_of_range_prn() {
        assert!(gps_ca_code(0).is_none());
        assert!(gps_ca_code(33).is_none());
    }

    #[test]
    fn glonass_is_m_sequence() {
        let code = glonass_code();
        assert_eq!(code.len(), 511);
        assert_eq!(code[..9], [-1, -1, -1, -1, -1, -1, -1, 1, 1]);
        for lag in 1..511 {
            assert_eq!(correlate(&code, &code, lag), -1);
        }
    }

    #[test]
    fn unsupported_signals_have_no_code() {
        assert!(primary_code(SignalKind::GalileoE1, 1).is_none());
        assert!(primary_code(SignalKind::GlonassG1, 4).is_some());
    }
}
