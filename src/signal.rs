//! Signal catalogue: constellations, signal kinds and channel descriptions.

/// GNSS constellation identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Constellation {
    /// US Global Positioning System
    Gps,
    /// Russian GLONASS
    Glonass,
    /// European Galileo
    Galileo,
    /// Chinese BeiDou
    BeiDou,
}

impl std::fmt::Display for Constellation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gps => write!(f, "GPS"),
            Self::Glonass => write!(f, "GLONASS"),
            Self::Galileo => write!(f, "Galileo"),
            Self::BeiDou => write!(f, "BeiDou"),
        }
    }
}

/// Broadcast signal type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SignalKind {
    /// GPS L1 C/A (1575.42 MHz, BPSK(1))
    GpsL1Ca,
    /// GPS L5 (1176.45 MHz, 10.23 Mchip/s)
    GpsL5,
    /// GLONASS G1 (1602 MHz + k*562.5 kHz, FDMA)
    GlonassG1,
    /// Galileo E1 OS (1575.42 MHz, CBOC)
    GalileoE1,
    /// BeiDou B1I (1561.098 MHz, 2.046 Mchip/s)
    BeiDouB1I,
}

/// GLONASS FDMA channel spacing on G1.
pub const GLONASS_G1_SPACING_HZ: f64 = 562_500.0;

/// Valid GLONASS G1 frequency slots.
pub const GLONASS_G1_SLOTS: std::ops::RangeInclusive<i8> = -7..=6;

impl std::fmt::Display for SignalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GpsL1Ca => write!(f, "L1CA"),
            Self::GpsL5 => write!(f, "L5"),
            Self::GlonassG1 => write!(f, "G1"),
            Self::GalileoE1 => write!(f, "E1"),
            Self::BeiDouB1I => write!(f, "B1I"),
        }
    }
}

impl SignalKind {
    /// Constellation broadcasting this signal.
    pub fn constellation(&self) -> Constellation {
        match self {
            Self::GpsL1Ca | Self::GpsL5 => Constellation::Gps,
            Self::GlonassG1 => Constellation::Glonass,
            Self::GalileoE1 => Constellation::Galileo,
            Self::BeiDouB1I => Constellation::BeiDou,
        }
    }

    /// Nominal carrier frequency in Hz (G1 center for GLONASS).
    pub fn carrier_frequency_hz(&self) -> f64 {
        match self {
            Self::GpsL1Ca | Self::GalileoE1 => 1_575_420_000.0,
            Self::GpsL5 => 1_176_450_000.0,
            Self::GlonassG1 => 1_602_000_000.0,
            Self::BeiDouB1I => 1_561_098_000.0,
        }
    }

    /// Chipping rate in chips/second.
    pub fn chipping_rate(&self) -> f64 {
        match self {
            Self::GpsL1Ca | Self::GalileoE1 => 1_023_000.0,
            Self::GpsL5 => 10_230_000.0,
            Self::GlonassG1 => 511_000.0,
            Self::BeiDouB1I => 2_046_000.0,
        }
    }

    /// Primary code length in chips.
    pub fn code_length(&self) -> usize {
        match self {
            Self::GpsL1Ca => 1023,
            Self::GpsL5 => 10230,
            Self::GlonassG1 => 511,
            Self::GalileoE1 => 4092,
            Self::BeiDouB1I => 2046,
        }
    }

    /// Duration of one navigation data bit in milliseconds.
    pub fn nav_bit_period_ms(&self) -> u32 {
        match self {
            Self::GpsL1Ca | Self::GlonassG1 | Self::BeiDouB1I => 20,
            Self::GpsL5 => 10,
            Self::GalileoE1 => 4,
        }
    }
}

/// Space-vehicle identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SvId {
    pub constellation: Constellation,
    /// PRN (GPS, Galileo, BeiDou) or slot number (GLONASS), 1-based.
    pub number: u8,
}

impl SvId {
    pub fn gps(number: u8) -> Self {
        Self {
            constellation: Constellation::Gps,
            number,
        }
    }

    pub fn glonass(number: u8) -> Self {
        Self {
            constellation: Constellation::Glonass,
            number,
        }
    }

    pub fn galileo(number: u8) -> Self {
        Self {
            constellation: Constellation::Galileo,
            number,
        }
    }

    pub fn beidou(number: u8) -> Self {
        Self {
            constellation: Constellation::BeiDou,
            number,
        }
    }
}

impl std::fmt::Display for SvId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.constellation {
            Constellation::Gps => "G",
            Constellation::Glonass => "R",
            Constellation::Galileo => "E",
            Constellation::BeiDou => "C",
        };
        write!(f, "{}{:02}", prefix, self.number)
    }
}

/// One satellite-signal pairing synthesized by a single channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelSpec {
    pub sv: SvId,
    pub signal: SignalKind,
    /// Intermediate frequency the signal is centered on, in Hz.
    pub if_hz: f64,
    /// GLONASS frequency slot k (-7..=6); `None` for CDMA signals.
    pub fdma_slot: Option<i8>,
}

impl ChannelSpec {
    pub fn new(sv: SvId, signal: SignalKind, if_hz: f64) -> Self {
        Self {
            sv,
            signal,
            if_hz,
            fdma_slot: None,
        }
    }

    /// Attach a GLONASS frequency slot.
    pub fn with_fdma_slot(mut self, k: i8) -> Self {
        self.fdma_slot = Some(k);
        self
    }

    /// FDMA offset from the band center in Hz.
    pub fn fdma_offset_hz(&self) -> f64 {
        match self.fdma_slot {
            Some(k) if self.signal == SignalKind::GlonassG1 => k as f64 * GLONASS_G1_SPACING_HZ,
            _ => 0.0,
        }
    }

    /// Carrier frequency the channel is centered on in the IF stream.
    pub fn center_hz(&self) -> f64 {
        self.if_hz + self.fdma_offset_hz()
    }

    /// Short label such as `G07/L1CA`.
    pub fn label(&self) -> String {
        format!("{}/{}", self.sv, self.signal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constellation_of_signal() {
        assert_eq!(SignalKind::GpsL1Ca.constellation(), Constellation::Gps);
        assert_eq!(SignalKind::GlonassG1.constellation(), Constellation::Glonass);
        assert_eq!(SignalKind::BeiDouB1I.constellation(), Constellation::BeiDou);
    }

    #[test]
    fn glonass_fdma_offset() {
        let spec = ChannelSpec::new(SvId::glonass(3), SignalKind::GlonassG1, 0.0).with_fdma_slot(-7);
        assert_eq!(spec.fdma_offset_hz(), -7.0 * 562_500.0);
        assert_eq!(spec.center_hz(), -3_937_500.0);
    }

    #[test]
    fn fdma_slot_ignored_for_cdma() {
        let spec = ChannelSpec::new(SvId::gps(1), SignalKind::GpsL1Ca, 1000.0).with_fdma_slot(2);
        assert_eq!(spec.center_hz(), 1000.0);
    }

    #[test]
    fn one_millisecond_codes() {
        for kind in [SignalKind::GpsL1Ca, SignalKind::GlonassG1, SignalKind::BeiDouB1I] {
            let period = kind.code_length() as f64 / kind.chipping_rate();
            assert!((period - 0.001).abs() < 1e-12, "{kind}");
        }
    }

    #[test]
    fn labels() {
        let spec = ChannelSpec::new(SvId::gps(7), SignalKind::GpsL1Ca, 0.0);
        assert_eq!(spec.label(), "G07/L1CA");
        assert_eq!(SvId::beidou(12).to_string(), "C12");
    }
}
