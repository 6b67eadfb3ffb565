//! Core sample, identity and timing types shared by every stage.

use num_complex::Complex64;

/// A single complex baseband sample (I = re, Q = im).
pub type IqSample = Complex64;

/// Upper bound on concurrently synthesized channels (one worker each).
pub const MAX_CHANNELS: usize = 128;

/// Duration of one epoch in seconds.
pub const EPOCH_SECONDS: f64 = 0.001;

/// Index of a channel inside the run's channel arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(pub usize);

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ch{}", self.0)
    }
}

/// Simulated time at the start of an epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochTime {
    /// Epoch counter, 0 for the first synthesized millisecond.
    pub epoch: u64,
    /// Seconds since the start of the run.
    pub seconds: f64,
}

impl EpochTime {
    /// The first epoch of a run.
    pub const fn start() -> Self {
        Self {
            epoch: 0,
            seconds: 0.0,
        }
    }

    /// The epoch following this one.
    pub fn next(self) -> Self {
        let epoch = self.epoch + 1;
        Self {
            epoch,
            // Recomputed from the counter so rounding never accumulates.
            seconds: epoch as f64 * EPOCH_SECONDS,
        }
    }
}

/// Per-channel physical state for one epoch, produced by the scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicalParams {
    /// Carrier Doppler in Hz (positive when the satellite approaches).
    pub doppler_hz: f64,
    /// Carrier-to-noise density in dB-Hz.
    pub cn0_dbhz: f64,
}

impl PhysicalParams {
    pub fn new(doppler_hz: f64, cn0_dbhz: f64) -> Self {
        Self {
            doppler_hz,
            cn0_dbhz,
        }
    }
}

impl Default for PhysicalParams {
    fn default() -> Self {
        Self::new(0.0, 45.0)
    }
}
