//! Automatic gain control driven by the quantizer's clipping rate.
//!
//! The controller accumulates clipped/total component counts every epoch
//! and acts only at checkpoints (every `interval_epochs`):
//!
//! - rate > upper: gain ×= attenuate, statistics reset
//! - rate < lower and gain below ceiling: gain ×= recover (capped), statistics reset
//! - otherwise nothing changes and the statistics keep accumulating
//!
//! Statistics are reset only when the controller acts, so a rate parked
//! between the two thresholds is carried into the next checkpoint.

use crate::config::AgcConfig;
use crate::invariant_ppt::{
    assert_invariant, AGC_RESET_ON_ACTION, CLIP_COUNT_BOUNDED, GAIN_CEILING, GAIN_POSITIVE,
};

/// Clipped and total component counters since the last reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClipStats {
    clipped: u64,
    total: u64,
}

impl ClipStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one epoch's counts.
    pub fn add(&mut self, clipped: u64, total: u64) {
        self.clipped += clipped;
        self.total += total;
        assert_invariant(
            CLIP_COUNT_BOUNDED,
            self.clipped <= self.total,
            "clipped count exceeds total count",
            Some("ClipStats::add"),
        );
    }

    pub fn clipped(&self) -> u64 {
        self.clipped
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Clip rate in [0, 1]; zero when nothing has been counted.
    pub fn rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.clipped as f64 / self.total as f64
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Outcome of one AGC observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AgcAction {
    /// Gain unchanged.
    Hold,
    /// Gain reduced after excessive clipping.
    Attenuated { from: f64, to: f64, rate: f64 },
    /// Gain raised back toward the ceiling.
    Recovered { from: f64, to: f64, rate: f64 },
}

/// Gain state and clipping statistics.
#[derive(Debug, Clone)]
pub struct AgcController {
    config: AgcConfig,
    gain: f64,
    stats: ClipStats,
    epochs: u64,
}

impl AgcController {
    pub fn new(config: AgcConfig, initial_gain: f64) -> Self {
        Self {
            config,
            gain: initial_gain,
            stats: ClipStats::new(),
            epochs: 0,
        }
    }

    /// Current gain applied by the quantizer.
    pub fn gain(&self) -> f64 {
        self.gain
    }

    /// Statistics since the last AGC action.
    pub fn stats(&self) -> ClipStats {
        self.stats
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.config.enabled = enabled;
    }

    /// Override the gain, clamped into (0, max_gain]. Statistics restart.
    pub fn set_gain(&mut self, gain: f64) {
        if gain.is_finite() && gain > 0.0 {
            self.gain = gain.min(self.config.max_gain);
            self.stats.reset();
        }
    }

    /// Feed one epoch's clip and component counts; may adjust the gain.
    pub fn observe(&mut self, clipped: u64, total: u64) -> AgcAction {
        self.stats.add(clipped, total);
        self.epochs += 1;
        if !self.config.enabled || self.epochs % self.config.interval_epochs != 0 {
            return AgcAction::Hold;
        }
        self.evaluate()
    }

    fn evaluate(&mut self) -> AgcAction {
        if self.stats.total() == 0 {
            return AgcAction::Hold;
        }
        let rate = self.stats.rate();
        let from = self.gain;
        let action = if rate > self.config.upper_rate {
            self.gain *= self.config.attenuate;
            AgcAction::Attenuated {
                from,
                to: self.gain,
                rate,
            }
        } else if rate < self.config.lower_rate && self.gain < self.config.max_gain {
            self.gain = (self.gain * self.config.recover).min(self.config.max_gain);
            AgcAction::Recovered {
                from,
                to: self.gain,
                rate,
            }
        } else {
            return AgcAction::Hold;
        };

        self.stats.reset();
        assert_invariant(
            AGC_RESET_ON_ACTION,
            self.stats.total() == 0 && self.stats.clipped() == 0,
            "statistics must restart after a gain change",
            Some("AgcController::evaluate"),
        );
        assert_invariant(
            GAIN_CEILING,
            self.gain <= self.config.max_gain,
            "gain above ceiling",
            Some("AgcController::evaluate"),
        );
        assert_invariant(GAIN_POSITIVE, self.gain > 0.0, "gain must stay positive", None);
        action
    }
}
