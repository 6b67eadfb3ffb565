//! Scene: the per-epoch physical state of every channel.
//!
//! Orbit, visibility, Doppler and power modeling sit behind this trait. The
//! orchestrator asks it once per epoch for fresh parameters; returning
//! `false` from [`Scene::advance`] ends the run normally.

use crate::signal::ChannelSpec;
use crate::types::{EpochTime, PhysicalParams};

/// Provider of channel membership and per-epoch physical parameters.
pub trait Scene {
    /// Channels visible at the start of the run. Fixed for the whole run.
    fn channels(&self) -> Vec<ChannelSpec>;

    /// Parameters used to initialize the generators.
    fn initial_params(&self) -> Vec<PhysicalParams>;

    /// Fill `params` (one entry per channel) for the epoch starting at
    /// `time`. Returns `false` once the trajectory is exhausted.
    fn advance(&mut self, time: EpochTime, params: &mut [PhysicalParams]) -> bool;
}

/// Linear Doppler ramp with constant C/N0 for one channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearTrack {
    pub spec: ChannelSpec,
    pub doppler_hz: f64,
    /// Doppler rate in Hz/s.
    pub doppler_rate_hz_s: f64,
    pub cn0_dbhz: f64,
}

impl LinearTrack {
    pub fn new(spec: ChannelSpec, doppler_hz: f64, doppler_rate_hz_s: f64, cn0_dbhz: f64) -> Self {
        Self {
            spec,
            doppler_hz,
            doppler_rate_hz_s,
            cn0_dbhz,
        }
    }

    fn params_at(&self, seconds: f64) -> PhysicalParams {
        PhysicalParams::new(self.doppler_hz + self.doppler_rate_hz_s * seconds, self.cn0_dbhz)
    }
}

/// Fixed channel set with linear Doppler tracks and a fixed duration.
#[derive(Debug, Clone)]
pub struct LinearScene {
    tracks: Vec<LinearTrack>,
    duration_epochs: u64,
}

impl LinearScene {
    pub fn new(duration_epochs: u64) -> Self {
        Self {
            tracks: Vec::new(),
            duration_epochs,
        }
    }

    pub fn with_track(mut self, track: LinearTrack) -> Self {
        self.tracks.push(track);
        self
    }

    pub fn duration_epochs(&self) -> u64 {
        self.duration_epochs
    }
}

impl Scene for LinearScene {
    fn channels(&self) -> Vec<ChannelSpec> {
        self.tracks.iter().map(|t| t.spec).collect()
    }

    fn initial_params(&self) -> Vec<PhysicalParams> {
        self.tracks.iter().map(|t| t.params_at(0.0)).collect()
    }

    fn advance(&mut self, time: EpochTime, params: &mut [PhysicalParams]) -> bool {
        if time.epoch >= self.duration_epochs {
            return false;
        }
        for (p, track) in params.iter_mut().zip(&self.tracks) {
            *p = track.params_at(time.seconds);
        }
        true
    }
}
