//! Test harness: scripted generators and scenes for pool and orchestrator proofs.

use crate::channel::ChannelGenerator;
use crate::error::SynthResult;
use crate::navbits::NavBitSource;
use crate::scene::Scene;
use crate::signal::{ChannelSpec, SignalKind, SvId};
use crate::types::{EpochTime, IqSample, PhysicalParams};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Generator that replays fixed buffers, cycling by epoch number.
#[derive(Debug, Clone)]
pub struct FixedGenerator {
    label: String,
    epochs: Vec<Vec<IqSample>>,
}

impl FixedGenerator {
    pub fn new(label: &str, epochs: Vec<Vec<IqSample>>) -> Self {
        Self {
            label: label.to_string(),
            epochs,
        }
    }

    /// Every sample of every epoch equal to `value`.
    pub fn constant(label: &str, value: IqSample, samples_per_epoch: usize) -> Self {
        Self::new(label, vec![vec![value; samples_per_epoch]])
    }
}

impl ChannelGenerator for FixedGenerator {
    fn initialize(
        &mut self,
        _time: EpochTime,
        _params: &PhysicalParams,
        _nav: Arc<dyn NavBitSource>,
    ) -> SynthResult<()> {
        Ok(())
    }

    fn update(&mut self, _params: &PhysicalParams) {}

    fn generate_epoch(&mut self, time: EpochTime, out: &mut [IqSample]) {
        out.fill(IqSample::new(0.0, 0.0));
        if self.epochs.is_empty() {
            return;
        }
        let script = &self.epochs[(time.epoch % self.epochs.len() as u64) as usize];
        for (o, s) in out.iter_mut().zip(script) {
            *o = *s;
        }
    }

    fn label(&self) -> String {
        self.label.clone()
    }
}

/// Generator that panics when asked for a given epoch.
#[derive(Debug, Clone)]
pub struct FailingGenerator {
    label: String,
    fail_at: u64,
}

impl FailingGenerator {
    pub fn new(label: &str, fail_at: u64) -> Self {
        Self {
            label: label.to_string(),
            fail_at,
        }
    }
}

impl ChannelGenerator for FailingGenerator {
    fn initialize(
        &mut self,
        _time: EpochTime,
        _params: &PhysicalParams,
        _nav: Arc<dyn NavBitSource>,
    ) -> SynthResult<()> {
        Ok(())
    }

    fn update(&mut self, _params: &PhysicalParams) {}

    fn generate_epoch(&mut self, time: EpochTime, out: &mut [IqSample]) {
        if time.epoch == self.fail_at {
            panic!("injected failure at epoch {}", time.epoch);
        }
        out.fill(IqSample::new(0.0, 0.0));
    }

    fn label(&self) -> String {
        self.label.clone()
    }
}

/// One `generate_epoch` call as seen by a [`RecordingGenerator`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochRecord {
    pub channel: usize,
    pub epoch: u64,
    /// Controller's released-epoch marker observed at entry.
    pub released: u64,
    /// Address range `[start, end)` written during the call.
    pub written: (usize, usize),
    /// Address of the generator's own state.
    pub state_addr: usize,
    pub params: PhysicalParams,
}

/// Shared log of [`EpochRecord`]s.
pub type RecordLog = Arc<Mutex<Vec<EpochRecord>>>;

/// Generator that records every epoch it computes.
#[derive(Debug)]
pub struct RecordingGenerator {
    channel: usize,
    released: Arc<AtomicU64>,
    log: RecordLog,
    params: PhysicalParams,
    counter: u64,
}

impl RecordingGenerator {
    /// `released` is bumped by the test controller before each release.
    pub fn new(channel: usize, released: Arc<AtomicU64>, log: RecordLog) -> Self {
        Self {
            channel,
            released,
            log,
            params: PhysicalParams::default(),
            counter: 0,
        }
    }
}

impl ChannelGenerator for RecordingGenerator {
    fn initialize(
        &mut self,
        _time: EpochTime,
        params: &PhysicalParams,
        _nav: Arc<dyn NavBitSource>,
    ) -> SynthResult<()> {
        self.params = *params;
        Ok(())
    }

    fn update(&mut self, params: &PhysicalParams) {
        self.params = *params;
    }

    fn generate_epoch(&mut self, time: EpochTime, out: &mut [IqSample]) {
        let released = self.released.load(Ordering::SeqCst);
        self.counter += 1;
        let value = self.channel as f64 + self.counter as f64 * 1e-3;
        out.fill(IqSample::new(value, -value));
        let range = out.as_ptr_range();
        let record = EpochRecord {
            channel: self.channel,
            epoch: time.epoch,
            released,
            written: (range.start as usize, range.end as usize),
            state_addr: &self.counter as *const u64 as usize,
            params: self.params,
        };
        if let Ok(mut log) = self.log.lock() {
            log.push(record);
        }
    }

    fn label(&self) -> String {
        format!("rec{}", self.channel)
    }
}

/// Scene with constant parameters and a fixed number of epochs.
#[derive(Debug, Clone)]
pub struct ScriptedScene {
    specs: Vec<ChannelSpec>,
    params: PhysicalParams,
    epochs: u64,
}

impl ScriptedScene {
    /// `channels` GPS L1 C/A channels (PRN 1, 2, ...) lasting `epochs` epochs.
    pub fn gps(channels: usize, epochs: u64) -> Self {
        let specs = (0..channels)
            .map(|k| ChannelSpec::new(SvId::gps((k % 32) as u8 + 1), SignalKind::GpsL1Ca, 0.0))
            .collect();
        Self {
            specs,
            params: PhysicalParams::default(),
            epochs,
        }
    }

    pub fn with_params(mut self, params: PhysicalParams) -> Self {
        self.params = params;
        self
    }
}

impl Scene for ScriptedScene {
    fn channels(&self) -> Vec<ChannelSpec> {
        self.specs.clone()
    }

    fn initial_params(&self) -> Vec<PhysicalParams> {
        vec![self.params; self.specs.len()]
    }

    fn advance(&mut self, time: EpochTime, params: &mut [PhysicalParams]) -> bool {
        if time.epoch >= self.epochs {
            return false;
        }
        params.fill(self.params);
        true
    }
}
