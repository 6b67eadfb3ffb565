//! RT module: the persistent channel worker pool.
//!
//! One thread per channel, permanently bound to that channel's slot in the
//! run's channel arena. Workers meet the controller twice per epoch at the
//! [`EpochBarrier`]; in between they only touch their own slot.

// IMPORTANT: Do not call assert_invariant or any PPT logging in RT paths to avoid locks/allocs.

use crate::barrier::{EpochBarrier, Release};
use crate::channel::ChannelGenerator;
use crate::error::{SynthError, SynthResult};
use crate::invariant_rt::{
    new_invariant_queue, signal_invariant, INV_EPOCH_COMPLETED, INV_PARAMS_APPLIED,
    INV_RELEASE_OBSERVED, INV_SAMPLE_BUFFER_FILLED, INV_SHUTDOWN_OBSERVED, INV_WORKER_CLEAN,
};
use crate::states::WorkerState;
use crate::types::{ChannelId, EpochTime, IqSample, PhysicalParams, MAX_CHANNELS};
use rtrb::{Consumer, Producer};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

/// One channel's entry in the arena: generator, sample buffer and the
/// parameters staged for its next epoch.
pub struct ChannelSlot {
    generator: Box<dyn ChannelGenerator>,
    buffer: Vec<IqSample>,
    params: PhysicalParams,
    params_pending: bool,
}

/// Shared state of a run: the barrier plus the channel arena.
///
/// Slot locks are never contended: a worker holds its slot only while
/// released, the controller only between `await_done` and the next release.
pub struct RunContext {
    barrier: EpochBarrier,
    slots: Vec<Mutex<ChannelSlot>>,
    labels: Vec<String>,
    samples_per_epoch: usize,
}

impl RunContext {
    pub fn barrier(&self) -> &EpochBarrier {
        &self.barrier
    }

    pub fn channel_count(&self) -> usize {
        self.slots.len()
    }

    pub fn samples_per_epoch(&self) -> usize {
        self.samples_per_epoch
    }

    /// Label of the channel at `id`.
    pub fn label(&self, id: ChannelId) -> &str {
        self.labels.get(id.0).map_or("?", String::as_str)
    }
}

/// Fixed pool of channel workers.
pub struct WorkerPool {
    ctx: Arc<RunContext>,
    handles: Vec<JoinHandle<()>>,
    signals: Vec<Consumer<u8>>,
}

impl WorkerPool {
    /// Build the channel arena and spawn one worker per generator.
    pub fn start(
        generators: Vec<Box<dyn ChannelGenerator>>,
        samples_per_epoch: usize,
    ) -> SynthResult<Self> {
        let n = generators.len();
        if n == 0 {
            return Err(SynthError::NoChannels);
        }
        if n > MAX_CHANNELS {
            return Err(SynthError::TooManyChannels {
                requested: n,
                max: MAX_CHANNELS,
            });
        }

        let labels: Vec<String> = generators.iter().map(|g| g.label()).collect();
        let slots = generators
            .into_iter()
            .map(|generator| {
                Mutex::new(ChannelSlot {
                    generator,
                    buffer: vec![IqSample::new(0.0, 0.0); samples_per_epoch],
                    params: PhysicalParams::default(),
                    params_pending: false,
                })
            })
            .collect();
        let ctx = Arc::new(RunContext {
            barrier: EpochBarrier::new(n),
            slots,
            labels,
            samples_per_epoch,
        });

        let mut pool = Self {
            ctx,
            handles: Vec::with_capacity(n),
            signals: Vec::with_capacity(n),
        };
        for k in 0..n {
            let (tx, rx) = new_invariant_queue();
            let ctx = Arc::clone(&pool.ctx);
            let spawned = std::thread::Builder::new()
                .name(format!("ifsynth-{}", pool.ctx.label(ChannelId(k))))
                .spawn(move || worker_loop(ChannelId(k), ctx, tx));
            match spawned {
                Ok(handle) => {
                    pool.handles.push(handle);
                    pool.signals.push(rx);
                }
                Err(err) => {
                    // Drop joins the workers already spawned.
                    return Err(SynthError::WorkerSpawn(err));
                }
            }
        }
        log::info!(
            "worker pool started: {} channels, {} samples per epoch",
            n,
            samples_per_epoch
        );
        Ok(pool)
    }

    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    pub fn channel_count(&self) -> usize {
        self.ctx.channel_count()
    }

    pub fn samples_per_epoch(&self) -> usize {
        self.ctx.samples_per_epoch
    }

    fn with_slot<R>(
        &self,
        id: usize,
        f: impl FnOnce(&mut ChannelSlot) -> R,
    ) -> SynthResult<R> {
        let mut slot = self.ctx.slots[id]
            .try_lock()
            .map_err(|_| SynthError::BarrierViolation("channel slot held by a running worker"))?;
        Ok(f(&mut slot))
    }

    /// Stage per-channel parameters for the next epoch. Call between
    /// `await_done` and `release`.
    pub fn set_params(&self, params: &[PhysicalParams]) -> SynthResult<()> {
        if params.len() != self.channel_count() {
            return Err(SynthError::ParamCount {
                expected: self.channel_count(),
                actual: params.len(),
            });
        }
        for (id, p) in params.iter().enumerate() {
            self.with_slot(id, |slot| {
                slot.params = *p;
                slot.params_pending = true;
            })?;
        }
        Ok(())
    }

    /// Wait for every worker to be ready, then release them for `time`.
    /// Returns the release token.
    pub fn release(&self, time: EpochTime) -> SynthResult<u64> {
        self.ctx.barrier.await_ready()?;
        Ok(self.ctx.barrier.release(time)?)
    }

    /// Wait until every worker finished the released epoch.
    pub fn await_done(&self) -> SynthResult<()> {
        Ok(self.ctx.barrier.await_done()?)
    }

    /// Release one epoch and wait for it to complete.
    pub fn run_epoch(&self, time: EpochTime) -> SynthResult<u64> {
        let token = self.release(time)?;
        self.await_done()?;
        Ok(token)
    }

    /// Add every channel's buffer into `acc`, sample by sample. Returns
    /// the number of channels summed.
    pub fn accumulate_into(&self, acc: &mut [IqSample]) -> SynthResult<usize> {
        let mut summed = 0;
        for id in 0..self.channel_count() {
            self.with_slot(id, |slot| {
                for (a, s) in acc.iter_mut().zip(&slot.buffer) {
                    *a += *s;
                }
            })?;
            summed += 1;
        }
        Ok(summed)
    }

    /// Copy of one channel's most recent buffer.
    pub fn channel_buffer(&self, id: ChannelId) -> SynthResult<Vec<IqSample>> {
        if id.0 >= self.channel_count() {
            return Err(SynthError::BarrierViolation("channel index out of range"));
        }
        self.with_slot(id.0, |slot| slot.buffer.clone())
    }

    /// Drain every worker's invariant signals.
    pub fn drain_invariant_signals(&mut self) -> Vec<u8> {
        let mut signals = Vec::new();
        for rx in &mut self.signals {
            while let Ok(id) = rx.pop() {
                signals.push(id);
            }
        }
        signals
    }

    /// Drain pending signals and return how many epoch completions were
    /// among them.
    pub fn drain_completions(&mut self) -> usize {
        let mut completed = 0;
        for rx in &mut self.signals {
            while let Ok(id) = rx.pop() {
                completed += (id == INV_EPOCH_COMPLETED) as usize;
            }
        }
        completed
    }

    pub fn worker_states(&self) -> SynthResult<Vec<WorkerState>> {
        Ok(self.ctx.barrier.worker_states()?)
    }

    pub fn is_shut_down(&self) -> bool {
        self.ctx.barrier.is_shut_down()
    }

    /// Shut the barrier down and join every worker. Returns the number of
    /// threads joined by this call.
    pub fn shutdown(&mut self) -> SynthResult<usize> {
        self.ctx.barrier.shutdown();
        let mut joined = 0;
        let mut clean = true;
        for handle in self.handles.drain(..) {
            clean &= handle.join().is_ok();
            joined += 1;
        }
        if !clean {
            return Err(SynthError::BarrierViolation("worker thread panicked outside its epoch"));
        }
        if joined > 0 {
            log::info!("worker pool shut down: {} workers joined", joined);
        }
        Ok(joined)
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if !self.handles.is_empty() {
            let _ = self.shutdown();
        }
    }
}

fn panic_reason(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}

/// Compute one epoch into the worker's own slot.
fn compute_epoch(
    ctx: &RunContext,
    id: ChannelId,
    time: EpochTime,
    signals: &mut Producer<u8>,
) -> Result<(), &'static str> {
    let mut guard = ctx.slots[id.0]
        .lock()
        .map_err(|_| "channel slot poisoned")?;
    let slot = &mut *guard;
    if slot.params_pending {
        slot.generator.update(&slot.params);
        slot.params_pending = false;
        signal_invariant(signals, INV_PARAMS_APPLIED);
    }
    slot.generator.generate_epoch(time, &mut slot.buffer);
    if slot.buffer.len() == ctx.samples_per_epoch {
        signal_invariant(signals, INV_SAMPLE_BUFFER_FILLED);
    }
    Ok(())
}

fn worker_loop(id: ChannelId, ctx: Arc<RunContext>, mut signals: Producer<u8>) {
    let barrier = &ctx.barrier;
    let mut last_token = 0;
    loop {
        let time = match barrier.await_release(id, &mut last_token) {
            Ok(Release::Epoch(time)) => time,
            Ok(Release::Shutdown) => {
                signal_invariant(&mut signals, INV_SHUTDOWN_OBSERVED);
                return;
            }
            Err(_) => return,
        };
        signal_invariant(&mut signals, INV_RELEASE_OBSERVED);

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            compute_epoch(&ctx, id, time, &mut signals)
        }));
        let failure = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(reason)) => Some(reason.to_string()),
            Err(payload) => Some(panic_reason(payload)),
        };
        if let Some(reason) = failure {
            barrier.fail(id, format!("{}: {}", ctx.label(id), reason));
            return;
        }

        signal_invariant(&mut signals, INV_WORKER_CLEAN);
        signal_invariant(&mut signals, INV_EPOCH_COMPLETED);
        if barrier.signal_done(id).is_err() {
            return;
        }
    }
}
