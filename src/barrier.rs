//! Two-phase epoch barrier between one controller and N workers.
//!
//! ```text
//!  worker k                         controller
//!  ────────                         ──────────
//!  await_release: ready += 1  ───▶  await_ready: wait ready == N, ready = 0
//!                 wait token        release(epoch): token += 1, broadcast
//!  (compute epoch)            ◀───
//!  signal_done:   done += 1   ───▶  await_done: wait done == N, done = 0
//! ```
//!
//! All counters, the release token and the shutdown flag live under one
//! mutex; each wait condition has its own condition variable. A worker that
//! observes shutdown while waiting terminates even if the token advanced.

// IMPORTANT: Do not call assert_invariant or any PPT logging here; workers block in this module.

use crate::states::WorkerState;
use crate::types::{ChannelId, EpochTime};
use std::sync::{Condvar, Mutex, MutexGuard};

/// Barrier protocol failures.
#[derive(Debug, Clone, PartialEq)]
pub enum BarrierError {
    /// A worker failed while computing; the run cannot continue.
    WorkerFailed { channel: ChannelId, reason: String },
    /// The barrier mutex was poisoned.
    Poisoned,
    /// The controller waited on a barrier that is already shut down.
    ShutDown,
}

/// What a worker woke up to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Release {
    /// Compute the given epoch.
    Epoch(EpochTime),
    /// Terminate.
    Shutdown,
}

#[derive(Debug)]
struct BarrierState {
    ready: usize,
    done: usize,
    token: u64,
    time: EpochTime,
    shutdown: bool,
    failure: Option<(ChannelId, String)>,
    workers: Vec<WorkerState>,
}

impl BarrierState {
    fn failure_error(&self) -> Option<BarrierError> {
        self.failure
            .as_ref()
            .map(|(channel, reason)| BarrierError::WorkerFailed {
                channel: *channel,
                reason: reason.clone(),
            })
    }
}

/// Reusable epoch barrier for a fixed number of workers.
#[derive(Debug)]
pub struct EpochBarrier {
    parties: usize,
    state: Mutex<BarrierState>,
    ready_cv: Condvar,
    release_cv: Condvar,
    done_cv: Condvar,
}

impl EpochBarrier {
    pub fn new(parties: usize) -> Self {
        Self {
            parties,
            state: Mutex::new(BarrierState {
                ready: 0,
                done: 0,
                token: 0,
                time: EpochTime::start(),
                shutdown: false,
                failure: None,
                workers: vec![WorkerState::Idle; parties],
            }),
            ready_cv: Condvar::new(),
            release_cv: Condvar::new(),
            done_cv: Condvar::new(),
        }
    }

    /// Number of workers synchronized by this barrier.
    pub fn parties(&self) -> usize {
        self.parties
    }

    fn lock(&self) -> Result<MutexGuard<'_, BarrierState>, BarrierError> {
        self.state.lock().map_err(|_| BarrierError::Poisoned)
    }

    // ------------------------------------------------------------------
    // Worker side
    // ------------------------------------------------------------------

    /// Declare readiness, then block until the token moves past
    /// `last_token` or shutdown is set.
    pub fn await_release(
        &self,
        worker: ChannelId,
        last_token: &mut u64,
    ) -> Result<Release, BarrierError> {
        let mut state = self.lock()?;
        state.ready += 1;
        state.workers[worker.0] = WorkerState::ReadyWaiting;
        if state.ready == self.parties {
            self.ready_cv.notify_one();
        }
        while !state.shutdown && state.token == *last_token {
            state = self
                .release_cv
                .wait(state)
                .map_err(|_| BarrierError::Poisoned)?;
        }
        if state.shutdown {
            state.workers[worker.0] = WorkerState::Terminated;
            return Ok(Release::Shutdown);
        }
        *last_token = state.token;
        state.workers[worker.0] = WorkerState::Running;
        Ok(Release::Epoch(state.time))
    }

    /// Report that the released epoch is computed.
    pub fn signal_done(&self, worker: ChannelId) -> Result<(), BarrierError> {
        let mut state = self.lock()?;
        state.done += 1;
        state.workers[worker.0] = WorkerState::Idle;
        if state.done == self.parties {
            self.done_cv.notify_one();
        }
        Ok(())
    }

    /// Record a fatal worker failure and wake the controller.
    ///
    /// Only the first failure is kept.
    pub fn fail(&self, worker: ChannelId, reason: String) {
        // A poisoned barrier already fails every controller wait.
        if let Ok(mut state) = self.state.lock() {
            state.workers[worker.0] = WorkerState::Terminated;
            if state.failure.is_none() {
                state.failure = Some((worker, reason));
            }
        }
        self.ready_cv.notify_all();
        self.done_cv.notify_all();
    }

    // ------------------------------------------------------------------
    // Controller side
    // ------------------------------------------------------------------

    /// Block until every worker declared readiness; resets the counter.
    pub fn await_ready(&self) -> Result<(), BarrierError> {
        let mut state = self.lock()?;
        loop {
            if let Some(err) = state.failure_error() {
                return Err(err);
            }
            if state.shutdown {
                return Err(BarrierError::ShutDown);
            }
            if state.ready >= self.parties {
                break;
            }
            state = self
                .ready_cv
                .wait(state)
                .map_err(|_| BarrierError::Poisoned)?;
        }
        state.ready = 0;
        Ok(())
    }

    /// Broadcast the release for `time`. Returns the new token.
    pub fn release(&self, time: EpochTime) -> Result<u64, BarrierError> {
        let mut state = self.lock()?;
        if state.shutdown {
            return Err(BarrierError::ShutDown);
        }
        state.time = time;
        state.token += 1;
        let token = state.token;
        drop(state);
        self.release_cv.notify_all();
        Ok(token)
    }

    /// Block until every worker reported completion; resets the counter.
    pub fn await_done(&self) -> Result<(), BarrierError> {
        let mut state = self.lock()?;
        loop {
            if let Some(err) = state.failure_error() {
                return Err(err);
            }
            if state.done >= self.parties {
                break;
            }
            state = self
                .done_cv
                .wait(state)
                .map_err(|_| BarrierError::Poisoned)?;
        }
        state.done = 0;
        Ok(())
    }

    /// Set the shutdown flag and wake every waiter.
    ///
    /// Returns `true` only for the call that set the flag.
    pub fn shutdown(&self) -> bool {
        let first = match self.state.lock() {
            Ok(mut state) => !std::mem::replace(&mut state.shutdown, true),
            Err(poisoned) => !std::mem::replace(&mut poisoned.into_inner().shutdown, true),
        };
        self.release_cv.notify_all();
        self.ready_cv.notify_all();
        self.done_cv.notify_all();
        first
    }

    pub fn is_shut_down(&self) -> bool {
        match self.state.lock() {
            Ok(state) => state.shutdown,
            Err(poisoned) => poisoned.into_inner().shutdown,
        }
    }

    /// Current release token (number of epochs released so far).
    pub fn token(&self) -> Result<u64, BarrierError> {
        Ok(self.lock()?.token)
    }

    /// Snapshot of every worker's position in the cycle.
    pub fn worker_states(&self) -> Result<Vec<WorkerState>, BarrierError> {
        Ok(self.lock()?.workers.clone())
    }

    /// The recorded worker failure, if any.
    pub fn failure(&self) -> Option<BarrierError> {
        self.state.lock().ok().and_then(|state| state.failure_error())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use std::thread;

    fn spawn_workers(
        barrier: &Arc<EpochBarrier>,
        computed: &Arc<AtomicU64>,
    ) -> Vec<thread::JoinHandle<u64>> {
        (0..barrier.parties())
            .map(|k| {
                let barrier = Arc::clone(barrier);
                let computed = Arc::clone(computed);
                thread::spawn(move || {
                    let mut last = 0;
                    let mut epochs = 0;
                    while let Ok(Release::Epoch(_)) = barrier.await_release(ChannelId(k), &mut last) {
                        computed.fetch_add(1, Ordering::SeqCst);
                        epochs += 1;
                        if barrier.signal_done(ChannelId(k)).is_err() {
                            break;
                        }
                    }
                    epochs
                })
            })
            .collect()
    }

    #[test]
    fn runs_epochs_in_lockstep() {
        let barrier = Arc::new(EpochBarrier::new(4));
        let computed = Arc::new(AtomicU64::new(0));
        let handles = spawn_workers(&barrier, &computed);

        let mut time = EpochTime::start();
        for k in 0..50u64 {
            barrier.await_ready().unwrap();
            assert_eq!(computed.load(Ordering::SeqCst), 4 * k);
            assert_eq!(barrier.release(time).unwrap(), k + 1);
            barrier.await_done().unwrap();
            assert_eq!(computed.load(Ordering::SeqCst), 4 * (k + 1));
            time = time.next();
        }
        barrier.await_ready().unwrap();
        assert!(barrier.shutdown());
        assert!(!barrier.shutdown());
        for handle in handles {
            assert_eq!(handle.join().unwrap(), 50);
        }
        let states = barrier.worker_states().unwrap();
        assert!(states.iter().all(WorkerState::is_terminated));
    }

    #[test]
    fn shutdown_before_first_release() {
        let barrier = Arc::new(EpochBarrier::new(3));
        let computed = Arc::new(AtomicU64::new(0));
        let handles = spawn_workers(&barrier, &computed);
        barrier.await_ready().unwrap();
        barrier.shutdown();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), 0);
        }
        assert_eq!(computed.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn shutdown_wins_over_pending_release() {
        let barrier = EpochBarrier::new(1);
        let mut last = 0;
        barrier.shutdown();
        // Token never advanced, flag set: terminate without computing.
        assert_eq!(
            barrier.await_release(ChannelId(0), &mut last).unwrap(),
            Release::Shutdown
        );
        assert_eq!(barrier.release(EpochTime::start()), Err(BarrierError::ShutDown));
    }

    #[test]
    fn controller_never_waits_for_ready_after_shutdown() {
        let barrier = EpochBarrier::new(8);
        barrier.shutdown();
        assert_eq!(barrier.await_ready(), Err(BarrierError::ShutDown));
    }

    #[test]
    fn failure_surfaces_to_controller() {
        let barrier = Arc::new(EpochBarrier::new(2));
        let worker = {
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let mut last = 0;
                if let Ok(Release::Epoch(_)) = barrier.await_release(ChannelId(1), &mut last) {
                    barrier.fail(ChannelId(1), "generator exploded".into());
                }
            })
        };
        {
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let mut last = 0;
                if let Ok(Release::Epoch(_)) = barrier.await_release(ChannelId(0), &mut last) {
                    let _ = barrier.signal_done(ChannelId(0));
                }
            });
        }
        barrier.await_ready().unwrap();
        barrier.release(EpochTime::start()).unwrap();
        let err = barrier.await_done().unwrap_err();
        assert_eq!(
            err,
            BarrierError::WorkerFailed {
                channel: ChannelId(1),
                reason: "generator exploded".into()
            }
        );
        worker.join().unwrap();
        barrier.shutdown();
        assert!(barrier.failure().is_some());
    }
}
