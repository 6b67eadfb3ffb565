//! Worker and channel state definitions for the worker pool.

// IMPORTANT: Do not call assert_invariant or any PPT logging from worker state updates.

/// Position of one worker in the epoch barrier cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerState {
    /// Between epochs, not yet counted as ready.
    Idle,
    /// Counted as ready, blocked until released or shut down.
    ReadyWaiting,
    /// Computing the released epoch.
    Running,
    /// Observed shutdown or failed; the thread is exiting.
    Terminated,
}

impl WorkerState {
    pub fn is_terminated(&self) -> bool {
        matches!(self, WorkerState::Terminated)
    }
}

/// Signal evolution state owned by one channel generator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelState {
    /// Carrier NCO phase in cycles, kept in [0, 1).
    pub carrier_phase: f64,
    /// Code NCO phase in chips, kept in [0, code length).
    pub code_phase: f64,
    /// Completed primary code periods since the start of the run.
    pub code_periods: u64,
    /// Navigation symbol currently modulating the signal (+1 or -1).
    pub nav_bit: i8,
}

impl Default for ChannelState {
    fn default() -> Self {
        Self {
            carrier_phase: 0.0,
            code_phase: 0.0,
            code_periods: 0,
            nav_bit: 1,
        }
    }
}
