//! PPT Invariant System: runtime invariant enforcement with contract tracking.
//!
//! Controller-side code asserts invariants here; worker threads never do
//! (they signal through [`crate::invariant_rt`] instead).

#[cfg(feature = "ppt")]
use lazy_static::lazy_static;
#[cfg(feature = "ppt")]
use std::collections::HashSet;
#[cfg(feature = "ppt")]
use std::sync::Mutex;

// Invariant constants for contract tracking.
pub const CONFIG_VALIDATED: u32 = 1;
pub const CHANNEL_SET_FROZEN: u32 = 2;
pub const CHANNEL_LIMIT: u32 = 3;
pub const NAV_SOURCE_RESOLVED: u32 = 4;
pub const POOL_STARTED: u32 = 5;
pub const SINGLE_RELEASE_PER_EPOCH: u32 = 6;
pub const EPOCH_FULLY_COMPUTED: u32 = 7;
pub const EPOCH_MONOTONIC: u32 = 8;
pub const NOISE_BUFFER_FILLED: u32 = 9;
pub const CHANNELS_SUMMED: u32 = 10;
pub const QUANTIZED_LENGTH: u32 = 11;
pub const CLIP_COUNT_BOUNDED: u32 = 12;
pub const AGC_RESET_ON_ACTION: u32 = 13;
pub const GAIN_CEILING: u32 = 14;
pub const GAIN_POSITIVE: u32 = 15;
pub const SINK_WRITTEN: u32 = 16;
pub const SHUTDOWN_ONCE: u32 = 17;
pub const WORKERS_JOINED: u32 = 18;

#[cfg(feature = "ppt")]
lazy_static! {
    static ref INVARIANT_LOG: Mutex<HashSet<u32>> = Mutex::new(HashSet::new());
}

#[cfg(feature = "ppt")]
/// Assert an invariant: logs it and panics on failure.
pub(crate) fn assert_invariant(id: u32, condition: bool, message: &str, context: Option<&str>) {
    if !condition {
        let full_message = if let Some(ctx) = context {
            format!("Invariant {} failed: {} (context: {})", id, message, ctx)
        } else {
            format!("Invariant {} failed: {}", id, message)
        };
        log::error!("{}", full_message);
        panic!("{}", full_message);
    }
    // A poisoned log only loses bookkeeping, never the check itself.
    if let Ok(mut log) = INVARIANT_LOG.lock() {
        log.insert(id);
    }
}

#[cfg(not(feature = "ppt"))]
/// Assert an invariant: checks condition and panics on failure.
pub(crate) fn assert_invariant(_id: u32, condition: bool, message: &str, _context: Option<&str>) {
    if !condition {
        panic!("Invariant failed: {}", message);
    }
}

#[cfg(feature = "ppt")]
/// Contract test: checks that specified invariants were asserted.
pub fn contract_test(test_name: &str, required_invariants: &[u32]) {
    let log = INVARIANT_LOG.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let missing: Vec<u32> = required_invariants
        .iter()
        .copied()
        .filter(|inv| !log.contains(inv))
        .collect();
    drop(log); // Drop the lock before panicking
    if !missing.is_empty() {
        panic!(
            "Contract test '{}' failed: invariants not enforced: {:?}",
            test_name, missing
        );
    }
}

#[cfg(not(feature = "ppt"))]
/// Contract test: no-op when PPT feature is disabled.
pub fn contract_test(_test_name: &str, _required_invariants: &[u32]) {}

#[cfg(feature = "ppt")]
/// Clear invariant log (for between test runs).
pub fn clear_invariant_log() {
    if let Ok(mut log) = INVARIANT_LOG.lock() {
        log.clear();
    }
}

#[cfg(not(feature = "ppt"))]
/// Clear invariant log: no-op when PPT feature is disabled.
pub fn clear_invariant_log() {}
