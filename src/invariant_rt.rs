//! RT-safe invariant signaling for channel worker threads.
//!
//! This module provides a two-tier invariant system:
//! - **Tier 1 (RT-safe)**: Lock-free signaling of invariant IDs from workers
//! - **Tier 2 (Non-RT)**: Verification and contract testing on the controller
//!
//! Workers **signal facts**. The controller **judges correctness**.
//!
//! Each worker owns the producer half of its own SPSC queue, so signaling
//! never allocates, never locks and never panics. If a queue is full the
//! signal is dropped.

use rtrb::{Consumer, Producer, RingBuffer};

// ============================================================================
// RT-Safe Invariant IDs (Tier 1)
// ============================================================================

/// Worker woke on a release token newer than the last one it saw.
pub const INV_RELEASE_OBSERVED: u8 = 1;

/// Channel generator filled the whole epoch buffer.
pub const INV_SAMPLE_BUFFER_FILLED: u8 = 2;

/// Worker reported completion for the epoch it was released for.
pub const INV_EPOCH_COMPLETED: u8 = 3;

/// Worker observed shutdown and is terminating.
pub const INV_SHUTDOWN_OBSERVED: u8 = 4;

/// Epoch computation finished without panic or error.
pub const INV_WORKER_CLEAN: u8 = 5;

/// Worker applied fresh physical parameters before computing.
pub const INV_PARAMS_APPLIED: u8 = 6;

// ============================================================================
// Invariant Signal Queue
// ============================================================================

/// Capacity of each worker's signal queue.
pub const INVARIANT_QUEUE_CAPACITY: usize = 256;

/// Creates a new invariant signal queue pair.
///
/// Returns (producer for the worker, consumer for the controller).
pub fn new_invariant_queue() -> (Producer<u8>, Consumer<u8>) {
    RingBuffer::new(INVARIANT_QUEUE_CAPACITY)
}

/// Signals an invariant from a worker thread. Drops the signal if full.
#[inline]
pub fn signal_invariant(tx: &mut Producer<u8>, id: u8) {
    let _ = tx.push(id);
}

// ============================================================================
// Non-RT Verification (Tier 2)
// ============================================================================

/// Drains all pending invariant signals from the queue.
pub fn drain_invariant_signals(rx: &mut Consumer<u8>) -> Vec<u8> {
    let mut signals = Vec::with_capacity(rx.slots());
    while let Ok(id) = rx.pop() {
        signals.push(id);
    }
    signals
}

/// Counts occurrences of each invariant ID in a signal list.
pub fn count_invariant_signals(signals: &[u8]) -> [usize; 256] {
    let mut counts = [0usize; 256];
    for &id in signals {
        counts[id as usize] += 1;
    }
    counts
}

/// Contract verification: asserts that required invariants were signaled.
///
/// # Panics
/// Panics if any required invariant was not signaled at least once.
#[cfg(any(test, feature = "ppt"))]
pub fn contract_test_rt(contract_name: &str, signals: &[u8], required: &[u8]) {
    let counts = count_invariant_signals(signals);
    let missing: Vec<&str> = required
        .iter()
        .filter(|&&id| counts[id as usize] == 0)
        .map(|&id| invariant_name(id))
        .collect();

    if !missing.is_empty() {
        let present: std::collections::BTreeSet<&str> =
            signals.iter().map(|&id| invariant_name(id)).collect();
        panic!(
            "RT Contract '{}' missing invariants: {:?}. Present: {:?}",
            contract_name, missing, present
        );
    }
}

/// Maps invariant ID to human-readable name (for diagnostics only).
pub const fn invariant_name(id: u8) -> &'static str {
    match id {
        INV_RELEASE_OBSERVED => "RELEASE_OBSERVED",
        INV_SAMPLE_BUFFER_FILLED => "SAMPLE_BUFFER_FILLED",
        INV_EPOCH_COMPLETED => "EPOCH_COMPLETED",
        INV_SHUTDOWN_OBSERVED => "SHUTDOWN_OBSERVED",
        INV_WORKER_CLEAN => "WORKER_CLEAN",
        INV_PARAMS_APPLIED => "PARAMS_APPLIED",
        _ => "UNKNOWN",
    }
}
