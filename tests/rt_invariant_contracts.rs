//! Contract tests for worker invariant signaling.
//!
//! These tests drive the pool with deterministic input and verify that the
//! required invariants fire on the worker side.

use ifsynth::harness::FixedGenerator;
use ifsynth::invariant_rt::{
    contract_test_rt, count_invariant_signals, INV_EPOCH_COMPLETED, INV_PARAMS_APPLIED,
    INV_RELEASE_OBSERVED, INV_SAMPLE_BUFFER_FILLED, INV_SHUTDOWN_OBSERVED, INV_WORKER_CLEAN,
};
use ifsynth::rt::WorkerPool;
use ifsynth::{ChannelGenerator, EpochTime, IqSample, PhysicalParams};

/// Helper to create a pool of constant generators.
fn create_pool(channels: usize, spe: usize) -> WorkerPool {
    let generators: Vec<Box<dyn ChannelGenerator>> = (0..channels)
        .map(|_| {
            Box::new(FixedGenerator::constant("fx", IqSample::new(1.0, 0.0), spe))
                as Box<dyn ChannelGenerator>
        })
        .collect();
    WorkerPool::start(generators, spe).unwrap()
}

#[test]
fn contract_buffer_filled_on_every_epoch() {
    let mut pool = create_pool(3, 32);
    let mut time = EpochTime::start();
    for _ in 0..10 {
        pool.run_epoch(time).unwrap();
        time = time.next();
    }

    let signals = pool.drain_invariant_signals();
    contract_test_rt(
        "sample buffer filled on success",
        &signals,
        &[INV_RELEASE_OBSERVED, INV_SAMPLE_BUFFER_FILLED, INV_WORKER_CLEAN, INV_EPOCH_COMPLETED],
    );
    let counts = count_invariant_signals(&signals);
    assert_eq!(counts[INV_EPOCH_COMPLETED as usize], 30);
    assert_eq!(counts[INV_SAMPLE_BUFFER_FILLED as usize], 30);
    assert_eq!(counts[INV_PARAMS_APPLIED as usize], 0, "no params staged");
    pool.shutdown().unwrap();
}

#[test]
fn contract_params_applied_once_per_staging() {
    let mut pool = create_pool(2, 8);
    let mut time = EpochTime::start();
    for k in 0..6 {
        if k % 2 == 0 {
            pool.set_params(&[PhysicalParams::new(k as f64, 45.0); 2]).unwrap();
        }
        pool.run_epoch(time).unwrap();
        time = time.next();
    }
    let signals = pool.drain_invariant_signals();
    contract_test_rt("params applied", &signals, &[INV_PARAMS_APPLIED]);
    assert_eq!(count_invariant_signals(&signals)[INV_PARAMS_APPLIED as usize], 6);
    pool.shutdown().unwrap();
}

#[test]
fn contract_shutdown_observed_by_every_worker() {
    let mut pool = create_pool(5, 8);
    pool.run_epoch(EpochTime::start()).unwrap();
    pool.shutdown().unwrap();

    let signals = pool.drain_invariant_signals();
    contract_test_rt("shutdown observed", &signals, &[INV_SHUTDOWN_OBSERVED]);
    assert_eq!(count_invariant_signals(&signals)[INV_SHUTDOWN_OBSERVED as usize], 5);
}

#[test]
#[should_panic(expected = "missing invariants")]
fn contract_detects_missing_completion() {
    let mut pool = create_pool(2, 8);
    // Nothing released: only shutdown signals exist.
    pool.shutdown().unwrap();
    let signals = pool.drain_invariant_signals();
    contract_test_rt("completion without release", &signals, &[INV_EPOCH_COMPLETED]);
}
