//! AGC behavior against sustained clipping.

use ifsynth::harness::{FixedGenerator, ScriptedScene};
use ifsynth::{
    AgcAction, AgcConfig, AgcController, ChannelGenerator, IqSample, NavBitTable, Quantization,
    Silence, SynthConfig, Synthesizer,
};

/// Constant 10.0 components: 250 at unity gain, clipping until gain < 0.508.
fn hot_block() -> Vec<IqSample> {
    vec![IqSample::new(10.0, -10.0); 16]
}

#[test]
fn gain_decreases_at_every_checkpoint_while_clipping() {
    let mut agc = AgcController::new(AgcConfig::default(), 1.0);
    let q = Quantization::Iq8;
    let block = hot_block();
    let mut out = Vec::with_capacity(block.len() * 2);
    let mut checkpoint_gains = vec![agc.gain()];

    for epoch in 1..=3000u64 {
        let gain_before = agc.gain();
        let clipped = q.quantize(&block, gain_before, &mut out) as u64;
        let rate_before = agc.stats().rate();
        let action = agc.observe(clipped, 2 * block.len() as u64);

        if epoch % 100 == 0 {
            checkpoint_gains.push(agc.gain());
        } else {
            assert_eq!(action, AgcAction::Hold, "no action between checkpoints");
        }
        if clipped > 0 || rate_before > 0.01 {
            assert!(agc.gain() <= gain_before, "gain rose while clipping at epoch {epoch}");
        }
    }

    // Strictly decreasing until clipping stops (14 attenuations: 0.95^14 < 0.508).
    let clipping_checkpoints = 14;
    for w in checkpoint_gains[..=clipping_checkpoints].windows(2) {
        assert!(w[1] < w[0], "gain must drop at each clipping checkpoint: {:?}", w);
    }
    let settled = 0.95f64.powi(14);
    assert!((checkpoint_gains[clipping_checkpoints] - settled).abs() < 1e-12);

    // Once clean, recovery raises the gain until clipping trips again; it
    // never leaves the band around the clipping threshold.
    let threshold = 127.0 / 250.0;
    for &g in &checkpoint_gains[clipping_checkpoints..] {
        assert!(g <= 1.0);
        assert!(g > threshold * 0.95 * 0.95, "gain {g} fell far below threshold");
    }
}

#[test]
fn statistics_reset_after_each_action() {
    let mut agc = AgcController::new(AgcConfig::default(), 1.0);
    for _ in 0..100 {
        agc.observe(32, 32);
    }
    assert_eq!(agc.stats().total(), 0);
    assert_eq!(agc.stats().clipped(), 0);
    agc.observe(1, 32);
    assert_eq!((agc.stats().clipped(), agc.stats().total()), (1, 32));
}

#[test]
fn synthesizer_attenuates_hot_input() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init();

    let config = SynthConfig::new(16_000.0).with_progress_interval(500);
    let generators: Vec<Box<dyn ChannelGenerator>> = vec![
        Box::new(FixedGenerator::constant("hot-a", IqSample::new(6.0, -6.0), 16)),
        Box::new(FixedGenerator::constant("hot-b", IqSample::new(4.0, -4.0), 16)),
    ];
    let mut synth = Synthesizer::with_generators(
        config,
        ScriptedScene::gps(2, 2000),
        &NavBitTable::standard(0),
        generators,
        Silence,
        Vec::new(),
    )
    .unwrap();
    let report = synth.run().unwrap();
    assert_eq!(report.epochs, 2000);
    assert!(report.final_gain < 0.6, "final gain {}", report.final_gain);
    assert!(report.final_gain > 0.45, "final gain {}", report.final_gain);
    assert!(report.clip_rate < 1.0);

    // The tail sits just under full scale: 10 × 25 × gain lands in 120..=127.
    let bytes = synth.into_sink();
    for pair in bytes[bytes.len() - 32..].chunks_exact(2) {
        let (i, q) = (pair[0] as i8, pair[1] as i8);
        assert!((120..=127).contains(&i), "I {i}");
        assert!((-128..=-120).contains(&q), "Q {q}");
    }
}
