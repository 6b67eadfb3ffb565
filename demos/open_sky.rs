//! Open-sky scenario: six GPS and two GLONASS satellites for two seconds.
//!
//! Writes 8-bit interleaved I/Q at 4.092 MHz to `open_sky.bin` (or the path
//! given as the first argument). Run with `RUST_LOG=info` to see progress.

use ifsynth::{
    open_sink, ChannelSpec, LinearScene, LinearTrack, NavBitTable, SignalKind,
    SvId, SynthConfig, SynthError, Synthesizer,
};

fn main() -> Result<(), SynthError> {
    env_logger::init();

    let path = std::env::args().nth(1).unwrap_or_else(|| "open_sky.bin".to_string());
    let config = SynthConfig::default().with_progress_interval(500);
    let if_hz = config.sample_rate_hz / 4.0;

    // (PRN, Doppler Hz, Doppler rate Hz/s, C/N0 dB-Hz)
    let gps = [
        (3, 1850.0, -0.6, 47.0),
        (7, -2400.0, 0.4, 44.0),
        (11, 320.0, -0.1, 49.0),
        (19, -950.0, 0.7, 42.0),
        (22, 3100.0, -0.9, 40.0),
        (28, -3600.0, 0.2, 45.0),
    ];
    let mut scene = LinearScene::new(2000);
    for (prn, doppler, rate, cn0) in gps {
        let spec = ChannelSpec::new(SvId::gps(prn), SignalKind::GpsL1Ca, if_hz);
        scene = scene.with_track(LinearTrack::new(spec, doppler, rate, cn0));
    }
    // GLONASS slots with their FDMA channel numbers.
    for (slot, k, doppler, cn0) in [(2, -2, 1200.0, 44.0), (17, 1, -700.0, 46.0)] {
        let spec = ChannelSpec::new(SvId::glonass(slot), SignalKind::GlonassG1, 0.0).with_fdma_slot(k);
        scene = scene.with_track(LinearTrack::new(spec, doppler, 0.0, cn0));
    }

    let nav = NavBitTable::standard(config.seed);
    let sink = open_sink(&path)?;
    let mut synth = Synthesizer::new(config, scene, &nav, sink)?;
    let report = synth.run()?;

    println!("{}: {}", path, report);
    Ok(())
}
