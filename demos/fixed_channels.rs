//! Scripted channels through the full pipeline, with a mid-run gain change.
//!
//! Three fixed generators stand in for real channels so the effect of the
//! quantizer and AGC on a known signal is easy to read off the output.

use ifsynth::harness::{FixedGenerator, ScriptedScene};
use ifsynth::{
    ChannelGenerator, ControlMsg, IqSample, NavBitTable, Quantization, Silence, SynthConfig,
    SynthError, Synthesizer,
};

fn main() -> Result<(), SynthError> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .init();

    let config = SynthConfig::new(8000.0)
        .with_quantization(Quantization::Iq8)
        .with_progress_interval(100);
    let spe = config.samples_per_epoch();

    let generators: Vec<Box<dyn ChannelGenerator>> = vec![
        Box::new(FixedGenerator::constant("tone-a", IqSample::new(2.0, 0.0), spe)),
        Box::new(FixedGenerator::constant("tone-b", IqSample::new(1.5, -1.5), spe)),
        Box::new(FixedGenerator::new(
            "ramp",
            (0..4).map(|k| vec![IqSample::new(k as f64, -(k as f64)); spe]).collect(),
        )),
    ];

    let mut synth = Synthesizer::with_generators(
        config,
        ScriptedScene::gps(3, 600),
        &NavBitTable::standard(0),
        generators,
        Silence,
        Vec::new(),
    )?;
    if let Some(mut control) = synth.control_handle() {
        // Applied before the first epoch.
        if let Err(msg) = control.send(ControlMsg::SetGain { gain: 0.8 }) {
            log::warn!("control queue full, dropped {}", msg.description());
        }
    }

    let report = synth.run()?;
    let bytes = synth.into_sink();
    println!("{}", report);
    println!("first epoch: {:?}", &bytes[..2 * spe]);
    println!("last epoch:  {:?}", &bytes[bytes.len() - 2 * spe..]);
    Ok(())
}
