//! Synthesis orchestrator: the epoch loop.
//!
//! Per epoch, in order:
//!
//! ```text
//! control queue → scene.advance → stage params → release workers
//!               → noise fill (concurrent with workers) → await done
//!               → sum channels into noise → quantize → sink → AGC
//! ```
//!
//! The worker pool is started when the channel set is built and shut down
//! when the loop ends, on success and on error alike.

use crate::agc::{AgcAction, AgcController, ClipStats};
use crate::channel::{ChannelGenerator, IfChannel};
use crate::config::SynthConfig;
use crate::control::{new_control_queue, ControlHandle, ControlMsg};
use crate::error::{SynthError, SynthResult};
use crate::invariant_ppt::{
    assert_invariant, CHANNELS_SUMMED, CHANNEL_LIMIT, CHANNEL_SET_FROZEN, CONFIG_VALIDATED,
    EPOCH_FULLY_COMPUTED, EPOCH_MONOTONIC, NAV_SOURCE_RESOLVED, NOISE_BUFFER_FILLED, POOL_STARTED,
    QUANTIZED_LENGTH, SHUTDOWN_ONCE, SINGLE_RELEASE_PER_EPOCH, SINK_WRITTEN, WORKERS_JOINED,
};
use crate::navbits::NavBitTable;
use crate::noise::{GaussianNoise, NoiseSource};
use crate::rt::WorkerPool;
use crate::scene::Scene;
use crate::types::{EpochTime, IqSample, PhysicalParams, EPOCH_SECONDS, MAX_CHANNELS};
use rtrb::Consumer;
use std::io::Write;
use std::time::{Duration, Instant};

/// Clip rate above which the end-of-run report carries a warning.
pub const CLIP_WARNING_RATE: f64 = 0.05;

/// Final statistics of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthReport {
    /// Epochs written to the sink.
    pub epochs: u64,
    /// Complex samples written.
    pub samples: u64,
    /// Clipped components over the whole run.
    pub clipped: u64,
    /// Clipped components / total components over the whole run.
    pub clip_rate: f64,
    pub final_gain: f64,
    pub elapsed: Duration,
    pub channels: usize,
    pub bytes_written: u64,
    /// True when the run ended on a `Stop` control message.
    pub stopped: bool,
}

impl std::fmt::Display for SynthReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} epochs, {} channels, {} samples, clip rate {:.4}%, final gain {:.4}, {:.2?}",
            self.epochs,
            self.channels,
            self.samples,
            self.clip_rate * 100.0,
            self.final_gain,
            self.elapsed
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

#[derive(Debug, Default)]
struct LoopTotals {
    epochs: u64,
    bytes: u64,
    stopped: bool,
}

/// Multi-channel IF synthesizer writing raw samples to `W`.
pub struct Synthesizer<W: Write> {
    config: SynthConfig,
    scene: Box<dyn Scene>,
    noise: Box<dyn NoiseSource>,
    sink: W,
    pool: WorkerPool,
    agc: AgcController,
    global: ClipStats,
    params: Vec<PhysicalParams>,
    control_rx: Consumer<ControlMsg>,
    control_handle: Option<ControlHandle>,
}

impl<W: Write> Synthesizer<W> {
    /// Build an [`IfChannel`] for every channel of the scene and start the pool.
    ///
    /// Noise is drawn from `GaussianNoise` with the configured sigma and seed,
    /// the same sigma the channel amplitudes are scaled against.
    pub fn new(
        config: SynthConfig,
        scene: impl Scene + 'static,
        nav: &NavBitTable,
        sink: W,
    ) -> SynthResult<Self> {
        config.validate()?;
        let noise = GaussianNoise::new(config.noise_sigma, config.seed);
        let generators = scene
            .channels()
            .into_iter()
            .map(|spec| {
                IfChannel::new(spec, config.sample_rate_hz, config.noise_sigma)
                    .map(|ch| Box::new(ch) as Box<dyn ChannelGenerator>)
            })
            .collect::<SynthResult<Vec<_>>>()?;
        Self::with_generators(config, scene, nav, generators, noise, sink)
    }

    /// Use caller-supplied generators, one per scene channel, in order, and a
    /// caller-supplied noise source.
    pub fn with_generators(
        config: SynthConfig,
        scene: impl Scene + 'static,
        nav: &NavBitTable,
        mut generators: Vec<Box<dyn ChannelGenerator>>,
        noise: impl NoiseSource + 'static,
        sink: W,
    ) -> SynthResult<Self> {
        config.validate()?;
        assert_invariant(CONFIG_VALIDATED, true, "configuration validated", Some("Synthesizer"));

        let specs = scene.channels();
        if specs.is_empty() {
            return Err(SynthError::NoChannels);
        }
        if specs.len() > MAX_CHANNELS {
            return Err(SynthError::TooManyChannels {
                requested: specs.len(),
                max: MAX_CHANNELS,
            });
        }
        assert_invariant(
            CHANNEL_LIMIT,
            specs.len() <= MAX_CHANNELS,
            "channel count within limit",
            Some("Synthesizer"),
        );
        if generators.len() != specs.len() {
            return Err(SynthError::GeneratorCount {
                expected: specs.len(),
                actual: generators.len(),
            });
        }
        let params = scene.initial_params();
        if params.len() != specs.len() {
            return Err(SynthError::ParamCount {
                expected: specs.len(),
                actual: params.len(),
            });
        }

        let start = EpochTime::start();
        for ((generator, spec), p) in generators.iter_mut().zip(&specs).zip(&params) {
            let source = nav.lookup(spec.signal)?;
            assert_invariant(
                NAV_SOURCE_RESOLVED,
                true,
                "navigation source resolved",
                Some("Synthesizer"),
            );
            generator.initialize(start, p, source)?;
        }
        assert_invariant(
            CHANNEL_SET_FROZEN,
            generators.len() == specs.len(),
            "one generator per channel",
            Some("Synthesizer"),
        );

        let pool = WorkerPool::start(generators, config.samples_per_epoch())?;
        assert_invariant(
            POOL_STARTED,
            pool.channel_count() == specs.len(),
            "one worker per channel",
            Some("Synthesizer"),
        );

        let (tx, rx) = new_control_queue();
        Ok(Self {
            agc: AgcController::new(config.agc.clone(), config.initial_gain),
            config,
            scene: Box::new(scene),
            noise: Box::new(noise),
            sink,
            pool,
            global: ClipStats::new(),
            params,
            control_rx: rx,
            control_handle: Some(ControlHandle::new(tx)),
        })
    }

    /// Take the control handle. Only the first call returns it.
    pub fn control_handle(&mut self) -> Option<ControlHandle> {
        self.control_handle.take()
    }

    pub fn config(&self) -> &SynthConfig {
        &self.config
    }

    pub fn channel_count(&self) -> usize {
        self.pool.channel_count()
    }

    /// Current quantizer gain.
    pub fn gain(&self) -> f64 {
        self.agc.gain()
    }

    /// Consume the synthesizer and hand back the sink.
    pub fn into_sink(self) -> W {
        self.sink
    }

    /// Run until the scene is exhausted, `max_epochs` is reached or a stop
    /// is requested. Workers are shut down and joined before returning.
    pub fn run(&mut self) -> SynthResult<SynthReport> {
        if self.pool.is_shut_down() {
            return Err(SynthError::BarrierViolation("synthesizer already ran"));
        }
        let started = Instant::now();
        let mut totals = LoopTotals::default();
        let outcome = self.epoch_loop(&mut totals);
        let shutdown = self.shutdown_pool();

        if let Err(err) = outcome {
            if let SynthError::WorkerFailed { channel, reason } = &err {
                log::error!("{} failed at epoch {}: {}", channel, totals.epochs, reason);
            } else {
                log::error!("synthesis aborted at epoch {}: {}", totals.epochs, err);
            }
            if let Err(shutdown_err) = shutdown {
                log::error!("shutdown after failure: {}", shutdown_err);
            }
            return Err(err);
        }
        shutdown?;
        self.sink.flush()?;

        let spe = self.config.samples_per_epoch() as u64;
        assert_invariant(
            SINK_WRITTEN,
            totals.bytes == totals.epochs * spe * self.config.quantization.bytes_per_sample() as u64,
            "sink received every encoded epoch",
            Some("Synthesizer::run"),
        );

        let report = SynthReport {
            epochs: totals.epochs,
            samples: totals.epochs * spe,
            clipped: self.global.clipped(),
            clip_rate: self.global.rate(),
            final_gain: self.agc.gain(),
            elapsed: started.elapsed(),
            channels: self.pool.channel_count(),
            bytes_written: totals.bytes,
            stopped: totals.stopped,
        };
        log::info!("synthesis complete: {}", report);
        if report.clip_rate > CLIP_WARNING_RATE {
            log::warn!(
                "clip rate {:.2}% exceeds {:.0}%; output headroom is insufficient",
                report.clip_rate * 100.0,
                CLIP_WARNING_RATE * 100.0
            );
        }
        Ok(report)
    }

    fn shutdown_pool(&mut self) -> SynthResult<usize> {
        assert_invariant(
            SHUTDOWN_ONCE,
            !self.pool.is_shut_down(),
            "worker pool shut down exactly once",
            Some("Synthesizer::run"),
        );
        let joined = self.pool.shutdown()?;
        assert_invariant(
            WORKERS_JOINED,
            joined == self.pool.channel_count(),
            "every worker joined",
            Some("Synthesizer::run"),
        );
        Ok(joined)
    }

    fn drain_control(&mut self) -> Flow {
        let mut flow = Flow::Continue;
        while let Ok(msg) = self.control_rx.pop() {
            log::debug!("control: {:?}", msg);
            match msg {
                ControlMsg::Stop => flow = Flow::Stop,
                ControlMsg::SetGain { gain } => self.agc.set_gain(gain),
                ControlMsg::SetAgcEnabled { enabled } => self.agc.set_enabled(enabled),
            }
        }
        flow
    }

    fn epoch_loop(&mut self, totals: &mut LoopTotals) -> SynthResult<()> {
        let spe = self.config.samples_per_epoch();
        let n = self.pool.channel_count();
        let quantization = self.config.quantization;
        let components = 2 * spe as u64;
        let mut acc = vec![IqSample::new(0.0, 0.0); spe];
        let mut encoded = Vec::with_capacity(spe * quantization.bytes_per_sample());
        let mut time = EpochTime::start();
        let mut previous: Option<u64> = None;

        loop {
            if self.drain_control() == Flow::Stop {
                log::info!("stop requested at epoch {}", time.epoch);
                totals.stopped = true;
                break;
            }
            if self.config.max_epochs.is_some_and(|max| time.epoch >= max) {
                break;
            }
            if !self.scene.advance(time, &mut self.params) {
                break;
            }
            assert_invariant(
                EPOCH_MONOTONIC,
                previous.map_or(time.epoch == 0, |p| time.epoch == p + 1),
                "epochs advance by exactly one",
                None,
            );

            self.pool.set_params(&self.params)?;
            let token = self.pool.release(time)?;
            assert_invariant(
                SINGLE_RELEASE_PER_EPOCH,
                token == time.epoch + 1,
                "one release per epoch",
                None,
            );

            self.noise.fill(&mut acc);
            assert_invariant(NOISE_BUFFER_FILLED, acc.len() == spe, "noise buffer filled", None);

            self.pool.await_done()?;
            let completed = self.pool.drain_completions();
            assert_invariant(
                EPOCH_FULLY_COMPUTED,
                completed == n,
                "every channel completed the epoch",
                None,
            );

            let summed = self.pool.accumulate_into(&mut acc)?;
            assert_invariant(CHANNELS_SUMMED, summed == n, "every channel summed", None);

            let clipped = quantization.quantize(&acc, self.agc.gain(), &mut encoded) as u64;
            assert_invariant(
                QUANTIZED_LENGTH,
                encoded.len() == spe * quantization.bytes_per_sample(),
                "encoded block length",
                None,
            );
            self.sink.write_all(&encoded)?;
            totals.bytes += encoded.len() as u64;
            totals.epochs += 1;

            self.global.add(clipped, components);
            match self.agc.observe(clipped, components) {
                AgcAction::Hold => {}
                AgcAction::Attenuated { from, to, rate } => {
                    log::debug!("agc attenuate {:.4} -> {:.4} (clip rate {:.3}%)", from, to, rate * 100.0)
                }
                AgcAction::Recovered { from, to, rate } => {
                    log::debug!("agc recover {:.4} -> {:.4} (clip rate {:.3}%)", from, to, rate * 100.0)
                }
            }

            let interval = self.config.progress_interval;
            if interval > 0 && (time.epoch + 1) % interval == 0 {
                log::info!(
                    "epoch {} ({:.3} s): gain {:.4}, clip rate {:.3}%",
                    time.epoch + 1,
                    time.seconds + EPOCH_SECONDS,
                    self.agc.gain(),
                    self.agc.stats().rate() * 100.0
                );
            }

            previous = Some(time.epoch);
            time = time.next();
        }
        Ok(())
    }
}
