//! Multi-channel GNSS IF sample synthesizer.
//!
//! Up to [`MAX_CHANNELS`] channel generators run on persistent worker
//! threads, one simulated millisecond (epoch) at a time, synchronized by a
//! two-phase [`EpochBarrier`](barrier::EpochBarrier). The orchestrator sums
//! their buffers into Gaussian noise, quantizes under automatic gain
//! control, and writes a raw interleaved I/Q stream.

pub mod agc;
pub mod barrier;
pub mod channel;
pub mod config;
pub mod control;
pub mod error;
#[doc(hidden)]
pub mod harness;
#[doc(hidden)]
pub mod invariant_ppt;
pub mod invariant_rt;
pub mod navbits;
pub mod noise;
pub mod prn;
pub mod quantize;
pub mod rt;
pub mod scene;
pub mod signal;
pub mod sink;
pub mod states;
pub mod synth;
pub mod types;

pub use agc::{AgcAction, AgcController, ClipStats};
pub use channel::{ChannelGenerator, IfChannel};
pub use config::{AgcConfig, ConfigError, SynthConfig};
pub use control::{ControlHandle, ControlMsg};
pub use error::{SynthError, SynthResult};
pub use navbits::{FramedNavBits, NavBitSource, NavBitTable};
pub use noise::{GaussianNoise, NoiseSource, Silence};
pub use quantize::Quantization;
pub use scene::{LinearScene, LinearTrack, Scene};
pub use signal::{ChannelSpec, Constellation, SignalKind, SvId};
pub use sink::open_sink;
pub use synth::{SynthReport, Synthesizer};
pub use types::{ChannelId, EpochTime, IqSample, PhysicalParams, MAX_CHANNELS};
