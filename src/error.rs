//! Crate-level error type.

use crate::barrier::BarrierError;
use crate::config::ConfigError;
use crate::signal::{Constellation, SignalKind, SvId};
use crate::types::ChannelId;

/// Result alias used across the synthesizer.
pub type SynthResult<T> = Result<T, SynthError>;

/// Errors that abort a synthesis run.
///
/// Clipping is never an error; it is counted and fed to the AGC.
#[derive(Debug, thiserror::Error)]
pub enum SynthError {
    #[error("invalid configuration: {0:?}")]
    Config(ConfigError),

    #[error("no generator for {constellation} {signal}")]
    UnsupportedSignal {
        constellation: Constellation,
        signal: SignalKind,
    },

    #[error("{sv}: GLONASS frequency slot {slot} outside -7..=6")]
    InvalidFdmaSlot { sv: SvId, slot: i8 },

    #[error("{signal}: {symbol_ms} ms navigation symbols do not divide the {bit_ms} ms data bit")]
    NavPeriodMismatch {
        signal: SignalKind,
        symbol_ms: u32,
        bit_ms: u32,
    },

    #[error("no navigation bit source registered for {constellation} {signal}")]
    NavSourceMissing {
        constellation: Constellation,
        signal: SignalKind,
    },

    #[error("{requested} channels requested, at most {max} supported")]
    TooManyChannels { requested: usize, max: usize },

    #[error("no channels to synthesize")]
    NoChannels,

    #[error("{actual} generators supplied for {expected} channels")]
    GeneratorCount { expected: usize, actual: usize },

    #[error("scene produced {actual} parameter sets for {expected} channels")]
    ParamCount { expected: usize, actual: usize },

    #[error("worker for {channel} failed: {reason}")]
    WorkerFailed { channel: ChannelId, reason: String },

    #[error("failed to spawn worker thread: {0}")]
    WorkerSpawn(#[source] std::io::Error),

    #[error("barrier protocol violated: {0}")]
    BarrierViolation(&'static str),

    #[error("output sink error: {0}")]
    Sink(#[from] std::io::Error),
}

impl From<ConfigError> for SynthError {
    fn from(err: ConfigError) -> Self {
        SynthError::Config(err)
    }
}

impl From<BarrierError> for SynthError {
    fn from(err: BarrierError) -> Self {
        match err {
            BarrierError::WorkerFailed { channel, reason } => {
                SynthError::WorkerFailed { channel, reason }
            }
            BarrierError::Poisoned => SynthError::BarrierViolation("barrier lock poisoned"),
            BarrierError::ShutDown => SynthError::BarrierViolation("barrier already shut down"),
        }
    }
}
