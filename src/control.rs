//! Control message types for owner → orchestrator communication.
//!
//! Messages travel over a lock-free SPSC queue and are drained by the
//! orchestrator once per epoch, before the epoch is released.
//!
//! All messages are:
//! - Fixed-size (no heap allocation)
//! - Copy (can be sent across threads)

use rtrb::{Consumer, Producer, PushError, RingBuffer};

/// Capacity for control message queue.
pub const CONTROL_QUEUE_CAPACITY: usize = 64;

/// Creates a new control message queue pair.
///
/// Returns (producer for the owner thread, consumer for the orchestrator).
pub fn new_control_queue() -> (Producer<ControlMsg>, Consumer<ControlMsg>) {
    RingBuffer::new(CONTROL_QUEUE_CAPACITY)
}

/// Control messages accepted by a running synthesizer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlMsg {
    /// Stop before the next epoch is produced; the output written so far
    /// stays valid.
    Stop,

    /// Override the quantizer gain. Clamped to the AGC ceiling.
    SetGain {
        gain: f64,
    },

    /// Enable or disable the AGC loop.
    SetAgcEnabled {
        enabled: bool,
    },
}

impl ControlMsg {
    /// Returns a human-readable description (for debugging).
    pub fn description(&self) -> &'static str {
        match self {
            ControlMsg::Stop => "Stop",
            ControlMsg::SetGain { .. } => "SetGain",
            ControlMsg::SetAgcEnabled { .. } => "SetAgcEnabled",
        }
    }
}

/// Sending half handed to the owner of a synthesizer.
pub struct ControlHandle {
    tx: Producer<ControlMsg>,
}

impl ControlHandle {
    pub(crate) fn new(tx: Producer<ControlMsg>) -> Self {
        Self { tx }
    }

    /// Queue a message. Returns it back if the queue is full.
    pub fn send(&mut self, msg: ControlMsg) -> Result<(), ControlMsg> {
        self.tx.push(msg).map_err(|PushError::Full(msg)| msg)
    }

    /// Request a stop after the current epoch.
    pub fn stop(&mut self) -> Result<(), ControlMsg> {
        self.send(ControlMsg::Stop)
    }

    /// Whether the orchestrator side has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_abandoned()
    }
}
