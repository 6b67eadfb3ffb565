//! Channel generators: one satellite signal's contribution per epoch.
//!
//! A generator is constructed and initialized on the controller thread,
//! then moved into its worker's slot and driven exclusively by that worker.
//! `generate_epoch` touches nothing but the generator's own state and the
//! output buffer it is handed.

use crate::config::ConfigError;
use crate::error::{SynthError, SynthResult};
use crate::navbits::NavBitSource;
use crate::prn;
use crate::signal::{ChannelSpec, GLONASS_G1_SLOTS};
use crate::states::ChannelState;
use crate::types::{EpochTime, IqSample, PhysicalParams};
use std::f64::consts::TAU;
use std::sync::Arc;

/// Capability set every per-channel generator provides.
pub trait ChannelGenerator: Send {
    /// One-time setup before the first epoch.
    fn initialize(
        &mut self,
        time: EpochTime,
        params: &PhysicalParams,
        nav: Arc<dyn NavBitSource>,
    ) -> SynthResult<()>;

    /// Apply the physical parameters for the upcoming epoch.
    fn update(&mut self, params: &PhysicalParams);

    /// Overwrite `out` with this channel's samples for the epoch starting at `time`.
    fn generate_epoch(&mut self, time: EpochTime, out: &mut [IqSample]);

    /// Human-readable channel label for logs.
    fn label(&self) -> String;
}

/// BPSK spread-spectrum channel at an intermediate frequency.
///
/// ```text
/// s[n] = A · c(code_phase) · d(bit) · exp(j·2π·carrier_phase)
/// carrier step = (IF + FDMA + Doppler) / fs          cycles/sample
/// code step    = Rc · (1 + Doppler / f_carrier) / fs chips/sample
/// A            = sqrt(10^(C/N0 / 10) · 2σ² / fs)
/// ```
pub struct IfChannel {
    spec: ChannelSpec,
    sample_rate: f64,
    noise_sigma: f64,
    code: Vec<i8>,
    chipping_rate: f64,
    carrier_hz: f64,
    state: ChannelState,
    params: PhysicalParams,
    amplitude: f64,
    carrier_step: f64,
    code_step: f64,
    nav: Option<Arc<dyn NavBitSource>>,
    periods_per_symbol: u64,
}

impl std::fmt::Debug for IfChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IfChannel")
            .field("spec", &self.spec)
            .field("state", &self.state)
            .field("params", &self.params)
            .field("amplitude", &self.amplitude)
            .finish()
    }
}

impl IfChannel {
    /// Build a channel.
    ///
    /// Fails for signals without a code generator, for GLONASS slots outside
    /// -7..=6, and for a zero noise floor (the amplitude is relative to it).
    pub fn new(spec: ChannelSpec, sample_rate: f64, noise_sigma: f64) -> SynthResult<Self> {
        if !(noise_sigma > 0.0 && noise_sigma.is_finite()) {
            return Err(ConfigError::InvalidNoiseSigma(noise_sigma).into());
        }
        if let Some(slot) = spec.fdma_slot {
            if !GLONASS_G1_SLOTS.contains(&slot) {
                return Err(SynthError::InvalidFdmaSlot { sv: spec.sv, slot });
            }
        }
        let code = prn::primary_code(spec.signal, spec.sv.number).ok_or(
            SynthError::UnsupportedSignal {
                constellation: spec.sv.constellation,
                signal: spec.signal,
            },
        )?;
        debug_assert_eq!(code.len(), spec.signal.code_length());
        let mut channel = Self {
            spec,
            sample_rate,
            noise_sigma,
            code,
            chipping_rate: spec.signal.chipping_rate(),
            carrier_hz: spec.signal.carrier_frequency_hz() + spec.fdma_offset_hz(),
            state: ChannelState::default(),
            params: PhysicalParams::default(),
            amplitude: 0.0,
            carrier_step: 0.0,
            code_step: 0.0,
            nav: None,
            periods_per_symbol: 1,
        };
        channel.apply(&PhysicalParams::default());
        Ok(channel)
    }

    pub fn spec(&self) -> &ChannelSpec {
        &self.spec
    }

    pub fn state(&self) -> &ChannelState {
        &self.state
    }

    /// Signal amplitude for the current C/N0.
    pub fn amplitude(&self) -> f64 {
        self.amplitude
    }

    /// Duration of one primary code period in milliseconds.
    fn code_period_ms(&self) -> f64 {
        self.spec.signal.code_length() as f64 / self.chipping_rate * 1000.0
    }

    fn apply(&mut self, params: &PhysicalParams) {
        self.params = *params;
        let cn0 = 10f64.powf(params.cn0_dbhz / 10.0);
        self.amplitude = (cn0 * 2.0 * self.noise_sigma * self.noise_sigma / self.sample_rate).sqrt();
        self.carrier_step = (self.spec.center_hz() + params.doppler_hz) / self.sample_rate;
        self.code_step =
            self.chipping_rate * (1.0 + params.doppler_hz / self.carrier_hz) / self.sample_rate;
    }

    fn refresh_nav_bit(&mut self) {
        if let Some(nav) = &self.nav {
            let symbol = self.state.code_periods / self.periods_per_symbol;
            self.state.nav_bit = nav.bit_at(self.spec.sv, symbol);
        }
    }
}

impl ChannelGenerator for IfChannel {
    fn initialize(
        &mut self,
        time: EpochTime,
        params: &PhysicalParams,
        nav: Arc<dyn NavBitSource>,
    ) -> SynthResult<()> {
        let bit_ms = self.spec.signal.nav_bit_period_ms();
        let symbol_ms = nav.bit_period_ms();
        if symbol_ms == 0 || bit_ms % symbol_ms != 0 {
            return Err(SynthError::NavPeriodMismatch {
                signal: self.spec.signal,
                symbol_ms,
                bit_ms,
            });
        }
        let periods_per_ms = 1.0 / self.code_period_ms();
        self.periods_per_symbol =
            ((symbol_ms as f64 / self.code_period_ms()).round() as u64).max(1);
        self.nav = Some(nav);
        self.state = ChannelState {
            code_periods: (time.epoch as f64 * periods_per_ms).round() as u64,
            ..ChannelState::default()
        };
        self.apply(params);
        self.refresh_nav_bit();
        Ok(())
    }

    fn update(&mut self, params: &PhysicalParams) {
        self.apply(params);
    }

    fn generate_epoch(&mut self, _time: EpochTime, out: &mut [IqSample]) {
        let code_len = self.code.len() as f64;
        for sample in out.iter_mut() {
            let chip = self.code[self.state.code_phase as usize];
            let value = self.amplitude * f64::from(chip) * f64::from(self.state.nav_bit);
            *sample = IqSample::from_polar(value, TAU * self.state.carrier_phase);

            self.state.carrier_phase += self.carrier_step;
            self.state.carrier_phase -= self.state.carrier_phase.floor();
            self.state.code_phase += self.code_step;
            if self.state.code_phase >= code_len {
                self.state.code_phase -= code_len;
                self.state.code_periods += 1;
                if self.state.code_periods % self.periods_per_symbol == 0 {
                    self.refresh_nav_bit();
                }
            }
        }
    }

    fn label(&self) -> String {
        self.spec.label()
    }
}
