//! Run configuration.

use crate::quantize::Quantization;

/// AGC tuning. Defaults match the reference hysteresis loop.
#[derive(Debug, Clone, PartialEq)]
pub struct AgcConfig {
    pub enabled: bool,
    /// Epochs between evaluations.
    pub interval_epochs: u64,
    /// Clip rate above which gain is reduced.
    pub upper_rate: f64,
    /// Clip rate below which gain is recovered.
    pub lower_rate: f64,
    /// Multiplier applied when attenuating.
    pub attenuate: f64,
    /// Multiplier applied when recovering.
    pub recover: f64,
    /// Gain ceiling.
    pub max_gain: f64,
}

impl Default for AgcConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_epochs: 100,
            upper_rate: 0.01,
            lower_rate: 0.001,
            attenuate: 0.95,
            recover: 1.02,
            max_gain: 1.0,
        }
    }
}

/// Configuration for one synthesis run.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthConfig {
    /// Output sampling frequency in Hz. Must be a whole multiple of 1 kHz.
    pub sample_rate_hz: f64,
    pub quantization: Quantization,
    /// Per-component standard deviation of the thermal noise.
    pub noise_sigma: f64,
    pub agc: AgcConfig,
    pub initial_gain: f64,
    /// Epochs between progress log lines, 0 disables them.
    pub progress_interval: u64,
    /// Noise generator seed.
    pub seed: u64,
    /// Optional hard cap on the number of epochs.
    pub max_epochs: Option<u64>,
}

/// Configuration errors, detected before any worker starts.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Sample rate not positive, not finite, or not a multiple of 1 kHz.
    InvalidSampleRate(f64),
    /// Noise sigma negative or not finite.
    InvalidNoiseSigma(f64),
    /// Initial gain outside (0, max_gain].
    InvalidGain(f64),
    /// Bit depth other than 4, 8 or 16.
    UnsupportedBitDepth(u32),
    /// AGC thresholds or multipliers inconsistent.
    InvalidAgc(&'static str),
}

impl SynthConfig {
    /// Create a configuration for the given sample rate with defaults elsewhere.
    pub fn new(sample_rate_hz: f64) -> Self {
        Self {
            sample_rate_hz,
            ..Self::default()
        }
    }

    pub fn with_quantization(mut self, quantization: Quantization) -> Self {
        self.quantization = quantization;
        self
    }

    /// Select the quantizer by output bit depth.
    pub fn with_bit_depth(mut self, bits: u32) -> Result<Self, ConfigError> {
        self.quantization = Quantization::from_bits(bits).ok_or(ConfigError::UnsupportedBitDepth(bits))?;
        Ok(self)
    }

    pub fn with_noise_sigma(mut self, sigma: f64) -> Self {
        self.noise_sigma = sigma;
        self
    }

    pub fn with_agc(mut self, agc: AgcConfig) -> Self {
        self.agc = agc;
        self
    }

    pub fn with_agc_enabled(mut self, enabled: bool) -> Self {
        self.agc.enabled = enabled;
        self
    }

    pub fn with_initial_gain(mut self, gain: f64) -> Self {
        self.initial_gain = gain;
        self
    }

    pub fn with_progress_interval(mut self, epochs: u64) -> Self {
        self.progress_interval = epochs;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_max_epochs(mut self, epochs: u64) -> Self {
        self.max_epochs = Some(epochs);
        self
    }

    /// Samples produced per channel per epoch.
    pub fn samples_per_epoch(&self) -> usize {
        (self.sample_rate_hz / 1000.0).round() as usize
    }

    /// Check every field; called by the synthesizer before starting workers.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fs = self.sample_rate_hz;
        if !fs.is_finite() || fs < 1000.0 || (fs / 1000.0).fract() != 0.0 {
            return Err(ConfigError::InvalidSampleRate(fs));
        }
        if !self.noise_sigma.is_finite() || self.noise_sigma < 0.0 {
            return Err(ConfigError::InvalidNoiseSigma(self.noise_sigma));
        }
        let agc = &self.agc;
        if agc.interval_epochs == 0 {
            return Err(ConfigError::InvalidAgc("interval must be at least one epoch"));
        }
        if !(agc.lower_rate >= 0.0 && agc.lower_rate < agc.upper_rate && agc.upper_rate <= 1.0) {
            return Err(ConfigError::InvalidAgc("thresholds must satisfy 0 <= lower < upper <= 1"));
        }
        if !(agc.attenuate > 0.0 && agc.attenuate < 1.0) {
            return Err(ConfigError::InvalidAgc("attenuation factor must be in (0, 1)"));
        }
        if !(agc.recover > 1.0 && agc.recover.is_finite()) {
            return Err(ConfigError::InvalidAgc("recovery factor must be greater than 1"));
        }
        if !(agc.max_gain > 0.0 && agc.max_gain.is_finite()) {
            return Err(ConfigError::InvalidAgc("gain ceiling must be positive"));
        }
        if !(self.initial_gain > 0.0 && self.initial_gain <= agc.max_gain) {
            return Err(ConfigError::InvalidGain(self.initial_gain));
        }
        Ok(())
    }
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 4_092_000.0,
            quantization: Quantization::Iq8,
            noise_sigma: 1.0,
            agc: AgcConfig::default(),
            initial_gain: 1.0,
            progress_interval: 1000,
            seed: 0x5EED,
            max_epochs: None,
        }
    }
}
