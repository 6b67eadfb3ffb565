//! Complex additive white Gaussian noise.
//!
//! Uses the polar form of the Box-Muller transform: two uniforms in (-1, 1]
//! are drawn until their squared radius lies in (0, 1), which yields two
//! independent unit Gaussians without trigonometry. One call produces one
//! complex sample, consuming both Gaussians.

use crate::types::IqSample;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Source of per-sample complex noise.
pub trait NoiseSource: Send {
    /// Draw one complex sample.
    fn draw(&mut self) -> IqSample;

    /// Overwrite `buf` with fresh draws, in order.
    fn fill(&mut self, buf: &mut [IqSample]) {
        for sample in buf.iter_mut() {
            *sample = self.draw();
        }
    }
}

/// Zero-mean complex Gaussian noise with per-component standard deviation sigma.
#[derive(Debug, Clone)]
pub struct GaussianNoise {
    sigma: f64,
    rng: ChaCha8Rng,
}

impl GaussianNoise {
    pub fn new(sigma: f64, seed: u64) -> Self {
        Self {
            sigma,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Uniform in (-1, 1].
    #[inline]
    fn uniform(&mut self) -> f64 {
        1.0 - 2.0 * self.rng.gen::<f64>()
    }

    /// Two independent unit Gaussians.
    #[inline]
    fn gaussian_pair(&mut self) -> (f64, f64) {
        loop {
            let u = self.uniform();
            let v = self.uniform();
            let s = u * u + v * v;
            if s > 0.0 && s < 1.0 {
                let factor = (-2.0 * s.ln() / s).sqrt();
                return (u * factor, v * factor);
            }
        }
    }
}

impl NoiseSource for GaussianNoise {
    #[inline]
    fn draw(&mut self) -> IqSample {
        let (re, im) = self.gaussian_pair();
        IqSample::new(re * self.sigma, im * self.sigma)
    }
}

/// Noise source that always returns zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct Silence;

impl NoiseSource for Silence {
    #[inline]
    fn draw(&mut self) -> IqSample {
        IqSample::new(0.0, 0.0)
    }
}
