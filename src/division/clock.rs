//! Division timing: a per-cell timer racing an Ornstein-Uhlenbeck threshold.
//!
//! The threshold relaxes towards its mean with correlation time tau and
//! is kicked by Gaussian noise every step:
//!
//! ```text
//! theta <- theta - ((theta - mu) / tau) * dt + sigma * sqrt(dt) * N(0, 1)
//! ```
//!
//! The stationary spread of the threshold is `sigma * sqrt(tau / 2)`.

use rand::Rng;
use rand_distr::{Distribution, Exp, StandardNormal};

use crate::config::ProliferationParameters;

/// Mean-reverting process driving the division threshold
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OuProcess {
    /// Correlation time (steps)
    pub correlation_time: f64,
    /// Noise amplitude
    pub sigma: f64,
    /// Step length
    pub dt: f64,
}

impl OuProcess {
    pub fn from_parameters(params: &ProliferationParameters) -> Self {
        Self {
            correlation_time: params.correlation_time,
            sigma: params.sigma,
            dt: 1.0,
        }
    }

    /// One update of `current` towards `mean`.
    pub fn step<R: Rng + ?Sized>(&self, current: f64, mean: f64, rng: &mut R) -> f64 {
        let noise: f64 = rng.sample(StandardNormal);
        let dw = self.dt.sqrt() * noise;
        current - ((current - mean) / self.correlation_time) * self.dt + self.sigma * dw
    }

    /// Standard deviation of the stationary distribution
    pub fn stationary_std(&self) -> f64 {
        self.sigma * (self.correlation_time / 2.0).sqrt()
    }
}

/// Timer, threshold and threshold mean of one cell
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DivisionClock {
    pub timer: f64,
    pub threshold: f64,
    pub threshold_mean: f64,
}

impl DivisionClock {
    /// Clock of a founder cell: threshold starts at the warm-up step and its
    /// mean lies an exponentially distributed interval beyond it.
    pub fn founder<R: Rng + ?Sized>(
        warmup_step: u64,
        mean_division_interval: f64,
        rng: &mut R,
    ) -> Self {
        let warmup = warmup_step as f64;
        let offset = Exp::new(1.0 / mean_division_interval)
            .map(|d| d.sample(rng))
            .unwrap_or(mean_division_interval);
        Self {
            timer: 0.0,
            threshold: warmup,
            threshold_mean: warmup + offset,
        }
    }

    /// Advance one step; returns whether the timer reached the threshold.
    pub fn advance<R: Rng + ?Sized>(&mut self, ou: &OuProcess, rng: &mut R) -> bool {
        self.timer += 1.0;
        self.threshold = ou.step(self.threshold, self.threshold_mean, rng);
        self.is_due()
    }

    pub fn is_due(&self) -> bool {
        self.timer >= self.threshold
    }

    /// Clock of a daughter: timer reset, threshold carried over, new mean.
    pub fn daughter(&self, threshold_mean: f64) -> Self {
        Self {
            timer: 0.0,
            threshold: self.threshold,
            threshold_mean,
        }
    }
}

/// Pick the threshold mean currently held by a uniformly chosen slot.
///
/// Returns `None` for an empty population.
pub fn inherit_threshold_mean<R: Rng + ?Sized>(means: &[f64], rng: &mut R) -> Option<f64> {
    if means.is_empty() {
        return None;
    }
    Some(means[rng.gen_range(0..means.len())])
}
