//! Parameter Mutation
//!
//! Gaussian perturbation of component parameters. Each parameter is
//! independently resampled around its current value and clamped to a band
//! of `±5σ` computed from the pre-mutation value, never dropping below 0.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use super::{Circuit, CircuitError, Component};

/// Half-width of the clamp band in units of sigma
pub const CLAMP_SIGMAS: f64 = 5.0;

/// Mutation strength and per-parameter probability.
///
/// Always valid once built: `sigma` is finite and non-negative, `p_mutate`
/// lies in `[0, 1]`. Deserialization runs the same check as [`new`](Self::new).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawMutationParams")]
pub struct MutationParams {
    sigma: f64,
    p_mutate: f64,
}

#[derive(Deserialize)]
#[serde(default)]
struct RawMutationParams {
    sigma: f64,
    p_mutate: f64,
}

impl Default for RawMutationParams {
    fn default() -> Self {
        let defaults = MutationParams::default();
        Self {
            sigma: defaults.sigma,
            p_mutate: defaults.p_mutate,
        }
    }
}

impl TryFrom<RawMutationParams> for MutationParams {
    type Error = CircuitError;

    fn try_from(raw: RawMutationParams) -> Result<Self, Self::Error> {
        MutationParams::new(raw.sigma, raw.p_mutate)
    }
}

impl MutationParams {
    pub fn new(sigma: f64, p_mutate: f64) -> Result<Self, CircuitError> {
        if !sigma.is_finite() || sigma < 0.0 {
            return Err(CircuitError::InvalidMutation(format!(
                "sigma must be finite and >= 0, got {}",
                sigma
            )));
        }
        if !(0.0..=1.0).contains(&p_mutate) {
            return Err(CircuitError::InvalidMutation(format!(
                "p_mutate must be within [0, 1], got {}",
                p_mutate
            )));
        }
        Ok(Self { sigma, p_mutate })
    }

    /// Standard deviation of the gaussian step
    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Probability that any single parameter is resampled
    pub fn p_mutate(&self) -> f64 {
        self.p_mutate
    }

    /// Copy with `sigma` and/or `p_mutate` replaced, re-validated
    pub fn with_overrides(&self, sigma: Option<f64>, p_mutate: Option<f64>) -> Result<Self, CircuitError> {
        Self::new(sigma.unwrap_or(self.sigma), p_mutate.unwrap_or(self.p_mutate))
    }
}

impl Default for MutationParams {
    fn default() -> Self {
        Self {
            sigma: 0.1,
            p_mutate: 0.1,
        }
    }
}

/// Resample `value` from `N(value, sigma)` and clamp to
/// `[max(0, value - 5σ), value + 5σ]`.
///
/// The bounds come from the value before resampling. When the band lies
/// entirely below zero the result is the lower bound, 0.
pub fn gaussian_step<R: Rng + ?Sized>(value: f64, sigma: f64, rng: &mut R) -> f64 {
    let lo = (value - CLAMP_SIGMAS * sigma).max(0.0);
    let hi = value + CLAMP_SIGMAS * sigma;

    let sample = match Normal::new(value, sigma) {
        Ok(normal) => normal.sample(rng),
        Err(_) => value,
    };

    sample.min(hi).max(lo)
}

/// Apply [`gaussian_step`] to each value with probability `params.p_mutate`
pub(crate) fn perturb<R: Rng + ?Sized>(values: &mut [f64], params: &MutationParams, rng: &mut R) {
    for value in values.iter_mut() {
        if rng.gen_bool(params.p_mutate) {
            *value = gaussian_step(*value, params.sigma, rng);
        }
    }
}

/// A seeded mutation operator for driving a search over many circuits
#[derive(Debug, Clone)]
pub struct Mutator {
    params: MutationParams,
    rng: StdRng,
}

impl Mutator {
    /// Create a mutator; `seed` makes the run reproducible
    pub fn new(params: MutationParams, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { params, rng }
    }

    pub fn params(&self) -> &MutationParams {
        &self.params
    }

    pub fn mutate_component(&mut self, component: &mut Component) {
        component.mutate_with(&self.params, &mut self.rng);
    }

    pub fn mutate_circuit(&mut self, circuit: &mut Circuit) {
        circuit.mutate_with(&self.params, &mut self.rng);
    }
}
