//! Synthetic multi-harmonic light curves.
//!
//! Generates an unevenly sampled series with a configurable set of harmonic
//! amplitudes/phases plus Gaussian noise. Deterministic for a given seed, so
//! demo output and tests are reproducible.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;
use std::f64::consts::TAU;

use crate::domain::TimeSeries;
use crate::error::FitError;

/// Specification of a synthetic light curve.
#[derive(Debug, Clone)]
pub struct SampleSpec {
    /// Fundamental frequency (cycles per unit time).
    pub frequency: f64,
    /// Amplitude of harmonic `n` at index `n - 1`.
    pub amplitudes: Vec<f64>,
    /// Phase of harmonic `n` at index `n - 1` (radians).
    pub phases: Vec<f64>,
    /// Constant offset (mean magnitude).
    pub offset: f64,
    /// Gaussian noise sigma; 0 disables noise.
    pub noise_sigma: f64,
    pub n_points: usize,
    pub time_span: f64,
    /// Fraction of the nominal cadence used as random timing jitter.
    pub jitter: f64,
    pub seed: u64,
}

impl Default for SampleSpec {
    fn default() -> Self {
        Self {
            frequency: 2.0,
            amplitudes: vec![1.0, 0.5, 0.2],
            phases: vec![0.0, std::f64::consts::FRAC_PI_4, 0.8],
            offset: 12.0,
            noise_sigma: 0.02,
            n_points: 400,
            time_span: 30.0,
            jitter: 0.3,
            seed: 42,
        }
    }
}

/// Generate a synthetic light curve from the spec.
pub fn generate_sample(spec: &SampleSpec) -> Result<TimeSeries, FitError> {
    if spec.n_points < 3 {
        return Err(FitError::InvalidConfiguration(
            "sample must have at least 3 points".into(),
        ));
    }
    if !(spec.frequency.is_finite() && spec.frequency > 0.0) {
        return Err(FitError::InvalidConfiguration(format!(
            "sample frequency must be > 0, got {}",
            spec.frequency
        )));
    }
    if !(spec.time_span.is_finite() && spec.time_span > 0.0) {
        return Err(FitError::InvalidConfiguration(format!(
            "sample time span must be > 0, got {}",
            spec.time_span
        )));
    }
    if spec.amplitudes.is_empty() || spec.amplitudes.len() != spec.phases.len() {
        return Err(FitError::InvalidConfiguration(
            "amplitudes and phases must be non-empty and equal-length".into(),
        ));
    }
    if !(spec.noise_sigma.is_finite() && spec.noise_sigma >= 0.0) {
        return Err(FitError::InvalidConfiguration(format!(
            "noise sigma must be >= 0, got {}",
            spec.noise_sigma
        )));
    }
    if !(0.0..1.0).contains(&spec.jitter) {
        return Err(FitError::InvalidConfiguration(format!(
            "jitter must be in [0, 1), got {}",
            spec.jitter
        )));
    }

    let mut rng = StdRng::seed_from_u64(spec.seed);
    let cadence = spec.time_span / spec.n_points as f64;
    let noise = Normal::new(0.0, spec.noise_sigma.max(f64::MIN_POSITIVE))
        .map_err(|e| FitError::InvalidConfiguration(format!("noise distribution: {e}")))?;

    let mut times = Vec::with_capacity(spec.n_points);
    let mut values = Vec::with_capacity(spec.n_points);
    for i in 0..spec.n_points {
        let mut t = i as f64 * cadence;
        if spec.jitter > 0.0 {
            t += rng.gen_range(0.0..cadence * spec.jitter);
        }

        let mut y = spec.offset;
        for (n, (&amp, &phase)) in spec.amplitudes.iter().zip(spec.phases.iter()).enumerate() {
            y += amp * (TAU * spec.frequency * (n + 1) as f64 * t + phase).sin();
        }
        if spec.noise_sigma > 0.0 {
            y += noise.sample(&mut rng);
        }

        times.push(t);
        values.push(y);
    }

    let sigmas = (spec.noise_sigma > 0.0).then(|| vec![spec.noise_sigma; spec.n_points]);
    TimeSeries::new(times, values, sigmas)
}
