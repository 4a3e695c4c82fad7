//! Bootstrap (resampling) error estimation.
//!
//! Each trial draws a random subset of the series without replacement,
//! re-runs the full pre-whitening loop on the subsample, and records the
//! recovered parameters. The final error of each parameter is the sample
//! standard deviation across trials.
//!
//! Trials are independent, own their resampled series, and never communicate
//! mid-computation; parallel execution distributes them over a rayon pool
//! sized by `ncores` (-1 = all available cores) and aggregates by plain
//! collection after the join.
//!
//! Randomness is explicit: an optional seed in the configuration makes the
//! whole estimate reproducible, and each trial derives its own RNG from it.

use std::f64::consts::{PI, TAU};

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rayon::prelude::*;

use crate::domain::{FitConfig, FourierParameters, TimeSeries};
use crate::error::FitError;
use crate::fit::params::fourier_parameters;
use crate::fit::session::extract_harmonics;

/// Resampling-based uncertainties for a fitting session.
#[derive(Debug, Clone)]
pub struct BootstrapEstimate {
    /// Spread of the derived Fourier parameters across trials.
    pub parameter_errors: FourierParameters,
    /// Per-harmonic amplitude spread, indexed by order - 1.
    pub amplitude_errs: Vec<f64>,
    /// Per-harmonic phase spread (circular), indexed by order - 1.
    pub phase_errs: Vec<f64>,
    /// Trials that converged out of `ntry`.
    pub n_success: usize,
}

/// Parameters recovered by one successful trial.
#[derive(Debug, Clone)]
struct TrialResult {
    amplitudes: Vec<f64>,
    phases: Vec<f64>,
    parameters: FourierParameters,
}

/// Estimate Fourier-parameter errors by bootstrap resampling.
///
/// Requires `config.bootstrap` settings to be validated beforehand (the
/// session does this). A trial whose sub-fit fails to converge is dropped;
/// fewer than two surviving trials is reported as a convergence failure.
pub fn bootstrap_errors(
    series: &TimeSeries,
    config: &FitConfig,
) -> Result<FourierParameters, FitError> {
    Ok(bootstrap_estimate(series, config)?.parameter_errors)
}

/// Full bootstrap estimate including per-harmonic spreads.
pub fn bootstrap_estimate(
    series: &TimeSeries,
    config: &FitConfig,
) -> Result<BootstrapEstimate, FitError> {
    let n = series.len();
    let n_draw = ((config.sample_size * n as f64).ceil() as usize).min(n);
    if n_draw < 8 {
        return Err(FitError::InsufficientData {
            n_points: n,
            detail: format!(
                "bootstrap subsample of {n_draw} points is too small (sample_size={})",
                config.sample_size
            ),
        });
    }

    let base_seed = config.seed.unwrap_or_else(rand::random);
    let seeds: Vec<u64> = (0..config.ntry)
        .map(|i| base_seed.wrapping_add((i as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)))
        .collect();

    let trial = |&seed: &u64| -> Option<TrialResult> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut indices = sample(&mut rng, n, n_draw).into_vec();
        indices.sort_unstable();
        let subsample = series.select(&indices);

        let harmonics = extract_harmonics(&subsample, config).ok()?;
        let (parameters, _) = fourier_parameters(&harmonics).ok()?;
        Some(TrialResult {
            amplitudes: harmonics.iter().map(|h| h.amplitude).collect(),
            phases: harmonics.iter().map(|h| h.phase).collect(),
            parameters,
        })
    };

    let results: Vec<Option<TrialResult>> = if config.parallel {
        let pool = build_pool(config.ncores)?;
        pool.install(|| seeds.par_iter().map(trial).collect())
    } else {
        seeds.iter().map(trial).collect()
    };

    let trials: Vec<TrialResult> = results.into_iter().flatten().collect();
    if trials.len() < 2 {
        return Err(FitError::FitConvergence {
            iteration: 0,
            frequency: 0.0,
            detail: format!(
                "only {} of {} bootstrap trials converged",
                trials.len(),
                config.ntry
            ),
        });
    }

    let amplitude_errs: Vec<f64> = (0..config.nfreq)
        .map(|i| sample_std(&collect(&trials, |t| t.amplitudes[i])))
        .collect();
    let phase_errs: Vec<f64> = (0..config.nfreq)
        .map(|i| circular_std(&collect(&trials, |t| t.phases[i])))
        .collect();

    let has_third = trials.iter().all(|t| t.parameters.r31.is_some());
    let parameter_errors = FourierParameters {
        frequency: sample_std(&collect(&trials, |t| t.parameters.frequency)),
        period: sample_std(&collect(&trials, |t| t.parameters.period)),
        r21: sample_std(&collect(&trials, |t| t.parameters.r21)),
        p21: circular_std(&collect(&trials, |t| t.parameters.p21)),
        r31: has_third
            .then(|| sample_std(&collect(&trials, |t| t.parameters.r31.unwrap_or_default()))),
        p31: has_third
            .then(|| circular_std(&collect(&trials, |t| t.parameters.p31.unwrap_or_default()))),
    };

    Ok(BootstrapEstimate {
        parameter_errors,
        amplitude_errs,
        phase_errs,
        n_success: trials.len(),
    })
}

pub(crate) fn build_pool(ncores: i32) -> Result<rayon::ThreadPool, FitError> {
    // rayon treats 0 as "use all available parallelism".
    let threads = if ncores == -1 { 0 } else { ncores as usize };
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| FitError::InvalidConfiguration(format!("failed to build worker pool: {e}")))
}

fn collect(trials: &[TrialResult], f: impl Fn(&TrialResult) -> f64) -> Vec<f64> {
    trials.iter().map(f).collect()
}

/// Sample standard deviation (n-1 denominator).
fn sample_std(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let var = values.iter().map(|&v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    var.sqrt()
}

/// Standard deviation of angles, computed on deviations unwrapped to (-π, π]
/// around the first value so a cluster straddling 0/2π is not inflated.
fn circular_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let reference = values[0];
    let deviations: Vec<f64> = values
        .iter()
        .map(|&v| (v - reference + PI).rem_euclid(TAU) - PI)
        .collect();
    sample_std(&deviations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FitKind;

    fn noisy_series(f0: f64, n: usize, span: f64, seed: u64) -> TimeSeries {
        use rand::Rng;
        use rand_distr::{Distribution, Normal};

        let mut rng = StdRng::seed_from_u64(seed);
        let normal = Normal::new(0.0, 0.05).unwrap();
        let times: Vec<f64> = (0..n)
            .map(|i| span * i as f64 / n as f64 + rng.gen_range(0.0..0.01))
            .collect();
        let values = times
            .iter()
            .map(|&t| {
                (TAU * f0 * t).sin()
                    + 0.4 * (2.0 * TAU * f0 * t + 0.5).sin()
                    + normal.sample(&mut rng)
            })
            .collect();
        TimeSeries::new(times, values, None).unwrap()
    }

    fn bootstrap_config(parallel: bool) -> FitConfig {
        FitConfig {
            nfreq: 2,
            bootstrap: true,
            ntry: 20,
            sample_size: 0.8,
            parallel,
            seed: Some(42),
            kind: FitKind::Sin,
            ..FitConfig::default()
        }
    }

    #[test]
    fn serial_bootstrap_produces_finite_positive_spreads() {
        let series = noisy_series(1.3, 200, 20.0, 7);
        let est = bootstrap_estimate(&series, &bootstrap_config(false)).unwrap();
        assert!(est.n_success >= 2);
        assert!(est.parameter_errors.r21 > 0.0 && est.parameter_errors.r21.is_finite());
        assert!(est.parameter_errors.p21 > 0.0 && est.parameter_errors.p21.is_finite());
        assert_eq!(est.amplitude_errs.len(), 2);
        assert!(est.amplitude_errs.iter().all(|e| e.is_finite() && *e >= 0.0));
    }

    #[test]
    fn parallel_matches_serial_given_the_same_seed() {
        // Trials derive their RNG from (seed, trial index), so scheduling
        // cannot change the resamples; the two modes must agree exactly.
        let series = noisy_series(1.1, 150, 15.0, 11);
        let serial = bootstrap_estimate(&series, &bootstrap_config(false)).unwrap();
        let parallel = bootstrap_estimate(&series, &bootstrap_config(true)).unwrap();

        assert_eq!(serial.n_success, parallel.n_success);
        assert!((serial.parameter_errors.r21 - parallel.parameter_errors.r21).abs() < 1e-12);
        assert!((serial.parameter_errors.p21 - parallel.parameter_errors.p21).abs() < 1e-12);
    }

    #[test]
    fn tiny_subsample_is_rejected() {
        let series = noisy_series(1.0, 20, 10.0, 3);
        let config = FitConfig {
            sample_size: 0.1,
            ..bootstrap_config(false)
        };
        let err = bootstrap_estimate(&series, &config).unwrap_err();
        assert!(matches!(err, FitError::InsufficientData { .. }));
    }

    #[test]
    fn circular_std_handles_wraparound() {
        // Phases clustered around 0/2π: naive std would be ~π.
        let values = vec![0.05, TAU - 0.05, 0.02, TAU - 0.02];
        let std = circular_std(&values);
        assert!(std < 0.1, "wraparound cluster should be tight, got {std}");
    }
}
