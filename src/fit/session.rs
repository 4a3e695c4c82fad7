//! Pre-whitening loop and top-level fitting session.
//!
//! Iteration 1 discovers the fundamental with a full-grid periodogram search
//! followed by a free-frequency fit. Iteration `n > 1` fits a component at
//! exactly `n × f0` (no independent peak search) against the running residual.
//! The loop runs exactly `nfreq` iterations; any failure aborts the session
//! with the originating error tagged with the iteration number.

use crate::domain::{FitConfig, FourierSolution, HarmonicFit, TimeSeries};
use crate::error::FitError;
use crate::fit::bootstrap::bootstrap_estimate;
use crate::fit::harmonic::fit_harmonic;
use crate::fit::params::fourier_parameters;
use crate::math::{FrequencyGrid, find_peak};

/// One fitting session: configuration plus the accumulated harmonic sequence.
///
/// Created once per dataset and discarded after parameter extraction.
#[derive(Debug, Clone)]
pub struct FitterSession {
    series: TimeSeries,
    config: FitConfig,
    harmonics: Vec<HarmonicFit>,
}

impl FitterSession {
    /// Validate the configuration and set up a session.
    ///
    /// Validation happens here, before any fitting is attempted.
    pub fn new(series: TimeSeries, config: FitConfig) -> Result<Self, FitError> {
        config.validate()?;
        Ok(Self {
            series,
            config,
            harmonics: Vec::new(),
        })
    }

    pub fn config(&self) -> &FitConfig {
        &self.config
    }

    pub fn series(&self) -> &TimeSeries {
        &self.series
    }

    /// Harmonic fits accumulated so far (empty before [`FitterSession::run`]).
    pub fn harmonics(&self) -> &[HarmonicFit] {
        &self.harmonics
    }

    /// Run the pre-whitening loop.
    pub fn run(&mut self) -> Result<&[HarmonicFit], FitError> {
        self.harmonics = extract_harmonics(&self.series, &self.config)?;
        Ok(&self.harmonics)
    }

    /// Run the loop (if not already run) and derive the Fourier parameters
    /// with their uncertainties.
    ///
    /// Analytic errors come from the fit covariances; with `bootstrap`
    /// enabled they are replaced by resampling-based estimates.
    pub fn solve(mut self) -> Result<FourierSolution, FitError> {
        if self.harmonics.is_empty() {
            self.run()?;
        }
        let (parameters, analytic_errors) = fourier_parameters(&self.harmonics)?;
        let errors = if self.config.bootstrap {
            let estimate = bootstrap_estimate(&self.series, &self.config)?;
            // Replace the covariance-derived per-harmonic errors with the
            // resampling spreads as well.
            for (h, (amp_err, phase_err)) in self.harmonics.iter_mut().zip(
                estimate
                    .amplitude_errs
                    .iter()
                    .zip(estimate.phase_errs.iter()),
            ) {
                h.amplitude_err = *amp_err;
                h.phase_err = *phase_err;
            }
            estimate.parameter_errors
        } else {
            analytic_errors
        };
        Ok(FourierSolution {
            harmonics: self.harmonics,
            parameters,
            errors,
        })
    }
}

/// Run `nfreq` pre-whitening iterations and return the harmonic sequence.
///
/// Kept as a free function so bootstrap trials can run it on resampled
/// series without constructing a session per trial.
pub fn extract_harmonics(
    series: &TimeSeries,
    config: &FitConfig,
) -> Result<Vec<HarmonicFit>, FitError> {
    let mut residual = series.clone();
    let mut harmonics = Vec::with_capacity(config.nfreq);
    let mut fundamental = 0.0;

    for order in 1..=config.nfreq {
        check_residual_variance(&residual).map_err(|e| e.at_iteration(order))?;

        let fit = if order == 1 {
            // Discover f0: full-grid search, then refine with a free frequency.
            let grid =
                FrequencyGrid::for_series(&residual, config).map_err(|e| e.at_iteration(order))?;
            let peak = find_peak(&residual, &grid).map_err(|e| e.at_iteration(order))?;
            let fit = fit_harmonic(
                &residual,
                order,
                peak.peak_frequency,
                config.kind,
                true,
                config.max_iterations,
            )
            .map_err(|e| e.at_iteration(order))?;
            fundamental = fit.frequency;
            fit
        } else {
            fit_harmonic(
                &residual,
                order,
                fundamental * order as f64,
                config.kind,
                false,
                config.max_iterations,
            )
            .map_err(|e| e.at_iteration(order))?
        };

        // Subtract the oscillatory part only; removing the offset every
        // iteration would drift the residual mean.
        let component = fit.clone();
        residual = residual.residual(move |t| component.evaluate(t) - component.offset);
        harmonics.push(fit);
    }

    Ok(harmonics)
}

fn check_residual_variance(series: &TimeSeries) -> Result<(), FitError> {
    let mean = series.mean();
    let var = series
        .values()
        .iter()
        .map(|&v| (v - mean).powi(2))
        .sum::<f64>()
        / (series.len().max(2) - 1) as f64;
    if var <= f64::EPSILON {
        return Err(FitError::InsufficientData {
            n_points: series.len(),
            detail: "residual variance is zero; nothing left to fit".into(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FitKind;
    use crate::math::power_spectrum;
    use std::f64::consts::TAU;

    fn two_harmonic_series(f0: f64, n: usize, span: f64) -> TimeSeries {
        let times: Vec<f64> = (0..n)
            .map(|i| span * i as f64 / n as f64 + 0.005 * (i as f64).sin())
            .collect();
        let values = times
            .iter()
            .map(|&t| (TAU * f0 * t).sin() + 0.5 * (2.0 * TAU * f0 * t + 0.3).sin() + 2.0)
            .collect();
        TimeSeries::new(times, values, None).unwrap()
    }

    #[test]
    fn harmonic_orders_are_exact_multiples_of_the_fundamental() {
        let series = two_harmonic_series(1.2, 400, 25.0);
        let config = FitConfig {
            nfreq: 3,
            ..FitConfig::default()
        };
        let harmonics = extract_harmonics(&series, &config).unwrap();

        assert_eq!(harmonics.len(), 3);
        let f0 = harmonics[0].frequency;
        for (i, h) in harmonics.iter().enumerate() {
            assert_eq!(h.order, i + 1);
            assert!((h.frequency - f0 * (i + 1) as f64).abs() < 1e-12);
        }
    }

    #[test]
    fn prewhitening_suppresses_power_at_the_fundamental() {
        let series = two_harmonic_series(0.9, 400, 30.0);
        let config = FitConfig {
            nfreq: 1,
            ..FitConfig::default()
        };

        let harmonics = extract_harmonics(&series, &config).unwrap();
        let f0 = harmonics[0].frequency;
        let h = harmonics[0].clone();
        let residual = series.residual(move |t| h.evaluate(t) - h.offset);

        let before = power_spectrum(&series, &[f0])[0];
        let after = power_spectrum(&residual, &[f0])[0];
        assert!(
            after < before * 0.1,
            "power at f0 should collapse: before={before}, after={after}"
        );
    }

    #[test]
    fn residual_length_is_invariant_across_iterations() {
        let series = two_harmonic_series(1.0, 200, 20.0);
        let config = FitConfig {
            nfreq: 2,
            ..FitConfig::default()
        };
        let mut session = FitterSession::new(series, config).unwrap();
        let n = session.series().len();
        session.run().unwrap();
        assert_eq!(session.series().len(), n);
    }

    #[test]
    fn invalid_config_fails_before_any_fitting() {
        let series = two_harmonic_series(1.0, 50, 10.0);
        let config = FitConfig {
            min_frequency: Some(2.0),
            max_frequency: Some(1.0),
            ..FitConfig::default()
        };
        let err = FitterSession::new(series, config).unwrap_err();
        assert!(matches!(err, FitError::InvalidConfiguration(_)));
    }

    #[test]
    fn constant_series_aborts_with_insufficient_data() {
        let times: Vec<f64> = (0..50).map(|i| i as f64).collect();
        let series = TimeSeries::new(times, vec![3.0; 50], None).unwrap();
        let config = FitConfig {
            nfreq: 1,
            ..FitConfig::default()
        };
        let err = extract_harmonics(&series, &config).unwrap_err();
        assert!(matches!(err, FitError::InsufficientData { .. }));
    }

    #[test]
    fn session_solve_produces_parameters_and_errors() {
        let series = two_harmonic_series(1.1, 300, 25.0);
        let config = FitConfig {
            nfreq: 2,
            kind: FitKind::Sin,
            ..FitConfig::default()
        };
        let solution = FitterSession::new(series, config).unwrap().solve().unwrap();
        assert_eq!(solution.harmonics.len(), 2);
        assert!(solution.parameters.period > 0.0);
        assert!(solution.errors.r21.is_finite());
    }
}
