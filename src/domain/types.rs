//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting
//! - exported to JSON/CSV
//! - reloaded later for plotting or comparisons

use std::f64::consts::TAU;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::FitError;

/// Which trigonometric base function the harmonic model uses.
///
/// `y = A·sin(2πft + φ) + c` for `Sin`, cosine equivalent for `Cos`.
/// The two are phase-shifted parameterizations of the same model; the choice
/// matters only for comparing phases against external catalogs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FitKind {
    Sin,
    Cos,
}

/// An observed light curve: parallel time/value arrays plus optional
/// per-point uncertainties.
///
/// Immutable once constructed. Pre-whitening never mutates a series; it
/// derives a new residual series with the same time stamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSeries {
    times: Vec<f64>,
    values: Vec<f64>,
    sigmas: Option<Vec<f64>>,
}

impl TimeSeries {
    /// Build a series from parallel arrays.
    ///
    /// Times need not be uniformly sampled or sorted; all entries must be
    /// finite and sigmas (when given) strictly positive.
    pub fn new(
        times: Vec<f64>,
        values: Vec<f64>,
        sigmas: Option<Vec<f64>>,
    ) -> Result<Self, FitError> {
        if times.len() != values.len() {
            return Err(FitError::InvalidConfiguration(format!(
                "time/value length mismatch: {} vs {}",
                times.len(),
                values.len()
            )));
        }
        if let Some(s) = &sigmas {
            if s.len() != times.len() {
                return Err(FitError::InvalidConfiguration(format!(
                    "uncertainty length mismatch: {} vs {}",
                    s.len(),
                    times.len()
                )));
            }
            if s.iter().any(|v| !v.is_finite() || *v <= 0.0) {
                return Err(FitError::InvalidConfiguration(
                    "uncertainties must be finite and > 0".into(),
                ));
            }
        }
        if times.iter().chain(values.iter()).any(|v| !v.is_finite()) {
            return Err(FitError::InvalidConfiguration(
                "times and values must be finite".into(),
            ));
        }
        Ok(Self {
            times,
            values,
            sigmas,
        })
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn sigmas(&self) -> Option<&[f64]> {
        self.sigmas.as_deref()
    }

    /// Fit weights: `1/σ²` when uncertainties are present, else uniform.
    pub fn weights(&self) -> Vec<f64> {
        match &self.sigmas {
            Some(s) => s.iter().map(|v| 1.0 / (v * v)).collect(),
            None => vec![1.0; self.times.len()],
        }
    }

    /// Total observation baseline `max(t) - min(t)`.
    pub fn time_span(&self) -> f64 {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for &t in &self.times {
            min = min.min(t);
            max = max.max(t);
        }
        if min.is_finite() && max.is_finite() {
            max - min
        } else {
            0.0
        }
    }

    /// Median spacing between consecutive time-sorted samples.
    pub fn median_cadence(&self) -> f64 {
        if self.times.len() < 2 {
            return 0.0;
        }
        let mut sorted = self.times.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let mut gaps: Vec<f64> = sorted.windows(2).map(|w| w[1] - w[0]).collect();
        gaps.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let mid = gaps.len() / 2;
        if gaps.len() % 2 == 1 {
            gaps[mid]
        } else {
            (gaps[mid - 1] + gaps[mid]) / 2.0
        }
    }

    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.iter().sum::<f64>() / self.values.len() as f64
    }

    /// Derive the residual series `value - model(time)`, preserving times and
    /// uncertainties. Used by the pre-whitening loop after each fit.
    pub fn residual(&self, model: impl Fn(f64) -> f64) -> TimeSeries {
        let values = self
            .times
            .iter()
            .zip(self.values.iter())
            .map(|(&t, &v)| v - model(t))
            .collect();
        TimeSeries {
            times: self.times.clone(),
            values,
            sigmas: self.sigmas.clone(),
        }
    }

    /// Sub-series at the given indices (bootstrap resampling).
    pub fn select(&self, indices: &[usize]) -> TimeSeries {
        TimeSeries {
            times: indices.iter().map(|&i| self.times[i]).collect(),
            values: indices.iter().map(|&i| self.values[i]).collect(),
            sigmas: self
                .sigmas
                .as_ref()
                .map(|s| indices.iter().map(|&i| s[i]).collect()),
        }
    }
}

/// Full fitting configuration.
///
/// All ranges are validated up front by [`FitConfig::validate`]; the pipeline
/// refuses to start fitting with an inconsistent configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitConfig {
    /// Number of harmonics to extract (fundamental counts as 1).
    pub nfreq: usize,
    /// Lower bound of the periodogram grid. Default: 1 / time span.
    pub min_frequency: Option<f64>,
    /// Upper bound of the periodogram grid. Default: `nyquist_factor` × pseudo-Nyquist.
    pub max_frequency: Option<f64>,
    /// Multiple of the pseudo-Nyquist frequency used for the default maximum.
    pub nyquist_factor: f64,
    /// Periodogram oversampling (grid points per peak width).
    pub samples_per_peak: usize,
    /// Estimate errors by bootstrap resampling instead of the fit covariance.
    pub bootstrap: bool,
    /// Number of bootstrap trials.
    pub ntry: usize,
    /// Fraction of points drawn (without replacement) per bootstrap trial.
    pub sample_size: f64,
    /// Run bootstrap trials on a rayon worker pool.
    pub parallel: bool,
    /// Worker count for parallel bootstrap; -1 means all available cores.
    pub ncores: i32,
    /// Trigonometric base function of the model.
    pub kind: FitKind,
    /// RNG seed for bootstrap resampling. `None` = non-deterministic.
    pub seed: Option<u64>,
    /// Iteration cap for the non-linear solver.
    pub max_iterations: usize,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            nfreq: 3,
            min_frequency: None,
            max_frequency: None,
            nyquist_factor: 1.0,
            samples_per_peak: 10,
            bootstrap: false,
            ntry: 100,
            sample_size: 0.7,
            parallel: false,
            ncores: -1,
            kind: FitKind::Sin,
            seed: None,
            max_iterations: 100,
        }
    }
}

impl FitConfig {
    /// Check option ranges and mutual consistency.
    ///
    /// Called once before any fitting; a failure here means no work was done.
    pub fn validate(&self) -> Result<(), FitError> {
        if self.nfreq == 0 {
            return Err(FitError::InvalidConfiguration("nfreq must be >= 1".into()));
        }
        if let Some(f) = self.min_frequency {
            if !f.is_finite() || f <= 0.0 {
                return Err(FitError::InvalidConfiguration(format!(
                    "min_frequency must be finite and > 0, got {f}"
                )));
            }
        }
        if let Some(f) = self.max_frequency {
            if !f.is_finite() || f <= 0.0 {
                return Err(FitError::InvalidConfiguration(format!(
                    "max_frequency must be finite and > 0, got {f}"
                )));
            }
        }
        if let (Some(lo), Some(hi)) = (self.min_frequency, self.max_frequency) {
            if lo >= hi {
                return Err(FitError::InvalidConfiguration(format!(
                    "min_frequency ({lo}) must be < max_frequency ({hi})"
                )));
            }
        }
        if !self.nyquist_factor.is_finite() || self.nyquist_factor <= 0.0 {
            return Err(FitError::InvalidConfiguration(format!(
                "nyquist_factor must be > 0, got {}",
                self.nyquist_factor
            )));
        }
        if self.samples_per_peak == 0 {
            return Err(FitError::InvalidConfiguration(
                "samples_per_peak must be >= 1".into(),
            ));
        }
        if self.bootstrap {
            if self.ntry < 2 {
                return Err(FitError::InvalidConfiguration(
                    "ntry must be >= 2 for bootstrap errors".into(),
                ));
            }
            if !self.sample_size.is_finite()
                || self.sample_size <= 0.0
                || self.sample_size > 1.0
            {
                return Err(FitError::InvalidConfiguration(format!(
                    "sample_size must be in (0, 1], got {}",
                    self.sample_size
                )));
            }
        }
        if self.ncores == 0 || self.ncores < -1 {
            return Err(FitError::InvalidConfiguration(format!(
                "ncores must be -1 or >= 1, got {}",
                self.ncores
            )));
        }
        if self.max_iterations == 0 {
            return Err(FitError::InvalidConfiguration(
                "max_iterations must be >= 1".into(),
            ));
        }
        Ok(())
    }
}

/// Result of fitting one sinusoid at order `n·f0`.
///
/// Produced once per pre-whitening iteration and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarmonicFit {
    /// 1-based harmonic order; the fit sequence is indexed 1..=nfreq.
    pub order: usize,
    /// Frequency of this component (order × fundamental for order > 1).
    pub frequency: f64,
    pub amplitude: f64,
    /// Normalized to [0, 2π).
    pub phase: f64,
    pub offset: f64,
    /// Standard error of the frequency; zero for fixed-frequency harmonics.
    pub frequency_err: f64,
    pub amplitude_err: f64,
    pub phase_err: f64,
    pub offset_err: f64,
    /// Model kind the component was fitted with.
    pub kind: FitKind,
}

impl HarmonicFit {
    /// Evaluate the fitted component at time `t`, offset included.
    pub fn evaluate(&self, t: f64) -> f64 {
        let arg = TAU * self.frequency * t + self.phase;
        let wave = match self.kind {
            FitKind::Sin => arg.sin(),
            FitKind::Cos => arg.cos(),
        };
        self.amplitude * wave + self.offset
    }
}

/// Standard Fourier light-curve diagnostics derived from the fit sequence.
///
/// `r31`/`p31` are present only when at least three harmonics were fitted.
/// The same shape carries the propagated uncertainties, so callers get two
/// parallel structures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FourierParameters {
    pub frequency: f64,
    pub period: f64,
    pub r21: f64,
    pub p21: f64,
    pub r31: Option<f64>,
    pub p31: Option<f64>,
}

/// Completed output of one fitting session: the per-harmonic fits plus the
/// derived Fourier parameters and their uncertainties.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FourierSolution {
    pub harmonics: Vec<HarmonicFit>,
    pub parameters: FourierParameters,
    pub errors: FourierParameters,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn series_rejects_length_mismatch() {
        let err = TimeSeries::new(vec![0.0, 1.0], vec![1.0], None).unwrap_err();
        assert!(matches!(err, FitError::InvalidConfiguration(_)));
    }

    #[test]
    fn series_rejects_nonpositive_sigmas() {
        let err =
            TimeSeries::new(vec![0.0, 1.0], vec![1.0, 2.0], Some(vec![0.1, 0.0])).unwrap_err();
        assert!(matches!(err, FitError::InvalidConfiguration(_)));
    }

    #[test]
    fn median_cadence_handles_unsorted_times() {
        let ts = TimeSeries::new(vec![3.0, 0.0, 1.0, 2.0], vec![0.0; 4], None).unwrap();
        assert!((ts.median_cadence() - 1.0).abs() < 1e-12);
        assert!((ts.time_span() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn residual_preserves_times_and_length() {
        let ts = TimeSeries::new(vec![0.0, 1.0, 2.0], vec![1.0, 2.0, 3.0], None).unwrap();
        let res = ts.residual(|t| t);
        assert_eq!(res.len(), ts.len());
        assert_eq!(res.times(), ts.times());
        for &v in res.values() {
            assert!((v - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn validate_rejects_inverted_frequency_bounds() {
        let config = FitConfig {
            min_frequency: Some(5.0),
            max_frequency: Some(1.0),
            ..FitConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(FitError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn validate_rejects_bad_sample_size() {
        let config = FitConfig {
            bootstrap: true,
            sample_size: 1.5,
            ..FitConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(FitError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn default_config_is_valid() {
        FitConfig::default().validate().unwrap();
    }
}
