//! Lomb-Scargle periodogram and frequency grid generation.
//!
//! The periodogram follows Scargle (1982) with the classic tau phase shift
//! that makes the sine and cosine terms orthogonal at each test frequency,
//! so it works on unevenly sampled series.
//!
//! The frequency grid spans `[1/T, nyquist_factor * f_pseudo-Nyquist]` by
//! default, with spacing `f_min / samples_per_peak` (oversampling).

use std::f64::consts::TAU;

use crate::domain::{FitConfig, TimeSeries};
use crate::error::FitError;

/// An ordered grid of candidate frequencies.
///
/// Ephemeral: built per search, consumed by [`find_peak`].
#[derive(Debug, Clone)]
pub struct FrequencyGrid {
    frequencies: Vec<f64>,
    /// Grid spacing; also the frequency resolution of a peak search.
    step: f64,
}

impl FrequencyGrid {
    /// Build a grid for the given series using the configured bounds.
    ///
    /// Defaults when bounds are absent:
    /// - minimum: one cycle over the observation baseline
    /// - maximum: `nyquist_factor` × pseudo-Nyquist from the median cadence
    pub fn for_series(series: &TimeSeries, config: &FitConfig) -> Result<Self, FitError> {
        check_series(series)?;

        let span = series.time_span();
        let f_min = match config.min_frequency {
            Some(f) => f,
            None => 1.0 / span,
        };
        let f_max = match config.max_frequency {
            Some(f) => f,
            None => {
                let cadence = series.median_cadence();
                if cadence <= 0.0 {
                    return Err(FitError::InsufficientData {
                        n_points: series.len(),
                        detail: "median cadence is zero; cannot derive a Nyquist frequency".into(),
                    });
                }
                config.nyquist_factor * 0.5 / cadence
            }
        };
        if f_min >= f_max {
            return Err(FitError::InvalidConfiguration(format!(
                "derived frequency bounds are inverted: min={f_min}, max={f_max}"
            )));
        }

        let step = (1.0 / span) / config.samples_per_peak as f64;
        let n = ((f_max - f_min) / step).ceil() as usize + 1;
        let frequencies = (0..n).map(|i| f_min + i as f64 * step).collect();
        Ok(Self { frequencies, step })
    }

    pub fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }
}

/// Periodogram power over a grid, plus the selected peak.
#[derive(Debug, Clone)]
pub struct Periodogram {
    pub frequencies: Vec<f64>,
    pub power: Vec<f64>,
    pub peak_frequency: f64,
    pub peak_power: f64,
    /// Grid spacing the peak was located on.
    pub resolution: f64,
}

/// Compute the Lomb-Scargle periodogram and select the dominant frequency.
pub fn find_peak(series: &TimeSeries, grid: &FrequencyGrid) -> Result<Periodogram, FitError> {
    check_series(series)?;
    if grid.is_empty() {
        return Err(FitError::InvalidConfiguration(
            "frequency grid is empty".into(),
        ));
    }

    let power = power_spectrum(series, grid.frequencies());

    // Deterministic peak selection: maximum power, ties broken by lower index.
    let mut peak_idx = 0;
    for (i, &p) in power.iter().enumerate() {
        if p > power[peak_idx] {
            peak_idx = i;
        }
    }

    Ok(Periodogram {
        frequencies: grid.frequencies().to_vec(),
        power: power.clone(),
        peak_frequency: grid.frequencies()[peak_idx],
        peak_power: power[peak_idx],
        resolution: grid.step(),
    })
}

/// Normalized Lomb-Scargle power at each grid frequency.
pub fn power_spectrum(series: &TimeSeries, frequencies: &[f64]) -> Vec<f64> {
    let times = series.times();
    let values = series.values();
    let n = times.len();

    let mean = series.mean();
    let var = values.iter().map(|&y| (y - mean).powi(2)).sum::<f64>() / (n as f64 - 1.0);

    frequencies
        .iter()
        .map(|&f| single_frequency_power(times, values, mean, var, TAU * f))
        .collect()
}

/// Scargle (1982) normalized power at angular frequency `omega`.
fn single_frequency_power(times: &[f64], values: &[f64], mean: f64, var: f64, omega: f64) -> f64 {
    if var <= 0.0 || omega <= 0.0 {
        return 0.0;
    }

    // Tau phase shift makes the sine and cosine sums orthogonal.
    let mut sum_sin = 0.0;
    let mut sum_cos = 0.0;
    for &t in times {
        let arg = 2.0 * omega * t;
        sum_sin += arg.sin();
        sum_cos += arg.cos();
    }
    let tau = sum_sin.atan2(sum_cos) / (2.0 * omega);

    let mut sc = 0.0;
    let mut ss = 0.0;
    let mut cc = 0.0;
    let mut s2 = 0.0;
    for (&t, &y) in times.iter().zip(values.iter()) {
        let centered = y - mean;
        let arg = omega * (t - tau);
        let c = arg.cos();
        let s = arg.sin();
        sc += centered * c;
        ss += centered * s;
        cc += c * c;
        s2 += s * s;
    }

    let cc = cc.max(1e-15);
    let s2 = s2.max(1e-15);
    0.5 * (sc * sc / cc + ss * ss / s2) / var
}

/// False alarm probability of a peak, Horne & Baliunas (1986) approximation.
///
/// Uses `min(n_data, n_frequencies)` as the independent-frequency count.
pub fn false_alarm_probability(peak_power: f64, n_data: usize, n_freq: usize) -> f64 {
    if peak_power <= 0.0 {
        return 1.0;
    }
    let m = n_data.min(n_freq) as f64;
    let single = 1.0 - (-peak_power).exp();
    1.0 - single.powf(m)
}

fn check_series(series: &TimeSeries) -> Result<(), FitError> {
    if series.len() < 3 {
        return Err(FitError::InsufficientData {
            n_points: series.len(),
            detail: "periodogram search needs at least 3 points".into(),
        });
    }
    if series.time_span() <= 0.0 {
        return Err(FitError::InsufficientData {
            n_points: series.len(),
            detail: "zero time span".into(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine_series(f0: f64, n: usize, span: f64) -> TimeSeries {
        // Slightly uneven sampling so the test exercises the irregular path.
        let times: Vec<f64> = (0..n)
            .map(|i| {
                let u = i as f64 / n as f64;
                span * u + 0.013 * (i as f64 * 0.7).sin()
            })
            .collect();
        let values = times.iter().map(|&t| (TAU * f0 * t).sin()).collect();
        TimeSeries::new(times, values, None).unwrap()
    }

    #[test]
    fn recovers_known_frequency_within_one_grid_step() {
        let f0 = 2.3;
        let series = sine_series(f0, 400, 20.0);
        let grid = FrequencyGrid::for_series(&series, &FitConfig::default()).unwrap();
        let pg = find_peak(&series, &grid).unwrap();
        assert!(
            (pg.peak_frequency - f0).abs() <= pg.resolution,
            "peak {} vs true {} (step {})",
            pg.peak_frequency,
            f0,
            pg.resolution
        );
    }

    #[test]
    fn two_points_is_insufficient() {
        let series = TimeSeries::new(vec![0.0, 1.0], vec![0.0, 1.0], None).unwrap();
        let err = FrequencyGrid::for_series(&series, &FitConfig::default()).unwrap_err();
        assert!(matches!(err, FitError::InsufficientData { n_points: 2, .. }));
    }

    #[test]
    fn zero_span_is_insufficient() {
        let series = TimeSeries::new(vec![1.0; 5], vec![0.0, 1.0, 2.0, 1.0, 0.0], None).unwrap();
        let err = FrequencyGrid::for_series(&series, &FitConfig::default()).unwrap_err();
        assert!(matches!(err, FitError::InsufficientData { .. }));
    }

    #[test]
    fn explicit_bounds_are_respected() {
        let series = sine_series(1.0, 100, 10.0);
        let config = FitConfig {
            min_frequency: Some(0.5),
            max_frequency: Some(2.0),
            ..FitConfig::default()
        };
        let grid = FrequencyGrid::for_series(&series, &config).unwrap();
        let freqs = grid.frequencies();
        assert!(freqs[0] >= 0.5 - 1e-12);
        assert!(*freqs.last().unwrap() <= 2.0 + grid.step() + 1e-12);
    }

    #[test]
    fn fap_is_monotone_in_power() {
        let low = false_alarm_probability(2.0, 100, 1000);
        let high = false_alarm_probability(20.0, 100, 1000);
        assert!(high < low);
        assert!((0.0..=1.0).contains(&low));
    }

    #[test]
    fn clean_sine_peak_power_is_large() {
        // Pure noise-free sine: peak power should approach n/2 under the
        // Scargle normalization (variance-scaled).
        let series = sine_series(1.5, 200, 15.0);
        let grid = FrequencyGrid::for_series(&series, &FitConfig::default()).unwrap();
        let pg = find_peak(&series, &grid).unwrap();
        assert!(pg.peak_power > 0.8 * series.len() as f64 / 2.0);
    }
}
