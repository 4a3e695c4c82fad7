//! Single-sinusoid fitting at a target frequency.
//!
//! The model is `y = A·sin(2πft + φ) + c` (or the cosine equivalent), solved
//! by Levenberg-Marquardt. The fundamental is fitted with the frequency as a
//! free parameter seeded at the periodogram peak; higher harmonics fix the
//! frequency at an exact integer multiple of the fundamental.
//!
//! Post-fit normalization: amplitude is forced non-negative by folding the
//! sign into the phase, and the phase is reduced to `[0, 2π)`.

use std::f64::consts::{PI, TAU};

use crate::domain::{FitKind, HarmonicFit, TimeSeries};
use crate::error::FitError;
use crate::math::{LmModel, LmOptions, optimize};

/// Sinusoid with a fixed frequency. Parameters: `[A, φ, c]`.
struct FixedFreqSinusoid {
    frequency: f64,
    kind: FitKind,
}

impl LmModel for FixedFreqSinusoid {
    fn param_len(&self) -> usize {
        3
    }

    fn evaluate(&self, t: f64, params: &[f64]) -> f64 {
        let arg = TAU * self.frequency * t + params[1];
        params[0] * wave(self.kind, arg) + params[2]
    }

    fn jacobian_row(&self, t: f64, params: &[f64], out: &mut [f64]) {
        let arg = TAU * self.frequency * t + params[1];
        out[0] = wave(self.kind, arg);
        out[1] = params[0] * dwave(self.kind, arg);
        out[2] = 1.0;
    }
}

/// Sinusoid with the frequency as a free parameter. Parameters: `[f, A, φ, c]`.
struct FreeFreqSinusoid {
    kind: FitKind,
}

impl LmModel for FreeFreqSinusoid {
    fn param_len(&self) -> usize {
        4
    }

    fn evaluate(&self, t: f64, params: &[f64]) -> f64 {
        let arg = TAU * params[0] * t + params[2];
        params[1] * wave(self.kind, arg) + params[3]
    }

    fn jacobian_row(&self, t: f64, params: &[f64], out: &mut [f64]) {
        let arg = TAU * params[0] * t + params[2];
        let d = dwave(self.kind, arg);
        out[0] = params[1] * d * TAU * t;
        out[1] = wave(self.kind, arg);
        out[2] = params[1] * d;
        out[3] = 1.0;
    }

    fn constrain(&self, params: &mut [f64]) {
        // A drifting-negative frequency has no physical meaning here.
        params[0] = params[0].max(1e-12);
    }
}

fn wave(kind: FitKind, arg: f64) -> f64 {
    match kind {
        FitKind::Sin => arg.sin(),
        FitKind::Cos => arg.cos(),
    }
}

fn dwave(kind: FitKind, arg: f64) -> f64 {
    match kind {
        FitKind::Sin => arg.cos(),
        FitKind::Cos => -arg.sin(),
    }
}

/// Fit one sinusoid to the series.
///
/// `free_frequency` releases the frequency as a fourth fit parameter (used
/// for the fundamental); otherwise the component is fitted at exactly
/// `frequency`.
pub fn fit_harmonic(
    series: &TimeSeries,
    order: usize,
    frequency: f64,
    kind: FitKind,
    free_frequency: bool,
    max_iterations: usize,
) -> Result<HarmonicFit, FitError> {
    let p = if free_frequency { 4 } else { 3 };
    if series.len() <= p {
        return Err(FitError::InsufficientData {
            n_points: series.len(),
            detail: format!("need more than {p} points to fit a {p}-parameter sinusoid"),
        });
    }
    if !frequency.is_finite() || frequency <= 0.0 {
        return Err(FitError::InvalidConfiguration(format!(
            "target frequency must be finite and > 0, got {frequency}"
        )));
    }

    let times = series.times();
    let values = series.values();
    let weights = series.weights();

    // Initial guesses: offset from the mean, amplitude from half the
    // peak-to-peak range, phase from a coarse grid scan.
    let offset0 = series.mean();
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let amplitude0 = ((max - min) / 2.0).max(1e-12);
    let phase0 = coarse_phase(times, values, &weights, frequency, amplitude0, offset0, kind);

    let opts = LmOptions {
        max_iterations,
        ..LmOptions::default()
    };

    let outcome = if free_frequency {
        let model = FreeFreqSinusoid { kind };
        optimize(
            &model,
            times,
            values,
            &weights,
            vec![frequency, amplitude0, phase0, offset0],
            &opts,
        )
    } else {
        let model = FixedFreqSinusoid { frequency, kind };
        optimize(
            &model,
            times,
            values,
            &weights,
            vec![amplitude0, phase0, offset0],
            &opts,
        )
    };

    if !outcome.converged {
        return Err(FitError::FitConvergence {
            iteration: 0,
            frequency,
            detail: format!("no convergence after {} iterations", outcome.iterations),
        });
    }
    if outcome.params.iter().any(|v| !v.is_finite()) {
        return Err(FitError::FitConvergence {
            iteration: 0,
            frequency,
            detail: "solver produced non-finite parameters".into(),
        });
    }

    // Parameter order depends on the model; unpack into a common shape.
    let (fitted_freq, amp_idx) = if free_frequency {
        (outcome.params[0], 1)
    } else {
        (frequency, 0)
    };
    let mut amplitude = outcome.params[amp_idx];
    let mut phase = outcome.params[amp_idx + 1];
    let offset = outcome.params[amp_idx + 2];

    let err = |i: usize| -> Result<f64, FitError> {
        outcome.std_err(i).ok_or_else(|| FitError::FitConvergence {
            iteration: 0,
            frequency,
            detail: "singular normal matrix; no parameter covariance".into(),
        })
    };
    let frequency_err = if free_frequency { err(0)? } else { 0.0 };
    let amplitude_err = err(amp_idx)?;
    let phase_err = err(amp_idx + 1)?;
    let offset_err = err(amp_idx + 2)?;

    // Fold a negative amplitude into the phase, then reduce to [0, 2π).
    if amplitude < 0.0 {
        amplitude = -amplitude;
        phase += PI;
    }
    phase = phase.rem_euclid(TAU);

    Ok(HarmonicFit {
        order,
        frequency: fitted_freq,
        amplitude,
        phase,
        offset,
        frequency_err,
        amplitude_err,
        phase_err,
        offset_err,
        kind,
    })
}

/// Pick the starting phase by scanning a coarse grid and keeping the value
/// with the lowest weighted SSE. The chi-square surface is periodic in φ, so
/// a gradient start on the wrong side of the peak converges to a mirrored
/// local minimum.
fn coarse_phase(
    times: &[f64],
    values: &[f64],
    weights: &[f64],
    frequency: f64,
    amplitude: f64,
    offset: f64,
    kind: FitKind,
) -> f64 {
    const STEPS: usize = 16;
    let mut best_phase = 0.0;
    let mut best_sse = f64::INFINITY;
    for i in 0..STEPS {
        let phase = TAU * i as f64 / STEPS as f64;
        let sse: f64 = times
            .iter()
            .zip(values.iter())
            .zip(weights.iter())
            .map(|((&t, &y), &w)| {
                let r = y - (amplitude * wave(kind, TAU * frequency * t + phase) + offset);
                w * r * r
            })
            .sum();
        if sse < best_sse {
            best_sse = sse;
            best_phase = phase;
        }
    }
    best_phase
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthetic(f0: f64, amp: f64, phase: f64, offset: f64, n: usize, span: f64) -> TimeSeries {
        let times: Vec<f64> = (0..n).map(|i| span * i as f64 / n as f64).collect();
        let values = times
            .iter()
            .map(|&t| amp * (TAU * f0 * t + phase).sin() + offset)
            .collect();
        TimeSeries::new(times, values, None).unwrap()
    }

    #[test]
    fn recovers_amplitude_and_phase_within_one_percent() {
        let (f0, amp, phase, offset) = (1.7, 0.8, 1.2, 5.0);
        let series = synthetic(f0, amp, phase, offset, 300, 12.0);

        let fit = fit_harmonic(&series, 1, f0, FitKind::Sin, false, 100).unwrap();
        assert!((fit.amplitude - amp).abs() / amp < 0.01);
        assert!((fit.phase - phase).abs() < 0.01);
        assert!((fit.offset - offset).abs() < 0.01);
    }

    #[test]
    fn free_frequency_refines_a_coarse_peak() {
        let f0 = 2.31;
        let series = synthetic(f0, 1.0, 0.3, 0.0, 400, 20.0);

        // Seed slightly off the true frequency, as a grid peak would be.
        let fit = fit_harmonic(&series, 1, f0 + 0.002, FitKind::Sin, true, 200).unwrap();
        assert!((fit.frequency - f0).abs() < 1e-4);
        assert!(fit.frequency_err > 0.0);
    }

    #[test]
    fn constant_offset_shift_leaves_amplitude_and_phase_unchanged() {
        let f0 = 1.3;
        let base = synthetic(f0, 0.5, 0.9, 0.0, 200, 10.0);
        let shifted = TimeSeries::new(
            base.times().to_vec(),
            base.values().iter().map(|v| v + 7.5).collect(),
            None,
        )
        .unwrap();

        let a = fit_harmonic(&base, 1, f0, FitKind::Sin, false, 100).unwrap();
        let b = fit_harmonic(&shifted, 1, f0, FitKind::Sin, false, 100).unwrap();
        assert!((a.amplitude - b.amplitude).abs() < 1e-8);
        assert!((a.phase - b.phase).abs() < 1e-8);
        assert!((b.offset - a.offset - 7.5).abs() < 1e-8);
    }

    #[test]
    fn amplitude_is_normalized_non_negative() {
        // A signal in anti-phase: the solver may land on a negative amplitude,
        // which must be folded into the phase.
        let f0 = 1.0;
        let series = synthetic(f0, 1.0, PI, 0.0, 150, 8.0);
        let fit = fit_harmonic(&series, 1, f0, FitKind::Sin, false, 100).unwrap();
        assert!(fit.amplitude >= 0.0);
        assert!((0.0..TAU).contains(&fit.phase));
        // Model must still reproduce the data.
        let y0 = series.values()[10];
        assert!((fit.evaluate(series.times()[10]) - y0).abs() < 1e-6);
    }

    #[test]
    fn cos_kind_shifts_phase_by_quarter_cycle() {
        let f0 = 1.1;
        let series = synthetic(f0, 1.0, 0.4, 0.0, 200, 10.0);
        let s = fit_harmonic(&series, 1, f0, FitKind::Sin, false, 100).unwrap();
        let c = fit_harmonic(&series, 1, f0, FitKind::Cos, false, 100).unwrap();
        // sin(x) = cos(x - π/2); phases differ by π/2 mod 2π.
        let diff = (s.phase - c.phase).rem_euclid(TAU);
        assert!((diff - PI / 2.0).abs() < 0.01, "diff={diff}");
        assert!((s.amplitude - c.amplitude).abs() < 1e-6);
    }

    #[test]
    fn too_few_points_is_insufficient_data() {
        let series = TimeSeries::new(vec![0.0, 1.0, 2.0], vec![0.0, 1.0, 0.0], None).unwrap();
        let err = fit_harmonic(&series, 1, 1.0, FitKind::Sin, false, 100).unwrap_err();
        assert!(matches!(err, FitError::InsufficientData { .. }));
    }
}
