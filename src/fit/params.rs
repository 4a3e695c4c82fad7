//! Fourier parameter calculation.
//!
//! Post-processes a completed harmonic sequence into the standard light-curve
//! diagnostics: period, amplitude ratios `R21 = A2/A1`, `R31 = A3/A1`, and
//! phase differences `P21 = φ2 - 2φ1`, `P31 = φ3 - 3φ1` (mod 2π).
//!
//! Pure functions of the fit sequence; uncertainties are propagated to first
//! order from the per-harmonic standard errors.

use std::f64::consts::TAU;

use crate::domain::{FourierParameters, HarmonicFit};
use crate::error::FitError;

/// Amplitude ratio `Rn1 = An/A1` for harmonic order `n >= 2`.
///
/// A zero fundamental amplitude means the fit degenerated and every ratio
/// is undefined.
pub fn amplitude_ratio(harmonics: &[HarmonicFit], order: usize) -> Result<f64, FitError> {
    let (h1, hn) = pair(harmonics, order)?;
    if h1.amplitude <= 0.0 {
        return Err(FitError::FitConvergence {
            iteration: 1,
            frequency: h1.frequency,
            detail: "fundamental amplitude is zero; amplitude ratios are undefined".into(),
        });
    }
    Ok(hn.amplitude / h1.amplitude)
}

/// Phase difference `Pn1 = φn - n·φ1` reduced to `[0, 2π)`.
pub fn phase_difference(harmonics: &[HarmonicFit], order: usize) -> Result<f64, FitError> {
    let (h1, hn) = pair(harmonics, order)?;
    Ok((hn.phase - order as f64 * h1.phase).rem_euclid(TAU))
}

/// Derive the full Fourier parameter set and its propagated uncertainties.
///
/// Requires at least two fitted harmonics; `R31`/`P31` are filled only when a
/// third harmonic is present.
pub fn fourier_parameters(
    harmonics: &[HarmonicFit],
) -> Result<(FourierParameters, FourierParameters), FitError> {
    if harmonics.len() < 2 {
        return Err(FitError::UndefinedRatio {
            order: 2,
            nfreq: harmonics.len(),
        });
    }

    let h1 = &harmonics[0];
    let frequency = h1.frequency;
    let period = 1.0 / frequency;

    let r21 = amplitude_ratio(harmonics, 2)?;
    let p21 = phase_difference(harmonics, 2)?;
    let (r31, p31) = if harmonics.len() >= 3 {
        (
            Some(amplitude_ratio(harmonics, 3)?),
            Some(phase_difference(harmonics, 3)?),
        )
    } else {
        (None, None)
    };

    let frequency_err = h1.frequency_err;
    let period_err = frequency_err / (frequency * frequency);
    let r21_err = ratio_err(harmonics, 2, r21);
    let p21_err = phase_diff_err(harmonics, 2);
    let (r31_err, p31_err) = match (r31, harmonics.len() >= 3) {
        (Some(r), true) => (Some(ratio_err(harmonics, 3, r)), Some(phase_diff_err(harmonics, 3))),
        _ => (None, None),
    };

    Ok((
        FourierParameters {
            frequency,
            period,
            r21,
            p21,
            r31,
            p31,
        },
        FourierParameters {
            frequency: frequency_err,
            period: period_err,
            r21: r21_err,
            p21: p21_err,
            r31: r31_err,
            p31: p31_err,
        },
    ))
}

fn pair<'a>(
    harmonics: &'a [HarmonicFit],
    order: usize,
) -> Result<(&'a HarmonicFit, &'a HarmonicFit), FitError> {
    if order < 2 || order > harmonics.len() {
        return Err(FitError::UndefinedRatio {
            order,
            nfreq: harmonics.len(),
        });
    }
    Ok((&harmonics[0], &harmonics[order - 1]))
}

/// First-order propagation for `R = An/A1`:
/// `σ_R = √((σ_An/A1)² + (An·σ_A1/A1²)²)`.
///
/// The partial-derivative form divides only by the fundamental amplitude
/// (guaranteed nonzero by [`amplitude_ratio`]), so a zero higher-harmonic
/// amplitude still yields a finite uncertainty.
fn ratio_err(harmonics: &[HarmonicFit], order: usize, ratio: f64) -> f64 {
    let h1 = &harmonics[0];
    let hn = &harmonics[order - 1];
    let a1 = h1.amplitude;
    let dn = hn.amplitude_err / a1;
    let d1 = ratio * h1.amplitude_err / a1;
    (dn * dn + d1 * d1).sqrt()
}

/// First-order propagation: `σ_P = √(σ_φn² + (n·σ_φ1)²)`.
fn phase_diff_err(harmonics: &[HarmonicFit], order: usize) -> f64 {
    let h1 = &harmonics[0];
    let hn = &harmonics[order - 1];
    let n = order as f64;
    (hn.phase_err * hn.phase_err + n * n * h1.phase_err * h1.phase_err).sqrt()
}
