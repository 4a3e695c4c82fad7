//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the math/fitting code stays clean and testable
//! - output changes are localized (important for future snapshot tests)

use crate::domain::{FitConfig, FourierSolution};
use crate::math::{Periodogram, false_alarm_probability};
use crate::oc::{MinimumTime, OcConfig, OcPoint};

/// Format the full run summary: dataset, periodogram, harmonic table, and
/// the derived Fourier parameters with uncertainties.
pub fn format_run_summary(
    n_points: usize,
    config: &FitConfig,
    periodogram: &Periodogram,
    solution: &FourierSolution,
) -> String {
    let mut out = String::new();

    out.push_str("=== lcf - Fourier Light-Curve Fit ===\n");
    out.push_str(&format!(
        "Points: n={n_points} | harmonics: {} | model: {:?}\n",
        config.nfreq, config.kind
    ));
    let fap = false_alarm_probability(
        periodogram.peak_power,
        n_points,
        periodogram.frequencies.len(),
    );
    out.push_str(&format!(
        "Periodogram: {} frequencies | peak f={:.6} (power {:.2}, FAP {:.2e})\n",
        periodogram.frequencies.len(),
        periodogram.peak_frequency,
        periodogram.peak_power,
        fap
    ));
    if config.bootstrap {
        out.push_str(&format!(
            "Errors: bootstrap (ntry={}, sample_size={:.2}{})\n",
            config.ntry,
            config.sample_size,
            if config.parallel { ", parallel" } else { "" }
        ));
    } else {
        out.push_str("Errors: analytic (fit covariance)\n");
    }

    out.push_str("\nHarmonics:\n");
    out.push_str("  n        freq     amp ± err          phase ± err\n");
    for h in &solution.harmonics {
        out.push_str(&format!(
            "  {} {:>11.6} {:>9.5} ± {:<9.5} {:>8.5} ± {:<8.5}\n",
            h.order, h.frequency, h.amplitude, h.amplitude_err, h.phase, h.phase_err
        ));
    }

    let p = &solution.parameters;
    let e = &solution.errors;
    out.push_str("\nFourier parameters:\n");
    out.push_str(&format!(
        "- frequency: {:.6} ± {:.6}\n- period:    {:.6} ± {:.6}\n",
        p.frequency, e.frequency, p.period, e.period
    ));
    out.push_str(&format!(
        "- R21: {:.4} ± {:.4}\n- P21: {:.4} ± {:.4}\n",
        p.r21, e.r21, p.p21, e.p21
    ));
    match (p.r31, p.p31, e.r31, e.p31) {
        (Some(r31), Some(p31), Some(r31e), Some(p31e)) => {
            out.push_str(&format!(
                "- R31: {r31:.4} ± {r31e:.4}\n- P31: {p31:.4} ± {p31e:.4}\n"
            ));
        }
        _ => out.push_str("- R31/P31: not available (nfreq < 3)\n"),
    }

    out
}

/// Format the O-C run summary: minima table and curve statistics.
pub fn format_oc_summary(
    n_points: usize,
    config: &OcConfig,
    minima: &[MinimumTime],
    curve: &[OcPoint],
) -> String {
    let mut out = String::new();

    out.push_str("=== lcf - O-C Analysis ===\n");
    out.push_str(&format!(
        "Points: n={n_points} | period: {:.6} | window: ±{:.3} P | poly order: {}\n",
        config.period, config.phase_interval, config.order
    ));
    let with_errors = minima.iter().any(|m| m.err > 0.0);
    if with_errors {
        out.push_str(&format!(
            "Timing errors: resampling (samplings={}{})\n",
            config.samplings,
            if config.parallel { ", parallel" } else { "" }
        ));
    } else {
        out.push_str("Timing errors: none (series carries no uncertainties)\n");
    }

    out.push_str(&format!("\nMinima ({}):\n", minima.len()));
    out.push_str("        time ± err              O-C\n");
    for p in curve {
        out.push_str(&format!(
            "  {:>14.6} ± {:<10.6} {:>10.6}\n",
            p.time, p.err, p.oc
        ));
    }

    let (mut oc_min, mut oc_max) = (f64::INFINITY, f64::NEG_INFINITY);
    for p in curve {
        oc_min = oc_min.min(p.oc);
        oc_max = oc_max.max(p.oc);
    }
    out.push_str(&format!(
        "\nO-C range: [{oc_min:.6}, {oc_max:.6}] over {} cycles\n",
        curve.len()
    ));

    out
}
