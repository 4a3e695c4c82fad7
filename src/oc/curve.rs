//! O-C (observed minus calculated) curve construction.
//!
//! Given the timed minima and a reference period, each observed time is
//! compared against the linear ephemeris `t0 + k·period`. The cycle count
//! `k` advances by at least one per minimum and is bumped further whenever
//! the residual exceeds 90% of the period, so gaps of whole missed cycles
//! do not wrap the curve.

use serde::{Deserialize, Serialize};

use crate::error::FitError;
use crate::oc::minima::MinimumTime;

/// One point of the O-C curve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcPoint {
    /// Observed time of minimum.
    pub time: f64,
    /// Observed minus calculated, in time units.
    pub oc: f64,
    /// Timing error of the observed minimum.
    pub err: f64,
}

/// Build the O-C curve from timed minima.
///
/// `t0` defaults to the earliest observed minimum. An explicit `t0` later
/// than the first minimum by more than 90% of a period is inconsistent with
/// the cycle-counting scheme and is rejected.
pub fn calculate_oc(
    minima: &[MinimumTime],
    period: f64,
    t0: Option<f64>,
) -> Result<Vec<OcPoint>, FitError> {
    if !period.is_finite() || period <= 0.0 {
        return Err(FitError::InvalidConfiguration(format!(
            "period must be finite and > 0, got {period}"
        )));
    }
    if minima.is_empty() {
        return Err(FitError::InsufficientData {
            n_points: 0,
            detail: "no timed minima to build an O-C curve from".into(),
        });
    }

    let mut sorted: Vec<&MinimumTime> = minima.iter().collect();
    sorted.sort_by(|a, b| {
        a.time
            .partial_cmp(&b.time)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let t0 = t0.unwrap_or(sorted[0].time);

    let mut curve = Vec::with_capacity(sorted.len());
    let mut cycle: u64 = 0;
    for m in sorted {
        let mut oc = (m.time - t0) - cycle as f64 * period;
        while oc > 0.9 * period {
            cycle += 1;
            oc -= period;
        }
        if oc < -0.9 * period {
            return Err(FitError::InvalidConfiguration(format!(
                "epoch t0={t0} is more than a cycle ahead of the minimum at {}",
                m.time
            )));
        }
        cycle += 1;
        curve.push(OcPoint {
            time: m.time,
            oc,
            err: m.err,
        });
    }
    Ok(curve)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minima(times: &[f64]) -> Vec<MinimumTime> {
        times
            .iter()
            .map(|&t| MinimumTime { time: t, err: 0.01 })
            .collect()
    }

    #[test]
    fn linear_period_error_grows_linearly() {
        // True period 1.02 analysed with period 1.00.
        let times: Vec<f64> = (0..10).map(|k| k as f64 * 1.02).collect();
        let curve = calculate_oc(&minima(&times), 1.0, None).unwrap();

        assert_eq!(curve.len(), 10);
        for (k, p) in curve.iter().enumerate() {
            assert!(
                (p.oc - 0.02 * k as f64).abs() < 1e-12,
                "cycle {k}: oc={}",
                p.oc
            );
        }
    }

    #[test]
    fn missed_cycles_advance_the_cycle_count() {
        // The minimum near t = 2 was never observed.
        let curve = calculate_oc(&minima(&[0.0, 1.0, 3.02]), 1.0, None).unwrap();
        assert!((curve[0].oc - 0.0).abs() < 1e-12);
        assert!((curve[1].oc - 0.0).abs() < 1e-12);
        assert!((curve[2].oc - 0.02).abs() < 1e-12);
    }

    #[test]
    fn explicit_epoch_shifts_the_curve() {
        let curve = calculate_oc(&minima(&[5.0, 6.0]), 1.0, Some(4.9)).unwrap();
        assert!((curve[0].oc - 0.1).abs() < 1e-12);
        assert!((curve[1].oc - 0.1).abs() < 1e-12);
    }

    #[test]
    fn epoch_far_ahead_of_the_data_is_rejected() {
        let err = calculate_oc(&minima(&[0.0, 1.0]), 1.0, Some(5.0)).unwrap_err();
        assert!(matches!(err, FitError::InvalidConfiguration(_)));
    }

    #[test]
    fn no_minima_is_insufficient_data() {
        let err = calculate_oc(&[], 1.0, None).unwrap_err();
        assert!(matches!(err, FitError::InsufficientData { .. }));
    }
}
