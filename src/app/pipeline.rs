//! Shared "fit pipeline" logic used by both `fit` and `demo` front-ends.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! periodogram search -> pre-whitening loop -> error estimation -> parameters
//!
//! The CLI handlers then focus on presentation (printing vs exports).

use crate::domain::{FitConfig, FourierSolution, TimeSeries};
use crate::error::FitError;
use crate::fit::FitterSession;
use crate::math::{FrequencyGrid, Periodogram, find_peak};

/// All computed outputs of a single run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub series: TimeSeries,
    pub config: FitConfig,
    /// Full-grid periodogram of the input series (reporting/plotting).
    pub periodogram: Periodogram,
    pub solution: FourierSolution,
}

/// Execute the full fitting pipeline and return the computed outputs.
pub fn run_fit(series: TimeSeries, config: FitConfig) -> Result<RunOutput, FitError> {
    config.validate()?;

    // The session recomputes its own search internally; this copy of the
    // periodogram is retained for the report and plots.
    let grid = FrequencyGrid::for_series(&series, &config)?;
    let periodogram = find_peak(&series, &grid)?;

    let session = FitterSession::new(series.clone(), config.clone())?;
    let solution = session.solve()?;

    Ok(RunOutput {
        series,
        config,
        periodogram,
        solution,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{SampleSpec, generate_sample};

    #[test]
    fn pipeline_recovers_the_synthetic_fundamental() {
        let spec = SampleSpec {
            frequency: 1.8,
            amplitudes: vec![1.0, 0.5],
            phases: vec![0.0, std::f64::consts::FRAC_PI_4],
            noise_sigma: 0.01,
            ..SampleSpec::default()
        };
        let series = generate_sample(&spec).unwrap();
        let config = FitConfig {
            nfreq: 2,
            ..FitConfig::default()
        };

        let run = run_fit(series, config).unwrap();
        assert!((run.solution.parameters.frequency - 1.8).abs() < 0.01);
        assert!((run.solution.parameters.r21 - 0.5).abs() < 0.05);
        assert!(
            (run.solution.parameters.p21 - std::f64::consts::FRAC_PI_4).abs() < 0.1,
            "p21={}",
            run.solution.parameters.p21
        );
    }

    #[test]
    fn invalid_config_fails_before_touching_the_data() {
        let series = generate_sample(&SampleSpec::default()).unwrap();
        let config = FitConfig {
            nfreq: 0,
            ..FitConfig::default()
        };
        let err = run_fit(series, config).unwrap_err();
        assert!(matches!(err, FitError::InvalidConfiguration(_)));
    }
}
