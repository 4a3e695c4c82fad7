//! Crate error type.
//!
//! Every component validates its own inputs and fails fast with a specific
//! kind instead of letting NaNs propagate through the pipeline. The binary
//! maps kinds to process exit codes.

/// Errors produced by the fitting pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum FitError {
    /// Out-of-range or mutually inconsistent configuration options.
    InvalidConfiguration(String),
    /// Too few points or zero time span for the requested analysis.
    InsufficientData { n_points: usize, detail: String },
    /// The non-linear solver failed to converge within bounded iterations.
    FitConvergence {
        /// 1-based pre-whitening iteration, 0 if outside the loop.
        iteration: usize,
        /// Target frequency of the failed fit.
        frequency: f64,
        detail: String,
    },
    /// A Fourier ratio was requested for a harmonic order beyond what was fitted.
    UndefinedRatio { order: usize, nfreq: usize },
    /// File ingest/export failure.
    Io(String),
}

impl FitError {
    pub fn exit_code(&self) -> u8 {
        match self {
            FitError::InvalidConfiguration(_) | FitError::Io(_) => 2,
            FitError::InsufficientData { .. } => 3,
            FitError::FitConvergence { .. } => 4,
            FitError::UndefinedRatio { .. } => 5,
        }
    }

    /// Attach pre-whitening iteration context to a solver failure.
    ///
    /// Other kinds pass through unchanged so the original cause survives.
    pub fn at_iteration(self, iteration: usize) -> Self {
        match self {
            FitError::FitConvergence {
                frequency, detail, ..
            } => FitError::FitConvergence {
                iteration,
                frequency,
                detail,
            },
            other => other,
        }
    }
}

impl std::fmt::Display for FitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FitError::InvalidConfiguration(msg) => {
                write!(f, "Invalid configuration: {msg}")
            }
            FitError::InsufficientData { n_points, detail } => {
                write!(f, "Insufficient data (n={n_points}): {detail}")
            }
            FitError::FitConvergence {
                iteration,
                frequency,
                detail,
            } => {
                if *iteration > 0 {
                    write!(
                        f,
                        "Fit failed to converge at iteration {iteration} (f={frequency:.6}): {detail}"
                    )
                } else {
                    write!(f, "Fit failed to converge (f={frequency:.6}): {detail}")
                }
            }
            FitError::UndefinedRatio { order, nfreq } => {
                write!(
                    f,
                    "Fourier ratio for harmonic order {order} is undefined: only {nfreq} harmonics were fitted"
                )
            }
            FitError::Io(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for FitError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_distinguish_kinds() {
        assert_eq!(FitError::InvalidConfiguration("x".into()).exit_code(), 2);
        assert_eq!(
            FitError::InsufficientData {
                n_points: 2,
                detail: "x".into()
            }
            .exit_code(),
            3
        );
        assert_eq!(
            FitError::UndefinedRatio { order: 3, nfreq: 2 }.exit_code(),
            5
        );
    }

    #[test]
    fn at_iteration_only_rewrites_convergence_errors() {
        let e = FitError::FitConvergence {
            iteration: 0,
            frequency: 1.5,
            detail: "lambda blew up".into(),
        }
        .at_iteration(3);
        assert!(matches!(e, FitError::FitConvergence { iteration: 3, .. }));

        let e = FitError::InvalidConfiguration("bad".into()).at_iteration(3);
        assert!(matches!(e, FitError::InvalidConfiguration(_)));
    }
}
