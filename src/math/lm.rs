//! Levenberg-Marquardt solver for small non-linear least-squares problems.
//!
//! Damped normal equations with multiplicative lambda control:
//!
//! ```text
//! (JᵀWJ + λ·diag(JᵀWJ)) δ = JᵀW r
//! ```
//!
//! accept the step when the weighted chi-square decreases, otherwise raise
//! lambda and retry. Parameter counts here are tiny (3-4), so dense nalgebra
//! solves are cheap; Cholesky first, LU as fallback for marginal conditioning.

use nalgebra::{DMatrix, DVector};

/// A model fittable by [`optimize`].
pub trait LmModel {
    fn param_len(&self) -> usize;

    /// Evaluate the model at `t`.
    fn evaluate(&self, t: f64, params: &[f64]) -> f64;

    /// Partial derivatives at `t`; `out` has length `param_len()`.
    fn jacobian_row(&self, t: f64, params: &[f64], out: &mut [f64]);

    /// Apply parameter constraints after an update.
    fn constrain(&self, _params: &mut [f64]) {}
}

/// Solver tuning knobs.
#[derive(Debug, Clone)]
pub struct LmOptions {
    pub max_iterations: usize,
    /// Convergence threshold on the largest parameter step.
    pub convergence_threshold: f64,
    pub initial_lambda: f64,
    pub lambda_up: f64,
    pub lambda_down: f64,
}

impl Default for LmOptions {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            convergence_threshold: 1e-10,
            initial_lambda: 1e-3,
            lambda_up: 10.0,
            lambda_down: 0.1,
        }
    }
}

/// Outcome of an optimization run.
#[derive(Debug, Clone)]
pub struct LmOutcome {
    pub params: Vec<f64>,
    /// Parameter covariance scaled by the reduced chi-square, or `None` when
    /// the normal matrix could not be inverted.
    pub covariance: Option<DMatrix<f64>>,
    /// Weighted chi-square at the final parameters.
    pub chi2: f64,
    pub iterations: usize,
    pub converged: bool,
}

impl LmOutcome {
    /// Standard error of parameter `i` (square root of the covariance diagonal).
    pub fn std_err(&self, i: usize) -> Option<f64> {
        let cov = self.covariance.as_ref()?;
        let v = cov[(i, i)];
        if v.is_finite() && v >= 0.0 {
            Some(v.sqrt())
        } else {
            None
        }
    }
}

/// Run L-M optimization over weighted observations.
///
/// `weights` are inverse-variance weights (uniform when no uncertainties are
/// available). Convergence is judged on the largest parameter step of an
/// accepted iteration.
pub fn optimize(
    model: &impl LmModel,
    times: &[f64],
    values: &[f64],
    weights: &[f64],
    initial: Vec<f64>,
    opts: &LmOptions,
) -> LmOutcome {
    let p = model.param_len();
    let n = times.len();
    debug_assert_eq!(initial.len(), p);

    let mut params = initial;
    model.constrain(&mut params);
    let mut lambda = opts.initial_lambda;
    let mut chi2 = weighted_chi2(model, times, values, weights, &params);
    let mut converged = false;
    let mut iterations = 0;

    let mut row = vec![0.0; p];

    for iter in 0..opts.max_iterations {
        iterations = iter + 1;

        let (hessian, gradient) =
            normal_equations(model, times, values, weights, &params, &mut row);

        let mut damped = hessian.clone();
        for i in 0..p {
            damped[(i, i)] *= 1.0 + lambda;
        }

        let Some(delta) = solve_spd(&damped, &gradient) else {
            break;
        };

        let mut trial = params.clone();
        for (v, d) in trial.iter_mut().zip(delta.iter()) {
            *v += d;
        }
        model.constrain(&mut trial);

        let trial_chi2 = weighted_chi2(model, times, values, weights, &trial);

        if trial_chi2.is_finite() && trial_chi2 < chi2 {
            params = trial;
            chi2 = trial_chi2;
            lambda *= opts.lambda_down;

            let max_step = delta.iter().fold(0.0f64, |a, d| a.max(d.abs()));
            if max_step < opts.convergence_threshold {
                converged = true;
                break;
            }
        } else {
            lambda *= opts.lambda_up;
            if lambda > 1e12 {
                break;
            }
        }
    }

    // Covariance from the undamped normal matrix, scaled by reduced chi-square
    // so uniform-weight fits still yield data-driven errors.
    let (hessian, _) = normal_equations(model, times, values, weights, &params, &mut row);
    let covariance = hessian.try_inverse().map(|inv| {
        let dof = n.saturating_sub(p).max(1) as f64;
        inv * (chi2 / dof)
    });

    LmOutcome {
        params,
        covariance,
        chi2,
        iterations,
        converged,
    }
}

fn normal_equations(
    model: &impl LmModel,
    times: &[f64],
    values: &[f64],
    weights: &[f64],
    params: &[f64],
    row: &mut [f64],
) -> (DMatrix<f64>, DVector<f64>) {
    let p = row.len();
    let mut hessian = DMatrix::<f64>::zeros(p, p);
    let mut gradient = DVector::<f64>::zeros(p);

    for ((&t, &y), &w) in times.iter().zip(values.iter()).zip(weights.iter()) {
        let r = y - model.evaluate(t, params);
        model.jacobian_row(t, params, row);
        for i in 0..p {
            gradient[i] += w * row[i] * r;
            for j in i..p {
                hessian[(i, j)] += w * row[i] * row[j];
            }
        }
    }
    // Mirror the upper triangle.
    for i in 1..p {
        for j in 0..i {
            hessian[(i, j)] = hessian[(j, i)];
        }
    }
    (hessian, gradient)
}

fn weighted_chi2(
    model: &impl LmModel,
    times: &[f64],
    values: &[f64],
    weights: &[f64],
    params: &[f64],
) -> f64 {
    times
        .iter()
        .zip(values.iter())
        .zip(weights.iter())
        .map(|((&t, &y), &w)| {
            let r = y - model.evaluate(t, params);
            w * r * r
        })
        .sum()
}

/// Solve a symmetric positive-definite system, LU fallback for marginal cases.
fn solve_spd(a: &DMatrix<f64>, b: &DVector<f64>) -> Option<DVector<f64>> {
    if let Some(chol) = a.clone().cholesky() {
        let x = chol.solve(b);
        if x.iter().all(|v| v.is_finite()) {
            return Some(x);
        }
    }
    let x = a.clone().lu().solve(b)?;
    if x.iter().all(|v| v.is_finite()) {
        Some(x)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// y = a * exp(-b t), a simple non-linear test model.
    struct ExpDecay;

    impl LmModel for ExpDecay {
        fn param_len(&self) -> usize {
            2
        }

        fn evaluate(&self, t: f64, params: &[f64]) -> f64 {
            params[0] * (-params[1] * t).exp()
        }

        fn jacobian_row(&self, t: f64, params: &[f64], out: &mut [f64]) {
            let e = (-params[1] * t).exp();
            out[0] = e;
            out[1] = -params[0] * t * e;
        }
    }

    #[test]
    fn recovers_exponential_decay_parameters() {
        let times: Vec<f64> = (0..50).map(|i| i as f64 * 0.1).collect();
        let values: Vec<f64> = times.iter().map(|&t| 3.0 * (-0.7 * t).exp()).collect();
        let weights = vec![1.0; times.len()];

        let out = optimize(
            &ExpDecay,
            &times,
            &values,
            &weights,
            vec![1.0, 0.1],
            &LmOptions::default(),
        );
        assert!(out.converged, "did not converge in {} iters", out.iterations);
        assert!((out.params[0] - 3.0).abs() < 1e-6);
        assert!((out.params[1] - 0.7).abs() < 1e-6);
        // Noise-free data: errors should be tiny.
        assert!(out.std_err(0).unwrap() < 1e-5);
    }

    #[test]
    fn covariance_scales_with_noise() {
        let times: Vec<f64> = (0..100).map(|i| i as f64 * 0.05).collect();
        // Deterministic pseudo-noise keeps this test reproducible.
        let values: Vec<f64> = times
            .iter()
            .enumerate()
            .map(|(i, &t)| 2.0 * (-0.5 * t).exp() + 0.05 * ((i * 37 % 17) as f64 / 17.0 - 0.5))
            .collect();
        let weights = vec![1.0; times.len()];

        let out = optimize(
            &ExpDecay,
            &times,
            &values,
            &weights,
            vec![1.0, 0.1],
            &LmOptions::default(),
        );
        assert!(out.converged);
        let err = out.std_err(0).unwrap();
        assert!(err > 1e-4, "noisy fit should report non-trivial error, got {err}");
    }
}
