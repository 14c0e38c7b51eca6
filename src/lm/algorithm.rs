//! Implementation of the Levenberg-Marquardt algorithm.

use ndarray::{Array1, Array2};
use std::fmt;
use std::time::{Duration, Instant};

use crate::error::{FitError, Result};
use crate::problem::Problem;

use super::config::LmConfig;

/// Result of the Levenberg-Marquardt optimization.
#[derive(Debug, Clone)]
pub struct LmResult {
    /// Optimized parameter values
    pub params: Array1<f64>,

    /// Residuals at the solution
    pub residuals: Array1<f64>,

    /// Sum of squared residuals
    pub cost: f64,

    /// Number of iterations performed
    pub iterations: usize,

    /// Number of function evaluations
    pub func_evals: usize,

    /// Whether the optimization converged
    pub success: bool,

    /// Whether the solve was cut short by the deadline
    pub cancelled: bool,

    /// A message describing the result
    pub message: String,
}

impl fmt::Display for LmResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Optimization Result:")?;
        writeln!(f, "  Success: {}", self.success)?;
        writeln!(f, "  Message: {}", self.message)?;
        writeln!(f, "  Cost: {:.6e}", self.cost)?;
        writeln!(f, "  Iterations: {}", self.iterations)?;
        writeln!(f, "  Function evaluations: {}", self.func_evals)?;
        writeln!(f, "  Parameters: {:?}", self.params)?;
        Ok(())
    }
}

/// The Levenberg-Marquardt optimizer.
#[derive(Debug, Clone, Default)]
pub struct LevenbergMarquardt {
    /// Configuration options
    config: LmConfig,
}

impl LevenbergMarquardt {
    /// Create a new Levenberg-Marquardt optimizer with default configuration.
    pub fn new() -> Self {
        Self {
            config: LmConfig::default(),
        }
    }

    /// Create a new Levenberg-Marquardt optimizer with the given configuration.
    pub fn with_config(config: LmConfig) -> Self {
        Self { config }
    }

    /// Set the maximum number of iterations.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }

    /// Set the tolerance for relative change in cost.
    pub fn with_ftol(mut self, ftol: f64) -> Self {
        self.config.ftol = ftol;
        self
    }

    /// Set the tolerance for change in parameter values.
    pub fn with_xtol(mut self, xtol: f64) -> Self {
        self.config.xtol = xtol;
        self
    }

    /// Set the tolerance for gradient norm.
    pub fn with_gtol(mut self, gtol: f64) -> Self {
        self.config.gtol = gtol;
        self
    }

    /// Set the initial value for the damping parameter.
    pub fn with_lambda(mut self, lambda: f64) -> Self {
        self.config.initial_lambda = lambda;
        self
    }

    /// Set the wall-clock budget for the solve.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.config.deadline = Some(deadline);
        self
    }

    /// Minimize the sum of squared residuals for the given problem.
    ///
    /// # Arguments
    ///
    /// * `problem` - The problem to solve
    /// * `initial_params` - Initial guess for the parameter values
    pub fn minimize<P: Problem>(
        &self,
        problem: &P,
        initial_params: Array1<f64>,
    ) -> Result<LmResult> {
        self.minimize_bounded(problem, initial_params, None)
    }

    /// Minimize with per-parameter (min, max) bounds.
    ///
    /// Every candidate step is clamped to the bounds element-wise, so the
    /// problem is never evaluated outside the declared parameter ranges.
    pub fn minimize_bounded<P: Problem>(
        &self,
        problem: &P,
        initial_params: Array1<f64>,
        bounds: Option<&[(f64, f64)]>,
    ) -> Result<LmResult> {
        let n_params = problem.parameter_count();
        if initial_params.len() != n_params {
            return Err(FitError::DimensionMismatch(format!(
                "Expected {} parameters, got {}",
                n_params,
                initial_params.len()
            )));
        }
        if let Some(bounds) = bounds {
            if bounds.len() != n_params {
                return Err(FitError::DimensionMismatch(format!(
                    "Expected {} bounds, got {}",
                    n_params,
                    bounds.len()
                )));
            }
        }

        let started = Instant::now();

        let mut params = initial_params;
        let mut lambda = self.config.initial_lambda;

        let mut residuals = problem.eval(&params)?;
        let mut cost: f64 = residuals.iter().map(|r| r.powi(2)).sum();
        let mut func_evals = 1;
        let mut iterations = 0;

        if n_params == 0 {
            return Ok(LmResult {
                params,
                residuals,
                cost,
                iterations,
                func_evals,
                success: true,
                cancelled: false,
                message: "Nothing to optimize: zero free parameters".to_string(),
            });
        }

        loop {
            if let Some(deadline) = self.config.deadline {
                if started.elapsed() >= deadline {
                    return Ok(LmResult {
                        params,
                        residuals,
                        cost,
                        iterations,
                        func_evals,
                        success: false,
                        cancelled: true,
                        message: format!("Cancelled: deadline of {:?} exceeded", deadline),
                    });
                }
            }

            let jacobian = problem.jacobian(&params)?;
            // Finite differences evaluate the base residuals once plus one
            // perturbed evaluation per parameter.
            func_evals += n_params + 1;

            // Gradient g = J^T r
            let gradient = jacobian.t().dot(&residuals);
            let gradient_norm = gradient.iter().map(|g| g * g).sum::<f64>().sqrt();
            if gradient_norm < self.config.gtol {
                return Ok(LmResult {
                    params,
                    residuals,
                    cost,
                    iterations,
                    func_evals,
                    success: true,
                    cancelled: false,
                    message: format!(
                        "Gradient convergence: ||g|| = {:.2e} < {:.2e}",
                        gradient_norm, self.config.gtol
                    ),
                });
            }

            let jtj = jacobian.t().dot(&jacobian);

            // Adjust lambda until a step is accepted or lambda runs out.
            loop {
                // Marquardt scaling: damp proportionally to the diagonal of
                // J^T J so that parameters of very different magnitudes
                // (association constants vs enthalpies) converge together.
                let mut damped = jtj.clone();
                for i in 0..n_params {
                    let diag = jtj[[i, i]];
                    damped[[i, i]] += lambda * if diag > 0.0 { diag } else { 1.0 };
                }

                // Solve (J^T J + lambda diag(J^T J)) delta = J^T r
                let delta = match solve_cholesky(&damped, &gradient) {
                    Some(delta) => delta,
                    None => solve_lu(&damped, &gradient).ok_or_else(|| {
                        FitError::Solver("Normal equations matrix is singular".to_string())
                    })?,
                };

                let mut new_params = &params - &delta;
                if let Some(bounds) = bounds {
                    for (value, (min, max)) in new_params.iter_mut().zip(bounds.iter()) {
                        *value = value.clamp(*min, *max);
                    }
                }
                let new_residuals = problem.eval(&new_params)?;
                func_evals += 1;
                let new_cost: f64 = new_residuals.iter().map(|r| r.powi(2)).sum();

                if new_cost < cost {
                    // Step accepted
                    let param_change = delta.iter().map(|x| x.abs()).fold(0.0, f64::max);
                    let cost_change = (cost - new_cost) / cost.max(1e-10);

                    params = new_params;
                    residuals = new_residuals;
                    cost = new_cost;
                    lambda = (lambda * self.config.lambda_down_factor).max(self.config.min_lambda);
                    iterations += 1;

                    if param_change < self.config.xtol {
                        return Ok(LmResult {
                            params,
                            residuals,
                            cost,
                            iterations,
                            func_evals,
                            success: true,
                            cancelled: false,
                            message: format!(
                                "Parameter convergence: |dx| = {:.2e} < {:.2e}",
                                param_change, self.config.xtol
                            ),
                        });
                    }
                    // A heavily damped crawl takes tiny accepted steps with
                    // tiny cost changes far from any minimum; only treat a
                    // small relative cost change as convergence once the
                    // damping has relaxed.
                    if cost_change < self.config.ftol && lambda <= self.config.initial_lambda {
                        return Ok(LmResult {
                            params,
                            residuals,
                            cost,
                            iterations,
                            func_evals,
                            success: true,
                            cancelled: false,
                            message: format!(
                                "Cost convergence: |df|/|f| = {:.2e} < {:.2e}",
                                cost_change, self.config.ftol
                            ),
                        });
                    }
                    break;
                }

                // Step rejected - increase lambda and try again
                lambda = (lambda * self.config.lambda_up_factor).min(self.config.max_lambda);
                if lambda >= self.config.max_lambda {
                    return Ok(LmResult {
                        params,
                        residuals,
                        cost,
                        iterations,
                        func_evals,
                        success: false,
                        cancelled: false,
                        message: "Failed to decrease cost, and lambda reached maximum".to_string(),
                    });
                }
            }

            if iterations >= self.config.max_iterations {
                return Ok(LmResult {
                    params,
                    residuals,
                    cost,
                    iterations,
                    func_evals,
                    success: false,
                    cancelled: false,
                    message: format!("Maximum iterations ({}) reached", self.config.max_iterations),
                });
            }
        }
    }
}

/// Solve A x = b for symmetric positive definite A via Cholesky
/// decomposition. Returns None if A is not positive definite.
fn solve_cholesky(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    let mut l = a.clone();

    for k in 0..n {
        for j in 0..k {
            let ljk = l[[k, j]];
            l[[k, k]] -= ljk * ljk;
        }
        if l[[k, k]] <= 0.0 {
            return None;
        }
        let akk_sqrt = l[[k, k]].sqrt();
        l[[k, k]] = akk_sqrt;

        for i in k + 1..n {
            for j in 0..k {
                let v = l[[i, j]] * l[[k, j]];
                l[[i, k]] -= v;
            }
            l[[i, k]] /= akk_sqrt;
        }
    }

    // Forward substitution (L y = b)
    let mut y = b.clone();
    for i in 0..n {
        for j in 0..i {
            let v = l[[i, j]] * y[j];
            y[i] -= v;
        }
        y[i] /= l[[i, i]];
    }

    // Backward substitution (L^T x = y)
    let mut x = Array1::zeros(n);
    for i in (0..n).rev() {
        x[i] = y[i];
        for j in (i + 1)..n {
            let v = l[[j, i]] * x[j];
            x[i] -= v;
        }
        x[i] /= l[[i, i]];
    }

    Some(x)
}

/// Solve A x = b by Gaussian elimination with partial pivoting. Fallback for
/// systems where Cholesky fails numerically. Returns None on a zero pivot.
fn solve_lu(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    let mut m = a.clone();
    let mut rhs = b.clone();

    for k in 0..n {
        // Pivot on the largest entry in column k
        let mut pivot_row = k;
        let mut pivot = m[[k, k]].abs();
        for i in k + 1..n {
            if m[[i, k]].abs() > pivot {
                pivot = m[[i, k]].abs();
                pivot_row = i;
            }
        }
        if pivot < 1e-300 {
            return None;
        }
        if pivot_row != k {
            for j in 0..n {
                let tmp = m[[k, j]];
                m[[k, j]] = m[[pivot_row, j]];
                m[[pivot_row, j]] = tmp;
            }
            rhs.swap(k, pivot_row);
        }

        for i in k + 1..n {
            let factor = m[[i, k]] / m[[k, k]];
            for j in k..n {
                let v = factor * m[[k, j]];
                m[[i, j]] -= v;
            }
            let v = factor * rhs[k];
            rhs[i] -= v;
        }
    }

    let mut x = Array1::zeros(n);
    for i in (0..n).rev() {
        x[i] = rhs[i];
        for j in (i + 1)..n {
            let v = m[[i, j]] * x[j];
            x[i] -= v;
        }
        x[i] /= m[[i, i]];
    }

    Some(x)
}
