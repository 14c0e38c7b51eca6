//! Levenberg-Marquardt algorithm implementation.
//!
//! Iterative nonlinear least-squares over the [`Problem`] trait: damped
//! normal equations solved by Cholesky decomposition with an LU fallback,
//! and convergence on gradient norm, parameter change, or relative cost
//! change. An optional deadline turns an ill-conditioned solve into a
//! cancelled result instead of an indefinite block.
//!
//! [`Problem`]: crate::problem::Problem

pub mod algorithm;
pub mod config;

pub use algorithm::{LevenbergMarquardt, LmResult};
pub use config::LmConfig;
