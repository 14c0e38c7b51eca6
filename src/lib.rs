//! # globalfit-rs
//!
//! `globalfit-rs` fits a shared binding model against an arbitrary number of
//! independent experiments. Any per-experiment fitting parameter can be
//! promoted to a global parameter shared across experiments, fixed to a
//! constant, bounded, or weighted.
//!
//! The library provides:
//! - A [`GlobalFit`] session owning experiments, weights, and the global
//!   parameter alias graph
//! - A deterministic fit-vector layout mapping global and local parameters
//!   onto a flat index space
//! - A Levenberg-Marquardt solver over the [`Problem`] trait
//! - Structured projections of guesses, ranges, fixed values, aliases, and
//!   solved values
//!
//! ## Basic usage
//!
//! ```
//! use globalfit_rs::{Experiment, GlobalFit, Model, ModelKind};
//! use ndarray::Array1;
//!
//! # fn main() -> globalfit_rs::Result<()> {
//! let x = Array1::linspace(1e-7, 2e-5, 20);
//! let heats = x.mapv(|xi| {
//!     let s = 1.0e6 * xi;
//!     -5.0 * s / (1.0 + s)
//! });
//!
//! let mut session = GlobalFit::new();
//! session.add_experiment(Experiment::new(
//!     "expt0",
//!     Model::new(ModelKind::SingleSite),
//!     x,
//!     heats,
//! )?)?;
//! session.update_guess("dh", -1.0, Some("expt0"))?;
//!
//! session.fit()?;
//! let (global, local) = session.fit_param()?;
//! assert!(global.is_empty());
//! assert!(local[0].contains_key("dh"));
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod experiment;
pub mod layout;
pub mod lm;
pub mod model;
pub mod models;
pub mod parameters;
pub mod problem;
pub mod session;

mod residual;
mod utils;

// Re-exports for convenience
pub use error::{FitError, Result};
pub use experiment::Experiment;
pub use layout::FitLayout;
pub use lm::{LevenbergMarquardt, LmConfig, LmResult};
pub use model::Model;
pub use models::ModelKind;
pub use problem::Problem;
pub use session::{ExperimentOptions, FitReport, FitStatus, GlobalFit, PlotData, SessionState};

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
