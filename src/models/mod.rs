//! Concrete binding-model kinds.
//!
//! The engine treats the mathematical form of a binding model as opaque: a
//! kind only has to declare its parameters and predict a response for
//! resolved parameter values. New kinds are added by extending the
//! [`ModelKind`] enum rather than by dynamic registration.

mod blank;
mod single_site;

use crate::model::ParamDecl;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// The closed set of binding-model kinds known to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelKind {
    /// Single-site binding isotherm.
    SingleSite,

    /// Blank titration: constant heat of dilution at every injection.
    Blank,
}

impl ModelKind {
    /// Short identifier for display purposes.
    pub fn name(&self) -> &'static str {
        match self {
            ModelKind::SingleSite => "single_site",
            ModelKind::Blank => "blank",
        }
    }

    /// The parameters this kind declares, in declared order, with their
    /// default guess, range, and optional default fixed value.
    pub fn param_decls(&self) -> &'static [ParamDecl] {
        match self {
            ModelKind::SingleSite => &single_site::PARAMS,
            ModelKind::Blank => &blank::PARAMS,
        }
    }

    /// Predict the response at each x point for resolved parameter values
    /// given in declared order. Callers are responsible for passing exactly
    /// one value per declared parameter.
    pub(crate) fn evaluate(&self, x: &Array1<f64>, values: &[f64]) -> Array1<f64> {
        match self {
            ModelKind::SingleSite => single_site::evaluate(x, values),
            ModelKind::Blank => blank::evaluate(x, values),
        }
    }
}
