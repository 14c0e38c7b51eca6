//! Blank titration model: a constant heat of dilution at every injection.
//!
//! Used for control experiments with no macromolecule in the cell, and for
//! estimating the dilution background shared with a binding experiment.

use crate::model::ParamDecl;
use ndarray::Array1;

pub(super) const PARAMS: [ParamDecl; 1] = [ParamDecl {
    name: "q_dilution",
    guess: 0.0,
    range: (-1.0e3, 1.0e3),
    fixed: None,
}];

pub(super) fn evaluate(x: &Array1<f64>, values: &[f64]) -> Array1<f64> {
    Array1::from_elem(x.len(), values[0])
}
