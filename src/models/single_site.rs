//! Single-site binding isotherm.
//!
//! Predicts the heat signal of a titration in which the ligand binds a
//! single class of independent sites. The per-point response follows a
//! Langmuir saturation curve scaled by the binding enthalpy and the
//! fraction of competent macromolecule.

use crate::model::ParamDecl;
use ndarray::Array1;

/// Declared parameters in declared order: association constant, binding
/// enthalpy, and fraction of competent macromolecule. `fx_competent` is
/// fixed at 1.0 by default; callers unfix it for titrations with inactive
/// material.
pub(super) const PARAMS: [ParamDecl; 3] = [
    ParamDecl {
        name: "ka",
        guess: 1.0e6,
        range: (1.0, 1.0e12),
        fixed: None,
    },
    ParamDecl {
        name: "dh",
        guess: -1000.0,
        range: (-1.0e5, 1.0e5),
        fixed: None,
    },
    ParamDecl {
        name: "fx_competent",
        guess: 1.0,
        range: (0.0, 2.0),
        fixed: Some(1.0),
    },
];

pub(super) fn evaluate(x: &Array1<f64>, values: &[f64]) -> Array1<f64> {
    let ka = values[0];
    let dh = values[1];
    let fx_competent = values[2];

    x.mapv(|xi| {
        let saturation = ka * xi;
        fx_competent * dh * saturation / (1.0 + saturation)
    })
}
