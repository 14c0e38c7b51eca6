//! Per-experiment binding-model capability.
//!
//! A [`Model`] pairs a closed [`ModelKind`] with the mutable local parameter
//! state of one experiment: guesses, ranges, fixed values, and the local
//! alias map pointing parameters at global names. The engine never inspects
//! the model equation itself; it only resolves parameter values and asks the
//! kind for a prediction.

use crate::error::{FitError, Result};
use crate::models::ModelKind;
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A declared model parameter with its default guess, range, and optional
/// default fixed value.
#[derive(Debug, Clone, Copy)]
pub struct ParamDecl {
    pub name: &'static str,
    pub guess: f64,
    pub range: (f64, f64),
    pub fixed: Option<f64>,
}

/// A binding model instance: kind plus local parameter state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Model {
    kind: ModelKind,

    /// Parameter names in declared order. The fit-vector layout and all
    /// projections iterate parameters in this order.
    param_names: Vec<String>,

    param_guesses: HashMap<String, f64>,
    param_ranges: HashMap<String, (f64, f64)>,
    fixed_param: HashMap<String, f64>,

    /// Local parameter name -> global parameter name. Must stay in sync with
    /// the registry-side alias edges at all times.
    param_aliases: HashMap<String, String>,
}

impl Model {
    /// Create a model of the given kind, seeded with the kind's declared
    /// defaults.
    pub fn new(kind: ModelKind) -> Self {
        let decls = kind.param_decls();

        let mut param_names = Vec::with_capacity(decls.len());
        let mut param_guesses = HashMap::with_capacity(decls.len());
        let mut param_ranges = HashMap::with_capacity(decls.len());
        let mut fixed_param = HashMap::new();

        for decl in decls {
            param_names.push(decl.name.to_string());
            param_guesses.insert(decl.name.to_string(), decl.guess);
            param_ranges.insert(decl.name.to_string(), decl.range);
            if let Some(value) = decl.fixed {
                fixed_param.insert(decl.name.to_string(), value);
            }
        }

        Self {
            kind,
            param_names,
            param_guesses,
            param_ranges,
            fixed_param,
            param_aliases: HashMap::new(),
        }
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    /// Parameter names in declared order.
    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    /// Whether this model declares the named parameter.
    pub fn declares(&self, name: &str) -> bool {
        self.param_names.iter().any(|p| p == name)
    }

    fn check_declared(&self, name: &str) -> Result<()> {
        if self.declares(name) {
            Ok(())
        } else {
            Err(FitError::Validation(format!(
                "parameter '{}' not declared by {} model",
                name,
                self.kind.name()
            )))
        }
    }

    pub fn param_guesses(&self) -> &HashMap<String, f64> {
        &self.param_guesses
    }

    pub fn param_guess(&self, name: &str) -> Result<f64> {
        self.check_declared(name)?;
        Ok(self.param_guesses[name])
    }

    pub fn update_guess(&mut self, name: &str, value: f64) -> Result<()> {
        self.check_declared(name)?;
        self.param_guesses.insert(name.to_string(), value);
        Ok(())
    }

    pub fn update_guesses(&mut self, guesses: &HashMap<String, f64>) -> Result<()> {
        for (name, value) in guesses {
            self.update_guess(name, *value)?;
        }
        Ok(())
    }

    pub fn param_ranges(&self) -> &HashMap<String, (f64, f64)> {
        &self.param_ranges
    }

    pub fn param_range(&self, name: &str) -> Result<(f64, f64)> {
        self.check_declared(name)?;
        Ok(self.param_ranges[name])
    }

    pub fn update_range(&mut self, name: &str, min: f64, max: f64) -> Result<()> {
        self.check_declared(name)?;
        if min > max {
            return Err(FitError::Validation(format!(
                "invalid range for '{}': min {} > max {}",
                name, min, max
            )));
        }
        self.param_ranges.insert(name.to_string(), (min, max));
        Ok(())
    }

    /// Currently fixed parameters and their fixed values.
    pub fn fixed_param(&self) -> &HashMap<String, f64> {
        &self.fixed_param
    }

    pub fn fix(&mut self, name: &str, value: f64) -> Result<()> {
        self.check_declared(name)?;
        self.fixed_param.insert(name.to_string(), value);
        Ok(())
    }

    /// Release a fixed parameter. Releasing a parameter that is not fixed is
    /// a no-op.
    pub fn unfix(&mut self, name: &str) -> Result<()> {
        self.check_declared(name)?;
        self.fixed_param.remove(name);
        Ok(())
    }

    pub fn update_fixed(&mut self, fixed: &HashMap<String, f64>) -> Result<()> {
        for (name, value) in fixed {
            self.fix(name, *value)?;
        }
        Ok(())
    }

    /// Local parameter name -> global parameter name, for currently aliased
    /// parameters only.
    pub fn param_aliases(&self) -> &HashMap<String, String> {
        &self.param_aliases
    }

    /// Point a local parameter at a global name, or clear it back to local
    /// with `None`.
    pub fn set_alias(&mut self, name: &str, global_name: Option<&str>) -> Result<()> {
        self.check_declared(name)?;
        match global_name {
            Some(global_name) => {
                self.param_aliases
                    .insert(name.to_string(), global_name.to_string());
            }
            None => {
                self.param_aliases.remove(name);
            }
        }
        Ok(())
    }

    /// Apply a batch of alias updates. `None` clears an entry back to local.
    ///
    /// Callers inside a fit session should prefer the session's link/unlink
    /// operations, which keep the registry-side edges in sync.
    pub fn update_aliases(&mut self, aliases: &HashMap<String, Option<String>>) -> Result<()> {
        for (name, global_name) in aliases {
            self.set_alias(name, global_name.as_deref())?;
        }
        Ok(())
    }

    /// Predict the response at each x point for resolved parameter values
    /// given in declared order.
    pub fn predict(&self, x: &Array1<f64>, values: &[f64]) -> Result<Array1<f64>> {
        if values.len() != self.param_names.len() {
            return Err(FitError::DimensionMismatch(format!(
                "{} model expects {} parameter values, got {}",
                self.kind.name(),
                self.param_names.len(),
                values.len()
            )));
        }
        Ok(self.kind.evaluate(x, values))
    }
}
