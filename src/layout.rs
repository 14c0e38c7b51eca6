//! Deterministic fit-vector layout.
//!
//! The layout maps {global parameters} ∪ {unaliased local parameters} onto a
//! flat index space and carries the matching initial guess vector. It is a
//! pure function of the current session state and is rebuilt before every
//! fit; it is never mutated incrementally.

use crate::error::{FitError, Result};
use crate::experiment::Experiment;
use crate::parameters::ParameterRegistry;
use ndarray::Array1;
use std::collections::HashMap;

/// Index map plus initial guess vector for one solve.
///
/// Globals occupy the lowest indices in creation order; unaliased local
/// parameters follow in experiment-insertion order, then model-declared
/// parameter order. Aliased local pairs resolve to the shared global index
/// without contributing a vector entry of their own.
#[derive(Debug, Clone, PartialEq)]
pub struct FitLayout {
    global_index: HashMap<String, usize>,
    local_index: HashMap<(String, String), usize>,
    guesses: Array1<f64>,
    bounds: Vec<(f64, f64)>,
}

impl FitLayout {
    pub(crate) fn empty() -> Self {
        Self {
            global_index: HashMap::new(),
            local_index: HashMap::new(),
            guesses: Array1::zeros(0),
            bounds: Vec::new(),
        }
    }

    /// Single-pass build over the registry and the stable experiment order.
    pub(crate) fn build(
        registry: &ParameterRegistry,
        order: &[String],
        experiments: &HashMap<String, Experiment>,
    ) -> Result<Self> {
        let mut global_index = HashMap::new();
        let mut local_index = HashMap::new();
        let mut guesses = Vec::new();
        let mut bounds = Vec::new();

        for param in registry.iter() {
            global_index.insert(param.name().to_string(), guesses.len());
            guesses.push(param.guess());
            bounds.push(param.range());
        }

        for experiment_id in order {
            let experiment = experiments.get(experiment_id).ok_or_else(|| {
                FitError::NotFound(format!("experiment '{}' not registered", experiment_id))
            })?;
            let model = experiment.model();

            for param in model.param_names() {
                let key = (experiment_id.clone(), param.clone());
                match model.param_aliases().get(param) {
                    None => {
                        local_index.insert(key, guesses.len());
                        guesses.push(model.param_guess(param)?);
                        bounds.push(model.param_range(param)?);
                    }
                    Some(global_name) => {
                        let index = global_index.get(global_name).ok_or_else(|| {
                            FitError::Validation(format!(
                                "parameter '{}' of experiment '{}' aliases unknown global '{}'",
                                param, experiment_id, global_name
                            ))
                        })?;
                        local_index.insert(key, *index);
                    }
                }
            }
        }

        Ok(Self {
            global_index,
            local_index,
            guesses: Array1::from_vec(guesses),
            bounds,
        })
    }

    /// Number of free entries in the fit vector.
    pub fn len(&self) -> usize {
        self.guesses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guesses.is_empty()
    }

    /// Initial guess vector, index-aligned with the map.
    pub fn guesses(&self) -> &Array1<f64> {
        &self.guesses
    }

    /// Per-index (min, max) bounds: the global range for a global slot, the
    /// local range otherwise. Index-aligned with the guess vector.
    pub fn bounds(&self) -> &[(f64, f64)] {
        &self.bounds
    }

    pub fn global_index(&self, name: &str) -> Option<usize> {
        self.global_index.get(name).copied()
    }

    /// Index for an (experiment, parameter) pair. Aliased pairs yield the
    /// shared global index.
    pub fn index_of(&self, experiment_id: &str, param: &str) -> Option<usize> {
        self.local_index
            .get(&(experiment_id.to_string(), param.to_string()))
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Model;
    use crate::models::ModelKind;
    use crate::parameters::AliasEdge;
    use ndarray::array;

    fn experiment(id: &str) -> Experiment {
        Experiment::new(
            id,
            Model::new(ModelKind::SingleSite),
            array![1.0e-6, 2.0e-6],
            array![-1.0, -2.0],
        )
        .unwrap()
    }

    #[test]
    fn test_globals_come_first_then_locals_in_stable_order() {
        let mut registry = ParameterRegistry::new();
        registry.link(
            "global_dh",
            AliasEdge::new("b", "dh"),
            -5.0,
            (-100.0, 100.0),
            None,
        );

        let mut experiments = HashMap::new();
        let mut b = experiment("b");
        b.model_mut().set_alias("dh", Some("global_dh")).unwrap();
        experiments.insert("a".to_string(), experiment("a"));
        experiments.insert("b".to_string(), b);
        let order = vec!["a".to_string(), "b".to_string()];

        let layout = FitLayout::build(&registry, &order, &experiments).unwrap();

        // 1 global + 3 locals for "a" + 2 unaliased locals for "b".
        assert_eq!(layout.len(), 6);
        assert_eq!(layout.global_index("global_dh"), Some(0));
        assert_eq!(layout.index_of("a", "ka"), Some(1));
        assert_eq!(layout.index_of("a", "dh"), Some(2));
        assert_eq!(layout.index_of("a", "fx_competent"), Some(3));
        assert_eq!(layout.index_of("b", "ka"), Some(4));
        // Aliased pair resolves to the global slot.
        assert_eq!(layout.index_of("b", "dh"), Some(0));
        assert_eq!(layout.index_of("b", "fx_competent"), Some(5));
        assert_eq!(layout.guesses()[0], -5.0);

        // Bounds are index-aligned: the global's seeded range first, then
        // the declared local ranges.
        assert_eq!(layout.bounds().len(), layout.len());
        assert_eq!(layout.bounds()[0], (-100.0, 100.0));
        assert_eq!(layout.bounds()[1], (1.0, 1.0e12));
        assert_eq!(layout.bounds()[3], (0.0, 2.0));
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let mut experiments = HashMap::new();
        experiments.insert("a".to_string(), experiment("a"));
        let order = vec!["a".to_string()];
        let registry = ParameterRegistry::new();

        let first = FitLayout::build(&registry, &order, &experiments).unwrap();
        let second = FitLayout::build(&registry, &order, &experiments).unwrap();
        assert_eq!(first, second);
    }
}
