//! Weighted global residual evaluation.

use crate::error::{FitError, Result};
use crate::experiment::Experiment;
use crate::layout::FitLayout;
use crate::parameters::ParameterRegistry;
use crate::problem::Problem;
use ndarray::Array1;
use std::collections::HashMap;

/// Resolve every declared parameter of one experiment's model to a value,
/// in declared order, by indexing the candidate vector through the layout.
///
/// Aliased parameters read the shared global slot; a fixed value (global
/// fixed for an aliased parameter, local fixed otherwise) overrides the
/// vector entry outright.
pub(crate) fn resolve_model_values(
    experiment: &Experiment,
    experiment_id: &str,
    layout: &FitLayout,
    registry: &ParameterRegistry,
    params: &Array1<f64>,
) -> Result<Vec<f64>> {
    let model = experiment.model();
    let mut values = Vec::with_capacity(model.param_names().len());

    for param in model.param_names() {
        let index = layout.index_of(experiment_id, param).ok_or_else(|| {
            FitError::Validation(format!(
                "parameter '{}' of experiment '{}' missing from fit layout",
                param, experiment_id
            ))
        })?;

        let value = match model.param_aliases().get(param) {
            Some(global_name) => registry.get(global_name)?.fixed().unwrap_or(params[index]),
            None => match model.fixed_param().get(param) {
                Some(fixed) => *fixed,
                None => params[index],
            },
        };
        values.push(value);
    }

    Ok(values)
}

/// The residual function for one solve: all experiments, in stable order,
/// resolved through one layout.
pub(crate) struct GlobalResidual<'a> {
    order: &'a [String],
    experiments: &'a HashMap<String, Experiment>,
    weights: &'a HashMap<String, f64>,
    registry: &'a ParameterRegistry,
    layout: &'a FitLayout,
    n_residuals: usize,
}

impl<'a> GlobalResidual<'a> {
    pub(crate) fn new(
        order: &'a [String],
        experiments: &'a HashMap<String, Experiment>,
        weights: &'a HashMap<String, f64>,
        registry: &'a ParameterRegistry,
        layout: &'a FitLayout,
    ) -> Self {
        let n_residuals = order
            .iter()
            .filter_map(|id| experiments.get(id))
            .map(|e| e.len())
            .sum();

        Self {
            order,
            experiments,
            weights,
            registry,
            layout,
            n_residuals,
        }
    }
}

impl Problem for GlobalResidual<'_> {
    fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>> {
        if params.len() != self.layout.len() {
            return Err(FitError::DimensionMismatch(format!(
                "Expected {} parameters, got {}",
                self.layout.len(),
                params.len()
            )));
        }

        let mut all_residuals = Vec::with_capacity(self.n_residuals);

        // Concatenation order must equal the stable experiment order used to
        // build the layout.
        for experiment_id in self.order {
            let experiment = self.experiments.get(experiment_id).ok_or_else(|| {
                FitError::NotFound(format!("experiment '{}' not registered", experiment_id))
            })?;

            let values =
                resolve_model_values(experiment, experiment_id, self.layout, self.registry, params)?;
            let predicted = experiment.predict(&values)?;

            // The weight multiplies the residual before squaring.
            let weight = self.weights.get(experiment_id).copied().unwrap_or(1.0);
            for (observed, predicted) in experiment.heats().iter().zip(predicted.iter()) {
                all_residuals.push(weight * (observed - predicted));
            }
        }

        Ok(Array1::from_vec(all_residuals))
    }

    fn parameter_count(&self) -> usize {
        self.layout.len()
    }

    fn residual_count(&self) -> usize {
        self.n_residuals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Model;
    use crate::models::ModelKind;
    use ndarray::array;

    fn blank_experiment(id: &str, heats: Array1<f64>) -> Experiment {
        let x = Array1::from_elem(heats.len(), 1.0);
        Experiment::new(id, Model::new(ModelKind::Blank), x, heats).unwrap()
    }

    #[test]
    fn test_weight_scales_residual_contribution() {
        let mut experiments = HashMap::new();
        experiments.insert("a".to_string(), blank_experiment("a", array![1.0, 1.0]));
        experiments.insert("b".to_string(), blank_experiment("b", array![1.0, 1.0]));
        let order = vec!["a".to_string(), "b".to_string()];

        let mut weights = HashMap::new();
        weights.insert("a".to_string(), 1.0);
        weights.insert("b".to_string(), 0.5);

        let registry = ParameterRegistry::new();
        let layout = FitLayout::build(&registry, &order, &experiments).unwrap();
        let residual = GlobalResidual::new(&order, &experiments, &weights, &registry, &layout);

        // Both models predict q_dilution = 0, so raw residuals are all 1.0.
        let r = residual.eval(&array![0.0, 0.0]).unwrap();
        assert_eq!(r.len(), 4);
        assert_eq!(r[0], 1.0);
        assert_eq!(r[1], 1.0);
        assert_eq!(r[2], 0.5);
        assert_eq!(r[3], 0.5);
    }

    #[test]
    fn test_fixed_parameter_overrides_vector_entry() {
        let mut experiment = blank_experiment("a", array![2.0, 2.0]);
        experiment.model_mut().fix("q_dilution", 2.0).unwrap();

        let mut experiments = HashMap::new();
        experiments.insert("a".to_string(), experiment);
        let order = vec!["a".to_string()];
        let weights = HashMap::new();
        let registry = ParameterRegistry::new();
        let layout = FitLayout::build(&registry, &order, &experiments).unwrap();
        let residual = GlobalResidual::new(&order, &experiments, &weights, &registry, &layout);

        // Whatever the candidate vector carries, the fixed value wins.
        let r = residual.eval(&array![-100.0]).unwrap();
        for v in r.iter() {
            assert_eq!(*v, 0.0);
        }
    }

    #[test]
    fn test_dimension_mismatch_is_rejected() {
        let mut experiments = HashMap::new();
        experiments.insert("a".to_string(), blank_experiment("a", array![1.0]));
        let order = vec!["a".to_string()];
        let weights = HashMap::new();
        let registry = ParameterRegistry::new();
        let layout = FitLayout::build(&registry, &order, &experiments).unwrap();
        let residual = GlobalResidual::new(&order, &experiments, &weights, &registry, &layout);

        let err = residual.eval(&array![0.0, 0.0]);
        assert!(matches!(err, Err(FitError::DimensionMismatch(_))));
    }
}
