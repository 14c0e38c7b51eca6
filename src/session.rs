//! The global fit session.
//!
//! [`GlobalFit`] owns the experiments, their weights and stable insertion
//! order, and the global parameter registry. All linking and unlinking goes
//! through the session so the registry-side alias edges and the
//! experiment-side alias maps can never diverge.
//!
//! The session is an explicit object constructed by the caller; there is no
//! process-wide fitter state. It is single-threaded by contract: clone the
//! session for multi-session use rather than sharing it.

use crate::error::{FitError, Result};
use crate::experiment::Experiment;
use crate::layout::FitLayout;
use crate::lm::{LevenbergMarquardt, LmConfig};
use crate::parameters::{AliasEdge, ParameterRegistry};
use crate::residual::{resolve_model_values, GlobalResidual};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Lifecycle of a fit session.
///
/// Structural mutations (add/remove experiment, link/unlink, remove_global)
/// move the session back to `Configured` and drop any stored solution, so a
/// stale solved vector can never be read against a changed registry. Weight
/// and fixed-value changes invalidate the same way: a weight changes the
/// objective, and fixing rewrites what the projections report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// No experiments or aliases registered yet.
    Empty,

    /// Registered but not (or no longer) solved.
    Configured,

    /// A successful solve has occurred since the last structural mutation.
    Fitted,
}

/// Optional per-experiment overrides applied at registration time.
#[derive(Debug, Clone)]
pub struct ExperimentOptions {
    /// Local guess overrides, keyed by parameter name.
    pub param_guesses: HashMap<String, f64>,

    /// Parameters to fix, keyed by parameter name.
    pub fixed_param: HashMap<String, f64>,

    /// Local parameter name -> global parameter name links to establish.
    pub param_aliases: HashMap<String, String>,

    /// Weight applied to this experiment's residuals. Values below 1.0
    /// de-emphasize the experiment relative to the others.
    pub weight: f64,
}

impl Default for ExperimentOptions {
    fn default() -> Self {
        Self {
            param_guesses: HashMap::new(),
            fixed_param: HashMap::new(),
            param_aliases: HashMap::new(),
            weight: 1.0,
        }
    }
}

/// How a fit ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FitStatus {
    /// The solver converged; results are readable.
    Converged,

    /// The deadline expired; `params` holds the best-found vector and the
    /// session keeps its previous state.
    Cancelled,
}

/// Summary of one solve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitReport {
    pub status: FitStatus,
    pub cost: f64,
    pub iterations: usize,
    pub func_evals: usize,
    pub message: String,

    /// The flat solved (or best-found, if cancelled) vector.
    pub params: Vec<f64>,
}

/// Per-experiment data for external plotting.
#[derive(Debug, Clone)]
pub struct PlotData {
    pub experiment_id: String,
    pub x: Array1<f64>,
    pub observed: Array1<f64>,
    pub predicted: Array1<f64>,
}

#[derive(Debug, Clone)]
struct Solution {
    layout: FitLayout,
    values: Array1<f64>,
}

/// A global fit of binding models against an arbitrary number of
/// experiments, with local parameters promotable to shared globals.
#[derive(Debug, Clone, Default)]
pub struct GlobalFit {
    experiments: HashMap<String, Experiment>,
    weights: HashMap<String, f64>,

    /// Experiment ids in insertion order, independent of map iteration.
    order: Vec<String>,

    registry: ParameterRegistry,

    state: SessionState,
    solution: Option<Solution>,
}

impl Default for SessionState {
    fn default() -> Self {
        SessionState::Empty
    }
}

impl GlobalFit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Experiments in stable insertion order.
    pub fn experiments(&self) -> impl Iterator<Item = &Experiment> {
        self.order.iter().filter_map(|id| self.experiments.get(id))
    }

    pub fn experiment(&self, experiment_id: &str) -> Result<&Experiment> {
        self.experiments.get(experiment_id).ok_or_else(|| {
            FitError::NotFound(format!("experiment '{}' not registered", experiment_id))
        })
    }

    fn experiment_mut(&mut self, experiment_id: &str) -> Result<&mut Experiment> {
        self.experiments.get_mut(experiment_id).ok_or_else(|| {
            FitError::NotFound(format!("experiment '{}' not registered", experiment_id))
        })
    }

    pub fn weight(&self, experiment_id: &str) -> Result<f64> {
        self.experiment(experiment_id)?;
        Ok(self.weights.get(experiment_id).copied().unwrap_or(1.0))
    }

    /// A structural mutation invalidates any stored solution.
    fn touch(&mut self) {
        self.state = SessionState::Configured;
        self.solution = None;
    }

    //--------------------------------------------------------------------------
    // experiment registry

    /// Register an experiment at the end of the stable order with weight 1.0
    /// and no overrides.
    pub fn add_experiment(&mut self, experiment: Experiment) -> Result<()> {
        self.add_experiment_with(experiment, ExperimentOptions::default())
    }

    /// Register an experiment, applying guess/fixed overrides to its local
    /// model state and establishing the requested aliases.
    pub fn add_experiment_with(
        &mut self,
        experiment: Experiment,
        options: ExperimentOptions,
    ) -> Result<()> {
        let experiment_id = experiment.experiment_id().to_string();

        if self.experiments.contains_key(&experiment_id) {
            return Err(FitError::Validation(format!(
                "experiment '{}' is already registered",
                experiment_id
            )));
        }

        // Validate every override name up front so a bad option leaves the
        // session untouched.
        for name in options
            .param_guesses
            .keys()
            .chain(options.fixed_param.keys())
            .chain(options.param_aliases.keys())
        {
            if !experiment.model().declares(name) {
                return Err(FitError::Validation(format!(
                    "parameter '{}' not in experiment '{}'",
                    name, experiment_id
                )));
            }
        }

        self.order.push(experiment_id.clone());
        self.weights.insert(experiment_id.clone(), options.weight);
        self.experiments.insert(experiment_id.clone(), experiment);

        {
            let model = self.experiment_mut(&experiment_id)?.model_mut();
            model.update_guesses(&options.param_guesses)?;
            model.update_fixed(&options.fixed_param)?;
        }

        for (local_param, global_name) in &options.param_aliases {
            self.link_to_global(&experiment_id, local_param, global_name)?;
        }

        self.touch();
        Ok(())
    }

    /// Remove an experiment, dropping every alias edge that names it and
    /// cascading removal of any global parameter left without edges.
    pub fn remove_experiment(&mut self, experiment_id: &str) -> Result<()> {
        if !self.experiments.contains_key(experiment_id) {
            return Err(FitError::NotFound(format!(
                "experiment '{}' not registered",
                experiment_id
            )));
        }

        self.registry.drop_experiment(experiment_id);
        self.experiments.remove(experiment_id);
        self.weights.remove(experiment_id);
        self.order.retain(|id| id != experiment_id);

        self.touch();
        Ok(())
    }

    /// Adjust an experiment's weight after registration. The weight changes
    /// the objective, so any stored solution is dropped.
    pub fn update_weight(&mut self, experiment_id: &str, weight: f64) -> Result<()> {
        self.experiment(experiment_id)?;
        self.weights.insert(experiment_id.to_string(), weight);
        self.touch();
        Ok(())
    }

    //--------------------------------------------------------------------------
    // alias graph

    /// Link a local experimental fitting parameter to a global fitting
    /// parameter, creating the global (seeded from the experiment's current
    /// local guess/range/fixed values) if it does not exist yet.
    ///
    /// Re-linking the same pair to the same global is a no-op for the edge
    /// list. Re-linking a pair currently aliased to a different global first
    /// removes the old alias, so a pair never holds two aliases.
    pub fn link_to_global(
        &mut self,
        experiment_id: &str,
        local_param: &str,
        global_name: &str,
    ) -> Result<()> {
        // Validate before mutating anything: a failed link must leave the
        // registry unchanged.
        let experiment = self.experiment(experiment_id)?;
        if !experiment.model().declares(local_param) {
            return Err(FitError::Validation(format!(
                "parameter '{}' not in experiment '{}'",
                local_param, experiment_id
            )));
        }

        let current = experiment.model().param_aliases().get(local_param).cloned();
        if let Some(current) = current {
            if current != global_name {
                self.unlink_from_global(experiment_id, local_param, &current)?;
            }
        }

        let (guess, range, fixed) = {
            let model = self.experiment(experiment_id)?.model();
            (
                model.param_guess(local_param)?,
                model.param_range(local_param)?,
                model.fixed_param().get(local_param).copied(),
            )
        };

        self.registry.link(
            global_name,
            AliasEdge::new(experiment_id, local_param),
            guess,
            range,
            fixed,
        );
        self.experiment_mut(experiment_id)?
            .model_mut()
            .set_alias(local_param, Some(global_name))?;

        self.touch();
        Ok(())
    }

    /// Remove the link between a local fitting parameter and a global
    /// fitting parameter. If the global parameter's edge list empties, the
    /// global parameter is removed with it.
    pub fn unlink_from_global(
        &mut self,
        experiment_id: &str,
        local_param: &str,
        global_name: &str,
    ) -> Result<()> {
        let experiment = self.experiment(experiment_id)?;
        if !experiment.model().declares(local_param) {
            return Err(FitError::Validation(format!(
                "parameter '{}' not in experiment '{}'",
                local_param, experiment_id
            )));
        }

        self.registry.unlink(global_name, experiment_id, local_param)?;
        self.experiment_mut(experiment_id)?
            .model_mut()
            .set_alias(local_param, None)?;

        self.touch();
        Ok(())
    }

    /// Remove a global parameter outright, clearing every experiment-side
    /// alias that pointed at it. The parameter's guess/range/fixed entries
    /// disappear atomically with its edges.
    pub fn remove_global(&mut self, global_name: &str) -> Result<()> {
        let edges = self.registry.remove(global_name)?;

        for edge in edges {
            if let Some(experiment) = self.experiments.get_mut(&edge.experiment_id) {
                experiment.model_mut().set_alias(&edge.local_param, None)?;
            }
        }

        self.touch();
        Ok(())
    }

    //--------------------------------------------------------------------------
    // parameter updates

    /// Update a guess. With `experiment = None` the global guess table is
    /// written; otherwise the experiment's local guess table is written
    /// regardless of current alias state, so unlinking later recovers the
    /// seeded value.
    pub fn update_guess(
        &mut self,
        param_name: &str,
        value: f64,
        experiment: Option<&str>,
    ) -> Result<()> {
        match experiment {
            None => {
                self.registry.get_mut(param_name)?.set_guess(value);
                Ok(())
            }
            Some(experiment_id) => self
                .experiment_mut(experiment_id)?
                .model_mut()
                .update_guess(param_name, value),
        }
    }

    /// Update a parameter range, with the same global/local switch as
    /// [`update_guess`](Self::update_guess).
    pub fn update_range(
        &mut self,
        param_name: &str,
        min: f64,
        max: f64,
        experiment: Option<&str>,
    ) -> Result<()> {
        match experiment {
            None => {
                if min > max {
                    return Err(FitError::Validation(format!(
                        "invalid range for '{}': min {} > max {}",
                        param_name, min, max
                    )));
                }
                self.registry.get_mut(param_name)?.set_range((min, max));
                Ok(())
            }
            Some(experiment_id) => self
                .experiment_mut(experiment_id)?
                .model_mut()
                .update_range(param_name, min, max),
        }
    }

    /// Fix a parameter to a constant. Fixing rewrites what the projections
    /// report, so any stored solution is dropped.
    pub fn fix(&mut self, param_name: &str, value: f64, experiment: Option<&str>) -> Result<()> {
        match experiment {
            None => self.registry.get_mut(param_name)?.set_fixed(Some(value)),
            Some(experiment_id) => self
                .experiment_mut(experiment_id)?
                .model_mut()
                .fix(param_name, value)?,
        }
        self.touch();
        Ok(())
    }

    /// Release a fixed parameter, dropping any stored solution.
    pub fn unfix(&mut self, param_name: &str, experiment: Option<&str>) -> Result<()> {
        match experiment {
            None => self.registry.get_mut(param_name)?.set_fixed(None),
            Some(experiment_id) => self
                .experiment_mut(experiment_id)?
                .model_mut()
                .unfix(param_name)?,
        }
        self.touch();
        Ok(())
    }

    //--------------------------------------------------------------------------
    // fitting

    /// Build the fit-vector layout for the current session state. Pure: two
    /// calls on an unchanged session produce identical layouts.
    pub fn fit_layout(&self) -> Result<FitLayout> {
        FitLayout::build(&self.registry, &self.order, &self.experiments)
    }

    /// Perform a global fit with default solver settings.
    pub fn fit(&mut self) -> Result<FitReport> {
        self.fit_with_config(LmConfig::default())
    }

    /// Perform a global fit using nonlinear regression.
    ///
    /// On convergence the solved vector is stored and the session becomes
    /// `Fitted`. A deadline expiry yields a `Cancelled` report carrying the
    /// best-found vector without touching session state. Failure to converge
    /// surfaces as [`FitError::Solver`].
    ///
    /// Fitting zero experiments is a defined no-op: it succeeds with an
    /// empty solution, so `fit_param()` returns `({}, [])`.
    pub fn fit_with_config(&mut self, config: LmConfig) -> Result<FitReport> {
        if self.order.is_empty() {
            self.solution = Some(Solution {
                layout: FitLayout::empty(),
                values: Array1::zeros(0),
            });
            self.state = SessionState::Fitted;
            return Ok(FitReport {
                status: FitStatus::Converged,
                cost: 0.0,
                iterations: 0,
                func_evals: 0,
                message: "No experiments registered; fit is trivial".to_string(),
                params: Vec::new(),
            });
        }

        let layout = self.fit_layout()?;
        let result = {
            let residual = GlobalResidual::new(
                &self.order,
                &self.experiments,
                &self.weights,
                &self.registry,
                &layout,
            );
            LevenbergMarquardt::with_config(config).minimize_bounded(
                &residual,
                layout.guesses().clone(),
                Some(layout.bounds()),
            )?
        };

        if result.cancelled {
            return Ok(FitReport {
                status: FitStatus::Cancelled,
                cost: result.cost,
                iterations: result.iterations,
                func_evals: result.func_evals,
                message: result.message,
                params: result.params.to_vec(),
            });
        }
        if !result.success {
            return Err(FitError::Solver(result.message));
        }

        let report = FitReport {
            status: FitStatus::Converged,
            cost: result.cost,
            iterations: result.iterations,
            func_evals: result.func_evals,
            message: result.message,
            params: result.params.to_vec(),
        };

        self.solution = Some(Solution {
            layout,
            values: result.params,
        });
        self.state = SessionState::Fitted;
        Ok(report)
    }

    fn require_fitted(&self) -> Result<&Solution> {
        match (&self.solution, self.state) {
            (Some(solution), SessionState::Fitted) => Ok(solution),
            _ => Err(FitError::State("not fitted".to_string())),
        }
    }

    //--------------------------------------------------------------------------
    // result projection

    /// Solved parameter values as a tuple: global values first, then one map
    /// of local values per experiment in stable order. An aliased parameter
    /// appears only in the global map, never in its experiment's local map.
    #[allow(clippy::type_complexity)]
    pub fn fit_param(&self) -> Result<(HashMap<String, f64>, Vec<HashMap<String, f64>>)> {
        let solution = self.require_fitted()?;

        let mut global_out = HashMap::new();
        for param in self.registry.iter() {
            let index = solution.layout.global_index(param.name()).ok_or_else(|| {
                FitError::State("solved vector does not match current registry".to_string())
            })?;
            let value = param.fixed().unwrap_or(solution.values[index]);
            global_out.insert(param.name().to_string(), value);
        }

        let mut local_out = Vec::with_capacity(self.order.len());
        for experiment_id in &self.order {
            let experiment = self.experiment(experiment_id)?;
            let model = experiment.model();

            let mut out = HashMap::new();
            for param in model.param_names() {
                if model.param_aliases().contains_key(param) {
                    continue;
                }
                let index = solution.layout.index_of(experiment_id, param).ok_or_else(|| {
                    FitError::State("solved vector does not match current registry".to_string())
                })?;
                let value = model
                    .fixed_param()
                    .get(param)
                    .copied()
                    .unwrap_or(solution.values[index]);
                out.insert(param.clone(), value);
            }
            local_out.push(out);
        }

        Ok((global_out, local_out))
    }

    /// Parameter names: global names in creation order, then per-experiment
    /// local names (currently aliased names excluded) in stable order.
    pub fn param_names(&self) -> (Vec<String>, Vec<Vec<String>>) {
        let global = self.registry.names().to_vec();

        let local = self
            .experiments()
            .map(|experiment| {
                let model = experiment.model();
                model
                    .param_names()
                    .iter()
                    .filter(|p| !model.param_aliases().contains_key(*p))
                    .cloned()
                    .collect()
            })
            .collect();

        (global, local)
    }

    /// Parameter guesses in the same two-level shape as
    /// [`param_names`](Self::param_names).
    #[allow(clippy::type_complexity)]
    pub fn param_guesses(&self) -> (HashMap<String, f64>, Vec<HashMap<String, f64>>) {
        let global = self
            .registry
            .iter()
            .map(|p| (p.name().to_string(), p.guess()))
            .collect();

        let local = self
            .experiments()
            .map(|experiment| {
                let model = experiment.model();
                model
                    .param_guesses()
                    .iter()
                    .filter(|(name, _)| !model.param_aliases().contains_key(*name))
                    .map(|(name, value)| (name.clone(), *value))
                    .collect()
            })
            .collect();

        (global, local)
    }

    /// Parameter ranges in the same two-level shape.
    #[allow(clippy::type_complexity)]
    pub fn param_ranges(&self) -> (HashMap<String, (f64, f64)>, Vec<HashMap<String, (f64, f64)>>) {
        let global = self
            .registry
            .iter()
            .map(|p| (p.name().to_string(), p.range()))
            .collect();

        let local = self
            .experiments()
            .map(|experiment| {
                let model = experiment.model();
                model
                    .param_ranges()
                    .iter()
                    .filter(|(name, _)| !model.param_aliases().contains_key(*name))
                    .map(|(name, range)| (name.clone(), *range))
                    .collect()
            })
            .collect();

        (global, local)
    }

    /// Fixed parameters in the same two-level shape.
    #[allow(clippy::type_complexity)]
    pub fn fixed_param(&self) -> (HashMap<String, f64>, Vec<HashMap<String, f64>>) {
        let global = self
            .registry
            .iter()
            .filter_map(|p| p.fixed().map(|v| (p.name().to_string(), v)))
            .collect();

        let local = self
            .experiments()
            .map(|experiment| {
                let model = experiment.model();
                model
                    .fixed_param()
                    .iter()
                    .filter(|(name, _)| !model.param_aliases().contains_key(*name))
                    .map(|(name, value)| (name.clone(), *value))
                    .collect()
            })
            .collect();

        (global, local)
    }

    /// Alias views: global name -> edges on the registry side, and the
    /// per-experiment local alias maps.
    #[allow(clippy::type_complexity)]
    pub fn param_aliases(
        &self,
    ) -> (HashMap<String, Vec<AliasEdge>>, Vec<HashMap<String, String>>) {
        let global = self
            .registry
            .iter()
            .map(|p| (p.name().to_string(), p.aliases().to_vec()))
            .collect();

        let local = self
            .experiments()
            .map(|experiment| experiment.model().param_aliases().clone())
            .collect();

        (global, local)
    }

    /// Per-experiment (x, observed, predicted) triples for external
    /// plotting, in stable order. Requires a fitted session.
    pub fn plot_data(&self) -> Result<Vec<PlotData>> {
        let solution = self.require_fitted()?;

        let mut out = Vec::with_capacity(self.order.len());
        for experiment_id in &self.order {
            let experiment = self.experiment(experiment_id)?;
            let values = resolve_model_values(
                experiment,
                experiment_id,
                &solution.layout,
                &self.registry,
                &solution.values,
            )?;
            let predicted = experiment.predict(&values)?;

            out.push(PlotData {
                experiment_id: experiment_id.clone(),
                x: experiment.mole_ratio().clone(),
                observed: experiment.heats().clone(),
                predicted,
            });
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Model;
    use crate::models::ModelKind;
    use ndarray::array;

    fn single_site_experiment(id: &str) -> Experiment {
        Experiment::new(
            id,
            Model::new(ModelKind::SingleSite),
            array![1.0e-6, 5.0e-6, 2.0e-5],
            array![-2.5, -4.0, -4.8],
        )
        .unwrap()
    }

    #[test]
    fn test_state_machine_transitions() {
        let mut session = GlobalFit::new();
        assert_eq!(session.state(), SessionState::Empty);

        session
            .add_experiment(single_site_experiment("expt0"))
            .unwrap();
        assert_eq!(session.state(), SessionState::Configured);

        session.fit().unwrap();
        assert_eq!(session.state(), SessionState::Fitted);

        // A structural mutation invalidates the solution.
        session
            .add_experiment(single_site_experiment("expt1"))
            .unwrap();
        assert_eq!(session.state(), SessionState::Configured);
        assert!(matches!(session.fit_param(), Err(FitError::State(_))));
    }

    #[test]
    fn test_duplicate_experiment_id_rejected() {
        let mut session = GlobalFit::new();
        session
            .add_experiment(single_site_experiment("expt0"))
            .unwrap();

        let err = session.add_experiment(single_site_experiment("expt0"));
        assert!(matches!(err, Err(FitError::Validation(_))));
    }

    #[test]
    fn test_alias_maps_stay_in_sync() {
        let mut session = GlobalFit::new();
        session
            .add_experiment(single_site_experiment("expt0"))
            .unwrap();
        session
            .add_experiment(single_site_experiment("expt1"))
            .unwrap();

        session.link_to_global("expt0", "dh", "global_dh").unwrap();
        session.link_to_global("expt1", "dh", "global_dh").unwrap();

        let (global, local) = session.param_aliases();
        assert_eq!(global["global_dh"].len(), 2);
        assert_eq!(local[0]["dh"], "global_dh");
        assert_eq!(local[1]["dh"], "global_dh");

        session
            .unlink_from_global("expt0", "dh", "global_dh")
            .unwrap();
        let (global, local) = session.param_aliases();
        assert_eq!(global["global_dh"].len(), 1);
        assert!(!local[0].contains_key("dh"));
        assert_eq!(local[1]["dh"], "global_dh");
    }

    #[test]
    fn test_relink_to_different_global_moves_the_edge() {
        let mut session = GlobalFit::new();
        session
            .add_experiment(single_site_experiment("expt0"))
            .unwrap();
        session
            .add_experiment(single_site_experiment("expt1"))
            .unwrap();

        session.link_to_global("expt0", "dh", "global_a").unwrap();
        session.link_to_global("expt1", "dh", "global_a").unwrap();
        session.link_to_global("expt0", "dh", "global_b").unwrap();

        let (global, local) = session.param_aliases();
        assert_eq!(global["global_a"].len(), 1);
        assert_eq!(global["global_b"].len(), 1);
        assert_eq!(local[0]["dh"], "global_b");
    }

    #[test]
    fn test_remove_global_clears_experiment_side() {
        let mut session = GlobalFit::new();
        session
            .add_experiment(single_site_experiment("expt0"))
            .unwrap();
        session.link_to_global("expt0", "ka", "global_k").unwrap();

        session.remove_global("global_k").unwrap();

        let (global, local) = session.param_aliases();
        assert!(global.is_empty());
        assert!(local[0].is_empty());
        assert!(matches!(
            session.remove_global("global_k"),
            Err(FitError::Validation(_))
        ));
    }

    #[test]
    fn test_weight_accessors() {
        let mut session = GlobalFit::new();
        let mut options = ExperimentOptions::default();
        options.weight = 0.25;
        session
            .add_experiment_with(single_site_experiment("expt0"), options)
            .unwrap();

        assert_eq!(session.weight("expt0").unwrap(), 0.25);
        session.update_weight("expt0", 2.0).unwrap();
        assert_eq!(session.weight("expt0").unwrap(), 2.0);

        assert!(matches!(
            session.update_weight("ghost", 1.0),
            Err(FitError::NotFound(_))
        ));
    }

    #[test]
    fn test_weight_and_fixed_changes_invalidate_solution() {
        let mut session = GlobalFit::new();
        session
            .add_experiment(single_site_experiment("expt0"))
            .unwrap();

        session.fit().unwrap();
        session.update_weight("expt0", 2.0).unwrap();
        assert_eq!(session.state(), SessionState::Configured);
        assert!(matches!(session.fit_param(), Err(FitError::State(_))));

        session.fit().unwrap();
        session.fix("dh", -4.0, Some("expt0")).unwrap();
        assert!(matches!(session.fit_param(), Err(FitError::State(_))));

        session.fit().unwrap();
        session.unfix("dh", Some("expt0")).unwrap();
        assert_eq!(session.state(), SessionState::Configured);
        assert!(matches!(session.fit_param(), Err(FitError::State(_))));
    }

    #[test]
    fn test_add_with_bad_override_leaves_session_untouched() {
        let mut session = GlobalFit::new();
        let mut options = ExperimentOptions::default();
        options.param_guesses.insert("nope".to_string(), 1.0);

        let err = session.add_experiment_with(single_site_experiment("expt0"), options);
        assert!(matches!(err, Err(FitError::Validation(_))));
        assert_eq!(session.experiments().count(), 0);
        assert_eq!(session.state(), SessionState::Empty);
    }
}
