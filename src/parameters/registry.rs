//! Registry-side alias graph operations.

use crate::error::{FitError, Result};
use crate::parameters::parameter::{AliasEdge, GlobalParameter};
use std::collections::HashMap;

/// Owns the global parameter table and the registry side of the alias graph.
///
/// Creation order is preserved independently of the table's iteration order;
/// the fit-vector layout and all projections walk globals in creation order.
#[derive(Debug, Clone, Default)]
pub struct ParameterRegistry {
    order: Vec<String>,
    table: HashMap<String, GlobalParameter>,
}

impl ParameterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.table.contains_key(name)
    }

    /// Global parameter names in creation order.
    pub fn names(&self) -> &[String] {
        &self.order
    }

    /// Global parameters in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &GlobalParameter> {
        self.order.iter().map(|name| &self.table[name])
    }

    pub fn get(&self, name: &str) -> Result<&GlobalParameter> {
        self.table
            .get(name)
            .ok_or_else(|| FitError::Validation(format!("global parameter '{}' not found", name)))
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Result<&mut GlobalParameter> {
        self.table
            .get_mut(name)
            .ok_or_else(|| FitError::Validation(format!("global parameter '{}' not found", name)))
    }

    /// Add an alias edge, creating the global parameter if it does not exist
    /// yet. A new global is seeded from the linking experiment's local
    /// guess/range/fixed values. Re-linking an experiment already on the
    /// edge list is a no-op for the list.
    pub(crate) fn link(
        &mut self,
        global_name: &str,
        edge: AliasEdge,
        guess: f64,
        range: (f64, f64),
        fixed: Option<f64>,
    ) {
        match self.table.get_mut(global_name) {
            Some(param) => {
                if !param.has_experiment(&edge.experiment_id) {
                    param.push_edge(edge);
                }
            }
            None => {
                self.order.push(global_name.to_string());
                self.table.insert(
                    global_name.to_string(),
                    GlobalParameter::new(global_name, guess, range, fixed, edge),
                );
            }
        }
    }

    /// Remove the edge for the exact (experiment, local parameter) pair.
    /// Cascades to full removal when the edge list empties; returns true in
    /// that case.
    pub(crate) fn unlink(
        &mut self,
        global_name: &str,
        experiment_id: &str,
        local_param: &str,
    ) -> Result<bool> {
        let param = self.get_mut(global_name)?;

        if !param.remove_edge(experiment_id, local_param) {
            return Err(FitError::Validation(format!(
                "parameter '{}' of experiment '{}' is not linked to global parameter '{}'",
                local_param, experiment_id, global_name
            )));
        }

        if param.is_orphaned() {
            self.remove(global_name)?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Delete a global parameter outright, returning the edges it still
    /// carried so the caller can clear the experiment-side alias maps. The
    /// guess/range/fixed/alias entries disappear together.
    pub(crate) fn remove(&mut self, global_name: &str) -> Result<Vec<AliasEdge>> {
        let param = self
            .table
            .remove(global_name)
            .ok_or_else(|| FitError::Validation(format!("global parameter '{}' not found", global_name)))?;
        self.order.retain(|name| name != global_name);
        Ok(param.aliases().to_vec())
    }

    /// Remove every edge naming the given experiment, cascading removal of
    /// any global parameter whose edge list empties.
    pub(crate) fn drop_experiment(&mut self, experiment_id: &str) {
        let names: Vec<String> = self.order.clone();
        for name in names {
            if let Some(param) = self.table.get_mut(&name) {
                param.drop_experiment(experiment_id);
                if param.is_orphaned() {
                    self.table.remove(&name);
                    self.order.retain(|n| n != &name);
                }
            }
        }
    }
}
