//! Global parameter definition.

use serde::{Deserialize, Serialize};

/// A link from one (experiment, local parameter) pair to a global parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasEdge {
    pub experiment_id: String,
    pub local_param: String,
}

impl AliasEdge {
    pub fn new(experiment_id: impl Into<String>, local_param: impl Into<String>) -> Self {
        Self {
            experiment_id: experiment_id.into(),
            local_param: local_param.into(),
        }
    }
}

/// A fit parameter shared across experiments by aliasing.
///
/// Created implicitly when the first alias edge is linked, seeded from that
/// experiment's local guess/range/fixed values; destroyed automatically when
/// the last edge is removed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalParameter {
    name: String,
    guess: f64,
    range: (f64, f64),
    fixed: Option<f64>,
    aliases: Vec<AliasEdge>,
}

impl GlobalParameter {
    pub(crate) fn new(
        name: impl Into<String>,
        guess: f64,
        range: (f64, f64),
        fixed: Option<f64>,
        first_edge: AliasEdge,
    ) -> Self {
        Self {
            name: name.into(),
            guess,
            range,
            fixed,
            aliases: vec![first_edge],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn guess(&self) -> f64 {
        self.guess
    }

    pub(crate) fn set_guess(&mut self, guess: f64) {
        self.guess = guess;
    }

    pub fn range(&self) -> (f64, f64) {
        self.range
    }

    pub(crate) fn set_range(&mut self, range: (f64, f64)) {
        self.range = range;
    }

    pub fn fixed(&self) -> Option<f64> {
        self.fixed
    }

    pub(crate) fn set_fixed(&mut self, fixed: Option<f64>) {
        self.fixed = fixed;
    }

    /// The alias edges currently pointing at this parameter. Never empty for
    /// a parameter reachable through the registry.
    pub fn aliases(&self) -> &[AliasEdge] {
        &self.aliases
    }

    /// Whether any edge names the given experiment.
    pub(crate) fn has_experiment(&self, experiment_id: &str) -> bool {
        self.aliases.iter().any(|e| e.experiment_id == experiment_id)
    }

    pub(crate) fn push_edge(&mut self, edge: AliasEdge) {
        self.aliases.push(edge);
    }

    /// Remove the edge matching the pair exactly. Returns false if no such
    /// edge exists.
    pub(crate) fn remove_edge(&mut self, experiment_id: &str, local_param: &str) -> bool {
        let before = self.aliases.len();
        self.aliases
            .retain(|e| !(e.experiment_id == experiment_id && e.local_param == local_param));
        self.aliases.len() < before
    }

    /// Remove every edge naming the given experiment.
    pub(crate) fn drop_experiment(&mut self, experiment_id: &str) {
        self.aliases.retain(|e| e.experiment_id != experiment_id);
    }

    pub(crate) fn is_orphaned(&self) -> bool {
        self.aliases.is_empty()
    }
}
