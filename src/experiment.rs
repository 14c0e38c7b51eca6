//! A single titration experiment: identity, binding model, and observed data.

use crate::error::{FitError, Result};
use crate::model::Model;
use ndarray::Array1;

/// One experimental dataset to be fit, owned by a [`GlobalFit`] session.
///
/// [`GlobalFit`]: crate::session::GlobalFit
#[derive(Debug, Clone)]
pub struct Experiment {
    experiment_id: String,
    model: Model,
    mole_ratio: Array1<f64>,
    heats: Array1<f64>,
    label: Option<String>,
}

impl Experiment {
    /// Create an experiment from its observed data. The x axis (mole ratio)
    /// and the observed heats must have the same length.
    pub fn new(
        experiment_id: impl Into<String>,
        model: Model,
        mole_ratio: Array1<f64>,
        heats: Array1<f64>,
    ) -> Result<Self> {
        if mole_ratio.len() != heats.len() {
            return Err(FitError::DimensionMismatch(format!(
                "mole ratio has {} points but heats has {}",
                mole_ratio.len(),
                heats.len()
            )));
        }

        Ok(Self {
            experiment_id: experiment_id.into(),
            model,
            mole_ratio,
            heats,
            label: None,
        })
    }

    /// Attach a display label for presentation layers.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn experiment_id(&self) -> &str {
        &self.experiment_id
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut Model {
        &mut self.model
    }

    pub fn mole_ratio(&self) -> &Array1<f64> {
        &self.mole_ratio
    }

    pub fn heats(&self) -> &Array1<f64> {
        &self.heats
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Number of observed points, and therefore of residuals this experiment
    /// contributes.
    pub fn len(&self) -> usize {
        self.heats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heats.is_empty()
    }

    /// Predict heats for resolved parameter values in declared order.
    pub(crate) fn predict(&self, values: &[f64]) -> Result<Array1<f64>> {
        self.model.predict(&self.mole_ratio, values)
    }
}
