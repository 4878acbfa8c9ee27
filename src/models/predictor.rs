//! Capability contract for external classification models.

use crate::types::{Dataset, Label};
use anyhow::Result;

/// Any model that can score a transformed dataset.
///
/// Evaluation only ever talks to this trait, so workflows, bare models and
/// ensembles are interchangeable.
pub trait Predictor {
    /// Display name used in logs and comparison tables
    fn name(&self) -> &str;

    /// One hard label per row of `features`.
    fn predict_labels(&self, features: &Dataset) -> Result<Vec<Label>>;

    /// One fraud probability in [0, 1] per row of `features`.
    fn predict_probabilities(&self, features: &Dataset) -> Result<Vec<f64>>;
}

impl<P: Predictor + ?Sized> Predictor for Box<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn predict_labels(&self, features: &Dataset) -> Result<Vec<Label>> {
        (**self).predict_labels(features)
    }

    fn predict_probabilities(&self, features: &Dataset) -> Result<Vec<f64>> {
        (**self).predict_probabilities(features)
    }
}
