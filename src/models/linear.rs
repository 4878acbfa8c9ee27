//! Fixed-coefficient logistic scorer over named feature columns.

use super::Predictor;
use crate::evaluation::apply_threshold;
use crate::types::{Dataset, Label};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// `sigmoid(intercept + Σ w_i · x_i)` with coefficients keyed by column name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearScorer {
    name: String,
    intercept: f64,
    coefficients: Vec<(String, f64)>,
    threshold: f64,
}

impl LinearScorer {
    pub fn new(name: impl Into<String>, intercept: f64) -> Self {
        Self {
            name: name.into(),
            intercept,
            coefficients: Vec::new(),
            threshold: 0.5,
        }
    }

    pub fn with_coefficient(mut self, column: impl Into<String>, weight: f64) -> Self {
        self.coefficients.push((column.into(), weight));
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Log-odds per row.
    pub fn decision_function(&self, features: &Dataset) -> Result<Vec<f64>> {
        let resolved: Vec<(usize, f64)> = self
            .coefficients
            .iter()
            .map(|(column, weight)| {
                features
                    .require_column(column)
                    .map(|idx| (idx, *weight))
                    .with_context(|| format!("{} cannot score this dataset", self.name))
            })
            .collect::<Result<_>>()?;

        Ok(features
            .records()
            .iter()
            .map(|record| {
                let x = record.features();
                resolved
                    .iter()
                    .fold(self.intercept, |acc, &(idx, w)| acc + w * x[idx])
            })
            .collect())
    }
}

impl Predictor for LinearScorer {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict_labels(&self, features: &Dataset) -> Result<Vec<Label>> {
        let probabilities = self.predict_probabilities(features)?;
        Ok(apply_threshold(&probabilities, self.threshold))
    }

    fn predict_probabilities(&self, features: &Dataset) -> Result<Vec<f64>> {
        Ok(self
            .decision_function(features)?
            .into_iter()
            .map(sigmoid)
            .collect())
    }
}
