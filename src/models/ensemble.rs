//! Weighted-average ensemble of predictors.

use super::Predictor;
use crate::evaluation::apply_threshold;
use crate::types::{Dataset, Label};
use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use tracing::debug;

/// Combines member probabilities into one weighted average score.
pub struct WeightedEnsemble {
    name: String,
    members: Vec<Box<dyn Predictor>>,
    /// Member weights by name
    weights: HashMap<String, f64>,
    /// Weight for members without an explicit entry
    default_weight: f64,
    threshold: f64,
}

impl WeightedEnsemble {
    /// Equal weights for every member.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
            weights: HashMap::new(),
            default_weight: 1.0,
            threshold: 0.5,
        }
    }

    pub fn with_member(mut self, member: Box<dyn Predictor>) -> Self {
        self.members.push(member);
        self
    }

    pub fn with_weight(mut self, member: &str, weight: f64) -> Self {
        self.weights.insert(member.to_string(), weight);
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    fn weight_of(&self, member: &str) -> f64 {
        self.weights.get(member).copied().unwrap_or(self.default_weight)
    }
}

impl Predictor for WeightedEnsemble {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict_labels(&self, features: &Dataset) -> Result<Vec<Label>> {
        let probabilities = self.predict_probabilities(features)?;
        Ok(apply_threshold(&probabilities, self.threshold))
    }

    fn predict_probabilities(&self, features: &Dataset) -> Result<Vec<f64>> {
        if self.members.is_empty() {
            bail!("ensemble {} has no members", self.name);
        }

        let mut weighted_sum = vec![0.0; features.len()];
        let mut total_weight = 0.0;
        for member in &self.members {
            let weight = self.weight_of(member.name());
            let scores = member
                .predict_probabilities(features)
                .with_context(|| format!("ensemble member {} failed", member.name()))?;
            if scores.len() != features.len() {
                bail!(
                    "ensemble member {} returned {} scores for {} rows",
                    member.name(),
                    scores.len(),
                    features.len()
                );
            }
            for (acc, score) in weighted_sum.iter_mut().zip(scores) {
                *acc += score * weight;
            }
            total_weight += weight;
            debug!(member = member.name(), weight, "Ensemble member scored");
        }

        if total_weight <= 0.0 {
            bail!("ensemble {} has no positive member weight", self.name);
        }
        Ok(weighted_sum
            .into_iter()
            .map(|s| (s / total_weight).clamp(0.0, 1.0))
            .collect())
    }
}
