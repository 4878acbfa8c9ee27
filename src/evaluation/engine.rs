//! Evaluation of predictions against truth: metrics, confusion cells, curve
//! areas, business cost, and threshold sweeps.

use super::confusion::{round_to, ConfusionCell, ConfusionMatrix};
use super::cost::{CostBreakdown, CostMatrix};
use super::curves;
use crate::config::EvaluationConfig;
use crate::error::{PipelineError, Result};
use crate::models::Predictor;
use crate::types::{normalize_pair, Dataset, Label, LabelColumn};
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// Scalar metrics of one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub mcc: f64,
    pub sensitivity: f64,
    pub specificity: f64,
    /// Present only when probabilities were supplied
    pub pr_auc: Option<f64>,
    pub roc_auc: Option<f64>,
}

impl Metrics {
    fn from_confusion(confusion: &ConfusionMatrix, areas: Option<(f64, f64)>) -> Self {
        Self {
            accuracy: confusion.accuracy(),
            precision: confusion.precision(),
            recall: confusion.recall(),
            f1: confusion.f1(),
            mcc: confusion.mcc(),
            sensitivity: confusion.sensitivity(),
            specificity: confusion.specificity(),
            pr_auc: areas.map(|(pr, _)| pr),
            roc_auc: areas.map(|(_, roc)| roc),
        }
    }

    /// Copy with every value rounded to `decimals`.
    pub fn rounded(&self, decimals: i32) -> Self {
        let r = |v: f64| round_to(v, decimals);
        Self {
            accuracy: r(self.accuracy),
            precision: r(self.precision),
            recall: r(self.recall),
            f1: r(self.f1),
            mcc: r(self.mcc),
            sensitivity: r(self.sensitivity),
            specificity: r(self.specificity),
            pr_auc: self.pr_auc.map(r),
            roc_auc: self.roc_auc.map(r),
        }
    }
}

/// One (truth, prediction, probability) triple the metrics were computed from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub truth: Label,
    pub predicted: Label,
    pub probability: Option<f64>,
}

/// Outcome of one evaluation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub evaluation_id: Uuid,
    pub evaluated_at: DateTime<Utc>,
    /// Cut-off that turned probabilities into labels, if any
    pub threshold: Option<f64>,
    pub metrics: Metrics,
    pub confusion: ConfusionMatrix,
    pub cells: Vec<ConfusionCell>,
    pub cost: Option<CostBreakdown>,
    pub observations: Vec<Observation>,
}

impl EvaluationResult {
    pub fn rows(&self) -> usize {
        self.observations.len()
    }

    pub fn total_cost(&self) -> Option<f64> {
        self.cost.as_ref().map(|c| c.total)
    }
}

/// Stateless evaluator holding the default probability threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvaluationEngine {
    threshold: f64,
}

fn check_threshold(threshold: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(PipelineError::config(format!(
            "threshold {threshold} is outside [0, 1]"
        )));
    }
    Ok(())
}

fn check_probabilities(probabilities: &[f64], rows: usize) -> Result<()> {
    if probabilities.len() != rows {
        return Err(PipelineError::schema(format!(
            "{} probabilities for {rows} rows",
            probabilities.len()
        )));
    }
    if let Some(bad) = probabilities.iter().find(|p| !p.is_finite()) {
        return Err(PipelineError::schema(format!("probability {bad} is not finite")));
    }
    Ok(())
}

/// Fraud when `p >= threshold`.
pub fn apply_threshold(probabilities: &[f64], threshold: f64) -> Vec<Label> {
    probabilities
        .iter()
        .map(|&p| Label::from(p >= threshold))
        .collect()
}

impl EvaluationEngine {
    pub fn new(threshold: f64) -> Result<Self> {
        check_threshold(threshold)?;
        Ok(Self { threshold })
    }

    pub fn from_config(config: &EvaluationConfig) -> Result<Self> {
        Self::new(config.threshold)
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Evaluate predicted labels against truth. Both columns must share one
    /// encoding; probabilities, when given, are aligned by row.
    pub fn evaluate(
        &self,
        truth: &LabelColumn,
        predicted: &LabelColumn,
        probabilities: Option<&[f64]>,
        cost: Option<&CostMatrix>,
    ) -> Result<EvaluationResult> {
        let (truth, predicted) = normalize_pair(truth, predicted)?;
        if let Some(probabilities) = probabilities {
            check_probabilities(probabilities, truth.len())?;
        }
        Ok(self.build(&truth, &predicted, probabilities, cost, None))
    }

    /// Evaluate probabilities alone, cutting at `threshold` or the engine default.
    pub fn evaluate_probabilities(
        &self,
        truth: &LabelColumn,
        probabilities: &[f64],
        threshold: Option<f64>,
        cost: Option<&CostMatrix>,
    ) -> Result<EvaluationResult> {
        let threshold = threshold.unwrap_or(self.threshold);
        check_threshold(threshold)?;
        let truth = truth.normalize()?;
        check_probabilities(probabilities, truth.len())?;
        let predicted = apply_threshold(probabilities, threshold);
        Ok(self.build(&truth, &predicted, Some(probabilities), cost, Some(threshold)))
    }

    /// Evaluate a model's output: its own hard labels when it supplied them and
    /// no threshold override is given, otherwise labels cut from `probabilities`.
    pub fn evaluate_output(
        &self,
        truth: &LabelColumn,
        predicted: Option<&LabelColumn>,
        probabilities: &[f64],
        threshold: Option<f64>,
        cost: Option<&CostMatrix>,
    ) -> Result<EvaluationResult> {
        match (predicted, threshold) {
            (Some(predicted), None) => self.evaluate(truth, predicted, Some(probabilities), cost),
            _ => self.evaluate_probabilities(truth, probabilities, threshold, cost),
        }
    }

    /// One evaluation per threshold, in the order given.
    pub fn sweep(
        &self,
        truth: &LabelColumn,
        probabilities: &[f64],
        thresholds: &[f64],
        cost: Option<&CostMatrix>,
    ) -> Result<Vec<EvaluationResult>> {
        thresholds
            .iter()
            .map(|&t| self.evaluate_probabilities(truth, probabilities, Some(t), cost))
            .collect()
    }

    /// Lowest total cost when every result carries a cost breakdown, highest
    /// F1 otherwise; ties go to the lower threshold.
    pub fn best_threshold(results: &[EvaluationResult]) -> Option<&EvaluationResult> {
        let by_cost = results.iter().all(|r| r.cost.is_some());
        let cost = |r: &EvaluationResult| r.total_cost().unwrap_or(f64::INFINITY);
        let threshold = |r: &EvaluationResult| r.threshold.unwrap_or(f64::INFINITY);
        results.iter().min_by(|a, b| {
            let primary = if by_cost {
                cost(a).total_cmp(&cost(b))
            } else {
                b.metrics.f1.total_cmp(&a.metrics.f1)
            };
            primary.then_with(|| threshold(a).total_cmp(&threshold(b)))
        })
    }

    /// Score a labeled dataset with any predictor and evaluate its output.
    pub fn evaluate_predictor<P: Predictor + ?Sized>(
        &self,
        predictor: &P,
        data: &Dataset,
        cost: Option<&CostMatrix>,
    ) -> anyhow::Result<EvaluationResult> {
        let truth = data.labels()?;
        let predicted = predictor
            .predict_labels(data)
            .with_context(|| format!("{} failed to predict labels", predictor.name()))?;
        let probabilities = predictor
            .predict_probabilities(data)
            .with_context(|| format!("{} failed to predict probabilities", predictor.name()))?;
        debug!(model = predictor.name(), rows = data.len(), "Predictions received");

        let result = self.evaluate(
            &LabelColumn::Labels(truth),
            &LabelColumn::Labels(predicted),
            Some(&probabilities),
            cost,
        )?;
        Ok(result)
    }

    fn build(
        &self,
        truth: &[Label],
        predicted: &[Label],
        probabilities: Option<&[f64]>,
        cost: Option<&CostMatrix>,
        threshold: Option<f64>,
    ) -> EvaluationResult {
        let confusion = ConfusionMatrix::from_labels(truth, predicted);
        let areas = probabilities.map(|p| (curves::pr_auc(truth, p), curves::roc_auc(truth, p)));
        let metrics = Metrics::from_confusion(&confusion, areas);
        let cost = cost.map(|c| c.breakdown(&confusion));

        let observations = truth
            .iter()
            .zip(predicted)
            .enumerate()
            .map(|(i, (&truth, &predicted))| Observation {
                truth,
                predicted,
                probability: probabilities.map(|p| p[i]),
            })
            .collect();

        info!(
            rows = truth.len(),
            tp = confusion.tp,
            fp = confusion.fp,
            fn_ = confusion.fn_,
            tn = confusion.tn,
            f1 = metrics.f1,
            threshold = ?threshold,
            "Evaluation complete"
        );

        EvaluationResult {
            evaluation_id: Uuid::new_v4(),
            evaluated_at: Utc::now(),
            threshold,
            cells: confusion.cells(),
            metrics,
            confusion,
            cost,
            observations,
        }
    }
}

impl Default for EvaluationEngine {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}
