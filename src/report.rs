//! Side-by-side comparison of evaluation results.

use crate::error::{PipelineError, Result};
use crate::evaluation::confusion::round_to;
use crate::evaluation::EvaluationResult;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use tracing::info;

pub const REPORT_DECIMALS: i32 = 4;

/// Metric a comparison table can be ranked by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankMetric {
    Accuracy,
    Precision,
    Recall,
    F1,
    Mcc,
    Specificity,
    PrAuc,
    RocAuc,
    TotalCost,
}

impl RankMetric {
    /// Lower is better only for cost.
    pub fn ascending(self) -> bool {
        matches!(self, RankMetric::TotalCost)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RankMetric::Accuracy => "accuracy",
            RankMetric::Precision => "precision",
            RankMetric::Recall => "recall",
            RankMetric::F1 => "f1",
            RankMetric::Mcc => "mcc",
            RankMetric::Specificity => "specificity",
            RankMetric::PrAuc => "pr_auc",
            RankMetric::RocAuc => "roc_auc",
            RankMetric::TotalCost => "total_cost",
        }
    }
}

impl FromStr for RankMetric {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        let metric = match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "accuracy" => RankMetric::Accuracy,
            "precision" => RankMetric::Precision,
            "recall" => RankMetric::Recall,
            "f1" => RankMetric::F1,
            "mcc" => RankMetric::Mcc,
            "specificity" => RankMetric::Specificity,
            "pr_auc" => RankMetric::PrAuc,
            "roc_auc" => RankMetric::RocAuc,
            "total_cost" | "cost" => RankMetric::TotalCost,
            other => {
                return Err(PipelineError::config(format!(
                    "unknown ranking metric {other:?}"
                )))
            }
        };
        Ok(metric)
    }
}

impl fmt::Display for RankMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One model's metric row. Flat so it writes straight to CSV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub model: String,
    pub threshold: Option<f64>,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub mcc: f64,
    pub sensitivity: f64,
    pub specificity: f64,
    pub pr_auc: Option<f64>,
    pub roc_auc: Option<f64>,
    pub total_cost: Option<f64>,
}

impl ComparisonRow {
    pub fn value(&self, metric: RankMetric) -> Option<f64> {
        match metric {
            RankMetric::Accuracy => Some(self.accuracy),
            RankMetric::Precision => Some(self.precision),
            RankMetric::Recall => Some(self.recall),
            RankMetric::F1 => Some(self.f1),
            RankMetric::Mcc => Some(self.mcc),
            RankMetric::Specificity => Some(self.specificity),
            RankMetric::PrAuc => self.pr_auc,
            RankMetric::RocAuc => self.roc_auc,
            RankMetric::TotalCost => self.total_cost,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComparisonTable {
    pub rows: Vec<ComparisonRow>,
}

impl ComparisonTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows ordered best-first by `metric`; rows lacking the metric go last
    /// and equal rows keep their input order.
    pub fn ranked_by(&self, metric: RankMetric) -> ComparisonTable {
        let mut rows = self.rows.clone();
        rows.sort_by(|a, b| match (a.value(metric), b.value(metric)) {
            (Some(x), Some(y)) if metric.ascending() => x.total_cmp(&y),
            (Some(x), Some(y)) => y.total_cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });
        ComparisonTable { rows }
    }

    /// Print the table as a boxed summary block.
    pub fn log_summary(&self, title: &str) {
        let opt = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |x| format!("{x:.4}"));

        info!("╔══════════════════════════════════════════════════════════════════════════════╗");
        info!("║ {:<76} ║", title);
        info!("╠══════════════════════════════════════════════════════════════════════════════╣");
        info!(
            "║ {:<16} {:>7} {:>7} {:>7} {:>7} {:>7} {:>7} {:>7} {:>5} ║",
            "model", "prec", "recall", "f1", "mcc", "pr_auc", "roc_auc", "cost", ""
        );
        for row in &self.rows {
            info!(
                "║ {:<16} {:>7.4} {:>7.4} {:>7.4} {:>7.4} {:>7} {:>7} {:>7} {:>5} ║",
                row.model,
                row.precision,
                row.recall,
                row.f1,
                row.mcc,
                opt(row.pr_auc),
                opt(row.roc_auc),
                row.total_cost.map_or_else(|| "-".to_string(), |c| format!("{c:.1}")),
                ""
            );
        }
        info!("╚══════════════════════════════════════════════════════════════════════════════╝");
    }
}

/// Aggregates evaluation results into one comparison table.
#[derive(Debug, Clone, Copy)]
pub struct ComparisonReporter {
    decimals: i32,
}

impl ComparisonReporter {
    pub fn new() -> Self {
        Self {
            decimals: REPORT_DECIMALS,
        }
    }

    /// One row per result, named by the parallel `names`.
    pub fn compare<S: AsRef<str>>(
        &self,
        results: &[EvaluationResult],
        names: &[S],
    ) -> Result<ComparisonTable> {
        if results.len() != names.len() {
            return Err(PipelineError::schema(format!(
                "{} evaluation results but {} model names",
                results.len(),
                names.len()
            )));
        }

        let r = |v: f64| round_to(v, self.decimals);
        let rows = results
            .iter()
            .zip(names)
            .map(|(result, name)| {
                let m = result.metrics.rounded(self.decimals);
                ComparisonRow {
                    model: name.as_ref().to_string(),
                    threshold: result.threshold,
                    accuracy: m.accuracy,
                    precision: m.precision,
                    recall: m.recall,
                    f1: m.f1,
                    mcc: m.mcc,
                    sensitivity: m.sensitivity,
                    specificity: m.specificity,
                    pr_auc: m.pr_auc,
                    roc_auc: m.roc_auc,
                    total_cost: result.total_cost().map(r),
                }
            })
            .collect();
        Ok(ComparisonTable { rows })
    }
}

impl Default for ComparisonReporter {
    fn default() -> Self {
        Self::new()
    }
}
