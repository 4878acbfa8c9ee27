//! Imbalance-aware evaluation of fraud predictions.

pub mod confusion;
pub mod cost;
pub mod curves;
pub mod engine;

pub use confusion::{ConfusionCell, ConfusionMatrix, Outcome};
pub use cost::{CostBreakdown, CostLine, CostMatrix};
pub use curves::{pr_auc, pr_curve, roc_auc, roc_curve, CurvePoint};
pub use engine::{apply_threshold, EvaluationEngine, EvaluationResult, Metrics, Observation};
