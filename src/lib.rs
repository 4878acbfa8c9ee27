//! Fraud Modeling Pipeline Library
//!
//! Data preparation and evaluation substrate for supervised fraud
//! classification on heavily imbalanced transaction data: a stratified
//! train/validation/test splitter, a fit-once feature pipeline, and an
//! imbalance-aware evaluation engine with business costs.

pub mod config;
pub mod error;
pub mod evaluation;
pub mod features;
pub mod io;
pub mod models;
pub mod report;
pub mod splitter;
pub mod types;

pub use config::AppConfig;
pub use error::PipelineError;
pub use evaluation::{CostMatrix, EvaluationEngine, EvaluationResult};
pub use features::{FeaturePipeline, FeatureSpec};
pub use models::Predictor;
pub use report::{ComparisonReporter, ComparisonTable, RankMetric};
pub use splitter::{split, verify_split, SplitOutcome, SplitProportions, SplitReport};
pub use types::{Dataset, Label, LabelColumn, Partition, PartitionRole};
