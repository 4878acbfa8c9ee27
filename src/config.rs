//! Configuration management for the fraud modeling pipeline

use crate::error::PipelineError;
use crate::evaluation::cost::CostMatrix;
use crate::splitter::SplitProportions;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How amount-interaction components are chosen at fit time
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum InteractionSelection {
    /// The first N anonymized components in schema order
    #[default]
    FirstN,
    /// The N components most correlated (|r|) with the label on the training partition
    TopCorrelated,
}

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub split: SplitConfig,
    #[serde(default)]
    pub features: FeatureConfig,
    #[serde(default)]
    pub evaluation: EvaluationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Column naming of the input table
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct DataConfig {
    /// Binary label column
    #[serde(default = "default_label_column")]
    pub label_column: String,
    /// Raw elapsed-time column (seconds since the first transaction)
    #[serde(default = "default_time_column")]
    pub time_column: String,
    /// Raw transaction amount column
    #[serde(default = "default_amount_column")]
    pub amount_column: String,
    /// Name prefix of the anonymized components (V1, V2, ...)
    #[serde(default = "default_component_prefix")]
    pub component_prefix: String,
}

fn default_label_column() -> String {
    "Class".to_string()
}

fn default_time_column() -> String {
    "Time".to_string()
}

fn default_amount_column() -> String {
    "Amount".to_string()
}

fn default_component_prefix() -> String {
    "V".to_string()
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            label_column: default_label_column(),
            time_column: default_time_column(),
            amount_column: default_amount_column(),
            component_prefix: default_component_prefix(),
        }
    }
}

/// Stratified split configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct SplitConfig {
    pub train: f64,
    pub validation: f64,
    pub test: f64,
    /// Seed for the single permutation RNG
    pub seed: u64,
    /// Allowed deviation of a partition's fraud share, in percentage points
    #[serde(default = "default_tolerance_pp")]
    pub tolerance_pp: f64,
}

fn default_tolerance_pp() -> f64 {
    0.5
}

impl SplitConfig {
    pub fn proportions(&self) -> SplitProportions {
        SplitProportions::new(self.train, self.validation, self.test)
    }
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            train: 0.7,
            validation: 0.15,
            test: 0.15,
            seed: 42,
            tolerance_pp: default_tolerance_pp(),
        }
    }
}

/// Interaction feature configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct InteractionConfig {
    #[serde(default)]
    pub selection: InteractionSelection,
    /// Number of components multiplied with the amount (0 disables the stage)
    #[serde(default = "default_interaction_count")]
    pub count: usize,
}

fn default_interaction_count() -> usize {
    5
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            selection: InteractionSelection::FirstN,
            count: default_interaction_count(),
        }
    }
}

/// Feature pipeline stage switches and column roles
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct FeatureConfig {
    #[serde(default = "enabled")]
    pub temporal: bool,
    #[serde(default = "enabled")]
    pub amount: bool,
    #[serde(default)]
    pub interactions: InteractionConfig,
    #[serde(default = "enabled")]
    pub normalize: bool,
    #[serde(default = "enabled")]
    pub encode_categoricals: bool,
    #[serde(default = "enabled")]
    pub drop_zero_variance: bool,
}

fn enabled() -> bool {
    true
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            temporal: true,
            amount: true,
            interactions: InteractionConfig::default(),
            normalize: true,
            encode_categoricals: true,
            drop_zero_variance: true,
        }
    }
}

/// Per-outcome costs as written in the config file; every field is required
/// once the table is present.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct CostConfig {
    pub true_positive: Option<f64>,
    pub false_positive: Option<f64>,
    pub false_negative: Option<f64>,
    pub true_negative: Option<f64>,
}

impl CostConfig {
    pub fn to_cost_matrix(&self) -> Result<CostMatrix, PipelineError> {
        let field = |value: Option<f64>, name: &str| {
            value.ok_or_else(|| PipelineError::config(format!("cost matrix is missing {name}")))
        };
        Ok(CostMatrix::new(
            field(self.true_positive, "true_positive")?,
            field(self.false_positive, "false_positive")?,
            field(self.false_negative, "false_negative")?,
            field(self.true_negative, "true_negative")?,
        ))
    }
}

/// Evaluation configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct EvaluationConfig {
    /// Probability cut-off used when only probabilities are given
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    /// Thresholds evaluated by a sweep
    #[serde(default = "default_sweep_thresholds")]
    pub sweep_thresholds: Vec<f64>,
    /// Optional business cost per outcome class
    #[serde(default)]
    pub cost: Option<CostConfig>,
}

fn default_threshold() -> f64 {
    0.5
}

fn default_sweep_thresholds() -> Vec<f64> {
    vec![0.3, 0.4, 0.5, 0.6, 0.7]
}

impl EvaluationConfig {
    pub fn cost_matrix(&self) -> Result<Option<CostMatrix>, PipelineError> {
        self.cost.as_ref().map(CostConfig::to_cost_matrix).transpose()
    }
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            sweep_thresholds: default_sweep_thresholds(),
            cost: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default file
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/config.toml")
    }

    /// Load configuration from a specific path, with `FRAUD_PIPELINE__*` env overrides
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("FRAUD_PIPELINE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let app: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        app.validate()?;
        Ok(app)
    }

    /// Reject values the core would refuse later anyway.
    pub fn validate(&self) -> Result<(), PipelineError> {
        self.split.proportions().validate()?;
        if !(self.split.tolerance_pp >= 0.0) {
            return Err(PipelineError::config("split tolerance must be non-negative"));
        }
        let thresholds = std::iter::once(&self.evaluation.threshold)
            .chain(self.evaluation.sweep_thresholds.iter());
        for &t in thresholds {
            if !(0.0..=1.0).contains(&t) {
                return Err(PipelineError::config(format!(
                    "threshold {t} is outside [0, 1]"
                )));
            }
        }
        self.evaluation.cost_matrix()?;
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data: DataConfig::default(),
            split: SplitConfig::default(),
            features: FeatureConfig::default(),
            evaluation: EvaluationConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.data.label_column, "Class");
        assert_eq!(config.split.seed, 42);
        assert_eq!(config.split.tolerance_pp, 0.5);
        assert_eq!(config.features.interactions.count, 5);
        assert_eq!(config.features.interactions.selection, InteractionSelection::FirstN);
        assert_eq!(config.evaluation.threshold, 0.5);
        assert_eq!(config.evaluation.sweep_thresholds.len(), 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_cost_config_requires_all_fields() {
        let partial = CostConfig {
            true_positive: Some(0.0),
            false_positive: Some(1.0),
            false_negative: None,
            true_negative: Some(0.0),
        };
        assert!(matches!(
            partial.to_cost_matrix(),
            Err(PipelineError::Config(_))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_proportions() {
        let mut config = AppConfig::default();
        config.split.test = 0.3;
        assert!(matches!(config.validate(), Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[split]
train = 0.6
validation = 0.2
test = 0.2
seed = 7

[features.interactions]
selection = "top_correlated"
count = 3

[evaluation]
threshold = 0.4

[evaluation.cost]
true_positive = 0.0
false_positive = 1.0
false_negative = 5.0
true_negative = 0.0

[logging]
level = "debug"
format = "json"
"#
        )
        .unwrap();

        let config = AppConfig::load_from_path(file.path()).unwrap();
        assert_eq!(config.split.train, 0.6);
        assert_eq!(config.split.seed, 7);
        assert_eq!(config.split.tolerance_pp, 0.5);
        assert_eq!(
            config.features.interactions.selection,
            InteractionSelection::TopCorrelated
        );
        assert_eq!(config.features.interactions.count, 3);
        assert!(config.features.temporal);
        assert_eq!(config.evaluation.threshold, 0.4);
        let cost = config.evaluation.cost_matrix().unwrap().unwrap();
        assert_eq!(cost.false_negative, 5.0);
        assert_eq!(config.logging.format, "json");
    }
}
