//! Parameters learned by fitting a feature pipeline.

use crate::config::{DataConfig, FeatureConfig};
use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};

/// Location and spread of one column on the training partition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColumnStats {
    pub mean: f64,
    /// Sample standard deviation (n - 1)
    pub std: f64,
    /// All training values were identical
    pub constant: bool,
}

impl ColumnStats {
    pub fn from_values(values: &[f64]) -> Self {
        let n = values.len();
        let constant = values.windows(2).all(|w| w[0] == w[1]);
        if n == 0 || constant {
            return Self {
                mean: values.first().copied().unwrap_or(0.0),
                std: 0.0,
                constant: true,
            };
        }
        let mean = values.iter().sum::<f64>() / n as f64;
        let std = if n < 2 {
            0.0
        } else {
            let ss: f64 = values.iter().map(|x| (x - mean).powi(2)).sum();
            (ss / (n - 1) as f64).sqrt()
        };
        Self {
            mean,
            std,
            constant: false,
        }
    }

    /// `(x - mean) / std`, or 0 when the column has no spread.
    pub fn standardize(&self, x: f64) -> f64 {
        if self.std > 0.0 {
            (x - self.mean) / self.std
        } else {
            0.0
        }
    }
}

/// Indicator mapping of a categorical feature, fixed at fit time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryMapping {
    pub feature: String,
    /// Levels observed in training, in canonical order
    pub levels: Vec<String>,
}

impl CategoryMapping {
    pub fn indicator_names(&self) -> Vec<String> {
        self.levels
            .iter()
            .map(|level| format!("{}_{}", self.feature, level))
            .collect()
    }

    /// One indicator per known level; an unseen level encodes as all zeros.
    pub fn encode(&self, level: &str) -> Vec<f64> {
        self.levels
            .iter()
            .map(|known| if known == level { 1.0 } else { 0.0 })
            .collect()
    }

    pub fn knows(&self, level: &str) -> bool {
        self.levels.iter().any(|known| known == level)
    }
}

/// Immutable outcome of `FeaturePipeline::fit`, reused verbatim by every transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSpec {
    pub(crate) columns: DataConfig,
    pub(crate) stages: FeatureConfig,
    /// Schema every transformed dataset must arrive in
    pub(crate) input_columns: Vec<String>,
    pub(crate) interaction_components: Vec<String>,
    /// Training mean/scale of the raw amount, used for `amount_scaled`
    pub(crate) amount_scaling: Option<ColumnStats>,
    /// Every numeric predictor before pruning, in emission order
    pub(crate) numeric_columns: Vec<String>,
    /// Training statistics parallel to `numeric_columns`
    pub(crate) numeric_stats: Vec<ColumnStats>,
    pub(crate) categories: Vec<CategoryMapping>,
    pub(crate) dropped: Vec<String>,
    pub(crate) output_columns: Vec<String>,
}

impl FeatureSpec {
    pub fn input_columns(&self) -> &[String] {
        &self.input_columns
    }

    pub fn interaction_components(&self) -> &[String] {
        &self.interaction_components
    }

    pub fn amount_scaling(&self) -> Option<&ColumnStats> {
        self.amount_scaling.as_ref()
    }

    pub fn numeric_columns(&self) -> &[String] {
        &self.numeric_columns
    }

    /// Training statistics of a numeric predictor.
    pub fn stats(&self, column: &str) -> Option<&ColumnStats> {
        self.numeric_columns
            .iter()
            .position(|c| c == column)
            .map(|i| &self.numeric_stats[i])
    }

    pub fn categories(&self) -> &[CategoryMapping] {
        &self.categories
    }

    /// Columns pruned for zero training variance.
    pub fn dropped(&self) -> &[String] {
        &self.dropped
    }

    /// Exact column set, in order, of every transformed dataset.
    pub fn output_columns(&self) -> &[String] {
        &self.output_columns
    }

    pub fn stages(&self) -> &FeatureConfig {
        &self.stages
    }

    pub fn data_columns(&self) -> &DataConfig {
        &self.columns
    }

    /// Internal consistency check for specs loaded from storage.
    pub fn validate(&self) -> Result<()> {
        if self.numeric_columns.len() != self.numeric_stats.len() {
            return Err(PipelineError::schema(format!(
                "spec has {} numeric columns but {} statistics",
                self.numeric_columns.len(),
                self.numeric_stats.len()
            )));
        }
        let candidates: Vec<String> = self
            .numeric_columns
            .iter()
            .cloned()
            .chain(self.categories.iter().flat_map(CategoryMapping::indicator_names))
            .collect();
        for column in self.output_columns.iter().chain(self.dropped.iter()) {
            if !candidates.contains(column) {
                return Err(PipelineError::schema(format!(
                    "spec references unknown column {column:?}"
                )));
            }
        }
        let kept = candidates.iter().filter(|c| !self.dropped.contains(c));
        if self.output_columns.len() + self.dropped.len() != candidates.len()
            || !self.output_columns.iter().eq(kept)
        {
            return Err(PipelineError::schema(
                "spec output and dropped columns do not cover its predictors in order",
            ));
        }
        for component in &self.interaction_components {
            if !self.input_columns.contains(component) {
                return Err(PipelineError::schema(format!(
                    "interaction component {component:?} is not an input column"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_column_stats_sample_std() {
        let stats = ColumnStats::from_values(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_abs_diff_eq!(stats.mean, 5.0);
        assert_abs_diff_eq!(stats.std, (32.0f64 / 7.0).sqrt(), epsilon = 1e-12);
        assert!(!stats.constant);
        assert_abs_diff_eq!(stats.standardize(5.0), 0.0);
    }

    #[test]
    fn test_constant_column_standardizes_to_zero() {
        let stats = ColumnStats::from_values(&[0.1, 0.1, 0.1]);
        assert!(stats.constant);
        assert_eq!(stats.std, 0.0);
        assert_eq!(stats.standardize(0.1), 0.0);
        assert_eq!(stats.standardize(42.0), 0.0);
    }

    #[test]
    fn test_category_mapping_unseen_level() {
        let mapping = CategoryMapping {
            feature: "time_of_day".to_string(),
            levels: vec!["night".to_string(), "evening".to_string()],
        };
        assert_eq!(
            mapping.indicator_names(),
            vec!["time_of_day_night", "time_of_day_evening"]
        );
        assert_eq!(mapping.encode("evening"), vec![0.0, 1.0]);
        assert_eq!(mapping.encode("morning"), vec![0.0, 0.0]);
        assert!(!mapping.knows("morning"));
    }
}
