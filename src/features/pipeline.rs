//! Fit-once / apply-many feature pipeline.
//!
//! `fit` learns a [`FeatureSpec`] from the training partition only; every
//! `transform` afterwards applies that spec unchanged, so train, validation
//! and test come out with the same columns in the same order and scaled by
//! the same training statistics.
//!
//! Stages run in a fixed order:
//! 1. temporal decomposition of the elapsed-time column
//! 2. amount transforms (log1p, sqrt, training-scaled amount, magnitude bin)
//! 3. amount x component interactions
//! 4. normalization of every numeric predictor with training mean/std
//! 5. indicator encoding of the categorical derivations
//! 6. pruning of predictors with zero training variance

use crate::config::{DataConfig, FeatureConfig, InteractionSelection};
use crate::error::{PipelineError, Result};
use crate::features::spec::{CategoryMapping, ColumnStats, FeatureSpec};
use crate::features::stages::{self, AmountCategory, TimeOfDay};
use crate::types::{Dataset, Label, Record};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const TIME_OF_DAY: &str = "time_of_day";
pub const AMOUNT_CATEGORY: &str = "amount_category";

const TEMPORAL_COLUMNS: [&str; 3] = ["elapsed_hours", "hour_of_day", "day_index"];
const AMOUNT_COLUMNS: [&str; 3] = ["amount_log1p", "amount_sqrt", "amount_scaled"];

/// Input column positions the stages read, resolved against one schema.
#[derive(Debug, Clone)]
struct StagePlan {
    time: Option<usize>,
    amount: Option<usize>,
    amount_stage: bool,
    interactions: Vec<usize>,
    encode_categoricals: bool,
}

/// One row after stages 1-3.
struct DerivedRow {
    numeric: Vec<f64>,
    levels: Vec<&'static str>,
}

impl StagePlan {
    fn categorical_features(&self) -> Vec<&'static str> {
        let mut features = Vec::new();
        if self.encode_categoricals {
            if self.time.is_some() {
                features.push(TIME_OF_DAY);
            }
            if self.amount_stage {
                features.push(AMOUNT_CATEGORY);
            }
        }
        features
    }

    fn numeric_names(&self, input: &[String]) -> Vec<String> {
        let mut names = input.to_vec();
        if self.time.is_some() {
            names.extend(TEMPORAL_COLUMNS.iter().map(|s| s.to_string()));
        }
        if self.amount_stage {
            names.extend(AMOUNT_COLUMNS.iter().map(|s| s.to_string()));
        }
        names.extend(
            self.interactions
                .iter()
                .map(|&i| stages::interaction_name(&input[i])),
        );
        names
    }

    fn derive(&self, features: &[f64], amount_scaling: Option<&ColumnStats>) -> DerivedRow {
        let mut numeric = features.to_vec();
        let mut levels = Vec::with_capacity(2);

        if let Some(t) = self.time {
            let temporal = stages::temporal(features[t]);
            numeric.extend([
                temporal.elapsed_hours,
                temporal.hour_of_day,
                temporal.day_index,
            ]);
            if self.encode_categoricals {
                levels.push(temporal.time_of_day.as_str());
            }
        }

        if let (true, Some(a)) = (self.amount_stage, self.amount) {
            let raw = features[a];
            let derived = stages::amount(raw);
            let scaled = amount_scaling.map_or(0.0, |s| s.standardize(raw));
            numeric.extend([derived.log1p, derived.sqrt, scaled]);
            if self.encode_categoricals {
                levels.push(derived.category.as_str());
            }
        }

        if let Some(a) = self.amount {
            let components: Vec<f64> = self.interactions.iter().map(|&i| features[i]).collect();
            numeric.extend(stages::interactions(features[a], &components));
        }

        DerivedRow { numeric, levels }
    }
}

fn canonical_levels(feature: &str) -> Vec<&'static str> {
    match feature {
        TIME_OF_DAY => TimeOfDay::ALL.iter().map(|t| t.as_str()).collect(),
        AMOUNT_CATEGORY => AmountCategory::ALL.iter().map(|a| a.as_str()).collect(),
        _ => Vec::new(),
    }
}

fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
    let x = ColumnStats::from_values(xs);
    let y = ColumnStats::from_values(ys);
    if x.std == 0.0 || y.std == 0.0 || xs.len() < 2 {
        return 0.0;
    }
    let cov: f64 = xs
        .iter()
        .zip(ys)
        .map(|(a, b)| (a - x.mean) * (b - y.mean))
        .sum::<f64>()
        / (xs.len() - 1) as f64;
    cov / (x.std * y.std)
}

/// Two-phase feature pipeline. Unfitted pipelines refuse to transform.
#[derive(Debug, Clone)]
pub struct FeaturePipeline {
    columns: DataConfig,
    config: FeatureConfig,
    spec: Option<Arc<FeatureSpec>>,
}

impl FeaturePipeline {
    pub fn new(columns: DataConfig, config: FeatureConfig) -> Self {
        Self {
            columns,
            config,
            spec: None,
        }
    }

    /// Rebuild a fitted pipeline from a stored spec. The spec's numeric and
    /// categorical layout must be exactly what its stages derive from its
    /// input columns.
    pub fn from_spec(spec: FeatureSpec) -> Result<Self> {
        spec.validate()?;
        let plan = Self::plan_for(&spec)?;
        let expected = plan.numeric_names(&spec.input_columns);
        if expected != spec.numeric_columns {
            return Err(PipelineError::schema(format!(
                "spec numeric columns {:?} differ from the {:?} its stages derive",
                spec.numeric_columns, expected
            )));
        }
        let features: Vec<&str> = spec.categories.iter().map(|m| m.feature.as_str()).collect();
        if features != plan.categorical_features() {
            return Err(PipelineError::schema(format!(
                "spec categories {features:?} differ from the {:?} its stages derive",
                plan.categorical_features()
            )));
        }
        Ok(Self {
            columns: spec.columns.clone(),
            config: spec.stages.clone(),
            spec: Some(Arc::new(spec)),
        })
    }

    pub fn is_fitted(&self) -> bool {
        self.spec.is_some()
    }

    pub fn spec(&self) -> Option<&FeatureSpec> {
        self.spec.as_deref()
    }

    /// Learn a spec from `train` and return a fitted pipeline; `self` is left untouched.
    pub fn fit(&self, train: &Dataset) -> Result<FeaturePipeline> {
        let labels = train.labels()?;
        if train.is_empty() {
            return Err(PipelineError::schema("training partition is empty"));
        }

        let time = if self.config.temporal {
            Some(train.require_column(&self.columns.time_column)?)
        } else {
            None
        };
        let interactions = self.select_components(train, &labels);
        let amount = if self.config.amount || !interactions.is_empty() {
            Some(train.require_column(&self.columns.amount_column)?)
        } else {
            None
        };

        let plan = StagePlan {
            time,
            amount,
            amount_stage: self.config.amount,
            interactions,
            encode_categoricals: self.config.encode_categoricals,
        };

        let amount_scaling = match (plan.amount_stage, amount) {
            (true, Some(a)) => Some(ColumnStats::from_values(&train.column(a))),
            _ => None,
        };

        let derived: Vec<DerivedRow> = train
            .records()
            .iter()
            .map(|r| plan.derive(r.features(), amount_scaling.as_ref()))
            .collect();

        let numeric_columns = plan.numeric_names(train.feature_names());
        let numeric_stats: Vec<ColumnStats> = (0..numeric_columns.len())
            .map(|j| {
                let values: Vec<f64> = derived.iter().map(|d| d.numeric[j]).collect();
                ColumnStats::from_values(&values)
            })
            .collect();

        let categories: Vec<CategoryMapping> = plan
            .categorical_features()
            .into_iter()
            .enumerate()
            .map(|(k, feature)| {
                let levels = canonical_levels(feature)
                    .into_iter()
                    .filter(|level| derived.iter().any(|d| d.levels[k] == *level))
                    .map(str::to_string)
                    .collect();
                CategoryMapping {
                    feature: feature.to_string(),
                    levels,
                }
            })
            .collect();

        let mut dropped = Vec::new();
        let mut output_columns = Vec::new();
        for (name, stats) in numeric_columns.iter().zip(&numeric_stats) {
            if self.config.drop_zero_variance && stats.constant {
                dropped.push(name.clone());
            } else {
                output_columns.push(name.clone());
            }
        }
        for (k, mapping) in categories.iter().enumerate() {
            for (level, name) in mapping.levels.iter().zip(mapping.indicator_names()) {
                let values: Vec<f64> = derived
                    .iter()
                    .map(|d| if d.levels[k] == level.as_str() { 1.0 } else { 0.0 })
                    .collect();
                if self.config.drop_zero_variance && ColumnStats::from_values(&values).constant {
                    dropped.push(name);
                } else {
                    output_columns.push(name);
                }
            }
        }

        let spec = FeatureSpec {
            columns: self.columns.clone(),
            stages: self.config.clone(),
            input_columns: train.feature_names().to_vec(),
            interaction_components: plan
                .interactions
                .iter()
                .map(|&i| train.feature_names()[i].clone())
                .collect(),
            amount_scaling,
            numeric_columns,
            numeric_stats,
            categories,
            dropped,
            output_columns,
        };

        info!(
            rows = train.len(),
            inputs = spec.input_columns.len(),
            outputs = spec.output_columns.len(),
            dropped = spec.dropped.len(),
            interactions = ?spec.interaction_components,
            "Feature pipeline fitted"
        );

        Ok(FeaturePipeline {
            columns: self.columns.clone(),
            config: self.config.clone(),
            spec: Some(Arc::new(spec)),
        })
    }

    /// Apply the fitted spec to any dataset with the training schema.
    pub fn transform(&self, data: &Dataset) -> Result<Dataset> {
        let spec = self.spec.as_deref().ok_or_else(|| {
            PipelineError::not_fitted("transform called before fit")
        })?;

        if data.feature_names() != spec.input_columns.as_slice() {
            return Err(PipelineError::schema(format!(
                "expected input columns {:?}, got {:?}",
                spec.input_columns,
                data.feature_names()
            )));
        }

        let plan = Self::plan_for(spec)?;
        let keep_numeric: Vec<bool> = spec
            .numeric_columns
            .iter()
            .map(|c| !spec.dropped.contains(c))
            .collect();
        let keep_indicators: Vec<Vec<bool>> = spec
            .categories
            .iter()
            .map(|m| {
                m.indicator_names()
                    .iter()
                    .map(|c| !spec.dropped.contains(c))
                    .collect()
            })
            .collect();
        let level_slots: Vec<usize> = {
            let features = plan.categorical_features();
            spec.categories
                .iter()
                .map(|m| features.iter().position(|f| *f == m.feature))
                .collect::<Option<Vec<usize>>>()
                .ok_or_else(|| PipelineError::schema("spec categories do not match its stages"))?
        };

        let mut unseen = 0usize;
        let mut records = Vec::with_capacity(data.len());
        for record in data.records() {
            let derived = plan.derive(record.features(), spec.amount_scaling.as_ref());
            let mut out = Vec::with_capacity(spec.output_columns.len());

            for (j, &value) in derived.numeric.iter().enumerate() {
                if !keep_numeric[j] {
                    continue;
                }
                if spec.stages.normalize {
                    out.push(spec.numeric_stats[j].standardize(value));
                } else {
                    out.push(value);
                }
            }

            for ((mapping, keep), &slot) in spec.categories.iter().zip(&keep_indicators).zip(&level_slots) {
                let level = derived.levels[slot];
                if !mapping.knows(level) {
                    unseen += 1;
                }
                out.extend(
                    mapping
                        .encode(level)
                        .into_iter()
                        .zip(keep)
                        .filter(|(_, keep)| **keep)
                        .map(|(v, _)| v),
                );
            }

            records.push(Record::new(record.row_id(), out, record.label()));
        }

        if unseen > 0 {
            warn!(
                unseen,
                "Categories unseen during fit encoded as all-zero indicators"
            );
        }
        debug!(rows = data.len(), columns = spec.output_columns.len(), "Dataset transformed");

        Dataset::new(spec.output_columns.clone(), records)
    }

    /// Fit on `train` and transform it in one call.
    pub fn fit_transform(&self, train: &Dataset) -> Result<(FeaturePipeline, Dataset)> {
        let fitted = self.fit(train)?;
        let transformed = fitted.transform(train)?;
        Ok((fitted, transformed))
    }

    fn plan_for(spec: &FeatureSpec) -> Result<StagePlan> {
        let position = |name: &str| {
            spec.input_columns
                .iter()
                .position(|c| c == name)
                .ok_or_else(|| PipelineError::schema(format!("missing column {name:?}")))
        };
        let interactions = spec
            .interaction_components
            .iter()
            .map(|c| position(c.as_str()))
            .collect::<Result<Vec<usize>>>()?;
        let time = if spec.stages.temporal {
            Some(position(spec.columns.time_column.as_str())?)
        } else {
            None
        };
        let amount = if spec.stages.amount || !interactions.is_empty() {
            Some(position(spec.columns.amount_column.as_str())?)
        } else {
            None
        };
        Ok(StagePlan {
            time,
            amount,
            amount_stage: spec.stages.amount,
            interactions,
            encode_categoricals: spec.stages.encode_categoricals,
        })
    }

    /// Anonymized components multiplied with the amount, chosen on training data.
    fn select_components(&self, train: &Dataset, labels: &[Label]) -> Vec<usize> {
        let count = self.config.interactions.count;
        if count == 0 {
            return Vec::new();
        }
        let prefix = &self.columns.component_prefix;
        let candidates: Vec<usize> = train
            .feature_names()
            .iter()
            .enumerate()
            .filter(|(_, name)| {
                name.strip_prefix(prefix.as_str())
                    .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
            })
            .map(|(i, _)| i)
            .collect();

        if candidates.len() < count {
            warn!(
                requested = count,
                available = candidates.len(),
                prefix = %prefix,
                "Fewer anonymized components than requested interactions"
            );
        }

        match self.config.interactions.selection {
            InteractionSelection::FirstN => candidates.into_iter().take(count).collect(),
            InteractionSelection::TopCorrelated => {
                let target: Vec<f64> = labels.iter().map(|l| l.as_f64()).collect();
                let mut scored: Vec<(usize, f64)> = candidates
                    .into_iter()
                    .map(|i| {
                        let r = pearson(&train.column(i), &target).abs();
                        (i, if r.is_nan() { 0.0 } else { r })
                    })
                    .collect();
                scored.sort_by(|a, b| b.1.total_cmp(&a.1));
                scored.into_iter().take(count).map(|(i, _)| i).collect()
            }
        }
    }
}

impl Default for FeaturePipeline {
    fn default() -> Self {
        Self::new(DataConfig::default(), FeatureConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InteractionConfig;
    use crate::splitter::{split, SplitProportions};
    use approx::assert_abs_diff_eq;

    fn schema() -> Vec<String> {
        let mut names = vec!["Time".to_string()];
        names.extend((1..=6).map(|i| format!("V{i}")));
        names.push("Amount".to_string());
        names
    }

    /// 10% fraud; V4 tracks the label closely, the other components do not.
    fn transactions(n: usize) -> Dataset {
        Dataset::from_rows(
            schema(),
            (0..n).map(|i| {
                let fraud = i % 10 == 0;
                let mut row = vec![i as f64 * 600.0];
                for k in 1..=6usize {
                    let v = if k == 4 {
                        (if fraud { 5.0 } else { 0.0 }) + (i % 3) as f64 * 0.01
                    } else {
                        ((i * (k + 2)) % 17) as f64 - 8.0
                    };
                    row.push(v);
                }
                row.push(((i * 37) % 500) as f64 + 0.5);
                (row, Some(Label::from(fraud)))
            }),
        )
        .unwrap()
    }

    fn mean_std(values: &[f64]) -> (f64, f64) {
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
        (mean, var.sqrt())
    }

    fn is_indicator(name: &str) -> bool {
        name.starts_with("time_of_day_") || name.starts_with("amount_category_")
    }

    #[test]
    fn test_transform_before_fit_is_not_fitted() {
        let pipeline = FeaturePipeline::default();
        assert!(!pipeline.is_fitted());
        let err = pipeline.transform(&transactions(10)).unwrap_err();
        assert!(matches!(err, PipelineError::NotFitted(_)));
    }

    #[test]
    fn test_fit_requires_labels() {
        let unlabeled = Dataset::from_rows(schema(), vec![(vec![0.0; 8], None)]).unwrap();
        let err = FeaturePipeline::default().fit(&unlabeled).unwrap_err();
        assert!(matches!(err, PipelineError::Schema(_)));
    }

    #[test]
    fn test_fit_requires_stage_columns() {
        let names: Vec<String> = ["Time", "V1"].iter().map(|s| s.to_string()).collect();
        let ds = Dataset::from_rows(
            names,
            vec![
                (vec![0.0, 1.0], Some(Label::Fraud)),
                (vec![10.0, 2.0], Some(Label::NonFraud)),
            ],
        )
        .unwrap();

        let err = FeaturePipeline::default().fit(&ds).unwrap_err();
        assert!(matches!(err, PipelineError::Schema(_)));

        // without amount-dependent stages the same dataset fits
        let config = FeatureConfig {
            amount: false,
            interactions: InteractionConfig {
                count: 0,
                ..InteractionConfig::default()
            },
            ..FeatureConfig::default()
        };
        let fitted = FeaturePipeline::new(DataConfig::default(), config)
            .fit(&ds)
            .unwrap();
        assert!(fitted.is_fitted());
    }

    #[test]
    fn test_default_output_columns() {
        let fitted = FeaturePipeline::default().fit(&transactions(200)).unwrap();
        let spec = fitted.spec().unwrap();

        assert_eq!(spec.interaction_components(), &["V1", "V2", "V3", "V4", "V5"]);
        let expected_numeric: Vec<String> = schema()
            .into_iter()
            .chain(TEMPORAL_COLUMNS.iter().map(|s| s.to_string()))
            .chain(AMOUNT_COLUMNS.iter().map(|s| s.to_string()))
            .chain((1..=5).map(|i| format!("amount_x_V{i}")))
            .collect();
        assert_eq!(spec.numeric_columns(), expected_numeric.as_slice());

        let outputs = spec.output_columns();
        assert!(outputs.contains(&"time_of_day_night".to_string()));
        assert!(outputs.contains(&"time_of_day_evening".to_string()));
        assert!(outputs.contains(&"amount_category_medium".to_string()));
        assert!(!outputs.contains(&"amount_category_very_large".to_string()));
        assert!(spec.dropped().is_empty());
    }

    #[test]
    fn test_column_sets_match_across_partitions() {
        let ds = transactions(400);
        let out = split(&ds, SplitProportions::default(), 11).unwrap();
        let fitted = FeaturePipeline::default().fit(&out.train).unwrap();

        let train = fitted.transform(&out.train).unwrap();
        let validation = fitted.transform(&out.validation).unwrap();
        let test = fitted.transform(&out.test).unwrap();

        assert_eq!(train.feature_names(), validation.feature_names());
        assert_eq!(train.feature_names(), test.feature_names());
        assert_eq!(train.feature_names(), fitted.spec().unwrap().output_columns());
        assert_eq!(validation.row_ids(), out.validation.row_ids());
        assert_eq!(validation.labels().unwrap(), out.validation.labels().unwrap());
    }

    #[test]
    fn test_training_partition_is_standardized() {
        let ds = transactions(300);
        let (_, train) = FeaturePipeline::default().fit_transform(&ds).unwrap();

        for (j, name) in train.feature_names().iter().enumerate() {
            if is_indicator(name) {
                continue;
            }
            let (mean, std) = mean_std(&train.column(j));
            assert_abs_diff_eq!(mean, 0.0, epsilon = 1e-9);
            assert_abs_diff_eq!(std, 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_transform_reuses_training_statistics() {
        let ds = transactions(400);
        let out = split(&ds, SplitProportions::default(), 3).unwrap();
        let fitted = FeaturePipeline::default().fit(&out.train).unwrap();
        let spec = fitted.spec().unwrap();

        let raw_amounts = out.test.column(out.test.require_column("Amount").unwrap());
        let train_stats = ColumnStats::from_values(
            &out.train.column(out.train.require_column("Amount").unwrap()),
        );
        assert_eq!(spec.stats("Amount").unwrap(), &train_stats);

        let test = fitted.transform(&out.test).unwrap();
        let col = test.require_column("Amount").unwrap();
        for (raw, transformed) in raw_amounts.iter().zip(test.column(col)) {
            assert_abs_diff_eq!(
                transformed,
                (raw - train_stats.mean) / train_stats.std,
                epsilon = 1e-12
            );
        }

        // amount_scaled uses the training amount scale too
        let scaling = spec.amount_scaling().unwrap();
        assert_eq!(scaling.mean, train_stats.mean);
    }

    #[test]
    fn test_unseen_category_encodes_as_zeros() {
        // training only covers the first twelve hours of one day
        let train = Dataset::from_rows(
            schema(),
            (0..60).map(|i| {
                let mut row = vec![(i % 12) as f64 * 3600.0 + 60.0];
                row.extend((1..=6).map(|k| ((i * k) % 7) as f64));
                row.push(20.0 + i as f64);
                (row, Some(Label::from(i % 5 == 0)))
            }),
        )
        .unwrap();
        let fitted = FeaturePipeline::default().fit(&train).unwrap();
        let spec = fitted.spec().unwrap();
        let tod = spec
            .categories()
            .iter()
            .find(|m| m.feature == TIME_OF_DAY)
            .unwrap();
        assert_eq!(tod.levels, vec!["night".to_string(), "morning".to_string()]);
        assert!(spec.dropped().contains(&"day_index".to_string()));

        let mut evening = vec![20.0 * 3600.0];
        evening.extend([1.0; 6]);
        evening.push(30.0);
        let scoring = Dataset::from_rows(schema(), vec![(evening, None)]).unwrap();
        let out = fitted.transform(&scoring).unwrap();
        assert_eq!(out.feature_names(), spec.output_columns());

        let row = out.records()[0].features();
        for name in ["time_of_day_night", "time_of_day_morning"] {
            let j = out.require_column(name).unwrap();
            assert_eq!(row[j], 0.0);
        }
        assert_eq!(out.records()[0].label(), None);
    }

    #[test]
    fn test_zero_variance_columns_dropped_everywhere() {
        let constant_v6 = |n: usize, v6: f64| {
            Dataset::from_rows(
                schema(),
                (0..n).map(move |i| {
                    let mut row = vec![i as f64 * 900.0];
                    row.extend((1..=5).map(|k| ((i * k) % 11) as f64));
                    row.push(v6 + if v6 == 0.0 { 0.0 } else { i as f64 });
                    row.push(15.0 + (i % 40) as f64);
                    (row, Some(Label::from(i % 4 == 0)))
                }),
            )
            .unwrap()
        };
        let train = constant_v6(80, 0.0);
        let test = constant_v6(20, 1.0);

        let fitted = FeaturePipeline::default().fit(&train).unwrap();
        let spec = fitted.spec().unwrap();
        assert!(spec.dropped().contains(&"V6".to_string()));

        let transformed = fitted.transform(&test).unwrap();
        assert!(transformed.column_index("V6").is_none());
        assert_eq!(transformed.feature_names(), spec.output_columns());
    }

    #[test]
    fn test_top_correlated_interactions() {
        let config = FeatureConfig {
            interactions: InteractionConfig {
                selection: InteractionSelection::TopCorrelated,
                count: 2,
            },
            ..FeatureConfig::default()
        };
        let fitted = FeaturePipeline::new(DataConfig::default(), config)
            .fit(&transactions(300))
            .unwrap();
        let components = fitted.spec().unwrap().interaction_components();
        assert_eq!(components.len(), 2);
        assert_eq!(components[0], "V4");
    }

    #[test]
    fn test_transform_rejects_other_schema() {
        let fitted = FeaturePipeline::default().fit(&transactions(50)).unwrap();
        let other = Dataset::from_rows(
            vec!["Amount".to_string(), "Time".to_string()],
            vec![(vec![1.0, 2.0], None)],
        )
        .unwrap();
        assert!(matches!(
            fitted.transform(&other),
            Err(PipelineError::Schema(_))
        ));
    }

    #[test]
    fn test_spec_survives_serialization() {
        let ds = transactions(120);
        let fitted = FeaturePipeline::default().fit(&ds).unwrap();
        let json = serde_json::to_string(fitted.spec().unwrap()).unwrap();
        let spec: FeatureSpec = serde_json::from_str(&json).unwrap();

        let restored = FeaturePipeline::from_spec(spec).unwrap();
        assert_eq!(restored.transform(&ds).unwrap(), fitted.transform(&ds).unwrap());
    }

    #[test]
    fn test_from_spec_rejects_layout_inconsistent_with_stages() {
        let config = FeatureConfig {
            temporal: false,
            ..FeatureConfig::default()
        };
        let fitted = FeaturePipeline::new(DataConfig::default(), config)
            .fit(&transactions(100))
            .unwrap();
        let mut json: serde_json::Value = serde_json::to_value(fitted.spec().unwrap()).unwrap();
        json["stages"]["temporal"] = serde_json::Value::Bool(true);
        let tampered: FeatureSpec = serde_json::from_value(json).unwrap();
        assert!(matches!(
            FeaturePipeline::from_spec(tampered),
            Err(PipelineError::Schema(_))
        ));

        let mut json: serde_json::Value = serde_json::to_value(fitted.spec().unwrap()).unwrap();
        json["stages"]["encode_categoricals"] = serde_json::Value::Bool(false);
        let tampered: FeatureSpec = serde_json::from_value(json).unwrap();
        assert!(matches!(
            FeaturePipeline::from_spec(tampered),
            Err(PipelineError::Schema(_))
        ));
    }

    #[test]
    fn test_encoding_disabled_emits_no_indicators() {
        let config = FeatureConfig {
            encode_categoricals: false,
            ..FeatureConfig::default()
        };
        let ds = transactions(200);
        let (fitted, train) = FeaturePipeline::new(DataConfig::default(), config)
            .fit_transform(&ds)
            .unwrap();
        let spec = fitted.spec().unwrap();
        assert!(spec.categories().is_empty());
        assert!(!train.feature_names().iter().any(|n| is_indicator(n)));
        // the numeric temporal and amount derivations are still emitted
        assert!(train.column_index("hour_of_day").is_some());
        assert!(train.column_index("amount_log1p").is_some());
        assert_eq!(train.feature_names(), spec.numeric_columns());
    }

    #[test]
    fn test_normalization_disabled_passes_raw_values() {
        let config = FeatureConfig {
            normalize: false,
            ..FeatureConfig::default()
        };
        let train = Dataset::from_rows(
            schema(),
            (0..40).map(|i| {
                let mut row = vec![i as f64 * 900.0];
                row.extend((1..=5).map(|k| ((i * k) % 9) as f64));
                row.push(2.5);
                row.push(10.0 + i as f64);
                (row, Some(Label::from(i % 4 == 0)))
            }),
        )
        .unwrap();
        let (fitted, out) = FeaturePipeline::new(DataConfig::default(), config)
            .fit_transform(&train)
            .unwrap();

        // constant V6 is still pruned
        assert!(fitted.spec().unwrap().dropped().contains(&"V6".to_string()));
        assert!(out.column_index("V6").is_none());

        let amount = out.column(out.require_column("Amount").unwrap());
        assert_eq!(amount, train.column(train.require_column("Amount").unwrap()));
        let log1p = out.column(out.require_column("amount_log1p").unwrap());
        assert_abs_diff_eq!(log1p[3], 13.0f64.ln_1p(), epsilon = 1e-12);
    }

    #[test]
    fn test_pruning_disabled_keeps_constant_columns_at_zero() {
        let config = FeatureConfig {
            drop_zero_variance: false,
            ..FeatureConfig::default()
        };
        let rows = |n: usize, v6: f64| {
            Dataset::from_rows(
                schema(),
                (0..n).map(move |i| {
                    let mut row = vec![i as f64 * 700.0];
                    row.extend((1..=5).map(|k| ((i * k) % 13) as f64));
                    row.push(v6);
                    row.push(30.0 + (i % 25) as f64);
                    (row, Some(Label::from(i % 5 == 0)))
                }),
            )
            .unwrap()
        };
        let fitted = FeaturePipeline::new(DataConfig::default(), config)
            .fit(&rows(60, 0.7))
            .unwrap();
        let spec = fitted.spec().unwrap();
        assert!(spec.dropped().is_empty());
        assert!(spec.stats("V6").unwrap().constant);

        // a scoring value away from the training constant still maps to 0
        let out = fitted.transform(&rows(10, 4.0)).unwrap();
        let v6 = out.column(out.require_column("V6").unwrap());
        assert!(v6.iter().all(|&v| v == 0.0));
        assert_eq!(out.feature_names(), spec.output_columns());
    }

    #[test]
    fn test_fit_leaves_original_unfitted() {
        let pipeline = FeaturePipeline::default();
        let _fitted = pipeline.fit(&transactions(30)).unwrap();
        assert!(!pipeline.is_fitted());
    }
}
