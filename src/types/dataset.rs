//! Tabular transaction data: records, datasets and role-tagged partitions.

use crate::error::{PipelineError, Result};
use crate::types::label::Label;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

/// One transaction: a fixed-width numeric feature vector and an optional label.
///
/// `row_id` is the record's position in the dataset it was loaded from and is
/// preserved through splitting and transformation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    row_id: usize,
    features: Vec<f64>,
    label: Option<Label>,
}

impl Record {
    pub fn new(row_id: usize, features: Vec<f64>, label: Option<Label>) -> Self {
        Self {
            row_id,
            features,
            label,
        }
    }

    pub fn row_id(&self) -> usize {
        self.row_id
    }

    pub fn features(&self) -> &[f64] {
        &self.features
    }

    pub fn label(&self) -> Option<Label> {
        self.label
    }
}

/// Ordered records sharing one schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    feature_names: Vec<String>,
    records: Vec<Record>,
}

impl Dataset {
    /// Build a dataset, rejecting any record whose width differs from the schema.
    pub fn new(feature_names: Vec<String>, records: Vec<Record>) -> Result<Self> {
        let width = feature_names.len();
        if let Some(bad) = records.iter().find(|r| r.features.len() != width) {
            return Err(PipelineError::schema(format!(
                "record {} has {} features, schema has {}",
                bad.row_id,
                bad.features.len(),
                width
            )));
        }
        Ok(Self {
            feature_names,
            records,
        })
    }

    /// Build a dataset from raw rows, numbering them from zero.
    pub fn from_rows(
        feature_names: Vec<String>,
        rows: impl IntoIterator<Item = (Vec<f64>, Option<Label>)>,
    ) -> Result<Self> {
        let records = rows
            .into_iter()
            .enumerate()
            .map(|(i, (features, label))| Record::new(i, features, label))
            .collect();
        Self::new(feature_names, records)
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn width(&self) -> usize {
        self.feature_names.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.feature_names.iter().position(|n| n == name)
    }

    /// Index of a column that must exist.
    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| PipelineError::schema(format!("missing column {name:?}")))
    }

    /// Values of one column in record order.
    pub fn column(&self, index: usize) -> Vec<f64> {
        self.records.iter().map(|r| r.features[index]).collect()
    }

    pub fn row_ids(&self) -> Vec<usize> {
        self.records.iter().map(|r| r.row_id).collect()
    }

    /// True when every record carries a label.
    pub fn is_labeled(&self) -> bool {
        self.records.iter().all(|r| r.label.is_some())
    }

    /// All labels; fails if any record is unlabeled.
    pub fn labels(&self) -> Result<Vec<Label>> {
        self.records
            .iter()
            .map(|r| {
                r.label.ok_or_else(|| {
                    PipelineError::schema(format!("record {} has no label", r.row_id))
                })
            })
            .collect()
    }

    pub fn positive_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.label == Some(Label::Fraud))
            .count()
    }

    /// Fraud share of the dataset in percent (0 for an empty dataset).
    pub fn positive_pct(&self) -> f64 {
        if self.records.is_empty() {
            return 0.0;
        }
        self.positive_count() as f64 / self.records.len() as f64 * 100.0
    }

    /// New dataset holding the records at `positions`, in the given order.
    pub(crate) fn select(&self, positions: &[usize]) -> Dataset {
        Dataset {
            feature_names: self.feature_names.clone(),
            records: positions.iter().map(|&p| self.records[p].clone()).collect(),
        }
    }
}

/// Role of a partition produced by the splitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartitionRole {
    Train,
    Validation,
    Test,
}

impl fmt::Display for PartitionRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PartitionRole::Train => "train",
            PartitionRole::Validation => "validation",
            PartitionRole::Test => "test",
        };
        f.write_str(name)
    }
}

/// A dataset tagged with its role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Partition {
    role: PartitionRole,
    data: Dataset,
}

impl Partition {
    pub fn new(role: PartitionRole, data: Dataset) -> Self {
        Self { role, data }
    }

    pub fn role(&self) -> PartitionRole {
        self.role
    }

    pub fn dataset(&self) -> &Dataset {
        &self.data
    }

    pub fn into_dataset(self) -> Dataset {
        self.data
    }
}

impl Deref for Partition {
    type Target = Dataset;

    fn deref(&self) -> &Dataset {
        &self.data
    }
}
