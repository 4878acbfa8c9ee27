//! Stratified, leakage-safe train/validation/test splitting.
//!
//! A three-way stratified split is built from two sequential binary splits:
//! the full dataset is split into train and a remainder, then the remainder is
//! split into validation and test with the proportion adjusted to the
//! remainder's size. Each class is sampled independently without replacement
//! from one seeded permutation stream shared by both splits.

use crate::error::{PipelineError, Result};
use crate::types::{Dataset, Label, Partition, PartitionRole};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Tolerance on the sum of the three proportions.
pub const PROPORTION_TOLERANCE: f64 = 1e-6;

/// Default allowed deviation of a partition's fraud share, in percentage points.
pub const DEFAULT_TOLERANCE_PP: f64 = 0.5;

/// Target fractions of the three partitions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitProportions {
    pub train: f64,
    pub validation: f64,
    pub test: f64,
}

impl SplitProportions {
    pub fn new(train: f64, validation: f64, test: f64) -> Self {
        Self {
            train,
            validation,
            test,
        }
    }

    /// All three must be positive and sum to 1 within [`PROPORTION_TOLERANCE`].
    pub fn validate(&self) -> Result<()> {
        let parts = [
            ("train", self.train),
            ("validation", self.validation),
            ("test", self.test),
        ];
        for (name, p) in parts {
            if !(p.is_finite() && p > 0.0) {
                return Err(PipelineError::config(format!(
                    "{name} proportion must be positive, got {p}"
                )));
            }
        }
        let sum = self.train + self.validation + self.test;
        if (sum - 1.0).abs() > PROPORTION_TOLERANCE {
            return Err(PipelineError::config(format!(
                "proportions must sum to 1.0, got {sum}"
            )));
        }
        Ok(())
    }

    /// Fraction of the remainder assigned to validation in the second split.
    pub fn adjusted_validation(&self) -> f64 {
        self.validation / (self.validation + self.test)
    }
}

impl Default for SplitProportions {
    fn default() -> Self {
        Self::new(0.7, 0.15, 0.15)
    }
}

/// The three disjoint partitions of one split.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitOutcome {
    pub train: Partition,
    pub validation: Partition,
    pub test: Partition,
}

impl SplitOutcome {
    pub fn partitions(&self) -> [&Partition; 3] {
        [&self.train, &self.validation, &self.test]
    }
}

/// Split `dataset` into stratified train, validation and test partitions.
///
/// Identical `seed` and inputs reproduce identical partitions. The input is
/// never mutated; partitions keep the dataset's record order.
pub fn split(dataset: &Dataset, proportions: SplitProportions, seed: u64) -> Result<SplitOutcome> {
    proportions.validate()?;
    let labels = dataset.labels()?;

    let mut rng = StdRng::seed_from_u64(seed);
    let all: Vec<usize> = (0..dataset.len()).collect();

    let (train_pos, remainder) = stratified_binary_split(&all, &labels, proportions.train, &mut rng);
    let (val_pos, test_pos) = stratified_binary_split(
        &remainder,
        &labels,
        proportions.adjusted_validation(),
        &mut rng,
    );

    let outcome = SplitOutcome {
        train: Partition::new(PartitionRole::Train, dataset.select(&train_pos)),
        validation: Partition::new(PartitionRole::Validation, dataset.select(&val_pos)),
        test: Partition::new(PartitionRole::Test, dataset.select(&test_pos)),
    };

    info!(
        seed,
        rows = dataset.len(),
        train = outcome.train.len(),
        validation = outcome.validation.len(),
        test = outcome.test.len(),
        "Dataset split"
    );

    Ok(outcome)
}

/// Split `positions` into (selected, rest) with `fraction` of every class in
/// `selected`. Both halves come back in ascending position order.
fn stratified_binary_split(
    positions: &[usize],
    labels: &[Label],
    fraction: f64,
    rng: &mut StdRng,
) -> (Vec<usize>, Vec<usize>) {
    let mut selected = Vec::new();
    let mut rest = Vec::new();

    for class in Label::ALL {
        let mut members: Vec<usize> = positions
            .iter()
            .copied()
            .filter(|&p| labels[p] == class)
            .collect();
        let take = ((members.len() as f64) * fraction).round() as usize;
        members.shuffle(rng);

        debug!(class = %class, members = members.len(), take, "Stratum sampled");

        let (chosen, left) = members.split_at(take.min(members.len()));
        selected.extend_from_slice(chosen);
        rest.extend_from_slice(left);
    }

    selected.sort_unstable();
    rest.sort_unstable();
    (selected, rest)
}

/// Class balance of one partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionSummary {
    pub role: PartitionRole,
    pub rows: usize,
    pub positives: usize,
    pub positive_pct: f64,
    /// Absolute deviation from the overall fraud share, in percentage points
    pub deviation_pp: f64,
}

/// Diagnostic raised when a partition drifts from the overall class balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitWarning {
    pub role: PartitionRole,
    pub positive_pct: f64,
    pub overall_pct: f64,
    pub deviation_pp: f64,
    pub tolerance_pp: f64,
}

/// Post-split diagnostics. Never blocks downstream use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitReport {
    pub total_rows: usize,
    pub overall_positive_pct: f64,
    pub tolerance_pp: f64,
    pub partitions: Vec<PartitionSummary>,
    /// No record appears in two partitions
    pub disjoint: bool,
    /// Every record of the dataset appears in some partition
    pub exhaustive: bool,
    pub warnings: Vec<SplitWarning>,
}

impl SplitReport {
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Compare each partition's fraud share to the dataset's.
///
/// Deviations beyond `tolerance_pp` are logged and collected as warnings.
pub fn verify_split(dataset: &Dataset, outcome: &SplitOutcome, tolerance_pp: f64) -> SplitReport {
    let overall = dataset.positive_pct();
    let mut partitions = Vec::with_capacity(3);
    let mut warnings = Vec::new();

    for part in outcome.partitions() {
        let pct = part.positive_pct();
        let deviation = (pct - overall).abs();
        if deviation > tolerance_pp {
            warn!(
                partition = %part.role(),
                positive_pct = pct,
                overall_pct = overall,
                deviation_pp = deviation,
                tolerance_pp,
                "Partition class balance deviates from dataset"
            );
            warnings.push(SplitWarning {
                role: part.role(),
                positive_pct: pct,
                overall_pct: overall,
                deviation_pp: deviation,
                tolerance_pp,
            });
        }
        partitions.push(PartitionSummary {
            role: part.role(),
            rows: part.len(),
            positives: part.positive_count(),
            positive_pct: pct,
            deviation_pp: deviation,
        });
    }

    let mut seen = HashSet::with_capacity(dataset.len());
    let mut disjoint = true;
    for part in outcome.partitions() {
        for id in part.row_ids() {
            if !seen.insert(id) {
                disjoint = false;
            }
        }
    }
    let exhaustive = dataset.row_ids().iter().all(|id| seen.contains(id))
        && seen.len() == dataset.len();

    if !disjoint || !exhaustive {
        warn!(disjoint, exhaustive, "Partitions do not tile the dataset");
    }

    SplitReport {
        total_rows: dataset.len(),
        overall_positive_pct: overall,
        tolerance_pp,
        partitions,
        disjoint,
        exhaustive,
        warnings,
    }
}
