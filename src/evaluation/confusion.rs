//! 2x2 confusion counts and the metrics derived from them.

use crate::types::Label;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome class of one (truth, prediction) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    TruePositive,
    FalsePositive,
    FalseNegative,
    TrueNegative,
}

impl Outcome {
    pub const ALL: [Outcome; 4] = [
        Outcome::TruePositive,
        Outcome::FalsePositive,
        Outcome::FalseNegative,
        Outcome::TrueNegative,
    ];

    pub fn of(truth: Label, predicted: Label) -> Self {
        match (truth.is_fraud(), predicted.is_fraud()) {
            (true, true) => Outcome::TruePositive,
            (false, true) => Outcome::FalsePositive,
            (true, false) => Outcome::FalseNegative,
            (false, false) => Outcome::TrueNegative,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::TruePositive => "true_positive",
            Outcome::FalsePositive => "false_positive",
            Outcome::FalseNegative => "false_negative",
            Outcome::TrueNegative => "true_negative",
        }
    }
}

/// One cell of the confusion matrix with its share of all observations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfusionCell {
    pub outcome: Outcome,
    pub count: usize,
    /// `count / total * 100`, rounded to 2 decimals
    pub percentage: f64,
}

/// Confusion counts for binary fraud classification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub tp: usize,
    pub fp: usize,
    #[serde(rename = "fn")]
    pub fn_: usize,
    pub tn: usize,
}

/// 0 when the denominator is 0.
fn ratio(num: f64, den: f64) -> f64 {
    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

impl ConfusionMatrix {
    pub fn from_labels(truth: &[Label], predicted: &[Label]) -> Self {
        let mut cm = Self::default();
        for (&t, &p) in truth.iter().zip(predicted) {
            match Outcome::of(t, p) {
                Outcome::TruePositive => cm.tp += 1,
                Outcome::FalsePositive => cm.fp += 1,
                Outcome::FalseNegative => cm.fn_ += 1,
                Outcome::TrueNegative => cm.tn += 1,
            }
        }
        cm
    }

    pub fn total(&self) -> usize {
        self.tp + self.fp + self.fn_ + self.tn
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        match outcome {
            Outcome::TruePositive => self.tp,
            Outcome::FalsePositive => self.fp,
            Outcome::FalseNegative => self.fn_,
            Outcome::TrueNegative => self.tn,
        }
    }

    /// The four cells with their percentage of all observations.
    pub fn cells(&self) -> Vec<ConfusionCell> {
        let total = self.total() as f64;
        Outcome::ALL
            .iter()
            .map(|&outcome| {
                let count = self.count(outcome);
                ConfusionCell {
                    outcome,
                    count,
                    percentage: round_to(ratio(count as f64, total) * 100.0, 2),
                }
            })
            .collect()
    }

    pub fn accuracy(&self) -> f64 {
        ratio((self.tp + self.tn) as f64, self.total() as f64)
    }

    pub fn precision(&self) -> f64 {
        ratio(self.tp as f64, (self.tp + self.fp) as f64)
    }

    /// Recall, equal to sensitivity.
    pub fn recall(&self) -> f64 {
        ratio(self.tp as f64, (self.tp + self.fn_) as f64)
    }

    pub fn sensitivity(&self) -> f64 {
        self.recall()
    }

    pub fn specificity(&self) -> f64 {
        ratio(self.tn as f64, (self.tn + self.fp) as f64)
    }

    pub fn f1(&self) -> f64 {
        let p = self.precision();
        let r = self.recall();
        ratio(2.0 * p * r, p + r)
    }

    /// Matthews correlation coefficient.
    pub fn mcc(&self) -> f64 {
        let (tp, fp, fn_, tn) = (
            self.tp as f64,
            self.fp as f64,
            self.fn_ as f64,
            self.tn as f64,
        );
        let den = ((tp + fp) * (tp + fn_) * (tn + fp) * (tn + fn_)).sqrt();
        ratio(tp * tn - fp * fn_, den)
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "                 Actual Fraud  Actual Non-Fraud")?;
        writeln!(f, "Pred Fraud       {:>12}  {:>16}", self.tp, self.fp)?;
        write!(f, "Pred Non-Fraud   {:>12}  {:>16}", self.fn_, self.tn)
    }
}
