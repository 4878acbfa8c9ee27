//! Business cost of a confusion matrix.

use super::confusion::{ConfusionMatrix, Outcome};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unit cost per outcome class, supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostMatrix {
    pub true_positive: f64,
    pub false_positive: f64,
    pub false_negative: f64,
    pub true_negative: f64,
}

impl CostMatrix {
    pub fn new(
        true_positive: f64,
        false_positive: f64,
        false_negative: f64,
        true_negative: f64,
    ) -> Self {
        Self {
            true_positive,
            false_positive,
            false_negative,
            true_negative,
        }
    }

    pub fn unit_cost(&self, outcome: Outcome) -> f64 {
        match outcome {
            Outcome::TruePositive => self.true_positive,
            Outcome::FalsePositive => self.false_positive,
            Outcome::FalseNegative => self.false_negative,
            Outcome::TrueNegative => self.true_negative,
        }
    }

    /// Per-outcome subtotals and their sum.
    pub fn breakdown(&self, confusion: &ConfusionMatrix) -> CostBreakdown {
        let lines: Vec<CostLine> = Outcome::ALL
            .iter()
            .map(|&outcome| {
                let count = confusion.count(outcome);
                let unit_cost = self.unit_cost(outcome);
                CostLine {
                    outcome,
                    count,
                    unit_cost,
                    subtotal: count as f64 * unit_cost,
                }
            })
            .collect();
        let total = lines.iter().map(|line| line.subtotal).sum();
        CostBreakdown { lines, total }
    }

    pub fn total(&self, confusion: &ConfusionMatrix) -> f64 {
        self.breakdown(confusion).total
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostLine {
    pub outcome: Outcome,
    pub count: usize,
    pub unit_cost: f64,
    pub subtotal: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub lines: Vec<CostLine>,
    pub total: f64,
}

impl fmt::Display for CostBreakdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<16} {:>8} {:>10} {:>12}", "outcome", "count", "unit", "subtotal")?;
        for line in &self.lines {
            writeln!(
                f,
                "{:<16} {:>8} {:>10.2} {:>12.2}",
                line.outcome.as_str(),
                line.count,
                line.unit_cost,
                line.subtotal
            )?;
        }
        write!(f, "{:<16} {:>8} {:>10} {:>12.2}", "total", "", "", self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_cost_of_one_each() {
        let confusion = ConfusionMatrix {
            tp: 1,
            fp: 1,
            fn_: 1,
            tn: 1,
        };
        let cost = CostMatrix::new(0.0, 1.0, 5.0, 0.0);
        let breakdown = cost.breakdown(&confusion);

        assert_eq!(breakdown.total, 6.0);
        assert_eq!(breakdown.lines.len(), 4);
        let missed = &breakdown.lines[2];
        assert_eq!(missed.outcome, Outcome::FalseNegative);
        assert_eq!((missed.count, missed.unit_cost, missed.subtotal), (1, 5.0, 5.0));
    }

    #[test]
    fn test_reward_as_negative_cost() {
        let confusion = ConfusionMatrix {
            tp: 10,
            fp: 4,
            fn_: 2,
            tn: 100,
        };
        // caught fraud recovers 50 per case
        let cost = CostMatrix::new(-50.0, 2.0, 120.0, 0.0);
        assert_eq!(cost.total(&confusion), -500.0 + 8.0 + 240.0);
    }

    #[test]
    fn test_breakdown_display_lists_every_outcome() {
        let cost = CostMatrix::new(0.0, 1.0, 5.0, 0.0);
        let text = cost.breakdown(&ConfusionMatrix::default()).to_string();
        for outcome in Outcome::ALL {
            assert!(text.contains(outcome.as_str()));
        }
        assert!(text.contains("total"));
    }
}
