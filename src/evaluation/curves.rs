//! ROC and precision-recall curves traced by sweeping the decision threshold,
//! integrated with the trapezoidal rule.

use crate::types::Label;
use serde::{Deserialize, Serialize};

/// One point of a swept curve. For ROC `x` is the false-positive rate and `y`
/// the true-positive rate; for PR `x` is recall and `y` precision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub threshold: f64,
    pub x: f64,
    pub y: f64,
}

/// Cumulative (threshold, tp, fp) after admitting every score >= threshold,
/// one entry per distinct score in descending order.
fn sweep(truth: &[Label], scores: &[f64]) -> Vec<(f64, usize, usize)> {
    let mut order: Vec<usize> = (0..truth.len().min(scores.len())).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

    let mut steps = Vec::new();
    let (mut tp, mut fp) = (0usize, 0usize);
    for (k, &i) in order.iter().enumerate() {
        if truth[i].is_fraud() {
            tp += 1;
        } else {
            fp += 1;
        }
        let last_of_group = order
            .get(k + 1)
            .map_or(true, |&next| scores[next] != scores[i]);
        if last_of_group {
            steps.push((scores[i], tp, fp));
        }
    }
    steps
}

fn class_counts(truth: &[Label]) -> (usize, usize) {
    let positives = truth.iter().filter(|l| l.is_fraud()).count();
    (positives, truth.len() - positives)
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// ROC points from (0, 0) through every distinct threshold.
pub fn roc_curve(truth: &[Label], scores: &[f64]) -> Vec<CurvePoint> {
    let (positives, negatives) = class_counts(truth);
    std::iter::once(CurvePoint {
        threshold: f64::INFINITY,
        x: 0.0,
        y: 0.0,
    })
    .chain(sweep(truth, scores).into_iter().map(|(threshold, tp, fp)| CurvePoint {
        threshold,
        x: ratio(fp, negatives),
        y: ratio(tp, positives),
    }))
    .collect()
}

/// Precision-recall points anchored at (recall 0, precision 1).
pub fn pr_curve(truth: &[Label], scores: &[f64]) -> Vec<CurvePoint> {
    let (positives, _) = class_counts(truth);
    std::iter::once(CurvePoint {
        threshold: f64::INFINITY,
        x: 0.0,
        y: 1.0,
    })
    .chain(sweep(truth, scores).into_iter().map(|(threshold, tp, fp)| CurvePoint {
        threshold,
        x: ratio(tp, positives),
        y: ratio(tp, tp + fp),
    }))
    .collect()
}

/// Trapezoidal area under consecutive points.
pub fn trapezoid(points: &[CurvePoint]) -> f64 {
    points
        .windows(2)
        .map(|w| (w[1].x - w[0].x) * (w[0].y + w[1].y) / 2.0)
        .sum()
}

/// Area under the ROC curve; 0 when truth holds a single class.
pub fn roc_auc(truth: &[Label], scores: &[f64]) -> f64 {
    let (positives, negatives) = class_counts(truth);
    if positives == 0 || negatives == 0 {
        return 0.0;
    }
    trapezoid(&roc_curve(truth, scores))
}

/// Area under the precision-recall curve; 0 when truth holds no fraud.
pub fn pr_auc(truth: &[Label], scores: &[f64]) -> f64 {
    let (positives, _) = class_counts(truth);
    if positives == 0 {
        return 0.0;
    }
    trapezoid(&pr_curve(truth, scores))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use crate::types::Label::{Fraud, NonFraud};

    #[test]
    fn test_perfect_separator() {
        let truth = [Fraud, NonFraud, Fraud, NonFraud, NonFraud];
        let scores = [1.0, 0.0, 1.0, 0.0, 0.0];
        assert_eq!(roc_auc(&truth, &scores), 1.0);
        assert_eq!(pr_auc(&truth, &scores), 1.0);
    }

    #[test]
    fn test_inverted_separator() {
        let truth = [Fraud, NonFraud, Fraud, NonFraud];
        let scores = [0.1, 0.9, 0.2, 0.8];
        assert_eq!(roc_auc(&truth, &scores), 0.0);
    }

    #[test]
    fn test_tied_scores_form_one_step() {
        let truth = [Fraud, NonFraud, Fraud, NonFraud];
        let scores = [0.5; 4];
        let roc = roc_curve(&truth, &scores);
        assert_eq!(roc.len(), 2);
        assert_abs_diff_eq!(roc_auc(&truth, &scores), 0.5);
    }

    #[test]
    fn test_roc_auc_matches_pair_ranking() {
        // 3 frauds x 3 non-frauds, 7 of 9 pairs ordered correctly
        let truth = [Fraud, Fraud, Fraud, NonFraud, NonFraud, NonFraud];
        let scores = [0.9, 0.7, 0.3, 0.8, 0.2, 0.1];
        assert_abs_diff_eq!(roc_auc(&truth, &scores), 7.0 / 9.0, epsilon = 1e-12);
    }

    #[test]
    fn test_pr_curve_points() {
        let truth = [Fraud, NonFraud, Fraud, NonFraud];
        let scores = [0.9, 0.8, 0.7, 0.1];
        let pr = pr_curve(&truth, &scores);
        let xy: Vec<(f64, f64)> = pr.iter().map(|p| (p.x, p.y)).collect();
        assert_eq!(
            xy,
            vec![(0.0, 1.0), (0.5, 1.0), (0.5, 0.5), (1.0, 2.0 / 3.0), (1.0, 0.5)]
        );
        let expected = 0.5 * 1.0 + 0.5 * (0.5 + 2.0 / 3.0) / 2.0;
        assert_abs_diff_eq!(pr_auc(&truth, &scores), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_single_class_truth_is_zero() {
        let truth = [NonFraud, NonFraud];
        assert_eq!(roc_auc(&truth, &[0.2, 0.4]), 0.0);
        assert_eq!(pr_auc(&truth, &[0.2, 0.4]), 0.0);
        assert_eq!(roc_auc(&[Fraud], &[0.7]), 0.0);
    }
}
