//! Stateless per-row derivations: temporal decomposition, amount transforms
//! and amount interactions.
//!
//! Every function here is a pure function of one input row and behaves the
//! same on train, validation and test.

use serde::{Deserialize, Serialize};

pub const SECONDS_PER_HOUR: f64 = 3600.0;
pub const HOURS_PER_DAY: f64 = 24.0;

/// Four-way split of the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeOfDay {
    /// 00:00 - 05:59
    Night,
    /// 06:00 - 11:59
    Morning,
    /// 12:00 - 17:59
    Afternoon,
    /// 18:00 - 23:59
    Evening,
}

impl TimeOfDay {
    pub const ALL: [TimeOfDay; 4] = [
        TimeOfDay::Night,
        TimeOfDay::Morning,
        TimeOfDay::Afternoon,
        TimeOfDay::Evening,
    ];

    pub fn from_hour(hour_of_day: u32) -> Self {
        match hour_of_day {
            0..=5 => TimeOfDay::Night,
            6..=11 => TimeOfDay::Morning,
            12..=17 => TimeOfDay::Afternoon,
            _ => TimeOfDay::Evening,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TimeOfDay::Night => "night",
            TimeOfDay::Morning => "morning",
            TimeOfDay::Afternoon => "afternoon",
            TimeOfDay::Evening => "evening",
        }
    }
}

/// Six-bin magnitude of a transaction amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmountCategory {
    Zero,
    VerySmall,
    Small,
    Medium,
    Large,
    VeryLarge,
}

impl AmountCategory {
    pub const ALL: [AmountCategory; 6] = [
        AmountCategory::Zero,
        AmountCategory::VerySmall,
        AmountCategory::Small,
        AmountCategory::Medium,
        AmountCategory::Large,
        AmountCategory::VeryLarge,
    ];

    pub fn from_amount(amount: f64) -> Self {
        if amount <= 0.0 {
            AmountCategory::Zero
        } else if amount <= 10.0 {
            AmountCategory::VerySmall
        } else if amount <= 50.0 {
            AmountCategory::Small
        } else if amount <= 200.0 {
            AmountCategory::Medium
        } else if amount <= 1000.0 {
            AmountCategory::Large
        } else {
            AmountCategory::VeryLarge
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AmountCategory::Zero => "zero",
            AmountCategory::VerySmall => "very_small",
            AmountCategory::Small => "small",
            AmountCategory::Medium => "medium",
            AmountCategory::Large => "large",
            AmountCategory::VeryLarge => "very_large",
        }
    }
}

/// Output of the temporal stage for one row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemporalFeatures {
    pub elapsed_hours: f64,
    pub hour_of_day: f64,
    pub day_index: f64,
    pub time_of_day: TimeOfDay,
}

/// Decompose elapsed seconds into hours, hour of day, day index and time of day.
pub fn temporal(elapsed_seconds: f64) -> TemporalFeatures {
    let elapsed_hours = elapsed_seconds / SECONDS_PER_HOUR;
    let hour_of_day = elapsed_hours.floor().rem_euclid(HOURS_PER_DAY);
    let day_index = (elapsed_hours / HOURS_PER_DAY).floor();
    TemporalFeatures {
        elapsed_hours,
        hour_of_day,
        day_index,
        time_of_day: TimeOfDay::from_hour(hour_of_day as u32),
    }
}

/// Output of the stateless part of the amount stage for one row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmountFeatures {
    pub log1p: f64,
    pub sqrt: f64,
    pub category: AmountCategory,
}

/// Log, square-root and magnitude bin of an amount. Negative amounts are
/// clamped to zero before the log and root.
pub fn amount(amount: f64) -> AmountFeatures {
    let clamped = amount.max(0.0);
    AmountFeatures {
        log1p: clamped.ln_1p(),
        sqrt: clamped.sqrt(),
        category: AmountCategory::from_amount(amount),
    }
}

/// Products of the amount with each selected component value.
pub fn interactions(amount: f64, components: &[f64]) -> Vec<f64> {
    components.iter().map(|c| amount * c).collect()
}

/// Column name of an amount interaction.
pub fn interaction_name(component: &str) -> String {
    format!("amount_x_{component}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_temporal_decomposition() {
        // 1 day, 7 hours, 30 minutes
        let t = temporal((24.0 + 7.5) * 3600.0);
        assert_abs_diff_eq!(t.elapsed_hours, 31.5);
        assert_eq!(t.hour_of_day, 7.0);
        assert_eq!(t.day_index, 1.0);
        assert_eq!(t.time_of_day, TimeOfDay::Morning);

        let t = temporal(0.0);
        assert_eq!(t.hour_of_day, 0.0);
        assert_eq!(t.day_index, 0.0);
        assert_eq!(t.time_of_day, TimeOfDay::Night);

        let t = temporal(47.99 * 3600.0);
        assert_eq!(t.hour_of_day, 23.0);
        assert_eq!(t.day_index, 1.0);
        assert_eq!(t.time_of_day, TimeOfDay::Evening);
    }

    #[test]
    fn test_time_of_day_boundaries() {
        assert_eq!(TimeOfDay::from_hour(5), TimeOfDay::Night);
        assert_eq!(TimeOfDay::from_hour(6), TimeOfDay::Morning);
        assert_eq!(TimeOfDay::from_hour(12), TimeOfDay::Afternoon);
        assert_eq!(TimeOfDay::from_hour(17), TimeOfDay::Afternoon);
        assert_eq!(TimeOfDay::from_hour(18), TimeOfDay::Evening);
    }

    #[test]
    fn test_amount_bins() {
        assert_eq!(AmountCategory::from_amount(0.0), AmountCategory::Zero);
        assert_eq!(AmountCategory::from_amount(10.0), AmountCategory::VerySmall);
        assert_eq!(AmountCategory::from_amount(10.01), AmountCategory::Small);
        assert_eq!(AmountCategory::from_amount(50.0), AmountCategory::Small);
        assert_eq!(AmountCategory::from_amount(200.0), AmountCategory::Medium);
        assert_eq!(AmountCategory::from_amount(1000.0), AmountCategory::Large);
        assert_eq!(AmountCategory::from_amount(1000.5), AmountCategory::VeryLarge);
    }

    #[test]
    fn test_amount_transforms() {
        let a = amount(99.0);
        assert_abs_diff_eq!(a.log1p, 100f64.ln(), epsilon = 1e-12);
        assert_abs_diff_eq!(a.sqrt, 99f64.sqrt(), epsilon = 1e-12);
        assert_eq!(a.category, AmountCategory::Medium);

        let neg = amount(-5.0);
        assert_eq!(neg.log1p, 0.0);
        assert_eq!(neg.sqrt, 0.0);
        assert_eq!(neg.category, AmountCategory::Zero);
    }

    #[test]
    fn test_interactions() {
        assert_eq!(interactions(2.0, &[1.0, -0.5, 3.0]), vec![2.0, -1.0, 6.0]);
        assert_eq!(interaction_name("V3"), "amount_x_V3");
    }
}
