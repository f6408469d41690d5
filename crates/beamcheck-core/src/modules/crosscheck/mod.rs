//! Planned-versus-computed comparison.
//!
//! The check never touches either value. It classifies the pair and leaves
//! acting on a disagreement to the physicist reading the report.

use serde::{Deserialize, Serialize};

use crate::common::constants::{DEFAULT_RELATIVE_FLOOR, DEFAULT_RELATIVE_TOLERANCE};
use crate::domain::errors::{CheckError, CheckResult};
use crate::numerics::relative_difference;

fn default_relative_tolerance() -> f64 {
    DEFAULT_RELATIVE_TOLERANCE
}

fn default_relative_floor() -> f64 {
    DEFAULT_RELATIVE_FLOOR
}

/// Comparison settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CrossCheckPolicy {
    /// Relative disagreement accepted before a beam is flagged.
    #[serde(default = "default_relative_tolerance")]
    pub relative_tolerance: f64,
    /// Scale floor that keeps comparisons near zero meaningful.
    #[serde(default = "default_relative_floor")]
    pub relative_floor: f64,
    /// Monitor-unit rate of the treatment timer, in MU per minute. Needed
    /// only when the plan states MU instead of minutes.
    #[serde(default)]
    pub monitor_units_per_minute: Option<f64>,
}

impl Default for CrossCheckPolicy {
    fn default() -> Self {
        Self {
            relative_tolerance: DEFAULT_RELATIVE_TOLERANCE,
            relative_floor: DEFAULT_RELATIVE_FLOOR,
            monitor_units_per_minute: None,
        }
    }
}

impl CrossCheckPolicy {
    /// Rejects settings that would make every verdict meaningless.
    pub fn validate(&self) -> CheckResult<()> {
        if !self.relative_tolerance.is_finite()
            || self.relative_tolerance <= 0.0
            || self.relative_tolerance >= 1.0
        {
            return Err(CheckError::input(
                "INPUT.TOLERANCE",
                format!(
                    "relative tolerance {} must lie in (0, 1)",
                    self.relative_tolerance
                ),
            ));
        }
        if !self.relative_floor.is_finite() || self.relative_floor <= 0.0 {
            return Err(CheckError::input(
                "INPUT.TOLERANCE",
                format!(
                    "relative floor {} must be positive and finite",
                    self.relative_floor
                ),
            ));
        }
        if let Some(rate) = self.monitor_units_per_minute {
            if !rate.is_finite() || rate <= 0.0 {
                return Err(CheckError::input(
                    "INPUT.MU_RATE",
                    format!("monitor-unit rate {} MU/min must be positive", rate),
                ));
            }
        }

        Ok(())
    }
}

/// How one beam's planned and computed times relate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Agreement {
    WithinTolerance,
    OutOfTolerance,
    NotComparable,
}

/// Verdict for one beam, carrying both values untouched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BeamVerdict {
    pub agreement: Agreement,
    pub computed_time_sec: f64,
    pub planned_time_sec: Option<f64>,
    pub relative_difference: Option<f64>,
    pub tolerance: f64,
    pub note: Option<String>,
}

/// Classifies a computed beam-on time against what the plan states.
///
/// A directly planned time wins over monitor units. Monitor units are only
/// comparable when the policy carries the timer rate to convert them, and a
/// plan that states neither value yields a not-comparable verdict rather
/// than an error.
pub fn check_beam_time(
    computed_time_sec: f64,
    planned_time_min: Option<f64>,
    planned_monitor_units: Option<f64>,
    policy: &CrossCheckPolicy,
) -> BeamVerdict {
    let not_comparable = |note: &str| BeamVerdict {
        agreement: Agreement::NotComparable,
        computed_time_sec,
        planned_time_sec: None,
        relative_difference: None,
        tolerance: policy.relative_tolerance,
        note: Some(note.to_string()),
    };

    if !computed_time_sec.is_finite() || computed_time_sec <= 0.0 {
        return not_comparable("computed time is not a positive finite value");
    }

    let planned_time_sec = match (planned_time_min, planned_monitor_units) {
        (Some(minutes), _) => minutes * 60.0,
        (None, Some(monitor_units)) => match policy.monitor_units_per_minute {
            Some(rate) => monitor_units / rate * 60.0,
            None => {
                return not_comparable(
                    "plan states monitor units but no timer rate is configured",
                );
            }
        },
        (None, None) => return not_comparable("plan states no planned delivery value"),
    };

    if !planned_time_sec.is_finite() || planned_time_sec <= 0.0 {
        return not_comparable("planned delivery value is not positive");
    }

    let difference =
        relative_difference(computed_time_sec, planned_time_sec, policy.relative_floor);
    let agreement = if difference <= policy.relative_tolerance {
        Agreement::WithinTolerance
    } else {
        Agreement::OutOfTolerance
    };

    BeamVerdict {
        agreement,
        computed_time_sec,
        planned_time_sec: Some(planned_time_sec),
        relative_difference: Some(difference),
        tolerance: policy.relative_tolerance,
        note: None,
    }
}

#[cfg(test)]
mod tests {
    use super::{Agreement, CrossCheckPolicy, check_beam_time};

    #[test]
    fn default_policy_uses_the_three_percent_tolerance() {
        let policy = CrossCheckPolicy::default();

        assert_eq!(policy.relative_tolerance, 0.03);
        assert_eq!(policy.monitor_units_per_minute, None);
        policy.validate().expect("default policy should validate");
    }

    #[test]
    fn small_disagreement_stays_within_tolerance() {
        let policy = CrossCheckPolicy::default();

        // 102.9 s planned against 100.0 s computed is a 2.8 percent gap.
        let verdict = check_beam_time(100.0, Some(1.715), None, &policy);

        assert_eq!(verdict.agreement, Agreement::WithinTolerance);
        assert_eq!(verdict.computed_time_sec, 100.0);
        assert!((verdict.planned_time_sec.unwrap() - 102.9).abs() < 1.0e-9);
    }

    #[test]
    fn disagreement_beyond_tolerance_is_flagged() {
        let policy = CrossCheckPolicy::default();

        // 107.0 s planned against 100.0 s computed is a 6.5 percent gap.
        let verdict = check_beam_time(100.0, Some(107.0 / 60.0), None, &policy);

        assert_eq!(verdict.agreement, Agreement::OutOfTolerance);
        assert!(verdict.relative_difference.unwrap() > policy.relative_tolerance);
    }

    #[test]
    fn a_difference_exactly_at_tolerance_passes() {
        let policy = CrossCheckPolicy {
            relative_tolerance: 0.04,
            ..CrossCheckPolicy::default()
        };

        // 6 / 150 is the same f64 as the 0.04 literal, so this pair sits
        // exactly on the threshold.
        let at_threshold = check_beam_time(144.0, Some(2.5), None, &policy);
        assert_eq!(at_threshold.agreement, Agreement::WithinTolerance);

        let just_past = check_beam_time(143.9, Some(2.5), None, &policy);
        assert_eq!(just_past.agreement, Agreement::OutOfTolerance);
    }

    #[test]
    fn monitor_units_compare_through_the_configured_rate() {
        let policy = CrossCheckPolicy {
            monitor_units_per_minute: Some(60.0),
            ..CrossCheckPolicy::default()
        };

        let verdict = check_beam_time(118.0, None, Some(118.0), &policy);

        assert_eq!(verdict.agreement, Agreement::WithinTolerance);
        assert!(verdict.relative_difference.unwrap() < 1.0e-9);
    }

    #[test]
    fn monitor_units_without_a_rate_are_not_comparable() {
        let policy = CrossCheckPolicy::default();

        let verdict = check_beam_time(118.0, None, Some(118.0), &policy);

        assert_eq!(verdict.agreement, Agreement::NotComparable);
        assert!(verdict.note.is_some());
        assert_eq!(verdict.relative_difference, None);
    }

    #[test]
    fn a_plan_without_delivery_values_is_not_comparable() {
        let verdict = check_beam_time(118.0, None, None, &CrossCheckPolicy::default());

        assert_eq!(verdict.agreement, Agreement::NotComparable);
        assert_eq!(verdict.planned_time_sec, None);
    }

    #[test]
    fn a_direct_time_wins_over_monitor_units() {
        let policy = CrossCheckPolicy {
            monitor_units_per_minute: Some(60.0),
            ..CrossCheckPolicy::default()
        };

        // The MU value would disagree wildly; the stated time is used.
        let verdict = check_beam_time(120.0, Some(2.0), Some(900.0), &policy);

        assert_eq!(verdict.agreement, Agreement::WithinTolerance);
        assert_eq!(verdict.planned_time_sec, Some(120.0));
    }

    #[test]
    fn negative_planned_time_is_not_comparable() {
        let verdict = check_beam_time(118.0, Some(-2.0), None, &CrossCheckPolicy::default());

        assert_eq!(verdict.agreement, Agreement::NotComparable);
    }

    #[test]
    fn invalid_policies_are_rejected() {
        let negative_tolerance = CrossCheckPolicy {
            relative_tolerance: -0.03,
            ..CrossCheckPolicy::default()
        };
        let error = negative_tolerance.validate().expect_err("should fail");
        assert_eq!(error.code(), "INPUT.TOLERANCE");

        let zero_rate = CrossCheckPolicy {
            monitor_units_per_minute: Some(0.0),
            ..CrossCheckPolicy::default()
        };
        let error = zero_rate.validate().expect_err("should fail");
        assert_eq!(error.code(), "INPUT.MU_RATE");
    }
}
