//! Co-60 decay correction.
//!
//! The calibration constant measured on the calibration date is corrected to
//! the treatment date through the physical half-life. A target date far
//! behind the calibration date points at a transcription problem, and a
//! history that jumps upward means the source was exchanged; both stop the
//! check instead of producing a silently wrong constant.

use chrono::NaiveDate;
use serde::Serialize;

use crate::common::constants::COBALT60_HALF_LIFE_DAYS;
use crate::domain::SourceTrackingRecord;
use crate::domain::errors::{CheckError, CheckResult};

/// Calibration state decayed to a target date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecayedCalibration {
    pub calibration_date: NaiveDate,
    pub target_date: NaiveDate,
    pub elapsed_days: f64,
    pub decay_factor: f64,
    pub dose_rate_gy_per_min: f64,
    pub activity_ci: Option<f64>,
}

/// Fraction of Co-60 activity remaining after `elapsed_days`.
///
/// Negative elapsed time yields a factor above one; the backdate bound in
/// [`calibration_on`] decides how much of that is acceptable.
pub fn decay_factor(elapsed_days: f64) -> f64 {
    0.5_f64.powf(elapsed_days / COBALT60_HALF_LIFE_DAYS)
}

/// Decays the recorded calibration to `target_date`.
pub fn calibration_on(
    record: &SourceTrackingRecord,
    target_date: NaiveDate,
    max_backdate_days: i64,
) -> CheckResult<DecayedCalibration> {
    if !record.reference_dose_rate_gy_per_min.is_finite()
        || record.reference_dose_rate_gy_per_min <= 0.0
    {
        return Err(CheckError::input(
            "INPUT.DOSE_RATE",
            format!(
                "reference dose rate {} Gy/min must be positive",
                record.reference_dose_rate_gy_per_min
            ),
        ));
    }

    let elapsed = target_date
        .signed_duration_since(record.calibration_date)
        .num_days();
    if elapsed < -max_backdate_days {
        return Err(CheckError::input(
            "INPUT.DECAY_BACKDATED",
            format!(
                "target date {} lies {} days before the calibration date {}, which exceeds the allowed backdate of {} days",
                target_date, -elapsed, record.calibration_date, max_backdate_days
            ),
        ));
    }

    detect_source_exchange(record, target_date)?;

    let decay = decay_factor(elapsed as f64);
    Ok(DecayedCalibration {
        calibration_date: record.calibration_date,
        target_date,
        elapsed_days: elapsed as f64,
        decay_factor: decay,
        dose_rate_gy_per_min: record.reference_dose_rate_gy_per_min * decay,
        activity_ci: record.nominal_activity_ci.map(|activity| activity * decay),
    })
}

/// Pure decay never increases activity, so a rise between consecutive
/// history samples marks a source exchange inside that interval. The
/// correction is refused when that interval touches the span between the
/// calibration date and the target date, because the recorded calibration
/// then describes a different source than the one treating.
fn detect_source_exchange(
    record: &SourceTrackingRecord,
    target_date: NaiveDate,
) -> CheckResult<()> {
    // A tolerated backdate puts the target before the calibration date, so
    // the span is taken in calendar order.
    let span_start = record.calibration_date.min(target_date);
    let span_end = record.calibration_date.max(target_date);
    for pair in record.history.windows(2) {
        let (earlier, later) = (&pair[0], &pair[1]);
        if later.activity_ci <= earlier.activity_ci {
            continue;
        }
        if later.date > span_start && earlier.date < span_end {
            return Err(CheckError::input(
                "INPUT.SOURCE_EXCHANGE",
                format!(
                    "activity rises from {} Ci on {} to {} Ci on {}, which marks a source exchange; the calibration of {} does not apply on {}",
                    earlier.activity_ci,
                    earlier.date,
                    later.activity_ci,
                    later.date,
                    record.calibration_date,
                    target_date
                ),
            ));
        }
    }

    Ok(())
}
