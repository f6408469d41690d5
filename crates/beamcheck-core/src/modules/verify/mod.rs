//! Whole-plan verification.
//!
//! One pass over a parsed plan: the calibration is decayed to the treatment
//! date once, every beam is recomputed and compared against what the plan
//! states, and a failure in one beam never stops the remaining beams from
//! being checked. The plan passes only when every beam could be checked and
//! every checked beam agrees within tolerance.

use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::errors::{CheckError, CheckResult};
use crate::domain::{Beam, PlanReport, SourceTrackingRecord};
use crate::modules::beam_time::{BeamTimeInput, CalculationResult, compute_beam_time};
use crate::modules::crosscheck::{Agreement, BeamVerdict, CrossCheckPolicy, check_beam_time};
use crate::modules::decay::{self, DecayedCalibration};
use crate::tables::CorrectionTables;

/// Shared settings for one verification run.
#[derive(Debug, Clone)]
pub struct VerificationContext<'a> {
    pub tables: &'a CorrectionTables,
    pub policy: CrossCheckPolicy,
    pub treatment_date: NaiveDate,
    pub max_backdate_days: i64,
}

/// Terminal failure of a single beam, with the work of the other beams kept.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BeamError {
    pub category: String,
    pub code: String,
    pub message: String,
}

impl From<CheckError> for BeamError {
    fn from(error: CheckError) -> Self {
        Self {
            category: error.category().label().to_string(),
            code: error.code().to_string(),
            message: error.message().to_string(),
        }
    }
}

/// What happened to one beam: either a calculation with its verdict, or the
/// error that stopped this beam.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BeamOutcome {
    pub number: u32,
    pub label: String,
    pub calculation: Option<CalculationResult>,
    pub verdict: Option<BeamVerdict>,
    pub error: Option<BeamError>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VerdictCounts {
    pub checked: usize,
    pub within_tolerance: usize,
    pub out_of_tolerance: usize,
    pub not_comparable: usize,
    pub failed: usize,
}

/// Full result of one verification run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanVerificationReport {
    pub patient_id: String,
    pub plan_name: String,
    pub treatment_date: NaiveDate,
    pub calibration: DecayedCalibration,
    pub beams: Vec<BeamOutcome>,
    pub counts: VerdictCounts,
    pub passed: bool,
}

/// Checks every beam of a plan against an independent recalculation.
///
/// The decay correction and the comparison policy apply to the plan as a
/// whole, so their failures end the run. Everything after that is per beam.
pub fn verify_plan(
    plan: &PlanReport,
    source: &SourceTrackingRecord,
    context: &VerificationContext<'_>,
) -> CheckResult<PlanVerificationReport> {
    context.policy.validate()?;
    let calibration =
        decay::calibration_on(source, context.treatment_date, context.max_backdate_days)?;

    let mut beams = Vec::with_capacity(plan.beams.len());
    let mut counts = VerdictCounts::default();

    for beam in &plan.beams {
        let outcome = check_single_beam(beam, source, &calibration, context);
        match (&outcome.verdict, &outcome.error) {
            (Some(verdict), _) => {
                counts.checked += 1;
                match verdict.agreement {
                    Agreement::WithinTolerance => counts.within_tolerance += 1,
                    Agreement::OutOfTolerance => counts.out_of_tolerance += 1,
                    Agreement::NotComparable => counts.not_comparable += 1,
                }
            }
            (None, Some(_)) => counts.failed += 1,
            (None, None) => {}
        }
        beams.push(outcome);
    }

    let passed = !beams.is_empty()
        && counts.failed == 0
        && counts.out_of_tolerance == 0
        && counts.not_comparable == 0;

    Ok(PlanVerificationReport {
        patient_id: plan.patient_id.clone(),
        plan_name: plan.plan_name.clone(),
        treatment_date: context.treatment_date,
        calibration,
        beams,
        counts,
        passed,
    })
}

fn check_single_beam(
    beam: &Beam,
    source: &SourceTrackingRecord,
    calibration: &DecayedCalibration,
    context: &VerificationContext<'_>,
) -> BeamOutcome {
    let computed = beam_input(beam, source, calibration)
        .and_then(|input| compute_beam_time(&input, context.tables));

    match computed {
        Ok(result) => {
            let verdict = check_beam_time(
                result.time_sec,
                beam.planned_time_min,
                beam.planned_monitor_units,
                &context.policy,
            );
            BeamOutcome {
                number: beam.number,
                label: beam.label.clone(),
                calculation: Some(result),
                verdict: Some(verdict),
                error: None,
            }
        }
        Err(error) => BeamOutcome {
            number: beam.number,
            label: beam.label.clone(),
            calculation: None,
            verdict: None,
            error: Some(BeamError::from(error)),
        },
    }
}

/// Maps a parsed beam onto a calculation input. The decayed dose rate and
/// the recorded calibration distance flow in here; the beam contributes the
/// geometry of its primary calculation point.
fn beam_input(
    beam: &Beam,
    source: &SourceTrackingRecord,
    calibration: &DecayedCalibration,
) -> CheckResult<BeamTimeInput> {
    let point = beam.primary_point().ok_or_else(|| {
        CheckError::input(
            "INPUT.BEAM_POINT",
            format!("beam {} ('{}') has no calculation point", beam.number, beam.label),
        )
    })?;

    let mut input = BeamTimeInput::new(beam.dose_gy, point.depth_cm, beam.field.clone());
    input.off_axis_cm = point.off_axis_cm;
    input.gantry_angle_deg = beam.gantry_angle_deg;
    input.ssd_cm = point.ssd_cm;
    input.calibration_dose_rate_gy_per_min = Some(calibration.dose_rate_gy_per_min);
    input.calibration_distance_cm = source.calibration_distance_cm;

    Ok(input)
}

/// Renders the report as the short text block the verification log keeps.
pub fn render_human_summary(report: &PlanVerificationReport) -> String {
    let mut lines: Vec<String> = Vec::new();
    lines.push(format!(
        "Plan '{}' for patient {} checked for {}",
        report.plan_name, report.patient_id, report.treatment_date
    ));
    lines.push(format!(
        "Calibration {} decayed {:.0} days, factor {:.4}, dose rate {:.4} Gy/min",
        report.calibration.calibration_date,
        report.calibration.elapsed_days,
        report.calibration.decay_factor,
        report.calibration.dose_rate_gy_per_min
    ));

    for beam in &report.beams {
        lines.push(beam_line(beam));
    }

    lines.push(format!(
        "Checked {} of {} beams: {} within tolerance, {} out of tolerance, {} not comparable, {} failed",
        report.counts.checked,
        report.beams.len(),
        report.counts.within_tolerance,
        report.counts.out_of_tolerance,
        report.counts.not_comparable,
        report.counts.failed
    ));
    lines.push(format!(
        "Result: {}",
        if report.passed { "PASSED" } else { "NOT CONFIRMED" }
    ));

    lines.join("\n")
}

fn beam_line(beam: &BeamOutcome) -> String {
    if let Some(error) = &beam.error {
        return format!(
            "Beam {} '{}': {} [{}] {}",
            beam.number, beam.label, error.category, error.code, error.message
        );
    }

    let Some(verdict) = &beam.verdict else {
        return format!("Beam {} '{}': no verdict", beam.number, beam.label);
    };

    match verdict.agreement {
        Agreement::NotComparable => format!(
            "Beam {} '{}': computed {:.1} s, not comparable ({})",
            beam.number,
            beam.label,
            verdict.computed_time_sec,
            verdict.note.as_deref().unwrap_or("no planned value")
        ),
        Agreement::WithinTolerance | Agreement::OutOfTolerance => {
            let word = if verdict.agreement == Agreement::WithinTolerance {
                "within tolerance"
            } else {
                "OUT OF TOLERANCE"
            };
            format!(
                "Beam {} '{}': computed {:.1} s, planned {:.1} s, difference {:.2}% ({})",
                beam.number,
                beam.label,
                verdict.computed_time_sec,
                verdict.planned_time_sec.unwrap_or_default(),
                verdict.relative_difference.unwrap_or_default() * 100.0,
                word
            )
        }
    }
}

/// Writes the report as pretty-printed JSON for archiving.
pub fn write_json_report(report: &PlanVerificationReport, path: &Path) -> CheckResult<()> {
    let payload = serde_json::to_string_pretty(report).map_err(|error| {
        CheckError::io_system(
            "IO.REPORT_ENCODE",
            format!("verification report cannot be encoded: {error}"),
        )
    })?;

    if let Some(parent_dir) = path.parent() {
        if !parent_dir.as_os_str().is_empty() {
            fs::create_dir_all(parent_dir).map_err(|error| {
                CheckError::io_system(
                    "IO.REPORT_DIR",
                    format!(
                        "report directory '{}' cannot be created: {}",
                        parent_dir.display(),
                        error
                    ),
                )
            })?;
        }
    }

    fs::write(path, format!("{payload}\n")).map_err(|error| {
        CheckError::io_system(
            "IO.REPORT_WRITE",
            format!(
                "verification report cannot be written to '{}': {}",
                path.display(),
                error
            ),
        )
    })
}
