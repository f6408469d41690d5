//! Treatment-plan report extraction.
//!
//! Two input paths feed the same grammar: plain report text saved directly by
//! the planning system, and text recovered from a PDF export by an external
//! extraction step. The extracted path only differs by a pre-cleaning pass
//! that removes pagination artifacts before parsing.

mod parser;

use crate::domain::errors::ParserResult;
use crate::domain::{FieldSize, PlanReport};

/// Parses plain treatment-plan report text.
pub fn parse_plan_report_plain(text: &str) -> ParserResult<PlanReport> {
    parser::parse_plan_report_text(text)
}

/// Parses treatment-plan report text recovered by a PDF text extractor.
///
/// Form feeds and `Page N of M` marker lines are removed before the shared
/// grammar runs, so both input paths produce identical models for the same
/// report content.
pub fn parse_plan_report_extracted(text: &str) -> ParserResult<PlanReport> {
    let cleaned = parser::strip_pagination_artifacts(text);
    parser::parse_plan_report_text(&cleaned)
}

/// Renders a plan model back into canonical report text.
///
/// The output parses back into an identical model, which the regression
/// suite relies on when diffing archived reports.
pub fn render_plan_report(plan: &PlanReport) -> String {
    let mut lines: Vec<String> = Vec::new();
    lines.push("Treatment Plan Report".to_string());
    lines.push(format!("Patient ID: {}", plan.patient_id));
    lines.push(format!("Plan: {}", plan.plan_name));
    if let Some(dose_gy) = plan.prescription_dose_gy {
        lines.push(format!("Prescription dose [Gy]: {dose_gy}"));
    }

    for beam in &plan.beams {
        lines.push(String::new());
        lines.push(format!("Beam {}: {}", beam.number, beam.label));
        if let Some(angle_deg) = beam.gantry_angle_deg {
            lines.push(format!("  Gantry angle [deg]: {angle_deg}"));
        }
        match beam.field {
            FieldSize::Square(side_cm) => {
                lines.push(format!("  Equivalent square [cm]: {side_cm}"));
            }
            FieldSize::Rectangular { x_cm, y_cm } => {
                lines.push(format!("  Field size X [cm]: {x_cm}"));
                lines.push(format!("  Field size Y [cm]: {y_cm}"));
            }
        }
        lines.push(format!("  Beam dose [Gy]: {}", beam.dose_gy));
        for point in &beam.points {
            let mut line = format!("  Calc point [cm]: depth {}", point.depth_cm);
            if let Some(ssd_cm) = point.ssd_cm {
                line.push_str(&format!(" ssd {ssd_cm}"));
            }
            line.push_str(&format!(" off-axis {}", point.off_axis_cm));
            lines.push(line);
        }
        if let Some(time_min) = beam.planned_time_min {
            lines.push(format!("  Planned time [min]: {time_min}"));
        }
        if let Some(monitor_units) = beam.planned_monitor_units {
            lines.push(format!("  Planned MU: {monitor_units}"));
        }
    }

    lines.push(String::new());
    lines.join("\n")
}
