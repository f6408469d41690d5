use super::CliError;
use super::commands::PlanFormat;
use anyhow::Context;
use beamcheck_core::{
    BeamTimeInput, CheckError, CorrectionTables, PlanReport, SourceTrackingRecord,
    parse_plan_report_extracted, parse_plan_report_plain, parse_source_report,
};
use chrono::NaiveDate;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Machine-readable domain summary for `inspect --json`.
#[derive(Debug, Serialize)]
pub(super) struct TableSummary {
    tpr_depths_cm: Vec<f64>,
    tpr_field_sizes_cm: Vec<f64>,
    scp_field_sizes_cm: Vec<f64>,
}

impl TableSummary {
    pub(super) fn from_tables(tables: &CorrectionTables) -> Self {
        Self {
            tpr_depths_cm: tables.tpr.depths_cm().to_vec(),
            tpr_field_sizes_cm: tables.tpr.field_sizes_cm().to_vec(),
            scp_field_sizes_cm: tables.scp.field_sizes_cm().to_vec(),
        }
    }
}

pub(super) fn read_plan_report(path: &Path, format: PlanFormat) -> Result<PlanReport, CliError> {
    let text = read_text(path, "IO.PLAN_READ", "treatment-plan report")?;
    let parsed = match format {
        PlanFormat::Plain => parse_plan_report_plain(&text),
        PlanFormat::PdfText => parse_plan_report_extracted(&text),
    };
    parsed.map_err(CliError::Check)
}

pub(super) fn read_source_record(path: &Path) -> Result<SourceTrackingRecord, CliError> {
    let text = read_text(path, "IO.SOURCE_READ", "source-activity report")?;
    parse_source_report(&text).map_err(CliError::Check)
}

pub(super) fn read_beam_description(path: &Path) -> Result<BeamTimeInput, CliError> {
    let text = read_text(path, "IO.BEAM_READ", "beam description")?;
    serde_json::from_str::<BeamTimeInput>(&text)
        .with_context(|| format!("failed to parse beam description '{}'", path.display()))
        .map_err(CliError::from)
}

fn read_text(path: &Path, code: &'static str, what: &str) -> Result<String, CliError> {
    fs::read_to_string(path).map_err(|source| {
        CliError::Check(CheckError::io_system(
            code,
            format!("failed to read {} '{}': {}", what, path.display(), source),
        ))
    })
}

/// Loads caller-supplied tables, or clones the bundled commissioning data
/// when no paths are given. The paths come as a pair; one without the other
/// would silently mix commissioning states.
pub(super) fn load_correction_tables(
    tpr_path: Option<&Path>,
    scp_path: Option<&Path>,
) -> Result<CorrectionTables, CliError> {
    match (tpr_path, scp_path) {
        (None, None) => Ok(CorrectionTables::reference().clone()),
        (Some(tpr), Some(scp)) => {
            tracing::debug!(
                "loading correction tables from '{}' and '{}'",
                tpr.display(),
                scp.display()
            );
            CorrectionTables::from_paths(tpr, scp)
                .map_err(|error| CliError::Check(CheckError::from(error)))
        }
        _ => Err(CliError::Check(CheckError::input(
            "INPUT.TABLE_PAIR",
            "custom correction tables need both --tpr and --scp",
        ))),
    }
}

pub(super) fn resolve_date(date: Option<&str>) -> Result<NaiveDate, CliError> {
    match date {
        Some(text) => NaiveDate::parse_from_str(text, "%Y-%m-%d").map_err(|_| {
            CliError::Check(CheckError::input(
                "INPUT.DATE",
                format!("date '{text}' is not a calendar date in YYYY-MM-DD form"),
            ))
        }),
        None => Ok(chrono::Local::now().date_naive()),
    }
}

pub(super) fn render_tables(tables: &CorrectionTables) -> String {
    let mut lines: Vec<String> = Vec::new();

    lines.push("TPR by depth [cm] (rows) and equivalent square [cm] (columns)".to_string());
    let header: String = tables
        .tpr
        .field_sizes_cm()
        .iter()
        .map(|field_cm| format!("{field_cm:>8}"))
        .collect();
    lines.push(format!("{:>6}{header}", ""));
    for &depth_cm in tables.tpr.depths_cm() {
        let row: String = tables
            .tpr
            .field_sizes_cm()
            .iter()
            .map(|&field_cm| format!("{:>8.3}", tables.tpr.ratio(depth_cm, field_cm)))
            .collect();
        lines.push(format!("{depth_cm:>6}{row}"));
    }

    lines.push(String::new());
    lines.push("Scp by equivalent square [cm]".to_string());
    for &field_cm in tables.scp.field_sizes_cm() {
        lines.push(format!("{field_cm:>6}  {:.3}", tables.scp.factor(field_cm)));
    }

    lines.join("\n")
}
