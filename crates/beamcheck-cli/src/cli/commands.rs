use super::CliError;
use super::helpers;
use anyhow::Context;
use beamcheck_core::common::constants::{DEFAULT_MAX_BACKDATE_DAYS, DEFAULT_RELATIVE_TOLERANCE};
use beamcheck_core::{
    CrossCheckPolicy, VerificationContext, calibration_on, compute_beam_time, render_human_summary,
    verify_plan, write_json_report,
};
use std::path::PathBuf;

/// How the plan report text was produced.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub(super) enum PlanFormat {
    /// Report text saved directly by the planning system.
    Plain,
    /// Report text recovered from a PDF export.
    PdfText,
}

#[derive(Debug, clap::Args)]
pub(super) struct VerifyArgs {
    /// Treatment-plan report path
    #[arg(long)]
    plan: PathBuf,

    /// How the plan report text was produced
    #[arg(long, value_enum, default_value = "plain")]
    plan_format: PlanFormat,

    /// Source-activity report path
    #[arg(long)]
    source: PathBuf,

    /// Treatment date as YYYY-MM-DD; defaults to today
    #[arg(long)]
    date: Option<String>,

    /// TPR table path; defaults to the bundled commissioning table
    #[arg(long)]
    tpr: Option<PathBuf>,

    /// Output-factor table path; defaults to the bundled commissioning table
    #[arg(long)]
    scp: Option<PathBuf>,

    /// Relative disagreement accepted before a beam is flagged
    #[arg(long, default_value_t = DEFAULT_RELATIVE_TOLERANCE)]
    tolerance: f64,

    /// Timer rate in MU per minute, for plans that state monitor units
    #[arg(long)]
    mu_rate: Option<f64>,

    /// Oldest accepted backdating of the decay correction, in days
    #[arg(long, default_value_t = DEFAULT_MAX_BACKDATE_DAYS)]
    max_backdate_days: i64,

    /// JSON report output path
    #[arg(long)]
    report: Option<PathBuf>,
}

pub(super) fn run_verify_command(args: VerifyArgs) -> Result<i32, CliError> {
    let plan = helpers::read_plan_report(&args.plan, args.plan_format)?;
    let source = helpers::read_source_record(&args.source)?;
    let tables = helpers::load_correction_tables(args.tpr.as_deref(), args.scp.as_deref())?;
    let treatment_date = helpers::resolve_date(args.date.as_deref())?;

    let policy = CrossCheckPolicy {
        relative_tolerance: args.tolerance,
        monitor_units_per_minute: args.mu_rate,
        ..CrossCheckPolicy::default()
    };
    let context = VerificationContext {
        tables: &tables,
        policy,
        treatment_date,
        max_backdate_days: args.max_backdate_days,
    };

    tracing::info!(
        "checking plan '{}' ({} beams) for treatment on {}",
        plan.plan_name,
        plan.beams.len(),
        treatment_date
    );

    let report = verify_plan(&plan, &source, &context).map_err(CliError::Check)?;
    tracing::debug!(
        "calibration decayed {:.0} days, factor {:.4}",
        report.calibration.elapsed_days,
        report.calibration.decay_factor
    );
    for outcome in &report.beams {
        match (&outcome.verdict, &outcome.error) {
            (Some(verdict), _) => tracing::debug!(
                "beam {} ('{}'): {:?}",
                outcome.number,
                outcome.label,
                verdict.agreement
            ),
            (None, Some(error)) => tracing::debug!(
                "beam {} ('{}'): failed with {}",
                outcome.number,
                outcome.label,
                error.code
            ),
            (None, None) => {}
        }
    }

    println!("{}", render_human_summary(&report));
    if let Some(report_path) = &args.report {
        write_json_report(&report, report_path).map_err(CliError::Check)?;
        println!("JSON report: {}", report_path.display());
    }

    if report.passed { Ok(0) } else { Ok(1) }
}

#[derive(Debug, clap::Args)]
pub(super) struct ComputeArgs {
    /// Beam description path, JSON matching the calculator input fields
    #[arg(long)]
    input: PathBuf,

    /// TPR table path; defaults to the bundled commissioning table
    #[arg(long)]
    tpr: Option<PathBuf>,

    /// Output-factor table path; defaults to the bundled commissioning table
    #[arg(long)]
    scp: Option<PathBuf>,
}

pub(super) fn run_compute_command(args: ComputeArgs) -> Result<i32, CliError> {
    let input = helpers::read_beam_description(&args.input)?;
    let tables = helpers::load_correction_tables(args.tpr.as_deref(), args.scp.as_deref())?;

    let result = compute_beam_time(&input, &tables).map_err(CliError::Check)?;
    let payload =
        serde_json::to_string_pretty(&result).context("failed to encode calculation result")?;
    println!("{payload}");
    Ok(0)
}

#[derive(Debug, clap::Args)]
pub(super) struct DecayArgs {
    /// Source-activity report path
    #[arg(long)]
    source: PathBuf,

    /// Target date as YYYY-MM-DD; defaults to today
    #[arg(long)]
    date: Option<String>,

    /// Oldest accepted backdating of the decay correction, in days
    #[arg(long, default_value_t = DEFAULT_MAX_BACKDATE_DAYS)]
    max_backdate_days: i64,
}

pub(super) fn run_decay_command(args: DecayArgs) -> Result<i32, CliError> {
    let source = helpers::read_source_record(&args.source)?;
    let target_date = helpers::resolve_date(args.date.as_deref())?;

    let calibration =
        calibration_on(&source, target_date, args.max_backdate_days).map_err(CliError::Check)?;
    let payload = serde_json::to_string_pretty(&calibration)
        .context("failed to encode decayed calibration")?;
    println!("{payload}");
    Ok(0)
}

#[derive(Debug, clap::Args)]
pub(super) struct InspectArgs {
    /// Treatment-plan report to parse and dump as JSON
    #[arg(long)]
    plan: Option<PathBuf>,

    /// How the plan report text was produced
    #[arg(long, value_enum, default_value = "plain")]
    plan_format: PlanFormat,

    /// Source-activity report to parse and dump as JSON
    #[arg(long)]
    source: Option<PathBuf>,

    /// TPR table path; defaults to the bundled commissioning table
    #[arg(long)]
    tpr: Option<PathBuf>,

    /// Output-factor table path; defaults to the bundled commissioning table
    #[arg(long)]
    scp: Option<PathBuf>,

    /// Emit the table domains as JSON instead of the grids
    #[arg(long)]
    json: bool,
}

pub(super) fn run_inspect_command(args: InspectArgs) -> Result<i32, CliError> {
    if args.plan.is_some() || args.source.is_some() {
        if let Some(plan_path) = &args.plan {
            let plan = helpers::read_plan_report(plan_path, args.plan_format)?;
            let payload = serde_json::to_string_pretty(&plan)
                .context("failed to encode parsed plan report")?;
            println!("{payload}");
        }
        if let Some(source_path) = &args.source {
            let source = helpers::read_source_record(source_path)?;
            let payload = serde_json::to_string_pretty(&source)
                .context("failed to encode parsed source record")?;
            println!("{payload}");
        }
        return Ok(0);
    }

    let tables = helpers::load_correction_tables(args.tpr.as_deref(), args.scp.as_deref())?;

    if args.json {
        let summary = helpers::TableSummary::from_tables(&tables);
        let payload =
            serde_json::to_string_pretty(&summary).context("failed to encode table summary")?;
        println!("{payload}");
    } else {
        println!("{}", helpers::render_tables(&tables));
    }
    Ok(0)
}
