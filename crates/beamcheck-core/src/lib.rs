//! Independent second check for Co-60 teletherapy beam-on times.
//!
//! The crate reads the treatment-plan report and the source-activity report
//! as the planning system prints them, decays the machine calibration to
//! the treatment date, recomputes every beam-on time from the commissioned
//! correction tables, and classifies the agreement with what the plan
//! states. It checks and reports; it never alters a plan value.

pub mod common;
pub mod domain;
pub mod modules;
pub mod numerics;
pub mod tables;

pub use domain::errors::{CheckError, CheckErrorCategory, CheckResult};
pub use domain::{ActivitySample, Beam, CalcPoint, FieldSize, PlanReport, SourceTrackingRecord};
pub use modules::beam_time::{BeamTimeInput, CalculationResult, compute_beam_time};
pub use modules::crosscheck::{Agreement, BeamVerdict, CrossCheckPolicy, check_beam_time};
pub use modules::decay::{DecayedCalibration, calibration_on, decay_factor};
pub use modules::plan_report::{
    parse_plan_report_extracted, parse_plan_report_plain, render_plan_report,
};
pub use modules::source_tracking::parse_source_report;
pub use modules::verify::{
    BeamOutcome, PlanVerificationReport, VerdictCounts, VerificationContext,
    render_human_summary, verify_plan, write_json_report,
};
pub use tables::{CorrectionTables, OutputFactorTable, TableLoadError, TprTable};
