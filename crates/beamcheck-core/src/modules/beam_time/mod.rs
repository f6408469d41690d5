//! Beam-on time calculation at a point.
//!
//! The timer setting follows the classical hand-calculation chain: the
//! calibration dose rate is corrected by the tissue-phantom ratio, the
//! output factor for the equivalent square, the couch transmission when the
//! beam enters through the table top, and the inverse-square term between
//! the calibration distance and the source-axis distance of the point.
//! Correction tables are always passed in by the caller; the calculation
//! itself holds no mutable state.

use serde::{Deserialize, Serialize};

use crate::common::constants::{
    COUCH_WINDOW_MAX_DEG, COUCH_WINDOW_MIN_DEG, DEFAULT_CALIBRATION_DISTANCE_CM,
    DEFAULT_CALIBRATION_DOSE_RATE_GY_PER_MIN, DEFAULT_COUCH_ATTENUATION,
    OFF_AXIS_RATIO_PLACEHOLDER,
};
use crate::domain::FieldSize;
use crate::domain::errors::{CheckError, CheckResult};
use crate::tables::{CorrectionTables, OUT_OF_DOMAIN};

/// Everything a single beam-time calculation needs.
///
/// The three leading fields are mandatory; every optional setting has a
/// documented default so a caller can fill in exactly what the treatment
/// plan states and nothing more.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeamTimeInput {
    /// Dose to deliver at the calculation point, in gray.
    pub dose_gy: f64,
    /// Depth of the calculation point along the beam axis, in centimeters.
    pub depth_cm: f64,
    /// Collimator field setting at the isocenter plane.
    pub field: FieldSize,
    /// Lateral distance from the beam axis, in centimeters. Defaults to the
    /// central axis. The off-axis ratio is pinned to one for now, so the
    /// value is carried through but does not change the result yet.
    #[serde(default)]
    pub off_axis_cm: f64,
    /// Gantry angle in degrees. Without an angle the beam is assumed to
    /// miss the couch window and no couch attenuation is applied.
    #[serde(default)]
    pub gantry_angle_deg: Option<f64>,
    /// Source-surface distance in centimeters. Without it the calculation
    /// point is assumed to sit at the calibration distance, which makes the
    /// inverse-square term drop out.
    #[serde(default)]
    pub ssd_cm: Option<f64>,
    /// Calibration dose rate in Gy/min, usually the decay-corrected value.
    /// Defaults to `DEFAULT_CALIBRATION_DOSE_RATE_GY_PER_MIN`.
    #[serde(default)]
    pub calibration_dose_rate_gy_per_min: Option<f64>,
    /// Couch transmission applied inside the posterior gantry window.
    /// Defaults to `DEFAULT_COUCH_ATTENUATION`.
    #[serde(default)]
    pub couch_transmission: Option<f64>,
    /// Distance at which the calibration dose rate was measured, in
    /// centimeters. Defaults to `DEFAULT_CALIBRATION_DISTANCE_CM`.
    #[serde(default)]
    pub calibration_distance_cm: Option<f64>,
}

impl BeamTimeInput {
    /// Builds an input from the three mandatory values; optional settings
    /// keep their documented defaults until overridden.
    pub fn new(dose_gy: f64, depth_cm: f64, field: FieldSize) -> Self {
        Self {
            dose_gy,
            depth_cm,
            field,
            off_axis_cm: 0.0,
            gantry_angle_deg: None,
            ssd_cm: None,
            calibration_dose_rate_gy_per_min: None,
            couch_transmission: None,
            calibration_distance_cm: None,
        }
    }
}

/// Resolved factors and the beam-on time they produce.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalculationResult {
    pub dose_gy: f64,
    pub depth_cm: f64,
    pub equivalent_square_cm: f64,
    pub off_axis_cm: f64,
    pub gantry_angle_deg: Option<f64>,
    pub calibration_distance_cm: f64,
    pub source_axis_distance_cm: f64,
    pub dose_rate_gy_per_min: f64,
    pub tissue_phantom_ratio: f64,
    pub output_factor: f64,
    pub off_axis_ratio: f64,
    pub couch_factor: f64,
    pub inverse_square: f64,
    pub time_min: f64,
    pub time_sec: f64,
}

/// Computes the beam-on time for one calculation point.
///
/// Validation happens before any table lookup, so a nonsensical dose or
/// depth is always reported as a range problem even when the point also
/// falls outside the tabulated domain.
pub fn compute_beam_time(
    input: &BeamTimeInput,
    tables: &CorrectionTables,
) -> CheckResult<CalculationResult> {
    require_positive("RANGE.DOSE", "dose", input.dose_gy, "Gy")?;
    require_positive("RANGE.DEPTH", "depth", input.depth_cm, "cm")?;
    let equivalent_square_cm = validated_equivalent_square(&input.field)?;

    let dose_rate_gy_per_min = input
        .calibration_dose_rate_gy_per_min
        .unwrap_or(DEFAULT_CALIBRATION_DOSE_RATE_GY_PER_MIN);
    require_positive(
        "RANGE.DOSE_RATE",
        "calibration dose rate",
        dose_rate_gy_per_min,
        "Gy/min",
    )?;

    let calibration_distance_cm = input
        .calibration_distance_cm
        .unwrap_or(DEFAULT_CALIBRATION_DISTANCE_CM);
    require_positive(
        "RANGE.DISTANCE",
        "calibration distance",
        calibration_distance_cm,
        "cm",
    )?;

    let source_axis_distance_cm = match input.ssd_cm {
        Some(ssd_cm) => {
            require_positive("RANGE.DISTANCE", "source-surface distance", ssd_cm, "cm")?;
            ssd_cm + input.depth_cm
        }
        None => calibration_distance_cm,
    };

    let tissue_phantom_ratio = tables.tpr.ratio(input.depth_cm, equivalent_square_cm);
    if tissue_phantom_ratio <= OUT_OF_DOMAIN {
        return Err(CheckError::table_domain(
            "TABLE.TPR_DOMAIN",
            format!(
                "depth {} cm with equivalent square {} cm is outside the tabulated TPR domain (depths {}, field sizes {})",
                input.depth_cm,
                equivalent_square_cm,
                axis_span(tables.tpr.depths_cm()),
                axis_span(tables.tpr.field_sizes_cm())
            ),
        ));
    }

    let output_factor = tables.scp.factor(equivalent_square_cm);
    if output_factor <= OUT_OF_DOMAIN {
        return Err(CheckError::table_domain(
            "TABLE.SCP_DOMAIN",
            format!(
                "equivalent square {} cm is outside the tabulated output-factor domain (field sizes {})",
                equivalent_square_cm,
                axis_span(tables.scp.field_sizes_cm())
            ),
        ));
    }

    // Off-axis data has never been commissioned for this unit. The ratio is
    // pinned to one, which keeps the calculation valid on the central axis
    // and makes the stub visible in every result.
    let off_axis_ratio = OFF_AXIS_RATIO_PLACEHOLDER;

    let couch_factor = resolve_couch_factor(input)?;

    let inverse_square = (calibration_distance_cm / source_axis_distance_cm).powi(2);
    let dose_rate_at_point = dose_rate_gy_per_min
        * tissue_phantom_ratio
        * output_factor
        * off_axis_ratio
        * couch_factor
        * inverse_square;
    let time_min = input.dose_gy / dose_rate_at_point;

    Ok(CalculationResult {
        dose_gy: input.dose_gy,
        depth_cm: input.depth_cm,
        equivalent_square_cm,
        off_axis_cm: input.off_axis_cm,
        gantry_angle_deg: input.gantry_angle_deg,
        calibration_distance_cm,
        source_axis_distance_cm,
        dose_rate_gy_per_min,
        tissue_phantom_ratio,
        output_factor,
        off_axis_ratio,
        couch_factor,
        inverse_square,
        time_min,
        time_sec: 60.0 * time_min,
    })
}

fn validated_equivalent_square(field: &FieldSize) -> CheckResult<f64> {
    let (x_cm, y_cm) = match *field {
        FieldSize::Square(side_cm) => (side_cm, side_cm),
        FieldSize::Rectangular { x_cm, y_cm } => (x_cm, y_cm),
    };
    if !x_cm.is_finite() || x_cm <= 0.0 || !y_cm.is_finite() || y_cm <= 0.0 {
        return Err(CheckError::range(
            "RANGE.FIELD_SIZE",
            format!(
                "field edges {} cm by {} cm must be positive and finite",
                x_cm, y_cm
            ),
        ));
    }

    Ok(field.equivalent_square_cm())
}

/// The couch sits in the beam for posterior angles only. The transmission
/// applies on the closed window, so the boundary angles attenuate.
fn resolve_couch_factor(input: &BeamTimeInput) -> CheckResult<f64> {
    let transmission = input.couch_transmission.unwrap_or(DEFAULT_COUCH_ATTENUATION);
    if !transmission.is_finite() || transmission <= 0.0 || transmission > 1.0 {
        return Err(CheckError::range(
            "RANGE.COUCH",
            format!("couch transmission {} must lie in (0, 1]", transmission),
        ));
    }

    let Some(angle_deg) = input.gantry_angle_deg else {
        return Ok(1.0);
    };
    if !angle_deg.is_finite() {
        return Err(CheckError::range(
            "RANGE.GANTRY",
            format!("gantry angle {} deg must be finite", angle_deg),
        ));
    }

    let normalized = angle_deg.rem_euclid(360.0);
    if (COUCH_WINDOW_MIN_DEG..=COUCH_WINDOW_MAX_DEG).contains(&normalized) {
        Ok(transmission)
    } else {
        Ok(1.0)
    }
}

fn require_positive(code: &'static str, name: &str, value: f64, unit: &str) -> CheckResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(CheckError::range(
            code,
            format!("{} {} {} must be positive and finite", name, value, unit),
        ));
    }

    Ok(())
}

fn axis_span(axis: &[f64]) -> String {
    match (axis.first(), axis.last()) {
        (Some(first), Some(last)) => format!("{} to {} cm", first, last),
        _ => "empty".to_string(),
    }
}
