pub mod errors;

pub use errors::{CheckError, CheckErrorCategory, CheckResult, ParserResult};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Field aperture of a beam, either already reduced to an equivalent square
/// or given as rectangular jaw settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldSize {
    Square(f64),
    Rectangular { x_cm: f64, y_cm: f64 },
}

impl FieldSize {
    /// Reduces the aperture to its equivalent-square side length via
    /// `2ab/(a+b)`. Non-positive edges yield a non-positive result, which the
    /// calculator rejects.
    pub fn equivalent_square_cm(&self) -> f64 {
        match *self {
            Self::Square(side_cm) => side_cm,
            Self::Rectangular { x_cm, y_cm } => {
                let perimeter_half = x_cm + y_cm;
                if perimeter_half == 0.0 {
                    0.0
                } else {
                    2.0 * x_cm * y_cm / perimeter_half
                }
            }
        }
    }
}

/// One dose-calculation location of a beam.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalcPoint {
    pub depth_cm: f64,
    pub ssd_cm: Option<f64>,
    pub off_axis_cm: f64,
}

impl CalcPoint {
    pub fn new(depth_cm: f64, ssd_cm: Option<f64>, off_axis_cm: f64) -> Self {
        Self {
            depth_cm,
            ssd_cm,
            off_axis_cm,
        }
    }

    /// Source-to-axis distance at this point, when the report stated an SSD.
    pub fn source_axis_distance_cm(&self) -> Option<f64> {
        self.ssd_cm.map(|ssd_cm| ssd_cm + self.depth_cm)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Beam {
    pub number: u32,
    pub label: String,
    pub gantry_angle_deg: Option<f64>,
    pub field: FieldSize,
    pub points: Vec<CalcPoint>,
    /// This beam's contribution to the prescribed dose, in Gy.
    pub dose_gy: f64,
    pub planned_time_min: Option<f64>,
    pub planned_monitor_units: Option<f64>,
}

impl Beam {
    /// First calculation point of the beam. Parsing guarantees at least one.
    pub fn primary_point(&self) -> Option<&CalcPoint> {
        self.points.first()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanReport {
    pub patient_id: String,
    pub plan_name: String,
    pub prescription_dose_gy: Option<f64>,
    pub beams: Vec<Beam>,
}

impl PlanReport {
    pub fn total_beam_dose_gy(&self) -> f64 {
        self.beams.iter().map(|beam| beam.dose_gy).sum()
    }
}

/// One historical activity measurement from the source-tracking log.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActivitySample {
    pub date: NaiveDate,
    pub activity_ci: f64,
}

/// Calibration record of the treatment unit's radioactive source, parsed from
/// the source-activity report. Immutable once parsed; only the decay
/// calculator consumes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceTrackingRecord {
    pub unit_name: Option<String>,
    pub calibration_date: NaiveDate,
    pub reference_dose_rate_gy_per_min: f64,
    pub nominal_activity_ci: Option<f64>,
    pub calibration_distance_cm: Option<f64>,
    pub history: Vec<ActivitySample>,
}
