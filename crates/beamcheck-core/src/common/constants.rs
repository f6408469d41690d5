//! Physical constants and documented defaults for the Co-60 secondary check.
//!
//! These values are shared across the calculator modules to avoid ad hoc
//! per-module literal constants.

/// Cobalt-60 half-life in years (NNDC evaluated value).
pub const COBALT60_HALF_LIFE_YEARS: f64 = 5.2714;
/// Mean calendar-year length used for date-to-elapsed-time conversion.
pub const DAYS_PER_YEAR: f64 = 365.25;
/// Cobalt-60 half-life in days.
pub const COBALT60_HALF_LIFE_DAYS: f64 = COBALT60_HALF_LIFE_YEARS * DAYS_PER_YEAR;

/// Gantry angles inside this closed window pass through the couch structure.
pub const COUCH_WINDOW_MIN_DEG: f64 = 130.0;
pub const COUCH_WINDOW_MAX_DEG: f64 = 240.0;
/// Measured couch transmission for the treatment unit.
pub const DEFAULT_COUCH_ATTENUATION: f64 = 1.0 / 1.21;

/// Source-to-detector distance of the reference calibration geometry, in cm.
pub const DEFAULT_CALIBRATION_DISTANCE_CM: f64 = 105.0;
/// Reference dose rate of the unit at calibration, in Gy/min.
pub const DEFAULT_CALIBRATION_DOSE_RATE_GY_PER_MIN: f64 = 1.85;

/// Off-axis ratio stand-in. The check carries no off-axis dose model, so every
/// calculation uses this identity factor; results are only valid on the
/// central axis. Kept as a named constant so the limitation stays visible in
/// formulas and reports.
pub const OFF_AXIS_RATIO_PLACEHOLDER: f64 = 1.0;

/// How far a decay target date may precede the calibration date before the
/// source record is treated as stale or corrupted, in days.
pub const DEFAULT_MAX_BACKDATE_DAYS: i64 = 30;

/// Default relative agreement threshold for the plan cross-check.
pub const DEFAULT_RELATIVE_TOLERANCE: f64 = 0.03;
/// Floor for relative-difference denominators near zero.
pub const DEFAULT_RELATIVE_FLOOR: f64 = 1.0e-9;

#[cfg(test)]
mod tests {
    use super::{
        COBALT60_HALF_LIFE_DAYS, COBALT60_HALF_LIFE_YEARS, COUCH_WINDOW_MAX_DEG,
        COUCH_WINDOW_MIN_DEG, DAYS_PER_YEAR, DEFAULT_CALIBRATION_DISTANCE_CM,
        DEFAULT_CALIBRATION_DOSE_RATE_GY_PER_MIN, DEFAULT_COUCH_ATTENUATION,
        DEFAULT_MAX_BACKDATE_DAYS, DEFAULT_RELATIVE_FLOOR, DEFAULT_RELATIVE_TOLERANCE,
        OFF_AXIS_RATIO_PLACEHOLDER,
    };

    #[test]
    fn constants_match_expected_relationships() {
        assert_eq!(
            COBALT60_HALF_LIFE_DAYS,
            COBALT60_HALF_LIFE_YEARS * DAYS_PER_YEAR
        );
        assert!((COBALT60_HALF_LIFE_DAYS - 1_925.378_85).abs() <= 1.0e-9);
        assert!((DEFAULT_COUCH_ATTENUATION * 1.21 - 1.0).abs() <= f64::EPSILON);
        assert_eq!(OFF_AXIS_RATIO_PLACEHOLDER, 1.0);
        assert!(COUCH_WINDOW_MIN_DEG < COUCH_WINDOW_MAX_DEG);
    }

    #[test]
    fn defaults_remain_finite_and_positive() {
        for value in [
            COBALT60_HALF_LIFE_YEARS,
            DAYS_PER_YEAR,
            DEFAULT_COUCH_ATTENUATION,
            DEFAULT_CALIBRATION_DISTANCE_CM,
            DEFAULT_CALIBRATION_DOSE_RATE_GY_PER_MIN,
            DEFAULT_RELATIVE_TOLERANCE,
            DEFAULT_RELATIVE_FLOOR,
        ] {
            assert!(value.is_finite());
            assert!(value > 0.0);
        }
        assert!(DEFAULT_MAX_BACKDATE_DAYS > 0);
    }
}
