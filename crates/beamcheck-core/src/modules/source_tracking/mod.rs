//! Source-activity report extraction.
//!
//! The physics office tracks the installed Co-60 source in a short text
//! report: calibration date, reference dose rate at the calibration
//! distance, and an optional decay history of dated activity samples. The
//! parser is tolerant of layout noise but refuses a record without the two
//! fields every decay correction needs.

mod parser;

use crate::domain::SourceTrackingRecord;
use crate::domain::errors::ParserResult;

/// Parses source-activity report text into a tracking record.
pub fn parse_source_report(text: &str) -> ParserResult<SourceTrackingRecord> {
    parser::parse_source_report_text(text)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::parse_source_report;
    use crate::domain::errors::CheckErrorCategory;

    const SOURCE_FIXTURE: &str = "\
Source Activity Report
Unit: Theratron Equinox 80
Calibration date: 2024-01-15
Nominal activity [Ci]: 8500.0
Reference dose rate [Gy/min]: 1.850
Calibration distance [cm]: 105.0

History:
2024-01-15  8500.0
2024-07-15  8051.4
";

    fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("test date should be valid")
    }

    #[test]
    fn source_fixture_parses_all_fields() {
        let record = parse_source_report(SOURCE_FIXTURE).expect("source fixture should parse");

        assert_eq!(record.unit_name.as_deref(), Some("Theratron Equinox 80"));
        assert_eq!(record.calibration_date, ymd(2024, 1, 15));
        assert_eq!(record.reference_dose_rate_gy_per_min, 1.85);
        assert_eq!(record.nominal_activity_ci, Some(8500.0));
        assert_eq!(record.calibration_distance_cm, Some(105.0));
        assert_eq!(record.history.len(), 2);
        assert_eq!(record.history[1].date, ymd(2024, 7, 15));
        assert_eq!(record.history[1].activity_ci, 8051.4);
    }

    #[test]
    fn minimal_record_parses_without_optional_fields() {
        let report = "\
Calibration date: 2024-01-15
Reference dose rate [Gy/min]: 1.85
";
        let record = parse_source_report(report).expect("minimal record should parse");

        assert_eq!(record.unit_name, None);
        assert_eq!(record.nominal_activity_ci, None);
        assert_eq!(record.calibration_distance_cm, None);
        assert!(record.history.is_empty());
    }

    #[test]
    fn day_first_date_spellings_are_accepted() {
        for date_text in ["2024-01-15", "15.01.2024", "15/01/2024"] {
            let report = format!(
                "Calibration date: {date_text}\nReference dose rate [Gy/min]: 1.85\n"
            );
            let record = parse_source_report(&report).expect("date spelling should parse");

            assert_eq!(record.calibration_date, ymd(2024, 1, 15), "{date_text}");
        }
    }

    #[test]
    fn wrapped_dose_rate_is_recovered_from_the_next_line() {
        let report = "\
Calibration date: 2024-01-15
Reference dose rate [Gy/min]:
    1.85
";
        let record = parse_source_report(report).expect("wrapped record should parse");

        assert_eq!(record.reference_dose_rate_gy_per_min, 1.85);
    }

    #[test]
    fn wrapped_calibration_date_is_recovered_from_the_next_line() {
        let report = "\
Calibration date:
    2024-01-15
Reference dose rate [Gy/min]: 1.85
";
        let record = parse_source_report(report).expect("wrapped record should parse");

        assert_eq!(record.calibration_date, ymd(2024, 1, 15));
    }

    #[test]
    fn a_blank_dose_rate_before_a_labeled_line_stays_missing() {
        // The calibration distance must not be mistaken for the dose rate.
        let report = "\
Calibration date: 2024-01-15
Reference dose rate [Gy/min]:
Calibration distance [cm]: 105.0
";
        let error = parse_source_report(report).expect_err("blank dose rate should stay blank");

        assert_eq!(error.code(), "PARSE.SOURCE_DOSE_RATE");
    }

    #[test]
    fn a_blank_date_before_an_annotated_line_stays_missing() {
        // The date opening an annotation must not become the calibration date.
        let report = "\
Calibration date:
2024-06-01 review: pending
Reference dose rate [Gy/min]: 1.85
";
        let error = parse_source_report(report).expect_err("blank date should stay blank");

        assert_eq!(error.code(), "PARSE.SOURCE_DATE");
    }

    #[test]
    fn missing_calibration_date_is_rejected() {
        let error = parse_source_report("Reference dose rate [Gy/min]: 1.85\n")
            .expect_err("missing date should fail");

        assert_eq!(error.code(), "PARSE.SOURCE_DATE");
        assert_eq!(error.category(), CheckErrorCategory::ParseError);
    }

    #[test]
    fn missing_dose_rate_is_rejected() {
        let error = parse_source_report("Calibration date: 2024-01-15\n")
            .expect_err("missing dose rate should fail");

        assert_eq!(error.code(), "PARSE.SOURCE_DOSE_RATE");
    }

    #[test]
    fn malformed_history_row_is_rejected() {
        let report = "\
Calibration date: 2024-01-15
Reference dose rate [Gy/min]: 1.85
History:
2024-07-15  pending
";
        let error = parse_source_report(report).expect_err("malformed row should fail");

        assert_eq!(error.code(), "PARSE.SOURCE_HISTORY");
    }

    #[test]
    fn non_chronological_history_is_rejected() {
        let report = "\
Calibration date: 2024-01-15
Reference dose rate [Gy/min]: 1.85
History:
2024-07-15  8051.4
2024-01-15  8500.0
";
        let error = parse_source_report(report).expect_err("out-of-order history should fail");

        assert_eq!(error.code(), "PARSE.SOURCE_HISTORY");
    }

    #[test]
    fn non_positive_history_activity_is_rejected() {
        let report = "\
Calibration date: 2024-01-15
Reference dose rate [Gy/min]: 1.85
History:
2024-07-15  -3.0
";
        let error = parse_source_report(report).expect_err("negative activity should fail");

        assert_eq!(error.code(), "PARSE.SOURCE_HISTORY");
    }
}
