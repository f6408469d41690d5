use beamcheck_core::{
    CheckErrorCategory, FieldSize, parse_plan_report_extracted, parse_plan_report_plain,
    render_plan_report,
};

const PLAIN_REPORT: &str = "\
Treatment Plan Report
Patient ID: PAT-1207
Plan: Mediastinum AP-PA
Prescription dose [Gy]: 2.00

Beam 1: AP
  Gantry angle [deg]: 0.0
  Field size X [cm]: 8.0
  Field size Y [cm]: 12.0
  Beam dose [Gy]: 1.00
  Calc point [cm]: depth 6.0 ssd 99.0 off-axis 0.0
  Planned time [min]: 0.79

Beam 2: PA
  Gantry angle [deg]: 180.0
  Field size X [cm]: 8.0
  Field size Y [cm]: 12.0
  Beam dose [Gy]: 1.00
  Calc point [cm]: depth 8.0 ssd 97.0 off-axis 0.0
  Planned time [min]: 1.02
";

// The same report as an extraction service returns it: page markers, a form
// feed, and a value pushed onto its own line.
const EXTRACTED_REPORT: &str = "\
Treatment Plan Report
Patient ID: PAT-1207
Plan: Mediastinum AP-PA
Prescription dose [Gy]: 2.00

Beam 1: AP
  Gantry angle [deg]: 0.0
  Field size X [cm]: 8.0
  Field size Y [cm]: 12.0
  Beam dose [Gy]: 1.00
  Calc point [cm]: depth 6.0 ssd 99.0 off-axis 0.0
Page 1 of 2
\u{c}  Planned time [min]:
      0.79

Beam 2: PA
  Gantry angle [deg]: 180.0
  Field size X [cm]: 8.0
  Field size Y [cm]: 12.0
  Beam dose [Gy]: 1.00
  Calc point [cm]: depth 8.0 ssd 97.0 off-axis 0.0
  Planned time [min]: 1.02
Page 2 of 2
";

#[test]
fn both_input_paths_produce_the_same_model() {
    let plain = parse_plan_report_plain(PLAIN_REPORT).expect("plain report should parse");
    let extracted =
        parse_plan_report_extracted(EXTRACTED_REPORT).expect("extracted report should parse");

    assert_eq!(plain, extracted);
    assert_eq!(plain.beams.len(), 2);
    assert_eq!(plain.beams[0].planned_time_min, Some(0.79));
    assert_eq!(
        plain.beams[1].field,
        FieldSize::Rectangular {
            x_cm: 8.0,
            y_cm: 12.0
        }
    );
}

#[test]
fn a_parsed_report_survives_render_and_reparse() {
    let plain = parse_plan_report_plain(PLAIN_REPORT).expect("plain report should parse");

    let rendered = render_plan_report(&plain);
    let reparsed = parse_plan_report_plain(&rendered).expect("rendered report should parse");

    assert_eq!(plain, reparsed);
}

#[test]
fn a_truncated_report_surfaces_a_parse_error_with_its_exit_code() {
    // The second beam lost its dose line in transit.
    let truncated = "\
Beam 1: AP
  Equivalent square [cm]: 6.0
  Beam dose [Gy]: 1.00
  Calc point [cm]: depth 5.0

Beam 2: PA
  Equivalent square [cm]: 6.0
  Calc point [cm]: depth 5.0
";
    let error = parse_plan_report_plain(truncated).expect_err("truncated report should fail");

    assert_eq!(error.category(), CheckErrorCategory::ParseError);
    assert_eq!(error.code(), "PARSE.BEAM_DOSE");
    assert_eq!(error.exit_code(), 2);
    assert!(error.diagnostic_line().starts_with("ERROR: [PARSE.BEAM_DOSE]"));
}
