use crate::domain::errors::{CheckError, ParserResult};
use crate::domain::{Beam, CalcPoint, FieldSize, PlanReport};

#[derive(Debug, Default)]
struct BeamDraft {
    number: u32,
    label: String,
    gantry_angle_deg: Option<f64>,
    field_x_cm: Option<f64>,
    field_y_cm: Option<f64>,
    equivalent_square_cm: Option<f64>,
    dose_gy: Option<f64>,
    points: Vec<CalcPoint>,
    planned_time_min: Option<f64>,
    planned_monitor_units: Option<f64>,
}

impl BeamDraft {
    fn new(number: u32, label: String) -> Self {
        Self {
            number,
            label,
            ..Self::default()
        }
    }

    fn finish(self) -> ParserResult<Beam> {
        let dose_gy = self.dose_gy.ok_or_else(|| {
            missing_beam_field("PARSE.BEAM_DOSE", self.number, &self.label, "beam dose")
        })?;

        let field = match (self.equivalent_square_cm, self.field_x_cm, self.field_y_cm) {
            (Some(side_cm), _, _) => FieldSize::Square(side_cm),
            (None, Some(x_cm), Some(y_cm)) => FieldSize::Rectangular { x_cm, y_cm },
            _ => {
                return Err(missing_beam_field(
                    "PARSE.BEAM_FIELD",
                    self.number,
                    &self.label,
                    "field size (both edges or an equivalent square)",
                ));
            }
        };

        if self.points.is_empty() {
            return Err(missing_beam_field(
                "PARSE.BEAM_POINT",
                self.number,
                &self.label,
                "calculation point with a depth",
            ));
        }

        Ok(Beam {
            number: self.number,
            label: self.label,
            gantry_angle_deg: self.gantry_angle_deg,
            field,
            points: self.points,
            dose_gy,
            planned_time_min: self.planned_time_min,
            planned_monitor_units: self.planned_monitor_units,
        })
    }
}

/// Shared extraction grammar for both plan-report input paths. The plain and
/// extracted variants differ only in the pre-cleaning applied before this
/// function.
pub(super) fn parse_plan_report_text(text: &str) -> ParserResult<PlanReport> {
    let lines: Vec<&str> = text.lines().collect();

    let mut patient_id: Option<String> = None;
    let mut plan_name: Option<String> = None;
    let mut prescription_dose_gy: Option<f64> = None;
    let mut beams: Vec<Beam> = Vec::new();
    let mut draft: Option<BeamDraft> = None;

    let mut index = 0;
    while index < lines.len() {
        let trimmed = lines[index].trim();
        if trimmed.is_empty() {
            index += 1;
            continue;
        }

        if let Some((number, label)) = parse_beam_header(trimmed)? {
            if let Some(open) = draft.take() {
                beams.push(open.finish()?);
            }
            draft = Some(BeamDraft::new(number, label));
            index += 1;
            continue;
        }

        let Some((key, value)) = split_key_value(trimmed) else {
            index += 1;
            continue;
        };

        // A wrapped report may push the value onto the following line. Only a
        // bare continuation may donate one; a labeled line or a beam header
        // keeps its own value and the blank field stays missing.
        let numeric = parse_first_numeric(value).or_else(|| {
            if value.trim().is_empty() {
                next_nonempty_line(&lines, index + 1)
                    .filter(|(_, line)| is_bare_continuation(line))
                    .and_then(|(_, line)| parse_first_numeric(line))
            } else {
                None
            }
        });

        if key.starts_with("patient id") {
            assign_text(&mut patient_id, value);
        } else if key.starts_with("plan name") || key == "plan" {
            assign_text(&mut plan_name, value);
        } else if key.starts_with("prescription dose") {
            assign_numeric(&mut prescription_dose_gy, numeric);
        } else if let Some(beam) = draft.as_mut() {
            if key.starts_with("gantry angle") {
                assign_numeric(&mut beam.gantry_angle_deg, numeric);
            } else if key.starts_with("field size x") {
                assign_numeric(&mut beam.field_x_cm, numeric);
            } else if key.starts_with("field size y") {
                assign_numeric(&mut beam.field_y_cm, numeric);
            } else if key.starts_with("equivalent square") {
                assign_numeric(&mut beam.equivalent_square_cm, numeric);
            } else if key.starts_with("beam dose") || key == "dose" {
                assign_numeric(&mut beam.dose_gy, numeric);
            } else if key.starts_with("planned time") {
                assign_numeric(&mut beam.planned_time_min, numeric);
            } else if key.starts_with("planned mu") || key.starts_with("planned monitor") {
                assign_numeric(&mut beam.planned_monitor_units, numeric);
            } else if key.starts_with("calc point") || key.starts_with("calculation point") {
                let point = parse_calc_point(value).ok_or_else(|| {
                    CheckError::parse(
                        "PARSE.CALC_POINT",
                        format!(
                            "beam {} ('{}') calc point '{}' has no depth",
                            beam.number,
                            beam.label,
                            value.trim()
                        ),
                    )
                })?;
                beam.points.push(point);
            }
        }

        index += 1;
    }

    if let Some(open) = draft.take() {
        beams.push(open.finish()?);
    }

    if beams.is_empty() {
        return Err(CheckError::parse(
            "PARSE.NO_BEAMS",
            "report text contains no beam sections",
        ));
    }

    Ok(PlanReport {
        patient_id: patient_id.unwrap_or_else(|| "unknown".to_string()),
        plan_name: plan_name.unwrap_or_else(|| "unknown".to_string()),
        prescription_dose_gy,
        beams,
    })
}

/// Removes pagination artifacts a text-extraction service leaves behind: form
/// feeds become line breaks and `Page N of M` marker lines are dropped.
pub(super) fn strip_pagination_artifacts(text: &str) -> String {
    text.replace('\u{c}', "\n")
        .lines()
        .filter(|line| !is_page_marker(line))
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_page_marker(line: &str) -> bool {
    let lower = line.trim().to_ascii_lowercase();
    lower.starts_with("page ") && lower.contains(" of ")
}

fn parse_beam_header(line: &str) -> ParserResult<Option<(u32, String)>> {
    if !line.to_ascii_lowercase().starts_with("beam") {
        return Ok(None);
    }

    let (head, label_part) = match line.split_once(':') {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };

    let head_lower = head.trim().to_ascii_lowercase();
    let remainder = head_lower.strip_prefix("beam").unwrap_or_default().trim();
    if remainder.is_empty() {
        return Ok(None);
    }

    let Some(number) = parse_numeric_token(remainder) else {
        return Ok(None);
    };
    let number = f64_to_u32(number, "beam number")?;
    let label = if label_part.is_empty() {
        format!("Beam {number}")
    } else {
        label_part.to_string()
    };

    Ok(Some((number, label)))
}

/// Splits a `key: value` line, normalizing the key to lowercase with
/// collapsed whitespace so wrapped extractions still match.
fn split_key_value(line: &str) -> Option<(String, &str)> {
    let (raw_key, value) = line.split_once(':')?;
    let key = raw_key
        .trim()
        .to_ascii_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    if key.is_empty() {
        return None;
    }

    Some((key, value))
}

/// Parses a calc-point description. Labeled tokens (`depth 5 ssd 100
/// off-axis 0`) are preferred; a bare numeric list falls back to positional
/// (depth, ssd, off-axis) order.
fn parse_calc_point(value: &str) -> Option<CalcPoint> {
    let tokens: Vec<&str> = value.split_whitespace().collect();

    let mut depth_cm: Option<f64> = None;
    let mut ssd_cm: Option<f64> = None;
    let mut off_axis_cm: Option<f64> = None;
    let mut positional: Vec<f64> = Vec::new();
    let mut labeled = false;

    let mut index = 0;
    while index < tokens.len() {
        let lower = tokens[index].to_ascii_lowercase();
        let slot = if lower.starts_with("depth") {
            Some(&mut depth_cm)
        } else if lower.starts_with("ssd") {
            Some(&mut ssd_cm)
        } else if lower.starts_with("off") {
            Some(&mut off_axis_cm)
        } else {
            None
        };

        if let Some(slot) = slot {
            labeled = true;
            if let Some(number) = tokens.get(index + 1).copied().and_then(parse_numeric_token) {
                *slot = Some(number);
                index += 2;
                continue;
            }
            index += 1;
            continue;
        }

        if let Some(number) = parse_numeric_token(tokens[index]) {
            positional.push(number);
        }
        index += 1;
    }

    if !labeled {
        depth_cm = positional.first().copied();
        ssd_cm = positional.get(1).copied();
        off_axis_cm = positional.get(2).copied();
    }

    depth_cm.map(|depth_cm| CalcPoint::new(depth_cm, ssd_cm, off_axis_cm.unwrap_or(0.0)))
}

fn assign_text(slot: &mut Option<String>, value: &str) {
    let trimmed = value.trim();
    if !trimmed.is_empty() {
        *slot = Some(trimmed.to_string());
    }
}

fn assign_numeric(slot: &mut Option<f64>, value: Option<f64>) {
    if value.is_some() {
        *slot = value;
    }
}

fn missing_beam_field(code: &'static str, number: u32, label: &str, field: &str) -> CheckError {
    CheckError::parse(
        code,
        format!("beam {} ('{}') is missing required {}", number, label, field),
    )
}

fn parse_first_numeric(text: &str) -> Option<f64> {
    parse_numeric_tokens(text).first().copied()
}

fn next_nonempty_line<'a>(lines: &'a [&'a str], start_index: usize) -> Option<(usize, &'a str)> {
    for (offset, line) in lines.iter().enumerate().skip(start_index) {
        if !line.trim().is_empty() {
            return Some((offset, *line));
        }
    }

    None
}

/// A continuation line carries only a wrapped value. A `key: value` line or
/// a beam header opens its own entry and never donates a value upward.
fn is_bare_continuation(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.to_ascii_lowercase().starts_with("beam") && split_key_value(trimmed).is_none()
}

fn f64_to_u32(value: f64, field: &str) -> ParserResult<u32> {
    if !value.is_finite() {
        return Err(CheckError::parse(
            "PARSE.BEAM_NUMBER",
            format!("{} must be finite", field),
        ));
    }

    let rounded = value.round();
    if (value - rounded).abs() > 1.0e-6 {
        return Err(CheckError::parse(
            "PARSE.BEAM_NUMBER",
            format!("{} must be an integer", field),
        ));
    }

    if rounded < 0.0 || rounded > u32::MAX as f64 {
        return Err(CheckError::parse(
            "PARSE.BEAM_NUMBER",
            format!("{} is out of range", field),
        ));
    }

    Ok(rounded as u32)
}

fn parse_numeric_tokens(line: &str) -> Vec<f64> {
    line.split(|character: char| character.is_whitespace() || matches!(character, ',' | ';'))
        .filter_map(parse_numeric_token)
        .collect()
}

fn parse_numeric_token(token: &str) -> Option<f64> {
    let trimmed = token.trim_matches(|character: char| {
        matches!(character, ',' | ';' | ':' | '(' | ')' | '[' | ']' | '{' | '}')
    });
    if trimmed.is_empty() {
        return None;
    }

    let normalized = trimmed.replace(['D', 'd'], "E");
    normalized.parse::<f64>().ok()
}
