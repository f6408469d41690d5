use chrono::NaiveDate;

use crate::domain::errors::{CheckError, ParserResult};
use crate::domain::{ActivitySample, SourceTrackingRecord};

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d.%m.%Y", "%d/%m/%Y"];

pub(super) fn parse_source_report_text(text: &str) -> ParserResult<SourceTrackingRecord> {
    let lines: Vec<&str> = text.lines().collect();

    let mut unit_name: Option<String> = None;
    let mut calibration_date: Option<NaiveDate> = None;
    let mut reference_dose_rate: Option<f64> = None;
    let mut nominal_activity_ci: Option<f64> = None;
    let mut calibration_distance_cm: Option<f64> = None;
    let mut history: Vec<ActivitySample> = Vec::new();

    let mut index = 0;
    while index < lines.len() {
        let trimmed = lines[index].trim();
        if trimmed.is_empty() {
            index += 1;
            continue;
        }

        let Some((key, value)) = split_key_value(trimmed) else {
            index += 1;
            continue;
        };

        if key.starts_with("history") {
            index += 1;
            while index < lines.len() {
                let row = lines[index].trim();
                if row.is_empty() {
                    break;
                }
                history.push(parse_history_row(row)?);
                index += 1;
            }
            continue;
        }

        // A wrapped report may push the value onto the following line. Only a
        // bare continuation may donate one; a labeled line keeps its own
        // value and the blank field stays missing.
        let numeric = parse_first_numeric(value).or_else(|| {
            if value.trim().is_empty() {
                next_nonempty_line(&lines, index + 1)
                    .filter(|(_, line)| is_bare_continuation(line))
                    .and_then(|(_, line)| parse_first_numeric(line))
            } else {
                None
            }
        });

        if key.starts_with("unit") {
            let trimmed_value = value.trim();
            if !trimmed_value.is_empty() {
                unit_name = Some(trimmed_value.to_string());
            }
        } else if key.starts_with("calibration date") {
            let token = first_token(value).or_else(|| {
                if value.trim().is_empty() {
                    next_nonempty_line(&lines, index + 1)
                        .filter(|(_, line)| is_bare_continuation(line))
                        .and_then(|(_, line)| first_token(line))
                } else {
                    None
                }
            });
            if let Some(token) = token {
                calibration_date = parse_report_date(token);
            }
        } else if key.starts_with("reference dose rate") || key.starts_with("dose rate") {
            if numeric.is_some() {
                reference_dose_rate = numeric;
            }
        } else if key.starts_with("nominal activity") || key.starts_with("source activity") {
            if numeric.is_some() {
                nominal_activity_ci = numeric;
            }
        } else if key.starts_with("calibration distance") {
            if numeric.is_some() {
                calibration_distance_cm = numeric;
            }
        }

        index += 1;
    }

    if let Some(pair) = history.windows(2).find(|pair| pair[1].date < pair[0].date) {
        return Err(CheckError::parse(
            "PARSE.SOURCE_HISTORY",
            format!(
                "activity history must be chronological ({} is listed after {})",
                pair[1].date, pair[0].date
            ),
        ));
    }

    let calibration_date = calibration_date.ok_or_else(|| {
        CheckError::parse(
            "PARSE.SOURCE_DATE",
            "source report is missing a readable calibration date",
        )
    })?;
    let reference_dose_rate_gy_per_min = reference_dose_rate.ok_or_else(|| {
        CheckError::parse(
            "PARSE.SOURCE_DOSE_RATE",
            "source report is missing the reference dose rate",
        )
    })?;

    Ok(SourceTrackingRecord {
        unit_name,
        calibration_date,
        reference_dose_rate_gy_per_min,
        nominal_activity_ci,
        calibration_distance_cm,
        history,
    })
}

/// Parses a report date, trying ISO first and the two day-first spellings
/// the tracking sheets have historically used.
pub(super) fn parse_report_date(token: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(token, format).ok())
}

fn parse_history_row(row: &str) -> ParserResult<ActivitySample> {
    let mut tokens = row.split_whitespace();

    let date = tokens
        .next()
        .map(|token| token.trim_matches(|character: char| matches!(character, ',' | ';')))
        .and_then(parse_report_date)
        .ok_or_else(|| history_row_error(row, "row must start with a date"))?;
    let activity_ci = tokens
        .next()
        .and_then(parse_numeric_token)
        .ok_or_else(|| history_row_error(row, "row must carry an activity value"))?;
    if !activity_ci.is_finite() || activity_ci <= 0.0 {
        return Err(history_row_error(row, "activity must be positive"));
    }

    Ok(ActivitySample { date, activity_ci })
}

fn history_row_error(row: &str, reason: &str) -> CheckError {
    CheckError::parse(
        "PARSE.SOURCE_HISTORY",
        format!("activity history row '{}' is malformed: {}", row, reason),
    )
}

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

fn first_token(text: &str) -> Option<&str> {
    text.split_whitespace().next()
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

/// A continuation line carries only a wrapped value. A `key: value` line
/// opens its own entry and never donates a value upward.
fn is_bare_continuation(line: &str) -> bool {
    split_key_value(line.trim()).is_none()
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
