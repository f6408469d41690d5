//! Correction-table datasets: the 2D tissue-phantom-ratio grid and the 1D
//! relative output-factor curve.
//!
//! Tables are immutable after construction. Lookups return
//! [`OUT_OF_DOMAIN`] (exactly 0) for queries outside the calibrated axis
//! ranges instead of extrapolating; callers must treat that sentinel as a
//! hard stop, never as a physical factor.

use crate::domain::errors::{CheckError, CheckResult};
use crate::numerics::{interpolate_bilinear, interpolate_linear, is_strictly_increasing};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Sentinel returned by table lookups outside the calibrated domain.
pub const OUT_OF_DOMAIN: f64 = 0.0;

const REFERENCE_TPR_SOURCE: &str = include_str!("../../data/tpr.csv");
const REFERENCE_SCP_SOURCE: &str = include_str!("../../data/scp.csv");

static REFERENCE_TABLES: OnceLock<CorrectionTables> = OnceLock::new();

/// Tissue-phantom ratios indexed by (depth, equivalent-square field size).
#[derive(Debug, Clone, PartialEq)]
pub struct TprTable {
    depths_cm: Vec<f64>,
    field_sizes_cm: Vec<f64>,
    rows: Vec<Vec<f64>>,
}

impl TprTable {
    pub fn from_grid(
        depths_cm: Vec<f64>,
        field_sizes_cm: Vec<f64>,
        rows: Vec<Vec<f64>>,
    ) -> CheckResult<Self> {
        validate_axis("PARSE.TPR_AXIS", "TPR depth axis", &depths_cm)?;
        validate_axis("PARSE.TPR_AXIS", "TPR field-size axis", &field_sizes_cm)?;

        if rows.len() != depths_cm.len() {
            return Err(CheckError::parse(
                "PARSE.TPR_SHAPE",
                format!(
                    "TPR grid has {} rows but {} depths",
                    rows.len(),
                    depths_cm.len()
                ),
            ));
        }

        for (row_index, row) in rows.iter().enumerate() {
            if row.len() != field_sizes_cm.len() {
                return Err(CheckError::parse(
                    "PARSE.TPR_SHAPE",
                    format!(
                        "TPR row for depth {} has {} values but {} field sizes",
                        depths_cm[row_index],
                        row.len(),
                        field_sizes_cm.len()
                    ),
                ));
            }

            for &value in row {
                if !value.is_finite() || value <= 0.0 || value > 1.0 {
                    return Err(CheckError::parse(
                        "PARSE.TPR_VALUE",
                        format!(
                            "TPR value {} at depth {} is outside (0, 1]",
                            value, depths_cm[row_index]
                        ),
                    ));
                }
            }
        }

        Ok(Self {
            depths_cm,
            field_sizes_cm,
            rows,
        })
    }

    /// Parses the delimited grid format: `#` comment lines, a first data row
    /// listing field sizes, then one row per depth starting with the depth.
    pub fn from_source(source: &str) -> CheckResult<Self> {
        let mut numeric_rows = numeric_rows(source);
        if numeric_rows.len() < 3 {
            return Err(CheckError::parse(
                "PARSE.TPR_GRID",
                format!(
                    "TPR grid needs a field-size row and at least two depth rows, found {} data rows",
                    numeric_rows.len()
                ),
            ));
        }

        let field_sizes_cm = numeric_rows.remove(0);
        let mut depths_cm = Vec::with_capacity(numeric_rows.len());
        let mut rows = Vec::with_capacity(numeric_rows.len());
        for mut row in numeric_rows {
            if row.len() != field_sizes_cm.len() + 1 {
                return Err(CheckError::parse(
                    "PARSE.TPR_SHAPE",
                    format!(
                        "TPR depth row '{}' has {} values, expected depth plus {} ratios",
                        row.first().copied().unwrap_or(f64::NAN),
                        row.len(),
                        field_sizes_cm.len()
                    ),
                ));
            }

            depths_cm.push(row.remove(0));
            rows.push(row);
        }

        Self::from_grid(depths_cm, field_sizes_cm, rows)
    }

    pub fn depths_cm(&self) -> &[f64] {
        &self.depths_cm
    }

    pub fn field_sizes_cm(&self) -> &[f64] {
        &self.field_sizes_cm
    }

    /// Bilinear interpolation at (depth, field size); [`OUT_OF_DOMAIN`] when
    /// the query leaves the grid.
    pub fn ratio(&self, depth_cm: f64, field_size_cm: f64) -> f64 {
        interpolate_bilinear(
            depth_cm,
            field_size_cm,
            &self.depths_cm,
            &self.field_sizes_cm,
            &self.rows,
        )
        .unwrap_or(OUT_OF_DOMAIN)
    }
}

/// Relative output factors (Scp) indexed by equivalent-square field size.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputFactorTable {
    field_sizes_cm: Vec<f64>,
    factors: Vec<f64>,
}

impl OutputFactorTable {
    pub fn from_pairs(field_sizes_cm: Vec<f64>, factors: Vec<f64>) -> CheckResult<Self> {
        validate_axis("PARSE.SCP_AXIS", "output-factor field-size axis", &field_sizes_cm)?;

        if factors.len() != field_sizes_cm.len() {
            return Err(CheckError::parse(
                "PARSE.SCP_SHAPE",
                format!(
                    "output-factor curve has {} factors but {} field sizes",
                    factors.len(),
                    field_sizes_cm.len()
                ),
            ));
        }

        for (&field_size_cm, &factor) in field_sizes_cm.iter().zip(&factors) {
            if !factor.is_finite() || factor <= 0.0 {
                return Err(CheckError::parse(
                    "PARSE.SCP_VALUE",
                    format!(
                        "output factor {} at field size {} must be finite and positive",
                        factor, field_size_cm
                    ),
                ));
            }
        }

        Ok(Self {
            field_sizes_cm,
            factors,
        })
    }

    /// Parses the delimited curve format: `#` comment lines, then one
    /// (field size, factor) pair per row.
    pub fn from_source(source: &str) -> CheckResult<Self> {
        let rows = numeric_rows(source);
        let mut field_sizes_cm = Vec::with_capacity(rows.len());
        let mut factors = Vec::with_capacity(rows.len());
        for row in rows {
            if row.len() < 2 {
                return Err(CheckError::parse(
                    "PARSE.SCP_ROW",
                    format!(
                        "output-factor row '{}' needs a field size and a factor",
                        row.first().copied().unwrap_or(f64::NAN)
                    ),
                ));
            }

            field_sizes_cm.push(row[0]);
            factors.push(row[1]);
        }

        Self::from_pairs(field_sizes_cm, factors)
    }

    pub fn field_sizes_cm(&self) -> &[f64] {
        &self.field_sizes_cm
    }

    /// Linear interpolation at the field size; [`OUT_OF_DOMAIN`] outside the
    /// curve.
    pub fn factor(&self, field_size_cm: f64) -> f64 {
        interpolate_linear(field_size_cm, &self.field_sizes_cm, &self.factors)
            .unwrap_or(OUT_OF_DOMAIN)
    }
}

/// The immutable pair of correction tables a calculation runs against.
/// Constructed once and passed by reference into every calculator call.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrectionTables {
    pub tpr: TprTable,
    pub scp: OutputFactorTable,
}

impl CorrectionTables {
    pub fn from_sources(tpr_source: &str, scp_source: &str) -> CheckResult<Self> {
        Ok(Self {
            tpr: TprTable::from_source(tpr_source)?,
            scp: OutputFactorTable::from_source(scp_source)?,
        })
    }

    pub fn from_paths(tpr_path: &Path, scp_path: &Path) -> Result<Self, TableLoadError> {
        let tpr_source = read_table(tpr_path)?;
        let scp_source = read_table(scp_path)?;
        let tpr = TprTable::from_source(&tpr_source).map_err(|source| TableLoadError::Parse {
            path: tpr_path.to_path_buf(),
            source,
        })?;
        let scp =
            OutputFactorTable::from_source(&scp_source).map_err(|source| TableLoadError::Parse {
                path: scp_path.to_path_buf(),
                source,
            })?;
        Ok(Self { tpr, scp })
    }

    /// Bundled commissioning dataset for the treatment unit, parsed at most
    /// once per process behind a once-guard.
    pub fn reference() -> &'static Self {
        REFERENCE_TABLES.get_or_init(|| {
            Self::from_sources(REFERENCE_TPR_SOURCE, REFERENCE_SCP_SOURCE)
                .expect("bundled reference tables should parse")
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TableLoadError {
    #[error("failed to read correction table '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse correction table '{}': {source}", path.display())]
    Parse { path: PathBuf, source: CheckError },
}

impl From<TableLoadError> for CheckError {
    fn from(error: TableLoadError) -> Self {
        let message = error.to_string();
        match error {
            TableLoadError::Read { .. } => CheckError::io_system("IO.TABLE_READ", message),
            TableLoadError::Parse { .. } => CheckError::parse("PARSE.TABLE_FILE", message),
        }
    }
}

fn read_table(path: &Path) -> Result<String, TableLoadError> {
    fs::read_to_string(path).map_err(|source| TableLoadError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn validate_axis(code: &'static str, axis_name: &str, axis: &[f64]) -> CheckResult<()> {
    if axis.len() < 2 {
        return Err(CheckError::parse(
            code,
            format!("{} needs at least two entries, found {}", axis_name, axis.len()),
        ));
    }

    if axis[0] <= 0.0 || !axis.iter().all(|value| value.is_finite()) {
        return Err(CheckError::parse(
            code,
            format!("{} entries must be finite and positive", axis_name),
        ));
    }

    if !is_strictly_increasing(axis) {
        return Err(CheckError::parse(
            code,
            format!("{} must be strictly increasing", axis_name),
        ));
    }

    Ok(())
}

fn numeric_rows(source: &str) -> Vec<Vec<f64>> {
    source
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('!'))
        .map(parse_numeric_tokens)
        .filter(|tokens| !tokens.is_empty())
        .collect()
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

#[cfg(test)]
mod tests {
    use super::{CorrectionTables, OUT_OF_DOMAIN, OutputFactorTable, TableLoadError, TprTable};
    use crate::domain::errors::{CheckError, CheckErrorCategory};
    use std::fs;
    use tempfile::TempDir;

    const TPR_FIXTURE: &str = "# commissioning export\n\
depth   5.0   6.0  10.0\n\
 1.0  0.993 0.994 0.997\n\
 5.0  0.916 0.923 0.942\n\
10.0  0.812 0.820 0.845\n";

    const SCP_FIXTURE: &str = "# relative output factors\n\
 5.0; 0.957\n\
 6.0; 0.964\n\
10.0; 0.986\n";

    #[test]
    fn tpr_grid_parses_comments_headers_and_mixed_delimiters() {
        let table = TprTable::from_source(TPR_FIXTURE).expect("fixture grid should parse");

        assert_eq!(table.depths_cm(), &[1.0, 5.0, 10.0]);
        assert_eq!(table.field_sizes_cm(), &[5.0, 6.0, 10.0]);
        assert_eq!(table.ratio(5.0, 5.0), 0.916);
        assert_eq!(table.ratio(10.0, 10.0), 0.845);
    }

    #[test]
    fn tpr_interpolates_between_field_sizes() {
        let table = TprTable::from_source(TPR_FIXTURE).expect("fixture grid should parse");
        let ratio = table.ratio(5.0, 40.0 / 7.0);
        assert!((ratio - 0.921).abs() <= 1.0e-12);
    }

    #[test]
    fn tpr_lookup_outside_domain_returns_sentinel() {
        let table = TprTable::from_source(TPR_FIXTURE).expect("fixture grid should parse");

        assert_eq!(table.ratio(0.5, 6.0), OUT_OF_DOMAIN);
        assert_eq!(table.ratio(25.0, 6.0), OUT_OF_DOMAIN);
        assert_eq!(table.ratio(5.0, 4.0), OUT_OF_DOMAIN);
        assert_eq!(table.ratio(5.0, 30.0), OUT_OF_DOMAIN);
    }

    #[test]
    fn tpr_rejects_misshapen_rows() {
        let source = "depth 5.0 6.0\n1.0 0.993\n5.0 0.916 0.923\n";
        let error = TprTable::from_source(source).expect_err("short row should fail");
        assert_eq!(error.code(), "PARSE.TPR_SHAPE");
    }

    #[test]
    fn tpr_rejects_non_increasing_axes() {
        let source = "depth 6.0 5.0\n1.0 0.993 0.994\n5.0 0.916 0.923\n";
        let error = TprTable::from_source(source).expect_err("reversed axis should fail");
        assert_eq!(error.code(), "PARSE.TPR_AXIS");
        assert_eq!(error.category(), CheckErrorCategory::ParseError);
    }

    #[test]
    fn tpr_rejects_values_outside_unit_interval() {
        let source = "depth 5.0 6.0\n1.0 0.993 1.200\n5.0 0.916 0.923\n";
        let error = TprTable::from_source(source).expect_err("ratio above one should fail");
        assert_eq!(error.code(), "PARSE.TPR_VALUE");
    }

    #[test]
    fn scp_curve_parses_and_interpolates() {
        let table = OutputFactorTable::from_source(SCP_FIXTURE).expect("curve should parse");

        assert_eq!(table.factor(5.0), 0.957);
        assert_eq!(table.factor(10.0), 0.986);
        let factor = table.factor(40.0 / 7.0);
        assert!((factor - 0.962).abs() <= 1.0e-12);
        assert_eq!(table.factor(4.9), OUT_OF_DOMAIN);
        assert_eq!(table.factor(10.1), OUT_OF_DOMAIN);
    }

    #[test]
    fn scp_rejects_rows_without_a_factor() {
        let error =
            OutputFactorTable::from_source("5.0 0.957\n6.0\n").expect_err("row should fail");
        assert_eq!(error.code(), "PARSE.SCP_ROW");
    }

    #[test]
    fn reference_tables_are_cached_and_anchor_values_hold() {
        let first = CorrectionTables::reference();
        let second = CorrectionTables::reference();
        assert!(std::ptr::eq(first, second), "cache should hand out one instance");

        assert_eq!(first.tpr.ratio(5.0, 5.0), 0.916);
        assert_eq!(first.tpr.ratio(5.0, 6.0), 0.923);
        assert_eq!(first.scp.factor(5.0), 0.957);
        assert_eq!(first.scp.factor(6.0), 0.964);
    }

    #[test]
    fn tables_load_from_files_and_report_missing_paths() {
        let temp = TempDir::new().expect("tempdir should be created");
        let tpr_path = temp.path().join("tpr.csv");
        let scp_path = temp.path().join("scp.csv");
        fs::write(&tpr_path, TPR_FIXTURE).expect("tpr fixture should be staged");
        fs::write(&scp_path, SCP_FIXTURE).expect("scp fixture should be staged");

        let tables =
            CorrectionTables::from_paths(&tpr_path, &scp_path).expect("tables should load");
        assert_eq!(tables.tpr.ratio(5.0, 5.0), 0.916);

        let missing = temp.path().join("absent.csv");
        let error = CorrectionTables::from_paths(&missing, &scp_path)
            .expect_err("missing file should fail");
        assert!(matches!(error, TableLoadError::Read { .. }));

        let check_error = CheckError::from(error);
        assert_eq!(check_error.category(), CheckErrorCategory::IoError);
        assert_eq!(check_error.code(), "IO.TABLE_READ");
    }
}
