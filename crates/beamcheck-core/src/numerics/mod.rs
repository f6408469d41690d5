//! Interpolation and comparison primitives for the correction-table lookups
//! and the cross-check tolerance math.
//!
//! Interpolation never extrapolates: queries outside the grid return `None`
//! and the table layer maps that to its out-of-domain sentinel. Queries at an
//! exact grid node return the tabulated value exactly.

pub fn is_strictly_increasing(values: &[f64]) -> bool {
    values.windows(2).all(|window| window[0] < window[1])
}

/// Locates the grid segment containing `x` and the blend fraction inside it.
/// `None` when the grid is too short, not strictly increasing, or `x` falls
/// outside `[first, last]`.
fn locate_segment(x: f64, grid: &[f64]) -> Option<(usize, usize, f64)> {
    if grid.len() < 2 || !x.is_finite() || !is_strictly_increasing(grid) {
        return None;
    }

    let last = grid.len() - 1;
    if x < grid[0] || x > grid[last] {
        return None;
    }

    let upper = grid
        .windows(2)
        .position(|window| x <= window[1])
        .map(|index| index + 1)?;
    let lower = upper - 1;
    let fraction = (x - grid[lower]) / (grid[upper] - grid[lower]);
    Some((lower, upper, fraction))
}

fn blend(lower: f64, upper: f64, fraction: f64) -> f64 {
    lower * (1.0 - fraction) + upper * fraction
}

pub fn interpolate_linear(x: f64, x_grid: &[f64], y_grid: &[f64]) -> Option<f64> {
    if x_grid.len() != y_grid.len() {
        return None;
    }

    let (lower, upper, fraction) = locate_segment(x, x_grid)?;
    Some(blend(y_grid[lower], y_grid[upper], fraction))
}

/// Bilinear interpolation over `rows`, indexed by `x_grid` per row and
/// `y_grid` per column.
pub fn interpolate_bilinear(
    x: f64,
    y: f64,
    x_grid: &[f64],
    y_grid: &[f64],
    rows: &[Vec<f64>],
) -> Option<f64> {
    if rows.len() != x_grid.len() || rows.iter().any(|row| row.len() != y_grid.len()) {
        return None;
    }

    let (lower_row, upper_row, row_fraction) = locate_segment(x, x_grid)?;
    let at_lower = interpolate_linear(y, y_grid, &rows[lower_row])?;
    let at_upper = interpolate_linear(y, y_grid, &rows[upper_row])?;
    Some(blend(at_lower, at_upper, row_fraction))
}

pub fn relative_difference(lhs: f64, rhs: f64, relative_floor: f64) -> f64 {
    let scale = lhs.abs().max(rhs.abs()).max(relative_floor);
    (lhs - rhs).abs() / scale
}

pub fn within_relative_tolerance(lhs: f64, rhs: f64, rel_tol: f64, relative_floor: f64) -> bool {
    relative_difference(lhs, rhs, relative_floor) <= rel_tol
}

#[cfg(test)]
mod tests {
    use super::{
        interpolate_bilinear, interpolate_linear, is_strictly_increasing, relative_difference,
        within_relative_tolerance,
    };

    const X_GRID: [f64; 4] = [1.0, 2.0, 4.0, 8.0];
    const Y_VALUES: [f64; 4] = [10.0, 20.0, 40.0, 80.0];

    #[test]
    fn linear_interpolation_is_exact_at_grid_nodes() {
        for (index, &x) in X_GRID.iter().enumerate() {
            assert_eq!(
                interpolate_linear(x, &X_GRID, &Y_VALUES),
                Some(Y_VALUES[index]),
                "node {index} should reproduce its tabulated value exactly"
            );
        }
    }

    #[test]
    fn linear_interpolation_blends_between_nodes() {
        let mid = interpolate_linear(3.0, &X_GRID, &Y_VALUES).expect("query should be in domain");
        assert!((mid - 30.0).abs() <= 1.0e-12);
    }

    #[test]
    fn linear_interpolation_refuses_out_of_domain_queries() {
        assert_eq!(interpolate_linear(0.999, &X_GRID, &Y_VALUES), None);
        assert_eq!(interpolate_linear(8.001, &X_GRID, &Y_VALUES), None);
        assert_eq!(interpolate_linear(f64::NAN, &X_GRID, &Y_VALUES), None);
    }

    #[test]
    fn linear_interpolation_rejects_invalid_grids() {
        assert_eq!(interpolate_linear(1.0, &[1.0], &[10.0]), None);
        assert_eq!(interpolate_linear(1.5, &[1.0, 2.0], &[10.0]), None);
        assert_eq!(
            interpolate_linear(1.5, &[1.0, 3.0, 2.0], &[1.0, 3.0, 2.0]),
            None
        );
        assert_eq!(
            interpolate_linear(1.5, &[1.0, 1.0, 2.0], &[1.0, 1.0, 2.0]),
            None
        );
    }

    #[test]
    fn bilinear_interpolation_is_exact_at_grid_nodes() {
        let rows = vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]];
        let x_grid = [0.0, 1.0];
        let y_grid = [10.0, 20.0, 30.0];

        for (row_index, &x) in x_grid.iter().enumerate() {
            for (column_index, &y) in y_grid.iter().enumerate() {
                assert_eq!(
                    interpolate_bilinear(x, y, &x_grid, &y_grid, &rows),
                    Some(rows[row_index][column_index])
                );
            }
        }
    }

    #[test]
    fn bilinear_interpolation_blends_inside_a_cell() {
        let rows = vec![vec![1.0, 3.0], vec![5.0, 7.0]];
        let center = interpolate_bilinear(0.5, 15.0, &[0.0, 1.0], &[10.0, 20.0], &rows)
            .expect("center query should be in domain");
        assert!((center - 4.0).abs() <= 1.0e-12);
    }

    #[test]
    fn bilinear_interpolation_rejects_shape_mismatch_and_out_of_domain() {
        let rows = vec![vec![1.0, 3.0], vec![5.0, 7.0]];
        assert_eq!(
            interpolate_bilinear(0.5, 15.0, &[0.0, 1.0, 2.0], &[10.0, 20.0], &rows),
            None
        );
        assert_eq!(
            interpolate_bilinear(0.5, 15.0, &[0.0, 1.0], &[10.0, 20.0, 30.0], &rows),
            None
        );
        assert_eq!(
            interpolate_bilinear(1.5, 15.0, &[0.0, 1.0], &[10.0, 20.0], &rows),
            None
        );
        assert_eq!(
            interpolate_bilinear(0.5, 25.0, &[0.0, 1.0], &[10.0, 20.0], &rows),
            None
        );
    }

    #[test]
    fn interpolation_preserves_monotonicity_of_monotone_tables() {
        let mut previous = f64::NEG_INFINITY;
        let mut x = 1.0;
        while x <= 8.0 {
            let value =
                interpolate_linear(x, &X_GRID, &Y_VALUES).expect("query should be in domain");
            assert!(value >= previous, "value should not decrease at x={x}");
            previous = value;
            x += 0.25;
        }
    }

    #[test]
    fn strictly_increasing_detects_plateaus_and_reversals() {
        assert!(is_strictly_increasing(&[1.0, 2.0, 3.0]));
        assert!(!is_strictly_increasing(&[1.0, 1.0, 3.0]));
        assert!(!is_strictly_increasing(&[1.0, 3.0, 2.0]));
    }

    #[test]
    fn relative_difference_uses_relative_floor() {
        let diff = relative_difference(0.0, 1.0e-10, 1.0e-6);
        assert!((diff - 1.0e-4).abs() <= 1.0e-12);
    }

    #[test]
    fn relative_tolerance_boundary_is_inclusive() {
        // 4/100 is the same f64 as the 0.04 literal, so this sits exactly on
        // the threshold.
        assert!(within_relative_tolerance(96.0, 100.0, 0.04, 1.0e-9));
        assert!(within_relative_tolerance(100.0, 103.0, 0.03, 1.0e-9));
        assert!(!within_relative_tolerance(100.0, 103.2, 0.03, 1.0e-9));
    }
}
