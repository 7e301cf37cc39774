use ndarray::Array2;

use crate::error::{Result, TwinSemError};

pub fn ensure_square(matrix: &Array2<f64>, name: &str) -> Result<usize> {
    let (rows, cols) = matrix.dim();
    if rows == 0 {
        return Err(TwinSemError::InvalidArgument(format!(
            "{name} must not be empty"
        )));
    }
    if rows != cols {
        return Err(TwinSemError::InvalidArgument(format!(
            "{name} must be square, got {rows}x{cols}"
        )));
    }
    Ok(rows)
}

/// All matrices square with the same order; returns that order.
pub fn ensure_same_square(matrices: &[(&str, &Array2<f64>)]) -> Result<usize> {
    let mut order = None;
    for (name, m) in matrices {
        let n = ensure_square(m, name)?;
        match order {
            None => order = Some(n),
            Some(expected) if expected != n => {
                return Err(TwinSemError::InvalidArgument(format!(
                    "{name} is {n}x{n} but expected {expected}x{expected}"
                )));
            }
            Some(_) => {}
        }
    }
    order.ok_or_else(|| TwinSemError::InvalidArgument("no matrices given".to_string()))
}

/// The "not computable" marker: every entry NaN.
pub fn nan_matrix(n: usize) -> Array2<f64> {
    Array2::from_elem((n, n), f64::NAN)
}

pub fn diagonal(values: &[f64]) -> Array2<f64> {
    let n = values.len();
    let mut out = Array2::<f64>::zeros((n, n));
    for (i, v) in values.iter().enumerate() {
        out[(i, i)] = *v;
    }
    out
}
