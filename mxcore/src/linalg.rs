use nalgebra::DMatrix;
use ndarray::Array2;
use thiserror::Error;

/// Determinants below this magnitude are treated as singular.
pub const SINGULAR_TOL: f64 = 1e-12;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LinalgError {
    #[error("{name} must be square, got {rows}x{cols}")]
    NotSquare {
        name: String,
        rows: usize,
        cols: usize,
    },
    #[error("{name} is singular")]
    Singular { name: String },
    #[error("{name} has non-positive diagonal entry {value} at index {index}")]
    NonPositiveDiagonal {
        name: String,
        index: usize,
        value: f64,
    },
}

pub fn to_dmatrix(matrix: &Array2<f64>) -> DMatrix<f64> {
    DMatrix::from_fn(matrix.nrows(), matrix.ncols(), |i, j| matrix[(i, j)])
}

pub fn from_dmatrix(matrix: &DMatrix<f64>) -> Array2<f64> {
    Array2::from_shape_fn((matrix.nrows(), matrix.ncols()), |(i, j)| matrix[(i, j)])
}

pub fn ensure_square(matrix: &Array2<f64>, name: &str) -> Result<usize, LinalgError> {
    let (rows, cols) = matrix.dim();
    if rows != cols {
        return Err(LinalgError::NotSquare {
            name: name.to_string(),
            rows,
            cols,
        });
    }
    Ok(rows)
}

/// Exact LU inverse. Fails instead of regularizing when `matrix` is singular.
pub fn inverse(matrix: &Array2<f64>, name: &str) -> Result<Array2<f64>, LinalgError> {
    ensure_square(matrix, name)?;
    let lu = to_dmatrix(matrix).lu();
    let det = lu.determinant();
    if !det.is_finite() || det.abs() < SINGULAR_TOL {
        return Err(LinalgError::Singular {
            name: name.to_string(),
        });
    }
    lu.try_inverse()
        .map(|inv| from_dmatrix(&inv))
        .ok_or_else(|| LinalgError::Singular {
            name: name.to_string(),
        })
}

/// diag(1 / sqrt(m_ii)), the congruence scaling that turns a covariance into
/// a correlation. Every diagonal entry must be finite and strictly positive.
pub fn inv_sqrt_diag(matrix: &Array2<f64>, name: &str) -> Result<Array2<f64>, LinalgError> {
    let n = ensure_square(matrix, name)?;
    let mut out = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        let v = matrix[(i, i)];
        if !(v.is_finite() && v > 0.0) {
            return Err(LinalgError::NonPositiveDiagonal {
                name: name.to_string(),
                index: i,
                value: v,
            });
        }
        out[(i, i)] = 1.0 / v.sqrt();
    }
    Ok(out)
}

pub fn diag_sqrt(matrix: &Array2<f64>) -> Array2<f64> {
    let n = matrix.nrows().min(matrix.ncols());
    let mut out = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        out[(i, i)] = matrix[(i, i)].max(0.0).sqrt();
    }
    out
}
