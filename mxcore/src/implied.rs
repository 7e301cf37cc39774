use ndarray::linalg::kron;
use ndarray::{Array2, array};

use crate::linalg::{LinalgError, inverse};
use crate::types::Zygosity;

/// m · mᵗ
pub fn outer(m: &Array2<f64>) -> Array2<f64> {
    m.dot(&m.t())
}

/// 2×2 twin relatedness pattern with `cross` off the diagonal.
pub fn relatedness(cross: f64) -> Array2<f64> {
    array![[1.0, cross], [cross, 1.0]]
}

/// Cross-twin correlations for the genetic and shared components.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossTwin {
    pub a: f64,
    pub c: f64,
}

impl CrossTwin {
    pub fn for_zygosity(zygosity: Zygosity, dz_ar: f64, dz_cr: f64) -> Self {
        match zygosity {
            Zygosity::Mz => CrossTwin { a: 1.0, c: 1.0 },
            Zygosity::Dz => CrossTwin { a: dz_ar, c: dz_cr },
        }
    }
}

/// Expected twin-pair covariance, twin-major ordering:
/// kron(R_a, a·aᵗ) + kron(R_c, c·cᵗ) + kron(I₂, e·eᵗ).
pub fn twin_covariance(
    a: &Array2<f64>,
    c: &Array2<f64>,
    e: &Array2<f64>,
    cross: CrossTwin,
) -> Array2<f64> {
    kron(&relatedness(cross.a), &outer(a))
        + kron(&relatedness(cross.c), &outer(c))
        + kron(&Array2::<f64>::eye(2), &outer(e))
}

/// Expands a per-person matrix to a twin pair without cross-twin terms.
pub fn per_twin(m: &Array2<f64>) -> Array2<f64> {
    kron(&Array2::<f64>::eye(2), m)
}

/// (I−β)⁻¹ · Σ · (I−β)⁻ᵗ with (I−β)⁻¹ applied to each twin.
pub fn causal_sandwich(beta: &Array2<f64>, sigma: &Array2<f64>) -> Result<Array2<f64>, LinalgError> {
    let n = beta.nrows();
    let i_minus_beta = Array2::<f64>::eye(n) - beta;
    let inv = per_twin(&inverse(&i_minus_beta, "I - beta")?);
    Ok(inv.dot(sigma).dot(&inv.t()))
}

/// L · Σ · Lᵗ
pub fn congruence(loadings: &Array2<f64>, sigma: &Array2<f64>) -> Array2<f64> {
    loadings.dot(sigma).dot(&loadings.t())
}
