use mxcore::linalg::inv_sqrt_diag;
use ndarray::Array2;
use tracing::warn;

use crate::error::Result;
use crate::matrix::{ensure_same_square, nan_matrix};
use crate::types::{Component, CorrelationSet, VarianceComponents};

/// D^(−1/2)·M·D^(−1/2) with D = I⊙M, or an all-NaN block when D has a zero
/// or negative entry (e.g. C after dropping the shared environment).
pub fn correlation_block(m: &Array2<f64>, component: Component) -> Array2<f64> {
    let n = m.nrows();
    match inv_sqrt_diag(m, &component.to_string()) {
        Ok(scale) => scale.dot(m).dot(&scale),
        Err(err) => {
            warn!("r{component} not computable: {err}");
            nan_matrix(n)
        }
    }
}

/// Genetic and environmental correlations, each block computed on its own.
pub fn correlations(a: &Array2<f64>, c: &Array2<f64>, e: &Array2<f64>) -> Result<CorrelationSet> {
    ensure_same_square(&[("A", a), ("C", c), ("E", e)])?;
    Ok(CorrelationSet {
        ra: correlation_block(a, Component::A),
        rc: correlation_block(c, Component::C),
        re: correlation_block(e, Component::E),
    })
}

pub fn component_correlations(components: &VarianceComponents) -> Result<CorrelationSet> {
    correlations(&components.a, &components.c, &components.e)
}
