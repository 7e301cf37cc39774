//! Standardized path coefficients.
//!
//! Every routine here is a pure function of the values it reads: the model
//! passed in is never touched, and standardized models are fresh copies.

use mxcore::implied::{congruence, outer};
use mxcore::linalg::{LinalgError, diag_sqrt, inverse};
use mxcore::{ModelKind, MxModel};
use ndarray::Array2;
use tracing::debug;

use crate::doc::{BETA, FACTOR_LOADINGS};
use crate::error::{Result, TwinSemError};
use crate::matrix::ensure_same_square;
use crate::types::{PathMatrixSet, StandardizedEstimate, VarianceComponents};

pub fn variance_components(paths: &PathMatrixSet) -> Result<VarianceComponents> {
    ensure_same_square(&[("a", &paths.a), ("c", &paths.c), ("e", &paths.e)])?;
    let a = outer(&paths.a);
    let c = outer(&paths.c);
    let e = outer(&paths.e);
    let total = &a + &c + &e;
    Ok(VarianceComponents { a, c, e, total })
}

/// SD⁻¹ = diag(1/sqrt(diag(total))); a non-positive entry is a domain error
/// naming the trait.
fn inverse_sd(total: &Array2<f64>) -> Result<Array2<f64>> {
    let n = total.nrows();
    let mut sd_inv = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        let v = total[(i, i)];
        if !(v.is_finite() && v > 0.0) {
            return Err(TwinSemError::NonPositiveVariance {
                trait_index: i,
                variance: v,
            });
        }
        sd_inv[(i, i)] = 1.0 / v.sqrt();
    }
    Ok(sd_inv)
}

/// Rescales a, c and e so that each trait's total variance is 1.
pub fn standardize(a: &Array2<f64>, c: &Array2<f64>, e: &Array2<f64>) -> Result<StandardizedEstimate> {
    let raw = variance_components(&PathMatrixSet {
        a: a.clone(),
        c: c.clone(),
        e: e.clone(),
    })?;
    let sd_inv = inverse_sd(&raw.total)?;
    Ok(StandardizedEstimate {
        a_std: sd_inv.dot(a),
        c_std: sd_inv.dot(c),
        e_std: sd_inv.dot(e),
        raw,
    })
}

/// The a, c, e path matrices of an ACE-family or DoC model.
pub fn path_set(model: &MxModel) -> Result<PathMatrixSet> {
    Ok(PathMatrixSet {
        a: model.values("a")?.clone(),
        c: model.values("c")?.clone(),
        e: model.values("e")?.clone(),
    })
}

/// Returns a copy of `model`, named `<name>_std`, whose path values are
/// standardized.
pub fn standardize_model(model: &MxModel) -> Result<MxModel> {
    debug!("standardizing {} ({})", model.name, model.kind);
    let out = match model.kind {
        ModelKind::Ace | ModelKind::AceCov => standardize_ace(model),
        ModelKind::Doc(_) => standardize_doc(model),
        ModelKind::Cp => standardize_cp(model),
        ModelKind::Ip => standardize_ip(model),
        ModelKind::Gxe => Err(TwinSemError::unsupported(model.kind, "standardization")),
    }?;
    Ok(out.renamed(&format!("{}_std", model.name)))
}

fn standardize_ace(model: &MxModel) -> Result<MxModel> {
    let paths = path_set(model)?;
    let std = standardize(&paths.a, &paths.c, &paths.e)?;
    let mut out = model.clone();
    out.set_values("a", std.a_std)?;
    out.set_values("c", std.c_std)?;
    out.set_values("e", std.e_std)?;
    Ok(out)
}

/// Direction of causation: latent paths are scaled by the latent SD after the
/// causal paths act, β becomes D⁻¹·β·D, and everything reaching a manifest
/// is scaled by that manifest's SD.
fn standardize_doc(model: &MxModel) -> Result<MxModel> {
    let paths = path_set(model)?;
    let beta = model.values(BETA)?;
    let loadings = model.values(FACTOR_LOADINGS)?;
    ensure_same_square(&[("a", &paths.a), ("c", &paths.c), ("e", &paths.e), (BETA, beta)])?;

    let i_minus_beta = Array2::<f64>::eye(beta.nrows()) - beta;
    let reach = inverse(&i_minus_beta, "I - beta").map_err(|e| match e {
        LinalgError::Singular { .. } => TwinSemError::CausalSingularity {
            model: model.name.clone(),
        },
        other => other.into(),
    })?;
    let latent = congruence(&reach, &summed_variance(model, &["a", "c", "e"])?);
    let latent_sd_inv = inverse_sd(&latent)?;
    let latent_sd = diag_sqrt(&latent);

    let total = congruence(loadings, &latent) + summed_variance(model, &["as", "cs", "es"])?;
    ensure_same_square(&[("expected manifest variance", &total)])?;
    let sd_inv = inverse_sd(&total)?;

    let mut out = model.clone();
    out.set_values("a", latent_sd_inv.dot(&paths.a))?;
    out.set_values("c", latent_sd_inv.dot(&paths.c))?;
    out.set_values("e", latent_sd_inv.dot(&paths.e))?;
    out.set_values(BETA, latent_sd_inv.dot(beta).dot(&latent_sd))?;
    out.set_values(FACTOR_LOADINGS, sd_inv.dot(loadings).dot(&latent_sd))?;
    for name in ["as", "cs", "es"] {
        let scaled = sd_inv.dot(model.values(name)?);
        out.set_values(name, scaled)?;
    }
    Ok(out)
}

/// Σ m·mᵗ over the named path matrices of `model`.
pub fn summed_variance(model: &MxModel, matrices: &[&str]) -> Result<Array2<f64>> {
    let mut total: Option<Array2<f64>> = None;
    for name in matrices {
        let v = outer(model.values(name)?);
        total = Some(match total {
            None => v,
            Some(t) if t.dim() == v.dim() => t + v,
            Some(t) => {
                return Err(TwinSemError::InvalidArgument(format!(
                    "{name} contributes a {:?} variance, expected {:?}",
                    v.dim(),
                    t.dim()
                )));
            }
        });
    }
    total.ok_or_else(|| TwinSemError::InvalidArgument("no path matrices given".to_string()))
}

/// Common pathway: the common factors are scaled by their own SD, loadings
/// by manifest SD and factor SD, and specifics by manifest SD.
fn standardize_cp(model: &MxModel) -> Result<MxModel> {
    let a_cp = model.values("a_cp")?;
    let c_cp = model.values("c_cp")?;
    let e_cp = model.values("e_cp")?;
    let loadings = model.values("cp_loadings")?;
    ensure_same_square(&[("a_cp", a_cp), ("c_cp", c_cp), ("e_cp", e_cp)])?;

    let factor_var = summed_variance(model, &["a_cp", "c_cp", "e_cp"])?;
    let total = loadings.dot(&factor_var).dot(&loadings.t())
        + summed_variance(model, &["as", "cs", "es"])?;
    ensure_same_square(&[("expected manifest variance", &total)])?;

    let sd_inv = inverse_sd(&total)?;
    let factor_sd_inv = inverse_sd(&factor_var)?;
    let factor_sd = diag_sqrt(&factor_var);

    let mut out = model.clone();
    out.set_values("a_cp", factor_sd_inv.dot(a_cp))?;
    out.set_values("c_cp", factor_sd_inv.dot(c_cp))?;
    out.set_values("e_cp", factor_sd_inv.dot(e_cp))?;
    out.set_values("cp_loadings", sd_inv.dot(loadings).dot(&factor_sd))?;
    for name in ["as", "cs", "es"] {
        let scaled = sd_inv.dot(model.values(name)?);
        out.set_values(name, scaled)?;
    }
    Ok(out)
}

/// Independent pathway: every path into a manifest is scaled by its SD.
fn standardize_ip(model: &MxModel) -> Result<MxModel> {
    let total = summed_variance(model, &["ai", "ci", "ei", "as", "cs", "es"])?;
    ensure_same_square(&[("expected manifest variance", &total)])?;
    let sd_inv = inverse_sd(&total)?;

    let mut out = model.clone();
    for name in ["ai", "ci", "ei", "as", "cs", "es"] {
        let scaled = sd_inv.dot(model.values(name)?);
        out.set_values(name, scaled)?;
    }
    Ok(out)
}
