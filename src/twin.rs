//! Builders for the twin model families the reducer and standardizer read.
//!
//! Every free cell gets its label and `ParameterAddress` here, at
//! construction, so later reductions address cells directly instead of
//! pattern-matching label strings.

use mxcore::implied::{CrossTwin, twin_covariance};
use mxcore::{ModelKind, MxMatrix, MxModel, Zygosity};
use ndarray::Array2;
use polars::prelude::DataFrame;
use tracing::info;

use crate::data::{path_starts, twin_column_names, validate_twin_data};
use crate::error::{Result, TwinSemError};
use crate::matrix::diagonal;
use crate::qc::{check_positive, check_range_f64};

pub const DZ_AR: &str = "dzAr";
pub const DZ_CR: &str = "dzCr";
pub const LIN_MEAN: &str = "lin11";
pub const QUAD_MEAN: &str = "quad11";

/// The single value of a 1×1 matrix such as dzAr or dzCr.
pub fn scalar(model: &MxModel, name: &str) -> Result<f64> {
    model.values(name)?.get((0, 0)).copied().ok_or_else(|| {
        TwinSemError::InvalidArgument(format!("matrix {name} of {} is empty", model.name))
    })
}

/// Variables, data and twin-correlation settings shared by every builder.
#[derive(Debug, Clone)]
pub struct TwinSpec<'a> {
    pub name: String,
    /// Base variable names; columns are `<base><sep>1` and `<base><sep>2`.
    pub selected: Vec<String>,
    pub sep: String,
    pub mz: &'a DataFrame,
    pub dz: &'a DataFrame,
    pub dz_ar: f64,
    pub dz_cr: f64,
    pub covariates: Vec<String>,
}

impl<'a> TwinSpec<'a> {
    pub fn new(name: &str, selected: &[&str], sep: &str, mz: &'a DataFrame, dz: &'a DataFrame) -> Self {
        Self {
            name: name.to_string(),
            selected: selected.iter().map(|s| s.to_string()).collect(),
            sep: sep.to_string(),
            mz,
            dz,
            dz_ar: 0.5,
            dz_cr: 1.0,
            covariates: Vec::new(),
        }
    }

    pub fn with_dz_cr(mut self, dz_cr: f64) -> Self {
        self.dz_cr = dz_cr;
        self
    }

    pub fn with_covariates(mut self, covariates: &[&str]) -> Self {
        self.covariates = covariates.iter().map(|s| s.to_string()).collect();
        self
    }

    fn n_vars(&self) -> usize {
        self.selected.len()
    }

    fn manifests(&self) -> Vec<String> {
        twin_column_names(&self.selected, &self.sep)
    }

    /// Start values from the twin-1 MZ columns.
    fn starts(&self) -> Vec<f64> {
        let manifests = self.manifests();
        path_starts(self.mz, &manifests[..self.n_vars()])
    }

    fn base_model(&self, kind: ModelKind, extra_columns: &[String]) -> Result<MxModel> {
        check_positive(self.n_vars(), "number of selected variables")?;
        check_range_f64(self.dz_ar, 0.0, 1.0, true, DZ_AR)?;
        check_range_f64(self.dz_cr, 0.0, 1.0, true, DZ_CR)?;
        let mut manifests = self.manifests();
        manifests.extend(extra_columns.iter().cloned());
        let sample_size = validate_twin_data(self.mz, self.dz, &manifests)?;
        let mut model = MxModel::new(&self.name, kind)
            .with_matrix(MxMatrix::labelled_scalar(DZ_AR, DZ_AR, self.dz_ar))
            .with_matrix(MxMatrix::labelled_scalar(DZ_CR, DZ_CR, self.dz_cr));
        model.manifests = manifests;
        model.sample_size = Some(sample_size);
        Ok(model)
    }
}

/// Cholesky ACE (or ADE when dzCr = .25).
pub fn build_ace(spec: &TwinSpec<'_>) -> Result<MxModel> {
    let kind = if spec.covariates.is_empty() {
        ModelKind::Ace
    } else {
        ModelKind::AceCov
    };
    let covariate_columns = twin_column_names(&spec.covariates, &spec.sep);
    let base = spec.base_model(kind, &covariate_columns)?;
    let starts = diagonal(&spec.starts());
    let model = base
        .with_matrix(MxMatrix::lower("a", starts.clone()))
        .with_matrix(MxMatrix::lower("c", starts.clone()))
        .with_matrix(MxMatrix::lower("e", starts));
    info!(
        "built {} {} model over {} variables",
        model.name,
        model.kind,
        spec.n_vars()
    );
    Ok(model)
}

/// Common pathway with `n_factors` common factors.
pub fn build_cp(spec: &TwinSpec<'_>, n_factors: usize) -> Result<MxModel> {
    check_positive(n_factors, "number of common factors")?;
    let n = spec.n_vars();
    let base = spec.base_model(ModelKind::Cp, &[])?;
    let starts = diagonal(&spec.starts());
    let factor_paths = Array2::<f64>::eye(n_factors) * 0.5;
    let model = base
        .with_matrix(MxMatrix::diag("a_cp", factor_paths.clone()))
        .with_matrix(MxMatrix::diag("c_cp", factor_paths.clone()))
        .with_matrix(MxMatrix::diag("e_cp", factor_paths))
        .with_matrix(MxMatrix::full(
            "cp_loadings",
            Array2::from_elem((n, n_factors), 0.5),
        ))
        .with_matrix(MxMatrix::diag("as", starts.clone()))
        .with_matrix(MxMatrix::diag("cs", starts.clone()))
        .with_matrix(MxMatrix::diag("es", starts));
    info!("built {} CP model with {n_factors} factor(s)", model.name);
    Ok(model)
}

/// Independent pathway with `n_factors` factors per component.
pub fn build_ip(spec: &TwinSpec<'_>, n_factors: usize) -> Result<MxModel> {
    check_positive(n_factors, "number of independent factors")?;
    let n = spec.n_vars();
    let base = spec.base_model(ModelKind::Ip, &[])?;
    let starts = diagonal(&spec.starts());
    let paths = Array2::from_elem((n, n_factors), 0.5);
    let model = base
        .with_matrix(MxMatrix::full("ai", paths.clone()))
        .with_matrix(MxMatrix::full("ci", paths.clone()))
        .with_matrix(MxMatrix::full("ei", paths))
        .with_matrix(MxMatrix::diag("as", starts.clone()))
        .with_matrix(MxMatrix::diag("cs", starts.clone()))
        .with_matrix(MxMatrix::diag("es", starts));
    info!("built {} IP model with {n_factors} factor(s)", model.name);
    Ok(model)
}

/// Univariate moderation model: a, c, e and their moderators am, cm, em,
/// plus linear and quadratic moderation of the mean.
pub fn build_gxe(spec: &TwinSpec<'_>, moderator: &str) -> Result<MxModel> {
    if spec.n_vars() != 1 {
        return Err(TwinSemError::InvalidArgument(format!(
            "GxE takes one variable, got {}",
            spec.n_vars()
        )));
    }
    let moderator_columns = twin_column_names(&[moderator.to_string()], &spec.sep);
    let base = spec.base_model(ModelKind::Gxe, &moderator_columns)?;
    let start = spec.starts()[0];
    let path = Array2::from_elem((1, 1), start);
    let zero = Array2::<f64>::zeros((1, 1));

    let mut lin = MxMatrix::full("betaLin", zero.clone());
    lin.labels[(0, 0)] = Some(LIN_MEAN.to_string());
    let mut quad = MxMatrix::full("betaQuad", zero.clone());
    quad.labels[(0, 0)] = Some(QUAD_MEAN.to_string());

    let model = base
        .with_matrix(MxMatrix::full("a", path.clone()))
        .with_matrix(MxMatrix::full("c", path.clone()))
        .with_matrix(MxMatrix::full("e", path))
        .with_matrix(MxMatrix::full("am", zero.clone()))
        .with_matrix(MxMatrix::full("cm", zero.clone()))
        .with_matrix(MxMatrix::full("em", zero))
        .with_matrix(lin)
        .with_matrix(quad);
    info!("built {} GxE model moderated by {moderator}", model.name);
    Ok(model)
}

/// Expected twin-pair covariance of an ACE-family or DoC model at its
/// current values, twin-major.
pub fn expected_covariance(model: &MxModel, zygosity: Zygosity) -> Result<Array2<f64>> {
    match model.kind {
        ModelKind::Ace | ModelKind::AceCov => {
            let dz_ar = scalar(model, DZ_AR)?;
            let dz_cr = scalar(model, DZ_CR)?;
            Ok(twin_covariance(
                model.values("a")?,
                model.values("c")?,
                model.values("e")?,
                CrossTwin::for_zygosity(zygosity, dz_ar, dz_cr),
            ))
        }
        ModelKind::Doc(_) => crate::doc::expected_covariance(model, zygosity),
        other => Err(TwinSemError::unsupported(other, "twin expected covariance")),
    }
}
