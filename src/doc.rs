//! Direction-of-causation models.
//!
//! Two latent traits X and Y, each measured by its own cluster of
//! indicators, with a 2×2 β of causal paths between them. A state only
//! decides which β cells are free; everything else is shared.

use std::collections::BTreeSet;

use mxcore::implied::{CrossTwin, causal_sandwich, congruence, per_twin, twin_covariance};
use mxcore::linalg::{LinalgError, inverse};
use mxcore::{
    CausalState, Constraint, ModelKind, MxMatrix, MxModel, ParameterAddress, SemEngine, Zygosity,
};
use ndarray::Array2;
use polars::prelude::DataFrame;
use tracing::{info, warn};

use crate::compare::compare;
use crate::config::EngineConfig;
use crate::data::{path_starts, twin_column_names, validate_twin_data};
use crate::error::{Result, TwinSemError};
use crate::matrix::diagonal;
use crate::parallel::map_jobs;
use crate::rank::{rank, sole_model_weights};
use crate::twin::{DZ_AR, DZ_CR, scalar};
use crate::types::{AicWeightSet, ComparisonTable, ModelVariant, VariantFailure};

pub const FACTOR_LOADINGS: &str = "FacLoad";
pub const BETA: &str = "beta";
/// X → Y, β[Y, X].
pub const A2B: &str = "a2b";
/// Y → X, β[X, Y].
pub const B2A: &str = "b2a";

const X: usize = 0;
const Y: usize = 1;

#[derive(Debug, Clone)]
pub struct DocSpec<'a> {
    pub name: String,
    /// Base names of the indicators of X.
    pub var1: Vec<String>,
    /// Base names of the indicators of Y.
    pub var2: Vec<String>,
    pub sep: String,
    pub mz: &'a DataFrame,
    pub dz: &'a DataFrame,
}

impl<'a> DocSpec<'a> {
    pub fn new(
        name: &str,
        var1: &[&str],
        var2: &[&str],
        sep: &str,
        mz: &'a DataFrame,
        dz: &'a DataFrame,
    ) -> Self {
        Self {
            name: name.to_string(),
            var1: var1.iter().map(|s| s.to_string()).collect(),
            var2: var2.iter().map(|s| s.to_string()).collect(),
            sep: sep.to_string(),
            mz,
            dz,
        }
    }

    fn indicators(&self) -> Vec<String> {
        self.var1.iter().chain(self.var2.iter()).cloned().collect()
    }

    fn check_clusters(&self) -> Result<()> {
        if self.var1.is_empty() || self.var2.is_empty() {
            return Err(TwinSemError::Configuration(
                "both indicator clusters need at least one variable".to_string(),
            ));
        }
        let first: BTreeSet<&String> = self.var1.iter().collect();
        let shared: Vec<&str> = self
            .var2
            .iter()
            .filter(|v| first.contains(v))
            .map(String::as_str)
            .collect();
        if !shared.is_empty() {
            return Err(TwinSemError::Configuration(format!(
                "variables in both clusters: {}",
                shared.join(", ")
            )));
        }
        Ok(())
    }
}

fn beta_address(row: usize, col: usize) -> ParameterAddress {
    ParameterAddress::new(BETA, row, col)
}

/// β cells estimated in `state`.
pub fn free_cells(state: CausalState) -> Vec<ParameterAddress> {
    match state {
        CausalState::NonCausal => vec![],
        CausalState::XToY => vec![beta_address(Y, X)],
        CausalState::YToX => vec![beta_address(X, Y)],
        CausalState::Reciprocal => vec![beta_address(X, Y), beta_address(Y, X)],
    }
}

/// Fixed indicator loadings: the first cluster loads 1 on X, the second on Y.
fn loadings(n1: usize, n2: usize) -> Array2<f64> {
    Array2::from_shape_fn((n1 + n2, 2), |(i, j)| {
        let factor = if i < n1 { X } else { Y };
        if j == factor { 1.0 } else { 0.0 }
    })
}

fn causal_paths() -> MxMatrix {
    let mut beta = MxMatrix::fixed(BETA, Array2::zeros((2, 2)));
    beta.labels[(Y, X)] = Some(A2B.to_string());
    beta.labels[(X, Y)] = Some(B2A.to_string());
    beta
}

/// Builds the DoC model for `spec` and moves it to `state`.
///
/// Cluster and data problems are reported before anything is built.
pub fn assemble_doc(spec: &DocSpec<'_>, state: CausalState) -> Result<MxModel> {
    spec.check_clusters()?;
    let indicators = spec.indicators();
    let manifests = twin_column_names(&indicators, &spec.sep);
    let sample_size = validate_twin_data(spec.mz, spec.dz, &manifests)?;

    let latent_starts = diagonal(&[0.5, 0.5]);
    let specific_starts = diagonal(&path_starts(spec.mz, &manifests[..indicators.len()]));

    let mut model = MxModel::new(&spec.name, ModelKind::Doc(CausalState::NonCausal))
        .with_matrix(MxMatrix::fixed(
            FACTOR_LOADINGS,
            loadings(spec.var1.len(), spec.var2.len()),
        ))
        .with_matrix(causal_paths())
        .with_matrix(MxMatrix::lower("a", latent_starts.clone()))
        .with_matrix(MxMatrix::lower("c", latent_starts.clone()))
        .with_matrix(MxMatrix::diag("e", latent_starts))
        .with_matrix(MxMatrix::diag("as", specific_starts.clone()))
        .with_matrix(MxMatrix::diag("cs", specific_starts.clone()))
        .with_matrix(MxMatrix::diag("es", specific_starts))
        .with_matrix(MxMatrix::labelled_scalar(DZ_AR, DZ_AR, 0.5))
        .with_matrix(MxMatrix::labelled_scalar(DZ_CR, DZ_CR, 1.0));
    model.manifests = manifests;
    model.sample_size = Some(sample_size);
    info!(
        "assembled DoC model {} ({} + {} indicators)",
        model.name,
        spec.var1.len(),
        spec.var2.len()
    );

    if state == CausalState::NonCausal {
        Ok(model)
    } else {
        transition(&model, state)
    }
}

fn causal_state(model: &MxModel) -> Result<CausalState> {
    match model.kind {
        ModelKind::Doc(state) => Ok(state),
        other => Err(TwinSemError::unsupported(other, "causal state transition")),
    }
}

fn check_invertible(model: &MxModel) -> Result<()> {
    let beta = model.values(BETA)?;
    let i_minus_beta = Array2::<f64>::eye(beta.nrows()) - beta;
    match inverse(&i_minus_beta, "I - beta") {
        Ok(_) => Ok(()),
        Err(LinalgError::Singular { .. }) => Err(TwinSemError::CausalSingularity {
            model: model.name.clone(),
        }),
        Err(other) => Err(other.into()),
    }
}

/// Constraints taking any DoC model to `state`: off-target β cells fixed at
/// 0, target cells freed at their current value.
pub fn state_constraints(state: CausalState) -> Vec<Constraint> {
    let free = free_cells(state);
    [beta_address(Y, X), beta_address(X, Y)]
        .into_iter()
        .map(|addr| {
            if free.contains(&addr) {
                Constraint::free(addr)
            } else {
                Constraint::fix(addr, 0.0)
            }
        })
        .collect()
}

/// Returns an unfitted copy of `model` in `state`. Only β, the name and the
/// kind change.
pub fn transition(model: &MxModel, state: CausalState) -> Result<MxModel> {
    let from = causal_state(model)?;
    let mut out = model.modified(&state_constraints(state), state.model_name())?;
    out.kind = ModelKind::Doc(state);
    check_invertible(&out)?;
    info!("{} ({}) moved to {}", model.name, ModelKind::Doc(from), out.name);
    Ok(out)
}

/// Expected twin-pair covariance of the indicators, twin-major.
pub fn expected_covariance(model: &MxModel, zygosity: Zygosity) -> Result<Array2<f64>> {
    let state = causal_state(model)?;
    let cross = CrossTwin::for_zygosity(
        zygosity,
        scalar(model, DZ_AR)?,
        scalar(model, DZ_CR)?,
    );
    let mut latent = twin_covariance(
        model.values("a")?,
        model.values("c")?,
        model.values("e")?,
        cross,
    );
    if state != CausalState::NonCausal {
        latent = causal_sandwich(model.values(BETA)?, &latent).map_err(|e| match e {
            LinalgError::Singular { .. } => TwinSemError::CausalSingularity {
                model: model.name.clone(),
            },
            other => other.into(),
        })?;
    }
    let specifics = twin_covariance(
        model.values("as")?,
        model.values("cs")?,
        model.values("es")?,
        cross,
    );
    Ok(congruence(&per_twin(model.values(FACTOR_LOADINGS)?), &latent) + specifics)
}

fn fit_state<E>(
    engine: &E,
    base: &MxModel,
    state: CausalState,
    config: &EngineConfig,
) -> Result<ModelVariant>
where
    E: SemEngine + ?Sized,
{
    let unfitted = transition(base, state)?;
    let fitted = engine
        .fit(&unfitted, &config.fit)
        .map_err(|e| TwinSemError::optimization(state.model_name(), e))?;
    if !fitted.is_fitted() {
        return Err(TwinSemError::UnfittedModel {
            models: vec![fitted.name],
        });
    }
    Ok(ModelVariant {
        name: state.model_name().to_string(),
        parent: base.name.clone(),
        constraints: state_constraints(state),
        model: fitted,
    })
}

#[derive(Debug)]
pub struct DocComparison {
    /// Successful states, in `CausalState::ALL` order.
    pub variants: Vec<ModelVariant>,
    pub failures: Vec<VariantFailure>,
    /// `None` when every state failed.
    pub table: Option<ComparisonTable>,
    pub weights: Option<AicWeightSet>,
}

impl DocComparison {
    pub fn variant(&self, state: CausalState) -> Option<&ModelVariant> {
        self.variants.iter().find(|v| v.name == state.model_name())
    }
}

/// Most general first: every other state is nested in the one before it.
const BASE_PREFERENCE: [CausalState; 4] = [
    CausalState::Reciprocal,
    CausalState::XToY,
    CausalState::YToX,
    CausalState::NonCausal,
];

/// Fits all four causal states of `base`, tests each against the most
/// general state that fitted, and AIC-ranks them.
pub fn compare_causal_states<E>(
    engine: &E,
    base: &MxModel,
    config: &EngineConfig,
) -> Result<DocComparison>
where
    E: SemEngine + Sync + ?Sized,
{
    causal_state(base)?;
    let outcomes = map_jobs(config, &CausalState::ALL[..], |state| {
        (*state, fit_state(engine, base, *state, config))
    })?;

    let mut variants = Vec::new();
    let mut failures = Vec::new();
    for (state, outcome) in outcomes {
        match outcome {
            Ok(v) => variants.push(v),
            Err(error) => {
                warn!("{} failed: {error}", state.model_name());
                failures.push(VariantFailure {
                    variant: state.model_name().to_string(),
                    error,
                });
            }
        }
    }

    let fitted_state = |s: CausalState| variants.iter().find(|v| v.name == s.model_name());
    let Some(reference) = BASE_PREFERENCE.iter().find_map(|s| fitted_state(*s)) else {
        warn!("no causal state of {} could be fitted", base.name);
        return Ok(DocComparison {
            variants,
            failures,
            table: None,
            weights: None,
        });
    };

    let others: Vec<&MxModel> = variants
        .iter()
        .filter(|v| v.name != reference.name)
        .map(|v| &v.model)
        .collect();
    let table = compare(engine, &reference.model, &others, &config.report)?;
    let all: Vec<&MxModel> = variants.iter().map(|v| &v.model).collect();
    let weights = if all.len() >= 2 {
        rank(engine, &all, &config.report)?
    } else {
        sole_model_weights(engine, &reference.model, &config.report)?
    };

    Ok(DocComparison {
        table: Some(table),
        weights: Some(weights),
        variants,
        failures,
    })
}
