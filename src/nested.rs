//! Nested-model reduction.
//!
//! The builder only decides which cells to fix and in what order; every
//! variant is refit by the engine from its own copy of its parent.

use std::collections::{BTreeMap, BTreeSet};

use mxcore::{Constraint, ModelKind, MxModel, ParamValue, SemEngine};
use tracing::{info, warn};

use crate::compare::compare;
use crate::config::EngineConfig;
use crate::error::{Result, TwinSemError};
use crate::parallel::map_jobs;
use crate::qc::check_dz_cr;
use crate::rank::{rank, sole_model_weights};
use crate::twin::{DZ_CR, scalar};
use crate::types::{AicWeightSet, ComparisonTable, ModelVariant, VariantFailure};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReductionFamily {
    /// Cholesky with dzCr = 1.
    Ace,
    /// Cholesky with dzCr = .25.
    Ade,
    Gxe,
}

impl ReductionFamily {
    pub fn of(model: &MxModel) -> Result<Self> {
        match model.kind {
            ModelKind::Ace | ModelKind::AceCov => {
                let dz_cr = scalar(model, DZ_CR)?;
                check_dz_cr(dz_cr)?;
                Ok(if dz_cr == 1.0 {
                    ReductionFamily::Ace
                } else {
                    ReductionFamily::Ade
                })
            }
            ModelKind::Gxe => Ok(ReductionFamily::Gxe),
            other => Err(TwinSemError::unsupported(other, "nested-model reduction")),
        }
    }
}

/// One reduction: fix every free cell of `drop` in `parent` to 0.
#[derive(Debug, Clone, PartialEq)]
pub struct ReductionStep {
    pub name: String,
    pub parent: String,
    pub drop: Vec<String>,
}

impl ReductionStep {
    pub fn new(name: &str, parent: &str, drop: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            parent: parent.to_string(),
            drop: drop.iter().map(|m| m.to_string()).collect(),
        }
    }
}

#[derive(Debug)]
pub struct NestedSet {
    pub base: MxModel,
    pub family: ReductionFamily,
    /// Name of the model the drop-A / drop-C reductions started from.
    pub preferred: String,
    pub variants: Vec<ModelVariant>,
    pub failures: Vec<VariantFailure>,
}

impl NestedSet {
    pub fn variant(&self, name: &str) -> Option<&ModelVariant> {
        self.variants.iter().find(|v| v.name == name)
    }

    /// The base followed by every successfully refit variant.
    pub fn models(&self) -> Vec<&MxModel> {
        let mut out = vec![&self.base];
        out.extend(self.variants.iter().map(|v| &v.model));
        out
    }
}

/// Constraints fixing every free cell of each matrix in `matrices` to 0.
pub fn drop_constraints(model: &MxModel, matrices: &[String]) -> Result<Vec<Constraint>> {
    let mut out = Vec::new();
    for name in matrices {
        let free = model.free_addresses(name)?;
        if free.is_empty() {
            return Err(TwinSemError::InvalidArgument(format!(
                "matrix {name} of {} has no free parameters to drop",
                model.name
            )));
        }
        out.extend(free.into_iter().map(|addr| Constraint::fix(addr, 0.0)));
    }
    Ok(out)
}

/// Applies `constraints` to a copy of `parent` and refits it.
pub fn refit_variant<E>(
    engine: &E,
    parent: &MxModel,
    name: &str,
    constraints: Vec<Constraint>,
    config: &EngineConfig,
) -> Result<ModelVariant>
where
    E: SemEngine + ?Sized,
{
    let unfitted = engine.modify(parent, &constraints, name)?;
    let only_fixes = constraints
        .iter()
        .all(|c| matches!(c.value, ParamValue::Fixed(_)));
    if only_fixes {
        let parent_free = parent.free_labels();
        let invented: BTreeSet<String> = unfitted
            .free_labels()
            .difference(&parent_free)
            .cloned()
            .collect();
        if !invented.is_empty() {
            return Err(TwinSemError::InvalidArgument(format!(
                "{name} frees parameters its parent {} does not: {invented:?}",
                parent.name
            )));
        }
    }
    let fitted = engine
        .fit(&unfitted, &config.fit)
        .map_err(|e| TwinSemError::optimization(name, e))?;
    let Some(fit) = fitted.fit else {
        return Err(TwinSemError::UnfittedModel {
            models: vec![name.to_string()],
        });
    };
    info!(
        "{name} (from {}): -2LL = {:.3}, ep = {}, AIC = {:.3}",
        parent.name, fit.minus2ll, fit.estimated_parameters, fit.aic
    );
    Ok(ModelVariant {
        name: name.to_string(),
        parent: parent.name.clone(),
        constraints,
        model: fitted,
    })
}

fn run_step<E>(
    engine: &E,
    parent: &MxModel,
    step: &ReductionStep,
    config: &EngineConfig,
) -> Result<ModelVariant>
where
    E: SemEngine + ?Sized,
{
    let constraints = drop_constraints(parent, &step.drop)?;
    refit_variant(engine, parent, &step.name, constraints, config)
}

/// Runs `steps` level by level: a step starts once its parent has been refit.
/// Results keep the order of `steps`.
pub fn run_plan<E>(
    engine: &E,
    roots: &[&MxModel],
    steps: &[ReductionStep],
    config: &EngineConfig,
) -> Result<(Vec<ModelVariant>, Vec<VariantFailure>)>
where
    E: SemEngine + Sync + ?Sized,
{
    let mut available: BTreeMap<String, MxModel> = roots
        .iter()
        .map(|m| (m.name.clone(), (*m).clone()))
        .collect();
    let mut failed: BTreeSet<String> = BTreeSet::new();
    let mut outcomes: BTreeMap<usize, Result<ModelVariant>> = BTreeMap::new();
    let mut pending: Vec<usize> = (0..steps.len()).collect();

    while !pending.is_empty() {
        let (ready, waiting): (Vec<usize>, Vec<usize>) = pending.into_iter().partition(|&i| {
            available.contains_key(&steps[i].parent) || failed.contains(&steps[i].parent)
        });
        if ready.is_empty() {
            for i in waiting {
                let step = &steps[i];
                failed.insert(step.name.clone());
                outcomes.insert(
                    i,
                    Err(TwinSemError::InvalidArgument(format!(
                        "{} names unknown parent {}",
                        step.name, step.parent
                    ))),
                );
            }
            break;
        }

        let mut jobs = Vec::new();
        for i in ready {
            let step = &steps[i];
            match available.get(&step.parent) {
                Some(parent) => jobs.push((i, parent.clone())),
                None => {
                    failed.insert(step.name.clone());
                    outcomes.insert(
                        i,
                        Err(TwinSemError::ParentFailed {
                            variant: step.name.clone(),
                            parent: step.parent.clone(),
                        }),
                    );
                }
            }
        }

        let results = map_jobs(config, &jobs, |(i, parent)| {
            (*i, run_step(engine, parent, &steps[*i], config))
        })?;
        for (i, result) in results {
            match &result {
                Ok(variant) => {
                    available.insert(variant.name.clone(), variant.model.clone());
                }
                Err(err) => {
                    warn!("{} failed: {err}", steps[i].name);
                    failed.insert(steps[i].name.clone());
                }
            }
            outcomes.insert(i, result);
        }
        pending = waiting;
    }

    let mut variants = Vec::new();
    let mut failures = Vec::new();
    for (i, outcome) in outcomes {
        match outcome {
            Ok(v) => variants.push(v),
            Err(error) => failures.push(VariantFailure {
                variant: steps[i].name.clone(),
                error,
            }),
        }
    }
    Ok((variants, failures))
}

/// Builds and refits the fixed set of reductions for `family`.
pub fn build_nested_set<E>(
    engine: &E,
    model: &MxModel,
    family: ReductionFamily,
    config: &EngineConfig,
) -> Result<NestedSet>
where
    E: SemEngine + Sync + ?Sized,
{
    if !model.is_fitted() {
        return Err(TwinSemError::UnfittedModel {
            models: vec![model.name.clone()],
        });
    }
    let actual = ReductionFamily::of(model)?;
    if actual != family {
        return Err(TwinSemError::InvalidArgument(format!(
            "{} is a {actual:?} model but {family:?} reduction was requested",
            model.name
        )));
    }
    match family {
        ReductionFamily::Ace | ReductionFamily::Ade => reduce_cholesky(engine, model, family, config),
        ReductionFamily::Gxe => reduce_gxe(engine, model, config),
    }
}

fn reduce_cholesky<E>(
    engine: &E,
    base: &MxModel,
    family: ReductionFamily,
    config: &EngineConfig,
) -> Result<NestedSet>
where
    E: SemEngine + Sync + ?Sized,
{
    let (regime, alt_name, alt_dz_cr) = match family {
        ReductionFamily::Ace => ("ACE", "ADE", 0.25),
        _ => ("ADE", "ACE", 1.0),
    };
    // A base named after the other regime would collide with the alternative.
    let base = if base.name == alt_name {
        info!("{} has dzCr of the {regime} regime; reducing it as {regime}", base.name);
        base.renamed(regime)
    } else {
        base.clone()
    };
    let alternative = refit_variant(
        engine,
        &base,
        alt_name,
        vec![Constraint::fix_label(DZ_CR, alt_dz_cr)],
        config,
    );

    let mut variants = Vec::new();
    let mut failures = Vec::new();

    // The two full models are not nested; raw -2LL decides, ties keep the base.
    let preferred = match &alternative {
        Ok(alt) => match (alt.model.minus2ll(), base.minus2ll()) {
            (Some(alt_m2ll), Some(base_m2ll)) if alt_m2ll < base_m2ll => alt.model.clone(),
            _ => base.clone(),
        },
        Err(err) => {
            warn!("{alt_name} failed, reducing from {}: {err}", base.name);
            base.clone()
        }
    };
    let preferred_dz_cr = scalar(&preferred, DZ_CR)?;
    let drop_a = if preferred_dz_cr == 0.25 { "DE" } else { "CE" };
    info!(
        "{} preferred (dzCr = {preferred_dz_cr}); building {drop_a}, AE and E from it",
        preferred.name
    );

    match alternative {
        Ok(v) => variants.push(v),
        Err(error) => failures.push(VariantFailure {
            variant: alt_name.to_string(),
            error,
        }),
    }

    let steps = [
        ReductionStep::new(drop_a, &preferred.name, &["a"]),
        ReductionStep::new("AE", &preferred.name, &["c"]),
        ReductionStep::new("E", "AE", &["a"]),
    ];
    let (more, failed) = run_plan(engine, &[&preferred], &steps, config)?;
    variants.extend(more);
    failures.extend(failed);

    Ok(NestedSet {
        base,
        family,
        preferred: preferred.name.clone(),
        variants,
        failures,
    })
}

/// The moderation reductions, in reporting order.
pub fn gxe_steps(base: &str) -> Vec<ReductionStep> {
    vec![
        ReductionStep::new("No_lin_mean", base, &["betaLin"]),
        ReductionStep::new("No_quad_mean", base, &["betaQuad"]),
        ReductionStep::new("No_means_moderation", base, &["betaLin", "betaQuad"]),
        ReductionStep::new("DropAmod", base, &["am"]),
        ReductionStep::new("DropCmod", base, &["cm"]),
        ReductionStep::new("DropEmod", base, &["em"]),
        ReductionStep::new("DropACEmod", base, &["am", "cm", "em"]),
        ReductionStep::new("DropA_and_Amod", "DropAmod", &["a"]),
        ReductionStep::new("DropC_and_Cmod", "DropCmod", &["c"]),
        ReductionStep::new("DropC_and_Cmod_and_Emod", "DropC_and_Cmod", &["em"]),
    ]
}

fn reduce_gxe<E>(engine: &E, base: &MxModel, config: &EngineConfig) -> Result<NestedSet>
where
    E: SemEngine + Sync + ?Sized,
{
    let steps = gxe_steps(&base.name);
    let (variants, failures) = run_plan(engine, &[base], &steps, config)?;
    Ok(NestedSet {
        base: base.clone(),
        family: ReductionFamily::Gxe,
        preferred: base.name.clone(),
        variants,
        failures,
    })
}

#[derive(Debug)]
pub struct Reduction {
    pub nested: NestedSet,
    pub table: ComparisonTable,
    pub weights: AicWeightSet,
    pub best: MxModel,
}

/// Builds the nested set, compares every variant with the base and returns
/// the AIC-weighted best model.
pub fn reduce<E>(engine: &E, model: &MxModel, config: &EngineConfig) -> Result<Reduction>
where
    E: SemEngine + Sync + ?Sized,
{
    let family = ReductionFamily::of(model)?;
    let nested = build_nested_set(engine, model, family, config)?;
    let comparisons: Vec<&MxModel> = nested.variants.iter().map(|v| &v.model).collect();
    let table = compare(engine, &nested.base, &comparisons, &config.report)?;

    let candidates = nested.models();
    let weights = if candidates.len() >= 2 {
        rank(engine, &candidates, &config.report)?
    } else {
        sole_model_weights(engine, &nested.base, &config.report)?
    };
    let best = candidates[weights.best].clone();
    if !nested.failures.is_empty() {
        warn!(
            "{} variant(s) of {} failed: {}",
            nested.failures.len(),
            nested.base.name,
            nested
                .failures
                .iter()
                .map(|f| f.variant.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
    Ok(Reduction {
        nested,
        table,
        weights,
        best,
    })
}
