use mxcore::{MxModel, SemEngine};
use tracing::info;

use crate::compare::unfitted_names;
use crate::config::ReportOptions;
use crate::error::{Result, TwinSemError};
use crate::types::AicWeightSet;

/// Akaike weights: exp(−ΔAIC/2) normalized over the set.
///
/// Returns `(delta_aic, weights)`. Equal AICs share the weight evenly.
pub fn akaike_weights(aic: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let min = aic.iter().copied().fold(f64::INFINITY, f64::min);
    let delta: Vec<f64> = aic.iter().map(|a| a - min).collect();
    let raw: Vec<f64> = delta.iter().map(|d| (-0.5 * d).exp()).collect();
    let total: f64 = raw.iter().sum();
    let weights = raw.iter().map(|w| w / total).collect();
    (delta, weights)
}

fn round_to(value: f64, digits: usize) -> f64 {
    let scale = 10f64.powi(digits as i32);
    (value * scale).round() / scale
}

fn collect_aic<E>(engine: &E, models: &[&MxModel]) -> Result<Vec<f64>>
where
    E: SemEngine + ?Sized,
{
    let unfitted = unfitted_names(models);
    if !unfitted.is_empty() {
        return Err(TwinSemError::UnfittedModel { models: unfitted });
    }
    models
        .iter()
        .map(|m| {
            engine.aic(m).ok_or_else(|| TwinSemError::UnfittedModel {
                models: vec![m.name.clone()],
            })
        })
        .collect()
}

fn weight_set(models: &[&MxModel], aic: Vec<f64>, options: &ReportOptions) -> AicWeightSet {
    let (delta_aic, weights) = akaike_weights(&aic);
    let rounded = weights
        .iter()
        .map(|w| round_to(*w, options.weight_digits))
        .collect();
    // first minimum wins
    let best = delta_aic.iter().position(|d| *d == 0.0).unwrap_or(0);
    AicWeightSet {
        models: models.iter().map(|m| m.name.clone()).collect(),
        aic,
        delta_aic,
        weights,
        rounded,
        best,
    }
}

/// Ranks fitted models by AIC and returns their Akaike weights.
pub fn rank<E>(engine: &E, models: &[&MxModel], options: &ReportOptions) -> Result<AicWeightSet>
where
    E: SemEngine + ?Sized,
{
    if models.len() < 2 {
        return Err(TwinSemError::InvalidArgument(format!(
            "ranking needs at least two models, got {}",
            models.len()
        )));
    }
    let aic = collect_aic(engine, models)?;
    let set = weight_set(models, aic, options);
    info!(
        "best model by AIC: {} (weight {:.3})",
        set.best_name(),
        set.weights[set.best]
    );
    Ok(set)
}

/// A weight set holding only `model`, for reductions where every variant
/// failed.
pub fn sole_model_weights<E>(
    engine: &E,
    model: &MxModel,
    options: &ReportOptions,
) -> Result<AicWeightSet>
where
    E: SemEngine + ?Sized,
{
    let aic = collect_aic(engine, &[model])?;
    Ok(weight_set(&[model], aic, options))
}
