use mxcore::stats::likelihood_ratio_p;
use mxcore::{MxModel, SemEngine};
use tracing::debug;

use crate::config::ReportOptions;
use crate::error::{Result, TwinSemError};
use crate::types::{ComparisonRow, ComparisonTable};

/// APA-style p-value text: `digits` decimals, anything under `p_min`
/// collapsed to the bound, which is printed as given.
pub fn format_p_value(p: f64, options: &ReportOptions) -> String {
    if !p.is_finite() {
        return "NA".to_string();
    }
    let digits = options.p_digits;
    if p < options.p_min {
        return match options.add_comparison {
            Some(false) => format!("{}", options.p_min),
            _ => format!("< {}", options.p_min),
        };
    }
    match options.add_comparison {
        Some(true) => format!("= {p:.digits$}"),
        _ => format!("{p:.digits$}"),
    }
}

/// Names of every model in `models` that carries no fit.
pub fn unfitted_names(models: &[&MxModel]) -> Vec<String> {
    models
        .iter()
        .filter(|m| !m.is_fitted())
        .map(|m| m.name.clone())
        .collect()
}

struct FitRow {
    ep: usize,
    m2ll: f64,
    df: i64,
    aic: f64,
}

fn fit_of<E>(engine: &E, model: &MxModel) -> Result<FitRow>
where
    E: SemEngine + ?Sized,
{
    let missing = || TwinSemError::UnfittedModel {
        models: vec![model.name.clone()],
    };
    let ep = model.fit.map(|f| f.estimated_parameters).ok_or_else(missing)?;
    let m2ll = engine.log_likelihood(model).map(|ll| -2.0 * ll).ok_or_else(missing)?;
    let df = engine.degrees_of_freedom(model).ok_or_else(missing)?;
    let aic = engine.aic(model).ok_or_else(missing)?;
    Ok(FitRow { ep, m2ll, df, aic })
}

/// Likelihood-ratio comparison of each model in `comparisons` against `base`.
///
/// The base row comes first and has no deltas. A comparison with no positive
/// degrees of freedom gets no p-value.
pub fn compare<E>(
    engine: &E,
    base: &MxModel,
    comparisons: &[&MxModel],
    options: &ReportOptions,
) -> Result<ComparisonTable>
where
    E: SemEngine + ?Sized,
{
    let mut all = vec![base];
    all.extend_from_slice(comparisons);
    let unfitted = unfitted_names(&all);
    if !unfitted.is_empty() {
        return Err(TwinSemError::UnfittedModel { models: unfitted });
    }

    let base_fit = fit_of(engine, base)?;
    let mut rows = Vec::with_capacity(all.len());
    rows.push(ComparisonRow {
        model: base.name.clone(),
        ep: base_fit.ep,
        minus2ll: base_fit.m2ll,
        delta_m2ll: None,
        delta_df: None,
        p: None,
        p_display: String::new(),
        aic: base_fit.aic,
        compare_with: None,
    });

    for model in comparisons {
        let fit = fit_of(engine, model)?;
        let delta_m2ll = fit.m2ll - base_fit.m2ll;
        let delta_df = fit.df - base_fit.df;
        let p = likelihood_ratio_p(delta_m2ll, delta_df);
        debug!(
            "{} vs {}: delta -2LL = {delta_m2ll:.3}, delta df = {delta_df}, p = {p}",
            model.name, base.name
        );
        rows.push(ComparisonRow {
            model: model.name.clone(),
            ep: fit.ep,
            minus2ll: fit.m2ll,
            delta_m2ll: Some(delta_m2ll),
            delta_df: Some(delta_df),
            p: (!p.is_nan()).then_some(p),
            p_display: format_p_value(p, options),
            aic: fit.aic,
            compare_with: Some(base.name.clone()),
        });
    }
    Ok(ComparisonTable { rows })
}
