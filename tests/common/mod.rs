#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{Result, bail};
use mxcore::{FitOptions, FitSummary, MxModel, SemEngine};
use polars::prelude::*;

/// Deterministic stand-in for the optimizer: −2LL is looked up by model
/// name, ep is the free-parameter count, AIC = −2LL + 2·ep.
#[derive(Debug, Clone)]
pub struct ScriptedEngine {
    pub minus2ll: BTreeMap<String, f64>,
    pub default_minus2ll: f64,
    pub observed: i64,
    pub failing: BTreeSet<String>,
    /// Models returned without a fit, as a misbehaving engine might.
    pub silent: BTreeSet<String>,
}

impl ScriptedEngine {
    pub fn new(default_minus2ll: f64) -> Self {
        Self {
            minus2ll: BTreeMap::new(),
            default_minus2ll,
            observed: 1000,
            failing: BTreeSet::new(),
            silent: BTreeSet::new(),
        }
    }

    pub fn with(mut self, name: &str, minus2ll: f64) -> Self {
        self.minus2ll.insert(name.to_string(), minus2ll);
        self
    }

    pub fn failing(mut self, name: &str) -> Self {
        self.failing.insert(name.to_string());
        self
    }

    pub fn silent(mut self, name: &str) -> Self {
        self.silent.insert(name.to_string());
        self
    }
}

impl SemEngine for ScriptedEngine {
    fn fit(&self, model: &MxModel, _options: &FitOptions) -> Result<MxModel> {
        if self.failing.contains(&model.name) {
            bail!("{} did not converge (code 6)", model.name);
        }
        if self.silent.contains(&model.name) {
            return Ok(model.clone());
        }
        let m2ll = self
            .minus2ll
            .get(&model.name)
            .copied()
            .unwrap_or(self.default_minus2ll);
        let ep = model.free_count();
        Ok(model.clone().with_fit(FitSummary {
            minus2ll: m2ll,
            estimated_parameters: ep,
            degrees_of_freedom: self.observed - ep as i64,
            aic: m2ll + 2.0 * ep as f64,
        }))
    }
}

/// A fitted stand-in with the given statistics and no matrices.
pub fn fitted(name: &str, minus2ll: f64, ep: usize, df: i64, aic: f64) -> MxModel {
    MxModel::new(name, mxcore::ModelKind::Ace).with_fit(FitSummary {
        minus2ll,
        estimated_parameters: ep,
        degrees_of_freedom: df,
        aic,
    })
}

/// Twin data with `<base><sep>1` and `<base><sep>2` columns, `rows` rows.
pub fn twin_frame(bases: &[&str], sep: &str, rows: usize, seed: usize) -> DataFrame {
    let mut columns: Vec<Column> = Vec::new();
    for twin in 1..=2 {
        for (k, base) in bases.iter().enumerate() {
            let values: Vec<f64> = (0..rows)
                .map(|i| ((i * 7 + k * 3 + twin + seed) % 11) as f64 / 2.0)
                .collect();
            let name = format!("{base}{sep}{twin}");
            columns.push(Series::new(name.as_str().into(), values).into());
        }
    }
    DataFrame::new(columns).expect("twin frame")
}

pub fn assert_close(actual: f64, expected: f64, tol: f64) {
    assert!(
        (actual - expected).abs() < tol,
        "expected {expected}, got {actual}"
    );
}
