use std::collections::BTreeMap;

use anyhow::Result;

use crate::model::{MxMatrix, MxModel};
use crate::types::{ConfidenceInterval, Constraint, FitOptions};

/// The optimizer-owning engine models are handed to.
///
/// Only `fit` is required. The remaining methods read what a fitted model
/// already carries, and engines may override them when they keep state of
/// their own.
pub trait SemEngine {
    /// Optimizes the free parameters of `model` and returns a fitted copy.
    /// The input is never modified.
    fn fit(&self, model: &MxModel, options: &FitOptions) -> Result<MxModel>;

    /// Returns a new, unfitted model with `constraints` applied.
    fn modify(&self, model: &MxModel, constraints: &[Constraint], name: &str) -> Result<MxModel> {
        model.modified(constraints, name)
    }

    fn parameter_matrix<'m>(&self, model: &'m MxModel, name: &str) -> Result<&'m MxMatrix> {
        model.matrix(name)
    }

    fn log_likelihood(&self, model: &MxModel) -> Option<f64> {
        model.fit.map(|f| -0.5 * f.minus2ll)
    }

    fn degrees_of_freedom(&self, model: &MxModel) -> Option<i64> {
        model.fit.map(|f| f.degrees_of_freedom)
    }

    fn aic(&self, model: &MxModel) -> Option<f64> {
        model.fit.map(|f| f.aic)
    }

    fn confidence_intervals<'m>(
        &self,
        model: &'m MxModel,
    ) -> &'m BTreeMap<String, ConfidenceInterval> {
        &model.intervals
    }
}
