use std::fmt;

use mxcore::{Constraint, MxModel};
use ndarray::Array2;

use crate::error::TwinSemError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    A,
    C,
    E,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::A => write!(f, "A"),
            Component::C => write!(f, "C"),
            Component::E => write!(f, "E"),
        }
    }
}

/// Genetic, shared and unique environmental path coefficients (n × n).
#[derive(Debug, Clone, PartialEq)]
pub struct PathMatrixSet {
    pub a: Array2<f64>,
    pub c: Array2<f64>,
    pub e: Array2<f64>,
}

/// Outer products of the paths and their sum.
#[derive(Debug, Clone, PartialEq)]
pub struct VarianceComponents {
    pub a: Array2<f64>,
    pub c: Array2<f64>,
    pub e: Array2<f64>,
    pub total: Array2<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StandardizedEstimate {
    pub a_std: Array2<f64>,
    pub c_std: Array2<f64>,
    pub e_std: Array2<f64>,
    /// Raw (unstandardized) components the scaling was derived from.
    pub raw: VarianceComponents,
}

impl StandardizedEstimate {
    /// diag(a_std·a_stdᵗ + c_std·c_stdᵗ + e_std·e_stdᵗ), 1 per trait.
    pub fn standardized_total(&self) -> Vec<f64> {
        let total = self.a_std.dot(&self.a_std.t())
            + self.c_std.dot(&self.c_std.t())
            + self.e_std.dot(&self.e_std.t());
        total.diag().to_vec()
    }

    /// Share of each trait's variance due to `component`.
    pub fn proportion(&self, component: Component) -> Vec<f64> {
        let m = match component {
            Component::A => &self.a_std,
            Component::C => &self.c_std,
            Component::E => &self.e_std,
        };
        m.dot(&m.t()).diag().to_vec()
    }
}

/// rA, rC, rE. A block that could not be scaled is all NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationSet {
    pub ra: Array2<f64>,
    pub rc: Array2<f64>,
    pub re: Array2<f64>,
}

impl CorrelationSet {
    pub fn block(&self, component: Component) -> &Array2<f64> {
        match component {
            Component::A => &self.ra,
            Component::C => &self.rc,
            Component::E => &self.re,
        }
    }

    pub fn is_computable(&self, component: Component) -> bool {
        !self.block(component).iter().all(|v| v.is_nan())
    }
}

/// A model derived from a parent by fixing or freeing parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelVariant {
    pub name: String,
    pub parent: String,
    pub constraints: Vec<Constraint>,
    pub model: MxModel,
}

#[derive(Debug)]
pub struct VariantFailure {
    pub variant: String,
    pub error: TwinSemError,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonRow {
    pub model: String,
    /// Estimated parameters.
    pub ep: usize,
    pub minus2ll: f64,
    pub delta_m2ll: Option<f64>,
    pub delta_df: Option<i64>,
    pub p: Option<f64>,
    pub p_display: String,
    pub aic: f64,
    pub compare_with: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonTable {
    pub rows: Vec<ComparisonRow>,
}

impl ComparisonTable {
    pub fn base(&self) -> Option<&ComparisonRow> {
        self.rows.first()
    }

    pub fn row(&self, model: &str) -> Option<&ComparisonRow> {
        self.rows.iter().find(|r| r.model == model)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AicWeightSet {
    pub models: Vec<String>,
    pub aic: Vec<f64>,
    pub delta_aic: Vec<f64>,
    pub weights: Vec<f64>,
    pub rounded: Vec<f64>,
    pub best: usize,
}

impl AicWeightSet {
    pub fn best_name(&self) -> &str {
        &self.models[self.best]
    }

    pub fn weight_of(&self, model: &str) -> Option<f64> {
        self.models
            .iter()
            .position(|m| m == model)
            .map(|i| self.weights[i])
    }
}
