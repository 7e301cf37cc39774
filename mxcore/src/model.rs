use std::collections::{BTreeMap, BTreeSet};

use anyhow::{Context, Result, anyhow};
use ndarray::Array2;

use crate::types::{
    ConfidenceInterval, Constraint, FitSummary, ModelKind, ParamTarget, ParamValue,
    ParameterAddress, SampleSize,
};

/// A named parameter matrix: values, free flags and labels per cell.
#[derive(Debug, Clone, PartialEq)]
pub struct MxMatrix {
    pub name: String,
    pub values: Array2<f64>,
    pub free: Array2<bool>,
    pub labels: Array2<Option<String>>,
}

impl MxMatrix {
    /// All cells fixed and unlabelled.
    pub fn fixed(name: &str, values: Array2<f64>) -> Self {
        let dim = values.dim();
        Self {
            name: name.to_string(),
            values,
            free: Array2::from_elem(dim, false),
            labels: Array2::from_elem(dim, None),
        }
    }

    /// All cells free.
    pub fn full(name: &str, values: Array2<f64>) -> Self {
        Self::with_pattern(name, values, |_, _| true)
    }

    /// Lower triangle (diagonal included) free, upper triangle fixed at 0.
    pub fn lower(name: &str, values: Array2<f64>) -> Self {
        Self::with_pattern(name, values, |i, j| i >= j)
    }

    /// Diagonal free, off-diagonal fixed at 0.
    pub fn diag(name: &str, values: Array2<f64>) -> Self {
        Self::with_pattern(name, values, |i, j| i == j)
    }

    /// Single fixed value carrying a label, e.g. the dzCr cross-twin correlation.
    pub fn labelled_scalar(name: &str, label: &str, value: f64) -> Self {
        let mut m = Self::fixed(name, Array2::from_elem((1, 1), value));
        m.labels[(0, 0)] = Some(label.to_string());
        m
    }

    fn with_pattern(
        name: &str,
        mut values: Array2<f64>,
        free_at: impl Fn(usize, usize) -> bool,
    ) -> Self {
        let dim = values.dim();
        let free = Array2::from_shape_fn(dim, |(i, j)| free_at(i, j));
        let labels = Array2::from_shape_fn(dim, |(i, j)| {
            free_at(i, j).then(|| default_label(name, i, j))
        });
        for ((i, j), v) in values.indexed_iter_mut() {
            if !free_at(i, j) {
                *v = 0.0;
            }
        }
        Self {
            name: name.to_string(),
            values,
            free,
            labels,
        }
    }

    pub fn dim(&self) -> (usize, usize) {
        self.values.dim()
    }

    pub fn address(&self, row: usize, col: usize) -> ParameterAddress {
        ParameterAddress::new(self.name.clone(), row, col)
    }

    pub fn free_addresses(&self) -> Vec<ParameterAddress> {
        self.free
            .indexed_iter()
            .filter(|(_, free)| **free)
            .map(|((i, j), _)| self.address(i, j))
            .collect()
    }

    pub fn label_at(&self, row: usize, col: usize) -> Option<&str> {
        self.labels.get((row, col)).and_then(|l| l.as_deref())
    }

    fn contains(&self, addr: &ParameterAddress) -> bool {
        let (rows, cols) = self.dim();
        addr.matrix == self.name && addr.row < rows && addr.col < cols
    }
}

/// The `<matrix>_r<row>c<col>` labelling used for free path cells.
pub fn default_label(matrix: &str, row: usize, col: usize) -> String {
    format!("{matrix}_r{}c{}", row + 1, col + 1)
}

/// A structural model as exchanged with the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct MxModel {
    pub name: String,
    pub kind: ModelKind,
    pub manifests: Vec<String>,
    pub sample_size: Option<SampleSize>,
    pub fit: Option<FitSummary>,
    pub intervals: BTreeMap<String, ConfidenceInterval>,
    matrices: BTreeMap<String, MxMatrix>,
}

impl MxModel {
    pub fn new(name: &str, kind: ModelKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            manifests: Vec::new(),
            sample_size: None,
            fit: None,
            intervals: BTreeMap::new(),
            matrices: BTreeMap::new(),
        }
    }

    pub fn with_matrix(mut self, matrix: MxMatrix) -> Self {
        self.insert_matrix(matrix);
        self
    }

    pub fn insert_matrix(&mut self, matrix: MxMatrix) {
        self.matrices.insert(matrix.name.clone(), matrix);
    }

    pub fn with_fit(mut self, fit: FitSummary) -> Self {
        self.fit = Some(fit);
        self
    }

    pub fn matrix(&self, name: &str) -> Result<&MxMatrix> {
        self.matrices
            .get(name)
            .with_context(|| format!("model {} has no matrix {name}", self.name))
    }

    pub fn values(&self, name: &str) -> Result<&Array2<f64>> {
        Ok(&self.matrix(name)?.values)
    }

    pub fn matrices(&self) -> impl Iterator<Item = &MxMatrix> {
        self.matrices.values()
    }

    pub fn is_fitted(&self) -> bool {
        self.fit.is_some()
    }

    pub fn minus2ll(&self) -> Option<f64> {
        self.fit.map(|f| f.minus2ll)
    }

    /// Labels of every free cell. Unlabelled free cells are named by address.
    pub fn free_labels(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        for m in self.matrices.values() {
            for ((i, j), free) in m.free.indexed_iter() {
                if *free {
                    let label = m
                        .label_at(i, j)
                        .map(str::to_string)
                        .unwrap_or_else(|| m.address(i, j).to_string());
                    out.insert(label);
                }
            }
        }
        out
    }

    /// Distinct free parameters; cells sharing a label count once.
    pub fn free_count(&self) -> usize {
        self.free_labels().len()
    }

    pub fn free_addresses(&self, matrix: &str) -> Result<Vec<ParameterAddress>> {
        Ok(self.matrix(matrix)?.free_addresses())
    }

    pub fn resolve(&self, target: &ParamTarget) -> Vec<ParameterAddress> {
        match target {
            ParamTarget::Address(addr) => self
                .matrices
                .get(&addr.matrix)
                .filter(|m| m.contains(addr))
                .map(|_| vec![addr.clone()])
                .unwrap_or_default(),
            ParamTarget::Label(label) => {
                let mut out = Vec::new();
                for m in self.matrices.values() {
                    for ((i, j), l) in m.labels.indexed_iter() {
                        if l.as_deref() == Some(label.as_str()) {
                            out.push(m.address(i, j));
                        }
                    }
                }
                out
            }
        }
    }

    pub fn value_at(&self, addr: &ParameterAddress) -> Result<f64> {
        let m = self.matrix(&addr.matrix)?;
        m.values
            .get((addr.row, addr.col))
            .copied()
            .with_context(|| format!("{addr} is outside model {}", self.name))
    }

    pub fn is_free(&self, addr: &ParameterAddress) -> Result<bool> {
        let m = self.matrix(&addr.matrix)?;
        m.free
            .get((addr.row, addr.col))
            .copied()
            .with_context(|| format!("{addr} is outside model {}", self.name))
    }

    pub fn set_value(&mut self, addr: &ParameterAddress, value: f64) -> Result<()> {
        let name = self.name.clone();
        let m = self
            .matrices
            .get_mut(&addr.matrix)
            .with_context(|| format!("model {name} has no matrix {}", addr.matrix))?;
        let cell = m
            .values
            .get_mut((addr.row, addr.col))
            .with_context(|| format!("{addr} is outside model {name}"))?;
        *cell = value;
        Ok(())
    }

    /// Replaces every value of matrix `name`, keeping free flags and labels.
    pub fn set_values(&mut self, name: &str, values: Array2<f64>) -> Result<()> {
        let model = self.name.clone();
        let m = self
            .matrices
            .get_mut(name)
            .with_context(|| format!("model {model} has no matrix {name}"))?;
        if m.values.dim() != values.dim() {
            return Err(anyhow!(
                "matrix {name} is {:?} but replacement is {:?}",
                m.values.dim(),
                values.dim()
            ));
        }
        m.values = values;
        Ok(())
    }

    pub fn apply(&mut self, constraint: &Constraint) -> Result<()> {
        let targets = self.resolve(&constraint.target);
        if targets.is_empty() {
            return Err(anyhow!(
                "no parameter in model {} matches {}",
                self.name,
                constraint.target
            ));
        }
        for addr in targets {
            let m = self
                .matrices
                .get_mut(&addr.matrix)
                .context("resolved address lost its matrix")?;
            match constraint.value {
                ParamValue::Fixed(v) => {
                    m.values[(addr.row, addr.col)] = v;
                    m.free[(addr.row, addr.col)] = false;
                }
                ParamValue::Free => {
                    m.free[(addr.row, addr.col)] = true;
                }
            }
        }
        Ok(())
    }

    /// A renamed, unfitted copy with `constraints` applied in order.
    pub fn modified(&self, constraints: &[Constraint], name: &str) -> Result<MxModel> {
        let mut out = self.clone();
        for constraint in constraints {
            out.apply(constraint)?;
        }
        out.name = name.to_string();
        out.fit = None;
        out.intervals.clear();
        Ok(out)
    }

    pub fn renamed(&self, name: &str) -> MxModel {
        let mut out = self.clone();
        out.name = name.to_string();
        out
    }
}
