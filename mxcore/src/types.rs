use std::fmt;

/// Causal configuration of a direction-of-causation model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CausalState {
    NonCausal,
    XToY,
    YToX,
    Reciprocal,
}

impl CausalState {
    pub const ALL: [CausalState; 4] = [
        CausalState::NonCausal,
        CausalState::XToY,
        CausalState::YToX,
        CausalState::Reciprocal,
    ];

    /// Short model name used when a state is assembled or compared.
    pub fn model_name(self) -> &'static str {
        match self {
            CausalState::NonCausal => "Chol",
            CausalState::XToY => "a2b",
            CausalState::YToX => "b2a",
            CausalState::Reciprocal => "recip",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelKind {
    Ace,
    AceCov,
    Cp,
    Ip,
    Gxe,
    Doc(CausalState),
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::Ace => write!(f, "ACE"),
            ModelKind::AceCov => write!(f, "ACEcov"),
            ModelKind::Cp => write!(f, "CP"),
            ModelKind::Ip => write!(f, "IP"),
            ModelKind::Gxe => write!(f, "GxE"),
            ModelKind::Doc(state) => write!(f, "DoC({})", state.model_name()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Optimizer {
    #[default]
    Slsqp,
    Npsol,
    Csolnp,
}

/// Options forwarded to the engine on every fit.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FitOptions {
    pub optimizer: Optimizer,
    pub toler: Option<f64>,
    pub iter_max: Option<usize>,
}

/// Location of one cell of one named parameter matrix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParameterAddress {
    pub matrix: String,
    pub row: usize,
    pub col: usize,
}

impl ParameterAddress {
    pub fn new(matrix: impl Into<String>, row: usize, col: usize) -> Self {
        Self {
            matrix: matrix.into(),
            row,
            col,
        }
    }
}

impl fmt::Display for ParameterAddress {
    // 1-based, matching how path diagrams and tables number rows and columns
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{},{}]", self.matrix, self.row + 1, self.col + 1)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParamTarget {
    Label(String),
    Address(ParameterAddress),
}

impl fmt::Display for ParamTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamTarget::Label(label) => write!(f, "{label}"),
            ParamTarget::Address(addr) => write!(f, "{addr}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    Fixed(f64),
    /// Free at its current value.
    Free,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub target: ParamTarget,
    pub value: ParamValue,
}

impl Constraint {
    pub fn fix(address: ParameterAddress, value: f64) -> Self {
        Self {
            target: ParamTarget::Address(address),
            value: ParamValue::Fixed(value),
        }
    }

    pub fn fix_label(label: impl Into<String>, value: f64) -> Self {
        Self {
            target: ParamTarget::Label(label.into()),
            value: ParamValue::Fixed(value),
        }
    }

    pub fn free(address: ParameterAddress) -> Self {
        Self {
            target: ParamTarget::Address(address),
            value: ParamValue::Free,
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            ParamValue::Fixed(v) => write!(f, "{} = {v}", self.target),
            ParamValue::Free => write!(f, "{} free", self.target),
        }
    }
}

/// Fit statistics as reported by the engine. Never recomputed locally.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitSummary {
    pub minus2ll: f64,
    pub estimated_parameters: usize,
    pub degrees_of_freedom: i64,
    pub aic: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub estimate: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zygosity {
    Mz,
    Dz,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleSize {
    pub mz: usize,
    pub dz: usize,
}
