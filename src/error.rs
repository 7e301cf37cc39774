use mxcore::linalg::LinalgError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TwinSemError {
    /// Total variance of a trait is not strictly positive.
    #[error("non-positive total variance {variance} for trait {trait_index}")]
    NonPositiveVariance { trait_index: usize, variance: f64 },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("missing column: {0}")]
    MissingColumn(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("model(s) not fitted: {}", models.join(", "))]
    UnfittedModel { models: Vec<String> },

    #[error("parent model {parent} of {variant} failed, so {variant} was not built")]
    ParentFailed { variant: String, parent: String },

    #[error("I - beta is singular in causal model {model}")]
    CausalSingularity { model: String },

    #[error("optimization of {variant} failed: {source}")]
    Optimization {
        variant: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    #[error("{operation} is not supported for {kind} models")]
    Unsupported { kind: String, operation: String },

    #[error(transparent)]
    Linalg(#[from] LinalgError),

    #[error(transparent)]
    Polars(#[from] polars::prelude::PolarsError),

    #[error(transparent)]
    Engine(#[from] anyhow::Error),
}

impl TwinSemError {
    pub fn optimization(variant: &str, source: anyhow::Error) -> Self {
        TwinSemError::Optimization {
            variant: variant.to_string(),
            source: source.into(),
        }
    }

    pub fn unsupported(kind: impl ToString, operation: &str) -> Self {
        TwinSemError::Unsupported {
            kind: kind.to_string(),
            operation: operation.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TwinSemError>;
