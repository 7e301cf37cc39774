//! Twin-model variance standardization and model reduction.
//!
//! Models are built and refit through an external [`SemEngine`]; this crate
//! decides what to build, what to fix, and how to compare the results.

pub mod config;
pub mod error;
pub mod logging;
pub mod types;

pub mod data;
pub mod matrix;
pub mod parallel;
pub mod qc;

pub mod compare;
pub mod correlations;
pub mod doc;
pub mod nested;
pub mod rank;
pub mod standardize;
pub mod twin;

pub use mxcore::{self, CausalState, Constraint, ModelKind, MxMatrix, MxModel, SemEngine, Zygosity};

pub use compare::{compare, format_p_value};
pub use config::{EngineConfig, ReportOptions};
pub use correlations::correlations;
pub use doc::{DocComparison, DocSpec, assemble_doc, compare_causal_states, transition};
pub use error::{Result, TwinSemError};
pub use logging::init_tracing;
pub use nested::{NestedSet, Reduction, ReductionFamily, build_nested_set, reduce};
pub use rank::rank;
pub use standardize::{standardize, standardize_model};
pub use twin::{TwinSpec, build_ace, build_cp, build_gxe, build_ip, expected_covariance};
pub use types::*;
