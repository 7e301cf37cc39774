pub mod fit;
pub mod implied;
pub mod linalg;
pub mod model;
pub mod stats;
pub mod types;

pub use fit::SemEngine;
pub use model::{MxMatrix, MxModel};
pub use types::*;
