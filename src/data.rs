use std::collections::BTreeSet;

use mxcore::SampleSize;
use polars::prelude::*;
use tracing::debug;

use crate::error::{Result, TwinSemError};

/// Twin-major column names: every `<base><sep>1` followed by every
/// `<base><sep>2`.
pub fn twin_column_names(bases: &[String], sep: &str) -> Vec<String> {
    let mut out = Vec::with_capacity(bases.len() * 2);
    for twin in 1..=2 {
        for base in bases {
            out.push(format!("{base}{sep}{twin}"));
        }
    }
    out
}

pub fn column_names(df: &DataFrame) -> BTreeSet<String> {
    df.get_columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect()
}

pub fn require_columns(df: &DataFrame, cols: &[String], frame: &str) -> Result<()> {
    let present = column_names(df);
    let missing: Vec<&str> = cols
        .iter()
        .filter(|c| !present.contains(c.as_str()))
        .map(String::as_str)
        .collect();
    if !missing.is_empty() {
        return Err(TwinSemError::MissingColumn(format!(
            "{frame} lacks {}",
            missing.join(", ")
        )));
    }
    Ok(())
}

/// Checks that MZ and DZ data both carry `cols` and have rows, before anything
/// is built or fitted.
pub fn validate_twin_data(mz: &DataFrame, dz: &DataFrame, cols: &[String]) -> Result<SampleSize> {
    if cols.is_empty() {
        return Err(TwinSemError::Configuration(
            "no variables selected".to_string(),
        ));
    }
    for (frame, df) in [("mzData", mz), ("dzData", dz)] {
        require_columns(df, cols, frame)
            .map_err(|e| TwinSemError::Configuration(e.to_string()))?;
        if df.height() == 0 {
            return Err(TwinSemError::Configuration(format!("{frame} has no rows")));
        }
    }
    let sizes = SampleSize {
        mz: mz.height(),
        dz: dz.height(),
    };
    debug!(
        "twin data: {} variables, {} MZ rows, {} DZ rows",
        cols.len(),
        sizes.mz,
        sizes.dz
    );
    Ok(sizes)
}

/// Sample variance of a column, ignoring nulls and NaN.
pub fn column_variance(df: &DataFrame, col: &str) -> Result<f64> {
    let series = df.column(col)?.as_materialized_series();
    let casted = series.cast(&DataType::Float64)?;
    let values = casted.f64()?;
    let values = values.filter(&values.is_not_nan())?;
    if values.len() - values.null_count() < 2 {
        return Err(TwinSemError::InvalidArgument(format!(
            "{col} has fewer than 2 non-missing values"
        )));
    }
    values
        .var(1)
        .filter(|v| v.is_finite())
        .ok_or_else(|| TwinSemError::InvalidArgument(format!("{col} has no finite variance")))
}

/// Per-variable path start values: sqrt(var / 3), spreading the observed
/// variance evenly over A, C and E. Falls back to 0.5 for unusable columns.
pub fn path_starts(df: &DataFrame, cols: &[String]) -> Vec<f64> {
    cols.iter()
        .map(|col| match column_variance(df, col) {
            Ok(var) if var > 0.0 => (var / 3.0).sqrt(),
            _ => 0.5,
        })
        .collect()
}
