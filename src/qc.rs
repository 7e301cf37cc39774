use crate::error::{Result, TwinSemError};

pub fn check_range_f64(value: f64, min: f64, max: f64, inclusive: bool, name: &str) -> Result<()> {
    if !value.is_finite() {
        return Err(TwinSemError::InvalidArgument(format!(
            "Value of {name} should be finite"
        )));
    }
    let below = if inclusive { value < min } else { value <= min };
    let above = if inclusive { value > max } else { value >= max };
    if below {
        return Err(TwinSemError::InvalidArgument(format!(
            "Value of {name} should be above {min}"
        )));
    }
    if above {
        return Err(TwinSemError::InvalidArgument(format!(
            "Value of {name} should be below {max}"
        )));
    }
    Ok(())
}

pub fn check_positive(value: usize, name: &str) -> Result<()> {
    if value == 0 {
        return Err(TwinSemError::InvalidArgument(format!(
            "{name} should be at least 1"
        )));
    }
    Ok(())
}

/// dzCr must encode one of the two supported regimes: 1 (ACE) or .25 (ADE).
pub fn check_dz_cr(value: f64) -> Result<()> {
    if value == 1.0 || value == 0.25 {
        Ok(())
    } else {
        Err(TwinSemError::InvalidArgument(format!(
            "dzCr is {value}; only 1 (ACE) and .25 (ADE) can be reduced"
        )))
    }
}
