use statrs::distribution::{ChiSquared, ContinuousCDF};
use tracing::trace;

/// Upper-tail χ² p-value of a likelihood-ratio test.
///
/// `NaN` when the comparison has no positive degrees of freedom, since the
/// models are then not nested in the direction tested.
pub fn likelihood_ratio_p(delta_m2ll: f64, delta_df: i64) -> f64 {
    if delta_df <= 0 || !delta_m2ll.is_finite() {
        return f64::NAN;
    }
    let stat = delta_m2ll.max(0.0);
    let p = match ChiSquared::new(delta_df as f64) {
        Ok(chi) => 1.0 - chi.cdf(stat),
        Err(_) => f64::NAN,
    };
    trace!("likelihood_ratio_p: stat={stat}, df={delta_df}, p={p}");
    p
}
