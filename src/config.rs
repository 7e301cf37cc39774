use mxcore::{FitOptions, Optimizer};

/// How p-values and AIC weights are rounded for display.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportOptions {
    pub p_digits: usize,
    /// p-values below this are shown as "< min".
    pub p_min: f64,
    /// `None` prints bare numbers, `Some(true)` prefixes "= " or "< ",
    /// `Some(false)` never prefixes and clamps small values to `p_min`.
    pub add_comparison: Option<bool>,
    pub weight_digits: usize,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            p_digits: 3,
            p_min: 0.001,
            add_comparison: None,
            weight_digits: 2,
        }
    }
}

/// Process-wide settings, built once by the caller and passed by reference.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub fit: FitOptions,
    /// Refit sibling variants on a worker pool.
    pub parallel: bool,
    pub cores: Option<usize>,
    pub report: ReportOptions,
    pub log_filter: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fit: FitOptions::default(),
            parallel: false,
            cores: None,
            report: ReportOptions::default(),
            log_filter: "info".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn with_optimizer(mut self, optimizer: Optimizer) -> Self {
        self.fit.optimizer = optimizer;
        self
    }

    pub fn with_parallel(mut self, cores: Option<usize>) -> Self {
        self.parallel = true;
        self.cores = cores;
        self
    }

    pub fn with_report(mut self, report: ReportOptions) -> Self {
        self.report = report;
        self
    }

    pub fn with_log_filter(mut self, filter: &str) -> Self {
        self.log_filter = filter.to_string();
        self
    }
}
