use tracing_subscriber::EnvFilter;

use crate::config::EngineConfig;

/// Installs the fmt subscriber. `RUST_LOG` wins over `config.log_filter`.
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing(config: &EngineConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_filter.as_str()));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
