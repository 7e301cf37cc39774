use anyhow::Context;
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;

use crate::config::EngineConfig;
use crate::error::Result;

pub fn run_in_pool<T, F>(cores: Option<usize>, context: &'static str, f: F) -> Result<T>
where
    F: FnOnce() -> T + Send,
    T: Send,
{
    if let Some(cores) = cores {
        let pool = ThreadPoolBuilder::new()
            .num_threads(cores)
            .build()
            .context(context)?;
        Ok(pool.install(f))
    } else {
        Ok(f())
    }
}

pub fn resolve_threads(cores: Option<usize>, tasks: usize) -> Option<usize> {
    if let Some(cores) = cores {
        let capped = cores.min(tasks.max(1));
        if cores > capped {
            tracing::warn!(
                "Provided cores ({cores}) greater than number of tasks ({tasks}); using {capped}"
            );
        }
        Some(capped)
    } else {
        None
    }
}

/// Runs `f` over `jobs`, on a bounded pool when `config.parallel` is set.
/// Output order always matches `jobs`, whatever order the jobs finish in.
pub fn map_jobs<J, R, F>(config: &EngineConfig, jobs: &[J], f: F) -> Result<Vec<R>>
where
    J: Sync,
    R: Send,
    F: Fn(&J) -> R + Sync + Send,
{
    if config.parallel && jobs.len() > 1 {
        let threads = resolve_threads(config.cores, jobs.len());
        run_in_pool(threads, "build refit thread pool", || {
            jobs.par_iter().map(&f).collect::<Vec<R>>()
        })
    } else {
        Ok(jobs.iter().map(f).collect())
    }
}
