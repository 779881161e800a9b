//! One-shot builds: the full pipeline or a single task.
//!
//! ```text
//! build:  clean ─> parallel(styles, svgSprite, scripts, ...)
//! styles: styles
//! ```

use std::sync::Arc;

use anyhow::Result;

use crate::{
    asset::ArtifactWriter,
    config::Config,
    log,
    logger::ProgressLine,
    pipeline,
    task::{Pipeline, Registry, TaskReport},
    utils::plural_count,
};

/// Run the full build: clean, then every asset task in parallel.
pub fn build(config: &Arc<Config>, registry: &Registry) -> Result<()> {
    run_pipeline(config, registry, &pipeline::build_pipeline())
}

/// Run one registered task standalone.
pub fn run_task(config: &Arc<Config>, registry: &Registry, name: &str) -> Result<()> {
    run_pipeline(config, registry, &Pipeline::task(name))
}

fn run_pipeline(config: &Config, registry: &Registry, pipeline: &Pipeline) -> Result<()> {
    pipeline.validate(registry)?;

    let writer = ArtifactWriter::new(&config.build_dir);
    let progress = ProgressLine::new("tasks", pipeline.leaf_count());
    let result = pipeline.run(registry, &writer, Some(&progress));
    progress.finish();

    match result {
        Ok(reports) => {
            log_reports(&reports);
            Ok(())
        }
        Err(err) => {
            let failures = err.failures();
            if failures.is_empty() {
                return Err(err.into());
            }
            for failure in &failures {
                log!("error"; "{}", failure);
            }
            anyhow::bail!("{} failed", plural_count(failures.len(), "task"))
        }
    }
}

fn log_reports(reports: &[TaskReport]) {
    for report in reports {
        crate::debug!("build"; "{}", report.summary());
    }

    let written: usize = reports.iter().map(|r| r.written.len()).sum();
    let unchanged: usize = reports.iter().map(|r| r.unchanged.len()).sum();
    if unchanged > 0 {
        log!("build"; "{} written, {} unchanged", plural_count(written, "file"), unchanged);
    } else {
        log!("build"; "{} written", plural_count(written, "file"));
    }
}
