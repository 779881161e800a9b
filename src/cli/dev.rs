//! Long-running modes: `dev`, `watch` and `serve`.
//!
//! ```text
//! dev:    build ─> watch sources ─┬─> re-run bound tasks
//!                  serve build/  ─┴─> live reload
//! watch:  watch sources ─> re-run bound tasks
//! serve:  serve build/ ─> live reload on build changes
//! ```

use std::sync::Arc;

use anyhow::Result;
use crossbeam::channel;

use super::{build, serve};
use crate::{
    actor::Coordinator, config::Config, core::register_shutdown, log, pipeline,
    task::Registry,
};

/// Build once, then watch and serve until Ctrl+C.
///
/// A failing initial build is reported but does not stop the dev server;
/// fixing the source re-runs the task.
pub fn dev(config: &Arc<Config>, registry: Arc<Registry>) -> Result<()> {
    if let Err(e) = build::build(config, &registry) {
        log!("dev"; "initial build failed: {:#}", e);
    }
    run(config, registry, true)
}

/// Watch sources and re-run bound tasks until Ctrl+C.
pub fn watch(config: &Arc<Config>, registry: Arc<Registry>) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = channel::unbounded::<()>();
    register_shutdown(shutdown_tx);

    let system = Coordinator::new(Arc::clone(config), registry)
        .with_bindings(pipeline::default_watch_bindings()?)
        .with_shutdown_signal(shutdown_rx)
        .prepare()?;

    log!("watch"; "watching {}", config.source_dir.display());
    serve::run_actor_system(system)
}

/// Serve the build directory with live reload until Ctrl+C.
pub fn serve(config: &Arc<Config>, registry: Arc<Registry>) -> Result<()> {
    run(config, registry, false)
}

fn run(config: &Arc<Config>, registry: Arc<Registry>, watch_sources: bool) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = channel::unbounded::<()>();

    let mut coordinator = Coordinator::new(Arc::clone(config), registry)
        .with_live_reload(config.serve.interface, config.serve.ws_port)
        .with_shutdown_signal(shutdown_rx);
    if watch_sources {
        coordinator = coordinator.with_bindings(pipeline::default_watch_bindings()?);
        log!("watch"; "watching {}", config.source_dir.display());
    }
    let system = coordinator.prepare()?;

    let server = serve::bind_server(config, system.ws_port(), shutdown_tx)?;
    let actors = serve::spawn_actors(system);
    server.run()?;
    serve::wait_for_shutdown(actors);
    Ok(())
}
