//! Development server for the build directory, with live reload.
//!
//! Requests are answered from the build directory on a small thread pool.
//! HTML responses get the live-reload client injected; the client itself
//! is served from memory at [`HOTRELOAD_URL`].

mod content;
mod lifecycle;
mod path;
mod response;

pub use lifecycle::{run_actor_system, spawn_actors, wait_for_shutdown};

use crate::{config::Config, embed::serve::HOTRELOAD_URL, log};
use anyhow::{Context, Result};
use crossbeam::channel::Sender;
use std::path::PathBuf;
use std::sync::Arc;
use tiny_http::{Request, Server};

/// Request worker threads.
const REQUEST_THREADS: usize = 4;

/// What the request handlers need to know.
struct ServeState {
    build_dir: PathBuf,
    ws_port: Option<u16>,
}

/// Bound server ready to accept requests
pub struct BoundServer {
    server: Arc<Server>,
    state: Arc<ServeState>,
}

/// Bind the HTTP server on the configured interface and port.
///
/// `ws_port` is the live-reload WebSocket port pages connect back to;
/// `None` serves without live reload. Ctrl+C unblocks the server and
/// signals `shutdown_tx`.
pub fn bind_server(
    config: &Config,
    ws_port: Option<u16>,
    shutdown_tx: Sender<()>,
) -> Result<BoundServer> {
    let (server, addr) = lifecycle::bind_with_retry(config.serve.interface, config.serve.port)?;
    let server = Arc::new(server);
    crate::core::register_server(Arc::clone(&server), shutdown_tx);

    log!("serve"; "http://{}", addr);

    Ok(BoundServer {
        server,
        state: Arc::new(ServeState {
            build_dir: config.build_dir.clone(),
            ws_port,
        }),
    })
}

impl BoundServer {
    /// Answer requests until the server is unblocked (blocking).
    pub fn run(self) -> Result<()> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(REQUEST_THREADS)
            .thread_name(|i| format!("kiln-http-{i}"))
            .build()
            .context("failed to create request thread pool")?;

        for request in self.server.incoming_requests() {
            let state = Arc::clone(&self.state);
            pool.spawn(move || {
                if let Err(e) = handle_request(request, &state) {
                    log!("serve"; "request error: {e}");
                }
            });
        }
        Ok(())
    }
}

/// Handle a single HTTP request
fn handle_request(request: Request, state: &ServeState) -> Result<()> {
    if crate::core::is_shutdown() {
        return response::respond_unavailable(request);
    }

    if let Some(port) = state.ws_port
        && request.url().split('?').next() == Some(HOTRELOAD_URL)
    {
        return response::respond_hotreload_js(request, port);
    }

    let live_reload = state.ws_port.is_some();
    match path::resolve_path(request.url(), &state.build_dir) {
        Some(path) => response::respond_file(request, &path, live_reload),
        None => response::respond_not_found(request, &state.build_dir, live_reload),
    }
}
