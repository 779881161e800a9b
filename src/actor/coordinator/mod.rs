//! Actor Coordinator - Wires up the Watch/Reload Actor System
//!
//! The Coordinator is a thin orchestrator that:
//! - Creates communication channels
//! - Binds the WebSocket listener and starts the watchers
//! - Runs the actors until shutdown
//!
//! Preparation is synchronous so the caller learns the actual WebSocket
//! port (after retries) before serving pages that embed it.

mod runtime;

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossbeam::channel::Receiver;
use tokio::sync::mpsc;

use super::fs::FsActor;
use super::messages::{ReloadMsg, TaskMsg, WsMsg};
use super::reload::ReloadActor;
use super::task::TaskActor;
use super::ws::WsActor;
use crate::config::Config;
use crate::pipeline::WatchBinding;
use crate::task::Registry;

const CHANNEL_BUFFER: usize = 32;

/// Coordinator - configures the actor system.
pub struct Coordinator {
    config: Arc<Config>,
    registry: Arc<Registry>,
    bindings: Option<Vec<WatchBinding>>,
    ws: Option<(IpAddr, u16)>,
    shutdown_rx: Option<Receiver<()>>,
}

impl Coordinator {
    pub fn new(config: Arc<Config>, registry: Arc<Registry>) -> Self {
        Self {
            config,
            registry,
            bindings: None,
            ws: None,
            shutdown_rx: None,
        }
    }

    /// Watch the source tree and re-run bound pipelines.
    pub fn with_bindings(mut self, bindings: Vec<WatchBinding>) -> Self {
        self.bindings = Some(bindings);
        self
    }

    /// Push reloads to browsers over a WebSocket on `interface:port`.
    pub fn with_live_reload(mut self, interface: IpAddr, port: u16) -> Self {
        self.ws = Some((interface, port));
        self
    }

    /// Set shutdown signal receiver.
    pub fn with_shutdown_signal(mut self, rx: Receiver<()>) -> Self {
        self.shutdown_rx = Some(rx);
        self
    }

    /// Bind sockets and start watchers. Nothing runs until `ActorSystem::run`.
    pub fn prepare(self) -> Result<ActorSystem> {
        let debounce = Duration::from_millis(self.config.watch.debounce_ms);
        let mut system = ActorSystem::default();

        let ws_tx = match self.ws {
            Some((interface, port)) => {
                let (ws_tx, ws_rx) = mpsc::channel::<WsMsg>(CHANNEL_BUFFER);
                let actual = crate::reload::server::start_ws_server(interface, port, ws_tx.clone())?;
                crate::debug!("reload"; "ws://{}:{}", interface, actual);

                // The build dir may not exist yet before the first build.
                let _ = std::fs::create_dir_all(&self.config.build_dir);
                let (reload_tx, reload_rx) = mpsc::channel::<ReloadMsg>(CHANNEL_BUFFER);
                let build_fs = FsActor::new(
                    vec![self.config.build_dir.clone()],
                    reload_tx.clone(),
                    ReloadMsg::Changed,
                    debounce,
                )
                .context("failed to watch build directory")?;

                system.ws_port = Some(actual);
                system.ws = Some((WsActor::new(ws_rx), ws_tx.clone()));
                system.reload = Some((
                    ReloadActor::new(reload_rx, ws_tx.clone(), self.config.build_dir.clone()),
                    reload_tx,
                    build_fs,
                ));
                Some(ws_tx)
            }
            None => None,
        };

        if let Some(bindings) = self.bindings {
            let (task_tx, task_rx) = mpsc::channel::<TaskMsg>(CHANNEL_BUFFER);
            let source_fs = FsActor::new(
                vec![self.config.source_dir.clone()],
                task_tx.clone(),
                TaskMsg::Changed,
                debounce,
            )
            .context("failed to watch source directory")?;

            let mut actor = TaskActor::new(
                task_rx,
                task_tx.clone(),
                Arc::clone(&self.registry),
                bindings,
                Arc::clone(&self.config),
            );
            if let Some(ws_tx) = ws_tx {
                actor = actor.with_ws(ws_tx);
            }
            system.tasks = Some((actor, task_tx, source_fs));
        }

        system.shutdown_rx = self.shutdown_rx;
        Ok(system)
    }
}

/// Prepared actors, ready to run on a tokio runtime.
#[derive(Default)]
pub struct ActorSystem {
    ws_port: Option<u16>,
    tasks: Option<(TaskActor, mpsc::Sender<TaskMsg>, FsActor<TaskMsg>)>,
    reload: Option<(ReloadActor, mpsc::Sender<ReloadMsg>, FsActor<ReloadMsg>)>,
    ws: Option<(WsActor, mpsc::Sender<WsMsg>)>,
    shutdown_rx: Option<Receiver<()>>,
}

impl ActorSystem {
    /// WebSocket port actually bound, when live reload is on.
    pub fn ws_port(&self) -> Option<u16> {
        self.ws_port
    }

    /// Run every actor until the shutdown signal (or until they all stop).
    pub async fn run(self) {
        crate::debug!("actor"; "start");
        runtime::run_actors(self).await;
        crate::debug!("actor"; "stopped");
    }
}
