use std::time::Duration;

use tokio::task::JoinSet;

use super::ActorSystem;
use crate::actor::messages::{ReloadMsg, TaskMsg, WsMsg};

/// Grace period for actors to wind down after shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

/// Run all actors concurrently.
pub(super) async fn run_actors(system: ActorSystem) {
    let ActorSystem {
        tasks,
        reload,
        ws,
        shutdown_rx,
        ..
    } = system;

    let mut actors = JoinSet::new();
    let mut watchers = JoinSet::new();
    let mut task_tx = None;
    let mut reload_tx = None;
    let mut ws_tx = None;

    if let Some((actor, tx, fs)) = tasks {
        actors.spawn(actor.run());
        watchers.spawn(fs.run());
        task_tx = Some(tx);
    }
    if let Some((actor, tx, fs)) = reload {
        actors.spawn(actor.run());
        watchers.spawn(fs.run());
        reload_tx = Some(tx);
    }
    if let Some((actor, tx)) = ws {
        actors.spawn(actor.run());
        ws_tx = Some(tx);
    }

    match shutdown_rx {
        Some(rx) => loop {
            if rx.try_recv().is_ok() || crate::core::is_shutdown() {
                crate::debug!("actor"; "shutdown signal received");
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        },
        None => {
            actors.join_next().await;
        }
    }

    // Dropping the watchers releases the OS watch handles.
    watchers.abort_all();
    if let Some(tx) = task_tx {
        let _ = tx.send(TaskMsg::Shutdown).await;
    }
    if let Some(tx) = reload_tx {
        let _ = tx.send(ReloadMsg::Shutdown).await;
    }
    if let Some(tx) = ws_tx {
        let _ = tx.send(WsMsg::Shutdown).await;
    }

    let _ = tokio::time::timeout(SHUTDOWN_GRACE, async {
        while actors.join_next().await.is_some() {}
    })
    .await;
}
