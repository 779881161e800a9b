//! FileSystem Actor
//!
//! Watches directories and sends debounced change batches downstream.
//! The same actor watches the source tree (for the `TaskActor`) and the
//! build tree (for the `ReloadActor`).
//!
//! ```text
//! notify ─(std mpsc)─> bridge thread ─(tokio mpsc)─> Debouncer ─> M
//! ```

use std::path::PathBuf;
use std::time::Duration;

use notify::RecommendedWatcher;
use tokio::sync::mpsc;

// Pure timing and deduplication.
mod debouncer;
// Shared fs event types.
mod types;
// Watch root attach/re-attach lifecycle.
mod watch_roots;

#[cfg(test)]
mod tests;

use debouncer::Debouncer;
use watch_roots::WatchRoots;

/// Upper bound on idle sleeps, so vanished roots are re-attached.
const REATTACH_POLL: Duration = Duration::from_secs(1);

type NotifyRx = std::sync::mpsc::Receiver<notify::Result<notify::Event>>;

/// FileSystem Actor - watches for file changes
pub struct FsActor<M> {
    /// Channel to receive notify events (sync -> async bridge)
    notify_rx: NotifyRx,
    /// Watcher handle; dropping it stops the OS watch
    watcher: Option<RecommendedWatcher>,
    watch_roots: WatchRoots,
    /// Downstream actor
    tx: mpsc::Sender<M>,
    /// Wraps a batch of changed paths into the downstream message
    wrap: fn(Vec<PathBuf>) -> M,
    debouncer: Debouncer,
}

impl<M: Send + 'static> FsActor<M> {
    /// Start watching `paths` immediately.
    ///
    /// Events buffer in the channel until `run`, so changes made while the
    /// caller finishes its initial build are not lost.
    pub fn new(
        paths: Vec<PathBuf>,
        tx: mpsc::Sender<M>,
        wrap: fn(Vec<PathBuf>) -> M,
        debounce: Duration,
    ) -> notify::Result<Self> {
        let (notify_tx, notify_rx) = std::sync::mpsc::channel();

        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = notify_tx.send(res);
        })?;

        let mut watch_roots = WatchRoots::new(paths);
        watch_roots.attach(&mut watcher)?;

        Ok(Self {
            notify_rx,
            watcher: Some(watcher),
            watch_roots,
            tx,
            wrap,
            debouncer: Debouncer::new(debounce),
        })
    }

    /// Actor fed from a channel instead of the OS.
    #[cfg(test)]
    pub(crate) fn with_events(
        notify_rx: NotifyRx,
        tx: mpsc::Sender<M>,
        wrap: fn(Vec<PathBuf>) -> M,
        debounce: Duration,
    ) -> Self {
        Self {
            notify_rx,
            watcher: None,
            watch_roots: WatchRoots::new(Vec::new()),
            tx,
            wrap,
            debouncer: Debouncer::new(debounce),
        }
    }

    /// Run the actor event loop. Returns when the receiver is gone, the
    /// notify side closes, or on shutdown.
    pub async fn run(self) {
        let Self {
            notify_rx,
            mut watcher,
            mut watch_roots,
            tx,
            wrap,
            mut debouncer,
        } = self;

        let (async_tx, mut async_rx) = mpsc::channel::<notify::Event>(64);

        // notify delivers on a std channel; forward into tokio.
        std::thread::spawn(move || {
            while let Ok(result) = notify_rx.recv() {
                match result {
                    Ok(event) => {
                        if async_tx.blocking_send(event).is_err() {
                            break; // Receiver dropped
                        }
                    }
                    Err(e) => crate::log!("watch"; "notify error: {}", e),
                }
            }
        });

        let mut open = true;
        while !crate::core::is_shutdown() {
            tokio::select! {
                biased;
                event = async_rx.recv(), if open => match event {
                    Some(event) => debouncer.add_event(&event),
                    None => open = false,
                },
                _ = tokio::time::sleep(debouncer.sleep_duration().min(REATTACH_POLL)) => {
                    if let Some(watcher) = watcher.as_mut() {
                        watch_roots.reattach(watcher);
                    }
                    if let Some(changes) = debouncer.take_if_ready() {
                        let paths = changes.into_iter().map(|(path, _)| path).collect();
                        if tx.send(wrap(paths)).await.is_err() {
                            break;
                        }
                    } else if !open {
                        break;
                    }
                }
            }
        }

        crate::debug!("watch"; "watcher stopped");
        drop(watcher);
    }
}
