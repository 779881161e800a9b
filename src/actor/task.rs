//! Task Actor - the watch-mode dispatcher.
//!
//! Maps each debounced batch of source changes to the bindings whose glob
//! matches, and runs every matched pipeline once on a blocking worker.
//!
//! ```text
//! Changed ──> match bindings ──┬─ idle    ──> spawn_blocking(pipeline)
//!                              └─ running ──> pending (re-run once)
//! Finished ──> report ──> pending? ──> spawn again
//! ```
//!
//! Failures are shown and swallowed; the loop keeps going.

use std::path::PathBuf;
use std::sync::Arc;

use rustc_hash::FxHashSet;
use tokio::sync::mpsc;

use super::messages::{TaskMsg, WsMsg};
use crate::asset::ArtifactWriter;
use crate::config::Config;
use crate::logger::{status_error, status_success, status_unchanged};
use crate::pipeline::WatchBinding;
use crate::task::{PipelineError, Registry, TaskError, TaskReport};

/// Task Actor - runs bound pipelines for changed sources
pub struct TaskActor {
    rx: mpsc::Receiver<TaskMsg>,
    /// Handed to workers to report completion
    tx: mpsc::Sender<TaskMsg>,
    ws_tx: Option<mpsc::Sender<WsMsg>>,
    registry: Arc<Registry>,
    bindings: Arc<Vec<WatchBinding>>,
    config: Arc<Config>,
    running: FxHashSet<usize>,
    pending: FxHashSet<usize>,
    /// Tasks whose last run failed (the overlay is showing)
    failing: FxHashSet<String>,
}

impl TaskActor {
    pub fn new(
        rx: mpsc::Receiver<TaskMsg>,
        tx: mpsc::Sender<TaskMsg>,
        registry: Arc<Registry>,
        bindings: Vec<WatchBinding>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            rx,
            tx,
            ws_tx: None,
            registry,
            bindings: Arc::new(bindings),
            config,
            running: FxHashSet::default(),
            pending: FxHashSet::default(),
            failing: FxHashSet::default(),
        }
    }

    /// Forward failures to browsers.
    pub fn with_ws(mut self, ws_tx: mpsc::Sender<WsMsg>) -> Self {
        self.ws_tx = Some(ws_tx);
        self
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        while let Some(msg) = self.rx.recv().await {
            match msg {
                TaskMsg::Changed(paths) => self.dispatch(&paths),
                TaskMsg::Finished { binding, result } => {
                    self.running.remove(&binding);
                    self.report(binding, result).await;
                    if self.pending.remove(&binding) {
                        crate::debug!("watch"; "re-running {}", self.bindings[binding].pattern());
                        self.spawn(binding);
                    }
                }
                TaskMsg::Shutdown => {
                    crate::debug!("watch"; "dispatcher shutting down");
                    break;
                }
            }
        }
    }

    fn dispatch(&mut self, paths: &[PathBuf]) {
        for binding in matched_bindings(&self.bindings, &self.config, paths) {
            if self.running.contains(&binding) {
                crate::debug!("watch"; "{} busy, queued", self.bindings[binding].pattern());
                self.pending.insert(binding);
            } else {
                self.spawn(binding);
            }
        }
    }

    fn spawn(&mut self, binding: usize) {
        self.running.insert(binding);

        let registry = Arc::clone(&self.registry);
        let bindings = Arc::clone(&self.bindings);
        let build_dir = self.config.build_dir.clone();
        let tx = self.tx.clone();
        let task = self.bindings[binding]
            .pipeline()
            .task_names()
            .first()
            .map_or_else(String::new, |name| (*name).to_string());

        let worker = tokio::task::spawn_blocking(move || {
            let writer = ArtifactWriter::new(build_dir);
            bindings[binding].pipeline().run(&registry, &writer, None)
        });

        // A panicking worker still reports, or the binding stays busy forever.
        tokio::spawn(async move {
            let result = match worker.await {
                Ok(result) => result,
                Err(e) => {
                    let message = if e.is_panic() {
                        panic_message(e.into_panic())
                    } else {
                        e.to_string()
                    };
                    Err(PipelineError::failed(&task, TaskError::Panicked(message)))
                }
            };
            let _ = tx.send(TaskMsg::Finished { binding, result }).await;
        });
    }

    async fn report(&mut self, binding: usize, result: Result<Vec<TaskReport>, PipelineError>) {
        let tasks = self.bindings[binding].pipeline().task_names();
        match result {
            Ok(reports) => {
                let summary = reports
                    .iter()
                    .map(TaskReport::summary)
                    .collect::<Vec<_>>()
                    .join(", ");
                if reports.iter().all(|r| r.written.is_empty()) {
                    status_unchanged(&summary);
                } else {
                    status_success(&summary);
                }

                let mut recovered = false;
                for task in &tasks {
                    recovered |= self.failing.remove(*task);
                }
                if recovered && self.failing.is_empty() {
                    self.notify(WsMsg::ClearError).await;
                }
            }
            Err(err) => {
                let failures = err.failures();
                let detail = failures
                    .iter()
                    .map(|f| f.error.detail())
                    .collect::<Vec<_>>()
                    .join("\n");
                status_error(&err.to_string(), &detail);

                for failure in &failures {
                    self.failing.insert(failure.task.clone());
                }
                if let Some(first) = failures.first() {
                    self.notify(WsMsg::Error {
                        task: first.task.clone(),
                        error: first.error.detail(),
                    })
                    .await;
                }
            }
        }
    }

    async fn notify(&self, msg: WsMsg) {
        if let Some(ws_tx) = &self.ws_tx {
            let _ = ws_tx.send(msg).await;
        }
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Indices of bindings matched by any of `paths`, in binding order.
fn matched_bindings(bindings: &[WatchBinding], config: &Config, paths: &[PathBuf]) -> Vec<usize> {
    let rel_paths: Vec<_> = paths
        .iter()
        .filter_map(|p| config.source_relative(p))
        .collect();

    bindings
        .iter()
        .enumerate()
        .filter(|(_, binding)| rel_paths.iter().any(|rel| binding.matches(rel)))
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::actor::fs::FsActor;
    use crate::config::test_project;
    use crate::pipeline::default_watch_bindings;
    use crate::task::{Artifact, Pipeline, Task};

    fn modify(path: &std::path::Path) -> notify::Event {
        notify::Event {
            kind: notify::EventKind::Modify(notify::event::ModifyKind::Data(
                notify::event::DataChange::Any,
            )),
            paths: vec![path.to_path_buf()],
            attrs: Default::default(),
        }
    }

    /// Registry with a counting `styles` task that sleeps `delay_ms`.
    fn counting(delay_ms: u64) -> (Arc<Registry>, Arc<AtomicUsize>) {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        let mut registry = Registry::new();
        registry.register(Task::new("styles", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(delay_ms));
            Ok(vec![Artifact::new("css/style.min.css", "a{}")])
        }));
        (Arc::new(registry), runs)
    }

    fn styles_binding() -> Vec<WatchBinding> {
        vec![WatchBinding::new("scss/**", Pipeline::task("styles")).unwrap()]
    }

    async fn wait_for(runs: &AtomicUsize, expected: usize) {
        for _ in 0..100 {
            if runs.load(Ordering::SeqCst) >= expected {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    #[test]
    fn test_matched_bindings() {
        let (_temp, config) = test_project();
        let bindings = default_watch_bindings().unwrap();
        let src = &config.source_dir;

        let matched = matched_bindings(
            &bindings,
            &config,
            &[
                src.join("scss/blocks/_a.scss"),
                src.join("scss/style.scss"),
                src.join("index.html"),
                config.root.join("kiln.toml"),
            ],
        );
        let patterns: Vec<_> = matched.iter().map(|&i| bindings[i].pattern()).collect();
        assert_eq!(patterns, vec!["scss/**", "*.html"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_five_saves_run_task_once() {
        let (_temp, config) = test_project();
        let config = Arc::new(config);
        let (registry, runs) = counting(0);
        let style = config.source_dir.join("scss/style.scss");

        let (task_tx, task_rx) = mpsc::channel(32);
        let actor = TaskActor::new(task_rx, task_tx.clone(), registry, styles_binding(), Arc::clone(&config));
        tokio::spawn(actor.run());

        let (notify_tx, notify_rx) = std::sync::mpsc::channel();
        let fs = FsActor::with_events(notify_rx, task_tx.clone(), TaskMsg::Changed, Duration::from_millis(100));
        tokio::spawn(fs.run());

        // Five saves within 50 ms.
        for _ in 0..5 {
            notify_tx.send(Ok(modify(&style))).unwrap();
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        wait_for(&runs, 1).await;
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(config.build_dir.join("css/style.min.css").is_file());

        let _ = task_tx.send(TaskMsg::Shutdown).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_busy_binding_reruns_once() {
        let (_temp, config) = test_project();
        let config = Arc::new(config);
        let (registry, runs) = counting(200);
        let style = config.source_dir.join("scss/style.scss");

        let (task_tx, task_rx) = mpsc::channel(32);
        let actor = TaskActor::new(task_rx, task_tx.clone(), registry, styles_binding(), Arc::clone(&config));
        tokio::spawn(actor.run());

        // One run starts; three more batches arrive while it is busy.
        for _ in 0..4 {
            task_tx.send(TaskMsg::Changed(vec![style.clone()])).await.unwrap();
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        wait_for(&runs, 2).await;
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);

        let _ = task_tx.send(TaskMsg::Shutdown).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_failure_is_reported_and_loop_survives() {
        let (_temp, config) = test_project();
        let config = Arc::new(config);
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);

        let mut registry = Registry::new();
        registry.register(Task::new("styles", move |_| {
            // Fails first, succeeds after.
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(TaskError::transform("src/scss/style.scss", "boom"))
            } else {
                Ok(Vec::new())
            }
        }));

        let (task_tx, task_rx) = mpsc::channel(32);
        let (ws_tx, mut ws_rx) = mpsc::channel(8);
        let actor = TaskActor::new(
            task_rx,
            task_tx.clone(),
            Arc::new(registry),
            styles_binding(),
            Arc::clone(&config),
        )
        .with_ws(ws_tx);
        tokio::spawn(actor.run());

        let style = config.source_dir.join("scss/style.scss");
        task_tx.send(TaskMsg::Changed(vec![style.clone()])).await.unwrap();
        let msg = tokio::time::timeout(Duration::from_secs(2), ws_rx.recv()).await.unwrap();
        assert!(matches!(msg, Some(WsMsg::Error { ref task, .. }) if task == "styles"));

        task_tx.send(TaskMsg::Changed(vec![style])).await.unwrap();
        let msg = tokio::time::timeout(Duration::from_secs(2), ws_rx.recv()).await.unwrap();
        assert!(matches!(msg, Some(WsMsg::ClearError)));

        let _ = task_tx.send(TaskMsg::Shutdown).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_panicking_task_is_reported_and_rerun() {
        let (_temp, config) = test_project();
        let config = Arc::new(config);
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);

        let mut registry = Registry::new();
        registry.register(Task::new("styles", move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("compiler bug");
            }
            Ok(Vec::new())
        }));

        let (task_tx, task_rx) = mpsc::channel(32);
        let (ws_tx, mut ws_rx) = mpsc::channel(8);
        let actor = TaskActor::new(
            task_rx,
            task_tx.clone(),
            Arc::new(registry),
            styles_binding(),
            Arc::clone(&config),
        )
        .with_ws(ws_tx);
        tokio::spawn(actor.run());

        let style = config.source_dir.join("scss/style.scss");
        task_tx.send(TaskMsg::Changed(vec![style.clone()])).await.unwrap();
        let msg = tokio::time::timeout(Duration::from_secs(2), ws_rx.recv()).await.unwrap();
        match msg {
            Some(WsMsg::Error { task, error }) => {
                assert_eq!(task, "styles");
                assert!(error.contains("compiler bug"));
            }
            other => panic!("unexpected message: {other:?}"),
        }

        // The binding is free again: the next change runs it.
        task_tx.send(TaskMsg::Changed(vec![style])).await.unwrap();
        let msg = tokio::time::timeout(Duration::from_secs(2), ws_rx.recv()).await.unwrap();
        assert!(matches!(msg, Some(WsMsg::ClearError)));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);

        let _ = task_tx.send(TaskMsg::Shutdown).await;
    }

    #[test]
    fn test_panic_message() {
        assert_eq!(panic_message(Box::new("boom")), "boom");
        assert_eq!(panic_message(Box::new(String::from("bang"))), "bang");
        assert_eq!(panic_message(Box::new(7_u8)), "unknown panic");
    }
}
