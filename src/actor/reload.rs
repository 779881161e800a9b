//! Reload Actor - classifies build-dir changes for the browser.
//!
//! A batch made only of stylesheets becomes a `css` message (the client
//! swaps stylesheets in place); anything else becomes a full `reload`.

use std::path::{Path, PathBuf};

use tokio::sync::mpsc;

use super::messages::{ReloadMsg, WsMsg};
use crate::utils::path::relative_slash_path;

pub struct ReloadActor {
    rx: mpsc::Receiver<ReloadMsg>,
    ws_tx: mpsc::Sender<WsMsg>,
    build_dir: PathBuf,
}

impl ReloadActor {
    pub fn new(rx: mpsc::Receiver<ReloadMsg>, ws_tx: mpsc::Sender<WsMsg>, build_dir: PathBuf) -> Self {
        Self { rx, ws_tx, build_dir }
    }

    pub async fn run(mut self) {
        while let Some(msg) = self.rx.recv().await {
            match msg {
                ReloadMsg::Changed(paths) => {
                    let Some(msg) = classify(&self.build_dir, &paths) else {
                        continue;
                    };
                    if self.ws_tx.send(msg).await.is_err() {
                        break;
                    }
                }
                ReloadMsg::Shutdown => break,
            }
        }
    }
}

/// Reload message for a batch of changed artifacts.
fn classify(build_dir: &Path, paths: &[PathBuf]) -> Option<WsMsg> {
    let rel: Vec<_> = paths
        .iter()
        .filter_map(|p| relative_slash_path(p, build_dir))
        .filter(|p| !p.is_empty())
        .collect();
    if rel.is_empty() {
        return None;
    }

    if rel.iter().all(|p| p.ends_with(".css")) {
        crate::debug!("reload"; "css: {}", rel.join(", "));
        Some(WsMsg::Css { paths: rel })
    } else {
        let reason = match rel.as_slice() {
            [single] => single.clone(),
            many => crate::utils::plural_count(many.len(), "file"),
        };
        crate::debug!("reload"; "reload: {}", reason);
        Some(WsMsg::Reload { reason })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build() -> PathBuf {
        PathBuf::from("/site/build")
    }

    #[test]
    fn test_css_only_batch() {
        let paths = [build().join("css/style.min.css"), build().join("css/vendor.css")];
        match classify(&build(), &paths) {
            Some(WsMsg::Css { paths }) => {
                assert_eq!(paths, vec!["css/style.min.css", "css/vendor.css"]);
            }
            other => panic!("expected css, got {other:?}"),
        }
    }

    #[test]
    fn test_mixed_batch_reloads() {
        let paths = [build().join("css/style.min.css"), build().join("index.html")];
        match classify(&build(), &paths) {
            Some(WsMsg::Reload { reason }) => assert_eq!(reason, "2 files"),
            other => panic!("expected reload, got {other:?}"),
        }
    }

    #[test]
    fn test_single_file_reason() {
        let paths = [build().join("js/script.min.js")];
        assert!(matches!(
            classify(&build(), &paths),
            Some(WsMsg::Reload { reason }) if reason == "js/script.min.js"
        ));
    }

    #[test]
    fn test_outside_build_dir_ignored() {
        assert!(classify(&build(), &[PathBuf::from("/elsewhere/a.css")]).is_none());
    }

    #[tokio::test]
    async fn test_actor_forwards_to_ws() {
        let (tx, rx) = mpsc::channel(4);
        let (ws_tx, mut ws_rx) = mpsc::channel(4);
        let handle = tokio::spawn(ReloadActor::new(rx, ws_tx, build()).run());

        tx.send(ReloadMsg::Changed(vec![build().join("index.html")])).await.unwrap();
        assert!(matches!(ws_rx.recv().await, Some(WsMsg::Reload { .. })));

        tx.send(ReloadMsg::Shutdown).await.unwrap();
        handle.await.unwrap();
    }
}
