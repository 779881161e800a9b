use std::path::PathBuf;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};

/// A watched directory and whether the watcher currently holds it.
///
/// `clean` deletes the build directory, which silently drops its watch;
/// `reattach` picks it up again once the directory is back.
pub(super) struct WatchRoots {
    roots: Vec<(PathBuf, bool)>,
}

impl WatchRoots {
    pub(super) fn new(paths: Vec<PathBuf>) -> Self {
        Self {
            roots: paths.into_iter().map(|p| (p, false)).collect(),
        }
    }

    /// Watch every root that exists now. Missing roots are retried later.
    pub(super) fn attach(&mut self, watcher: &mut RecommendedWatcher) -> notify::Result<()> {
        for (path, attached) in &mut self.roots {
            if path.is_dir() {
                watcher.watch(path, RecursiveMode::Recursive)?;
                *attached = true;
            }
        }
        Ok(())
    }

    pub(super) fn reattach(&mut self, watcher: &mut RecommendedWatcher) {
        for (path, attached) in &mut self.roots {
            if *attached && !path.exists() {
                *attached = false;
                let _ = watcher.unwatch(path);
            } else if !*attached
                && path.is_dir()
                && watcher.watch(path, RecursiveMode::Recursive).is_ok()
            {
                *attached = true;
                crate::debug!("watch"; "re-attached watch: {}", path.display());
            }
        }
    }
}
