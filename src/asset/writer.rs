//! Artifact writer: atomic writes under the build directory.
//!
//! Parallel tasks share one destination tree. The writer keeps a per-run
//! ledger `path -> rank` where rank is the task's declaration index in the
//! pipeline. A write to a path already claimed by a later-declared task is
//! skipped, so the later-declared task wins regardless of scheduling.
//!
//! Transforms run in parallel; the writes themselves are serialized by the
//! ledger lock.

use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::task::{Artifact, TaskError, TaskReport};

/// Ledger entry: who owns a path in this run.
struct Claim {
    rank: usize,
    task: String,
}

pub struct ArtifactWriter {
    root: PathBuf,
    ledger: Mutex<FxHashMap<PathBuf, Claim>>,
}

static TEMP_COUNTER: AtomicUsize = AtomicUsize::new(0);

impl ArtifactWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ledger: Mutex::new(FxHashMap::default()),
        }
    }

    /// Destination root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write one task's artifacts.
    ///
    /// Paths must be unique within `artifacts`. Files whose bytes are
    /// already on disk are left untouched and reported as unchanged.
    pub fn write(
        &self,
        task: &str,
        rank: usize,
        artifacts: Vec<Artifact>,
    ) -> Result<TaskReport, TaskError> {
        let mut seen = FxHashSet::default();
        for artifact in &artifacts {
            if !seen.insert(artifact.path.as_path()) {
                return Err(TaskError::DuplicateArtifact {
                    task: task.to_string(),
                    path: artifact.path.clone(),
                });
            }
            check_relative(&artifact.path)?;
        }

        let mut report = TaskReport::new(task);
        for artifact in artifacts {
            let mut ledger = self.ledger.lock();

            if let Some(claim) = ledger.get(&artifact.path) {
                if claim.task != task {
                    crate::log!(
                        "warning";
                        "`{}` and `{}` both write {}",
                        claim.task,
                        task,
                        artifact.path.display()
                    );
                }
                if claim.rank > rank {
                    report.superseded.push(artifact.path);
                    continue;
                }
            }

            let dest = self.root.join(&artifact.path);
            if fs::read(&dest).is_ok_and(|existing| existing == artifact.contents) {
                report.unchanged.push(artifact.path.clone());
            } else {
                write_atomic(&dest, &artifact.contents)?;
                report.written.push(artifact.path.clone());
            }

            ledger.insert(
                artifact.path,
                Claim {
                    rank,
                    task: task.to_string(),
                },
            );
        }
        Ok(report)
    }
}

/// Artifact paths are build-relative and must stay inside the build dir.
fn check_relative(path: &Path) -> Result<(), TaskError> {
    let escapes = path.as_os_str().is_empty()
        || path
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(TaskError::Write(
            path.to_path_buf(),
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "artifact path must be relative to the build directory",
            ),
        ));
    }
    Ok(())
}

/// Write through a sibling temp file and rename it into place, so readers
/// never observe a partially written file.
fn write_atomic(dest: &Path, contents: &[u8]) -> Result<(), TaskError> {
    let parent = dest.parent().unwrap_or(Path::new("."));
    fs::create_dir_all(parent).map_err(|e| TaskError::Write(parent.to_path_buf(), e))?;

    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp = parent.join(format!(
        ".{name}.{}.{}.tmp",
        std::process::id(),
        TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));

    let result = fs::File::create(&temp)
        .and_then(|mut file| {
            file.write_all(contents)?;
            file.sync_all()
        })
        .and_then(|()| fs::rename(&temp, dest));

    result.map_err(|e| {
        let _ = fs::remove_file(&temp);
        TaskError::Write(dest.to_path_buf(), e)
    })
}
