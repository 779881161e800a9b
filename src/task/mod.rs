//! Tasks, the registry that names them, and their composition.
//!
//! ```text
//! Registry ── name ──> Task { inputs, action }
//!                          │
//! Pipeline::run ─ rank ─> Task::run ──> transform ──> ArtifactWriter
//! ```
//!
//! A task resolves its inputs, hands them to its transform, and writes the
//! returned artifacts. Re-running a task only overwrites its outputs.

mod compose;
mod error;
mod registry;


pub use compose::Pipeline;
pub use error::{PipelineError, TaskError};
pub use registry::Registry;

use std::path::{Path, PathBuf};

use crate::asset::{ArtifactWriter, clean, scan};

/// A produced output file, relative to the build directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    pub contents: Vec<u8>,
}

impl Artifact {
    pub fn new(path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
        }
    }
}

/// What a task reads.
#[derive(Debug, Clone, Default)]
pub enum Inputs {
    /// No file inputs.
    #[default]
    None,
    /// Files under `base` matching any of `patterns` (base-relative).
    Glob { base: PathBuf, patterns: Vec<String> },
    /// Explicit files, in order. A missing file fails the task.
    Files(Vec<PathBuf>),
}

impl Inputs {
    pub fn glob<I, S>(base: impl Into<PathBuf>, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Glob {
            base: base.into(),
            patterns: patterns.into_iter().map(Into::into).collect(),
        }
    }

    /// Resolve to a sorted (glob) or ordered (explicit) file list.
    pub fn resolve(&self) -> Result<Vec<PathBuf>, TaskError> {
        match self {
            Self::None => Ok(Vec::new()),
            Self::Glob { base, patterns } => {
                let globs = scan::build_globset(patterns)?;
                scan::scan(base, &globs)
            }
            Self::Files(files) => {
                if let Some(missing) = files.iter().find(|f| !f.is_file()) {
                    return Err(TaskError::Missing(missing.clone()));
                }
                Ok(files.clone())
            }
        }
    }
}

/// What a transform sees.
pub struct TaskInput<'a> {
    pub files: &'a [PathBuf],
}

impl TaskInput<'_> {
    /// Read an input file, attributing failures to it.
    pub fn read(&self, path: &Path) -> Result<Vec<u8>, TaskError> {
        std::fs::read(path).map_err(|e| TaskError::Read(path.to_path_buf(), e))
    }

    /// Read an input file as UTF-8 text.
    pub fn read_to_string(&self, path: &Path) -> Result<String, TaskError> {
        std::fs::read_to_string(path).map_err(|e| TaskError::Read(path.to_path_buf(), e))
    }
}

pub type TransformFn =
    dyn Fn(&TaskInput<'_>) -> Result<Vec<Artifact>, TaskError> + Send + Sync + 'static;

enum Action {
    Transform(Box<TransformFn>),
    /// Remove the writer's root directory.
    Clean,
}

/// A named unit of work.
pub struct Task {
    name: String,
    inputs: Inputs,
    action: Action,
}

impl Task {
    pub fn new<F>(name: impl Into<String>, transform: F) -> Self
    where
        F: Fn(&TaskInput<'_>) -> Result<Vec<Artifact>, TaskError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            inputs: Inputs::None,
            action: Action::Transform(Box::new(transform)),
        }
    }

    /// The clean step: removes the build directory.
    pub fn clean(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inputs: Inputs::None,
            action: Action::Clean,
        }
    }

    pub fn inputs(mut self, inputs: Inputs) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the task, writing its artifacts with the given ledger rank.
    pub fn run(&self, rank: usize, writer: &ArtifactWriter) -> Result<TaskReport, TaskError> {
        match &self.action {
            Action::Clean => {
                let removed = clean(writer.root())?;
                crate::debug!("clean"; "{} {}", if removed { "removed" } else { "absent" }, writer.root().display());
                Ok(TaskReport::new(&self.name))
            }
            Action::Transform(transform) => {
                let files = self.inputs.resolve()?;
                crate::debug!("task"; "{}: {}", self.name, crate::utils::plural_count(files.len(), "input"));
                let artifacts = transform(&TaskInput { files: &files })?;
                writer.write(&self.name, rank, artifacts)
            }
        }
    }
}

/// Outcome of a successful task run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskReport {
    pub task: String,
    pub written: Vec<PathBuf>,
    pub unchanged: Vec<PathBuf>,
    /// Skipped: a later-declared task owns the path in this run.
    pub superseded: Vec<PathBuf>,
}

impl TaskReport {
    pub fn new(task: &str) -> Self {
        Self {
            task: task.to_string(),
            ..Self::default()
        }
    }

    /// One-line summary, e.g. `styles: 1 written, 2 unchanged`.
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if !self.written.is_empty() {
            parts.push(format!("{} written", self.written.len()));
        }
        if !self.unchanged.is_empty() {
            parts.push(format!("{} unchanged", self.unchanged.len()));
        }
        if !self.superseded.is_empty() {
            parts.push(format!("{} superseded", self.superseded.len()));
        }
        if parts.is_empty() {
            format!("{}: done", self.task)
        } else {
            format!("{}: {}", self.task, parts.join(", "))
        }
    }
}
