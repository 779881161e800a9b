//! Task and pipeline error types.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Why a single task failed. Every variant but `Panicked` names the
/// offending path.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("failed to read `{0}`")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("failed to write `{0}`")]
    Write(PathBuf, #[source] std::io::Error),

    #[error("missing input `{0}`")]
    Missing(PathBuf),

    #[error("{}", format_transform(path, *line, *column, message))]
    Transform {
        path: PathBuf,
        line: Option<usize>,
        column: Option<usize>,
        message: String,
    },

    #[error("failed to clean `{0}`")]
    Clean(PathBuf, #[source] std::io::Error),

    #[error("`{task}` produced `{path}` more than once")]
    DuplicateArtifact { task: String, path: PathBuf },

    #[error("invalid input pattern `{pattern}`: {message}")]
    Input { pattern: String, message: String },

    #[error("panicked: {0}")]
    Panicked(String),
}

impl TaskError {
    /// Transformation error without location.
    pub fn transform(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Transform {
            path: path.into(),
            line: None,
            column: None,
            message: message.into(),
        }
    }

    /// Transformation error at a 1-based line and column.
    pub fn transform_at(
        path: impl Into<PathBuf>,
        line: usize,
        column: usize,
        message: impl Into<String>,
    ) -> Self {
        Self::Transform {
            path: path.into(),
            line: Some(line),
            column: Some(column),
            message: message.into(),
        }
    }

    /// Transformation error at a byte offset into `source`.
    pub fn transform_at_offset(
        path: impl Into<PathBuf>,
        source: &str,
        offset: usize,
        message: impl Into<String>,
    ) -> Self {
        let (line, column) = line_column(source, offset);
        Self::transform_at(path, line, column, message)
    }

    /// Full message including the `source()` chain.
    pub fn detail(&self) -> String {
        let mut msg = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            msg.push_str(": ");
            msg.push_str(&err.to_string());
            source = err.source();
        }
        msg
    }
}

/// 1-based line and column of a byte offset.
fn line_column(source: &str, offset: usize) -> (usize, usize) {
    let mut offset = offset.min(source.len());
    while !source.is_char_boundary(offset) {
        offset -= 1;
    }
    let before = &source[..offset];
    let line = before.matches('\n').count() + 1;
    let column = before
        .rfind('\n')
        .map_or(before, |i| &before[i + 1..])
        .chars()
        .count()
        + 1;
    (line, column)
}

fn format_transform(
    path: &std::path::Path,
    line: Option<usize>,
    column: Option<usize>,
    message: &str,
) -> String {
    match (line, column) {
        (Some(line), Some(column)) => format!("{}:{line}:{column}: {message}", path.display()),
        (Some(line), None) => format!("{}:{line}: {message}", path.display()),
        _ => format!("{}: {message}", path.display()),
    }
}

/// A task failure attributed to the task that caused it.
#[derive(Debug)]
pub struct TaskFailure {
    pub task: String,
    pub error: TaskError,
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task `{}` failed: {}", self.task, self.error.detail())
    }
}

/// Why a pipeline failed.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("unknown task `{0}`")]
    UnknownTask(String),

    /// `first` is the earliest failure in declaration order; `others` keeps
    /// every further failure of the same run.
    #[error("{first}{}", format_others(others))]
    Failed {
        first: TaskFailure,
        others: Vec<TaskFailure>,
    },
}

fn format_others(others: &[TaskFailure]) -> String {
    if others.is_empty() {
        String::new()
    } else {
        format!(
            " ({} also failed)",
            crate::utils::plural_count(others.len(), "other task")
        )
    }
}

impl PipelineError {
    pub fn failed(task: &str, error: TaskError) -> Self {
        Self::Failed {
            first: TaskFailure {
                task: task.to_string(),
                error,
            },
            others: Vec::new(),
        }
    }

    /// Every failure in declaration order.
    pub fn failures(&self) -> Vec<&TaskFailure> {
        match self {
            Self::UnknownTask(_) => Vec::new(),
            Self::Failed { first, others } => std::iter::once(first).chain(others).collect(),
        }
    }

    /// Merge failures of sibling branches, keeping declaration order.
    pub(super) fn merge(errors: Vec<Self>) -> Option<Self> {
        let mut failures = Vec::new();
        for err in errors {
            match err {
                Self::UnknownTask(_) => return Some(err),
                Self::Failed { first, others } => {
                    failures.push(first);
                    failures.extend(others);
                }
            }
        }
        let mut iter = failures.into_iter();
        let first = iter.next()?;
        Some(Self::Failed {
            first,
            others: iter.collect(),
        })
    }
}
