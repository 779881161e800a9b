//! Composition engine: sequential and parallel pipelines.
//!
//! - `Sequence`: stage N+1 starts after stage N finished writing; the first
//!   failure stops the sequence.
//! - `Parallel`: every branch runs on the rayon pool; the composite finishes
//!   when all branches have. Failures of all branches are kept, the first
//!   in declaration order leads.
//!
//! Each leaf gets a rank: its index in a pre-order walk. The artifact
//! writer uses it to make path collisions deterministic.

use rayon::prelude::*;

use super::{PipelineError, Registry, TaskReport};
use crate::asset::ArtifactWriter;
use crate::logger::ProgressLine;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pipeline {
    Task(String),
    Sequence(Vec<Pipeline>),
    Parallel(Vec<Pipeline>),
}

impl Pipeline {
    pub fn task(name: impl Into<String>) -> Self {
        Self::Task(name.into())
    }

    pub fn sequence(stages: impl IntoIterator<Item = Pipeline>) -> Self {
        Self::Sequence(stages.into_iter().collect())
    }

    pub fn parallel(branches: impl IntoIterator<Item = Pipeline>) -> Self {
        Self::Parallel(branches.into_iter().collect())
    }

    /// Number of task invocations.
    pub fn leaf_count(&self) -> usize {
        match self {
            Self::Task(_) => 1,
            Self::Sequence(children) | Self::Parallel(children) => {
                children.iter().map(Self::leaf_count).sum()
            }
        }
    }

    /// Task names in declaration order.
    pub fn task_names(&self) -> Vec<&str> {
        match self {
            Self::Task(name) => vec![name.as_str()],
            Self::Sequence(children) | Self::Parallel(children) => {
                children.iter().flat_map(Self::task_names).collect()
            }
        }
    }

    /// Reject unknown task names before anything runs.
    pub fn validate(&self, registry: &Registry) -> Result<(), PipelineError> {
        match self
            .task_names()
            .into_iter()
            .find(|name| !registry.contains(name))
        {
            Some(name) => Err(PipelineError::UnknownTask(name.to_string())),
            None => Ok(()),
        }
    }

    /// Run the pipeline. Reports are returned in declaration order.
    pub fn run(
        &self,
        registry: &Registry,
        writer: &ArtifactWriter,
        progress: Option<&ProgressLine>,
    ) -> Result<Vec<TaskReport>, PipelineError> {
        self.validate(registry)?;
        let cx = RunContext {
            registry,
            writer,
            progress,
        };
        self.run_at(0, &cx)
    }

    fn run_at(&self, rank: usize, cx: &RunContext<'_>) -> Result<Vec<TaskReport>, PipelineError> {
        match self {
            Self::Task(name) => {
                let task = cx
                    .registry
                    .get(name)
                    .ok_or_else(|| PipelineError::UnknownTask(name.clone()))?;
                let result = task.run(rank, cx.writer);
                if let Some(progress) = cx.progress {
                    progress.inc();
                }
                result
                    .map(|report| vec![report])
                    .map_err(|e| PipelineError::failed(name, e))
            }
            Self::Sequence(stages) => {
                let mut reports = Vec::new();
                let mut offset = rank;
                for stage in stages {
                    reports.extend(stage.run_at(offset, cx)?);
                    offset += stage.leaf_count();
                }
                Ok(reports)
            }
            Self::Parallel(branches) => {
                let offsets: Vec<_> = branches
                    .iter()
                    .scan(rank, |next, branch| {
                        let offset = *next;
                        *next += branch.leaf_count();
                        Some(offset)
                    })
                    .collect();

                let results: Vec<_> = branches
                    .par_iter()
                    .zip(offsets)
                    .map(|(branch, offset)| branch.run_at(offset, cx))
                    .collect();

                let mut reports = Vec::new();
                let mut errors = Vec::new();
                for result in results {
                    match result {
                        Ok(r) => reports.extend(r),
                        Err(e) => errors.push(e),
                    }
                }
                match PipelineError::merge(errors) {
                    Some(err) => Err(err),
                    None => Ok(reports),
                }
            }
        }
    }
}

struct RunContext<'a> {
    registry: &'a Registry,
    writer: &'a ArtifactWriter,
    progress: Option<&'a ProgressLine>,
}
