//! Task registry: maps names to task definitions.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::{PipelineError, Task, TaskReport};
use crate::asset::ArtifactWriter;

/// Owns every task definition. Registration order is kept for listing.
#[derive(Default)]
pub struct Registry {
    tasks: FxHashMap<String, Arc<Task>>,
    order: Vec<String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task, replacing any previous task of the same name.
    pub fn register(&mut self, task: Task) -> &mut Self {
        let name = task.name().to_string();
        if self.tasks.insert(name.clone(), Arc::new(task)).is_none() {
            self.order.push(name);
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Task>> {
        self.tasks.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    /// Task names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Run a single task standalone, as the only writer in the run.
    pub fn run(&self, name: &str, writer: &ArtifactWriter) -> Result<TaskReport, PipelineError> {
        let task = self
            .get(name)
            .ok_or_else(|| PipelineError::UnknownTask(name.to_string()))?;
        task.run(0, writer)
            .map_err(|e| PipelineError::failed(name, e))
    }
}
