//! `images` and `cssCopy`: verbatim copies.

use std::path::Path;
use std::sync::Arc;

use crate::config::Config;
use crate::task::{Artifact, Inputs, Task, TaskInput, TaskError};

use super::{CSS_COPY, IMAGES};

/// `img/*.{jpg,jpeg,png,gif,svg}` to `img/`.
pub fn images_task(config: &Arc<Config>) -> Task {
    let inputs = Inputs::glob(&config.source_dir, ["img/*.{jpg,jpeg,png,gif,svg}"]);
    Task::new(IMAGES, |input| copy_into("img", input)).inputs(inputs)
}

/// Plain stylesheets, `css/*.css` to `css/`.
pub fn css_copy_task(config: &Arc<Config>) -> Task {
    let inputs = Inputs::glob(&config.source_dir, ["css/*.css"]);
    Task::new(CSS_COPY, |input| copy_into("css", input)).inputs(inputs)
}

fn copy_into(dir: &str, input: &TaskInput<'_>) -> Result<Vec<Artifact>, TaskError> {
    input
        .files
        .iter()
        .map(|path| {
            let name = path.file_name().unwrap_or_default();
            Ok(Artifact::new(Path::new(dir).join(name), input.read(path)?))
        })
        .collect()
}
