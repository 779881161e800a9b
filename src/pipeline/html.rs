//! `html`: copy top-level pages, dropping `<!--DEV ... -->` blocks.

use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::config::Config;
use crate::task::{Artifact, Inputs, Task};

use super::HTML;

/// A dev-only comment block together with the line break and indent before it.
static DEV_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)(?:\r?\n[ \t]*)?<!--DEV.*?-->").expect("valid dev block pattern")
});

pub fn task(config: &Arc<Config>) -> Task {
    let config = Arc::clone(config);
    let inputs = Inputs::glob(&config.source_dir, ["*.html"]);
    Task::new(HTML, move |input| {
        input
            .files
            .iter()
            .map(|path| {
                let page = input.read_to_string(path)?;
                let page = if config.html.strip_dev_blocks {
                    strip_dev_blocks(&page)
                } else {
                    page
                };
                let name = path.file_name().unwrap_or_default();
                Ok(Artifact::new(name, page))
            })
            .collect()
    })
    .inputs(inputs)
}

pub fn strip_dev_blocks(page: &str) -> String {
    DEV_BLOCK.replace_all(page, "").into_owned()
}
