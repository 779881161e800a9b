//! Asset tasks and the pipelines built from them.
//!
//! # Architecture
//!
//! ```text
//! build:  clean ─> ┬─ styles          scss/*.scss  ─> css/*.min.css
//!                  ├─ svgSprite       svg/*.svg    ─> img/sprite-svg.svg
//!                  ├─ scripts         js/*.js      ─> js/script.min.js
//!                  ├─ scriptsVendors  vendors      ─> js/vendors.min.js
//!                  ├─ html            *.html       ─> *.html
//!                  ├─ images          img/*        ─> img/*
//!                  └─ cssCopy         css/*.css    ─> css/*.css
//! ```
//!
//! Every task is registered by name in [`registry`]; watch mode re-runs
//! single-task pipelines through [`WatchBinding`]s.

mod copy;
mod html;
mod scripts;
mod styles;
mod svg;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use globset::GlobSet;

use crate::asset::scan::build_globset;
use crate::config::Config;
use crate::task::{Pipeline, Registry, Task, TaskError};

pub const CLEAN: &str = "clean";
pub const STYLES: &str = "styles";
pub const SVG_SPRITE: &str = "svgSprite";
pub const SCRIPTS: &str = "scripts";
pub const SCRIPTS_VENDORS: &str = "scriptsVendors";
pub const HTML: &str = "html";
pub const IMAGES: &str = "images";
pub const CSS_COPY: &str = "cssCopy";

/// Asset tasks in declaration order. Later tasks win path collisions.
pub const ASSET_TASKS: [&str; 7] = [
    STYLES,
    SVG_SPRITE,
    SCRIPTS,
    SCRIPTS_VENDORS,
    HTML,
    IMAGES,
    CSS_COPY,
];

/// Every task, bound to this configuration.
pub fn registry(config: &Arc<Config>) -> Registry {
    let mut registry = Registry::new();
    registry
        .register(Task::clean(CLEAN))
        .register(styles::task(config))
        .register(svg::task(config))
        .register(scripts::task(config))
        .register(scripts::vendors_task(config))
        .register(html::task(config))
        .register(copy::images_task(config))
        .register(copy::css_copy_task(config));
    registry
}

/// All asset tasks in parallel.
pub fn assets_pipeline() -> Pipeline {
    Pipeline::parallel(ASSET_TASKS.map(Pipeline::task))
}

/// `clean`, then every asset task.
pub fn build_pipeline() -> Pipeline {
    Pipeline::sequence([Pipeline::task(CLEAN), assets_pipeline()])
}

// ============================================================================
// Watch bindings
// ============================================================================

/// A source glob and the pipeline re-run when a matching file changes.
pub struct WatchBinding {
    pattern: String,
    globs: GlobSet,
    pipeline: Pipeline,
}

impl WatchBinding {
    pub fn new(pattern: &str, pipeline: Pipeline) -> Result<Self, TaskError> {
        Ok(Self {
            pattern: pattern.to_string(),
            globs: build_globset(&[pattern])?,
            pipeline,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Whether a source-relative, `/`-separated path triggers this binding.
    pub fn matches(&self, rel_path: &str) -> bool {
        self.globs.is_match(rel_path)
    }
}

/// Source globs and the task each one re-runs.
const WATCH_GLOBS: &[(&str, &str)] = &[
    ("scss/**", STYLES),
    ("css/**", CSS_COPY),
    ("js/*.js", SCRIPTS),
    ("*.html", HTML),
    ("img/**", IMAGES),
    ("svg/*.svg", SVG_SPRITE),
];

pub fn default_watch_bindings() -> Result<Vec<WatchBinding>, TaskError> {
    WATCH_GLOBS
        .iter()
        .map(|(pattern, task)| WatchBinding::new(pattern, Pipeline::task(*task)))
        .collect()
}
