//! `scripts` and `scriptsVendors`: JavaScript bundles under `js/`.

use std::sync::Arc;

use crate::asset::minify::minify_js;
use crate::config::Config;
use crate::task::{Artifact, Inputs, Task, TaskError, TaskInput};

use super::{SCRIPTS, SCRIPTS_VENDORS};

/// Minify `js/*.js` and concatenate into `js/<bundle>`.
///
/// An empty `js/` still produces an (empty) bundle.
pub fn task(config: &Arc<Config>) -> Task {
    let config = Arc::clone(config);
    let inputs = Inputs::glob(&config.source_dir, ["js/*.js"]);
    Task::new(SCRIPTS, move |input| {
        let parts = input
            .files
            .iter()
            .map(|path| {
                let source = input.read_to_string(path)?;
                if config.scripts.minify {
                    minify_js(path, &source)
                } else {
                    Ok(source)
                }
            })
            .collect::<Result<Vec<_>, TaskError>>()?;

        Ok(vec![bundle(&config.scripts.bundle, parts)])
    })
    .inputs(inputs)
}

/// Concatenate the configured vendor files, in order, into
/// `js/<vendor_bundle>`. Vendor code is copied as shipped.
pub fn vendors_task(config: &Arc<Config>) -> Task {
    let config = Arc::clone(config);
    let inputs = Inputs::Files(config.scripts.vendors.clone());
    Task::new(SCRIPTS_VENDORS, move |input: &TaskInput<'_>| {
        let parts = input
            .files
            .iter()
            .map(|path| input.read_to_string(path))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(vec![bundle(&config.scripts.vendor_bundle, parts)])
    })
    .inputs(inputs)
}

fn bundle(name: &str, parts: Vec<String>) -> Artifact {
    let joined = parts
        .iter()
        .map(|part| part.trim_end())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    Artifact::new(format!("js/{name}"), joined)
}
