//! Input resolution: glob patterns relative to a base directory.

use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use jwalk::{Parallelism, WalkDir};

use crate::task::TaskError;
use crate::utils::path::relative_slash_path;

/// Build a GlobSet from `/`-separated patterns.
///
/// `*` never crosses a directory boundary; use `**` for that.
pub fn build_globset<S: AsRef<str>>(patterns: &[S]) -> Result<GlobSet, TaskError> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let pat = pat.as_ref();
        let glob = GlobBuilder::new(pat)
            .literal_separator(true)
            .build()
            .map_err(|e| TaskError::Input {
                pattern: pat.to_string(),
                message: e.kind().to_string(),
            })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| TaskError::Input {
        pattern: patterns
            .iter()
            .map(|p| p.as_ref())
            .collect::<Vec<_>>()
            .join(", "),
        message: e.to_string(),
    })
}

/// Files under `base` whose base-relative path matches `globs`, sorted.
///
/// A missing `base` yields no files. The walk is serial: callers already
/// run on rayon workers and must not wait on the same pool.
pub fn scan(base: &Path, globs: &GlobSet) -> Result<Vec<PathBuf>, TaskError> {
    if !base.is_dir() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(base)
        .parallelism(Parallelism::Serial)
        .sort(true)
    {
        let entry = entry.map_err(|e| {
            let path = e.path().map_or_else(|| base.to_path_buf(), Path::to_path_buf);
            TaskError::Read(path, std::io::Error::other(e.to_string()))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if relative_slash_path(&path, base).is_some_and(|rel| globs.is_match(rel.as_str())) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
