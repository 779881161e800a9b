//! Clean step: remove the build directory.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::task::TaskError;

/// Recursively remove `dir`.
///
/// Absent is success. A plain file at `dir` is removed as well. Any other
/// I/O error is surfaced.
pub fn clean(dir: &Path) -> Result<bool, TaskError> {
    let metadata = match fs::symlink_metadata(dir) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(TaskError::Clean(dir.to_path_buf(), e)),
    };

    let result = if metadata.is_dir() {
        fs::remove_dir_all(dir)
    } else {
        fs::remove_file(dir)
    };

    match result {
        Ok(()) => Ok(true),
        // Removed concurrently.
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(true),
        Err(e) => Err(TaskError::Clean(dir.to_path_buf(), e)),
    }
}
