//! Up-to-date checks based on file modification times.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// A file's path and modification time at the moment it was inspected.
#[derive(Debug, Clone)]
pub struct FileStamp {
    pub path: PathBuf,
    /// `None` when the file does not exist or has no mtime
    pub mtime: Option<SystemTime>,
}

impl FileStamp {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mtime = std::fs::metadata(&path).and_then(|m| m.modified()).ok();
        Self { path, mtime }
    }

    pub fn exists(&self) -> bool {
        self.mtime.is_some()
    }

    /// Whether this file changed after `other`. A missing file counts as newer.
    pub fn is_newer_than(&self, other: SystemTime) -> bool {
        self.mtime.map_or(true, |mtime| mtime > other)
    }
}

/// Whether `output` exists and no input was modified after it.
pub fn is_up_to_date<'a>(output: &Path, inputs: impl IntoIterator<Item = &'a Path>) -> bool {
    let Some(written) = FileStamp::new(output).mtime else {
        return false;
    };

    inputs.into_iter().all(|input| {
        let stamp = FileStamp::new(input);
        if stamp.is_newer_than(written) {
            log::debug!("{} is newer than {}", input.display(), output.display());
            false
        } else {
            true
        }
    })
}
