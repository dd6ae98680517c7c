use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory {path:?} is not usable: {reason}")]
    OutputDir { path: PathBuf, reason: String },
    #[error("failed to write {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A checked, writable output directory.
///
/// Files are written to a temp file in the same directory and renamed into
/// place, so a failed run never leaves a half-written playlist behind.
#[derive(Debug, Clone)]
pub struct OutputDir {
    dir: PathBuf,
}

impl OutputDir {
    /// Creates the directory if missing and verifies it is writable.
    pub fn prepare(dir: impl Into<PathBuf>) -> Result<Self, PersistError> {
        let dir = dir.into();
        let fail = |reason: String| PersistError::OutputDir {
            path: dir.clone(),
            reason,
        };
        if dir.exists() {
            let meta = fs::metadata(&dir).map_err(|e| fail(e.to_string()))?;
            if !meta.is_dir() {
                return Err(fail("path is not a directory".into()));
            }
        } else {
            fs::create_dir_all(&dir).map_err(|e| fail(e.to_string()))?;
        }
        NamedTempFile::new_in(&dir).map_err(|e| fail(e.to_string()))?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn write(&self, filename: &str, content: &str) -> Result<PathBuf, PersistError> {
        let target = self.dir.join(filename);
        let wrap = |source: io::Error| PersistError::Write {
            path: target.clone(),
            source,
        };

        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(wrap)?;
        tmp.write_all(content.as_bytes()).map_err(wrap)?;
        tmp.flush().map_err(wrap)?;
        tmp.as_file_mut().sync_all().map_err(wrap)?;

        // Renames over any existing file.
        tmp.persist(&target).map_err(|e| wrap(e.error))?;
        Ok(target)
    }
}
