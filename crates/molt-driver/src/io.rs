//! The injected I/O boundary.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::BoxError;

/// Filesystem access as the build orchestrator sees it.
///
/// Paths on both sides are project-relative; the implementation decides
/// where they land. Keeping the boundary abstract lets tests drive the
/// orchestrator with in-memory files.
pub trait BuildIo {
    fn read_input_file(&self, path: &Path) -> Result<String, BoxError>;
    fn write_output_file(&self, path: &Path, content: &str) -> Result<(), BoxError>;
}

impl<I: BuildIo + ?Sized> BuildIo for &I {
    fn read_input_file(&self, path: &Path) -> Result<String, BoxError> {
        (**self).read_input_file(path)
    }

    fn write_output_file(&self, path: &Path, content: &str) -> Result<(), BoxError> {
        (**self).write_output_file(path, content)
    }
}

/// Real-filesystem boundary: reads resolve under the project root, writes
/// resolve under the output directory (created on demand).
pub struct FsIo {
    root: PathBuf,
    out: PathBuf,
}

impl FsIo {
    pub fn new(root: impl Into<PathBuf>, out: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            out: out.into(),
        }
    }
}

impl BuildIo for FsIo {
    fn read_input_file(&self, path: &Path) -> Result<String, BoxError> {
        Ok(fs::read_to_string(self.root.join(path))?)
    }

    fn write_output_file(&self, path: &Path, content: &str) -> Result<(), BoxError> {
        let absolute = self.out.join(path);
        if let Some(parent) = absolute.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(absolute, content)?;
        Ok(())
    }
}
