// src/scratch.rs - Scoped working directories
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{AnalysisError, AnalysisResult};

/// A per-invocation working directory `<root>/<uuid>`, removed recursively
/// when dropped unless `keep` was called.
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
    keep: bool,
}

impl ScratchDir {
    pub fn create(root: impl AsRef<Path>) -> AnalysisResult<Self> {
        let path = root.as_ref().join(Uuid::new_v4().to_string());
        fs::create_dir_all(&path).map_err(|e| AnalysisError::filesystem(&path, e))?;
        debug!("Created scratch directory {}", path.display());
        Ok(Self { path, keep: false })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Leave the directory on disk and return its path.
    pub fn keep(mut self) -> PathBuf {
        self.keep = true;
        self.path.clone()
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if self.keep {
            return;
        }
        match fs::remove_dir_all(&self.path) {
            Ok(()) => debug!("Removed scratch directory {}", self.path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove {}: {}", self.path.display(), e),
        }
    }
}

/// Directory for transient frame images. Created idempotently and removed
/// on drop, whatever the outcome of the work staged in it.
#[derive(Debug)]
pub struct StagingDir {
    path: PathBuf,
}

impl StagingDir {
    /// Creates the directory if needed and empties it: frames left by an
    /// interrupted run must never reach the encoder.
    pub fn create(path: impl Into<PathBuf>) -> AnalysisResult<Self> {
        let path = path.into();
        fs::create_dir_all(&path).map_err(|e| AnalysisError::filesystem(&path, e))?;
        let staging = Self { path };
        staging.clear()?;
        Ok(staging)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete everything staged so far, keeping the directory itself.
    pub fn clear(&self) -> AnalysisResult<()> {
        let entries = fs::read_dir(&self.path).map_err(|e| AnalysisError::filesystem(&self.path, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| AnalysisError::filesystem(&self.path, e))?;
            let path = entry.path();
            let removed = if path.is_dir() {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };
            removed.map_err(|e| AnalysisError::filesystem(&path, e))?;
        }
        Ok(())
    }
}

impl Drop for StagingDir {
    fn drop(&mut self) {
        match fs::remove_dir_all(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove staging {}: {}", self.path.display(), e),
        }
    }
}
