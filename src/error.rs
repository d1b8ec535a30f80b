// src/error.rs - Error taxonomy for the comparison pipeline
use std::path::{Path, PathBuf};
use thiserror::Error;

pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Failures of the angle-comparison pipeline.
///
/// A video without any detected pose is not an error: it yields empty
/// sequences that flow through scoring and rendering as defined behavior.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Cannot decode video {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("Cannot encode {path}: {reason}")]
    Encode { path: PathBuf, reason: String },

    #[error("Filesystem error at {path}: {source}")]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Pose detector failed: {0}")]
    Detector(String),

    #[error("Rendering failed: {0}")]
    Render(String),
}

impl AnalysisError {
    pub fn decode(path: impl AsRef<Path>, reason: impl Into<String>) -> Self {
        Self::Decode {
            path: path.as_ref().to_path_buf(),
            reason: reason.into(),
        }
    }

    pub fn encode(path: impl AsRef<Path>, reason: impl Into<String>) -> Self {
        Self::Encode {
            path: path.as_ref().to_path_buf(),
            reason: reason.into(),
        }
    }

    pub fn filesystem(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn detector(msg: impl Into<String>) -> Self {
        Self::Detector(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }
}
