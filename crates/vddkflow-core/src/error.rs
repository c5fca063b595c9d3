//! Core error types
//!
//! Variants follow the failure classes of a build submission: admission,
//! client input, storage and external system. Absence of an artifact or an
//! image is never an error and is reported as `None` instead.

use std::path::PathBuf;
use thiserror::Error;

/// Failures reported by the build backend.
///
/// Each variant names the stage that failed so the caller can tell a
/// missing namespace from a rejected API call. Messages never carry the
/// bearer token.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("failed to get the pod namespace: {0}")]
    Namespace(String),

    #[error("load cluster config: {0}")]
    Config(String),

    #[error("create API client: {0}")]
    Client(String),

    #[error("start build: {0}")]
    Trigger(String),

    #[error("could not get ImageStreamTag {tag}: {message}")]
    Lookup { tag: String, message: String },
}

/// Errors produced by the build orchestration.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Server is busy processing another build. Please try again later.")]
    Busy,

    #[error("No file provided")]
    MissingUpload,

    #[error("Uploaded file is empty")]
    EmptyUpload,

    /// Reading the request body failed.
    #[error("Could not process uploaded file: {0}")]
    Upload(#[source] std::io::Error),

    #[error("{context} {}: {source}", .path.display())]
    Storage {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl CoreError {
    pub(crate) fn storage(
        context: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        CoreError::Storage {
            context,
            path: path.into(),
            source,
        }
    }

    /// Admission was refused; the caller should retry later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::Busy)
    }

    /// The request itself was unusable and nothing was touched.
    pub fn is_client_error(&self) -> bool {
        matches!(self, CoreError::MissingUpload | CoreError::EmptyUpload)
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
