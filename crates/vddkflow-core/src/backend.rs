//! Build backend abstraction
//!
//! The build system and the image registry are external collaborators. The
//! service only needs to start one run of a fixed build and to look up an
//! image reference; everything else about the backend stays behind these
//! traits.

use crate::error::BackendError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A build run created by [`BuildTrigger::start`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRun {
    /// Name the build system gave the run (e.g. "vddk-7")
    pub name: String,
}

impl BuildRun {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Starts the pre-registered build job.
///
/// One attempt per call, no retries. The returned run is not observed
/// afterwards.
#[async_trait]
pub trait BuildTrigger: Send + Sync {
    async fn start(&self) -> Result<BuildRun, BackendError>;
}

/// Resolves a build output to its registry reference.
#[async_trait]
pub trait ArtifactLocator: Send + Sync {
    /// `Ok(None)` when `name` does not exist yet.
    async fn resolve(&self, name: &str) -> Result<Option<String>, BackendError>;
}
