//! VDDKFlow core
//!
//! Admission control and lifecycle for a single external image build
//! pipeline.
//!
//! ```text
//! upload ──▶ BusyLease ──admitted──▶ ArtifactStager ──▶ BuildTrigger
//!               │ rejected (Busy)                            │
//!               ▼                                            ▼
//!           retry later               Scheduler releases the lease after
//!                                     the configured delay
//! ```
//!
//! The build backend is reached through [`BuildTrigger`] and
//! [`ArtifactLocator`]; `vddkflow-build` provides the OpenShift
//! implementation.

pub mod backend;
pub mod error;
pub mod lease;
pub mod scheduler;
pub mod service;
pub mod stager;

// Re-exports
pub use backend::{ArtifactLocator, BuildRun, BuildTrigger};
pub use error::{BackendError, CoreError, Result};
pub use lease::{BusyLease, LeaseToken};
pub use scheduler::{DelayedTask, ManualScheduler, Scheduler, TokioScheduler};
pub use service::{Admission, BuildService, Submission};
pub use stager::{ArtifactStager, StagedArtifact, StagingFile};
