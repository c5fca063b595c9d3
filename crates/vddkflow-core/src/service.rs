//! Build submission orchestration
//!
//! A submission moves through admission, staging and triggering:
//!
//! - rejected at admission: nothing is touched, the caller retries later
//! - staging failed: the error is returned, the lease stays held
//! - trigger failed or accepted: the result is returned right away
//!
//! Once admitted, the lease is always released by the scheduler after the
//! lease duration, on every exit path. A failed upload does not give the
//! lease back early, so clients cannot hammer the pipeline by retrying
//! immediately.

use crate::backend::{ArtifactLocator, BuildRun, BuildTrigger};
use crate::error::{CoreError, Result};
use crate::lease::{BusyLease, LeaseToken};
use crate::scheduler::Scheduler;
use crate::stager::{ArtifactStager, StagedArtifact};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

/// Default time the lease stays held after an admitted submission.
pub const DEFAULT_LEASE_DURATION: Duration = Duration::from_secs(15);

/// Result of an accepted submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub run: BuildRun,
    pub bytes: u64,
    pub lease_generation: u64,
}

/// Ties the lease, the stager and the backend together.
pub struct BuildService {
    lease: Arc<BusyLease>,
    scheduler: Arc<dyn Scheduler>,
    stager: ArtifactStager,
    trigger: Arc<dyn BuildTrigger>,
    locator: Arc<dyn ArtifactLocator>,
    lease_duration: Duration,
    image_tag: String,
}

impl BuildService {
    pub fn new(
        stager: ArtifactStager,
        trigger: Arc<dyn BuildTrigger>,
        locator: Arc<dyn ArtifactLocator>,
        scheduler: Arc<dyn Scheduler>,
        image_tag: impl Into<String>,
    ) -> Self {
        Self {
            lease: Arc::new(BusyLease::new()),
            scheduler,
            stager,
            trigger,
            locator,
            lease_duration: DEFAULT_LEASE_DURATION,
            image_tag: image_tag.into(),
        }
    }

    pub fn with_lease_duration(mut self, lease_duration: Duration) -> Self {
        self.lease_duration = lease_duration;
        self
    }

    pub fn lease(&self) -> &Arc<BusyLease> {
        &self.lease
    }

    pub fn lease_duration(&self) -> Duration {
        self.lease_duration
    }

    pub fn stager(&self) -> &ArtifactStager {
        &self.stager
    }

    pub fn image_tag(&self) -> &str {
        &self.image_tag
    }

    /// Try to take the lease for one submission.
    ///
    /// The returned guard schedules the release when dropped.
    pub fn admit(&self) -> Result<Admission> {
        let token = self.lease.try_acquire().ok_or(CoreError::Busy)?;
        Ok(Admission {
            lease: Arc::clone(&self.lease),
            scheduler: Arc::clone(&self.scheduler),
            after: self.lease_duration,
            token,
        })
    }

    /// Stage `payload` and start one build.
    ///
    /// An empty payload is refused before admission. The call returns as
    /// soon as the build system accepted (or refused) the run; it never
    /// waits for the build itself.
    pub async fn submit<R>(&self, payload: R) -> Result<Submission>
    where
        R: AsyncRead + Unpin + Send,
    {
        let mut payload = BufReader::new(payload);
        let first = payload
            .fill_buf()
            .await
            .map_err(CoreError::Upload)?;
        if first.is_empty() {
            return Err(CoreError::EmptyUpload);
        }

        let admission = match self.admit() {
            Ok(admission) => admission,
            Err(e) => {
                tracing::info!("Build submission rejected: another build is in progress");
                return Err(e);
            }
        };
        let generation = admission.generation();

        let bytes = self
            .stager
            .stage(&mut payload)
            .await
            .inspect_err(|e| tracing::error!(generation, "Staging failed: {}", e))?;

        let run = self
            .trigger
            .start()
            .await
            .inspect_err(|e| tracing::error!(generation, "Build trigger failed: {}", e))?;

        tracing::info!(
            generation,
            build = %run.name,
            bytes,
            "Build started; lease held for {:?}",
            self.lease_duration
        );

        Ok(Submission {
            run,
            bytes,
            lease_generation: generation,
        })
    }

    /// The most recently staged artifact, if any.
    pub async fn retrieve(&self) -> Result<Option<StagedArtifact>> {
        self.stager.open().await
    }

    /// Registry reference of the build output, `None` if not built yet.
    pub async fn image_reference(&self) -> Result<Option<String>> {
        Ok(self.locator.resolve(&self.image_tag).await?)
    }
}

impl std::fmt::Debug for BuildService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildService")
            .field("lease", &self.lease)
            .field("stager", &self.stager)
            .field("lease_duration", &self.lease_duration)
            .field("image_tag", &self.image_tag)
            .finish_non_exhaustive()
    }
}

/// A held lease for one submission.
///
/// Dropping it schedules the lease release after the lease duration.
#[must_use = "dropping the admission immediately schedules its release"]
pub struct Admission {
    lease: Arc<BusyLease>,
    scheduler: Arc<dyn Scheduler>,
    after: Duration,
    token: LeaseToken,
}

impl Admission {
    pub fn generation(&self) -> u64 {
        self.token.generation()
    }
}

impl std::fmt::Debug for Admission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Admission")
            .field("generation", &self.token.generation())
            .field("after", &self.after)
            .finish_non_exhaustive()
    }
}

impl Drop for Admission {
    fn drop(&mut self) {
        self.lease
            .schedule_release(self.scheduler.as_ref(), self.after, self.token);
    }
}
