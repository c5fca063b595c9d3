use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use vddkflow_core::{
    ArtifactLocator, ArtifactStager, BackendError, BuildRun, BuildService, BuildTrigger,
    ManualScheduler,
};

pub const LEASE: Duration = Duration::from_secs(15);

/// 呼び出し回数を数える BuildTrigger
#[derive(Debug, Default)]
pub struct FakeTrigger {
    calls: AtomicUsize,
    failure: Mutex<Option<BackendError>>,
}

impl FakeTrigger {
    pub fn failing(error: BackendError) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            failure: Mutex::new(Some(error)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BuildTrigger for FakeTrigger {
    async fn start(&self) -> Result<BuildRun, BackendError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        match self.failure.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(BuildRun::new(format!("vddk-{}", n))),
        }
    }
}

/// メモリ上のレジストリ
#[derive(Debug, Default)]
pub struct FakeRegistry {
    tags: Mutex<HashMap<String, String>>,
}

impl FakeRegistry {
    pub fn publish(&self, tag: &str, reference: &str) {
        self.tags
            .lock()
            .unwrap()
            .insert(tag.to_string(), reference.to_string());
    }
}

#[async_trait]
impl ArtifactLocator for FakeRegistry {
    async fn resolve(&self, name: &str) -> Result<Option<String>, BackendError> {
        Ok(self.tags.lock().unwrap().get(name).cloned())
    }
}

pub struct Harness {
    pub service: BuildService,
    pub trigger: Arc<FakeTrigger>,
    pub registry: Arc<FakeRegistry>,
    pub scheduler: Arc<ManualScheduler>,
}

impl Harness {
    pub fn new(upload_dir: &Path) -> Self {
        Self::with_trigger(upload_dir, FakeTrigger::default())
    }

    pub fn with_trigger(upload_dir: &Path, trigger: FakeTrigger) -> Self {
        let trigger = Arc::new(trigger);
        let registry = Arc::new(FakeRegistry::default());
        let scheduler = Arc::new(ManualScheduler::new());
        let service = BuildService::new(
            ArtifactStager::new(upload_dir, "vddk.tar.gz"),
            trigger.clone(),
            registry.clone(),
            scheduler.clone(),
            "vddk:latest",
        )
        .with_lease_duration(LEASE);

        Self {
            service,
            trigger,
            registry,
            scheduler,
        }
    }

    pub fn staged_path(&self) -> std::path::PathBuf {
        self.service.stager().path()
    }
}
