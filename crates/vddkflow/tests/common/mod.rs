#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use http_body_util::BodyExt;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;
use vddkflow::{AppState, router};
use vddkflow_config::Settings;
use vddkflow_core::{
    ArtifactLocator, ArtifactStager, BackendError, BuildRun, BuildService, BuildTrigger,
    ManualScheduler,
};

pub const LEASE: Duration = Duration::from_secs(15);
const BOUNDARY: &str = "vddkflow-test-boundary";

/// 呼び出し回数を数え、必要なら失敗する BuildTrigger
#[derive(Debug, Default)]
pub struct FakeTrigger {
    calls: AtomicUsize,
    failure: Mutex<Option<BackendError>>,
}

impl FakeTrigger {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn fail_with(&self, error: BackendError) {
        *self.failure.lock().unwrap() = Some(error);
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

#[derive(Debug, Default)]
pub struct FakeRegistry {
    tags: Mutex<HashMap<String, String>>,
    failure: Mutex<Option<BackendError>>,
}

impl FakeRegistry {
    pub fn publish(&self, tag: &str, reference: &str) {
        self.tags
            .lock()
            .unwrap()
            .insert(tag.to_string(), reference.to_string());
    }

    pub fn fail_with(&self, error: BackendError) {
        *self.failure.lock().unwrap() = Some(error);
    }
}

#[async_trait]
impl ArtifactLocator for FakeRegistry {
    async fn resolve(&self, name: &str) -> Result<Option<String>, BackendError> {
        if let Some(err) = self.failure.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(self.tags.lock().unwrap().get(name).cloned())
    }
}

/// フェイクのバックエンドと手動クロックで組み立てたアプリ
pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub trigger: Arc<FakeTrigger>,
    pub registry: Arc<FakeRegistry>,
    pub scheduler: Arc<ManualScheduler>,
}

impl TestApp {
    pub fn new(upload_dir: &Path) -> Self {
        Self::with_settings(Settings {
            upload_dir: upload_dir.to_path_buf(),
            ..Settings::default()
        })
    }

    pub fn with_settings(settings: Settings) -> Self {
        let trigger = Arc::new(FakeTrigger::default());
        let registry = Arc::new(FakeRegistry::default());
        let scheduler = Arc::new(ManualScheduler::new());

        let service = BuildService::new(
            ArtifactStager::new(&settings.upload_dir, settings.artifact_file_name.clone()),
            trigger.clone(),
            registry.clone(),
            scheduler.clone(),
            settings.image_tag.clone(),
        )
        .with_lease_duration(settings.lease_duration());

        let state = AppState::new(service, settings);
        Self {
            app: router(state.clone()),
            state,
            trigger,
            registry,
            scheduler,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(request).await.unwrap()
    }

    pub fn staged_path(&self) -> std::path::PathBuf {
        self.state.service.stager().path()
    }
}

/// 1 フィールドだけの multipart/form-data リクエスト
pub fn upload(uri: &str, field: &str, content: &[u8]) -> Request<Body> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"vddk.tar.gz\"\r\nContent-Type: application/gzip\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
