#![allow(dead_code)]

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::path::Path as FsPath;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use vddkflow_build::ClusterContext;
use vddkflow_config::ClusterSettings;

pub const NAMESPACE: &str = "openshift-mtv";
pub const TOKEN: &str = "sa-token-for-tests";

/// スタブ API サーバーが返す ImageStreamTag の状態
#[derive(Debug, Clone)]
pub enum TagState {
    Present(String),
    Failing(StatusCode, String),
}

/// 受け取ったリクエストの記録
#[derive(Debug, Clone)]
pub struct Recorded {
    pub path: String,
    pub authorization: Option<String>,
    pub body: Option<Value>,
}

#[derive(Debug, Default)]
pub struct StubState {
    pub requests: Mutex<Vec<Recorded>>,
    pub tags: Mutex<HashMap<String, TagState>>,
    /// Some の間は instantiate が Status で失敗する
    pub trigger_failure: Mutex<Option<(StatusCode, String)>>,
    builds: Mutex<u32>,
}

impl StubState {
    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn set_tag(&self, name: &str, state: TagState) {
        self.tags.lock().unwrap().insert(name.to_string(), state);
    }

    pub fn fail_trigger(&self, code: StatusCode, message: &str) {
        *self.trigger_failure.lock().unwrap() = Some((code, message.to_string()));
    }

    fn record(&self, path: String, headers: &HeaderMap, body: Option<Value>) {
        let authorization = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.requests.lock().unwrap().push(Recorded {
            path,
            authorization,
            body,
        });
    }
}

fn status(code: StatusCode, reason: &str, message: &str) -> Response {
    (
        code,
        Json(json!({
            "kind": "Status",
            "apiVersion": "v1",
            "status": "Failure",
            "reason": reason,
            "message": message,
            "code": code.as_u16(),
        })),
    )
        .into_response()
}

async fn instantiate(
    State(state): State<Arc<StubState>>,
    Path((ns, name)): Path<(String, String)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.record(
        format!("instantiate {}/{}", ns, name),
        &headers,
        Some(body),
    );

    if let Some((code, message)) = state.trigger_failure.lock().unwrap().clone() {
        return status(code, "Forbidden", &message);
    }

    let mut builds = state.builds.lock().unwrap();
    *builds += 1;
    Json(json!({
        "kind": "Build",
        "apiVersion": "build.openshift.io/v1",
        "metadata": { "name": format!("{}-{}", name, *builds), "namespace": ns },
        "status": { "phase": "New" },
    }))
    .into_response()
}

async fn image_stream_tag(
    State(state): State<Arc<StubState>>,
    Path((ns, name)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    state.record(format!("imagestreamtag {}/{}", ns, name), &headers, None);

    match state.tags.lock().unwrap().get(&name).cloned() {
        Some(TagState::Present(reference)) => Json(json!({
            "kind": "ImageStreamTag",
            "apiVersion": "image.openshift.io/v1",
            "metadata": { "name": name, "namespace": ns },
            "image": {
                "metadata": { "name": "sha256:abc" },
                "dockerImageReference": reference,
            },
        }))
        .into_response(),
        Some(TagState::Failing(code, message)) => status(code, "InternalError", &message),
        None => status(
            StatusCode::NOT_FOUND,
            "NotFound",
            &format!("imagestreamtags.image.openshift.io \"{}\" not found", name),
        ),
    }
}

/// OpenShift API のスタブを 127.0.0.1 の空きポートで起動する
pub async fn spawn_stub() -> (String, Arc<StubState>) {
    let state = Arc::new(StubState::default());
    let app = Router::new()
        .route(
            "/apis/build.openshift.io/v1/namespaces/{ns}/buildconfigs/{name}/instantiate",
            post(instantiate),
        )
        .route(
            "/apis/image.openshift.io/v1/namespaces/{ns}/imagestreamtags/{name}",
            get(image_stream_tag),
        )
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), state)
}

/// サービスアカウントのファイル一式を dir に作り、スタブを向いた ClusterContext を返す
pub fn cluster_for(dir: &FsPath, api_server: &str) -> ClusterContext {
    std::fs::write(dir.join("namespace"), format!("{}\n", NAMESPACE)).unwrap();
    std::fs::write(dir.join("token"), TOKEN).unwrap();

    ClusterContext::new(ClusterSettings {
        api_server: Some(api_server.to_string()),
        namespace: None,
        namespace_file: dir.join("namespace"),
        token_file: dir.join("token"),
        ca_file: dir.join("ca.crt"),
    })
}

pub struct Fixture {
    pub _dir: TempDir,
    pub context: ClusterContext,
    pub state: Arc<StubState>,
}

pub async fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let (url, state) = spawn_stub().await;
    let context = cluster_for(dir.path(), &url);
    Fixture {
        _dir: dir,
        context,
        state,
    }
}
