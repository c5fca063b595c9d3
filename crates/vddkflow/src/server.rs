//! HTTP server
//!
//! Three routes under the configured prefix:
//!
//! - `POST {prefix}/build-image`
//! - `GET {prefix}/image-url`
//! - `GET {prefix}/download-tar`

use crate::handlers;
use crate::response::ApiError;
use anyhow::Context;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use colored::Colorize;
use std::sync::Arc;
use vddkflow_build::{BuildConfigTrigger, ClusterContext, ImageStreamTagLocator};
use vddkflow_config::Settings;
use vddkflow_core::{ArtifactStager, BuildService, CoreError, TokioScheduler};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<BuildService>,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(service: BuildService, settings: Settings) -> Self {
        Self {
            service: Arc::new(service),
            settings: Arc::new(settings),
        }
    }

    pub(crate) fn api_error(&self, err: CoreError) -> ApiError {
        ApiError::from_core(err, self.service.lease_duration())
    }
}

/// Wire the service to OpenShift using the pod's service account.
///
/// Must be called inside a tokio runtime.
pub fn openshift_service(settings: &Settings) -> BuildService {
    let cluster = ClusterContext::new(settings.cluster.clone());
    let trigger = BuildConfigTrigger::new(cluster.clone(), settings.build_config_name.clone());
    let locator = ImageStreamTagLocator::new(cluster);

    BuildService::new(
        ArtifactStager::new(&settings.upload_dir, settings.artifact_file_name.clone()),
        Arc::new(trigger),
        Arc::new(locator),
        Arc::new(TokioScheduler::current()),
        settings.image_tag.clone(),
    )
    .with_lease_duration(settings.lease_duration())
}

pub fn router(state: AppState) -> Router {
    let settings = Arc::clone(&state.settings);

    Router::new()
        .route(&settings.route("/build-image"), post(handlers::build_image))
        .route(&settings.route("/image-url"), get(handlers::image_url))
        .route(&settings.route("/download-tar"), get(handlers::download_tar))
        .layer(DefaultBodyLimit::max(settings.max_upload_bytes()))
        .with_state(state)
}

/// Bind and serve until Ctrl-C or SIGTERM.
pub async fn serve(settings: Settings) -> anyhow::Result<()> {
    vddkflow_build::image_stream_tag_name(&settings.image_tag)
        .with_context(|| format!("invalid image_tag `{}`", settings.image_tag))?;

    let listener = tokio::net::TcpListener::bind(&settings.listen)
        .await
        .with_context(|| format!("failed to bind {}", settings.listen))?;
    let addr = listener.local_addr()?;

    let service = openshift_service(&settings);
    println!(
        "{} {}",
        "VDDK build service listening on".green(),
        addr.to_string().cyan()
    );
    tracing::info!(
        prefix = %settings.route_prefix,
        upload_dir = %settings.upload_dir.display(),
        build_config = %settings.build_config_name,
        lease_seconds = settings.lease_seconds,
        "Server started"
    );

    let app = router(AppState::new(service, settings));
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
