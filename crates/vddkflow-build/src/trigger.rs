//! BuildConfig の起動
//!
//! `buildconfigs/{name}/instantiate` を一度だけ呼び、作られた Build の
//! 名前を返す。ビルドの進行は追跡しない。

use crate::api::{BUILD_GROUP_VERSION, Build, BuildRequest, error_message};
use crate::cluster::ClusterContext;
use async_trait::async_trait;
use reqwest::Method;
use vddkflow_core::{BackendError, BuildRun, BuildTrigger};

/// 事前登録された BuildConfig を起動する
#[derive(Debug, Clone)]
pub struct BuildConfigTrigger {
    context: ClusterContext,
    build_config: String,
}

impl BuildConfigTrigger {
    pub fn new(context: ClusterContext, build_config: impl Into<String>) -> Self {
        Self {
            context,
            build_config: build_config.into(),
        }
    }

    pub fn build_config(&self) -> &str {
        &self.build_config
    }
}

#[async_trait]
impl BuildTrigger for BuildConfigTrigger {
    async fn start(&self) -> Result<BuildRun, BackendError> {
        let client = self.context.connect()?;
        let url = client.namespaced_path(
            BUILD_GROUP_VERSION,
            &format!("buildconfigs/{}/instantiate", self.build_config),
        );

        tracing::info!(
            "Instantiating BuildConfig {}/{}",
            client.namespace(),
            self.build_config
        );

        let response = client
            .request(Method::POST, &url)
            .json(&BuildRequest::new(&self.build_config))
            .send()
            .await
            .map_err(|e| BackendError::Trigger(e.to_string()))?;

        if !response.status().is_success() {
            return Err(BackendError::Trigger(error_message(response).await));
        }

        let build: Build = response
            .json()
            .await
            .map_err(|e| BackendError::Trigger(format!("malformed Build response: {}", e)))?;

        // 名前が返らない場合は BuildConfig 名で代用
        let name = build
            .metadata
            .name
            .unwrap_or_else(|| self.build_config.clone());
        tracing::info!("Build {} created", name);
        Ok(BuildRun::new(name))
    }
}
