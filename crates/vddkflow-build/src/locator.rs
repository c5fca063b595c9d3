//! ImageStreamTag の参照解決

use crate::api::{IMAGE_GROUP_VERSION, ImageStreamTag, error_message};
use crate::cluster::ClusterContext;
use crate::tag::image_stream_tag_name;
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use vddkflow_core::{ArtifactLocator, BackendError};

/// ImageStreamTag から `dockerImageReference` を引く
#[derive(Debug, Clone)]
pub struct ImageStreamTagLocator {
    context: ClusterContext,
}

impl ImageStreamTagLocator {
    pub fn new(context: ClusterContext) -> Self {
        Self { context }
    }
}

#[async_trait]
impl ArtifactLocator for ImageStreamTagLocator {
    async fn resolve(&self, name: &str) -> Result<Option<String>, BackendError> {
        let tag = image_stream_tag_name(name).map_err(|e| BackendError::Lookup {
            tag: name.to_string(),
            message: e.to_string(),
        })?;

        let client = self.context.connect()?;
        let url = client.namespaced_path(IMAGE_GROUP_VERSION, &format!("imagestreamtags/{}", tag));
        tracing::debug!("Looking up ImageStreamTag {}/{}", client.namespace(), tag);

        let lookup_err = |message: String| BackendError::Lookup {
            tag: tag.clone(),
            message,
        };

        let response = client
            .request(Method::GET, &url)
            .send()
            .await
            .map_err(|e| lookup_err(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            tracing::debug!("ImageStreamTag {} not found", tag);
            return Ok(None);
        }

        if !response.status().is_success() {
            return Err(lookup_err(error_message(response).await));
        }

        let ist: ImageStreamTag = response
            .json()
            .await
            .map_err(|e| lookup_err(format!("malformed ImageStreamTag response: {}", e)))?;

        Ok(Some(ist.image.docker_image_reference))
    }
}
