//! OpenShift API のレスポンス型

use serde::{Deserialize, Serialize};

pub const BUILD_GROUP_VERSION: &str = "build.openshift.io/v1";
pub const IMAGE_GROUP_VERSION: &str = "image.openshift.io/v1";

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ObjectMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// `buildconfigs/{name}/instantiate` のリクエストボディ
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildRequest {
    pub kind: &'static str,
    pub api_version: &'static str,
    pub metadata: ObjectMeta,
}

impl BuildRequest {
    pub fn new(build_config: &str) -> Self {
        Self {
            kind: "BuildRequest",
            api_version: BUILD_GROUP_VERSION,
            metadata: ObjectMeta {
                name: Some(build_config.to_string()),
            },
        }
    }
}

/// instantiate の結果として作られた Build
#[derive(Debug, Deserialize)]
pub struct Build {
    #[serde(default)]
    pub metadata: ObjectMeta,
}

#[derive(Debug, Deserialize)]
pub struct ImageStreamTag {
    pub image: Image,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub docker_image_reference: String,
}

/// エラー時に返される `Status` オブジェクト
#[derive(Debug, Default, Deserialize)]
pub struct Status {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// 失敗レスポンスからメッセージを取り出す
///
/// `Status` として読めなければ本文とステータスコードをそのまま使う。
pub async fn error_message(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    match serde_json::from_str::<Status>(&body) {
        Ok(Status {
            message: Some(message),
            ..
        }) => format!("{} ({})", message, status),
        Ok(Status {
            reason: Some(reason),
            ..
        }) => format!("{} ({})", reason, status),
        _ if body.trim().is_empty() => status.to_string(),
        _ => format!("{} ({})", body.trim(), status),
    }
}
