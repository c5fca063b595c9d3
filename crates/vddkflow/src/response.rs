//! JSON envelopes shared by every endpoint
//!
//! Success: `{"status": "success", "message": ..., "data": {...}}`
//! Error:   `{"status": "error", "message": ...}` (`retryable: true` when busy)

use axum::{
    Json,
    extract::multipart::MultipartError,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use vddkflow_core::CoreError;

#[derive(Debug, Serialize)]
struct Envelope {
    status: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    retryable: bool,
}

/// `200` with the success envelope.
pub fn success(message: impl Into<String>, data: Option<Value>) -> Response {
    Json(Envelope {
        status: "success",
        message: message.into(),
        data,
        retryable: false,
    })
    .into_response()
}

/// An error response with the error envelope.
#[derive(Debug, thiserror::Error)]
#[error("{status}: {message}")]
pub struct ApiError {
    status: StatusCode,
    message: String,
    retry_after: Option<Duration>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// Map a service error, hinting `retry_after` to busy clients.
    pub fn from_core(err: CoreError, retry_after: Duration) -> Self {
        let status = match &err {
            CoreError::Busy => StatusCode::SERVICE_UNAVAILABLE,
            CoreError::Upload(source) => upload_status(source),
            _ if err.is_client_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        Self {
            status,
            message: err.to_string(),
            retry_after: err.is_retryable().then_some(retry_after),
        }
    }

    /// A multipart body that could not be parsed.
    pub fn from_multipart(err: MultipartError) -> Self {
        Self::new(
            err.status(),
            format!("Could not process uploaded file: {}", err.body_text()),
        )
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

/// 読み込みに失敗したアップロードはクライアント側の問題
///
/// 上限超過なら 413、それ以外の不正な multipart は 400。
fn upload_status(err: &std::io::Error) -> StatusCode {
    err.get_ref()
        .and_then(|inner| inner.downcast_ref::<MultipartError>())
        .map(MultipartError::status)
        .unwrap_or(StatusCode::BAD_REQUEST)
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() && self.retry_after.is_none() {
            tracing::error!("{}", self.message);
        }

        let body = Json(Envelope {
            status: "error",
            message: self.message,
            data: None,
            retryable: self.retry_after.is_some(),
        });
        let mut response = (self.status, body).into_response();

        if let Some(after) = self.retry_after {
            // 端数は切り上げ
            let secs = after.as_secs() + u64::from(after.subsec_nanos() > 0);
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}
