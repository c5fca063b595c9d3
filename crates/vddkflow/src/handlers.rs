use crate::response::{ApiError, success};
use crate::server::AppState;
use axum::{
    body::Body,
    extract::{Multipart, State, multipart::MultipartRejection},
    http::header,
    response::{IntoResponse, Response},
};
use futures_util::TryStreamExt;
use serde_json::json;
use tokio_util::io::{ReaderStream, StreamReader};
use vddkflow_core::CoreError;

/// Multipart field carrying the VDDK tarball.
pub const UPLOAD_FIELD: &str = "file";

/// POST /build-image
pub async fn build_image(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let mut multipart = multipart.map_err(|e| {
        tracing::debug!("Rejected upload body: {}", e);
        state.api_error(CoreError::MissingUpload)
    })?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(ApiError::from_multipart)?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let reader = StreamReader::new(Box::pin(field.map_err(std::io::Error::other)));
        let submission = state
            .service
            .submit(reader)
            .await
            .map_err(|e| state.api_error(e))?;

        return Ok(success(
            "VDDK build started; check your registry in OpenShift",
            Some(json!({ "build": submission.run.name })),
        ));
    }

    Err(state.api_error(CoreError::MissingUpload))
}

/// GET /image-url
pub async fn image_url(State(state): State<AppState>) -> Result<Response, ApiError> {
    let tag = state.service.image_tag();
    match state
        .service
        .image_reference()
        .await
        .map_err(|e| state.api_error(e))?
    {
        Some(reference) => Ok(success(
            format!("Image: {} exists", tag),
            Some(json!({ "imageReference": reference })),
        )),
        None => Err(ApiError::not_found(format!("Image: {} not found", tag))),
    }
}

/// GET /download-tar
pub async fn download_tar(State(state): State<AppState>) -> Result<Response, ApiError> {
    let Some(artifact) = state
        .service
        .retrieve()
        .await
        .map_err(|e| state.api_error(e))?
    else {
        return Err(ApiError::not_found("VDDK tar not found"));
    };

    tracing::debug!("Serving {} ({} bytes)", artifact.file_name, artifact.len);

    let headers = [
        (header::CONTENT_TYPE, "application/octet-stream".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", artifact.file_name),
        ),
        (header::CONTENT_LENGTH, artifact.len.to_string()),
    ];
    let body = Body::from_stream(ReaderStream::new(artifact.file));

    Ok((headers, body).into_response())
}
