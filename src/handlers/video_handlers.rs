//! HTTP handlers for video upload, deletion, and static serving.
//! Delegates all filesystem concerns to `VideoStore`.

use crate::{
    errors::AppError,
    services::video_store::{StoreError, VideoStore},
};
use axum::{
    Json,
    body::Body,
    extract::{Multipart, Path, Query, State, rejection::JsonRejection},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use serde::Deserialize;
use tokio_util::io::ReaderStream;

/// Multipart field that carries the uploaded file.
const UPLOAD_FIELD: &str = "video";

/// JSON body accepted by `POST /delete`.
#[derive(Debug, Deserialize)]
pub struct DeleteBody {
    #[serde(rename = "fileName")]
    pub file_name: Option<String>,
}

/// Query params accepted by `DELETE /delete`.
#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    pub filename: Option<String>,
}

/// Upload a video via `POST /upload`.
///
/// The first multipart field named `video` is taken; other fields are
/// ignored. The payload is stored under the next free sequential name and
/// that name is echoed back in the body. No size or content-type checks:
/// whatever bytes arrive are written with a `.mp4` name.
pub async fn upload_video(
    State(store): State<VideoStore>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut upload: Option<(Option<String>, Bytes)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::bad_request(format!("Failed to read multipart body: {}", err)))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let original_name = field.file_name().map(|s| s.to_string());
        let data = field
            .bytes()
            .await
            .map_err(|err| AppError::bad_request(format!("Failed to read file data: {}", err)))?;
        upload = Some((original_name, data));
        break;
    }

    let Some((original_name, data)) = upload else {
        return Err(AppError::bad_request("No video uploaded."));
    };
    if let Some(name) = original_name {
        tracing::info!("Received file: {}", name);
    }

    let assigned = store.save(data).await.map_err(|err| {
        tracing::error!("Failed to save video: {}", err);
        AppError::internal("Failed to save video.")
    })?;
    tracing::info!("Video saved as: {}", assigned);

    Ok((StatusCode::OK, format!("Uploaded as {}", assigned)))
}

/// Serve a stored video via `GET /motivationalshorts/{filename}` as a
/// streaming response with the content type inferred from the extension.
pub async fn get_video(
    State(store): State<VideoStore>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    let (file, len) = store.open(&filename).await.map_err(|err| match err {
        StoreError::Io(_) => {
            tracing::error!("Failed to read video: {}", err);
            AppError::internal("Failed to read video.")
        }
        other => AppError::from(other),
    })?;

    let stream = ReaderStream::new(file);
    let mut response = Response::new(Body::from_stream(stream));
    *response.status_mut() = StatusCode::OK;

    let mime = mime_guess::from_path(&filename).first_or_octet_stream();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(mime.as_ref())
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(
        header::CONTENT_LENGTH,
        HeaderValue::from_str(&len.to_string())
            .unwrap_or_else(|_| HeaderValue::from_static("0")),
    );

    Ok(response)
}

/// `POST /delete` — filename from a JSON body field `fileName`.
///
/// A missing or unparsable body is treated the same as a missing filename
/// so the endpoint answers 400 rather than a body-rejection status.
pub async fn delete_video_json(
    State(store): State<VideoStore>,
    body: Result<Json<DeleteBody>, JsonRejection>,
) -> Result<StatusCode, AppError> {
    let file_name = body.ok().and_then(|Json(body)| body.file_name);
    delete_video(&store, file_name).await
}

/// `DELETE /delete` — filename from the `filename` query parameter.
pub async fn delete_video_query(
    State(store): State<VideoStore>,
    Query(query): Query<DeleteQuery>,
) -> Result<StatusCode, AppError> {
    delete_video(&store, query.filename).await
}

/// Shared deletion path behind both `/delete` surfaces; only the way the
/// filename is extracted differs between them.
async fn delete_video(store: &VideoStore, file_name: Option<String>) -> Result<StatusCode, AppError> {
    let Some(file_name) = file_name else {
        return Err(AppError::bad_request("No filename provided."));
    };

    store.remove(&file_name).await.map_err(|err| match err {
        StoreError::InvalidFileName(_) => AppError::from(err),
        other => {
            tracing::error!("Failed to delete file: {}", other);
            AppError::internal("Failed to delete file.")
        }
    })?;
    tracing::info!("Deleted: {}", file_name);

    Ok(StatusCode::OK)
}
