//! Defines routes for the video file-management service.
//!
//! ## Structure
//! - **Video endpoints**
//!   - `GET    /motivationalshorts/{filename}` — serve a stored video
//!   - `POST   /upload` — multipart upload (field `video`)
//!   - `POST   /delete` — delete by JSON body field `fileName`
//!   - `DELETE /delete` — delete by query parameter `filename`
//!
//! Both `/delete` surfaces funnel into the same deletion path; only the
//! input extraction differs. The default request body limit is disabled so
//! uploads of any size are accepted.

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        video_handlers::{delete_video_json, delete_video_query, get_video, upload_video},
    },
    services::video_store::VideoStore,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

/// Build and return the router for all video-service routes.
///
/// The router carries shared state (`VideoStore`) to all handlers.
pub fn routes() -> Router<VideoStore> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // video endpoints
        .route("/motivationalshorts/{filename}", get(get_video))
        .route("/upload", post(upload_video))
        .route("/delete", post(delete_video_json).delete(delete_video_query))
        .layer(DefaultBodyLimit::disable())
}
