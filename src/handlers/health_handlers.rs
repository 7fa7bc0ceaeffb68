//! Health & readiness handlers.
//!
//! - GET /healthz  -> simple liveness ("ok")
//! - GET /readyz   -> readiness that checks video-directory I/O

use crate::services::video_store::VideoStore;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use std::collections::HashMap;
use tokio::fs;
use uuid::Uuid;

/// `GET /healthz`
///
/// Very small liveness probe — always returns 200 OK with a plain JSON body.
/// This endpoint should be cheap and never perform I/O.
pub async fn healthz() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".into(),
        }),
    )
}

/// `GET /readyz`
///
/// Readiness probe: a best-effort write/read/delete round trip against the
/// video directory. HTTP 200 when the probe passes, HTTP 503 otherwise,
/// with a JSON body describing the check.
pub async fn readyz(State(store): State<VideoStore>) -> impl IntoResponse {
    let disk = disk_probe(&store).await;
    let ok = disk.ok;

    let mut checks = HashMap::new();
    checks.insert("disk", disk);

    let body = ReadyResponse {
        status: if ok { "ok".into() } else { "error".into() },
        checks,
    };
    let status = if ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

/// Write, read back, and remove a temp file under the video directory.
/// The temp file is cleaned up best-effort on every outcome.
async fn disk_probe(store: &VideoStore) -> CheckStatus {
    let tmp_path = store.base_path.join(format!(".readyz-{}", Uuid::new_v4()));
    let result = async {
        fs::write(&tmp_path, b"readyz")
            .await
            .map_err(|e| format!("could not write tmp file: {}", e))?;
        let bytes = fs::read(&tmp_path)
            .await
            .map_err(|e| format!("could not read tmp file: {}", e))?;
        if bytes != b"readyz" {
            return Err("file content mismatch".to_string());
        }
        Ok(())
    }
    .await;
    let _ = fs::remove_file(&tmp_path).await;

    match result {
        Ok(()) => CheckStatus {
            ok: true,
            error: None,
        },
        Err(error) => CheckStatus {
            ok: false,
            error: Some(error),
        },
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: String,
    checks: HashMap<&'static str, CheckStatus>,
}

#[derive(Serialize)]
struct CheckStatus {
    ok: bool,
    error: Option<String>,
}
