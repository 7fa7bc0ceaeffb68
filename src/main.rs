use anyhow::Result;
use axum::{Router, http::HeaderValue};
use std::{fs, io::ErrorKind, path::Path};
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing_subscriber::EnvFilter;

mod config;
mod errors;
mod handlers;
mod routes;
mod services;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config ---
    let cfg = config::AppConfig::from_env_and_args()?;

    tracing::info!("Starting video-store with config: {:?}", cfg);

    // --- Ensure video directory exists ---
    if !Path::new(&cfg.video_dir).exists() {
        fs::create_dir_all(&cfg.video_dir)?;
        tracing::info!("Created video directory at {}", cfg.video_dir);
    }

    // --- Initialize core service ---
    let store = services::video_store::VideoStore::new(cfg.video_dir.clone());

    // --- Build router ---
    let mut app: Router = routes::routes::routes().with_state(store);
    if let Some(cors) = build_cors_layer(cfg.cors_origins.as_deref()) {
        app = app.layer(cors);
    }

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the CORS layer from the configured origin list.
///
/// `*` allows any origin; a comma-separated list allows exactly those
/// origins; no configuration (or no valid origin in the list) leaves CORS
/// off and the service behaves as a same-origin deployment.
fn build_cors_layer(cors_origins: Option<&str>) -> Option<CorsLayer> {
    let raw = cors_origins?;
    if raw.trim() == "*" {
        tracing::warn!("CORS configured to allow all origins");
        return Some(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    let origins = raw
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("invalid cors origin {}", origin);
                None
            }
        })
        .collect::<Vec<_>>();

    if origins.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any),
    )
}
