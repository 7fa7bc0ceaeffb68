use anyhow::{Context, Result};
use clap::Parser;
use std::env;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub video_dir: String,
    pub cors_origins: Option<String>,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "HTTP video file-management service")]
pub struct Args {
    /// Host to bind to (overrides VIDEO_STORE_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides VIDEO_STORE_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory where videos are stored (overrides VIDEO_STORE_VIDEO_DIR)
    #[arg(long)]
    pub video_dir: Option<String>,

    /// Comma-separated allowed CORS origins, or `*` for any
    /// (overrides VIDEO_STORE_CORS_ORIGINS; unset = same-origin only)
    #[arg(long)]
    pub cors_origins: Option<String>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        // Parse CLI once
        let args = Args::parse();

        // --- Environment fallback ---
        let env_host = env::var("VIDEO_STORE_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = match env::var("VIDEO_STORE_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing VIDEO_STORE_PORT value `{}`", value))?,
            Err(env::VarError::NotPresent) => 3000,
            Err(err) => return Err(err).context("reading VIDEO_STORE_PORT"),
        };
        let env_video_dir =
            env::var("VIDEO_STORE_VIDEO_DIR").unwrap_or_else(|_| "./motivationalshorts".into());
        let env_cors = env::var("VIDEO_STORE_CORS_ORIGINS").ok();

        // --- Merge ---
        Ok(Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            video_dir: args.video_dir.unwrap_or(env_video_dir),
            cors_origins: args.cors_origins.or(env_cors),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
