use std::{path::PathBuf, time::Duration};

use crate::service::{DEFAULT_MAX_CONCURRENT_DOWNLOADS, DEFAULT_MAX_DOWNLOAD_BYTES};

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8787";
pub const DEFAULT_YT_DLP_BIN: &str = "yt-dlp";
pub const DEFAULT_YT_DLP_TIMEOUT_SECONDS: u64 = 180;
pub const STALE_JOB_SECONDS: u64 = 2 * 60 * 60;

/// Process settings, read once from the environment at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub allowed_origins: Vec<String>,
    pub yt_dlp_bin: PathBuf,
    /// `None` lets the engine run as long as it needs.
    pub yt_dlp_timeout: Option<Duration>,
    pub max_concurrent_downloads: usize,
    pub max_download_bytes: u64,
    pub transfer_dir: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |name: &str| lookup(name).and_then(|value| non_empty(&value).map(str::to_string));
        let number = |name: &str| text(name).and_then(|value| value.parse::<u64>().ok());

        let bind_addr = text("APP_ADDR")
            .or_else(|| {
                text("PORT")
                    .and_then(|value| value.parse::<u16>().ok())
                    .map(|port| format!("0.0.0.0:{port}"))
            })
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());

        let allowed_origins = text("ALLOWED_ORIGINS")
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(ToString::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let yt_dlp_timeout = match number("YT_DLP_TIMEOUT_SECONDS") {
            Some(0) => None,
            Some(seconds) => Some(Duration::from_secs(seconds)),
            None => Some(Duration::from_secs(DEFAULT_YT_DLP_TIMEOUT_SECONDS)),
        };

        let max_concurrent_downloads = number("MAX_CONCURRENT_DOWNLOADS")
            .and_then(|value| usize::try_from(value).ok())
            .filter(|value| *value > 0)
            .unwrap_or(DEFAULT_MAX_CONCURRENT_DOWNLOADS);

        let max_download_bytes = number("MAX_DOWNLOAD_BYTES")
            .filter(|value| *value > 0)
            .unwrap_or(DEFAULT_MAX_DOWNLOAD_BYTES);

        Self {
            bind_addr,
            allowed_origins,
            yt_dlp_bin: text("YT_DLP_BIN")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_YT_DLP_BIN)),
            yt_dlp_timeout,
            max_concurrent_downloads,
            max_download_bytes,
            transfer_dir: text("TRANSFER_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| std::env::temp_dir().join("mediagrab")),
        }
    }
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}
