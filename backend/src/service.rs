use std::{path::PathBuf, sync::Arc};

use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::{
    error::DownloadError,
    extraction::{ExtractionConfig, Extractor},
    platform::Platform,
    relay::{DownloadedArtifact, load_artifact, resolve_artifact},
    validator::{ValidatedRequest, validate},
    workspace::JobDir,
};

pub const DEFAULT_MAX_DOWNLOAD_BYTES: u64 = 250 * 1024 * 1024;
pub const DEFAULT_MAX_CONCURRENT_DOWNLOADS: usize = 3;

#[derive(Clone)]
pub struct DownloadService {
    extractor: Arc<dyn Extractor>,
    transfer_dir: PathBuf,
    max_download_bytes: u64,
    permits: Arc<Semaphore>,
}

impl DownloadService {
    pub fn new(extractor: Arc<dyn Extractor>, transfer_dir: impl Into<PathBuf>) -> Self {
        Self {
            extractor,
            transfer_dir: transfer_dir.into(),
            max_download_bytes: DEFAULT_MAX_DOWNLOAD_BYTES,
            permits: Arc::new(Semaphore::new(DEFAULT_MAX_CONCURRENT_DOWNLOADS)),
        }
    }

    pub fn with_max_download_bytes(mut self, limit: u64) -> Self {
        self.max_download_bytes = limit;
        self
    }

    pub fn with_max_concurrent_downloads(mut self, limit: usize) -> Self {
        self.permits = Arc::new(Semaphore::new(limit.max(1)));
        self
    }

    /// Validates, downloads and reads one media URL. The scratch directory used
    /// for the download no longer exists when this returns.
    pub async fn download(
        &self,
        platform: Platform,
        raw_url: &str,
    ) -> Result<DownloadedArtifact, DownloadError> {
        let request = validate(platform, raw_url)?;
        self.download_validated(&request).await
    }

    pub async fn download_validated(
        &self,
        request: &ValidatedRequest,
    ) -> Result<DownloadedArtifact, DownloadError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| DownloadError::Workspace {
                source: std::io::Error::other("download capacity is closed"),
            })?;

        let job = JobDir::create(&self.transfer_dir)
            .await
            .map_err(|source| DownloadError::Workspace { source })?;

        let result = self.run_job(request, &job).await;
        job.close().await;

        match &result {
            Ok(artifact) => info!(
                platform = %request.platform(),
                filename = %artifact.filename,
                size = artifact.bytes.len(),
                "download finished"
            ),
            Err(error) => warn!(
                platform = %request.platform(),
                code = error.code(),
                "download failed: {error}"
            ),
        }

        result
    }

    async fn run_job(
        &self,
        request: &ValidatedRequest,
        job: &JobDir,
    ) -> Result<DownloadedArtifact, DownloadError> {
        let config = ExtractionConfig::for_request(request, job.path(), &mut rand::thread_rng());
        let media = self.extractor.extract(request, &config).await?;
        let path = resolve_artifact(job.path(), &media.file_path).await?;
        load_artifact(&path, &media.title, self.max_download_bytes).await
    }
}
