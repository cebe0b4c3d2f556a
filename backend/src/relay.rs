use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use tracing::{debug, warn};

use crate::{error::DownloadError, sanitize::filename_for_title};

pub const CONTENT_TYPE: &str = "video/mp4";

/// The produced media, read into memory so the job directory can go away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedArtifact {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Locates the file the engine reported inside `job_dir`.
///
/// The reported path is tried as given and relative to the job directory. A
/// report that does not name an existing regular file inside the job directory
/// is [`DownloadError::ArtifactMissing`], whatever else the directory holds.
pub async fn resolve_artifact(job_dir: &Path, reported: &Path) -> Result<PathBuf, DownloadError> {
    let canonical_job_dir = tokio::fs::canonicalize(job_dir)
        .await
        .map_err(|source| DownloadError::Workspace { source })?;

    for candidate in [reported.to_path_buf(), job_dir.join(reported)] {
        if let Some(path) = confined_file(&canonical_job_dir, &candidate).await? {
            return Ok(path);
        }
    }

    warn!("Reported artifact {:?} is not in {:?}", reported, job_dir);
    Err(DownloadError::ArtifactMissing {
        path: reported.to_path_buf(),
    })
}

async fn confined_file(
    canonical_job_dir: &Path,
    candidate: &Path,
) -> Result<Option<PathBuf>, DownloadError> {
    let metadata = match tokio::fs::metadata(candidate).await {
        Ok(metadata) => metadata,
        Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
        Err(source) => return Err(DownloadError::Workspace { source }),
    };

    if !metadata.is_file() {
        return Ok(None);
    }

    let canonical = tokio::fs::canonicalize(candidate)
        .await
        .map_err(|source| DownloadError::Workspace { source })?;

    if !canonical.starts_with(canonical_job_dir) {
        warn!("Ignoring file outside the job directory: {:?}", canonical);
        return Ok(None);
    }

    Ok(Some(canonical))
}

/// Reads the artifact and names it after `title`.
pub async fn load_artifact(
    path: &Path,
    title: &str,
    max_bytes: u64,
) -> Result<DownloadedArtifact, DownloadError> {
    let metadata = match tokio::fs::metadata(path).await {
        Ok(metadata) if metadata.is_file() => metadata,
        Ok(_) => {
            return Err(DownloadError::ArtifactMissing {
                path: path.to_path_buf(),
            });
        }
        Err(error) if error.kind() == ErrorKind::NotFound => {
            return Err(DownloadError::ArtifactMissing {
                path: path.to_path_buf(),
            });
        }
        Err(source) => return Err(DownloadError::Workspace { source }),
    };

    if metadata.len() > max_bytes {
        return Err(DownloadError::ArtifactTooLarge {
            size: metadata.len(),
            limit: max_bytes,
        });
    }

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| DownloadError::Workspace { source })?;

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .unwrap_or("mp4");
    let title = if title.trim().is_empty() {
        path.file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or_default()
    } else {
        title
    };
    let filename = filename_for_title(title, extension);

    debug!(filename = %filename, size = bytes.len(), "artifact loaded");

    Ok(DownloadedArtifact {
        filename,
        content_type: CONTENT_TYPE,
        bytes,
    })
}
