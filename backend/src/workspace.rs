//! Per-request scratch directories.
//!
//! A [`JobDir`] is created under the transfer directory for one download.
//! [`JobDir::close`] removes it asynchronously. A guard dropped without being
//! closed (panic, cancelled request) removes the directory synchronously.

use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};

use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug)]
pub struct JobDir {
    path: PathBuf,
    closed: bool,
}

impl JobDir {
    pub async fn create(transfer_dir: &Path) -> io::Result<Self> {
        let path = transfer_dir.join(Uuid::new_v4().to_string());
        tokio::fs::create_dir_all(&path).await?;
        debug!(path = ?path, "job directory created");
        Ok(Self {
            path,
            closed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn close(mut self) {
        let removal = tokio::fs::remove_dir_all(&self.path).await;
        log_removal(&self.path, removal);
        self.closed = true;
    }
}

impl Drop for JobDir {
    fn drop(&mut self) {
        if !self.closed {
            log_removal(&self.path, std::fs::remove_dir_all(&self.path));
        }
    }
}

fn log_removal(path: &Path, removal: io::Result<()>) {
    match removal {
        Ok(()) => debug!(path = ?path, "job directory removed"),
        Err(error) if error.kind() == ErrorKind::NotFound => {}
        Err(error) => debug!(path = ?path, "could not remove job directory: {error}"),
    }
}

/// Removes leftovers from earlier runs that are older than `older_than`.
pub async fn cleanup_stale_jobs(transfer_dir: &Path, older_than: Duration) {
    if older_than.is_zero() {
        return;
    }

    let mut entries = match tokio::fs::read_dir(transfer_dir).await {
        Ok(entries) => entries,
        Err(error) => {
            if error.kind() != ErrorKind::NotFound {
                warn!("Could not open transfer directory for cleanup: {error}");
            }
            return;
        }
    };

    let now = SystemTime::now();

    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(error) => {
                warn!("Could not iterate transfer directory for cleanup: {error}");
                break;
            }
        };

        let path = entry.path();
        let metadata = match entry.metadata().await {
            Ok(metadata) => metadata,
            Err(error) => {
                warn!("Could not read metadata of {:?}: {error}", path);
                continue;
            }
        };

        let age = metadata
            .modified()
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .unwrap_or_default();
        if age < older_than {
            continue;
        }

        let removal = if metadata.is_dir() {
            tokio::fs::remove_dir_all(&path).await
        } else {
            tokio::fs::remove_file(&path).await
        };

        match removal {
            Ok(()) => debug!(path = ?path, "stale job removed"),
            Err(error) if error.kind() == ErrorKind::NotFound => {}
            Err(error) => warn!("Could not remove stale job {:?}: {error}", path),
        }
    }
}
