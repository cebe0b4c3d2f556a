#![allow(dead_code)]

use std::{
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio::sync::Semaphore;
use mediagrab::{
    DownloadService, ExtractedMedia, ExtractionConfig, ExtractionError, Extractor,
    ValidatedRequest,
};

/// What the fake engine does when invoked.
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Writes `bytes` to `<job>/<file_name>` and reports it with `title`.
    Produce {
        title: String,
        file_name: String,
        bytes: Vec<u8>,
    },
    /// Reports success for a file it never wrote.
    ReportOnly { title: String, file_name: String },
    /// Writes `written` but reports `reported`.
    Misreport {
        title: String,
        written: String,
        reported: String,
    },
    /// Fails with the given engine text after leaving a partial file behind.
    Fail(String),
}

pub struct SpyExtractor {
    behavior: Behavior,
    calls: AtomicUsize,
    job_dirs: Mutex<Vec<PathBuf>>,
    configs: Mutex<Vec<ExtractionConfig>>,
}

impl SpyExtractor {
    pub fn new(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            calls: AtomicUsize::new(0),
            job_dirs: Mutex::new(Vec::new()),
            configs: Mutex::new(Vec::new()),
        })
    }

    pub fn producing(title: &str, bytes: &[u8]) -> Arc<Self> {
        Self::new(Behavior::Produce {
            title: title.to_string(),
            file_name: format!("{title}.mp4"),
            bytes: bytes.to_vec(),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Self::new(Behavior::Fail(message.to_string()))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn job_dirs(&self) -> Vec<PathBuf> {
        self.job_dirs.lock().unwrap().clone()
    }

    pub fn configs(&self) -> Vec<ExtractionConfig> {
        self.configs.lock().unwrap().clone()
    }
}

fn job_dir_of(config: &ExtractionConfig) -> PathBuf {
    config
        .output_template
        .parent()
        .map(Path::to_path_buf)
        .expect("output template lives in a job directory")
}

#[async_trait]
impl Extractor for SpyExtractor {
    async fn extract(
        &self,
        _request: &ValidatedRequest,
        config: &ExtractionConfig,
    ) -> Result<ExtractedMedia, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let job_dir = job_dir_of(config);
        assert!(job_dir.is_dir(), "job directory exists during extraction");
        self.job_dirs.lock().unwrap().push(job_dir.clone());
        self.configs.lock().unwrap().push(config.clone());

        match &self.behavior {
            Behavior::Produce {
                title,
                file_name,
                bytes,
            } => {
                let path = job_dir.join(file_name);
                tokio::fs::write(&path, bytes).await.unwrap();
                Ok(ExtractedMedia {
                    title: title.clone(),
                    file_path: path,
                })
            }
            Behavior::ReportOnly { title, file_name } => Ok(ExtractedMedia {
                title: title.clone(),
                file_path: job_dir.join(file_name),
            }),
            Behavior::Misreport {
                title,
                written,
                reported,
            } => {
                tokio::fs::write(job_dir.join(written), b"other")
                    .await
                    .unwrap();
                Ok(ExtractedMedia {
                    title: title.clone(),
                    file_path: job_dir.join(reported),
                })
            }
            Behavior::Fail(message) => {
                tokio::fs::write(job_dir.join("partial.mp4.part"), b"half")
                    .await
                    .unwrap();
                Err(ExtractionError::from_engine(message.clone()))
            }
        }
    }
}

/// Holds every extraction until [`GatedExtractor::release`] lets it through.
pub struct GatedExtractor {
    inner: Arc<SpyExtractor>,
    gate: Semaphore,
    entered: AtomicUsize,
}

impl GatedExtractor {
    pub fn new(inner: Arc<SpyExtractor>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            gate: Semaphore::new(0),
            entered: AtomicUsize::new(0),
        })
    }

    pub fn entered(&self) -> usize {
        self.entered.load(Ordering::SeqCst)
    }

    pub fn release(&self, count: usize) {
        self.gate.add_permits(count);
    }

    pub async fn wait_until_entered(&self, count: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.entered() < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("extractions entered in time");
    }
}

#[async_trait]
impl Extractor for GatedExtractor {
    async fn extract(
        &self,
        request: &ValidatedRequest,
        config: &ExtractionConfig,
    ) -> Result<ExtractedMedia, ExtractionError> {
        self.entered.fetch_add(1, Ordering::SeqCst);
        self.gate.acquire().await.unwrap().forget();
        self.inner.extract(request, config).await
    }
}

pub fn service(extractor: Arc<SpyExtractor>, transfer_dir: &Path) -> DownloadService {
    DownloadService::new(extractor, transfer_dir)
}

pub fn transfer_dir_is_empty(transfer_dir: &Path) -> bool {
    std::fs::read_dir(transfer_dir)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(true)
}
