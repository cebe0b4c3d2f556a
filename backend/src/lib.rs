pub mod config;
pub mod error;
pub mod extraction;
pub mod http;
pub mod platform;
pub mod relay;
pub mod sanitize;
pub mod service;
pub mod user_agent;
pub mod validator;
pub mod workspace;

pub use error::{DownloadError, ExtractionError, ExtractionFailureKind};
pub use extraction::{ExtractedMedia, ExtractionConfig, Extractor, YtDlpExtractor};
pub use platform::Platform;
pub use relay::DownloadedArtifact;
pub use service::DownloadService;
pub use validator::{ValidatedRequest, validate};
