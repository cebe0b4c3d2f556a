use std::{io, path::PathBuf};

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::platform::Platform;

/// Coarse category of an engine failure, inferred from its message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionFailureKind {
    Network,
    Unavailable,
    Unsupported,
    Incompatible,
    Timeout,
    EngineMissing,
    Other,
}

impl ExtractionFailureKind {
    pub fn classify(message: &str) -> Self {
        let lower = message.to_ascii_lowercase();

        if lower.contains("unsupported url") || lower.contains("no suitable extractor") {
            Self::Unsupported
        } else if lower.contains("video unavailable")
            || lower.contains("private video")
            || lower.contains("not available in your country")
            || lower.contains("geo restrict")
            || lower.contains("login required")
            || lower.contains("sign in to confirm")
            || lower.contains("has been removed")
        {
            Self::Unavailable
        } else if lower.contains("unable to extract")
            || lower.contains("failed to extract")
            || lower.contains("failed to parse json")
            || lower.contains("nonetype")
        {
            Self::Incompatible
        } else if lower.contains("unable to download webpage")
            || lower.contains("connection")
            || lower.contains("timed out")
            || lower.contains("name or service not known")
            || lower.contains("temporary failure in name resolution")
            || lower.contains("http error 5")
        {
            Self::Network
        } else {
            Self::Other
        }
    }
}

/// Failure raised by an [`Extractor`](crate::extraction::Extractor).
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ExtractionError {
    pub kind: ExtractionFailureKind,
    pub message: String,
}

impl ExtractionError {
    /// Wraps an engine message verbatim, classifying it on the way.
    pub fn from_engine(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            kind: ExtractionFailureKind::classify(&message),
            message,
        }
    }

    pub fn new(kind: ExtractionFailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Please enter a video URL.")]
    EmptyInput,

    #[error("That does not look like a valid {platform} video URL.")]
    InvalidUrlForPlatform { platform: Platform },

    #[error("Download failed: {}", .0.message)]
    ExtractionFailure(#[from] ExtractionError),

    #[error("File not found after download.")]
    ArtifactMissing { path: PathBuf },

    #[error("The file is {size} bytes, above the {limit} byte limit.")]
    ArtifactTooLarge { size: u64, limit: u64 },

    #[error("Could not prepare temporary storage: {source}")]
    Workspace {
        #[source]
        source: io::Error,
    },
}

impl DownloadError {
    pub fn code(&self) -> &'static str {
        match self {
            DownloadError::EmptyInput => "EMPTY_INPUT",
            DownloadError::InvalidUrlForPlatform { .. } => "INVALID_URL_FOR_PLATFORM",
            DownloadError::ExtractionFailure(_) => "EXTRACTION_FAILED",
            DownloadError::ArtifactMissing { .. } => "ARTIFACT_MISSING",
            DownloadError::ArtifactTooLarge { .. } => "ARTIFACT_TOO_LARGE",
            DownloadError::Workspace { .. } => "WORKSPACE_UNAVAILABLE",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            DownloadError::EmptyInput | DownloadError::InvalidUrlForPlatform { .. } => {
                StatusCode::BAD_REQUEST
            }
            DownloadError::ExtractionFailure(error) => match error.kind {
                ExtractionFailureKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
                ExtractionFailureKind::EngineMissing => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::BAD_GATEWAY,
            },
            DownloadError::ArtifactTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            DownloadError::ArtifactMissing { .. } | DownloadError::Workspace { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<ExtractionFailureKind>,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub code: &'static str,
    kind: Option<ExtractionFailureKind>,
}

impl ApiError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
            code: "INTERNAL",
            kind: None,
        }
    }
}

impl From<DownloadError> for ApiError {
    fn from(error: DownloadError) -> Self {
        let kind = match &error {
            DownloadError::ExtractionFailure(inner) => Some(inner.kind),
            _ => None,
        };

        Self {
            status: error.status(),
            message: error.to_string(),
            code: error.code(),
            kind,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status: rejection.status(),
            message: format!(
                "Send a JSON body like {{\"platform\": \"youtube\", \"url\": \"...\"}}: {}",
                rejection.body_text()
            ),
            code: "INVALID_REQUEST",
            kind: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
            code: self.code,
            kind: self.kind,
        });

        (self.status, body).into_response()
    }
}
