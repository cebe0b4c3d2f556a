//! Platform URL validation.
//!
//! Every platform owns one case-insensitive pattern. A request only reaches the
//! extraction engine once its URL has been accepted here, which is why the
//! adapter takes a [`ValidatedRequest`] rather than a raw string.

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};
use tracing::debug;

use crate::{error::DownloadError, platform::Platform};

struct PlatformPatterns {
    youtube: Regex,
    instagram: Regex,
    tiktok: Regex,
    facebook: Regex,
}

impl PlatformPatterns {
    fn for_platform(&self, platform: Platform) -> &Regex {
        match platform {
            Platform::YouTube => &self.youtube,
            Platform::Instagram => &self.instagram,
            Platform::TikTok => &self.tiktok,
            Platform::Facebook => &self.facebook,
        }
    }
}

fn compile(pattern: &str) -> Regex {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .expect("platform pattern is valid")
}

static PATTERNS: LazyLock<PlatformPatterns> = LazyLock::new(|| PlatformPatterns {
    youtube: compile(r"^(https?://)?(www\.)?(youtube\.com|youtu\.be)/.+"),
    instagram: compile(r"^(https?://)?(www\.)?instagram\.com/(p|reel)/.+"),
    tiktok: compile(r"^(https?://)?(www\.)?tiktok\.com/@[^/]+/video/.+"),
    facebook: compile(r"^(https?://)?(www\.)?facebook\.com/.+/videos/.+"),
});

/// A URL that matched its platform's pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRequest {
    platform: Platform,
    url: String,
}

impl ValidatedRequest {
    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Checks `raw_url` against the pattern registered for `platform`.
///
/// Surrounding whitespace is ignored. Blank input is reported as
/// [`DownloadError::EmptyInput`] no matter which platform was selected.
#[tracing::instrument(skip(raw_url), fields(input_len = raw_url.len()))]
pub fn validate(platform: Platform, raw_url: &str) -> Result<ValidatedRequest, DownloadError> {
    let url = raw_url.trim();
    if url.is_empty() {
        return Err(DownloadError::EmptyInput);
    }

    if !PATTERNS.for_platform(platform).is_match(url) {
        debug!(%platform, url, "URL rejected by platform pattern");
        return Err(DownloadError::InvalidUrlForPlatform { platform });
    }

    Ok(ValidatedRequest {
        platform,
        url: url.to_string(),
    })
}
