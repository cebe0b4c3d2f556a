use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    process::Stdio,
};

use async_trait::async_trait;
use rand::Rng;
use serde::Deserialize;
use tokio::{
    process::Command,
    time::{Duration, timeout},
};
use tracing::{debug, info, warn};

use crate::{
    error::{ExtractionError, ExtractionFailureKind},
    platform::Platform,
    user_agent::{self, DEFAULT_ACCEPT, DEFAULT_ACCEPT_LANGUAGE},
    validator::ValidatedRequest,
};

/// Best single-file MP4, else whatever single file is best. Never asks for a merge.
pub const FORMAT_SELECTOR: &str = "best[ext=mp4]/best";
pub const RETRY_BUDGET: u32 = 3;
pub const OUTPUT_TEMPLATE: &str = "%(title)s.%(ext)s";

const PRINT_TEMPLATE: &str = "after_move:%(.{title,filepath})j";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHeaders {
    pub user_agent: String,
    pub accept: String,
    pub accept_language: String,
    pub referer: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlatformFlags {
    pub force_generic_extractor: bool,
    pub referer_override: Option<String>,
}

impl PlatformFlags {
    /// Instagram and Facebook go through the generic extractor. TikTok wants the
    /// video page itself as referer.
    pub fn for_request(request: &ValidatedRequest) -> Self {
        match request.platform() {
            Platform::YouTube => Self::default(),
            Platform::Instagram | Platform::Facebook => Self {
                force_generic_extractor: true,
                referer_override: None,
            },
            Platform::TikTok => Self {
                force_generic_extractor: false,
                referer_override: Some(request.url().to_string()),
            },
        }
    }
}

/// Options handed to the engine for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionConfig {
    pub format: String,
    pub output_template: PathBuf,
    pub quiet: bool,
    pub show_progress: bool,
    pub retry_budget: u32,
    pub headers: RequestHeaders,
    pub platform_flags: PlatformFlags,
}

impl ExtractionConfig {
    pub fn for_request<R: Rng + ?Sized>(
        request: &ValidatedRequest,
        job_dir: &Path,
        rng: &mut R,
    ) -> Self {
        let platform = request.platform();

        Self {
            format: FORMAT_SELECTOR.to_string(),
            output_template: job_dir.join(OUTPUT_TEMPLATE),
            quiet: true,
            show_progress: false,
            retry_budget: RETRY_BUDGET,
            headers: RequestHeaders {
                user_agent: user_agent::sample(platform, rng).to_string(),
                accept: DEFAULT_ACCEPT.to_string(),
                accept_language: DEFAULT_ACCEPT_LANGUAGE.to_string(),
                referer: platform.home_url().to_string(),
            },
            platform_flags: PlatformFlags::for_request(request),
        }
    }

    pub fn effective_referer(&self) -> &str {
        self.platform_flags
            .referer_override
            .as_deref()
            .unwrap_or(&self.headers.referer)
    }

    /// Renders the config as yt-dlp command-line flags, `url` last.
    pub fn yt_dlp_args(&self, url: &str) -> Vec<String> {
        let mut args = vec![
            "--no-playlist".to_string(),
            "-f".to_string(),
            self.format.clone(),
            "-o".to_string(),
            self.output_template.to_string_lossy().into_owned(),
            "--retries".to_string(),
            self.retry_budget.to_string(),
            "--user-agent".to_string(),
            self.headers.user_agent.clone(),
            "--referer".to_string(),
            self.effective_referer().to_string(),
            "--add-header".to_string(),
            format!("Accept:{}", self.headers.accept),
            "--add-header".to_string(),
            format!("Accept-Language:{}", self.headers.accept_language),
            "--print".to_string(),
            PRINT_TEMPLATE.to_string(),
        ];

        if self.quiet {
            args.push("--quiet".to_string());
            args.push("--no-warnings".to_string());
        }
        if !self.show_progress {
            args.push("--no-progress".to_string());
        }
        if self.platform_flags.force_generic_extractor {
            args.push("--force-generic-extractor".to_string());
        }

        args.push(url.to_string());
        args
    }
}

/// What the engine reports once a file has landed on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedMedia {
    pub title: String,
    pub file_path: PathBuf,
}

#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(
        &self,
        request: &ValidatedRequest,
        config: &ExtractionConfig,
    ) -> Result<ExtractedMedia, ExtractionError>;
}

#[derive(Debug, Clone)]
pub struct YtDlpExtractor {
    binary: PathBuf,
    timeout: Option<Duration>,
}

impl YtDlpExtractor {
    pub fn new(binary: impl Into<PathBuf>, timeout: Option<Duration>) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    /// Logs the engine version, or a warning when it cannot be started.
    pub async fn probe(&self) -> Option<String> {
        let output = Command::new(&self.binary)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .await;

        match output {
            Ok(output) if output.status.success() => {
                let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
                info!("yt-dlp {version} available at {:?}", self.binary);
                Some(version)
            }
            Ok(output) => {
                warn!(
                    "yt-dlp --version exited with {}: {}",
                    output.status,
                    last_error_line(&output.stderr)
                );
                None
            }
            Err(error) => {
                warn!("Could not start {:?}: {error}", self.binary);
                None
            }
        }
    }
}

#[async_trait]
impl Extractor for YtDlpExtractor {
    async fn extract(
        &self,
        request: &ValidatedRequest,
        config: &ExtractionConfig,
    ) -> Result<ExtractedMedia, ExtractionError> {
        let args = config.yt_dlp_args(request.url());
        debug!(platform = %request.platform(), ?args, "running yt-dlp");

        let command_future = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let result = match self.timeout {
            Some(limit) => timeout(limit, command_future).await.map_err(|_| {
                ExtractionError::new(
                    ExtractionFailureKind::Timeout,
                    format!("yt-dlp did not finish within {} seconds", limit.as_secs()),
                )
            })?,
            None => command_future.await,
        };

        let output = result.map_err(|error| {
            if error.kind() == ErrorKind::NotFound {
                ExtractionError::new(
                    ExtractionFailureKind::EngineMissing,
                    format!("yt-dlp is not installed ({:?} not found)", self.binary),
                )
            } else {
                ExtractionError::new(
                    ExtractionFailureKind::Other,
                    format!("Could not run yt-dlp: {error}"),
                )
            }
        })?;

        if !output.status.success() {
            return Err(ExtractionError::from_engine(last_error_line(&output.stderr)));
        }

        parse_printed_media(&output.stdout).ok_or_else(|| {
            ExtractionError::new(
                ExtractionFailureKind::Incompatible,
                "yt-dlp finished without reporting a downloaded file",
            )
        })
    }
}

#[derive(Debug, Deserialize)]
struct PrintedMedia {
    title: Option<String>,
    filepath: Option<String>,
}

/// Reads the JSON line emitted by the `--print` template. The last parsable line
/// wins.
pub fn parse_printed_media(stdout: &[u8]) -> Option<ExtractedMedia> {
    String::from_utf8_lossy(stdout)
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with('{'))
        .filter_map(|line| serde_json::from_str::<PrintedMedia>(line).ok())
        .filter_map(|printed| {
            let file_path = printed.filepath.filter(|path| !path.trim().is_empty())?;
            Some(ExtractedMedia {
                title: printed.title.unwrap_or_default(),
                file_path: PathBuf::from(file_path),
            })
        })
        .next_back()
}

/// The engine's own wording for the failure: the last `ERROR:` line, else the last
/// non-empty line.
pub fn last_error_line(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    lines
        .iter()
        .rev()
        .find(|line| line.starts_with("ERROR:"))
        .or_else(|| lines.last())
        .map(|line| (*line).to_string())
        .unwrap_or_else(|| "yt-dlp could not complete the download".to_string())
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::validator::validate;

    fn config_for(platform: Platform, url: &str) -> (ValidatedRequest, ExtractionConfig) {
        let request = validate(platform, url).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let config = ExtractionConfig::for_request(&request, Path::new("/tmp/job"), &mut rng);
        (request, config)
    }

    fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
        args.iter()
            .position(|arg| arg == flag)
            .and_then(|index| args.get(index + 1))
            .map(String::as_str)
    }

    #[test]
    fn config_defaults() {
        let (_, config) = config_for(Platform::YouTube, "https://youtu.be/abc");
        assert_eq!(config.format, FORMAT_SELECTOR);
        assert_eq!(config.retry_budget, 3);
        assert!(config.quiet);
        assert!(!config.show_progress);
        assert_eq!(
            config.output_template,
            PathBuf::from("/tmp/job/%(title)s.%(ext)s")
        );
        assert!(user_agent::pool(Platform::YouTube).contains(&config.headers.user_agent.as_str()));
        assert_eq!(config.effective_referer(), "https://www.youtube.com/");
    }

    #[test]
    fn args_carry_every_option() {
        let (request, config) = config_for(Platform::YouTube, "https://youtu.be/abc");
        let args = config.yt_dlp_args(request.url());

        assert_eq!(flag_value(&args, "-f"), Some("best[ext=mp4]/best"));
        assert_eq!(flag_value(&args, "--retries"), Some("3"));
        assert_eq!(
            flag_value(&args, "--user-agent"),
            Some(config.headers.user_agent.as_str())
        );
        assert_eq!(flag_value(&args, "--print"), Some(PRINT_TEMPLATE));
        assert!(args.contains(&"--quiet".to_string()));
        assert!(args.contains(&"--no-progress".to_string()));
        assert!(args.contains(&format!("Accept-Language:{DEFAULT_ACCEPT_LANGUAGE}")));
        assert!(!args.contains(&"--force-generic-extractor".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("https://youtu.be/abc"));
    }

    #[test]
    fn generic_extractor_only_for_instagram_and_facebook() {
        let cases = [
            (Platform::YouTube, "https://www.youtube.com/watch?v=abc123", false),
            (Platform::Instagram, "https://instagram.com/p/xyz", true),
            (Platform::TikTok, "https://www.tiktok.com/@user/video/123", false),
            (Platform::Facebook, "https://facebook.com/page/videos/123", true),
        ];

        for (platform, url, expected) in cases {
            let (request, config) = config_for(platform, url);
            let args = config.yt_dlp_args(request.url());
            assert_eq!(
                args.contains(&"--force-generic-extractor".to_string()),
                expected,
                "{platform}"
            );
        }
    }

    #[test]
    fn tiktok_uses_the_video_page_as_referer() {
        let url = "https://www.tiktok.com/@user/video/123";
        let (request, config) = config_for(Platform::TikTok, url);
        let args = config.yt_dlp_args(request.url());
        assert_eq!(flag_value(&args, "--referer"), Some(url));
    }

    #[test]
    fn parses_printed_media_line() {
        let stdout = b"\n{\"title\": \"Clip: one\", \"filepath\": \"/tmp/job/Clip one.mp4\"}\n";
        let media = parse_printed_media(stdout).unwrap();
        assert_eq!(media.title, "Clip: one");
        assert_eq!(media.file_path, PathBuf::from("/tmp/job/Clip one.mp4"));

        assert!(parse_printed_media(b"").is_none());
        assert!(parse_printed_media(b"{\"title\": \"x\", \"filepath\": null}").is_none());
    }

    #[test]
    fn prefers_error_lines_from_stderr() {
        let stderr = b"WARNING: something\nERROR: [youtube] abc: Video unavailable\n\n";
        assert_eq!(
            last_error_line(stderr),
            "ERROR: [youtube] abc: Video unavailable"
        );
        assert_eq!(last_error_line(b"just noise\n"), "just noise");
        assert_eq!(
            last_error_line(b""),
            "yt-dlp could not complete the download"
        );
    }

    #[tokio::test]
    async fn missing_binary_is_reported_as_engine_missing() {
        let extractor = YtDlpExtractor::new("/nonexistent/yt-dlp-binary", None);
        let (request, config) = config_for(Platform::YouTube, "https://youtu.be/abc");
        let error = extractor.extract(&request, &config).await.unwrap_err();
        assert_eq!(error.kind, ExtractionFailureKind::EngineMissing);
    }

    #[cfg(unix)]
    fn stub_engine(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let script = dir.join("yt-dlp");
        std::fs::write(&script, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        script
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn hung_engine_is_killed_at_the_deadline() {
        let dir = tempfile::tempdir().unwrap();
        let engine = stub_engine(dir.path(), "exec sleep 30");
        let extractor = YtDlpExtractor::new(engine, Some(Duration::from_secs(1)));
        let (request, config) = config_for(Platform::YouTube, "https://youtu.be/abc");

        let started = std::time::Instant::now();
        let error = extractor.extract(&request, &config).await.unwrap_err();

        assert_eq!(error.kind, ExtractionFailureKind::Timeout);
        assert_eq!(error.message, "yt-dlp did not finish within 1 seconds");
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_engine_surfaces_its_error_line() {
        let dir = tempfile::tempdir().unwrap();
        let engine = stub_engine(
            dir.path(),
            "echo 'WARNING: retrying' >&2\necho 'ERROR: [youtube] abc: Video unavailable' >&2\nexit 1",
        );
        let extractor = YtDlpExtractor::new(engine, None);
        let (request, config) = config_for(Platform::YouTube, "https://youtu.be/abc");

        let error = extractor.extract(&request, &config).await.unwrap_err();

        assert_eq!(error.kind, ExtractionFailureKind::Unavailable);
        assert_eq!(error.message, "ERROR: [youtube] abc: Video unavailable");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn successful_engine_reports_the_written_file() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("Clip one.mp4");
        let received = dir.path().join("args.txt");
        let engine = stub_engine(
            dir.path(),
            &format!(
                "printf '%s\\n' \"$@\" > '{args}'\nprintf 'mp4' > '{file}'\necho 'progress noise'\necho '{{\"title\": \"Clip: one\", \"filepath\": \"{file}\"}}'",
                args = received.display(),
                file = output.display(),
            ),
        );
        let extractor = YtDlpExtractor::new(engine, Some(Duration::from_secs(30)));
        let (request, config) = config_for(Platform::Instagram, "https://instagram.com/p/xyz");

        let media = extractor.extract(&request, &config).await.unwrap();

        assert_eq!(media.title, "Clip: one");
        assert_eq!(media.file_path, output);
        assert!(output.is_file());

        let args = std::fs::read_to_string(&received).unwrap();
        let args: Vec<&str> = args.lines().collect();
        assert_eq!(args.last(), Some(&"https://instagram.com/p/xyz"));
        assert!(args.contains(&"--force-generic-extractor"));
    }
}
