use std::{collections::HashSet, sync::Arc};

use axum::{
    Form, Json, Router,
    body::Body,
    extract::{
        State,
        rejection::{FormRejection, JsonRejection},
    },
    http::{
        HeaderMap, HeaderName, HeaderValue, Method,
        header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE},
    },
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    error::ApiError,
    platform::Platform,
    relay::DownloadedArtifact,
    sanitize::{build_content_disposition, sanitize_ascii_filename},
    service::DownloadService,
    validator::validate,
};

const DOWNLOAD_FILENAME_HEADER: &str = "x-download-filename";
const UNREADABLE_FORM: &str = "Choose one of the listed platforms and paste a video URL.";
const DEV_ORIGINS: [&str; 2] = ["http://127.0.0.1:8787", "http://localhost:8787"];

#[derive(Clone)]
pub struct AppState {
    pub service: DownloadService,
}

#[derive(Debug, Deserialize)]
pub struct DownloadForm {
    pub platform: Platform,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Serialize)]
struct PlatformInfo {
    id: &'static str,
    label: &'static str,
    example: &'static str,
}

#[derive(Debug, Serialize)]
struct ValidateResponse {
    valid: bool,
    platform: Platform,
    url: String,
}

pub fn router(service: DownloadService) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/download", post(form_download))
        .route("/api/health", get(health))
        .route("/api/platforms", get(platforms))
        .route("/api/validate", post(validate_url))
        .route("/api/download", post(api_download))
        .with_state(AppState { service })
        .layer(TraceLayer::new_for_http())
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

async fn platforms() -> Json<Vec<PlatformInfo>> {
    Json(
        Platform::ALL
            .into_iter()
            .map(|platform| PlatformInfo {
                id: platform.id(),
                label: platform.label(),
                example: platform.example_url(),
            })
            .collect(),
    )
}

async fn validate_url(
    payload: Result<Json<DownloadForm>, JsonRejection>,
) -> Result<Json<ValidateResponse>, ApiError> {
    let Json(payload) = payload?;
    let request = validate(payload.platform, &payload.url)?;
    Ok(Json(ValidateResponse {
        valid: true,
        platform: request.platform(),
        url: request.url().to_string(),
    }))
}

async fn api_download(
    State(state): State<AppState>,
    payload: Result<Json<DownloadForm>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload?;
    let artifact = state
        .service
        .download(payload.platform, &payload.url)
        .await?;
    attachment_response(artifact)
}

async fn index() -> Html<String> {
    Html(render_page(Platform::YouTube, "", None))
}

async fn form_download(
    State(state): State<AppState>,
    form: Result<Form<DownloadForm>, FormRejection>,
) -> Response {
    let form = match form {
        Ok(Form(form)) => form,
        Err(rejection) => {
            debug!("form rejected: {}", rejection.body_text());
            return (
                rejection.status(),
                Html(render_page(Platform::YouTube, "", Some(UNREADABLE_FORM))),
            )
                .into_response();
        }
    };

    let result = state.service.download(form.platform, &form.url).await;

    match result.map_err(ApiError::from).and_then(attachment_response) {
        Ok(response) => response,
        Err(error) => (
            error.status,
            Html(render_page(form.platform, &form.url, Some(&error.message))),
        )
            .into_response(),
    }
}

fn attachment_response(artifact: DownloadedArtifact) -> Result<Response, ApiError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(artifact.content_type));
    headers.insert(
        CONTENT_LENGTH,
        HeaderValue::from_str(&artifact.bytes.len().to_string())
            .map_err(|_| ApiError::internal("Could not build the download size header."))?,
    );
    headers.insert(
        CONTENT_DISPOSITION,
        HeaderValue::from_str(&build_content_disposition(&artifact.filename))
            .map_err(|_| ApiError::internal("Could not build the download header."))?,
    );
    headers.insert(
        HeaderName::from_static(DOWNLOAD_FILENAME_HEADER),
        HeaderValue::from_str(&sanitize_ascii_filename(&artifact.filename))
            .map_err(|_| ApiError::internal("Could not build the file name header."))?,
    );

    Ok((headers, Body::from(artifact.bytes)).into_response())
}

fn render_page(selected: Platform, url: &str, error: Option<&str>) -> String {
    let options: String = Platform::ALL
        .into_iter()
        .map(|platform| {
            format!(
                "<option value=\"{}\"{}>{}</option>",
                platform.id(),
                if platform == selected { " selected" } else { "" },
                platform.label()
            )
        })
        .collect();

    let notice = error
        .map(|message| format!("<p class=\"error\">{}</p>", escape_html(message)))
        .unwrap_or_default();

    format!(
        r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Video Downloader</title>
<style>
body {{ font-family: system-ui, sans-serif; max-width: 40rem; margin: 3rem auto; padding: 0 1rem; color: #222; }}
form {{ display: grid; gap: 0.75rem; }}
input, select, button {{ font-size: 1rem; padding: 0.5rem; }}
button {{ background: #e62117; color: #fff; border: 0; border-radius: 4px; cursor: pointer; }}
.error {{ color: #b00020; background: #fdecea; padding: 0.75rem; border-radius: 4px; }}
footer {{ margin-top: 3rem; text-align: center; color: #888; }}
</style>
</head>
<body>
<h1>Video Downloader</h1>
<p>Pick the platform, paste a video URL and download it. On mobile, long press the saved link and choose Download Link.</p>
{notice}
<form method="post" action="/download">
<label>Platform <select name="platform">{options}</select></label>
<label>Video URL <input type="text" name="url" value="{url}" placeholder="{placeholder}" autofocus></label>
<button type="submit">Download</button>
</form>
<footer>Downloads are fetched on demand and not kept on the server.</footer>
</body>
</html>
"#,
        url = escape_html(url),
        placeholder = selected.example_url(),
    )
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for character in value.chars() {
        match character {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(character),
        }
    }
    escaped
}

/// Normalized origins the browser front end may call from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct OriginAllowList(HashSet<String>);

impl OriginAllowList {
    fn parse<S: AsRef<str>>(origins: &[S]) -> anyhow::Result<Self> {
        let mut allowed = HashSet::with_capacity(origins.len());
        for origin in origins {
            let origin = origin.as_ref();
            let Some(normalized) = normalize_origin(origin) else {
                anyhow::bail!("ALLOWED_ORIGINS entry {origin:?} is not a bare http(s) origin");
            };
            allowed.insert(normalized);
        }
        Ok(Self(allowed))
    }

    fn allows(&self, header: &HeaderValue) -> bool {
        header
            .to_str()
            .ok()
            .and_then(normalize_origin)
            .is_some_and(|origin| self.0.contains(&origin))
    }
}

pub fn build_cors_layer(configured: &[String]) -> anyhow::Result<CorsLayer> {
    let allow_list = if configured.is_empty() {
        warn!(origins = ?DEV_ORIGINS, "ALLOWED_ORIGINS is empty, allowing local origins only");
        OriginAllowList::parse(&DEV_ORIGINS)?
    } else {
        OriginAllowList::parse(configured)?
    };
    info!(count = allow_list.0.len(), origins = ?allow_list.0, "CORS origins loaded");

    let allow_list = Arc::new(allow_list);
    let allow_origin = AllowOrigin::predicate(move |origin: &HeaderValue, _| {
        let allowed = allow_list.allows(origin);
        debug!(?origin, allowed, "CORS origin check");
        allowed
    });

    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
        .expose_headers([
            CONTENT_DISPOSITION,
            HeaderName::from_static(DOWNLOAD_FILENAME_HEADER),
        ]))
}

/// `scheme://host[:port]` for a bare http(s) origin, default port omitted.
fn normalize_origin(value: &str) -> Option<String> {
    let parsed = Url::parse(value).ok()?;
    let bare = parsed.path() == "/" && parsed.query().is_none() && parsed.fragment().is_none();
    if !bare || !matches!(parsed.scheme(), "http" | "https") || parsed.host().is_none() {
        return None;
    }
    Some(parsed.origin().ascii_serialization())
}
