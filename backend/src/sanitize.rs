const FORBIDDEN: [char; 9] = ['\\', '/', '*', '?', ':', '"', '<', '>', '|'];

const FALLBACK_FILENAME: &str = "download.mp4";

/// Drops characters most filesystems refuse in a name. Length, extension and
/// everything else are left untouched.
pub fn sanitize_filename(value: &str) -> String {
    value.chars().filter(|ch| !FORBIDDEN.contains(ch)).collect()
}

/// ASCII-only variant for header values that cannot carry UTF-8. Anything
/// outside a small safe set becomes `_`.
pub fn sanitize_ascii_filename(value: &str) -> String {
    let replaced: String = value
        .chars()
        .map(|ch| if is_header_safe(ch) { ch } else { '_' })
        .collect();

    match replaced.trim() {
        "" => FALLBACK_FILENAME.to_string(),
        name => name.to_string(),
    }
}

fn is_header_safe(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || " ()-._".contains(ch)
}

/// `Content-Disposition: attachment` carrying both the ASCII name and the
/// percent-encoded UTF-8 name (RFC 5987 `filename*`).
pub fn build_content_disposition(filename: &str) -> String {
    let ascii = sanitize_ascii_filename(filename);
    let encoded = urlencoding::encode(filename);
    format!("attachment; filename=\"{ascii}\"; filename*=UTF-8''{encoded}")
}

/// Suggested save name for a title, keeping the produced extension.
pub fn filename_for_title(title: &str, extension: &str) -> String {
    let cleaned = sanitize_filename(title);
    let base = match cleaned.trim() {
        "" => "download",
        value => value,
    };
    sanitize_filename(&format!("{base}.{extension}"))
}
