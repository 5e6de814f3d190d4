use crate::{UrlError, UrlResult};
use url::Url;

/// Rewrites a browsable blob URL into its raw-content URL
///
/// `https://github.com/<owner>/<repo>/blob/<ref>/<path>` becomes
/// `<raw_base>/<owner>/<repo>/<ref>/<path>`. Path segments are carried over
/// in their percent-encoded form.
///
/// # Examples
///
/// ```
/// use tvbox_scout::url::raw_content_url;
///
/// let raw = raw_content_url(
///     "https://github.com/user/repo/blob/main/box/tv.json",
///     "https://raw.githubusercontent.com",
/// )
/// .unwrap();
/// assert_eq!(raw, "https://raw.githubusercontent.com/user/repo/main/box/tv.json");
/// ```
pub fn raw_content_url(html_url: &str, raw_base: &str) -> UrlResult<String> {
    let url = Url::parse(html_url).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }
    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.collect())
        .unwrap_or_default();

    // owner / repo / "blob" / ref / path...
    if segments.len() < 5 || segments[2] != "blob" || segments.iter().any(|s| s.is_empty()) {
        return Err(UrlError::NotBlob(html_url.to_string()));
    }

    let mut kept = Vec::with_capacity(segments.len() - 1);
    kept.extend_from_slice(&segments[..2]);
    kept.extend_from_slice(&segments[3..]);

    Ok(format!("{}/{}", raw_base.trim_end_matches('/'), kept.join("/")))
}
