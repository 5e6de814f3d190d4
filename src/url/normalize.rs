/// Strips the first matching mirror prefix from a URL
///
/// Returns the remainder when a prefix matched, or `None` when the URL is
/// not proxied.
pub fn strip_proxy_prefix<'a, S: AsRef<str>>(url: &'a str, prefixes: &[S]) -> Option<&'a str> {
    prefixes
        .iter()
        .find_map(|prefix| url.strip_prefix(prefix.as_ref()))
}

/// Normalizes a candidate URL before it is deduplicated or probed
///
/// # Normalization Steps
///
/// 1. Trim surrounding whitespace
/// 2. Strip a known mirror/proxy prefix, if any
/// 3. Re-qualify the remainder as an absolute `https://` URL when the prefix
///    swallowed the scheme
///
/// # Examples
///
/// ```
/// use tvbox_scout::url::normalize_candidate;
///
/// let prefixes = ["https://ghproxy.com/"];
/// let url = normalize_candidate("https://ghproxy.com/https://raw.example.com/x.m3u8", &prefixes);
/// assert_eq!(url, "https://raw.example.com/x.m3u8");
/// ```
pub fn normalize_candidate<S: AsRef<str>>(url: &str, prefixes: &[S]) -> String {
    let trimmed = url.trim();

    match strip_proxy_prefix(trimmed, prefixes) {
        Some(rest) if has_http_scheme(rest) => rest.to_string(),
        Some(rest) => format!("https://{}", rest),
        None => trimmed.to_string(),
    }
}

fn has_http_scheme(url: &str) -> bool {
    let lower = url.get(..8).unwrap_or(url).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}
