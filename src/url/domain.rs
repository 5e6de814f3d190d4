use url::Url;

/// Extracts the lowercase host from a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use tvbox_scout::url::extract_host;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_host(&url), Some("example.com".to_string()));
/// ```
pub fn extract_host(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Checks whether a host appears on the exclusion list
///
/// The comparison is exact and case-insensitive; subdomains of an excluded
/// host are not excluded.
pub fn is_excluded_host<S: AsRef<str>>(host: &str, excluded: &[S]) -> bool {
    excluded
        .iter()
        .any(|entry| entry.as_ref().eq_ignore_ascii_case(host))
}
