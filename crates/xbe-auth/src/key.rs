//! Lookup keys derived from API base URLs

/// Canonical form of an API base URL, used as the lookup key in every store.
///
/// Surrounding whitespace and one trailing `/` are removed, so
/// `" https://app.x-b-e.com/ "` and `"https://app.x-b-e.com"` share a key.
/// Empty input yields an empty key.
pub fn normalize_base_url(url: &str) -> String {
    let trimmed = url.trim();
    trimmed.strip_suffix('/').unwrap_or(trimmed).to_string()
}
