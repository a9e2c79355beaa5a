use url::Url;

/// Schemes of pages that belong to the browser itself rather than to a website.
const INTERNAL_SCHEMES: [&str; 8] = [
    "chrome",
    "chrome-extension",
    "edge",
    "about",
    "moz-extension",
    "brave",
    "devtools",
    "view-source",
];

/// Hostname that time on `url` is attributed to. `None` for browser-internal pages, URLs
/// without a host and anything that fails to parse.
///
/// - https://example.com/path?q=1 → example.com
/// - chrome://settings → None
pub fn extract_domain(url: &str) -> Option<String> {
    let url = Url::parse(url).ok()?;
    if INTERNAL_SCHEMES.contains(&url.scheme()) {
        return None;
    }
    url.host_str()
        .filter(|host| !host.is_empty())
        .map(str::to_owned)
}
