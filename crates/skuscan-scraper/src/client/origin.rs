//! URL origin, domain, and relative-link helpers.

/// Extracts the scheme+host origin from a site URL.
///
/// Given `"https://legear.com.au/collections/tents"`, returns
/// `"https://legear.com.au"`. Feed and search URLs are always built from the
/// site root, regardless of whether the configured origin carries a path.
#[must_use]
pub fn extract_store_origin(site_url: &str) -> String {
    reqwest::Url::parse(site_url.trim()).map_or_else(
        |e| {
            tracing::warn!(
                site_url,
                error = %e,
                "could not parse site URL; falling back to string split for origin extraction"
            );
            // fallback: take "https://host" by splitting on '/' and taking first 3 parts
            site_url
                .trim()
                .trim_end_matches('/')
                .splitn(4, '/')
                .take(3)
                .collect::<Vec<_>>()
                .join("/")
        },
        |u| u.origin().ascii_serialization(),
    )
}

/// Extracts the hostname from a URL for use in error messages.
///
/// Falls back to the full URL string if parsing fails.
pub(crate) fn extract_domain(site_url: &str) -> String {
    reqwest::Url::parse(site_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_owned))
        .unwrap_or_else(|| site_url.to_owned())
}

/// Resolves `href` against `base`, accepting absolute, protocol-relative,
/// and root- or path-relative forms. Returns `None` for non-http(s) links.
#[must_use]
pub fn absolutize_url(base: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    let base = reqwest::Url::parse(base).ok()?;
    let joined = base.join(href).ok()?;
    matches!(joined.scheme(), "http" | "https").then(|| joined.to_string())
}
