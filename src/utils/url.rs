use reqwest::Url;

/// Host of a story link for display, without a leading `www.`.
///
/// Links without a scheme are read as `https://`. Returns `None` for
/// anything that does not parse to a host.
pub fn extract_domain(link: &str) -> Option<String> {
    let link = link.trim();
    if link.is_empty() {
        return None;
    }

    let parsed = match link.contains("://") {
        true => Url::parse(link),
        false => Url::parse(&format!("https://{link}")),
    }
    .ok()?;

    let host = parsed.host_str()?;
    let host = host.strip_prefix("www.").unwrap_or(host);
    (!host.is_empty()).then(|| host.to_string())
}

/// Whether a story link can be handed to the system browser.
pub fn is_openable(link: &str) -> bool {
    Url::parse(link.trim()).is_ok_and(|u| matches!(u.scheme(), "http" | "https"))
}
