use crate::{UrlError, UrlResult};
use url::Url;

/// Extracts the domain from a URL
///
/// This function retrieves the host portion of a URL, converts it to lowercase
/// and strips a leading `www.`. If the URL has no host, it returns None.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use spider_scheduler::url::extract_domain;
///
/// let url = Url::parse("https://WWW.Example.com/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| {
        let host = h.to_lowercase();
        match host.strip_prefix("www.") {
            Some(rest) if !rest.is_empty() => rest.to_string(),
            _ => host,
        }
    })
}

/// Parses a URL string and returns its domain identity
///
/// Only `http` and `https` URLs carry an identity.
///
/// # Examples
///
/// ```
/// use spider_scheduler::url::domain_key;
///
/// assert_eq!(domain_key("https://example.com/a?b=c").unwrap(), "example.com");
/// assert!(domain_key("mailto:someone@example.com").is_err());
/// ```
pub fn domain_key(url_str: &str) -> UrlResult<String> {
    let url = Url::parse(url_str).map_err(|e| UrlError::Parse(format!("{url_str}: {e}")))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    extract_domain(&url).ok_or(UrlError::MissingDomain)
}
