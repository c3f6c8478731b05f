use crate::error::{BrowserError, Result};
use std::time::Duration;
use url::Url;

/// Normalize an incomplete URL by adding missing protocol and handling common patterns
pub fn normalize_url(url: &str) -> String {
    let trimmed = url.trim();

    if trimmed.starts_with("http://")
        || trimmed.starts_with("https://")
        || trimmed.starts_with("file://")
        || trimmed.starts_with("data:")
        || trimmed.starts_with("about:")
        || trimmed.starts_with("chrome://")
    {
        return trimmed.to_string();
    }

    // localhost special case - use http by default
    if trimmed.starts_with("localhost") || trimmed.starts_with("127.0.0.1") {
        return format!("http://{}", trimmed);
    }

    format!("https://{}", trimmed)
}

/// Parse a canonical URL, rejecting anything without a host for web schemes
pub fn parse_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url).map_err(|e| BrowserError::InvalidUrl(format!("{}: {}", url, e)))?;
    if matches!(parsed.scheme(), "http" | "https") && parsed.host_str().is_none_or(|h| h.is_empty()) {
        return Err(BrowserError::InvalidUrl(format!("{}: missing host", url)));
    }
    Ok(parsed)
}

/// Same URL with a `www.` host, if it does not already have one
pub fn www_variant(url: &Url) -> Option<Url> {
    let host = url.host_str()?;
    if host.starts_with("www.") || host.parse::<std::net::IpAddr>().is_ok() || host == "localhost" {
        return None;
    }
    let mut variant = url.clone();
    variant.set_host(Some(&format!("www.{}", host))).ok()?;
    Some(variant)
}

/// Turns free-form navigation targets into URLs the browser can load
#[derive(Debug, Clone)]
pub struct UrlResolver {
    client: reqwest::Client,
    resolve_redirects: bool,
    try_www: bool,
}

impl UrlResolver {
    pub fn new(resolve_redirects: bool, try_www: bool) -> Self {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client, resolve_redirects, try_www }
    }

    /// Add a scheme, follow one redirect hop and fall back to `www.` when the host is unreachable
    pub async fn canonicalize(&self, raw: &str) -> Result<Url> {
        let url = parse_url(&normalize_url(raw))?;
        if !self.resolve_redirects || !matches!(url.scheme(), "http" | "https") {
            return Ok(url);
        }

        match self.follow_once(&url).await {
            Ok(resolved) => Ok(resolved),
            Err(e) => {
                if self.try_www {
                    if let Some(variant) = www_variant(&url) {
                        if let Ok(resolved) = self.follow_once(&variant).await {
                            log::debug!("{} unreachable, using {}", url, resolved);
                            return Ok(resolved);
                        }
                    }
                }
                log::warn!("Could not probe {}: {}", url, e);
                Ok(url)
            }
        }
    }

    async fn follow_once(&self, url: &Url) -> std::result::Result<Url, reqwest::Error> {
        let response = self.client.head(url.clone()).send().await?;
        if response.status().is_redirection() {
            let location = response
                .headers()
                .get(reqwest::header::LOCATION)
                .and_then(|value| value.to_str().ok())
                .and_then(|location| url.join(location).ok());
            if let Some(location) = location {
                return Ok(location);
            }
        }
        Ok(url.clone())
    }
}

impl Default for UrlResolver {
    fn default() -> Self {
        Self::new(true, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_url_complete() {
        assert_eq!(normalize_url("https://example.com"), "https://example.com");
        assert_eq!(normalize_url("http://example.com/path"), "http://example.com/path");
    }

    #[test]
    fn test_normalize_url_missing_protocol() {
        assert_eq!(normalize_url("example.com"), "https://example.com");
        assert_eq!(normalize_url("  sub.example.com/path  "), "https://sub.example.com/path");
    }

    #[test]
    fn test_normalize_url_localhost() {
        assert_eq!(normalize_url("localhost:3000"), "http://localhost:3000");
        assert_eq!(normalize_url("127.0.0.1:8080"), "http://127.0.0.1:8080");
    }

    #[test]
    fn test_normalize_url_special_protocols() {
        assert_eq!(normalize_url("about:blank"), "about:blank");
        assert_eq!(normalize_url("data:text/html,<h1>Test</h1>"), "data:text/html,<h1>Test</h1>");
    }

    #[test]
    fn test_parse_url_rejects_garbage() {
        assert!(parse_url("https://example.com").is_ok());
        assert!(matches!(parse_url("https://"), Err(BrowserError::InvalidUrl(_))));
        assert!(matches!(parse_url("not a url"), Err(BrowserError::InvalidUrl(_))));
    }

    #[test]
    fn test_www_variant() {
        let url = Url::parse("https://example.com/a?b=1").unwrap();
        assert_eq!(www_variant(&url).unwrap().as_str(), "https://www.example.com/a?b=1");

        let already = Url::parse("https://www.example.com").unwrap();
        assert!(www_variant(&already).is_none());

        let ip = Url::parse("http://127.0.0.1:8080").unwrap();
        assert!(www_variant(&ip).is_none());
    }

    #[tokio::test]
    async fn test_offline_canonicalize() {
        let resolver = UrlResolver::new(false, false);
        let url = resolver.canonicalize("example.com").await.unwrap();
        assert_eq!(url.as_str(), "https://example.com/");
        assert!(matches!(resolver.canonicalize("https://").await, Err(BrowserError::InvalidUrl(_))));
    }
}
