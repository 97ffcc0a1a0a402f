//! URL canonicalization and reverse-lookup port rewriting for probes.

/// Error type for URL canonicalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("URL has no host")]
    MissingHost,
}

impl From<UrlError> for bancast_core::Error {
    fn from(err: UrlError) -> Self {
        match err {
            UrlError::UnsupportedScheme(scheme) => bancast_core::Error::UnsupportedScheme(scheme),
            other => bancast_core::Error::InvalidUrl(other.to_string()),
        }
    }
}

/// Canonicalize an operator-supplied URL for probing.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Default scheme to https:// if missing
/// 3. Remove fragment (#...)
/// 4. Keep query string intact (do not reorder)
pub fn canonicalize(input: &str) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let url_str = if trimmed.contains("://") { trimmed.to_string() } else { format!("https://{trimmed}") };

    let mut parsed = url::Url::parse(&url_str).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if parsed.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

/// Rewrite the URL's port to address the cache layer directly.
///
/// With `port` absent the URL is returned unchanged: the probe then talks
/// to the public-facing port like any client.
pub fn with_reverse_lookup_port(url: &url::Url, port: Option<u16>) -> Result<url::Url, UrlError> {
    let Some(port) = port else {
        return Ok(url.clone());
    };

    let mut rewritten = url.clone();
    rewritten.set_port(Some(port)).map_err(|_| UrlError::MissingHost)?;
    Ok(rewritten)
}
