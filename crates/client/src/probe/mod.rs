//! Cache debug prober.
//!
//! Issues a diagnostic GET with a debug header set so the cache layer
//! annotates its response, and surfaces status code and response headers
//! for an operator to inspect cache behavior for a URL.
//!
//! The prober talks to internal/reverse-lookup endpoints that commonly run
//! on self-signed certificates, so certificate verification is disabled on
//! this client. The relaxation is scoped to this diagnostic trust domain:
//! the prober owns a dedicated HTTP client that is never shared with the
//! ban dispatch path.

pub mod url;

pub use self::url::UrlError;

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::header::HeaderMap;

use bancast_core::{AppConfig, Error, ProbeReport};

use self::url::{canonicalize, with_reverse_lookup_port};

/// Configuration for the debug prober.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Diagnostic header set on probe requests (sent with value `1`).
    pub debug_header: String,

    /// User-Agent string (default: "bancast/0.1").
    pub user_agent: String,

    /// Request timeout (default: 10s).
    pub timeout: Duration,

    /// Alternate port addressing the cache layer directly, bypassing the
    /// public-facing port.
    pub reverse_lookup_port: Option<u16>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            debug_header: "X-Cache-Debug".to_string(),
            user_agent: "bancast/0.1".to_string(),
            timeout: Duration::from_millis(10_000),
            reverse_lookup_port: None,
        }
    }
}

impl From<&AppConfig> for ProbeConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            debug_header: config.debug_header.clone(),
            user_agent: config.user_agent.clone(),
            timeout: config.timeout(),
            reverse_lookup_port: config.reverse_lookup_port,
        }
    }
}

/// Cache debug probe client.
#[derive(Debug, Clone)]
pub struct ProbeClient {
    http: reqwest::Client,
    config: ProbeConfig,
}

impl ProbeClient {
    /// Create a new probe client with the given configuration.
    pub fn new(config: ProbeConfig) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::none())
            .use_rustls_tls()
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|e| Error::ClientBuild(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Probe `url` and report how the cache layer answered.
    ///
    /// The request goes to the reverse-lookup port when one is configured;
    /// the report's `host` and `url` fields keep the original authority.
    /// A non-success status is an `Ok` report: the cache layer answering
    /// at all is the diagnostic datum.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidUrl`/`Error::UnsupportedScheme` before any
    /// network call, and `Error::Timeout`/`Error::Transport` when the
    /// request never completes. No retry is performed.
    pub async fn probe(&self, url_str: &str) -> Result<ProbeReport, Error> {
        let original = canonicalize(url_str)?;
        let host = original
            .host_str()
            .ok_or_else(|| Error::InvalidUrl("URL has no host".to_string()))?
            .to_string();
        let target = with_reverse_lookup_port(&original, self.config.reverse_lookup_port)?;

        tracing::debug!("probing {} via {}", original, target);

        let response = self
            .http
            .get(target.as_str())
            .header(self.config.debug_header.as_str(), "1")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() { Error::Timeout(e.to_string()) } else { Error::Transport(e.to_string()) }
            })?;

        let status_code = response.status().as_u16();
        let headers = fold_headers(response.headers());

        tracing::debug!("probe of {} answered with status {}", original, status_code);

        Ok(ProbeReport { status_code, host, url: original.to_string(), headers })
    }
}

/// Flatten a header map to one value per name, keeping the **last** value
/// of any repeated header. Reverse proxies append one occurrence per hop;
/// the last one describes the hop that answered. Names are lowercased.
fn fold_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut folded = BTreeMap::new();
    for (name, value) in headers.iter() {
        folded.insert(
            name.as_str().to_string(),
            String::from_utf8_lossy(value.as_bytes()).into_owned(),
        );
    }
    folded
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderName, HeaderValue};

    #[test]
    fn test_probe_config_default() {
        let config = ProbeConfig::default();
        assert_eq!(config.debug_header, "X-Cache-Debug");
        assert_eq!(config.user_agent, "bancast/0.1");
        assert_eq!(config.timeout, Duration::from_millis(10_000));
        assert!(config.reverse_lookup_port.is_none());
    }

    #[test]
    fn test_probe_config_from_app_config() {
        let app = AppConfig { reverse_lookup_port: Some(6081), debug_header: "X-Debug".into(), ..Default::default() };
        let config = ProbeConfig::from(&app);
        assert_eq!(config.reverse_lookup_port, Some(6081));
        assert_eq!(config.debug_header, "X-Debug");
    }

    #[test]
    fn test_fold_headers_keeps_last_value() {
        let mut headers = HeaderMap::new();
        let name = HeaderName::from_static("x-cache");
        headers.append(&name, HeaderValue::from_static("MISS"));
        headers.append(&name, HeaderValue::from_static("HIT"));
        headers.append(&name, HeaderValue::from_static("HIT, HIT"));

        let folded = fold_headers(&headers);
        assert_eq!(folded.get("x-cache").map(String::as_str), Some("HIT, HIT"));
        assert_eq!(folded.len(), 1);
    }

    #[test]
    fn test_fold_headers_multiple_names() {
        let mut headers = HeaderMap::new();
        headers.insert("x-cache", HeaderValue::from_static("HIT"));
        headers.insert("age", HeaderValue::from_static("42"));

        let folded = fold_headers(&headers);
        assert_eq!(folded.len(), 2);
        assert_eq!(folded.get("age").map(String::as_str), Some("42"));
    }

    #[tokio::test]
    async fn test_probe_client_new() {
        let client = ProbeClient::new(ProbeConfig::default());
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_probe_invalid_url() {
        let client = ProbeClient::new(ProbeConfig::default()).unwrap();
        let result = client.probe("").await;
        assert!(matches!(result, Err(Error::InvalidUrl(_))));

        let result = client.probe("ftp://example.com").await;
        assert!(matches!(result, Err(Error::UnsupportedScheme(_))));
    }
}
