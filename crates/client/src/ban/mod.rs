//! Ban request dispatcher for the cache layer.
//!
//! Issues invalidation requests against the cache control endpoint using a
//! non-standard verb (conventionally `BAN`). Tags travel delimiter-joined
//! in a single header; host scoping travels in the Host header; purge-all
//! is a separate call path marked by a sentinel header and never reachable
//! from tag input.
//!
//! ### Failure model
//!
//! The fan-out never aborts on a single target: every request produces one
//! outcome (acknowledged, upstream status, or transport error) and the
//! caller decides how severe a partial failure is.

pub mod request;

pub use request::BanRequest;

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HOST, HeaderValue};
use reqwest::{Method, StatusCode};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use bancast_core::{AppConfig, DispatchOutcome, DispatchReport, DispatchStatus, Error};

use crate::tags::CacheTag;
use request::{dedupe_tags, validate_hostnames, validate_tags};

/// Configuration for the ban dispatcher.
#[derive(Debug, Clone)]
pub struct BanConfig {
    /// Cache control endpoint (default: `http://127.0.0.1:6081`).
    pub endpoint: String,

    /// Invalidation verb (default: `BAN`).
    pub method: String,

    /// Header carrying the delimiter-joined tags.
    pub tag_header: String,

    /// Delimiter joining tags inside the tag header.
    pub tag_delimiter: String,

    /// Sentinel header marking purge-all requests.
    pub ban_all_header: String,

    /// Header scoping purge-all to one MIME family.
    pub content_type_header: String,

    /// User-Agent string (default: "bancast/0.1").
    pub user_agent: String,

    /// Per-request timeout (default: 10s).
    pub timeout: Duration,

    /// Bound on concurrent per-host requests (default: 4).
    pub max_concurrency: usize,
}

impl Default for BanConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:6081".to_string(),
            method: "BAN".to_string(),
            tag_header: "X-Cache-Tags".to_string(),
            tag_delimiter: ",".to_string(),
            ban_all_header: "X-Cache-Ban-All".to_string(),
            content_type_header: "X-Cache-Content-Type".to_string(),
            user_agent: "bancast/0.1".to_string(),
            timeout: Duration::from_millis(10_000),
            max_concurrency: 4,
        }
    }
}

impl From<&AppConfig> for BanConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            method: config.ban_method.clone(),
            tag_header: config.tag_header.clone(),
            tag_delimiter: config.tag_delimiter.clone(),
            ban_all_header: config.ban_all_header.clone(),
            content_type_header: config.content_type_header.clone(),
            user_agent: config.user_agent.clone(),
            timeout: config.timeout(),
            max_concurrency: config.max_concurrency as usize,
        }
    }
}

/// Ban dispatch client.
///
/// Certificate verification stays enabled on this path; only the debug
/// prober relaxes TLS, and the two never share a client.
#[derive(Debug, Clone)]
pub struct BanClient {
    http: reqwest::Client,
    method: Method,
    config: BanConfig,
}

impl BanClient {
    /// Create a new ban client with the given configuration.
    pub fn new(config: BanConfig) -> Result<Self, Error> {
        let method = Method::from_bytes(config.method.as_bytes())
            .map_err(|_| Error::ClientBuild(format!("invalid ban method {:?}", config.method)))?;

        let http = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::none())
            .use_rustls_tls()
            .build()
            .map_err(|e| Error::ClientBuild(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, method, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &BanConfig {
        &self.config
    }

    /// Ban all cached responses carrying any of `tags`.
    ///
    /// Issues one request per hostname, or a single unscoped request when
    /// `hostnames` is absent or empty. Tags are deduplicated before
    /// encoding; all requests carry the same tag header value.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidTags` for an empty tag set (purging
    /// everything requires the explicit [`BanClient::ban_all`] path) and
    /// `Error::InvalidTag`/`Error::InvalidHost` for values that cannot be
    /// carried in headers. Per-host network failures are not errors; they
    /// are recorded in the report.
    pub async fn ban_by_tags(&self, tags: &[CacheTag], hostnames: Option<&[String]>) -> Result<DispatchReport, Error> {
        let tags = dedupe_tags(tags);
        if tags.is_empty() {
            return Err(Error::InvalidTags(
                "tag ban requires at least one tag; use ban_all to purge everything".to_string(),
            ));
        }
        validate_tags(&tags, &self.config.tag_delimiter)?;
        validate_hostnames(hostnames)?;

        self.dispatch(BanRequest::plan_tags(&tags, hostnames)).await
    }

    /// Ban every cached response for the targeted hosts, or the whole
    /// installation when `hostnames` is absent or empty.
    ///
    /// Strictly more destructive than [`BanClient::ban_by_tags`]: the tag
    /// header is omitted and the ban-all sentinel header is sent instead.
    /// When `content_type` is given, only cached responses of that MIME
    /// family are invalidated.
    pub async fn ban_all(
        &self, hostnames: Option<&[String]>, content_type: Option<&str>,
    ) -> Result<DispatchReport, Error> {
        validate_hostnames(hostnames)?;

        self.dispatch(BanRequest::plan_all(hostnames, content_type)).await
    }

    /// Execute a planned fan-out with bounded concurrency.
    ///
    /// Outcomes are reported in planning order regardless of completion
    /// order.
    async fn dispatch(&self, plan: Vec<BanRequest>) -> Result<DispatchReport, Error> {
        let started_at = chrono::Utc::now().to_rfc3339();
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
        let mut join_set = JoinSet::new();

        for (index, ban_request) in plan.into_iter().enumerate() {
            let permit = semaphore.clone().acquire_owned().await.unwrap();
            let client = self.clone();

            join_set.spawn(async move {
                // NOTE: Hold permit for task duration to enforce concurrency limit
                let _permit = permit;
                let outcome = client.send_one(&ban_request).await;
                (index, outcome)
            });
        }

        let mut outcomes: Vec<Option<DispatchOutcome>> = Vec::new();
        while let Some(result) = join_set.join_next().await {
            let (index, outcome) = result.map_err(|e| Error::Transport(format!("dispatch task failed: {e}")))?;
            if outcomes.len() <= index {
                outcomes.resize(index + 1, None);
            }
            outcomes[index] = Some(outcome);
        }

        let outcomes = outcomes.into_iter().flatten().collect();
        Ok(DispatchReport::new(outcomes, started_at))
    }

    /// Issue a single invalidation request and classify the result.
    async fn send_one(&self, ban_request: &BanRequest) -> DispatchOutcome {
        let target = ban_request.host.clone();
        let mut request = self.http.request(self.method.clone(), &self.config.endpoint);

        if let Some(host) = &ban_request.host {
            match HeaderValue::from_str(host) {
                Ok(value) => request = request.header(HOST, value),
                Err(e) => {
                    return DispatchOutcome {
                        host: target,
                        status: DispatchStatus::TransportError,
                        status_code: None,
                        error: Some(format!("unusable hostname: {e}")),
                    };
                }
            }
        }

        match ban_request.encode_tags(&self.config.tag_delimiter) {
            Some(encoded) => request = request.header(self.config.tag_header.as_str(), encoded),
            None => {
                request = request.header(self.config.ban_all_header.as_str(), "1");
                if let Some(content_type) = &ban_request.content_type {
                    request = request.header(self.config.content_type_header.as_str(), content_type.as_str());
                }
            }
        }

        tracing::debug!(
            host = ban_request.host.as_deref().unwrap_or("installation"),
            purge_all = ban_request.is_purge_all(),
            "sending {} to {}",
            self.method,
            self.config.endpoint
        );

        match request.send().await {
            Ok(response) => classify_status(target, response.status()),
            Err(e) => {
                tracing::warn!(
                    host = ban_request.host.as_deref().unwrap_or("installation"),
                    "ban request failed: {e}"
                );
                DispatchOutcome {
                    host: target,
                    status: DispatchStatus::TransportError,
                    status_code: None,
                    error: Some(if e.is_timeout() { format!("timeout: {e}") } else { e.to_string() }),
                }
            }
        }
    }
}

fn classify_status(host: Option<String>, status: StatusCode) -> DispatchOutcome {
    if status.is_success() {
        DispatchOutcome { host, status: DispatchStatus::Banned, status_code: Some(status.as_u16()), error: None }
    } else {
        tracing::warn!(
            host = host.as_deref().unwrap_or("installation"),
            "cache layer answered ban with status {status}"
        );
        DispatchOutcome {
            host,
            status: DispatchStatus::UpstreamError,
            status_code: Some(status.as_u16()),
            error: None,
        }
    }
}
