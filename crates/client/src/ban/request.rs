//! Ban request planning and tag encoding.
//!
//! A ban is planned as a list of ephemeral [`BanRequest`] values before any
//! network call: one per target hostname, or a single unscoped request for
//! an installation-wide ban. An empty tag list on a planned request means
//! purge-all; the dispatcher refuses to plan that state from tag input.

use bancast_core::Error;

use crate::tags::CacheTag;

/// One planned invalidation request. Created per dispatch call, never
/// persisted.
#[derive(Debug, Clone)]
pub struct BanRequest {
    /// Target hostname carried in the Host header; `None` leaves the
    /// request unscoped (installation-wide).
    pub host: Option<String>,

    /// Tags to invalidate; empty means purge-all.
    pub tags: Vec<CacheTag>,

    /// MIME scope for purge-all requests.
    pub content_type: Option<String>,
}

impl BanRequest {
    /// Plan tag-ban requests: one per hostname, or one unscoped request
    /// when no hostnames are given.
    pub fn plan_tags(tags: &[CacheTag], hostnames: Option<&[String]>) -> Vec<BanRequest> {
        Self::fan_out(hostnames, |host| BanRequest { host, tags: tags.to_vec(), content_type: None })
    }

    /// Plan purge-all requests with the same fan-out rule as `plan_tags`.
    pub fn plan_all(hostnames: Option<&[String]>, content_type: Option<&str>) -> Vec<BanRequest> {
        Self::fan_out(hostnames, |host| BanRequest {
            host,
            tags: Vec::new(),
            content_type: content_type.map(str::to_string),
        })
    }

    fn fan_out(hostnames: Option<&[String]>, make: impl Fn(Option<String>) -> BanRequest) -> Vec<BanRequest> {
        match hostnames {
            Some(hosts) if !hosts.is_empty() => hosts.iter().map(|host| make(Some(host.clone()))).collect(),
            _ => vec![make(None)],
        }
    }

    /// Whether this request invalidates everything for its target.
    pub fn is_purge_all(&self) -> bool {
        self.tags.is_empty()
    }

    /// Join the tags into the header value, or `None` for purge-all.
    pub fn encode_tags(&self, delimiter: &str) -> Option<String> {
        if self.tags.is_empty() {
            return None;
        }
        Some(
            self.tags
                .iter()
                .map(CacheTag::as_str)
                .collect::<Vec<_>>()
                .join(delimiter),
        )
    }
}

/// Drop duplicate tags, preserving first occurrence. Duplicates only
/// inflate the header value, so they are removed before encoding.
pub(crate) fn dedupe_tags(tags: &[CacheTag]) -> Vec<CacheTag> {
    let mut seen = std::collections::HashSet::new();
    tags.iter()
        .filter(|tag| seen.insert((*tag).clone()))
        .cloned()
        .collect()
}

/// Reject tags that cannot be carried in a delimiter-joined header value.
pub(crate) fn validate_tags(tags: &[CacheTag], delimiter: &str) -> Result<(), Error> {
    for tag in tags {
        if tag.as_str().is_empty() {
            return Err(Error::InvalidTag("empty tag".to_string()));
        }
        if tag.as_str().contains(delimiter) {
            return Err(Error::InvalidTag(format!(
                "tag {:?} contains the delimiter {delimiter:?}",
                tag.as_str()
            )));
        }
        if !tag.as_str().chars().all(|c| c.is_ascii_graphic() || c == ' ') {
            return Err(Error::InvalidTag(format!("tag {:?} is not printable ASCII", tag.as_str())));
        }
    }
    Ok(())
}

/// Reject hostnames that cannot be carried in a Host header.
pub(crate) fn validate_hostnames(hostnames: Option<&[String]>) -> Result<(), Error> {
    for host in hostnames.unwrap_or_default() {
        if host.is_empty() || !host.chars().all(|c| c.is_ascii_graphic()) {
            return Err(Error::InvalidHost(format!("{host:?}")));
        }
    }
    Ok(())
}
