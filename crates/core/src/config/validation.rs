//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

/// RFC 7230 token characters, the legal alphabet for header field names.
fn is_header_token(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b))
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `endpoint` is not an http/https URL with a host
    /// - `ban_method` or any header name is not a valid HTTP token
    /// - `tag_delimiter` is not a single non-whitespace ASCII character
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `max_concurrency` is outside 1-16
    /// - `user_agent` is empty
    /// - two sites share a node name
    pub fn validate(&self) -> Result<(), ConfigError> {
        let endpoint = url::Url::parse(&self.endpoint)
            .map_err(|e| ConfigError::Invalid { field: "endpoint".into(), reason: e.to_string() })?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid {
                field: "endpoint".into(),
                reason: format!("unsupported scheme {}", endpoint.scheme()),
            });
        }
        if endpoint.host_str().is_none() {
            return Err(ConfigError::Invalid { field: "endpoint".into(), reason: "missing host".into() });
        }

        if !is_header_token(&self.ban_method) {
            return Err(ConfigError::Invalid { field: "ban_method".into(), reason: "not a valid HTTP token".into() });
        }

        for (field, name) in [
            ("tag_header", &self.tag_header),
            ("ban_all_header", &self.ban_all_header),
            ("content_type_header", &self.content_type_header),
            ("debug_header", &self.debug_header),
        ] {
            if !is_header_token(name) {
                return Err(ConfigError::Invalid {
                    field: field.into(),
                    reason: "not a valid HTTP header name".into(),
                });
            }
        }

        if self.tag_delimiter.len() != 1 || !self.tag_delimiter.is_ascii() {
            return Err(ConfigError::Invalid {
                field: "tag_delimiter".into(),
                reason: "must be a single ASCII character".into(),
            });
        }
        if self.tag_delimiter.chars().next().is_some_and(char::is_whitespace) {
            return Err(ConfigError::Invalid {
                field: "tag_delimiter".into(),
                reason: "must not be whitespace".into(),
            });
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.max_concurrency < 1 || self.max_concurrency > 16 {
            return Err(ConfigError::Invalid {
                field: "max_concurrency".into(),
                reason: "must be between 1 and 16".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        for (i, site) in self.sites.iter().enumerate() {
            if site.node_name.is_empty() {
                return Err(ConfigError::Invalid {
                    field: format!("sites[{i}].node_name"),
                    reason: "must not be empty".into(),
                });
            }
            if self.sites[..i].iter().any(|s| s.node_name == site.node_name) {
                return Err(ConfigError::Invalid {
                    field: format!("sites[{i}].node_name"),
                    reason: format!("duplicate node name {}", site.node_name),
                });
            }
        }

        Ok(())
    }
}
