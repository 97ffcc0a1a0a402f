//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (BANCAST_*)
//! 2. TOML config file (if BANCAST_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! The site list is part of the configuration on purpose: the host CMS owns
//! sites and domains, and hands them to this core as plain data rather than
//! through injected repositories.

use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::site::Site;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (BANCAST_*)
/// 2. TOML config file (if BANCAST_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Control endpoint of the cache layer, e.g. `http://127.0.0.1:6081`.
    ///
    /// Invalidation requests go to this endpoint; host scoping travels in
    /// the Host header, not in the endpoint URL.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// HTTP verb for invalidation requests (default: `BAN`).
    #[serde(default = "default_ban_method")]
    pub ban_method: String,

    /// Header carrying the delimiter-joined tag list.
    #[serde(default = "default_tag_header")]
    pub tag_header: String,

    /// Delimiter joining tags inside the tag header. Single ASCII
    /// character; tags containing it are rejected before dispatch.
    #[serde(default = "default_tag_delimiter")]
    pub tag_delimiter: String,

    /// Sentinel header marking a purge-all request (sent with value `1`).
    #[serde(default = "default_ban_all_header")]
    pub ban_all_header: String,

    /// Header scoping a purge-all to one MIME family.
    #[serde(default = "default_content_type_header")]
    pub content_type_header: String,

    /// Diagnostic header set on probe requests (sent with value `1`).
    #[serde(default = "default_debug_header")]
    pub debug_header: String,

    /// User-Agent string for all outbound requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Bound on concurrent per-host dispatches (1-16).
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: u8,

    /// Alternate port for addressing the cache layer directly when probing.
    ///
    /// Set via BANCAST_REVERSE_LOOKUP_PORT environment variable.
    #[serde(default)]
    pub reverse_lookup_port: Option<u16>,

    /// Active sites with their domains, supplied by the host CMS.
    #[serde(default)]
    pub sites: Vec<Site>,
}

fn default_endpoint() -> String {
    "http://127.0.0.1:6081".into()
}

fn default_ban_method() -> String {
    "BAN".into()
}

fn default_tag_header() -> String {
    "X-Cache-Tags".into()
}

fn default_tag_delimiter() -> String {
    ",".into()
}

fn default_ban_all_header() -> String {
    "X-Cache-Ban-All".into()
}

fn default_content_type_header() -> String {
    "X-Cache-Content-Type".into()
}

fn default_debug_header() -> String {
    "X-Cache-Debug".into()
}

fn default_user_agent() -> String {
    "bancast/0.1".into()
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_max_concurrency() -> u8 {
    4
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            ban_method: default_ban_method(),
            tag_header: default_tag_header(),
            tag_delimiter: default_tag_delimiter(),
            ban_all_header: default_ban_all_header(),
            content_type_header: default_content_type_header(),
            debug_header: default_debug_header(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_concurrency: default_max_concurrency(),
            reverse_lookup_port: None,
            sites: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `BANCAST_`
    /// 2. TOML file from `BANCAST_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("BANCAST_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("BANCAST_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        tracing::debug!(endpoint = %config.endpoint, sites = config.sites.len(), "configuration loaded");

        Ok(config)
    }

    /// Look up a configured site by its node name.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if no site with that node name exists.
    pub fn require_site(&self, node_name: &str) -> Result<&Site, ConfigError> {
        self.sites
            .iter()
            .find(|site| site.node_name == node_name)
            .ok_or_else(|| ConfigError::Missing {
                field: format!("sites.{node_name}"),
                hint: "Add the site to the [[sites]] table of the config file".into(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::site::Domain;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.endpoint, "http://127.0.0.1:6081");
        assert_eq!(config.ban_method, "BAN");
        assert_eq!(config.tag_header, "X-Cache-Tags");
        assert_eq!(config.tag_delimiter, ",");
        assert_eq!(config.ban_all_header, "X-Cache-Ban-All");
        assert_eq!(config.content_type_header, "X-Cache-Content-Type");
        assert_eq!(config.debug_header, "X-Cache-Debug");
        assert_eq!(config.user_agent, "bancast/0.1");
        assert_eq!(config.timeout_ms, 10_000);
        assert_eq!(config.max_concurrency, 4);
        assert!(config.reverse_lookup_port.is_none());
        assert!(config.sites.is_empty());
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(10_000));
    }

    #[test]
    fn test_require_site_missing() {
        let config = AppConfig::default();
        let result = config.require_site("blog");
        assert!(matches!(result, Err(ConfigError::Missing { .. })));
    }

    #[test]
    fn test_require_site_present() {
        let config = AppConfig {
            sites: vec![Site {
                name: "Blog".into(),
                node_name: "blog".into(),
                domains: vec![Domain { hostname: "blog.example.com".into(), active: true }],
            }],
            ..Default::default()
        };
        let site = config.require_site("blog").unwrap();
        assert_eq!(site.name, "Blog");
    }
}
