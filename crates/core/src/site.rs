//! Site and domain data model.
//!
//! Sites are owned and persisted by the host CMS; this core only reads
//! them to resolve a site selection into the hostnames a ban should be
//! scoped to.

use serde::{Deserialize, Serialize};

/// A hostname attached to a site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Domain {
    /// Fully qualified hostname, e.g. `www.example.com`.
    pub hostname: String,

    /// Inactive domains are skipped when resolving ban targets.
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// A logical web property served by the installation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Site {
    /// Human-readable name shown to operators.
    pub name: String,

    /// Unique node-name identifier of the site root.
    pub node_name: String,

    /// Domains attached to this site.
    #[serde(default)]
    pub domains: Vec<Domain>,
}

impl Site {
    /// Hostnames of the site's active domains, in declaration order.
    ///
    /// An empty result means the site cannot scope a ban and callers fall
    /// back to an installation-wide request, matching the behavior of a
    /// site with no domains at all.
    pub fn active_hostnames(&self) -> Vec<String> {
        self.domains
            .iter()
            .filter(|domain| domain.active)
            .map(|domain| domain.hostname.clone())
            .collect()
    }

    /// Whether at least one active domain exists.
    pub fn has_active_domains(&self) -> bool {
        self.domains.iter().any(|domain| domain.active)
    }
}
