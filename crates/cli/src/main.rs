//! bancast command-line entry point.
//!
//! Operator surface over the invalidation core: resolves site selections to
//! hostnames, parses tag input, dispatches bans, and renders reports.
//! Configuration loads from BANCAST_* environment variables and the TOML
//! file named by BANCAST_CONFIG_FILE. Logging goes to stderr so stdout
//! stays parseable with `--json`.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use bancast_client::{BanClient, BanConfig, CacheTag, ContentNode, ProbeClient, ProbeConfig};
use bancast_client::{parse_tag_input, tags_for_node};
use bancast_core::{AppConfig, DispatchReport, ProbeReport};

/// bancast: tag-based cache invalidation for a reverse-caching accelerator.
#[derive(Parser, Debug)]
#[command(name = "bancast", version, about = "Cache invalidation and debugging for the cache layer")]
struct Cli {
    /// Emit reports as JSON on stdout instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// The subcommand to run.
    #[command(subcommand)]
    command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
enum Command {
    /// List configured sites and their active hostnames.
    Sites,

    /// Ban cached responses matching a comma-separated list of tags.
    PurgeTags {
        /// Comma-separated tags, e.g. "news, events".
        #[arg(long)]
        tags: String,

        /// Node name of the site to scope the ban to. Omit for an
        /// installation-wide ban.
        #[arg(long)]
        site: Option<String>,
    },

    /// Ban every cached representation depending on one content node.
    PurgeNode {
        /// Identifier of the changed node.
        #[arg(long)]
        id: String,

        /// Ancestor identifiers, nearest first, up to the site root.
        #[arg(long = "ancestor")]
        ancestors: Vec<String>,

        /// Identifiers of nodes referencing the changed node.
        #[arg(long = "reference")]
        references: Vec<String>,

        /// Node name of the site to scope the ban to.
        #[arg(long)]
        site: Option<String>,
    },

    /// Ban all cached content for a site or the whole installation.
    PurgeAll {
        /// Node name of the site to scope the purge to. Omit to purge the
        /// whole installation.
        #[arg(long)]
        site: Option<String>,

        /// Restrict the purge to one MIME family, e.g. "image/*".
        #[arg(long)]
        content_type: Option<String>,
    },

    /// Probe a URL with the cache debug header and show the response.
    CheckUrl {
        /// URL to probe.
        url: String,

        /// Override the configured reverse-lookup port.
        #[arg(long)]
        port: Option<u16>,
    },
}

/// Node description assembled from CLI flags; stands in for the node
/// object the host CMS would hand over.
struct NodeSelector {
    id: String,
    ancestors: Vec<String>,
    references: Vec<String>,
}

impl ContentNode for NodeSelector {
    fn identifier(&self) -> &str {
        &self.id
    }

    fn ancestor_identifiers(&self) -> Vec<String> {
        self.ancestors.clone()
    }

    fn referencing_identifiers(&self) -> Vec<String> {
        self.references.clone()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load()?;

    match cli.command {
        Command::Sites => {
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&config.sites)?);
            } else if config.sites.is_empty() {
                println!("no sites configured");
            } else {
                for site in &config.sites {
                    let hostnames = site.active_hostnames();
                    let hostnames = if hostnames.is_empty() { "(no active domains)".to_string() } else { hostnames.join(", ") };
                    println!("{} ({}): {}", site.name, site.node_name, hostnames);
                }
            }
        }

        Command::PurgeTags { tags, site } => {
            let parsed = parse_tag_input(&tags, &config.tag_delimiter)?;
            let (hostnames, scope) = resolve_scope(&config, site.as_deref())?;
            let client = BanClient::new(BanConfig::from(&config))?;
            let report = client.ban_by_tags(&parsed, hostnames.as_deref()).await?;

            let joined = parsed.iter().map(|t| format!("\"{t}\"")).collect::<Vec<_>>().join(", ");
            render_dispatch(&report, &format!("cache cleared for tags {joined} for {scope}"), cli.json)?;
        }

        Command::PurgeNode { id, ancestors, references, site } => {
            let node = NodeSelector { id, ancestors, references };
            let tags: Vec<CacheTag> = tags_for_node(&node).into_iter().collect();
            let (hostnames, scope) = resolve_scope(&config, site.as_deref())?;
            let client = BanClient::new(BanConfig::from(&config))?;
            let report = client.ban_by_tags(&tags, hostnames.as_deref()).await?;

            render_dispatch(
                &report,
                &format!("cache cleared for node {} ({} tags) for {scope}", node.identifier(), tags.len()),
                cli.json,
            )?;
        }

        Command::PurgeAll { site, content_type } => {
            let (hostnames, scope) = resolve_scope(&config, site.as_deref())?;
            let client = BanClient::new(BanConfig::from(&config))?;
            let report = client.ban_all(hostnames.as_deref(), content_type.as_deref()).await?;

            let suffix = content_type.map(|ct| format!(" with content type {ct:?}")).unwrap_or_default();
            render_dispatch(&report, &format!("all cache cleared for {scope}{suffix}"), cli.json)?;
        }

        Command::CheckUrl { url, port } => {
            let mut probe_config = ProbeConfig::from(&config);
            if port.is_some() {
                probe_config.reverse_lookup_port = port;
            }
            let client = ProbeClient::new(probe_config)?;
            let report = client.probe(&url).await?;
            render_probe(&report, cli.json)?;
        }
    }

    Ok(())
}

/// Resolve a site selection to ban targets and a scope label.
///
/// A site with no active domains cannot scope a ban and falls back to an
/// installation-wide request; an unknown site name is an error.
fn resolve_scope(config: &AppConfig, site: Option<&str>) -> Result<(Option<Vec<String>>, String)> {
    let Some(node_name) = site else {
        return Ok((None, "installation".to_string()));
    };

    let site = config.require_site(node_name)?;
    if !site.has_active_domains() {
        tracing::warn!("site {} has no active domains, banning installation-wide", site.node_name);
        return Ok((None, "installation".to_string()));
    }
    Ok((Some(site.active_hostnames()), format!("site {}", site.name)))
}

/// Print a dispatch report; partial failure is a hard error after the
/// per-target detail has been shown.
fn render_dispatch(report: &DispatchReport, message: &str, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        for outcome in &report.outcomes {
            match (&outcome.status_code, &outcome.error) {
                (Some(code), _) => println!("  {} -> {}", outcome.target(), code),
                (None, Some(error)) => println!("  {} -> {}", outcome.target(), error),
                (None, None) => println!("  {} -> no response", outcome.target()),
            }
        }
        println!("{message}");
    }

    if !report.all_succeeded() {
        anyhow::bail!("{} of {} ban requests failed", report.summary.failed, report.summary.total);
    }
    Ok(())
}

/// Print a probe report.
fn render_probe(report: &ProbeReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        println!("{} {} ({})", report.status_code, report.url, report.host);
        for (name, value) in &report.headers {
            println!("  {name}: {value}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_node_selector_accessors() {
        let node = NodeSelector {
            id: "n1".into(),
            ancestors: vec!["root".into()],
            references: vec!["teaser".into()],
        };
        assert_eq!(node.identifier(), "n1");
        assert_eq!(node.ancestor_identifiers(), vec!["root".to_string()]);
        assert_eq!(node.referencing_identifiers(), vec!["teaser".to_string()]);
    }
}
