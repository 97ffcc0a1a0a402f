//! Client code for bancast.
//!
//! This crate provides the cache-invalidation core shared by the CLI and
//! any host CMS integration: tag derivation for content nodes, ban request
//! planning and dispatch, and the cache debug prober.

pub mod ban;
pub mod probe;
pub mod tags;

pub use ban::{BanClient, BanConfig, BanRequest};
pub use probe::{ProbeClient, ProbeConfig};
pub use tags::{CacheTag, ContentNode, parse_tag_input, tags_for_node};
