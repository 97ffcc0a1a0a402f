//! Cache tag derivation and operator tag input parsing.
//!
//! Tags are opaque labels attached to cached responses at generation time.
//! A content change is turned into the set of tags identifying every cached
//! representation that depends on the changed node: the node itself, its
//! ancestors (listings that embed it), and nodes referencing it.

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use bancast_core::Error;

/// An opaque cache tag as it appears on the wire.
///
/// Ordering and equality are plain string semantics; `BTreeSet<CacheTag>`
/// gives deterministic, deduplicated tag sets.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CacheTag(String);

impl CacheTag {
    /// Wrap an operator-supplied tag verbatim.
    pub fn raw(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Tag identifying one node's own cached representations.
    pub fn node(identifier: &str) -> Self {
        Self(format!("Node_{identifier}"))
    }

    /// Tag identifying cached listings that embed descendants of a node.
    pub fn descendant_of(identifier: &str) -> Self {
        Self(format!("DescendantOf_{identifier}"))
    }

    /// The wire form of the tag.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Accessor seam onto the host CMS content graph.
///
/// The CMS owns nodes; this core only needs identity and structural
/// relationships to derive tags.
pub trait ContentNode {
    /// Stable identifier of this node.
    fn identifier(&self) -> &str;

    /// Identifiers of the node's ancestors, nearest first, up to the site root.
    fn ancestor_identifiers(&self) -> Vec<String>;

    /// Identifiers of nodes known to reference this node.
    fn referencing_identifiers(&self) -> Vec<String>;
}

/// Derive the tag set invalidated by a change to `node`.
///
/// The set contains the node's own tag, a node and a descendant tag per
/// ancestor, and a node tag per referencing node. Two calls on unchanged
/// node state return identical sets.
pub fn tags_for_node(node: &impl ContentNode) -> BTreeSet<CacheTag> {
    let mut tags = BTreeSet::new();
    tags.insert(CacheTag::node(node.identifier()));

    for ancestor in node.ancestor_identifiers() {
        tags.insert(CacheTag::node(&ancestor));
        tags.insert(CacheTag::descendant_of(&ancestor));
    }

    for referencing in node.referencing_identifiers() {
        tags.insert(CacheTag::node(&referencing));
    }

    tags
}

/// Parse operator-supplied comma-separated tag input.
///
/// Segments are trimmed, empty segments dropped, and duplicates removed
/// preserving first occurrence. Tags containing the wire `delimiter` are
/// rejected so the joined header value stays unambiguous.
///
/// # Errors
///
/// Returns `Error::InvalidTags` when nothing remains after trimming. An
/// empty operator input must never reach the dispatcher, where an empty
/// tag set would otherwise shade into purge-all.
pub fn parse_tag_input(input: &str, delimiter: &str) -> Result<Vec<CacheTag>, Error> {
    let mut seen = HashSet::new();
    let mut tags = Vec::new();

    for segment in input.split(',') {
        let tag = segment.trim();
        if tag.is_empty() {
            continue;
        }
        if tag.contains(delimiter) {
            return Err(Error::InvalidTag(format!("tag {tag:?} contains the delimiter {delimiter:?}")));
        }
        if seen.insert(tag.to_string()) {
            tags.push(CacheTag::raw(tag));
        }
    }

    if tags.is_empty() {
        return Err(Error::InvalidTags("no tags remain after trimming input".to_string()));
    }

    Ok(tags)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestNode {
        identifier: String,
        ancestors: Vec<String>,
        references: Vec<String>,
    }

    impl ContentNode for TestNode {
        fn identifier(&self) -> &str {
            &self.identifier
        }

        fn ancestor_identifiers(&self) -> Vec<String> {
            self.ancestors.clone()
        }

        fn referencing_identifiers(&self) -> Vec<String> {
            self.references.clone()
        }
    }

    fn test_node() -> TestNode {
        TestNode {
            identifier: "n1".into(),
            ancestors: vec!["parent".into(), "root".into()],
            references: vec!["teaser".into()],
        }
    }

    #[test]
    fn test_tags_for_node_contents() {
        let tags = tags_for_node(&test_node());

        assert!(tags.contains(&CacheTag::node("n1")));
        assert!(tags.contains(&CacheTag::node("parent")));
        assert!(tags.contains(&CacheTag::node("root")));
        assert!(tags.contains(&CacheTag::descendant_of("parent")));
        assert!(tags.contains(&CacheTag::descendant_of("root")));
        assert!(tags.contains(&CacheTag::node("teaser")));
        assert_eq!(tags.len(), 6);
    }

    #[test]
    fn test_tags_for_node_deterministic() {
        let node = test_node();
        assert_eq!(tags_for_node(&node), tags_for_node(&node));
    }

    #[test]
    fn test_tags_for_node_deduplicates() {
        let node = TestNode {
            identifier: "n1".into(),
            ancestors: vec!["root".into()],
            // A referencing node that is also an ancestor collapses.
            references: vec!["root".into(), "n1".into()],
        };
        let tags = tags_for_node(&node);
        assert_eq!(tags.len(), 3);
    }

    #[test]
    fn test_parse_tag_input_trims_and_splits() {
        let tags = parse_tag_input("news, events", ",").unwrap();
        assert_eq!(tags, vec![CacheTag::raw("news"), CacheTag::raw("events")]);
    }

    #[test]
    fn test_parse_tag_input_dedupes_preserving_order() {
        let tags = parse_tag_input("a,a,b,a", ",").unwrap();
        assert_eq!(tags, vec![CacheTag::raw("a"), CacheTag::raw("b")]);
    }

    #[test]
    fn test_parse_tag_input_empty() {
        assert!(matches!(parse_tag_input("", ","), Err(Error::InvalidTags(_))));
        assert!(matches!(parse_tag_input(" , ,", ","), Err(Error::InvalidTags(_))));
    }

    #[test]
    fn test_parse_tag_input_delimiter_collision() {
        // Wire delimiter differs from the input separator here.
        let result = parse_tag_input("news|sports, events", "|");
        assert!(matches!(result, Err(Error::InvalidTag(_))));
    }

    #[test]
    fn test_tag_display() {
        assert_eq!(CacheTag::node("abc").to_string(), "Node_abc");
        assert_eq!(CacheTag::descendant_of("abc").to_string(), "DescendantOf_abc");
        assert_eq!(CacheTag::raw("news").to_string(), "news");
    }
}
