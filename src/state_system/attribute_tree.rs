//! Attribute tree: hierarchical path → quark addressing
//!
//! Every attribute (e.g. `host/1234/5678/status`) is a node in an arena. Each
//! node keeps an FNV hash map from child name to child quark, so resolving a
//! path costs one hash lookup per segment and never scans existing quarks.
//!
//! ```text
//! (root) ─┬─ host-a (0) ─┬─ 1234 (1) ─── 5678 (2) ─── status (3)
//!         │              └─ msg (4) ──── status (5)
//!         └─ disk (6) ──── 000 (7)
//! ```
//!
//! Quarks are dense indices into the arena. They are assigned in creation
//! order and never reused or renumbered.

use super::error::{Result, StateError};
use fnv::FnvHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pattern segment matching any child at one depth
pub const WILDCARD: &str = "*";

/// Stable identifier of one attribute-tree node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quark(usize);

impl Quark {
    pub const fn new(index: usize) -> Self {
        Quark(index)
    }

    /// Arena index of this quark
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for Quark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AttributeNode {
    name: String,
    parent: Option<Quark>,
    children: FnvHashMap<String, Quark>,
    /// Children in creation order, for deterministic traversal
    child_order: Vec<Quark>,
}

impl AttributeNode {
    fn new(name: &str, parent: Option<Quark>) -> Self {
        AttributeNode {
            name: name.to_string(),
            parent,
            children: FnvHashMap::default(),
            child_order: Vec::new(),
        }
    }
}

/// Arena of attribute nodes addressed by quark
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttributeTree {
    nodes: Vec<AttributeNode>,
    roots: FnvHashMap<String, Quark>,
    root_order: Vec<Quark>,
}

impl AttributeTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a tree with room for `capacity` attributes
    pub fn with_capacity(capacity: usize) -> Self {
        AttributeTree {
            nodes: Vec::with_capacity(capacity),
            roots: FnvHashMap::default(),
            root_order: Vec::new(),
        }
    }

    /// Number of quarks allocated so far
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, quark: Quark) -> bool {
        quark.index() < self.nodes.len()
    }

    /// All quarks in allocation order
    pub fn quarks(&self) -> impl Iterator<Item = Quark> + '_ {
        (0..self.nodes.len()).map(Quark::new)
    }

    fn check(&self, quark: Quark) -> Result<()> {
        if self.contains(quark) {
            Ok(())
        } else {
            Err(StateError::InvalidQuark { quark })
        }
    }

    /// Resolve the child `name` of `parent` (or a root when `parent` is
    /// `None`), allocating a new quark on first reference.
    pub fn quark_for(&mut self, parent: Option<Quark>, name: &str) -> Result<Quark> {
        if let Some(existing) = self.lookup_quark(parent, name) {
            return Ok(existing);
        }
        if let Some(p) = parent {
            self.check(p)?;
        }

        let quark = Quark::new(self.nodes.len());
        self.nodes.push(AttributeNode::new(name, parent));
        match parent {
            Some(p) => {
                let node = &mut self.nodes[p.index()];
                node.children.insert(name.to_string(), quark);
                node.child_order.push(quark);
            }
            None => {
                self.roots.insert(name.to_string(), quark);
                self.root_order.push(quark);
            }
        }
        Ok(quark)
    }

    /// Resolve every segment in order, creating missing ones.
    ///
    /// An empty path below `Some(parent)` resolves to `parent` itself; an
    /// empty absolute path names no attribute and fails with `QuarkNotFound`.
    pub fn quark_for_path<S: AsRef<str>>(
        &mut self,
        parent: Option<Quark>,
        segments: &[S],
    ) -> Result<Quark> {
        let mut current = parent;
        for segment in segments {
            current = Some(self.quark_for(current, segment.as_ref())?);
        }
        current.ok_or_else(|| StateError::QuarkNotFound {
            path: String::new(),
        })
    }

    /// Read-only resolution of one child
    pub fn lookup_quark(&self, parent: Option<Quark>, name: &str) -> Option<Quark> {
        match parent {
            Some(p) => self.nodes.get(p.index())?.children.get(name).copied(),
            None => self.roots.get(name).copied(),
        }
    }

    /// Read-only resolution of a path
    pub fn lookup_path<S: AsRef<str>>(&self, parent: Option<Quark>, segments: &[S]) -> Option<Quark> {
        if let Some(p) = parent {
            if !self.contains(p) {
                return None;
            }
        }
        let mut current = parent;
        for segment in segments {
            current = Some(self.lookup_quark(current, segment.as_ref())?);
        }
        current
    }

    /// Direct children of `quark`, in creation order
    pub fn children_of(&self, quark: Quark) -> &[Quark] {
        self.nodes
            .get(quark.index())
            .map(|n| n.child_order.as_slice())
            .unwrap_or(&[])
    }

    /// Top-level attributes, in creation order
    pub fn roots(&self) -> &[Quark] {
        &self.root_order
    }

    pub fn name_of(&self, quark: Quark) -> Option<&str> {
        self.nodes.get(quark.index()).map(|n| n.name.as_str())
    }

    pub fn parent_of(&self, quark: Quark) -> Option<Quark> {
        self.nodes.get(quark.index())?.parent
    }

    /// Path segments from the root down to `quark`
    pub fn segments_of(&self, quark: Quark) -> Vec<&str> {
        let mut segments = Vec::new();
        let mut current = Some(quark);
        while let Some(q) = current {
            let Some(node) = self.nodes.get(q.index()) else {
                break;
            };
            segments.push(node.name.as_str());
            current = node.parent;
        }
        segments.reverse();
        segments
    }

    /// Full path of `quark` joined with `separator`
    pub fn path_of(&self, quark: Quark, separator: char) -> Option<String> {
        if !self.contains(quark) {
            return None;
        }
        let separator = separator.to_string();
        Some(self.segments_of(quark).join(separator.as_str()))
    }

    /// Descendants of `quark`: direct children, or the whole subtree in
    /// depth-first order when `recursive` is set
    pub fn sub_attributes(&self, quark: Quark, recursive: bool) -> Vec<Quark> {
        let mut out = Vec::new();
        for &child in self.children_of(quark) {
            out.push(child);
            if recursive {
                out.extend(self.sub_attributes(child, true));
            }
        }
        out
    }

    /// Quarks whose path below `parent` matches `pattern`, where a `*`
    /// segment matches any child at that depth. Returned in ascending order.
    pub fn matching<S: AsRef<str>>(&self, parent: Option<Quark>, pattern: &[S]) -> Vec<Quark> {
        let mut frontier: Vec<Option<Quark>> = vec![parent];
        for segment in pattern {
            let segment = segment.as_ref();
            let mut next = Vec::new();
            for node in frontier {
                if segment == WILDCARD {
                    let children = match node {
                        Some(q) => self.children_of(q),
                        None => self.roots(),
                    };
                    next.extend(children.iter().copied().map(Some));
                } else if let Some(child) = self.lookup_quark(node, segment) {
                    next.push(Some(child));
                }
            }
            frontier = next;
        }
        let mut out: Vec<Quark> = frontier.into_iter().flatten().collect();
        out.sort_unstable();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quark_for_is_idempotent() {
        let mut tree = AttributeTree::new();
        let a = tree.quark_for(None, "host-a").unwrap();
        let again = tree.quark_for(None, "host-a").unwrap();
        assert_eq!(a, again);
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_quarks_are_dense_and_in_creation_order() {
        let mut tree = AttributeTree::new();
        let status = tree
            .quark_for_path(None, &["host-a", "1234", "5678", "status"])
            .unwrap();
        assert_eq!(status, Quark::new(3));
        let msg = tree.quark_for_path(None, &["host-a", "1234", "msg"]).unwrap();
        assert_eq!(msg, Quark::new(4));
    }

    #[test]
    fn test_same_name_under_different_parents() {
        let mut tree = AttributeTree::new();
        let a = tree.quark_for_path(None, &["a", "status"]).unwrap();
        let b = tree.quark_for_path(None, &["b", "status"]).unwrap();
        assert_ne!(a, b);
        assert_eq!(tree.name_of(a), Some("status"));
        assert_eq!(tree.name_of(b), Some("status"));
    }

    #[test]
    fn test_lookup_does_not_create() {
        let mut tree = AttributeTree::new();
        tree.quark_for_path(None, &["a", "b"]).unwrap();
        assert!(tree.lookup_path(None, &["a", "c"]).is_none());
        assert!(tree.lookup_quark(None, "zzz").is_none());
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn test_relative_resolution() {
        let mut tree = AttributeTree::new();
        let host = tree.quark_for(None, "host").unwrap();
        let status = tree.quark_for_path(Some(host), &["42", "status"]).unwrap();
        assert_eq!(tree.lookup_path(None, &["host", "42", "status"]), Some(status));
        assert_eq!(tree.quark_for_path::<&str>(Some(host), &[]).unwrap(), host);
    }

    #[test]
    fn test_empty_absolute_path_fails() {
        let mut tree = AttributeTree::new();
        let err = tree.quark_for_path::<&str>(None, &[]).unwrap_err();
        assert!(matches!(err, StateError::QuarkNotFound { .. }));
    }

    #[test]
    fn test_unknown_parent_is_rejected() {
        let mut tree = AttributeTree::new();
        let err = tree.quark_for(Some(Quark::new(9)), "x").unwrap_err();
        assert_eq!(
            err,
            StateError::InvalidQuark {
                quark: Quark::new(9)
            }
        );
        assert!(tree.is_empty());
    }

    #[test]
    fn test_parent_children_and_path() {
        let mut tree = AttributeTree::new();
        let status = tree.quark_for_path(None, &["host", "42", "status"]).unwrap();
        let pid = tree.parent_of(status).unwrap();
        let info = tree.quark_for(Some(pid), "info").unwrap();

        assert_eq!(tree.children_of(pid), &[status, info]);
        assert_eq!(tree.parent_of(tree.parent_of(pid).unwrap()), None);
        assert_eq!(tree.segments_of(status), vec!["host", "42", "status"]);
        assert_eq!(tree.path_of(info, '/').unwrap(), "host/42/info");
        assert_eq!(tree.path_of(Quark::new(99), '/'), None);
    }

    #[test]
    fn test_sub_attributes() {
        let mut tree = AttributeTree::new();
        let host = tree.quark_for(None, "host").unwrap();
        tree.quark_for_path(Some(host), &["1", "status"]).unwrap();
        tree.quark_for_path(Some(host), &["2", "status"]).unwrap();

        assert_eq!(tree.sub_attributes(host, false).len(), 2);
        assert_eq!(tree.sub_attributes(host, true).len(), 4);
    }

    #[test]
    fn test_wildcard_matching() {
        let mut tree = AttributeTree::new();
        let s1 = tree.quark_for_path(None, &["h1", "10", "status"]).unwrap();
        let s2 = tree.quark_for_path(None, &["h1", "11", "status"]).unwrap();
        let s3 = tree.quark_for_path(None, &["h2", "10", "status"]).unwrap();
        tree.quark_for_path(None, &["h2", "10", "info"]).unwrap();

        assert_eq!(tree.matching(None, &["*", "*", "status"]), vec![s1, s2, s3]);
        assert_eq!(tree.matching(None, &["h1", "*", "status"]), vec![s1, s2]);
        assert!(tree.matching(None, &["h3", "*"]).is_empty());
    }

    #[test]
    fn test_serde_round_trip_keeps_lookups() {
        let mut tree = AttributeTree::new();
        let q = tree.quark_for_path(None, &["bfd_fsm_sid", "001", "status"]).unwrap();
        let json = serde_json::to_string(&tree).unwrap();
        let restored: AttributeTree = serde_json::from_str(&json).unwrap();
        assert_eq!(
            restored.lookup_path(None, &["bfd_fsm_sid", "001", "status"]),
            Some(q)
        );
    }
}
