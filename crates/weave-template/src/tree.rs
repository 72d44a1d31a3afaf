//! Parsed component tree.
//!
//! Nodes are stored in a flat `Vec` with parent/children relationships
//! tracked by [`NodeId`] indices. Children are owned by the tree; the parent
//! link is a plain index, so there is never a second owning reference and
//! no reference cycle to break.

use std::collections::{HashMap, HashSet};
use std::ops::Range;

use weave_content::{ComponentId, KeyPath};

use crate::error::ParseWarning;

/// Handle to a node in a [`ParsedComponentTree`].
///
/// Only meaningful for the tree that produced it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Position of the node in creation (pre-order) order.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// A key-path found directly in a node's own fragment.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ParsedKeyPath {
    /// The key-path as written.
    pub path: KeyPath,
    /// Whether it resolved against the node's component at parse time.
    pub resolved: bool,
}

/// An editable text region extracted from a node's fragment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextBlock {
    /// Property the block edits, relative to the node's component.
    pub key_path: KeyPath,
    /// Anchor of the rendered editable element.
    pub anchor: String,
    /// Byte range of the marker within the node's template.
    pub span: Range<usize>,
    /// Whether the property resolved at parse time.
    pub resolved: bool,
}

/// Rendering instruction recorded for a node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Segment {
    /// Byte range of literal markup within the node's template.
    Literal(Range<usize>),
    Property(KeyPath),
    Child(NodeId),
    /// Index into the node's text blocks.
    Text(usize),
}

/// A component matched to a fragment of the template.
#[derive(Clone, Debug)]
pub struct ParsedComponentNode {
    pub(crate) component: Option<ComponentId>,
    pub(crate) template: String,
    pub(crate) div_id: String,
    pub(crate) generated_anchor: bool,
    pub(crate) key_paths: Vec<ParsedKeyPath>,
    pub(crate) text_blocks: Vec<TextBlock>,
    pub(crate) segments: Vec<Segment>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) parent: Option<NodeId>,
}

impl ParsedComponentNode {
    /// The content component this node represents.
    ///
    /// `None` when the marker that created the node did not resolve.
    #[must_use]
    pub fn component(&self) -> Option<&ComponentId> {
        self.component.as_ref()
    }

    /// The verbatim template fragment matched to this node.
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Anchor identifier of the node's DOM element. Empty when unresolved.
    #[must_use]
    pub fn div_id(&self) -> &str {
        &self.div_id
    }

    /// True when the anchor was generated rather than read from the fragment,
    /// in which case rendering wraps the fragment in an anchor element.
    #[must_use]
    pub fn has_generated_anchor(&self) -> bool {
        self.generated_anchor
    }

    /// True when the marker that created this node did not resolve.
    #[must_use]
    pub fn is_unresolved(&self) -> bool {
        self.component.is_none()
    }

    /// Key-paths found directly in this node's fragment.
    #[must_use]
    pub fn parsed_key_paths(&self) -> &[ParsedKeyPath] {
        &self.key_paths
    }

    /// Editable text blocks found directly in this node's fragment.
    #[must_use]
    pub fn text_blocks(&self) -> &[TextBlock] {
        &self.text_blocks
    }

    /// Direct children.
    #[must_use]
    pub fn subcomponents(&self) -> &[NodeId] {
        &self.children
    }

    /// Parent node, `None` for the root.
    #[must_use]
    pub fn supercomponent(&self) -> Option<NodeId> {
        self.parent
    }

    pub(crate) fn add_parsed_key_path(&mut self, path: KeyPath, resolved: bool) {
        if let Some(existing) = self.key_paths.iter_mut().find(|k| k.path == path) {
            existing.resolved |= resolved;
        } else {
            self.key_paths.push(ParsedKeyPath { path, resolved });
        }
    }
}

/// Hierarchy of parsed components produced by one parse.
///
/// Every parse builds a fresh tree; nodes are never shared between trees.
#[derive(Clone, Debug)]
pub struct ParsedComponentTree {
    pub(crate) nodes: Vec<ParsedComponentNode>,
    pub(crate) anchors: HashMap<String, NodeId>,
    pub(crate) text_anchors: HashMap<String, (NodeId, usize)>,
    pub(crate) by_component: HashMap<ComponentId, Vec<NodeId>>,
    /// Every component a marker's key-path walked through.
    pub(crate) components_read: HashSet<ComponentId>,
    pub(crate) warnings: Vec<ParseWarning>,
    pub(crate) next_anchor: usize,
}

impl ParsedComponentTree {
    pub(crate) fn empty() -> Self {
        Self {
            nodes: Vec::new(),
            anchors: HashMap::new(),
            text_anchors: HashMap::new(),
            by_component: HashMap::new(),
            components_read: HashSet::new(),
            warnings: Vec::new(),
            next_anchor: 0,
        }
    }

    /// The root node, bound to the component the template was parsed against.
    #[must_use]
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Borrow a node.
    ///
    /// # Panics
    ///
    /// Panics if `id` did not come from this tree.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &ParsedComponentNode {
        &self.nodes[id.0]
    }

    /// Borrow a node, returning `None` for foreign ids.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&ParsedComponentNode> {
        self.nodes.get(id.0)
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: a parsed tree has at least its root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate over all nodes in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &ParsedComponentNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    /// Warnings collected while parsing.
    #[must_use]
    pub fn warnings(&self) -> &[ParseWarning] {
        &self.warnings
    }

    /// Transitive closure of `id`'s children, excluding `id` itself.
    ///
    /// Returned in pre-order. Each call walks the tree afresh. Empty for ids
    /// from another tree.
    #[must_use]
    pub fn all_subcomponents(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let Some(node) = self.get(id) else {
            return result;
        };
        let mut stack: Vec<NodeId> = node.children.iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            result.push(next);
            stack.extend(self.nodes[next.0].children.iter().rev().copied());
        }
        result
    }

    /// Ancestors of `id`, nearest parent first, ending at the root.
    ///
    /// Never contains `id` itself; empty for the root and for ids from
    /// another tree.
    #[must_use]
    pub fn all_supercomponents(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut current = self.get(id).and_then(|n| n.parent);
        while let Some(parent) = current {
            result.push(parent);
            current = self.nodes[parent.0].parent;
        }
        result
    }

    /// Find the node bound to `component` whose fragment is `template`.
    ///
    /// When several nodes match, the earliest created one is returned, so the
    /// same pair always maps to the same node.
    #[must_use]
    pub fn component_with_component_and_template(
        &self,
        component: &ComponentId,
        template: &str,
    ) -> Option<NodeId> {
        self.by_component
            .get(component)?
            .iter()
            .copied()
            .find(|id| self.nodes[id.0].template == template)
    }

    /// All nodes bound to `component`, in creation order.
    #[must_use]
    pub fn nodes_for_component(&self, component: &ComponentId) -> &[NodeId] {
        self.by_component
            .get(component)
            .map_or(&[], Vec::as_slice)
    }

    /// Components the rendered output depends on.
    ///
    /// Covers every node's component plus every component a dotted key-path
    /// passes through, so `{{sidebar.heading}}` reports `sidebar` even
    /// though no node is bound to it. A path that stopped resolving part way
    /// still reports the components it reached.
    pub fn components_read(&self) -> impl Iterator<Item = &ComponentId> {
        self.by_component
            .keys()
            .chain(self.components_read.iter().filter(|c| !self.by_component.contains_key(*c)))
    }

    /// Node whose anchor is `anchor`.
    #[must_use]
    pub fn node_for_anchor(&self, anchor: &str) -> Option<NodeId> {
        self.anchors.get(anchor).copied()
    }

    /// Text block whose anchor is `anchor`, with the node that owns it.
    #[must_use]
    pub fn text_block_for_anchor(&self, anchor: &str) -> Option<(NodeId, &TextBlock)> {
        let &(node, index) = self.text_anchors.get(anchor)?;
        Some((node, &self.nodes[node.0].text_blocks[index]))
    }

    fn is_anchor_taken(&self, anchor: &str) -> bool {
        self.anchors.contains_key(anchor) || self.text_anchors.contains_key(anchor)
    }

    /// Reserve an anchor for a node, generating one if `preferred` is absent
    /// or already taken. Returns the anchor and whether it was generated.
    pub(crate) fn claim_anchor(&mut self, preferred: Option<&str>, id: NodeId) -> (String, bool) {
        if let Some(anchor) = preferred
            && !self.is_anchor_taken(anchor)
        {
            self.anchors.insert(anchor.to_owned(), id);
            return (anchor.to_owned(), false);
        }
        let anchor = self.generate_anchor("weave");
        self.anchors.insert(anchor.clone(), id);
        (anchor, true)
    }

    /// Generate a fresh anchor that collides with no claimed one.
    pub(crate) fn generate_anchor(&mut self, prefix: &str) -> String {
        loop {
            self.next_anchor += 1;
            let candidate = format!("{prefix}-{}", self.next_anchor);
            if !self.is_anchor_taken(&candidate) {
                return candidate;
            }
        }
    }
}
