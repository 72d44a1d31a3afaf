//! Template parsing.
//!
//! [`TemplateParser`] performs a single depth-first descent over the marker
//! tokens of a template. Each block marker resolves a key-path against the
//! current node's component and recursively parses the enclosed fragment
//! against the resulting sub-component, attaching the new node as a child.
//! Because nodes are only ever appended below the node currently being
//! parsed, the resulting structure is a tree by construction.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use weave_content::{ComponentId, ContentSource, KeyPath, Resolution};

use crate::error::{ParseWarning, TemplateError};
use crate::lexer::{self, Lexed, TokenKind};
use crate::tree::{NodeId, ParsedComponentNode, ParsedComponentTree, Segment, TextBlock};

/// Default limit on block nesting.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// `id` attribute of the element a fragment starts with.
static LEADING_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*<[A-Za-z][A-Za-z0-9-]*(?:\s[^>]*?)?\sid\s*=\s*["']([^"']+)["']"#)
        .expect("invalid leading id regex")
});

/// Parses templates into [`ParsedComponentTree`]s.
#[derive(Clone, Copy, Debug)]
pub struct TemplateParser {
    max_depth: usize,
}

impl Default for TemplateParser {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl TemplateParser {
    /// Create a parser with the default depth limit.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum block nesting depth.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// The configured maximum nesting depth.
    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Parse `template` against `root`.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Cyclic`] if a block addresses one of its own
    /// ancestors, [`TemplateError::TooDeep`] if nesting exceeds the limit, and
    /// [`TemplateError::Syntax`] for malformed markers.
    pub fn parse<S: ContentSource + ?Sized>(
        &self,
        template: &str,
        root: &ComponentId,
        source: &S,
    ) -> Result<ParsedComponentTree, TemplateError> {
        let lexed = lexer::lex(template)?;
        let mut tree = ParsedComponentTree::empty();

        let mut state = ParseState {
            source,
            template,
            lexed: &lexed,
            tree: &mut tree,
            ancestors: Vec::new(),
            max_depth: self.max_depth,
        };
        state.parse_component(root.clone(), 0..template.len(), 0..lexed.tokens.len(), None, 0)?;

        tracing::debug!(
            root = %root,
            nodes = tree.len(),
            warnings = tree.warnings.len(),
            "parsed template"
        );
        Ok(tree)
    }
}

impl ParsedComponentTree {
    /// Find the node for `(component, template)`, parsing it on demand.
    ///
    /// Used for incremental re-binding: if a node matching the pair exists it
    /// is returned unchanged, otherwise `template` is parsed against
    /// `component` and attached as a new child of `parent`. The tree is left
    /// untouched when parsing fails.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::UnknownNode`] if `parent` is not a node of
    /// this tree. Otherwise the same as [`TemplateParser::parse`]; cycle
    /// detection covers the chain from `parent` up to the root.
    pub fn find_or_parse<S: ContentSource + ?Sized>(
        &mut self,
        parent: NodeId,
        component: &ComponentId,
        template: &str,
        source: &S,
        parser: &TemplateParser,
    ) -> Result<NodeId, TemplateError> {
        if self.get(parent).is_none() {
            return Err(TemplateError::UnknownNode(parent));
        }
        if let Some(existing) = self.component_with_component_and_template(component, template) {
            return Ok(existing);
        }

        let mut chain: Vec<NodeId> = self.all_supercomponents(parent);
        chain.reverse();
        chain.push(parent);
        let ancestors: Vec<ComponentId> = chain
            .iter()
            .filter_map(|id| self.get(*id).and_then(|n| n.component().cloned()))
            .collect();
        let depth = chain.len();

        let lexed = lexer::lex(template)?;
        let mut scratch = self.clone();
        let mut state = ParseState {
            source,
            template,
            lexed: &lexed,
            tree: &mut scratch,
            ancestors,
            max_depth: parser.max_depth,
        };
        let id = state.parse_component(
            component.clone(),
            0..template.len(),
            0..lexed.tokens.len(),
            Some(parent),
            depth,
        )?;

        *self = scratch;
        Ok(id)
    }
}

/// Mutable state of one descent.
struct ParseState<'a, S: ContentSource + ?Sized> {
    source: &'a S,
    template: &'a str,
    lexed: &'a Lexed,
    tree: &'a mut ParsedComponentTree,
    /// Components on the path from the root to the node being parsed.
    ancestors: Vec<ComponentId>,
    max_depth: usize,
}

impl<S: ContentSource + ?Sized> ParseState<'_, S> {
    /// Create a node for `component` over `range` and parse its tokens.
    fn parse_component(
        &mut self,
        component: ComponentId,
        range: Range<usize>,
        tokens: Range<usize>,
        parent: Option<NodeId>,
        depth: usize,
    ) -> Result<NodeId, TemplateError> {
        if depth > self.max_depth {
            return Err(TemplateError::TooDeep {
                limit: self.max_depth,
            });
        }
        if self.ancestors.contains(&component) {
            return Err(TemplateError::Cyclic { component });
        }

        let fragment = &self.template[range.clone()];
        let id = self.push_node(Some(component.clone()), fragment, parent);

        let preferred = leading_id(fragment);
        let (anchor, generated) = self.tree.claim_anchor(preferred, id);
        self.tree.nodes[id.0].div_id = anchor;
        self.tree.nodes[id.0].generated_anchor = generated;
        self.tree
            .by_component
            .entry(component.clone())
            .or_default()
            .push(id);

        self.ancestors.push(component);
        let result = self.parse_tokens(id, range.start, tokens, depth);
        self.ancestors.pop();
        result?;

        Ok(id)
    }

    /// Walk the tokens directly inside node `id`.
    fn parse_tokens(
        &mut self,
        id: NodeId,
        base: usize,
        tokens: Range<usize>,
        depth: usize,
    ) -> Result<(), TemplateError> {
        let Some(component) = self.tree.nodes[id.0].component.clone() else {
            return Ok(());
        };

        let mut segments = Vec::new();
        let mut i = tokens.start;
        while i < tokens.end {
            let token = &self.lexed.tokens[i];
            let span = token.span.start - base..token.span.end - base;

            match &token.kind {
                TokenKind::Literal => segments.push(Segment::Literal(span)),
                TokenKind::Comment | TokenKind::BlockEnd(_) => {}
                TokenKind::Property(path) => {
                    self.record_walk(&component, path);
                    let resolved = matches!(
                        self.source.resolve(&component, path),
                        Resolution::Property { .. }
                    );
                    if !resolved {
                        self.warn_unresolved(&component, path);
                    }
                    self.tree.nodes[id.0].add_parsed_key_path(path.clone(), resolved);
                    segments.push(Segment::Property(path.clone()));
                }
                TokenKind::Text(path) => {
                    self.record_walk(&component, path);
                    let resolved = matches!(
                        self.source.resolve(&component, path),
                        Resolution::Property { .. }
                    );
                    if !resolved {
                        self.warn_unresolved(&component, path);
                    }
                    let index = self.add_text_block(id, path.clone(), span, resolved);
                    segments.push(Segment::Text(index));
                }
                TokenKind::BlockStart(path) => {
                    let end = self
                        .lexed
                        .block_end(i)
                        .ok_or_else(|| TemplateError::syntax(token.span.start, "unmatched block"))?;
                    let inner = token.span.end..self.lexed.tokens[end].span.start;
                    let child =
                        self.parse_block(&component, path, id, inner, i + 1..end, depth)?;
                    segments.push(Segment::Child(child));
                    i = end;
                }
            }
            i += 1;
        }

        self.tree.nodes[id.0].segments = segments;
        Ok(())
    }

    /// Resolve a block marker and parse its fragment into a child node.
    fn parse_block(
        &mut self,
        component: &ComponentId,
        path: &KeyPath,
        parent: NodeId,
        inner: Range<usize>,
        tokens: Range<usize>,
        depth: usize,
    ) -> Result<NodeId, TemplateError> {
        self.record_walk(component, path);
        let resolution = self.source.resolve(component, path);
        let resolved = matches!(resolution, Resolution::Component(_));
        self.tree.nodes[parent.0].add_parsed_key_path(path.clone(), resolved);

        if let Resolution::Component(sub) = resolution {
            return self.parse_component(sub, inner, tokens, Some(parent), depth + 1);
        }

        // Keep the node so the page renders with a gap where the block was.
        self.warn_unresolved(component, path);
        let fragment = &self.template[inner];
        Ok(self.push_node(None, fragment, Some(parent)))
    }

    /// Note every component `path` passes through from `component`.
    fn record_walk(&mut self, component: &ComponentId, path: &KeyPath) {
        let mut current = component.clone();
        for segment in path.segments() {
            let Some(next) = self.source.subcomponent(&current, segment) else {
                break;
            };
            self.tree.components_read.insert(next.clone());
            current = next;
        }
    }

    fn push_node(
        &mut self,
        component: Option<ComponentId>,
        fragment: &str,
        parent: Option<NodeId>,
    ) -> NodeId {
        let id = NodeId(self.tree.nodes.len());
        self.tree.nodes.push(ParsedComponentNode {
            component,
            template: fragment.to_owned(),
            div_id: String::new(),
            generated_anchor: false,
            key_paths: Vec::new(),
            text_blocks: Vec::new(),
            segments: Vec::new(),
            children: Vec::new(),
            parent,
        });
        if let Some(parent) = parent {
            self.tree.nodes[parent.0].children.push(id);
        }
        id
    }

    fn add_text_block(
        &mut self,
        id: NodeId,
        key_path: KeyPath,
        span: Range<usize>,
        resolved: bool,
    ) -> usize {
        let anchor = self.tree.generate_anchor("weave-text");
        let index = self.tree.nodes[id.0].text_blocks.len();
        self.tree.text_anchors.insert(anchor.clone(), (id, index));
        self.tree.nodes[id.0].text_blocks.push(TextBlock {
            key_path,
            anchor,
            span,
            resolved,
        });
        index
    }

    fn warn_unresolved(&mut self, component: &ComponentId, path: &KeyPath) {
        tracing::warn!(component = %component, key_path = %path, "unresolved key path in template");
        self.tree.warnings.push(ParseWarning::UnresolvedKeyPath {
            component: component.clone(),
            key_path: path.clone(),
        });
    }
}

/// `id` attribute of the element `fragment` starts with, if any.
/// Literal `id` of the element `fragment` starts with.
///
/// An id built from markers is only known after rendering, so it cannot
/// serve as an anchor.
fn leading_id(fragment: &str) -> Option<&str> {
    LEADING_ID_PATTERN
        .captures(fragment)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .filter(|id| !id.contains(lexer::OPEN))
}
