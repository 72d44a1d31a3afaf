//! HTML rendering of parsed trees.

use weave_content::{ComponentId, ContentSource, KeyPath, Resolution};

use crate::tree::{NodeId, ParsedComponentTree, Segment};

/// Class carried by every rendered editable text element.
pub const TEXT_BLOCK_CLASS: &str = "weave-text";

impl ParsedComponentTree {
    /// Render the tree to HTML using current values from `source`.
    ///
    /// Literal markup is copied verbatim and property values are escaped.
    /// Nodes with a generated anchor are wrapped in `<div id="…">` so the
    /// anchor can be found in the DOM. Unresolved nodes render nothing.
    #[must_use]
    pub fn render<S: ContentSource + ?Sized>(&self, source: &S) -> String {
        let mut out = String::new();
        if !self.is_empty() {
            self.render_node(self.root(), source, &mut out);
        }
        out
    }

    /// Render a single node and its descendants. Empty for ids from another
    /// tree.
    #[must_use]
    pub fn render_subtree<S: ContentSource + ?Sized>(&self, id: NodeId, source: &S) -> String {
        let mut out = String::new();
        self.render_node(id, source, &mut out);
        out
    }

    fn render_node<S: ContentSource + ?Sized>(&self, id: NodeId, source: &S, out: &mut String) {
        let Some(node) = self.get(id) else {
            return;
        };
        let Some(component) = node.component() else {
            return;
        };

        if node.has_generated_anchor() {
            out.push_str("<div id=\"");
            out.push_str(&escape_html(node.div_id()));
            out.push_str("\">");
        }

        for segment in &node.segments {
            match segment {
                Segment::Literal(range) => out.push_str(&node.template()[range.clone()]),
                Segment::Property(path) => {
                    if let Some(value) = property_value(source, component, path) {
                        out.push_str(&escape_html(&value));
                    }
                }
                Segment::Child(child) => self.render_node(*child, source, out),
                Segment::Text(index) => {
                    let block = &node.text_blocks()[*index];
                    let value = property_value(source, component, &block.key_path).unwrap_or_default();
                    out.push_str(&format!(
                        "<span id=\"{}\" class=\"{TEXT_BLOCK_CLASS}\" data-key=\"{}\">{}</span>",
                        escape_html(&block.anchor),
                        escape_html(block.key_path.as_str()),
                        escape_html(&value),
                    ));
                }
            }
        }

        if node.has_generated_anchor() {
            out.push_str("</div>");
        }
    }
}

fn property_value<S: ContentSource + ?Sized>(
    source: &S,
    component: &ComponentId,
    path: &KeyPath,
) -> Option<String> {
    match source.resolve(component, path) {
        Resolution::Property { value, .. } => Some(value),
        Resolution::Component(_) | Resolution::Missing => None,
    }
}

/// Escape HTML special characters.
#[must_use]
pub fn escape_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#x27;"),
            _ => result.push(c),
        }
    }
    result
}
