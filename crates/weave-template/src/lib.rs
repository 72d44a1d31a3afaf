//! Template parsing for Weave.
//!
//! Parses a page template against a content component tree and produces a
//! [`ParsedComponentTree`]: one node per component reached through the
//! template's block markers, each carrying the template fragment it was
//! matched to, a DOM anchor, and the key-paths it reads.
//!
//! # Marker syntax
//!
//! | Marker | Meaning |
//! |--------|---------|
//! | `{{key.path}}` | Property value, HTML-escaped |
//! | `{{#key.path}}…{{/key.path}}` | Nested component block |
//! | `{{text key.path}}` | Editable text block |
//! | `{{! … }}` | Comment |
//!
//! # Example
//!
//! ```
//! use weave_content::MemoryContent;
//! use weave_template::TemplateParser;
//!
//! let content = MemoryContent::new()
//!     .with_component("home", "page")
//!     .with_property("home", "title", "Hello");
//!
//! let tree = TemplateParser::new()
//!     .parse("<div id='x'>{{title}}</div>", &"home".into(), &content)
//!     .unwrap();
//!
//! assert_eq!(tree.node(tree.root()).div_id(), "x");
//! assert_eq!(tree.render(&content), "<div id='x'>Hello</div>");
//! ```

mod error;
mod lexer;
mod parser;
mod render;
mod tree;

pub use error::{ParseWarning, TemplateError};
pub use parser::{DEFAULT_MAX_DEPTH, TemplateParser};
pub use render::{TEXT_BLOCK_CLASS, escape_html};
pub use tree::{NodeId, ParsedComponentNode, ParsedComponentTree, ParsedKeyPath, TextBlock};
