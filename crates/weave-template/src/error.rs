//! Parse errors and warnings.

use std::fmt;

use weave_content::{ComponentId, KeyPath};

use crate::tree::NodeId;

/// Error that aborts a single parse call.
///
/// Errors never leave a partially built tree behind: the caller receives
/// either a complete [`ParsedComponentTree`](crate::ParsedComponentTree) or
/// one of these.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    /// A block marker addressed a component that is already one of its
    /// own ancestors in the parse.
    #[error("cyclic template: component {component} is referenced inside its own fragment")]
    Cyclic {
        /// The component that repeated.
        component: ComponentId,
    },
    /// Block nesting went deeper than the parser's configured limit.
    #[error("template nesting exceeds the maximum depth of {limit}")]
    TooDeep {
        /// The configured limit.
        limit: usize,
    },
    /// A node id passed in does not belong to the tree.
    #[error("node {} does not belong to this tree", .0.index())]
    UnknownNode(NodeId),
    /// Malformed marker syntax.
    #[error("template syntax error at byte {offset}: {message}")]
    Syntax {
        /// Byte offset of the offending marker in the parsed text.
        offset: usize,
        /// Description of the problem.
        message: String,
    },
}

impl TemplateError {
    pub(crate) fn syntax(offset: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            offset,
            message: message.into(),
        }
    }
}

/// Non-fatal problem found while parsing.
///
/// The page still renders; the affected marker produces a gap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseWarning {
    /// A marker's key-path did not resolve against its component.
    UnresolvedKeyPath {
        /// Component the key-path was resolved against.
        component: ComponentId,
        /// The key-path as written in the marker.
        key_path: KeyPath,
    },
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnresolvedKeyPath {
                component,
                key_path,
            } => write!(f, "unresolved key path {key_path} on component {component}"),
        }
    }
}
