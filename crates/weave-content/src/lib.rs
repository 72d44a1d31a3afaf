//! Content component protocol for Weave.
//!
//! Templates are parsed against, and live previews are bound to, a tree of
//! content components. This crate defines the capability set the rest of the
//! engine depends on, independent of any concrete component type:
//!
//! - [`ContentSource`]: read access to named properties and sub-components
//! - [`ContentModel`]: write access that emits [`ContentChange`] notifications
//! - [`KeyPath`]: dotted address of a property or sub-component
//!
//! [`MemoryContent`] is a map-backed implementation used by the CLI manifest
//! loader and throughout the test suites.
//!
//! # Example
//!
//! ```
//! use weave_content::{ComponentId, ContentSource, KeyPath, MemoryContent, Resolution};
//!
//! let content = MemoryContent::new()
//!     .with_component("home", "page")
//!     .with_property("home", "title", "Hello")
//!     .with_component("intro", "text")
//!     .with_subcomponent("home", "intro", "intro");
//!
//! let home = ComponentId::from("home");
//! let path: KeyPath = "title".parse().unwrap();
//! assert!(matches!(content.resolve(&home, &path), Resolution::Property { .. }));
//! ```

mod id;
mod memory;
mod source;

pub use id::{ComponentId, KeyPath, KeyPathError};
pub use memory::{ComponentRecord, MemoryContent};
pub use source::{ContentChange, ContentError, ContentModel, ContentSource, Resolution};
