//! Site structure and incremental publishing for Weave.
//!
//! A [`Site`] owns a [`PageTree`] and everything derived from it:
//!
//! - paths and URLs, computed by [`PathResolver`] and cached per page
//! - staleness and published digests, kept by [`DigestTracker`]
//! - the one-publish-per-page guard, held by [`Publisher`]
//!
//! Every mutation goes through [`Site`], which marks the affected pages stale
//! and invalidates cached URLs. [`Site::publish`] then renders stale pages,
//! writes those whose output changed to a [`PublishSink`], and commits their
//! digests.
//!
//! # Example
//!
//! ```
//! use weave_content::MemoryContent;
//! use weave_site::{CancelToken, PageTree, Site, SiteSettings};
//!
//! let content = MemoryContent::new()
//!     .with_component("home", "page")
//!     .with_property("home", "title", "Hello");
//! let mut site = Site::new(PageTree::new("home", "Home"), SiteSettings::default());
//! let root = site.tree().root();
//! site.set_template(root, Some("<h1 id=\"t\">{{title}}</h1>".to_owned())).unwrap();
//! site.set_content(root, Some("home".into())).unwrap();
//!
//! let rendered = site.render_page(root, &content).unwrap();
//! assert_eq!(rendered.html, "<h1 id=\"t\">Hello</h1>");
//! assert!(site.is_stale(root).unwrap());
//! ```

mod digest;
mod page;
mod path;
mod publish;
mod site;

pub use digest::{Digest, DigestTracker, compute_digest};
pub use page::{Page, PageId, PageTree, TreeError};
pub use path::{PathError, PathResolver, PathSettings, PathStyle};
pub use publish::{CancelToken, FsSink, PublishError, PublishSink, PublishTicket, Publisher};
pub use site::{PublishReport, RenderError, RenderedPage, Site, SiteSettings};
