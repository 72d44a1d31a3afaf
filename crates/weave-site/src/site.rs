//! Site context: page tree, staleness, rendering, and publishing.
//!
//! [`Site`] is the explicit context every page operation goes through. Its
//! mutators keep derived state honest: anything that can change a page's
//! output marks that page stale, and anything that can change a page's path
//! also invalidates the cached URLs of the page and its descendants.

use std::collections::{HashMap, HashSet};

use weave_cache::CacheBucket;
use weave_content::{ComponentId, ContentSource};
use weave_template::{DEFAULT_MAX_DEPTH, ParsedComponentTree, TemplateError, TemplateParser};

use crate::digest::{Digest, DigestTracker, compute_digest};
use crate::page::{PageId, PageTree, TreeError};
use crate::path::{PathError, PathResolver, PathSettings, PathStyle};
use crate::publish::{CancelToken, PublishError, PublishSink, Publisher};

/// Error returned when a page cannot be rendered.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The page does not exist.
    #[error(transparent)]
    Tree(#[from] TreeError),
    /// Neither the page nor the site has a template.
    #[error("page {0} has no template")]
    NoTemplate(String),
    /// The page has no content component to render.
    #[error("page {0} has no content")]
    NoContent(String),
    /// The template failed to parse.
    #[error("failed to parse template of page {page}")]
    Template {
        /// Page being rendered.
        page: String,
        #[source]
        source: TemplateError,
    },
}

/// Site-wide settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SiteSettings {
    /// Inputs to path and URL computation.
    pub paths: PathSettings,
    /// Template for pages without their own.
    pub default_template: Option<String>,
    /// Maximum template block nesting.
    pub max_template_depth: usize,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            paths: PathSettings::default(),
            default_template: None,
            max_template_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// A rendered page.
#[derive(Debug)]
pub struct RenderedPage {
    /// Output HTML.
    pub html: String,
    /// The parsed template, for binding a live session.
    pub tree: ParsedComponentTree,
    /// Digest of `html`.
    pub digest: Digest,
}

/// Outcome of [`Site::publish`].
#[derive(Debug, Default)]
pub struct PublishReport {
    /// Pages whose output was written.
    pub written: Vec<String>,
    /// Stale pages whose output matched the last published digest. Committed
    /// without writing.
    pub unchanged: Vec<String>,
    /// Pages that were not stale.
    pub skipped_fresh: usize,
    /// Pages that failed; they stay stale.
    pub failed: Vec<(String, PublishError)>,
    /// Whether the run stopped early on cancellation.
    pub cancelled: bool,
}

/// Persisted digest storage.
struct DigestStore {
    bucket: Box<dyn CacheBucket>,
    etag: String,
}

/// Pages plus everything needed to render and publish them.
pub struct Site {
    tree: PageTree,
    settings: SiteSettings,
    tracker: DigestTracker,
    publisher: Publisher,
    /// Components reached by each page's last published render.
    rendered_components: HashMap<String, HashSet<ComponentId>>,
    store: Option<DigestStore>,
}

impl Site {
    /// Create a site over `tree`. Every page starts stale.
    #[must_use]
    pub fn new(tree: PageTree, settings: SiteSettings) -> Self {
        Self {
            tree,
            settings,
            tracker: DigestTracker::new(),
            publisher: Publisher::new(),
            rendered_components: HashMap::new(),
            store: None,
        }
    }

    /// Persist committed digests in `bucket` under `etag`, loading any that
    /// are already there.
    ///
    /// Digests written under a different etag are ignored, so changing the
    /// etag (e.g. the site version) forces a full republish.
    pub fn attach_digest_store(&mut self, bucket: Box<dyn CacheBucket>, etag: impl Into<String>) {
        let etag = etag.into();
        self.tracker.load(bucket.as_ref(), &etag);
        self.store = Some(DigestStore { bucket, etag });
    }

    /// The page tree.
    #[must_use]
    pub fn tree(&self) -> &PageTree {
        &self.tree
    }

    /// Site settings.
    #[must_use]
    pub fn settings(&self) -> &SiteSettings {
        &self.settings
    }

    /// Staleness and digests.
    #[must_use]
    pub fn tracker(&self) -> &DigestTracker {
        &self.tracker
    }

    /// The in-flight guard used by [`publish`](Self::publish).
    #[must_use]
    pub fn publisher(&self) -> &Publisher {
        &self.publisher
    }

    /// Path and URL computation over the current tree.
    #[must_use]
    pub fn paths(&self) -> PathResolver<'_> {
        PathResolver::new(&self.tree, &self.settings.paths)
    }

    /// Whether a page needs publishing.
    pub fn is_stale(&self, id: PageId) -> Result<bool, TreeError> {
        Ok(self.tracker.is_stale(self.tree.try_page(id)?.uid()))
    }

    /// Pages that need publishing, in storage order.
    #[must_use]
    pub fn stale_pages(&self) -> Vec<PageId> {
        self.tree
            .iter()
            .filter(|(_, page)| self.tracker.is_stale(page.uid()))
            .map(|(id, _)| id)
            .collect()
    }

    /// Mark a page stale.
    pub fn mark_stale(&mut self, id: PageId) -> Result<(), TreeError> {
        let uid = self.tree.try_page(id)?.uid().to_owned();
        self.tracker.mark_stale(&uid);
        Ok(())
    }

    /// Mark a page and all its descendants stale and drop their cached URLs.
    fn path_changed(&mut self, id: PageId) -> Result<(), TreeError> {
        self.tree.recursively_invalidate_url(id, true)?;
        self.mark_stale(id)?;
        for descendant in self.tree.descendants(id) {
            self.mark_stale(descendant)?;
        }
        Ok(())
    }

    /// Add a page under `parent`.
    ///
    /// The parent is marked stale; if it just became a collection its whole
    /// subtree changes path.
    pub fn add_page(
        &mut self,
        parent: PageId,
        uid: impl Into<String>,
        title: impl Into<String>,
    ) -> Result<PageId, TreeError> {
        let was_collection = self.tree.try_page(parent)?.is_collection();
        let id = self.tree.add_page(parent, uid, title)?;
        self.mark_stale(id)?;
        if was_collection {
            self.mark_stale(parent)?;
        } else {
            self.path_changed(parent)?;
        }
        Ok(id)
    }

    /// Remove a page and its subtree, forgetting their digests.
    pub fn remove_page(&mut self, id: PageId) -> Result<Vec<String>, TreeError> {
        let parent = self.tree.try_page(id)?.parent().ok_or(TreeError::RootImmutable)?;
        let removed = self.tree.remove_page(id)?;
        for uid in &removed {
            self.tracker.forget(uid);
            self.rendered_components.remove(uid);
        }
        if self.tree.try_page(parent)?.is_collection() {
            self.mark_stale(parent)?;
        } else {
            self.path_changed(parent)?;
        }
        Ok(removed)
    }

    /// Move a page under a new parent.
    pub fn move_page(&mut self, id: PageId, new_parent: PageId) -> Result<(), TreeError> {
        let old_parent = self.tree.try_page(id)?.parent().ok_or(TreeError::RootImmutable)?;
        let was_collection = self.tree.try_page(new_parent)?.is_collection();
        self.tree.move_page(id, new_parent)?;
        self.path_changed(id)?;
        if self.tree.try_page(old_parent)?.is_collection() {
            self.mark_stale(old_parent)?;
        } else {
            self.path_changed(old_parent)?;
        }
        if was_collection {
            self.mark_stale(new_parent)
        } else {
            self.path_changed(new_parent)
        }
    }

    /// Change a page's title. Without a custom file name this also renames
    /// the page.
    pub fn set_title(&mut self, id: PageId, title: impl Into<String>) -> Result<(), TreeError> {
        self.tree.set_title(id, title)?;
        if self.tree.try_page(id)?.custom_file_name().is_none() {
            self.path_changed(id)
        } else {
            self.mark_stale(id)
        }
    }

    /// Set or clear a page's custom file name.
    pub fn set_file_name(&mut self, id: PageId, name: Option<String>) -> Result<(), PathError> {
        self.tree.set_file_name(id, name)?;
        Ok(self.path_changed(id)?)
    }

    /// Set or clear a page's user-chosen extension.
    pub fn set_extension(&mut self, id: PageId, extension: Option<String>) -> Result<(), PathError> {
        self.tree.set_extension(id, extension)?;
        Ok(self.path_changed(id)?)
    }

    /// Offer a default extension; see [`PageTree::suggest_extension`].
    pub fn suggest_extension(&mut self, id: PageId, extension: &str) -> Result<bool, PathError> {
        let applied = self.tree.suggest_extension(id, extension)?;
        if applied {
            self.path_changed(id)?;
        }
        Ok(applied)
    }

    /// Set or clear a collection's path style.
    pub fn set_collection_style(&mut self, id: PageId, style: Option<PathStyle>) -> Result<(), TreeError> {
        self.tree.set_collection_style(id, style)?;
        self.path_changed(id)
    }

    /// Mark a page as a collection even while it has no children.
    pub fn set_is_collection(&mut self, id: PageId, collection: bool) -> Result<(), TreeError> {
        self.tree.set_is_collection(id, collection)?;
        self.path_changed(id)
    }

    /// Set or clear a page's custom path.
    pub fn set_custom_path(&mut self, id: PageId, path: Option<String>) -> Result<(), TreeError> {
        self.tree.set_custom_path(id, path)?;
        self.path_changed(id)
    }

    /// Set or clear a page's template.
    pub fn set_template(&mut self, id: PageId, template: Option<String>) -> Result<(), TreeError> {
        self.tree.set_template(id, template)?;
        self.mark_stale(id)
    }

    /// Set or clear a page's root content component.
    pub fn set_content(&mut self, id: PageId, content: Option<ComponentId>) -> Result<(), TreeError> {
        self.tree.set_content(id, content)?;
        self.mark_stale(id)
    }

    /// Record that a content component changed.
    ///
    /// Marks stale every page rooted at the component, and every page whose
    /// last published render reached it. Returns the pages marked.
    pub fn content_changed(&mut self, component: &ComponentId) -> Vec<PageId> {
        let mut affected = self.tree.pages_with_content(component);
        for (id, page) in self.tree.iter() {
            if !affected.contains(&id)
                && self
                    .rendered_components
                    .get(page.uid())
                    .is_some_and(|c| c.contains(component))
            {
                affected.push(id);
            }
        }
        for id in &affected {
            if let Some(page) = self.tree.page(*id) {
                self.tracker.mark_stale(page.uid());
            }
        }
        affected
    }

    /// Parse a page's template against its content and render it.
    ///
    /// # Errors
    ///
    /// Fails when the page has no template or content, or when its template
    /// is cyclic, too deep, or malformed. Unresolved key-paths only produce
    /// warnings on the returned tree.
    pub fn render_page<S: ContentSource + ?Sized>(
        &self,
        id: PageId,
        source: &S,
    ) -> Result<RenderedPage, RenderError> {
        let page = self.tree.try_page(id)?;
        let template = page
            .template()
            .or(self.settings.default_template.as_deref())
            .ok_or_else(|| RenderError::NoTemplate(page.uid().to_owned()))?;
        let content = page
            .content()
            .ok_or_else(|| RenderError::NoContent(page.uid().to_owned()))?;

        let tree = TemplateParser::new()
            .with_max_depth(self.settings.max_template_depth)
            .parse(template, content, source)
            .map_err(|source| RenderError::Template {
                page: page.uid().to_owned(),
                source,
            })?;
        let html = tree.render(source);
        let digest = compute_digest(html.as_bytes());

        tracing::debug!(page = page.uid(), nodes = tree.len(), %digest, "rendered page");
        Ok(RenderedPage { html, tree, digest })
    }

    /// Publish every stale page through `sink`.
    ///
    /// Each page is rendered and its digest compared with the last committed
    /// one. Output is written only when they differ; either way the new
    /// digest is committed and the page becomes fresh. Failed pages stay
    /// stale. Cancellation stops before the next page; pages already
    /// committed stay committed.
    pub fn publish<S: ContentSource + ?Sized>(
        &mut self,
        source: &S,
        sink: &dyn PublishSink,
        cancel: &CancelToken,
    ) -> PublishReport {
        let stale = self.stale_pages();
        let mut report = PublishReport {
            skipped_fresh: self.tree.len() - stale.len(),
            ..PublishReport::default()
        };

        for id in stale {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            let Some(uid) = self.tree.page(id).map(|p| p.uid().to_owned()) else {
                continue;
            };

            let ticket = match self.publisher.begin(&uid) {
                Ok(ticket) => ticket,
                Err(e) => {
                    report.failed.push((uid, e));
                    continue;
                }
            };

            let rendered = match self.render_page(id, source) {
                Ok(rendered) => rendered,
                Err(e) => {
                    tracing::warn!(page = %uid, error = %e, "failed to render page");
                    report.failed.push((uid, e.into()));
                    continue;
                }
            };
            let path = match self.paths().upload_path(id) {
                Ok(path) => path,
                Err(e) => {
                    report.failed.push((uid, RenderError::from(e).into()));
                    continue;
                }
            };

            if self.tracker.stored_digest(&uid) == Some(rendered.digest) {
                tracing::debug!(page = %uid, "output unchanged, skipping write");
                ticket.complete(&mut self.tracker, rendered.digest);
                report.unchanged.push(uid.clone());
            } else if let Err(source) = sink.write(&path, rendered.html.as_bytes()) {
                tracing::warn!(page = %uid, path = %path, error = %source, "failed to write page");
                report.failed.push((uid, PublishError::Write { path, source }));
                continue;
            } else {
                ticket.complete(&mut self.tracker, rendered.digest);
                report.written.push(uid.clone());
            }

            let components = rendered.tree.components_read().cloned().collect();
            self.rendered_components.insert(uid, components);
        }

        if let Some(store) = &self.store {
            self.tracker.persist(store.bucket.as_ref(), &store.etag);
        }
        tracing::debug!(
            written = report.written.len(),
            unchanged = report.unchanged.len(),
            failed = report.failed.len(),
            "publish finished"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::{fs, io};

    use pretty_assertions::assert_eq;
    use tempfile::TempDir;
    use weave_cache::{Cache, FileCache};
    use weave_content::{ContentModel, MemoryContent};

    use super::*;
    use crate::publish::FsSink;

    /// Sink that records writes in memory.
    #[derive(Default)]
    struct RecordingSink {
        writes: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    impl RecordingSink {
        fn paths(&self) -> Vec<String> {
            self.writes.lock().unwrap().iter().map(|(p, _)| p.clone()).collect()
        }
    }

    impl PublishSink for RecordingSink {
        fn write(&self, upload_path: &str, contents: &[u8]) -> io::Result<()> {
            if self.fail {
                return Err(io::Error::other("disk full"));
            }
            self.writes
                .lock()
                .unwrap()
                .push((upload_path.to_owned(), String::from_utf8_lossy(contents).into_owned()));
            Ok(())
        }
    }

    fn content() -> MemoryContent {
        MemoryContent::new()
            .with_component("home-body", "page")
            .with_property("home-body", "title", "Welcome")
            .with_component("guide-body", "page")
            .with_property("guide-body", "title", "Guide")
            .with_component("note", "text")
            .with_property("note", "text", "Remember")
            .with_subcomponent("guide-body", "note", "note")
    }

    /// Home -> Docs -> Guide, all with content.
    fn site() -> (Site, PageId, PageId) {
        let settings = SiteSettings {
            paths: PathSettings {
                base_url: "https://example.com".to_owned(),
                ..PathSettings::default()
            },
            default_template: Some("<h1 id=\"t\">{{title}}</h1>".to_owned()),
            ..SiteSettings::default()
        };
        let mut site = Site::new(PageTree::new("home", "Home"), settings);
        let root = site.tree().root();
        site.set_content(root, Some("home-body".into())).unwrap();
        let docs = site.add_page(root, "docs", "Docs").unwrap();
        site.set_content(docs, Some("home-body".into())).unwrap();
        let guide = site.add_page(docs, "guide", "Guide").unwrap();
        site.set_content(guide, Some("guide-body".into())).unwrap();
        site.set_template(guide, Some("<main id=\"m\">{{title}}{{#note}}<p>{{text}}</p>{{/note}}</main>".to_owned()))
            .unwrap();
        (site, docs, guide)
    }

    fn publish(site: &mut Site, content: &MemoryContent, sink: &dyn PublishSink) -> PublishReport {
        site.publish(content, sink, &CancelToken::new())
    }

    #[test]
    fn test_render_page() {
        let (site, _, guide) = site();
        let rendered = site.render_page(guide, &content()).unwrap();

        assert_eq!(rendered.html, "<main id=\"m\">Guide<div id=\"weave-1\"><p>Remember</p></div></main>");
        assert_eq!(rendered.digest, compute_digest(rendered.html.as_bytes()));
        assert_eq!(rendered.tree.len(), 2);
    }

    #[test]
    fn test_render_without_template_or_content() {
        let mut site = Site::new(PageTree::new("home", "Home"), SiteSettings::default());
        let root = site.tree().root();
        assert!(matches!(site.render_page(root, &content()), Err(RenderError::NoTemplate(_))));

        site.set_template(root, Some("x".to_owned())).unwrap();
        assert!(matches!(site.render_page(root, &content()), Err(RenderError::NoContent(_))));
    }

    #[test]
    fn test_render_cyclic_template_fails() {
        let (mut site, _, guide) = site();
        let content = content().with_subcomponent("note", "back", "guide-body");
        site.set_template(guide, Some("{{#note}}{{#back}}x{{/back}}{{/note}}".to_owned()))
            .unwrap();

        let err = site.render_page(guide, &content).unwrap_err();
        assert!(matches!(
            err,
            RenderError::Template { source: TemplateError::Cyclic { ref component }, .. } if component.as_str() == "guide-body"
        ));
    }

    #[test]
    fn test_publish_writes_stale_pages_and_commits() {
        let (mut site, ..) = site();
        let sink = RecordingSink::default();

        let report = publish(&mut site, &content(), &sink);
        assert_eq!(report.written, vec!["home", "docs", "guide"]);
        assert_eq!(sink.paths(), vec!["index.html", "docs/index.html", "docs/guide.html"]);
        assert!(report.failed.is_empty());
        assert!(site.stale_pages().is_empty());

        let again = publish(&mut site, &content(), &sink);
        assert!(again.written.is_empty());
        assert_eq!(again.skipped_fresh, 3);
    }

    #[test]
    fn test_unchanged_digest_skips_write_but_clears_staleness() {
        let (mut site, docs, _) = site();
        let sink = RecordingSink::default();
        publish(&mut site, &content(), &sink);

        site.mark_stale(docs).unwrap();
        let report = publish(&mut site, &content(), &sink);

        assert_eq!(report.unchanged, vec!["docs"]);
        assert!(report.written.is_empty());
        assert_eq!(sink.paths().len(), 3);
        assert!(!site.is_stale(docs).unwrap());
    }

    #[test]
    fn test_failed_write_leaves_page_stale() {
        let (mut site, _, guide) = site();
        let sink = RecordingSink {
            fail: true,
            ..RecordingSink::default()
        };

        let report = publish(&mut site, &content(), &sink);
        assert_eq!(report.failed.len(), 3);
        assert!(matches!(report.failed[0].1, PublishError::Write { .. }));
        assert!(site.is_stale(guide).unwrap());
    }

    #[test]
    fn test_cyclic_page_reported_and_others_publish() {
        let (mut site, _, guide) = site();
        let content = content().with_subcomponent("note", "back", "guide-body");
        site.set_template(guide, Some("{{#note}}{{#back}}x{{/back}}{{/note}}".to_owned()))
            .unwrap();
        let sink = RecordingSink::default();

        let report = publish(&mut site, &content, &sink);
        assert_eq!(report.written, vec!["home", "docs"]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "guide");
        assert!(site.is_stale(guide).unwrap());
    }

    #[test]
    fn test_in_flight_page_is_not_republished() {
        let (mut site, _, guide) = site();
        let ticket = site.publisher().begin("guide").unwrap();
        let sink = RecordingSink::default();

        let report = publish(&mut site, &content(), &sink);
        assert!(matches!(&report.failed[..], [(uid, PublishError::InFlight(_))] if uid == "guide"));
        assert!(site.is_stale(guide).unwrap());
        drop(ticket);
    }

    #[test]
    fn test_cancelled_publish_leaves_pages_stale() {
        let (mut site, ..) = site();
        let cancel = CancelToken::new();
        cancel.cancel();

        let report = site.publish(&content(), &RecordingSink::default(), &cancel);
        assert!(report.cancelled);
        assert!(report.written.is_empty());
        assert_eq!(site.stale_pages().len(), 3);
    }

    #[test]
    fn test_title_change_marks_subtree_and_invalidates_urls() {
        let (mut site, docs, guide) = site();
        publish(&mut site, &content(), &RecordingSink::default());
        assert_eq!(site.paths().url(guide).unwrap(), "https://example.com/docs/guide.html");

        site.set_title(docs, "Manual").unwrap();
        assert!(site.is_stale(docs).unwrap());
        assert!(site.is_stale(guide).unwrap());
        assert!(!site.is_stale(site.tree().root()).unwrap());
        assert_eq!(site.paths().url(guide).unwrap(), "https://example.com/manual/guide.html");
    }

    #[test]
    fn test_title_change_with_custom_name_marks_only_page() {
        let (mut site, docs, guide) = site();
        site.set_file_name(docs, Some("docs".to_owned())).unwrap();
        publish(&mut site, &content(), &RecordingSink::default());

        site.set_title(docs, "Manual").unwrap();
        assert!(site.is_stale(docs).unwrap());
        assert!(!site.is_stale(guide).unwrap());
    }

    #[test]
    fn test_style_change_invalidates_descendants() {
        let (mut site, docs, guide) = site();
        let before = site.paths().path_relative_to_site(docs).unwrap();
        site.paths().url(guide).unwrap();

        site.set_collection_style(docs, Some(PathStyle::IndexFile)).unwrap();
        assert!(site.tree().page(guide).unwrap().cached_url().is_none());
        assert_ne!(site.paths().path_relative_to_site(docs).unwrap(), before);
    }

    #[test]
    fn test_add_page_turns_leaf_into_collection() {
        let (mut site, _, guide) = site();
        publish(&mut site, &content(), &RecordingSink::default());
        assert_eq!(site.paths().upload_path(guide).unwrap(), "docs/guide.html");

        let step = site.add_page(guide, "step", "Step One").unwrap();
        assert!(site.is_stale(step).unwrap());
        assert!(site.is_stale(guide).unwrap());
        assert_eq!(site.paths().upload_path(guide).unwrap(), "docs/guide/index.html");
    }

    #[test]
    fn test_move_page() {
        let (mut site, docs, guide) = site();
        publish(&mut site, &content(), &RecordingSink::default());
        let root = site.tree().root();

        site.move_page(guide, root).unwrap();
        assert_eq!(site.paths().url(guide).unwrap(), "https://example.com/guide.html");
        assert!(site.is_stale(docs).unwrap());
        assert!(site.is_stale(root).unwrap());
        assert!(matches!(site.move_page(docs, docs), Err(TreeError::WouldCycle { .. })));
    }

    #[test]
    fn test_remove_page_forgets_digests() {
        let (mut site, docs, _) = site();
        publish(&mut site, &content(), &RecordingSink::default());

        let removed = site.remove_page(docs).unwrap();
        assert_eq!(removed, vec!["docs", "guide"]);
        assert_eq!(site.tracker().stored_digest("guide"), None);
        assert!(site.is_stale(site.tree().root()).unwrap());
    }

    #[test]
    fn test_content_changed_marks_rooted_and_reaching_pages() {
        let (mut site, docs, guide) = site();
        let mut content = content();
        publish(&mut site, &content, &RecordingSink::default());

        let change = content
            .set_property(&"note".into(), "text", "Forget".to_owned())
            .unwrap()
            .unwrap();
        let affected = site.content_changed(&change.component);
        assert_eq!(affected, vec![guide]);
        assert!(!site.is_stale(docs).unwrap());

        let affected = site.content_changed(&"home-body".into());
        assert_eq!(affected.len(), 2);
    }

    #[test]
    fn test_content_changed_covers_dotted_property_paths() {
        let (mut site, docs, guide) = site();
        site.set_template(docs, Some("<p id=\"p\">{{sidebar.heading}}</p>".to_owned()))
            .unwrap();
        let mut content = content()
            .with_component("sidebar", "sidebar")
            .with_property("sidebar", "heading", "Original")
            .with_subcomponent("home-body", "sidebar", "sidebar");
        let sink = RecordingSink::default();
        publish(&mut site, &content, &sink);

        let change = content
            .set_property(&"sidebar".into(), "heading", "Changed".to_owned())
            .unwrap()
            .unwrap();
        let affected = site.content_changed(&change.component);
        assert_eq!(affected, vec![docs]);
        assert!(!site.is_stale(guide).unwrap());

        let report = publish(&mut site, &content, &sink);
        assert_eq!(report.written, vec!["docs"]);
        let last = sink.writes.lock().unwrap().last().cloned().unwrap();
        assert_eq!(last, ("docs/index.html".to_owned(), "<p id=\"p\">Changed</p>".to_owned()));
    }

    #[test]
    fn test_digests_persist_across_sites() {
        let tmp = TempDir::new().unwrap();
        let cache = FileCache::new(tmp.path().join("cache"), "1");
        let out = tmp.path().join("out");

        let (mut first, ..) = site();
        first.attach_digest_store(cache.bucket("digests"), "site");
        let report = publish(&mut first, &content(), &FsSink::new(&out));
        assert_eq!(report.written.len(), 3);
        assert_eq!(fs::read_to_string(out.join("index.html")).unwrap(), "<h1 id=\"t\">Welcome</h1>");

        // Building the second site marks every page stale; the restored
        // digests still spare the writes.
        let (mut second, ..) = site();
        second.attach_digest_store(cache.bucket("digests"), "site");
        assert_eq!(second.stale_pages().len(), 3);
        let report = publish(&mut second, &content(), &FsSink::new(&out));
        assert_eq!(report.unchanged, vec!["home", "docs", "guide"]);
        assert!(report.written.is_empty());
    }
}
