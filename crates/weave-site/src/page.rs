//! Page hierarchy.
//!
//! Pages are stored in a flat `Vec` addressed by [`PageId`], with parent and
//! children tracked by index. The parent link never owns anything, so moving
//! or removing a subtree is plain index bookkeeping. Removed pages leave an
//! empty slot behind; their ids stop resolving.

use std::cell::OnceCell;
use std::collections::HashMap;

use weave_content::ComponentId;

use crate::path::PathStyle;

/// Handle to a page in a [`PageTree`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(pub(crate) usize);

/// Error from a structural change to a [`PageTree`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    /// Another page already uses this identifier.
    #[error("duplicate page id: {0}")]
    DuplicateId(String),
    /// The page handle does not resolve (never existed or was removed).
    #[error("unknown page: {0:?}")]
    UnknownPage(PageId),
    /// Moving the page would make it its own ancestor.
    #[error("cannot move page {page} under its own descendant {target}")]
    WouldCycle {
        /// Page being moved.
        page: String,
        /// Requested new parent.
        target: String,
    },
    /// The root cannot be moved or removed.
    #[error("the root page cannot be moved or removed")]
    RootImmutable,
}

/// A page and its publishing attributes.
#[derive(Debug, Clone)]
pub struct Page {
    pub(crate) uid: String,
    pub(crate) title: String,
    pub(crate) parent: Option<PageId>,
    pub(crate) children: Vec<PageId>,
    pub(crate) file_name: Option<String>,
    pub(crate) extension: Option<String>,
    pub(crate) extension_editable: bool,
    pub(crate) custom_path: Option<String>,
    pub(crate) collection_style: Option<PathStyle>,
    pub(crate) marked_collection: bool,
    pub(crate) template: Option<String>,
    pub(crate) content: Option<ComponentId>,
    pub(crate) url: OnceCell<String>,
}

impl Page {
    fn new(uid: String, title: String, parent: Option<PageId>) -> Self {
        Self {
            uid,
            title,
            parent,
            children: Vec::new(),
            file_name: None,
            extension: None,
            extension_editable: false,
            custom_path: None,
            collection_style: None,
            marked_collection: false,
            template: None,
            content: None,
            url: OnceCell::new(),
        }
    }

    /// Unique, immutable identifier.
    #[must_use]
    pub fn uid(&self) -> &str {
        &self.uid
    }

    /// Display title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Parent page, `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<PageId> {
        self.parent
    }

    /// Child pages in order.
    #[must_use]
    pub fn children(&self) -> &[PageId] {
        &self.children
    }

    /// Whether this page publishes as a directory.
    #[must_use]
    pub fn is_collection(&self) -> bool {
        self.marked_collection || !self.children.is_empty()
    }

    /// Whether this is the root page.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// User-chosen file name, if any.
    #[must_use]
    pub fn custom_file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    /// Custom path extension, if any.
    #[must_use]
    pub fn custom_extension(&self) -> Option<&str> {
        self.extension.as_deref()
    }

    /// Whether the extension was chosen by the user.
    #[must_use]
    pub fn file_extension_is_editable(&self) -> bool {
        self.extension_editable
    }

    /// Custom path relative to the site root, overriding the computed one.
    #[must_use]
    pub fn custom_path(&self) -> Option<&str> {
        self.custom_path.as_deref()
    }

    /// Per-collection override of the site's path style.
    #[must_use]
    pub fn collection_style(&self) -> Option<PathStyle> {
        self.collection_style
    }

    /// Page main content template, if not using the site default.
    #[must_use]
    pub fn template(&self) -> Option<&str> {
        self.template.as_deref()
    }

    /// Root content component rendered into the template.
    #[must_use]
    pub fn content(&self) -> Option<&ComponentId> {
        self.content.as_ref()
    }

    /// URL computed by the last [`url`](crate::PathResolver::url) call, if
    /// still valid.
    #[must_use]
    pub fn cached_url(&self) -> Option<&str> {
        self.url.get().map(String::as_str)
    }
}

/// Hierarchy of pages with exactly one root.
#[derive(Debug, Clone)]
pub struct PageTree {
    pages: Vec<Option<Page>>,
    uid_index: HashMap<String, PageId>,
}

impl PageTree {
    /// Create a tree holding only a root page.
    #[must_use]
    pub fn new(root_uid: impl Into<String>, title: impl Into<String>) -> Self {
        let uid = root_uid.into();
        let mut uid_index = HashMap::new();
        uid_index.insert(uid.clone(), PageId(0));
        Self {
            pages: vec![Some(Page::new(uid, title.into(), None))],
            uid_index,
        }
    }

    /// The root page.
    #[must_use]
    pub fn root(&self) -> PageId {
        PageId(0)
    }

    /// Borrow a page.
    #[must_use]
    pub fn page(&self, id: PageId) -> Option<&Page> {
        self.pages.get(id.0)?.as_ref()
    }

    /// Borrow a page or fail with [`TreeError::UnknownPage`].
    pub fn try_page(&self, id: PageId) -> Result<&Page, TreeError> {
        self.page(id).ok_or(TreeError::UnknownPage(id))
    }

    pub(crate) fn page_mut(&mut self, id: PageId) -> Result<&mut Page, TreeError> {
        self.pages
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(TreeError::UnknownPage(id))
    }

    /// Look a page up by its identifier.
    #[must_use]
    pub fn by_uid(&self, uid: &str) -> Option<PageId> {
        self.uid_index.get(uid).copied()
    }

    /// Number of live pages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.uid_index.len()
    }

    /// Always false: a tree has at least its root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.uid_index.is_empty()
    }

    /// Iterate over live pages in storage order.
    pub fn iter(&self) -> impl Iterator<Item = (PageId, &Page)> {
        self.pages
            .iter()
            .enumerate()
            .filter_map(|(i, p)| p.as_ref().map(|p| (PageId(i), p)))
    }

    /// Add a page as the last child of `parent`.
    pub fn add_page(
        &mut self,
        parent: PageId,
        uid: impl Into<String>,
        title: impl Into<String>,
    ) -> Result<PageId, TreeError> {
        let uid = uid.into();
        if self.uid_index.contains_key(&uid) {
            return Err(TreeError::DuplicateId(uid));
        }
        self.try_page(parent)?;

        let id = PageId(self.pages.len());
        self.pages.push(Some(Page::new(uid.clone(), title.into(), Some(parent))));
        self.uid_index.insert(uid, id);
        self.page_mut(parent)?.children.push(id);
        Ok(id)
    }

    /// Remove a page and its whole subtree. Returns the removed identifiers,
    /// the page's own first.
    pub fn remove_page(&mut self, id: PageId) -> Result<Vec<String>, TreeError> {
        let parent = self.try_page(id)?.parent.ok_or(TreeError::RootImmutable)?;

        let mut doomed = vec![id];
        doomed.extend(self.descendants(id));
        self.page_mut(parent)?.children.retain(|c| *c != id);

        let mut removed = Vec::with_capacity(doomed.len());
        for page in doomed {
            if let Some(page) = self.pages[page.0].take() {
                self.uid_index.remove(&page.uid);
                removed.push(page.uid);
            }
        }
        Ok(removed)
    }

    /// Re-parent a page, appending it to `new_parent`'s children.
    pub fn move_page(&mut self, id: PageId, new_parent: PageId) -> Result<(), TreeError> {
        let old_parent = self.try_page(id)?.parent.ok_or(TreeError::RootImmutable)?;
        let target = self.try_page(new_parent)?;
        if new_parent == id || self.is_descendant_of(new_parent, id) {
            return Err(TreeError::WouldCycle {
                page: self.try_page(id)?.uid.clone(),
                target: target.uid.clone(),
            });
        }

        self.page_mut(old_parent)?.children.retain(|c| *c != id);
        self.page_mut(new_parent)?.children.push(id);
        self.page_mut(id)?.parent = Some(new_parent);
        Ok(())
    }

    /// Whether `ancestor` lies on `id`'s parent chain. A page is not its own
    /// descendant.
    #[must_use]
    pub fn is_descendant_of(&self, id: PageId, ancestor: PageId) -> bool {
        self.ancestors(id).contains(&ancestor)
    }

    /// Parent chain of `id`, nearest first, ending at the root.
    #[must_use]
    pub fn ancestors(&self, id: PageId) -> Vec<PageId> {
        let mut result = Vec::new();
        let mut current = self.page(id).and_then(Page::parent);
        while let Some(parent) = current {
            result.push(parent);
            current = self.page(parent).and_then(Page::parent);
        }
        result
    }

    /// All pages below `id` in pre-order, excluding `id`.
    #[must_use]
    pub fn descendants(&self, id: PageId) -> Vec<PageId> {
        let mut result = Vec::new();
        let mut stack: Vec<PageId> = self
            .page(id)
            .map(|p| p.children.iter().rev().copied().collect())
            .unwrap_or_default();
        while let Some(next) = stack.pop() {
            result.push(next);
            if let Some(page) = self.page(next) {
                stack.extend(page.children.iter().rev().copied());
            }
        }
        result
    }

    /// Change a page's title.
    pub fn set_title(&mut self, id: PageId, title: impl Into<String>) -> Result<(), TreeError> {
        self.page_mut(id)?.title = title.into();
        Ok(())
    }

    /// Set or clear the page's own template.
    pub fn set_template(&mut self, id: PageId, template: Option<String>) -> Result<(), TreeError> {
        self.page_mut(id)?.template = template;
        Ok(())
    }

    /// Set or clear the page's root content component.
    pub fn set_content(&mut self, id: PageId, content: Option<ComponentId>) -> Result<(), TreeError> {
        self.page_mut(id)?.content = content;
        Ok(())
    }

    /// Mark a page as a collection even while it has no children.
    pub fn set_is_collection(&mut self, id: PageId, collection: bool) -> Result<(), TreeError> {
        self.page_mut(id)?.marked_collection = collection;
        Ok(())
    }

    /// Pages whose root content component is `component`.
    #[must_use]
    pub fn pages_with_content(&self, component: &ComponentId) -> Vec<PageId> {
        self.iter()
            .filter(|(_, p)| p.content.as_ref() == Some(component))
            .map(|(id, _)| id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    /// home -> (docs -> (guide, api), blog)
    fn sample() -> (PageTree, [PageId; 4]) {
        let mut tree = PageTree::new("home", "Home");
        let docs = tree.add_page(tree.root(), "docs", "Docs").unwrap();
        let guide = tree.add_page(docs, "guide", "Guide").unwrap();
        let api = tree.add_page(docs, "api", "API").unwrap();
        let blog = tree.add_page(tree.root(), "blog", "Blog").unwrap();
        (tree, [docs, guide, api, blog])
    }

    #[test]
    fn test_add_and_lookup() {
        let (tree, [docs, guide, ..]) = sample();

        assert_eq!(tree.len(), 5);
        assert_eq!(tree.by_uid("guide"), Some(guide));
        assert_eq!(tree.page(guide).unwrap().parent(), Some(docs));
        assert!(tree.page(docs).unwrap().is_collection());
        assert!(!tree.page(guide).unwrap().is_collection());
        assert!(tree.page(tree.root()).unwrap().is_root());
    }

    #[test]
    fn test_duplicate_uid_rejected() {
        let (mut tree, [docs, ..]) = sample();
        let err = tree.add_page(docs, "guide", "Again").unwrap_err();
        assert_eq!(err, TreeError::DuplicateId("guide".to_owned()));
    }

    #[test]
    fn test_ancestors_and_descendants() {
        let (tree, [docs, guide, api, blog]) = sample();

        assert_eq!(tree.ancestors(guide), vec![docs, tree.root()]);
        assert_eq!(tree.descendants(tree.root()), vec![docs, guide, api, blog]);
        assert!(tree.is_descendant_of(api, tree.root()));
        assert!(!tree.is_descendant_of(docs, docs));
        assert!(!tree.is_descendant_of(blog, docs));
    }

    #[test]
    fn test_move_page() {
        let (mut tree, [docs, guide, _, blog]) = sample();

        tree.move_page(guide, blog).unwrap();
        assert_eq!(tree.page(guide).unwrap().parent(), Some(blog));
        assert!(!tree.page(docs).unwrap().children().contains(&guide));
        assert_eq!(tree.page(blog).unwrap().children(), &[guide]);
    }

    #[test]
    fn test_move_under_descendant_fails() {
        let (mut tree, [docs, guide, ..]) = sample();

        let err = tree.move_page(docs, guide).unwrap_err();
        assert_eq!(err, TreeError::WouldCycle {
            page: "docs".to_owned(),
            target: "guide".to_owned(),
        });
        assert!(matches!(tree.move_page(docs, docs), Err(TreeError::WouldCycle { .. })));
        assert_eq!(tree.page(docs).unwrap().parent(), Some(tree.root()));
    }

    #[test]
    fn test_root_cannot_move_or_be_removed() {
        let (mut tree, [docs, ..]) = sample();
        let root = tree.root();
        assert_eq!(tree.move_page(root, docs), Err(TreeError::RootImmutable));
        assert_eq!(tree.remove_page(root), Err(TreeError::RootImmutable));
    }

    #[test]
    fn test_remove_subtree() {
        let (mut tree, [docs, guide, ..]) = sample();

        let removed = tree.remove_page(docs).unwrap();
        assert_eq!(removed, vec!["docs", "guide", "api"]);
        assert_eq!(tree.len(), 2);
        assert!(tree.page(guide).is_none());
        assert_eq!(tree.by_uid("api"), None);
        assert_eq!(tree.set_title(guide, "x"), Err(TreeError::UnknownPage(guide)));
    }

    #[test]
    fn test_pages_with_content() {
        let (mut tree, [docs, _, _, blog]) = sample();
        tree.set_content(docs, Some("shared".into())).unwrap();
        tree.set_content(blog, Some("shared".into())).unwrap();
        assert_eq!(tree.pages_with_content(&"shared".into()), vec![docs, blog]);
    }

    #[test]
    fn test_marked_collection() {
        let (mut tree, [_, guide, ..]) = sample();
        tree.set_is_collection(guide, true).unwrap();
        assert!(tree.page(guide).unwrap().is_collection());
    }
}
