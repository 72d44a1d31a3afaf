//! Page paths and URLs.
//!
//! A page's location is derived from its parent chain, its file name, and
//! the path style of collections:
//!
//! | Style | Collection path | Upload path |
//! |-------|-----------------|-------------|
//! | [`Directory`](PathStyle::Directory) | `docs` | `docs/index.html` |
//! | [`DirectoryWithSeparator`](PathStyle::DirectoryWithSeparator) | `docs/` | `docs/index.html` |
//! | [`IndexFile`](PathStyle::IndexFile) | `docs/index.html` | `docs/index.html` |
//!
//! Leaf pages are `name.ext` inside their parent's directory. URLs are cached
//! per page and only recomputed after
//! [`PageTree::recursively_invalidate_url`].

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};

use crate::page::{Page, PageId, PageTree, TreeError};

/// Characters left as-is in URL path segments: A-Z a-z 0-9 - . _ ~
const SEGMENT_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// File name used when a title has no usable characters.
const FALLBACK_FILE_NAME: &str = "untitled";

/// How links to a collection are written.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathStyle {
    /// `collection`
    #[serde(rename = "directory")]
    Directory,
    /// `collection/`
    #[default]
    #[serde(rename = "directory-slash")]
    DirectoryWithSeparator,
    /// `collection/index.html`
    #[serde(rename = "index-file")]
    IndexFile,
}

/// Error from a path attribute change.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// File names must be non-empty single path segments.
    #[error("invalid file name: {0:?}")]
    InvalidFileName(String),
    /// Extensions must not contain separators or dots.
    #[error("invalid extension: {0:?}")]
    InvalidExtension(String),
    /// The page does not exist.
    #[error(transparent)]
    Tree(#[from] TreeError),
}

/// Site-wide inputs to path computation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathSettings {
    /// Published site root, e.g. `https://example.com/site`.
    pub base_url: String,
    /// Style for collections without their own.
    pub default_style: PathStyle,
    /// Name of a collection's index file.
    pub index_file_name: String,
    /// Extension for pages without a custom one.
    pub default_extension: String,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            base_url: String::from("/"),
            default_style: PathStyle::default(),
            index_file_name: String::from("index.html"),
            default_extension: String::from("html"),
        }
    }
}

/// Computes paths and URLs of pages in a [`PageTree`].
#[derive(Clone, Copy, Debug)]
pub struct PathResolver<'a> {
    tree: &'a PageTree,
    settings: &'a PathSettings,
}

impl<'a> PathResolver<'a> {
    /// Create a resolver over `tree`.
    #[must_use]
    pub fn new(tree: &'a PageTree, settings: &'a PathSettings) -> Self {
        Self { tree, settings }
    }

    /// Extension the page is published with: custom, else the site default.
    pub fn path_extension(&self, id: PageId) -> Result<String, TreeError> {
        let page = self.tree.try_page(id)?;
        Ok(self.extension_of(page))
    }

    /// Path of the page relative to the site root, as used in links.
    ///
    /// A custom path on the page overrides the computed one.
    pub fn path_relative_to_site(&self, id: PageId) -> Result<String, TreeError> {
        let page = self.tree.try_page(id)?;
        Ok(self.link_path(id, page))
    }

    /// Location of the page's output file relative to the site root.
    ///
    /// Collections always publish to their index file, whatever their link
    /// style.
    pub fn upload_path(&self, id: PageId) -> Result<String, TreeError> {
        let page = self.tree.try_page(id)?;
        if let Some(custom) = page.custom_path() {
            if custom.is_empty() || custom.ends_with('/') {
                return Ok(format!("{custom}{}", self.settings.index_file_name));
            }
            return Ok(custom.to_owned());
        }
        if page.is_collection() || page.is_root() {
            let dir = self.directory(id, page);
            return Ok(join(&dir, &self.settings.index_file_name));
        }
        Ok(self.link_path(id, page))
    }

    /// Absolute URL of the page.
    ///
    /// Cached on the page until [`PageTree::recursively_invalidate_url`]
    /// clears it.
    pub fn url(&self, id: PageId) -> Result<String, TreeError> {
        let page = self.tree.try_page(id)?;
        let url = page.url.get_or_init(|| {
            let path = self.link_path(id, page);
            let encoded: Vec<String> = path
                .split('/')
                .map(|segment| utf8_percent_encode(segment, SEGMENT_ENCODE_SET).to_string())
                .collect();
            format!("{}/{}", self.settings.base_url.trim_end_matches('/'), encoded.join("/"))
        });
        Ok(url.clone())
    }

    fn extension_of(&self, page: &Page) -> String {
        page.custom_extension()
            .unwrap_or(&self.settings.default_extension)
            .to_owned()
    }

    fn style_of(&self, page: &Page) -> PathStyle {
        page.collection_style().unwrap_or(self.settings.default_style)
    }

    /// Directory a collection publishes into: its ancestors' file names plus
    /// its own. Empty for the root.
    fn directory(&self, id: PageId, page: &Page) -> String {
        let mut segments = self.parent_segments(id);
        if !page.is_root() {
            segments.push(self.tree.file_name_of(page));
        }
        segments.join("/")
    }

    /// File names of `id`'s ancestors below the root, outermost first.
    fn parent_segments(&self, id: PageId) -> Vec<String> {
        let mut ancestors = self.tree.ancestors(id);
        ancestors.pop();
        ancestors
            .iter()
            .rev()
            .filter_map(|a| self.tree.page(*a))
            .map(|a| self.tree.file_name_of(a))
            .collect()
    }

    fn link_path(&self, id: PageId, page: &Page) -> String {
        if let Some(custom) = page.custom_path() {
            return custom.to_owned();
        }

        if page.is_root() || page.is_collection() {
            let dir = self.directory(id, page);
            return match self.style_of(page) {
                PathStyle::Directory => dir,
                PathStyle::DirectoryWithSeparator if dir.is_empty() => dir,
                PathStyle::DirectoryWithSeparator => format!("{dir}/"),
                PathStyle::IndexFile => join(&dir, &self.settings.index_file_name),
            };
        }

        let name = self.tree.file_name_of(page);
        let extension = self.extension_of(page);
        let file = if extension.is_empty() {
            name
        } else {
            format!("{name}.{extension}")
        };
        join(&self.parent_segments(id).join("/"), &file)
    }
}

fn join(dir: &str, file: &str) -> String {
    if dir.is_empty() {
        file.to_owned()
    } else {
        format!("{dir}/{file}")
    }
}

/// Path attributes of pages.
///
/// These setters change what [`PathResolver`] computes but leave cached URLs
/// alone; callers pair them with
/// [`recursively_invalidate_url`](Self::recursively_invalidate_url) (the
/// [`Site`](crate::Site) mutators do this).
impl PageTree {
    /// File name derived from the page title: transliterated to ASCII and
    /// slugified.
    pub fn suggested_file_name(&self, id: PageId) -> Result<String, TreeError> {
        Ok(suggest_file_name(self.try_page(id)?.title()))
    }

    /// Custom file name, else the suggested one.
    pub fn file_name(&self, id: PageId) -> Result<String, TreeError> {
        Ok(self.file_name_of(self.try_page(id)?))
    }

    fn file_name_of(&self, page: &Page) -> String {
        page.custom_file_name()
            .map_or_else(|| suggest_file_name(page.title()), str::to_owned)
    }

    /// Set or clear the custom file name.
    pub fn set_file_name(&mut self, id: PageId, name: Option<String>) -> Result<(), PathError> {
        if let Some(name) = &name
            && (name.trim().is_empty() || name.contains('/') || name == "." || name == "..")
        {
            return Err(PathError::InvalidFileName(name.clone()));
        }
        self.page_mut(id)?.file_name = name;
        Ok(())
    }

    /// Set or clear a user-chosen extension. Marks the extension editable.
    pub fn set_extension(&mut self, id: PageId, extension: Option<String>) -> Result<(), PathError> {
        if let Some(ext) = &extension
            && (ext.contains('/') || ext.contains('.'))
        {
            return Err(PathError::InvalidExtension(ext.clone()));
        }
        let page = self.page_mut(id)?;
        page.extension_editable = extension.is_some();
        page.extension = extension;
        Ok(())
    }

    /// Record whether the extension is under user control.
    pub fn set_file_extension_is_editable(&mut self, id: PageId, editable: bool) -> Result<(), TreeError> {
        self.page_mut(id)?.extension_editable = editable;
        Ok(())
    }

    /// Offer a default extension, e.g. from the page's content type.
    ///
    /// Applied only when the user has not chosen one: the extension is not
    /// editable or none is set. Returns whether it was applied.
    pub fn suggest_extension(&mut self, id: PageId, extension: &str) -> Result<bool, PathError> {
        if extension.contains('/') || extension.contains('.') {
            return Err(PathError::InvalidExtension(extension.to_owned()));
        }
        let page = self.page_mut(id)?;
        if page.extension_editable && page.extension.is_some() {
            return Ok(false);
        }
        page.extension = Some(extension.to_owned());
        Ok(true)
    }

    /// Set or clear the custom path relative to the site root.
    pub fn set_custom_path(&mut self, id: PageId, path: Option<String>) -> Result<(), TreeError> {
        self.page_mut(id)?.custom_path = path.map(|p| p.trim_start_matches('/').to_owned());
        Ok(())
    }

    /// Set or clear the collection's own path style.
    pub fn set_collection_style(&mut self, id: PageId, style: Option<PathStyle>) -> Result<(), TreeError> {
        self.page_mut(id)?.collection_style = style;
        Ok(())
    }

    /// Drop the cached URL of `id`, and of every descendant when `recursive`.
    pub fn recursively_invalidate_url(&mut self, id: PageId, recursive: bool) -> Result<(), TreeError> {
        self.page_mut(id)?.url.take();
        if recursive {
            for descendant in self.descendants(id) {
                self.page_mut(descendant)?.url.take();
            }
        }
        Ok(())
    }
}

/// Slug of a title: ASCII transliteration, lowercase, runs of separators
/// collapsed to `-`, everything else dropped.
fn suggest_file_name(title: &str) -> String {
    let ascii = deunicode::deunicode(title);
    let mut slug = String::with_capacity(ascii.len());
    let mut last_was_dash = true;

    for c in ascii.trim().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_was_dash = false;
        } else if !last_was_dash && (c.is_whitespace() || c == '-' || c == '_' || c == '/') {
            slug.push('-');
            last_was_dash = true;
        }
    }
    if slug.ends_with('-') {
        slug.pop();
    }

    if slug.is_empty() {
        FALLBACK_FILE_NAME.to_owned()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn settings(style: PathStyle) -> PathSettings {
        PathSettings {
            base_url: "https://example.com/site/".to_owned(),
            default_style: style,
            ..PathSettings::default()
        }
    }

    /// Home -> (Docs -> (Getting Started), About Us)
    fn sample() -> (PageTree, PageId, PageId, PageId) {
        let mut tree = PageTree::new("home", "Home");
        let docs = tree.add_page(tree.root(), "docs", "Docs").unwrap();
        let guide = tree.add_page(docs, "guide", "Getting Started").unwrap();
        let about = tree.add_page(tree.root(), "about", "About Us").unwrap();
        (tree, docs, guide, about)
    }

    #[test]
    fn test_suggested_file_name() {
        assert_eq!(suggest_file_name("Getting Started"), "getting-started");
        assert_eq!(suggest_file_name("Crème Brûlée!"), "creme-brulee");
        assert_eq!(suggest_file_name("  What's new?  "), "whats-new");
        assert_eq!(suggest_file_name("a / b"), "a-b");
        assert_eq!(suggest_file_name("???"), "untitled");
    }

    #[test]
    fn test_directory_style() {
        let (tree, docs, guide, about) = sample();
        let settings = settings(PathStyle::Directory);
        let paths = PathResolver::new(&tree, &settings);

        assert_eq!(paths.path_relative_to_site(tree.root()).unwrap(), "");
        assert_eq!(paths.path_relative_to_site(docs).unwrap(), "docs");
        assert_eq!(paths.path_relative_to_site(guide).unwrap(), "docs/getting-started.html");
        assert_eq!(paths.path_relative_to_site(about).unwrap(), "about-us.html");
    }

    #[test]
    fn test_directory_with_separator_style() {
        let (tree, docs, ..) = sample();
        let settings = settings(PathStyle::DirectoryWithSeparator);
        let paths = PathResolver::new(&tree, &settings);

        assert_eq!(paths.path_relative_to_site(tree.root()).unwrap(), "");
        assert_eq!(paths.path_relative_to_site(docs).unwrap(), "docs/");
    }

    #[test]
    fn test_index_file_style() {
        let (tree, docs, ..) = sample();
        let settings = settings(PathStyle::IndexFile);
        let paths = PathResolver::new(&tree, &settings);

        assert_eq!(paths.path_relative_to_site(tree.root()).unwrap(), "index.html");
        assert_eq!(paths.path_relative_to_site(docs).unwrap(), "docs/index.html");
    }

    #[test]
    fn test_upload_path_ignores_link_style() {
        let (tree, docs, guide, _) = sample();
        for style in [PathStyle::Directory, PathStyle::DirectoryWithSeparator, PathStyle::IndexFile] {
            let settings = settings(style);
            let paths = PathResolver::new(&tree, &settings);
            assert_eq!(paths.upload_path(tree.root()).unwrap(), "index.html");
            assert_eq!(paths.upload_path(docs).unwrap(), "docs/index.html");
            assert_eq!(paths.upload_path(guide).unwrap(), "docs/getting-started.html");
        }
    }

    #[test]
    fn test_collection_style_override() {
        let (mut tree, docs, ..) = sample();
        tree.set_collection_style(docs, Some(PathStyle::IndexFile)).unwrap();
        let settings = settings(PathStyle::Directory);
        let paths = PathResolver::new(&tree, &settings);
        assert_eq!(paths.path_relative_to_site(docs).unwrap(), "docs/index.html");
    }

    #[test]
    fn test_custom_path_overrides() {
        let (mut tree, docs, guide, _) = sample();
        tree.set_custom_path(guide, Some("/start.html".to_owned())).unwrap();
        tree.set_custom_path(docs, Some("manual/".to_owned())).unwrap();
        let settings = settings(PathStyle::Directory);
        let paths = PathResolver::new(&tree, &settings);

        assert_eq!(paths.path_relative_to_site(guide).unwrap(), "start.html");
        assert_eq!(paths.upload_path(guide).unwrap(), "start.html");
        assert_eq!(paths.upload_path(docs).unwrap(), "manual/index.html");
    }

    #[test]
    fn test_url_is_encoded_and_based() {
        let (mut tree, _, _, about) = sample();
        tree.set_file_name(about, Some("über uns".to_owned())).unwrap();
        let settings = settings(PathStyle::Directory);
        let paths = PathResolver::new(&tree, &settings);

        assert_eq!(paths.url(tree.root()).unwrap(), "https://example.com/site/");
        assert_eq!(paths.url(about).unwrap(), "https://example.com/site/%C3%BCber%20uns.html");
    }

    #[test]
    fn test_url_cached_until_invalidated() {
        let (mut tree, docs, guide, _) = sample();
        let settings = settings(PathStyle::Directory);

        let before = PathResolver::new(&tree, &settings).url(guide).unwrap();
        assert_eq!(tree.page(guide).unwrap().cached_url(), Some(before.as_str()));

        tree.set_file_name(docs, Some("manual".to_owned())).unwrap();
        // Still the stale cached value.
        assert_eq!(PathResolver::new(&tree, &settings).url(guide).unwrap(), before);

        tree.recursively_invalidate_url(docs, true).unwrap();
        assert_eq!(tree.page(guide).unwrap().cached_url(), None);
        let after = PathResolver::new(&tree, &settings).url(guide).unwrap();
        assert_ne!(after, before);
        assert_eq!(after, "https://example.com/site/manual/getting-started.html");
    }

    #[test]
    fn test_non_recursive_invalidation_keeps_descendants() {
        let (mut tree, docs, guide, _) = sample();
        let settings = settings(PathStyle::Directory);
        {
            let paths = PathResolver::new(&tree, &settings);
            paths.url(docs).unwrap();
            paths.url(guide).unwrap();
        }
        tree.recursively_invalidate_url(docs, false).unwrap();
        assert!(tree.page(docs).unwrap().cached_url().is_none());
        assert!(tree.page(guide).unwrap().cached_url().is_some());
    }

    #[test]
    fn test_set_file_name_validation() {
        let (mut tree, docs, ..) = sample();
        for bad in ["", "  ", "a/b", ".."] {
            assert_eq!(
                tree.set_file_name(docs, Some(bad.to_owned())),
                Err(PathError::InvalidFileName(bad.to_owned()))
            );
        }
        tree.set_file_name(docs, Some("manual".to_owned())).unwrap();
        assert_eq!(tree.file_name(docs).unwrap(), "manual");
        assert_eq!(tree.suggested_file_name(docs).unwrap(), "docs");
        tree.set_file_name(docs, None).unwrap();
        assert_eq!(tree.file_name(docs).unwrap(), "docs");
    }

    #[test]
    fn test_extensions() {
        let (mut tree, _, guide, about) = sample();
        let settings = settings(PathStyle::Directory);

        assert!(tree.suggest_extension(guide, "php").unwrap());
        assert_eq!(PathResolver::new(&tree, &settings).path_extension(guide).unwrap(), "php");

        tree.set_extension(about, Some("htm".to_owned())).unwrap();
        assert!(tree.page(about).unwrap().file_extension_is_editable());
        assert!(!tree.suggest_extension(about, "php").unwrap());
        assert_eq!(PathResolver::new(&tree, &settings).path_extension(about).unwrap(), "htm");

        tree.set_file_extension_is_editable(about, false).unwrap();
        assert!(tree.suggest_extension(about, "php").unwrap());

        assert!(matches!(tree.set_extension(about, Some("a.b".to_owned())), Err(PathError::InvalidExtension(_))));
    }

    #[test]
    fn test_empty_extension_has_no_dot() {
        let (mut tree, _, _, about) = sample();
        tree.set_extension(about, Some(String::new())).unwrap();
        let settings = settings(PathStyle::Directory);
        assert_eq!(PathResolver::new(&tree, &settings).path_relative_to_site(about).unwrap(), "about-us");
    }

    #[test]
    fn test_path_style_serde_names() {
        let styles: Vec<PathStyle> = serde_json::from_str(r#"["directory", "directory-slash", "index-file"]"#).unwrap();
        assert_eq!(styles, vec![PathStyle::Directory, PathStyle::DirectoryWithSeparator, PathStyle::IndexFile]);
    }
}
