//! Site manifest loading.
//!
//! A manifest is a JSON file describing the page tree and the content
//! components the pages render:
//!
//! ```json
//! {
//!   "site": {
//!     "uid": "home", "title": "Home", "content": "home-body",
//!     "children": [
//!       { "uid": "guide", "title": "Guide", "template_file": "templates/guide.html" }
//!     ]
//!   },
//!   "components": {
//!     "home-body": { "kind": "page", "properties": { "title": "Welcome" } }
//!   }
//! }
//! ```
//!
//! Relative template files are resolved against the manifest's directory.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use weave_content::{ComponentId, MemoryContent};
use weave_site::{PageId, PageTree, PathError, PathStyle, Site, SiteSettings, TreeError};

/// Error loading a manifest.
#[derive(Debug, thiserror::Error)]
pub(crate) enum ManifestError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid manifest {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("page {uid}: {message}")]
    Page { uid: String, message: String },

    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error(transparent)]
    Path(#[from] PathError),
}

/// Page entry as written in the manifest.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PageSpec {
    uid: String,
    title: String,
    #[serde(default)]
    content: Option<ComponentId>,
    #[serde(default)]
    template: Option<String>,
    #[serde(default)]
    template_file: Option<String>,
    #[serde(default)]
    file_name: Option<String>,
    #[serde(default)]
    extension: Option<String>,
    #[serde(default)]
    custom_path: Option<String>,
    #[serde(default)]
    collection_style: Option<PathStyle>,
    #[serde(default)]
    collection: bool,
    #[serde(default)]
    children: Vec<PageSpec>,
}

#[derive(Debug, Deserialize)]
struct ManifestFile {
    site: PageSpec,
    #[serde(flatten)]
    content: MemoryContent,
}

/// A loaded site and the content its pages render.
pub(crate) struct Manifest {
    pub(crate) site: Site,
    pub(crate) content: MemoryContent,
}

impl Manifest {
    /// Read and build the site described by the manifest at `path`.
    pub(crate) fn load(path: &Path, settings: SiteSettings) -> Result<Self, ManifestError> {
        let json = fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let base_dir = path.parent().unwrap_or(Path::new("."));
        Self::from_json(&json, base_dir, settings).map_err(|e| match e {
            ManifestError::Parse { source, .. } => ManifestError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    fn from_json(json: &str, base_dir: &Path, settings: SiteSettings) -> Result<Self, ManifestError> {
        let file: ManifestFile = serde_json::from_str(json).map_err(|source| ManifestError::Parse {
            path: PathBuf::new(),
            source,
        })?;

        let root = &file.site;
        let mut site = Site::new(PageTree::new(root.uid.clone(), root.title.clone()), settings);
        let root_id = site.tree().root();
        apply(&mut site, root_id, root, base_dir)?;
        add_children(&mut site, root_id, root, base_dir)?;

        tracing::debug!(pages = site.tree().len(), components = file.content.len(), "loaded manifest");
        Ok(Self {
            site,
            content: file.content,
        })
    }
}

fn add_children(site: &mut Site, parent: PageId, spec: &PageSpec, base_dir: &Path) -> Result<(), ManifestError> {
    for child in &spec.children {
        let id = site.add_page(parent, child.uid.clone(), child.title.clone())?;
        apply(site, id, child, base_dir)?;
        add_children(site, id, child, base_dir)?;
    }
    Ok(())
}

/// Copy a page entry's attributes onto the page.
fn apply(site: &mut Site, id: PageId, spec: &PageSpec, base_dir: &Path) -> Result<(), ManifestError> {
    let template = match (&spec.template, &spec.template_file) {
        (Some(_), Some(_)) => {
            return Err(ManifestError::Page {
                uid: spec.uid.clone(),
                message: "template and template_file are mutually exclusive".to_owned(),
            });
        }
        (Some(inline), None) => Some(inline.clone()),
        (None, Some(file)) => {
            let path = base_dir.join(file);
            Some(fs::read_to_string(&path).map_err(|source| ManifestError::Read { path, source })?)
        }
        (None, None) => None,
    };

    site.set_template(id, template)?;
    site.set_content(id, spec.content.clone())?;
    if spec.file_name.is_some() {
        site.set_file_name(id, spec.file_name.clone())?;
    }
    if spec.extension.is_some() {
        site.set_extension(id, spec.extension.clone())?;
    }
    if spec.custom_path.is_some() {
        site.set_custom_path(id, spec.custom_path.clone())?;
    }
    if spec.collection_style.is_some() {
        site.set_collection_style(id, spec.collection_style)?;
    }
    if spec.collection {
        site.set_is_collection(id, true)?;
    }
    Ok(())
}
