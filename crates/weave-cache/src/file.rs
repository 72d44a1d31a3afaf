//! Directory-backed cache.
//!
//! Layout:
//!
//! ```text
//! {root}/
//! +-- VERSION
//! +-- digests/                 # bucket
//!     +-- 636f6d6d6974746564   # hex-encoded key
//! ```
//!
//! Each entry file holds the etag on its first line followed by the raw
//! value. Keys are hex-encoded so any string (page uids with `/`, spaces)
//! maps to a single flat file name. Writes go through a temporary file and a
//! rename so a crashed run never leaves a torn entry behind.

use std::fs;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use crate::{Cache, CacheBucket};

const VERSION_FILE: &str = "VERSION";

/// [`Cache`] stored under a root directory.
///
/// Opening compares the root's `VERSION` file with the expected version and
/// wipes the directory when they differ, so entries written by another
/// format version are never read back.
pub struct FileCache {
    root: PathBuf,
}

impl FileCache {
    /// Open (and if needed reset) the cache at `root`.
    ///
    /// I/O problems are logged, never returned: a cache that cannot be
    /// prepared simply misses.
    #[must_use]
    pub fn new(root: PathBuf, version: &str) -> Self {
        ensure_version(&root, version);
        Self { root }
    }

    /// Root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Cache for FileCache {
    fn bucket(&self, name: &str) -> Box<dyn CacheBucket> {
        Box::new(DirBucket {
            dir: self.root.join(name),
        })
    }
}

struct DirBucket {
    dir: PathBuf,
}

impl DirBucket {
    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(hex::encode(key))
    }
}

impl CacheBucket for DirBucket {
    fn get(&self, key: &str, etag: &str) -> Option<Vec<u8>> {
        let file = fs::File::open(self.entry_path(key)).ok()?;
        let mut reader = BufReader::new(file);

        let mut stored = String::new();
        reader.read_line(&mut stored).ok()?;
        let stored = stored.strip_suffix('\n')?;
        if !etag.is_empty() && stored != etag {
            tracing::debug!(key, stored, etag, "cache etag mismatch");
            return None;
        }

        let mut data = Vec::new();
        reader.read_to_end(&mut data).ok()?;
        Some(data)
    }

    fn set(&self, key: &str, etag: &str, value: &[u8]) {
        if etag.contains('\n') {
            tracing::warn!(key, "refusing cache etag containing a newline");
            return;
        }
        if let Err(e) = fs::create_dir_all(&self.dir) {
            tracing::warn!(dir = %self.dir.display(), error = %e, "failed to create cache bucket");
            return;
        }

        let mut buf = Vec::with_capacity(etag.len() + 1 + value.len());
        buf.extend_from_slice(etag.as_bytes());
        buf.push(b'\n');
        buf.extend_from_slice(value);

        let path = self.entry_path(key);
        let tmp = path.with_extension("tmp");
        if let Err(e) = fs::write(&tmp, &buf).and_then(|()| fs::rename(&tmp, &path)) {
            tracing::warn!(key, error = %e, "failed to write cache entry");
            let _ = fs::remove_file(&tmp);
        }
    }

    fn remove(&self, key: &str) {
        let path = self.entry_path(key);
        if let Err(e) = fs::remove_file(&path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!(key, error = %e, "failed to remove cache entry");
        }
    }
}

/// Make sure `root` exists and carries `version`, wiping it otherwise.
fn ensure_version(root: &Path, version: &str) {
    let version_file = root.join(VERSION_FILE);
    match fs::read_to_string(&version_file) {
        Ok(stored) if stored.trim() == version => return,
        Ok(stored) => tracing::info!(stored = stored.trim(), version, "cache version changed, resetting"),
        Err(_) => tracing::debug!(root = %root.display(), "initializing cache"),
    }

    if root.exists()
        && let Err(e) = fs::remove_dir_all(root)
    {
        tracing::warn!(root = %root.display(), error = %e, "failed to clear cache");
    }
    if let Err(e) = fs::create_dir_all(root).and_then(|()| fs::write(&version_file, version)) {
        tracing::warn!(root = %root.display(), error = %e, "failed to initialize cache");
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    fn cache(tmp: &TempDir) -> FileCache {
        FileCache::new(tmp.path().join("cache"), "1")
    }

    #[test]
    fn test_set_then_get() {
        let tmp = TempDir::new().unwrap();
        let bucket = cache(&tmp).bucket("digests");

        bucket.set("home", "e1", b"payload");
        assert_eq!(bucket.get("home", "e1"), Some(b"payload".to_vec()));
        assert_eq!(bucket.get("home", ""), Some(b"payload".to_vec()));
        assert_eq!(bucket.get("home", "e2"), None);
    }

    #[test]
    fn test_keys_with_separators_stay_flat() {
        let tmp = TempDir::new().unwrap();
        let cache = cache(&tmp);
        let bucket = cache.bucket("digests");

        bucket.set("docs/guide intro", "", b"x");
        assert_eq!(bucket.get("docs/guide intro", ""), Some(b"x".to_vec()));

        let files: Vec<_> = fs::read_dir(cache.root().join("digests")).unwrap().collect();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_value_with_newlines() {
        let tmp = TempDir::new().unwrap();
        let bucket = cache(&tmp).bucket("pages");

        bucket.set("p", "e", b"line one\nline two\n\0\xff");
        assert_eq!(bucket.get("p", "e"), Some(b"line one\nline two\n\0\xff".to_vec()));
    }

    #[test]
    fn test_etag_with_newline_rejected() {
        let tmp = TempDir::new().unwrap();
        let bucket = cache(&tmp).bucket("pages");

        bucket.set("p", "a\nb", b"x");
        assert_eq!(bucket.get("p", ""), None);
    }

    #[test]
    fn test_remove() {
        let tmp = TempDir::new().unwrap();
        let bucket = cache(&tmp).bucket("digests");

        bucket.set("home", "", b"x");
        bucket.remove("home");
        assert_eq!(bucket.get("home", ""), None);
        bucket.remove("home");
    }

    #[test]
    fn test_buckets_are_isolated() {
        let tmp = TempDir::new().unwrap();
        let cache = cache(&tmp);

        cache.bucket("a").set("k", "", b"a");
        cache.bucket("b").set("k", "", b"b");
        assert_eq!(cache.bucket("a").get("k", ""), Some(b"a".to_vec()));
        assert_eq!(cache.bucket("b").get("k", ""), Some(b"b".to_vec()));
    }

    #[test]
    fn test_same_version_keeps_entries() {
        let tmp = TempDir::new().unwrap();
        cache(&tmp).bucket("digests").set("home", "", b"kept");

        let reopened = cache(&tmp);
        assert_eq!(reopened.bucket("digests").get("home", ""), Some(b"kept".to_vec()));
    }

    #[test]
    fn test_version_change_resets() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("cache");
        FileCache::new(root.clone(), "1").bucket("digests").set("home", "", b"old");

        let reopened = FileCache::new(root.clone(), "2");
        assert_eq!(reopened.bucket("digests").get("home", ""), None);
        assert_eq!(fs::read_to_string(root.join(VERSION_FILE)).unwrap(), "2");
    }

    #[test]
    fn test_missing_root_is_created() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("a/b/cache");

        let cache = FileCache::new(root.clone(), "1");
        assert!(root.join(VERSION_FILE).exists());
        assert_eq!(cache.root(), root);
    }
}
