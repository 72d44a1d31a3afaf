//! Cache layer for Weave.
//!
//! Publishing state that must survive between runs (committed page digests)
//! goes through these traits rather than straight to disk:
//!
//! - [`Cache`]: opens named buckets
//! - [`CacheBucket`]: etag-validated key-value store
//! - [`CacheBucketExt`]: JSON helpers on top of raw bytes
//!
//! [`FileCache`] keeps buckets under a directory guarded by a `VERSION` file;
//! [`NullCache`] is used when caching is disabled.
//!
//! # Example
//!
//! ```
//! use weave_cache::{Cache, CacheBucketExt, NullCache};
//!
//! let bucket = NullCache.bucket("digests");
//! bucket.set_json("committed", "1", &vec!["home"]);
//! assert_eq!(bucket.get_json::<Vec<String>>("committed", "1"), None);
//! ```

mod ext;
mod file;

use std::path::PathBuf;

pub use ext::CacheBucketExt;
pub use file::FileCache;

/// Named partition of a [`Cache`].
///
/// Entries are tagged with an etag chosen by the writer. A read hits only
/// when the stored etag equals the requested one; an empty requested etag
/// accepts any stored entry.
pub trait CacheBucket: Send + Sync {
    /// Read an entry.
    ///
    /// # Arguments
    ///
    /// * `key` - Entry key; any string, including `/`
    /// * `etag` - Required etag, or `""` to skip validation
    fn get(&self, key: &str, etag: &str) -> Option<Vec<u8>>;

    /// Write an entry, replacing any previous one. Failures are logged and
    /// otherwise ignored.
    fn set(&self, key: &str, etag: &str, value: &[u8]);

    /// Delete an entry if present.
    fn remove(&self, key: &str);
}

/// Opens [`CacheBucket`]s by name.
pub trait Cache: Send + Sync {
    /// Open a bucket. Handles for the same name share storage.
    fn bucket(&self, name: &str) -> Box<dyn CacheBucket>;
}

/// Bucket that stores nothing.
pub struct NullCacheBucket;

impl CacheBucket for NullCacheBucket {
    fn get(&self, _key: &str, _etag: &str) -> Option<Vec<u8>> {
        None
    }

    fn set(&self, _key: &str, _etag: &str, _value: &[u8]) {}

    fn remove(&self, _key: &str) {}
}

/// Cache used when caching is disabled: every read misses.
pub struct NullCache;

impl Cache for NullCache {
    fn bucket(&self, _name: &str) -> Box<dyn CacheBucket> {
        Box::new(NullCacheBucket)
    }
}

/// Open the cache for a run: a [`FileCache`] at `dir`, or a [`NullCache`]
/// when `dir` is `None`.
#[must_use]
pub fn open(dir: Option<PathBuf>, version: &str) -> Box<dyn Cache> {
    match dir {
        Some(dir) => Box::new(FileCache::new(dir, version)),
        None => Box::new(NullCache),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_bucket_never_hits() {
        let bucket = NullCache.bucket("digests");
        bucket.set("home", "v1", b"abc");
        assert_eq!(bucket.get("home", "v1"), None);
        assert_eq!(bucket.get("home", ""), None);
        bucket.remove("home");
    }

    #[test]
    fn test_open_without_dir_is_null() {
        let cache = open(None, "1");
        let bucket = cache.bucket("digests");
        bucket.set("k", "", b"v");
        assert_eq!(bucket.get("k", ""), None);
    }

    #[test]
    fn test_open_with_dir_persists() {
        let tmp = tempfile::TempDir::new().unwrap();
        let cache = open(Some(tmp.path().join("cache")), "1");
        let bucket = cache.bucket("digests");
        bucket.set("k", "", b"v");
        assert_eq!(bucket.get("k", ""), Some(b"v".to_vec()));
    }
}
