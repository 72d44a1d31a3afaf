//! JSON helpers for [`CacheBucket`].

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::CacheBucket;

/// Typed access to a [`CacheBucket`].
///
/// Blanket-implemented for every bucket, so [`CacheBucket`] itself stays
/// object safe and free of serde.
pub trait CacheBucketExt: CacheBucket {
    /// Read and decode a JSON entry.
    ///
    /// Misses, etag mismatches, and undecodable entries all return `None`;
    /// the latter is logged since it means the entry was written by an
    /// incompatible version.
    fn get_json<T: DeserializeOwned>(&self, key: &str, etag: &str) -> Option<T> {
        let bytes = self.get(key, etag)?;
        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, error = %e, "discarding undecodable cache entry");
                None
            }
        }
    }

    /// Encode `value` as JSON and write it.
    fn set_json<T: Serialize + ?Sized>(&self, key: &str, etag: &str, value: &T) {
        match serde_json::to_vec(value) {
            Ok(bytes) => self.set(key, etag, &bytes),
            Err(e) => tracing::warn!(key, error = %e, "failed to encode cache entry"),
        }
    }
}

impl<B: CacheBucket + ?Sized> CacheBucketExt for B {}
