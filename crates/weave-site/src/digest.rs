//! Page staleness and published-output digests.
//!
//! Staleness is pushed by mutators ([`DigestTracker::mark_stale`]), never
//! inferred from content. Digests only serve to skip rewriting output that
//! turns out identical to what was last published.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use weave_cache::{CacheBucket, CacheBucketExt};

/// Cache entry holding all committed digests.
const COMMITTED_KEY: &str = "committed";

/// SHA-256 of a page's published output.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Digest([u8; 32]);

impl Digest {
    /// Raw digest bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex encoding.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", &self.to_hex()[..12])
    }
}

impl TryFrom<String> for Digest {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(&value, &mut bytes).map_err(|e| format!("invalid digest {value:?}: {e}"))?;
        Ok(Self(bytes))
    }
}

impl From<Digest> for String {
    fn from(digest: Digest) -> Self {
        digest.to_hex()
    }
}

/// Hash rendered output. Deterministic for identical input.
#[must_use]
pub fn compute_digest(content: &[u8]) -> Digest {
    let mut hasher = Sha256::new();
    hasher.update(content);
    let result = hasher.finalize();
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&result);
    Digest(bytes)
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct DigestEntry {
    digest: Option<Digest>,
    stale: bool,
}

/// Per-page staleness flags and last committed digests, keyed by page uid.
#[derive(Debug, Default)]
pub struct DigestTracker {
    entries: HashMap<String, DigestEntry>,
}

impl DigestTracker {
    /// Create an empty tracker: every page is stale.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the page needs regenerating: flagged stale, or never
    /// committed.
    #[must_use]
    pub fn is_stale(&self, uid: &str) -> bool {
        self.entries
            .get(uid)
            .is_none_or(|e| e.stale || e.digest.is_none())
    }

    /// Flag the page stale. Idempotent.
    pub fn mark_stale(&mut self, uid: &str) {
        let entry = self
            .entries
            .entry(uid.to_owned())
            .or_insert(DigestEntry {
                digest: None,
                stale: true,
            });
        if !entry.stale {
            tracing::debug!(page = uid, "page marked stale");
        }
        entry.stale = true;
    }

    /// Record the digest of output that was just written and clear the flag.
    pub fn commit(&mut self, uid: &str, digest: Digest) {
        tracing::debug!(page = uid, %digest, "committed page digest");
        self.entries.insert(
            uid.to_owned(),
            DigestEntry {
                digest: Some(digest),
                stale: false,
            },
        );
    }

    /// Last committed digest.
    #[must_use]
    pub fn stored_digest(&self, uid: &str) -> Option<Digest> {
        self.entries.get(uid).and_then(|e| e.digest)
    }

    /// Drop everything known about a page.
    pub fn forget(&mut self, uid: &str) {
        self.entries.remove(uid);
    }

    /// Restore committed digests from a cache bucket.
    ///
    /// Restored pages start fresh; staleness is not persisted, so anything
    /// edited before the last run ended without publishing must be marked
    /// again by the caller. Pages already tracked keep their flag and only
    /// gain a digest if they had none. Entries stored under another `etag`
    /// are ignored.
    pub fn load(&mut self, bucket: &dyn CacheBucket, etag: &str) -> usize {
        let Some(stored) = bucket.get_json::<HashMap<String, Digest>>(COMMITTED_KEY, etag) else {
            return 0;
        };
        let count = stored.len();
        for (uid, digest) in stored {
            let entry = self.entries.entry(uid).or_insert(DigestEntry {
                digest: None,
                stale: false,
            });
            entry.digest.get_or_insert(digest);
        }
        tracing::debug!(count, "loaded committed digests");
        count
    }

    /// Save committed digests to a cache bucket.
    pub fn persist(&self, bucket: &dyn CacheBucket, etag: &str) {
        let committed: HashMap<&str, Digest> = self
            .entries
            .iter()
            .filter_map(|(uid, e)| e.digest.map(|d| (uid.as_str(), d)))
            .collect();
        bucket.set_json(COMMITTED_KEY, etag, &committed);
    }
}
