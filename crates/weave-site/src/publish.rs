//! Publish gating and output sinks.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::digest::{Digest, DigestTracker};
use crate::site::RenderError;

/// Error that stops one page from publishing.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// A publish of the same page is already running.
    #[error("page {0} is already being published")]
    InFlight(String),
    /// The page could not be rendered.
    #[error(transparent)]
    Render(#[from] RenderError),
    /// The sink failed to write the output.
    #[error("failed to write {path}")]
    Write {
        /// Upload path that was being written.
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Shared cancellation flag for a publish run.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create an untriggered token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Pages already written stay committed.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Enforces at most one publish in flight per page.
///
/// Clones share the same in-flight set, so a publisher can be handed to
/// other threads.
#[derive(Clone, Debug, Default)]
pub struct Publisher {
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl Publisher {
    /// Create a publisher with nothing in flight.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start publishing a page.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::InFlight`] while another ticket for the same
    /// page is alive.
    pub fn begin(&self, uid: &str) -> Result<PublishTicket, PublishError> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if !in_flight.insert(uid.to_owned()) {
            return Err(PublishError::InFlight(uid.to_owned()));
        }
        tracing::debug!(page = uid, "publish started");
        Ok(PublishTicket {
            uid: uid.to_owned(),
            in_flight: Arc::clone(&self.in_flight),
            completed: false,
        })
    }

    /// Whether a page is being published.
    #[must_use]
    pub fn is_in_flight(&self, uid: &str) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(uid)
    }
}

/// Exclusive right to publish one page.
///
/// Dropping the ticket without [`complete`](Self::complete) cancels the
/// publish: the page keeps its staleness so a retry picks it up again.
#[derive(Debug)]
#[must_use = "dropping a ticket cancels the publish"]
pub struct PublishTicket {
    uid: String,
    in_flight: Arc<Mutex<HashSet<String>>>,
    completed: bool,
}

impl PublishTicket {
    /// The page being published.
    #[must_use]
    pub fn uid(&self) -> &str {
        &self.uid
    }

    /// Finish the publish: commit `digest` for the page, clearing its
    /// staleness.
    pub fn complete(mut self, tracker: &mut DigestTracker, digest: Digest) {
        tracker.commit(&self.uid, digest);
        self.completed = true;
    }
}

impl Drop for PublishTicket {
    fn drop(&mut self) {
        if !self.completed {
            tracing::debug!(page = %self.uid, "publish cancelled");
        }
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.uid);
    }
}

/// Destination for published pages.
pub trait PublishSink: Send + Sync {
    /// Write a page's output at its upload path.
    fn write(&self, upload_path: &str, contents: &[u8]) -> io::Result<()>;
}

/// Writes published pages below a directory.
#[derive(Clone, Debug)]
pub struct FsSink {
    output_dir: PathBuf,
}

impl FsSink {
    /// Create a sink rooted at `output_dir`.
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Output root.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

impl PublishSink for FsSink {
    fn write(&self, upload_path: &str, contents: &[u8]) -> io::Result<()> {
        let relative = Path::new(upload_path);
        if !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("upload path escapes the output directory: {upload_path}"),
            ));
        }

        let target = self.output_dir.join(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&target, contents)
    }
}
