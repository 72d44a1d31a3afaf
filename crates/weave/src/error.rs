//! CLI error types.

use weave_config::ConfigError;
use weave_site::{PathError, RenderError, TreeError};

use crate::manifest::ManifestError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Manifest(#[from] ManifestError),

    #[error("{0}")]
    Tree(#[from] TreeError),

    #[error("{0}")]
    Path(#[from] PathError),

    #[error("{0}")]
    Render(#[from] RenderError),

    #[error("{0}")]
    Validation(String),
}
