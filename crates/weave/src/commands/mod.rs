//! CLI command implementations.

pub(crate) mod publish;
pub(crate) mod render;
pub(crate) mod status;

use std::fs;
use std::path::PathBuf;

use clap::Args;
use weave_config::{CliSettings, Config};
use weave_site::SiteSettings;

pub(crate) use publish::PublishArgs;
pub(crate) use render::RenderArgs;
pub(crate) use status::StatusArgs;

use crate::error::CliError;
use crate::manifest::Manifest;

/// Cache bucket holding committed page digests.
const DIGEST_BUCKET: &str = "digests";

/// Options shared by every command that loads a site.
#[derive(Args)]
pub(crate) struct SiteArgs {
    /// Path to configuration file (default: auto-discover weave.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Site manifest (overrides config).
    #[arg(short, long, env = "WEAVE_MANIFEST")]
    manifest: Option<PathBuf>,

    /// Published site root URL (overrides config).
    #[arg(long)]
    base_url: Option<String>,

    /// Enable verbose output (show parse and publish steps).
    #[arg(short, long)]
    pub verbose: bool,
}

/// Loaded configuration plus the site it describes.
pub(crate) struct LoadedSite {
    pub(crate) config: Config,
    pub(crate) manifest: Manifest,
}

impl SiteArgs {
    /// Load config and manifest, applying `settings` over the config file.
    ///
    /// Committed digests are restored from the cache when it is enabled, so
    /// pages whose output has not changed since the last publish to the same
    /// output directory are not rewritten.
    pub(crate) fn load(self, mut settings: CliSettings) -> Result<LoadedSite, CliError> {
        settings.manifest = self.manifest;
        settings.base_url = self.base_url;
        let config = Config::load(self.config.as_deref(), Some(&settings))?;

        let default_template = config
            .template
            .default
            .as_deref()
            .map(fs::read_to_string)
            .transpose()?;
        let site_settings = SiteSettings {
            paths: config.site.path_settings(),
            default_template,
            max_template_depth: config.template.max_depth,
        };

        let mut manifest = Manifest::load(&config.site.manifest, site_settings)?;

        let cache_dir = config.publish.cache_enabled.then(|| config.publish.cache_dir());
        let etag = config.publish.output_dir.display().to_string();
        tracing::debug!(cache_dir = ?cache_dir, etag = %etag, "opening digest cache");
        let cache = weave_cache::open(cache_dir, env!("CARGO_PKG_VERSION"));
        manifest.site.attach_digest_store(cache.bucket(DIGEST_BUCKET), etag);

        Ok(LoadedSite { config, manifest })
    }
}
