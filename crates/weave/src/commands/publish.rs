//! `weave publish` command implementation.

use std::path::PathBuf;

use clap::Args;
use weave_config::CliSettings;
use weave_site::{CancelToken, FsSink};

use super::SiteArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the publish command.
#[derive(Args)]
pub(crate) struct PublishArgs {
    /// Output directory (overrides config).
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Enable the digest cache (default: enabled).
    #[arg(long)]
    cache: Option<bool>,

    /// Disable the digest cache, rewriting every page.
    #[arg(long, conflicts_with = "cache")]
    no_cache: bool,

    #[command(flatten)]
    pub site: SiteArgs,
}

impl PublishArgs {
    /// Execute the publish command.
    ///
    /// # Errors
    ///
    /// Returns an error if the site fails to load or any page fails to
    /// publish.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let cache_enabled = if self.no_cache { Some(false) } else { self.cache };

        let settings = CliSettings {
            output_dir: self.output_dir,
            cache_enabled,
            ..Default::default()
        };
        let mut loaded = self.site.load(settings)?;
        let output_dir = loaded.config.publish.output_dir.clone();
        output.info(&format!("Publishing to {}", output_dir.display()));

        let sink = FsSink::new(output_dir);
        let manifest = &mut loaded.manifest;
        let report = manifest
            .site
            .publish(&manifest.content, &sink, &CancelToken::new());

        for uid in &report.written {
            output.info(&format!("  wrote {uid}"));
        }
        for (uid, err) in &report.failed {
            output.error(&format!("  {uid}: {}", crate::error_chain(err)));
        }

        let summary = format!(
            "{} written, {} unchanged, {} up to date",
            report.written.len(),
            report.unchanged.len(),
            report.skipped_fresh
        );
        if report.failed.is_empty() {
            output.success(&format!("Published: {summary}"));
            Ok(())
        } else {
            output.warning(&format!("Published with errors: {summary}"));
            Err(CliError::Validation(format!("{} pages failed to publish", report.failed.len())))
        }
    }
}
