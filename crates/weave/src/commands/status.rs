//! `weave status` command implementation.

use clap::Args;
use weave_config::CliSettings;

use super::SiteArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the status command.
#[derive(Args)]
pub(crate) struct StatusArgs {
    #[command(flatten)]
    pub site: SiteArgs,
}

impl StatusArgs {
    /// Execute the status command: list every page with its URL, upload path
    /// and last published digest.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let loaded = self.site.load(CliSettings::default())?;
        let site = &loaded.manifest.site;
        let paths = site.paths();

        output.highlight(&format!("{} pages", site.tree().len()));
        for (id, page) in site.tree().iter() {
            let depth = site.tree().ancestors(id).len();
            let digest = site
                .tracker()
                .stored_digest(page.uid())
                .map_or_else(|| "never published".to_owned(), |d| d.to_hex()[..12].to_owned());

            output.info(&format!("{}{} ({})", "  ".repeat(depth), page.title(), page.uid()));
            output.muted(&format!(
                "{}  url: {}  file: {}  {digest}",
                "  ".repeat(depth),
                paths.url(id)?,
                paths.upload_path(id)?,
            ));
        }
        Ok(())
    }
}
