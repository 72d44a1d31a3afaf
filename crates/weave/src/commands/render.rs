//! `weave render` command implementation.

use std::fs;
use std::path::PathBuf;

use clap::Args;
use weave_config::CliSettings;

use super::SiteArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the render command.
#[derive(Args)]
pub(crate) struct RenderArgs {
    /// Identifier of the page to render.
    page: String,

    /// Write the HTML to a file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[command(flatten)]
    pub site: SiteArgs,
}

impl RenderArgs {
    /// Execute the render command.
    ///
    /// # Errors
    ///
    /// Returns an error if the site fails to load, the page does not exist,
    /// or its template cannot be parsed.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let loaded = self.site.load(CliSettings::default())?;
        let site = &loaded.manifest.site;

        let id = site
            .tree()
            .by_uid(&self.page)
            .ok_or_else(|| CliError::Validation(format!("no page with id {:?}", self.page)))?;
        let rendered = site.render_page(id, &loaded.manifest.content)?;

        for warning in rendered.tree.warnings() {
            output.warning(&format!("Warning: {warning}"));
        }

        match self.output {
            Some(path) => {
                fs::write(&path, &rendered.html)?;
                output.success(&format!("Rendered {} to {}", self.page, path.display()));
                output.muted(&format!("digest {}", rendered.digest));
            }
            None => output.result(&rendered.html)?,
        }
        Ok(())
    }
}
