//! Weave CLI - page engine.
//!
//! Provides commands for:
//! - `render`: Render one page of a site to HTML
//! - `status`: Show pages with their URLs and publish state
//! - `publish`: Write changed pages to the output directory

mod commands;
mod error;
mod manifest;
mod output;

use std::error::Error;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{PublishArgs, RenderArgs, StatusArgs};
use output::Output;

/// Weave - page engine.
#[derive(Parser)]
#[command(name = "weave", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a page to HTML.
    Render(RenderArgs),
    /// Show pages and their publish state.
    Status(StatusArgs),
    /// Publish changed pages.
    Publish(PublishArgs),
}

impl Commands {
    fn verbose(&self) -> bool {
        match self {
            Self::Render(args) => args.site.verbose,
            Self::Status(args) => args.site.verbose,
            Self::Publish(args) => args.site.verbose,
        }
    }
}

/// Format an error with its chain of sources.
pub(crate) fn error_chain(err: &dyn Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.command.verbose() {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Render(args) => args.execute(),
        Commands::Status(args) => args.execute(),
        Commands::Publish(args) => args.execute(),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {}", error_chain(&err)));
        std::process::exit(1);
    }
}
