//! SiteDigest CLI: turn a web page or a small site into Markdown and facts.
//!
//! Runs single-page and crawl jobs through the background orchestrator,
//! saves their artifacts, and optionally hands crawl reports to the
//! external ingestion process.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
