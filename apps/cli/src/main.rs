//! MarketScope CLI: multi-source market research from a single query.
//!
//! Discovers competitors, synthesizes storefront reviews, collects related
//! search trends and webpage insights, and saves a structured report.

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
