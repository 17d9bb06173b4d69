//! dexrefresh CLI: refresh the local creature cache from a record file.
//!
//! Reads creature records, enriches every ability reference over HTTP and
//! replaces the cached creature set in one step.

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
