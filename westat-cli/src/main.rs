//! Binary crate for the `westat` terminal weather display.
//!
//! This crate focuses on:
//! - Parsing CLI arguments
//! - Interactive configuration
//! - Logging setup
//! - The terminal render loop

use clap::Parser;

mod app;
mod cli;
mod logging;
mod ui;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cmd = cli::Cli::parse();
    cmd.run().await
}
