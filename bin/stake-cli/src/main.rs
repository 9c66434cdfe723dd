//! CLI for staking into a pool, requesting unstakes and withdrawing after the cooldown.

mod cli;
mod constants;
mod handlers;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use staking_common::logging::{self, LoggerConfig};

use crate::constants::SERVICE_NAME;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    logging::init(LoggerConfig::from_env(SERVICE_NAME)).context("failed to initialize logging")?;

    let cli = cli::Cli::parse();
    handlers::run(cli).await
}
