/*
 * SPDX-FileCopyrightText: 2023 Andrew Gunnerson
 * SPDX-License-Identifier: GPL-3.0-only
 */

use std::io;

use anyhow::{Result, bail};
use clap::{CommandFactory, Parser, ValueEnum, error::ErrorKind};
use tracing::Level;

use crate::cli::patch::{self, PatchCli};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Error => Self::ERROR,
            LogLevel::Warn => Self::WARN,
            LogLevel::Info => Self::INFO,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Trace => Self::TRACE,
        }
    }
}

/// Add the AVB footer and SignerVer02 placeholder that some bootloaders
/// require in boot and recovery images.
#[derive(Debug, Parser)]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub patch: PatchCli,

    /// Lowest log message severity to output.
    #[arg(long, value_name = "LEVEL", value_enum, default_value_t)]
    pub log_level: LogLevel,
}

/// Log to stderr so that stdout only contains status messages.
pub fn init_logging(log_level: LogLevel) {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_max_level(Level::from(log_level))
        .init();
}

/// Parse the command line. Help and version requests exit immediately, but
/// all other argument errors are returned so that they are reported like any
/// other failure.
fn parse_args() -> Result<Cli> {
    match Cli::try_parse() {
        Ok(cli) => Ok(cli),
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => {
            let reason = e.kind().as_str().unwrap_or("invalid arguments");
            bail!("{reason}; {}", Cli::command().render_usage());
        }
    }
}

pub fn main() -> Result<()> {
    let cli = parse_args()?;

    init_logging(cli.log_level);

    patch::patch_main(&cli.patch)
}
