/*
 * SPDX-FileCopyrightText: 2023 Andrew Gunnerson
 * SPDX-License-Identifier: GPL-3.0-only
 */

use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use clap::Args;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::{
    cli::{status, warning},
    format::{avb::Footer, signer::SEANDROID_ENFORCE},
    patch::image::{self, DEFAULT_PARTITION_SIZE, PatchConfig},
    util,
};

#[derive(Debug, Args)]
pub struct PatchCli {
    /// Path to input boot or recovery image.
    #[arg(value_name = "INPUT", value_parser)]
    pub input: PathBuf,

    /// Path to output image. This must not already exist.
    #[arg(value_name = "OUTPUT", value_parser)]
    pub output: PathBuf,

    /// Size of the boot or recovery partition in bytes.
    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_PARTITION_SIZE)]
    pub partition_size: u64,
}

fn read_image(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("Failed to read image: {path:?}"))
}

/// Write the image to a temporary file next to `path` and then move it into
/// place. The move fails if `path` was created in the meantime.
fn write_image(path: &Path, data: &[u8]) -> Result<()> {
    let dir = util::parent_path(path);
    let mut temp = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temporary file in: {dir:?}"))?;

    temp.write_all(data)
        .with_context(|| format!("Failed to write image: {:?}", temp.path()))?;
    temp.as_file()
        .sync_all()
        .with_context(|| format!("Failed to sync image: {:?}", temp.path()))?;

    temp.persist_noclobber(path)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to save image: {path:?}"))?;

    Ok(())
}

/// Print how the footer will be handled. This runs before the layout checks in
/// [`image::patch_image`], which may fail.
fn print_plan(footer: Option<&Footer>) {
    match footer {
        Some(f) => {
            status!("Adding magic & modifying AVB footer...");

            if !f.is_supported_version() {
                warning!(
                    "Unexpected AVB footer version: {}.{}",
                    f.version_major,
                    f.version_minor,
                );
            }
        }
        None => status!("Adding magic & AVB footer..."),
    }
}

pub fn patch_main(cli: &PatchCli) -> Result<()> {
    if !cli.input.is_file() {
        bail!("File not found: {:?}", cli.input);
    }
    if cli.output.exists() {
        bail!("File already exists: {:?}", cli.output);
    }

    let mut data = read_image(&cli.input)?;

    let config = PatchConfig {
        partition_size: cli.partition_size,
    };

    let footer = image::check_image(&data)
        .with_context(|| format!("Failed to fix image: {:?}", cli.input))?;
    print_plan(footer.as_ref());

    let report = image::patch_image(&mut data, &config)
        .with_context(|| format!("Failed to fix image: {:?}", cli.input))?;
    debug!("Patch result: {report:?}");

    if report.enforce_marker_preserved {
        status!("Preserving {}", SEANDROID_ENFORCE.escape_ascii());
    }

    write_image(&cli.output, &data)?;

    status!("Success! Fixed image saved to {:?}", cli.output);

    Ok(())
}
