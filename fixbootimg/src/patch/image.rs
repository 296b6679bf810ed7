/*
 * SPDX-FileCopyrightText: 2023-2024 Andrew Gunnerson
 * SPDX-License-Identifier: GPL-3.0-only
 */

use std::{
    io::{self, Cursor, Seek, SeekFrom, Write},
    ops::Range,
};

use thiserror::Error;
use tracing::{debug, trace};

use crate::{
    format::{
        avb::{self, Footer},
        bootimage::{self, BOOT_MAGIC},
        padding,
        signer::{self, SEANDROID_ENFORCE, SIGNER_BLOCK, SIGNER_BLOCK_SIZE, SIGNER_MAGIC},
    },
    stream::ToWriter,
    util::{self, NumBytes},
};

/// Size of the `boot` and `recovery` partitions.
pub const DEFAULT_PARTITION_SIZE: u64 = 64 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid partition size: {0}")]
    InvalidPartitionSize(u64),
    #[error("Invalid boot image")]
    BootImage(#[from] bootimage::Error),
    #[error("SignerVer02 magic already present at offset {0}; the image doesn't require fixing")]
    AlreadyPatched(usize),
    #[error("Signer block at offset {offset} does not fit before the AVB footer at {footer_offset}")]
    SignerBlockOutOfBounds { offset: u64, footer_offset: u64 },
    #[error("Expected zeros for signer block, but found data in {:?}", .0)]
    SignerRegionNotZero(Range<usize>),
    #[error("Need to truncate {excess} bytes, but image only ends with {zeros} bytes of zero padding")]
    TruncateNotZero { excess: u64, zeros: u64 },
    #[error("Fixed image's size ({actual}) does not match the partition size ({expected})")]
    SizeMismatch { actual: u64, expected: u64 },
    #[error("AVB error")]
    Avb(#[from] avb::Error),
    #[error("I/O error")]
    Io(#[from] io::Error),
}

type Result<T> = std::result::Result<T, Error>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PatchConfig {
    /// Exact size of the patched image. The AVB footer is placed at the very
    /// end of the partition.
    pub partition_size: u64,
}

impl Default for PatchConfig {
    fn default() -> Self {
        Self {
            partition_size: DEFAULT_PARTITION_SIZE,
        }
    }
}

impl PatchConfig {
    /// Smallest partition that can hold the boot image magic, the signer
    /// block, and the AVB footer.
    pub const MIN_PARTITION_SIZE: u64 =
        (BOOT_MAGIC.len() + SIGNER_BLOCK_SIZE + Footer::SIZE) as u64;

    fn checked_partition_size(&self) -> Result<usize> {
        if self.partition_size < Self::MIN_PARTITION_SIZE {
            return Err(Error::InvalidPartitionSize(self.partition_size));
        }

        usize::try_from(self.partition_size)
            .map_err(|_| Error::InvalidPartitionSize(self.partition_size))
    }
}

/// How the AVB footer was handled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FooterMode {
    /// The image already had a footer and its original image size field was
    /// updated in place.
    Updated {
        version_major: u32,
        version_minor: u32,
    },
    /// The image had no footer and a new one was appended at the end of the
    /// partition.
    Added,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PatchReport {
    pub footer_mode: FooterMode,
    /// Whether a [`SEANDROID_ENFORCE`] marker was found after the payload and
    /// kept in front of the signer block.
    pub enforce_marker_preserved: bool,
    /// Number of trailing padding bytes removed to make room for the signer
    /// block and footer.
    pub truncated: u64,
    /// Offset of the signer block.
    pub signer_offset: u64,
    /// Value of the footer's original image size field after patching.
    pub original_image_size: u64,
}

/// Insert the signer block into an image that already has an AVB footer. The
/// footer stays where it is, so the image size does not change.
fn update_footer(data: &mut [u8], footer: &Footer) -> Result<PatchReport> {
    debug!("Found AVB footer: {footer:?}");

    let footer_offset = (data.len() - Footer::SIZE) as u64;
    let mut offset = footer.original_image_size;

    if offset > footer_offset {
        return Err(Error::SignerBlockOutOfBounds {
            offset,
            footer_offset,
        });
    }

    let enforce_marker_preserved = signer::has_enforce_marker(data, offset as usize);
    if enforce_marker_preserved {
        debug!("Found {} at {offset}", SEANDROID_ENFORCE.escape_ascii());
        offset += SEANDROID_ENFORCE.len() as u64;
    }

    let end = offset + SIGNER_BLOCK_SIZE as u64;
    if end > footer_offset {
        return Err(Error::SignerBlockOutOfBounds {
            offset,
            footer_offset,
        });
    }

    let region = offset as usize..end as usize;
    if !util::is_zero(&data[region.clone()]) {
        return Err(Error::SignerRegionNotZero(region));
    }

    trace!("Writing signer magic at {offset}");
    data[region.start..region.start + SIGNER_MAGIC.len()].copy_from_slice(&SIGNER_MAGIC);

    debug!("Updating original image size: {} -> {end}", footer.original_image_size);
    avb::set_original_image_size(data, end)?;

    Ok(PatchReport {
        footer_mode: FooterMode::Updated {
            version_major: footer.version_major,
            version_minor: footer.version_minor,
        },
        enforce_marker_preserved,
        truncated: 0,
        signer_offset: offset,
        original_image_size: end,
    })
}

/// Append the signer block and a new AVB footer. If the image is too large to
/// fit both, trailing zero padding is removed first.
fn add_footer(data: &mut Vec<u8>, partition_size: usize) -> Result<PatchReport> {
    let new_size = data.len() + SIGNER_BLOCK_SIZE + Footer::SIZE;
    let mut truncated = 0;

    if new_size >= partition_size {
        // The partition is always larger than the signer block and footer, so
        // this never reaches past the boot image magic.
        let excess = new_size - partition_size;
        let keep = data.len() - excess;

        if !util::is_zero(&data[keep..]) {
            return Err(Error::TruncateNotZero {
                excess: excess as u64,
                zeros: padding::trailing_zeros(data) as u64,
            });
        }

        debug!("Truncating {:?} of trailing padding", NumBytes(excess));
        data.truncate(keep);
        truncated = excess as u64;
    }

    let signer_offset = data.len() as u64;
    let footer_offset = (partition_size - Footer::SIZE) as u64;

    let mut writer = Cursor::new(data);
    writer.seek(SeekFrom::End(0))?;
    writer.write_all(&SIGNER_BLOCK)?;

    let original_image_size = writer.stream_position()?;
    let padded = padding::write_zeros_until(&mut writer, footer_offset)?;
    trace!("Padded image with {:?} before footer", NumBytes(padded));

    let footer = Footer::new(original_image_size);
    debug!("Appending AVB footer: {footer:?}");
    footer.to_writer(&mut writer)?;

    Ok(PatchReport {
        footer_mode: FooterMode::Added,
        enforce_marker_preserved: false,
        truncated,
        signer_offset,
        original_image_size,
    })
}

/// Check that `data` is a boot image that has not been patched yet and return
/// its AVB footer, if any. This does not modify anything, so callers can report
/// the footer before [`patch_image`] runs the checks that may fail.
pub fn check_image(data: &[u8]) -> Result<Option<Footer>> {
    bootimage::check_magic(data)?;

    if let Some(offset) = signer::find_magic(data) {
        return Err(Error::AlreadyPatched(offset));
    }

    let footer = avb::find_footer(data)?;

    Ok(footer)
}

/// Patch a boot or recovery image in place so that it contains a `SignerVer02`
/// placeholder block right after the payload and an AVB footer whose original
/// image size covers the block. On success, `data` is exactly
/// `config.partition_size` bytes long.
///
/// On failure, `data` may have been partially modified and must be discarded.
pub fn patch_image(data: &mut Vec<u8>, config: &PatchConfig) -> Result<PatchReport> {
    let partition_size = config.checked_partition_size()?;

    let report = match check_image(data)? {
        Some(footer) => update_footer(data, &footer)?,
        None => add_footer(data, partition_size)?,
    };

    if data.len() != partition_size {
        return Err(Error::SizeMismatch {
            actual: data.len() as u64,
            expected: config.partition_size,
        });
    }

    Ok(report)
}
