/*
 * SPDX-FileCopyrightText: 2023-2024 Andrew Gunnerson
 * SPDX-License-Identifier: GPL-3.0-only
 */

use thiserror::Error;

pub const BOOT_MAGIC: [u8; 8] = *b"ANDROID!";

#[derive(Debug, Error)]
pub enum Error {
    #[error("Not an Android bootable image: unknown magic {:?}", .0.escape_ascii().to_string())]
    UnknownMagic([u8; 8]),
    #[error("{0} byte image size is too small to fit boot image magic")]
    TooSmall(u64),
}

type Result<T> = std::result::Result<T, Error>;

/// Check that the image starts with [`BOOT_MAGIC`]. Only the magic is checked.
/// The rest of the boot image header is opaque payload.
pub fn check_magic(data: &[u8]) -> Result<()> {
    let Some(magic) = data.first_chunk::<8>() else {
        return Err(Error::TooSmall(data.len() as u64));
    };

    if *magic != BOOT_MAGIC {
        return Err(Error::UnknownMagic(*magic));
    }

    Ok(())
}
