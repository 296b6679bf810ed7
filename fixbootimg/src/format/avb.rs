// SPDX-FileCopyrightText: 2023-2024 Andrew Gunnerson
// SPDX-License-Identifier: GPL-3.0-only

use std::{
    fmt,
    io::{self, Read, Write},
};

use thiserror::Error;
use zerocopy::{FromBytes, IntoBytes, byteorder::big_endian};
use zerocopy_derive::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::stream::{FromReader, ToWriter};

pub const FOOTER_VERSION_MAJOR: u32 = 1;
pub const FOOTER_VERSION_MINOR: u32 = 0;

pub const FOOTER_MAGIC: [u8; 4] = *b"AVBf";

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid VBMeta footer magic: {0:?}")]
    InvalidFooterMagic([u8; 4]),
    #[error("{0} byte image size is too small to fit footer")]
    TooSmallForFooter(u64),
    #[error("I/O error")]
    Io(#[from] io::Error),
}

type Result<T> = std::result::Result<T, Error>;

/// Raw on-disk layout for the AVB footer. All integers are big endian.
#[derive(Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(packed)]
struct RawFooter {
    /// Magic value. This should be equal to [`FOOTER_MAGIC`].
    magic: [u8; 4],
    version_major: big_endian::U32,
    version_minor: big_endian::U32,
    /// Size of the partition data that precedes the vbmeta header.
    original_image_size: big_endian::U64,
    vbmeta_offset: big_endian::U64,
    vbmeta_size: big_endian::U64,
    reserved: [u8; 28],
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Footer {
    pub version_major: u32,
    pub version_minor: u32,
    pub original_image_size: u64,
    pub vbmeta_offset: u64,
    pub vbmeta_size: u64,
    pub reserved: [u8; 28],
}

impl fmt::Debug for Footer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Footer")
            .field("version_major", &self.version_major)
            .field("version_minor", &self.version_minor)
            .field("original_image_size", &self.original_image_size)
            .field("vbmeta_offset", &self.vbmeta_offset)
            .field("vbmeta_size", &self.vbmeta_size)
            .field("reserved", &hex::encode(self.reserved))
            .finish()
    }
}

impl Footer {
    pub const SIZE: usize = 64;

    /// Create a footer with the supported version that only records the
    /// original image size. There is no vbmeta header to point to.
    pub fn new(original_image_size: u64) -> Self {
        Self {
            version_major: FOOTER_VERSION_MAJOR,
            version_minor: FOOTER_VERSION_MINOR,
            original_image_size,
            vbmeta_offset: 0,
            vbmeta_size: 0,
            reserved: [0u8; 28],
        }
    }

    pub fn is_supported_version(&self) -> bool {
        self.version_major == FOOTER_VERSION_MAJOR && self.version_minor == FOOTER_VERSION_MINOR
    }
}

impl<R: Read> FromReader<R> for Footer {
    type Error = Error;

    fn from_reader(mut reader: R) -> Result<Self> {
        let raw = RawFooter::read_from_io(&mut reader)?;

        if raw.magic != FOOTER_MAGIC {
            return Err(Error::InvalidFooterMagic(raw.magic));
        }

        let footer = Self {
            version_major: raw.version_major.get(),
            version_minor: raw.version_minor.get(),
            original_image_size: raw.original_image_size.get(),
            vbmeta_offset: raw.vbmeta_offset.get(),
            vbmeta_size: raw.vbmeta_size.get(),
            reserved: raw.reserved,
        };

        Ok(footer)
    }
}

impl<W: Write> ToWriter<W> for Footer {
    type Error = Error;

    fn to_writer(&self, mut writer: W) -> Result<()> {
        let raw = RawFooter {
            magic: FOOTER_MAGIC,
            version_major: self.version_major.into(),
            version_minor: self.version_minor.into(),
            original_image_size: self.original_image_size.into(),
            vbmeta_offset: self.vbmeta_offset.into(),
            vbmeta_size: self.vbmeta_size.into(),
            reserved: self.reserved,
        };

        writer.write_all(raw.as_bytes())?;

        Ok(())
    }
}

/// Load the footer from the last [`Footer::SIZE`] bytes of an image. [`None`]
/// is returned if the image is too small or does not end with a footer.
pub fn find_footer(data: &[u8]) -> Result<Option<Footer>> {
    let Some(offset) = data.len().checked_sub(Footer::SIZE) else {
        return Ok(None);
    };

    match Footer::from_reader(&data[offset..]) {
        Ok(f) => Ok(Some(f)),
        Err(Error::InvalidFooterMagic(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Rewrite the `original_image_size` field of the footer at the end of `data`
/// in place. All other fields are left untouched.
pub fn set_original_image_size(data: &mut [u8], original_image_size: u64) -> Result<()> {
    let image_size = data.len() as u64;
    let (_, raw) = RawFooter::mut_from_suffix(data)
        .map_err(|_| Error::TooSmallForFooter(image_size))?;

    if raw.magic != FOOTER_MAGIC {
        return Err(Error::InvalidFooterMagic(raw.magic));
    }

    raw.original_image_size = original_image_size.into();

    Ok(())
}
