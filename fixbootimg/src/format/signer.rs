/*
 * SPDX-FileCopyrightText: 2024 Andrew Gunnerson
 * SPDX-License-Identifier: GPL-3.0-only
 */

//! Placeholder block expected by bootloaders that look for a `SignerVer02`
//! signature right after the image payload. Nothing is actually signed. The
//! block only carries the magic so that the bootloader accepts the layout.

use memchr::memmem;

pub const SIGNER_MAGIC: [u8; 11] = *b"SignerVer02";

/// Size of the whole signer block, including the magic.
pub const SIGNER_BLOCK_SIZE: usize = 512;

/// Signer block as written to the image: the magic followed by zeros.
pub const SIGNER_BLOCK: [u8; SIGNER_BLOCK_SIZE] = {
    let mut block = [0u8; SIGNER_BLOCK_SIZE];
    let mut i = 0;

    while i < SIGNER_MAGIC.len() {
        block[i] = SIGNER_MAGIC[i];
        i += 1;
    }

    block
};

/// Security enforcement marker that some build systems append to the payload.
pub const SEANDROID_ENFORCE: [u8; 16] = *b"SEANDROIDENFORCE";

/// Find the first occurrence of [`SIGNER_MAGIC`] anywhere in the image.
pub fn find_magic(data: &[u8]) -> Option<usize> {
    memmem::find(data, &SIGNER_MAGIC)
}

/// Check if [`SEANDROID_ENFORCE`] is present at `offset`.
pub fn has_enforce_marker(data: &[u8], offset: usize) -> bool {
    offset
        .checked_add(SEANDROID_ENFORCE.len())
        .and_then(|end| data.get(offset..end))
        .is_some_and(|m| m == SEANDROID_ENFORCE.as_slice())
}
