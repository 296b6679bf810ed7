// SPDX-FileCopyrightText: 2023-2024 Andrew Gunnerson
// SPDX-License-Identifier: GPL-3.0-only

use std::io::{self, Seek, Write};

use crate::stream::WriteZerosExt;

/// Write zeros until the writer reaches `offset`. Returns the number of zeros
/// written. Nothing is written if the writer is already at or past `offset`.
/// [`Seek`] is only used for querying the file position.
pub fn write_zeros_until(mut writer: impl Write + Seek, offset: u64) -> io::Result<u64> {
    let pos = writer.stream_position()?;
    let padding = offset.saturating_sub(pos);

    writer.write_zeros_exact(padding)?;

    Ok(padding)
}

/// Number of bytes that can be removed from the end of `data` without touching
/// anything other than zero padding.
pub fn trailing_zeros(data: &[u8]) -> usize {
    data.iter().rev().take_while(|b| **b == 0).count()
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Seek, SeekFrom};

    use super::*;

    #[test]
    fn zeros_until() {
        let mut data = b"foo".to_vec();
        let mut writer = Cursor::new(&mut data);
        writer.seek(SeekFrom::End(0)).unwrap();

        assert_eq!(write_zeros_until(&mut writer, 8).unwrap(), 5);
        assert_eq!(write_zeros_until(&mut writer, 4).unwrap(), 0);
        assert_eq!(data, b"foo\0\0\0\0\0");
    }

    #[test]
    fn trailing() {
        assert_eq!(trailing_zeros(b""), 0);
        assert_eq!(trailing_zeros(b"foo"), 0);
        assert_eq!(trailing_zeros(b"f\0o\0\0"), 2);
        assert_eq!(trailing_zeros(b"\0\0\0"), 3);
    }
}
