/*
 * SPDX-FileCopyrightText: 2023 Tommaso Fontana
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use std::io::{Cursor, Read, Seek, SeekFrom, Write};

/// A random-access byte stream: the medium every bit stream and record
/// stream of this crate is layered on.
///
/// The trait is an extension of [`Read`], [`Write`], and [`Seek`]; the only
/// required method is [`set_len`](ByteStream::set_len). All integers are
/// stored little-endian; this is a private on-disk format, not a wire format.
///
/// [`back_byte`](ByteStream::back_byte) and
/// [`skip_byte`](ByteStream::skip_byte) are cursor bookkeeping: they let a
/// caller look at the byte under the cursor and then put the cursor back on
/// it (or step over it without reading). Bit streams rely on them to merge
/// partially written bytes with what is already stored.
pub trait ByteStream: Read + Write + Seek {
    /// Truncate or extend the stream to `len` bytes. Extension fills with
    /// zeros.
    fn set_len(&mut self, len: u64) -> std::io::Result<()>;

    /// Return the length of the stream without moving the cursor.
    fn len(&mut self) -> std::io::Result<u64> {
        let pos = self.stream_position()?;
        let end = self.seek(SeekFrom::End(0))?;
        if pos != end {
            self.seek(SeekFrom::Start(pos))?;
        }
        Ok(end)
    }

    /// Return the current position.
    #[inline(always)]
    fn position(&mut self) -> std::io::Result<u64> {
        self.stream_position()
    }

    /// Move to an absolute offset.
    #[inline(always)]
    fn seek_to(&mut self, offset: u64) -> std::io::Result<u64> {
        self.seek(SeekFrom::Start(offset))
    }

    /// Move forward `n` bytes.
    #[inline(always)]
    fn seek_forward(&mut self, n: u64) -> std::io::Result<u64> {
        self.seek(SeekFrom::Current(n as i64))
    }

    /// Move backward `n` bytes.
    #[inline(always)]
    fn seek_backward(&mut self, n: u64) -> std::io::Result<u64> {
        self.seek(SeekFrom::Current(-(n as i64)))
    }

    /// Move to the end of the stream and return its length.
    #[inline(always)]
    fn seek_to_end(&mut self) -> std::io::Result<u64> {
        self.seek(SeekFrom::End(0))
    }

    /// Move the cursor back on the byte just read or written.
    #[inline(always)]
    fn back_byte(&mut self) -> std::io::Result<u64> {
        self.seek_backward(1)
    }

    /// Step over the byte under the cursor without reading it.
    #[inline(always)]
    fn skip_byte(&mut self) -> std::io::Result<u64> {
        self.seek_forward(1)
    }

    /// Read a byte, or return `None` at end of stream.
    fn read_byte(&mut self) -> std::io::Result<Option<u8>> {
        let mut byte = [0_u8];
        loop {
            match self.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(byte[0])),
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Write a byte.
    #[inline(always)]
    fn write_byte(&mut self, byte: u8) -> std::io::Result<()> {
        self.write_all(&[byte])
    }

    /// Read an unsigned integer stored on `width` bytes (at most 8).
    fn read_uint(&mut self, width: usize) -> std::io::Result<u64> {
        debug_assert!(width <= 8);
        let mut bytes = [0_u8; 8];
        self.read_exact(&mut bytes[..width])?;
        Ok(u64::from_le_bytes(bytes))
    }

    /// Write the lowest `width` bytes (at most 8) of `value`.
    fn write_uint(&mut self, value: u64, width: usize) -> std::io::Result<()> {
        debug_assert!(width <= 8);
        debug_assert!(width == 8 || value >> (8 * width) == 0);
        self.write_all(&value.to_le_bytes()[..width])
    }

    fn read_u16(&mut self) -> std::io::Result<u16> {
        let mut bytes = [0_u8; 2];
        self.read_exact(&mut bytes)?;
        Ok(u16::from_le_bytes(bytes))
    }

    fn read_i32(&mut self) -> std::io::Result<i32> {
        let mut bytes = [0_u8; 4];
        self.read_exact(&mut bytes)?;
        Ok(i32::from_le_bytes(bytes))
    }

    fn read_i64(&mut self) -> std::io::Result<i64> {
        let mut bytes = [0_u8; 8];
        self.read_exact(&mut bytes)?;
        Ok(i64::from_le_bytes(bytes))
    }

    fn read_u64(&mut self) -> std::io::Result<u64> {
        let mut bytes = [0_u8; 8];
        self.read_exact(&mut bytes)?;
        Ok(u64::from_le_bytes(bytes))
    }

    fn write_u16(&mut self, value: u16) -> std::io::Result<()> {
        self.write_all(&value.to_le_bytes())
    }

    fn write_i32(&mut self, value: i32) -> std::io::Result<()> {
        self.write_all(&value.to_le_bytes())
    }

    fn write_i64(&mut self, value: i64) -> std::io::Result<()> {
        self.write_all(&value.to_le_bytes())
    }

    fn write_u64(&mut self, value: u64) -> std::io::Result<()> {
        self.write_all(&value.to_le_bytes())
    }

    /// Write `n` zero bytes.
    fn write_zeros(&mut self, mut n: u64) -> std::io::Result<()> {
        const ZEROS: [u8; 4096] = [0; 4096];
        while n > 0 {
            let step = n.min(ZEROS.len() as u64) as usize;
            self.write_all(&ZEROS[..step])?;
            n -= step as u64;
        }
        Ok(())
    }
}

impl ByteStream for Cursor<Vec<u8>> {
    fn set_len(&mut self, len: u64) -> std::io::Result<()> {
        self.get_mut().resize(len as usize, 0);
        Ok(())
    }

    fn len(&mut self) -> std::io::Result<u64> {
        Ok(self.get_ref().len() as u64)
    }
}

impl ByteStream for Cursor<&mut Vec<u8>> {
    fn set_len(&mut self, len: u64) -> std::io::Result<()> {
        self.get_mut().resize(len as usize, 0);
        Ok(())
    }

    fn len(&mut self) -> std::io::Result<u64> {
        Ok(self.get_ref().len() as u64)
    }
}

impl ByteStream for std::fs::File {
    fn set_len(&mut self, len: u64) -> std::io::Result<()> {
        std::fs::File::set_len(self, len)
    }
}

impl<T: ByteStream + ?Sized> ByteStream for &mut T {
    fn set_len(&mut self, len: u64) -> std::io::Result<()> {
        (**self).set_len(len)
    }

    fn len(&mut self) -> std::io::Result<u64> {
        (**self).len()
    }
}
