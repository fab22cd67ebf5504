/*
 * SPDX-FileCopyrightText: 2023 Tommaso Fontana
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use std::io::SeekFrom;

use log::trace;

use crate::error::{Error, Result};
use crate::traits::*;
use crate::utils::{get_bit, get_bits, low_mask, set_bit, set_bits};

/// Length in bytes of the header preceding the data of a [`BitStream`].
pub const HEADER_LEN: u64 = 9;

/// A random-access bit stream over a [`ByteStream`].
///
/// The stream is preceded by a header of [`HEADER_LEN`] bytes:
///
/// ```text
/// [1 byte: bits used in the last byte][8 bytes: end offset (i64)][data...]
/// ```
///
/// The end offset is the absolute offset of the last, possibly partial, byte
/// (or of the next byte if the last one is full). The data starts at the
/// *origin*, right after the header; positions and lengths are in bits
/// relative to the origin. The header is rewritten by
/// [`flush`](BitStream::flush), so length and content survive a
/// [`close`](BitStream::close) followed by an [`open`](BitStream::open).
///
/// The byte holding the current bit is cached. Writing merges new bits into
/// the cached byte, which is loaded from the backend unless it lies past the
/// logical end of the stream (in which case it is fresh and starts at zero).
/// Thus, writes never clobber previously written bits sharing a byte.
///
/// The backend cursor always sits on the cached byte: when moving to the next
/// byte the cached one is written back if dirty, and otherwise skipped with
/// [`skip_byte`](ByteStream::skip_byte); writing it back without moving (as in
/// [`flush`](BitStream::flush)) is followed by
/// [`back_byte`](ByteStream::back_byte).
#[derive(Debug)]
pub struct BitStream<B: ByteStream> {
    backend: B,
    /// Absolute offset of the first data byte.
    origin: u64,
    /// Absolute offset of the last, possibly partial, byte.
    end: u64,
    /// Number of bits used in the byte at `end`.
    last_bits: u8,
    /// Absolute offset of the cached byte.
    byte_pos: u64,
    /// Index of the current bit in the cached byte.
    bit_index: u8,
    /// The cached byte.
    temp: u8,
    dirty: bool,
}

impl<B: ByteStream> BitStream<B> {
    /// Create an empty stream whose header starts at the current position of
    /// `backend`.
    pub fn create(mut backend: B) -> Result<Self> {
        let header = backend.position()?;
        let origin = header + HEADER_LEN;
        backend.write_byte(0)?;
        backend.write_i64(origin as i64)?;
        trace!("Created bit stream with origin {}", origin);
        Ok(Self {
            backend,
            origin,
            end: origin,
            last_bits: 0,
            byte_pos: origin,
            bit_index: 0,
            temp: 0,
            dirty: false,
        })
    }

    /// Open an existing stream whose header starts at the current position
    /// of `backend`. The stream is positioned at its beginning.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidData`] if the header is inconsistent.
    pub fn open(mut backend: B) -> Result<Self> {
        let header = backend.position()?;
        let origin = header + HEADER_LEN;
        let last_bits = backend.read_byte()?.ok_or(Error::EndOfStream)?;
        let end = backend.read_i64()?;
        if last_bits >= 8 || end < origin as i64 {
            return Err(Error::InvalidData(format!(
                "bit stream header at {}: end {}, {} bits in last byte",
                header, end, last_bits
            )));
        }
        let mut stream = Self {
            backend,
            origin,
            end: end as u64,
            last_bits,
            byte_pos: origin,
            bit_index: 0,
            temp: 0,
            dirty: false,
        };
        stream.load_current()?;
        Ok(stream)
    }

    /// Return the absolute offset of the first data byte.
    pub fn origin(&self) -> u64 {
        self.origin
    }

    /// Return the length of the stream, in bits.
    pub fn len(&self) -> u64 {
        (self.end - self.origin) * 8 + self.last_bits as u64
    }

    /// Return whether the stream is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the current position, in bits.
    pub fn position(&self) -> u64 {
        (self.byte_pos - self.origin) * 8 + self.bit_index as u64
    }

    /// Move to a position, in bits.
    pub fn set_position(&mut self, bit_pos: u64) -> Result<()> {
        self.seek(SeekFrom::Start(bit_pos)).map(|_| ())
    }

    /// Move to the beginning of the stream.
    pub fn reset(&mut self) -> Result<()> {
        self.set_position(0)
    }

    /// Move to a position expressed in bits and return it.
    ///
    /// # Errors
    ///
    /// [`Error::OutOfRange`] if the target lies outside `[0, len]`.
    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        let len = self.len();
        let target = match pos {
            SeekFrom::Start(n) => n as i128,
            SeekFrom::Current(d) => self.position() as i128 + d as i128,
            SeekFrom::End(d) => len as i128 + d as i128,
        };
        if target < 0 || target > len as i128 {
            return Err(Error::OutOfRange {
                position: target,
                min: 0,
                max: len,
            });
        }
        let target = target as u64;
        self.commit()?;
        self.byte_pos = self.origin + target / 8;
        self.bit_index = (target % 8) as u8;
        self.backend.seek_to(self.byte_pos)?;
        self.load_current()?;
        Ok(target)
    }

    /// Write the cached byte if needed, persist the header and flush the
    /// backend. The position is unchanged.
    pub fn flush(&mut self) -> Result<()> {
        self.commit()?;
        self.backend.seek_to(self.origin - HEADER_LEN)?;
        self.backend.write_byte(self.last_bits)?;
        self.backend.write_i64(self.end as i64)?;
        self.backend.seek_to(self.byte_pos)?;
        self.backend.flush()?;
        trace!(
            "Flushed bit stream header: end {}, {} bits in last byte",
            self.end, self.last_bits
        );
        Ok(())
    }

    /// Forward to the length-setting method of the backend.
    ///
    /// The header is not touched: the caller must keep it consistent.
    pub fn set_len(&mut self, len: u64) -> Result<()> {
        self.backend.set_len(len)?;
        Ok(())
    }

    /// Flush the stream and return the backend.
    pub fn close(mut self) -> Result<B> {
        self.flush()?;
        Ok(self.backend)
    }

    /// Read a byte at the current (possibly unaligned) position.
    pub fn read_byte(&mut self) -> Result<u8> {
        Ok(self.read_bits(8)? as u8)
    }

    /// Read `n` bits packed most significant first; the last byte, if
    /// partial, is padded with zeros at the bottom.
    pub fn read_packed_bits(&mut self, n: usize) -> Result<Vec<u8>> {
        self.check_available(n as u64)?;
        let mut result = Vec::with_capacity(n.div_ceil(8));
        for _ in 0..n / 8 {
            result.push(self.read_bits(8)? as u8);
        }
        let rem = n % 8;
        if rem != 0 {
            result.push((self.read_bits(rem)? as u8) << (8 - rem));
        }
        Ok(result)
    }

    /// Read whole bytes into `buf`, up to the end of the stream, and return
    /// how many were read.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let available = ((self.len() - self.position()) / 8) as usize;
        let count = buf.len().min(available);
        for byte in &mut buf[..count] {
            *byte = self.read_bits(8)? as u8;
        }
        Ok(count)
    }

    /// Write the bytes of `buf` at the current (possibly unaligned) position.
    pub fn write(&mut self, buf: &[u8]) -> Result<()> {
        for &byte in buf {
            self.write_bits(byte as u64, 8)?;
        }
        Ok(())
    }

    /// Write `len` bits of `byte`: the highest ones if `high_aligned`,
    /// otherwise the lowest ones.
    pub fn write_byte_bits(&mut self, byte: u8, len: usize, high_aligned: bool) -> Result<usize> {
        if len > 8 {
            return Err(Error::InvalidArgument(format!(
                "cannot write {} bits of a byte",
                len
            )));
        }
        if len == 0 {
            return Ok(0);
        }
        let value = if high_aligned {
            byte >> (8 - len)
        } else {
            byte & low_mask(len)
        };
        self.write_bits(value as u64, len)
    }

    fn check_available(&self, n: u64) -> Result<()> {
        if self.position() + n > self.len() {
            return Err(Error::EndOfStream);
        }
        Ok(())
    }

    /// Load the byte under the cursor into the cache, leaving the cursor on it.
    fn load_current(&mut self) -> Result<()> {
        let stored =
            self.byte_pos < self.end || (self.byte_pos == self.end && self.last_bits > 0);
        self.temp = 0;
        if stored {
            if let Some(byte) = self.backend.read_byte()? {
                self.backend.back_byte()?;
                self.temp = byte;
            }
        }
        self.dirty = false;
        Ok(())
    }

    /// Write back the cached byte, if dirty, leaving the cursor on it.
    fn commit(&mut self) -> Result<()> {
        if self.dirty {
            self.backend.write_byte(self.temp)?;
            self.backend.back_byte()?;
            self.dirty = false;
        }
        Ok(())
    }

    /// Leave the cached byte and load the next one.
    fn next_byte(&mut self) -> Result<()> {
        if self.dirty {
            self.backend.write_byte(self.temp)?;
            self.dirty = false;
        } else {
            self.backend.skip_byte()?;
        }
        self.byte_pos += 1;
        self.bit_index = 0;
        self.load_current()
    }

    /// Extend the logical end up to the current position.
    fn grow(&mut self) {
        let pos = self.position();
        if pos > self.len() {
            self.end = self.origin + pos / 8;
            self.last_bits = (pos % 8) as u8;
        }
    }
}

impl<B: ByteStream> BitRead for BitStream<B> {
    fn read_bit(&mut self) -> Result<bool> {
        self.check_available(1)?;
        let bit = get_bit(self.temp, self.bit_index as usize);
        self.bit_index += 1;
        if self.bit_index == 8 {
            self.next_byte()?;
        }
        Ok(bit)
    }

    fn read_bits(&mut self, n: usize) -> Result<u64> {
        if n > 64 {
            return Err(Error::InvalidArgument(format!(
                "cannot read {} bits into a u64",
                n
            )));
        }
        self.check_available(n as u64)?;
        let mut value = 0_u64;
        let mut left = n;
        while left > 0 {
            let take = left.min(8 - self.bit_index as usize);
            let chunk = get_bits(self.temp, self.bit_index as usize, take);
            value = (value << take) | chunk as u64;
            self.bit_index += take as u8;
            left -= take;
            if self.bit_index == 8 {
                self.next_byte()?;
            }
        }
        Ok(value)
    }
}

impl<B: ByteStream> BitWrite for BitStream<B> {
    fn write_bit(&mut self, bit: bool) -> Result<()> {
        self.temp = set_bit(self.temp, self.bit_index as usize, bit);
        self.dirty = true;
        self.bit_index += 1;
        self.grow();
        if self.bit_index == 8 {
            self.next_byte()?;
        }
        Ok(())
    }

    fn write_bits(&mut self, value: u64, n: usize) -> Result<usize> {
        if n > 64 {
            return Err(Error::InvalidArgument(format!(
                "cannot write {} bits from a u64",
                n
            )));
        }
        #[cfg(feature = "checks")]
        if n < 64 && value >> n != 0 {
            return Err(Error::InvalidArgument(format!(
                "value {} does not fit in {} bits",
                value, n
            )));
        }
        let mut left = n;
        while left > 0 {
            let take = left.min(8 - self.bit_index as usize);
            let chunk = (value >> (left - take)) as u8 & low_mask(take);
            self.temp = set_bits(self.temp, self.bit_index as usize, take, chunk, false);
            self.dirty = true;
            self.bit_index += take as u8;
            left -= take;
            self.grow();
            if self.bit_index == 8 {
                self.next_byte()?;
            }
        }
        Ok(n)
    }

    fn flush(&mut self) -> Result<()> {
        BitStream::flush(self)
    }
}

impl<B: ByteStream> BitSeek for BitStream<B> {
    fn bit_pos(&mut self) -> Result<u64> {
        Ok(self.position())
    }

    fn set_bit_pos(&mut self, bit_pos: u64) -> Result<()> {
        self.set_position(bit_pos)
    }
}
