/*
 * SPDX-FileCopyrightText: 2023 Tommaso Fontana
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use log::trace;

use crate::error::{Error, Result};
use crate::traits::*;
use crate::utils::{get_bit, get_bits, low_mask, set_bit, set_bits};

/// A bit stream that is either written once or read once, sequentially.
///
/// Unlike [`BitStream`](crate::impls::BitStream), this stream has no header:
/// the caller decides at construction (or with [`reset`](Self::reset))
/// whether it is reading or writing, and the end of the data is the end of
/// the backend. Seeking is not supported.
///
/// While writing, bits are accumulated in a byte that is written out as soon
/// as it is full. [`flush`](Self::flush) writes a partial byte merging it with
/// the byte already stored at the same offset, if any, so that its trailing
/// bits are preserved.
#[derive(Debug)]
pub struct ForwardBitStream<B: ByteStream> {
    backend: B,
    /// Backend offset at construction.
    start: u64,
    for_read: bool,
    temp: u8,
    /// Bits used in `temp`; while reading, 8 means that `temp` is exhausted.
    bit_index: u8,
}

impl<B: ByteStream> ForwardBitStream<B> {
    /// Create a stream for writing at the current position of `backend`.
    pub fn writer(backend: B) -> Result<Self> {
        Self::new(backend, false)
    }

    /// Create a stream for reading from the current position of `backend`.
    pub fn reader(backend: B) -> Result<Self> {
        Self::new(backend, true)
    }

    /// Create a stream at the current position of `backend`.
    pub fn new(mut backend: B, for_read: bool) -> Result<Self> {
        let start = backend.position()?;
        Ok(Self {
            backend,
            start,
            for_read,
            temp: 0,
            bit_index: if for_read { 8 } else { 0 },
        })
    }

    /// Return whether the stream is reading.
    pub fn is_reading(&self) -> bool {
        self.for_read
    }

    /// Forward streams cannot seek.
    pub fn can_seek(&self) -> bool {
        false
    }

    /// Always fails with [`Error::InvalidOperation`].
    pub fn seek(&mut self, _pos: std::io::SeekFrom) -> Result<u64> {
        Err(Error::InvalidOperation(
            "forward bit streams cannot seek".into(),
        ))
    }

    /// Return the number of bits read or written so far.
    pub fn position(&mut self) -> Result<u64> {
        let bytes = self.backend.position()? - self.start;
        Ok(bytes * 8 + self.bit_index as u64 - if self.for_read { 8 } else { 0 })
    }

    /// Flush pending bits, go back to the starting offset and switch to
    /// reading or writing.
    pub fn reset(&mut self, for_read: bool) -> Result<()> {
        self.flush()?;
        self.backend.seek_to(self.start)?;
        self.for_read = for_read;
        self.temp = 0;
        self.bit_index = if for_read { 8 } else { 0 };
        Ok(())
    }

    /// Write out the partial byte, if any, merged with the trailing bits of
    /// the byte stored at the same offset (unless at the end of the backend).
    ///
    /// The cursor is moved back on the partial byte, so that writing can
    /// continue. Flushing a reading stream does nothing.
    pub fn flush(&mut self) -> Result<()> {
        if self.for_read {
            return Ok(());
        }
        if self.bit_index > 0 {
            let mut byte = self.temp;
            if let Some(stored) = self.backend.read_byte()? {
                self.backend.back_byte()?;
                let used = self.bit_index as usize;
                byte = set_bits(stored, 0, used, self.temp, true);
            }
            self.backend.write_byte(byte)?;
            self.backend.back_byte()?;
            trace!(
                "Flushed partial byte {:#010b} ({} bits)",
                byte, self.bit_index
            );
        }
        self.backend.flush()?;
        Ok(())
    }

    /// Flush the stream and return the backend.
    pub fn close(mut self) -> Result<B> {
        self.flush()?;
        Ok(self.backend)
    }

    fn check_read(&self) -> Result<()> {
        if self.for_read {
            Ok(())
        } else {
            Err(Error::InvalidOperation(
                "reading from a forward bit stream open for writing".into(),
            ))
        }
    }

    fn check_write(&self) -> Result<()> {
        if self.for_read {
            Err(Error::InvalidOperation(
                "writing to a forward bit stream open for reading".into(),
            ))
        } else {
            Ok(())
        }
    }

    fn refill(&mut self) -> Result<()> {
        if self.bit_index == 8 {
            self.temp = self.backend.read_byte()?.ok_or(Error::EndOfStream)?;
            self.bit_index = 0;
        }
        Ok(())
    }

    fn emit(&mut self) -> Result<()> {
        if self.bit_index == 8 {
            self.backend.write_byte(self.temp)?;
            self.temp = 0;
            self.bit_index = 0;
        }
        Ok(())
    }
}

impl<B: ByteStream> BitRead for ForwardBitStream<B> {
    fn read_bit(&mut self) -> Result<bool> {
        self.check_read()?;
        self.refill()?;
        let bit = get_bit(self.temp, self.bit_index as usize);
        self.bit_index += 1;
        Ok(bit)
    }

    fn read_bits(&mut self, n: usize) -> Result<u64> {
        self.check_read()?;
        if n > 64 {
            return Err(Error::InvalidArgument(format!(
                "cannot read {} bits into a u64",
                n
            )));
        }
        let mut value = 0_u64;
        let mut left = n;
        while left > 0 {
            self.refill()?;
            let take = left.min(8 - self.bit_index as usize);
            value = (value << take) | get_bits(self.temp, self.bit_index as usize, take) as u64;
            self.bit_index += take as u8;
            left -= take;
        }
        Ok(value)
    }
}

impl<B: ByteStream> BitWrite for ForwardBitStream<B> {
    fn write_bit(&mut self, bit: bool) -> Result<()> {
        self.check_write()?;
        self.temp = set_bit(self.temp, self.bit_index as usize, bit);
        self.bit_index += 1;
        self.emit()
    }

    fn write_bits(&mut self, value: u64, n: usize) -> Result<usize> {
        self.check_write()?;
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
            self.bit_index += take as u8;
            left -= take;
            self.emit()?;
        }
        Ok(n)
    }

    fn flush(&mut self) -> Result<()> {
        ForwardBitStream::flush(self)
    }
}
