/*
 * SPDX-FileCopyrightText: 2023 Tommaso Fontana
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use crate::codes::BitCode;
use crate::error::{Error, Result};

/// Sequential, streaming bit-by-bit reads.
///
/// This trait specifies the basic operations over which codes can be
/// implemented by traits such as [`crate::codes::GammaRead`]. Bits are
/// delivered most significant first.
pub trait BitRead {
    /// Read a single bit.
    fn read_bit(&mut self) -> Result<bool>;

    /// Read `n` bits and return them in the lowest bits.
    ///
    /// `n` must be at most 64. The default implementation reads one bit at a
    /// time; implementors usually provide a faster version.
    fn read_bits(&mut self, n: usize) -> Result<u64> {
        if n > 64 {
            return Err(Error::InvalidArgument(format!(
                "cannot read {} bits into a u64",
                n
            )));
        }
        let mut value = 0;
        for _ in 0..n {
            value = (value << 1) | self.read_bit()? as u64;
        }
        Ok(value)
    }

    /// Read a unary code, that is, count zeros up to the first one.
    ///
    /// The terminating one is consumed, and nothing after it.
    fn read_unary(&mut self) -> Result<u64> {
        let mut zeros = 0;
        while !self.read_bit()? {
            zeros += 1;
        }
        Ok(zeros)
    }

    /// Skip `n` bits.
    fn skip_bits(&mut self, mut n: usize) -> Result<()> {
        while n > 0 {
            let step = n.min(64);
            self.read_bits(step)?;
            n -= step;
        }
        Ok(())
    }
}

/// Sequential, streaming bit-by-bit writes.
///
/// This trait specifies the basic operations over which codes can be
/// implemented by traits such as [`crate::codes::GammaWrite`].
pub trait BitWrite {
    /// Write a single bit.
    fn write_bit(&mut self, bit: bool) -> Result<()>;

    /// Write the lowest `n` bits of `value` to the stream, most significant
    /// first, and return the number of bits written, that is, `n`.
    ///
    /// The other bits are ignored, but with the `checks` feature enabled
    /// the call fails if they are not zero.
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
        for i in (0..n).rev() {
            self.write_bit((value >> i) & 1 != 0)?;
        }
        Ok(n)
    }

    /// Write `value` as a unary code (`value` zeros followed by a one) and
    /// return the number of bits written, that is, `value` plus one.
    fn write_unary(&mut self, value: u64) -> Result<usize> {
        let mut left = value;
        while left > 0 {
            let step = left.min(64);
            self.write_bits(0, step as usize)?;
            left -= step;
        }
        self.write_bit(true)?;
        Ok(value as usize + 1)
    }

    /// Write the payload of a [`BitCode`] and return its length.
    fn write_code(&mut self, code: &BitCode) -> Result<usize> {
        self.write_bits(code.value(), code.len as usize)
    }

    /// Push buffered bits to the underlying medium.
    fn flush(&mut self) -> Result<()>;
}

/// Seekability for [`BitRead`] and [`BitWrite`] streams.
pub trait BitSeek {
    /// Return the current position, in bits.
    fn bit_pos(&mut self) -> Result<u64>;

    /// Move to a position, in bits.
    fn set_bit_pos(&mut self, bit_pos: u64) -> Result<()>;
}

impl<T: BitRead + ?Sized> BitRead for &mut T {
    #[inline(always)]
    fn read_bit(&mut self) -> Result<bool> {
        (**self).read_bit()
    }
    #[inline(always)]
    fn read_bits(&mut self, n: usize) -> Result<u64> {
        (**self).read_bits(n)
    }
    #[inline(always)]
    fn read_unary(&mut self) -> Result<u64> {
        (**self).read_unary()
    }
    #[inline(always)]
    fn skip_bits(&mut self, n: usize) -> Result<()> {
        (**self).skip_bits(n)
    }
}

impl<T: BitWrite + ?Sized> BitWrite for &mut T {
    #[inline(always)]
    fn write_bit(&mut self, bit: bool) -> Result<()> {
        (**self).write_bit(bit)
    }
    #[inline(always)]
    fn write_bits(&mut self, value: u64, n: usize) -> Result<usize> {
        (**self).write_bits(value, n)
    }
    #[inline(always)]
    fn write_unary(&mut self, value: u64) -> Result<usize> {
        (**self).write_unary(value)
    }
    #[inline(always)]
    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}

impl<T: BitSeek + ?Sized> BitSeek for &mut T {
    #[inline(always)]
    fn bit_pos(&mut self) -> Result<u64> {
        (**self).bit_pos()
    }
    #[inline(always)]
    fn set_bit_pos(&mut self, bit_pos: u64) -> Result<()> {
        (**self).set_bit_pos(bit_pos)
    }
}
