/*
 * SPDX-FileCopyrightText: 2023 Tommaso Fontana
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Elias γ code.
//!
//! The γ code of a natural number `n` is the concatenation of the unary code of
//! `⌊log₂(n + 1)⌋` (that many zeros followed by a one) and the binary
//! representation of `n + 1` with the most significant bit removed.
//!
//! Codes can be built as [`BitCode`] values with [`gamma_code`] (as long as
//! they fit in 64 bits) or written and read directly on a bit stream with
//! [`GammaWrite`] and [`GammaRead`].

use super::BitCode;
use crate::error::{Error, Result};
use crate::traits::*;

/// Return the length of the γ code for `n`.
#[must_use]
#[inline]
pub fn len_gamma(n: u64) -> usize {
    let number_of_bits_to_write = (n as u128 + 1).ilog2();
    2 * number_of_bits_to_write as usize + 1
}

/// Return the γ code of `n` as a high-aligned [`BitCode`].
///
/// # Errors
///
/// [`Error::InvalidArgument`] if `n` is negative, or if its code is longer
/// than 64 bits (i.e., `n + 1 ≥ 2³²`).
pub fn gamma_code(n: i64) -> Result<BitCode> {
    if n < 0 {
        return Err(Error::InvalidArgument(format!(
            "γ code of negative integer {}",
            n
        )));
    }
    let n = n as u64 + 1;
    let number_of_bits_to_write = n.ilog2();
    let len = 2 * number_of_bits_to_write + 1;
    if len > 64 {
        return Err(Error::InvalidArgument(format!(
            "γ code of {} needs {} bits",
            n - 1,
            len
        )));
    }
    // the unary part is made by the leading zeros of n itself
    Ok(BitCode::high(n, len as u8))
}

/// Decode a [`BitCode`] containing exactly one γ code.
///
/// # Errors
///
/// [`Error::InvalidData`] if `code` is not a well-formed γ code.
pub fn gamma_decode(code: &BitCode) -> Result<u64> {
    let value = code.value();
    let len = code.len as u32;
    if value == 0 {
        return Err(Error::InvalidData(format!("{} is not a γ code", code)));
    }
    let significant = u64::BITS - value.leading_zeros();
    let zeros = len - significant;
    if len != 2 * zeros + 1 {
        return Err(Error::InvalidData(format!("{} is not a γ code", code)));
    }
    Ok(value - 1)
}

/// Trait for reading γ codes.
///
/// This is the trait you should usually pull in scope to read γ codes. It is
/// implemented for every [`BitRead`].
pub trait GammaRead: BitRead {
    /// Read a γ code. Exactly the bits of the code are consumed.
    fn read_gamma(&mut self) -> Result<u64>;
    fn skip_gamma(&mut self) -> Result<()>;
}

impl<B: BitRead + ?Sized> GammaRead for B {
    #[inline]
    fn read_gamma(&mut self) -> Result<u64> {
        let len = self.read_unary()?;
        if len == 0 {
            return Ok(0);
        }
        if len >= 64 {
            return Err(Error::InvalidData(format!(
                "γ code with a {}-bit unary prefix",
                len
            )));
        }
        Ok(((1 << len) | self.read_bits(len as usize)?) - 1)
    }

    #[inline]
    fn skip_gamma(&mut self) -> Result<()> {
        let len = self.read_unary()?;
        self.skip_bits(len as usize)
    }
}

/// Trait for writing γ codes.
///
/// This is the trait you should usually pull in scope to write γ codes. It is
/// implemented for every [`BitWrite`].
pub trait GammaWrite: BitWrite {
    /// Write `n` as a γ code and return the number of bits written.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] if `n` is `u64::MAX`, as `n + 1` would
    /// overflow.
    fn write_gamma(&mut self, n: u64) -> Result<usize>;
}

impl<B: BitWrite + ?Sized> GammaWrite for B {
    #[inline]
    fn write_gamma(&mut self, n: u64) -> Result<usize> {
        let n = n
            .checked_add(1)
            .ok_or_else(|| Error::InvalidArgument("γ code of u64::MAX".into()))?;
        let number_of_bits_to_write = n.ilog2();
        // remove the most significant 1
        let short_value = n ^ (1 << number_of_bits_to_write);
        Ok(self.write_unary(number_of_bits_to_write as u64)?
            + self.write_bits(short_value, number_of_bits_to_write as usize)?)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_table() -> Result<()> {
        let expected = ["1", "010", "011", "00100", "00101", "00110", "00111", "0001000"];
        for (n, s) in expected.iter().enumerate() {
            let code = gamma_code(n as i64)?;
            assert!(code.high_aligned);
            assert_eq!(&format!("{}", code), s);
            assert_eq!(code.len(), len_gamma(n as u64));
            assert_eq!(gamma_decode(&code)?, n as u64);
        }
        Ok(())
    }

    #[test]
    fn test_limits() {
        assert!(matches!(gamma_code(-1), Err(Error::InvalidArgument(_))));
        assert!(gamma_code((1 << 32) - 2).is_ok());
        assert!(matches!(
            gamma_code((1 << 32) - 1),
            Err(Error::InvalidArgument(_))
        ));
        assert_eq!(len_gamma(u64::MAX), 129);
        assert!(gamma_decode(&BitCode::low(0b011, 4)).is_err());
        assert!(gamma_decode(&BitCode::low(0, 3)).is_err());
    }
}
