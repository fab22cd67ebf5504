/*
 * SPDX-FileCopyrightText: 2023 Tommaso Fontana
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Elias δ code.
//!
//! Zero is coded by the single bit `1`. Any other natural number `n` is coded
//! by the γ code of the length `ℓ` of the binary representation of `n + 1`,
//! followed by the `ℓ - 1` low bits of `n + 1` (the leading one is implied).
//! Since `ℓ ≥ 1`, the γ part never decodes to zero, so the one-bit code of zero
//! is unambiguous.

use super::{len_gamma, BitCode, GammaRead, GammaWrite};
use crate::error::{Error, Result};
use crate::utils::word_low_mask;

/// Return the length of the δ code for `n`.
#[must_use]
#[inline]
pub fn len_delta(n: u64) -> usize {
    if n == 0 {
        return 1;
    }
    let l = (n as u128 + 1).ilog2() as u64 + 1;
    len_gamma(l) + l as usize - 1
}

/// Return the δ code of `n` as a high-aligned [`BitCode`].
///
/// # Errors
///
/// [`Error::InvalidArgument`] if `n` is negative or its code is longer than
/// 64 bits.
pub fn delta_code(n: i64) -> Result<BitCode> {
    if n < 0 {
        return Err(Error::InvalidArgument(format!(
            "δ code of negative integer {}",
            n
        )));
    }
    if n == 0 {
        return Ok(BitCode::high(1, 1));
    }
    let value = n as u64 + 1;
    let l = u64::BITS - value.leading_zeros();
    let len = len_gamma(l as u64) + l as usize - 1;
    if len > 64 {
        return Err(Error::InvalidArgument(format!(
            "δ code of {} needs {} bits",
            n, len
        )));
    }
    // γ(ℓ) is ℓ + 1 written on len_gamma(ℓ) bits
    let payload = ((l as u64 + 1) << (l - 1)) | (value & word_low_mask::<u64>(l as usize - 1));
    Ok(BitCode::high(payload, len as u8))
}

/// Decode a [`BitCode`] containing exactly one δ code.
///
/// # Errors
///
/// [`Error::InvalidData`] if `code` is not a well-formed δ code.
pub fn delta_decode(code: &BitCode) -> Result<u64> {
    let malformed = || Error::InvalidData(format!("{} is not a δ code", code));
    let value = code.value();
    let len = code.len as u32;
    if len == 1 && value == 1 {
        return Ok(0);
    }
    if value == 0 {
        return Err(malformed());
    }
    let zeros = len - (u64::BITS - value.leading_zeros());
    let gamma_len = 2 * zeros + 1;
    if zeros == 0 || gamma_len > len {
        return Err(malformed());
    }
    let l = (value >> (len - gamma_len)) - 1;
    if gamma_len as u64 + l - 1 != len as u64 {
        return Err(malformed());
    }
    let low = value & word_low_mask::<u64>(l as usize - 1);
    Ok(((1 << (l - 1)) | low) - 1)
}

/// Trait for reading δ codes.
///
/// This is the trait you should usually pull in scope to read δ codes. It is
/// implemented for every [`BitRead`](crate::traits::BitRead).
pub trait DeltaRead: GammaRead {
    /// Read a δ code. Exactly the bits of the code are consumed.
    fn read_delta(&mut self) -> Result<u64>;
}

impl<B: GammaRead + ?Sized> DeltaRead for B {
    #[inline]
    fn read_delta(&mut self) -> Result<u64> {
        let n_bits = self.read_gamma()?;
        if n_bits == 0 {
            return Ok(0);
        }
        if n_bits > 64 {
            return Err(Error::InvalidData(format!(
                "δ code with a {}-bit payload",
                n_bits
            )));
        }
        Ok(((1 << (n_bits - 1)) | self.read_bits(n_bits as usize - 1)?) - 1)
    }
}

/// Trait for writing δ codes.
///
/// This is the trait you should usually pull in scope to write δ codes. It is
/// implemented for every [`BitWrite`](crate::traits::BitWrite).
pub trait DeltaWrite: GammaWrite {
    /// Write `n` as a δ code and return the number of bits written.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] if `n` is `u64::MAX`.
    fn write_delta(&mut self, n: u64) -> Result<usize>;
}

impl<B: GammaWrite + ?Sized> DeltaWrite for B {
    #[inline]
    fn write_delta(&mut self, n: u64) -> Result<usize> {
        if n == 0 {
            self.write_bit(true)?;
            return Ok(1);
        }
        let value = n
            .checked_add(1)
            .ok_or_else(|| Error::InvalidArgument("δ code of u64::MAX".into()))?;
        let number_of_bits = (u64::BITS - value.leading_zeros()) as u64;
        Ok(self.write_gamma(number_of_bits)?
            + self.write_bits(
                value & word_low_mask::<u64>(number_of_bits as usize - 1),
                number_of_bits as usize - 1,
            )?)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_table() -> Result<()> {
        let expected_lens = [1, 4, 4, 7, 7, 7, 7, 8];
        for n in 0..expected_lens.len() {
            let code = delta_code(n as i64)?;
            assert_eq!(code.len(), len_delta(n as u64));
            assert_eq!(code.len(), expected_lens[n]);
            assert_eq!(delta_decode(&code)?, n as u64);
        }
        assert_eq!(format!("{}", delta_code(0)?), "1");
        assert_eq!(format!("{}", delta_code(1)?), "0110");
        assert_eq!(format!("{}", delta_code(2)?), "0111");
        assert_eq!(format!("{}", delta_code(3)?), "0010000");
        assert_eq!(format!("{}", delta_code(7)?), "00101000");
        Ok(())
    }

    #[test]
    fn test_limits() {
        assert!(matches!(delta_code(-1), Err(Error::InvalidArgument(_))));
        assert!(delta_code(i64::MAX).is_err());
        assert!(delta_decode(&BitCode::low(0b1, 2)).is_err());
        assert!(delta_decode(&BitCode::low(0b10, 2)).is_err());
    }
}
