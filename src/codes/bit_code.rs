/*
 * SPDX-FileCopyrightText: 2023 Tommaso Fontana
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Code words of up to 64 bits.

use crate::error::{Error, Result};
use crate::utils::word_low_mask;
#[cfg(feature = "mem_dbg")]
use mem_dbg::{MemDbg, MemSize};

/// A code word: up to 64 bits stored in a `u64`, together with its length
/// and alignment.
///
/// If `high_aligned` is true the payload occupies the `len` most significant
/// bits of `code`, otherwise the `len` least significant ones. Bits outside
/// the payload are zero for codes built by this crate, but [`value`] masks
/// them anyway.
///
/// [`value`]: BitCode::value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "mem_dbg", derive(MemDbg, MemSize))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "mem_dbg", mem_size(flat))]
pub struct BitCode {
    pub code: u64,
    pub len: u8,
    pub high_aligned: bool,
}

impl BitCode {
    /// Create a code, checking that `len` is at most 64.
    pub fn new(code: u64, len: u8, high_aligned: bool) -> Result<Self> {
        if len > 64 {
            return Err(Error::InvalidArgument(format!(
                "code length {} exceeds 64 bits",
                len
            )));
        }
        Ok(Self {
            code,
            len,
            high_aligned,
        })
    }

    /// Create a low-aligned code from the lowest `len` bits of `value`.
    #[must_use]
    pub fn low(value: u64, len: u8) -> Self {
        debug_assert!(len <= 64);
        Self {
            code: value & word_low_mask::<u64>(len as usize),
            len,
            high_aligned: false,
        }
    }

    /// Create a high-aligned code from the lowest `len` bits of `value`.
    #[must_use]
    pub fn high(value: u64, len: u8) -> Self {
        Self::low(value, len).to_high_aligned()
    }

    /// Return the payload in the lowest `len` bits.
    #[must_use]
    #[inline]
    pub fn value(&self) -> u64 {
        match (self.len, self.high_aligned) {
            (0, _) => 0,
            (len, true) => self.code >> (64 - len as u32),
            (len, false) => self.code & word_low_mask::<u64>(len as usize),
        }
    }

    /// Return the same code with the payload in the lowest bits.
    #[must_use]
    pub fn to_low_aligned(self) -> Self {
        Self {
            code: self.value(),
            len: self.len,
            high_aligned: false,
        }
    }

    /// Return the same code with the payload in the highest bits.
    #[must_use]
    pub fn to_high_aligned(self) -> Self {
        let code = match self.len {
            0 => 0,
            len => self.value() << (64 - len as u32),
        };
        Self {
            code,
            len: self.len,
            high_aligned: true,
        }
    }

    /// Return the `i`-th bit of the payload, in writing order.
    #[must_use]
    pub fn bit(&self, i: usize) -> bool {
        debug_assert!(i < self.len as usize);
        (self.value() >> (self.len as usize - 1 - i)) & 1 != 0
    }

    /// Return the length of the code.
    #[must_use]
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// Return whether the code is empty.
    #[must_use]
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl core::fmt::Display for BitCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.len == 0 {
            return Ok(());
        }
        write!(f, "{:0width$b}", self.value(), width = self.len as usize)
    }
}
