/*
 * SPDX-FileCopyrightText: 2023 Tommaso Fontana
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Bit manipulation on bytes and words.
//!
//! Bits are always indexed from the most significant one: index 0 is bit 7 of
//! a byte (or bit 63 of a `u64`). Ranges are checked with debug assertions, or
//! always if the `checks` feature is enabled.

use num_traits::PrimInt;

macro_rules! check {
    ($cond:expr, $($arg:tt)+) => {
        #[cfg(feature = "checks")]
        assert!($cond, $($arg)+);
        #[cfg(not(feature = "checks"))]
        debug_assert!($cond, $($arg)+);
    };
}

/// Return a byte whose lowest `count` bits are set.
#[must_use]
#[inline(always)]
pub fn low_mask(count: usize) -> u8 {
    check!(count <= 8, "Mask of {} bits on a byte", count);
    if count >= 8 {
        u8::MAX
    } else {
        (1_u8 << count) - 1
    }
}

/// Return the bit of `byte` at `index`.
#[must_use]
#[inline(always)]
pub fn get_bit(byte: u8, index: usize) -> bool {
    check!(index < 8, "Bit index {} out of range", index);
    (byte >> (7 - index)) & 1 != 0
}

/// Return `byte` with the bit at `index` set to `value`.
#[must_use]
#[inline(always)]
pub fn set_bit(byte: u8, index: usize, value: bool) -> u8 {
    check!(index < 8, "Bit index {} out of range", index);
    let mask = 0x80_u8 >> index;
    if value { byte | mask } else { byte & !mask }
}

/// Return the `count` bits of `byte` starting at `start`, in the lowest bits
/// of the result.
#[must_use]
#[inline]
pub fn get_bits(byte: u8, start: usize, count: usize) -> u8 {
    check!(
        start <= 8 && count <= 8 - start,
        "Bit range {}+{} out of range",
        start,
        count
    );
    if count == 0 {
        return 0;
    }
    (byte >> (8 - start - count)) & low_mask(count)
}

/// Return `byte` with the `count` bits starting at `start` replaced by
/// `count` bits of `value`.
///
/// If `high_aligned` is true the bits are taken from the top of `value`,
/// otherwise from its bottom. All other bits of `byte` are preserved.
#[must_use]
#[inline]
pub fn set_bits(byte: u8, start: usize, count: usize, value: u8, high_aligned: bool) -> u8 {
    check!(
        start <= 8 && count <= 8 - start,
        "Bit range {}+{} out of range",
        start,
        count
    );
    if count == 0 {
        return byte;
    }
    let payload = if high_aligned {
        value >> (8 - count)
    } else {
        value & low_mask(count)
    };
    let shift = 8 - start - count;
    let mask = low_mask(count) << shift;
    (byte & !mask) | (payload << shift)
}

/// Replace the `count` leftmost (most significant) bits of `byte`.
#[must_use]
#[inline(always)]
pub fn set_bits_at_left(byte: u8, count: usize, value: u8, high_aligned: bool) -> u8 {
    set_bits(byte, 0, count, value, high_aligned)
}

/// Replace the `count` rightmost (least significant) bits of `byte`.
#[must_use]
#[inline(always)]
pub fn set_bits_at_right(byte: u8, count: usize, value: u8, high_aligned: bool) -> u8 {
    check!(count <= 8, "Bit count {} out of range", count);
    set_bits(byte, 8 - count, count, value, high_aligned)
}

#[inline(always)]
fn width<W: PrimInt>() -> usize {
    W::zero().count_zeros() as usize
}

/// Return a word whose lowest `count` bits are set.
#[must_use]
#[inline]
pub fn word_low_mask<W: PrimInt>(count: usize) -> W {
    check!(count <= width::<W>(), "Mask of {} bits on a word", count);
    if count == 0 {
        W::zero()
    } else if count >= width::<W>() {
        !W::zero()
    } else {
        (W::one() << count) - W::one()
    }
}

/// Return the bit of `word` at `index`, counting from the most significant bit.
#[must_use]
#[inline]
pub fn get_word_bit<W: PrimInt>(word: W, index: usize) -> bool {
    let bits = width::<W>();
    check!(index < bits, "Bit index {} out of range", index);
    (word >> (bits - 1 - index)) & W::one() == W::one()
}

/// Return `word` with the bit at `index` (from the most significant bit) set
/// to `value`.
#[must_use]
#[inline]
pub fn set_word_bit<W: PrimInt>(word: W, index: usize, value: bool) -> W {
    let bits = width::<W>();
    check!(index < bits, "Bit index {} out of range", index);
    let mask = W::one() << (bits - 1 - index);
    if value { word | mask } else { word & !mask }
}
