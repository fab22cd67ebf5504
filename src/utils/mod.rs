/*
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

/*!

Bit helpers, debug helpers and statistics.

The functions in [`bits`] read and replace single bits and bit ranges of
bytes and words, indexing bits from the most significant one.

[`CountBitReader`] and [`CountBitWriter`] keep track of the number
of bits read or written to a [`BitRead`](crate::traits::BitRead)
and [`BitWrite`](crate::traits::BitWrite), respectively,
optionally logging the operations performed on the stream.

[`CodesStats`] keeps track of the space needed to store a stream of
integers using different codes.

*/

pub mod bits;
pub use bits::*;

mod count;
pub use count::*;

pub mod stats;
pub use stats::{Code, CodesStats};
