/*
 * SPDX-FileCopyrightText: 2023 Tommaso Fontana
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

/*!

Traits and functions for reading and writing instantaneous codes.

Codewords are uniformly indexed from 0. The first few words of
[unary](crate::traits::BitRead::read_unary), [γ](gamma), and [δ](delta)
codes are:

| Arg |  unary   |    γ    |     δ    |
|-----|---------:|--------:|---------:|
| 0   |        1 |       1 |        1 |
| 1   |       01 |     010 |     0110 |
| 2   |      001 |     011 |     0111 |
| 3   |     0001 |   00100 |  0010000 |
| 4   |    00001 |   00101 |  0010001 |
| 5   |   000001 |   00110 |  0010010 |
| 6   |  0000001 |   00111 |  0010011 |
| 7   | 00000001 | 0001000 | 00101000 |

Each code comes in two flavors: functions building a [`BitCode`] (e.g.,
[`gamma_code`] and [`gamma_decode`]), limited to 64-bit code words and
rejecting negative input, and a pair of traits for streaming the code on any
[`BitWrite`](crate::traits::BitWrite) or [`BitRead`](crate::traits::BitRead)
(e.g., [`GammaWrite`] and [`GammaRead`]).

[Huffman codes](huffman) are built from the frequencies of a corpus and route
rare symbols through an escape symbol.

*/

mod bit_code;
pub use bit_code::BitCode;

pub mod gamma;
pub use gamma::{gamma_code, gamma_decode, len_gamma, GammaRead, GammaWrite};

pub mod delta;
pub use delta::{delta_code, delta_decode, len_delta, DeltaRead, DeltaWrite};

pub mod huffman;
pub use huffman::{HuffmanBuilder, HuffmanNode, HuffmanTable, SizeEstimate};
