/*
 * SPDX-FileCopyrightText: 2023 Tommaso Fontana
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

/*!

Implementations of bit streams and record streams.

[`BitStream`] is a random-access bit stream over any [`ByteStream`]: its
length is persisted in a small header, so it can be closed and reopened, and
partial-byte writes never clobber neighboring bits. [`ForwardBitStream`] is
its sequential counterpart, with no header and no seeking.

Records are logical byte streams stored inside a larger byte stream, which
can host many of them. [`RecordStream`] stores a record as a list of
fixed-length blocks described by metadata in an info stream;
[`ForwardRecordStream`] stores it as a forward-linked chain of blocks. Both
access the underlying stream through a [`SharedStream`], and a
[`RecordStream`] can recycle freed blocks through a
[`SpaceManager`](crate::traits::SpaceManager) such as [`FreeList`].

Since a [`RecordStream`] is itself a [`ByteStream`], a [`BitStream`] can be
layered on a record.

[`ByteStream`]: crate::traits::ByteStream

*/

mod bit_stream;
pub use bit_stream::*;

mod forward_bit_stream;
pub use forward_bit_stream::*;

mod shared;
pub use shared::*;

mod free_list;
pub use free_list::*;

mod record_stream;
pub use record_stream::*;

mod forward_record_stream;
pub use forward_record_stream::*;
