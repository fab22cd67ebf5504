/*
 * SPDX-FileCopyrightText: 2023 Tommaso Fontana
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use std::sync::{Arc, Mutex};

/// Recycling of freed regions of a data stream.
///
/// A [`RecordStream`](crate::impls::RecordStream) asks its space manager for
/// room before appending new blocks at the end of the data stream, and hands
/// back the blocks it no longer uses. The reuse policy is entirely up to the
/// implementation.
pub trait SpaceManager {
    /// Return the offset of a free region of exactly `len` bytes, removing
    /// it from the free space, or `None` if there is no suitable region.
    fn allocate(&mut self, len: u64) -> Option<u64>;

    /// Give back the region of `len` bytes starting at `offset`.
    fn release(&mut self, offset: u64, len: u64);
}

/// A space manager shared by all record streams of a data stream.
pub type SharedSpaceManager = Arc<Mutex<dyn SpaceManager + Send>>;

impl<T: SpaceManager + ?Sized> SpaceManager for &mut T {
    fn allocate(&mut self, len: u64) -> Option<u64> {
        (**self).allocate(len)
    }

    fn release(&mut self, offset: u64, len: u64) {
        (**self).release(offset, len)
    }
}
