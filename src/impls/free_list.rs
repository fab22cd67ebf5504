/*
 * SPDX-FileCopyrightText: 2023 Tommaso Fontana
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

#[cfg(feature = "mem_dbg")]
use mem_dbg::{MemDbg, MemSize};

use crate::traits::SpaceManager;

/// A first-fit [`SpaceManager`] keeping free regions in offset order.
///
/// Adjacent regions are coalesced on release; a region larger than the
/// request is split, and its tail stays free.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "mem_dbg", derive(MemDbg, MemSize))]
pub struct FreeList {
    /// Free `(offset, len)` pairs, sorted by offset and never adjacent.
    regions: Vec<(u64, u64)>,
}

impl FreeList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the free regions as `(offset, len)` pairs sorted by offset.
    pub fn regions(&self) -> &[(u64, u64)] {
        &self.regions
    }

    /// Return the total free space.
    pub fn free_space(&self) -> u64 {
        self.regions.iter().map(|&(_, len)| len).sum()
    }
}

impl SpaceManager for FreeList {
    fn allocate(&mut self, len: u64) -> Option<u64> {
        if len == 0 {
            return None;
        }
        let index = self.regions.iter().position(|&(_, l)| l >= len)?;
        let (offset, free) = self.regions[index];
        if free == len {
            self.regions.remove(index);
        } else {
            self.regions[index] = (offset + len, free - len);
        }
        Some(offset)
    }

    fn release(&mut self, offset: u64, len: u64) {
        if len == 0 {
            return;
        }
        let index = self.regions.partition_point(|&(o, _)| o < offset);
        debug_assert!(
            index == 0 || {
                let (o, l) = self.regions[index - 1];
                o + l <= offset
            },
            "Releasing region {}+{} overlapping free space",
            offset,
            len
        );
        let merge_prev = index > 0 && {
            let (o, l) = self.regions[index - 1];
            o + l == offset
        };
        let merge_next = index < self.regions.len() && self.regions[index].0 == offset + len;
        match (merge_prev, merge_next) {
            (true, true) => {
                let (_, next_len) = self.regions.remove(index);
                self.regions[index - 1].1 += len + next_len;
            }
            (true, false) => self.regions[index - 1].1 += len,
            (false, true) => self.regions[index] = (offset, len + self.regions[index].1),
            (false, false) => self.regions.insert(index, (offset, len)),
        }
    }
}
