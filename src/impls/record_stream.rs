/*
 * SPDX-FileCopyrightText: 2023 Tommaso Fontana
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Records stored as chains of fixed-length blocks.
//!
//! A record is a logical byte sequence spread over blocks of a data stream;
//! the list of blocks, the logical length and a few caller-defined fields
//! make up the record metadata, stored in an info stream. Info and data
//! stream may be the same stream, and many records can share them.
//!
//! # Metadata format
//!
//! The metadata is a fixed-length head followed, somewhere in the info
//! stream, by the table of block offsets. The position of the head is
//! assigned by the first save and never changes. All integers are
//! little-endian:
//!
//! | Head field     | Size            |
//! |----------------|-----------------|
//! | check code, 41 | 1               |
//! | meta number    | 4               |
//! | block length   | 4               |
//! | total length   | 8               |
//! | extra fields   | `extra_width`   |
//! | slots          | 4               |
//! | block count    | 4               |
//! | table position | 8               |
//!
//! The table has room for `slots` offsets of 8 bytes; offsets beyond the
//! block count are reserved room. The first save writes the table right
//! after the head. When the blocks outgrow the slots, a larger table is
//! appended to the info stream and the head is updated to point to it.
//!
//! # Provisional data
//!
//! Writes into blocks that the saved metadata already knows about are live
//! immediately. Blocks added (or dropped) since the last
//! [`save_info`](RecordStream::save_info) are provisional: they become part
//! of the record only when the metadata is saved, and
//! [`discard_update`](RecordStream::discard_update) followed by an unload and
//! a reload makes them disappear.

use std::io::{Read, Seek, SeekFrom, Write};

use log::debug;
#[cfg(feature = "mem_dbg")]
use mem_dbg::{MemDbg, MemSize};

use super::SharedStream;
use crate::error::{Error, Result};
use crate::traits::*;

/// Check code at the start of record metadata.
pub const RECORD_CHECK_CODE: u8 = 41;

const MIN_SLOTS: usize = 4;

/// Parameters of new records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "mem_dbg", derive(MemDbg, MemSize))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "mem_dbg", mem_size(flat))]
pub struct RecordConfig {
    /// Block length used when [`load_info`](RecordStream::load_info) creates
    /// a record that has never been saved.
    pub block_length: u32,
    /// Width in bytes of the caller-defined extra fields of the metadata.
    pub extra_width: usize,
}

impl Default for RecordConfig {
    fn default() -> Self {
        Self {
            block_length: 512,
            extra_width: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "mem_dbg", derive(MemDbg, MemSize))]
struct RecordInfo {
    meta_number: i32,
    block_length: u32,
    total_length: u64,
    extra: Vec<u8>,
    slots: usize,
    /// Position of the block table in the info stream, once written.
    table_pos: Option<u64>,
    offsets: Vec<u64>,
}

impl RecordInfo {
    fn capacity(&self) -> u64 {
        self.offsets.len() as u64 * self.block_length as u64
    }
}

fn head_len(extra_width: usize) -> u64 {
    (1 + 4 + 4 + 8 + extra_width + 4 + 4 + 8) as u64
}

fn table_len(slots: usize) -> u64 {
    8 * slots as u64
}

/// Two-generation dirty flags of the record metadata.
///
/// `any` tracks every change since the last save; `new` tracks changes to
/// the length or the block list, which must be saved or explicitly
/// discarded before unloading. A discarded change can be resumed until the
/// metadata is unloaded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct UpdateFlags {
    any: bool,
    new: bool,
    discarded: bool,
}

impl UpdateFlags {
    fn mark(&mut self, new: bool) {
        self.any = true;
        if new {
            self.new = true;
        }
    }

    fn discard(&mut self) {
        if self.new {
            self.new = false;
            self.discarded = true;
        }
    }

    fn resume(&mut self) {
        if self.discarded {
            self.new = true;
            self.discarded = false;
        }
    }

    fn saved(&mut self) {
        *self = Self::default();
    }
}

/// A record stored as a chain of fixed-length blocks.
///
/// A `RecordStream` starts unloaded: it knows only the position of its
/// metadata in the info stream (or that it has none yet). Reading, writing
/// and seeking need the metadata in memory, loaded with
/// [`load_info`](Self::load_info) or initialized with
/// [`create_new`](Self::create_new).
///
/// The stream implements [`Read`], [`Write`], [`Seek`] and [`ByteStream`],
/// so it can be the medium of a [`BitStream`](crate::impls::BitStream).
///
/// ```
/// use bitstore::prelude::*;
/// use std::io::Cursor;
///
/// # fn main() -> bitstore::Result<()> {
/// let shared = SharedStream::new(Cursor::new(Vec::new()));
/// let mut record = RecordStream::new(shared.clone(), shared.clone(), None);
/// record.create_new(8)?;
/// record.write(b"twenty bytes of data")?;
/// assert_eq!(record.block_count()?, 3);
/// let position = record.save_info()?;
/// record.unload_info()?;
///
/// let mut record = RecordStream::new(shared.clone(), shared, Some(position));
/// record.load_info()?;
/// let mut buf = vec![0; 20];
/// record.read_fully(&mut buf)?;
/// assert_eq!(&buf, b"twenty bytes of data");
/// # Ok(())
/// # }
/// ```
pub struct RecordStream<S: ByteStream> {
    info: SharedStream<S>,
    data: SharedStream<S>,
    info_pos: Option<u64>,
    rinfo: Option<RecordInfo>,
    position: u64,
    space: Option<SharedSpaceManager>,
    config: RecordConfig,
    flags: UpdateFlags,
    /// Blocks dropped by a shrink, to be released when the metadata is saved.
    pending_release: Vec<u64>,
    /// Blocks allocated since the last save.
    provisional: Vec<u64>,
}

impl<S: ByteStream> core::fmt::Debug for RecordStream<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RecordStream")
            .field("info_pos", &self.info_pos)
            .field("rinfo", &self.rinfo)
            .field("position", &self.position)
            .field("config", &self.config)
            .field("flags", &self.flags)
            .finish()
    }
}

impl<S: ByteStream> RecordStream<S> {
    /// Create an unloaded record whose metadata is at `info_pos` in `info`,
    /// or that has no metadata yet if `info_pos` is `None`.
    pub fn new(info: SharedStream<S>, data: SharedStream<S>, info_pos: Option<u64>) -> Self {
        Self {
            info,
            data,
            info_pos,
            rinfo: None,
            position: 0,
            space: None,
            config: RecordConfig::default(),
            flags: UpdateFlags::default(),
            pending_release: Vec::new(),
            provisional: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: RecordConfig) -> Self {
        self.config = config;
        self
    }

    /// Use `space` to allocate new blocks and to release dropped ones.
    pub fn with_space_manager(mut self, space: SharedSpaceManager) -> Self {
        self.space = Some(space);
        self
    }

    pub fn info_stream(&self) -> &SharedStream<S> {
        &self.info
    }

    pub fn data_stream(&self) -> &SharedStream<S> {
        &self.data
    }

    /// Return the position of the metadata in the info stream, if it has
    /// ever been saved.
    pub fn info_position(&self) -> Option<u64> {
        self.info_pos
    }

    pub fn is_loaded(&self) -> bool {
        self.rinfo.is_some()
    }

    /// Initialize empty metadata for a record that has never been saved.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidOperation`] if the record already has a position in
    /// the info stream or holds data, [`Error::InvalidArgument`] if
    /// `block_length` is zero or does not fit the metadata format.
    pub fn create_new(&mut self, block_length: u32) -> Result<()> {
        if let Some(pos) = self.info_pos {
            return Err(Error::InvalidOperation(format!(
                "record already initialized at info position {}",
                pos
            )));
        }
        if self.rinfo.as_ref().is_some_and(|r| !r.offsets.is_empty()) {
            return Err(Error::InvalidOperation(
                "record already holds data".into(),
            ));
        }
        if block_length == 0 || block_length > i32::MAX as u32 {
            return Err(Error::InvalidArgument(format!(
                "invalid block length {}",
                block_length
            )));
        }
        self.rinfo = Some(RecordInfo {
            meta_number: 0,
            block_length,
            total_length: 0,
            extra: vec![0; self.config.extra_width],
            slots: MIN_SLOTS,
            table_pos: None,
            offsets: Vec::new(),
        });
        self.position = 0;
        self.flags.mark(true);
        Ok(())
    }

    /// Load the metadata from the info stream.
    ///
    /// Does nothing if the metadata is already loaded; a record without an
    /// info position is created with the configured block length.
    pub fn load_info(&mut self) -> Result<()> {
        if self.rinfo.is_some() {
            return Ok(());
        }
        let Some(pos) = self.info_pos else {
            return self.create_new(self.config.block_length);
        };
        let rinfo = {
            let mut info = self.info.lock();
            let info_len = info.len()?;
            info.seek_to(pos)?;
            let mut check = [0_u8];
            info.read_exact(&mut check)?;
            if check[0] != RECORD_CHECK_CODE {
                return Err(Error::InvalidData(format!(
                    "check code {} at info position {}, expected {}",
                    check[0], pos, RECORD_CHECK_CODE
                )));
            }
            let meta_number = info.read_i32()?;
            let block_length = info.read_i32()?;
            let total_length = info.read_i64()?;
            let mut extra = vec![0; self.config.extra_width];
            info.read_exact(&mut extra)?;
            let slots = info.read_i32()?;
            let count = info.read_i32()?;
            let table_pos = info.read_u64()?;
            if block_length <= 0 || total_length < 0 || count < 0 || slots < count {
                return Err(Error::InvalidData(format!(
                    "corrupted record metadata at info position {}",
                    pos
                )));
            }
            let table_end = table_pos.checked_add(table_len(slots as usize));
            if table_end.is_none_or(|end| end > info_len) {
                return Err(Error::InvalidData(format!(
                    "block table of {} slots at {} exceeds the info stream ({} bytes)",
                    slots, table_pos, info_len
                )));
            }
            info.seek_to(table_pos)?;
            let mut offsets = Vec::with_capacity(count as usize);
            for _ in 0..count {
                offsets.push(info.read_u64()?);
            }
            RecordInfo {
                meta_number,
                block_length: block_length as u32,
                total_length: total_length as u64,
                extra,
                slots: slots as usize,
                table_pos: Some(table_pos),
                offsets,
            }
        };
        if rinfo.total_length > rinfo.capacity() {
            return Err(Error::InvalidData(format!(
                "record length {} exceeds capacity {}",
                rinfo.total_length,
                rinfo.capacity()
            )));
        }
        debug!(
            "Loaded record at {}: {} bytes in {} blocks of {}",
            pos,
            rinfo.total_length,
            rinfo.offsets.len(),
            rinfo.block_length
        );
        self.rinfo = Some(rinfo);
        self.position = 0;
        self.flags.saved();
        Ok(())
    }

    /// Persist the metadata and return its position in the info stream.
    ///
    /// The first save appends the metadata to the info stream, and the
    /// position it returns is the position of the record from then on:
    /// later saves rewrite the head in place. If the block list has outgrown
    /// the reserved slots, a larger block table is appended to the info
    /// stream, and the old table is given to the space manager if the info
    /// stream is the data stream. Nothing is written if nothing changed.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidOperation`] if the metadata is not loaded.
    pub fn save_info(&mut self) -> Result<u64> {
        let rinfo = self.rinfo.as_mut().ok_or_else(|| {
            Error::InvalidOperation("saving a record whose metadata is not loaded".into())
        })?;
        if let (Some(pos), false) = (self.info_pos, self.flags.any) {
            return Ok(pos);
        }

        let mut released_table = None;
        if rinfo.offsets.len() > rinfo.slots {
            let old_len = table_len(rinfo.slots);
            rinfo.slots = rinfo.offsets.len().next_power_of_two().max(MIN_SLOTS);
            if let Some(table_pos) = rinfo.table_pos.take() {
                debug!(
                    "Moving block table of record at {:?} from {} ({} slots)",
                    self.info_pos, table_pos, rinfo.slots
                );
                released_table = Some((table_pos, old_len));
            }
        }

        let pos = {
            let mut info = self.info.lock();
            let pos = match self.info_pos {
                Some(pos) => pos,
                None => {
                    let end = info.seek_to_end()?;
                    rinfo.table_pos = Some(end + head_len(rinfo.extra.len()));
                    end
                }
            };
            let table_pos = match rinfo.table_pos {
                Some(table_pos) => table_pos,
                None => info.seek_to_end()?,
            };
            rinfo.table_pos = Some(table_pos);

            info.seek_to(pos)?;
            info.write_all(&[RECORD_CHECK_CODE])?;
            info.write_i32(rinfo.meta_number)?;
            info.write_i32(rinfo.block_length as i32)?;
            info.write_i64(rinfo.total_length as i64)?;
            info.write_all(&rinfo.extra)?;
            info.write_i32(rinfo.slots as i32)?;
            info.write_i32(rinfo.offsets.len() as i32)?;
            info.write_u64(table_pos)?;

            info.seek_to(table_pos)?;
            for &offset in &rinfo.offsets {
                info.write_u64(offset)?;
            }
            info.write_zeros(table_len(rinfo.slots - rinfo.offsets.len()))?;
            info.flush()?;
            pos
        };
        debug!(
            "Saved record at {}: {} bytes in {} blocks",
            pos,
            rinfo.total_length,
            rinfo.offsets.len()
        );
        self.info_pos = Some(pos);

        let block_length = rinfo.block_length as u64;
        if let Some(space) = &self.space {
            let mut space = space.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            for &offset in &self.pending_release {
                space.release(offset, block_length);
            }
            if let Some((offset, len)) = released_table {
                if self.info.same_stream(&self.data) {
                    space.release(offset, len);
                }
            }
            if !self.pending_release.is_empty() {
                debug!("Released {} blocks", self.pending_release.len());
            }
        }
        self.pending_release.clear();
        self.provisional.clear();
        self.flags.saved();
        Ok(pos)
    }

    /// Drop the in-memory metadata.
    ///
    /// Changes to data already described by the saved metadata are on disk
    /// already; changes to the length or block list that were discarded
    /// with [`discard_update`](Self::discard_update) are lost, and the
    /// blocks they allocated are given back to the space manager.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidOperation`] if there are unsaved changes to the
    /// length or block list that have not been discarded.
    pub fn unload_info(&mut self) -> Result<()> {
        if self.rinfo.is_none() {
            return Ok(());
        }
        if self.flags.new {
            return Err(Error::InvalidOperation(
                "unloading a record with unsaved new blocks".into(),
            ));
        }
        if let (Some(space), Some(rinfo)) = (&self.space, &self.rinfo) {
            if !self.provisional.is_empty() {
                let mut space = space.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                for &offset in &self.provisional {
                    space.release(offset, rinfo.block_length as u64);
                }
                debug!("Released {} discarded blocks", self.provisional.len());
            }
        }
        debug!("Unloaded record at {:?}", self.info_pos);
        self.rinfo = None;
        self.position = 0;
        self.pending_release.clear();
        self.provisional.clear();
        self.flags.saved();
        Ok(())
    }

    /// Mark the unsaved changes to the length or block list as discarded,
    /// so that the metadata can be unloaded without saving them.
    pub fn discard_update(&mut self) {
        self.flags.discard();
    }

    /// Undo a [`discard_update`](Self::discard_update).
    pub fn resume_update(&mut self) {
        self.flags.resume();
    }

    /// Return whether the metadata has unsaved changes.
    pub fn is_modified(&self) -> bool {
        self.flags.any
    }

    fn loaded(&self) -> Result<&RecordInfo> {
        self.rinfo.as_ref().ok_or_else(|| {
            Error::InvalidOperation("record metadata is not loaded".into())
        })
    }

    fn loaded_mut(&mut self) -> Result<&mut RecordInfo> {
        self.rinfo.as_mut().ok_or_else(|| {
            Error::InvalidOperation("record metadata is not loaded".into())
        })
    }

    /// Read the meta number of the record whose metadata is at `position`
    /// in `info`, without loading the metadata.
    pub fn read_meta_number(info: &SharedStream<S>, position: u64) -> Result<i32> {
        let mut info = info.lock();
        info.seek_to(position)?;
        let mut check = [0_u8];
        info.read_exact(&mut check)?;
        if check[0] != RECORD_CHECK_CODE {
            return Err(Error::InvalidData(format!(
                "check code {} at info position {}, expected {}",
                check[0], position, RECORD_CHECK_CODE
            )));
        }
        Ok(info.read_i32()?)
    }

    /// Return the caller-defined meta number.
    ///
    /// If the metadata is not loaded, the number is read directly from the
    /// info stream; a record that has never been saved has meta number 0.
    pub fn meta_number(&self) -> Result<i32> {
        match (&self.rinfo, self.info_pos) {
            (Some(rinfo), _) => Ok(rinfo.meta_number),
            (None, Some(pos)) => Self::read_meta_number(&self.info, pos),
            (None, None) => Ok(0),
        }
    }

    pub fn set_meta_number(&mut self, meta_number: i32) -> Result<()> {
        let rinfo = self.loaded_mut()?;
        if rinfo.meta_number != meta_number {
            rinfo.meta_number = meta_number;
            self.flags.mark(false);
        }
        Ok(())
    }

    /// Return the caller-defined extra fields.
    pub fn extra(&self) -> Result<&[u8]> {
        Ok(&self.loaded()?.extra)
    }

    /// Set the caller-defined extra fields.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] if `extra` is not exactly as wide as the
    /// extra fields of the record.
    pub fn set_extra(&mut self, extra: &[u8]) -> Result<()> {
        let rinfo = self.loaded_mut()?;
        if extra.len() != rinfo.extra.len() {
            return Err(Error::InvalidArgument(format!(
                "{} bytes of extra fields, expected {}",
                extra.len(),
                rinfo.extra.len()
            )));
        }
        if rinfo.extra != extra {
            rinfo.extra.copy_from_slice(extra);
            self.flags.mark(false);
        }
        Ok(())
    }

    /// Return the logical length of the record in bytes.
    pub fn length(&self) -> Result<u64> {
        Ok(self.loaded()?.total_length)
    }

    /// Return the number of bytes the allocated blocks can hold.
    pub fn capacity(&self) -> Result<u64> {
        Ok(self.loaded()?.capacity())
    }

    pub fn block_count(&self) -> Result<usize> {
        Ok(self.loaded()?.offsets.len())
    }

    pub fn block_length(&self) -> Result<u32> {
        Ok(self.loaded()?.block_length)
    }

    /// Return the data-stream offsets of the blocks, in record order.
    pub fn block_offsets(&self) -> Result<&[u64]> {
        Ok(&self.loaded()?.offsets)
    }

    /// Return the current position in the record.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Set the current position, which must lie in `[0, length]`.
    pub fn set_position(&mut self, position: u64) -> Result<()> {
        self.seek(SeekFrom::Start(position)).map(|_| ())
    }

    /// Move the current position and return it.
    ///
    /// # Errors
    ///
    /// [`Error::OutOfRange`] if the target lies outside `[0, length]`.
    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        let total = self.loaded()?.total_length;
        let target = match pos {
            SeekFrom::Start(n) => n as i128,
            SeekFrom::Current(n) => self.position as i128 + n as i128,
            SeekFrom::End(n) => total as i128 + n as i128,
        };
        if target < 0 || target > total as i128 {
            return Err(Error::OutOfRange {
                position: target,
                min: 0,
                max: total,
            });
        }
        self.position = target as u64;
        Ok(self.position)
    }

    /// Make sure the blocks can hold `len` bytes, allocating zero-filled
    /// blocks as needed.
    fn grow_to(&mut self, len: u64) -> Result<()> {
        let rinfo = self.loaded()?;
        let block_length = rinfo.block_length as u64;
        let missing = (len.div_ceil(block_length) as usize).saturating_sub(rinfo.offsets.len());
        if missing == 0 {
            return Ok(());
        }

        let mut fresh = Vec::with_capacity(missing);
        if let Some(space) = &self.space {
            let mut space = space.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            while fresh.len() < missing {
                match space.allocate(block_length) {
                    Some(offset) => fresh.push(offset),
                    None => break,
                }
            }
        }
        let reused = fresh.len();
        {
            let mut data = self.data.lock();
            for &offset in &fresh {
                data.seek_to(offset)?;
                data.write_zeros(block_length)?;
            }
            let appended = (missing - reused) as u64;
            if appended > 0 {
                let start = data.seek_to_end()?;
                data.write_zeros(appended * block_length)?;
                fresh.extend((0..appended).map(|i| start + i * block_length));
            }
        }
        debug!(
            "Allocated {} blocks of {} bytes ({} reused)",
            missing, block_length, reused
        );

        self.provisional.extend_from_slice(&fresh);
        self.loaded_mut()?.offsets.extend(fresh);
        self.flags.mark(true);
        Ok(())
    }

    /// Return the `(data offset, length)` segments holding `len` bytes of
    /// the record starting at `position`, which must be within capacity.
    fn segments(rinfo: &RecordInfo, mut position: u64, len: usize) -> Vec<(u64, usize)> {
        let block_length = rinfo.block_length as u64;
        let mut segments = Vec::new();
        let mut left = len;
        while left > 0 {
            let block = (position / block_length) as usize;
            let in_block = position % block_length;
            let chunk = ((block_length - in_block) as usize).min(left);
            segments.push((rinfo.offsets[block] + in_block, chunk));
            position += chunk as u64;
            left -= chunk;
        }
        segments
    }

    /// Set the logical length.
    ///
    /// Growing allocates blocks as needed; the new bytes read as zeros.
    /// Shrinking drops the blocks that are no longer needed; they are given
    /// to the space manager when the metadata is saved. The current position
    /// is clamped to the new length.
    pub fn set_length(&mut self, len: u64) -> Result<()> {
        let rinfo = self.loaded()?;
        let total = rinfo.total_length;
        if len == total {
            return Ok(());
        }
        if len > total {
            // the tail of the last block may hold stale bytes
            let stale_end = len.min(rinfo.capacity());
            if stale_end > total {
                let segments = Self::segments(rinfo, total, (stale_end - total) as usize);
                let mut data = self.data.lock();
                for (offset, chunk) in segments {
                    data.seek_to(offset)?;
                    data.write_zeros(chunk as u64)?;
                }
            }
            self.grow_to(len)?;
        } else {
            let rinfo = self.loaded_mut()?;
            let needed = len.div_ceil(rinfo.block_length as u64) as usize;
            let dropped: Vec<u64> = rinfo.offsets.drain(needed..).collect();
            self.pending_release.extend(dropped);
            self.position = self.position.min(len);
        }
        self.loaded_mut()?.total_length = len;
        self.flags.mark(true);
        Ok(())
    }

    /// Empty the record.
    ///
    /// With a space manager, all blocks are released at once and the empty
    /// metadata is saved. Without one, the clear is an ordinary unsaved
    /// change, which can be reverted by discarding it and reloading.
    pub fn clear(&mut self) -> Result<()> {
        let rinfo = self.loaded_mut()?;
        let blocks: Vec<u64> = rinfo.offsets.drain(..).collect();
        rinfo.total_length = 0;
        let count = blocks.len();
        self.pending_release.extend(blocks);
        self.position = 0;
        self.flags.mark(true);
        debug!("Cleared record at {:?} ({} blocks)", self.info_pos, count);
        if self.space.is_some() {
            self.save_info()?;
        }
        Ok(())
    }

    /// Read up to `buf.len()` bytes from the current position and return
    /// the number of bytes read, which is smaller only at the end of the
    /// record.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let rinfo = self.loaded()?;
        let n = buf
            .len()
            .min((rinfo.total_length - self.position) as usize);
        if n == 0 {
            return Ok(0);
        }
        let segments = Self::segments(rinfo, self.position, n);
        {
            let mut data = self.data.lock();
            let mut done = 0;
            for (offset, chunk) in segments {
                data.seek_to(offset)?;
                data.read_exact(&mut buf[done..done + chunk])?;
                done += chunk;
            }
        }
        self.position += n as u64;
        Ok(n)
    }

    /// Fill `buf` from the current position.
    ///
    /// # Errors
    ///
    /// [`Error::EndOfStream`] if the record ends first; the position is
    /// not moved.
    pub fn read_fully(&mut self, buf: &mut [u8]) -> Result<()> {
        let rinfo = self.loaded()?;
        if (buf.len() as u64) > rinfo.total_length - self.position {
            return Err(Error::EndOfStream);
        }
        self.read(buf).map(|_| ())
    }

    /// Write `buf` at the current position, extending the record if needed.
    pub fn write(&mut self, buf: &[u8]) -> Result<()> {
        let total = self.loaded()?.total_length;
        if buf.is_empty() {
            return Ok(());
        }
        let end = self.position + buf.len() as u64;
        self.grow_to(end)?;
        let segments = Self::segments(self.loaded()?, self.position, buf.len());
        {
            let mut data = self.data.lock();
            let mut done = 0;
            for (offset, chunk) in segments {
                data.seek_to(offset)?;
                data.write_all(&buf[done..done + chunk])?;
                done += chunk;
            }
        }
        self.position = end;
        if end > total {
            self.loaded_mut()?.total_length = end;
            self.flags.mark(true);
        }
        Ok(())
    }

    /// Flush the data stream.
    pub fn flush(&mut self) -> Result<()> {
        self.data.lock().flush()?;
        Ok(())
    }
}

impl<S: ByteStream> Read for RecordStream<S> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        Ok(RecordStream::read(self, buf)?)
    }
}

impl<S: ByteStream> Write for RecordStream<S> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        RecordStream::write(self, buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(RecordStream::flush(self)?)
    }
}

impl<S: ByteStream> Seek for RecordStream<S> {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        Ok(RecordStream::seek(self, pos)?)
    }
}

impl<S: ByteStream> ByteStream for RecordStream<S> {
    fn set_len(&mut self, len: u64) -> std::io::Result<()> {
        Ok(self.set_length(len)?)
    }

    fn len(&mut self) -> std::io::Result<u64> {
        Ok(self.length()?)
    }
}
