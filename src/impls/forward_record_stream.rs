/*
 * SPDX-FileCopyrightText: 2023 Tommaso Fontana
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Records stored as forward-linked chains of variable-length blocks.
//!
//! Each block is a standalone node of the stream:
//!
//! | Field    | Size                |
//! |----------|---------------------|
//! | capacity | `length_width`      |
//! | payload  | capacity            |
//! | next     | `position_width`    |
//!
//! A zero next pointer ends the chain. The record header precedes the first
//! block, so no block ever lives at offset zero:
//!
//! | Field          | Size             |
//! |----------------|------------------|
//! | widths         | 1                |
//! | end            | `position_width` |
//! | current        | `position_width` |
//! | block start    | `position_width` |
//! | block length   | `length_width`   |
//! | min alloc size | 2                |
//! | tag            | 8                |
//!
//! `widths` is `(position_width << 4) | length_width`; `end` and `current`
//! are the absolute offsets of the logical end and of the cursor, and the
//! block fields describe the block holding the cursor.

use std::collections::HashSet;
use std::io::{Read, Write};

#[cfg(feature = "mem_dbg")]
use mem_dbg::{MemDbg, MemSize};

use log::debug;

use super::SharedStream;
use crate::error::{Error, Result};
use crate::traits::*;

/// Layout parameters of new forward records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "mem_dbg", derive(MemDbg, MemSize))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "mem_dbg", mem_size(flat))]
pub struct ForwardRecordConfig {
    /// Smallest payload of a newly linked block.
    pub min_alloc_size: u16,
    /// Width in bytes of block lengths; it bounds the payload of a block.
    pub length_width: u8,
    /// Width in bytes of stream offsets.
    pub position_width: u8,
    /// Caller-defined tag stored in the header.
    pub tag: u64,
}

impl Default for ForwardRecordConfig {
    fn default() -> Self {
        Self {
            min_alloc_size: 64,
            length_width: 4,
            position_width: 8,
            tag: 0,
        }
    }
}

/// A place in the chain: the block, its capacity, the offset in its payload
/// and the corresponding logical position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "mem_dbg", derive(MemDbg, MemSize))]
#[cfg_attr(feature = "mem_dbg", mem_size(flat))]
struct Place {
    block: u64,
    capacity: u64,
    offset: u64,
    logical: u64,
}

impl Place {
    fn at_start(block: u64, capacity: u64, logical: u64) -> Self {
        Self {
            block,
            capacity,
            offset: 0,
            logical,
        }
    }
}

fn max_value(width: usize) -> u64 {
    if width >= 8 {
        u64::MAX
    } else {
        (1 << (8 * width)) - 1
    }
}

/// A record stored as a forward-linked chain of blocks.
///
/// The stream can only move forward, apart from [`rewind`](Self::rewind)
/// and the bookmarks set with [`save_status`](Self::save_status). New blocks
/// are appended at the end of the underlying stream and linked to the tail
/// of the chain when writing past the capacity, or in advance with
/// [`alloc`](Self::alloc).
///
/// The header is written by [`save`](Self::save) (and by
/// [`close`](Self::close)); block contents and links are written
/// immediately.
pub struct ForwardRecordStream<S: ByteStream> {
    stream: SharedStream<S>,
    info_pos: u64,
    length_width: usize,
    position_width: usize,
    min_alloc_size: u16,
    tag: u64,
    first: Place,
    pos: Place,
    end: Place,
    bookmarks: Vec<Place>,
}

impl<S: ByteStream> core::fmt::Debug for ForwardRecordStream<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ForwardRecordStream")
            .field("info_pos", &self.info_pos)
            .field("length_width", &self.length_width)
            .field("position_width", &self.position_width)
            .field("pos", &self.pos)
            .field("end", &self.end)
            .field("bookmarks", &self.bookmarks.len())
            .finish()
    }
}

impl<S: ByteStream> ForwardRecordStream<S> {
    fn header_len(length_width: usize, position_width: usize) -> u64 {
        (1 + 3 * position_width + length_width + 2 + 8) as u64
    }

    /// Create a new record at the end of `stream`, with an empty first
    /// block of `min_alloc_size` bytes.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] if a width is not in `1..=8`, or if the
    /// minimum allocation size is zero or does not fit the length width.
    pub fn create(stream: SharedStream<S>, config: ForwardRecordConfig) -> Result<Self> {
        let length_width = config.length_width as usize;
        let position_width = config.position_width as usize;
        if !(1..=8).contains(&length_width) || !(1..=8).contains(&position_width) {
            return Err(Error::InvalidArgument(format!(
                "field widths {} and {} must be between 1 and 8",
                length_width, position_width
            )));
        }
        let min_alloc = config.min_alloc_size as u64;
        if min_alloc == 0 || min_alloc > max_value(length_width) {
            return Err(Error::InvalidArgument(format!(
                "minimum allocation size {} does not fit {} bytes",
                min_alloc, length_width
            )));
        }

        let info_pos = stream.lock().seek_to_end()?;
        let block = info_pos + Self::header_len(length_width, position_width);
        let first = Place::at_start(block, min_alloc, 0);
        let mut record = Self {
            stream,
            info_pos,
            length_width,
            position_width,
            min_alloc_size: config.min_alloc_size,
            tag: config.tag,
            first,
            pos: first,
            end: first,
            bookmarks: Vec::new(),
        };
        record.check_position(block + length_width as u64 + min_alloc + position_width as u64)?;
        record.save()?;
        {
            let mut stream = record.stream.lock();
            stream.seek_to(block)?;
            stream.write_uint(min_alloc, length_width)?;
            stream.write_zeros(min_alloc)?;
            stream.write_uint(0, position_width)?;
        }
        debug!("Created forward record at {}", info_pos);
        Ok(record)
    }

    /// Open the record whose header is at `info_pos`, walking the chain to
    /// recover the logical position and length.
    pub fn open(stream: SharedStream<S>, info_pos: u64) -> Result<Self> {
        let (length_width, position_width, end, current, block_start, min_alloc_size, tag) = {
            let mut s = stream.lock();
            s.seek_to(info_pos)?;
            let mut widths = [0_u8];
            s.read_exact(&mut widths)?;
            let length_width = (widths[0] & 0x0F) as usize;
            let position_width = (widths[0] >> 4) as usize;
            if !(1..=8).contains(&length_width) || !(1..=8).contains(&position_width) {
                return Err(Error::InvalidData(format!(
                    "invalid field widths {:#04x} at {}",
                    widths[0], info_pos
                )));
            }
            let end = s.read_uint(position_width)?;
            let current = s.read_uint(position_width)?;
            let block_start = s.read_uint(position_width)?;
            let _block_length = s.read_uint(length_width)?;
            let min_alloc_size = s.read_u16()?;
            let tag = s.read_u64()?;
            (length_width, position_width, end, current, block_start, min_alloc_size, tag)
        };

        let mut record = Self {
            stream,
            info_pos,
            length_width,
            position_width,
            min_alloc_size,
            tag,
            first: Place::at_start(0, 0, 0),
            pos: Place::at_start(0, 0, 0),
            end: Place::at_start(0, 0, 0),
            bookmarks: Vec::new(),
        };

        let first_block = info_pos + Self::header_len(length_width, position_width);
        let (pos, end) = {
            let mut s = record.stream.lock();
            let stream_len = s.len()?;
            let mut visited = HashSet::new();
            let mut block = first_block;
            let mut logical = 0_u64;
            let mut pos = None;
            let mut end_place = None;
            loop {
                if block >= stream_len || !visited.insert(block) {
                    return Err(Error::InvalidData(format!(
                        "chain of record at {} loops or leaves the stream at block {}",
                        info_pos, block
                    )));
                }
                s.seek_to(block)?;
                let capacity = s.read_uint(length_width)?;
                if capacity == 0 {
                    return Err(Error::InvalidData(format!("empty block at {}", block)));
                }
                let block_end = (block + length_width as u64)
                    .checked_add(capacity)
                    .and_then(|end| end.checked_add(position_width as u64));
                if block_end.is_none_or(|end| end > stream_len) {
                    return Err(Error::InvalidData(format!(
                        "block at {} of capacity {} exceeds the stream",
                        block, capacity
                    )));
                }
                if block == first_block {
                    record.first = Place::at_start(block, capacity, 0);
                }
                let payload = block + length_width as u64;
                let find = |target: u64| {
                    (payload..=payload + capacity).contains(&target).then(|| Place {
                        block,
                        capacity,
                        offset: target - payload,
                        logical: logical + target - payload,
                    })
                };
                pos = pos.or_else(|| find(current));
                end_place = end_place.or_else(|| find(end));
                if let (Some(pos), Some(end)) = (pos, end_place) {
                    break (pos, end);
                }
                logical += capacity;
                let next = record.read_next(&mut s, block, capacity)?;
                if next == 0 {
                    return Err(record.broken());
                }
                block = next;
            }
        };
        if pos.logical > end.logical || pos.block != block_start {
            return Err(Error::InvalidData(format!(
                "inconsistent cursor in record at {}",
                info_pos
            )));
        }
        record.pos = pos;
        record.end = end;
        debug!(
            "Opened forward record at {}: {} bytes, cursor at {}",
            info_pos, end.logical, pos.logical
        );
        Ok(record)
    }

    fn check_position(&self, offset: u64) -> Result<()> {
        if offset > max_value(self.position_width) {
            return Err(Error::InvalidOperation(format!(
                "offset {} does not fit {} bytes",
                offset, self.position_width
            )));
        }
        Ok(())
    }

    fn payload(&self, place: &Place) -> u64 {
        place.block + self.length_width as u64
    }

    fn read_next(&self, s: &mut S, block: u64, capacity: u64) -> Result<u64> {
        s.seek_to(block + self.length_width as u64 + capacity)?;
        Ok(s.read_uint(self.position_width)?)
    }

    /// Return the place at the start of the block following `place`, if any.
    fn next_place(&self, s: &mut S, place: &Place) -> Result<Option<Place>> {
        let next = self.read_next(s, place.block, place.capacity)?;
        if next == 0 {
            return Ok(None);
        }
        s.seek_to(next)?;
        let capacity = s.read_uint(self.length_width)?;
        if capacity == 0 {
            return Err(Error::InvalidData(format!("empty block at {}", next)));
        }
        Ok(Some(Place::at_start(next, capacity, place.logical)))
    }

    /// Append a block with room for at least `size` bytes (within the
    /// limits of the length width) and link it after `tail`, which must be
    /// the last block of the chain.
    fn append_block(&self, s: &mut S, tail: &Place, size: u64) -> Result<Place> {
        let capacity = size
            .max(self.min_alloc_size as u64)
            .min(max_value(self.length_width));
        let block = s.seek_to_end()?;
        self.check_position(block + self.length_width as u64 + capacity + self.position_width as u64)?;
        s.write_uint(capacity, self.length_width)?;
        s.write_zeros(capacity)?;
        s.write_uint(0, self.position_width)?;
        s.seek_to(tail.block + self.length_width as u64 + tail.capacity)?;
        s.write_uint(block, self.position_width)?;
        debug!("Linked block of {} bytes at {} after {}", capacity, block, tail.block);
        Ok(Place::at_start(block, capacity, tail.logical))
    }

    /// Return the position of the header in the stream.
    pub fn info_position(&self) -> u64 {
        self.info_pos
    }

    pub fn tag(&self) -> u64 {
        self.tag
    }

    pub fn set_tag(&mut self, tag: u64) {
        self.tag = tag;
    }

    pub fn min_alloc_size(&self) -> u16 {
        self.min_alloc_size
    }

    /// Return the logical length of the record.
    pub fn length(&self) -> u64 {
        self.end.logical
    }

    /// Return the logical position of the cursor.
    pub fn position(&self) -> u64 {
        self.pos.logical
    }

    /// Forward records can only seek forward.
    pub fn can_seek(&self) -> bool {
        false
    }

    /// Move the cursor back to the start of the record.
    pub fn rewind(&mut self) {
        self.pos = self.first;
    }

    /// Move the cursor forward and return the new position.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidOperation`] for anything but
    /// `SeekFrom::Current(n)` with `n ≥ 0`; [`Error::OutOfRange`] if the
    /// target is past the logical end.
    pub fn seek(&mut self, pos: std::io::SeekFrom) -> Result<u64> {
        let std::io::SeekFrom::Current(n) = pos else {
            return Err(Error::InvalidOperation(
                "forward records seek only from the current position".into(),
            ));
        };
        if n < 0 {
            return Err(Error::InvalidOperation(
                "forward records cannot seek backward".into(),
            ));
        }
        let target = self.pos.logical as i128 + n as i128;
        if target > self.end.logical as i128 {
            return Err(Error::OutOfRange {
                position: target,
                min: self.pos.logical,
                max: self.end.logical,
            });
        }
        let mut left = n as u64;
        let mut place = self.pos;
        {
            let mut s = self.stream.lock();
            while left > 0 {
                if place.offset == place.capacity {
                    place = self.next_place(&mut s, &place)?.ok_or_else(|| self.broken())?;
                }
                let step = left.min(place.capacity - place.offset);
                place.offset += step;
                place.logical += step;
                left -= step;
            }
        }
        self.pos = place;
        Ok(self.pos.logical)
    }

    fn broken(&self) -> Error {
        Error::InvalidData(format!(
            "chain of record at {} ends before its logical end",
            self.info_pos
        ))
    }

    /// Bookmark the cursor.
    ///
    /// With `cascade`, the bookmark is pushed on top of the existing ones;
    /// otherwise it replaces the most recent one.
    pub fn save_status(&mut self, cascade: bool) {
        if cascade || self.bookmarks.is_empty() {
            self.bookmarks.push(self.pos);
        } else if let Some(top) = self.bookmarks.last_mut() {
            *top = self.pos;
        }
    }

    /// Move the cursor back to the most recent bookmark, removing it.
    pub fn restore_status(&mut self) -> Result<()> {
        let place = self.bookmarks.pop().ok_or_else(|| {
            Error::InvalidOperation("no saved status to restore".into())
        })?;
        self.pos = place;
        Ok(())
    }

    /// Remove the most recent bookmark without moving the cursor.
    pub fn discard_status(&mut self) -> Result<()> {
        self.bookmarks.pop().map(|_| ()).ok_or_else(|| {
            Error::InvalidOperation("no saved status to discard".into())
        })
    }

    /// Return the number of bookmarks.
    pub fn status_depth(&self) -> usize {
        self.bookmarks.len()
    }

    /// Make sure that at least `size` bytes can be written past the logical
    /// end without linking new blocks.
    pub fn alloc(&mut self, size: u64) -> Result<()> {
        let mut s = self.stream.lock();
        let mut place = self.end;
        let mut available = place.capacity - place.offset;
        while available < size {
            place = match self.next_place(&mut s, &place)? {
                Some(next) => next,
                None => self.append_block(&mut s, &place, size - available)?,
            };
            available += place.capacity;
        }
        Ok(())
    }

    /// Read up to `buf.len()` bytes and return the number of bytes read,
    /// which is smaller only at the end of the record.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let n = buf.len().min((self.end.logical - self.pos.logical) as usize);
        let mut place = self.pos;
        {
            let mut s = self.stream.lock();
            let mut done = 0;
            while done < n {
                if place.offset == place.capacity {
                    place = self.next_place(&mut s, &place)?.ok_or_else(|| self.broken())?;
                }
                let chunk = (n - done).min((place.capacity - place.offset) as usize);
                s.seek_to(self.payload(&place) + place.offset)?;
                s.read_exact(&mut buf[done..done + chunk])?;
                place.offset += chunk as u64;
                place.logical += chunk as u64;
                done += chunk;
            }
        }
        self.pos = place;
        Ok(n)
    }

    /// Fill `buf`, or fail with [`Error::EndOfStream`] without moving the
    /// cursor if the record ends first.
    pub fn read_fully(&mut self, buf: &mut [u8]) -> Result<()> {
        if buf.len() as u64 > self.end.logical - self.pos.logical {
            return Err(Error::EndOfStream);
        }
        self.read(buf).map(|_| ())
    }

    /// Write `buf` at the cursor, linking new blocks as needed.
    pub fn write(&mut self, buf: &[u8]) -> Result<()> {
        let mut place = self.pos;
        {
            let mut s = self.stream.lock();
            let mut done = 0;
            while done < buf.len() {
                if place.offset == place.capacity {
                    place = match self.next_place(&mut s, &place)? {
                        Some(next) => next,
                        None => {
                            self.append_block(&mut s, &place, (buf.len() - done) as u64)?
                        }
                    };
                }
                let chunk = (buf.len() - done).min((place.capacity - place.offset) as usize);
                s.seek_to(self.payload(&place) + place.offset)?;
                s.write_all(&buf[done..done + chunk])?;
                place.offset += chunk as u64;
                place.logical += chunk as u64;
                done += chunk;
            }
        }
        self.pos = place;
        if place.logical > self.end.logical {
            self.end = place;
        }
        Ok(())
    }

    /// Write the header.
    pub fn save(&mut self) -> Result<()> {
        self.check_position(self.payload(&self.end) + self.end.offset)?;
        let mut s = self.stream.lock();
        s.seek_to(self.info_pos)?;
        s.write_all(&[((self.position_width as u8) << 4) | self.length_width as u8])?;
        s.write_uint(self.payload(&self.end) + self.end.offset, self.position_width)?;
        s.write_uint(self.payload(&self.pos) + self.pos.offset, self.position_width)?;
        s.write_uint(self.pos.block, self.position_width)?;
        s.write_uint(self.pos.capacity, self.length_width)?;
        s.write_u16(self.min_alloc_size)?;
        s.write_u64(self.tag)?;
        s.flush()?;
        Ok(())
    }

    /// Save the header and return the underlying stream.
    pub fn close(mut self) -> Result<SharedStream<S>> {
        self.save()?;
        Ok(self.stream)
    }
}

impl<S: ByteStream> Read for ForwardRecordStream<S> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        Ok(ForwardRecordStream::read(self, buf)?)
    }
}

impl<S: ByteStream> Write for ForwardRecordStream<S> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        ForwardRecordStream::write(self, buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.stream.lock().flush()
    }
}
