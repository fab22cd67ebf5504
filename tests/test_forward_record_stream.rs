/*
 * SPDX-FileCopyrightText: 2023 Tommaso Fontana
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use bitstore::prelude::*;
use std::io::{Cursor, Read, SeekFrom};

type Shared = SharedStream<Cursor<Vec<u8>>>;

fn shared() -> Shared {
    SharedStream::new(Cursor::new(Vec::new()))
}

fn small(min_alloc_size: u16) -> ForwardRecordConfig {
    ForwardRecordConfig {
        min_alloc_size,
        length_width: 2,
        position_width: 4,
        tag: 0,
    }
}

#[test]
fn test_reopen_resumes() -> Result<()> {
    let s = shared();
    let mut record = ForwardRecordStream::create(s.clone(), ForwardRecordConfig::default())?;
    record.write(b"hello")?;
    record.set_tag(42);
    let info_pos = record.info_position();
    let s = record.close()?;

    let mut record = ForwardRecordStream::open(s.clone(), info_pos)?;
    assert_eq!(record.tag(), 42);
    assert_eq!(record.min_alloc_size(), 64);
    assert_eq!(record.length(), 5);
    assert_eq!(record.position(), 5);
    record.write(b", world")?;
    record.rewind();
    let mut buf = vec![];
    record.read_to_end(&mut buf)?;
    assert_eq!(buf, b"hello, world");
    Ok(())
}

#[test]
fn test_many_blocks() -> Result<()> {
    let s = shared();
    let mut record = ForwardRecordStream::create(s.clone(), small(4))?;
    for i in 0..40_u8 {
        record.write(&[i; 3])?;
    }
    assert_eq!(record.length(), 120);
    // leave the cursor in the middle
    record.rewind();
    record.seek(SeekFrom::Current(50))?;
    let info_pos = record.info_position();
    record.close()?;

    let mut record = ForwardRecordStream::open(s, info_pos)?;
    assert_eq!(record.length(), 120);
    assert_eq!(record.position(), 50);
    let mut buf = [0; 4];
    record.read_fully(&mut buf)?;
    assert_eq!(buf, [16, 17, 17, 17]);

    record.rewind();
    let mut all = vec![];
    record.read_to_end(&mut all)?;
    assert_eq!(all, (0..40).flat_map(|i| [i; 3]).collect::<Vec<u8>>());
    Ok(())
}

#[test]
fn test_seek_restrictions() -> Result<()> {
    let s = shared();
    let mut record = ForwardRecordStream::create(s, small(8))?;
    assert!(!record.can_seek());
    record.write(b"0123456789")?;
    assert!(matches!(
        record.seek(SeekFrom::Start(0)),
        Err(Error::InvalidOperation(_))
    ));
    assert!(matches!(
        record.seek(SeekFrom::End(0)),
        Err(Error::InvalidOperation(_))
    ));
    record.rewind();
    assert_eq!(record.seek(SeekFrom::Current(4))?, 4);
    assert!(matches!(
        record.seek(SeekFrom::Current(-1)),
        Err(Error::InvalidOperation(_))
    ));
    assert!(matches!(
        record.seek(SeekFrom::Current(7)),
        Err(Error::OutOfRange { .. })
    ));
    assert_eq!(record.seek(SeekFrom::Current(6))?, 10);
    Ok(())
}

#[test]
fn test_bookmarks() -> Result<()> {
    let s = shared();
    let mut record = ForwardRecordStream::create(s, small(4))?;
    record.write(b"abcdefghij")?;
    record.rewind();

    record.seek(SeekFrom::Current(2))?;
    record.save_status(false);
    record.seek(SeekFrom::Current(3))?;
    record.save_status(true);
    assert_eq!(record.status_depth(), 2);

    let mut byte = [0];
    record.read_fully(&mut byte)?;
    assert_eq!(&byte, b"f");
    record.restore_status()?;
    record.read_fully(&mut byte)?;
    assert_eq!(&byte, b"f");
    record.restore_status()?;
    assert_eq!(record.position(), 2);
    record.read_fully(&mut byte)?;
    assert_eq!(&byte, b"c");
    assert!(matches!(
        record.restore_status(),
        Err(Error::InvalidOperation(_))
    ));

    // without cascade the top bookmark is replaced
    record.save_status(false);
    record.seek(SeekFrom::Current(4))?;
    record.save_status(false);
    assert_eq!(record.status_depth(), 1);
    record.rewind();
    record.restore_status()?;
    assert_eq!(record.position(), 7);

    record.save_status(true);
    record.discard_status()?;
    assert_eq!(record.position(), 7);
    assert!(matches!(
        record.discard_status(),
        Err(Error::InvalidOperation(_))
    ));
    Ok(())
}

#[test]
fn test_alloc() -> Result<()> {
    let s = shared();
    let mut record = ForwardRecordStream::create(s.clone(), small(4))?;
    record.write(b"ab")?;
    record.alloc(100)?;
    let allocated = s.lock().get_ref().len();
    // already enough room
    record.alloc(100)?;
    assert_eq!(s.lock().get_ref().len(), allocated);

    record.write(&[9; 100])?;
    assert_eq!(s.lock().get_ref().len(), allocated);
    assert_eq!(record.length(), 102);
    Ok(())
}

#[test]
fn test_overwrite() -> Result<()> {
    let s = shared();
    let mut record = ForwardRecordStream::create(s, small(4))?;
    record.write(b"forward records")?;
    record.rewind();
    record.seek(SeekFrom::Current(8))?;
    record.write(b"R")?;
    assert_eq!(record.length(), 15);
    assert_eq!(record.position(), 9);
    record.rewind();
    let mut buf = [0; 15];
    record.read_fully(&mut buf)?;
    assert_eq!(&buf, b"forward Records");
    assert_eq!(record.read(&mut buf)?, 0);
    Ok(())
}

#[test]
fn test_interleaved_records() -> Result<()> {
    let s = shared();
    let mut a = ForwardRecordStream::create(s.clone(), small(4))?;
    let mut b = ForwardRecordStream::create(s.clone(), small(4))?;
    for i in 0..20_u8 {
        a.write(&[i; 2])?;
        b.write(&[100 + i; 7])?;
    }
    let (pa, pb) = (a.info_position(), b.info_position());
    a.close()?;
    b.close()?;

    let mut a = ForwardRecordStream::open(s.clone(), pa)?;
    let mut b = ForwardRecordStream::open(s, pb)?;
    a.rewind();
    b.rewind();
    let mut buf = vec![];
    a.read_to_end(&mut buf)?;
    assert_eq!(buf, (0..20).flat_map(|i| [i; 2]).collect::<Vec<u8>>());
    buf.clear();
    b.read_to_end(&mut buf)?;
    assert_eq!(buf, (100..120).flat_map(|i| [i; 7]).collect::<Vec<u8>>());
    Ok(())
}

#[test]
fn test_offset_overflow() -> Result<()> {
    let s = shared();
    let config = ForwardRecordConfig {
        min_alloc_size: 200,
        length_width: 1,
        position_width: 1,
        tag: 0,
    };
    let mut record = ForwardRecordStream::create(s, config)?;
    record.write(&[1; 200])?;
    // the next block would end past offset 255
    assert!(matches!(
        record.write(&[1; 10]),
        Err(Error::InvalidOperation(_))
    ));
    Ok(())
}
