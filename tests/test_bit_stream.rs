/*
 * SPDX-FileCopyrightText: 2023 Tommaso Fontana
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use bitstore::prelude::*;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::io::{Cursor, SeekFrom};

#[test]
fn test_non_clobbering() -> Result<()> {
    let mut stream = BitStream::create(Cursor::new(Vec::new()))?;
    stream.write(&[0xAA, 0x55])?;
    stream.seek(SeekFrom::Start(4))?;
    stream.write_byte_bits(0xFF, 4, false)?;
    assert_eq!(stream.len(), 16);
    let data = stream.close()?.into_inner();
    assert_eq!(&data[HEADER_LEN as usize..], &[0xAF, 0x55]);
    Ok(())
}

#[test]
fn test_high_aligned_bits() -> Result<()> {
    let mut stream = BitStream::create(Cursor::new(Vec::new()))?;
    stream.write_bits(0, 8)?;
    stream.set_position(2)?;
    stream.write_byte_bits(0b1010_0000, 3, true)?;
    stream.reset()?;
    assert_eq!(stream.read_byte()?, 0b0010_1000);
    Ok(())
}

#[test]
fn test_length_persistence() -> Result<()> {
    let mut stream = BitStream::create(Cursor::new(Vec::new()))?;
    stream.write_bits(0b1011_0011_1000_1, 13)?;
    assert_eq!(stream.len(), 13);
    let mut backend = stream.close()?;

    backend.set_position(0);
    let mut stream = BitStream::open(backend)?;
    assert_eq!(stream.len(), 13);
    assert_eq!(stream.position(), 0);
    assert_eq!(stream.read_bits(13)?, 0b1011_0011_1000_1);
    assert!(matches!(stream.read_bit(), Err(Error::EndOfStream)));

    // appending continues the partial byte
    stream.write_bits(0b111, 3)?;
    assert_eq!(stream.len(), 16);
    let data = stream.close()?.into_inner();
    assert_eq!(data.len(), HEADER_LEN as usize + 2);
    assert_eq!(&data[HEADER_LEN as usize..], &[0b1011_0011, 0b1000_1111]);
    Ok(())
}

#[test]
fn test_origin_not_at_zero() -> Result<()> {
    let mut backend = Cursor::new(vec![0xEE; 5]);
    backend.set_position(5);
    let mut stream = BitStream::create(backend)?;
    assert_eq!(stream.origin(), 5 + HEADER_LEN);
    stream.write_gamma(41)?;
    let mut backend = stream.close()?;
    assert_eq!(&backend.get_ref()[..5], &[0xEE; 5]);

    backend.set_position(5);
    let mut stream = BitStream::open(backend)?;
    assert_eq!(stream.read_gamma()?, 41);
    Ok(())
}

#[test]
fn test_bad_header() {
    // 9 bits in the last byte
    let backend = Cursor::new(vec![9_u8, 9, 0, 0, 0, 0, 0, 0, 0]);
    assert!(matches!(BitStream::open(backend), Err(Error::InvalidData(_))));
    // end before origin
    let backend = Cursor::new(vec![0_u8, 3, 0, 0, 0, 0, 0, 0, 0]);
    assert!(matches!(BitStream::open(backend), Err(Error::InvalidData(_))));
}

#[test]
fn test_seek() -> Result<()> {
    let mut stream = BitStream::create(Cursor::new(Vec::new()))?;
    for n in 0..100 {
        stream.write_delta(n)?;
    }
    let len = stream.len();
    assert_eq!(stream.seek(SeekFrom::End(0))?, len);
    assert!(matches!(
        stream.seek(SeekFrom::End(1)),
        Err(Error::OutOfRange { .. })
    ));
    assert!(matches!(
        stream.seek(SeekFrom::Start(len + 1)),
        Err(Error::OutOfRange { .. })
    ));
    assert_eq!(stream.seek(SeekFrom::Start(0))?, 0);
    assert!(matches!(
        stream.seek(SeekFrom::Current(-1)),
        Err(Error::OutOfRange { .. })
    ));

    let mut positions = vec![];
    for n in 0..100 {
        positions.push(stream.position());
        assert_eq!(stream.read_delta()?, n);
    }
    for n in (0..100).rev() {
        stream.set_bit_pos(positions[n as usize])?;
        assert_eq!(stream.bit_pos()?, positions[n as usize]);
        assert_eq!(stream.read_delta()?, n);
    }
    Ok(())
}

#[test]
fn test_packed_reads() -> Result<()> {
    let mut stream = BitStream::create(Cursor::new(Vec::new()))?;
    stream.write_bit(true)?;
    stream.write(&[0x12, 0x34, 0x56])?;
    stream.reset()?;
    assert!(stream.read_bit()?);
    let mut buf = [0_u8; 4];
    assert_eq!(stream.read(&mut buf)?, 3);
    assert_eq!(&buf[..3], &[0x12, 0x34, 0x56]);

    stream.reset()?;
    assert_eq!(stream.read_packed_bits(12)?, vec![0x89, 0x10]);
    assert!(matches!(
        stream.read_packed_bits(100),
        Err(Error::EndOfStream)
    ));
    Ok(())
}

#[test]
fn test_random_overwrites() -> Result<()> {
    const BITS: usize = 4096;
    let mut r = SmallRng::seed_from_u64(0);
    let mut model = vec![false; BITS];
    let mut stream = BitStream::create(Cursor::new(Vec::new()))?;
    for _ in 0..BITS / 64 {
        stream.write_bits(0, 64)?;
    }
    for _ in 0..1000 {
        let start = r.random_range(0..BITS - 64);
        let n_bits = r.random_range(1..=64);
        let value = r.random::<u64>() >> (64 - n_bits);
        stream.set_position(start as u64)?;
        stream.write_bits(value, n_bits)?;
        for i in 0..n_bits {
            model[start + i] = (value >> (n_bits - 1 - i)) & 1 != 0;
        }
    }
    let mut backend = stream.close()?;
    backend.set_position(0);
    let mut stream = BitStream::open(backend)?;
    assert_eq!(stream.len(), BITS as u64);
    for (i, &bit) in model.iter().enumerate() {
        assert_eq!(stream.read_bit()?, bit, "bit {}", i);
    }
    Ok(())
}

#[test]
fn test_file_backend() -> Result<()> {
    let file = tempfile::tempfile()?;
    let mut stream = BitStream::create(file)?;
    for n in 0..1000 {
        stream.write_gamma(n)?;
    }
    let len = stream.len();
    let mut file = stream.close()?;

    file.seek_to(0)?;
    let mut stream = BitStream::open(file)?;
    assert_eq!(stream.len(), len);
    for n in 0..1000 {
        assert_eq!(stream.read_gamma()?, n);
    }
    Ok(())
}

#[test]
fn test_over_record() -> Result<()> {
    let shared = SharedStream::new(Cursor::new(Vec::new()));
    let mut record = RecordStream::new(shared.clone(), shared.clone(), None);
    record.create_new(16)?;
    let mut stream = BitStream::create(record)?;
    for n in 0..500 {
        stream.write_delta(n)?;
    }
    let mut record = stream.close()?;
    let position = record.save_info()?;
    record.unload_info()?;

    let mut record = RecordStream::new(shared.clone(), shared, Some(position));
    record.load_info()?;
    let mut stream = BitStream::open(record)?;
    for n in 0..500 {
        assert_eq!(stream.read_delta()?, n);
    }
    assert_eq!(stream.position(), stream.len());
    Ok(())
}
