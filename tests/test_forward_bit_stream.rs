/*
 * SPDX-FileCopyrightText: 2023 Tommaso Fontana
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use bitstore::prelude::*;
use std::io::{Cursor, SeekFrom};

#[test]
fn test_same_bits_as_bit_stream() -> Result<()> {
    let mut forward = ForwardBitStream::writer(Cursor::new(Vec::new()))?;
    let mut random = BitStream::create(Cursor::new(Vec::new()))?;
    for n in 0..1000 {
        forward.write_gamma(n)?;
        forward.write_delta(n)?;
        random.write_gamma(n)?;
        random.write_delta(n)?;
    }
    assert_eq!(forward.position()?, random.len());
    let forward = forward.close()?.into_inner();
    let random = random.close()?.into_inner();
    assert_eq!(&forward[..], &random[HEADER_LEN as usize..]);
    Ok(())
}

#[test]
fn test_offset_and_reader() -> Result<()> {
    let mut backend = Cursor::new(vec![0xEE; 4]);
    backend.set_position(4);
    let mut stream = ForwardBitStream::writer(backend)?;
    stream.write_unary(10)?;
    stream.write_bits(0x1234, 16)?;
    assert_eq!(stream.position()?, 27);
    let mut backend = stream.close()?;
    assert_eq!(backend.get_ref().len(), 8);
    assert_eq!(&backend.get_ref()[..4], &[0xEE; 4]);

    backend.set_position(4);
    let mut stream = ForwardBitStream::reader(backend)?;
    assert!(stream.is_reading());
    assert_eq!(stream.position()?, 0);
    assert_eq!(stream.read_unary()?, 10);
    assert_eq!(stream.read_bits(16)?, 0x1234);
    assert_eq!(stream.position()?, 27);
    // padding
    assert_eq!(stream.read_bits(5)?, 0);
    assert!(matches!(stream.read_bit(), Err(Error::EndOfStream)));
    Ok(())
}

#[test]
fn test_modes() -> Result<()> {
    let mut stream = ForwardBitStream::writer(Cursor::new(Vec::new()))?;
    assert!(!stream.can_seek());
    assert!(matches!(
        stream.seek(SeekFrom::Start(0)),
        Err(Error::InvalidOperation(_))
    ));
    assert!(matches!(stream.read_bit(), Err(Error::InvalidOperation(_))));
    stream.write_bits(0b1011, 4)?;

    stream.reset(true)?;
    assert!(matches!(stream.write_bit(true), Err(Error::InvalidOperation(_))));
    assert_eq!(stream.read_bits(4)?, 0b1011);

    // rewriting the start keeps the trailing bits of the partial byte
    stream.reset(false)?;
    stream.write_bits(0b01, 2)?;
    stream.reset(true)?;
    assert_eq!(stream.read_bits(4)?, 0b0111);
    Ok(())
}

#[test]
fn test_flush_and_continue() -> Result<()> {
    let mut stream = ForwardBitStream::writer(Cursor::new(Vec::new()))?;
    stream.write_bits(0b101, 3)?;
    stream.flush()?;
    stream.write_bits(0b11111, 5)?;
    stream.write_bits(0b1, 1)?;
    let data = stream.close()?.into_inner();
    assert_eq!(data, vec![0b1011_1111, 0b1000_0000]);
    Ok(())
}
