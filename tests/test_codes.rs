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
use std::io::Cursor;

const N: u64 = 100000;

#[test]
fn test_bit_code_round_trip() -> Result<()> {
    for n in 0..N {
        let gamma = gamma_code(n as i64)?;
        assert_eq!(gamma.len(), len_gamma(n));
        assert_eq!(gamma_decode(&gamma)?, n);

        let delta = delta_code(n as i64)?;
        assert_eq!(delta.len(), len_delta(n));
        assert_eq!(delta_decode(&delta)?, n);

        // alignment does not change the code
        assert_eq!(gamma_decode(&gamma.to_low_aligned())?, n);
        assert_eq!(delta_decode(&delta.to_low_aligned())?, n);
    }
    Ok(())
}

#[test]
fn test_streaming_round_trip() -> Result<()> {
    let mut write = BitStream::create(Cursor::new(Vec::new()))?;
    let mut written = 0;
    for n in 0..N {
        written += write.write_gamma(n)?;
        written += write.write_delta(n)?;
    }
    assert_eq!(write.len(), written as u64);
    let mut backend = write.close()?;

    backend.set_position(0);
    let mut read = BitStream::open(backend)?;
    assert_eq!(read.len(), written as u64);
    for n in 0..N {
        assert_eq!(read.read_gamma()?, n);
        assert_eq!(read.read_delta()?, n);
    }
    assert!(matches!(read.read_bit(), Err(Error::EndOfStream)));
    Ok(())
}

#[test]
fn test_streaming_matches_bit_code() -> Result<()> {
    let mut write = BitStream::create(Cursor::new(Vec::new()))?;
    for n in 0..1000 {
        write.write_code(&gamma_code(n)?)?;
        write.write_code(&delta_code(n)?)?;
    }
    write.reset()?;
    for n in 0..1000 {
        assert_eq!(write.read_gamma()?, n as u64);
        assert_eq!(write.read_delta()?, n as u64);
    }
    Ok(())
}

#[test]
fn test_negative_rejection() {
    assert!(matches!(gamma_code(-1), Err(Error::InvalidArgument(_))));
    assert!(matches!(delta_code(-1), Err(Error::InvalidArgument(_))));
    assert!(matches!(gamma_code(i64::MIN), Err(Error::InvalidArgument(_))));
    assert!(matches!(delta_code(i64::MIN), Err(Error::InvalidArgument(_))));
}

#[test]
fn test_random_mix() -> Result<()> {
    const M: usize = 10000;
    let mut r = SmallRng::seed_from_u64(0);
    let mut v = SmallRng::seed_from_u64(1);
    let mut write = ForwardBitStream::writer(Cursor::new(Vec::new()))?;

    let mut pos = vec![];
    let mut total = 0;
    for _ in 0..M {
        let mut written_bits = 0;
        match r.random_range(0..4) {
            0 => {
                for _ in 0..r.random_range(1..10) {
                    written_bits += write.write_unary(v.random_range(0..100))?;
                }
            }
            1 => {
                for _ in 0..r.random_range(1..10) {
                    written_bits += write.write_gamma(v.random_range(0..100))?;
                }
            }
            2 => {
                for _ in 0..r.random_range(1..10) {
                    written_bits += write.write_delta(v.random_range(0..1_u64 << 40))?;
                }
            }
            _ => {
                for _ in 0..r.random_range(1..10) {
                    let n_bits = v.random_range(1..=64);
                    let value = v.random::<u64>() >> (64 - n_bits);
                    written_bits += write.write_bits(value, n_bits)?;
                }
            }
        }
        total += written_bits as u64;
        pos.push(total);
    }
    assert_eq!(write.position()?, total);

    write.reset(true)?;
    let mut r = SmallRng::seed_from_u64(0);
    let mut v = SmallRng::seed_from_u64(1);
    for &expected in &pos {
        match r.random_range(0..4) {
            0 => {
                for _ in 0..r.random_range(1..10) {
                    assert_eq!(write.read_unary()?, v.random_range(0..100));
                }
            }
            1 => {
                for _ in 0..r.random_range(1..10) {
                    assert_eq!(write.read_gamma()?, v.random_range(0..100));
                }
            }
            2 => {
                for _ in 0..r.random_range(1..10) {
                    assert_eq!(write.read_delta()?, v.random_range(0..1_u64 << 40));
                }
            }
            _ => {
                for _ in 0..r.random_range(1..10) {
                    let n_bits = v.random_range(1..=64);
                    let value = v.random::<u64>() >> (64 - n_bits);
                    assert_eq!(write.read_bits(n_bits)?, value);
                }
            }
        }
        assert_eq!(write.position()?, expected);
    }
    Ok(())
}

#[test]
fn test_stats() -> Result<()> {
    let mut stats = CodesStats::default();
    let mut count = CountBitWriter::<_, false>::new(BitStream::create(Cursor::new(Vec::new()))?);
    for n in 0..20 {
        stats.update(n);
        count.write_gamma(n)?;
    }
    assert_eq!(stats.gamma, count.bits_written as u64);
    assert_eq!(stats.total, 20);
    assert_eq!(stats.best_code(), (Code::Gamma, 128));
    assert_eq!(stats.delta, 146);

    for n in 0..1000 {
        stats.update(n);
    }
    assert_eq!(stats.best_code().0, Code::Delta);
    Ok(())
}

#[cfg(feature = "serde")]
#[test]
fn test_serde() -> Result<()> {
    let code = delta_code(1000)?;
    let json = serde_json::to_string(&code).unwrap();
    assert_eq!(serde_json::from_str::<BitCode>(&json).unwrap(), code);

    let mut stats = CodesStats::default();
    stats.update_many(7, 3);
    let json = serde_json::to_string(&stats).unwrap();
    assert_eq!(serde_json::from_str::<CodesStats>(&json).unwrap(), stats);

    let config: RecordConfig =
        serde_json::from_str(r#"{"block_length": 64, "extra_width": 2}"#).unwrap();
    assert_eq!(config.block_length, 64);
    assert_eq!(config.extra_width, 2);
    Ok(())
}

#[cfg(feature = "mem_dbg")]
#[test]
fn test_mem_size() {
    use mem_dbg::{MemSize, SizeFlags};
    use std::mem::size_of;

    let flags = SizeFlags::default();
    assert_eq!(BitCode::low(5, 3).mem_size(flags), size_of::<BitCode>());
    assert_eq!(Code::Delta.mem_size(flags), size_of::<Code>());
    assert_eq!(CodesStats::default().mem_size(flags), size_of::<CodesStats>());
    assert_eq!(
        RecordConfig::default().mem_size(flags),
        size_of::<RecordConfig>()
    );
    assert_eq!(
        ForwardRecordConfig::default().mem_size(flags),
        size_of::<ForwardRecordConfig>()
    );
    let codes = vec![BitCode::default(); 10];
    assert!(codes.mem_size(flags) >= 10 * size_of::<BitCode>());
}
