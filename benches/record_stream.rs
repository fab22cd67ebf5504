use bitstore::prelude::*;
use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use std::hint::black_box;
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const DATA: [u8; 4096] = [0x5A; 4096];

pub fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("RecordStream write 4 KiB in 512-byte blocks", |b| {
        b.iter_batched(
            || SharedStream::new(Cursor::new(Vec::new())),
            |s| {
                let mut record = RecordStream::new(s.clone(), s, None);
                record.create_new(512).unwrap();
                record.write(&DATA).unwrap();
                black_box(record.save_info().unwrap())
            },
            BatchSize::SmallInput,
        )
    });

    c.bench_function("RecordStream clear and rewrite with FreeList", |b| {
        let s = SharedStream::new(Cursor::new(Vec::new()));
        let free = Arc::new(Mutex::new(FreeList::new()));
        let mut record = RecordStream::new(s.clone(), s, None).with_space_manager(free);
        record.create_new(64).unwrap();
        b.iter(|| {
            record.write(&DATA).unwrap();
            record.clear().unwrap();
        })
    });

    let s = SharedStream::new(Cursor::new(Vec::new()));
    let mut record = RecordStream::new(s.clone(), s.clone(), None);
    record.create_new(512).unwrap();
    for _ in 0..16 {
        record.write(&DATA).unwrap();
    }
    let mut buf = vec![0; DATA.len()];
    c.bench_function("RecordStream read 4 KiB", |b| {
        b.iter(|| {
            record.set_position(1000).unwrap();
            record.read_fully(&mut buf).unwrap();
            black_box(buf[0])
        })
    });

    c.bench_function("ForwardRecordStream write 4 KiB", |b| {
        b.iter_batched(
            || SharedStream::new(Cursor::new(Vec::new())),
            |s| {
                let mut record =
                    ForwardRecordStream::create(s, ForwardRecordConfig::default()).unwrap();
                record.write(&DATA).unwrap();
                black_box(record.close().unwrap())
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default().warm_up_time(Duration::from_secs(1)).measurement_time(Duration::from_secs(3));
    targets = criterion_benchmark
}
criterion_main!(benches);
