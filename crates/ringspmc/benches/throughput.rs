use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use ringspmc_rs::{ReadError, ReaderPolicy, SeekReference, SharedBuffer, Stream, WriterPolicy};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const TOTAL_BYTES: u64 = 16 * 1024 * 1024; // 16 MiB per iteration
const CHUNK: usize = 4096;
const RING_WORDS: usize = 64 * 1024;

fn bench_single_reader(c: &mut Criterion) {
    let mut group = c.benchmark_group("stream");
    group.throughput(Throughput::Bytes(TOTAL_BYTES));

    group.bench_function("writer_to_single_reader", |b| {
        b.iter(|| {
            let size = Stream::calculate_buffer_size(RING_WORDS, 1, 1);
            let stream = Arc::new(Stream::create(SharedBuffer::new(size), 1, 1).unwrap());
            let mut writer = stream.create_writer(WriterPolicy::AllOrNothing, false).unwrap();
            let mut reader = stream.create_reader(ReaderPolicy::NonBlocking, false).unwrap();

            let producer = thread::spawn(move || {
                let chunk = [0x5au8; CHUNK];
                let mut sent = 0u64;
                while sent < TOTAL_BYTES {
                    match writer.write(&chunk, Duration::ZERO) {
                        Ok(n) => sent += n,
                        Err(_) => std::hint::spin_loop(),
                    }
                }
                writer.close();
            });

            let mut buf = [0u8; CHUNK];
            let mut received = 0u64;
            loop {
                match reader.read(&mut buf, Duration::ZERO) {
                    Ok(n) => {
                        black_box(&buf[..n as usize]);
                        received += n;
                    }
                    Err(ReadError::WouldBlock) => std::hint::spin_loop(),
                    Err(ReadError::Closed) => break,
                    Err(err) => panic!("unexpected read result: {err}"),
                }
            }
            assert_eq!(received, TOTAL_BYTES);

            producer.join().unwrap();
        });
    });

    group.finish();
}

fn bench_overwriting_writer(c: &mut Criterion) {
    let mut group = c.benchmark_group("stream");
    group.throughput(Throughput::Bytes(TOTAL_BYTES));

    // A non-blockable writer never waits; the reader resynchronizes after
    // each overrun, as a live media consumer would.
    group.bench_function("nonblockable_writer_lossy_reader", |b| {
        b.iter(|| {
            let size = Stream::calculate_buffer_size(RING_WORDS, 1, 1);
            let stream = Arc::new(Stream::create(SharedBuffer::new(size), 1, 1).unwrap());
            let mut writer = stream.create_writer(WriterPolicy::NonBlockable, false).unwrap();
            let mut reader = stream.create_reader(ReaderPolicy::NonBlocking, true).unwrap();

            let producer = thread::spawn(move || {
                let chunk = [0xa5u8; CHUNK];
                let mut sent = 0u64;
                while sent < TOTAL_BYTES {
                    sent += writer.write(&chunk, Duration::ZERO).unwrap();
                }
                writer.close();
            });

            let mut buf = [0u8; CHUNK];
            loop {
                match reader.read(&mut buf, Duration::ZERO) {
                    Ok(n) => {
                        black_box(&buf[..n as usize]);
                    }
                    Err(ReadError::WouldBlock) => std::hint::spin_loop(),
                    Err(ReadError::Overrun) => {
                        reader.seek(0, SeekReference::BeforeWriter).unwrap();
                    }
                    Err(ReadError::Closed) => break,
                    Err(err) => panic!("unexpected read result: {err}"),
                }
            }

            producer.join().unwrap();
        });
    });

    group.finish();
}

criterion_group!(benches, bench_single_reader, bench_overwriting_writer);
criterion_main!(benches);
