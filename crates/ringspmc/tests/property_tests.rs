//! Property-based tests for the stream's externally observable invariants.
//!
//! Coverage:
//! - Round-trip: the concatenation of everything a reader receives is a
//!   prefix (at its stream offset) of everything the writer produced.
//! - Conservation: a reader never receives more words than were written.
//! - Cursor accounting: `tell(BeforeWriter)` always equals the distance
//!   between the write cursor and the reader cursor.
//! - All-or-nothing atomicity: every write lands in full or not at all.

use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use ringspmc_rs::{
    ReadError, ReaderPolicy, SeekReference, SharedBuffer, Stream, WriteError, WriterPolicy,
};
use std::time::Duration;

const DATA_WORDS: usize = 64;

fn new_stream() -> Stream {
    let size = Stream::calculate_buffer_size(DATA_WORDS, 1, 1);
    Stream::create(SharedBuffer::new(size), 1, 1).unwrap()
}

/// One scripted step: write `0` means "read instead".
#[derive(Debug, Clone)]
enum Op {
    Write(usize),
    Read(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1usize..=96).prop_map(Op::Write),
        (1usize..=96).prop_map(Op::Read),
    ]
}

proptest! {
    /// An all-or-nothing writer and a non-blocking reader never disagree
    /// about the byte sequence: the reader sees exactly the written
    /// pattern, in order, with nothing skipped or duplicated.
    #[test]
    fn prop_round_trip_is_a_prefix(ops in prop::collection::vec(op_strategy(), 1..200)) {
        let stream = new_stream();
        let mut writer = stream.create_writer(WriterPolicy::AllOrNothing, false).unwrap();
        let mut reader = stream.create_reader(ReaderPolicy::NonBlocking, false).unwrap();

        let mut produced: u64 = 0;
        let mut consumed: u64 = 0;

        for op in ops {
            match op {
                Op::Write(n) => {
                    let chunk: Vec<u8> =
                        (0..n).map(|i| ((produced + i as u64) % 251) as u8).collect();
                    match writer.write(&chunk, Duration::ZERO) {
                        Ok(written) => {
                            prop_assert_eq!(written, n as u64, "all-or-nothing wrote partially");
                            produced += written;
                        }
                        Err(WriteError::WouldBlock) => {
                            // Full (or request larger than the ring): no state change.
                            prop_assert_eq!(writer.tell(), produced);
                        }
                        Err(err) => return Err(TestCaseError::fail(format!("write: {err}"))),
                    }
                }
                Op::Read(n) => {
                    let mut buf = vec![0u8; n];
                    match reader.read(&mut buf, Duration::ZERO) {
                        Ok(read) => {
                            for i in 0..read {
                                prop_assert_eq!(
                                    buf[i as usize],
                                    ((consumed + i) % 251) as u8,
                                    "byte mismatch at stream offset {}",
                                    consumed + i
                                );
                            }
                            consumed += read;
                        }
                        Err(ReadError::WouldBlock) => {
                            prop_assert_eq!(consumed, produced, "reader starved with data buffered");
                        }
                        Err(err) => return Err(TestCaseError::fail(format!("read: {err}"))),
                    }
                }
            }

            // Conservation and cursor accounting hold after every step.
            prop_assert!(consumed <= produced);
            prop_assert!(produced - consumed <= DATA_WORDS as u64);
            prop_assert_eq!(reader.tell(SeekReference::Absolute), consumed);
            prop_assert_eq!(writer.tell(), produced);
            prop_assert_eq!(reader.tell(SeekReference::BeforeWriter), produced - consumed);
        }
    }

    /// A non-blockable writer may lap the reader, but the reader's view
    /// stays self-consistent: every byte it accepts matches the pattern at
    /// its own cursor position.
    #[test]
    fn prop_overrun_reader_stays_positionally_consistent(
        ops in prop::collection::vec(op_strategy(), 1..200)
    ) {
        let stream = new_stream();
        let mut writer = stream.create_writer(WriterPolicy::NonBlockable, false).unwrap();
        let mut reader = stream.create_reader(ReaderPolicy::NonBlocking, false).unwrap();

        let mut produced: u64 = 0;

        for op in ops {
            match op {
                Op::Write(n) => {
                    let chunk: Vec<u8> =
                        (0..n).map(|i| ((produced + i as u64) % 251) as u8).collect();
                    let written = writer.write(&chunk, Duration::ZERO).unwrap();
                    // Clamped to the ring size, never rejected.
                    prop_assert_eq!(written, (n.min(DATA_WORDS)) as u64);
                    produced += written;
                }
                Op::Read(n) => {
                    let position = reader.tell(SeekReference::Absolute);
                    let mut buf = vec![0u8; n];
                    match reader.read(&mut buf, Duration::ZERO) {
                        Ok(read) => {
                            for i in 0..read {
                                prop_assert_eq!(buf[i as usize], ((position + i) % 251) as u8);
                            }
                        }
                        Err(ReadError::WouldBlock) => {}
                        Err(ReadError::Overrun) => {
                            // Resynchronize at the writer.
                            reader.seek(0, SeekReference::BeforeWriter).unwrap();
                        }
                        Err(err) => return Err(TestCaseError::fail(format!("read: {err}"))),
                    }
                }
            }
        }
    }
}
