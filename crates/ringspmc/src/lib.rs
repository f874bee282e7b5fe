//! RingSPMC - Single-Producer Multi-Consumer Shared Data Stream
//!
//! A continuous stream of fixed-size *words* (audio samples, bytes) flowing
//! from exactly one [`Writer`] to up to N concurrent [`Reader`]s over a
//! circular buffer.  The stream's entire state - header, per-reader cursor
//! arrays, and data - lives in one contiguous [`SharedBuffer`], so any
//! number of [`Stream`] handles can attach to the same region and
//! cooperate.
//!
//! # Key Features
//!
//! - Policy-driven writes (non-blockable / all-or-nothing / blocking with
//!   timeout) and reads (non-blocking / blocking with timeout)
//! - Per-reader cursors with seek, tell, and close-at-index semantics
//! - Overrun detection when a reader falls a full buffer behind the writer
//! - Back-pressure for blocking writers via an oldest-unconsumed barrier
//! - Cache-padded cursors (prefetcher false sharing elimination)
//!
//! # Example
//!
//! ```
//! use ringspmc_rs::{ReaderPolicy, SharedBuffer, Stream, WriterPolicy};
//! use std::time::Duration;
//!
//! let size = Stream::calculate_buffer_size(1024, 1, 2);
//! let stream = Stream::create(SharedBuffer::new(size), 1, 2).unwrap();
//!
//! let mut writer = stream.create_writer(WriterPolicy::AllOrNothing, false).unwrap();
//! let mut reader = stream.create_reader(ReaderPolicy::NonBlocking, false).unwrap();
//!
//! writer.write(b"hello stream", Duration::ZERO).unwrap();
//!
//! let mut buf = [0u8; 12];
//! let words = reader.read(&mut buf, Duration::ZERO).unwrap();
//! assert_eq!(words, 12);
//! assert_eq!(&buf, b"hello stream");
//! ```

mod buffer;
mod invariants;
mod layout;
mod policy;
mod reader;
mod stream;
mod writer;

pub use buffer::SharedBuffer;
pub use policy::{ReaderPolicy, WriterPolicy};
pub use reader::{ReadError, Reader, SeekError, SeekReference};
pub use stream::{Stream, StreamError};
pub use writer::{WriteError, Writer};
