use crate::layout::{self, lock, BufferLayout};
use crate::{Reader, ReaderPolicy, SeekReference, SharedBuffer, Writer, WriterPolicy};
use std::sync::atomic::Ordering;
use std::sync::{Arc, MutexGuard};
use thiserror::Error;
use tracing::error;

/// Error types for stream construction and handle allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StreamError {
    /// The word size is zero or does not fit the header field.
    #[error("word size {word_size} is outside the supported range")]
    InvalidWordSize {
        /// The rejected word size.
        word_size: usize,
    },
    /// The reader count does not fit the header field.
    #[error("max readers {max_readers} exceeds the supported limit {limit}")]
    TooManyReaders {
        /// The rejected reader count.
        max_readers: usize,
        /// The largest supported reader count.
        limit: usize,
    },
    /// The buffer cannot hold the header, arrays, and at least one word.
    #[error("buffer of {size} bytes is smaller than the required {required} bytes")]
    BufferTooSmall {
        /// The provided buffer size.
        size: usize,
        /// The minimum buffer size for these parameters.
        required: usize,
    },
    /// The buffer does not contain a compatible stream header
    /// (bad magic number, version, or traits hash).
    #[error("buffer does not contain a compatible stream header")]
    IncompatibleHeader,
    /// The region has no live handles left; it cannot be shared anymore.
    #[error("no live stream handles are attached to the buffer")]
    NotAttached,
    /// The region's handle count is exhausted.
    #[error("too many stream handles are attached to the buffer")]
    TooManyHandles,
    /// A writer is already attached to the stream.
    #[error("a writer is already attached to the stream")]
    WriterExists,
    /// Every reader slot is in use.
    #[error("all {max_readers} reader slots are in use")]
    NoFreeReaderSlot {
        /// The stream's reader slot count.
        max_readers: usize,
    },
    /// The requested reader slot is in use.
    #[error("reader slot {id} is already in use")]
    ReaderSlotInUse {
        /// The requested slot.
        id: usize,
    },
    /// The requested reader slot does not exist.
    #[error("reader id {id} is outside the valid range [0, {max_readers})")]
    InvalidReaderId {
        /// The requested slot.
        id: usize,
        /// The stream's reader slot count.
        max_readers: usize,
    },
    /// A new reader could not be positioned at the oldest buffered data.
    #[error("could not position a new reader at the oldest buffered data")]
    ReaderSeekFailed,
}

/// A shared data stream: one writer, up to `max_readers` concurrent
/// readers, over a circular buffer of fixed-size words.
///
/// The stream's entire state lives in a [`SharedBuffer`]; additional
/// handles to the same stream are created with [`Stream::open`].  Handles,
/// readers, and writers may all live on different threads.
pub struct Stream {
    layout: Arc<BufferLayout>,
}

impl Stream {
    /// Calculates the buffer size needed to hold a stream with the given
    /// parameters: `nwords` words of `word_size` bytes, readable by up to
    /// `max_readers` concurrent readers.
    ///
    /// Returns zero if `nwords` or `word_size` is zero.
    pub fn calculate_buffer_size(nwords: usize, word_size: usize, max_readers: usize) -> usize {
        if nwords == 0 {
            error!("cannot size a stream for zero words");
            return 0;
        }
        if word_size == 0 {
            error!("cannot size a stream for a zero word size");
            return 0;
        }
        layout::data_offset(word_size, max_readers) + nwords * word_size
    }

    /// Creates a new stream inside `buffer`, overwriting its contents.
    ///
    /// The buffer must hold at least
    /// `calculate_buffer_size(1, word_size, max_readers)` bytes; any space
    /// beyond the fixed overhead becomes circular data capacity.
    pub fn create(
        buffer: SharedBuffer,
        word_size: usize,
        max_readers: usize,
    ) -> Result<Self, StreamError> {
        let required = Self::calculate_buffer_size(1, word_size, max_readers);
        if required == 0 {
            return Err(StreamError::InvalidWordSize { word_size });
        }
        if buffer.len() < required {
            error!(size = buffer.len(), required, "buffer too small for stream");
            return Err(StreamError::BufferTooSmall {
                size: buffer.len(),
                required,
            });
        }
        let layout = BufferLayout::init(Arc::new(buffer), word_size, max_readers)?;
        Ok(Self {
            layout: Arc::new(layout),
        })
    }

    /// Opens another handle to the stream already initialized inside
    /// `buffer` by [`Stream::create`].
    pub fn open(buffer: Arc<SharedBuffer>) -> Result<Self, StreamError> {
        let layout = BufferLayout::attach(buffer)?;
        Ok(Self {
            layout: Arc::new(layout),
        })
    }

    /// The buffer backing this stream, for sharing with [`Stream::open`].
    pub fn buffer(&self) -> Arc<SharedBuffer> {
        Arc::clone(self.layout.buffer())
    }

    /// The maximum number of concurrent readers.
    pub fn max_readers(&self) -> usize {
        self.layout.max_readers()
    }

    /// The number of words the circular data area holds.
    pub fn data_size(&self) -> u64 {
        self.layout.data_size()
    }

    /// The word size (in bytes).
    pub fn word_size(&self) -> usize {
        self.layout.word_size()
    }

    /// Creates a writer for the stream.  Only one writer is allowed at a
    /// time.
    ///
    /// `force_replacement` claims the writer slot even if it appears to be
    /// in use.  This recovers a slot whose owner was not cleanly destroyed,
    /// but it does not stop a still-live previous writer from writing;
    /// callers must guarantee the previous writer is truly gone.
    pub fn create_writer(
        &self,
        policy: WriterPolicy,
        force_replacement: bool,
    ) -> Result<Writer, StreamError> {
        let header = self.layout.header();
        let guard = lock(&header.writer_enable);
        if header.writer_enabled.load(Ordering::SeqCst) && !force_replacement {
            error!("writer already attached to stream");
            return Err(StreamError::WriterExists);
        }
        Ok(Writer::new(policy, Arc::clone(&self.layout), &guard))
    }

    /// Creates a reader on the first free slot.
    ///
    /// With `start_with_new_data` the reader starts at the write cursor and
    /// sees only data written after this call; otherwise it starts at the
    /// oldest data still in the buffer.
    pub fn create_reader(
        &self,
        policy: ReaderPolicy,
        start_with_new_data: bool,
    ) -> Result<Reader, StreamError> {
        let guard = lock(&self.layout.header().reader_enable);
        for id in 0..self.layout.max_readers() {
            if !self.layout.is_reader_enabled(id) {
                return self.create_reader_locked(id, policy, start_with_new_data, false, guard);
            }
        }
        error!(max_readers = self.layout.max_readers(), "no reader slots available");
        Err(StreamError::NoFreeReaderSlot {
            max_readers: self.layout.max_readers(),
        })
    }

    /// Creates a reader on a specific slot.
    ///
    /// Slot ids are dense in `[0, max_readers)`; an application that wants
    /// to manage ids itself can claim them directly here.
    /// `force_replacement` carries the same caveat as on
    /// [`Stream::create_writer`].
    pub fn create_reader_with_id(
        &self,
        id: usize,
        policy: ReaderPolicy,
        start_with_new_data: bool,
        force_replacement: bool,
    ) -> Result<Reader, StreamError> {
        if id >= self.layout.max_readers() {
            error!(id, max_readers = self.layout.max_readers(), "reader id out of range");
            return Err(StreamError::InvalidReaderId {
                id,
                max_readers: self.layout.max_readers(),
            });
        }
        let guard = lock(&self.layout.header().reader_enable);
        self.create_reader_locked(id, policy, start_with_new_data, force_replacement, guard)
    }

    /// Claims slot `id` and positions the new reader.  Consumes the
    /// `reader_enable` guard: the placement seek below must happen after
    /// the lock is released.
    fn create_reader_locked(
        &self,
        id: usize,
        policy: ReaderPolicy,
        start_with_new_data: bool,
        force_replacement: bool,
        guard: MutexGuard<'_, ()>,
    ) -> Result<Reader, StreamError> {
        if self.layout.is_reader_enabled(id) && !force_replacement {
            error!(id, "reader slot already in use");
            return Err(StreamError::ReaderSlotInUse { id });
        }

        // The reader comes up with its cursor at the writer, and the
        // oldest-unconsumed barrier is not recomputed yet: when starting
        // with old data we are about to seek backward, possibly right in
        // front of a blocked writer, and the barrier must not move until
        // that seek lands.
        let mut reader = Reader::new(policy, Arc::clone(&self.layout), id, &guard);
        drop(guard);

        if start_with_new_data {
            // The cursor stays at the writer, so recompute the barrier now.
            self.layout.update_oldest_unconsumed();
        } else {
            let header = self.layout.header();
            let offset = self
                .layout
                .data_size()
                .min(header.write_start.load(Ordering::SeqCst));
            // seek() recomputes the barrier.
            if reader.seek(offset, SeekReference::BeforeWriter).is_err() {
                error!(id, offset, "could not seek new reader to oldest data");
                return Err(StreamError::ReaderSeekFailed);
            }
        }
        Ok(reader)
    }
}
