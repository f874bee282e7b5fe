use crate::invariants::debug_assert_cursor_advance;
use crate::layout::{lock, BufferLayout};
use crate::ReaderPolicy;
use std::ptr;
use std::sync::atomic::Ordering;
use std::sync::{Arc, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tracing::{error, warn};

/// A reference point for [`Reader::seek`], [`Reader::tell`] and
/// [`Reader::close`] offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekReference {
    /// The offset is ahead of the reader's current position:
    /// `index = reader + offset`.
    AfterReader,
    /// The offset is behind the reader's current position:
    /// `index = reader - offset`.
    BeforeReader,
    /// The offset is behind the writer's current position:
    /// `index = writer - offset`.
    BeforeWriter,
    /// The offset is absolute: `index = 0 + offset`.
    Absolute,
}

/// Error codes returned by [`Reader::read`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ReadError {
    /// The stream is closed for this reader: the writer closed and the
    /// buffered data has been drained, or the reader reached its close
    /// index.
    #[error("stream is closed for this reader")]
    Closed,
    /// The data at the reader's position has been overwritten and is
    /// invalid.  The reader must seek before it can read again.
    #[error("reader was overrun by the writer")]
    Overrun,
    /// No data is available (policy [`ReaderPolicy::NonBlocking`]).
    #[error("no data available to read")]
    WouldBlock,
    /// No data became available before the timeout elapsed
    /// (policy [`ReaderPolicy::Blocking`]).
    #[error("timed out waiting for data")]
    TimedOut,
    /// A read parameter was invalid.
    #[error("invalid read parameters")]
    Invalid,
}

/// Error codes returned by [`Reader::seek`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SeekError {
    /// The target position would be before the start of the stream.
    #[error("seek target is before the start of the stream")]
    BeforeStreamStart,
    /// The target position is past the reader's close index.
    #[error("seek target is beyond the reader's close index")]
    BeyondCloseIndex,
    /// The target position points at data which has been (or soon will
    /// be) overwritten.
    #[error("seek target has been overwritten")]
    Overwritten,
}

/// Consumes data from a stream.
///
/// Up to `max_readers` readers can be attached to a stream at once, each
/// with an independent cursor; obtain one through
/// [`Stream::create_reader`](crate::Stream::create_reader).  Like
/// [`Writer`](crate::Writer), a reader is intended to be used from a single
/// thread and coexists safely with the writer and other readers.
pub struct Reader {
    policy: ReaderPolicy,
    layout: Arc<BufferLayout>,
    id: usize,
}

// Note: Reader intentionally does NOT implement Clone.  Two handles over
// the same slot would race on the slot's cursor.

impl Reader {
    /// Claims reader slot `id`.  The caller holds `reader_enable` and has
    /// verified the slot is free or force-replaced.
    pub(crate) fn new(
        policy: ReaderPolicy,
        layout: Arc<BufferLayout>,
        id: usize,
        guard: &MutexGuard<'_, ()>,
    ) -> Self {
        let header = layout.header();
        // A new reader starts at the writer.  Starting anywhere older
        // would be a backward move of the slot's cursor, which would race
        // with the oldest-unconsumed scan; placement at older data happens
        // through an explicit seek after this (see Stream::create_reader).
        layout
            .reader_cursor(id)
            .store(header.write_start.load(Ordering::SeqCst), Ordering::SeqCst);
        // Read indefinitely until told otherwise.
        layout.reader_close_index(id).store(u64::MAX, Ordering::SeqCst);
        layout.enable_reader(id, guard);
        Self { policy, layout, id }
    }

    /// Consumes data from the stream into `buf`.
    ///
    /// `buf` is filled in whole words; it must hold at least one word.
    /// `timeout` applies only to the [`ReaderPolicy::Blocking`] policy;
    /// zero means wait forever.
    ///
    /// Returns the number of words copied.  A successful return is always
    /// at least one word.
    pub fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<u64, ReadError> {
        let word_size = self.layout.word_size();
        let requested = (buf.len() / word_size) as u64;
        if requested == 0 {
            error!(bytes = buf.len(), word_size, "read rejected: buffer below one word");
            return Err(ReadError::Invalid);
        }

        let header = self.layout.header();
        let cursor = self.layout.reader_cursor(self.id);
        let close_index = self.layout.reader_close_index(self.id).load(Ordering::SeqCst);
        if cursor.load(Ordering::SeqCst) >= close_index {
            return Err(ReadError::Closed);
        }

        // Initial overrun check.  The cursor may legitimately sit in the
        // future (after a forward seek), in which case the distance
        // saturates to zero and there is no overrun.
        let data_size = self.layout.data_size();
        if header
            .write_end
            .load(Ordering::SeqCst)
            .saturating_sub(cursor.load(Ordering::SeqCst))
            > data_size
        {
            return Err(ReadError::Overrun);
        }

        // A blocking reader holds the data-available lock across the
        // availability check, so a concurrent blocking-aware writer cannot
        // advance the cursor and notify between the check and the wait.
        let mut guard = match self.policy {
            ReaderPolicy::Blocking => Some(lock(&header.data_available_mutex)),
            ReaderPolicy::NonBlocking => None,
        };

        let mut available = self.words_before_writer();
        if available == 0 {
            if header.write_end.load(Ordering::SeqCst) > 0
                && !header.writer_enabled.load(Ordering::SeqCst)
            {
                return Err(ReadError::Closed);
            }
            let Some(held) = guard.take() else {
                return Err(ReadError::WouldBlock);
            };
            // Wait until the writer closes or produces data.
            let waiting = |_: &mut ()| {
                !(header.writer_closed.load(Ordering::SeqCst) || self.words_before_writer() > 0)
            };
            let resumed = if timeout.is_zero() {
                header
                    .data_available
                    .wait_while(held, waiting)
                    .unwrap_or_else(PoisonError::into_inner)
            } else {
                let (resumed, result) = header
                    .data_available
                    .wait_timeout_while(held, timeout, waiting)
                    .unwrap_or_else(PoisonError::into_inner);
                if result.timed_out() {
                    return Err(ReadError::TimedOut);
                }
                resumed
            };
            guard = Some(resumed);

            available = self.words_before_writer();
            // Still nothing: the writer closed in the interim.
            if available == 0 {
                return Err(ReadError::Closed);
            }
        }
        drop(guard);

        let mut nwords = requested.min(available);

        // Don't read beyond the close index.
        let pos = cursor.load(Ordering::SeqCst);
        if pos + nwords > close_index {
            nwords = close_index - pos;
        }

        // Copy in two segments split at the ring boundary.
        let before_wrap = self.layout.words_until_wrap(pos).min(nwords);
        let after_wrap = nwords - before_wrap;
        // SAFETY: both segment sources are inside the data area; the
        // destination is the caller's buffer, at least nwords * word_size
        // bytes long.  The words read were published by the writer at or
        // before our load of write_start; if the writer has lapped us
        // meanwhile, the post-copy overrun check below discards the result.
        unsafe {
            ptr::copy_nonoverlapping(
                self.layout.data_ptr(pos),
                buf.as_mut_ptr(),
                (before_wrap as usize) * word_size,
            );
            if after_wrap > 0 {
                ptr::copy_nonoverlapping(
                    self.layout.data_ptr(pos + before_wrap),
                    buf.as_mut_ptr().add((before_wrap as usize) * word_size),
                    (after_wrap as usize) * word_size,
                );
            }
        }

        debug_assert_cursor_advance!(pos, pos + nwords);
        cursor.store(pos + nwords, Ordering::SeqCst);

        // Final overrun check, before the barrier update for accuracy.
        let overrun = header
            .write_end
            .load(Ordering::SeqCst)
            .saturating_sub(pos + nwords)
            > data_size;

        self.layout.update_oldest_unconsumed();

        if overrun {
            return Err(ReadError::Overrun);
        }
        Ok(nwords)
    }

    /// Moves the reader to the specified location in the stream.
    ///
    /// The target must point at data that has not been pushed out of the
    /// buffer; seeking to future data which does not exist yet succeeds.
    /// On failure the reader's position is unchanged.
    pub fn seek(&mut self, offset: u64, reference: SeekReference) -> Result<(), SeekError> {
        let header = self.layout.header();
        let cursor = self.layout.reader_cursor(self.id);

        let absolute = match reference {
            SeekReference::AfterReader => cursor.load(Ordering::SeqCst) + offset,
            SeekReference::BeforeReader => {
                let pos = cursor.load(Ordering::SeqCst);
                if offset > pos {
                    error!(offset, cursor = pos, "seek before the start of the stream");
                    return Err(SeekError::BeforeStreamStart);
                }
                pos - offset
            }
            SeekReference::BeforeWriter => {
                let write_start = header.write_start.load(Ordering::SeqCst);
                if offset > write_start {
                    error!(offset, write_start, "seek before the start of the stream");
                    return Err(SeekError::BeforeStreamStart);
                }
                write_start - offset
            }
            SeekReference::Absolute => offset,
        };

        if absolute > self.layout.reader_close_index(self.id).load(Ordering::SeqCst) {
            error!(position = absolute, "seek beyond the close index");
            return Err(SeekError::BeyondCloseIndex);
        }

        // A backward move must not race the oldest-unconsumed scan, and
        // the overwritten-check below must be atomic with the cursor store
        // so a writer cannot start overwriting the target in between.
        let backward = absolute < cursor.load(Ordering::SeqCst);
        let guard = if backward {
            Some(lock(&header.backward_seek))
        } else {
            None
        };

        if header
            .write_end
            .load(Ordering::SeqCst)
            .saturating_sub(absolute)
            > self.layout.data_size()
        {
            error!(position = absolute, "seek to overwritten data");
            return Err(SeekError::Overwritten);
        }

        cursor.store(absolute, Ordering::SeqCst);

        match guard {
            Some(held) => self.layout.update_oldest_unconsumed_locked(&held),
            None => self.layout.update_oldest_unconsumed(),
        }
        Ok(())
    }

    /// Reports the reader's position relative to `reference`.
    ///
    /// `Absolute` returns the cursor itself and `BeforeWriter` the number
    /// of unread words in the buffer; a cursor in the future is not before
    /// the writer, so that distance is zero.  `AfterReader` and
    /// `BeforeReader` are zero by definition.
    pub fn tell(&self, reference: SeekReference) -> u64 {
        match reference {
            SeekReference::AfterReader | SeekReference::BeforeReader => 0,
            SeekReference::BeforeWriter => self.words_before_writer(),
            SeekReference::Absolute => self.layout.reader_cursor(self.id).load(Ordering::SeqCst),
        }
    }

    /// Sets the point at which this reader's stream will close.
    ///
    /// The defaults (`0, AfterReader`) close the stream immediately; to
    /// close once everything currently buffered has been read, use
    /// `close(0, SeekReference::BeforeWriter)`.
    ///
    /// This schedules the close but does *not* wake a blocking read that
    /// is already waiting; such a read returns on the next write
    /// notification or its own timeout.
    pub fn close(&mut self, offset: u64, reference: SeekReference) {
        let header = self.layout.header();
        let cursor = self.layout.reader_cursor(self.id);
        let absolute = match reference {
            SeekReference::AfterReader => cursor.load(Ordering::SeqCst) + offset,
            SeekReference::BeforeReader => cursor.load(Ordering::SeqCst),
            SeekReference::BeforeWriter => {
                let write_start = header.write_start.load(Ordering::SeqCst);
                if write_start < offset {
                    warn!(offset, write_start, "close point clamped to the stream start");
                    0
                } else {
                    write_start - offset
                }
            }
            SeekReference::Absolute => offset,
        };
        self.layout
            .reader_close_index(self.id)
            .store(absolute, Ordering::SeqCst);
    }

    /// The slot id assigned to this reader.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Word size (in bytes) of the underlying stream.
    pub fn word_size(&self) -> usize {
        self.layout.word_size()
    }

    /// Unread words between this reader's cursor and the write cursor.
    fn words_before_writer(&self) -> u64 {
        let write_start = self.layout.header().write_start.load(Ordering::SeqCst);
        let pos = self.layout.reader_cursor(self.id).load(Ordering::SeqCst);
        write_start.saturating_sub(pos)
    }
}

impl Drop for Reader {
    fn drop(&mut self) {
        // Park the cursor at the writer first: a released slot must never
        // hold a cursor in the future of the oldest-unconsumed barrier
        // when a later reader re-enables it (and a stale old cursor would
        // pin the barrier).
        let _ = self.seek(0, SeekReference::BeforeWriter);

        let header = self.layout.header();
        let guard = lock(&header.reader_enable);
        self.layout.disable_reader(self.id, &guard);
        self.layout.update_oldest_unconsumed();
    }
}
