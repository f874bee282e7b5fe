use crate::invariants::debug_assert_write_region_ordered;
use crate::layout::{lock, BufferLayout};
use crate::WriterPolicy;
use std::ptr;
use std::sync::atomic::Ordering;
use std::sync::{Arc, MutexGuard};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Error codes returned by [`Writer::write`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WriteError {
    /// The writer has been closed.
    #[error("writer has been closed")]
    Closed,
    /// The write would overwrite unconsumed data
    /// (policy [`WriterPolicy::AllOrNothing`]).
    #[error("write would overwrite unconsumed data")]
    WouldBlock,
    /// No space became available before the timeout elapsed
    /// (policy [`WriterPolicy::Blocking`]).
    #[error("timed out waiting for space in the stream")]
    TimedOut,
    /// A write parameter was invalid.
    #[error("invalid write parameters")]
    Invalid,
}

/// Produces data for a stream.
///
/// At most one writer is enabled per stream at a time; obtain one through
/// [`Stream::create_writer`](crate::Stream::create_writer).  The handle is
/// intended to be used from a single thread: it coexists safely with
/// readers on other threads, but its own methods are `&mut self`.
pub struct Writer {
    policy: WriterPolicy,
    layout: Arc<BufferLayout>,
    /// Set once this handle has closed, so drop does not try to disable
    /// the writer slot a second time.  Guarded by `writer_enable`.
    closed: bool,
}

// Note: Writer intentionally does NOT implement Clone.  Two handles over
// the same writer slot would race on the write cursors.

impl Writer {
    /// Enables the writer slot.  The caller
    /// ([`Stream::create_writer`](crate::Stream::create_writer)) holds
    /// `writer_enable` and has verified the slot is free or force-replaced.
    pub(crate) fn new(
        policy: WriterPolicy,
        layout: Arc<BufferLayout>,
        _guard: &MutexGuard<'_, ()>,
    ) -> Self {
        let header = layout.header();
        header.writer_enabled.store(true, Ordering::SeqCst);
        header.writer_closed.store(false, Ordering::SeqCst);
        header
            .write_end
            .store(header.write_start.load(Ordering::SeqCst), Ordering::SeqCst);
        Self {
            policy,
            layout,
            closed: false,
        }
    }

    /// Adds new data to the stream by copying it from `buf`.
    ///
    /// `buf` is consumed in whole words; trailing bytes beyond the last
    /// whole word are ignored.  `timeout` applies only to the
    /// [`WriterPolicy::Blocking`] policy; zero means wait forever.
    ///
    /// Returns the number of words written.  A successful return is always
    /// at least one word.
    pub fn write(&mut self, buf: &[u8], timeout: Duration) -> Result<u64, WriteError> {
        let word_size = self.layout.word_size();
        let requested = (buf.len() / word_size) as u64;
        if requested == 0 {
            warn!(bytes = buf.len(), word_size, "write rejected: less than one word");
            return Err(WriteError::Invalid);
        }

        let header = self.layout.header();
        if !header.writer_enabled.load(Ordering::SeqCst) {
            warn!("write rejected: writer disabled");
            return Err(WriteError::Closed);
        }

        // Never try to write more than fits in the circular buffer.
        let data_size = self.layout.data_size();
        let mut nwords = requested;
        if nwords > data_size {
            match self.policy {
                WriterPolicy::NonBlockable | WriterPolicy::Blocking => nwords = data_size,
                WriterPolicy::AllOrNothing => return Err(WriteError::WouldBlock),
            }
        }

        let write_start = header.write_start.load(Ordering::SeqCst);
        let mut write_end = write_start + nwords;

        match self.policy {
            WriterPolicy::NonBlockable => {
                header.write_end.store(write_end, Ordering::SeqCst);
            }
            WriterPolicy::AllOrNothing => {
                // The barrier check must happen while holding the
                // backward-seek lock, so no reader can seek backward into
                // the provisional write region between the check and the
                // write_end update.
                let guard = lock(&header.backward_seek);
                let oldest = header.oldest_unconsumed.load(Ordering::SeqCst);
                if write_end.saturating_sub(oldest) > data_size {
                    debug!(write_end, oldest, data_size, "all-or-nothing write would overrun");
                    return Err(WriteError::WouldBlock);
                }
                header.write_end.store(write_end, Ordering::SeqCst);
                drop(guard);
            }
            WriterPolicy::Blocking => {
                // Same lock, for the same reason; the space condition is
                // guarded by it as well.
                let mut guard = lock(&header.backward_seek);
                let space_left = || {
                    let oldest = header.oldest_unconsumed.load(Ordering::SeqCst);
                    data_size.saturating_sub(write_start.saturating_sub(oldest))
                };
                if space_left() == 0 {
                    if timeout.is_zero() {
                        guard = header
                            .space_available
                            .wait_while(guard, |_| space_left() == 0)
                            .unwrap_or_else(std::sync::PoisonError::into_inner);
                    } else {
                        let (resumed, result) = header
                            .space_available
                            .wait_timeout_while(guard, timeout, |_| space_left() == 0)
                            .unwrap_or_else(std::sync::PoisonError::into_inner);
                        guard = resumed;
                        if result.timed_out() {
                            return Err(WriteError::TimedOut);
                        }
                    }
                }
                // At least one word fits now; write as much as does.
                nwords = nwords.min(space_left());
                write_end = write_start + nwords;
                header.write_end.store(write_end, Ordering::SeqCst);
                drop(guard);
            }
        }
        debug_assert_write_region_ordered!(write_start, write_end);

        // Copy outside any lock, split in two segments at the ring
        // boundary.
        let before_wrap = self.layout.words_until_wrap(write_start).min(nwords);
        let after_wrap = nwords - before_wrap;
        // SAFETY: the region [write_start, write_end) was published through
        // write_end above, so readers treat it as in-flight; both segment
        // destinations are inside the data area and the source is the
        // caller's buffer, at least nwords * word_size bytes long.
        unsafe {
            ptr::copy_nonoverlapping(
                buf.as_ptr(),
                self.layout.data_ptr(write_start),
                (before_wrap as usize) * word_size,
            );
            if after_wrap > 0 {
                ptr::copy_nonoverlapping(
                    buf.as_ptr().add((before_wrap as usize) * word_size),
                    self.layout.data_ptr(write_start + before_wrap),
                    (after_wrap as usize) * word_size,
                );
            }
        }

        // Advance the write cursor.  Blocking-aware policies move it under
        // the data-available lock so a blocking reader cannot check the
        // cursor and then miss the notification below.  A non-blockable
        // writer skips the lock: it writes continuously, so the next write
        // re-delivers any missed wakeup.
        match self.policy {
            WriterPolicy::NonBlockable => {
                header.write_start.store(write_end, Ordering::SeqCst);
            }
            WriterPolicy::AllOrNothing | WriterPolicy::Blocking => {
                let _data_guard = lock(&header.data_available_mutex);
                header.write_start.store(write_end, Ordering::SeqCst);
            }
        }
        header.data_available.notify_all();

        Ok(nwords)
    }

    /// The writer's position in the stream: the next word it will write.
    pub fn tell(&self) -> u64 {
        self.layout.header().write_start.load(Ordering::SeqCst)
    }

    /// Closes the writer.  Readers return
    /// [`ReadError::Closed`](crate::ReadError::Closed) once they consume
    /// what is left in the buffer, and subsequent writes fail.  Idempotent.
    pub fn close(&mut self) {
        let header = self.layout.header();
        let _guard = lock(&header.writer_enable);
        if self.closed {
            return;
        }
        if header.writer_enabled.load(Ordering::SeqCst) {
            header.writer_enabled.store(false, Ordering::SeqCst);
            {
                let _data_guard = lock(&header.data_available_mutex);
                header.writer_closed.store(true, Ordering::SeqCst);
            }
            // Wake blocking readers so they can observe the close.
            header.data_available.notify_all();
        }
        self.closed = true;
    }

    /// Word size (in bytes) of the underlying stream.
    pub fn word_size(&self) -> usize {
        self.layout.word_size()
    }
}

impl Drop for Writer {
    fn drop(&mut self) {
        self.close();
    }
}
