use crate::{ClosePoint, ReadStatus};
use ringspmc_rs::{ReadError, Reader, ReaderPolicy, SeekReference, Stream};
use std::time::Duration;
use tracing::{debug, error};

/// Reads directive-bound binary data from an attachment.
///
/// Thin adapter over a stream [`Reader`]: byte-oriented, and reports
/// outcomes through the [`ReadStatus`] vocabulary instead of typed errors.
/// Obtain one through [`Attachment::create_reader`] or
/// [`AttachmentManager::create_reader`].
///
/// [`Attachment::create_reader`]: crate::Attachment::create_reader
/// [`AttachmentManager::create_reader`]: crate::AttachmentManager::create_reader
pub struct AttachmentReader {
    reader: Reader,
    /// On overrun, whether to reset to the current write position (and
    /// skip everything in between) instead of closing the attachment.
    reset_on_overrun: bool,
}

impl AttachmentReader {
    /// Creates a reader over `stream`, positioned at `offset` relative to
    /// `reference`.
    ///
    /// Returns `None` if no reader slot is free or the requested position
    /// is gone from the buffer.
    pub fn new(
        policy: ReaderPolicy,
        stream: &Stream,
        offset: u64,
        reference: SeekReference,
        reset_on_overrun: bool,
    ) -> Option<Self> {
        let mut reader = match stream.create_reader(policy, false) {
            Ok(reader) => reader,
            Err(err) => {
                error!(%err, "could not create a stream reader");
                return None;
            }
        };
        if let Err(err) = reader.seek(offset, reference) {
            error!(%err, offset, "could not position the attachment reader");
            return None;
        }
        Some(Self {
            reader,
            reset_on_overrun,
        })
    }

    /// Reads up to `buf.len()` bytes, in whole words.
    ///
    /// Returns the number of bytes copied and the outcome.  `timeout`
    /// applies only to blocking readers; zero means wait forever.
    pub fn read(&mut self, buf: &mut [u8], timeout: Duration) -> (usize, ReadStatus) {
        if buf.is_empty() {
            return (0, ReadStatus::Ok);
        }
        let word_size = self.reader.word_size();
        if buf.len() < word_size {
            error!(bytes = buf.len(), word_size, "request below the stream word size");
            return (0, ReadStatus::ErrorBytesLessThanWordSize);
        }

        match self.reader.read(buf, timeout) {
            Ok(words) => ((words as usize) * word_size, ReadStatus::Ok),
            Err(ReadError::WouldBlock) => (0, ReadStatus::OkWouldBlock),
            Err(ReadError::TimedOut) => (0, ReadStatus::OkTimedOut),
            Err(ReadError::Closed) => (0, ReadStatus::Closed),
            Err(ReadError::Overrun) => {
                if self.reset_on_overrun {
                    // Skip to the write position; subsequent reads deliver
                    // data from there onward.
                    debug!("reader overrun by writer, resetting to write position");
                    let _ = self.reader.seek(0, SeekReference::BeforeWriter);
                    (0, ReadStatus::OkOverrunReset)
                } else {
                    // The attachment cannot recover from this.
                    error!("reader overrun by writer, closing attachment");
                    self.close(ClosePoint::Immediately);
                    (0, ReadStatus::ErrorOverrun)
                }
            }
            Err(err) => {
                error!(%err, "unhandled stream read error");
                (0, ReadStatus::ErrorInternal)
            }
        }
    }

    /// Moves the reader to an absolute word offset in the attachment.
    ///
    /// Returns true if the position points at unexpired data.  Seeking to
    /// a future index that has not been written yet is valid.
    pub fn seek(&mut self, offset: u64) -> bool {
        self.reader.seek(offset, SeekReference::Absolute).is_ok()
    }

    /// Number of words buffered ahead of this reader.
    pub fn unread_words(&self) -> u64 {
        self.reader.tell(SeekReference::BeforeWriter)
    }

    /// Schedules the end of this reader's stream.
    pub fn close(&mut self, close_point: ClosePoint) {
        match close_point {
            ClosePoint::Immediately => self.reader.close(0, SeekReference::AfterReader),
            ClosePoint::AfterDrainingCurrentBuffer => {
                self.reader.close(0, SeekReference::BeforeWriter);
            }
        }
    }
}
