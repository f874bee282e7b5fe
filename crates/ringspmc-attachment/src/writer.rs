use crate::WriteStatus;
use ringspmc_rs::{Stream, WriteError, Writer, WriterPolicy};
use std::time::Duration;
use tracing::error;

/// Writes directive-bound binary data into an attachment.
///
/// Thin adapter over a stream [`Writer`]: byte-oriented, and reports
/// outcomes through the [`WriteStatus`] vocabulary instead of typed
/// errors.  Obtain one through [`Attachment::create_writer`] or
/// [`AttachmentManager::create_writer`].
///
/// [`Attachment::create_writer`]: crate::Attachment::create_writer
/// [`AttachmentManager::create_writer`]: crate::AttachmentManager::create_writer
pub struct AttachmentWriter {
    writer: Writer,
}

impl AttachmentWriter {
    /// Creates the writer for `stream`.  Returns `None` if the stream
    /// already has one.
    pub fn new(policy: WriterPolicy, stream: &Stream) -> Option<Self> {
        match stream.create_writer(policy, false) {
            Ok(writer) => Some(Self { writer }),
            Err(err) => {
                error!(%err, "could not create a stream writer");
                None
            }
        }
    }

    /// Writes `buf` in whole words; trailing bytes beyond the last whole
    /// word are not written.
    ///
    /// Returns the number of bytes written and the outcome.  `timeout`
    /// applies only to blocking writers; zero means wait forever.
    pub fn write(&mut self, buf: &[u8], timeout: Duration) -> (usize, WriteStatus) {
        if buf.is_empty() {
            return (0, WriteStatus::Ok);
        }
        let word_size = self.writer.word_size();
        if buf.len() < word_size {
            error!(bytes = buf.len(), word_size, "request below the stream word size");
            return (0, WriteStatus::ErrorBytesLessThanWordSize);
        }

        match self.writer.write(buf, timeout) {
            Ok(words) => ((words as usize) * word_size, WriteStatus::Ok),
            Err(WriteError::WouldBlock) => (0, WriteStatus::OkBufferFull),
            Err(WriteError::TimedOut) => (0, WriteStatus::TimedOut),
            Err(WriteError::Closed) => (0, WriteStatus::Closed),
            Err(err) => {
                error!(%err, "unhandled stream write error");
                (0, WriteStatus::ErrorInternal)
            }
        }
    }

    /// The writer's position (in words) in the attachment.
    pub fn tell(&self) -> u64 {
        self.writer.tell()
    }

    /// Closes the writer: readers see the end of the stream once they
    /// drain what is buffered, and subsequent writes fail.
    pub fn close(&mut self) {
        self.writer.close();
    }
}
