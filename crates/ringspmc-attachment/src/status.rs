use std::fmt;

/// The possible outcomes of an [`AttachmentReader::read`] call.
///
/// [`AttachmentReader::read`]: crate::AttachmentReader::read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    /// Things are ok.
    Ok,
    /// On a request for n bytes, fewer than n bytes were available on a
    /// non-blocking read.
    OkWouldBlock,
    /// On a request for n bytes, fewer than n bytes were available on a
    /// blocking read.
    OkTimedOut,
    /// The writer has overwritten the data at the reader's position.  The
    /// reader position was reset to the current writer position.
    OkOverrunReset,
    /// The underlying stream is no longer readable.
    Closed,
    /// The writer has overwritten the reader's data.  The attachment is no
    /// longer valid.
    ErrorOverrun,
    /// The request was smaller than the word size of the underlying
    /// stream.
    ErrorBytesLessThanWordSize,
    /// A non-specified error occurred.
    ErrorInternal,
}

impl fmt::Display for ReadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ok => "OK",
            Self::OkWouldBlock => "OK_WOULDBLOCK",
            Self::OkTimedOut => "OK_TIMEDOUT",
            Self::OkOverrunReset => "OK_OVERRUN_RESET",
            Self::Closed => "CLOSED",
            Self::ErrorOverrun => "ERROR_OVERRUN",
            Self::ErrorBytesLessThanWordSize => "ERROR_BYTES_LESS_THAN_WORD_SIZE",
            Self::ErrorInternal => "ERROR_INTERNAL",
        })
    }
}

/// The possible outcomes of an [`AttachmentWriter::write`] call.
///
/// [`AttachmentWriter::write`]: crate::AttachmentWriter::write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStatus {
    /// Things are ok.
    Ok,
    /// The underlying stream is no longer writeable.
    Closed,
    /// The write could not succeed because the underlying buffer is full.
    OkBufferFull,
    /// The request was smaller than the word size of the underlying
    /// stream.
    ErrorBytesLessThanWordSize,
    /// A non-specified error occurred.
    ErrorInternal,
    /// The write timed out.  Only possible for a blocking writer.
    TimedOut,
}

impl fmt::Display for WriteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ok => "OK",
            Self::Closed => "CLOSED",
            Self::OkBufferFull => "OK_BUFFER_FULL",
            Self::ErrorBytesLessThanWordSize => "ERROR_BYTES_LESS_THAN_WORD_SIZE",
            Self::ErrorInternal => "ERROR_INTERNAL",
            Self::TimedOut => "TIMEDOUT",
        })
    }
}

/// When an [`AttachmentReader`] should stop returning data after a
/// [`close`] call.
///
/// [`AttachmentReader`]: crate::AttachmentReader
/// [`close`]: crate::AttachmentReader::close
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClosePoint {
    /// Stop returning data immediately.
    Immediately,
    /// Stop returning data once everything buffered at the time of the
    /// close call has been read.
    AfterDrainingCurrentBuffer,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display_vocabulary() {
        assert_eq!(ReadStatus::Ok.to_string(), "OK");
        assert_eq!(ReadStatus::OkOverrunReset.to_string(), "OK_OVERRUN_RESET");
        assert_eq!(
            ReadStatus::ErrorBytesLessThanWordSize.to_string(),
            "ERROR_BYTES_LESS_THAN_WORD_SIZE"
        );
        assert_eq!(WriteStatus::OkBufferFull.to_string(), "OK_BUFFER_FULL");
        assert_eq!(WriteStatus::TimedOut.to_string(), "TIMEDOUT");
    }
}
