/// Specifies the policy to use for reading from the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderPolicy {
    /// A non-blocking reader returns any available data (up to the amount
    /// requested) immediately, without waiting for more data to be written
    /// to the stream.  If no data is available it returns
    /// [`ReadError::WouldBlock`](crate::ReadError::WouldBlock).
    NonBlocking,
    /// A blocking reader waits for up to the specified timeout (or forever
    /// if the timeout is zero) for data to become available.  As soon as at
    /// least one word is available it returns up to the requested amount of
    /// data.  If no data becomes available in time it returns
    /// [`ReadError::TimedOut`](crate::ReadError::TimedOut).
    Blocking,
}

/// Specifies the policy to use for writing to the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterPolicy {
    /// A non-blockable writer always writes all the data provided without
    /// waiting for readers to move out of the way.
    ///
    /// This policy notifies blocking readers about new data without holding
    /// a mutex, so a read may miss a notification and block when data is
    /// actually available.  The assumption is that a non-blockable writer
    /// writes frequently, and a subsequent write will re-notify the reader
    /// and wake it up.
    NonBlockable,
    /// An all-or-nothing writer either writes all the data provided, if it
    /// can do so without overwriting unconsumed data, or returns
    /// [`WriteError::WouldBlock`](crate::WriteError::WouldBlock) without
    /// writing anything at all.
    ///
    /// With no readers attached the stream fills up and then stops
    /// accepting all-or-nothing writes until a reader attaches and consumes
    /// some data.  There is one corner case: a reader that has seeked into
    /// the future.  Data written before the writer catches up with that
    /// reader will never be consumed, so the stream keeps accepting writes
    /// (discarding old data) until the writer reaches the index the reader
    /// is waiting for.
    AllOrNothing,
    /// A blocking writer waits for up to the specified timeout (or forever
    /// if the timeout is zero) for space to become available.  As soon as
    /// at least one word can be written it writes as many words as fit
    /// without overwriting unconsumed data and returns the count.  If no
    /// space becomes available in time it returns
    /// [`WriteError::TimedOut`](crate::WriteError::TimedOut).
    Blocking,
}
