use crate::{AttachmentReader, AttachmentWriter};
use ringspmc_rs::{ReaderPolicy, SeekReference, SharedBuffer, Stream, WriterPolicy};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::warn;

/// Default size (in bytes) of the data area of an attachment's stream when
/// the attachment allocates it itself.
pub const DEFAULT_DATA_SIZE_BYTES: usize = 0x0010_0000;

/// Word size of attachment streams.  Attachments carry opaque binary
/// payloads, so they are byte streams.
const ATTACHMENT_WORD_SIZE: usize = 1;

/// A named single-producer / single-consumer view over one stream.
///
/// An attachment carries one directive-bound binary payload (audio, TTS)
/// from exactly one producer to exactly one consumer:
/// [`create_writer`](Attachment::create_writer) and
/// [`create_reader`](Attachment::create_reader) each succeed at most once
/// over the attachment's whole lifetime, even after the first handle is
/// dropped.
pub struct Attachment {
    id: String,
    stream: Arc<Stream>,
    /// Serializes the two create calls against themselves.
    create_mutex: Mutex<()>,
    has_writer: AtomicBool,
    has_reader: AtomicBool,
}

impl Attachment {
    /// Creates an attachment owning a default-sized stream
    /// ([`DEFAULT_DATA_SIZE_BYTES`] of data).
    pub fn new(id: impl Into<String>) -> Self {
        let size = Stream::calculate_buffer_size(DEFAULT_DATA_SIZE_BYTES, ATTACHMENT_WORD_SIZE, 1);
        let stream = Stream::create(SharedBuffer::new(size), ATTACHMENT_WORD_SIZE, 1)
            .expect("default attachment stream parameters are valid");
        Self::with_stream(id, Arc::new(stream))
    }

    /// Creates an attachment over an existing stream.
    pub fn with_stream(id: impl Into<String>, stream: Arc<Stream>) -> Self {
        Self {
            id: id.into(),
            stream,
            create_mutex: Mutex::new(()),
            has_writer: AtomicBool::new(false),
            has_reader: AtomicBool::new(false),
        }
    }

    /// Creates the writer for this attachment.
    ///
    /// Succeeds at most once; returns `None` if a writer was ever created
    /// before.
    pub fn create_writer(&self, policy: WriterPolicy) -> Option<AttachmentWriter> {
        let _guard = self.create_mutex.lock().unwrap_or_else(PoisonError::into_inner);
        if self.has_writer.load(Ordering::SeqCst) {
            warn!(id = %self.id, "attachment already has a writer");
            return None;
        }
        let writer = AttachmentWriter::new(policy, &self.stream)?;
        self.has_writer.store(true, Ordering::SeqCst);
        Some(writer)
    }

    /// Creates the reader for this attachment.
    ///
    /// Succeeds at most once; returns `None` if a reader was ever created
    /// before.  The reader closes if the writer ever laps it; use
    /// [`create_reader_with_options`](Attachment::create_reader_with_options)
    /// to choose a different recovery.
    pub fn create_reader(&self, policy: ReaderPolicy) -> Option<AttachmentReader> {
        self.create_reader_with_options(policy, false)
    }

    /// [`create_reader`](Attachment::create_reader) with an explicit
    /// overrun recovery choice: with `reset_on_overrun`, a reader the
    /// writer laps skips to the write position and reports
    /// [`ReadStatus::OkOverrunReset`](crate::ReadStatus::OkOverrunReset)
    /// instead of closing.
    pub fn create_reader_with_options(
        &self,
        policy: ReaderPolicy,
        reset_on_overrun: bool,
    ) -> Option<AttachmentReader> {
        let _guard = self.create_mutex.lock().unwrap_or_else(PoisonError::into_inner);
        if self.has_reader.load(Ordering::SeqCst) {
            warn!(id = %self.id, "attachment already has a reader");
            return None;
        }
        let reader = AttachmentReader::new(
            policy,
            &self.stream,
            0,
            SeekReference::Absolute,
            reset_on_overrun,
        )?;
        self.has_reader.store(true, Ordering::SeqCst);
        Some(reader)
    }

    /// The attachment id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Whether a reader has ever been created for this attachment.
    pub fn has_reader(&self) -> bool {
        self.has_reader.load(Ordering::SeqCst)
    }

    /// Whether a writer has ever been created for this attachment.
    pub fn has_writer(&self) -> bool {
        self.has_writer.load(Ordering::SeqCst)
    }
}
