//! Attachment layer for ringspmc-rs
//!
//! An *attachment* is a named single-producer / single-consumer view over
//! one [`ringspmc_rs::Stream`], used to carry a directive-bound binary
//! payload (audio, TTS) between decoupled parts of a system.  The producer
//! and consumer arrive independently: an [`AttachmentManager`] maps ids to
//! attachments, creating each lazily on first sight and releasing it once
//! both sides have their handle (or it expires unclaimed).
//!
//! Reader and writer are byte-oriented adapters over the stream handles,
//! reporting outcomes through small status vocabularies
//! ([`ReadStatus`], [`WriteStatus`]) instead of typed errors, so callers
//! can treat "no data yet" and "buffer full" as ordinary flow control.
//!
//! # Example
//!
//! ```
//! use ringspmc_attachment::{AttachmentManager, ReadStatus};
//! use ringspmc_rs::{ReaderPolicy, WriterPolicy};
//! use std::time::Duration;
//!
//! let manager = AttachmentManager::new();
//! let id = manager.generate_attachment_id("dialog-42", "audio-7");
//!
//! let mut writer = manager.create_writer(&id, WriterPolicy::AllOrNothing).unwrap();
//! let mut reader = manager.create_reader(&id, ReaderPolicy::NonBlocking).unwrap();
//!
//! writer.write(b"payload bytes", Duration::ZERO);
//!
//! let mut buf = [0u8; 13];
//! let (bytes, status) = reader.read(&mut buf, Duration::ZERO);
//! assert_eq!((bytes, status), (13, ReadStatus::Ok));
//! assert_eq!(&buf, b"payload bytes");
//! ```

mod attachment;
mod manager;
mod reader;
mod status;
mod writer;

pub use attachment::{Attachment, DEFAULT_DATA_SIZE_BYTES};
pub use manager::{
    AttachmentManager, ATTACHMENT_EXPIRATION_DEFAULT, ATTACHMENT_EXPIRATION_MINIMUM,
};
pub use reader::AttachmentReader;
pub use status::{ClosePoint, ReadStatus, WriteStatus};
pub use writer::AttachmentWriter;
