use crate::{Attachment, AttachmentReader, AttachmentWriter};
use ringspmc_rs::{ReaderPolicy, WriterPolicy};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{error, warn};

/// How long an attachment with at most one of its two handles may live
/// before the manager releases it.
pub const ATTACHMENT_EXPIRATION_DEFAULT: Duration = Duration::from_secs(12 * 60);

/// The smallest accepted expiration.
pub const ATTACHMENT_EXPIRATION_MINIMUM: Duration = Duration::from_secs(60);

/// Joins the context id and content id of an attachment id.
const ATTACHMENT_ID_SEPARATOR: &str = ":";

/// Bookkeeping for one attachment the manager knows about.
struct AttachmentDetails {
    created: Instant,
    attachment: Attachment,
}

struct ManagerState {
    expiration: Duration,
    attachments: HashMap<String, AttachmentDetails>,
}

/// Maps attachment ids to attachments, creating them lazily and releasing
/// them once complete or expired.
///
/// Reader and writer arrive from different parts of the system at
/// different times (a directive names a payload before or after its bytes
/// start arriving), so the manager keeps each attachment until both
/// handles have been handed out.  An attachment that never completes is
/// released after the configured expiration; one that did complete is
/// released immediately, and lives on through its own handles.
///
/// The expiration sweep runs opportunistically inside
/// [`create_reader`](AttachmentManager::create_reader) and
/// [`create_writer`](AttachmentManager::create_writer).
pub struct AttachmentManager {
    state: Mutex<ManagerState>,
}

impl AttachmentManager {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ManagerState {
                expiration: ATTACHMENT_EXPIRATION_DEFAULT,
                attachments: HashMap::new(),
            }),
        }
    }

    /// Combines a context id and a content id into an attachment id.
    ///
    /// If one of the two is empty the other is returned verbatim; if both
    /// are empty the result is the empty string.
    pub fn generate_attachment_id(&self, context_id: &str, content_id: &str) -> String {
        if context_id.is_empty() && content_id.is_empty() {
            error!("both context id and content id are empty");
            return String::new();
        }
        if context_id.is_empty() {
            warn!("context id is empty, using content id alone");
            return content_id.to_string();
        }
        if content_id.is_empty() {
            warn!("content id is empty, using context id alone");
            return context_id.to_string();
        }
        format!("{context_id}{ATTACHMENT_ID_SEPARATOR}{content_id}")
    }

    /// Sets the expiration for incomplete attachments.
    ///
    /// Returns false (and keeps the current value) below
    /// [`ATTACHMENT_EXPIRATION_MINIMUM`].
    pub fn set_attachment_timeout(&self, timeout: Duration) -> bool {
        if timeout < ATTACHMENT_EXPIRATION_MINIMUM {
            error!(
                requested_secs = timeout.as_secs(),
                minimum_secs = ATTACHMENT_EXPIRATION_MINIMUM.as_secs(),
                "attachment timeout below the minimum"
            );
            return false;
        }
        self.lock_state().expiration = timeout;
        true
    }

    /// Creates the writer for the named attachment, creating the
    /// attachment first if this id has not been seen yet.
    ///
    /// Returns `None` if the attachment already has a writer.
    pub fn create_writer(&self, attachment_id: &str, policy: WriterPolicy) -> Option<AttachmentWriter> {
        let mut state = self.lock_state();
        let writer = Self::details_mut(&mut state, attachment_id)
            .attachment
            .create_writer(policy);
        Self::remove_expired(&mut state);
        writer
    }

    /// Creates the reader for the named attachment, creating the
    /// attachment first if this id has not been seen yet.
    ///
    /// Returns `None` if the attachment already has a reader.
    pub fn create_reader(&self, attachment_id: &str, policy: ReaderPolicy) -> Option<AttachmentReader> {
        let mut state = self.lock_state();
        let reader = Self::details_mut(&mut state, attachment_id)
            .attachment
            .create_reader(policy);
        Self::remove_expired(&mut state);
        reader
    }

    fn lock_state(&self) -> MutexGuard<'_, ManagerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Finds the attachment's bookkeeping, creating both on first sight of
    /// the id.
    fn details_mut<'a>(state: &'a mut ManagerState, attachment_id: &str) -> &'a mut AttachmentDetails {
        state
            .attachments
            .entry(attachment_id.to_string())
            .or_insert_with(|| AttachmentDetails {
                created: Instant::now(),
                attachment: Attachment::new(attachment_id),
            })
    }

    /// Releases attachments that are complete (both handles created) or
    /// past the expiration.
    fn remove_expired(state: &mut ManagerState) {
        let expiration = state.expiration;
        state.attachments.retain(|_, details| {
            let complete = details.attachment.has_reader() && details.attachment.has_writer();
            !complete && details.created.elapsed() <= expiration
        });
    }
}

impl Default for AttachmentManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_attachment_id() {
        let manager = AttachmentManager::new();
        assert_eq!(manager.generate_attachment_id("ctx", "content"), "ctx:content");
        assert_eq!(manager.generate_attachment_id("", "content"), "content");
        assert_eq!(manager.generate_attachment_id("ctx", ""), "ctx");
        assert_eq!(manager.generate_attachment_id("", ""), "");
    }

    #[test]
    fn test_timeout_floor() {
        let manager = AttachmentManager::new();
        assert!(!manager.set_attachment_timeout(Duration::from_secs(59)));
        assert!(manager.set_attachment_timeout(ATTACHMENT_EXPIRATION_MINIMUM));
        assert!(manager.set_attachment_timeout(Duration::from_secs(30 * 60)));
    }

    #[test]
    fn test_incomplete_attachment_survives_across_calls() {
        let manager = AttachmentManager::new();
        let writer = manager.create_writer("a:1", WriterPolicy::AllOrNothing);
        assert!(writer.is_some());
        // The same attachment is still there for the reader side.
        let reader = manager.create_reader("a:1", ReaderPolicy::NonBlocking);
        assert!(reader.is_some());
    }

    #[test]
    fn test_complete_attachment_is_released() {
        let manager = AttachmentManager::new();
        let _writer = manager.create_writer("a:1", WriterPolicy::AllOrNothing).unwrap();
        let _reader = manager.create_reader("a:1", ReaderPolicy::NonBlocking).unwrap();
        // Both handles were handed out, so the sweep released the entry.
        assert!(manager.lock_state().attachments.is_empty());
    }

    #[test]
    fn test_expired_attachment_is_released() {
        let manager = AttachmentManager::new();
        let _writer = manager.create_writer("a:1", WriterPolicy::AllOrNothing).unwrap();
        assert_eq!(manager.lock_state().attachments.len(), 1);

        // Backdate the attachment past the expiration.
        let past = Instant::now().checked_sub(ATTACHMENT_EXPIRATION_DEFAULT + Duration::from_secs(1));
        let Some(past) = past else {
            // Monotonic clock too close to boot to backdate; nothing to test.
            return;
        };
        manager
            .lock_state()
            .attachments
            .get_mut("a:1")
            .unwrap()
            .created = past;

        // Any create call sweeps.
        let _other = manager.create_writer("b:2", WriterPolicy::AllOrNothing);
        assert!(!manager.lock_state().attachments.contains_key("a:1"));
    }
}
