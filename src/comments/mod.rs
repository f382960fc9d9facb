use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::OffsetDateTime;

use crate::storage::KvStore;

const KEY_PREFIX: &str = "comments_post_";

/// A reader comment. Created on submission, never edited afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// Creation time in milliseconds since the epoch.
    pub id: i64,
    pub name: String,
    pub message: String,
    pub date: String,
}

impl Comment {
    pub fn new(name: impl Into<String>, message: impl Into<String>, at: OffsetDateTime) -> Self {
        Self {
            id: (at.unix_timestamp_nanos() / 1_000_000) as i64,
            name: name.into(),
            message: message.into(),
            date: display_date(at),
        }
    }
}

/// Current time in the local offset, or UTC where the offset cannot be
/// determined soundly.
pub fn local_now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

/// Month/day/year without padding, e.g. `3/7/2024`.
pub fn display_date(at: OffsetDateTime) -> String {
    at.format(format_description!(
        "[month padding:none]/[day padding:none]/[year]"
    ))
    .unwrap_or_else(|_| at.date().to_string())
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Please fill in both name and message fields.")]
pub struct IncompleteDraft;

/// Form input before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentDraft {
    pub name: String,
    pub message: String,
}

impl CommentDraft {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Trims both fields; either one empty rejects the draft.
    pub fn validate(&self) -> Result<CommentDraft, IncompleteDraft> {
        let name = self.name.trim();
        let message = self.message.trim();
        if name.is_empty() || message.is_empty() {
            return Err(IncompleteDraft);
        }
        Ok(CommentDraft::new(name, message))
    }

    pub fn into_comment(self, at: OffsetDateTime) -> Comment {
        Comment::new(self.name, self.message, at)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persisted {
    Stored,
    /// The write failed; the comment only lives in the current session.
    NotRetained,
}

pub fn storage_key(post_id: u32) -> String {
    format!("{KEY_PREFIX}{post_id}")
}

#[derive(Clone)]
pub struct CommentStore {
    kv: Arc<dyn KvStore>,
}

impl CommentStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// A history that cannot be read is never overwritten.
    pub fn append(&self, post_id: u32, comment: &Comment) -> Persisted {
        let key = storage_key(post_id);
        let mut comments = match self.kv.get(&key) {
            Ok(raw) => decode(post_id, raw.as_deref()),
            Err(err) => {
                tracing::warn!(%err, post_id, "comment history unreadable, not appending");
                return Persisted::NotRetained;
            }
        };
        comments.push(comment.clone());
        let encoded = match serde_json::to_string(&comments) {
            Ok(encoded) => encoded,
            Err(err) => {
                tracing::warn!(?err, post_id, "failed to encode comment history");
                return Persisted::NotRetained;
            }
        };
        match self.kv.set(&key, &encoded) {
            Ok(()) => {
                tracing::debug!(post_id, total = comments.len(), "comment stored");
                Persisted::Stored
            }
            Err(err) => {
                tracing::warn!(%err, post_id, "comment not retained");
                Persisted::NotRetained
            }
        }
    }

    pub fn load_all(&self, post_id: u32) -> Vec<Comment> {
        match self.kv.get(&storage_key(post_id)) {
            Ok(raw) => decode(post_id, raw.as_deref()),
            Err(err) => {
                tracing::warn!(%err, post_id, "comment history unavailable");
                Vec::new()
            }
        }
    }

    pub fn count(&self, post_id: u32) -> usize {
        self.load_all(post_id).len()
    }
}

fn decode(post_id: u32, raw: Option<&str>) -> Vec<Comment> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    match serde_json::from_str::<Option<Vec<Comment>>>(raw) {
        Ok(comments) => comments.unwrap_or_default(),
        Err(err) => {
            tracing::warn!(?err, post_id, "discarding malformed comment history");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, StorageError};
    use assert_matches::assert_matches;
    use std::sync::atomic::{AtomicBool, Ordering};
    use time::macros::datetime;

    struct Unavailable;

    impl KvStore for Unavailable {
        fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Unavailable("disabled".into()))
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("disabled".into()))
        }
    }

    /// Fails the next read once when armed.
    #[derive(Default)]
    struct FlakyReads {
        inner: MemoryStore,
        fail_next_get: AtomicBool,
    }

    impl KvStore for FlakyReads {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            if self.fail_next_get.swap(false, Ordering::SeqCst) {
                return Err(StorageError::Unavailable("database is locked".into()));
            }
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            self.inner.set(key, value)
        }
    }

    fn comment(name: &str, message: &str) -> Comment {
        Comment::new(name, message, datetime!(2024-03-07 12:00 UTC))
    }

    #[test]
    fn comment_fields_follow_creation_time() {
        let c = comment("Ana", "Great post!");
        assert_eq!(c.id, 1_709_812_800_000);
        assert_eq!(c.date, "3/7/2024");
    }

    #[test]
    fn append_then_load_preserves_order_across_reload() {
        let kv = MemoryStore::new();
        let store = CommentStore::new(Arc::new(kv.clone()));
        let first = comment("Ana", "first");
        let second = comment("Ben", "second");
        assert_eq!(store.append(2, &first), Persisted::Stored);
        assert_eq!(store.append(2, &second), Persisted::Stored);

        let reloaded = CommentStore::new(Arc::new(kv));
        assert_eq!(reloaded.load_all(2), vec![first, second]);
        assert_eq!(reloaded.count(2), 2);
        assert!(reloaded.load_all(1).is_empty());
    }

    #[test]
    fn persisted_layout_is_a_json_array_per_post() {
        let kv = MemoryStore::new();
        let store = CommentStore::new(Arc::new(kv.clone()));
        store.append(3, &comment("Ana", "hi"));
        let raw = kv.raw("comments_post_3").expect("entry written");
        let value: serde_json::Value = serde_json::from_str(&raw).expect("valid json");
        let entry = &value.as_array().expect("array")[0];
        for field in ["id", "name", "message", "date"] {
            assert!(entry.get(field).is_some(), "missing {field}");
        }
    }

    #[test]
    fn malformed_history_reads_as_empty() -> anyhow::Result<()> {
        let kv = MemoryStore::new();
        let store = CommentStore::new(Arc::new(kv.clone()));
        for garbage in ["not json", "{\"id\":1}", "[{\"name\":1}]", "null", ""] {
            kv.set(&storage_key(1), garbage)?;
            assert!(store.load_all(1).is_empty(), "{garbage:?} should read as empty");
            assert_eq!(store.count(1), 0);
        }
        Ok(())
    }

    #[test]
    fn append_over_corrupt_history_starts_fresh() -> anyhow::Result<()> {
        let kv = MemoryStore::new();
        kv.set(&storage_key(1), "[[[")?;
        let store = CommentStore::new(Arc::new(kv));
        store.append(1, &comment("Ana", "hello"));
        assert_eq!(store.count(1), 1);
        Ok(())
    }

    #[test]
    fn unavailable_storage_is_swallowed() {
        let store = CommentStore::new(Arc::new(Unavailable));
        assert_eq!(store.append(1, &comment("Ana", "hi")), Persisted::NotRetained);
        assert!(store.load_all(1).is_empty());
    }

    #[test]
    fn quota_exceeded_is_not_retained() {
        let store = CommentStore::new(Arc::new(MemoryStore::with_quota(16)));
        assert_eq!(
            store.append(1, &comment("Ana", "a message that will not fit")),
            Persisted::NotRetained
        );
        assert_eq!(store.count(1), 0);
    }

    #[test]
    fn identical_submissions_are_both_kept() {
        let store = CommentStore::new(Arc::new(MemoryStore::new()));
        let c = comment("Ana", "dup");
        store.append(1, &c);
        store.append(1, &c);
        assert_eq!(store.count(1), 2);
    }

    #[test]
    fn draft_validation_trims_and_rejects_blank_fields() {
        assert_matches!(CommentDraft::new("  ", "msg").validate(), Err(IncompleteDraft));
        assert_matches!(CommentDraft::new("Ana", "\n\t").validate(), Err(IncompleteDraft));
        let draft = CommentDraft::new("  Ana ", " Great post! ").validate();
        assert_eq!(draft, Ok(CommentDraft::new("Ana", "Great post!")));
    }

    #[test]
    fn failed_read_never_overwrites_history() {
        let kv = Arc::new(FlakyReads::default());
        let store = CommentStore::new(kv.clone());
        store.append(4, &comment("Ana", "a"));
        store.append(4, &comment("Ben", "b"));

        kv.fail_next_get.store(true, Ordering::SeqCst);
        assert_eq!(store.append(4, &comment("Cy", "c")), Persisted::NotRetained);

        let messages: Vec<_> = store.load_all(4).into_iter().map(|c| c.message).collect();
        assert_eq!(messages, vec!["a", "b"]);
        assert_eq!(store.append(4, &comment("Cy", "c")), Persisted::Stored);
        assert_eq!(store.count(4), 3);
    }

    #[test]
    fn date_follows_the_offset_it_was_taken_in() {
        let evening = datetime!(2024-03-07 22:30 -5);
        assert_eq!(display_date(evening), "3/7/2024");
        assert_eq!(display_date(evening.to_offset(time::UtcOffset::UTC)), "3/8/2024");
    }

    #[test]
    fn local_now_is_the_current_instant() {
        let drift = (local_now() - OffsetDateTime::now_utc()).whole_seconds().abs();
        assert!(drift < 5);
    }

    #[test]
    fn storage_key_layout() {
        assert_eq!(storage_key(12), "comments_post_12");
    }
}
