//! Request-scoped memo of derived text.
//!
//! Holds exactly one value per node and stage. Entries leave only through
//! explicit invalidation; there is no expiry and no capacity bound.

use std::collections::HashMap;
use std::sync::RwLock;

use metrics::counter;

use super::keys::MemoKey;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::memo";

pub(crate) const METRIC_MEMO_HIT: &str = "soffio_plaintext_memo_hit_total";
pub(crate) const METRIC_MEMO_MISS: &str = "soffio_plaintext_memo_miss_total";

#[derive(Debug, Default)]
pub struct DerivedTextMemo {
    entries: RwLock<HashMap<MemoKey, Option<String>>>,
}

impl DerivedTextMemo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Memoized value, if any. `Some(None)` is a memoized absence of text.
    pub fn get(&self, key: &MemoKey) -> Option<Option<String>> {
        let hit = rw_read(&self.entries, SOURCE, "get").get(key).cloned();
        match hit {
            Some(_) => counter!(METRIC_MEMO_HIT).increment(1),
            None => counter!(METRIC_MEMO_MISS).increment(1),
        }
        hit
    }

    pub fn insert(&self, key: MemoKey, text: Option<String>) {
        rw_write(&self.entries, SOURCE, "insert").insert(key, text);
    }

    pub fn invalidate(&self, key: &MemoKey) -> bool {
        rw_write(&self.entries, SOURCE, "invalidate")
            .remove(key)
            .is_some()
    }

    pub fn clear(&self) {
        rw_write(&self.entries, SOURCE, "clear").clear();
    }

    pub fn contains(&self, key: &MemoKey) -> bool {
        rw_read(&self.entries, SOURCE, "contains").contains_key(key)
    }

    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::ContentStage;
    use uuid::Uuid;

    #[test]
    fn memoizes_absent_text() {
        let memo = DerivedTextMemo::new();
        let key = MemoKey::new(Uuid::new_v4(), ContentStage::Draft);

        assert_eq!(memo.get(&key), None);
        memo.insert(key, None);
        assert_eq!(memo.get(&key), Some(None));
        assert!(memo.contains(&key));
    }

    #[test]
    fn stages_are_kept_apart() {
        let memo = DerivedTextMemo::new();
        let id = Uuid::new_v4();
        memo.insert(MemoKey::new(id, ContentStage::Draft), Some("draft".into()));
        memo.insert(
            MemoKey::new(id, ContentStage::Published),
            Some("live".into()),
        );

        assert_eq!(
            memo.get(&MemoKey::new(id, ContentStage::Published)),
            Some(Some("live".into()))
        );
        assert!(memo.invalidate(&MemoKey::new(id, ContentStage::Draft)));
        assert!(!memo.invalidate(&MemoKey::new(id, ContentStage::Draft)));
        assert_eq!(memo.len(), 1);

        memo.clear();
        assert!(memo.is_empty());
    }
}
