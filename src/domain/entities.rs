//! Domain entities mirrored from persistent storage.

use std::fmt;

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

/// Identity of a content node together with the type that configures it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct NodeRef {
    pub id: Uuid,
    pub node_type: String,
}

impl NodeRef {
    pub fn new(id: Uuid, node_type: impl Into<String>) -> Self {
        Self {
            id,
            node_type: node_type.into(),
        }
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.node_type, self.id)
    }
}

/// Persisted derivation columns for one node in one stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlainTextState {
    pub derived_text: Option<String>,
    pub reset_flag: bool,
    pub last_derived_at: Option<OffsetDateTime>,
}

impl Default for PlainTextState {
    /// A node that has never been derived is stale.
    fn default() -> Self {
        Self {
            derived_text: None,
            reset_flag: true,
            last_derived_at: None,
        }
    }
}

/// Field-level update applied atomically to a node's derivation columns.
///
/// Absent fields are left untouched. `derived_text: Some(None)` writes NULL.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldUpdate {
    pub derived_text: Option<Option<String>>,
    pub reset_flag: Option<bool>,
    pub last_derived_at: Option<OffsetDateTime>,
}

impl FieldUpdate {
    /// Flag the node as stale without touching its text.
    pub fn mark_reset() -> Self {
        Self {
            reset_flag: Some(true),
            ..Self::default()
        }
    }

    /// Store freshly derived text and clear the flag.
    pub fn regenerated(text: Option<String>, at: OffsetDateTime) -> Self {
        Self {
            derived_text: Some(text),
            reset_flag: Some(false),
            last_derived_at: Some(at),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.derived_text.is_none() && self.reset_flag.is_none() && self.last_derived_at.is_none()
    }

    pub fn apply(&self, state: &mut PlainTextState) {
        if let Some(text) = &self.derived_text {
            state.derived_text = text.clone();
        }
        if let Some(flag) = self.reset_flag {
            state.reset_flag = flag;
        }
        if let Some(at) = self.last_derived_at {
            state.last_derived_at = Some(at);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_is_marked_for_reset() {
        let state = PlainTextState::default();
        assert!(state.reset_flag);
        assert!(state.derived_text.is_none());
        assert!(state.last_derived_at.is_none());
    }

    #[test]
    fn mark_reset_leaves_text_untouched() {
        let mut state = PlainTextState {
            derived_text: Some("kept".into()),
            reset_flag: false,
            last_derived_at: None,
        };
        FieldUpdate::mark_reset().apply(&mut state);
        assert!(state.reset_flag);
        assert_eq!(state.derived_text.as_deref(), Some("kept"));
    }

    #[test]
    fn regenerated_can_clear_text() {
        let now = OffsetDateTime::now_utc();
        let mut state = PlainTextState {
            derived_text: Some("old".into()),
            reset_flag: true,
            last_derived_at: None,
        };
        FieldUpdate::regenerated(None, now).apply(&mut state);
        assert_eq!(state.derived_text, None);
        assert!(!state.reset_flag);
        assert_eq!(state.last_derived_at, Some(now));
    }
}
