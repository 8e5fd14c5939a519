//! Memo key definitions.

use std::fmt;

use uuid::Uuid;

use crate::domain::entities::NodeRef;
use crate::domain::types::ContentStage;

/// Identifies one memoized derived text: a node within one storage stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoKey {
    pub node_id: Uuid,
    pub stage: ContentStage,
}

impl MemoKey {
    pub fn new(node_id: Uuid, stage: ContentStage) -> Self {
        Self { node_id, stage }
    }

    pub fn for_node(node: &NodeRef, stage: ContentStage) -> Self {
        Self::new(node.id, stage)
    }
}

impl fmt::Display for MemoKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.node_id, self.stage)
    }
}
