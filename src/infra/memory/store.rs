use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use crate::{
    application::repos::{PlainTextRepo, RepoError},
    domain::{
        entities::{FieldUpdate, NodeRef, PlainTextState},
        types::ContentStage,
    },
};

#[derive(Debug, Clone)]
struct StoredState {
    node_type: String,
    state: PlainTextState,
}

/// Process-local store keyed by node id and stage.
///
/// Each update is applied under the entry's shard lock, so a write is never
/// observed half applied.
#[derive(Debug, Default)]
pub struct InMemoryPlainTextStore {
    rows: DashMap<(Uuid, ContentStage), StoredState>,
    writes: AtomicU64,
}

impl InMemoryPlainTextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `update_fields` calls that reached the store.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Stored state, or `None` when the node has never been written.
    pub fn snapshot(&self, node: &NodeRef, stage: ContentStage) -> Option<PlainTextState> {
        self.rows
            .get(&(node.id, stage))
            .map(|entry| entry.state.clone())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[async_trait]
impl PlainTextRepo for InMemoryPlainTextStore {
    async fn load_state(
        &self,
        node: &NodeRef,
        stage: ContentStage,
    ) -> Result<PlainTextState, RepoError> {
        Ok(self.snapshot(node, stage).unwrap_or_default())
    }

    async fn update_fields(
        &self,
        node: &NodeRef,
        stage: ContentStage,
        update: &FieldUpdate,
    ) -> Result<(), RepoError> {
        if update.is_empty() {
            return Ok(());
        }

        self.writes.fetch_add(1, Ordering::Relaxed);
        let mut entry = self
            .rows
            .entry((node.id, stage))
            .or_insert_with(|| StoredState {
                node_type: node.node_type.clone(),
                state: PlainTextState::default(),
            });
        update.apply(&mut entry.state);
        Ok(())
    }

    async fn purge(&self, node: &NodeRef, stage: ContentStage) -> Result<(), RepoError> {
        self.rows.remove(&(node.id, stage));
        Ok(())
    }

    async fn list_marked(
        &self,
        stage: ContentStage,
        limit: u32,
    ) -> Result<Vec<NodeRef>, RepoError> {
        let mut marked: Vec<_> = self
            .rows
            .iter()
            .filter(|entry| entry.key().1 == stage && entry.state.reset_flag)
            .map(|entry| {
                (
                    entry.state.last_derived_at,
                    NodeRef::new(entry.key().0, entry.node_type.clone()),
                )
            })
            .collect();
        marked.sort_by(|(left_at, left), (right_at, right)| {
            left_at.cmp(right_at).then_with(|| left.id.cmp(&right.id))
        });

        Ok(marked
            .into_iter()
            .take(limit as usize)
            .map(|(_, node)| node)
            .collect())
    }
}
