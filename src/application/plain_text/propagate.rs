use metrics::counter;
use tracing::{debug, instrument};

use crate::application::error::PlainTextError;
use crate::domain::entities::{FieldUpdate, NodeRef};

use super::{METRIC_MARK_TOTAL, PlainTextSession};

impl PlainTextSession {
    /// Flag `node` and every ancestor as stale.
    ///
    /// The walk continues to the root, stopping early only at a node that does
    /// not participate. Returns the number of nodes flagged.
    #[instrument(skip_all, fields(node = %node, stage = %self.stage))]
    pub async fn mark_dirty(&self, node: &NodeRef) -> Result<usize, PlainTextError> {
        let update = FieldUpdate::mark_reset();
        let mut marked = 0usize;
        let mut current = Some(node.clone());

        while let Some(target) = current.take() {
            if !self.is_enabled(&target) {
                break;
            }

            self.service
                .store
                .update_fields(&target, self.stage, &update)
                .await?;
            self.memo.invalidate(&self.memo_key(&target));
            counter!(METRIC_MARK_TOTAL).increment(1);
            marked += 1;
            debug!(target_node = %target, "flagged derived text as stale");

            self.service.hooks.on_after_marked(&target);
            current = self.parent_of(&target).await?;
        }

        Ok(marked)
    }

    /// React to a write of `node` that changed `changed_fields`.
    ///
    /// Marks the node (and its ancestors) when it participates, is not already
    /// flagged, and one of its trigger fields changed. Hooks may override the
    /// decision. Returns whether anything was marked.
    #[instrument(skip_all, fields(node = %node, stage = %self.stage))]
    pub async fn handle_changes<S>(
        &self,
        node: &NodeRef,
        changed_fields: &[S],
    ) -> Result<bool, PlainTextError>
    where
        S: AsRef<str> + Sync,
    {
        let mut should_mark = false;
        if self.is_enabled(node) {
            let state = self.service.store.load_state(node, self.stage).await?;
            if !state.reset_flag {
                should_mark = self.trigger_fields_changed(node, changed_fields);
            }
        }
        self.service.hooks.update_should_mark(node, &mut should_mark);

        if !should_mark {
            return Ok(false);
        }
        Ok(self.mark_dirty(node).await? > 0)
    }

    /// Handle removal of `node`: its parent goes stale and its state is purged.
    #[instrument(skip_all, fields(node = %node, stage = %self.stage))]
    pub async fn handle_deleted(&self, node: &NodeRef) -> Result<(), PlainTextError> {
        if let Some(parent) = self.parent_of(node).await? {
            self.mark_dirty(&parent).await?;
        }
        self.service.store.purge(node, self.stage).await?;
        self.memo.invalidate(&self.memo_key(node));
        Ok(())
    }

    fn trigger_fields_changed<S: AsRef<str>>(&self, node: &NodeRef, changed_fields: &[S]) -> bool {
        let mut fields = self
            .service
            .registry
            .get(&node.node_type)
            .map(|config| config.trigger_fields.clone())
            .unwrap_or_default();
        self.service.hooks.update_trigger_fields(node, &mut fields);

        let mut changed = fields.iter().any(|field| {
            changed_fields
                .iter()
                .any(|candidate| candidate.as_ref() == field)
        });
        self.service.hooks.update_fields_changed(node, &mut changed);
        changed
    }
}
