use std::time::Instant;

use metrics::{counter, histogram};
use time::OffsetDateTime;
use tracing::{debug, info, instrument};

use crate::application::error::PlainTextError;
use crate::domain::entities::{FieldUpdate, NodeRef};
use crate::domain::text::assemble;

use super::{METRIC_REGENERATE_MS, METRIC_REGENERATE_TOTAL, PlainTextSession};

/// Result of regenerating one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegenerateOutcome {
    /// The node's type does not participate; nothing was touched.
    Disabled,
    /// The node was clean and not forced.
    Skipped,
    /// New text was stored and the reset flag cleared.
    Regenerated(Option<String>),
}

impl RegenerateOutcome {
    pub fn is_regenerated(&self) -> bool {
        matches!(self, RegenerateOutcome::Regenerated(_))
    }
}

enum Visit {
    Enter(NodeRef),
    Exit(NodeRef),
}

impl PlainTextSession {
    /// Regenerate `node` after regenerating its whole subtree, children first.
    ///
    /// Every child is visited regardless of its own flag; each node then
    /// decides from its freshly loaded state whether it needs new text.
    #[instrument(skip_all, fields(node = %node, stage = %self.stage, force = force))]
    pub async fn regenerate(
        &self,
        node: &NodeRef,
        force: bool,
    ) -> Result<RegenerateOutcome, PlainTextError> {
        if !self.is_enabled(node) {
            return Ok(RegenerateOutcome::Disabled);
        }

        let mut outcome = RegenerateOutcome::Skipped;
        let mut stack = vec![Visit::Enter(node.clone())];
        while let Some(visit) = stack.pop() {
            match visit {
                Visit::Enter(current) => {
                    let children = self.children_of(&current).await?;
                    stack.push(Visit::Exit(current));
                    for child in children.into_iter().rev() {
                        if self.is_enabled(&child) {
                            stack.push(Visit::Enter(child));
                        }
                    }
                }
                Visit::Exit(current) => {
                    // The requested node is always the last one to exit.
                    outcome = self.regenerate_own(&current, force).await?;
                }
            }
        }
        Ok(outcome)
    }

    async fn regenerate_own(
        &self,
        node: &NodeRef,
        force: bool,
    ) -> Result<RegenerateOutcome, PlainTextError> {
        let state = self.service.store.load_state(node, self.stage).await?;
        if !force && !state.reset_flag {
            debug!(node = %node, "derived text is current");
            return Ok(RegenerateOutcome::Skipped);
        }

        let started_at = Instant::now();
        let parts = self.extract_parts(node).await?;
        let text = assemble(&parts);

        let update = FieldUpdate::regenerated(text.clone(), OffsetDateTime::now_utc());
        self.service
            .store
            .update_fields(node, self.stage, &update)
            .await?;
        self.memo.invalidate(&self.memo_key(node));

        counter!(METRIC_REGENERATE_TOTAL).increment(1);
        histogram!(METRIC_REGENERATE_MS).record(started_at.elapsed().as_secs_f64() * 1000.0);
        debug!(
            node = %node,
            chars = text.as_deref().map(str::len).unwrap_or(0),
            "regenerated derived text"
        );

        self.service.hooks.on_after_regenerate(node, text.as_deref());

        if let Some(parent) = self.parent_of(node).await?
            && self.is_enabled(&parent)
        {
            let parent_state = self.service.store.load_state(&parent, self.stage).await?;
            if !parent_state.reset_flag {
                self.mark_dirty(&parent).await?;
            }
        }

        self.service
            .hooks
            .on_after_parent_marked(node, text.as_deref());

        Ok(RegenerateOutcome::Regenerated(text))
    }

    /// Regenerate up to `limit` marked nodes of this session's stage.
    ///
    /// Returns how many of the listed nodes received new text.
    #[instrument(skip(self), fields(stage = %self.stage))]
    pub async fn regenerate_marked(&self, limit: u32) -> Result<usize, PlainTextError> {
        let marked = self.service.store.list_marked(self.stage, limit).await?;
        let candidates = marked.len();
        let mut regenerated = 0usize;
        for node in marked {
            if self.regenerate(&node, false).await?.is_regenerated() {
                regenerated += 1;
            }
        }
        info!(candidates, regenerated, "regenerated marked nodes");
        Ok(regenerated)
    }

    /// One sweep pass sized by the service's configured batch size.
    pub async fn regenerate_marked_batch(&self) -> Result<usize, PlainTextError> {
        self.regenerate_marked(self.service.sweep_batch_size.get())
            .await
    }
}
