//! Derived plain-text maintenance.
//!
//! A [`PlainTextService`] owns the shared collaborators. Each logical
//! operation opens a [`PlainTextSession`] bound to one storage stage; the
//! session carries the read memo and runs every step sequentially.

mod extract;
mod propagate;
mod read;
mod regenerate;


use std::num::NonZeroU32;
use std::sync::Arc;

use crate::application::error::PlainTextError;
use crate::application::hooks::HookRegistry;
use crate::application::markup::MarkupNormalizer;
use crate::application::registry::NodeTypeRegistry;
use crate::application::repos::{ContentSource, DependencyGraph, PlainTextRepo};
use crate::cache::{DerivedTextMemo, MemoKey};
use crate::domain::entities::NodeRef;
use crate::domain::types::ContentStage;

pub use regenerate::RegenerateOutcome;

const DEFAULT_SWEEP_BATCH_SIZE: NonZeroU32 = NonZeroU32::MIN.saturating_add(99);

pub(crate) const METRIC_MARK_TOTAL: &str = "soffio_plaintext_mark_total";
pub(crate) const METRIC_REGENERATE_TOTAL: &str = "soffio_plaintext_regenerate_total";
pub(crate) const METRIC_REGENERATE_MS: &str = "soffio_plaintext_regenerate_ms";

#[derive(Clone)]
pub struct PlainTextService {
    registry: Arc<NodeTypeRegistry>,
    store: Arc<dyn PlainTextRepo>,
    content: Arc<dyn ContentSource>,
    graph: Arc<dyn DependencyGraph>,
    normalizer: Arc<MarkupNormalizer>,
    hooks: Arc<HookRegistry>,
    sweep_batch_size: NonZeroU32,
}

impl PlainTextService {
    pub fn new(
        registry: Arc<NodeTypeRegistry>,
        store: Arc<dyn PlainTextRepo>,
        content: Arc<dyn ContentSource>,
        graph: Arc<dyn DependencyGraph>,
        normalizer: Arc<MarkupNormalizer>,
        hooks: Arc<HookRegistry>,
    ) -> Self {
        Self {
            registry,
            store,
            content,
            graph,
            normalizer,
            hooks,
            sweep_batch_size: DEFAULT_SWEEP_BATCH_SIZE,
        }
    }

    /// Batch size used by [`PlainTextSession::regenerate_marked_batch`].
    pub fn with_sweep_batch_size(mut self, size: NonZeroU32) -> Self {
        self.sweep_batch_size = size;
        self
    }

    pub fn sweep_batch_size(&self) -> NonZeroU32 {
        self.sweep_batch_size
    }

    /// Open a session for one logical operation against `stage`.
    pub fn session(&self, stage: ContentStage) -> PlainTextSession {
        PlainTextSession {
            service: self.clone(),
            stage,
            memo: DerivedTextMemo::new(),
        }
    }

    pub fn registry(&self) -> &NodeTypeRegistry {
        &self.registry
    }
}

/// Request-scoped view of the service.
pub struct PlainTextSession {
    service: PlainTextService,
    stage: ContentStage,
    memo: DerivedTextMemo,
}

impl PlainTextSession {
    pub fn stage(&self) -> ContentStage {
        self.stage
    }

    pub fn memo(&self) -> &DerivedTextMemo {
        &self.memo
    }

    /// Whether the node's type participates, after hooks.
    pub fn is_enabled(&self, node: &NodeRef) -> bool {
        let mut enabled = self.service.registry.is_enabled(&node.node_type);
        self.service.hooks.update_is_enabled(node, &mut enabled);
        enabled
    }

    async fn parent_of(&self, node: &NodeRef) -> Result<Option<NodeRef>, PlainTextError> {
        let mut parent = self.service.graph.parent_of(node, self.stage).await?;
        self.service.hooks.update_parent(node, &mut parent);
        Ok(parent)
    }

    async fn children_of(&self, node: &NodeRef) -> Result<Vec<NodeRef>, PlainTextError> {
        let mut children = self.service.graph.children_of(node, self.stage).await?;
        self.service.hooks.update_children(node, &mut children);
        Ok(children)
    }

    fn memo_key(&self, node: &NodeRef) -> MemoKey {
        MemoKey::for_node(node, self.stage)
    }
}
