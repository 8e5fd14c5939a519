use tracing::{debug, instrument};

use crate::application::error::PlainTextError;
use crate::application::hooks::{CustomOutput, CustomPartContext};
use crate::application::registry::{PartPlan, PartSource};
use crate::application::repos::PartValue;
use crate::domain::entities::NodeRef;
use crate::domain::parts::ExtractedParts;
use crate::domain::text::join_fragments;
use crate::domain::types::PartKind;

use super::PlainTextSession;

impl PlainTextSession {
    /// Produce the ordered fragments configured for the node's type.
    ///
    /// Each resolvable part is present in the result, holding `None` when it
    /// produced nothing.
    #[instrument(skip_all, fields(node = %node, stage = %self.stage))]
    pub async fn extract_parts(&self, node: &NodeRef) -> Result<ExtractedParts, PlainTextError> {
        let mut parts = ExtractedParts::new();
        if !self.is_enabled(node) {
            return Ok(parts);
        }
        let Some(config) = self.service.registry.get(&node.node_type).cloned() else {
            return Ok(parts);
        };

        for plan in &config.plan {
            let key = plan.accessor.key();
            parts.set(key.clone(), None);
            let value = self.extract_part(node, plan).await?;
            parts.set(key, value);
        }

        self.service.hooks.update_parts(node, &mut parts);
        debug!(parts = parts.len(), "extracted parts");
        Ok(parts)
    }

    async fn extract_part(
        &self,
        node: &NodeRef,
        plan: &PartPlan,
    ) -> Result<Option<String>, PlainTextError> {
        match &plan.kind {
            PartKind::PlainString => self.part_text(node, plan).await,
            PartKind::RichMarkup => {
                let markup = self.part_text(node, plan).await?;
                Ok(self.service.normalizer.normalize_for(
                    node,
                    markup.as_deref(),
                    &self.service.hooks,
                )?)
            }
            PartKind::SingleNode => match self.part_node(node, plan).await? {
                Some(related) if self.is_enabled(&related) => {
                    self.get_derived_text(&related, true).await
                }
                _ => Ok(None),
            },
            PartKind::NodeList => {
                let items = self.part_nodes(node, plan).await?;
                let mut fragments = Vec::with_capacity(items.len());
                for item in items.iter().filter(|item| self.is_enabled(item)) {
                    fragments.push(self.get_derived_text(item, true).await?);
                }
                Ok(join_fragments(fragments))
            }
            PartKind::Custom(kind) => self.custom_part(node, plan, kind).await,
        }
    }

    async fn custom_part(
        &self,
        node: &NodeRef,
        plan: &PartPlan,
        kind: &str,
    ) -> Result<Option<String>, PlainTextError> {
        let raw = self.part_text(node, plan).await?;
        let context = CustomPartContext {
            node,
            stage: self.stage,
            accessor: &plan.accessor,
            kind,
            raw: raw.as_deref(),
        };

        match self.service.hooks.provide_custom(&context).await? {
            Some(CustomOutput::Text(text)) => Ok(Some(text)),
            Some(CustomOutput::Markup(markup)) => Ok(self.service.normalizer.normalize_for(
                node,
                Some(&markup),
                &self.service.hooks,
            )?),
            None => {
                debug!(kind, accessor = %plan.accessor, "no provider for custom part");
                Ok(None)
            }
        }
    }

    async fn part_text(
        &self,
        node: &NodeRef,
        plan: &PartPlan,
    ) -> Result<Option<String>, PlainTextError> {
        match &plan.source {
            PartSource::Field(field) => Ok(self
                .service
                .content
                .field_text(node, self.stage, field)
                .await?),
            PartSource::Computed(part) => match part.compute(node, self.stage).await? {
                PartValue::Text(text) => Ok(text),
                _ => Ok(None),
            },
        }
    }

    async fn part_node(
        &self,
        node: &NodeRef,
        plan: &PartPlan,
    ) -> Result<Option<NodeRef>, PlainTextError> {
        match &plan.source {
            PartSource::Field(relation) => Ok(self
                .service
                .content
                .related_node(node, self.stage, relation)
                .await?),
            PartSource::Computed(part) => match part.compute(node, self.stage).await? {
                PartValue::Node(related) => Ok(related),
                _ => Ok(None),
            },
        }
    }

    async fn part_nodes(
        &self,
        node: &NodeRef,
        plan: &PartPlan,
    ) -> Result<Vec<NodeRef>, PlainTextError> {
        match &plan.source {
            PartSource::Field(relation) => Ok(self
                .service
                .content
                .related_nodes(node, self.stage, relation)
                .await?),
            PartSource::Computed(part) => match part.compute(node, self.stage).await? {
                PartValue::Nodes(items) => Ok(items),
                _ => Ok(Vec::new()),
            },
        }
    }
}
