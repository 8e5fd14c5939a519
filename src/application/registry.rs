//! Node type configuration resolved once at startup.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::application::repos::{ComputedPart, PartValue, RepoError};
use crate::config::{NodeTypeSettings, PlainTextSettings};
use crate::domain::entities::NodeRef;
use crate::domain::parts::{Accessor, PartDescriptor};
use crate::domain::types::{ContentStage, PartKind};

/// Declarative configuration of one node type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeTypeDefinition {
    pub name: String,
    pub enabled: bool,
    pub trigger_fields: Vec<String>,
    pub parts: PartDescriptor,
}

impl NodeTypeDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            trigger_fields: Vec::new(),
            parts: PartDescriptor::new(),
        }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn trigger_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.trigger_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn part(mut self, accessor: &str, kind: impl Into<PartKind>) -> Self {
        self.parts = self.parts.with(accessor, kind.into());
        self
    }
}

impl From<(&String, &NodeTypeSettings)> for NodeTypeDefinition {
    fn from((name, settings): (&String, &NodeTypeSettings)) -> Self {
        Self {
            name: name.clone(),
            enabled: settings.enabled,
            trigger_fields: settings.reset_on_changed_fields.clone(),
            parts: PartDescriptor::from_pairs(
                settings
                    .parts
                    .iter()
                    .map(|part| (part.accessor.as_str(), part.kind.clone())),
            ),
        }
    }
}

struct FnPart<F>(F);

#[async_trait]
impl<F> ComputedPart for FnPart<F>
where
    F: Fn(&NodeRef, ContentStage) -> PartValue + Send + Sync,
{
    async fn compute(&self, node: &NodeRef, stage: ContentStage) -> Result<PartValue, RepoError> {
        Ok((self.0)(node, stage))
    }
}

/// Computed parts keyed by node type and method name.
#[derive(Clone, Default)]
pub struct ComputedParts {
    parts: HashMap<(String, String), Arc<dyn ComputedPart>>,
}

impl fmt::Debug for ComputedParts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.parts.keys()).finish()
    }
}

impl ComputedParts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        node_type: impl Into<String>,
        method: impl Into<String>,
        part: Arc<dyn ComputedPart>,
    ) -> &mut Self {
        self.parts.insert((node_type.into(), method.into()), part);
        self
    }

    /// Register a synchronous closure as a computed part.
    pub fn register_fn<F>(
        &mut self,
        node_type: impl Into<String>,
        method: impl Into<String>,
        part: F,
    ) -> &mut Self
    where
        F: Fn(&NodeRef, ContentStage) -> PartValue + Send + Sync + 'static,
    {
        self.register(node_type, method, Arc::new(FnPart(part)))
    }

    pub fn get(&self, node_type: &str, method: &str) -> Option<Arc<dyn ComputedPart>> {
        self.parts
            .get(&(node_type.to_string(), method.to_string()))
            .cloned()
    }
}

#[derive(Clone)]
pub enum PartSource {
    Field(String),
    Computed(Arc<dyn ComputedPart>),
}

impl fmt::Debug for PartSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartSource::Field(name) => f.debug_tuple("Field").field(name).finish(),
            PartSource::Computed(_) => f.write_str("Computed"),
        }
    }
}

/// One resolved part: where to read it and how it contributes.
#[derive(Debug, Clone)]
pub struct PartPlan {
    pub accessor: Accessor,
    pub kind: PartKind,
    pub source: PartSource,
}

#[derive(Debug, Clone)]
pub struct NodeTypeConfig {
    pub name: String,
    pub enabled: bool,
    pub trigger_fields: Vec<String>,
    pub plan: Vec<PartPlan>,
}

#[derive(Debug, Clone, Default)]
pub struct NodeTypeRegistry {
    types: HashMap<String, Arc<NodeTypeConfig>>,
}

impl NodeTypeRegistry {
    /// Resolve definitions against the computed part table.
    ///
    /// Method accessors without a registered computed part are dropped.
    pub fn build<I>(definitions: I, computed: &ComputedParts) -> Self
    where
        I: IntoIterator<Item = NodeTypeDefinition>,
    {
        let mut types = HashMap::new();
        for definition in definitions {
            let mut plan = Vec::with_capacity(definition.parts.len());
            for entry in definition.parts.entries() {
                let source = match &entry.accessor {
                    Accessor::Field(name) => PartSource::Field(name.clone()),
                    Accessor::Method(method) => match computed.get(&definition.name, method) {
                        Some(part) => PartSource::Computed(part),
                        None => {
                            debug!(
                                node_type = definition.name.as_str(),
                                method = method.as_str(),
                                "skipping unresolved method accessor"
                            );
                            continue;
                        }
                    },
                };
                plan.push(PartPlan {
                    accessor: entry.accessor.clone(),
                    kind: entry.kind.clone(),
                    source,
                });
            }

            let config = NodeTypeConfig {
                name: definition.name.clone(),
                enabled: definition.enabled,
                trigger_fields: definition.trigger_fields,
                plan,
            };
            if types
                .insert(definition.name.clone(), Arc::new(config))
                .is_some()
            {
                warn!(
                    node_type = definition.name.as_str(),
                    "duplicate node type definition replaced an earlier one"
                );
            }
        }
        Self { types }
    }

    pub fn from_settings(settings: &PlainTextSettings, computed: &ComputedParts) -> Self {
        Self::build(
            settings.node_types.iter().map(NodeTypeDefinition::from),
            computed,
        )
    }

    pub fn get(&self, node_type: &str) -> Option<&Arc<NodeTypeConfig>> {
        self.types.get(node_type)
    }

    /// Configured participation, before hooks.
    pub fn is_enabled(&self, node_type: &str) -> bool {
        self.get(node_type).is_some_and(|config| config.enabled)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn unresolved_methods_are_dropped() {
        let mut computed = ComputedParts::new();
        computed.register_fn("page", "summary", |_node: &NodeRef, _stage| {
            PartValue::Text(Some("short".into()))
        });

        let registry = NodeTypeRegistry::build(
            [NodeTypeDefinition::new("page")
                .part("title", PartKind::PlainString)
                .part("->summary", PartKind::PlainString)
                .part("->missing", PartKind::PlainString)],
            &computed,
        );

        let config = registry.get("page").expect("page registered");
        let keys: Vec<String> = config.plan.iter().map(|part| part.accessor.key()).collect();
        assert_eq!(keys, vec!["title", "->summary"]);

        let PartSource::Computed(part) = &config.plan[1].source else {
            panic!("expected computed part");
        };
        let node = NodeRef::new(Uuid::new_v4(), "page");
        let value = part.compute(&node, ContentStage::Draft).await.unwrap();
        assert_eq!(value, PartValue::Text(Some("short".into())));
    }

    #[test]
    fn computed_parts_are_scoped_by_node_type() {
        let mut computed = ComputedParts::new();
        computed.register_fn("page", "summary", |_node: &NodeRef, _stage| {
            PartValue::Text(None)
        });

        let registry = NodeTypeRegistry::build(
            [NodeTypeDefinition::new("post").part("->summary", PartKind::PlainString)],
            &computed,
        );
        assert!(registry.get("post").expect("post").plan.is_empty());
    }

    #[test]
    fn disabled_and_unknown_types_do_not_participate() {
        let registry = NodeTypeRegistry::build(
            [
                NodeTypeDefinition::new("page"),
                NodeTypeDefinition::new("draft_note").enabled(false),
            ],
            &ComputedParts::new(),
        );
        assert!(registry.is_enabled("page"));
        assert!(!registry.is_enabled("draft_note"));
        assert!(!registry.is_enabled("unknown"));
        assert_eq!(registry.len(), 2);
    }
}
