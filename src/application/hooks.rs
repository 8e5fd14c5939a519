//! Extension points observed by the derivation engine.
//!
//! Hooks are synchronous and may adjust values in flight. Custom part
//! providers are asynchronous and produce fragments for part kinds the
//! engine does not know.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::application::error::PlainTextError;
use crate::application::markup::StripOptions;
use crate::domain::entities::NodeRef;
use crate::domain::parts::{Accessor, ExtractedParts};
use crate::domain::types::ContentStage;

/// Observer with in-flight adjustment points. Every method defaults to a no-op.
pub trait PlainTextHook: Send + Sync {
    fn update_is_enabled(&self, _node: &NodeRef, _enabled: &mut bool) {}

    fn update_trigger_fields(&self, _node: &NodeRef, _fields: &mut Vec<String>) {}

    fn update_fields_changed(&self, _node: &NodeRef, _changed: &mut bool) {}

    /// Final say on whether a change marks the node.
    fn update_should_mark(&self, _node: &NodeRef, _should_mark: &mut bool) {}

    fn update_parts(&self, _node: &NodeRef, _parts: &mut ExtractedParts) {}

    fn update_strip_options(&self, _node: &NodeRef, _options: &mut StripOptions) {}

    fn update_normalized(&self, _node: &NodeRef, _text: &mut Option<String>) {}

    fn update_parent(&self, _node: &NodeRef, _parent: &mut Option<NodeRef>) {}

    fn update_children(&self, _node: &NodeRef, _children: &mut Vec<NodeRef>) {}

    fn update_derived_text(&self, _node: &NodeRef, _text: &mut Option<String>) {}

    fn on_after_regenerate(&self, _node: &NodeRef, _text: Option<&str>) {}

    fn on_after_parent_marked(&self, _node: &NodeRef, _text: Option<&str>) {}

    fn on_after_marked(&self, _node: &NodeRef) {}
}

/// Inputs handed to a [`CustomPartProvider`].
#[derive(Debug, Clone, Copy)]
pub struct CustomPartContext<'a> {
    pub node: &'a NodeRef,
    pub stage: ContentStage,
    pub accessor: &'a Accessor,
    pub kind: &'a str,
    /// Text read through the accessor, when it resolves to text.
    pub raw: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustomOutput {
    /// Used as-is.
    Text(String),
    /// Normalized like a rich-markup part.
    Markup(String),
}

#[async_trait]
pub trait CustomPartProvider: Send + Sync {
    /// Produce output for a custom part, or `None` to let the next provider try.
    async fn provide(
        &self,
        context: &CustomPartContext<'_>,
    ) -> Result<Option<CustomOutput>, PlainTextError>;
}

/// Ordered set of hooks and providers shared by every session.
#[derive(Clone, Default)]
pub struct HookRegistry {
    hooks: Vec<Arc<dyn PlainTextHook>>,
    providers: Vec<Arc<dyn CustomPartProvider>>,
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookRegistry")
            .field("hooks", &self.hooks.len())
            .field("providers", &self.providers.len())
            .finish()
    }
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hook(mut self, hook: Arc<dyn PlainTextHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn with_provider(mut self, provider: Arc<dyn CustomPartProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn providers(&self) -> &[Arc<dyn CustomPartProvider>] {
        &self.providers
    }

    /// Ask providers in registration order; the first output wins.
    pub async fn provide_custom(
        &self,
        context: &CustomPartContext<'_>,
    ) -> Result<Option<CustomOutput>, PlainTextError> {
        for provider in &self.providers {
            if let Some(output) = provider.provide(context).await? {
                return Ok(Some(output));
            }
        }
        Ok(None)
    }

    pub fn update_is_enabled(&self, node: &NodeRef, enabled: &mut bool) {
        for hook in &self.hooks {
            hook.update_is_enabled(node, enabled);
        }
    }

    pub fn update_trigger_fields(&self, node: &NodeRef, fields: &mut Vec<String>) {
        for hook in &self.hooks {
            hook.update_trigger_fields(node, fields);
        }
    }

    pub fn update_fields_changed(&self, node: &NodeRef, changed: &mut bool) {
        for hook in &self.hooks {
            hook.update_fields_changed(node, changed);
        }
    }

    pub fn update_should_mark(&self, node: &NodeRef, should_mark: &mut bool) {
        for hook in &self.hooks {
            hook.update_should_mark(node, should_mark);
        }
    }

    pub fn update_parts(&self, node: &NodeRef, parts: &mut ExtractedParts) {
        for hook in &self.hooks {
            hook.update_parts(node, parts);
        }
    }

    pub fn update_strip_options(&self, node: &NodeRef, options: &mut StripOptions) {
        for hook in &self.hooks {
            hook.update_strip_options(node, options);
        }
    }

    pub fn update_normalized(&self, node: &NodeRef, text: &mut Option<String>) {
        for hook in &self.hooks {
            hook.update_normalized(node, text);
        }
    }

    pub fn update_parent(&self, node: &NodeRef, parent: &mut Option<NodeRef>) {
        for hook in &self.hooks {
            hook.update_parent(node, parent);
        }
    }

    pub fn update_children(&self, node: &NodeRef, children: &mut Vec<NodeRef>) {
        for hook in &self.hooks {
            hook.update_children(node, children);
        }
    }

    pub fn update_derived_text(&self, node: &NodeRef, text: &mut Option<String>) {
        for hook in &self.hooks {
            hook.update_derived_text(node, text);
        }
    }

    pub fn on_after_regenerate(&self, node: &NodeRef, text: Option<&str>) {
        for hook in &self.hooks {
            hook.on_after_regenerate(node, text);
        }
    }

    pub fn on_after_parent_marked(&self, node: &NodeRef, text: Option<&str>) {
        for hook in &self.hooks {
            hook.on_after_parent_marked(node, text);
        }
    }

    pub fn on_after_marked(&self, node: &NodeRef) {
        for hook in &self.hooks {
            hook.on_after_marked(node);
        }
    }
}
