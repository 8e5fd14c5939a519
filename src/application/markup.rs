//! Conversion of rich-markup fragments into plain text.

use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tracing::trace;

use crate::application::hooks::HookRegistry;
use crate::domain::entities::NodeRef;
use crate::domain::text::{collapse_blank_runs, non_empty_trimmed};

#[derive(Debug, Error)]
pub enum MarkupError {
    #[error("failed to render shortcodes: {message}")]
    Shortcode { message: String },
    #[error("failed to strip markup: {message}")]
    Strip { message: String },
}

impl MarkupError {
    pub fn shortcode(message: impl Into<String>) -> Self {
        Self::Shortcode {
            message: message.into(),
        }
    }

    pub fn strip(message: impl Into<String>) -> Self {
        Self::Strip {
            message: message.into(),
        }
    }
}

/// Options controlling how markup is flattened to text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StripOptions {
    /// Keep link targets as `text [href]`.
    pub preserve_links: bool,
    /// Wrap bold text in asterisks.
    pub replace_bold_asterisk: bool,
    /// Collapse every whitespace run into a single space.
    pub compress_whitespace: bool,
    /// Replace images with their alt text instead of dropping them.
    pub replace_images_with_alt: bool,
}

impl Default for StripOptions {
    fn default() -> Self {
        Self {
            preserve_links: false,
            replace_bold_asterisk: false,
            compress_whitespace: false,
            replace_images_with_alt: true,
        }
    }
}

/// Renderer collaborator that knows the markup dialect.
pub trait MarkupRenderer: Send + Sync {
    /// Expand embedded shortcodes. Unknown shortcodes are left in place.
    fn render_shortcodes(&self, markup: &str) -> Result<String, MarkupError>;

    fn strip_to_text(&self, markup: &str, options: &StripOptions) -> Result<String, MarkupError>;
}

#[derive(Clone)]
pub struct MarkupNormalizer {
    renderer: Arc<dyn MarkupRenderer>,
    defaults: StripOptions,
}

impl MarkupNormalizer {
    pub fn new(renderer: Arc<dyn MarkupRenderer>, defaults: StripOptions) -> Self {
        Self { renderer, defaults }
    }

    pub fn defaults(&self) -> StripOptions {
        self.defaults
    }

    /// Normalize one fragment with the default options and no hooks.
    pub fn normalize(&self, markup: Option<&str>) -> Result<Option<String>, MarkupError> {
        self.run(markup, None)
    }

    /// Normalize one fragment on behalf of `node`, letting hooks adjust options and output.
    pub fn normalize_for(
        &self,
        node: &NodeRef,
        markup: Option<&str>,
        hooks: &HookRegistry,
    ) -> Result<Option<String>, MarkupError> {
        self.run(markup, Some((node, hooks)))
    }

    fn run(
        &self,
        markup: Option<&str>,
        hooks: Option<(&NodeRef, &HookRegistry)>,
    ) -> Result<Option<String>, MarkupError> {
        let mut text = match markup.filter(|value| !value.is_empty()) {
            Some(markup) => {
                let mut options = self.defaults;
                if let Some((node, hooks)) = hooks {
                    hooks.update_strip_options(node, &mut options);
                }

                let rendered = self.renderer.render_shortcodes(markup)?;
                let stripped = self.renderer.strip_to_text(&rendered, &options)?;
                Some(collapse_blank_runs(&stripped))
            }
            None => None,
        };

        if let Some((node, hooks)) = hooks {
            hooks.update_normalized(node, &mut text);
        }

        let text = non_empty_trimmed(text);
        trace!(produced = text.is_some(), "normalized markup fragment");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::hooks::PlainTextHook;
    use uuid::Uuid;

    struct TagStripper;

    impl MarkupRenderer for TagStripper {
        fn render_shortcodes(&self, markup: &str) -> Result<String, MarkupError> {
            Ok(markup.replace("[year]", "2024"))
        }

        fn strip_to_text(
            &self,
            markup: &str,
            options: &StripOptions,
        ) -> Result<String, MarkupError> {
            let mut out = String::new();
            let mut in_tag = false;
            for ch in markup.chars() {
                match ch {
                    '<' => in_tag = true,
                    '>' => in_tag = false,
                    _ if !in_tag => out.push(ch),
                    _ => {}
                }
            }
            if options.compress_whitespace {
                out = out.split_whitespace().collect::<Vec<_>>().join(" ");
            }
            Ok(out)
        }
    }

    struct FailingRenderer;

    impl MarkupRenderer for FailingRenderer {
        fn render_shortcodes(&self, _markup: &str) -> Result<String, MarkupError> {
            Err(MarkupError::shortcode("parser unavailable"))
        }

        fn strip_to_text(
            &self,
            _markup: &str,
            _options: &StripOptions,
        ) -> Result<String, MarkupError> {
            unreachable!("stripping is never reached")
        }
    }

    struct Compressing;

    impl PlainTextHook for Compressing {
        fn update_strip_options(&self, _node: &NodeRef, options: &mut StripOptions) {
            options.compress_whitespace = true;
        }

        fn update_normalized(&self, _node: &NodeRef, text: &mut Option<String>) {
            if let Some(value) = text.as_mut() {
                value.push_str(" (edited)");
            }
        }
    }

    fn normalizer() -> MarkupNormalizer {
        MarkupNormalizer::new(Arc::new(TagStripper), StripOptions::default())
    }

    #[test]
    fn defaults_match_documented_options() {
        let options = StripOptions::default();
        assert!(!options.preserve_links);
        assert!(!options.replace_bold_asterisk);
        assert!(!options.compress_whitespace);
        assert!(options.replace_images_with_alt);
    }

    #[test]
    fn empty_input_is_none() {
        let normalizer = normalizer();
        assert_eq!(normalizer.normalize(None).unwrap(), None);
        assert_eq!(normalizer.normalize(Some("")).unwrap(), None);
        assert_eq!(normalizer.normalize(Some("<p>  </p>")).unwrap(), None);
    }

    #[test]
    fn shortcodes_render_before_stripping_and_blank_runs_collapse() {
        let text = normalizer()
            .normalize(Some("<p>Since [year]</p>\n\n\n\n<p>More</p>\n"))
            .unwrap();
        assert_eq!(text.as_deref(), Some("Since 2024\n\nMore"));
    }

    #[test]
    fn hooks_adjust_options_and_output() {
        let hooks = HookRegistry::new().with_hook(Arc::new(Compressing));
        let node = NodeRef::new(Uuid::new_v4(), "page");
        let text = normalizer()
            .normalize_for(&node, Some("<p>a\n\n b</p>"), &hooks)
            .unwrap();
        assert_eq!(text.as_deref(), Some("a b (edited)"));
    }

    #[test]
    fn renderer_errors_propagate() {
        let normalizer = MarkupNormalizer::new(Arc::new(FailingRenderer), StripOptions::default());
        let err = normalizer.normalize(Some("<p>x</p>")).unwrap_err();
        assert!(matches!(err, MarkupError::Shortcode { .. }));
    }
}
