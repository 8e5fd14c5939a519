use async_trait::async_trait;
use comrak::{markdown_to_html, options::Options};
use tracing::trace;

use crate::application::{
    error::PlainTextError,
    hooks::{CustomOutput, CustomPartContext, CustomPartProvider},
};

/// Part kind answered by [`MarkdownPartProvider`].
pub const MARKDOWN_KIND: &str = "markdown";

/// Renders `markdown` parts to HTML so they flow through the normal
/// rich-markup normalization.
pub struct MarkdownPartProvider {
    options: Options<'static>,
}

impl Default for MarkdownPartProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownPartProvider {
    pub fn new() -> Self {
        let mut options = Options::default();
        let ext = &mut options.extension;
        ext.strikethrough = true;
        ext.table = true;
        ext.autolink = true;
        ext.tasklist = true;
        ext.footnotes = true;
        ext.description_lists = true;
        options.render.r#unsafe = true;
        Self { options }
    }
}

#[async_trait]
impl CustomPartProvider for MarkdownPartProvider {
    async fn provide(
        &self,
        context: &CustomPartContext<'_>,
    ) -> Result<Option<CustomOutput>, PlainTextError> {
        if context.kind != MARKDOWN_KIND {
            return Ok(None);
        }
        let Some(source) = context.raw else {
            return Ok(None);
        };

        let html = markdown_to_html(source, &self.options);
        trace!(node = %context.node, bytes = html.len(), "rendered markdown part");
        Ok(Some(CustomOutput::Markup(html)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{entities::NodeRef, parts::Accessor, types::ContentStage};
    use uuid::Uuid;

    #[tokio::test]
    async fn renders_markdown_and_ignores_other_kinds() {
        let node = NodeRef::new(Uuid::new_v4(), "article");
        let accessor = Accessor::parse("Body").unwrap();
        let provider = MarkdownPartProvider::new();

        let context = CustomPartContext {
            node: &node,
            stage: ContentStage::Draft,
            accessor: &accessor,
            kind: MARKDOWN_KIND,
            raw: Some("# Heading\n\nSome *text*."),
        };
        let Some(CustomOutput::Markup(html)) = provider.provide(&context).await.unwrap() else {
            panic!("expected markup output");
        };
        assert!(html.contains("<h1>Heading</h1>"));
        assert!(html.contains("<em>text</em>"));

        let other = CustomPartContext {
            kind: "csv",
            ..context
        };
        assert_eq!(provider.provide(&other).await.unwrap(), None);

        let empty = CustomPartContext {
            raw: None,
            ..context
        };
        assert_eq!(provider.provide(&empty).await.unwrap(), None);
    }
}
