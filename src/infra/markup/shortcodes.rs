//! Bracketed shortcode expansion: `[name key="value"]content[/name]`.

use std::{collections::BTreeMap, collections::HashMap, fmt, sync::Arc};

use tracing::trace;

use crate::application::markup::MarkupError;

/// A parsed shortcode occurrence handed to its handler.
#[derive(Debug, Clone, Copy)]
pub struct ShortcodeCall<'a> {
    pub name: &'a str,
    pub attributes: &'a BTreeMap<String, String>,
    /// Enclosed markup, `None` for self-closing tags.
    pub content: Option<&'a str>,
}

impl ShortcodeCall<'_> {
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

type Handler = Arc<dyn Fn(&ShortcodeCall<'_>) -> Result<String, MarkupError> + Send + Sync>;

#[derive(Clone, Default)]
pub struct ShortcodeRegistry {
    handlers: HashMap<String, Handler>,
}

impl fmt::Debug for ShortcodeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.handlers.keys().collect();
        names.sort();
        f.debug_struct("ShortcodeRegistry")
            .field("handlers", &names)
            .finish()
    }
}

impl ShortcodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&ShortcodeCall<'_>) -> Result<String, MarkupError> + Send + Sync + 'static,
    {
        self.register(name, handler);
        self
    }

    /// Register a handler; names are matched case-sensitively.
    pub fn register<F>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn(&ShortcodeCall<'_>) -> Result<String, MarkupError> + Send + Sync + 'static,
    {
        self.handlers.insert(name.into(), Arc::new(handler));
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Expand every registered shortcode. Unregistered or malformed
    /// shortcodes stay in the output untouched.
    pub fn render(&self, markup: &str) -> Result<String, MarkupError> {
        if self.handlers.is_empty() || !markup.contains('[') {
            return Ok(markup.to_string());
        }

        let mut out = String::with_capacity(markup.len());
        let mut rest = markup;
        while let Some(start) = rest.find('[') {
            out.push_str(&rest[..start]);
            let candidate = &rest[start..];
            match self.expand(candidate)? {
                Some((rendered, consumed)) => {
                    out.push_str(&rendered);
                    rest = &candidate[consumed..];
                }
                None => {
                    out.push('[');
                    rest = &candidate[1..];
                }
            }
        }
        out.push_str(rest);
        Ok(out)
    }

    fn expand(&self, input: &str) -> Result<Option<(String, usize)>, MarkupError> {
        let Some(tag) = parse_open_tag(input) else {
            return Ok(None);
        };
        let Some(handler) = self.handlers.get(tag.name) else {
            return Ok(None);
        };

        let mut consumed = tag.len;
        let mut content = None;
        if !tag.self_closing {
            let closing = format!("[/{}]", tag.name);
            if let Some(offset) = input[consumed..].find(&closing) {
                content = Some(&input[consumed..consumed + offset]);
                consumed += offset + closing.len();
            }
        }

        let call = ShortcodeCall {
            name: tag.name,
            attributes: &tag.attributes,
            content,
        };
        let rendered = handler(&call)?;
        trace!(shortcode = tag.name, "expanded shortcode");
        Ok(Some((rendered, consumed)))
    }
}

struct OpenTag<'a> {
    name: &'a str,
    attributes: BTreeMap<String, String>,
    self_closing: bool,
    /// Bytes spanned by the opening tag, brackets included.
    len: usize,
}

fn parse_open_tag(input: &str) -> Option<OpenTag<'_>> {
    let body = input.strip_prefix('[')?;
    let name_len = body
        .find(|ch: char| !(ch.is_ascii_alphanumeric() || ch == '_' || ch == '-'))
        .unwrap_or(body.len());
    let name = &body[..name_len];
    if !name.starts_with(|ch: char| ch.is_ascii_alphabetic()) {
        return None;
    }

    let mut attributes = BTreeMap::new();
    let mut cursor = name_len;
    loop {
        let remaining = &body[cursor..];
        let trimmed = remaining.trim_start();
        if cursor > name_len && trimmed.len() == remaining.len() && !trimmed.starts_with([']', '/'])
        {
            // attributes must be separated by whitespace
            return None;
        }
        cursor += remaining.len() - trimmed.len();

        if trimmed.starts_with("/]") {
            return Some(OpenTag {
                name,
                attributes,
                self_closing: true,
                len: 1 + cursor + 2,
            });
        }
        if trimmed.starts_with(']') {
            return Some(OpenTag {
                name,
                attributes,
                self_closing: false,
                len: 1 + cursor + 1,
            });
        }
        if cursor == name_len || trimmed.is_empty() || trimmed.starts_with('[') {
            return None;
        }

        let (key, value, used) = parse_attribute(trimmed)?;
        attributes.insert(key, value);
        cursor += used;
    }
}

fn parse_attribute(input: &str) -> Option<(String, String, usize)> {
    let key_len = input
        .find(|ch: char| ch.is_whitespace() || matches!(ch, '=' | ']' | '/' | '[' | '"' | '\''))
        .unwrap_or(input.len());
    if key_len == 0 {
        return None;
    }
    let key = input[..key_len].to_ascii_lowercase();

    let Some(value_part) = input[key_len..].strip_prefix('=') else {
        return Some((key, String::new(), key_len));
    };
    let prefix = key_len + 1;

    match value_part.chars().next()? {
        quote @ ('"' | '\'') => {
            let inner = &value_part[1..];
            let end = inner.find(quote)?;
            Some((key, inner[..end].to_string(), prefix + 1 + end + 1))
        }
        _ => {
            let end = value_part
                .find(|ch: char| ch.is_whitespace() || ch == ']')
                .unwrap_or(value_part.len());
            Some((key, value_part[..end].to_string(), prefix + end))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ShortcodeRegistry {
        ShortcodeRegistry::new()
            .with("year", |_call: &ShortcodeCall<'_>| Ok("2026".to_string()))
            .with("quote", |call: &ShortcodeCall<'_>| {
                let author = call.attribute("author").unwrap_or("anonymous");
                Ok(format!(
                    "<blockquote>{} ({author})</blockquote>",
                    call.content.unwrap_or_default()
                ))
            })
    }

    #[test]
    fn expands_self_closing_and_enclosing_shortcodes() {
        let rendered = registry()
            .render(r#"(c) [year] [quote author="Ada"]Hi[/quote]"#)
            .unwrap();
        assert_eq!(rendered, "(c) 2026 <blockquote>Hi (Ada)</blockquote>");
    }

    #[test]
    fn explicit_self_closing_tags_do_not_swallow_content() {
        let rendered = registry()
            .render("[quote author='Bo' /]tail[/quote]")
            .unwrap();
        assert_eq!(rendered, "<blockquote> (Bo)</blockquote>tail[/quote]");
    }

    #[test]
    fn unknown_and_malformed_shortcodes_stay_in_place() {
        let input = "[unknown a=1] [1abc] [year [quote author=\"open]";
        assert_eq!(registry().render(input).unwrap(), input);
    }

    #[test]
    fn handler_errors_propagate() {
        let registry = ShortcodeRegistry::new()
            .with("boom", |_call: &ShortcodeCall<'_>| Err(MarkupError::shortcode("boom failed")));
        assert!(matches!(
            registry.render("[boom]"),
            Err(MarkupError::Shortcode { .. })
        ));
    }

    #[test]
    fn parses_bare_and_unquoted_attributes() {
        let tag = parse_open_tag("[embed wide src=clip.mp4 Title=\"A b\"]").unwrap();
        assert_eq!(tag.name, "embed");
        assert_eq!(tag.attributes.get("wide").map(String::as_str), Some(""));
        assert_eq!(
            tag.attributes.get("src").map(String::as_str),
            Some("clip.mp4")
        );
        assert_eq!(tag.attributes.get("title").map(String::as_str), Some("A b"));
        assert!(!tag.self_closing);
    }
}
