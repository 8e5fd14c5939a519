//! HTML markup dialect: shortcode expansion, sanitizing, and flattening.

mod entities;
mod markdown;
mod shortcodes;

pub use markdown::{MARKDOWN_KIND, MarkdownPartProvider};
pub use shortcodes::{ShortcodeCall, ShortcodeRegistry};

use std::iter::Peekable;
use std::str::Chars;

use ammonia::Builder as AmmoniaBuilder;
use lol_html::{RewriteStrSettings, element, html_content::ContentType, rewrite_str};

use crate::application::markup::{MarkupError, MarkupRenderer, StripOptions};

use entities::decode_entities;

// Structural markers emitted while rewriting and expanded once tags are gone.
const BLOCK_OPEN: char = '\u{e000}';
const BLOCK_CLOSE: char = '\u{e001}';
const LINE_BREAK: char = '\u{e002}';
const CELL_END: char = '\u{e003}';
const MARKERS: [char; 4] = [BLOCK_OPEN, BLOCK_CLOSE, LINE_BREAK, CELL_END];

const CELL_GAP: &str = "    ";

/// Flattens HTML fragments into plain text.
///
/// Markup is sanitized first, so script and style bodies never reach the
/// output. Headings, paragraphs, and divs become blank-line separated
/// blocks; `br` and `tr` become line breaks and table cells are separated
/// by four spaces.
pub struct HtmlTextRenderer {
    shortcodes: ShortcodeRegistry,
    sanitizer: AmmoniaBuilder<'static>,
}

impl Default for HtmlTextRenderer {
    fn default() -> Self {
        Self::new(ShortcodeRegistry::default())
    }
}

impl HtmlTextRenderer {
    pub fn new(shortcodes: ShortcodeRegistry) -> Self {
        Self {
            shortcodes,
            sanitizer: AmmoniaBuilder::default(),
        }
    }

    pub fn shortcodes(&self) -> &ShortcodeRegistry {
        &self.shortcodes
    }

    fn rewrite(&self, html: &str, options: StripOptions) -> Result<String, MarkupError> {
        rewrite_str(
            html,
            RewriteStrSettings {
                element_content_handlers: vec![
                    element!("h1, h2, h3, h4, h5, h6, div", |el| {
                        el.before(&BLOCK_OPEN.to_string(), ContentType::Html);
                        Ok(())
                    }),
                    element!("p", |el| {
                        el.before(&BLOCK_OPEN.to_string(), ContentType::Html);
                        el.after(&BLOCK_CLOSE.to_string(), ContentType::Html);
                        Ok(())
                    }),
                    element!("br, tr", |el| {
                        el.before(&LINE_BREAK.to_string(), ContentType::Html);
                        Ok(())
                    }),
                    element!("td", |el| {
                        el.after(&CELL_END.to_string(), ContentType::Html);
                        Ok(())
                    }),
                    element!("b, strong", move |el| {
                        if options.replace_bold_asterisk {
                            el.before("*", ContentType::Text);
                            el.after("*", ContentType::Text);
                        }
                        Ok(())
                    }),
                    element!("a", move |el| {
                        if options.preserve_links
                            && let Some(href) = el.get_attribute("href")
                        {
                            el.after(&format!(" [{href}]"), ContentType::Html);
                        }
                        Ok(())
                    }),
                    // attribute values arrive still entity-encoded; decoding happens once at the end
                    element!("img", move |el| {
                        match el.get_attribute("alt") {
                            Some(alt) if options.replace_images_with_alt => {
                                el.replace(&format!(" {alt} "), ContentType::Html);
                            }
                            _ => el.remove(),
                        }
                        Ok(())
                    }),
                    element!("*", |el| {
                        if !el.removed() {
                            el.remove_and_keep_content();
                        }
                        Ok(())
                    }),
                ],
                ..RewriteStrSettings::default()
            },
        )
        .map_err(|err| MarkupError::strip(err.to_string()))
    }
}

impl MarkupRenderer for HtmlTextRenderer {
    fn render_shortcodes(&self, markup: &str) -> Result<String, MarkupError> {
        self.shortcodes.render(markup)
    }

    fn strip_to_text(&self, markup: &str, options: &StripOptions) -> Result<String, MarkupError> {
        let markup = markup.replace(MARKERS, "");
        let sanitized = self.sanitizer.clean(&markup).to_string();
        let rewritten = self.rewrite(&sanitized, *options)?;
        let flattened = expand_markers(&rewritten, options.compress_whitespace);
        Ok(decode_entities(&flattened).into_owned())
    }
}

/// Turn structural markers into whitespace, optionally collapsing every
/// other whitespace run into one space first.
fn expand_markers(raw: &str, compress: bool) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    let mut pending_space = false;

    while let Some(ch) = chars.next() {
        match ch {
            BLOCK_OPEN => {
                pending_space = false;
                let kept = out.trim_end().len();
                out.truncate(kept);
                out.push_str("\n\n");
                skip_spaces(&mut chars, compress);
            }
            BLOCK_CLOSE => {
                flush_space(&mut out, &mut pending_space);
                out.push_str("\n\n");
            }
            LINE_BREAK => {
                flush_space(&mut out, &mut pending_space);
                out.push('\n');
                skip_spaces(&mut chars, compress);
            }
            CELL_END => {
                flush_space(&mut out, &mut pending_space);
                out.push_str(CELL_GAP);
                skip_spaces(&mut chars, compress);
            }
            ch if compress && ch.is_whitespace() => pending_space = true,
            ch => {
                flush_space(&mut out, &mut pending_space);
                out.push(ch);
            }
        }
    }
    flush_space(&mut out, &mut pending_space);
    out
}

fn skip_spaces(chars: &mut Peekable<Chars<'_>>, compress: bool) {
    while chars
        .next_if(|ch| *ch == ' ' || (compress && ch.is_whitespace()))
        .is_some()
    {}
}

fn flush_space(out: &mut String, pending: &mut bool) {
    if *pending {
        out.push(' ');
        *pending = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::text::collapse_blank_runs;

    fn strip(html: &str, options: StripOptions) -> String {
        let text = HtmlTextRenderer::default()
            .strip_to_text(html, &options)
            .unwrap();
        collapse_blank_runs(&text).trim().to_string()
    }

    fn defaults() -> StripOptions {
        StripOptions::default()
    }

    #[test]
    fn paragraphs_and_headings_become_blocks() {
        let text = strip(
            "<h2>Title</h2>\n<p>First   line</p>\n<p>Second<br>line</p>",
            defaults(),
        );
        assert_eq!(text, "Title\n\nFirst   line\n\nSecond\nline");
    }

    #[test]
    fn scripts_and_styles_are_dropped_with_their_content() {
        let text = strip(
            "<p>Kept</p><script>alert(1)</script><style>p{}</style>",
            defaults(),
        );
        assert_eq!(text, "Kept");
    }

    #[test]
    fn images_become_alt_text_unless_disabled() {
        let html = r#"<p>Look<img src="a.png" alt="a cat">here<img src="b.png"></p>"#;
        assert_eq!(strip(html, defaults()), "Look a cat here");

        let options = StripOptions {
            replace_images_with_alt: false,
            ..defaults()
        };
        assert_eq!(strip(html, options), "Lookhere");
    }

    #[test]
    fn attribute_text_is_decoded_exactly_once() {
        let html = r#"<p>Look<img src="a.png" alt="a &lt;b&gt; &amp; c">here</p>"#;
        assert_eq!(strip(html, defaults()), "Look a <b> & c here");

        let html = r#"<p><a href="https://example.com/?a=1&amp;b=2">q</a></p>"#;
        let options = StripOptions {
            preserve_links: true,
            ..defaults()
        };
        assert_eq!(strip(html, options), "q [https://example.com/?a=1&b=2]");
    }

    #[test]
    fn links_keep_targets_only_when_asked() {
        let html = r#"<p>See <a href="https://example.com/docs">docs</a>.</p>"#;
        assert_eq!(strip(html, defaults()), "See docs.");

        let options = StripOptions {
            preserve_links: true,
            ..defaults()
        };
        assert_eq!(strip(html, options), "See docs [https://example.com/docs].");
    }

    #[test]
    fn bold_text_can_be_wrapped_in_asterisks() {
        let options = StripOptions {
            replace_bold_asterisk: true,
            ..defaults()
        };
        assert_eq!(strip("<p><strong>Bold</strong> move</p>", options), "*Bold* move");
    }

    #[test]
    fn whitespace_compression_keeps_block_breaks() {
        let options = StripOptions {
            compress_whitespace: true,
            ..defaults()
        };
        let text = strip("<p>one\n   two</p>\n\n<p>  three  </p>", options);
        assert_eq!(text, "one two\n\nthree");
    }

    #[test]
    fn table_cells_are_spaced_and_rows_broken() {
        let text = strip(
            "<table><tr><td>a</td><td>b</td></tr><tr><td>c</td><td>d</td></tr></table>",
            defaults(),
        );
        assert_eq!(text, "a    b    \nc    d");
    }

    #[test]
    fn entities_are_decoded() {
        assert_eq!(
            strip("<p>Fish &amp; Chips &lt;3</p>", defaults()),
            "Fish & Chips <3"
        );
    }

    #[test]
    fn shortcodes_render_through_the_registry() {
        let renderer = HtmlTextRenderer::new(
            ShortcodeRegistry::new().with("name", |_call: &ShortcodeCall<'_>| {
                Ok("<b>Soffio</b>".to_string())
            }),
        );
        assert_eq!(
            renderer.render_shortcodes("Hi [name]!").unwrap(),
            "Hi <b>Soffio</b>!"
        );
    }
}
