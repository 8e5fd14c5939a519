//! Plain-text assembly rules shared by the derivation engine.

use crate::domain::parts::ExtractedParts;

/// Separator placed between fragments of derived text.
pub const PART_SEPARATOR: &str = "\n\n";

/// Join the non-empty fragments of a node, in order.
pub fn assemble(parts: &ExtractedParts) -> Option<String> {
    join_fragments(parts.iter().map(|(_, value)| value))
}

/// Join non-empty fragments with [`PART_SEPARATOR`], or `None` when nothing remains.
pub fn join_fragments<I, S>(fragments: I) -> Option<String>
where
    I: IntoIterator<Item = Option<S>>,
    S: AsRef<str>,
{
    let mut joined = String::new();
    for fragment in fragments.into_iter().flatten() {
        let fragment = fragment.as_ref();
        if fragment.is_empty() {
            continue;
        }
        if !joined.is_empty() {
            joined.push_str(PART_SEPARATOR);
        }
        joined.push_str(fragment);
    }
    (!joined.is_empty()).then_some(joined)
}

/// Collapse runs of three or more newlines down to exactly two.
pub fn collapse_blank_runs(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut newlines = 0usize;
    for ch in text.chars() {
        if ch == '\n' {
            newlines += 1;
            if newlines <= 2 {
                out.push(ch);
            }
        } else {
            newlines = 0;
            out.push(ch);
        }
    }
    out
}

/// Trim surrounding whitespace, mapping an empty result to `None`.
pub fn non_empty_trimmed(text: Option<String>) -> Option<String> {
    let text = text?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() == text.len() {
        Some(text)
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assemble_skips_missing_parts() {
        let parts: ExtractedParts = [
            ("title", Some("A".to_string())),
            ("body", None),
            ("summary", Some("B".to_string())),
        ]
        .into_iter()
        .collect();

        assert_eq!(assemble(&parts).as_deref(), Some("A\n\nB"));
    }

    #[test]
    fn assemble_of_nothing_is_none() {
        let parts: ExtractedParts = [("title", None), ("body", Some(String::new()))]
            .into_iter()
            .collect();
        assert_eq!(assemble(&parts), None);
        assert_eq!(assemble(&ExtractedParts::new()), None);
    }

    #[test]
    fn collapse_blank_runs_keeps_paragraph_breaks() {
        assert_eq!(collapse_blank_runs("a\n\n\n\nb\nc\n\nd"), "a\n\nb\nc\n\nd");
    }

    #[test]
    fn non_empty_trimmed_drops_whitespace_only() {
        assert_eq!(non_empty_trimmed(Some("  \n ".into())), None);
        assert_eq!(non_empty_trimmed(Some(" x ".into())).as_deref(), Some("x"));
        assert_eq!(non_empty_trimmed(None), None);
    }
}
