//! Part descriptors and extracted part mappings.

use std::fmt;

use crate::domain::types::PartKind;

/// Prefix marking an accessor as a computed (method) part.
pub const METHOD_MARKER: &str = "->";

/// Where a part's value is read from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Accessor {
    /// A stored field or relation on the node.
    Field(String),
    /// A registered computed part, written `->name` in configuration.
    Method(String),
}

impl Accessor {
    /// Parse a configured accessor key.
    ///
    /// Empty and purely numeric keys are reserved and yield `None`, as does a
    /// bare method marker.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() || raw.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }

        match raw.strip_prefix(METHOD_MARKER) {
            Some(name) => {
                let name = name.trim();
                (!name.is_empty()).then(|| Accessor::Method(name.to_string()))
            }
            None => Some(Accessor::Field(raw.to_string())),
        }
    }

    /// Field or method name without the marker.
    pub fn name(&self) -> &str {
        match self {
            Accessor::Field(name) | Accessor::Method(name) => name.as_str(),
        }
    }

    pub fn is_method(&self) -> bool {
        matches!(self, Accessor::Method(_))
    }

    /// Key used in extracted part mappings, including the marker for methods.
    pub fn key(&self) -> String {
        match self {
            Accessor::Field(name) => name.clone(),
            Accessor::Method(name) => format!("{METHOD_MARKER}{name}"),
        }
    }
}

impl fmt::Display for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartEntry {
    pub accessor: Accessor,
    pub kind: PartKind,
}

/// Ordered mapping from accessor to part kind for one node type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartDescriptor {
    entries: Vec<PartEntry>,
}

impl PartDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from raw `(accessor, kind)` pairs, dropping reserved accessors.
    pub fn from_pairs<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, PartKind)>,
        K: AsRef<str>,
    {
        let mut descriptor = Self::new();
        for (raw, kind) in pairs {
            if let Some(accessor) = Accessor::parse(raw.as_ref()) {
                descriptor.insert(accessor, kind);
            }
        }
        descriptor
    }

    /// Insert an entry. A repeated accessor keeps its position and takes the new kind.
    pub fn insert(&mut self, accessor: Accessor, kind: PartKind) {
        match self
            .entries
            .iter_mut()
            .find(|entry| entry.accessor == accessor)
        {
            Some(existing) => existing.kind = kind,
            None => self.entries.push(PartEntry { accessor, kind }),
        }
    }

    pub fn with(mut self, raw: &str, kind: PartKind) -> Self {
        if let Some(accessor) = Accessor::parse(raw) {
            self.insert(accessor, kind);
        }
        self
    }

    pub fn entries(&self) -> &[PartEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Ordered mapping from accessor key to the fragment it produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedParts {
    entries: Vec<(String, Option<String>)>,
}

impl ExtractedParts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a fragment, replacing in place when the key already exists.
    pub fn set(&mut self, key: impl Into<String>, value: Option<String>) {
        let key = key.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Option<String>> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn remove(&mut self, key: &str) -> Option<Option<String>> {
        let index = self.entries.iter().position(|(existing, _)| existing == key)?;
        Some(self.entries.remove(index).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_deref()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Option<String>)> for ExtractedParts {
    fn from_iter<T: IntoIterator<Item = (K, Option<String>)>>(iter: T) -> Self {
        let mut parts = Self::new();
        for (key, value) in iter {
            parts.set(key, value);
        }
        parts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_accessors_are_rejected() {
        assert_eq!(Accessor::parse(""), None);
        assert_eq!(Accessor::parse("   "), None);
        assert_eq!(Accessor::parse("0"), None);
        assert_eq!(Accessor::parse("42"), None);
        assert_eq!(Accessor::parse("->"), None);
    }

    #[test]
    fn method_marker_selects_method_accessor() {
        let accessor = Accessor::parse("->summary").expect("method accessor");
        assert!(accessor.is_method());
        assert_eq!(accessor.name(), "summary");
        assert_eq!(accessor.key(), "->summary");

        let field = Accessor::parse("title").expect("field accessor");
        assert_eq!(field, Accessor::Field("title".into()));
        assert_eq!(field.key(), "title");
    }

    #[test]
    fn mixed_digit_names_are_fields() {
        assert_eq!(Accessor::parse("h1"), Some(Accessor::Field("h1".into())));
    }

    #[test]
    fn descriptor_preserves_insertion_order_and_skips_reserved() {
        let descriptor = PartDescriptor::from_pairs([
            ("title", PartKind::PlainString),
            ("", PartKind::PlainString),
            ("7", PartKind::RichMarkup),
            ("body", PartKind::RichMarkup),
            ("->summary", PartKind::PlainString),
        ]);

        let keys: Vec<String> = descriptor
            .entries()
            .iter()
            .map(|entry| entry.accessor.key())
            .collect();
        assert_eq!(keys, vec!["title", "body", "->summary"]);
    }

    #[test]
    fn repeated_accessor_keeps_first_position() {
        let descriptor = PartDescriptor::new()
            .with("title", PartKind::PlainString)
            .with("body", PartKind::PlainString)
            .with("title", PartKind::RichMarkup);

        assert_eq!(descriptor.len(), 2);
        assert_eq!(descriptor.entries()[0].kind, PartKind::RichMarkup);
        assert_eq!(descriptor.entries()[1].accessor.name(), "body");
    }

    #[test]
    fn extracted_parts_replace_in_place() {
        let mut parts = ExtractedParts::new();
        parts.set("title", None);
        parts.set("body", Some("Body".into()));
        parts.set("title", Some("Title".into()));

        let collected: Vec<_> = parts.iter().collect();
        assert_eq!(
            collected,
            vec![("title", Some("Title")), ("body", Some("Body"))]
        );
        assert_eq!(parts.remove("body"), Some(Some("Body".into())));
        assert!(!parts.contains_key("body"));
    }
}
