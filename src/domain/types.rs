//! Shared domain enumerations aligned with persisted database enums.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Storage stage a derivation operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "content_stage", rename_all = "snake_case")]
pub enum ContentStage {
    Draft,
    Published,
}

impl ContentStage {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentStage::Draft => "draft",
            ContentStage::Published => "published",
        }
    }
}

impl fmt::Display for ContentStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How one configured part of a node contributes to its derived text.
///
/// Configuration spells kinds as `string`, `html`, `object` and `list`; any
/// other name is a custom kind handled by a registered provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PartKind {
    PlainString,
    RichMarkup,
    SingleNode,
    NodeList,
    Custom(String),
}

impl PartKind {
    pub fn as_str(&self) -> &str {
        match self {
            PartKind::PlainString => "string",
            PartKind::RichMarkup => "html",
            PartKind::SingleNode => "object",
            PartKind::NodeList => "list",
            PartKind::Custom(name) => name.as_str(),
        }
    }
}

impl From<&str> for PartKind {
    fn from(value: &str) -> Self {
        match value.trim() {
            "string" => PartKind::PlainString,
            "html" => PartKind::RichMarkup,
            "object" => PartKind::SingleNode,
            "list" => PartKind::NodeList,
            other => PartKind::Custom(other.to_string()),
        }
    }
}

impl From<String> for PartKind {
    fn from(value: String) -> Self {
        PartKind::from(value.as_str())
    }
}

impl From<PartKind> for String {
    fn from(kind: PartKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for PartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
