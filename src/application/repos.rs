//! Repository traits describing persistence and content adapters.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::{FieldUpdate, NodeRef, PlainTextState};
use crate::domain::types::ContentStage;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Value produced by a computed part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartValue {
    Text(Option<String>),
    Node(Option<NodeRef>),
    Nodes(Vec<NodeRef>),
}

/// Persisted derivation columns, one row per node and stage.
#[async_trait]
pub trait PlainTextRepo: Send + Sync {
    /// Load the current state. A node without a stored row yields the default state.
    async fn load_state(
        &self,
        node: &NodeRef,
        stage: ContentStage,
    ) -> Result<PlainTextState, RepoError>;

    /// Apply the present fields of `update` in a single atomic write.
    async fn update_fields(
        &self,
        node: &NodeRef,
        stage: ContentStage,
        update: &FieldUpdate,
    ) -> Result<(), RepoError>;

    async fn purge(&self, node: &NodeRef, stage: ContentStage) -> Result<(), RepoError>;

    /// Nodes whose reset flag is set, oldest derivation first.
    async fn list_marked(
        &self,
        stage: ContentStage,
        limit: u32,
    ) -> Result<Vec<NodeRef>, RepoError>;
}

/// Read access to the host's typed field storage.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn field_text(
        &self,
        node: &NodeRef,
        stage: ContentStage,
        field: &str,
    ) -> Result<Option<String>, RepoError>;

    async fn related_node(
        &self,
        node: &NodeRef,
        stage: ContentStage,
        relation: &str,
    ) -> Result<Option<NodeRef>, RepoError>;

    async fn related_nodes(
        &self,
        node: &NodeRef,
        stage: ContentStage,
        relation: &str,
    ) -> Result<Vec<NodeRef>, RepoError>;
}

/// Parent/child edges used for invalidation and regeneration order.
///
/// Implementations must not return deleted nodes and must keep the graph acyclic.
#[async_trait]
pub trait DependencyGraph: Send + Sync {
    async fn parent_of(
        &self,
        node: &NodeRef,
        stage: ContentStage,
    ) -> Result<Option<NodeRef>, RepoError>;

    async fn children_of(
        &self,
        node: &NodeRef,
        stage: ContentStage,
    ) -> Result<Vec<NodeRef>, RepoError>;
}

/// A part computed by code rather than read from a stored field.
#[async_trait]
pub trait ComputedPart: Send + Sync {
    async fn compute(&self, node: &NodeRef, stage: ContentStage) -> Result<PartValue, RepoError>;
}
