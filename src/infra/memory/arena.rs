//! In-memory content graph for embedding hosts and tests.
//!
//! The arena is stage-agnostic: the same fields and edges answer for every
//! storage stage.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    application::repos::{ContentSource, DependencyGraph, RepoError},
    cache::lock::{rw_read, rw_write},
    domain::{entities::NodeRef, types::ContentStage},
};

const SOURCE: &str = "infra::memory::arena";

#[derive(Debug, Clone)]
struct ArenaNode {
    node: NodeRef,
    fields: HashMap<String, String>,
    relations: HashMap<String, Vec<Uuid>>,
    parent: Option<Uuid>,
    children: Vec<Uuid>,
}

impl ArenaNode {
    fn new(node: NodeRef) -> Self {
        Self {
            node,
            fields: HashMap::new(),
            relations: HashMap::new(),
            parent: None,
            children: Vec::new(),
        }
    }
}

#[derive(Debug, Default)]
pub struct ContentArena {
    nodes: RwLock<HashMap<Uuid, ArenaNode>>,
}

impl ContentArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node with a fresh id.
    pub fn create(&self, node_type: impl Into<String>) -> NodeRef {
        let node = NodeRef::new(Uuid::new_v4(), node_type);
        self.insert(node.clone());
        node
    }

    pub fn insert(&self, node: NodeRef) {
        rw_write(&self.nodes, SOURCE, "insert")
            .entry(node.id)
            .or_insert_with(|| ArenaNode::new(node));
    }

    pub fn contains(&self, node: &NodeRef) -> bool {
        rw_read(&self.nodes, SOURCE, "contains").contains_key(&node.id)
    }

    /// Set a field, returning whether the stored value changed.
    pub fn set_field(
        &self,
        node: &NodeRef,
        field: impl Into<String>,
        value: Option<String>,
    ) -> Result<bool, RepoError> {
        let mut nodes = rw_write(&self.nodes, SOURCE, "set_field");
        let entry = nodes.get_mut(&node.id).ok_or(RepoError::NotFound)?;
        let field = field.into();
        let previous = match value {
            Some(value) => entry.fields.insert(field.clone(), value),
            None => entry.fields.remove(&field),
        };
        Ok(previous.as_ref() != entry.fields.get(&field))
    }

    /// Replace the ordered targets of a relation.
    pub fn relate(
        &self,
        node: &NodeRef,
        relation: impl Into<String>,
        targets: &[NodeRef],
    ) -> Result<(), RepoError> {
        let mut nodes = rw_write(&self.nodes, SOURCE, "relate");
        let entry = nodes.get_mut(&node.id).ok_or(RepoError::NotFound)?;
        entry.relations.insert(
            relation.into(),
            targets.iter().map(|target| target.id).collect(),
        );
        Ok(())
    }

    /// Attach `child` under `parent`, detaching it from any previous parent.
    pub fn set_parent(&self, child: &NodeRef, parent: Option<&NodeRef>) -> Result<(), RepoError> {
        let mut nodes = rw_write(&self.nodes, SOURCE, "set_parent");
        if !nodes.contains_key(&child.id) {
            return Err(RepoError::NotFound);
        }
        if let Some(parent) = parent {
            if !nodes.contains_key(&parent.id) {
                return Err(RepoError::NotFound);
            }
            // the edge must not close a loop through the parent's ancestors
            let mut cursor = Some(parent.id);
            while let Some(id) = cursor {
                if id == child.id {
                    return Err(RepoError::InvalidInput {
                        message: format!(
                            "{child} cannot be placed under its own descendant {parent}"
                        ),
                    });
                }
                cursor = nodes.get(&id).and_then(|entry| entry.parent);
            }
        }

        let previous = nodes
            .get_mut(&child.id)
            .and_then(|entry| entry.parent.take());
        if let Some(previous) = previous
            && let Some(old_parent) = nodes.get_mut(&previous)
        {
            old_parent.children.retain(|id| *id != child.id);
        }

        if let Some(parent) = parent {
            if let Some(entry) = nodes.get_mut(&parent.id) {
                entry.children.push(child.id);
            }
            if let Some(entry) = nodes.get_mut(&child.id) {
                entry.parent = Some(parent.id);
            }
        }
        Ok(())
    }

    /// Remove a node. Its children become roots and relations to it dangle
    /// until they are read, where they are skipped.
    pub fn remove(&self, node: &NodeRef) -> bool {
        let mut nodes = rw_write(&self.nodes, SOURCE, "remove");
        let Some(removed) = nodes.remove(&node.id) else {
            return false;
        };
        if let Some(parent) = removed.parent
            && let Some(entry) = nodes.get_mut(&parent)
        {
            entry.children.retain(|id| *id != node.id);
        }
        for child in removed.children {
            if let Some(entry) = nodes.get_mut(&child) {
                entry.parent = None;
            }
        }
        true
    }

    fn resolve(nodes: &HashMap<Uuid, ArenaNode>, ids: &[Uuid]) -> Vec<NodeRef> {
        ids.iter()
            .filter_map(|id| nodes.get(id).map(|entry| entry.node.clone()))
            .collect()
    }
}

#[async_trait]
impl ContentSource for ContentArena {
    async fn field_text(
        &self,
        node: &NodeRef,
        _stage: ContentStage,
        field: &str,
    ) -> Result<Option<String>, RepoError> {
        let nodes = rw_read(&self.nodes, SOURCE, "field_text");
        Ok(nodes
            .get(&node.id)
            .and_then(|entry| entry.fields.get(field).cloned()))
    }

    async fn related_node(
        &self,
        node: &NodeRef,
        _stage: ContentStage,
        relation: &str,
    ) -> Result<Option<NodeRef>, RepoError> {
        let nodes = rw_read(&self.nodes, SOURCE, "related_node");
        let Some(ids) = nodes
            .get(&node.id)
            .and_then(|entry| entry.relations.get(relation))
        else {
            return Ok(None);
        };
        Ok(Self::resolve(&nodes, ids).into_iter().next())
    }

    async fn related_nodes(
        &self,
        node: &NodeRef,
        _stage: ContentStage,
        relation: &str,
    ) -> Result<Vec<NodeRef>, RepoError> {
        let nodes = rw_read(&self.nodes, SOURCE, "related_nodes");
        Ok(nodes
            .get(&node.id)
            .and_then(|entry| entry.relations.get(relation))
            .map(|ids| Self::resolve(&nodes, ids))
            .unwrap_or_default())
    }
}

#[async_trait]
impl DependencyGraph for ContentArena {
    async fn parent_of(
        &self,
        node: &NodeRef,
        _stage: ContentStage,
    ) -> Result<Option<NodeRef>, RepoError> {
        let nodes = rw_read(&self.nodes, SOURCE, "parent_of");
        Ok(nodes
            .get(&node.id)
            .and_then(|entry| entry.parent)
            .and_then(|parent| nodes.get(&parent))
            .map(|entry| entry.node.clone()))
    }

    async fn children_of(
        &self,
        node: &NodeRef,
        _stage: ContentStage,
    ) -> Result<Vec<NodeRef>, RepoError> {
        let nodes = rw_read(&self.nodes, SOURCE, "children_of");
        Ok(nodes
            .get(&node.id)
            .map(|entry| Self::resolve(&nodes, &entry.children))
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STAGE: ContentStage = ContentStage::Draft;

    #[tokio::test]
    async fn parent_and_children_stay_in_sync() {
        let arena = ContentArena::new();
        let page = arena.create("page");
        let first = arena.create("block");
        let second = arena.create("block");
        arena.set_parent(&first, Some(&page)).unwrap();
        arena.set_parent(&second, Some(&page)).unwrap();

        let children = arena.children_of(&page, STAGE).await.unwrap();
        assert_eq!(children, vec![first.clone(), second.clone()]);
        assert_eq!(arena.parent_of(&first, STAGE).await.unwrap(), Some(page.clone()));

        arena.set_parent(&first, None).unwrap();
        assert_eq!(arena.children_of(&page, STAGE).await.unwrap(), vec![second.clone()]);
        assert_eq!(arena.parent_of(&first, STAGE).await.unwrap(), None);
    }

    #[tokio::test]
    async fn removed_nodes_disappear_from_edges_and_relations() {
        let arena = ContentArena::new();
        let page = arena.create("page");
        let block = arena.create("block");
        arena.set_parent(&block, Some(&page)).unwrap();
        arena.relate(&page, "blocks", &[block.clone()]).unwrap();

        assert!(arena.remove(&block));
        assert!(!arena.remove(&block));
        assert!(arena.children_of(&page, STAGE).await.unwrap().is_empty());
        assert!(
            arena
                .related_nodes(&page, STAGE, "blocks")
                .await
                .unwrap()
                .is_empty()
        );
        assert_eq!(
            arena.related_node(&page, STAGE, "blocks").await.unwrap(),
            None
        );
    }

    #[test]
    fn set_field_reports_changes() {
        let arena = ContentArena::new();
        let page = arena.create("page");
        assert!(arena.set_field(&page, "title", Some("A".into())).unwrap());
        assert!(!arena.set_field(&page, "title", Some("A".into())).unwrap());
        assert!(arena.set_field(&page, "title", None).unwrap());

        let ghost = NodeRef::new(Uuid::new_v4(), "page");
        assert!(matches!(
            arena.set_field(&ghost, "title", None),
            Err(RepoError::NotFound)
        ));
    }

    #[test]
    fn a_node_cannot_parent_itself() {
        let arena = ContentArena::new();
        let page = arena.create("page");
        assert!(matches!(
            arena.set_parent(&page, Some(&page)),
            Err(RepoError::InvalidInput { .. })
        ));
    }

    #[tokio::test]
    async fn a_node_cannot_move_under_its_descendant() {
        let arena = ContentArena::new();
        let page = arena.create("page");
        let block = arena.create("block");
        let leaf = arena.create("block");
        arena.set_parent(&block, Some(&page)).unwrap();
        arena.set_parent(&leaf, Some(&block)).unwrap();

        assert!(matches!(
            arena.set_parent(&page, Some(&block)),
            Err(RepoError::InvalidInput { .. })
        ));
        assert!(matches!(
            arena.set_parent(&page, Some(&leaf)),
            Err(RepoError::InvalidInput { .. })
        ));

        // rejected moves leave the tree untouched
        assert_eq!(arena.parent_of(&page, STAGE).await.unwrap(), None);
        assert_eq!(arena.children_of(&block, STAGE).await.unwrap(), vec![leaf.clone()]);

        // moving a descendant sideways is still allowed
        arena.set_parent(&leaf, Some(&page)).unwrap();
        assert_eq!(arena.parent_of(&leaf, STAGE).await.unwrap(), Some(page.clone()));
    }
}
