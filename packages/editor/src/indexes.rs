//! # Derived Indexes
//!
//! Parent and depth lookups computed from a document snapshot.
//!
//! Indexes are never edited by hand. The engine rebuilds them in full after
//! any command that reports a structural change and reuses the previous
//! snapshot for prop and style edits.

use blockform_model::{NodeId, SlotId, TemplateDocument};
use std::collections::{HashMap, HashSet, VecDeque};
use thiserror::Error;
use tracing::instrument;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum IndexError {
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Cycle detected above node {0}")]
    Cycle(String),

    #[error("Node {0} is not connected to the root")]
    Disconnected(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentIndexes {
    pub root: NodeId,
    pub parent_slot_by_node_id: HashMap<NodeId, SlotId>,
    pub parent_node_by_node_id: HashMap<NodeId, NodeId>,
    pub node_by_slot_id: HashMap<SlotId, NodeId>,
    pub depth_by_node_id: HashMap<NodeId, usize>,
}

/// Walk every slot once for parent links, then breadth-first from the root
/// for depths.
#[instrument(skip(doc), fields(nodes = doc.nodes.len(), slots = doc.slots.len()))]
pub fn build_indexes(doc: &TemplateDocument) -> DocumentIndexes {
    let mut indexes = DocumentIndexes {
        root: doc.root.clone(),
        ..Default::default()
    };

    for slot in doc.slots.values() {
        indexes
            .node_by_slot_id
            .insert(slot.id.clone(), slot.node_id.clone());

        for child in &slot.children {
            indexes
                .parent_slot_by_node_id
                .insert(child.clone(), slot.id.clone());
            indexes
                .parent_node_by_node_id
                .insert(child.clone(), slot.node_id.clone());
        }
    }

    let mut queue = VecDeque::new();
    if doc.nodes.contains_key(&doc.root) {
        queue.push_back((doc.root.as_str(), 0usize));
    }

    while let Some((id, depth)) = queue.pop_front() {
        if indexes.depth_by_node_id.contains_key(id) {
            continue;
        }
        indexes.depth_by_node_id.insert(id.to_string(), depth);

        if let Some(node) = doc.node(id) {
            for slot in doc.slots_of(node) {
                for child in &slot.children {
                    queue.push_back((child.as_str(), depth + 1));
                }
            }
        }
    }

    indexes
}

/// Node IDs from the root down to `node_id`, both included
pub fn get_ancestor_path(indexes: &DocumentIndexes, node_id: &str) -> Result<Vec<NodeId>, IndexError> {
    let known = node_id == indexes.root
        || indexes.parent_node_by_node_id.contains_key(node_id)
        || indexes.depth_by_node_id.contains_key(node_id);
    if !known {
        return Err(IndexError::NodeNotFound(node_id.to_string()));
    }

    let mut path = vec![node_id.to_string()];
    let mut seen = HashSet::from([node_id]);
    let mut current = node_id;

    while current != indexes.root {
        let parent = indexes
            .parent_node_by_node_id
            .get(current)
            .ok_or_else(|| IndexError::Disconnected(node_id.to_string()))?;
        if !seen.insert(parent.as_str()) {
            return Err(IndexError::Cycle(node_id.to_string()));
        }
        path.push(parent.clone());
        current = parent.as_str();
    }

    path.reverse();
    Ok(path)
}

/// Whether `ancestor_id` sits strictly above `node_id`
pub fn is_ancestor(indexes: &DocumentIndexes, ancestor_id: &str, node_id: &str) -> bool {
    let mut seen = HashSet::new();
    let mut current = node_id;

    while let Some(parent) = indexes.parent_node_by_node_id.get(current) {
        if parent == ancestor_id {
            return true;
        }
        if !seen.insert(parent.as_str()) {
            return false;
        }
        current = parent.as_str();
    }

    false
}

pub fn get_node_depth(indexes: &DocumentIndexes, node_id: &str) -> Option<usize> {
    indexes.depth_by_node_id.get(node_id).copied()
}

/// Walk upward from `node_id` to the ancestor at depth `level`
///
/// A node already at or above `level` is returned unchanged.
pub fn find_ancestor_at_level(indexes: &DocumentIndexes, node_id: &str, level: usize) -> Option<NodeId> {
    let mut depth = get_node_depth(indexes, node_id)?;
    let mut current = node_id;

    while depth > level {
        current = indexes.parent_node_by_node_id.get(current)?.as_str();
        depth -= 1;
    }

    Some(current.to_string())
}
