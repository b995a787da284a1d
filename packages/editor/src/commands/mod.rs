//! # Commands
//!
//! Pure document edits. Each command validates against the registry and the
//! current indexes, then produces a brand-new document together with the
//! command that reverses it.
//!
//! ## Semantics
//!
//! ### Structural
//! - `InsertNode` splices a node (and any pre-built descendants) into a slot;
//!   out-of-range indexes append
//! - `RemoveNode` drops the node's whole subtree and captures it, so the
//!   inverse insert restores every descendant exactly
//! - `MoveNode` relocates a node; the index is taken after the node has left
//!   its current slot. Moving into itself or a descendant is refused
//! - `AddColumnSlot` / `RemoveColumnSlot` grow or shrink multi-slot nodes
//!   together with their size entries
//!
//! ### Properties
//! - Props, styles, presets and document-level overrides are replaced
//!   wholesale; the inverse carries the previous value
//!
//! A failed command never touches the input document.

pub(crate) mod columns;

use crate::indexes::{is_ancestor, DocumentIndexes};
use crate::registry::{ComponentCommandContext, ComponentRegistry};
use blockform_model::{
    Node, NodeId, PageSettingsOverride, Slot, SlotId, StyleMap, TemplateDocument,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::{debug, instrument};

pub use columns::RemovedColumn;

/// Document edits (closed set; component-specific edits go through
/// `Component`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Command {
    #[serde(rename_all = "camelCase")]
    InsertNode {
        slot_id: SlotId,
        #[serde(default)]
        index: Option<usize>,
        node: Node,
        #[serde(default)]
        slots: Vec<Slot>,
        #[serde(default)]
        extra_nodes: Vec<Node>,
        #[serde(default)]
        extra_slots: Vec<Slot>,
    },

    #[serde(rename_all = "camelCase")]
    RemoveNode { node_id: NodeId },

    #[serde(rename_all = "camelCase")]
    MoveNode {
        node_id: NodeId,
        target_slot_id: SlotId,
        #[serde(default)]
        index: Option<usize>,
    },

    #[serde(rename_all = "camelCase")]
    UpdateNodeProps {
        node_id: NodeId,
        #[serde(default)]
        props: Option<Value>,
    },

    #[serde(rename_all = "camelCase")]
    UpdateNodeStyles {
        node_id: NodeId,
        #[serde(default)]
        styles: Option<StyleMap>,
    },

    #[serde(rename_all = "camelCase")]
    SetStylePreset {
        node_id: NodeId,
        #[serde(default)]
        preset: Option<String>,
    },

    UpdateDocumentStyles {
        #[serde(default)]
        styles: Option<StyleMap>,
    },

    UpdatePageSettings {
        #[serde(default)]
        settings: Option<PageSettingsOverride>,
    },

    /// Append a slot, or put back a previously removed one
    #[serde(rename_all = "camelCase")]
    AddColumnSlot {
        node_id: NodeId,
        #[serde(default)]
        slot_id: Option<SlotId>,
        #[serde(default)]
        restore: Option<Box<RemovedColumn>>,
    },

    /// Remove the given slot, or the last one
    #[serde(rename_all = "camelCase")]
    RemoveColumnSlot {
        node_id: NodeId,
        #[serde(default)]
        slot_id: Option<SlotId>,
    },

    /// Command owned by a registered component type
    #[serde(rename_all = "camelCase")]
    Component {
        command_type: String,
        #[serde(default)]
        payload: Value,
    },
}

impl Command {
    /// Stable label used in logs and undo descriptions
    pub fn name(&self) -> &str {
        match self {
            Command::InsertNode { .. } => "insert-node",
            Command::RemoveNode { .. } => "remove-node",
            Command::MoveNode { .. } => "move-node",
            Command::UpdateNodeProps { .. } => "update-node-props",
            Command::UpdateNodeStyles { .. } => "update-node-styles",
            Command::SetStylePreset { .. } => "set-style-preset",
            Command::UpdateDocumentStyles { .. } => "update-document-styles",
            Command::UpdatePageSettings { .. } => "update-page-settings",
            Command::AddColumnSlot { .. } => "add-column-slot",
            Command::RemoveColumnSlot { .. } => "remove-column-slot",
            Command::Component { command_type, .. } => command_type,
        }
    }

    /// Whether applying this command always changes the tree shape
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Command::InsertNode { .. }
                | Command::RemoveNode { .. }
                | Command::MoveNode { .. }
                | Command::AddColumnSlot { .. }
                | Command::RemoveColumnSlot { .. }
        )
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommandError {
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Slot not found: {0}")]
    SlotNotFound(String),

    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),

    #[error("'{parent}' cannot contain '{child}'")]
    DisallowedChild { parent: String, child: String },

    #[error("Node ID already in use: {0}")]
    DuplicateNodeId(String),

    #[error("Slot ID already in use: {0}")]
    DuplicateSlotId(String),

    #[error("The root node cannot be removed or moved")]
    CannotRemoveRoot,

    #[error("Node {0} has no parent slot")]
    NoParentSlot(String),

    #[error("Would create cycle")]
    CycleDetected,

    #[error("Node type '{0}' does not support column slots")]
    NotMultiSlot(String),

    #[error("Cannot remove the last column of {0}")]
    LastColumn(String),

    #[error("Slot {slot} does not belong to node {node}")]
    SlotNotOwned { slot: String, node: String },

    #[error("Insert rejected: {0}")]
    InsertRejected(String),

    #[error("Invalid command: {0}")]
    Invalid(String),
}

impl CommandError {
    /// Message surfaced to the UI
    pub fn message(&self) -> String {
        self.to_string()
    }
}

/// Successful command application
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    pub doc: TemplateDocument,
    pub inverse: Command,
    pub structure_changed: bool,
}

/// A node together with every node and slot below it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CapturedSubtree {
    /// Subtree root first, then descendants depth-first
    pub nodes: Vec<Node>,

    /// Every slot owned by a captured node
    pub slots: Vec<Slot>,
}

/// Collect a subtree depth-first. Missing references are skipped and each
/// node is visited once, so a damaged document cannot loop forever.
pub fn collect_subtree(doc: &TemplateDocument, node_id: &str) -> CapturedSubtree {
    let mut captured = CapturedSubtree::default();
    let mut seen = HashSet::new();
    let mut stack = vec![node_id.to_string()];

    while let Some(id) = stack.pop() {
        if !seen.insert(id.clone()) {
            continue;
        }
        let Some(node) = doc.node(&id) else {
            continue;
        };

        let mut children = Vec::new();
        for slot in doc.slots_of(node) {
            captured.slots.push(slot.clone());
            children.extend(slot.children.iter().cloned());
        }
        // Reverse so the first child is popped first
        stack.extend(children.into_iter().rev());
        captured.nodes.push(node.clone());
    }

    captured
}

/// Apply a command to a document snapshot
///
/// Returns the new document and the inverse command, or the validation
/// error that prevented the edit. The input document is never modified.
#[instrument(skip_all, fields(command = command.name()))]
pub fn apply_command(
    doc: &TemplateDocument,
    indexes: &DocumentIndexes,
    command: &Command,
    registry: &ComponentRegistry,
) -> Result<CommandOutcome, CommandError> {
    let outcome = match command {
        Command::InsertNode {
            slot_id,
            index,
            node,
            slots,
            extra_nodes,
            extra_slots,
        } => insert_node(doc, registry, slot_id, *index, node, slots, extra_nodes, extra_slots),

        Command::RemoveNode { node_id } => remove_node(doc, indexes, node_id),

        Command::MoveNode {
            node_id,
            target_slot_id,
            index,
        } => move_node(doc, indexes, registry, node_id, target_slot_id, *index),

        Command::UpdateNodeProps { node_id, props } => {
            update_node_props(doc, registry, node_id, props.as_ref())
        }

        Command::UpdateNodeStyles { node_id, styles } => {
            let mut next = doc.clone();
            let node = node_mut(&mut next, node_id)?;
            let previous = std::mem::replace(&mut node.styles, styles.clone());
            Ok(property_outcome(
                next,
                Command::UpdateNodeStyles {
                    node_id: node_id.clone(),
                    styles: previous,
                },
            ))
        }

        Command::SetStylePreset { node_id, preset } => {
            let mut next = doc.clone();
            let node = node_mut(&mut next, node_id)?;
            let previous = std::mem::replace(&mut node.style_preset, preset.clone());
            Ok(property_outcome(
                next,
                Command::SetStylePreset {
                    node_id: node_id.clone(),
                    preset: previous,
                },
            ))
        }

        Command::UpdateDocumentStyles { styles } => {
            let mut next = doc.clone();
            let previous = std::mem::replace(&mut next.document_styles_override, styles.clone());
            Ok(property_outcome(
                next,
                Command::UpdateDocumentStyles { styles: previous },
            ))
        }

        Command::UpdatePageSettings { settings } => {
            let mut next = doc.clone();
            let previous = std::mem::replace(&mut next.page_settings_override, settings.clone());
            Ok(property_outcome(
                next,
                Command::UpdatePageSettings { settings: previous },
            ))
        }

        Command::AddColumnSlot {
            node_id,
            slot_id,
            restore,
        } => columns::add_column_slot(doc, registry, node_id, slot_id.as_deref(), restore.as_deref()),

        Command::RemoveColumnSlot { node_id, slot_id } => {
            columns::remove_column_slot(doc, registry, node_id, slot_id.as_deref())
        }

        Command::Component {
            command_type,
            payload,
        } => {
            let handler = match registry.command_handler(command_type) {
                Some(handler) => handler,
                None => panic!(
                    "no component registered a handler for command '{}'",
                    command_type
                ),
            };
            handler.handle_command(
                ComponentCommandContext {
                    doc,
                    indexes,
                    registry,
                },
                command_type,
                payload,
            )
        }
    }?;

    debug!(
        structure_changed = outcome.structure_changed,
        inverse = outcome.inverse.name(),
        "Command applied"
    );
    Ok(outcome)
}

fn property_outcome(doc: TemplateDocument, inverse: Command) -> CommandOutcome {
    CommandOutcome {
        doc,
        inverse,
        structure_changed: false,
    }
}

pub(crate) fn node_mut<'a>(doc: &'a mut TemplateDocument, node_id: &str) -> Result<&'a mut Node, CommandError> {
    doc.nodes
        .get_mut(node_id)
        .ok_or_else(|| CommandError::NodeNotFound(node_id.to_string()))
}

pub(crate) fn slot_mut<'a>(doc: &'a mut TemplateDocument, slot_id: &str) -> Result<&'a mut Slot, CommandError> {
    doc.slots
        .get_mut(slot_id)
        .ok_or_else(|| CommandError::SlotNotFound(slot_id.to_string()))
}

/// Refuse any node or slot ID that is taken or repeated within the batch
pub(crate) fn ensure_ids_unused<'a>(
    doc: &TemplateDocument,
    nodes: impl IntoIterator<Item = &'a Node>,
    slots: impl IntoIterator<Item = &'a Slot>,
) -> Result<(), CommandError> {
    let mut node_ids = HashSet::new();
    for node in nodes {
        if doc.nodes.contains_key(&node.id) || !node_ids.insert(node.id.as_str()) {
            return Err(CommandError::DuplicateNodeId(node.id.clone()));
        }
    }

    let mut slot_ids = HashSet::new();
    for slot in slots {
        if doc.slots.contains_key(&slot.id) || !slot_ids.insert(slot.id.as_str()) {
            return Err(CommandError::DuplicateSlotId(slot.id.clone()));
        }
    }

    Ok(())
}

/// Check that nodes and slots arriving together form a well-linked tree
///
/// Every supplied slot belongs to an incoming node that lists it, or to one
/// of the existing `anchors`. Every incoming node other than the `roots`
/// sits in exactly one supplied slot, under a parent that may contain it.
pub(crate) fn check_incoming_subtree<'a>(
    registry: &ComponentRegistry,
    anchors: &[&Node],
    nodes: impl IntoIterator<Item = &'a Node>,
    slots: impl IntoIterator<Item = &'a Slot>,
    roots: &[&str],
) -> Result<(), CommandError> {
    let incoming: HashMap<&str, &Node> = nodes.into_iter().map(|n| (n.id.as_str(), n)).collect();
    let supplied: HashMap<&str, &Slot> = slots.into_iter().map(|s| (s.id.as_str(), s)).collect();

    for node in incoming.values() {
        if !registry.contains(&node.node_type) {
            return Err(CommandError::UnknownNodeType(node.node_type.clone()));
        }
        for slot_id in &node.slots {
            match supplied.get(slot_id.as_str()) {
                Some(slot) if slot.node_id == node.id => {}
                _ => {
                    return Err(CommandError::SlotNotOwned {
                        slot: slot_id.clone(),
                        node: node.id.clone(),
                    })
                }
            }
        }
    }

    let mut placements: HashMap<&str, usize> = HashMap::new();
    for slot in supplied.values() {
        let owner = match incoming.get(slot.node_id.as_str()) {
            Some(owner) => {
                if !owner.slots.contains(&slot.id) {
                    return Err(CommandError::Invalid(format!(
                        "slot '{}' is not listed by its owner '{}'",
                        slot.id, owner.id
                    )));
                }
                *owner
            }
            None => anchors
                .iter()
                .copied()
                .find(|anchor| anchor.id == slot.node_id)
                .ok_or_else(|| CommandError::SlotNotOwned {
                    slot: slot.id.clone(),
                    node: slot.node_id.clone(),
                })?,
        };

        for child_id in &slot.children {
            let child = incoming
                .get(child_id.as_str())
                .filter(|_| !roots.contains(&child_id.as_str()))
                .ok_or_else(|| {
                    CommandError::Invalid(format!(
                        "slot '{}' holds '{}', which does not arrive with it",
                        slot.id, child_id
                    ))
                })?;
            if !registry.can_contain(&owner.node_type, &child.node_type) {
                return Err(CommandError::DisallowedChild {
                    parent: owner.node_type.clone(),
                    child: child.node_type.clone(),
                });
            }
            *placements.entry(child_id.as_str()).or_default() += 1;
        }
    }

    for id in incoming.keys().filter(|id| !roots.contains(*id)) {
        match placements.get(id).copied().unwrap_or(0) {
            1 => {}
            0 => return Err(CommandError::Invalid(format!("node '{}' is not placed in any slot", id))),
            _ => return Err(CommandError::Invalid(format!("node '{}' is placed in more than one slot", id))),
        }
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn insert_node(
    doc: &TemplateDocument,
    registry: &ComponentRegistry,
    slot_id: &str,
    index: Option<usize>,
    node: &Node,
    slots: &[Slot],
    extra_nodes: &[Node],
    extra_slots: &[Slot],
) -> Result<CommandOutcome, CommandError> {
    let target = doc
        .slot(slot_id)
        .ok_or_else(|| CommandError::SlotNotFound(slot_id.to_string()))?;
    let parent = doc
        .node(&target.node_id)
        .ok_or_else(|| CommandError::NodeNotFound(target.node_id.clone()))?;

    let definition = registry
        .get(&node.node_type)
        .ok_or_else(|| CommandError::UnknownNodeType(node.node_type.clone()))?;
    if !registry.can_contain(&parent.node_type, &node.node_type) {
        return Err(CommandError::DisallowedChild {
            parent: parent.node_type.clone(),
            child: node.node_type.clone(),
        });
    }

    ensure_ids_unused(
        doc,
        std::iter::once(node).chain(extra_nodes),
        slots.iter().chain(extra_slots),
    )?;

    check_incoming_subtree(
        registry,
        &[],
        std::iter::once(node).chain(extra_nodes),
        slots.iter().chain(extra_slots),
        &[node.id.as_str()],
    )?;

    if let Some(hooks) = &definition.hooks {
        hooks
            .on_before_insert(node, &parent.node_type)
            .map_err(CommandError::InsertRejected)?;
    }

    let mut next = doc.clone();
    for n in std::iter::once(node).chain(extra_nodes) {
        next.nodes.insert(n.id.clone(), n.clone());
    }
    for s in slots.iter().chain(extra_slots) {
        next.slots.insert(s.id.clone(), s.clone());
    }

    let children = &mut slot_mut(&mut next, slot_id)?.children;
    let position = index.map_or(children.len(), |i| i.min(children.len()));
    children.insert(position, node.id.clone());

    Ok(CommandOutcome {
        doc: next,
        inverse: Command::RemoveNode {
            node_id: node.id.clone(),
        },
        structure_changed: true,
    })
}

/// Locate a node's parent slot and its position there
fn parent_position(
    doc: &TemplateDocument,
    indexes: &DocumentIndexes,
    node_id: &str,
) -> Result<(SlotId, usize), CommandError> {
    let slot_id = indexes
        .parent_slot_by_node_id
        .get(node_id)
        .ok_or_else(|| CommandError::NoParentSlot(node_id.to_string()))?;
    let position = doc
        .slot(slot_id)
        .and_then(|slot| slot.children.iter().position(|c| c == node_id))
        .ok_or_else(|| CommandError::NoParentSlot(node_id.to_string()))?;
    Ok((slot_id.clone(), position))
}

fn remove_node(
    doc: &TemplateDocument,
    indexes: &DocumentIndexes,
    node_id: &str,
) -> Result<CommandOutcome, CommandError> {
    if !doc.nodes.contains_key(node_id) {
        return Err(CommandError::NodeNotFound(node_id.to_string()));
    }
    if node_id == doc.root {
        return Err(CommandError::CannotRemoveRoot);
    }
    let (parent_slot_id, position) = parent_position(doc, indexes, node_id)?;

    let CapturedSubtree { mut nodes, slots } = collect_subtree(doc, node_id);
    let removed = nodes.remove(0);
    let (own_slots, descendant_slots): (Vec<Slot>, Vec<Slot>) =
        slots.into_iter().partition(|s| s.node_id == removed.id);

    let mut next = doc.clone();
    slot_mut(&mut next, &parent_slot_id)?.children.remove(position);
    next.nodes.remove(&removed.id);
    for n in &nodes {
        next.nodes.remove(&n.id);
    }
    for s in own_slots.iter().chain(&descendant_slots) {
        next.slots.remove(&s.id);
    }

    Ok(CommandOutcome {
        doc: next,
        inverse: Command::InsertNode {
            slot_id: parent_slot_id,
            index: Some(position),
            node: removed,
            slots: own_slots,
            extra_nodes: nodes,
            extra_slots: descendant_slots,
        },
        structure_changed: true,
    })
}

fn move_node(
    doc: &TemplateDocument,
    indexes: &DocumentIndexes,
    registry: &ComponentRegistry,
    node_id: &str,
    target_slot_id: &str,
    index: Option<usize>,
) -> Result<CommandOutcome, CommandError> {
    let node = doc
        .node(node_id)
        .ok_or_else(|| CommandError::NodeNotFound(node_id.to_string()))?;
    if node_id == doc.root {
        return Err(CommandError::CannotRemoveRoot);
    }
    let target = doc
        .slot(target_slot_id)
        .ok_or_else(|| CommandError::SlotNotFound(target_slot_id.to_string()))?;

    // The target's owner must not be the moved node or anything below it
    if target.node_id == node_id || is_ancestor(indexes, node_id, &target.node_id) {
        return Err(CommandError::CycleDetected);
    }

    let owner = doc
        .node(&target.node_id)
        .ok_or_else(|| CommandError::NodeNotFound(target.node_id.clone()))?;
    if !registry.can_contain(&owner.node_type, &node.node_type) {
        return Err(CommandError::DisallowedChild {
            parent: owner.node_type.clone(),
            child: node.node_type.clone(),
        });
    }
    if let Some(hooks) = registry.get(&node.node_type).and_then(|d| d.hooks.as_ref()) {
        hooks
            .on_before_insert(node, &owner.node_type)
            .map_err(CommandError::InsertRejected)?;
    }

    let (source_slot_id, source_position) = parent_position(doc, indexes, node_id)?;

    let mut next = doc.clone();
    slot_mut(&mut next, &source_slot_id)?
        .children
        .remove(source_position);
    let children = &mut slot_mut(&mut next, target_slot_id)?.children;
    let position = index.map_or(children.len(), |i| i.min(children.len()));
    children.insert(position, node_id.to_string());

    Ok(CommandOutcome {
        doc: next,
        inverse: Command::MoveNode {
            node_id: node_id.to_string(),
            target_slot_id: source_slot_id,
            index: Some(source_position),
        },
        structure_changed: true,
    })
}

fn update_node_props(
    doc: &TemplateDocument,
    registry: &ComponentRegistry,
    node_id: &str,
    props: Option<&Value>,
) -> Result<CommandOutcome, CommandError> {
    let mut next = doc.clone();
    let node = node_mut(&mut next, node_id)?;

    let hooks = registry
        .get(&node.node_type)
        .and_then(|definition| definition.hooks.clone());
    let incoming = props.cloned();
    let incoming = match &hooks {
        Some(hooks) => hooks.on_prop_change(node.props.as_ref(), incoming),
        None => incoming,
    };

    let previous = std::mem::replace(&mut node.props, incoming);
    Ok(property_outcome(
        next,
        Command::UpdateNodeProps {
            node_id: node_id.to_string(),
            props: previous,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::builtin_registry;
    use crate::indexes::{build_indexes, get_ancestor_path};
    use blockform_common::IdGenerator;
    use serde_json::json;

    struct Fixture {
        doc: TemplateDocument,
        registry: ComponentRegistry,
        ids: IdGenerator,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                doc: TemplateDocument::with_root("root", "root-body"),
                registry: builtin_registry(),
                ids: IdGenerator::from_seed("t"),
            }
        }

        fn apply(&mut self, command: &Command) -> Result<CommandOutcome, CommandError> {
            let indexes = build_indexes(&self.doc);
            let outcome = apply_command(&self.doc, &indexes, command, &self.registry)?;
            self.doc = outcome.doc.clone();
            Ok(outcome)
        }

        fn insert(&mut self, node_type: &str, slot_id: &str, props: Option<Value>) -> NodeId {
            let created = self
                .registry
                .create_node(node_type, props.as_ref(), &mut self.ids)
                .unwrap();
            let id = created.node.id.clone();
            self.apply(&created.into_insert(slot_id, None)).unwrap();
            id
        }

        fn body_of(&self, node_id: &str) -> SlotId {
            self.doc.node(node_id).unwrap().slots[0].clone()
        }
    }

    #[test]
    fn test_command_serialization() {
        let command = Command::MoveNode {
            node_id: "text-1".to_string(),
            target_slot_id: "box-body".to_string(),
            index: Some(2),
        };

        let json = serde_json::to_value(&command).unwrap();
        assert_eq!(
            json,
            json!({ "type": "MoveNode", "nodeId": "text-1", "targetSlotId": "box-body", "index": 2 })
        );

        let parsed: Command = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, command);
    }

    #[test]
    fn test_insert_appends_when_index_out_of_range() {
        let mut fx = Fixture::new();
        let first = fx.insert("text", "root-body", None);

        let created = fx.registry.create_node("text", None, &mut fx.ids).unwrap();
        let second = created.node.id.clone();
        let outcome = fx.apply(&created.into_insert("root-body", Some(99))).unwrap();

        assert!(outcome.structure_changed);
        assert_eq!(fx.doc.slot("root-body").unwrap().children, vec![first, second.clone()]);
        assert_eq!(outcome.inverse, Command::RemoveNode { node_id: second });
    }

    #[test]
    fn test_insert_rejects_disallowed_child() {
        let mut fx = Fixture::new();
        let text = fx.insert("text", "root-body", None);
        let table = fx.insert("table", "root-body", None);
        let before = fx.doc.clone();

        let created = fx.registry.create_node("text", None, &mut fx.ids).unwrap();
        let table_body = fx.doc.node(&table).unwrap().slots[1].clone();
        let err = fx.apply(&created.into_insert(table_body, None)).unwrap_err();

        assert_eq!(
            err,
            CommandError::DisallowedChild {
                parent: "table".to_string(),
                child: "text".to_string()
            }
        );
        assert_eq!(fx.doc, before);
        assert!(fx.doc.node(&text).is_some());
    }

    #[test]
    fn test_insert_rejects_missing_slot_and_duplicate_id() {
        let mut fx = Fixture::new();
        let text = fx.insert("text", "root-body", None);

        let created = fx.registry.create_node("text", None, &mut fx.ids).unwrap();
        let err = fx.apply(&created.into_insert("nowhere", None)).unwrap_err();
        assert_eq!(err, CommandError::SlotNotFound("nowhere".to_string()));

        let duplicate = Command::InsertNode {
            slot_id: "root-body".to_string(),
            index: None,
            node: Node::new(text.clone(), "text"),
            slots: vec![],
            extra_nodes: vec![],
            extra_slots: vec![],
        };
        assert_eq!(fx.apply(&duplicate).unwrap_err(), CommandError::DuplicateNodeId(text));
    }

    #[test]
    fn test_insert_rejects_unknown_type() {
        let mut fx = Fixture::new();
        let command = Command::InsertNode {
            slot_id: "root-body".to_string(),
            index: None,
            node: Node::new("chart-1", "chart"),
            slots: vec![],
            extra_nodes: vec![],
            extra_slots: vec![],
        };

        assert_eq!(
            fx.apply(&command).unwrap_err(),
            CommandError::UnknownNodeType("chart".to_string())
        );
    }

    #[test]
    fn test_remove_then_inverse_restores_nested_subtree() {
        let mut fx = Fixture::new();
        let outer = fx.insert("container", "root-body", None);
        let inner = fx.insert("container", &fx.body_of(&outer), None);
        fx.insert("text", &fx.body_of(&inner), Some(json!({ "content": "deep" })));
        fx.insert("text", "root-body", None);
        let original = fx.doc.clone();

        let outcome = fx.apply(&Command::RemoveNode { node_id: outer.clone() }).unwrap();
        assert_eq!(fx.doc.nodes.len(), 2);
        assert_eq!(fx.doc.slots.len(), 1);

        match &outcome.inverse {
            Command::InsertNode { index, extra_nodes, extra_slots, .. } => {
                assert_eq!(*index, Some(0));
                assert_eq!(extra_nodes.len(), 2);
                assert_eq!(extra_slots.len(), 1);
            }
            other => panic!("unexpected inverse {:?}", other),
        }

        fx.apply(&outcome.inverse).unwrap();
        assert_eq!(fx.doc, original);
    }

    #[test]
    fn test_remove_root_is_refused() {
        let mut fx = Fixture::new();
        assert_eq!(
            fx.apply(&Command::RemoveNode { node_id: "root".to_string() }).unwrap_err(),
            CommandError::CannotRemoveRoot
        );
    }

    #[test]
    fn test_move_into_self_or_descendant_is_refused() {
        let mut fx = Fixture::new();
        let outer = fx.insert("container", "root-body", None);
        let inner = fx.insert("container", &fx.body_of(&outer), None);
        let before = fx.doc.clone();

        for target in [fx.body_of(&outer), fx.body_of(&inner)] {
            let err = fx
                .apply(&Command::MoveNode {
                    node_id: outer.clone(),
                    target_slot_id: target,
                    index: None,
                })
                .unwrap_err();
            assert_eq!(err, CommandError::CycleDetected);
            assert_eq!(fx.doc, before);
        }
    }

    #[test]
    fn test_move_within_same_slot_and_back() {
        let mut fx = Fixture::new();
        let a = fx.insert("text", "root-body", None);
        let b = fx.insert("text", "root-body", None);
        let c = fx.insert("text", "root-body", None);
        let original = fx.doc.clone();

        let outcome = fx
            .apply(&Command::MoveNode {
                node_id: a.clone(),
                target_slot_id: "root-body".to_string(),
                index: Some(2),
            })
            .unwrap();
        assert_eq!(fx.doc.slot("root-body").unwrap().children, vec![b, c, a]);

        fx.apply(&outcome.inverse).unwrap();
        assert_eq!(fx.doc, original);
    }

    #[test]
    fn test_move_updates_depth() {
        let mut fx = Fixture::new();
        let outer = fx.insert("container", "root-body", None);
        let text = fx.insert("text", "root-body", None);

        fx.apply(&Command::MoveNode {
            node_id: text.clone(),
            target_slot_id: fx.body_of(&outer),
            index: Some(0),
        })
        .unwrap();

        let indexes = build_indexes(&fx.doc);
        assert_eq!(indexes.depth_by_node_id[&text], 2);
        assert_eq!(get_ancestor_path(&indexes, &text).unwrap(), vec!["root".to_string(), outer, text]);
    }

    #[test]
    fn test_update_props_inverse_carries_previous_value() {
        let mut fx = Fixture::new();
        let text = fx.insert("text", "root-body", None);
        let before = fx.doc.node(&text).unwrap().props.clone();

        let outcome = fx
            .apply(&Command::UpdateNodeProps {
                node_id: text.clone(),
                props: Some(json!({ "content": "Total" })),
            })
            .unwrap();

        assert!(!outcome.structure_changed);
        assert_eq!(fx.doc.node(&text).unwrap().prop("content"), Some(&json!("Total")));
        assert_eq!(
            outcome.inverse,
            Command::UpdateNodeProps { node_id: text, props: before }
        );
    }

    #[test]
    fn test_update_props_with_current_value_round_trips() {
        let mut fx = Fixture::new();
        let text = fx.insert("text", "root-body", Some(json!({ "content": "Same" })));
        let original = fx.doc.clone();
        let current = fx.doc.node(&text).unwrap().props.clone();

        let outcome = fx
            .apply(&Command::UpdateNodeProps { node_id: text, props: current })
            .unwrap();
        assert_eq!(fx.doc, original);

        fx.apply(&outcome.inverse).unwrap();
        assert_eq!(fx.doc, original);
    }

    #[test]
    fn test_style_and_override_commands_swap_values() {
        let mut fx = Fixture::new();
        let text = fx.insert("text", "root-body", None);

        let styles = StyleMap::from([("color".to_string(), json!("red"))]);
        let outcome = fx
            .apply(&Command::UpdateNodeStyles { node_id: text.clone(), styles: Some(styles.clone()) })
            .unwrap();
        assert_eq!(fx.doc.node(&text).unwrap().styles, Some(styles));
        assert_eq!(outcome.inverse, Command::UpdateNodeStyles { node_id: text.clone(), styles: None });

        let outcome = fx
            .apply(&Command::SetStylePreset { node_id: text.clone(), preset: Some("heading".into()) })
            .unwrap();
        assert_eq!(outcome.inverse, Command::SetStylePreset { node_id: text, preset: None });

        let settings = PageSettingsOverride { background_color: Some("#fff".into()), ..Default::default() };
        let outcome = fx
            .apply(&Command::UpdatePageSettings { settings: Some(settings.clone()) })
            .unwrap();
        assert_eq!(fx.doc.page_settings_override, Some(settings));
        assert_eq!(outcome.inverse, Command::UpdatePageSettings { settings: None });
    }

    #[test]
    fn test_property_commands_require_existing_node() {
        let mut fx = Fixture::new();
        let err = fx
            .apply(&Command::UpdateNodeStyles { node_id: "ghost".into(), styles: None })
            .unwrap_err();
        assert_eq!(err, CommandError::NodeNotFound("ghost".to_string()));
    }

    #[test]
    fn test_collect_subtree_orders_depth_first() {
        let mut fx = Fixture::new();
        let outer = fx.insert("container", "root-body", None);
        let first = fx.insert("text", &fx.body_of(&outer), None);
        let second = fx.insert("text", &fx.body_of(&outer), None);

        let captured = collect_subtree(&fx.doc, &outer);
        let ids: Vec<&str> = captured.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec![outer.as_str(), first.as_str(), second.as_str()]);
        assert_eq!(captured.slots.len(), 1);
    }

    fn insert_box(node: Node, slots: Vec<Slot>, extra_nodes: Vec<Node>) -> Command {
        Command::InsertNode {
            slot_id: "root-body".to_string(),
            index: None,
            node,
            slots,
            extra_nodes,
            extra_slots: vec![],
        }
    }

    fn slot_with(id: &str, owner: &str, children: &[&str]) -> Slot {
        let mut slot = Slot::new(id, owner, "body");
        slot.children = children.iter().map(|c| c.to_string()).collect();
        slot
    }

    fn assert_invalid(err: CommandError, needle: &str) {
        match err {
            CommandError::Invalid(message) => assert!(message.contains(needle), "{}", message),
            other => panic!("expected Invalid, got {:?}", other),
        }
    }

    #[test]
    fn test_insert_rejects_slot_holding_existing_node() {
        let mut fx = Fixture::new();
        let text = fx.insert("text", "root-body", None);
        let before = fx.doc.clone();

        let command = insert_box(
            Node::new("box", "container").with_slots(vec!["box-body".into()]),
            vec![slot_with("box-body", "box", &[&text])],
            vec![],
        );

        assert_invalid(fx.apply(&command).unwrap_err(), "does not arrive");
        assert_eq!(fx.doc, before);
    }

    #[test]
    fn test_insert_rejects_unsupplied_and_foreign_slots() {
        let mut fx = Fixture::new();
        let before = fx.doc.clone();

        let ghost = insert_box(
            Node::new("box", "container").with_slots(vec!["ghost".into()]),
            vec![],
            vec![],
        );
        assert_eq!(
            fx.apply(&ghost).unwrap_err(),
            CommandError::SlotNotOwned { slot: "ghost".to_string(), node: "box".to_string() }
        );

        let borrowed = insert_box(
            Node::new("box", "container").with_slots(vec!["box-body".into()]),
            vec![slot_with("box-body", "other", &[])],
            vec![],
        );
        assert_eq!(
            fx.apply(&borrowed).unwrap_err(),
            CommandError::SlotNotOwned { slot: "box-body".to_string(), node: "box".to_string() }
        );
        assert_eq!(fx.doc, before);
    }

    #[test]
    fn test_insert_rejects_slot_missing_from_owner() {
        let mut fx = Fixture::new();

        let command = insert_box(
            Node::new("box", "container"),
            vec![slot_with("box-body", "box", &[])],
            vec![],
        );

        assert_invalid(fx.apply(&command).unwrap_err(), "not listed by its owner 'box'");
        assert!(fx.doc.node("box").is_none());
    }

    #[test]
    fn test_insert_rejects_extra_node_placed_twice_or_never() {
        let mut fx = Fixture::new();
        let node = Node::new("box", "container").with_slots(vec!["box-body".into()]);

        let twice = insert_box(
            node.clone(),
            vec![slot_with("box-body", "box", &["t1", "t1"])],
            vec![Node::new("t1", "text")],
        );
        assert_invalid(fx.apply(&twice).unwrap_err(), "more than one slot");

        let never = insert_box(
            node,
            vec![slot_with("box-body", "box", &[])],
            vec![Node::new("t1", "text")],
        );
        assert_invalid(fx.apply(&never).unwrap_err(), "not placed in any slot");
        assert!(fx.doc.node("t1").is_none());
    }

    #[test]
    fn test_insert_checks_containment_inside_subtree() {
        let mut fx = Fixture::new();
        let before = fx.doc.clone();

        let command = insert_box(
            Node::new("tbl", "table").with_slots(vec!["tbl-header".into(), "tbl-body".into()]),
            vec![
                slot_with("tbl-header", "tbl", &[]),
                slot_with("tbl-body", "tbl", &["t1"]),
            ],
            vec![Node::new("t1", "text")],
        );

        assert_eq!(
            fx.apply(&command).unwrap_err(),
            CommandError::DisallowedChild { parent: "table".to_string(), child: "text".to_string() }
        );
        assert_eq!(fx.doc, before);
    }
}
