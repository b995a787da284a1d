//! Column slot edits for multi-slot node types (`columns`, `table-row`)
//!
//! The sizes prop holds one entry per slot in slot order, so every slot
//! insertion or removal edits the array at the same position.

use super::{
    check_incoming_subtree, collect_subtree, ensure_ids_unused, node_mut, Command, CommandError,
    CommandOutcome,
};
use crate::registry::{slot_id_for, ComponentRegistry, MultiSlotConfig, MAX_MULTI_SLOTS};
use blockform_model::{Node, Slot, TemplateDocument};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// Everything needed to put a removed column back exactly where it was
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovedColumn {
    /// The slot itself, children intact
    pub slot: Slot,

    /// Index in the owner's slot list
    pub position: usize,

    /// Entry taken out of the sizes prop, if there was one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<Value>,

    /// Every node that lived in the column
    #[serde(default)]
    pub nodes: Vec<Node>,

    /// Slots owned by those nodes
    #[serde(default)]
    pub slots: Vec<Slot>,
}

fn multi_slot_node<'a>(
    doc: &'a TemplateDocument,
    registry: &'a ComponentRegistry,
    node_id: &str,
) -> Result<(&'a Node, &'a MultiSlotConfig), CommandError> {
    let node = doc
        .node(node_id)
        .ok_or_else(|| CommandError::NodeNotFound(node_id.to_string()))?;
    let config = registry
        .get(&node.node_type)
        .and_then(|definition| definition.multi_slot.as_ref())
        .ok_or_else(|| CommandError::NotMultiSlot(node.node_type.clone()))?;
    Ok((node, config))
}

/// Apply `edit` to the sizes array and refresh a numeric count prop.
/// Props the node does not already carry are left alone.
fn edit_size_props(node: &mut Node, config: &MultiSlotConfig, edit: impl FnOnce(&mut Vec<Value>)) {
    let count = node.slots.len();
    let Some(props) = node.props.as_mut().and_then(Value::as_object_mut) else {
        return;
    };

    if let Some(sizes) = props
        .get_mut(&config.sizes_prop)
        .and_then(Value::as_array_mut)
    {
        edit(sizes);
    }

    if let Some(key) = &config.count_prop {
        if props.get(key).is_some_and(Value::is_number) {
            props.insert(key.clone(), Value::from(count));
        }
    }
}

pub(crate) fn add_column_slot(
    doc: &TemplateDocument,
    registry: &ComponentRegistry,
    node_id: &str,
    slot_id: Option<&str>,
    restore: Option<&RemovedColumn>,
) -> Result<CommandOutcome, CommandError> {
    let (node, config) = multi_slot_node(doc, registry, node_id)?;
    if node.slots.len() >= MAX_MULTI_SLOTS {
        return Err(CommandError::Invalid(format!(
            "'{}' already has {} {}s, at most {} allowed",
            node_id,
            node.slots.len(),
            config.slot_prefix,
            MAX_MULTI_SLOTS
        )));
    }
    let mut next = doc.clone();

    let (slot, position, size) = match restore {
        Some(removed) => {
            if removed.slot.node_id != node_id {
                return Err(CommandError::SlotNotOwned {
                    slot: removed.slot.id.clone(),
                    node: node_id.to_string(),
                });
            }
            if let Some(stray) = removed.slots.iter().find(|s| s.node_id == node_id) {
                return Err(CommandError::Invalid(format!(
                    "slot '{}' is not listed by its owner '{}'",
                    stray.id, node_id
                )));
            }
            ensure_ids_unused(
                doc,
                &removed.nodes,
                std::iter::once(&removed.slot).chain(&removed.slots),
            )?;
            check_incoming_subtree(
                registry,
                &[node],
                &removed.nodes,
                std::iter::once(&removed.slot).chain(&removed.slots),
                &[],
            )?;

            for n in &removed.nodes {
                next.nodes.insert(n.id.clone(), n.clone());
            }
            for s in &removed.slots {
                next.slots.insert(s.id.clone(), s.clone());
            }
            (
                removed.slot.clone(),
                removed.position.min(node.slots.len()),
                removed.size.clone(),
            )
        }
        None => {
            let taken: HashSet<&str> = doc.slots_of(node).map(|s| s.name.as_str()).collect();
            let mut n = node.slots.len();
            let name = loop {
                let candidate = config.slot_name(n);
                if !taken.contains(candidate.as_str()) {
                    break candidate;
                }
                n += 1;
            };

            let id = slot_id
                .map(str::to_string)
                .unwrap_or_else(|| slot_id_for(node_id, &name));
            let slot = Slot::new(id, node_id, name);
            ensure_ids_unused(doc, std::iter::empty::<&Node>(), std::iter::once(&slot))?;

            (slot, node.slots.len(), Some(config.default_size.clone()))
        }
    };

    next.slots.insert(slot.id.clone(), slot.clone());
    let owner = node_mut(&mut next, node_id)?;
    owner.slots.insert(position, slot.id.clone());
    edit_size_props(owner, config, |sizes| {
        if let Some(size) = size {
            let at = position.min(sizes.len());
            sizes.insert(at, size);
        }
    });

    Ok(CommandOutcome {
        doc: next,
        inverse: Command::RemoveColumnSlot {
            node_id: node_id.to_string(),
            slot_id: Some(slot.id),
        },
        structure_changed: true,
    })
}

pub(crate) fn remove_column_slot(
    doc: &TemplateDocument,
    registry: &ComponentRegistry,
    node_id: &str,
    slot_id: Option<&str>,
) -> Result<CommandOutcome, CommandError> {
    let (node, config) = multi_slot_node(doc, registry, node_id)?;

    let slot_id = match slot_id {
        Some(id) => id.to_string(),
        None => node
            .slots
            .last()
            .cloned()
            .ok_or_else(|| CommandError::LastColumn(node_id.to_string()))?,
    };
    let position = node
        .slots
        .iter()
        .position(|s| *s == slot_id)
        .ok_or_else(|| CommandError::SlotNotOwned {
            slot: slot_id.clone(),
            node: node_id.to_string(),
        })?;
    if node.slots.len() <= config.min_slots.max(1) {
        return Err(CommandError::LastColumn(node_id.to_string()));
    }

    let slot = doc
        .slot(&slot_id)
        .cloned()
        .ok_or_else(|| CommandError::SlotNotFound(slot_id.clone()))?;

    let mut nodes = Vec::new();
    let mut slots = Vec::new();
    for child in &slot.children {
        let captured = collect_subtree(doc, child);
        nodes.extend(captured.nodes);
        slots.extend(captured.slots);
    }

    let mut next = doc.clone();
    for n in &nodes {
        next.nodes.remove(&n.id);
    }
    for s in &slots {
        next.slots.remove(&s.id);
    }
    next.slots.remove(&slot_id);

    let owner = node_mut(&mut next, node_id)?;
    owner.slots.remove(position);
    let mut size = None;
    edit_size_props(owner, config, |sizes| {
        if position < sizes.len() {
            size = Some(sizes.remove(position));
        }
    });

    Ok(CommandOutcome {
        doc: next,
        inverse: Command::AddColumnSlot {
            node_id: node_id.to_string(),
            slot_id: Some(slot_id),
            restore: Some(Box::new(RemovedColumn {
                slot,
                position,
                size,
                nodes,
                slots,
            })),
        },
        structure_changed: true,
    })
}
