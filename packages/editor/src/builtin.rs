//! Block types every template editor ships with

use crate::commands::columns::{add_column_slot, remove_column_slot};
use crate::commands::{Command, CommandError, CommandOutcome, RemovedColumn};
use crate::registry::{
    slot_id_for, AllowedChildren, ComponentCommandContext, ComponentDefinition, ComponentHooks,
    ComponentRegistry, MultiSlotConfig, Subtree, MAX_MULTI_SLOTS,
};
use blockform_common::IdGenerator;
use blockform_model::{Node, NodeId, Slot, StyleMap};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

pub const SET_COLUMN_COUNT: &str = "columns.set-count";

const DEFAULT_TABLE_COLUMNS: u64 = 2;
const DEFAULT_TABLE_ROWS: u64 = 2;
const MAX_TABLE_ROWS: u64 = 500;

/// Register every builtin block type
pub fn register_builtin_components(registry: &mut ComponentRegistry) {
    let flow = || AllowedChildren::denylist(&["root", "table-row"]);

    registry.register(
        ComponentDefinition::new("root", "Document")
            .with_slots(&["body"])
            .with_allowed_children(flow()),
    );
    registry.register(
        ComponentDefinition::new("container", "Container")
            .with_slots(&["body"])
            .with_allowed_children(flow()),
    );
    registry.register(
        ComponentDefinition::new("text", "Text").with_default_props(json!({ "content": "" })),
    );
    registry.register(
        ComponentDefinition::new("image", "Image")
            .with_default_props(json!({ "src": "", "alt": "" }))
            .with_default_styles(style_map(&[("maxWidth", json!("100%"))])),
    );
    registry.register(
        ComponentDefinition::new("divider", "Divider").with_default_styles(style_map(&[
            ("borderTop", json!("1px solid #e5e7eb")),
            ("marginTop", json!("8px")),
            ("marginBottom", json!("8px")),
        ])),
    );
    registry.register(
        ComponentDefinition::new("page-break", "Page Break").with_hooks(Arc::new(PageBreakHooks)),
    );
    registry.register(
        ComponentDefinition::new("columns", "Columns")
            .with_default_props(json!({ "columns": 2, "columnSizes": [1, 1] }))
            .with_allowed_children(flow())
            .with_multi_slot(MultiSlotConfig::new("column", "columnSizes").with_count_prop("columns"))
            .with_hooks(Arc::new(ColumnsHooks)),
    );
    registry.register(
        ComponentDefinition::new("table", "Table")
            .with_default_props(json!({ "columns": DEFAULT_TABLE_COLUMNS, "rows": DEFAULT_TABLE_ROWS }))
            .with_slots(&["header", "body"])
            .with_allowed_children(AllowedChildren::allowlist(&["table-row"]))
            .with_hooks(Arc::new(TableHooks)),
    );
    registry.register(
        ComponentDefinition::new("table-row", "Table Row")
            .with_default_props(json!({ "cells": 2, "cellSizes": [1, 1] }))
            .with_allowed_children(AllowedChildren::denylist(&["root", "table-row", "table"]))
            .with_multi_slot(MultiSlotConfig::new("cell", "cellSizes").with_count_prop("cells")),
    );
    registry.register(
        ComponentDefinition::new("conditional", "Conditional")
            .with_default_props(json!({ "expression": "" }))
            .with_slots(&["body"])
            .with_allowed_children(flow()),
    );
    registry.register(
        ComponentDefinition::new("loop", "Repeat")
            .with_default_props(json!({ "expression": "", "itemName": "item" }))
            .with_slots(&["body"])
            .with_allowed_children(flow()),
    );
}

/// A fresh registry holding only the builtin types
pub fn builtin_registry() -> ComponentRegistry {
    let mut registry = ComponentRegistry::new();
    register_builtin_components(&mut registry);
    registry
}

fn style_map(pairs: &[(&str, Value)]) -> StyleMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

/// Page breaks only make sense between top-level blocks
#[derive(Debug)]
struct PageBreakHooks;

impl ComponentHooks for PageBreakHooks {
    fn on_before_insert(&self, _node: &Node, parent_type: &str) -> Result<(), String> {
        if parent_type == "root" {
            Ok(())
        } else {
            Err(format!("page breaks must be top-level blocks, not inside '{}'", parent_type))
        }
    }
}

/// Payload of `columns.set-count`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetColumnCount {
    node_id: NodeId,
    count: usize,

    /// Columns removed by an earlier set-count, last removed first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    restore: Vec<RemovedColumn>,
}

#[derive(Debug)]
struct ColumnsHooks;

impl ColumnsHooks {
    fn set_count(
        &self,
        ctx: ComponentCommandContext<'_>,
        payload: &Value,
    ) -> Result<CommandOutcome, CommandError> {
        let SetColumnCount {
            node_id,
            count,
            mut restore,
        } = serde_json::from_value(payload.clone())
            .map_err(|e| CommandError::Invalid(format!("{}: {}", SET_COLUMN_COUNT, e)))?;

        let node = ctx
            .doc
            .node(&node_id)
            .ok_or_else(|| CommandError::NodeNotFound(node_id.clone()))?;
        if node.node_type != "columns" {
            return Err(CommandError::NotMultiSlot(node.node_type.clone()));
        }
        if count > MAX_MULTI_SLOTS {
            return Err(CommandError::Invalid(format!(
                "{}: {} columns requested, at most {} allowed",
                SET_COLUMN_COUNT, count, MAX_MULTI_SLOTS
            )));
        }

        let previous = node.slots.len();
        let mut doc = ctx.doc.clone();
        let mut removed = Vec::new();
        let mut len = previous;

        while len > count {
            let outcome = remove_column_slot(&doc, ctx.registry, &node_id, None)?;
            if let Command::AddColumnSlot {
                restore: Some(column),
                ..
            } = outcome.inverse
            {
                removed.push(*column);
            }
            doc = outcome.doc;
            len -= 1;
        }

        while len < count {
            let column = restore.pop();
            doc = add_column_slot(&doc, ctx.registry, &node_id, None, column.as_ref())?.doc;
            len += 1;
        }

        let inverse = SetColumnCount {
            node_id,
            count: previous,
            restore: removed,
        };
        let payload = serde_json::to_value(&inverse)
            .map_err(|e| CommandError::Invalid(format!("{}: {}", SET_COLUMN_COUNT, e)))?;

        Ok(CommandOutcome {
            doc,
            inverse: Command::Component {
                command_type: SET_COLUMN_COUNT.to_string(),
                payload,
            },
            structure_changed: previous != count,
        })
    }
}

impl ComponentHooks for ColumnsHooks {
    fn command_types(&self) -> &[&'static str] {
        &[SET_COLUMN_COUNT]
    }

    fn handle_command(
        &self,
        ctx: ComponentCommandContext<'_>,
        command_type: &str,
        payload: &Value,
    ) -> Result<CommandOutcome, CommandError> {
        match command_type {
            SET_COLUMN_COUNT => self.set_count(ctx, payload),
            other => Err(CommandError::Invalid(format!("columns cannot handle '{}'", other))),
        }
    }
}

/// Builds header and body rows together with the table
#[derive(Debug)]
struct TableHooks;

impl ComponentHooks for TableHooks {
    fn create_subtree(
        &self,
        node_id: &str,
        props: &Value,
        ids: &mut IdGenerator,
        registry: &ComponentRegistry,
    ) -> Result<Option<Subtree>, CommandError> {
        let columns = props
            .get("columns")
            .and_then(Value::as_u64)
            .unwrap_or(DEFAULT_TABLE_COLUMNS)
            .max(1);
        let rows = props
            .get("rows")
            .and_then(Value::as_u64)
            .unwrap_or(DEFAULT_TABLE_ROWS);
        if rows > MAX_TABLE_ROWS {
            return Err(CommandError::Invalid(format!(
                "{} table rows requested, at most {} allowed",
                rows, MAX_TABLE_ROWS
            )));
        }

        let mut subtree = Subtree::default();
        let mut header = Slot::new(slot_id_for(node_id, "header"), node_id, "header");
        let mut body = Slot::new(slot_id_for(node_id, "body"), node_id, "body");

        for (slot, count) in [(&mut header, 1), (&mut body, rows)] {
            for _ in 0..count {
                let row = registry.create_node("table-row", Some(&json!({ "cells": columns })), ids)?;
                slot.children.push(row.node.id.clone());
                subtree.nodes.push(row.node);
                subtree.nodes.extend(row.extra_nodes);
                subtree.descendant_slots.extend(row.slots);
                subtree.descendant_slots.extend(row.extra_slots);
            }
        }

        subtree.slots = vec![header, body];
        Ok(Some(subtree))
    }
}
