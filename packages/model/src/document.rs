//! # Template Document
//!
//! The persisted document shape is also the save/load contract, so field
//! names serialize in camelCase exactly as stored by the template service.
//!
//! ```json
//! {
//!   "modelVersion": 1,
//!   "root": "root",
//!   "nodes": { "root": { "id": "root", "type": "root", "slots": ["root-body"] } },
//!   "slots": { "root-body": { "id": "root-body", "nodeId": "root", "name": "body", "children": [] } },
//!   "themeRef": "default"
//! }
//! ```

use crate::error::{ModelError, ModelResult};
use crate::theme::{PageSettingsOverride, StyleMap};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

pub type NodeId = String;
pub type SlotId = String;

/// Current persisted schema version
pub const MODEL_VERSION: u32 = 1;

/// A typed block in the document tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,

    /// Registry type name (`text`, `columns`, `table`, ...)
    #[serde(rename = "type")]
    pub node_type: String,

    /// Owned slots, in display order
    #[serde(default)]
    pub slots: Vec<SlotId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub props: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub styles: Option<StyleMap>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style_preset: Option<String>,
}

impl Node {
    pub fn new(id: impl Into<NodeId>, node_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            slots: Vec::new(),
            props: None,
            styles: None,
            style_preset: None,
        }
    }

    pub fn with_props(mut self, props: Value) -> Self {
        self.props = Some(props);
        self
    }

    pub fn with_slots(mut self, slots: Vec<SlotId>) -> Self {
        self.slots = slots;
        self
    }

    /// Look up a single prop by key
    pub fn prop(&self, key: &str) -> Option<&Value> {
        self.props.as_ref().and_then(|props| props.get(key))
    }
}

/// Named, ordered attachment point on a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub id: SlotId,

    /// Owning node (back-reference, not ownership)
    pub node_id: NodeId,

    pub name: String,

    #[serde(default)]
    pub children: Vec<NodeId>,
}

impl Slot {
    pub fn new(id: impl Into<SlotId>, node_id: impl Into<NodeId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_id: node_id.into(),
            name: name.into(),
            children: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateDocument {
    pub model_version: u32,
    pub root: NodeId,
    pub nodes: BTreeMap<NodeId, Node>,
    pub slots: BTreeMap<SlotId, Slot>,
    #[serde(default)]
    pub theme_ref: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_styles_override: Option<StyleMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_settings_override: Option<PageSettingsOverride>,
}

impl TemplateDocument {
    /// Minimal document: a `root` node owning one empty `body` slot
    pub fn with_root(root_id: impl Into<NodeId>, root_slot_id: impl Into<SlotId>) -> Self {
        let root_id = root_id.into();
        let slot_id = root_slot_id.into();

        let root = Node::new(root_id.clone(), "root").with_slots(vec![slot_id.clone()]);
        let slot = Slot::new(slot_id.clone(), root_id.clone(), "body");

        Self {
            model_version: MODEL_VERSION,
            root: root_id.clone(),
            nodes: BTreeMap::from([(root_id, root)]),
            slots: BTreeMap::from([(slot_id, slot)]),
            theme_ref: "default".to_string(),
            document_styles_override: None,
            page_settings_override: None,
        }
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn slot(&self, id: &str) -> Option<&Slot> {
        self.slots.get(id)
    }

    /// Slots of a node, in the node's declared order
    pub fn slots_of<'a>(&'a self, node: &'a Node) -> impl Iterator<Item = &'a Slot> + 'a {
        node.slots.iter().filter_map(move |id| self.slots.get(id))
    }

    /// Parse a persisted document, refusing other schema versions
    pub fn from_json(source: &str) -> ModelResult<Self> {
        let raw: Value = serde_json::from_str(source)?;

        let found = raw.get("modelVersion").and_then(Value::as_u64).unwrap_or(0);
        if u32::try_from(found).ok() != Some(MODEL_VERSION) {
            return Err(ModelError::UnsupportedModelVersion {
                found,
                expected: MODEL_VERSION,
            });
        }

        Ok(serde_json::from_value(raw)?)
    }

    pub fn to_json_pretty(&self) -> ModelResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Verify the tree invariants that do not depend on a component registry:
    /// consistent node/slot back-references, single ownership and
    /// reachability of every node from the root.
    pub fn check_integrity(&self) -> ModelResult<()> {
        if !self.nodes.contains_key(&self.root) {
            return Err(integrity(format!("root node '{}' is missing", self.root)));
        }

        for (key, node) in &self.nodes {
            if key != &node.id {
                return Err(integrity(format!("node stored under '{}' has id '{}'", key, node.id)));
            }

            let mut seen = HashSet::new();
            for slot_id in &node.slots {
                if !seen.insert(slot_id) {
                    return Err(integrity(format!("node '{}' lists slot '{}' twice", node.id, slot_id)));
                }
                let slot = self.slots.get(slot_id).ok_or_else(|| {
                    integrity(format!("node '{}' lists missing slot '{}'", node.id, slot_id))
                })?;
                if slot.node_id != node.id {
                    return Err(integrity(format!(
                        "slot '{}' is listed by '{}' but owned by '{}'",
                        slot_id, node.id, slot.node_id
                    )));
                }
            }
        }

        let mut references: HashMap<&str, usize> = HashMap::new();
        for (key, slot) in &self.slots {
            if key != &slot.id {
                return Err(integrity(format!("slot stored under '{}' has id '{}'", key, slot.id)));
            }

            let owner = self.nodes.get(&slot.node_id).ok_or_else(|| {
                integrity(format!("slot '{}' belongs to missing node '{}'", slot.id, slot.node_id))
            })?;
            if !owner.slots.contains(&slot.id) {
                return Err(integrity(format!(
                    "slot '{}' is not listed by its owner '{}'",
                    slot.id, owner.id
                )));
            }

            for child in &slot.children {
                if !self.nodes.contains_key(child) {
                    return Err(integrity(format!("slot '{}' references missing node '{}'", slot.id, child)));
                }
                *references.entry(child.as_str()).or_default() += 1;
            }
        }

        for id in self.nodes.keys() {
            let count = references.get(id.as_str()).copied().unwrap_or(0);
            if id == &self.root && count != 0 {
                return Err(integrity("root node is referenced by a slot".to_string()));
            }
            if id != &self.root && count != 1 {
                return Err(integrity(format!("node '{}' is referenced by {} slots", id, count)));
            }
        }

        // Single ownership plus full reachability rules out cycles.
        let mut visited: HashSet<&str> = HashSet::new();
        let mut queue = VecDeque::from([self.root.as_str()]);
        while let Some(id) = queue.pop_front() {
            if !visited.insert(id) {
                return Err(integrity(format!("node '{}' is reachable twice", id)));
            }
            if let Some(node) = self.nodes.get(id) {
                for slot in self.slots_of(node) {
                    queue.extend(slot.children.iter().map(String::as_str));
                }
            }
        }

        if visited.len() != self.nodes.len() {
            return Err(integrity(format!(
                "{} node(s) are not reachable from the root",
                self.nodes.len() - visited.len()
            )));
        }

        Ok(())
    }
}

fn integrity(message: String) -> ModelError {
    ModelError::Integrity(message)
}
