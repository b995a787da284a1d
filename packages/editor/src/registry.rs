//! # Component Registry
//!
//! Declares the node types a document may contain.
//!
//! Each [`ComponentDefinition`] names a type, its default props and styles,
//! the slots a fresh node gets and which child types those slots accept.
//! The registry is the only authority on structural legality: Insert and
//! Move validation ask [`ComponentRegistry::can_contain`] and nothing else.
//!
//! Registries are plain values. Build one, register definitions, wrap it in
//! an `Arc` and hand it to every engine that needs it; tests routinely build
//! their own.

use crate::commands::{CommandError, CommandOutcome};
use crate::indexes::DocumentIndexes;
use crate::Command;
use blockform_common::IdGenerator;
use blockform_model::{Node, NodeId, Slot, SlotId, StyleMap, TemplateDocument};
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Style keys that cascade from document styles into nodes by default
pub const DEFAULT_INHERITABLE_STYLE_KEYS: &[&str] = &[
    "fontFamily",
    "fontSize",
    "fontWeight",
    "fontStyle",
    "color",
    "lineHeight",
    "letterSpacing",
    "textAlign",
];

/// Upper bound on slots of a multi-slot node (columns, table cells)
pub const MAX_MULTI_SLOTS: usize = 64;

/// Which child types a node's slots accept
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedChildren {
    AllowAll,
    AllowNone,
    Allowlist(Vec<String>),
    Denylist(Vec<String>),
}

impl AllowedChildren {
    pub fn allowlist(types: &[&str]) -> Self {
        Self::Allowlist(types.iter().map(|t| t.to_string()).collect())
    }

    pub fn denylist(types: &[&str]) -> Self {
        Self::Denylist(types.iter().map(|t| t.to_string()).collect())
    }

    pub fn allows(&self, child_type: &str) -> bool {
        match self {
            AllowedChildren::AllowAll => true,
            AllowedChildren::AllowNone => false,
            AllowedChildren::Allowlist(types) => types.iter().any(|t| t == child_type),
            AllowedChildren::Denylist(types) => !types.iter().any(|t| t == child_type),
        }
    }
}

/// Layout for types whose slot count is user controlled (columns, table cells)
#[derive(Debug, Clone, PartialEq)]
pub struct MultiSlotConfig {
    /// Slot names are `{slot_prefix}-{n}`
    pub slot_prefix: String,

    /// Array prop holding one size entry per slot, in slot order
    pub sizes_prop: String,

    /// Optional numeric prop mirroring the slot count
    pub count_prop: Option<String>,

    /// Size entry appended for a new slot
    pub default_size: Value,

    /// Removal refuses to go below this many slots (never below one)
    pub min_slots: usize,
}

impl MultiSlotConfig {
    pub fn new(slot_prefix: &str, sizes_prop: &str) -> Self {
        Self {
            slot_prefix: slot_prefix.to_string(),
            sizes_prop: sizes_prop.to_string(),
            count_prop: None,
            default_size: Value::from(1),
            min_slots: 1,
        }
    }

    pub fn with_count_prop(mut self, count_prop: &str) -> Self {
        self.count_prop = Some(count_prop.to_string());
        self
    }

    pub fn slot_name(&self, n: usize) -> String {
        format!("{}-{}", self.slot_prefix, n)
    }
}

/// Descendants created together with a node
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Subtree {
    /// The new node's own slots, children already filled in
    pub slots: Vec<Slot>,

    /// Every descendant node
    pub nodes: Vec<Node>,

    /// Slots owned by descendant nodes
    pub descendant_slots: Vec<Slot>,
}

/// Result of [`ComponentRegistry::create_node`]
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedNode {
    pub node: Node,
    pub slots: Vec<Slot>,
    pub extra_nodes: Vec<Node>,
    pub extra_slots: Vec<Slot>,
}

impl CreatedNode {
    /// Turn a freshly created node into the command that inserts it
    pub fn into_insert(self, slot_id: impl Into<SlotId>, index: Option<usize>) -> Command {
        Command::InsertNode {
            slot_id: slot_id.into(),
            index,
            node: self.node,
            slots: self.slots,
            extra_nodes: self.extra_nodes,
            extra_slots: self.extra_slots,
        }
    }
}

/// Read-only view handed to component command handlers
pub struct ComponentCommandContext<'a> {
    pub doc: &'a TemplateDocument,
    pub indexes: &'a DocumentIndexes,
    pub registry: &'a ComponentRegistry,
}

/// Extension points a block type can implement
///
/// Every method has a neutral default, so a type only overrides what it
/// needs.
pub trait ComponentHooks: Send + Sync + fmt::Debug {
    /// Derive the initial slots from props (e.g. one slot per column)
    fn create_initial_slots(&self, _node_id: &str, _props: &Value) -> Option<Vec<Slot>> {
        None
    }

    /// Create descendants atomically with the node
    fn create_subtree(
        &self,
        _node_id: &str,
        _props: &Value,
        _ids: &mut IdGenerator,
        _registry: &ComponentRegistry,
    ) -> Result<Option<Subtree>, CommandError> {
        Ok(None)
    }

    /// Normalize props on their way into the document
    fn on_prop_change(&self, _previous: Option<&Value>, next: Option<Value>) -> Option<Value> {
        next
    }

    /// Veto insertion of a node of this type under `parent_type`
    fn on_before_insert(&self, _node: &Node, _parent_type: &str) -> Result<(), String> {
        Ok(())
    }

    /// Component-owned command variants routed to [`ComponentHooks::handle_command`]
    fn command_types(&self) -> &[&'static str] {
        &[]
    }

    fn handle_command(
        &self,
        _ctx: ComponentCommandContext<'_>,
        command_type: &str,
        _payload: &Value,
    ) -> Result<CommandOutcome, CommandError> {
        Err(CommandError::Invalid(format!(
            "component command '{}' is not implemented",
            command_type
        )))
    }
}

#[derive(Debug, Clone)]
pub struct ComponentDefinition {
    pub type_name: String,
    pub label: String,
    pub default_props: Value,
    pub default_styles: StyleMap,

    /// Slot names a fresh node gets when no hook or multi-slot layout applies
    pub slots: Vec<String>,

    pub allowed_children: AllowedChildren,
    pub multi_slot: Option<MultiSlotConfig>,
    pub hooks: Option<Arc<dyn ComponentHooks>>,
}

impl ComponentDefinition {
    pub fn new(type_name: &str, label: &str) -> Self {
        Self {
            type_name: type_name.to_string(),
            label: label.to_string(),
            default_props: Value::Object(Map::new()),
            default_styles: StyleMap::new(),
            slots: Vec::new(),
            allowed_children: AllowedChildren::AllowNone,
            multi_slot: None,
            hooks: None,
        }
    }

    pub fn with_default_props(mut self, props: Value) -> Self {
        self.default_props = props;
        self
    }

    pub fn with_default_styles(mut self, styles: StyleMap) -> Self {
        self.default_styles = styles;
        self
    }

    pub fn with_slots(mut self, slots: &[&str]) -> Self {
        self.slots = slots.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_allowed_children(mut self, allowed: AllowedChildren) -> Self {
        self.allowed_children = allowed;
        self
    }

    pub fn with_multi_slot(mut self, config: MultiSlotConfig) -> Self {
        self.multi_slot = Some(config);
        self
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn ComponentHooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }
}

/// Stable slot ID for a node's named slot
pub fn slot_id_for(node_id: &str, slot_name: &str) -> SlotId {
    format!("{}-{}", node_id, slot_name)
}

/// Deep-merge `overrides` into `base`: objects merge key by key, anything
/// else replaces.
pub fn merge_props(base: &Value, overrides: Option<&Value>) -> Value {
    let mut merged = base.clone();
    if let Some(overrides) = overrides {
        merge_into(&mut merged, overrides);
    }
    merged
}

fn merge_into(target: &mut Value, overrides: &Value) {
    match (target, overrides) {
        (Value::Object(target), Value::Object(overrides)) => {
            for (key, value) in overrides {
                match target.get_mut(key) {
                    Some(existing) => merge_into(existing, value),
                    None => {
                        target.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (target, overrides) => *target = overrides.clone(),
    }
}

#[derive(Debug)]
pub struct ComponentRegistry {
    definitions: HashMap<String, ComponentDefinition>,

    /// component command type → owning node type
    command_owners: HashMap<String, String>,

    inheritable_style_keys: BTreeSet<String>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self {
            definitions: HashMap::new(),
            command_owners: HashMap::new(),
            inheritable_style_keys: DEFAULT_INHERITABLE_STYLE_KEYS
                .iter()
                .map(|k| k.to_string())
                .collect(),
        }
    }

    /// Register (or replace) a definition
    pub fn register(&mut self, definition: ComponentDefinition) {
        let type_name = definition.type_name.clone();

        if let Some(hooks) = &definition.hooks {
            for command_type in hooks.command_types() {
                if let Some(owner) = self.command_owners.get(*command_type) {
                    if owner != &type_name {
                        warn!(
                            command_type = %command_type,
                            previous_owner = %owner,
                            new_owner = %type_name,
                            "Component command re-registered"
                        );
                    }
                }
                self.command_owners
                    .insert(command_type.to_string(), type_name.clone());
            }
        }

        if self.definitions.insert(type_name.clone(), definition).is_some() {
            warn!(node_type = %type_name, "Component definition replaced");
        } else {
            debug!(node_type = %type_name, "Registered component");
        }
    }

    pub fn get(&self, type_name: &str) -> Option<&ComponentDefinition> {
        self.definitions.get(type_name)
    }

    /// Look up a type that must exist; an unregistered type here means the
    /// registry and the caller are out of sync.
    pub fn get_or_throw(&self, type_name: &str) -> &ComponentDefinition {
        match self.definitions.get(type_name) {
            Some(definition) => definition,
            None => panic!("component type '{}' is not registered", type_name),
        }
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.definitions.contains_key(type_name)
    }

    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    /// Whether a `parent_type` node may hold a `child_type` node in its slots
    pub fn can_contain(&self, parent_type: &str, child_type: &str) -> bool {
        if !self.contains(child_type) {
            return false;
        }
        self.get(parent_type)
            .map(|parent| parent.allowed_children.allows(child_type))
            .unwrap_or(false)
    }

    pub fn inheritable_style_keys(&self) -> &BTreeSet<String> {
        &self.inheritable_style_keys
    }

    pub fn set_inheritable_style_keys<I, S>(&mut self, keys: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inheritable_style_keys = keys.into_iter().map(Into::into).collect();
    }

    /// Definition hooks that claimed a component command type
    pub fn command_handler(&self, command_type: &str) -> Option<&dyn ComponentHooks> {
        let owner = self.command_owners.get(command_type)?;
        self.get(owner)?.hooks.as_deref()
    }

    /// Create a detached node (plus its slots and any pre-built descendants)
    ///
    /// Props are `default_props` deep-merged with `override_props`; the
    /// definition's own values are cloned, never shared.
    pub fn create_node(
        &self,
        type_name: &str,
        override_props: Option<&Value>,
        ids: &mut IdGenerator,
    ) -> Result<CreatedNode, CommandError> {
        let definition = self
            .get(type_name)
            .ok_or_else(|| CommandError::UnknownNodeType(type_name.to_string()))?;

        let node_id: NodeId = ids.new_id_with_prefix(type_name);
        let mut props = merge_props(&definition.default_props, override_props);
        if let Some(config) = &definition.multi_slot {
            normalize_multi_slot_props(config, &mut props)?;
        }

        let hooks = definition.hooks.as_deref();

        let subtree = match hooks {
            Some(hooks) => hooks.create_subtree(&node_id, &props, ids, self)?,
            None => None,
        };
        if let Some(subtree) = subtree {
            let node = Node::new(node_id, type_name)
                .with_props(props)
                .with_slots(subtree.slots.iter().map(|s| s.id.clone()).collect());
            return Ok(CreatedNode {
                node,
                slots: subtree.slots,
                extra_nodes: subtree.nodes,
                extra_slots: subtree.descendant_slots,
            });
        }

        let slots = match hooks.and_then(|h| h.create_initial_slots(&node_id, &props)) {
            Some(slots) => slots,
            None => default_slots(definition, &node_id, &props)?,
        };

        let node = Node::new(node_id, type_name)
            .with_props(props)
            .with_slots(slots.iter().map(|s| s.id.clone()).collect());

        Ok(CreatedNode {
            node,
            slots,
            extra_nodes: Vec::new(),
            extra_slots: Vec::new(),
        })
    }
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn default_slots(
    definition: &ComponentDefinition,
    node_id: &str,
    props: &Value,
) -> Result<Vec<Slot>, CommandError> {
    let names: Vec<String> = match &definition.multi_slot {
        Some(config) => (0..multi_slot_count(config, props)?)
            .map(|n| config.slot_name(n))
            .collect(),
        None => definition.slots.clone(),
    };

    Ok(names
        .iter()
        .map(|name| Slot::new(slot_id_for(node_id, name), node_id, name.clone()))
        .collect())
}

/// Slot count requested by props: the count prop, else the sizes array
fn multi_slot_count(config: &MultiSlotConfig, props: &Value) -> Result<usize, CommandError> {
    let from_count = config
        .count_prop
        .as_ref()
        .and_then(|key| props.get(key))
        .and_then(Value::as_u64)
        .map(|n| usize::try_from(n).unwrap_or(usize::MAX));
    let from_sizes = props
        .get(&config.sizes_prop)
        .and_then(Value::as_array)
        .map(Vec::len);

    let count = from_count
        .or(from_sizes)
        .unwrap_or(config.min_slots)
        .max(config.min_slots.max(1));
    if count > MAX_MULTI_SLOTS {
        return Err(CommandError::Invalid(format!(
            "{} {}s requested, at most {} allowed",
            count, config.slot_prefix, MAX_MULTI_SLOTS
        )));
    }
    Ok(count)
}

/// Keep the sizes array (and count prop) the same length as the slot count
fn normalize_multi_slot_props(config: &MultiSlotConfig, props: &mut Value) -> Result<(), CommandError> {
    let count = multi_slot_count(config, props)?;
    let Some(object) = props.as_object_mut() else {
        return Ok(());
    };

    let mut sizes = object
        .get(&config.sizes_prop)
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    sizes.truncate(count);
    while sizes.len() < count {
        sizes.push(config.default_size.clone());
    }
    object.insert(config.sizes_prop.clone(), Value::Array(sizes));

    if let Some(count_prop) = &config.count_prop {
        object.insert(count_prop.clone(), Value::from(count));
    }
    Ok(())
}
