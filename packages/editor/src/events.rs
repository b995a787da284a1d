//! Engine notifications
//!
//! Subscribers register per [`EventKind`]. Handlers run synchronously, in
//! subscription order, after the engine state they describe is in place.

use blockform_model::NodeId;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    DocChange,
    SelectionChange,
    ExampleChange,
    ComponentStateChange,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::DocChange => "doc:change",
            EventKind::SelectionChange => "selection:change",
            EventKind::ExampleChange => "example:change",
            EventKind::ComponentStateChange => "component-state:change",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "doc:change" => Ok(EventKind::DocChange),
            "selection:change" => Ok(EventKind::SelectionChange),
            "example:change" => Ok(EventKind::ExampleChange),
            "component-state:change" => Ok(EventKind::ComponentStateChange),
            other => Err(format!("unknown event kind '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    DocChange { structure_changed: bool },
    SelectionChange { node_id: Option<NodeId> },
    ExampleChange,
    ComponentStateChange { key: String },
}

impl EditorEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            EditorEvent::DocChange { .. } => EventKind::DocChange,
            EditorEvent::SelectionChange { .. } => EventKind::SelectionChange,
            EditorEvent::ExampleChange => EventKind::ExampleChange,
            EditorEvent::ComponentStateChange { .. } => EventKind::ComponentStateChange,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub type EventHandler = Box<dyn FnMut(&EditorEvent)>;

#[derive(Default)]
pub struct EventBus {
    next_id: u64,
    handlers: Vec<(SubscriptionId, EventKind, EventHandler)>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&mut self, kind: EventKind, handler: impl FnMut(&EditorEvent) + 'static) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.handlers.push((id, kind, Box::new(handler)));
        id
    }

    /// Returns whether the subscription existed
    pub fn off(&mut self, id: SubscriptionId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(existing, _, _)| *existing != id);
        self.handlers.len() != before
    }

    pub fn emit(&mut self, event: &EditorEvent) {
        let kind = event.kind();
        for (_, subscribed, handler) in self.handlers.iter_mut() {
            if *subscribed == kind {
                handler(event);
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.handlers.len()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.handlers.len())
            .finish()
    }
}
