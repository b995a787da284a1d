//! Registry-aware document validation
//!
//! [`TemplateDocument::check_integrity`] covers the tree shape; this adds the
//! checks that need a [`ComponentRegistry`]: every type is registered and
//! every child is accepted by its parent.

use crate::registry::ComponentRegistry;
use blockform_model::{ModelError, TemplateDocument};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("{0}")]
    Integrity(#[from] ModelError),

    #[error("Node '{node_id}' has unregistered type '{node_type}'")]
    UnknownNodeType { node_id: String, node_type: String },

    #[error("'{parent}' cannot contain '{child}'")]
    DisallowedChild { parent: String, child: String },
}

pub fn validate_document(doc: &TemplateDocument, registry: &ComponentRegistry) -> Result<(), ValidationError> {
    doc.check_integrity()?;

    for node in doc.nodes.values() {
        if !registry.contains(&node.node_type) {
            return Err(ValidationError::UnknownNodeType {
                node_id: node.id.clone(),
                node_type: node.node_type.clone(),
            });
        }
    }

    for slot in doc.slots.values() {
        let Some(owner) = doc.node(&slot.node_id) else {
            continue;
        };
        for child in slot.children.iter().filter_map(|id| doc.node(id)) {
            if !registry.can_contain(&owner.node_type, &child.node_type) {
                return Err(ValidationError::DisallowedChild {
                    parent: owner.node_type.clone(),
                    child: child.node_type.clone(),
                });
            }
        }
    }

    debug!(nodes = doc.nodes.len(), "Document validated");
    Ok(())
}
