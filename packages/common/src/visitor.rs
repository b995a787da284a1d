use blockform_model::{Node, Slot, TemplateDocument};

/// Visitor pattern for walking a template document immutably
///
/// The default implementations walk the whole tree depth-first starting at
/// the root, visiting each node before its slots and each slot before its
/// children. Override specific `visit_*` methods to act on nodes.
pub trait Visitor: Sized {
    fn visit_node(&mut self, doc: &TemplateDocument, node: &Node, depth: usize) {
        walk_node(self, doc, node, depth);
    }

    fn visit_slot(&mut self, doc: &TemplateDocument, slot: &Slot, depth: usize) {
        walk_slot(self, doc, slot, depth);
    }
}

pub fn walk_document<V: Visitor>(visitor: &mut V, doc: &TemplateDocument) {
    if let Some(root) = doc.node(&doc.root) {
        visitor.visit_node(doc, root, 0);
    }
}

pub fn walk_node<V: Visitor>(visitor: &mut V, doc: &TemplateDocument, node: &Node, depth: usize) {
    for slot in doc.slots_of(node) {
        visitor.visit_slot(doc, slot, depth);
    }
}

/// Children of a slot sit one level below the slot's owner
pub fn walk_slot<V: Visitor>(visitor: &mut V, doc: &TemplateDocument, slot: &Slot, depth: usize) {
    for child_id in &slot.children {
        if let Some(child) = doc.node(child_id) {
            visitor.visit_node(doc, child, depth + 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockform_model::{Node, Slot};

    struct Collector {
        seen: Vec<(String, usize)>,
    }

    impl Visitor for Collector {
        fn visit_node(&mut self, doc: &TemplateDocument, node: &Node, depth: usize) {
            self.seen.push((node.id.clone(), depth));
            walk_node(self, doc, node, depth);
        }
    }

    #[test]
    fn test_walk_visits_in_document_order() {
        let mut doc = TemplateDocument::with_root("root", "root-body");
        doc.nodes.insert(
            "box".to_string(),
            Node::new("box", "container").with_slots(vec!["box-body".to_string()]),
        );
        doc.nodes.insert("a".to_string(), Node::new("a", "text"));
        doc.nodes.insert("b".to_string(), Node::new("b", "text"));

        let mut box_body = Slot::new("box-body", "box", "body");
        box_body.children.push("a".to_string());
        doc.slots.insert("box-body".to_string(), box_body);

        let root_body = doc.slots.get_mut("root-body").unwrap();
        root_body.children.push("box".to_string());
        root_body.children.push("b".to_string());

        let mut collector = Collector { seen: Vec::new() };
        walk_document(&mut collector, &doc);

        let expected: Vec<(String, usize)> = vec![
            ("root".into(), 0),
            ("box".into(), 1),
            ("a".into(), 2),
            ("b".into(), 1),
        ];
        assert_eq!(collector.seen, expected);
    }
}
