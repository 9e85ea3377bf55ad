//! Tree operations: insert, remove, move, walk.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use slotmap::{SecondaryMap, SlotMap};

use super::node::{ElementData, NodeId};

/// Empty slice constant for returning when a node has no children.
const EMPTY_CHILDREN: &[NodeId] = &[];

/// Shared handle to a document; contexts and effects hold clones of it.
pub type DocumentHandle = Rc<RefCell<Document>>;

/// A structural change, recorded in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Inserted { node: NodeId, parent: NodeId },
    Moved { node: NodeId, parent: NodeId },
    Removed { node: NodeId, data: ElementData },
    TextChanged { node: NodeId },
}

/// A minimal HTML document, backed by a slotmap arena.
///
/// Always has an `<html>` root with `<head>` and `<body>` children. All
/// nodes live in a single `SlotMap`; parent/child relationships are stored
/// in secondary maps so removal is O(subtree size) and lookup is O(1).
pub struct Document {
    pub(crate) nodes: SlotMap<NodeId, ElementData>,
    children: SecondaryMap<NodeId, Vec<NodeId>>,
    parent: SecondaryMap<NodeId, NodeId>,
    root: NodeId,
    head: NodeId,
    body: NodeId,
    mutations: Vec<Mutation>,
}

impl Document {
    /// Create an empty `<html><head></head><body></body></html>` document.
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let mut children = SecondaryMap::new();
        let mut parent = SecondaryMap::new();

        let root = nodes.insert(ElementData::new("html"));
        let head = nodes.insert(ElementData::new("head"));
        let body = nodes.insert(ElementData::new("body"));
        children.insert(root, vec![head, body]);
        children.insert(head, Vec::new());
        children.insert(body, Vec::new());
        parent.insert(head, root);
        parent.insert(body, root);

        Self {
            nodes,
            children,
            parent,
            root,
            head,
            body,
            mutations: Vec::new(),
        }
    }

    /// Create a document already wrapped in a shared handle.
    pub fn shared() -> DocumentHandle {
        Rc::new(RefCell::new(Self::new()))
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn head(&self) -> NodeId {
        self.head
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    /// Append a new element as the last child of `parent`.
    pub fn append_child(&mut self, parent: NodeId, data: ElementData) -> NodeId {
        self.insert_before(parent, data, None)
    }

    /// Insert a new element under `parent`, before `reference`.
    ///
    /// A `reference` of `None`, or one that is not a child of `parent`,
    /// appends instead.
    ///
    /// # Panics
    ///
    /// Panics (debug) if `parent` does not exist in the tree.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        data: ElementData,
        reference: Option<NodeId>,
    ) -> NodeId {
        debug_assert!(self.nodes.contains_key(parent), "parent node does not exist");
        let id = self.nodes.insert(data);
        self.children.insert(id, Vec::new());
        self.attach(id, parent, reference);
        self.mutations.push(Mutation::Inserted { node: id, parent });
        id
    }

    /// Move an existing node (with its subtree) under `parent`, before
    /// `reference`. Moving a node before itself is a no-op.
    pub fn move_before(&mut self, node: NodeId, parent: NodeId, reference: Option<NodeId>) {
        if !self.nodes.contains_key(node) || !self.nodes.contains_key(parent) {
            return;
        }
        if reference == Some(node) {
            return;
        }
        self.detach(node);
        self.attach(node, parent, reference);
        self.mutations.push(Mutation::Moved { node, parent });
    }

    fn attach(&mut self, node: NodeId, parent: NodeId, reference: Option<NodeId>) {
        self.parent.insert(node, parent);
        if let Some(siblings) = self.children.get_mut(parent) {
            let position = reference.and_then(|r| siblings.iter().position(|&c| c == r));
            match position {
                Some(index) => siblings.insert(index, node),
                None => siblings.push(node),
            }
        }
    }

    fn detach(&mut self, node: NodeId) {
        if let Some(parent_id) = self.parent.remove(node) {
            if let Some(siblings) = self.children.get_mut(parent_id) {
                siblings.retain(|&child| child != node);
            }
        }
    }

    /// Remove a node and all its descendants.
    ///
    /// Returns the `ElementData` for the removed node, or `None` if it didn't
    /// exist. The structural root, head and body cannot be removed.
    pub fn remove(&mut self, id: NodeId) -> Option<ElementData> {
        if !self.nodes.contains_key(id) || id == self.root || id == self.head || id == self.body {
            return None;
        }
        self.detach(id);

        let mut to_remove = VecDeque::new();
        to_remove.push_back(id);
        let mut removed_root_data = None;

        while let Some(current) = to_remove.pop_front() {
            if let Some(kids) = self.children.remove(current) {
                to_remove.extend(kids);
            }
            self.parent.remove(current);
            let data = self.nodes.remove(current);
            if current == id {
                removed_root_data = data;
            }
        }

        if let Some(data) = &removed_root_data {
            self.mutations.push(Mutation::Removed {
                node: id,
                data: data.clone(),
            });
        }
        removed_root_data
    }

    /// Replace the text content of an element. Unchanged text records nothing.
    pub fn set_text(&mut self, id: NodeId, text: &str) {
        if let Some(data) = self.nodes.get_mut(id) {
            if data.text != text {
                data.text = text.to_owned();
                self.mutations.push(Mutation::TextChanged { node: id });
            }
        }
    }

    /// Get the parent of a node, if it has one.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.parent.get(id).copied()
    }

    /// Get the children of a node. Returns an empty slice if the node has no
    /// children or does not exist.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.children
            .get(id)
            .map(Vec::as_slice)
            .unwrap_or(EMPTY_CHILDREN)
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).first().copied()
    }

    /// The sibling immediately after `id`.
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let siblings = self.children(self.parent(id)?);
        let index = siblings.iter().position(|&c| c == id)?;
        siblings.get(index + 1).copied()
    }

    /// Immutable access to an element's data.
    pub fn get(&self, id: NodeId) -> Option<&ElementData> {
        self.nodes.get(id)
    }

    /// Mutable access to an element's data. Changes made through this are
    /// not recorded as mutations.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        self.nodes.get_mut(id)
    }

    /// Number of nodes, including html/head/body.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: the structural nodes are permanent.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Pre-order depth-first traversal starting from `start`.
    pub fn walk_depth_first(&self, start: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack = vec![start];
        while let Some(current) = stack.pop() {
            if !self.nodes.contains_key(current) {
                continue;
            }
            result.push(current);
            for &child in self.children(current).iter().rev() {
                stack.push(child);
            }
        }
        result
    }

    /// Every mutation recorded so far.
    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    /// Drain the mutation log.
    pub fn take_mutations(&mut self) -> Vec<Mutation> {
        std::mem::take(&mut self.mutations)
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style(id: &str) -> ElementData {
        ElementData::style().with_attr("data-css-hash", id)
    }

    #[test]
    fn new_document_structure() {
        let doc = Document::new();
        assert_eq!(doc.children(doc.root()), &[doc.head(), doc.body()]);
        assert_eq!(doc.parent(doc.head()), Some(doc.root()));
        assert_eq!(doc.len(), 3);
        assert!(doc.mutations().is_empty());
    }

    #[test]
    fn append_and_insert_before() {
        let mut doc = Document::new();
        let head = doc.head();
        let a = doc.append_child(head, style("a"));
        let c = doc.append_child(head, style("c"));
        let b = doc.insert_before(head, style("b"), Some(c));
        assert_eq!(doc.children(head), &[a, b, c]);
        assert_eq!(doc.next_sibling(a), Some(b));
        assert_eq!(doc.next_sibling(c), None);
        assert_eq!(doc.first_child(head), Some(a));
    }

    #[test]
    fn insert_before_foreign_reference_appends() {
        let mut doc = Document::new();
        let (head, body) = (doc.head(), doc.body());
        let in_body = doc.append_child(body, style("x"));
        let a = doc.append_child(head, style("a"));
        let b = doc.insert_before(head, style("b"), Some(in_body));
        assert_eq!(doc.children(head), &[a, b]);
    }

    #[test]
    fn move_between_parents() {
        let mut doc = Document::new();
        let (head, body) = (doc.head(), doc.body());
        let a = doc.append_child(head, style("a"));
        let moved = doc.append_child(body, style("m"));
        doc.move_before(moved, head, Some(a));
        assert_eq!(doc.children(head), &[moved, a]);
        assert!(doc.children(body).is_empty());
        assert_eq!(doc.parent(moved), Some(head));
    }

    #[test]
    fn remove_subtree_and_log() {
        let mut doc = Document::new();
        let body = doc.body();
        let outer = doc.append_child(body, ElementData::new("div"));
        let inner = doc.append_child(outer, style("i"));
        doc.take_mutations();

        let removed = doc.remove(outer).unwrap();
        assert_eq!(removed.tag, "div");
        assert!(!doc.contains(inner));
        assert!(doc.children(body).is_empty());
        assert!(matches!(doc.mutations(), [Mutation::Removed { node, .. }] if *node == outer));
    }

    #[test]
    fn structural_nodes_cannot_be_removed() {
        let mut doc = Document::new();
        let head = doc.head();
        assert!(doc.remove(head).is_none());
        assert!(doc.contains(head));
    }

    #[test]
    fn set_text_records_only_changes() {
        let mut doc = Document::new();
        let head = doc.head();
        let a = doc.append_child(head, style("a"));
        doc.take_mutations();
        doc.set_text(a, ".a{}");
        doc.set_text(a, ".a{}");
        assert_eq!(doc.take_mutations(), vec![Mutation::TextChanged { node: a }]);
        assert_eq!(doc.get(a).unwrap().text, ".a{}");
    }

    #[test]
    fn walk_depth_first_order() {
        let mut doc = Document::new();
        let (root, head, body) = (doc.root(), doc.head(), doc.body());
        let a = doc.append_child(head, style("a"));
        let b = doc.append_child(body, style("b"));
        assert_eq!(doc.walk_depth_first(root), vec![root, head, a, body, b]);
    }
}
