//! Arena-backed document tree.
//!
//! Nodes never move once allocated. [`Document::remove`] detaches a subtree
//! and keeps it alive so it can be inserted again; [`Document::discard`]
//! frees its slots for reuse. Every slot carries a generation, so a stale
//! [`NodeId`] resolves to nothing instead of to a different node.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::element::Element;

/// Upper bound on ancestor walks. Trees deeper than this are treated as if
/// the walk reached the root.
pub const MAX_DEPTH: usize = 512;

/// Document shared between a host and anything bound to it.
pub type SharedDocument = Arc<RwLock<Document>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: usize,
    generation: u32,
}

impl NodeId {
    pub fn index(self) -> usize {
        self.index
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub tag: String,
    pub id: Option<String>,
    pub attributes: HashMap<String, String>,
    pub classes: Vec<String>,
    pub text: Option<String>,
    pub value: String,
    pub checked: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    attached: bool,
}

impl Node {
    fn from_element(el: &Element) -> Self {
        Self {
            tag: el.tag.clone(),
            id: el.id.clone(),
            attributes: el.attributes.clone(),
            classes: el.classes.clone(),
            text: el.text.clone(),
            value: el.value.clone(),
            checked: el.checked,
            parent: None,
            children: Vec::new(),
            attached: false,
        }
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn data(&self, key: &str) -> Option<&str> {
        self.attr(&format!("data-{key}"))
    }

    pub fn name(&self) -> Option<&str> {
        self.attr("name")
    }

    /// Lower-cased `type` attribute, `"text"` when absent.
    pub fn input_type(&self) -> String {
        self.attr("type")
            .map(str::to_ascii_lowercase)
            .unwrap_or_else(|| "text".to_string())
    }

    pub fn is_form(&self) -> bool {
        self.tag == "form"
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }
}

/// Iterator over a node's ancestors, nearest first, bounded by [`MAX_DEPTH`].
pub struct Ancestors<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
    remaining: usize,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        if self.remaining == 0 {
            if self.next.is_some() {
                log::warn!("[dom] ancestor walk stopped at depth limit {MAX_DEPTH}");
                self.next = None;
            }
            return None;
        }
        let current = self.next?;
        self.remaining -= 1;
        self.next = self.doc.parent(current);
        Some(current)
    }
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

#[derive(Debug, Clone)]
pub struct Document {
    slots: Vec<Slot>,
    free: Vec<usize>,
    root: NodeId,
    revision: u64,
    submissions: Vec<NodeId>,
}

impl Document {
    pub fn new(root: Element) -> Self {
        let mut doc = Self {
            slots: Vec::new(),
            free: Vec::new(),
            root: NodeId {
                index: 0,
                generation: 0,
            },
            revision: 0,
            submissions: Vec::new(),
        };
        doc.root = doc.allocate(root);
        doc.set_attached(doc.root, true);
        doc
    }

    pub fn shared(self) -> SharedDocument {
        Arc::new(RwLock::new(self))
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.slots
            .get(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots
            .get_mut(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    /// Number of live nodes, attached or not.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Always `false`: a document has at least its root.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_attached(&self, id: NodeId) -> bool {
        self.node(id).is_some_and(Node::is_attached)
    }

    /// Structural mutation counter. Bumped on every insert and removal.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    // Tree construction

    /// Allocate nodes for `el` and its subtree. The new subtree is detached.
    fn allocate(&mut self, el: Element) -> NodeId {
        let mut top = None;
        let mut stack: Vec<(Element, Option<NodeId>)> = vec![(el, None)];

        while let Some((mut el, parent)) = stack.pop() {
            let children = std::mem::take(&mut el.children);
            let mut node = Node::from_element(&el);
            node.parent = parent;
            let id = self.store(node);
            top.get_or_insert(id);

            if let Some(parent) = parent.and_then(|p| self.node_mut(p)) {
                parent.children.push(id);
            }
            stack.extend(children.into_iter().rev().map(|child| (child, Some(id))));
        }

        top.unwrap_or(self.root)
    }

    /// Put `node` in a free slot, or a new one.
    fn store(&mut self, node: Node) -> NodeId {
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index];
                slot.node = Some(node);
                NodeId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                NodeId {
                    index: self.slots.len() - 1,
                    generation: 0,
                }
            }
        }
    }

    fn set_attached(&mut self, id: NodeId, attached: bool) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.node_mut(current) {
                node.attached = attached;
                stack.extend(node.children.iter().copied());
            }
        }
    }

    /// Create a detached node tree. Insert it with [`insert_after`](Self::insert_after)
    /// or [`append_child`](Self::append_child).
    pub fn create_element(&mut self, el: Element) -> NodeId {
        self.allocate(el)
    }

    fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.node(id).and_then(|n| n.parent) {
            if let Some(parent) = self.node_mut(parent) {
                parent.children.retain(|c| *c != id);
            }
        }
        if let Some(node) = self.node_mut(id) {
            node.parent = None;
        }
    }

    /// Insert `node` as the next sibling of `reference`.
    pub fn insert_after(&mut self, node: NodeId, reference: NodeId) -> bool {
        if node == self.root || node == reference || self.node(node).is_none() {
            return false;
        }
        let Some(parent) = self.parent(reference) else {
            return false;
        };
        if parent == node || self.ancestors(parent).any(|a| a == node) {
            return false;
        }

        self.detach(node);
        let attached = self.is_attached(parent);
        let Some(parent_node) = self.node_mut(parent) else {
            return false;
        };
        let position = parent_node
            .children
            .iter()
            .position(|c| *c == reference)
            .map_or(parent_node.children.len(), |p| p + 1);
        parent_node.children.insert(position, node);
        if let Some(n) = self.node_mut(node) {
            n.parent = Some(parent);
        }
        self.set_attached(node, attached);
        self.revision += 1;
        true
    }

    /// Append `child` as the last child of `parent`.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        if child == self.root || child == parent || self.node(child).is_none() {
            return false;
        }
        if self.ancestors(parent).any(|a| a == child) {
            return false;
        }

        self.detach(child);
        let attached = self.is_attached(parent);
        let Some(parent_node) = self.node_mut(parent) else {
            return false;
        };
        parent_node.children.push(child);
        if let Some(n) = self.node_mut(child) {
            n.parent = Some(parent);
        }
        self.set_attached(child, attached);
        self.revision += 1;
        true
    }

    /// Detach `id` and its subtree from the tree.
    pub fn remove(&mut self, id: NodeId) -> bool {
        if id == self.root || self.node(id).is_none_or(|n| n.parent.is_none()) {
            return false;
        }
        self.detach(id);
        self.set_attached(id, false);
        self.revision += 1;
        true
    }

    /// Remove `id` and its subtree for good. Their slots are reused by later
    /// allocations and their ids stop resolving.
    pub fn discard(&mut self, id: NodeId) -> bool {
        if id == self.root || self.node(id).is_none() {
            return false;
        }
        self.detach(id);

        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(slot) = self
                .slots
                .get_mut(current.index)
                .filter(|slot| slot.generation == current.generation)
            else {
                continue;
            };
            if let Some(node) = slot.node.take() {
                stack.extend(node.children);
            }
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(current.index);
        }
        self.revision += 1;
        true
    }

    // Queries

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.parent)
    }

    /// Ancestors of `id`, nearest first, not including `id` itself.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            doc: self,
            next: self.parent(id),
            remaining: MAX_DEPTH,
        }
    }

    /// Element siblings of `id` in document order, excluding `id`.
    pub fn siblings(&self, id: NodeId) -> Vec<NodeId> {
        let Some(parent) = self.parent(id).and_then(|p| self.node(p)) else {
            return Vec::new();
        };
        parent.children.iter().copied().filter(|c| *c != id).collect()
    }

    /// All nodes below `scope` in document order, excluding `scope`.
    pub fn descendants(&self, scope: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let Some(node) = self.node(scope) else {
            return out;
        };
        let mut stack: Vec<NodeId> = node.children.iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            out.push(current);
            if let Some(node) = self.node(current) {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    /// Find an attached element by its `id`.
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        if self.node(self.root)?.id.as_deref() == Some(id) {
            return Some(self.root);
        }
        self.descendants(self.root)
            .into_iter()
            .find(|n| self.node(*n).is_some_and(|node| node.id.as_deref() == Some(id)))
    }

    pub fn find_by_name(&self, scope: NodeId, name: &str) -> Vec<NodeId> {
        self.find_all(scope, |node| node.name() == Some(name))
    }

    pub fn find_by_class(&self, scope: NodeId, class: &str) -> Vec<NodeId> {
        self.find_all(scope, |node| node.has_class(class))
    }

    pub fn find_all(&self, scope: NodeId, predicate: impl Fn(&Node) -> bool) -> Vec<NodeId> {
        self.descendants(scope)
            .into_iter()
            .filter(|n| self.node(*n).is_some_and(&predicate))
            .collect()
    }

    /// `id` itself or its nearest ancestor matching `predicate`.
    pub fn closest(&self, id: NodeId, predicate: impl Fn(&Node) -> bool) -> Option<NodeId> {
        if self.node(id).is_some_and(&predicate) {
            return Some(id);
        }
        self.ancestors(id)
            .find(|a| self.node(*a).is_some_and(&predicate))
    }

    /// The nearest enclosing `<form>` of `id`, or `None` if there is none.
    pub fn nearest_form(&self, id: NodeId) -> Option<NodeId> {
        self.ancestors(id)
            .find(|a| self.node(*a).is_some_and(Node::is_form))
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.node(id).and_then(|n| n.text.as_deref())
    }

    // Mutation of node state

    pub fn add_class(&mut self, id: NodeId, class: &str) -> bool {
        let Some(node) = self.node_mut(id) else {
            return false;
        };
        if !node.has_class(class) {
            node.classes.push(class.to_string());
        }
        true
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) -> bool {
        let Some(node) = self.node_mut(id) else {
            return false;
        };
        node.classes.retain(|c| c != class);
        true
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.node(id).is_some_and(|n| n.has_class(class))
    }

    pub fn set_attr(&mut self, id: NodeId, key: &str, value: impl Into<String>) -> bool {
        let Some(node) = self.node_mut(id) else {
            return false;
        };
        node.attributes.insert(key.to_ascii_lowercase(), value.into());
        true
    }

    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) -> bool {
        let Some(node) = self.node_mut(id) else {
            return false;
        };
        node.text = Some(text.into());
        true
    }

    pub fn set_value(&mut self, id: NodeId, value: impl Into<String>) -> bool {
        let Some(node) = self.node_mut(id) else {
            return false;
        };
        node.value = value.into();
        true
    }

    /// Set the checked state of a checkbox or radio. Checking a radio unchecks
    /// the other radios sharing its name within the same form.
    pub fn set_checked(&mut self, id: NodeId, checked: bool) -> bool {
        let Some(node) = self.node(id) else {
            return false;
        };

        if checked && node.input_type() == "radio" {
            if let Some(name) = node.name().map(str::to_string) {
                let scope = self.nearest_form(id).unwrap_or(self.root);
                for other in self.find_by_name(scope, &name) {
                    if other != id && self.node(other).is_some_and(|n| n.input_type() == "radio") {
                        if let Some(n) = self.node_mut(other) {
                            n.checked = false;
                        }
                    }
                }
            }
        }

        if let Some(node) = self.node_mut(id) {
            node.checked = checked;
        }
        true
    }

    /// Submit a form programmatically.
    pub fn submit(&mut self, form: NodeId) -> bool {
        if !self.node(form).is_some_and(Node::is_form) {
            return false;
        }
        log::debug!("[dom] form {:?} submitted", self.node(form).and_then(|n| n.id.as_deref()));
        self.submissions.push(form);
        true
    }

    /// Forms submitted so far, in order.
    pub fn submissions(&self) -> &[NodeId] {
        &self.submissions
    }
}
