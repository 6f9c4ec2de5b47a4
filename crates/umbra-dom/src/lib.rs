//! DOM tree implementation for the umbra style engine.
//!
//! This crate provides an arena-based DOM tree structure following the
//! [DOM Living Standard](https://dom.spec.whatwg.org/), including the
//! [shadow tree](https://dom.spec.whatwg.org/#concept-shadow-tree) relations
//! the style engine walks to find an instance's structural owner.
//!
//! # Design
//!
//! The tree uses arena allocation with [`NodeId`] indices for all relationships,
//! providing O(1) access and traversal without borrow checker issues. A shadow
//! root is a node of its own with no parent; its host points at it through
//! [`Node::shadow_root`] and it points back through [`NodeType::ShadowRoot`].

use std::collections::{HashMap, HashSet};

use thiserror::Error;

/// Map of attribute names to values for an element.
pub type AttributesMap = HashMap<String, String>;

/// A type-safe index into the DOM tree.
///
/// [§ 4.4 Interface Node](https://dom.spec.whatwg.org/#interface-node)
/// "Each node has an associated node document..."
///
/// NodeId provides O(1) access to any node in the tree without borrowing issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl NodeId {
    /// The root document node is always at index 0.
    pub const ROOT: NodeId = NodeId(0);
}

/// Errors raised by structural operations that the DOM standard defines as throwing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
    /// The node id does not refer to a node in this tree.
    #[error("no node with id {0:?}")]
    NoSuchNode(NodeId),
    /// [§ 4.9 attachShadow()](https://dom.spec.whatwg.org/#dom-element-attachshadow)
    /// "If this is not an element, throw a NotSupportedError."
    #[error("node {0:?} is not an element")]
    NotAnElement(NodeId),
    /// [§ 4.9 attachShadow()](https://dom.spec.whatwg.org/#dom-element-attachshadow)
    /// "If this is a shadow host, then throw a NotSupportedError."
    #[error("node {0:?} already hosts a shadow root")]
    ShadowRootExists(NodeId),
}

/// [§ 4.4 Interface Node](https://dom.spec.whatwg.org/#interface-node)
///
/// "Node is an abstract interface that is used by all nodes in a tree."
///
/// This node stores indices for parent/child/sibling relationships,
/// enabling O(1) traversal in any direction.
#[derive(Debug, Clone)]
pub struct Node {
    /// "Each node has an associated node type"
    pub node_type: NodeType,

    /// [§ 4.4](https://dom.spec.whatwg.org/#concept-tree-parent)
    /// "An object that participates in a tree has a parent, which is either
    /// null or an object."
    pub parent: Option<NodeId>,

    /// [§ 4.4](https://dom.spec.whatwg.org/#concept-tree-child)
    /// "A node has an associated list of children"
    pub children: Vec<NodeId>,

    /// [§ 4.4](https://dom.spec.whatwg.org/#concept-tree-next-sibling)
    pub next_sibling: Option<NodeId>,

    /// [§ 4.4](https://dom.spec.whatwg.org/#concept-tree-previous-sibling)
    pub prev_sibling: Option<NodeId>,

    /// [§ 4.2.2.1 Shadow trees](https://dom.spec.whatwg.org/#concept-element-shadow-root)
    /// "An element has an associated shadow root (null or a shadow root)."
    pub shadow_root: Option<NodeId>,
}

impl Node {
    fn detached(node_type: NodeType) -> Self {
        Self {
            node_type,
            parent: None,
            children: Vec::new(),
            next_sibling: None,
            prev_sibling: None,
            shadow_root: None,
        }
    }
}

/// [§ 4.4 Interface Node](https://dom.spec.whatwg.org/#interface-node)
///
/// "Each node has an associated node type"
#[derive(Debug, Clone)]
pub enum NodeType {
    /// [§ 4.5 Interface Document](https://dom.spec.whatwg.org/#interface-document)
    Document,
    /// [§ 4.9 Interface Element](https://dom.spec.whatwg.org/#interface-element)
    Element(ElementData),
    /// [§ 4.8 Interface ShadowRoot](https://dom.spec.whatwg.org/#interface-shadowroot)
    /// "Shadow roots have an associated host (an element)."
    ShadowRoot {
        /// The element this shadow root is attached to.
        host: NodeId,
    },
    /// [§ 4.10 Interface Text](https://dom.spec.whatwg.org/#interface-text)
    Text(String),
    /// [§ 4.7 Interface Comment](https://dom.spec.whatwg.org/#interface-comment)
    Comment(String),
}

/// Element-specific data.
///
/// NOTE: We only store tag_name (local name) and attrs. The `is` attribute
/// doubles as the customized built-in element name.
#[derive(Debug, Clone, Default)]
pub struct ElementData {
    /// "An element's local name"
    pub tag_name: String,
    /// "An element has an associated attribute list"
    pub attrs: AttributesMap,
}

impl ElementData {
    /// Create element data with no attributes.
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into(),
            attrs: AttributesMap::new(),
        }
    }

    /// Returns the element's id attribute value if present.
    pub fn id(&self) -> Option<&String> {
        self.attrs.get("id")
    }

    /// Returns the set of class names from the class attribute.
    ///
    /// Per [§ 3.2.6 Global attributes](https://html.spec.whatwg.org/multipage/dom.html#global-attributes):
    /// "The class attribute, if specified, must have a value that is a set of
    /// space-separated tokens..."
    pub fn classes(&self) -> HashSet<&str> {
        match self.attrs.get("class") {
            Some(classlist) => classlist.split_ascii_whitespace().collect(),
            None => HashSet::new(),
        }
    }

    /// Returns true if the class attribute contains `class_name`.
    pub fn has_class(&self, class_name: &str) -> bool {
        self.attrs
            .get("class")
            .is_some_and(|list| list.split_ascii_whitespace().any(|c| c == class_name))
    }

    /// Get an attribute value by name.
    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    /// [§ 4.13.3 Custom elements](https://html.spec.whatwg.org/multipage/custom-elements.html#custom-element-definition)
    ///
    /// Returns `(element name, type extension)`. For a customized built-in
    /// (`<button is="x-button">`) the element name is the `is` value and the
    /// type extension is the local name; otherwise the local name is the
    /// element name and there is no extension.
    pub fn element_names(&self) -> (String, Option<String>) {
        match self.attrs.get("is") {
            Some(is) if !is.is_empty() => (is.clone(), Some(self.tag_name.clone())),
            _ => (self.tag_name.to_ascii_lowercase(), None),
        }
    }
}

/// [§ 4.3.3 Interface MutationRecord](https://dom.spec.whatwg.org/#interface-mutationrecord)
///
/// A `childList` mutation observed while [`DomTree::observe_mutations`] is on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    /// The parent whose children changed.
    pub target: NodeId,
    /// "addedNodes"
    pub added_nodes: Vec<NodeId>,
    /// "removedNodes"
    pub removed_nodes: Vec<NodeId>,
}

/// Arena-based DOM tree with O(1) node access and traversal.
///
/// [§ 4 Nodes](https://dom.spec.whatwg.org/#nodes)
#[derive(Debug, Clone)]
pub struct DomTree {
    /// All nodes in the tree, indexed by NodeId.
    /// The Document node is always at index 0 (NodeId::ROOT).
    nodes: Vec<Node>,
    /// Whether child-list mutations are being recorded.
    observing: bool,
    /// Pending mutation records, drained by [`DomTree::take_records`].
    records: Vec<MutationRecord>,
}

impl DomTree {
    /// Create a new DOM tree with just the Document node.
    pub fn new() -> Self {
        DomTree {
            nodes: vec![Node::detached(NodeType::Document)],
            observing: false,
            records: Vec::new(),
        }
    }

    /// Get the root document node ID.
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Get a node by its ID.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Get a mutable reference to a node by its ID.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    /// Get the number of nodes in the tree.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the tree is empty (should always have at least the Document).
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Allocate a new node and return its ID.
    /// The node is not yet attached to the tree.
    pub fn alloc(&mut self, node_type: NodeType) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::detached(node_type));
        id
    }

    /// Allocate a detached element with the given tag name.
    pub fn create_element(&mut self, tag_name: &str) -> NodeId {
        self.alloc(NodeType::Element(ElementData::new(tag_name)))
    }

    /// Allocate a detached text node.
    pub fn create_text(&mut self, data: impl Into<String>) -> NodeId {
        self.alloc(NodeType::Text(data.into()))
    }

    /// [§ 4.2.2 Append](https://dom.spec.whatwg.org/#concept-node-append)
    ///
    /// "To append a node to a parent, pre-insert node into parent before null."
    ///
    /// Appends `child` as the last child of `parent`, updating all relationships.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        let prev_last_child = self.nodes[parent.0].children.last().copied();

        self.nodes[parent.0].children.push(child);
        self.nodes[child.0].parent = Some(parent);

        if let Some(prev_id) = prev_last_child {
            self.nodes[prev_id.0].next_sibling = Some(child);
            self.nodes[child.0].prev_sibling = Some(prev_id);
        }
        self.record(parent, vec![child], Vec::new());
    }

    /// [§ 4.2.2 Pre-insert](https://dom.spec.whatwg.org/#concept-node-pre-insert)
    ///
    /// Inserts `child` into `parent` immediately before `reference`. If
    /// `reference` is not a child of `parent`, `child` is appended instead.
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: NodeId) {
        let Some(index) = self.nodes[parent.0]
            .children
            .iter()
            .position(|&c| c == reference)
        else {
            self.append_child(parent, child);
            return;
        };
        self.detach(child);
        // Detaching may have shifted the reference when child was an earlier sibling.
        let index = self.nodes[parent.0]
            .children
            .iter()
            .position(|&c| c == reference)
            .unwrap_or(index);

        self.nodes[parent.0].children.insert(index, child);
        self.nodes[child.0].parent = Some(parent);
        self.relink_siblings(parent);
        self.record(parent, vec![child], Vec::new());
    }

    /// [§ 4.2.3 Remove](https://dom.spec.whatwg.org/#concept-node-remove)
    ///
    /// Removes `child` from `parent`. Does nothing if `child` is not a child
    /// of `parent`.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) {
        if self.parent(child) != Some(parent) {
            return;
        }
        self.detach(child);
        self.record(parent, Vec::new(), vec![child]);
    }

    fn detach(&mut self, child: NodeId) {
        let Some(parent) = self.nodes[child.0].parent else {
            return;
        };
        self.nodes[parent.0].children.retain(|&c| c != child);
        self.relink_siblings(parent);
        let node = &mut self.nodes[child.0];
        node.parent = None;
        node.prev_sibling = None;
        node.next_sibling = None;
    }

    fn relink_siblings(&mut self, parent: NodeId) {
        let children = self.nodes[parent.0].children.clone();
        for (i, &id) in children.iter().enumerate() {
            let prev = i.checked_sub(1).map(|p| children[p]);
            let next = children.get(i + 1).copied();
            let node = &mut self.nodes[id.0];
            node.prev_sibling = prev;
            node.next_sibling = next;
        }
    }

    fn record(&mut self, target: NodeId, added_nodes: Vec<NodeId>, removed_nodes: Vec<NodeId>) {
        if self.observing {
            self.records.push(MutationRecord {
                target,
                added_nodes,
                removed_nodes,
            });
        }
    }

    /// [§ 4.3 Mutation observers](https://dom.spec.whatwg.org/#mutation-observers)
    ///
    /// Start or stop recording `childList` mutations for the whole tree
    /// (`{childList: true, subtree: true}` on the document).
    pub fn observe_mutations(&mut self, observe: bool) {
        self.observing = observe;
        if !observe {
            self.records.clear();
        }
    }

    /// Whether child-list mutations are currently recorded.
    #[must_use]
    pub const fn is_observing(&self) -> bool {
        self.observing
    }

    /// [§ 4.3.1 takeRecords()](https://dom.spec.whatwg.org/#dom-mutationobserver-takerecords)
    ///
    /// "The takeRecords() method steps are: let records be a clone of this's
    /// record queue, empty this's record queue, return records."
    pub fn take_records(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.records)
    }

    /// Get the parent of a node.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    /// Get all children of a node.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Get the element children of a node, in tree order.
    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|&c| self.as_element(c).is_some())
            .collect()
    }

    /// Get the first child of a node.
    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.children.first().copied())
    }

    /// Get the next sibling of a node.
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.next_sibling)
    }

    /// Get the previous sibling of a node.
    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.prev_sibling)
    }

    /// Iterate over all ancestors of a node, from parent to the tree root.
    pub fn ancestors(&self, id: NodeId) -> AncestorIterator<'_> {
        AncestorIterator {
            tree: self,
            current: self.parent(id),
        }
    }

    /// Iterate over the descendants of a node in tree order, not entering
    /// shadow trees.
    pub fn descendants(&self, id: NodeId) -> DescendantIterator<'_> {
        DescendantIterator {
            tree: self,
            stack: self.children(id).iter().rev().copied().collect(),
        }
    }

    /// Get element data if this node is an element.
    pub fn as_element(&self, id: NodeId) -> Option<&ElementData> {
        self.get(id).and_then(|n| match &n.node_type {
            NodeType::Element(data) => Some(data),
            _ => None,
        })
    }

    /// Get mutable element data if this node is an element.
    pub fn as_element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        self.get_mut(id).and_then(|n| match &mut n.node_type {
            NodeType::Element(data) => Some(data),
            _ => None,
        })
    }

    /// Get text content if this node is a text node.
    pub fn as_text(&self, id: NodeId) -> Option<&str> {
        self.get(id).and_then(|n| match &n.node_type {
            NodeType::Text(s) => Some(s.as_str()),
            _ => None,
        })
    }

    /// Get an attribute of an element node.
    pub fn get_attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.as_element(id).and_then(|e| e.get_attribute(name))
    }

    /// Set an attribute on an element node. Non-elements are ignored.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        if let Some(element) = self.as_element_mut(id) {
            let _ = element.attrs.insert(name.to_string(), value.into());
        }
    }

    /// Remove an attribute from an element node.
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) {
        if let Some(element) = self.as_element_mut(id) {
            let _ = element.attrs.remove(name);
        }
    }

    /// [§ 4.4 textContent](https://dom.spec.whatwg.org/#dom-node-textcontent)
    ///
    /// Concatenation of the data of all text node descendants, in tree order.
    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(text) = self.as_text(id) {
            return text.to_string();
        }
        self.descendants(id)
            .filter_map(|d| self.as_text(d))
            .collect()
    }

    /// [§ 4.4 textContent](https://dom.spec.whatwg.org/#dom-node-textcontent)
    ///
    /// "String replace all with the given value within this."
    pub fn set_text_content(&mut self, id: NodeId, text: &str) {
        for child in self.children(id).to_vec() {
            self.remove_child(id, child);
        }
        if !text.is_empty() {
            let text_node = self.create_text(text);
            self.append_child(id, text_node);
        }
    }

    /// [§ 4.9 attachShadow()](https://dom.spec.whatwg.org/#dom-element-attachshadow)
    ///
    /// Creates a shadow root for `host` and returns it.
    ///
    /// # Errors
    /// Returns [`DomError`] if `host` does not exist, is not an element, or
    /// already hosts a shadow root.
    pub fn attach_shadow(&mut self, host: NodeId) -> Result<NodeId, DomError> {
        let node = self.get(host).ok_or(DomError::NoSuchNode(host))?;
        if !matches!(node.node_type, NodeType::Element(_)) {
            return Err(DomError::NotAnElement(host));
        }
        if node.shadow_root.is_some() {
            return Err(DomError::ShadowRootExists(host));
        }
        let root = self.alloc(NodeType::ShadowRoot { host });
        self.nodes[host.0].shadow_root = Some(root);
        Ok(root)
    }

    /// Get the shadow root hosted by `id`, if any.
    pub fn shadow_root(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.shadow_root)
    }

    /// If `id` is a shadow root, return its host.
    pub fn host(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| match n.node_type {
            NodeType::ShadowRoot { host } => Some(host),
            _ => None,
        })
    }

    /// [§ 4.4 getRootNode()](https://dom.spec.whatwg.org/#dom-node-getrootnode)
    ///
    /// "The root of an object is itself, if its parent is null, or else it is
    /// the root of its parent."
    pub fn root_node(&self, id: NodeId) -> NodeId {
        self.ancestors(id).last().unwrap_or(id)
    }

    /// The host of the shadow tree containing `id`, if `id` lives in one.
    pub fn containing_host(&self, id: NodeId) -> Option<NodeId> {
        self.host(self.root_node(id))
    }

    /// [§ 3.1.1 The document element](https://html.spec.whatwg.org/multipage/dom.html#the-html-element-2)
    ///
    /// "The document element of a document is the element whose parent is that
    /// document, if it exists; otherwise null."
    #[must_use]
    pub fn document_element(&self) -> Option<NodeId> {
        self.children(NodeId::ROOT)
            .iter()
            .find(|&&id| self.as_element(id).is_some())
            .copied()
    }

    /// [§ 3.1.3 The head element](https://html.spec.whatwg.org/multipage/dom.html#the-head-element-2)
    ///
    /// "The head element of a document is the first head element that is a
    /// child of the html element, if there is one, or null otherwise."
    #[must_use]
    pub fn head(&self) -> Option<NodeId> {
        let html = self.document_element()?;
        self.children(html)
            .iter()
            .find(|&&id| {
                self.as_element(id)
                    .is_some_and(|e| e.tag_name.eq_ignore_ascii_case("head"))
            })
            .copied()
    }
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over ancestors of a node.
pub struct AncestorIterator<'a> {
    tree: &'a DomTree,
    current: Option<NodeId>,
}

impl Iterator for AncestorIterator<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current?;
        self.current = self.tree.parent(id);
        Some(id)
    }
}

/// Pre-order iterator over the descendants of a node.
pub struct DescendantIterator<'a> {
    tree: &'a DomTree,
    stack: Vec<NodeId>,
}

impl Iterator for DescendantIterator<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.tree.children(id).iter().rev().copied());
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_names_plain() {
        let data = ElementData::new("X-Card");
        assert_eq!(data.element_names(), ("x-card".to_string(), None));
    }

    #[test]
    fn test_element_names_type_extension() {
        let mut data = ElementData::new("button");
        let _ = data.attrs.insert("is".to_string(), "x-button".to_string());
        assert_eq!(
            data.element_names(),
            ("x-button".to_string(), Some("button".to_string()))
        );
    }

    #[test]
    fn test_root_node_of_detached_node_is_itself() {
        let mut tree = DomTree::new();
        let div = tree.create_element("div");
        assert_eq!(tree.root_node(div), div);
    }

    #[test]
    fn test_descendants_in_tree_order() {
        let mut tree = DomTree::new();
        let a = tree.create_element("a");
        let b = tree.create_element("b");
        let c = tree.create_element("c");
        tree.append_child(NodeId::ROOT, a);
        tree.append_child(a, b);
        tree.append_child(NodeId::ROOT, c);
        let order: Vec<NodeId> = tree.descendants(NodeId::ROOT).collect();
        assert_eq!(order, vec![a, b, c]);
    }
}
