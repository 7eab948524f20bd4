//! Arena DOM for the fixture driver.

use std::collections::BTreeMap;

use crate::selector::SelectorTarget;

/// Index of a node in its [`Document`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
enum NodeKind {
    Element {
        tag: String,
        attributes: BTreeMap<String, String>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Declarative element tree used to build documents
#[derive(Debug, Clone)]
pub struct El {
    tag: String,
    attributes: Vec<(String, String)>,
    children: Vec<Child>,
}

#[derive(Debug, Clone)]
enum Child {
    Element(El),
    Text(String),
}

/// Start an element
#[must_use]
pub fn el(tag: &str) -> El {
    El {
        tag: tag.to_string(),
        attributes: Vec::new(),
        children: Vec::new(),
    }
}

impl El {
    /// Add an attribute
    #[must_use]
    pub fn attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.attributes.push((name.to_string(), value.into()));
        self
    }

    /// Add to the `class` attribute
    #[must_use]
    pub fn class(self, class: &str) -> Self {
        self.attr("class", class)
    }

    /// Append a child element
    #[must_use]
    pub fn child(mut self, child: El) -> Self {
        self.children.push(Child::Element(child));
        self
    }

    /// Append children
    #[must_use]
    pub fn children(mut self, children: impl IntoIterator<Item = El>) -> Self {
        self.children
            .extend(children.into_iter().map(Child::Element));
        self
    }

    /// Append a text node
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Child::Text(text.into()));
        self
    }
}

/// A mutable document tree with focus and form-control values
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    focused: Option<NodeId>,
    values: BTreeMap<NodeId, String>,
}

impl Document {
    /// Build a document from a tree; the tree's root becomes the root element
    #[must_use]
    pub fn from_tree(tree: El) -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            root: NodeId(0),
            focused: None,
            values: BTreeMap::new(),
        };
        doc.root = doc.insert(None, tree);
        doc
    }

    fn push(&mut self, kind: NodeKind, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent,
            children: Vec::new(),
        });
        if let Some(parent) = parent {
            self.nodes[parent.0].children.push(id);
        }
        id
    }

    fn insert(&mut self, parent: Option<NodeId>, tree: El) -> NodeId {
        let attributes = tree.attributes.into_iter().collect();
        let id = self.push(
            NodeKind::Element {
                tag: tree.tag,
                attributes,
            },
            parent,
        );
        for child in tree.children {
            match child {
                Child::Element(el) => {
                    self.insert(Some(id), el);
                }
                Child::Text(text) => {
                    self.push(NodeKind::Text(text), Some(id));
                }
            }
        }
        id
    }

    /// Append a tree under `parent`
    pub fn append(&mut self, parent: NodeId, tree: El) -> NodeId {
        self.insert(Some(parent), tree)
    }

    /// Detach every child of `node`
    pub fn clear_children(&mut self, node: NodeId) {
        let children = std::mem::take(&mut self.nodes[node.0].children);
        for child in children {
            self.nodes[child.0].parent = None;
            if self.focused.is_some_and(|f| self.is_descendant_or_self(f, child)) {
                self.focused = None;
            }
        }
    }

    /// Detach `node` from its parent
    pub fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes[node.0].parent.take() {
            self.nodes[parent.0].children.retain(|&c| c != node);
        }
        if self.focused.is_some_and(|f| self.is_descendant_or_self(f, node)) {
            self.focused = None;
        }
    }

    /// Replace the children of `node` with a single text node
    pub fn set_text(&mut self, node: NodeId, text: &str) {
        self.clear_children(node);
        self.push(NodeKind::Text(text.to_string()), Some(node));
    }

    /// Root element
    #[must_use]
    pub const fn root(&self) -> NodeId {
        self.root
    }

    /// Tag name, empty for text nodes
    #[must_use]
    pub fn tag(&self, node: NodeId) -> &str {
        match &self.nodes[node.0].kind {
            NodeKind::Element { tag, .. } => tag,
            NodeKind::Text(_) => "",
        }
    }

    /// Attribute value
    #[must_use]
    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        match &self.nodes[node.0].kind {
            NodeKind::Element { attributes, .. } => attributes.get(name).map(String::as_str),
            NodeKind::Text(_) => None,
        }
    }

    /// All attributes
    #[must_use]
    pub fn attributes(&self, node: NodeId) -> BTreeMap<String, String> {
        match &self.nodes[node.0].kind {
            NodeKind::Element { attributes, .. } => attributes.clone(),
            NodeKind::Text(_) => BTreeMap::new(),
        }
    }

    /// Set an attribute
    pub fn set_attr(&mut self, node: NodeId, name: &str, value: &str) {
        if let NodeKind::Element { attributes, .. } = &mut self.nodes[node.0].kind {
            attributes.insert(name.to_string(), value.to_string());
        }
    }

    /// Remove an attribute
    pub fn remove_attr(&mut self, node: NodeId, name: &str) {
        if let NodeKind::Element { attributes, .. } = &mut self.nodes[node.0].kind {
            attributes.remove(name);
        }
    }

    /// Set or clear a boolean attribute
    pub fn toggle_attr(&mut self, node: NodeId, name: &str, on: bool) {
        if on {
            self.set_attr(node, name, "");
        } else {
            self.remove_attr(node, name);
        }
    }

    /// Whether the `class` attribute contains `class`
    #[must_use]
    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.attr(node, "class")
            .is_some_and(|c| c.split_whitespace().any(|w| w == class))
    }

    /// Add or remove one class
    pub fn set_class(&mut self, node: NodeId, class: &str, on: bool) {
        let mut classes: Vec<String> = self
            .attr(node, "class")
            .unwrap_or_default()
            .split_whitespace()
            .filter(|c| *c != class)
            .map(str::to_string)
            .collect();
        if on {
            classes.push(class.to_string());
        }
        self.set_attr(node, "class", &classes.join(" "));
    }

    /// Parent element
    #[must_use]
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    /// Child nodes (elements and text)
    #[must_use]
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.0].children
    }

    /// Own text if this is a text node
    #[must_use]
    pub fn own_text(&self, node: NodeId) -> Option<&str> {
        match &self.nodes[node.0].kind {
            NodeKind::Text(text) => Some(text),
            NodeKind::Element { .. } => None,
        }
    }

    /// Whether `node` is an element
    #[must_use]
    pub fn is_element(&self, node: NodeId) -> bool {
        matches!(self.nodes[node.0].kind, NodeKind::Element { .. })
    }

    /// Concatenated descendant text
    #[must_use]
    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(node, &mut out);
        out
    }

    fn collect_text(&self, node: NodeId, out: &mut String) {
        match &self.nodes[node.0].kind {
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::Element { .. } => {
                for &child in &self.nodes[node.0].children {
                    self.collect_text(child, out);
                }
            }
        }
    }

    /// Attached elements in document order
    #[must_use]
    pub fn elements(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![self.root];
        while let Some(node) = stack.pop() {
            if !self.is_element(node) {
                continue;
            }
            out.push(node);
            stack.extend(self.nodes[node.0].children.iter().rev());
        }
        out
    }

    /// Whether `node` is still reachable from the root
    #[must_use]
    pub fn is_attached(&self, node: NodeId) -> bool {
        self.is_descendant_or_self(node, self.root)
    }

    fn is_descendant_or_self(&self, node: NodeId, ancestor: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.nodes[current.0].parent;
        }
        false
    }

    /// First attached element with `class`
    #[must_use]
    pub fn find_by_class(&self, class: &str) -> Option<NodeId> {
        self.elements().into_iter().find(|&n| self.has_class(n, class))
    }

    /// First attached element with tag `tag`
    #[must_use]
    pub fn find_by_tag(&self, tag: &str) -> Option<NodeId> {
        self.elements().into_iter().find(|&n| self.tag(n) == tag)
    }

    /// Nearest ancestor-or-self with `class`
    #[must_use]
    pub fn closest_with_class(&self, node: NodeId, class: &str) -> Option<NodeId> {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if self.has_class(current, class) {
                return Some(current);
            }
            cursor = self.parent(current);
        }
        None
    }

    /// Focused element
    #[must_use]
    pub const fn focused(&self) -> Option<NodeId> {
        self.focused
    }

    /// Move focus
    pub fn set_focus(&mut self, node: Option<NodeId>) {
        self.focused = node;
    }

    /// Current value of a form control; `None` for other elements
    #[must_use]
    pub fn value(&self, node: NodeId) -> Option<String> {
        match self.tag(node) {
            "input" | "textarea" | "select" => Some(
                self.values
                    .get(&node)
                    .cloned()
                    .or_else(|| self.attr(node, "value").map(str::to_string))
                    .unwrap_or_default(),
            ),
            _ => None,
        }
    }

    /// Set the value of a form control
    pub fn set_value(&mut self, node: NodeId, value: &str) {
        self.values.insert(node, value.to_string());
    }

    /// Whether the element is disabled
    #[must_use]
    pub fn is_disabled(&self, node: NodeId) -> bool {
        matches!(self.tag(node), "input" | "button" | "select" | "textarea")
            && self.attr(node, "disabled").is_some()
    }
}

impl SelectorTarget for Document {
    type Node = NodeId;

    fn tag_name(&self, node: NodeId) -> &str {
        self.tag(node)
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.attr(node, name)
    }

    fn text_content(&self, node: NodeId) -> String {
        Self::text_content(self, node)
    }

    fn is_focused(&self, node: NodeId) -> bool {
        self.focused == Some(node)
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        Self::parent(self, node)
    }
}
