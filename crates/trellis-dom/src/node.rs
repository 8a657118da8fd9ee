//! Arena document and element data.

use serde::Serialize;

/// Index of a node in [`Document::nodes`].
pub type NodeId = usize;

/// Attributes of an element that selectors can observe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ElementNode {
    /// Tag name as written. Type selectors compare it case-insensitively.
    pub tag: String,
    /// The `id` attribute, if any.
    pub id: Option<String>,
    /// The class list, in document order, without duplicates.
    pub classes: Vec<String>,
    /// Raw `style` attribute text, if any.
    pub style: Option<String>,
}

impl ElementNode {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            id: None,
            classes: Vec::new(),
            style: None,
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn with_class(mut self, class: &str) -> Self {
        self.add_class(class);
        self
    }

    /// Set the class list from a whitespace-separated `class` attribute.
    pub fn with_class_attr(mut self, attr: &str) -> Self {
        self.set_class_attr(attr);
        self
    }

    pub fn with_style(mut self, style: &str) -> Self {
        self.style = Some(style.to_string());
        self
    }

    /// Add a class if it is not already present.
    pub fn add_class(&mut self, class: &str) {
        if !class.is_empty() && !self.has_class(class) {
            self.classes.push(class.to_string());
        }
    }

    /// Remove a class. Returns whether it was present.
    pub fn remove_class(&mut self, class: &str) -> bool {
        let before = self.classes.len();
        self.classes.retain(|c| c != class);
        self.classes.len() != before
    }

    /// Replace the class list from a whitespace-separated attribute value.
    pub fn set_class_attr(&mut self, attr: &str) {
        self.classes.clear();
        for class in attr.split_ascii_whitespace() {
            self.add_class(class);
        }
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// Case-insensitive variant of [`ElementNode::has_class`] for quirks mode.
    pub fn has_class_ignore_case(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c.eq_ignore_ascii_case(class))
    }

    /// Case-insensitive tag comparison.
    pub fn is(&self, tag: &str) -> bool {
        self.tag.eq_ignore_ascii_case(tag)
    }
}

/// What a node is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum NodeKind {
    Document,
    Element(ElementNode),
    Text(String),
}

/// One slot in the arena.
#[derive(Debug, Clone, Serialize)]
pub struct Node {
    pub kind: NodeKind,
    /// Back-reference for ancestor walks. Never owning.
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

/// A document tree stored as a flat arena.
///
/// Node 0 is always the document root. Detached nodes keep their slot so
/// that `NodeId`s stay stable.
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    pub nodes: Vec<Node>,
    pub root: NodeId,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// An empty document containing only the root node.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                kind: NodeKind::Document,
                parent: None,
                children: Vec::new(),
            }],
            root: 0,
        }
    }

    /// Append an element as the last child of `parent`.
    ///
    /// # Panics
    ///
    /// Panics if `parent` is out of range or is a text node.
    pub fn append_element(&mut self, parent: NodeId, element: ElementNode) -> NodeId {
        self.append(parent, NodeKind::Element(element))
    }

    /// Append a text node as the last child of `parent`.
    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        self.append(parent, NodeKind::Text(text.to_string()))
    }

    fn append(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        assert!(
            !matches!(self.nodes[parent].kind, NodeKind::Text(_)),
            "cannot append a child to text node {parent}"
        );
        let id = self.nodes.len();
        self.nodes.push(Node {
            kind,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent].children.push(id);
        id
    }

    /// Remove `node_id` (and with it, its subtree) from its parent.
    pub fn detach(&mut self, node_id: NodeId) {
        if let Some(pid) = self.nodes[node_id].parent.take() {
            self.nodes[pid].children.retain(|&c| c != node_id);
            log::trace!("Detached node {node_id} from {pid}");
        }
    }

    pub fn element(&self, node_id: NodeId) -> Option<&ElementNode> {
        match &self.nodes.get(node_id)?.kind {
            NodeKind::Element(e) => Some(e),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, node_id: NodeId) -> Option<&mut ElementNode> {
        match &mut self.nodes.get_mut(node_id)?.kind {
            NodeKind::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Find the nearest ancestor that is an element node.
    pub fn parent_element(&self, node_id: NodeId) -> Option<NodeId> {
        let mut current = self.nodes[node_id].parent;
        while let Some(pid) = current {
            if matches!(self.nodes[pid].kind, NodeKind::Element(_)) {
                return Some(pid);
            }
            current = self.nodes[pid].parent;
        }
        None
    }

    /// Element ancestors of `node_id`, nearest first.
    pub fn ancestors(&self, node_id: NodeId) -> Ancestors<'_> {
        Ancestors {
            doc: self,
            next: self.parent_element(node_id),
        }
    }

    /// Whether `node_id` is the first element child of its parent.
    pub fn is_first_element_child(&self, node_id: NodeId) -> bool {
        self.sibling_elements(node_id)
            .and_then(|mut it| it.next())
            .is_some_and(|first| first == node_id)
    }

    /// Whether `node_id` is the last element child of its parent.
    pub fn is_last_element_child(&self, node_id: NodeId) -> bool {
        self.sibling_elements(node_id)
            .and_then(|it| it.last())
            .is_some_and(|last| last == node_id)
    }

    fn sibling_elements(&self, node_id: NodeId) -> Option<impl Iterator<Item = NodeId> + '_> {
        let pid = self.nodes[node_id].parent?;
        Some(
            self.nodes[pid]
                .children
                .iter()
                .copied()
                .filter(|&sid| matches!(self.nodes[sid].kind, NodeKind::Element(_))),
        )
    }

    /// Every element attached to the tree, in document (pre-)order.
    pub fn elements(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            if matches!(self.nodes[id].kind, NodeKind::Element(_)) {
                out.push(id);
            }
            stack.extend(self.nodes[id].children.iter().rev());
        }
        out
    }

    /// First attached element whose `id` attribute equals `id`.
    pub fn find_by_id(&self, id: &str) -> Option<NodeId> {
        self.elements()
            .into_iter()
            .find(|&nid| self.element(nid).and_then(|e| e.id.as_deref()) == Some(id))
    }
}

/// Iterator over element ancestors, see [`Document::ancestors`].
pub struct Ancestors<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.doc.parent_element(current);
        Some(current)
    }
}
