//! Incremental document construction.

use crate::node::{Document, ElementNode, NodeId};

/// Builds a [`Document`] with an open-element stack, the way a tree
/// builder consumes start and end tags.
///
/// ```
/// use trellis_dom::{DocumentBuilder, ElementNode};
///
/// let mut b = DocumentBuilder::new();
/// b.open(ElementNode::new("ul"));
/// let li = b.open(ElementNode::new("li"));
/// b.text("A");
/// b.close();
/// b.close();
/// let doc = b.finish();
/// assert_eq!(doc.element(li).unwrap().tag, "li");
/// ```
pub struct DocumentBuilder {
    doc: Document,
    open: Vec<NodeId>,
}

impl Default for DocumentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentBuilder {
    pub fn new() -> Self {
        let doc = Document::new();
        let root = doc.root;
        Self {
            doc,
            open: vec![root],
        }
    }

    fn current(&self) -> NodeId {
        // The root is never popped.
        self.open.last().copied().unwrap_or(self.doc.root)
    }

    /// Append an element under the current node and make it current.
    pub fn open(&mut self, element: ElementNode) -> NodeId {
        let id = self.doc.append_element(self.current(), element);
        self.open.push(id);
        id
    }

    /// Append an element under the current node without descending into it.
    pub fn leaf(&mut self, element: ElementNode) -> NodeId {
        self.doc.append_element(self.current(), element)
    }

    /// Append a text node under the current node.
    pub fn text(&mut self, text: &str) -> NodeId {
        self.doc.append_text(self.current(), text)
    }

    /// Close the current element. Closing with nothing open is ignored.
    pub fn close(&mut self) {
        if self.open.len() > 1 {
            self.open.pop();
        }
    }

    /// Close any still-open elements and return the document.
    pub fn finish(self) -> Document {
        self.doc
    }
}
