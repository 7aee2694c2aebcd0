use super::event_model::{Attribute, QName};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StreamedNodeKind {
    Document,
    Element,
    Attribute,
    Text,
    Comment,
    ProcessingInstruction,
}

/// A node of a document that is being streamed.
///
/// Only the node itself and its ancestor chain are known; descendants and
/// following siblings have not been read yet when the node is visited.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamedNode {
    pub kind: StreamedNodeKind,
    pub name: Option<QName>,
    pub value: Option<String>,
    pub attributes: Vec<Attribute>,
    pub depth: usize,
    /// One-based position among the parent's children.
    pub position: usize,
    pub parent: Option<Arc<StreamedNode>>,
}

impl StreamedNode {
    fn new(kind: StreamedNodeKind, depth: usize, position: usize) -> Self {
        Self {
            kind,
            name: None,
            value: None,
            attributes: vec![],
            depth,
            position,
            parent: None,
        }
    }

    pub fn document() -> Self {
        Self::new(StreamedNodeKind::Document, 0, 0)
    }

    pub fn element(name: QName, attributes: Vec<Attribute>, depth: usize, position: usize) -> Self {
        Self {
            name: Some(name),
            attributes,
            ..Self::new(StreamedNodeKind::Element, depth, position)
        }
    }

    pub fn text(content: impl Into<String>, depth: usize, position: usize) -> Self {
        Self {
            value: Some(content.into()),
            ..Self::new(StreamedNodeKind::Text, depth, position)
        }
    }

    pub fn attribute(name: QName, value: impl Into<String>, depth: usize) -> Self {
        Self {
            name: Some(name),
            value: Some(value.into()),
            ..Self::new(StreamedNodeKind::Attribute, depth, 0)
        }
    }

    pub fn comment(content: impl Into<String>, depth: usize, position: usize) -> Self {
        Self {
            value: Some(content.into()),
            ..Self::new(StreamedNodeKind::Comment, depth, position)
        }
    }

    pub fn processing_instruction(
        target: impl Into<String>,
        data: impl Into<String>,
        depth: usize,
        position: usize,
    ) -> Self {
        Self {
            name: Some(QName::new(target)),
            value: Some(data.into()),
            ..Self::new(StreamedNodeKind::ProcessingInstruction, depth, position)
        }
    }

    pub fn with_parent(mut self, parent: Arc<StreamedNode>) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn is_document(&self) -> bool {
        self.kind == StreamedNodeKind::Document
    }

    pub fn is_element(&self) -> bool {
        self.kind == StreamedNodeKind::Element
    }

    pub fn is_attribute(&self) -> bool {
        self.kind == StreamedNodeKind::Attribute
    }

    pub fn is_text(&self) -> bool {
        self.kind == StreamedNodeKind::Text
    }

    pub fn local_name(&self) -> Option<&str> {
        self.name.as_ref().map(|n| n.local_name.as_str())
    }

    /// Looks up an attribute by lexical name (`id` or `xml:lang`).
    pub fn attribute_value(&self, name: &str) -> Option<&str> {
        let wanted = QName::parse(name);
        self.attributes
            .iter()
            .find(|a| a.name.local_name == wanted.local_name && a.name.prefix == wanted.prefix)
            .map(|a| a.value.as_str())
    }

    /// The string value as far as it is known at visit time.
    ///
    /// Elements and the document report an empty string: their text content
    /// has not been streamed yet.
    pub fn string_value(&self) -> String {
        match self.kind {
            StreamedNodeKind::Text
            | StreamedNodeKind::Comment
            | StreamedNodeKind::Attribute
            | StreamedNodeKind::ProcessingInstruction => self.value.clone().unwrap_or_default(),
            StreamedNodeKind::Element | StreamedNodeKind::Document => String::new(),
        }
    }

    pub fn parent(&self) -> Option<&Arc<StreamedNode>> {
        self.parent.as_ref()
    }

    /// Ancestors from the parent up to the document node.
    pub fn ancestors(&self) -> impl Iterator<Item = &StreamedNode> {
        std::iter::successors(self.parent.as_deref(), |n| n.parent.as_deref())
    }
}

/// Tracks the open-element chain while a document is streamed and hands out
/// nodes linked to their ancestors.
#[derive(Debug)]
pub struct NodeCursor {
    document: Arc<StreamedNode>,
    open: Vec<Arc<StreamedNode>>,
    position_stack: Vec<usize>,
}

impl NodeCursor {
    pub fn new() -> Self {
        Self {
            document: Arc::new(StreamedNode::document()),
            open: Vec::new(),
            position_stack: vec![0],
        }
    }

    pub fn document(&self) -> Arc<StreamedNode> {
        Arc::clone(&self.document)
    }

    pub fn depth(&self) -> usize {
        self.open.len()
    }

    fn parent(&self) -> Arc<StreamedNode> {
        self.open.last().cloned().unwrap_or_else(|| self.document())
    }

    fn next_position(&mut self) -> usize {
        match self.position_stack.last_mut() {
            Some(count) => {
                *count += 1;
                *count
            }
            None => 1,
        }
    }

    pub fn push_element(&mut self, name: QName, attributes: Vec<Attribute>) -> Arc<StreamedNode> {
        let position = self.next_position();
        let node = Arc::new(
            StreamedNode::element(name, attributes, self.depth() + 1, position)
                .with_parent(self.parent()),
        );
        self.open.push(Arc::clone(&node));
        self.position_stack.push(0);
        node
    }

    /// Closes the innermost open element and returns it.
    pub fn pop_element(&mut self) -> Option<Arc<StreamedNode>> {
        let node = self.open.pop()?;
        self.position_stack.pop();
        Some(node)
    }

    pub fn text(&mut self, content: &str) -> Arc<StreamedNode> {
        let position = self.next_position();
        Arc::new(StreamedNode::text(content, self.depth(), position).with_parent(self.parent()))
    }

    pub fn comment(&mut self, content: &str) -> Arc<StreamedNode> {
        let position = self.next_position();
        Arc::new(StreamedNode::comment(content, self.depth(), position).with_parent(self.parent()))
    }

    pub fn processing_instruction(&mut self, target: &str, data: &str) -> Arc<StreamedNode> {
        let position = self.next_position();
        Arc::new(
            StreamedNode::processing_instruction(target, data, self.depth(), position)
                .with_parent(self.parent()),
        )
    }
}

impl Default for NodeCursor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_streamed_node_element() {
        let node = StreamedNode::element(
            QName::new("div"),
            vec![Attribute::new("class", "container")],
            1,
            1,
        );
        assert!(node.is_element());
        assert_eq!(node.local_name(), Some("div"));
        assert_eq!(node.attribute_value("class"), Some("container"));
        assert_eq!(node.attribute_value("id"), None);
        assert_eq!(node.string_value(), "");
    }

    #[test]
    fn test_streamed_node_text() {
        let node = StreamedNode::text("Hello, world!", 2, 3);
        assert!(node.is_text());
        assert_eq!(node.string_value(), "Hello, world!");
    }

    #[test]
    fn test_cursor_links_ancestors() {
        let mut cursor = NodeCursor::new();
        cursor.push_element(QName::new("root"), vec![]);
        let child = cursor.push_element(QName::new("child"), vec![]);
        assert_eq!(child.depth, 2);

        let names: Vec<_> = child.ancestors().map(|n| n.local_name()).collect();
        assert_eq!(names, vec![Some("root"), None]);
        assert!(child.ancestors().last().is_some_and(StreamedNode::is_document));

        let text = cursor.text("body");
        assert_eq!(text.parent().and_then(|p| p.local_name()), Some("child"));
        assert_eq!(text.depth, 2);
    }

    #[test]
    fn test_cursor_sibling_positions() {
        let mut cursor = NodeCursor::new();
        cursor.push_element(QName::new("list"), vec![]);

        let first = cursor.push_element(QName::new("item"), vec![]);
        cursor.pop_element();
        let gap = cursor.text(" ");
        let second = cursor.push_element(QName::new("item"), vec![]);

        assert_eq!(first.position, 1);
        assert_eq!(gap.position, 2);
        assert_eq!(second.position, 3);

        assert_eq!(cursor.pop_element().and_then(|n| n.local_name().map(String::from)), Some("item".into()));
        assert_eq!(cursor.depth(), 1);
    }

    #[test]
    fn test_pop_on_empty_cursor() {
        let mut cursor = NodeCursor::new();
        assert!(cursor.pop_element().is_none());
        assert_eq!(cursor.depth(), 0);
    }
}
