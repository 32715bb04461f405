//! The parsed content tree of a document.
//!
//! The tree is plain data: it serializes deterministically (attribute maps are ordered),
//! which is what makes hashing its serialization a usable change detector.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Document,
    Paragraph,
    Heading,
    BlockQuote,
    CodeBlock,
    HtmlBlock,
    List,
    Item,
    Table,
    TableHead,
    TableRow,
    TableCell,
    FootnoteDefinition,
    Emphasis,
    Strong,
    Strikethrough,
    Link,
    Image,
    Text,
    Code,
    Html,
    Math,
    FootnoteReference,
    TaskListMarker,
    SoftBreak,
    HardBreak,
    Rule,
    /// A construct the parser knows but the tree does not model specifically.
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Node {
            kind,
            attributes: BTreeMap::new(),
            children: Vec::new(),
            text: None,
        }
    }

    /// Creates a leaf node carrying literal text.
    pub fn leaf(kind: NodeKind, text: impl Into<String>) -> Self {
        Node {
            text: Some(text.into()),
            ..Node::new(kind)
        }
    }

    pub fn with_attribute(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Iterates over this node and all of its descendants, depth first, in document order.
    pub fn walk(&self) -> Walk<'_> {
        Walk { stack: vec![self] }
    }

    /// Returns every node in this subtree matching the predicate, in document order.
    pub fn find_nodes<P>(&self, mut predicate: P) -> Vec<&Node>
    where
        P: FnMut(&Node) -> bool,
    {
        self.walk().filter(|node| predicate(node)).collect()
    }

    /// Concatenates the literal text of all text and inline code leaves in this subtree.
    pub fn text_content(&self) -> String {
        let mut content = String::new();
        for node in self.walk() {
            match node.kind {
                NodeKind::Text | NodeKind::Code => {
                    if let Some(text) = &node.text {
                        content.push_str(text);
                    }
                }
                NodeKind::SoftBreak | NodeKind::HardBreak => content.push(' '),
                _ => {}
            }
        }
        content
    }
}

pub struct Walk<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        // Reverse so the first child is visited next
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// A parsed document: the content tree plus the raw leading frontmatter block, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub root: Node,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frontmatter: Option<String>,
}

impl Tree {
    pub fn new(root: Node) -> Self {
        Tree {
            root,
            frontmatter: None,
        }
    }

    pub fn walk(&self) -> Walk<'_> {
        self.root.walk()
    }
}
