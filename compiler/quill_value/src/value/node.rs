//! Markup trees for `[#visit]`/`[#recurse]` and the node builtins.
//!
//! A [`NodeTree`] is an immutable arena; a [`NodeRef`] is the tree plus an
//! index, so parent, children and ancestors are O(1) handles that share the
//! same allocation.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum NodeType {
    Document,
    Element,
    Text,
}

impl NodeType {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeType::Document => "document",
            NodeType::Element => "element",
            NodeType::Text => "text",
        }
    }
}

#[derive(Debug)]
struct NodeData {
    node_type: NodeType,
    /// Element name; `@document` and `@text` for the other kinds.
    name: Arc<str>,
    /// Own text for text nodes, empty otherwise.
    text: Arc<str>,
    attributes: IndexMap<Arc<str>, Arc<str>>,
    parent: Option<u32>,
    children: Vec<u32>,
}

/// Arena holding one document.
#[derive(Debug)]
pub struct NodeTree {
    nodes: Vec<NodeData>,
}

/// Handle to one node in a shared tree.
#[derive(Clone)]
pub struct NodeRef {
    tree: Arc<NodeTree>,
    index: u32,
}

impl NodeRef {
    fn data(&self) -> &NodeData {
        &self.tree.nodes[self.index as usize]
    }

    fn at(&self, index: u32) -> NodeRef {
        NodeRef {
            tree: Arc::clone(&self.tree),
            index,
        }
    }

    pub fn node_type(&self) -> NodeType {
        self.data().node_type
    }

    /// Element name, or `@document` / `@text`.
    pub fn name(&self) -> &Arc<str> {
        &self.data().name
    }

    pub fn attribute(&self, name: &str) -> Option<&Arc<str>> {
        self.data().attributes.get(name)
    }

    pub fn parent(&self) -> Option<NodeRef> {
        self.data().parent.map(|p| self.at(p))
    }

    pub fn children(&self) -> Vec<NodeRef> {
        self.data().children.iter().map(|&c| self.at(c)).collect()
    }

    /// Child elements named `name`.
    pub fn children_named(&self, name: &str) -> Vec<NodeRef> {
        self.data()
            .children
            .iter()
            .map(|&c| self.at(c))
            .filter(|c| c.node_type() == NodeType::Element && &**c.name() == name)
            .collect()
    }

    pub fn root(&self) -> NodeRef {
        self.at(0)
    }

    /// Parent, grandparent, ... up to the document.
    pub fn ancestors(&self) -> Vec<NodeRef> {
        let mut out = Vec::new();
        let mut current = self.parent();
        while let Some(node) = current {
            current = node.parent();
            out.push(node);
        }
        out
    }

    /// Concatenated text of this node and its descendants.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        let data = self.data();
        out.push_str(&data.text);
        for &child in &data.children {
            self.at(child).collect_text(out);
        }
    }
}

impl PartialEq for NodeRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.tree, &other.tree) && self.index == other.index
    }
}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({} #{})", self.name(), self.index)
    }
}

/// Builds a [`NodeTree`] depth-first.
///
/// ```text
/// let mut b = NodeTreeBuilder::new();
/// b.open("book").attribute("lang", "en");
/// b.open("title").text("Quill").close();
/// let doc = b.finish();
/// ```
pub struct NodeTreeBuilder {
    nodes: Vec<NodeData>,
    open: Vec<u32>,
}

impl NodeTreeBuilder {
    pub fn new() -> Self {
        NodeTreeBuilder {
            nodes: vec![NodeData {
                node_type: NodeType::Document,
                name: Arc::from("@document"),
                text: Arc::from(""),
                attributes: IndexMap::new(),
                parent: None,
                children: Vec::new(),
            }],
            open: vec![0],
        }
    }

    fn push(&mut self, node_type: NodeType, name: &str, text: &str) -> u32 {
        let parent = self.open.last().copied().unwrap_or(0);
        let index = u32::try_from(self.nodes.len()).unwrap_or(u32::MAX);
        self.nodes.push(NodeData {
            node_type,
            name: Arc::from(name),
            text: Arc::from(text),
            attributes: IndexMap::new(),
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent as usize].children.push(index);
        index
    }

    /// Open a child element of the current element.
    pub fn open(&mut self, name: &str) -> &mut Self {
        let index = self.push(NodeType::Element, name, "");
        self.open.push(index);
        self
    }

    /// Set an attribute on the current element.
    pub fn attribute(&mut self, name: &str, value: &str) -> &mut Self {
        if let Some(&current) = self.open.last() {
            self.nodes[current as usize]
                .attributes
                .insert(Arc::from(name), Arc::from(value));
        }
        self
    }

    pub fn text(&mut self, text: &str) -> &mut Self {
        self.push(NodeType::Text, "@text", text);
        self
    }

    /// Close the current element. Closing the document is a no-op.
    pub fn close(&mut self) -> &mut Self {
        if self.open.len() > 1 {
            self.open.pop();
        }
        self
    }

    /// Close everything still open and return the document node.
    pub fn finish(self) -> NodeRef {
        NodeRef {
            tree: Arc::new(NodeTree { nodes: self.nodes }),
            index: 0,
        }
    }
}

impl Default for NodeTreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
