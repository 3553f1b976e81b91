use markup5ever::local_name;
use std::fmt::Write;

use super::ElementData;

pub struct Node {
    /// Our Id
    pub id: usize,
    /// Our parent's ID
    pub parent: Option<usize>,
    // What are our children?
    pub children: Vec<usize>,

    /// Node type (Element, TextNode, etc) specific data
    pub data: NodeData,
}

impl Node {
    pub(crate) fn new(id: usize, data: NodeData) -> Self {
        Self {
            id,
            parent: None,
            children: vec![],
            data,
        }
    }

    // Get the index of the current node in the parents child list
    pub fn index_of_child(&self, child_id: usize) -> Option<usize> {
        self.children.iter().position(|id| *id == child_id)
    }

    pub fn is_element(&self) -> bool {
        matches!(self.data, NodeData::Element { .. })
    }

    pub fn element_data(&self) -> Option<&ElementData> {
        match self.data {
            NodeData::Element(ref data) => Some(data),
            _ => None,
        }
    }

    pub fn element_data_mut(&mut self) -> Option<&mut ElementData> {
        match self.data {
            NodeData::Element(ref mut data) => Some(data),
            _ => None,
        }
    }

    pub fn text_data_mut(&mut self) -> Option<&mut TextNodeData> {
        match self.data {
            NodeData::Text(ref mut data) => Some(data),
            _ => None,
        }
    }

    pub fn attr(&self, name: impl PartialEq<markup5ever::LocalName>) -> Option<&str> {
        self.element_data()?.attr(name)
    }

    /// A short description of the node for diagnostics, e.g. `<div id="x" class="y">`
    pub fn node_debug_str(&self) -> String {
        let mut s = String::new();

        match &self.data {
            NodeData::Document => write!(s, "DOCUMENT"),
            NodeData::Fragment => write!(s, "FRAGMENT"),
            NodeData::Text(data) => {
                let content: String = data.content.chars().take(10).collect();
                write!(s, "TEXT {}", content.escape_default())
            }
            NodeData::Comment { .. } => write!(s, "COMMENT"),
            NodeData::ProcessingInstruction { target, .. } => write!(s, "PI {target}"),
            NodeData::Element(data) => {
                let _ = write!(s, "<{}", data.qualified_name());
                if let Some(id) = data.id() {
                    let _ = write!(s, " id=\"{id}\"");
                }
                match data.attr(local_name!("class")) {
                    Some(class) if !class.is_empty() => {
                        let _ = write!(s, " class=\"{class}\"");
                    }
                    _ => {}
                }
                write!(s, ">")
            }
        }
        .ok();
        s
    }
}

/// The different kinds of nodes in the DOM.
#[derive(Debug, Clone)]
pub enum NodeData {
    /// The `Document` itself - the root node of a HTML or XML document.
    Document,

    /// A detached container. Holds the output of fragment parsing and cloned templates.
    Fragment,

    /// An element with attributes.
    Element(ElementData),

    /// A text node.
    Text(TextNodeData),

    /// A comment.
    Comment { contents: String },

    /// A processing instruction, e.g. `<?xml-stylesheet href="a.css"?>`
    ProcessingInstruction { target: String, contents: String },
}

#[derive(Debug, Clone)]
pub struct TextNodeData {
    /// The textual content of the text node
    pub content: String,
}

impl TextNodeData {
    pub fn new(content: String) -> Self {
        Self { content }
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Node {}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("parent", &self.parent)
            .field("id", &self.id)
            .field("children", &self.children)
            .field("node", &self.data)
            .finish()
    }
}
