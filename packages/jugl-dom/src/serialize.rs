//! HTML and XML serialization of a [`Document`] subtree.

use crate::{Document, NodeData, ns};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "basefont", "bgsound", "br", "col", "embed", "frame", "hr", "img", "input",
    "keygen", "link", "meta", "param", "source", "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &[
    "script", "style", "xmp", "iframe", "noembed", "noframes", "plaintext",
];

impl Document {
    /// Serialize the children of `node_id` as HTML (the `innerHTML` of the node).
    pub fn inner_html(&self, node_id: usize) -> String {
        let mut output = String::new();
        for &child_id in &self.nodes[node_id].children {
            self.write_outer_html(child_id, &mut output);
        }
        output
    }

    /// Serialize `node_id` and its descendants as HTML (the `outerHTML` of the node).
    pub fn outer_html(&self, node_id: usize) -> String {
        let mut output = String::new();
        self.write_outer_html(node_id, &mut output);
        output
    }

    pub fn write_outer_html(&self, node_id: usize, writer: &mut String) {
        let node = &self.nodes[node_id];
        match &node.data {
            NodeData::Document | NodeData::Fragment => {
                for &child_id in &node.children {
                    self.write_outer_html(child_id, writer);
                }
            }
            NodeData::Comment { contents } => {
                writer.push_str("<!--");
                writer.push_str(contents);
                writer.push_str("-->");
            }
            NodeData::ProcessingInstruction { target, contents } => {
                writer.push_str("<?");
                writer.push_str(target);
                writer.push(' ');
                writer.push_str(contents);
                writer.push('>');
            }
            NodeData::Text(data) => {
                let raw_parent = node
                    .parent
                    .and_then(|id| self.nodes[id].element_data())
                    .is_some_and(|el| {
                        el.name.ns == ns!(html) && RAW_TEXT_ELEMENTS.contains(&&*el.name.local)
                    });
                if raw_parent {
                    writer.push_str(&data.content);
                } else {
                    writer.push_str(&html_escape::encode_text(&data.content));
                }
            }
            NodeData::Element(data) => {
                let tag = if data.name.ns == ns!(html) {
                    data.name.local.to_string()
                } else {
                    data.qualified_name()
                };

                writer.push('<');
                writer.push_str(&tag);
                for attr in data.attrs() {
                    writer.push(' ');
                    writer.push_str(&attr.qualified_name());
                    writer.push_str("=\"");
                    writer.push_str(&html_escape::encode_double_quoted_attribute(&attr.value));
                    writer.push('"');
                }
                writer.push('>');

                let is_void =
                    data.name.ns == ns!(html) && VOID_ELEMENTS.contains(&&*data.name.local);
                if is_void {
                    return;
                }

                for &child_id in &node.children {
                    self.write_outer_html(child_id, writer);
                }

                writer.push_str("</");
                writer.push_str(&tag);
                writer.push('>');
            }
        }
    }

    /// Serialize the children of `node_id` as XML.
    pub fn inner_xml(&self, node_id: usize) -> String {
        let mut output = String::new();
        for &child_id in &self.nodes[node_id].children {
            self.write_outer_xml(child_id, &mut output);
        }
        output
    }

    /// Serialize `node_id` and its descendants as XML.
    pub fn outer_xml(&self, node_id: usize) -> String {
        let mut output = String::new();
        self.write_outer_xml(node_id, &mut output);
        output
    }

    pub fn write_outer_xml(&self, node_id: usize, writer: &mut String) {
        let node = &self.nodes[node_id];
        match &node.data {
            NodeData::Document | NodeData::Fragment => {
                for &child_id in &node.children {
                    self.write_outer_xml(child_id, writer);
                }
            }
            NodeData::Comment { contents } => {
                writer.push_str("<!--");
                writer.push_str(contents);
                writer.push_str("-->");
            }
            NodeData::ProcessingInstruction { target, contents } => {
                writer.push_str("<?");
                writer.push_str(target);
                if !contents.is_empty() {
                    writer.push(' ');
                    writer.push_str(contents);
                }
                writer.push_str("?>");
            }
            NodeData::Text(data) => {
                writer.push_str(&html_escape::encode_text(&data.content));
            }
            NodeData::Element(data) => {
                let tag = data.qualified_name();
                writer.push('<');
                writer.push_str(&tag);
                for attr in data.attrs() {
                    writer.push(' ');
                    writer.push_str(&attr.qualified_name());
                    writer.push_str("=\"");
                    writer.push_str(&html_escape::encode_double_quoted_attribute(&attr.value));
                    writer.push('"');
                }

                if node.children.is_empty() {
                    writer.push_str("/>");
                    return;
                }
                writer.push('>');

                for &child_id in &node.children {
                    self.write_outer_xml(child_id, writer);
                }

                writer.push_str("</");
                writer.push_str(&tag);
                writer.push('>');
            }
        }
    }

    /// Serialize `node_id` using the serializer matching the document's [`MarkupMode`](crate::MarkupMode).
    pub fn outer_markup(&self, node_id: usize) -> String {
        if self.is_xml() {
            self.outer_xml(node_id)
        } else {
            self.outer_html(node_id)
        }
    }
}
