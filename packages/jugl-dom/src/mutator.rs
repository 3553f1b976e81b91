use std::collections::HashSet;

use crate::{Attribute, Document, NodeData, QualName};

pub enum AppendTextErr {
    /// The node is not a text node
    NotTextNode,
}

pub struct DocumentMutator<'doc> {
    /// Document is public as an escape hatch, but users of this API should ideally avoid using it
    /// and prefer exposing additional functionality in DocumentMutator.
    pub doc: &'doc mut Document,
}

impl DocumentMutator<'_> {
    pub fn new<'doc>(doc: &'doc mut Document) -> DocumentMutator<'doc> {
        DocumentMutator { doc }
    }

    pub fn node_has_parent(&self, node_id: usize) -> bool {
        self.doc.nodes[node_id].parent.is_some()
    }

    pub fn parent_id(&self, node_id: usize) -> Option<usize> {
        self.doc.nodes[node_id].parent
    }

    pub fn previous_sibling_id(&self, node_id: usize) -> Option<usize> {
        self.doc.backward(node_id, 1)
    }

    pub fn last_child_id(&self, node_id: usize) -> Option<usize> {
        self.doc.nodes[node_id].children.last().copied()
    }

    pub fn child_ids(&self, node_id: usize) -> Vec<usize> {
        self.doc.nodes[node_id].children.clone()
    }

    pub fn element_name(&self, node_id: usize) -> Option<&QualName> {
        self.doc.nodes[node_id].element_data().map(|el| &el.name)
    }

    pub fn create_comment_node(&mut self, contents: &str) -> usize {
        self.doc.create_node(NodeData::Comment {
            contents: contents.to_string(),
        })
    }

    pub fn create_pi_node(&mut self, target: &str, contents: &str) -> usize {
        self.doc.create_node(NodeData::ProcessingInstruction {
            target: target.to_string(),
            contents: contents.to_string(),
        })
    }

    pub fn create_text_node(&mut self, text: &str) -> usize {
        self.doc.create_text_node(text)
    }

    pub fn create_element(&mut self, name: QualName, attrs: Vec<Attribute>) -> usize {
        self.doc.create_element(name, attrs)
    }

    pub fn create_fragment(&mut self) -> usize {
        self.doc.create_fragment()
    }

    /// Remove all of the children from old_parent_id and append them to new_parent_id
    pub fn reparent_children(&mut self, old_parent_id: usize, new_parent_id: usize) {
        let child_ids = std::mem::take(&mut self.doc.nodes[old_parent_id].children);
        for &child_id in &child_ids {
            self.doc.nodes[child_id].parent = None;
        }
        self.append_children(new_parent_id, &child_ids);
    }

    pub fn append_children(&mut self, parent_id: usize, child_ids: &[usize]) {
        self.doc.append(parent_id, child_ids);
    }

    /// Splice `new_node_ids` into the parent of `anchor_node_id` in its place, then drop the anchor.
    pub fn replace_node_with(&mut self, anchor_node_id: usize, new_node_ids: &[usize]) {
        self.doc.insert_before(anchor_node_id, new_node_ids);
        self.doc.remove_node(anchor_node_id);
    }

    /// Move the children of `node_id` into its parent in its place, then drop `node_id`.
    pub fn unwrap_node(&mut self, node_id: usize) {
        let child_ids = self.child_ids(node_id);
        self.replace_node_with(node_id, &child_ids);
    }

    pub fn remove_node(&mut self, node_id: usize) {
        self.doc.remove_node(node_id);
    }

    pub fn detach_node(&mut self, node_id: usize) {
        self.doc.detach_node(node_id);
    }

    pub fn remove_children(&mut self, node_id: usize) {
        self.doc.remove_children(node_id);
    }

    pub fn insert_nodes_before(&mut self, anchor_node_id: usize, new_node_ids: &[usize]) {
        self.doc.insert_before(anchor_node_id, new_node_ids);
    }

    pub fn append_text_to_node(&mut self, node_id: usize, text: &str) -> Result<(), AppendTextErr> {
        match self.doc.nodes[node_id].text_data_mut() {
            Some(data) => {
                data.content += text;
                Ok(())
            }
            None => Err(AppendTextErr::NotTextNode),
        }
    }

    /// Replace the children of `node_id` with a single text node holding `value`.
    pub fn set_text_content(&mut self, node_id: usize, value: &str) {
        self.remove_children(node_id);
        let text_id = self.create_text_node(value);
        self.append_children(node_id, &[text_id]);
    }

    pub fn deep_clone_node(&mut self, node_id: usize) -> usize {
        self.doc.deep_clone_node(node_id)
    }

    pub fn add_attrs_if_missing(&mut self, node_id: usize, attrs: Vec<Attribute>) {
        let Some(element_data) = self.doc.nodes[node_id].element_data() else {
            return;
        };

        let existing_names = element_data
            .attrs
            .iter()
            .map(|e| e.name.clone())
            .collect::<HashSet<_>>();

        for attr in attrs
            .into_iter()
            .filter(|attr| !existing_names.contains(&attr.name))
        {
            self.set_attribute(node_id, attr.name, &attr.value);
        }
    }

    pub fn set_attribute(&mut self, node_id: usize, name: QualName, value: &str) {
        let node = &mut self.doc.nodes[node_id];
        let NodeData::Element(ref mut element) = node.data else {
            return;
        };
        element.attrs.set(name, value);
    }

    /// Remove the attribute called `name`. Returns the removed attribute, if there was one.
    pub fn clear_attribute(&mut self, node_id: usize, name: &QualName) -> Option<Attribute> {
        let node = &mut self.doc.nodes[node_id];
        let NodeData::Element(ref mut element) = node.data else {
            return None;
        };
        element.attrs.remove(name)
    }

    /// Set the attribute written `qualified` in markup (e.g. `class` or `xlink:href`).
    pub fn set_attribute_qualified(&mut self, node_id: usize, qualified: &str, value: &str) {
        if let NodeData::Element(ref mut element) = self.doc.nodes[node_id].data {
            element.attrs.set_qualified(qualified, value);
        }
    }

    pub fn clear_attribute_qualified(&mut self, node_id: usize, qualified: &str) -> Option<Attribute> {
        match self.doc.nodes[node_id].data {
            NodeData::Element(ref mut element) => element.attrs.remove_qualified(qualified),
            _ => None,
        }
    }
}
