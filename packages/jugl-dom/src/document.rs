use crate::{
    Attribute, DocumentConfig, DocumentMutator, DummyMarkupParserProvider, ElementData,
    MarkupMode, MarkupParserProvider, Node, NodeData, QualName, TextNodeData, ns,
};
use markup5ever::local_name;
use slab::Slab;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

pub struct Document {
    id: usize,

    /// A slab-backed tree of nodes. Node 0 is always the `Document` node.
    pub(crate) nodes: Box<Slab<Node>>,

    /// Whether the document holds HTML or XML
    pub(crate) mode: MarkupMode,

    /// Used to parse markup fragments for `structure` content
    pub(crate) markup_parser_provider: Arc<dyn MarkupParserProvider>,
}

impl Document {
    /// Create a new (empty) [`Document`] with the specified configuration
    pub fn new(config: DocumentConfig) -> Self {
        static ID_GENERATOR: AtomicUsize = AtomicUsize::new(1);

        let id = ID_GENERATOR.fetch_add(1, Ordering::SeqCst);

        let markup_parser_provider = config
            .markup_parser_provider
            .unwrap_or_else(|| Arc::new(DummyMarkupParserProvider));

        let mut doc = Self {
            id,
            nodes: Box::new(Slab::new()),
            mode: config.mode,
            markup_parser_provider,
        };

        // Initialise document with root Document node
        doc.create_node(NodeData::Document);

        doc
    }

    pub fn set_markup_parser_provider(&mut self, provider: Arc<dyn MarkupParserProvider>) {
        self.markup_parser_provider = provider;
    }

    pub fn markup_parser_provider(&self) -> Arc<dyn MarkupParserProvider> {
        Arc::clone(&self.markup_parser_provider)
    }

    pub fn mode(&self) -> MarkupMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: MarkupMode) {
        self.mode = mode;
    }

    pub fn is_xml(&self) -> bool {
        self.mode == MarkupMode::Xml
    }

    pub fn tree(&self) -> &Slab<Node> {
        &self.nodes
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn get_node(&self, node_id: usize) -> Option<&Node> {
        self.nodes.get(node_id)
    }

    pub fn get_node_mut(&mut self, node_id: usize) -> Option<&mut Node> {
        self.nodes.get_mut(node_id)
    }

    pub fn mutate<'doc>(&'doc mut self) -> DocumentMutator<'doc> {
        DocumentMutator::new(self)
    }

    pub fn root_node(&self) -> &Node {
        &self.nodes[0]
    }

    /// The document element: the first element child of the root `Document` node.
    pub fn root_element_id(&self) -> Option<usize> {
        self.first_element_child(0)
    }

    pub fn first_element_child(&self, node_id: usize) -> Option<usize> {
        self.nodes[node_id]
            .children
            .iter()
            .copied()
            .find(|id| self.nodes[*id].is_element())
    }

    pub fn child_elements(&self, node_id: usize) -> impl Iterator<Item = usize> + '_ {
        self.nodes[node_id]
            .children
            .iter()
            .copied()
            .filter(|id| self.nodes[*id].is_element())
    }

    // Get the index of the node in its parent's child list
    pub fn child_index(&self, node_id: usize) -> Option<usize> {
        let parent_id = self.nodes[node_id].parent?;
        self.nodes[parent_id].index_of_child(node_id)
    }

    // Get the nth node after this one in the parent's child list
    pub fn forward(&self, node_id: usize, n: usize) -> Option<usize> {
        let parent_id = self.nodes[node_id].parent?;
        let child_idx = self.child_index(node_id)?;
        self.nodes[parent_id].children.get(child_idx + n).copied()
    }

    pub fn backward(&self, node_id: usize, n: usize) -> Option<usize> {
        let parent_id = self.nodes[node_id].parent?;
        let child_idx = self.child_index(node_id)?;
        if child_idx < n {
            return None;
        }
        self.nodes[parent_id].children.get(child_idx - n).copied()
    }

    pub fn create_node(&mut self, node_data: NodeData) -> usize {
        let entry = self.nodes.vacant_entry();
        let id = entry.key();
        entry.insert(Node::new(id, node_data));
        id
    }

    pub fn create_text_node(&mut self, text: &str) -> usize {
        let content = text.to_string();
        let data = NodeData::Text(TextNodeData::new(content));
        self.create_node(data)
    }

    pub fn create_element(&mut self, name: QualName, attrs: Vec<Attribute>) -> usize {
        self.create_node(NodeData::Element(ElementData::new(name, attrs)))
    }

    /// Create an empty, detached [`NodeData::Fragment`] container.
    pub fn create_fragment(&mut self) -> usize {
        self.create_node(NodeData::Fragment)
    }

    pub fn deep_clone_node(&mut self, node_id: usize) -> usize {
        // Load existing node
        let node = &self.nodes[node_id];
        let data = node.data.clone();
        let children = node.children.clone();

        // Create new node
        let new_node_id = self.create_node(data);

        // Recursively clone children
        let new_children: Vec<usize> = children
            .into_iter()
            .map(|child_id| self.deep_clone_node(child_id))
            .collect();
        for &child_id in &new_children {
            self.nodes[child_id].parent = Some(new_node_id);
        }
        self.nodes[new_node_id].children = new_children;

        new_node_id
    }

    /// Copy the subtree rooted at `node_id` in `source` into this document, returning the id of
    /// the (unparented) copy.
    ///
    /// When `source` holds XML and this document holds HTML, un-namespaced elements are moved
    /// into the XHTML namespace and their prefixes dropped so that they serialize as HTML.
    pub fn import_node(&mut self, source: &Document, node_id: usize) -> usize {
        let reconcile = source.is_xml() && !self.is_xml();

        #[cfg(feature = "tracing")]
        tracing::trace!(
            "Importing node {} from document {} into {} (reconcile: {reconcile})",
            node_id,
            source.id(),
            self.id
        );

        self.import_node_inner(source, node_id, reconcile)
    }

    fn import_node_inner(&mut self, source: &Document, node_id: usize, reconcile: bool) -> usize {
        let node = &source.nodes[node_id];
        let mut data = match &node.data {
            // A whole document is imported as a fragment holding its children
            NodeData::Document => NodeData::Fragment,
            other => other.clone(),
        };
        if reconcile {
            if let NodeData::Element(element) = &mut data {
                if element.name.ns == ns!() || element.name.ns == ns!(html) {
                    element.name = QualName::new(None, ns!(html), element.name.local.clone());
                }
            }
        }

        let new_node_id = self.create_node(data);
        let new_children: Vec<usize> = node
            .children
            .iter()
            .map(|child_id| self.import_node_inner(source, *child_id, reconcile))
            .collect();
        for &child_id in &new_children {
            self.nodes[child_id].parent = Some(new_node_id);
        }
        self.nodes[new_node_id].children = new_children;

        new_node_id
    }

    /// Unlink `node_id` from its parent (if any) without dropping it.
    pub fn detach_node(&mut self, node_id: usize) {
        if let Some(parent_id) = self.nodes[node_id].parent.take() {
            self.nodes[parent_id].children.retain(|id| *id != node_id);
        }
    }

    /// Insert `inserted_node_ids` immediately before `node_id` in its parent.
    ///
    /// Inserted nodes are detached from any previous parent first. Does nothing if `node_id`
    /// has no parent.
    pub fn insert_before(&mut self, node_id: usize, inserted_node_ids: &[usize]) {
        if self.nodes[node_id].parent.is_none() {
            return;
        }
        for &inserted_id in inserted_node_ids {
            self.detach_node(inserted_id);
        }

        let Some(parent_id) = self.nodes[node_id].parent else {
            return;
        };
        let Some(node_child_idx) = self.nodes[parent_id].index_of_child(node_id) else {
            return;
        };

        let parent = &mut self.nodes[parent_id];
        parent.children.splice(
            node_child_idx..node_child_idx,
            inserted_node_ids.iter().copied(),
        );
        for &inserted_id in inserted_node_ids {
            self.nodes[inserted_id].parent = Some(parent_id);
        }
    }

    /// Append `appended_node_ids` to the children of `parent_id`.
    pub fn append(&mut self, parent_id: usize, appended_node_ids: &[usize]) {
        for &child_id in appended_node_ids {
            self.detach_node(child_id);
            self.nodes[parent_id].children.push(child_id);
            self.nodes[child_id].parent = Some(parent_id);
        }
    }

    /// Unlink `node_id` from its parent and drop it along with its descendants.
    pub fn remove_node(&mut self, node_id: usize) -> Option<Node> {
        fn remove_node_ignoring_parent(doc: &mut Document, node_id: usize) -> Option<Node> {
            let node = doc.nodes.try_remove(node_id);
            if let Some(node) = &node {
                for &child in &node.children {
                    remove_node_ignoring_parent(doc, child);
                }
            }
            node
        }

        let node = remove_node_ignoring_parent(self, node_id);

        if let Some(parent_id) = node.as_ref().and_then(|node| node.parent) {
            if let Some(parent) = self.nodes.get_mut(parent_id) {
                parent.children.retain(|id| *id != node_id);
            }
        }

        node
    }

    /// Drop all of the children of `node_id`.
    pub fn remove_children(&mut self, node_id: usize) {
        let child_ids = std::mem::take(&mut self.nodes[node_id].children);
        for child_id in child_ids {
            self.nodes[child_id].parent = None;
            self.remove_node(child_id);
        }
    }

    /// Find the first element (in tree order) whose `id` attribute equals `id`.
    pub fn get_element_by_id(&self, id: &str) -> Option<usize> {
        let mut stack = vec![0];
        while let Some(node_id) = stack.pop() {
            let node = &self.nodes[node_id];
            if node.attr(local_name!("id")) == Some(id) {
                return Some(node_id);
            }
            stack.extend(node.children.iter().rev().copied());
        }
        None
    }

    pub fn text_content(&self, node_id: usize) -> String {
        let mut out = String::new();
        self.write_text_content(node_id, &mut out);
        out
    }

    fn write_text_content(&self, node_id: usize, out: &mut String) {
        let node = &self.nodes[node_id];
        match &node.data {
            NodeData::Text(data) => {
                out.push_str(&data.content);
            }
            NodeData::Element(..) | NodeData::Fragment | NodeData::Document => {
                for child_id in node.children.iter() {
                    self.write_text_content(*child_id, out);
                }
            }
            _ => {}
        }
    }

    pub fn node_debug_str(&self, node_id: usize) -> String {
        match self.nodes.get(node_id) {
            Some(node) => node.node_debug_str(),
            None => format!("#{node_id} (removed)"),
        }
    }

    pub fn print_tree(&self) {
        crate::util::walk_tree(self, 0, 0);
    }

    pub fn print_subtree(&self, node_id: usize) {
        crate::util::walk_tree(self, 0, node_id);
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("id", &self.id)
            .field("mode", &self.mode)
            .field("nodes", &self.nodes.len())
            .finish()
    }
}
