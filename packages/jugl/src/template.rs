use jugl_dom::{Document, Namespace, NodeData, ns};
use jugl_html::TemplateDocument;
use regex::Regex;

use crate::config::TemplateConfig;
use crate::context::ProcessContext;
use crate::element::Element;
use crate::error::TemplateError;
use crate::grammar::TRIM_SPACE;
use crate::scope::Scope;

/// Options for a single [`Template::process`] call.
#[derive(Debug, Clone, Default)]
pub struct ProcessOptions {
    /// Variables visible to the template's expressions. Defaults to an empty scope.
    pub context: Option<Scope>,
    /// Process a copy of the template, leaving the original untouched.
    pub clone: bool,
    /// Serialize the result instead of returning node ids.
    pub string: bool,
}

impl ProcessOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_context(mut self, context: Scope) -> Self {
        self.context = Some(context);
        self
    }

    pub fn cloned(mut self) -> Self {
        self.clone = true;
        self
    }

    pub fn as_string(mut self) -> Self {
        self.string = true;
        self
    }
}

/// Result of [`Template::process`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Processed {
    /// Top-level nodes the template root turned into, in document order. These live in
    /// [`Template::document`].
    Nodes(Vec<usize>),
    /// Serialized markup
    Markup(String),
}

impl Processed {
    pub fn nodes(&self) -> &[usize] {
        match self {
            Processed::Nodes(nodes) => nodes,
            Processed::Markup(_) => &[],
        }
    }

    pub fn into_markup(self) -> Option<String> {
        match self {
            Processed::Markup(markup) => Some(markup),
            Processed::Nodes(_) => None,
        }
    }
}

/// A template: a root node inside a document, plus the configuration used to process it.
///
/// A template may be created pending and filled in later by a loader.
#[derive(Debug)]
pub struct Template {
    document: Option<Document>,
    node: Option<usize>,
    config: TemplateConfig,
    trim_space: Regex,
    loading: bool,
    /// Nodes produced by the last in-place `process`
    output: Option<Vec<usize>>,
    /// Containers of processed copies handed out as [`Processed::Nodes`], until released
    copies: Vec<Run>,
}

impl Template {
    /// A template rooted at `node` in `document`.
    pub fn new(document: impl Into<Document>, node: usize) -> Self {
        Self {
            document: Some(document.into()),
            node: Some(node),
            config: TemplateConfig::default(),
            trim_space: TRIM_SPACE.clone(),
            loading: false,
            output: None,
            copies: Vec::new(),
        }
    }

    /// A template with no document yet, to be filled in by [`Template::finish_loading`].
    pub fn pending() -> Self {
        Self {
            document: None,
            node: None,
            config: TemplateConfig::default(),
            trim_space: TRIM_SPACE.clone(),
            loading: false,
            output: None,
            copies: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: TemplateConfig) -> Self {
        self.config = config;
        self
    }

    /// A template rooted at the document element.
    pub fn from_document_root(document: impl Into<Document>) -> Result<Self, TemplateError> {
        let document = document.into();
        let root = document
            .root_element_id()
            .ok_or(TemplateError::EmptyDocument)?;
        Ok(Self::new(document, root))
    }

    /// A template rooted at the element whose `id` attribute is `id`.
    pub fn from_element_id(document: impl Into<Document>, id: &str) -> Result<Self, TemplateError> {
        let document = document.into();
        let node = document
            .get_element_by_id(id)
            .ok_or_else(|| TemplateError::ElementNotFound(id.to_string()))?;
        Ok(Self::new(document, node))
    }

    fn from_template_document(document: TemplateDocument) -> Result<Self, TemplateError> {
        let root = document
            .template_root()
            .ok_or(TemplateError::EmptyDocument)?;
        Ok(Self::new(document, root))
    }

    /// Parse an HTML template. The root is the first element the markup contains.
    pub fn parse_html(html: &str) -> Result<Self, TemplateError> {
        Self::from_template_document(TemplateDocument::from_html(html))
    }

    /// Parse an XML template rooted at its document element.
    pub fn parse_xml(xml: &str) -> Result<Self, TemplateError> {
        let document = TemplateDocument::from_xml(xml).map_err(|source| TemplateError::Markup {
            attribute: String::from("template"),
            node: String::from("#document"),
            source,
        })?;
        Self::from_template_document(document)
    }

    /// Parse markup as XML if it announces itself as such (XML declaration or XHTML doctype),
    /// as HTML otherwise.
    pub fn parse(markup: &str) -> Result<Self, TemplateError> {
        if jugl_html::looks_like_xml(markup) {
            Self::parse_xml(markup)
        } else {
            Self::parse_html(markup)
        }
    }

    pub fn config(&self) -> &TemplateConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut TemplateConfig {
        &mut self.config
    }

    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    pub fn document_mut(&mut self) -> Option<&mut Document> {
        self.document.as_mut()
    }

    pub fn into_document(self) -> Option<Document> {
        self.document
    }

    /// The root node, if loaded.
    pub fn node(&self) -> Option<usize> {
        self.node
    }

    pub fn is_loaded(&self) -> bool {
        self.document.is_some() && self.node.is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn begin_loading(&mut self) {
        self.loading = true;
    }

    pub fn finish_loading(&mut self, document: impl Into<Document>, node: usize) {
        self.document = Some(document.into());
        self.node = Some(node);
        self.output = None;
        self.copies.clear();
        self.loading = false;
    }

    pub fn abort_loading(&mut self) {
        self.loading = false;
    }

    /// Whether the root (or one of its ancestors) declares the statement prefix as an XML
    /// namespace, in which case statements are matched by namespace. Otherwise they are matched
    /// by their literal `prefix:name`.
    fn statement_namespace(&self, doc: &Document, root: usize) -> Option<Namespace> {
        let uri = self.config.namespace_uri.as_deref()?;
        let mut current = Some(root);
        while let Some(node_id) = current {
            let node = doc.get_node(node_id)?;
            if let NodeData::Element(element) = &node.data {
                let declared = element.attrs.iter().any(|attr| {
                    attr.name.ns == ns!(xmlns)
                        && *attr.name.local == *self.config.prefix
                        && attr.value == uri
                });
                if declared {
                    return Some(Namespace::from(uri));
                }
            }
            current = node.parent;
        }
        None
    }

    /// Process the template with [`ProcessOptions`].
    ///
    /// In place (the default) the template's own nodes are rewritten, so a template processed in
    /// place cannot be processed again. With [`ProcessOptions::clone`] a copy is processed and
    /// the template stays reusable. A copy returned as [`Processed::Nodes`] stays in the
    /// template's document until it is given back to [`Template::release`].
    pub fn process(&mut self, options: ProcessOptions) -> Result<Processed, TemplateError> {
        let string = options.string;
        let clone = options.clone;
        let run = self.run(options)?;
        let Some(doc) = self.document.as_mut() else {
            return Err(TemplateError::NotLoaded);
        };

        if string {
            let markup = serialize(doc, run.target, &run.nodes);
            if clone {
                doc.remove_node(run.container);
            } else {
                self.output = Some(run.nodes);
            }
            return Ok(Processed::Markup(markup));
        }

        let result = Processed::Nodes(run.nodes.clone());
        if clone {
            self.copies.push(run);
        } else {
            self.output = Some(run.nodes);
        }
        Ok(result)
    }

    /// Drop a processed copy from the template's document once its nodes are no longer needed.
    ///
    /// Returns `false` if `processed` is not an unreleased copy made by this template (in-place
    /// output and markup are left alone).
    pub fn release(&mut self, processed: &Processed) -> bool {
        let Processed::Nodes(nodes) = processed else {
            return false;
        };
        let Some(index) = self.copies.iter().position(|run| run.nodes == *nodes) else {
            return false;
        };
        let run = self.copies.swap_remove(index);
        if let Some(doc) = self.document.as_mut() {
            doc.remove_node(run.container);
        }
        true
    }

    fn run(&mut self, options: ProcessOptions) -> Result<Run, TemplateError> {
        let (Some(doc), Some(root)) = (self.document.as_ref(), self.node) else {
            return Err(TemplateError::NotLoaded);
        };
        if doc.get_node(root).is_none() {
            return Err(TemplateError::RootConsumed(root));
        }
        let root_identity = doc.node_debug_str(root);
        let namespace = self.statement_namespace(doc, root);

        let Some(doc) = self.document.as_mut() else {
            return Err(TemplateError::NotLoaded);
        };

        // The root needs a parent for repeat, replace and omit-tag to splice into
        let target = if options.clone {
            let clone_id = doc.deep_clone_node(root);
            doc.mutate().clear_attribute_qualified(clone_id, "id");
            let container = doc.create_fragment();
            doc.append(container, &[clone_id]);
            clone_id
        } else {
            if doc.get_node(root).and_then(|node| node.parent).is_none() {
                let container = doc.create_fragment();
                doc.append(container, &[root]);
            }
            root
        };
        let Some(container) = doc.get_node(target).and_then(|node| node.parent) else {
            return Err(TemplateError::RootConsumed(root));
        };
        let before = doc.backward(target, 1);
        let after = doc.forward(target, 1);

        let scope = options.context.unwrap_or_default();
        let mut cx = ProcessContext::new(doc, &self.config, &self.trim_space, namespace);
        let mut element = Element::new(target, scope);
        if let Err(err) = element.process(&mut cx) {
            #[cfg(feature = "tracing")]
            tracing::error!(template = %root_identity, "template processing failed: {err}");
            if options.clone {
                doc.remove_node(container);
            }
            return Err(err);
        }

        let nodes = nodes_between(doc, container, before, after);

        #[cfg(feature = "tracing")]
        tracing::debug!(
            template = %root_identity,
            clone = options.clone,
            "processed into {} top-level node(s)",
            nodes.len()
        );
        #[cfg(not(feature = "tracing"))]
        let _ = root_identity;

        Ok(Run {
            container,
            target,
            nodes,
        })
    }

    /// Process a copy of the template with `context`, returning the nodes produced. Pass the
    /// result to [`Template::release`] when done with it.
    pub fn process_with(&mut self, context: Scope) -> Result<Processed, TemplateError> {
        self.process(ProcessOptions::new().with_context(context).cloned())
    }

    /// Process the template and serialize it, leaving the template reusable.
    pub fn render(&mut self, context: Scope) -> Result<String, TemplateError> {
        let processed = self.process(ProcessOptions::new().with_context(context).cloned().as_string())?;
        Ok(processed.into_markup().unwrap_or_default())
    }

    /// Copy the template's current output (the nodes produced by the last in-place `process`,
    /// or the root if it has not been processed) into `target` under `parent`.
    pub fn append_to(&self, target: &mut Document, parent: usize) -> Result<Vec<usize>, TemplateError> {
        let (Some(doc), Some(root)) = (self.document.as_ref(), self.node) else {
            return Err(TemplateError::NotLoaded);
        };
        let nodes = match &self.output {
            Some(nodes) => nodes.clone(),
            None if doc.get_node(root).is_some() => vec![root],
            None => return Err(TemplateError::RootConsumed(root)),
        };
        Ok(import_into(doc, &nodes, target, parent))
    }

    /// Process the template and append the result to `parent` in `target`.
    pub fn process_into(
        &mut self,
        options: ProcessOptions,
        target: &mut Document,
        parent: usize,
    ) -> Result<Vec<usize>, TemplateError> {
        let clone = options.clone;
        let run = self.run(options)?;
        let Some(doc) = self.document.as_mut() else {
            return Err(TemplateError::NotLoaded);
        };
        let imported = import_into(doc, &run.nodes, target, parent);
        if clone {
            // The processed copy was only needed for the import
            doc.remove_node(run.container);
        } else {
            self.output = Some(run.nodes);
        }
        Ok(imported)
    }
}

/// Where one `process` call left its output.
#[derive(Debug)]
struct Run {
    /// Parent the processed nodes were spliced into
    container: usize,
    /// The node processing started from; gone if it was repeated, replaced or unwrapped
    target: usize,
    nodes: Vec<usize>,
}

/// Children of `container` strictly between `before` and `after`.
fn nodes_between(
    doc: &Document,
    container: usize,
    before: Option<usize>,
    after: Option<usize>,
) -> Vec<usize> {
    let Some(container) = doc.get_node(container) else {
        return Vec::new();
    };
    let children = &container.children;
    let start = before
        .and_then(|id| container.index_of_child(id))
        .map(|idx| idx + 1)
        .unwrap_or(0);
    let end = after
        .and_then(|id| container.index_of_child(id))
        .unwrap_or(children.len());
    children[start..end.max(start)].to_vec()
}

/// Serialize processed output. In HTML documents a root which survived processing is
/// serialized by its children only.
fn serialize(doc: &Document, target: usize, nodes: &[usize]) -> String {
    if !doc.is_xml() && nodes == [target] {
        let inner = doc.inner_html(target);
        if !inner.is_empty() {
            return inner;
        }
    }
    nodes.iter().map(|id| doc.outer_markup(*id)).collect()
}

fn import_into(source: &Document, nodes: &[usize], target: &mut Document, parent: usize) -> Vec<usize> {
    let imported: Vec<usize> = nodes
        .iter()
        .map(|id| target.import_node(source, *id))
        .collect();
    target.append(parent, &imported);
    imported
}
