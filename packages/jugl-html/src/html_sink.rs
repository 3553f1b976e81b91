//! An implementation for Html5ever's sink trait, allowing us to parse HTML and XML into a DOM.

use html5ever::ParseOpts;
use html5ever::tokenizer::TokenizerOpts;
use html5ever::tree_builder::TreeBuilderOpts;
use std::borrow::Cow;
use std::cell::{Cell, Ref, RefCell, RefMut};

use html5ever::{
    QualName,
    tendril::{StrTendril, TendrilSink},
    tree_builder::{ElementFlags, NodeOrText, QuirksMode, TreeSink},
};
use jugl_dom::node::Attribute;
use jugl_dom::{Document, DocumentMutator, MarkupMode};

/// Parse errors reported by html5ever or xml5ever
pub type ParseErrors = Vec<Cow<'static, str>>;

/// Convert an html5ever Attribute which uses tendril for its value to a jugl Attribute
/// which uses String.
fn html5ever_to_jugl_attr(attr: html5ever::Attribute) -> Attribute {
    Attribute::new(attr.name, attr.value.to_string())
}

fn html_parse_opts() -> ParseOpts {
    ParseOpts {
        tokenizer: TokenizerOpts::default(),
        tree_builder: TreeBuilderOpts {
            exact_errors: false,
            scripting_enabled: false, // Enables parsing of <noscript> tags
            iframe_srcdoc: false,
            drop_doctype: true,
            quirks_mode: QuirksMode::NoQuirks,
        },
    }
}

/// Whether `markup` should be treated as XML: an XML declaration or an XHTML doctype up front.
pub fn looks_like_xml(markup: &str) -> bool {
    let markup = markup.trim_start();
    markup.starts_with("<?xml")
        || markup.starts_with("<!DOCTYPE")
            && markup
                .lines()
                .next()
                .is_some_and(|first_line| first_line.contains("XHTML") || first_line.contains("xhtml"))
}

pub struct DocumentHtmlParser<'doc> {
    document_mutator: RefCell<DocumentMutator<'doc>>,

    /// Errors that occurred during parsing.
    pub errors: RefCell<ParseErrors>,

    /// The document's quirks mode.
    pub quirks_mode: Cell<QuirksMode>,
    pub is_xml: bool,
}

impl<'doc> DocumentHtmlParser<'doc> {
    #[track_caller]
    /// Get a mutable borrow of the DocumentMutator
    fn mutr(&self) -> RefMut<'_, DocumentMutator<'doc>> {
        self.document_mutator.borrow_mut()
    }
}

impl DocumentHtmlParser<'_> {
    pub fn new(doc: &mut Document) -> DocumentHtmlParser<'_> {
        DocumentHtmlParser {
            document_mutator: RefCell::new(doc.mutate()),
            errors: RefCell::new(Vec::new()),
            quirks_mode: Cell::new(QuirksMode::NoQuirks),
            is_xml: false,
        }
    }

    /// Parse HTML (or XHTML, which is detected from the start of the markup) into `doc`.
    pub fn parse_into_doc<'d>(doc: &'d mut Document, markup: &str) -> &'d mut Document {
        if looks_like_xml(markup) {
            Self::parse_xml_into_doc(doc, markup);
        } else {
            Self::parse_html_into_doc(doc, markup);
        }
        doc
    }

    /// Parse a full HTML document into `doc`, returning any parse errors.
    pub fn parse_html_into_doc(doc: &mut Document, html: &str) -> ParseErrors {
        doc.set_mode(MarkupMode::Html);
        let mut sink = Self::new(doc);
        sink.is_xml = false;
        html5ever::parse_document(sink, html_parse_opts())
            .from_utf8()
            .read_from(&mut html.as_bytes())
            .unwrap_or_else(|err| vec![Cow::Owned(err.to_string())])
    }

    /// Parse a full XML document into `doc`, returning any parse (well-formedness) errors.
    pub fn parse_xml_into_doc(doc: &mut Document, xml: &str) -> ParseErrors {
        doc.set_mode(MarkupMode::Xml);
        let mut sink = Self::new(doc);
        sink.is_xml = true;
        xml5ever::driver::parse_document(sink, Default::default())
            .from_utf8()
            .read_from(&mut xml.as_bytes())
            .unwrap_or_else(|err| vec![Cow::Owned(err.to_string())])
    }

    /// Parse `html` as if it were the content of an element named `context`.
    ///
    /// The tree builder creates an `<html>` element under the document node and parses the
    /// fragment into it.
    pub fn parse_html_fragment_into_doc(
        doc: &mut Document,
        context: QualName,
        html: &str,
    ) -> ParseErrors {
        doc.set_mode(MarkupMode::Html);
        let sink = Self::new(doc);
        html5ever::parse_fragment(sink, html_parse_opts(), context, Vec::new(), false)
            .from_utf8()
            .read_from(&mut html.as_bytes())
            .unwrap_or_else(|err| vec![Cow::Owned(err.to_string())])
    }
}

impl<'b> TreeSink for DocumentHtmlParser<'b> {
    type Output = ParseErrors;

    // we use the ID of the nodes in the tree as the handle
    type Handle = usize;

    type ElemName<'a>
        = Ref<'a, QualName>
    where
        Self: 'a;

    fn finish(self) -> Self::Output {
        drop(self.document_mutator.into_inner());
        let errors = self.errors.into_inner();

        #[cfg(feature = "tracing")]
        for error in errors.iter() {
            tracing::debug!(xml = self.is_xml, "Parse error: {error}");
        }

        errors
    }

    fn parse_error(&self, msg: Cow<'static, str>) {
        self.errors.borrow_mut().push(msg);
    }

    fn get_document(&self) -> Self::Handle {
        0
    }

    fn elem_name<'a>(&'a self, target: &'a Self::Handle) -> Self::ElemName<'a> {
        Ref::map(self.document_mutator.borrow(), |docm| {
            docm.element_name(*target)
                .expect("TreeSink::elem_name called on a node which is not an element!")
        })
    }

    fn create_element(
        &self,
        name: QualName,
        attrs: Vec<html5ever::Attribute>,
        _flags: ElementFlags,
    ) -> Self::Handle {
        let attrs = attrs.into_iter().map(html5ever_to_jugl_attr).collect();
        self.mutr().create_element(name, attrs)
    }

    fn create_comment(&self, text: StrTendril) -> Self::Handle {
        self.mutr().create_comment_node(&text)
    }

    fn create_pi(&self, target: StrTendril, data: StrTendril) -> Self::Handle {
        self.mutr().create_pi_node(&target, &data)
    }

    fn append(&self, parent_id: &Self::Handle, child: NodeOrText<Self::Handle>) {
        match child {
            NodeOrText::AppendNode(id) => self.mutr().append_children(*parent_id, &[id]),
            // If content to append is text, first attempt to append it to the last child of parent.
            // Else create a new text node and append it to the parent
            NodeOrText::AppendText(text) => {
                let last_child_id = self.mutr().last_child_id(*parent_id);
                let has_appended = if let Some(id) = last_child_id {
                    self.mutr().append_text_to_node(id, &text).is_ok()
                } else {
                    false
                };
                if !has_appended {
                    let new_child_id = self.mutr().create_text_node(&text);
                    self.mutr().append_children(*parent_id, &[new_child_id]);
                }
            }
        }
    }

    // Note: The tree builder promises we won't have a text node after the insertion point.
    // https://github.com/servo/html5ever/blob/main/rcdom/lib.rs#L338
    fn append_before_sibling(&self, sibling_id: &Self::Handle, new_node: NodeOrText<Self::Handle>) {
        match new_node {
            NodeOrText::AppendNode(id) => self.mutr().insert_nodes_before(*sibling_id, &[id]),
            // If content to append is text, first attempt to append it to the node before sibling_node
            // Else create a new text node and insert it before sibling_node
            NodeOrText::AppendText(text) => {
                let previous_sibling_id = self.mutr().previous_sibling_id(*sibling_id);
                let has_appended = if let Some(id) = previous_sibling_id {
                    self.mutr().append_text_to_node(id, &text).is_ok()
                } else {
                    false
                };
                if !has_appended {
                    let new_child_id = self.mutr().create_text_node(&text);
                    self.mutr()
                        .insert_nodes_before(*sibling_id, &[new_child_id]);
                }
            }
        };
    }

    fn append_based_on_parent_node(
        &self,
        element: &Self::Handle,
        prev_element: &Self::Handle,
        child: NodeOrText<Self::Handle>,
    ) {
        if self.mutr().node_has_parent(*element) {
            self.append_before_sibling(element, child);
        } else {
            self.append(prev_element, child);
        }
    }

    fn append_doctype_to_document(
        &self,
        _name: StrTendril,
        _public_id: StrTendril,
        _system_id: StrTendril,
    ) {
        // Doctypes are dropped; templates are serialized from their root element down.
    }

    fn get_template_contents(&self, target: &Self::Handle) -> Self::Handle {
        // <template> contents are kept as ordinary children
        *target
    }

    fn same_node(&self, x: &Self::Handle, y: &Self::Handle) -> bool {
        x == y
    }

    fn set_quirks_mode(&self, mode: QuirksMode) {
        self.quirks_mode.set(mode);
    }

    fn add_attrs_if_missing(&self, target: &Self::Handle, attrs: Vec<html5ever::Attribute>) {
        let attrs = attrs.into_iter().map(html5ever_to_jugl_attr).collect();
        self.mutr().add_attrs_if_missing(*target, attrs);
    }

    fn remove_from_parent(&self, target: &Self::Handle) {
        self.mutr().detach_node(*target);
    }

    fn reparent_children(&self, old_parent_id: &Self::Handle, new_parent_id: &Self::Handle) {
        self.mutr()
            .reparent_children(*old_parent_id, *new_parent_id);
    }
}

#[test]
fn parses_some_html() {
    use jugl_dom::DocumentConfig;

    let html = "<!DOCTYPE html><html><body><h1>hello world</h1></body></html>";
    let mut doc = Document::new(DocumentConfig::default());
    let errors = DocumentHtmlParser::parse_html_into_doc(&mut doc, html);
    assert!(errors.is_empty());

    doc.print_tree();

    // Now our tree should have some nodes in it
    let html_id = doc.root_element_id().unwrap();
    assert_eq!(doc.text_content(html_id), "hello world");
}

#[test]
fn parses_namespaced_xml() {
    use jugl_dom::{DocumentConfig, ns};

    let xml = r#"<root xmlns:jugl="http://namespace.jugl.org/"><item jugl:content="x">y</item></root>"#;
    let mut doc = Document::new(DocumentConfig::default());
    let errors = DocumentHtmlParser::parse_xml_into_doc(&mut doc, xml);
    assert!(errors.is_empty(), "{errors:?}");
    assert!(doc.is_xml());

    let root = doc.root_element_id().unwrap();
    let item = doc.first_element_child(root).unwrap();
    let data = doc.get_node(item).unwrap().element_data().unwrap();
    assert_eq!(data.name.ns, ns!());
    assert!(
        data.lookup_ns(&"http://namespace.jugl.org/".into(), "content")
            .specified()
            .is_some()
    );
    assert!(data.lookup_qualified("jugl:content").specified().is_some());
}

#[test]
fn reports_mismatched_xml_tags() {
    use jugl_dom::DocumentConfig;

    let mut doc = Document::new(DocumentConfig::default());
    let errors = DocumentHtmlParser::parse_xml_into_doc(&mut doc, "<a><b>one</i></a>");
    assert!(!errors.is_empty());
}
