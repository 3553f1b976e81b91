//! HTML and XML parsing for Jugl
//!
//! Builds a [`jugl_dom::Document`] from markup using html5ever (HTML) or xml5ever (XML), and provides
//! [`HtmlProvider`], the [`MarkupParserProvider`] used to parse `structure` content into a live tree.

mod html_sink;
mod template_document;

pub use html_sink::{DocumentHtmlParser, ParseErrors, looks_like_xml};
pub use template_document::TemplateDocument;

use html5ever::{LocalName, QualName};
use jugl_dom::{
    Document, DocumentConfig, DocumentMutator, MarkupError, MarkupMode, MarkupParserProvider,
    NodeData, ns,
};

/// Name of the synthetic element XML fragments are wrapped in while parsing.
const XML_FRAGMENT_WRAPPER: &str = "jugl-fragment";

pub struct HtmlProvider;

impl HtmlProvider {
    fn parse_html_fragment(
        mutr: &mut DocumentMutator<'_>,
        context_id: usize,
        html: &str,
    ) -> Result<Vec<usize>, MarkupError> {
        // HTML parsing needs an HTML context element; anything else parses as if inside <body>
        let context = match mutr.element_name(context_id) {
            Some(name) if name.ns == ns!(html) => name.clone(),
            Some(name) => QualName::new(None, ns!(html), name.local.clone()),
            None => QualName::new(None, ns!(html), LocalName::from("body")),
        };

        let mut scratch = Document::new(DocumentConfig::default());
        DocumentHtmlParser::parse_html_fragment_into_doc(&mut scratch, context, html);

        let Some(html_root) = scratch.root_element_id() else {
            return Ok(Vec::new());
        };
        Ok(import_children(mutr, &scratch, html_root))
    }

    fn parse_xml_fragment(
        mutr: &mut DocumentMutator<'_>,
        context_id: usize,
        xml: &str,
    ) -> Result<Vec<usize>, MarkupError> {
        let mut wrapped = String::new();
        wrapped.push('<');
        wrapped.push_str(XML_FRAGMENT_WRAPPER);
        for (name, value) in in_scope_namespaces(mutr.doc, context_id) {
            wrapped.push(' ');
            wrapped.push_str(&name);
            wrapped.push_str("=\"");
            wrapped.push_str(&html_escape::encode_double_quoted_attribute(&value));
            wrapped.push('"');
        }
        wrapped.push('>');
        wrapped.push_str(xml);
        wrapped.push_str("</");
        wrapped.push_str(XML_FRAGMENT_WRAPPER);
        wrapped.push('>');

        let mut scratch = Document::new(DocumentConfig::xml());
        let errors = DocumentHtmlParser::parse_xml_into_doc(&mut scratch, &wrapped);
        if !errors.is_empty() {
            return Err(MarkupError::Malformed {
                mode: MarkupMode::Xml,
                markup: xml.to_string(),
                errors: errors.into_iter().map(String::from).collect(),
            });
        }

        let Some(wrapper) = scratch.root_element_id() else {
            return Err(MarkupError::NoElement {
                markup: xml.to_string(),
            });
        };
        Ok(import_children(mutr, &scratch, wrapper))
    }
}

impl MarkupParserProvider for HtmlProvider {
    fn parse_fragment(
        &self,
        mutr: &mut DocumentMutator<'_>,
        context_id: usize,
        markup: &str,
        mode: MarkupMode,
    ) -> Result<Vec<usize>, MarkupError> {
        match mode {
            MarkupMode::Html => Self::parse_html_fragment(mutr, context_id, markup),
            MarkupMode::Xml => Self::parse_xml_fragment(mutr, context_id, markup),
        }
    }
}

/// Copy the children of `parent_id` in `scratch` into the mutator's document.
fn import_children(mutr: &mut DocumentMutator<'_>, scratch: &Document, parent_id: usize) -> Vec<usize> {
    let child_ids = scratch
        .get_node(parent_id)
        .map(|node| node.children.clone())
        .unwrap_or_default();
    child_ids
        .into_iter()
        .map(|child_id| mutr.doc.import_node(scratch, child_id))
        .collect()
}

/// Namespace declarations (`xmlns` and `xmlns:*` attributes) visible at `node_id`, nearest first.
///
/// If the element's own namespace is not declared anywhere (e.g. it was created programmatically)
/// it is declared as the default namespace.
fn in_scope_namespaces(doc: &Document, node_id: usize) -> Vec<(String, String)> {
    let mut declarations: Vec<(String, String)> = Vec::new();
    let mut current = Some(node_id);
    while let Some(id) = current {
        let Some(node) = doc.get_node(id) else {
            break;
        };
        if let NodeData::Element(element) = &node.data {
            for attr in element.attrs.iter() {
                let name = attr.qualified_name();
                let is_declaration = attr.name.ns == ns!(xmlns)
                    || name == "xmlns"
                    || name.starts_with("xmlns:");
                if is_declaration && !declarations.iter().any(|(n, _)| *n == name) {
                    declarations.push((name, attr.value.clone()));
                }
            }
        }
        current = node.parent;
    }

    let element_ns = doc
        .get_node(node_id)
        .and_then(|node| node.element_data())
        .map(|el| el.name.ns.clone());
    if let Some(element_ns) = element_ns {
        if element_ns != ns!() && !declarations.iter().any(|(n, _)| n == "xmlns") {
            declarations.push((String::from("xmlns"), element_ns.to_string()));
        }
    }

    declarations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_html_fragments_in_context() {
        let mut doc = TemplateDocument::from_html("<table><tbody id=\"body\"></tbody></table>");
        let tbody = doc.get_element_by_id("body").unwrap();
        let provider = doc.markup_parser_provider();
        let ids = provider
            .parse_fragment(
                &mut doc.mutate(),
                tbody,
                "<tr><td>1</td></tr>",
                MarkupMode::Html,
            )
            .unwrap();
        assert_eq!(ids.len(), 1);
        assert_eq!(doc.outer_html(ids[0]), "<tr><td>1</td></tr>");
        assert_eq!(doc.get_node(ids[0]).unwrap().parent, None);
    }

    #[test]
    fn parses_xml_fragments_with_inherited_namespaces() {
        let mut doc = TemplateDocument::from_xml(
            r#"<root xmlns:jugl="http://namespace.jugl.org/"><slot/></root>"#,
        )
        .unwrap();
        let root = doc.root_element_id().unwrap();
        let slot = doc.first_element_child(root).unwrap();
        let provider = doc.markup_parser_provider();
        let ids = provider
            .parse_fragment(
                &mut doc.mutate(),
                slot,
                "<a jugl:content=\"x\">b</a>text",
                MarkupMode::Xml,
            )
            .unwrap();
        assert_eq!(ids.len(), 2);
        let a = doc.get_node(ids[0]).unwrap().element_data().unwrap();
        assert!(a.lookup_ns(&"http://namespace.jugl.org/".into(), "content").specified().is_some());
        assert_eq!(doc.text_content(ids[1]), "text");
    }

    #[test]
    fn malformed_xml_fragments_are_errors() {
        let mut doc = TemplateDocument::from_xml("<root/>").unwrap();
        let root = doc.root_element_id().unwrap();
        let provider = doc.markup_parser_provider();
        let result = provider.parse_fragment(&mut doc.mutate(), root, "<b>one</i>", MarkupMode::Xml);
        assert!(matches!(result, Err(MarkupError::Malformed { .. })));
    }
}
