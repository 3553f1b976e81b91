use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use crate::{DocumentHtmlParser, HtmlProvider};

use jugl_dom::{Document, DocumentConfig, MarkupError, MarkupMode};

/// A [`Document`] parsed from markup, with [`HtmlProvider`] installed for fragment parsing.
pub struct TemplateDocument {
    inner: Document,
}

impl Deref for TemplateDocument {
    type Target = Document;
    fn deref(&self) -> &Document {
        &self.inner
    }
}
impl DerefMut for TemplateDocument {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}
impl From<TemplateDocument> for Document {
    fn from(doc: TemplateDocument) -> Document {
        doc.inner
    }
}

fn new_document(mode: MarkupMode) -> Document {
    Document::new(DocumentConfig {
        mode,
        markup_parser_provider: Some(Arc::new(HtmlProvider)),
    })
}

impl TemplateDocument {
    /// Parse HTML into a [`TemplateDocument`]. HTML parsing never fails; errors are recovered from.
    pub fn from_html(html: &str) -> Self {
        let mut doc = new_document(MarkupMode::Html);
        DocumentHtmlParser::parse_html_into_doc(&mut doc, html);
        TemplateDocument { inner: doc }
    }

    /// Parse XML into a [`TemplateDocument`], rejecting markup which is not well-formed.
    pub fn from_xml(xml: &str) -> Result<Self, MarkupError> {
        let mut doc = new_document(MarkupMode::Xml);
        let errors = DocumentHtmlParser::parse_xml_into_doc(&mut doc, xml);
        if !errors.is_empty() {
            return Err(MarkupError::Malformed {
                mode: MarkupMode::Xml,
                markup: xml.to_string(),
                errors: errors.into_iter().map(String::from).collect(),
            });
        }
        if doc.root_element_id().is_none() {
            return Err(MarkupError::NoElement {
                markup: xml.to_string(),
            });
        }
        Ok(TemplateDocument { inner: doc })
    }

    /// Parse HTML (or XHTML, detected from the XML declaration or doctype) into a [`TemplateDocument`]
    pub fn from_markup(markup: &str) -> Self {
        let mut doc = new_document(MarkupMode::Html);
        DocumentHtmlParser::parse_into_doc(&mut doc, markup);
        TemplateDocument { inner: doc }
    }

    /// The first element inside `<body>`, or the document element when there is no body.
    ///
    /// HTML parsing wraps everything in `<html><body>`, so this is the element a template author wrote.
    pub fn template_root(&self) -> Option<usize> {
        let root = self.root_element_id()?;
        if self.is_xml() {
            return Some(root);
        }
        let body = self.child_elements(root).find(|id| {
            self.get_node(*id)
                .and_then(|node| node.element_data())
                .is_some_and(|el| &*el.name.local == "body")
        });
        match body {
            Some(body) => self.first_element_child(body).or(Some(root)),
            None => Some(root),
        }
    }

    /// Convert the [`TemplateDocument`] into it's inner [`Document`]
    pub fn into_inner(self) -> Document {
        self.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_root_skips_html_wrappers() {
        let doc = TemplateDocument::from_html("<div id=\"t\"><span>x</span></div>");
        let root = doc.template_root().unwrap();
        assert_eq!(doc.node_debug_str(root), "<div id=\"t\">");
        assert!(!doc.is_xml());
    }

    #[test]
    fn xml_documents_use_the_document_element() {
        let doc = TemplateDocument::from_xml("<?xml version=\"1.0\"?><list><item/></list>").unwrap();
        let root = doc.template_root().unwrap();
        assert_eq!(doc.node_debug_str(root), "<list>");
        assert!(doc.is_xml());
    }

    #[test]
    fn malformed_xml_is_rejected() {
        let result = TemplateDocument::from_xml("<list><item></list>");
        assert!(matches!(result, Err(MarkupError::Malformed { .. })));
    }

    #[test]
    fn markup_sniffing_detects_xml() {
        let doc = TemplateDocument::from_markup("<?xml version=\"1.0\"?><list/>");
        assert!(doc.is_xml());
        let doc = TemplateDocument::from_markup("<ul><li>a</li></ul>");
        assert!(!doc.is_xml());
    }
}
