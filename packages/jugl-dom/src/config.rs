use crate::{MarkupMode, MarkupParserProvider};
use std::sync::Arc;

/// Options used when constructing a [`Document`](crate::Document)
#[derive(Default)]
pub struct DocumentConfig {
    /// Whether the document holds HTML or XML. Decides how fragments are parsed and how the
    /// tree is serialized.
    pub mode: MarkupMode,
    /// Markup parser provider. Used to parse markup fragments (`structure` content)
    pub markup_parser_provider: Option<Arc<dyn MarkupParserProvider>>,
}

impl DocumentConfig {
    pub fn xml() -> Self {
        Self {
            mode: MarkupMode::Xml,
            ..Default::default()
        }
    }
}
